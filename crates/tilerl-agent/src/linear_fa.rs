//! Linear action-value approximation over cross-product tile features

use std::collections::BTreeMap;

use tilerl_core::{ActionId, RLError, Result, State};

use crate::cross_product::CrossProductFeatures;
use crate::tile_coding::{FeatureId, StateFeature, TileCoding};

/// Sparse gradient of `Q(s, a)` with respect to the weights: feature id to
/// activation. For a linear approximator this is the active feature vector.
pub type Gradient = BTreeMap<FeatureId, f64>;

/// Single-slot memo of the most recent query.
///
/// The key is the state vector plus the action id, compared structurally.
#[derive(Debug, Clone)]
struct Memo {
    state: Vec<f64>,
    action: ActionId,
    features: Vec<StateFeature>,
    gradient: Option<Gradient>,
}

impl Memo {
    fn matches(&self, state: &[f64], action: ActionId) -> bool {
        self.action == action && self.state == state
    }
}

fn to_gradient(features: &[StateFeature]) -> Gradient {
    features.iter().map(|f| (f.id, f.value)).collect()
}

/// Linear function approximator `Q(s, a) = sum_i x_i(s, a) * w_i`.
///
/// Weights live in a dense table indexed by feature id. A weight is
/// materialized with the default value the first time it is read, so even
/// [`LinearFA::get_weight`] mutates the table.
#[derive(Debug, Clone)]
pub struct LinearFA {
    pub(crate) features: CrossProductFeatures,
    pub(crate) weights: Vec<Option<f64>>,
    pub(crate) num_param: usize,
    pub(crate) default_weight: f64,
    memo: Option<Memo>,
}

impl LinearFA {
    /// Create an approximator with zero default weight
    #[must_use]
    pub fn new(tile_coding: TileCoding) -> Self {
        Self::with_default_weight(tile_coding, 0.0)
    }

    /// Create an approximator whose unseen weights start at `default_weight`
    #[must_use]
    pub fn with_default_weight(tile_coding: TileCoding, default_weight: f64) -> Self {
        Self::from_parts(CrossProductFeatures::new(tile_coding), Vec::new(), default_weight)
    }

    pub(crate) fn from_parts(
        features: CrossProductFeatures,
        weights: Vec<Option<f64>>,
        default_weight: f64,
    ) -> Self {
        let num_param = weights.iter().filter(|w| w.is_some()).count();
        Self {
            features,
            weights,
            num_param,
            default_weight,
            memo: None,
        }
    }

    /// Estimate `Q(state, action)`.
    ///
    /// Replaces the memo with this pair and drops any memoized gradient.
    pub fn evaluate<S: State>(&mut self, state: &S, action: ActionId) -> Result<f64> {
        let input = state.to_vec();
        let features = self.features.features(&input, action)?;
        let value: f64 = features
            .iter()
            .map(|f| f.value * self.get_weight(f.id))
            .sum();
        self.memo = Some(Memo {
            state: input,
            action,
            features,
            gradient: None,
        });
        Ok(value)
    }

    /// Gradient of `Q(state, action)`.
    ///
    /// Served from the memo when the pair equals the last query; otherwise
    /// the features are regenerated and the memo replaced.
    pub fn gradient<S: State>(&mut self, state: &S, action: ActionId) -> Result<Gradient> {
        let input = state.to_vec();
        if let Some(memo) = self.memo.as_mut().filter(|m| m.matches(&input, action)) {
            if let Some(g) = &memo.gradient {
                return Ok(g.clone());
            }
            let gradient = to_gradient(&memo.features);
            memo.gradient = Some(gradient.clone());
            return Ok(gradient);
        }

        let features = self.features.features(&input, action)?;
        let gradient = to_gradient(&features);
        self.memo = Some(Memo {
            state: input,
            action,
            features,
            gradient: Some(gradient.clone()),
        });
        Ok(gradient)
    }

    fn slot(&mut self, id: FeatureId) -> &mut Option<f64> {
        if id >= self.weights.len() {
            self.weights.resize(id + 1, None);
        }
        &mut self.weights[id]
    }

    /// Weight of `id`, materializing the default for unseen ids
    pub fn get_weight(&mut self, id: FeatureId) -> f64 {
        let default = self.default_weight;
        let slot = self.slot(id);
        match *slot {
            Some(w) => w,
            None => {
                *slot = Some(default);
                self.num_param += 1;
                default
            }
        }
    }

    /// Stored weight of `id`, without materializing it
    #[must_use]
    pub fn weight(&self, id: FeatureId) -> Option<f64> {
        self.weights.get(id).copied().flatten()
    }

    /// Overwrite the weight of `id`
    pub fn set_weight(&mut self, id: FeatureId, value: f64) {
        let slot = self.slot(id);
        let fresh = slot.is_none();
        *slot = Some(value);
        if fresh {
            self.num_param += 1;
        }
    }

    /// Replace the whole weight table.
    ///
    /// `weights[i]` becomes the weight of state-action feature `i`; the slice
    /// must cover exactly the ids minted so far.
    pub fn inject_weights(&mut self, weights: &[f64]) -> Result<()> {
        let expected = self.features.num_ids();
        if weights.len() != expected {
            return Err(RLError::DimensionMismatch {
                expected,
                actual: weights.len(),
            });
        }
        if let Some(i) = weights.iter().position(|w| !w.is_finite()) {
            return Err(RLError::NonFinite(format!("injected weight {i} is {}", weights[i])));
        }
        self.weights = weights.iter().copied().map(Some).collect();
        self.num_param = weights.len();
        Ok(())
    }

    /// Forget all learned weights. Feature ids are kept.
    pub fn reset_params(&mut self) {
        self.weights.clear();
        self.num_param = 0;
    }

    /// Number of materialized weights
    #[must_use]
    pub fn num_param(&self) -> usize {
        self.num_param
    }

    /// Weight assigned to ids on first read
    #[must_use]
    pub fn default_weight(&self) -> f64 {
        self.default_weight
    }

    /// Feature generator
    #[must_use]
    pub fn features(&self) -> &CrossProductFeatures {
        &self.features
    }

    /// Materialized `(id, weight)` pairs in id order
    pub fn weights(&self) -> impl Iterator<Item = (FeatureId, f64)> + '_ {
        self.weights
            .iter()
            .enumerate()
            .filter_map(|(id, w)| w.map(|w| (id, w)))
    }
}
