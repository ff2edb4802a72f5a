//! State-action features built as the cross product of tile features and actions

use std::collections::{BTreeMap, HashMap};

use tilerl_core::{ActionId, Result};

use crate::tile_coding::{FeatureId, StateFeature, TileCoding};

/// Per-action translation of state feature ids into state-action feature ids
#[derive(Debug, Clone, Default)]
pub struct FeaturesMap {
    pub(crate) map: HashMap<FeatureId, FeatureId>,
}

impl FeaturesMap {
    /// Create an empty map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Id mapped from `from`, minting `*next_id` (and advancing it) when
    /// `from` has not been seen for this action yet
    pub fn get_or_create(&mut self, from: FeatureId, next_id: &mut FeatureId) -> FeatureId {
        *self.map.entry(from).or_insert_with(|| {
            let id = *next_id;
            *next_id += 1;
            id
        })
    }

    /// Existing mapping for `from`
    #[must_use]
    pub fn get(&self, from: FeatureId) -> Option<FeatureId> {
        self.map.get(&from).copied()
    }

    /// Number of mappings
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether nothing has been mapped yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Lifts tile-coded state features into per-action feature spaces.
///
/// All actions draw from one shared counter, so the ids of two different
/// actions never collide even when they come from the same state feature.
#[derive(Debug, Clone)]
pub struct CrossProductFeatures {
    pub(crate) state_features: TileCoding,
    pub(crate) action_features: BTreeMap<ActionId, FeaturesMap>,
    pub(crate) next_id: FeatureId,
}

impl CrossProductFeatures {
    /// Wrap a tile coding
    #[must_use]
    pub fn new(state_features: TileCoding) -> Self {
        Self {
            state_features,
            action_features: BTreeMap::new(),
            next_id: 0,
        }
    }

    // the only place state-action ids are minted
    fn action_feature(&mut self, action: ActionId, from: FeatureId) -> FeatureId {
        self.action_features
            .entry(action)
            .or_default()
            .get_or_create(from, &mut self.next_id)
    }

    /// Active state-action features for `input` under `action`
    pub fn features(&mut self, input: &[f64], action: ActionId) -> Result<Vec<StateFeature>> {
        let state_features = self.state_features.features(input)?;
        Ok(state_features
            .into_iter()
            .map(|sf| StateFeature::new(self.action_feature(action, sf.id), sf.value))
            .collect())
    }

    /// Upper bound on the state-action id space: state features times
    /// state-action ids minted so far. Not every combination need exist.
    #[must_use]
    pub fn num_features(&self) -> usize {
        self.state_features.num_features() * self.next_id
    }

    /// Number of state-action ids minted so far
    #[must_use]
    pub fn num_ids(&self) -> usize {
        self.next_id
    }

    /// Underlying tile coding
    #[must_use]
    pub fn state_features(&self) -> &TileCoding {
        &self.state_features
    }

    /// Per-action maps, keyed by action id
    #[must_use]
    pub fn action_features(&self) -> &BTreeMap<ActionId, FeaturesMap> {
        &self.action_features
    }
}
