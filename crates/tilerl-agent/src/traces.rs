//! Sparse eligibility traces keyed by feature id
//!
//! Trace magnitudes live in a dense table indexed by feature id, while the
//! ids currently carrying a trace are tracked in a separate list. Updates
//! therefore cost O(active traces), not O(feature ids).

use crate::tile_coding::FeatureId;

/// Eligibility traces for one learning run
#[derive(Debug, Clone, Default)]
pub struct EligibilityTraces {
    values: Vec<f64>,
    member: Vec<bool>,
    active: Vec<FeatureId>,
}

impl EligibilityTraces {
    /// Create an empty trace table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` as visited: set its trace to 1 when `replace`, otherwise
    /// add 1 to it
    pub fn touch(&mut self, id: FeatureId, replace: bool) {
        if id >= self.values.len() {
            self.values.resize(id + 1, 0.0);
            self.member.resize(id + 1, false);
        }
        if !self.member[id] {
            self.member[id] = true;
            self.active.push(id);
            self.values[id] = 0.0;
        }
        if replace {
            self.values[id] = 1.0;
        } else {
            self.values[id] += 1.0;
        }
    }

    /// Current trace of `id`, zero when absent
    #[must_use]
    pub fn get(&self, id: FeatureId) -> f64 {
        match self.member.get(id) {
            Some(true) => self.values[id],
            _ => 0.0,
        }
    }

    /// Visit every active trace, then decay it.
    ///
    /// `apply` sees each `(id, trace)` before decay. Each trace is then
    /// multiplied by `decay` and dropped once it falls below `min_trace`.
    /// Returns how many traces were dropped.
    pub fn update_and_decay<F>(&mut self, decay: f64, min_trace: f64, mut apply: F) -> usize
    where
        F: FnMut(FeatureId, f64),
    {
        for &id in &self.active {
            apply(id, self.values[id]);
            self.values[id] *= decay;
        }

        let before = self.active.len();
        let (values, member) = (&mut self.values, &mut self.member);
        self.active.retain(|&id| {
            let keep = values[id] >= min_trace;
            if !keep {
                values[id] = 0.0;
                member[id] = false;
            }
            keep
        });
        before - self.active.len()
    }

    /// Active `(id, trace)` pairs in activation order
    pub fn iter(&self) -> impl Iterator<Item = (FeatureId, f64)> + '_ {
        self.active.iter().map(|&id| (id, self.values[id]))
    }

    /// Number of active traces
    #[must_use]
    pub fn len(&self) -> usize {
        self.active.len()
    }

    /// Whether no trace is active
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Drop every trace
    pub fn clear(&mut self) {
        for &id in &self.active {
            self.values[id] = 0.0;
            self.member[id] = false;
        }
        self.active.clear();
    }
}
