//! State representations

use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

/// Trait for states observed from an environment.
///
/// A state is opaque to the learner apart from its vector form. Two states
/// are considered the same when their vectors are element-wise equal.
pub trait State: Clone + Debug {
    /// Fixed-order real vector describing the state
    fn to_vec(&self) -> Vec<f64>;

    /// Element-wise vector equality
    fn same_as(&self, other: &Self) -> bool {
        self.to_vec() == other.to_vec()
    }
}

/// A simple vector state implementation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorState {
    /// The state vector
    pub data: Vec<f64>,
}

impl VectorState {
    /// Create a new vector state
    #[must_use]
    pub fn new(data: Vec<f64>) -> Self {
        Self { data }
    }

    /// Number of dimensions
    #[must_use]
    pub fn dim(&self) -> usize {
        self.data.len()
    }
}

impl From<Vec<f64>> for VectorState {
    fn from(data: Vec<f64>) -> Self {
        Self { data }
    }
}

impl State for VectorState {
    fn to_vec(&self) -> Vec<f64> {
        self.data.clone()
    }

    fn same_as(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl fmt::Display for VectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, x) in self.data.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{x}")?;
        }
        Ok(())
    }
}
