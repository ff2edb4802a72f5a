//! Discrete actions and their catalog keys

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Stable key of an action inside an environment's catalog.
///
/// Learners, episodes and outcomes refer to actions only through this id;
/// the `Action` values themselves stay owned by the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActionId(pub usize);

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named discrete action.
///
/// Equality, ordering and hashing use the name only; the index is metadata
/// that keys per-action feature namespaces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    name: String,
    index: usize,
}

impl Action {
    /// Create a new action
    pub fn new(name: impl Into<String>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }

    /// Action name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stable integer index
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Catalog key for this action
    #[must_use]
    pub fn id(&self) -> ActionId {
        ActionId(self.index)
    }
}

impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for Action {}

impl PartialOrd for Action {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Action {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name)
    }
}

impl Hash for Action {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
