//! Error types for the tilerl core library

use thiserror::Error;

use crate::ActionId;

/// Core error type for learning and environment operations
#[derive(Error, Debug)]
pub enum RLError {
    /// Environment-related errors
    #[error("Environment error: {0}")]
    Environment(String),

    /// A non-terminal state offered no applicable action
    #[error("No applicable action in state {state:?}")]
    NoApplicableActions {
        /// Vector form of the offending state
        state: Vec<f64>,
    },

    /// Action id not present in the environment's catalog
    #[error("Unknown action: {0}")]
    UnknownAction(ActionId),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Required length
        expected: usize,
        /// Length received
        actual: usize,
    },

    /// Hyperparameter or tiling parameter outside its domain
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// NaN or infinite value reached the learner
    #[error("Non-finite value: {0}")]
    NonFinite(String),

    /// Saved model could not be interpreted
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias for tilerl operations
pub type Result<T> = std::result::Result<T, RLError>;
