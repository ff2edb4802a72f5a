//! Core reinforcement learning types for tilerl
//!
//! This crate holds the agent/environment interaction protocol: states,
//! actions, the `Env` trait, one-step outcomes and episode recording.
//! Learners live in `tilerl-agent`.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod action;
pub mod environment;
pub mod episode;
pub mod error;
pub mod state;

// Re-export core traits and types
pub use action::{Action, ActionId};
pub use environment::{Env, EnvOutcome};
pub use episode::Episode;
pub use error::{RLError, Result};
pub use state::{State, VectorState};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{Action, ActionId, Env, EnvOutcome, Episode, Result, State, VectorState};
}
