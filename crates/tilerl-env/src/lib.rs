//! Reference environments for tilerl
//!
//! This crate provides:
//! - `LineWalkEnv`, a tiny deterministic walk for smoke tests
//! - `MountainCarEnv`, the classic continuous-state control task
//! - A registry for creating environments by name

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod line_walk;
pub mod mountain_car;
pub mod registry;

// Re-export environments
pub use line_walk::LineWalkEnv;
pub use mountain_car::{MountainCarConfig, MountainCarEnv};
pub use registry::{list_envs, make_env, BoxedEnv, EnvRegistry};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{make_env, LineWalkEnv, MountainCarEnv};
    pub use tilerl_core::prelude::*;
}
