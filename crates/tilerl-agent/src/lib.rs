//! Online value-based learning for tilerl
//!
//! This crate provides:
//! - Tile coding of continuous state vectors
//! - Cross-product state-action features
//! - A linear action-value approximator
//! - Gradient-descent SARSA(lambda) with eligibility traces
//! - Training loop, schedules and model persistence

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod cross_product;
pub mod linear_fa;
pub mod persist;
pub mod sarsa;
pub mod schedule;
pub mod tile_coding;
pub mod trainer;
pub mod traces;

// Re-export the learner
pub use sarsa::{GDSarsaLambda, SarsaConfig};
pub use trainer::{agent_from_config, EpisodeStats, Trainer, TrainingReport};

// Re-export function approximation
pub use cross_product::{CrossProductFeatures, FeaturesMap};
pub use linear_fa::{Gradient, LinearFA};
pub use tile_coding::{FeatureId, StateFeature, Tile, TileCoding, Tiling};
pub use traces::EligibilityTraces;

// Re-export configuration
pub use config::{build_tile_coding, TilingSpec, TrainingConfig};
pub use schedule::{ConstantSchedule, ExponentialSchedule, LinearSchedule, Schedule, ScheduleConfig};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        GDSarsaLambda, LinearFA, SarsaConfig, TileCoding, Trainer, TrainingConfig, TilingSpec,
    };
    pub use tilerl_core::prelude::*;
}
