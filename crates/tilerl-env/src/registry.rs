//! Environment registry for creating environments by name

use std::collections::BTreeMap;

use tilerl_core::{Env, RLError, Result, VectorState};

use crate::line_walk::LineWalkEnv;
use crate::mountain_car::{MountainCarConfig, MountainCarEnv};

/// Type-erased environment over vector states
pub type BoxedEnv = Box<dyn Env<State = VectorState>>;

type EnvConstructor = Box<dyn Fn(Option<u64>) -> Result<BoxedEnv> + Send + Sync>;

/// Named environment constructors
pub struct EnvRegistry {
    envs: BTreeMap<String, EnvConstructor>,
}

impl Default for EnvRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register("line-walk", |_| Ok(Box::new(LineWalkEnv::default()) as BoxedEnv));
        registry.register("mountain-car", |seed| {
            Ok(Box::new(MountainCarEnv::new(MountainCarConfig::default(), seed)?) as BoxedEnv)
        });
        registry
    }
}

impl EnvRegistry {
    /// Registry without any environment
    #[must_use]
    pub fn empty() -> Self {
        Self {
            envs: BTreeMap::new(),
        }
    }

    /// Register an environment, replacing any previous one of that name
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F)
    where
        F: Fn(Option<u64>) -> Result<BoxedEnv> + Send + Sync + 'static,
    {
        self.envs.insert(name.into(), Box::new(constructor));
    }

    /// Create an environment by name
    pub fn make(&self, name: &str, seed: Option<u64>) -> Result<BoxedEnv> {
        self.envs
            .get(name)
            .ok_or_else(|| RLError::Environment(format!("Unknown environment: {name}")))
            .and_then(|constructor| constructor(seed))
    }

    /// Registered names in sorted order
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.envs.keys().cloned().collect()
    }
}

/// Create one of the built-in environments by name
pub fn make_env(name: &str, seed: Option<u64>) -> Result<BoxedEnv> {
    EnvRegistry::default().make(name, seed)
}

/// Names of the built-in environments
#[must_use]
pub fn list_envs() -> Vec<String> {
    EnvRegistry::default().list()
}
