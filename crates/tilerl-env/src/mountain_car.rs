//! Mountain Car
//!
//! An under-powered car in a valley must rock back and forth to reach the
//! goal on the right hill. State is `[position, velocity]`; every step
//! costs -1 until the goal is reached.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::trace;

use tilerl_core::{Action, ActionId, Env, EnvOutcome, RLError, Result, VectorState};

/// Physical constants of the valley
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MountainCarConfig {
    /// Left wall
    pub min_position: f64,
    /// Right edge
    pub max_position: f64,
    /// Speed limit in either direction
    pub max_speed: f64,
    /// Position at which the episode ends
    pub goal_position: f64,
    /// Acceleration per unit of throttle
    pub force: f64,
    /// Gravity along the slope
    pub gravity: f64,
    /// Start positions are drawn uniformly from this range
    pub start_range: (f64, f64),
}

impl Default for MountainCarConfig {
    fn default() -> Self {
        Self {
            min_position: -1.2,
            max_position: 0.6,
            max_speed: 0.07,
            goal_position: 0.5,
            force: 0.001,
            gravity: 0.0025,
            start_range: (-0.6, -0.4),
        }
    }
}

/// Mountain Car environment
#[derive(Debug, Clone)]
pub struct MountainCarEnv {
    position: f64,
    velocity: f64,
    last_reward: f64,
    config: MountainCarConfig,
    actions: Vec<Action>,
    rng: StdRng,
}

impl MountainCarEnv {
    /// Create an environment; `seed` fixes the start positions
    pub fn new(config: MountainCarConfig, seed: Option<u64>) -> Result<Self> {
        let (lo, hi) = config.start_range;
        if !(lo < hi && lo >= config.min_position && hi <= config.goal_position) {
            return Err(RLError::InvalidConfig(format!(
                "start range ({lo}, {hi}) must be non-empty and left of the goal"
            )));
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut env = Self {
            position: lo,
            velocity: 0.0,
            last_reward: 0.0,
            config,
            actions: vec![
                Action::new("push_left", 0),
                Action::new("coast", 1),
                Action::new("push_right", 2),
            ],
            rng,
        };
        env.reset_env()?;
        Ok(env)
    }

    /// Car position
    #[must_use]
    pub fn position(&self) -> f64 {
        self.position
    }

    /// Car velocity
    #[must_use]
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    /// Physical constants
    #[must_use]
    pub fn config(&self) -> &MountainCarConfig {
        &self.config
    }
}

impl Env for MountainCarEnv {
    type State = VectorState;

    fn curr_obs(&self) -> VectorState {
        VectorState::new(vec![self.position, self.velocity])
    }

    fn actions(&self) -> &[Action] {
        &self.actions
    }

    fn exec_act(&mut self, action: ActionId) -> Result<EnvOutcome<VectorState>> {
        let throttle = match action.0 {
            0 => -1.0,
            1 => 0.0,
            2 => 1.0,
            _ => return Err(RLError::UnknownAction(action)),
        };
        let from = self.curr_obs();
        let c = &self.config;

        self.velocity += throttle * c.force - (3.0 * self.position).cos() * c.gravity;
        self.velocity = self.velocity.clamp(-c.max_speed, c.max_speed);
        self.position = (self.position + self.velocity).clamp(c.min_position, c.max_position);
        // inelastic left wall
        if self.position <= c.min_position && self.velocity < 0.0 {
            self.velocity = 0.0;
        }

        self.last_reward = -1.0;
        let terminated = self.is_terminal();
        trace!(position = self.position, velocity = self.velocity, terminated, "mountain car step");
        Ok(EnvOutcome::new(
            from,
            action,
            Some(self.curr_obs()),
            self.last_reward,
            terminated,
        ))
    }

    fn last_reward(&self) -> f64 {
        self.last_reward
    }

    fn is_terminal(&self) -> bool {
        self.position >= self.config.goal_position
    }

    fn reset_env(&mut self) -> Result<()> {
        let (lo, hi) = self.config.start_range;
        self.position = self.rng.gen_range(lo..hi);
        self.velocity = 0.0;
        self.last_reward = 0.0;
        Ok(())
    }
}
