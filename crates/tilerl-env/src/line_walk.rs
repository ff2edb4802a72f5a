//! Walk on the integer line until leaving a symmetric band

use tracing::trace;

use tilerl_core::{Action, ActionId, Env, EnvOutcome, RLError, Result, VectorState};

/// Agent starts at 0 and steps left or right; the episode ends once
/// `|position| >= bound`. Every step costs -1.
#[derive(Debug, Clone)]
pub struct LineWalkEnv {
    position: i64,
    bound: i64,
    last_reward: f64,
    actions: Vec<Action>,
}

impl Default for LineWalkEnv {
    fn default() -> Self {
        Self::new(5)
    }
}

impl LineWalkEnv {
    /// Create a walk ending at distance `bound` from the origin
    #[must_use]
    pub fn new(bound: i64) -> Self {
        Self {
            position: 0,
            bound: bound.max(1),
            last_reward: 0.0,
            actions: vec![Action::new("left", 0), Action::new("right", 1)],
        }
    }

    /// Current position
    #[must_use]
    pub fn position(&self) -> i64 {
        self.position
    }

    /// Distance from the origin at which the walk ends
    #[must_use]
    pub fn bound(&self) -> i64 {
        self.bound
    }
}

impl Env for LineWalkEnv {
    type State = VectorState;

    #[allow(clippy::cast_precision_loss)]
    fn curr_obs(&self) -> VectorState {
        VectorState::new(vec![self.position as f64])
    }

    fn actions(&self) -> &[Action] {
        &self.actions
    }

    fn exec_act(&mut self, action: ActionId) -> Result<EnvOutcome<VectorState>> {
        if self.is_terminal() {
            return Err(RLError::Environment("walk already finished".into()));
        }
        let from = self.curr_obs();
        self.position += match action.0 {
            0 => -1,
            1 => 1,
            _ => return Err(RLError::UnknownAction(action)),
        };
        self.last_reward = -1.0;
        let terminated = self.is_terminal();
        trace!(position = self.position, terminated, "line walk step");
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
        self.position.abs() >= self.bound
    }

    fn reset_env(&mut self) -> Result<()> {
        self.position = 0;
        self.last_reward = 0.0;
        Ok(())
    }
}
