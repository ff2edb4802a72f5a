//! Episode recording

use serde::{Deserialize, Serialize};

use crate::{ActionId, EnvOutcome, RLError, Result};

/// Trajectory of one learning or evaluation run.
///
/// `states[i + 1]` is the result of applying `actions[i]` from `states[i]`,
/// which yielded `rewards[i]`. The episode owns its states; actions are kept
/// as catalog ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode<S> {
    states: Vec<S>,
    actions: Vec<ActionId>,
    rewards: Vec<f64>,
}

impl<S> Episode<S> {
    /// Start an episode at `initial_state`
    pub fn new(initial_state: S) -> Self {
        Self {
            states: vec![initial_state],
            actions: Vec::new(),
            rewards: Vec::new(),
        }
    }

    /// Append one transition
    pub fn transition(&mut self, action: ActionId, next_state: S, reward: f64) {
        self.states.push(next_state);
        self.actions.push(action);
        self.rewards.push(reward);
    }

    /// Append the transition described by an outcome.
    ///
    /// Outcomes without a resulting state cannot be recorded here; use
    /// [`Episode::transition`] with an explicit state instead.
    pub fn record(&mut self, outcome: EnvOutcome<S>) -> Result<()> {
        let next = outcome.to_state.ok_or_else(|| {
            RLError::Environment(format!("outcome of {} has no resulting state", outcome.action))
        })?;
        self.transition(outcome.action, next, outcome.reward);
        Ok(())
    }

    /// Number of transitions
    #[must_use]
    pub fn num_steps(&self) -> usize {
        self.actions.len()
    }

    /// Visited states, initial state first
    #[must_use]
    pub fn states(&self) -> &[S] {
        &self.states
    }

    /// Actions taken
    #[must_use]
    pub fn actions(&self) -> &[ActionId] {
        &self.actions
    }

    /// Rewards received
    #[must_use]
    pub fn rewards(&self) -> &[f64] {
        &self.rewards
    }

    /// Last visited state
    #[must_use]
    pub fn last_state(&self) -> &S {
        // never empty: `new` seeds the initial state
        &self.states[self.states.len() - 1]
    }

    /// Undiscounted sum of rewards
    #[must_use]
    pub fn total_reward(&self) -> f64 {
        self.rewards.iter().sum()
    }

    /// `sum_t gamma^t * r_t`
    #[must_use]
    pub fn discounted_return(&self, gamma: f64) -> f64 {
        let mut discount = 1.0;
        let mut sum = 0.0;
        for r in &self.rewards {
            sum += discount * r;
            discount *= gamma;
        }
        sum
    }

    /// Consume the episode, returning its sequences
    pub fn into_parts(self) -> (Vec<S>, Vec<ActionId>, Vec<f64>) {
        (self.states, self.actions, self.rewards)
    }
}
