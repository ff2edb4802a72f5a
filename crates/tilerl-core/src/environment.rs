//! Environment protocol consumed by the learners

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Action, ActionId, RLError, Result, State};

/// Result of executing one action in an environment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvOutcome<S> {
    /// State the action was taken from
    pub from_state: S,
    /// Action executed
    pub action: ActionId,
    /// Resulting state; may be absent when the episode terminated
    pub to_state: Option<S>,
    /// Reward signal
    pub reward: f64,
    /// Whether the episode ended with this transition
    pub terminated: bool,
}

impl<S> EnvOutcome<S> {
    /// Create a new outcome
    pub fn new(from_state: S, action: ActionId, to_state: Option<S>, reward: f64, terminated: bool) -> Self {
        Self {
            from_state,
            action,
            to_state,
            reward,
            terminated,
        }
    }
}

fn write_vec(f: &mut fmt::Formatter<'_>, v: &[f64]) -> fmt::Result {
    for (i, x) in v.iter().enumerate() {
        if i > 0 {
            write!(f, ",")?;
        }
        write!(f, "{x}")?;
    }
    Ok(())
}

impl<S: State> fmt::Display for EnvOutcome<S> {
    /// `from;action;reward;to;terminated`, with `to` omitted when absent
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_vec(f, &self.from_state.to_vec())?;
        write!(f, ";{};{}", self.action, self.reward)?;
        if let Some(to) = &self.to_state {
            write!(f, ";")?;
            write_vec(f, &to.to_vec())?;
        }
        write!(f, ";{}", self.terminated)
    }
}

/// Core environment trait.
///
/// Everything here is synchronous: one call to `exec_act` is one environment
/// step, and the caller owns the environment for the whole run.
pub trait Env {
    /// State type
    type State: State;

    /// Current observation
    fn curr_obs(&self) -> Self::State;

    /// Full action catalog. The order is stable and decides greedy tie-breaks.
    fn actions(&self) -> &[Action];

    /// Whether `action` may be taken in `state`
    fn is_applicable(&self, _action: &Action, _state: &Self::State) -> bool {
        true
    }

    /// Catalog entries applicable in `state`, in catalog order
    fn applicable_actions(&self, state: &Self::State) -> Vec<ActionId> {
        self.actions()
            .iter()
            .filter(|a| self.is_applicable(a, state))
            .map(Action::id)
            .collect()
    }

    /// Look up a catalog entry by id
    fn action(&self, id: ActionId) -> Result<&Action> {
        self.actions()
            .iter()
            .find(|a| a.id() == id)
            .ok_or(RLError::UnknownAction(id))
    }

    /// Execute one action
    fn exec_act(&mut self, action: ActionId) -> Result<EnvOutcome<Self::State>>;

    /// Reward produced by the most recent `exec_act`
    fn last_reward(&self) -> f64;

    /// Whether the current state is terminal
    fn is_terminal(&self) -> bool;

    /// Reset the environment to an initial state
    fn reset_env(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VectorState;

    /// Two cells; "stay" is only applicable in the right cell.
    struct TwoCells {
        pos: usize,
        actions: Vec<Action>,
        reward: f64,
    }

    impl TwoCells {
        fn new() -> Self {
            Self {
                pos: 0,
                actions: vec![Action::new("move", 0), Action::new("stay", 1)],
                reward: 0.0,
            }
        }
    }

    impl Env for TwoCells {
        type State = VectorState;

        fn curr_obs(&self) -> VectorState {
            VectorState::new(vec![self.pos as f64])
        }

        fn actions(&self) -> &[Action] {
            &self.actions
        }

        fn is_applicable(&self, action: &Action, state: &VectorState) -> bool {
            action.name() != "stay" || state.data[0] > 0.5
        }

        fn exec_act(&mut self, action: ActionId) -> Result<EnvOutcome<VectorState>> {
            let from = self.curr_obs();
            self.action(action)?;
            if action == ActionId(0) {
                self.pos = 1 - self.pos;
            }
            self.reward = 1.0;
            Ok(EnvOutcome::new(from, action, Some(self.curr_obs()), 1.0, false))
        }

        fn last_reward(&self) -> f64 {
            self.reward
        }

        fn is_terminal(&self) -> bool {
            false
        }

        fn reset_env(&mut self) -> Result<()> {
            self.pos = 0;
            Ok(())
        }
    }

    #[test]
    fn test_applicable_actions_filter_catalog() {
        let mut env = TwoCells::new();
        let left = env.curr_obs();
        assert_eq!(env.applicable_actions(&left), vec![ActionId(0)]);

        env.exec_act(ActionId(0)).unwrap();
        let right = env.curr_obs();
        assert_eq!(env.applicable_actions(&right), vec![ActionId(0), ActionId(1)]);
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let mut env = TwoCells::new();
        let err = env.exec_act(ActionId(9)).unwrap_err();
        assert!(matches!(err, RLError::UnknownAction(ActionId(9))));
    }

    #[test]
    fn test_outcome_display() {
        let o = EnvOutcome::new(
            VectorState::new(vec![1.0, 2.0]),
            ActionId(3),
            Some(VectorState::new(vec![1.5, 2.0])),
            -1.0,
            false,
        );
        assert_eq!(o.to_string(), "1,2;#3;-1;1.5,2;false");

        let t: EnvOutcome<VectorState> =
            EnvOutcome::new(VectorState::new(vec![4.0]), ActionId(0), None, 0.5, true);
        assert_eq!(t.to_string(), "4;#0;0.5;true");
    }
}
