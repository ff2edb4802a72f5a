//! Gradient-descent SARSA(lambda) with eligibility traces
//!
//! Each call to [`GDSarsaLambda::run_learning`] drives one episode:
//! evaluate `Q(s, a)`, step the environment, pick `a'` epsilon-greedily,
//! compute the TD error, bump the traces of the features active for
//! `(s, a)`, then move every traced weight and decay its trace.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use tilerl_core::{ActionId, Env, Episode, RLError, Result, State};

use crate::linear_fa::LinearFA;
use crate::traces::EligibilityTraces;

/// Hyperparameters of the learner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SarsaConfig {
    /// Learning rate
    pub alpha: f64,
    /// Trace decay
    pub lambda: f64,
    /// Discount factor
    pub gamma: f64,
    /// Exploration rate
    pub epsilon: f64,
    /// Traces below this magnitude are dropped
    pub min_trace: f64,
    /// Replacing (`true`) or accumulating (`false`) traces
    pub replace_traces: bool,
    /// Initial value of weights the approximator has never seen
    pub default_weight: f64,
}

impl Default for SarsaConfig {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            lambda: 0.9,
            gamma: 0.95,
            epsilon: 0.1,
            min_trace: 0.01,
            replace_traces: true,
            default_weight: 0.0,
        }
    }
}

impl SarsaConfig {
    /// Check every hyperparameter against its domain
    pub fn validate(&self) -> Result<()> {
        let unit = |name: &str, v: f64| {
            if (0.0..=1.0).contains(&v) {
                Ok(())
            } else {
                Err(RLError::InvalidConfig(format!("{name} must lie in [0, 1], got {v}")))
            }
        };
        if !(self.alpha.is_finite() && self.alpha >= 0.0) {
            return Err(RLError::InvalidConfig(format!(
                "alpha must be finite and non-negative, got {}",
                self.alpha
            )));
        }
        unit("lambda", self.lambda)?;
        unit("gamma", self.gamma)?;
        unit("epsilon", self.epsilon)?;
        if !(self.min_trace.is_finite() && self.min_trace >= 0.0) {
            return Err(RLError::InvalidConfig(format!(
                "min_trace must be finite and non-negative, got {}",
                self.min_trace
            )));
        }
        if !self.default_weight.is_finite() {
            return Err(RLError::InvalidConfig("default_weight must be finite".into()));
        }
        Ok(())
    }
}

/// Online SARSA(lambda) learner over a [`LinearFA`]
#[derive(Debug)]
pub struct GDSarsaLambda<R = StdRng> {
    config: SarsaConfig,
    vfa: LinearFA,
    rng: R,
    curr_step: usize,
}

impl GDSarsaLambda<StdRng> {
    /// Create a learner with an entropy-seeded generator
    pub fn new(config: SarsaConfig, vfa: LinearFA) -> Result<Self> {
        Self::with_rng(config, vfa, StdRng::from_entropy())
    }

    /// Create a learner with a reproducible generator
    pub fn with_seed(config: SarsaConfig, vfa: LinearFA, seed: u64) -> Result<Self> {
        Self::with_rng(config, vfa, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> GDSarsaLambda<R> {
    /// Create a learner drawing exploration decisions from `rng`
    pub fn with_rng(config: SarsaConfig, vfa: LinearFA, rng: R) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            vfa,
            rng,
            curr_step: 0,
        })
    }

    /// Hyperparameters
    pub fn config(&self) -> &SarsaConfig {
        &self.config
    }

    /// Change the exploration rate between episodes
    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.config.epsilon = epsilon.clamp(0.0, 1.0);
    }

    /// The approximator being trained
    pub fn vfa(&self) -> &LinearFA {
        &self.vfa
    }

    /// Mutable access to the approximator
    pub fn vfa_mut(&mut self) -> &mut LinearFA {
        &mut self.vfa
    }

    /// Give back the trained approximator
    pub fn into_vfa(self) -> LinearFA {
        self.vfa
    }

    /// Steps taken in the current (or last) episode
    pub fn current_step(&self) -> usize {
        self.curr_step
    }

    /// Learn from one episode.
    ///
    /// Runs until the environment reports a terminal state or `max_steps`
    /// transitions have been made (`None` means no limit). The environment
    /// is left where the episode ended; resetting it is up to the caller.
    pub fn run_learning<E>(&mut self, env: &mut E, max_steps: Option<usize>) -> Result<Episode<E::State>>
    where
        E: Env + ?Sized,
    {
        let SarsaConfig {
            alpha,
            lambda,
            gamma,
            min_trace,
            replace_traces,
            ..
        } = self.config;

        let mut state = env.curr_obs();
        let mut episode = Episode::new(state.clone());
        let mut traces = EligibilityTraces::new();
        self.curr_step = 0;

        // no decision is needed when the loop cannot run
        if env.is_terminal() || max_steps == Some(0) {
            return Ok(episode);
        }

        let mut action = self.egreedy_action(env, &state)?;
        while !env.is_terminal() && max_steps.map_or(true, |m| self.curr_step < m) {
            let curr_q = self.vfa.evaluate(&state, action)?;
            let gradient = self.vfa.gradient(&state, action)?;

            let outcome = env.exec_act(action)?;
            let reward = outcome.reward;
            if !reward.is_finite() {
                return Err(RLError::NonFinite(format!(
                    "reward {reward} at step {}",
                    self.curr_step
                )));
            }
            let terminated = outcome.terminated;
            let next_state = match outcome.to_state {
                Some(s) => s,
                None => env.curr_obs(),
            };

            // a' is never used once the episode has ended
            let (next_action, next_q) = if terminated {
                (action, 0.0)
            } else {
                let a = self.egreedy_action(env, &next_state)?;
                (a, self.vfa.evaluate(&next_state, a)?)
            };

            self.curr_step += 1;
            episode.transition(action, next_state.clone(), reward);

            let delta = reward + gamma * next_q - curr_q;

            for &id in gradient.keys() {
                traces.touch(id, replace_traces);
            }
            let vfa = &mut self.vfa;
            let pruned = traces.update_and_decay(lambda * gamma, min_trace, |id, e| {
                let w = vfa.get_weight(id) + alpha * delta * e;
                vfa.set_weight(id, w);
            });
            trace!(
                step = self.curr_step,
                reward,
                delta,
                active_traces = traces.len(),
                pruned,
                "sarsa update"
            );

            state = next_state;
            action = next_action;
        }

        debug!(
            steps = episode.num_steps(),
            total_reward = episode.total_reward(),
            terminated = env.is_terminal(),
            features = self.vfa.features().num_ids(),
            weights = self.vfa.num_param(),
            "learning episode finished"
        );
        Ok(episode)
    }

    /// Follow the greedy policy for one episode without learning
    pub fn run_policy<E>(&mut self, env: &mut E, max_steps: Option<usize>) -> Result<Episode<E::State>>
    where
        E: Env + ?Sized,
    {
        let mut episode = Episode::new(env.curr_obs());
        self.curr_step = 0;
        while !env.is_terminal() && max_steps.map_or(true, |m| self.curr_step < m) {
            let state = env.curr_obs();
            let action = self.greedy_action(env, &state)?;
            let outcome = env.exec_act(action)?;
            let next_state = match outcome.to_state {
                Some(s) => s,
                None => env.curr_obs(),
            };
            self.curr_step += 1;
            episode.transition(action, next_state, outcome.reward);
        }
        debug!(
            steps = episode.num_steps(),
            total_reward = episode.total_reward(),
            "greedy episode finished"
        );
        Ok(episode)
    }

    fn applicable<E>(env: &E, state: &E::State) -> Result<Vec<ActionId>>
    where
        E: Env + ?Sized,
    {
        let actions = env.applicable_actions(state);
        if actions.is_empty() {
            return Err(RLError::NoApplicableActions {
                state: state.to_vec(),
            });
        }
        Ok(actions)
    }

    fn best_of<S: State>(&mut self, state: &S, actions: &[ActionId]) -> Result<ActionId> {
        let mut best = actions[0];
        let mut best_q = self.vfa.evaluate(state, best)?;
        for &a in &actions[1..] {
            let q = self.vfa.evaluate(state, a)?;
            if q > best_q {
                best = a;
                best_q = q;
            }
        }
        Ok(best)
    }

    /// Applicable action with the highest estimated value; ties go to the
    /// earliest action in catalog order
    pub fn greedy_action<E>(&mut self, env: &E, state: &E::State) -> Result<ActionId>
    where
        E: Env + ?Sized,
    {
        let actions = Self::applicable(env, state)?;
        self.best_of(state, &actions)
    }

    /// Greedy action with probability `1 - epsilon`, otherwise a uniformly
    /// random applicable action. The two decisions use independent draws.
    pub fn egreedy_action<E>(&mut self, env: &E, state: &E::State) -> Result<ActionId>
    where
        E: Env + ?Sized,
    {
        let actions = Self::applicable(env, state)?;
        let best = self.best_of(state, &actions)?;
        if self.rng.gen::<f64>() >= self.config.epsilon {
            return Ok(best);
        }
        Ok(actions[self.rng.gen_range(0..actions.len())])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile_coding::{TileCoding, Tiling};
    use approx::assert_relative_eq;
    use std::collections::HashMap;
    use tilerl_core::{Action, EnvOutcome, VectorState};

    /// Chain of `len` cells; "next" moves right, the last cell is terminal
    /// and offers no action. Entering it pays `goal`, every other step `reward`.
    struct Chain {
        pos: usize,
        len: usize,
        reward: f64,
        goal: f64,
        actions: Vec<Action>,
        outcomes: Vec<VectorState>,
    }

    impl Chain {
        fn new(len: usize, reward: f64, actions: Vec<Action>) -> Self {
            Self {
                pos: 0,
                len,
                reward,
                goal: reward,
                actions,
                outcomes: Vec::new(),
            }
        }

        fn with_goal(mut self, goal: f64) -> Self {
            self.goal = goal;
            self
        }
    }

    impl Env for Chain {
        type State = VectorState;

        fn curr_obs(&self) -> VectorState {
            VectorState::new(vec![self.pos as f64])
        }

        fn actions(&self) -> &[Action] {
            &self.actions
        }

        fn is_applicable(&self, _action: &Action, state: &VectorState) -> bool {
            (state.data[0] as usize) + 1 < self.len
        }

        fn exec_act(&mut self, action: ActionId) -> Result<EnvOutcome<VectorState>> {
            let from = self.curr_obs();
            if self.action(action)?.name() == "next" {
                self.pos += 1;
            }
            let to = self.curr_obs();
            self.outcomes.push(to.clone());
            let reward = self.last_reward();
            Ok(EnvOutcome::new(from, action, Some(to), reward, self.is_terminal()))
        }

        fn last_reward(&self) -> f64 {
            if self.is_terminal() {
                self.goal
            } else {
                self.reward
            }
        }

        fn is_terminal(&self) -> bool {
            self.pos + 1 >= self.len
        }

        fn reset_env(&mut self) -> Result<()> {
            self.pos = 0;
            Ok(())
        }
    }

    fn fa() -> LinearFA {
        let mut tc = TileCoding::with_seed(1);
        tc.add_tiling(&[true], &[1.0], 1).unwrap();
        LinearFA::new(tc)
    }

    // single fixed tiling, so tests control which cells share a tile
    fn fixed_fa(width: f64, offset: f64) -> LinearFA {
        let mut tc = TileCoding::with_seed(0);
        tc.tilings.push(Tiling::new(vec![width], vec![offset], vec![true]).unwrap());
        tc.tile_ids.push(HashMap::new());
        LinearFA::new(tc)
    }

    fn traced_config(replace_traces: bool) -> SarsaConfig {
        SarsaConfig {
            alpha: 0.5,
            lambda: 0.9,
            gamma: 0.95,
            epsilon: 0.0,
            min_trace: 0.01,
            replace_traces,
            default_weight: 0.0,
        }
    }

    fn q(agent: &mut GDSarsaLambda, x: f64) -> f64 {
        agent.vfa_mut().evaluate(&VectorState::new(vec![x]), ActionId(0)).unwrap()
    }

    fn greedy_config() -> SarsaConfig {
        SarsaConfig {
            alpha: 0.5,
            lambda: 0.0,
            gamma: 1.0,
            epsilon: 0.0,
            min_trace: 0.01,
            replace_traces: true,
            default_weight: 0.0,
        }
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(SarsaConfig::default().validate().is_ok());
        for bad in [
            SarsaConfig { alpha: -0.1, ..SarsaConfig::default() },
            SarsaConfig { lambda: 1.5, ..SarsaConfig::default() },
            SarsaConfig { gamma: f64::NAN, ..SarsaConfig::default() },
            SarsaConfig { epsilon: -1.0, ..SarsaConfig::default() },
            SarsaConfig { min_trace: f64::INFINITY, ..SarsaConfig::default() },
        ] {
            assert!(matches!(bad.validate(), Err(RLError::InvalidConfig(_))));
        }
    }

    #[test]
    fn test_episode_matches_env_outcomes() {
        let mut env = Chain::new(4, -1.0, vec![Action::new("next", 0)]);
        let mut agent = GDSarsaLambda::with_seed(greedy_config(), fa(), 0).unwrap();
        let ep = agent.run_learning(&mut env, None).unwrap();

        assert_eq!(ep.num_steps(), 3);
        assert_eq!(ep.states().len(), 4);
        assert_eq!(ep.rewards().len(), 3);
        for (i, to) in env.outcomes.iter().enumerate() {
            assert_eq!(&ep.states()[i + 1], to);
        }
        assert_eq!(agent.current_step(), 3);
    }

    #[test]
    fn test_single_step_td_update() {
        // one transition straight into the terminal cell: w += alpha * (r - 0)
        let mut env = Chain::new(2, 2.0, vec![Action::new("next", 0)]);
        let mut agent = GDSarsaLambda::with_seed(greedy_config(), fa(), 0).unwrap();
        agent.run_learning(&mut env, None).unwrap();

        let start = VectorState::new(vec![0.0]);
        let q = agent.vfa_mut().evaluate(&start, ActionId(0)).unwrap();
        assert_relative_eq!(q, 0.5 * 2.0);
    }

    #[test]
    fn test_step_budget() {
        let mut env = Chain::new(100, -1.0, vec![Action::new("next", 0)]);
        let mut agent = GDSarsaLambda::with_seed(greedy_config(), fa(), 0).unwrap();
        let ep = agent.run_learning(&mut env, Some(5)).unwrap();
        assert_eq!(ep.num_steps(), 5);
        assert!(!env.is_terminal());

        let ep = agent.run_learning(&mut env, Some(0)).unwrap();
        assert_eq!(ep.num_steps(), 0);
    }

    #[test]
    fn test_greedy_ties_follow_catalog_order() {
        let env = Chain::new(3, 0.0, vec![Action::new("stay", 0), Action::new("next", 1)]);
        let mut agent = GDSarsaLambda::with_seed(greedy_config(), fa(), 0).unwrap();
        let s = env.curr_obs();
        assert_eq!(agent.greedy_action(&env, &s).unwrap(), ActionId(0));

        let g = agent.vfa_mut().gradient(&s, ActionId(1)).unwrap();
        for id in g.keys() {
            agent.vfa_mut().set_weight(*id, 1.0);
        }
        assert_eq!(agent.greedy_action(&env, &s).unwrap(), ActionId(1));
    }

    #[test]
    fn test_full_exploration_visits_every_action() {
        let env = Chain::new(3, 0.0, vec![Action::new("stay", 0), Action::new("next", 1)]);
        let config = SarsaConfig {
            epsilon: 1.0,
            ..greedy_config()
        };
        let mut agent = GDSarsaLambda::with_seed(config, fa(), 42).unwrap();
        let s = env.curr_obs();
        let picks: Vec<_> = (0..200).map(|_| agent.egreedy_action(&env, &s).unwrap()).collect();
        assert!(picks.contains(&ActionId(0)));
        assert!(picks.contains(&ActionId(1)));
    }

    #[test]
    fn test_no_applicable_action_fails_fast() {
        let mut env = Chain::new(3, 0.0, Vec::new());
        let mut agent = GDSarsaLambda::with_seed(greedy_config(), fa(), 0).unwrap();
        let err = agent.run_learning(&mut env, None).unwrap_err();
        assert!(matches!(err, RLError::NoApplicableActions { .. }));
    }

    #[test]
    fn test_terminal_start_needs_no_action() {
        let mut env = Chain::new(3, 0.0, vec![Action::new("next", 0)]);
        let mut agent = GDSarsaLambda::with_seed(greedy_config(), fa(), 0).unwrap();
        assert_eq!(agent.run_learning(&mut env, None).unwrap().num_steps(), 2);
        assert!(env.applicable_actions(&env.curr_obs()).is_empty());

        let ep = agent.run_learning(&mut env, None).unwrap();
        assert_eq!(ep.num_steps(), 0);
        assert_eq!(ep.states(), &[VectorState::new(vec![2.0])]);

        let mut empty = Chain::new(3, 0.0, Vec::new());
        assert_eq!(agent.run_learning(&mut empty, Some(0)).unwrap().num_steps(), 0);
    }

    #[test]
    fn test_td_error_reaches_earlier_traces() {
        // cells 0 and 1 fall in different tiles
        let mut env = Chain::new(3, 0.0, vec![Action::new("next", 0)]).with_goal(10.0);
        let mut agent = GDSarsaLambda::with_seed(traced_config(true), fixed_fa(1.0, -0.5), 0).unwrap();
        agent.run_learning(&mut env, None).unwrap();

        assert_relative_eq!(q(&mut agent, 1.0), 0.5 * 10.0, epsilon = 1e-12);
        assert_relative_eq!(q(&mut agent, 0.0), 0.5 * 10.0 * 0.9 * 0.95, epsilon = 1e-12);
    }

    #[test]
    fn test_replacing_and_accumulating_traces_in_the_loop() {
        // cells 0 and 1 share one tile, so the second step revisits its trace
        for (replace, expected) in [(true, 5.0), (false, 0.5 * 10.0 * (1.0 + 0.9 * 0.95))] {
            let mut env = Chain::new(3, 0.0, vec![Action::new("next", 0)]).with_goal(10.0);
            let mut agent =
                GDSarsaLambda::with_seed(traced_config(replace), fixed_fa(10.0, -5.0), 0).unwrap();
            agent.run_learning(&mut env, None).unwrap();

            assert_relative_eq!(q(&mut agent, 0.0), expected, epsilon = 1e-12);
            assert_relative_eq!(q(&mut agent, 1.0), expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_non_finite_reward_is_rejected() {
        let mut env = Chain::new(3, f64::NAN, vec![Action::new("next", 0)]);
        let mut agent = GDSarsaLambda::with_seed(greedy_config(), fa(), 0).unwrap();
        assert!(matches!(
            agent.run_learning(&mut env, None),
            Err(RLError::NonFinite(_))
        ));
    }
}
