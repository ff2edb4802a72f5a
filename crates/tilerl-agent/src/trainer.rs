//! Episode loop around a [`GDSarsaLambda`] learner

use std::ops::Range;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use tilerl_core::{Env, Result};

use crate::config::{build_tile_coding, TilingSpec, TrainingConfig};
use crate::linear_fa::LinearFA;
use crate::sarsa::GDSarsaLambda;

/// Summary of one training episode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeStats {
    /// Episode index, from 0
    pub episode: usize,
    /// Transitions taken
    pub steps: usize,
    /// Undiscounted reward sum
    pub total_reward: f64,
    /// Return discounted with the learner's gamma
    pub discounted_return: f64,
    /// Whether the environment reached a terminal state
    pub terminated: bool,
    /// Exploration rate used
    pub epsilon: f64,
    /// Wall-clock end of the episode
    pub finished_at: DateTime<Utc>,
}

/// Result of a training run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Per-episode statistics, in order
    pub episodes: Vec<EpisodeStats>,
    /// Wall-clock start of the run
    pub started_at: DateTime<Utc>,
    /// State-action ids minted by the end of the run
    pub num_features: usize,
    /// Weights materialized by the end of the run
    pub num_params: usize,
}

impl TrainingReport {
    fn window(&self, range: Range<usize>) -> &[EpisodeStats] {
        let end = range.end.min(self.episodes.len());
        let start = range.start.min(end);
        &self.episodes[start..end]
    }

    /// Mean episode length over `range`, `None` when it is empty
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_steps(&self, range: Range<usize>) -> Option<f64> {
        let w = self.window(range);
        if w.is_empty() {
            return None;
        }
        Some(w.iter().map(|e| e.steps as f64).sum::<f64>() / w.len() as f64)
    }

    /// Mean undiscounted reward over `range`, `None` when it is empty
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_reward(&self, range: Range<usize>) -> Option<f64> {
        let w = self.window(range);
        if w.is_empty() {
            return None;
        }
        Some(w.iter().map(|e| e.total_reward).sum::<f64>() / w.len() as f64)
    }

    /// Number of episodes that reached a terminal state
    pub fn terminated_count(&self) -> usize {
        self.episodes.iter().filter(|e| e.terminated).count()
    }
}

/// Build a learner for `config`, using `preset` tilings when the config
/// names none
pub fn agent_from_config(config: &TrainingConfig, preset: &[TilingSpec]) -> Result<GDSarsaLambda> {
    config.validate()?;
    let specs = if config.tilings.is_empty() {
        preset
    } else {
        &config.tilings
    };
    let tc = build_tile_coding(specs, config.seed)?;
    let vfa = LinearFA::with_default_weight(tc, config.sarsa.default_weight);
    match config.seed {
        Some(seed) => GDSarsaLambda::with_seed(config.sarsa.clone(), vfa, seed.wrapping_add(1)),
        None => GDSarsaLambda::new(config.sarsa.clone(), vfa),
    }
}

/// Runs learning episodes back to back
#[derive(Debug, Clone)]
pub struct Trainer {
    config: TrainingConfig,
}

impl Trainer {
    /// Create a trainer; the configuration is validated here
    pub fn new(config: TrainingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Run configuration
    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    /// Train `agent` on `env` for the configured number of episodes.
    ///
    /// The environment is reset before every episode.
    pub fn train<R, E>(&self, agent: &mut GDSarsaLambda<R>, env: &mut E) -> Result<TrainingReport>
    where
        R: Rng,
        E: Env + ?Sized,
    {
        let schedule = self.config.epsilon_schedule.build(agent.config().epsilon);
        let gamma = agent.config().gamma;
        let started_at = Utc::now();
        let mut episodes = Vec::with_capacity(self.config.episodes);

        info!(
            "Training for {} episodes (max_steps: {:?})",
            self.config.episodes, self.config.max_steps
        );
        for episode in 0..self.config.episodes {
            env.reset_env()?;
            agent.set_epsilon(schedule.value(episode));

            let ep = agent.run_learning(env, self.config.max_steps)?;
            let terminated = env.is_terminal();
            if !terminated {
                debug!(episode, steps = ep.num_steps(), "episode truncated by step budget");
            }
            episodes.push(EpisodeStats {
                episode,
                steps: ep.num_steps(),
                total_reward: ep.total_reward(),
                discounted_return: ep.discounted_return(gamma),
                terminated,
                epsilon: agent.config().epsilon,
                finished_at: Utc::now(),
            });

            if (episode + 1) % self.config.log_interval == 0 {
                let from = (episode + 1).saturating_sub(self.config.log_interval);
                let recent = &episodes[from..];
                #[allow(clippy::cast_precision_loss)]
                let mean_steps =
                    recent.iter().map(|e| e.steps as f64).sum::<f64>() / recent.len() as f64;
                info!(
                    "Episode {}/{}: mean steps {:.1}, last reward {:.2}, features {}",
                    episode + 1,
                    self.config.episodes,
                    mean_steps,
                    ep.total_reward(),
                    agent.vfa().features().num_ids()
                );
            }
        }

        Ok(TrainingReport {
            episodes,
            started_at,
            num_features: agent.vfa().features().num_ids(),
            num_params: agent.vfa().num_param(),
        })
    }
}
