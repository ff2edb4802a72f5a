// Command implementations for tilerlctl

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use tilerl_agent::{agent_from_config, persist, GDSarsaLambda, SarsaConfig, Trainer, TrainingConfig};
use tilerl_core::Env;
use tilerl_env::make_env;

use crate::presets::tilings_for;

pub async fn train(
    env_name: &str,
    config_path: Option<PathBuf>,
    episodes: Option<usize>,
    seed: Option<u64>,
    output: &Path,
    report_path: Option<PathBuf>,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => TrainingConfig::from_file(&path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => TrainingConfig::default(),
    };
    if let Some(episodes) = episodes {
        config.episodes = episodes;
    }
    if seed.is_some() {
        config.seed = seed;
    }

    println!("Training on {env_name}");
    println!("   Episodes: {}", config.episodes);
    println!("   Max steps: {:?}", config.max_steps);
    println!("   Seed: {:?}", config.seed);

    let mut env = make_env(env_name, config.seed)?;
    let mut agent = agent_from_config(&config, &tilings_for(env_name))?;
    let report = Trainer::new(config)?.train(&mut agent, env.as_mut())?;

    persist::save(agent.vfa(), output).await?;
    if let Some(path) = report_path {
        tokio::fs::write(&path, serde_json::to_string_pretty(&report)?)
            .await
            .with_context(|| format!("Failed to write report {}", path.display()))?;
    }

    let n = report.episodes.len();
    let tail = n.saturating_sub(10)..n;
    println!("\nTraining completed");
    println!("   Terminated episodes: {}/{}", report.terminated_count(), n);
    if let Some(mean) = report.mean_steps(tail.clone()) {
        println!("   Mean steps (last {}): {:.1}", tail.len(), mean);
    }
    println!("   Features: {}", report.num_features);
    println!("   Weights: {}", report.num_params);
    println!("   Model: {}", output.display());
    Ok(())
}

pub async fn eval(
    env_name: &str,
    model: &Path,
    episodes: usize,
    max_steps: usize,
    seed: Option<u64>,
) -> Result<()> {
    let vfa = persist::load(model)
        .await
        .with_context(|| format!("Failed to load model {}", model.display()))?;
    let config = SarsaConfig {
        epsilon: 0.0,
        ..SarsaConfig::default()
    };
    let mut agent = GDSarsaLambda::with_seed(config, vfa, seed.unwrap_or_default())?;
    let mut env = make_env(env_name, seed)?;

    let mut total_steps = 0;
    let mut reached = 0;
    for i in 0..episodes {
        env.reset_env()?;
        let ep = agent.run_policy(env.as_mut(), Some(max_steps))?;
        let done = env.is_terminal();
        if done {
            reached += 1;
        }
        total_steps += ep.num_steps();
        println!(
            "Episode {:>3}: {:>5} steps, reward {:>8.1}{}",
            i + 1,
            ep.num_steps(),
            ep.total_reward(),
            if done { "" } else { " (truncated)" }
        );
    }
    if episodes > 0 {
        #[allow(clippy::cast_precision_loss)]
        let mean = total_steps as f64 / episodes as f64;
        println!("\nReached terminal state in {reached}/{episodes} episodes, mean {mean:.1} steps");
    }
    Ok(())
}

pub async fn inspect(model: &Path) -> Result<()> {
    let vfa = persist::load(model)
        .await
        .with_context(|| format!("Failed to load model {}", model.display()))?;
    let features = vfa.features();
    let tc = features.state_features();

    println!("Model: {}", model.display());
    println!("   Tilings: {}", tc.num_tilings());
    for (i, tiling) in tc.tilings().iter().enumerate() {
        println!(
            "     [{i}] widths {:?} mask {:?}",
            tiling.widths(),
            tiling.dimension_mask()
        );
    }
    println!("   State features: {}", tc.num_features());
    println!("   State-action features: {}", features.num_ids());
    for (action, map) in features.action_features() {
        println!("     action {action}: {} features", map.len());
    }
    println!("   Weights: {} (default {})", vfa.num_param(), vfa.default_weight());

    let (mut min, mut max, mut sum) = (f64::INFINITY, f64::NEG_INFINITY, 0.0);
    for (_, w) in vfa.weights() {
        min = min.min(w);
        max = max.max(w);
        sum += w;
    }
    if vfa.num_param() > 0 {
        #[allow(clippy::cast_precision_loss)]
        let mean = sum / vfa.num_param() as f64;
        println!("   Weight range: [{min:.4}, {max:.4}], mean {mean:.4}");
    }
    Ok(())
}
