// tilerl control CLI
// Train, evaluate and inspect tile-coded SARSA(lambda) models

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod presets;

#[derive(Parser)]
#[command(name = "tilerlctl")]
#[command(about = "tilerl control CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model on an environment
    Train {
        /// Environment name (see `tilerlctl envs`)
        #[arg(short, long, default_value = "mountain-car")]
        env: String,

        /// JSON training configuration
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the number of episodes
        #[arg(long)]
        episodes: Option<usize>,

        /// Override the seed
        #[arg(long)]
        seed: Option<u64>,

        /// Where to write the trained model
        #[arg(short, long, default_value = "model.json")]
        output: PathBuf,

        /// Also write per-episode statistics as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Run the greedy policy of a saved model
    Eval {
        /// Environment name
        #[arg(short, long, default_value = "mountain-car")]
        env: String,

        /// Saved model
        #[arg(short, long, default_value = "model.json")]
        model: PathBuf,

        /// Number of episodes
        #[arg(long, default_value = "10")]
        episodes: usize,

        /// Step budget per episode
        #[arg(long, default_value = "1000")]
        max_steps: usize,

        /// Seed for the environment
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Summarize a saved model
    Inspect {
        /// Saved model
        model: PathBuf,
    },

    /// List built-in environments
    Envs,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            env,
            config,
            episodes,
            seed,
            output,
            report,
        } => {
            commands::train(&env, config, episodes, seed, &output, report).await?;
        }

        Commands::Eval {
            env,
            model,
            episodes,
            max_steps,
            seed,
        } => {
            commands::eval(&env, &model, episodes, max_steps, seed).await?;
        }

        Commands::Inspect { model } => {
            commands::inspect(&model).await?;
        }

        Commands::Envs => {
            for name in tilerl_env::list_envs() {
                println!("{name}");
            }
        }
    }

    Ok(())
}
