//! Command-line driver: runs a scenario or a TOML configuration and
//! optionally writes the collected history as JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use vicsek_swarm::{scenarios, SimConfig, Simulator};

#[derive(Parser)]
#[command(name = "vicsek")]
#[command(version, about = "Vicsek swarm simulation on a periodic domain", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one simulation
    Run {
        /// Built-in scenario id (see `vicsek list`)
        #[arg(short, long, conflicts_with = "config")]
        scenario: Option<String>,

        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Override the random seed
        #[arg(long)]
        seed: Option<u64>,

        /// Override the simulated duration
        #[arg(long)]
        tmax: Option<f64>,

        /// Write parameters and history as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List built-in scenarios
    List,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    match Cli::parse().command {
        Commands::List => {
            for info in scenarios::scenario_catalog() {
                println!("{:<22} {}", info.id, info.description);
            }
            Ok(())
        }
        Commands::Run { scenario, config, seed, tmax, output } => {
            let mut cfg = match (scenario, config) {
                (_, Some(path)) => SimConfig::load(&path)
                    .with_context(|| format!("failed to load config {}", path.display()))?,
                (Some(id), None) => scenarios::build(&id)?,
                (None, None) => scenarios::build(scenarios::SCENARIO_VICSEK)?,
            };
            if let Some(seed) = seed {
                cfg.seed = seed;
            }
            if let Some(tmax) = tmax {
                cfg.tmax = tmax;
            }
            run(cfg, output)
        }
    }
}

fn run(config: SimConfig, output: Option<PathBuf>) -> Result<()> {
    let parameters = config.parameter_summary()?;
    let out = Simulator::new(config)?.run();

    tracing::info!(
        frames = out.frames.len(),
        food_events = out.food_events.len(),
        extinct_at = ?out.extinct_at,
        "run complete"
    );

    if let Some(path) = output {
        let file = File::create(&path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let document = serde_json::json!({ "parameters": parameters, "output": out });
        serde_json::to_writer(BufWriter::new(file), &document)?;
        tracing::info!(path = %path.display(), "output written");
    }
    Ok(())
}
