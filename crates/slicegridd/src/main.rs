//! slicegridd: the SliceGrid driver.
//!
//! Assembles the scheduling core in one process:
//! - Scheduler cache (in memory, clusters from slicegrid.toml)
//! - Scoring fit algorithm
//! - Placement engine
//!
//! and feeds it a plan of requests, printing one JSON outcome per line.
//!
//! # Usage
//!
//! ```text
//! slicegridd run --config slicegrid.toml --plan requests.json
//! slicegridd check --config slicegrid.toml
//! ```

mod config;
mod plan;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::json;
use slicegrid_engine::Engine;
use slicegrid_placement::ScoringFit;
use slicegrid_state::InMemoryCache;
use tracing::{info, warn};

use crate::config::DriverConfig;

#[derive(Parser)]
#[command(name = "slicegridd", about = "SliceGrid placement driver")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a plan of scheduling requests against a fresh cache.
    Run {
        /// Cluster and scoring configuration.
        #[arg(long, default_value = "slicegrid.toml")]
        config: PathBuf,

        /// JSON list of requests.
        #[arg(long)]
        plan: PathBuf,

        /// Print the final namespaces and pods after the plan completes.
        #[arg(long)]
        dump_state: bool,
    },
    /// Validate a configuration file and list its clusters.
    Check {
        #[arg(long, default_value = "slicegrid.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,slicegrid=debug".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            config,
            plan,
            dump_state,
        } => run(config, plan, dump_state).await,
        Command::Check { config } => check(config),
    }
}

async fn run(config_path: PathBuf, plan_path: PathBuf, dump_state: bool) -> anyhow::Result<()> {
    let config = DriverConfig::from_file(&config_path)?;
    let requests = plan::load(&plan_path)?;

    let cache = InMemoryCache::new();
    for cluster in &config.clusters {
        cache.add_cluster(cluster.to_cluster());
    }
    let engine = Engine::new(
        Arc::new(cache.clone()),
        Arc::new(ScoringFit::new(config.scoring.clone())),
    );
    info!(
        clusters = config.clusters.len(),
        requests = requests.len(),
        "running plan"
    );

    let outcomes = plan::run(&engine, &requests).await;
    let failed = outcomes.iter().filter(|o| !o.ok).count();
    for outcome in &outcomes {
        println!("{}", serde_json::to_string(outcome)?);
    }

    if dump_state {
        let state = json!({
            "namespaces": cache.namespaces(),
            "pods": cache.pods(),
        });
        println!("{}", serde_json::to_string_pretty(&state)?);
    }

    if failed > 0 {
        warn!(failed, total = outcomes.len(), "plan finished with failures");
    } else {
        info!(total = outcomes.len(), "plan finished");
    }
    Ok(())
}

fn check(config_path: PathBuf) -> anyhow::Result<()> {
    let config = DriverConfig::from_file(&config_path)?;
    for cluster in &config.clusters {
        println!(
            "{}\tcpu_millis={}\tmemory_bytes={}",
            cluster.id, cluster.cpu_millis, cluster.memory_bytes
        );
    }
    info!(
        path = %config_path.display(),
        clusters = config.clusters.len(),
        "configuration is valid"
    );
    Ok(())
}
