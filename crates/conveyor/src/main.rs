// Rust guideline compliant 2026-10-19

//! Bounded-buffer producer-consumer simulation entry point.
//!
//! Loads the configuration, opens the run log, runs the orchestrator until
//! the pipeline drains (or Ctrl-C / SIGTERM interrupts it), then prints the
//! final statistics.
//!
//! # Usage
//!
//! ```text
//! cargo run -- --producers 4 --consumers 2 --items 10
//! cargo run -- --config run.json --quiet
//! ```

mod adapters;
mod config;
mod orchestrator;
mod summary;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use config::PipelineConfig;
use logger::RunLog;
use orchestrator::Orchestrator;

/// Command-line arguments; each one overrides the matching configuration field.
#[derive(Debug, Parser)]
#[command(version, about = "Bounded-buffer producer-consumer simulation")]
struct Cli {
    /// JSON configuration file; missing fields keep their defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of producers
    #[arg(short, long)]
    producers: Option<u32>,

    /// Number of consumers
    #[arg(short = 'c', long)]
    consumers: Option<u32>,

    /// Items generated by each producer
    #[arg(short, long)]
    items: Option<u64>,

    /// Queue capacity
    #[arg(short = 's', long)]
    capacity: Option<usize>,

    /// Stats document path
    #[arg(long)]
    stats_file: Option<PathBuf>,

    /// Run-log file path
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Do not mirror the run log to stdout
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn apply(self, config: &mut PipelineConfig) {
        if let Some(n) = self.producers {
            config.producers = n;
        }
        if let Some(n) = self.consumers {
            config.consumers = n;
        }
        if let Some(n) = self.items {
            config.items_per_producer = n;
        }
        if let Some(n) = self.capacity {
            config.queue_capacity = n;
        }
        if let Some(path) = self.stats_file {
            config.stats_file = path;
        }
        if let Some(path) = self.log_file {
            config.log_file = path;
        }
        if self.quiet {
            config.log_to_console = false;
        }
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
///
/// A handler that cannot be installed never resolves.
async fn interrupt() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Nie można obsłużyć Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!("Nie można obsłużyć SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config =
        PipelineConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    cli.apply(&mut config);
    config.validate().context("invalid configuration")?;

    let log_config = config.run_log_config()?;
    let log = RunLog::open(&log_config).context("failed to open run log")?;

    let report = Orchestrator::new(config, log.clone()).run(interrupt()).await?;
    print!("{}", summary::Summary(&report));

    log.attach(async { tracing::info!("Program zakończył działanie") }).await;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
