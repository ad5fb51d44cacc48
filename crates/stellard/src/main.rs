//! stellard — the Stellar fleet daemon.
//!
//! Single binary that assembles the monitoring subsystems:
//! - Node registry and metric history
//! - Sampler (periodic random-walk metrics)
//! - Status evaluator and fleet health report
//! - Auto-scaling controller
//!
//! # Usage
//!
//! ```text
//! stellard init --output stellar.toml
//! stellard check --config stellar.toml
//! stellard run --config stellar.toml --summary-every 12
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use stellar_core::StellarConfig;
use stellar_metrics::FleetMonitor;

#[derive(Parser)]
#[command(name = "stellard", about = "Stellar fleet monitor daemon")]
struct Cli {
    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Run the sampler until interrupted.
    Run {
        /// Config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Log a fleet summary every N ticks (0 disables).
        #[arg(long, default_value = "12")]
        summary_every: u32,
    },
    /// Write a scaffold config with the sample fleet.
    Init {
        #[arg(long, default_value = "stellar.toml")]
        output: PathBuf,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
    /// Validate a config and print the bootstrap fleet as JSON.
    Check {
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Run {
            config,
            summary_every,
        } => run(config.as_deref(), summary_every).await,
        Command::Init { output, force } => init(&output, force),
        Command::Check { config } => check(config.as_deref()).await,
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,stellard=debug,stellar=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<StellarConfig> {
    match path {
        Some(path) => StellarConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(StellarConfig::default()),
    }
}

async fn run(config: Option<&Path>, summary_every: u32) -> anyhow::Result<()> {
    info!("Stellar daemon starting");

    let config = load_config(config)?;
    let monitor = FleetMonitor::from_config(&config)?;
    info!(
        nodes = monitor.list_nodes().await.len(),
        interval_ms = monitor.interval().as_millis() as u64,
        "fleet monitor initialized"
    );

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reporter_shutdown = shutdown_rx.clone();

    // ── Background tasks ───────────────────────────────────────

    let mut sampler = monitor.sampler();
    let sampler_handle = tokio::spawn(async move {
        sampler.run(shutdown_rx).await;
    });

    let reporter_handle = (summary_every > 0).then(|| {
        let monitor = monitor.clone();
        let period = monitor.interval().saturating_mul(summary_every);
        tokio::spawn(report_loop(monitor, period, reporter_shutdown))
    });

    tokio::signal::ctrl_c()
        .await
        .context("installing Ctrl-C handler")?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    let _ = sampler_handle.await;
    if let Some(handle) = reporter_handle {
        let _ = handle.await;
    }
    monitor.shutdown().await;

    info!("Stellar daemon stopped");
    Ok(())
}

/// Periodically log the fleet summary, health and last scale decision.
async fn report_loop(
    monitor: FleetMonitor,
    period: std::time::Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(period);
    // The first tick is immediate; skip it so the sampler runs first.
    interval.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = interval.tick() => {
                let summary = monitor.summary().await;
                let health = monitor.health().await;
                let decision = monitor.last_scale_decision().await;
                info!(
                    nodes = summary.node_count,
                    online = summary.online_nodes,
                    avg_cpu = summary.avg_cpu,
                    avg_memory = summary.avg_memory,
                    avg_disk = summary.avg_disk,
                    network_mbps = summary.total_network_throughput,
                    connections = summary.total_active_connections,
                    health = ?health.overall,
                    ?decision,
                    "fleet summary"
                );
            }
        }
    }
}

fn init(output: &Path, force: bool) -> anyhow::Result<()> {
    if output.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", output.display());
    }
    let content = StellarConfig::scaffold().to_toml_string()?;
    std::fs::write(output, content)
        .with_context(|| format!("writing {}", output.display()))?;
    info!(path = %output.display(), "scaffold config written");
    Ok(())
}

async fn check(config: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config)?;
    let monitor = FleetMonitor::from_config(&config)?;
    let nodes = monitor.list_nodes().await;
    println!("{}", serde_json::to_string_pretty(&nodes)?);
    info!(nodes = nodes.len(), "config is valid");
    Ok(())
}
