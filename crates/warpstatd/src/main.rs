//! warpstatd — the warpstat exporter daemon.
//!
//! Assembles the exporter:
//! - HTTP stats provider
//! - Snapshot store + export registry
//! - Poller
//! - `/metrics` and `/healthz`
//!
//! # Usage
//!
//! ```text
//! warpstatd run --config /etc/warpstat/warpstat.toml --port 9216
//! warpstatd check-config --config /etc/warpstat/warpstat.toml
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::{info, warn};

use warpstat_core::ExporterConfig;
use warpstat_metrics::{CATALOG, ExportRegistry};
use warpstat_poller::Poller;
use warpstat_provider::HttpStatsProvider;
use warpstat_state::SnapshotStore;

#[derive(Parser)]
#[command(name = "warpstatd", about = "warpstat exporter daemon")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Poll the provider and serve metrics until interrupted.
    Run {
        /// Path to warpstat.toml. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Port to serve /metrics and /healthz on.
        #[arg(long)]
        port: Option<u16>,

        /// Provider address, host:port.
        #[arg(long)]
        address: Option<String>,

        /// Poll interval, e.g. "5s".
        #[arg(long)]
        interval: Option<String>,

        /// Provider request timeout, e.g. "2s".
        #[arg(long)]
        timeout: Option<String>,
    },

    /// Parse and validate a config file, then print the effective config.
    CheckConfig {
        #[arg(long)]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    match cli.command {
        Command::Run {
            config,
            port,
            address,
            interval,
            timeout,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(address) = address {
                config.provider.address = address;
            }
            if let Some(interval) = interval {
                config.poll.interval = interval;
            }
            if let Some(timeout) = timeout {
                config.poll.timeout = timeout;
            }
            run(config).await
        }
        Command::CheckConfig { config } => {
            let config = load_config(Some(config.as_path()))?;
            config.validate()?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,warpstat=debug,warpstatd=debug"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<ExporterConfig> {
    match path {
        Some(path) => ExporterConfig::from_file(path)
            .with_context(|| format!("failed to load {}", path.display())),
        None => Ok(ExporterConfig::default()),
    }
}

async fn run(config: ExporterConfig) -> anyhow::Result<()> {
    let settings = config.validate()?;
    info!(
        address = %config.provider.address,
        port = config.server.port,
        namespace = %config.server.namespace,
        "warpstat exporter starting"
    );

    // ── Initialize subsystems ──────────────────────────────────

    let exports = Arc::new(ExportRegistry::new(
        &config.server.namespace,
        CATALOG,
        SnapshotStore::new(),
    )?);
    let provider = Arc::new(HttpStatsProvider::from_config(&config.provider));
    let poller = Arc::new(Poller::new(provider, exports.clone(), settings));

    // A failed handshake is fatal.
    poller.connect().await?;

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Start poll loop ────────────────────────────────────────

    let poll_handle = {
        let poller = poller.clone();
        tokio::spawn(async move {
            poller.run(shutdown_rx).await;
        })
    };

    // ── Start HTTP server ──────────────────────────────────────

    let router = warpstat_api::build_router(exports);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "metrics server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install CTRL+C handler");
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
        })
        .await?;

    // Give an in-flight cycle a bounded chance to finish.
    let abort = poll_handle.abort_handle();
    if tokio::time::timeout(settings.shutdown_grace, poll_handle)
        .await
        .is_err()
    {
        warn!(
            grace_ms = settings.shutdown_grace.as_millis() as u64,
            "poll cycle still running after grace period, aborting"
        );
        abort.abort();
    }

    info!("warpstat exporter stopped");
    Ok(())
}
