//! Reconciler - escalation sweeps over persisted governance state.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ledger::SystemClock;
use reconciler::{EscalationWorker, GovernanceState, JsonFileStore, ReconcilerConfig};

/// Background reconciler for disclosure deadlines and reputation decay
#[derive(Parser, Debug, Clone)]
#[command(name = "reconciler")]
#[command(about = "Escalates overdue disclosure requests and decays reputation")]
struct Args {
    /// YAML configuration file
    #[arg(long, env = "RECONCILER_CONFIG")]
    config: Option<PathBuf>,

    /// JSON snapshot file (overrides general.store_path)
    #[arg(long, env = "RECONCILER_STORE")]
    store: Option<PathBuf>,

    /// Run a single sweep and exit
    #[arg(long, env = "RECONCILER_ONCE", default_value = "false")]
    once: bool,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<ReconcilerConfig> {
    match path {
        Some(path) => {
            let yaml = std::fs::read_to_string(path)
                .with_context(|| format!("reading config {}", path.display()))?;
            Ok(ReconcilerConfig::from_yaml(&yaml)?)
        }
        None => Ok(ReconcilerConfig::default()),
    }
}

fn init_tracing(config: &ReconcilerConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "reconciler={level},ledger={level},scoring={level},warn",
            level = config.general.log_level
        )
        .into()
    });

    let json = config.general.json_logs;
    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;
    init_tracing(&config);

    let store_path = args
        .store
        .clone()
        .or_else(|| config.general.store_path.clone().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("reconciler-state.json"));

    info!(
        store = %store_path.display(),
        interval_secs = config.worker.sweep_interval_secs,
        threshold = config.worker.escalation_threshold,
        once = args.once,
        "Starting reconciler"
    );

    let store = Arc::new(JsonFileStore::open(&store_path).await?);
    let state = match GovernanceState::bootstrap(store, Arc::new(SystemClock)).await {
        Ok(state) => Arc::new(state.with_moral_weights(config.scoring.moral_weights)),
        Err(e) => {
            error!(error = %e, "Bootstrap failed");
            return Err(e.into());
        }
    };

    let worker = Arc::new(EscalationWorker::new(state, config.worker.clone()));

    if args.once {
        let report = worker.sweep().await?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let mut handle = match Arc::clone(&worker).start().await {
        Some(handle) => handle,
        None => anyhow::bail!("worker already running"),
    };

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result.context("listening for shutdown signal")?;
            info!("Shutdown signal received");
        }
        result = &mut handle => {
            result.context("worker task panicked")?;
            anyhow::bail!("worker stopped unexpectedly");
        }
    }

    worker.stop().await;
    handle.await.context("worker task panicked")?;

    Ok(())
}
