use clap::Parser;
use scele_task_sync::{run_once, tasks, Config, RunSummary, SyncError};
use std::path::{Path, PathBuf};
use tokio::time::{Duration, MissedTickBehavior};
use tracing::{error, info};
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;

/// Sync upcoming SCeLE assignment deadlines into a task list.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON file with credentials, exclusions and task backend
    #[arg(short, long, default_value = "scele_config.json")]
    config: PathBuf,

    /// Run a single sync and exit
    #[arg(long)]
    once: bool,

    /// Hours between two syncs
    #[arg(long, default_value_t = 24, value_parser = clap::value_parser!(u64).range(1..))]
    interval_hours: u64,
}

async fn sync(config_path: &Path) -> Result<RunSummary, SyncError> {
    info!("Starting fetch...");
    let config = Config::load(config_path).await?;
    let service = tasks::connect(&config.tasks).await?;
    let summary = run_once(&config, service.as_ref()).await?;
    info!(
        "Sync done: {} tasks extracted, {} created",
        summary.extracted, summary.created
    );
    Ok(summary)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| {
                "debug,html5ever=error,selectors=error,hyper=warn,reqwest=info,sqlx=warn".into()
            }),
        )
        .with(ErrorLayer::default())
        .init();

    let args = Args::parse();

    if args.once {
        sync(&args.config).await?;
        return Ok(());
    }

    let mut interval = tokio::time::interval(Duration::from_secs(args.interval_hours * 3600));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        interval.tick().await;
        // A failed run is retried as a whole on the next tick.
        if let Err(e) = sync(&args.config).await {
            error!("Sync failed: {}", e);
        }
    }
}
