use chrono::Utc;
use clap::Parser;
use scele_task_sync::{collect_tasks, scele::Session, sync_status, Config};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// List upcoming SCeLE tasks and whether a sync would create them.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON file with credentials and exclusions
    #[arg(short, long, default_value = "scele_config.json")]
    config: PathBuf,
}

async fn show_tasks(config_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load(config_path).await?;
    let session = Session::login(&config.base_url, &config.credentials).await?;
    let tasks = collect_tasks(&session, &config.rules).await?;

    // No task service is read, so only past-due and excluded tasks are skipped.
    let status = sync_status(&tasks, &HashSet::new(), Utc::now());
    for (task, would_sync) in tasks.iter().zip(&status) {
        print!("{}", task);
        println!("Would sync      : {}\n", if *would_sync { "yes" } else { "no" });
    }

    let eligible = status.iter().filter(|s| **s).count();
    println!("{} of {} task(s) eligible for sync", eligible, tasks.len());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("LOG_LEVEL")
                .unwrap_or_else(|_| "info,html5ever=error,selectors=error".into()),
        )
        .init();

    let args = Args::parse();
    show_tasks(&args.config).await
}
