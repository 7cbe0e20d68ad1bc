use chrono::Utc;
use scraper::Html;
use tracing::info;

pub mod dom;
pub mod scele;
pub mod tasks;

mod config;
mod error;
mod reconcile;
mod utils;

pub use config::{Config, Credentials, ExclusionRules, TasksConfig, DEFAULT_BASE_URL};
pub use error::SyncError;
pub use reconcile::{reconcile, sync_status, NewTask, SyncAction};
pub use utils::{deadline_from_epoch, portal_offset};

use scele::{Session, Task};
use tasks::TaskService;

/// Extraction of one kind of portal page.
pub trait Scraper {
    type Output;

    fn scrape(&self, doc: &Html) -> Result<Self::Output, SyncError>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub extracted: usize,
    pub created: usize,
}

/// Lists the calendar and extracts every surviving event, one request at a
/// time.
pub async fn collect_tasks(
    session: &Session,
    rules: &ExclusionRules,
) -> Result<Vec<Task>, SyncError> {
    let mut tasks = vec![];
    for reference in scele::list_upcoming_events(session, rules).await? {
        tasks.push(scele::extract_task(session, &reference, rules).await?);
    }
    Ok(tasks)
}

/// One full sync: read what the task service already has, log in, scrape,
/// reconcile and create the missing tasks. Stops at the first error.
pub async fn run_once<S>(config: &Config, service: &S) -> Result<RunSummary, SyncError>
where
    S: TaskService + ?Sized,
{
    let existing = service.existing_notes().await?;
    info!("{} tasks already synced", existing.len());

    let session = Session::login(&config.base_url, &config.credentials).await?;
    let tasks = collect_tasks(&session, &config.rules).await?;
    let extracted = tasks.len();

    let mut created = 0;
    for action in reconcile(tasks, &existing, Utc::now()) {
        match action {
            SyncAction::Create(task) => {
                service.create_task(&task).await?;
                info!("Created task {:?}", task.title);
                created += 1;
            }
        }
    }

    Ok(RunSummary { extracted, created })
}
