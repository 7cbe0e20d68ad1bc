mod google;
mod sqlite;

pub use google::{GoogleTasks, GOOGLE_TASKS_API};
pub use sqlite::{SqliteTasks, Table, TaskTable};

use crate::{NewTask, SyncError, TasksConfig};
use std::collections::HashSet;

/// Task tracker the sync writes into. Notes are opaque to the tracker and
/// carry the sync key of each created task.
#[async_trait::async_trait]
pub trait TaskService: Send + Sync {
    async fn existing_notes(&self) -> Result<HashSet<String>, SyncError>;
    async fn create_task(&self, task: &NewTask) -> Result<(), SyncError>;
}

pub async fn connect(config: &TasksConfig) -> Result<Box<dyn TaskService>, SyncError> {
    Ok(match config {
        TasksConfig::Google { token_file } => Box::new(GoogleTasks::from_token_file(token_file).await?),
        TasksConfig::Sqlite { name } => Box::new(SqliteTasks::new(name).await?),
    })
}
