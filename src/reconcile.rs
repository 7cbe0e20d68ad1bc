use crate::scele::Task;
use chrono::{DateTime, Duration, FixedOffset, Utc};
use std::collections::HashSet;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub due: DateTime<FixedOffset>,
    /// Sync key of the source task, read back on the next run.
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    Create(NewTask),
}

/// Decides which freshly extracted tasks still have to be created.
///
/// Past-due, excluded and already synced tasks are dropped; the rest become
/// `Create` actions in input order, due one day after their deadline.
pub fn reconcile<I>(fresh: I, existing: &HashSet<String>, now: DateTime<Utc>) -> Vec<SyncAction>
where
    I: IntoIterator<Item = Task>,
{
    fresh
        .into_iter()
        .filter(|task| {
            if task.deadline.with_timezone(&Utc) < now {
                debug!("Task {:?} is past due, skipping...", task.name);
                return false;
            }
            !task.excluded
        })
        .filter_map(|task| {
            let key = task.sync_key();
            if existing.contains(&key) {
                info!("Task {:?} already exists, skipping...", task.name);
                return None;
            }
            Some(SyncAction::Create(NewTask {
                due: task.deadline + Duration::days(1),
                title: task.name,
                notes: key,
            }))
        })
        .collect()
}

/// For each task, whether `reconcile` would create it.
pub fn sync_status(tasks: &[Task], existing: &HashSet<String>, now: DateTime<Utc>) -> Vec<bool> {
    let pending = reconcile(tasks.iter().cloned(), existing, now)
        .into_iter()
        .map(|SyncAction::Create(t)| t.notes)
        .collect::<HashSet<_>>();
    tasks
        .iter()
        .map(|task| pending.contains(&task.sync_key()))
        .collect()
}
