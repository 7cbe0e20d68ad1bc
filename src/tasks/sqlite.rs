//! Local task store backed by a SQLite file.
//!
//! The row id is the task's notes, so the sync key of every created task is
//! its primary key.

use super::TaskService;
use crate::{utils, NewTask, SyncError};
use futures::TryStreamExt;
use sqlx::{sqlite::SqliteConnectOptions, Row, SqlitePool};
use std::collections::HashSet;

#[async_trait::async_trait]
pub trait Table {
    type Record<'a>;

    fn get_name(&self) -> &str;
    fn get_pool(&self) -> &SqlitePool;

    async fn create(&self) -> Result<(), sqlx::Error>;
    async fn insert<'a>(&self, record: Self::Record<'a>) -> Result<(), sqlx::Error>;

    async fn is_exist<I: AsRef<str> + Send + Sync>(&self, id: I) -> Result<bool, sqlx::Error> {
        let query = format!("SELECT id FROM {} WHERE id = ?", self.get_name());
        Ok(sqlx::query(&query)
            .bind(id.as_ref())
            .fetch_optional(self.get_pool())
            .await?
            .is_some())
    }

    async fn count(&self) -> Result<u32, sqlx::Error> {
        let query = format!("SELECT COUNT(*) FROM {}", self.get_name());
        sqlx::query(&query)
            .fetch_one(self.get_pool())
            .await?
            .try_get(0)
    }
}

pub struct TaskTable {
    name: String,
    pool: SqlitePool,
}

#[async_trait::async_trait]
impl Table for TaskTable {
    type Record<'a> = &'a NewTask;

    fn get_name(&self) -> &str {
        self.name.as_str()
    }

    fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn create(&self) -> Result<(), sqlx::Error> {
        if !utils::is_table_exists(self.get_pool(), &self.name).await? {
            let query = format!(
                r#"
                    CREATE TABLE {} (
                        id TEXT PRIMARY KEY,
                        title TEXT,
                        due DATETIME,
                        created_at DATETIME
                    )
                "#,
                &self.name
            );
            sqlx::query(query.as_str()).execute(self.get_pool()).await?;
        }
        Ok(())
    }

    async fn insert<'a>(&self, task: Self::Record<'a>) -> Result<(), sqlx::Error> {
        let mut tx = self.get_pool().begin().await?;
        let query = format!(
            "INSERT OR IGNORE INTO {} (id, title, due, created_at) VALUES (?, ?, ?, ?)",
            &self.name
        );
        sqlx::query(&query)
            .bind(task.notes.as_str())
            .bind(task.title.as_str())
            .bind(task.due)
            .bind(utils::get_now())
            .execute(&mut tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }
}

pub struct SqliteTasks {
    pub tasks: TaskTable,
}

impl SqliteTasks {
    /// Opens (or creates) `<name>.db` with a `<name>_tasks` table.
    pub async fn new(name: &str) -> Result<SqliteTasks, SyncError> {
        let opt = SqliteConnectOptions::new()
            .filename(format!("{}.db", name))
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(opt).await?;
        let store = SqliteTasks {
            tasks: TaskTable {
                name: format!("{}_tasks", name),
                pool,
            },
        };

        tracing::debug!("Use table {}", store.tasks.name);
        store.tasks.create().await?;
        Ok(store)
    }
}

#[async_trait::async_trait]
impl TaskService for SqliteTasks {
    async fn existing_notes(&self) -> Result<HashSet<String>, SyncError> {
        let mut notes = HashSet::new();
        let query = format!("SELECT id FROM {}", self.tasks.get_name());
        let mut rows = sqlx::query(&query).fetch(self.tasks.get_pool());
        while let Some(row) = rows.try_next().await? {
            notes.insert(row.try_get("id")?);
        }
        Ok(notes)
    }

    async fn create_task(&self, task: &NewTask) -> Result<(), SyncError> {
        if self.tasks.is_exist(task.notes.as_str()).await? {
            tracing::warn!("Task {:?} already stored", task.title);
            return Ok(());
        }
        Ok(self.tasks.insert(task).await?)
    }
}
