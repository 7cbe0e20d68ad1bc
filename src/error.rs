#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Fetch error: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Task service error: {0}")]
    Service(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::error::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl SyncError {
    pub(crate) fn parse<S: Into<String>>(msg: S) -> Self {
        SyncError::Parse(msg.into())
    }
}
