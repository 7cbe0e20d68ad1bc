use crate::SyncError;
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_URL: &str = "https://scele.cs.ui.ac.id/";

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_token_file() -> PathBuf {
    PathBuf::from("token.json")
}

#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionRules {
    pub courses: HashSet<u32>,
    pub keywords: Vec<String>,
}

impl ExclusionRules {
    /// Case-sensitive substring match against every keyword.
    pub fn matches_label(&self, label: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| !k.is_empty() && label.contains(k.as_str()))
    }

    pub fn excludes_course(&self, course_id: u32) -> bool {
        self.courses.contains(&course_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum TasksConfig {
    Google {
        #[serde(default = "default_token_file")]
        token_file: PathBuf,
    },
    Sqlite {
        name: String,
    },
}

impl Default for TasksConfig {
    fn default() -> Self {
        TasksConfig::Google {
            token_file: default_token_file(),
        }
    }
}

#[derive(Deserialize)]
struct RawConfig {
    #[serde(flatten)]
    credentials: Credentials,
    #[serde(default)]
    excluded_courses: Vec<u32>,
    #[serde(default)]
    excluded_keywords: Vec<String>,
    #[serde(default = "default_base_url")]
    base_url: String,
    #[serde(default)]
    tasks: TasksConfig,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub credentials: Credentials,
    pub rules: ExclusionRules,
    pub base_url: Url,
    pub tasks: TasksConfig,
}

impl Config {
    pub fn from_json(json: &str) -> Result<Config, SyncError> {
        let raw: RawConfig = serde_json::from_str(json)
            .map_err(|e| SyncError::Config(format!("Invalid config: {}", e)))?;

        let mut base_url = raw.base_url;
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        let base_url = Url::parse(&base_url)
            .map_err(|e| SyncError::Config(format!("Invalid base_url {}: {}", base_url, e)))?;

        Ok(Config {
            credentials: raw.credentials,
            rules: ExclusionRules {
                courses: raw.excluded_courses.into_iter().collect(),
                keywords: raw.excluded_keywords,
            },
            base_url,
            tasks: raw.tasks,
        })
    }

    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Config, SyncError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SyncError::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        Config::from_json(&json)
    }
}
