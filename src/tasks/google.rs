//! Google Tasks REST client.
//!
//! Works on the first task list of the account. The access token is read from
//! a token file written by an external OAuth flow; refreshing it is not
//! handled here.

use super::TaskService;
use crate::{NewTask, SyncError};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

pub const GOOGLE_TASKS_API: &str = "https://tasks.googleapis.com/tasks/v1/";
const PAGE_SIZE: &str = "100";

#[derive(Deserialize)]
struct StoredToken {
    access_token: String,
}

#[derive(Deserialize)]
struct TaskLists {
    #[serde(default)]
    items: Vec<TaskList>,
}

#[derive(Deserialize)]
struct TaskList {
    id: String,
    #[serde(default)]
    title: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TasksPage {
    #[serde(default)]
    items: Vec<RemoteTask>,
    next_page_token: Option<String>,
}

#[derive(Deserialize)]
struct RemoteTask {
    notes: Option<String>,
}

#[derive(Serialize)]
struct InsertTask<'a> {
    title: &'a str,
    due: String,
    notes: &'a str,
}

pub struct GoogleTasks {
    client: Client,
    api: Url,
    token: String,
    list_id: String,
}

impl GoogleTasks {
    pub async fn from_token_file<P: AsRef<Path>>(path: P) -> Result<GoogleTasks, SyncError> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| SyncError::Config(format!("Cannot read {}: {}", path.display(), e)))?;
        let token: StoredToken = serde_json::from_str(&json)
            .map_err(|e| SyncError::Config(format!("Invalid token file {}: {}", path.display(), e)))?;

        let api = Url::parse(GOOGLE_TASKS_API)
            .map_err(|e| SyncError::Config(format!("Invalid API url: {}", e)))?;
        GoogleTasks::connect(api, token.access_token).await
    }

    /// Resolves the first task list under `api`, which must end with `/`.
    pub async fn connect(api: Url, token: String) -> Result<GoogleTasks, SyncError> {
        let mut tasks = GoogleTasks {
            client: Client::new(),
            api,
            token,
            list_id: String::new(),
        };

        let request = tasks
            .client
            .get(tasks.endpoint("users/@me/lists")?)
            .query(&[("maxResults", "1")]);
        let lists: TaskLists = tasks.send_json(request).await?;
        let list = lists
            .items
            .into_iter()
            .next()
            .ok_or_else(|| SyncError::Service("no task list found".to_string()))?;

        info!("Using task list {:?}", list.title);
        tasks.list_id = list.id;
        Ok(tasks)
    }

    pub fn list_id(&self) -> &str {
        &self.list_id
    }

    fn endpoint(&self, path: &str) -> Result<Url, SyncError> {
        self.api
            .join(path)
            .map_err(|e| SyncError::Config(format!("Invalid endpoint {}: {}", path, e)))
    }

    fn tasks_endpoint(&self) -> Result<Url, SyncError> {
        self.endpoint(&format!("lists/{}/tasks", self.list_id))
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, SyncError> {
        let response = request.bearer_auth(&self.token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let url = response.url().clone();
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Service(format!(
                "{} returned {}: {}",
                url,
                status,
                body.trim()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| SyncError::Service(format!("Malformed response: {}", e)))
    }
}

#[async_trait::async_trait]
impl TaskService for GoogleTasks {
    async fn existing_notes(&self) -> Result<HashSet<String>, SyncError> {
        let endpoint = self.tasks_endpoint()?;
        let mut notes = HashSet::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(endpoint.clone())
                .query(&[("showHidden", "true"), ("maxResults", PAGE_SIZE)]);
            if let Some(token) = page_token.as_deref() {
                request = request.query(&[("pageToken", token)]);
            }

            let page: TasksPage = self.send_json(request).await?;
            debug!("Fetched {} existing tasks", page.items.len());
            notes.extend(
                page.items
                    .into_iter()
                    .filter_map(|task| task.notes)
                    .filter(|n| !n.is_empty()),
            );

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(notes)
    }

    async fn create_task(&self, task: &NewTask) -> Result<(), SyncError> {
        let body = InsertTask {
            title: task.title.as_str(),
            due: task.due.to_rfc3339(),
            notes: task.notes.as_str(),
        };
        let request = self.client.post(self.tasks_endpoint()?).json(&body);
        let _: serde_json::Value = self.send_json(request).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::deadline_from_epoch;
    use mockito::{Matcher, Server, ServerGuard};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn connected(server: &mut ServerGuard) -> GoogleTasks {
        server
            .mock("GET", Matcher::Regex(r"^/users/@me/lists".into()))
            .match_query(Matcher::UrlEncoded("maxResults".into(), "1".into()))
            .match_header("authorization", "Bearer tok")
            .with_header("content-type", "application/json")
            .with_body(json!({"items": [{"id": "list1", "title": "My Tasks"}]}).to_string())
            .create_async()
            .await;

        let api = Url::parse(&format!("{}/", server.url())).unwrap();
        GoogleTasks::connect(api, "tok".to_string()).await.unwrap()
    }

    #[tokio::test]
    async fn connect_uses_first_list() {
        let mut server = Server::new_async().await;
        let tasks = connected(&mut server).await;
        assert_eq!(tasks.list_id(), "list1");
    }

    #[tokio::test]
    async fn connect_without_lists_fails() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", Matcher::Regex(r"^/users/@me/lists".into()))
            .match_query(Matcher::Any)
            .with_body(json!({"kind": "tasks#taskLists"}).to_string())
            .create_async()
            .await;

        let api = Url::parse(&format!("{}/", server.url())).unwrap();
        let res = GoogleTasks::connect(api, "tok".to_string()).await;
        assert!(matches!(res, Err(SyncError::Service(_))));
    }

    #[tokio::test]
    async fn existing_notes_follows_pages() {
        let mut server = Server::new_async().await;
        let tasks = connected(&mut server).await;

        let first = server
            .mock("GET", Matcher::Regex(r"^/lists/list1/tasks".into()))
            .match_query(Matcher::Exact("showHidden=true&maxResults=100".into()))
            .with_body(
                json!({
                    "items": [
                        {"title": "HW3", "notes": "CS200\nmod/assign/view.php?id=7"},
                        {"title": "Groceries"}
                    ],
                    "nextPageToken": "p2"
                })
                .to_string(),
            )
            .create_async()
            .await;
        let second = server
            .mock("GET", Matcher::Regex(r"^/lists/list1/tasks".into()))
            .match_query(Matcher::UrlEncoded("pageToken".into(), "p2".into()))
            .with_body(json!({"items": [{"title": "Lab", "notes": "CS300\nx"}]}).to_string())
            .create_async()
            .await;

        let notes = tasks.existing_notes().await.unwrap();

        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(
            notes,
            HashSet::from([
                "CS200\nmod/assign/view.php?id=7".to_string(),
                "CS300\nx".to_string()
            ])
        );
    }

    #[tokio::test]
    async fn create_task_posts_due_and_notes() {
        let mut server = Server::new_async().await;
        let tasks = connected(&mut server).await;

        let insert = server
            .mock("POST", "/lists/list1/tasks")
            .match_header("authorization", "Bearer tok")
            .match_body(Matcher::Json(json!({
                "title": "HW3",
                "due": "2023-11-16T05:13:20+07:00",
                "notes": "CS200\nmod/assign/view.php?id=7"
            })))
            .with_body(json!({"id": "t1"}).to_string())
            .create_async()
            .await;

        tasks
            .create_task(&NewTask {
                title: "HW3".to_string(),
                due: deadline_from_epoch(1_700_086_400).unwrap(),
                notes: "CS200\nmod/assign/view.php?id=7".to_string(),
            })
            .await
            .unwrap();

        insert.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_insert_is_service_error() {
        let mut server = Server::new_async().await;
        let tasks = connected(&mut server).await;

        server
            .mock("POST", "/lists/list1/tasks")
            .with_status(400)
            .with_body(r#"{"error": {"message": "Invalid due"}}"#)
            .create_async()
            .await;

        let res = tasks
            .create_task(&NewTask {
                title: "HW3".to_string(),
                due: deadline_from_epoch(1_700_086_400).unwrap(),
                notes: "n".to_string(),
            })
            .await;
        assert!(matches!(res, Err(SyncError::Service(_))));
    }
}
