use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::instrument;
use url::Url;

use super::error::{ServiceError, ServiceResult};
use super::models::{Project, TaskRecord};
use super::TaskService;

pub const DEFAULT_BASE_URL: &str = "https://api.todoist.com/rest/v2";

/// REST client for the Todoist API, authenticated with a bearer token.
pub struct TodoistClient {
    base_url: Url,
    token: String,
    http: Client,
}

impl std::fmt::Debug for TodoistClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never print the token.
        f.debug_struct("TodoistClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl TodoistClient {
    pub fn new(base_url: &str, token: &str) -> ServiceResult<Self> {
        Self::with_http(base_url, token, Client::new())
    }

    pub fn with_http(base_url: &str, token: &str, http: Client) -> ServiceResult<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ServiceError::NotInitialized);
        }
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(url::ParseError::RelativeUrlWithCannotBeABaseBase.into());
        }
        Ok(Self {
            base_url,
            token: token.to_string(),
            http,
        })
    }

    /// Base URL with `segments` appended. Each segment is percent-encoded,
    /// so `/` inside an id cannot reach another endpoint.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Path segment for a task id. Dot segments are dropped by URL
    /// normalisation, so they can never name a task.
    fn task_segment(task_id: &str) -> ServiceResult<&str> {
        match task_id.trim() {
            "" | "." | ".." => Err(ServiceError::NotFound(format!("task {task_id}"))),
            _ => Ok(task_id),
        }
    }

    async fn check(response: Response, what: &str) -> ServiceResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = status.as_u16(), what, "task service request failed");
        Err(ServiceError::from_status(status.as_u16(), what, &body))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> ServiceResult<T> {
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| ServiceError::Decode(e.to_string()))
    }
}

#[async_trait]
impl TaskService for TodoistClient {
    #[instrument(skip(self), level = "debug")]
    async fn list_projects(&self) -> ServiceResult<Vec<Project>> {
        let response = self
            .http
            .get(self.url(&["projects"]))
            .bearer_auth(&self.token)
            .send()
            .await?;
        let response = Self::check(response, "projects").await?;
        Self::decode(response).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn list_tasks(&self, project_id: Option<&str>) -> ServiceResult<Vec<TaskRecord>> {
        let mut request = self.http.get(self.url(&["tasks"])).bearer_auth(&self.token);
        if let Some(project_id) = project_id {
            request = request.query(&[("project_id", project_id)]);
        }
        let response = Self::check(request.send().await?, "tasks").await?;
        Self::decode(response).await
    }

    #[instrument(skip(self, text), level = "debug")]
    async fn add_task(&self, text: &str, project_id: Option<&str>) -> ServiceResult<TaskRecord> {
        let mut body = json!({ "content": text });
        if let Some(project_id) = project_id {
            body["project_id"] = json!(project_id);
        }
        let response = self
            .http
            .post(self.url(&["tasks"]))
            .bearer_auth(&self.token)
            .json(&body)
            .send()
            .await?;
        let response = Self::check(response, "tasks").await?;
        Self::decode(response).await
    }

    #[instrument(skip(self), level = "debug")]
    async fn complete_task(&self, task_id: &str) -> ServiceResult<()> {
        let segment = Self::task_segment(task_id)?;
        let response = self
            .http
            .post(self.url(&["tasks", segment, "close"]))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check(response, &format!("task {task_id}")).await?;
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete_task(&self, task_id: &str) -> ServiceResult<()> {
        let segment = Self::task_segment(task_id)?;
        let response = self
            .http
            .delete(self.url(&["tasks", segment]))
            .bearer_auth(&self.token)
            .send()
            .await?;
        Self::check(response, &format!("task {task_id}")).await?;
        Ok(())
    }
}
