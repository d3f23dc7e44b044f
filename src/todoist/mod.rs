//! Remote task service boundary.
//!
//! [`TaskService`] is the only seam the rest of the app talks through. The
//! Todoist REST client and the in-memory local list both implement it.

mod client;
mod error;
mod local;
mod models;

pub use client::{DEFAULT_BASE_URL, TodoistClient};
pub use error::{ServiceError, ServiceResult};
pub use local::{LOCAL_PROJECT_ID, LocalService};
pub use models::{Project, Task, TaskRecord, stringify_id};

use async_trait::async_trait;

/// The four task operations plus project listing.
#[async_trait]
pub trait TaskService: Send + Sync {
    async fn list_projects(&self) -> ServiceResult<Vec<Project>>;

    /// Tasks of one project, or of every accessible project when `None`.
    async fn list_tasks(&self, project_id: Option<&str>) -> ServiceResult<Vec<TaskRecord>>;

    async fn add_task(&self, text: &str, project_id: Option<&str>) -> ServiceResult<TaskRecord>;

    /// Close the task on the server.
    async fn complete_task(&self, task_id: &str) -> ServiceResult<()>;

    async fn delete_task(&self, task_id: &str) -> ServiceResult<()>;
}
