//! Service doubles shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::runtime::Handle;

use crate::sync::{Backend, ServiceFactory, SyncLayer};
use crate::todoist::{LocalService, Project, ServiceError, ServiceResult, TaskRecord, TaskService};

/// Local list that counts calls, so tests can tell which queries ran.
#[derive(Default)]
pub struct CountingService {
    pub inner: LocalService,
    pub list_tasks_calls: AtomicUsize,
    pub list_projects_calls: AtomicUsize,
    pub added: Mutex<Vec<(String, Option<String>)>>,
}

impl CountingService {
    pub fn add_calls(&self) -> usize {
        self.added.lock().unwrap().len()
    }
}

#[async_trait]
impl TaskService for CountingService {
    async fn list_projects(&self) -> ServiceResult<Vec<Project>> {
        self.list_projects_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![
            Project {
                id: "p1".into(),
                name: "Stream".into(),
            },
            Project {
                id: "p2".into(),
                name: "Chores".into(),
            },
        ])
    }

    async fn list_tasks(&self, project_id: Option<&str>) -> ServiceResult<Vec<TaskRecord>> {
        self.list_tasks_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.list_tasks(project_id).await
    }

    async fn add_task(&self, text: &str, project_id: Option<&str>) -> ServiceResult<TaskRecord> {
        self.added
            .lock()
            .unwrap()
            .push((text.to_string(), project_id.map(str::to_string)));
        self.inner.add_task(text, project_id).await
    }

    async fn complete_task(&self, task_id: &str) -> ServiceResult<()> {
        self.inner.complete_task(task_id).await
    }

    async fn delete_task(&self, task_id: &str) -> ServiceResult<()> {
        self.inner.delete_task(task_id).await
    }
}

/// Local list whose `list_tasks` answers with what it saw on the call,
/// after a delay. Lets a mutation confirm while a fetch is still running.
#[derive(Default)]
pub struct SlowListService {
    pub inner: LocalService,
}

#[async_trait]
impl TaskService for SlowListService {
    async fn list_projects(&self) -> ServiceResult<Vec<Project>> {
        self.inner.list_projects().await
    }

    async fn list_tasks(&self, project_id: Option<&str>) -> ServiceResult<Vec<TaskRecord>> {
        let snapshot = self.inner.list_tasks(project_id).await?;
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(snapshot)
    }

    async fn add_task(&self, text: &str, project_id: Option<&str>) -> ServiceResult<TaskRecord> {
        self.inner.add_task(text, project_id).await
    }

    async fn complete_task(&self, task_id: &str) -> ServiceResult<()> {
        self.inner.complete_task(task_id).await
    }

    async fn delete_task(&self, task_id: &str) -> ServiceResult<()> {
        self.inner.delete_task(task_id).await
    }
}

/// Every call fails the way an unreachable service would.
pub struct BrokenService;

#[async_trait]
impl TaskService for BrokenService {
    async fn list_projects(&self) -> ServiceResult<Vec<Project>> {
        Err(ServiceError::Unauthorized)
    }

    async fn list_tasks(&self, _: Option<&str>) -> ServiceResult<Vec<TaskRecord>> {
        Err(ServiceError::Api {
            status: 503,
            message: "down".into(),
        })
    }

    async fn add_task(&self, _: &str, _: Option<&str>) -> ServiceResult<TaskRecord> {
        Err(ServiceError::Api {
            status: 503,
            message: "down".into(),
        })
    }

    async fn complete_task(&self, _: &str) -> ServiceResult<()> {
        Err(ServiceError::NotFound("task".into()))
    }

    async fn delete_task(&self, id: &str) -> ServiceResult<()> {
        Err(ServiceError::NotFound(format!("task {id}")))
    }
}

/// A remote-backed sync layer whose factory hands out `service` for any
/// non-empty token.
pub fn remote_sync(service: Arc<dyn TaskService>, require_project: bool) -> SyncLayer {
    let factory: ServiceFactory =
        Arc::new(move |token: &str| -> ServiceResult<Arc<dyn TaskService>> {
            if token.is_empty() {
                Err(ServiceError::NotInitialized)
            } else {
                Ok(Arc::clone(&service))
            }
        });
    SyncLayer::new(
        Backend::Remote {
            factory,
            require_project,
        },
        Handle::current(),
    )
}
