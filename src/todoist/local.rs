use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::error::{ServiceError, ServiceResult};
use super::models::{Project, TaskRecord, stringify_id};
use super::TaskService;

pub const LOCAL_PROJECT_ID: &str = "local";

/// In-memory task list used when no remote service is configured.
///
/// Ids are opaque random strings. Nothing is persisted across runs.
#[derive(Debug, Default)]
pub struct LocalService {
    tasks: Mutex<Vec<TaskRecord>>,
}

impl LocalService {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<TaskRecord>> {
        // A panic while holding the lock leaves a still-valid Vec behind.
        self.tasks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

fn random_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[async_trait]
impl TaskService for LocalService {
    async fn list_projects(&self) -> ServiceResult<Vec<Project>> {
        Ok(vec![Project {
            id: LOCAL_PROJECT_ID.to_string(),
            name: "Local".to_string(),
        }])
    }

    async fn list_tasks(&self, _project_id: Option<&str>) -> ServiceResult<Vec<TaskRecord>> {
        Ok(self.lock().clone())
    }

    async fn add_task(&self, text: &str, project_id: Option<&str>) -> ServiceResult<TaskRecord> {
        let record = TaskRecord {
            id: Value::String(random_id()),
            content: text.to_string(),
            is_completed: Some(false),
            project_id: project_id.map(|p| Value::String(p.to_string())),
        };
        self.lock().push(record.clone());
        Ok(record)
    }

    async fn complete_task(&self, task_id: &str) -> ServiceResult<()> {
        let mut tasks = self.lock();
        let task = tasks
            .iter_mut()
            .find(|t| stringify_id(&t.id) == task_id)
            .ok_or_else(|| ServiceError::NotFound(format!("task {task_id}")))?;
        task.is_completed = Some(true);
        Ok(())
    }

    async fn delete_task(&self, task_id: &str) -> ServiceResult<()> {
        let mut tasks = self.lock();
        let before = tasks.len();
        tasks.retain(|t| stringify_id(&t.id) != task_id);
        if tasks.len() == before {
            return Err(ServiceError::NotFound(format!("task {task_id}")));
        }
        Ok(())
    }
}
