//! Synchronization layer between the UI and the task service.
//!
//! Queries are cached per [`QueryKey`]; mutations run in the background and,
//! once the service confirms them, mark the task queries stale so the next
//! read refetches. Nothing is patched optimistically.
//!
//! Background work reports back through an mpsc channel. State only changes in
//! [`SyncLayer::apply`], which the UI loop calls between frames.

pub mod cache;

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};

use crate::session::SessionConfig;
use crate::todoist::{Project, ServiceError, ServiceResult, Task, TaskService};

pub use cache::{CacheEntry, Freshness, QueryCache, QueryData, QueryKey};

/// Builds a service for a credential. Fails with `NotInitialized` on an empty one.
pub type ServiceFactory = Arc<dyn Fn(&str) -> ServiceResult<Arc<dyn TaskService>> + Send + Sync>;

/// Where task operations go.
#[derive(Clone)]
pub enum Backend {
    /// A remote service built per credential.
    Remote {
        factory: ServiceFactory,
        require_project: bool,
    },
    /// A single service that needs no credential or project.
    Local(Arc<dyn TaskService>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Add { text: String, project_id: Option<String> },
    Complete { task_id: String },
    Delete { task_id: String },
}

impl Mutation {
    fn success_message(&self) -> &'static str {
        match self {
            Mutation::Add { .. } => "Task added",
            Mutation::Complete { .. } => "Task completed",
            Mutation::Delete { .. } => "Task deleted",
        }
    }

    fn failure_message(&self, error: &str) -> String {
        let verb = match self {
            Mutation::Add { .. } => "add task",
            Mutation::Complete { .. } => "complete task",
            Mutation::Delete { .. } => "delete task",
        };
        format!("Could not {verb}: {error}")
    }
}

/// Result of background work, delivered to the UI thread.
#[derive(Debug)]
pub enum SyncEvent {
    Fetched {
        generation: u64,
        /// Cache epoch of `key` when the fetch was issued.
        epoch: u64,
        key: QueryKey,
        result: Result<QueryData, String>,
    },
    Mutated {
        generation: u64,
        mutation: Mutation,
        result: Result<(), String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// What a view should show for one query.
#[derive(Debug, PartialEq, Eq)]
pub enum QueryState<'a, T> {
    /// The query is disabled: configuration is missing.
    NotReady,
    Loading,
    Ready(&'a [T]),
    Failed(&'a str),
}

pub struct SyncLayer {
    backend: Backend,
    runtime: Handle,
    /// Service for the session credential. `None` until a credential is set.
    service: Option<Arc<dyn TaskService>>,
    credential: String,
    /// Bumped whenever the service is replaced; older responses are dropped.
    generation: u64,
    cache: QueryCache,
    events_tx: mpsc::UnboundedSender<SyncEvent>,
    events_rx: mpsc::UnboundedReceiver<SyncEvent>,
}

impl SyncLayer {
    pub fn new(backend: Backend, runtime: Handle) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let service = match &backend {
            Backend::Local(service) => Some(Arc::clone(service)),
            Backend::Remote { .. } => None,
        };
        Self {
            backend,
            runtime,
            service,
            credential: String::new(),
            generation: 0,
            cache: QueryCache::new(),
            events_tx,
            events_rx,
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self.backend, Backend::Local(_))
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Observe cache changes.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.cache.subscribe()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Replace the service when the credential changes. Cached results belong
    /// to the old credential and are dropped with it.
    pub fn set_credential(&mut self, token: &str) {
        let Backend::Remote { factory, .. } = &self.backend else {
            return;
        };
        let token = token.trim();
        if token == self.credential {
            return;
        }
        self.credential = token.to_string();
        self.generation += 1;
        self.cache.clear();
        self.service = match factory(token) {
            Ok(service) => Some(service),
            Err(ServiceError::NotInitialized) => None,
            Err(e) => {
                tracing::warn!(error = %e, "could not build task service");
                None
            }
        };
        tracing::info!(
            generation = self.generation,
            has_service = self.service.is_some(),
            "task service replaced"
        );
    }

    /// The task query for a session, or `None` while it is disabled.
    pub fn tasks_key(&self, session: &SessionConfig) -> Option<QueryKey> {
        match &self.backend {
            Backend::Local(_) => Some(QueryKey::Tasks { project_id: None }),
            Backend::Remote {
                require_project, ..
            } => session
                .is_ready(*require_project)
                .then(|| QueryKey::Tasks {
                    project_id: session.project_filter().map(str::to_string),
                }),
        }
    }

    /// Whether the list has enough configuration to show tasks.
    pub fn is_ready(&self, session: &SessionConfig) -> bool {
        self.tasks_key(session).is_some()
    }

    pub fn projects_key(&self, token: &str) -> Option<QueryKey> {
        match &self.backend {
            Backend::Local(_) => Some(QueryKey::Projects {
                token: String::new(),
            }),
            Backend::Remote { .. } => {
                let token = token.trim();
                (!token.is_empty()).then(|| QueryKey::Projects {
                    token: token.to_string(),
                })
            }
        }
    }

    /// Issue the task query if it is enabled and due. Returns whether a fetch
    /// was started.
    pub fn ensure_tasks(&mut self, session: &SessionConfig) -> bool {
        let Some(key) = self.tasks_key(session) else {
            return false;
        };
        if !self.cache.needs_fetch(&key) {
            return false;
        }
        let Some(service) = self.service.clone() else {
            let epoch = self.cache.epoch(&key);
            self.cache
                .store_failure(key, ServiceError::NotInitialized.to_string(), epoch);
            return false;
        };
        self.spawn_fetch(key, service);
        true
    }

    /// Issue the projects query for `token` if it is enabled and due.
    pub fn ensure_projects(&mut self, token: &str) -> bool {
        let Some(key) = self.projects_key(token) else {
            return false;
        };
        if !self.cache.needs_fetch(&key) {
            return false;
        }
        let service = match self.service_for(token) {
            Ok(service) => service,
            Err(e) => {
                let epoch = self.cache.epoch(&key);
                self.cache.store_failure(key, e.to_string(), epoch);
                return false;
            }
        };
        self.spawn_fetch(key, service);
        true
    }

    fn service_for(&self, token: &str) -> ServiceResult<Arc<dyn TaskService>> {
        match &self.backend {
            Backend::Local(service) => Ok(Arc::clone(service)),
            Backend::Remote { factory, .. } => {
                if token.trim() == self.credential
                    && let Some(service) = &self.service
                {
                    return Ok(Arc::clone(service));
                }
                factory(token.trim())
            }
        }
    }

    fn spawn_fetch(&mut self, key: QueryKey, service: Arc<dyn TaskService>) {
        tracing::debug!(?key, "query issued");
        let epoch = self.cache.mark_in_flight(key.clone());
        let generation = self.generation;
        let tx = self.events_tx.clone();
        self.runtime.spawn(async move {
            let result = match &key {
                QueryKey::Projects { .. } => service
                    .list_projects()
                    .await
                    .map(QueryData::Projects),
                QueryKey::Tasks { project_id } => service
                    .list_tasks(project_id.as_deref())
                    .await
                    .map(|records| QueryData::Tasks(records.iter().map(Task::from).collect())),
            };
            let _ = tx.send(SyncEvent::Fetched {
                generation,
                epoch,
                key,
                result: result.map_err(|e| e.to_string()),
            });
        });
    }

    /// Current view of the session's task list.
    pub fn tasks(&self, session: &SessionConfig) -> QueryState<'_, Task> {
        match self.tasks_key(session) {
            None => QueryState::NotReady,
            Some(key) => self.state_of(&key, |c, k| c.tasks(k)),
        }
    }

    pub fn projects(&self, token: &str) -> QueryState<'_, Project> {
        match self.projects_key(token) {
            None => QueryState::NotReady,
            Some(key) => self.state_of(&key, |c, k| c.projects(k)),
        }
    }

    fn state_of<'a, T>(
        &'a self,
        key: &QueryKey,
        data: impl Fn(&'a QueryCache, &QueryKey) -> Option<&'a [T]>,
    ) -> QueryState<'a, T> {
        if let Some(items) = data(&self.cache, key) {
            return QueryState::Ready(items);
        }
        match self.cache.get(key).and_then(|e| e.error.as_deref()) {
            Some(error) => QueryState::Failed(error),
            None => QueryState::Loading,
        }
    }

    /// Mark the task list stale so it is refetched.
    pub fn refresh(&mut self) {
        self.cache.invalidate(QueryKey::is_tasks);
    }

    pub fn add_task(&mut self, text: &str, project_id: Option<&str>) -> ServiceResult<()> {
        self.mutate(Mutation::Add {
            text: text.to_string(),
            project_id: project_id.map(str::to_string),
        })
    }

    pub fn complete_task(&mut self, task_id: &str) -> ServiceResult<()> {
        self.mutate(Mutation::Complete {
            task_id: task_id.to_string(),
        })
    }

    pub fn delete_task(&mut self, task_id: &str) -> ServiceResult<()> {
        self.mutate(Mutation::Delete {
            task_id: task_id.to_string(),
        })
    }

    /// Start a mutation in the background. Fails right away only when there
    /// is no service to send it to.
    fn mutate(&mut self, mutation: Mutation) -> ServiceResult<()> {
        let service = self.service.clone().ok_or(ServiceError::NotInitialized)?;
        let generation = self.generation;
        let tx = self.events_tx.clone();
        tracing::debug!(?mutation, "mutation dispatched");
        self.runtime.spawn(async move {
            let result = match &mutation {
                Mutation::Add { text, project_id } => service
                    .add_task(text, project_id.as_deref())
                    .await
                    .map(|_| ()),
                Mutation::Complete { task_id } => service.complete_task(task_id).await,
                Mutation::Delete { task_id } => service.delete_task(task_id).await,
            };
            let _ = tx.send(SyncEvent::Mutated {
                generation,
                mutation,
                result: result.map_err(|e| e.to_string()),
            });
        });
        Ok(())
    }

    /// Fold one background result into the cache. Returns a notice for the
    /// user when there is something to say.
    pub fn apply(&mut self, event: SyncEvent) -> Option<Notice> {
        match event {
            SyncEvent::Fetched {
                generation,
                epoch,
                key,
                result,
            } => {
                if generation != self.generation {
                    tracing::debug!(?key, "dropping response for replaced service");
                    return None;
                }
                match result {
                    Ok(data) => self.cache.store_success(key, data, epoch),
                    Err(error) => {
                        tracing::warn!(?key, %error, "query failed");
                        self.cache.store_failure(key, error, epoch);
                    }
                }
                None
            }
            SyncEvent::Mutated {
                generation,
                mutation,
                result,
            } => {
                if generation != self.generation {
                    return None;
                }
                match result {
                    Ok(()) => {
                        tracing::info!(?mutation, "mutation confirmed");
                        self.cache.invalidate(QueryKey::is_tasks);
                        Some(Notice::success(mutation.success_message()))
                    }
                    Err(error) => {
                        tracing::warn!(?mutation, %error, "mutation failed");
                        Some(Notice::error(mutation.failure_message(&error)))
                    }
                }
            }
        }
    }

    /// Apply everything that has arrived so far without waiting.
    pub fn drain(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            if let Some(notice) = self.apply(event) {
                notices.push(notice);
            }
        }
        notices
    }

    /// Wait for the next background result and apply it.
    pub async fn next(&mut self) -> Option<Option<Notice>> {
        let event = self.events_rx.recv().await?;
        Some(self.apply(event))
    }
}
