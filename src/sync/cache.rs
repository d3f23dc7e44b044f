use std::collections::HashMap;
use std::fmt;

use tokio::sync::watch;

use crate::todoist::{Project, Task};

/// Identifies one cached query: the query name plus its parameters.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// Projects visible to a credential.
    Projects { token: String },
    /// Tasks of one project, or of all projects when `None`.
    Tasks { project_id: Option<String> },
}

impl fmt::Debug for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // The token is a secret; show only that one is there.
            QueryKey::Projects { .. } => f.write_str("Projects"),
            QueryKey::Tasks { project_id } => f
                .debug_struct("Tasks")
                .field("project_id", project_id)
                .finish(),
        }
    }
}

impl QueryKey {
    pub fn is_tasks(&self) -> bool {
        matches!(self, QueryKey::Tasks { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryData {
    Projects(Vec<Project>),
    Tasks(Vec<Task>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Fresh,
    /// Must be refetched on the next read.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub data: Option<QueryData>,
    pub freshness: Freshness,
    pub in_flight: bool,
    /// Message of the most recent failed fetch, cleared on success.
    pub error: Option<String>,
    /// Bumped on every invalidation. A fetch only makes the entry fresh if
    /// no invalidation happened since it was issued.
    pub epoch: u64,
}

impl CacheEntry {
    fn pending() -> Self {
        CacheEntry {
            data: None,
            freshness: Freshness::Stale,
            in_flight: false,
            error: None,
            epoch: 0,
        }
    }

    /// Settle a finished fetch issued at `epoch`.
    fn settle(&mut self, epoch: u64) {
        self.in_flight = false;
        self.freshness = if epoch == self.epoch {
            Freshness::Fresh
        } else {
            Freshness::Stale
        };
    }
}

/// Query results keyed by [`QueryKey`].
///
/// Every change bumps a revision number that observers can watch.
pub struct QueryCache {
    entries: HashMap<QueryKey, CacheEntry>,
    revision: watch::Sender<u64>,
}

impl Default for QueryCache {
    fn default() -> Self {
        let (revision, _rx) = watch::channel(0);
        Self {
            entries: HashMap::new(),
            revision,
        }
    }
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    fn bump(&self) {
        self.revision.send_modify(|r| *r += 1);
    }

    pub fn get(&self, key: &QueryKey) -> Option<&CacheEntry> {
        self.entries.get(key)
    }

    /// A fetch is due when nothing is cached yet or the entry went stale,
    /// and no fetch for the key is already running.
    pub fn needs_fetch(&self, key: &QueryKey) -> bool {
        match self.entries.get(key) {
            None => true,
            Some(entry) => !entry.in_flight && entry.freshness == Freshness::Stale,
        }
    }

    /// Current invalidation epoch of `key`.
    pub fn epoch(&self, key: &QueryKey) -> u64 {
        self.entries.get(key).map_or(0, |entry| entry.epoch)
    }

    /// Mark a fetch as running. Returns the epoch the fetch belongs to.
    pub fn mark_in_flight(&mut self, key: QueryKey) -> u64 {
        let entry = self.entries.entry(key).or_insert_with(CacheEntry::pending);
        entry.in_flight = true;
        let epoch = entry.epoch;
        self.bump();
        epoch
    }

    /// Record the result of a fetch issued at `epoch`. If the entry was
    /// invalidated meanwhile the data is kept but the entry stays stale.
    pub fn store_success(&mut self, key: QueryKey, data: QueryData, epoch: u64) {
        let entry = self.entries.entry(key.clone()).or_insert_with(CacheEntry::pending);
        entry.data = Some(data);
        entry.error = None;
        entry.settle(epoch);
        tracing::debug!(?key, freshness = ?entry.freshness, "query stored");
        self.bump();
    }

    /// Record a failed fetch. Previously cached data stays in place and the
    /// entry is not retried until it is invalidated again.
    pub fn store_failure(&mut self, key: QueryKey, error: String, epoch: u64) {
        tracing::debug!(?key, %error, "query failed");
        let entry = self.entries.entry(key).or_insert_with(CacheEntry::pending);
        entry.error = Some(error);
        entry.settle(epoch);
        self.bump();
    }

    /// Mark every entry matching `pred` stale. Returns how many were marked.
    pub fn invalidate(&mut self, pred: impl Fn(&QueryKey) -> bool) -> usize {
        let mut marked = 0;
        for (key, entry) in &mut self.entries {
            if pred(key) {
                entry.freshness = Freshness::Stale;
                entry.epoch += 1;
                marked += 1;
                tracing::debug!(?key, "query invalidated");
            }
        }
        if marked > 0 {
            self.bump();
        }
        marked
    }

    pub fn clear(&mut self) {
        if !self.entries.is_empty() {
            self.entries.clear();
            self.bump();
        }
    }

    pub fn tasks(&self, key: &QueryKey) -> Option<&[Task]> {
        match self.entries.get(key)?.data.as_ref()? {
            QueryData::Tasks(tasks) => Some(tasks),
            QueryData::Projects(_) => None,
        }
    }

    pub fn projects(&self, key: &QueryKey) -> Option<&[Project]> {
        match self.entries.get(key)?.data.as_ref()? {
            QueryData::Projects(projects) => Some(projects),
            QueryData::Tasks(_) => None,
        }
    }
}
