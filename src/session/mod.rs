//! Session configuration: which credential and project the widget runs with.
//!
//! Values come from the widget URL (or matching CLI flags) first and fall back
//! to whatever was persisted last time. Every change is written back to the
//! settings store and announced to subscribers.

use anyhow::{Context, Result};
use tokio::sync::watch;
use url::Url;

use crate::store::{KEY_API_TOKEN, KEY_PROJECT_ID, Store};

pub const PARAM_TOKEN: &str = "token";
pub const PARAM_PROJECT_ID: &str = "projectId";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionConfig {
    pub api_token: String,
    pub selected_project_id: String,
}

impl SessionConfig {
    pub fn has_token(&self) -> bool {
        !self.api_token.trim().is_empty()
    }

    pub fn has_project(&self) -> bool {
        !self.selected_project_id.trim().is_empty()
    }

    /// Whether the list can show tasks with this configuration.
    pub fn is_ready(&self, require_project: bool) -> bool {
        self.has_token() && (!require_project || self.has_project())
    }

    pub fn project_filter(&self) -> Option<&str> {
        self.has_project()
            .then_some(self.selected_project_id.as_str())
    }
}

/// Parameters supplied at launch, before persisted values are consulted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchParams {
    pub token: Option<String>,
    pub project_id: Option<String>,
}

impl LaunchParams {
    /// Read `token` and `projectId` from a widget URL.
    pub fn from_url(raw: &str) -> Result<Self> {
        let url = Url::parse(raw).with_context(|| format!("invalid widget URL: {raw}"))?;
        let mut params = LaunchParams::default();
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                PARAM_TOKEN => params.token = non_empty(&value),
                PARAM_PROJECT_ID => params.project_id = non_empty(&value),
                _ => {}
            }
        }
        Ok(params)
    }

    /// Explicit flags win over the same parameter inside `url`.
    pub fn resolve(url: Option<&str>, token: Option<String>, project_id: Option<String>) -> Result<Self> {
        let mut params = match url {
            Some(raw) => Self::from_url(raw)?,
            None => LaunchParams::default(),
        };
        if let Some(token) = token.as_deref().and_then(non_empty) {
            params.token = Some(token);
        }
        if let Some(project_id) = project_id.as_deref().and_then(non_empty) {
            params.project_id = Some(project_id);
        }
        Ok(params)
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Build the shareable widget URL for a token and project.
pub fn widget_url(origin: &str, token: &str, project_id: &str) -> Result<String> {
    let mut url = Url::parse(origin).with_context(|| format!("invalid widget origin: {origin}"))?;
    url.set_path("/");
    url.set_fragment(None);
    url.query_pairs_mut()
        .clear()
        .append_pair(PARAM_TOKEN, token)
        .append_pair(PARAM_PROJECT_ID, project_id);
    Ok(url.to_string())
}

/// Observable, persisted session configuration.
pub struct SessionStore {
    store: Store,
    tx: watch::Sender<SessionConfig>,
}

impl SessionStore {
    /// Resolve the starting configuration: launch parameters first, persisted
    /// values for anything they leave out. The result is persisted.
    pub fn load(store: Store, launch: &LaunchParams) -> Result<Self> {
        let api_token = match &launch.token {
            Some(token) => token.clone(),
            None => store.get_setting(KEY_API_TOKEN)?.unwrap_or_default(),
        };
        let selected_project_id = match &launch.project_id {
            Some(project_id) => project_id.clone(),
            None => store.get_setting(KEY_PROJECT_ID)?.unwrap_or_default(),
        };

        let config = SessionConfig {
            api_token,
            selected_project_id,
        };
        persist(&store, &config)?;
        tracing::debug!(
            has_token = config.has_token(),
            project = %config.selected_project_id,
            "session configuration resolved"
        );

        let (tx, _rx) = watch::channel(config);
        Ok(Self { store, tx })
    }

    pub fn current(&self) -> SessionConfig {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionConfig> {
        self.tx.subscribe()
    }

    pub fn set_token(&self, token: &str) -> Result<bool> {
        let mut next = self.current();
        next.api_token = token.trim().to_string();
        self.replace(next)
    }

    pub fn set_project(&self, project_id: &str) -> Result<bool> {
        let mut next = self.current();
        next.selected_project_id = project_id.trim().to_string();
        self.replace(next)
    }

    /// Swap in a whole configuration. Returns whether anything changed.
    pub fn replace(&self, next: SessionConfig) -> Result<bool> {
        if *self.tx.borrow() == next {
            return Ok(false);
        }
        persist(&self.store, &next)?;
        self.tx.send_replace(next);
        Ok(true)
    }

    /// Forget both values, in memory and on disk.
    pub fn clear(&self) -> Result<()> {
        self.store.delete_setting(KEY_API_TOKEN)?;
        self.store.delete_setting(KEY_PROJECT_ID)?;
        self.tx.send_replace(SessionConfig::default());
        Ok(())
    }
}

fn persist(store: &Store, config: &SessionConfig) -> Result<()> {
    store.set_setting(KEY_API_TOKEN, &config.api_token)?;
    store.set_setting(KEY_PROJECT_ID, &config.selected_project_id)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(token: Option<&str>, project: Option<&str>) -> Store {
        let store = Store::open_in_memory().unwrap();
        if let Some(token) = token {
            store.set_setting(KEY_API_TOKEN, token).unwrap();
        }
        if let Some(project) = project {
            store.set_setting(KEY_PROJECT_ID, project).unwrap();
        }
        store
    }

    #[test]
    fn readiness_rules() {
        let mut cfg = SessionConfig::default();
        assert!(!cfg.is_ready(true));
        assert!(!cfg.is_ready(false));

        cfg.api_token = "tok".into();
        assert!(!cfg.is_ready(true));
        assert!(cfg.is_ready(false));
        assert_eq!(cfg.project_filter(), None);

        cfg.selected_project_id = "p".into();
        assert!(cfg.is_ready(true));
        assert_eq!(cfg.project_filter(), Some("p"));
    }

    #[test]
    fn widget_url_encodes_both_params() {
        let url = widget_url("http://localhost:5173", "a b&c", "123").unwrap();
        assert_eq!(url, "http://localhost:5173/?token=a+b%26c&projectId=123");
    }

    #[test]
    fn widget_url_drops_existing_path_and_query() {
        let url = widget_url("https://overlay.example.com/setup?x=1#frag", "t", "p").unwrap();
        assert_eq!(url, "https://overlay.example.com/?token=t&projectId=p");
    }

    #[test]
    fn launch_params_from_url() {
        let params =
            LaunchParams::from_url("http://localhost:5173/?token=abc&projectId=42&other=1")
                .unwrap();
        assert_eq!(params.token.as_deref(), Some("abc"));
        assert_eq!(params.project_id.as_deref(), Some("42"));
    }

    #[test]
    fn empty_url_params_count_as_absent() {
        let params = LaunchParams::from_url("http://localhost/?token=&projectId=").unwrap();
        assert_eq!(params, LaunchParams::default());
    }

    #[test]
    fn flags_override_url() {
        let params = LaunchParams::resolve(
            Some("http://localhost/?token=from-url&projectId=p-url"),
            Some("from-flag".into()),
            None,
        )
        .unwrap();
        assert_eq!(params.token.as_deref(), Some("from-flag"));
        assert_eq!(params.project_id.as_deref(), Some("p-url"));
    }

    #[test]
    fn invalid_url_is_an_error() {
        assert!(LaunchParams::from_url("not a url").is_err());
    }

    #[test]
    fn generated_url_round_trips_without_persisted_values() {
        let url = widget_url("http://localhost:5173", "T", "P").unwrap();
        let launch = LaunchParams::from_url(&url).unwrap();
        let session = SessionStore::load(store_with(Some("old"), Some("stale")), &launch).unwrap();
        assert_eq!(
            session.current(),
            SessionConfig {
                api_token: "T".into(),
                selected_project_id: "P".into(),
            }
        );
    }

    #[test]
    fn persisted_values_fill_missing_params() {
        let launch = LaunchParams {
            token: Some("fresh".into()),
            project_id: None,
        };
        let session = SessionStore::load(store_with(Some("old"), Some("p7")), &launch).unwrap();
        let cfg = session.current();
        assert_eq!(cfg.api_token, "fresh");
        assert_eq!(cfg.selected_project_id, "p7");
    }

    #[test]
    fn url_values_are_persisted_on_load() {
        let launch = LaunchParams {
            token: Some("T".into()),
            project_id: Some("P".into()),
        };
        let session = SessionStore::load(store_with(None, None), &launch).unwrap();
        assert_eq!(
            session.store.get_setting(KEY_API_TOKEN).unwrap().as_deref(),
            Some("T")
        );
        assert_eq!(
            session.store.get_setting(KEY_PROJECT_ID).unwrap().as_deref(),
            Some("P")
        );
    }

    #[test]
    fn changes_notify_subscribers_and_persist() {
        let session = SessionStore::load(store_with(None, None), &LaunchParams::default()).unwrap();
        let mut rx = session.subscribe();
        assert!(!rx.has_changed().unwrap());

        assert!(session.set_project("p1").unwrap());
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().selected_project_id, "p1");
        assert_eq!(
            session.store.get_setting(KEY_PROJECT_ID).unwrap().as_deref(),
            Some("p1")
        );

        // Same value again: no notification.
        assert!(!session.set_project("p1").unwrap());
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn clear_forgets_everything() {
        let session =
            SessionStore::load(store_with(Some("t"), Some("p")), &LaunchParams::default()).unwrap();
        session.clear().unwrap();
        assert_eq!(session.current(), SessionConfig::default());
        assert_eq!(session.store.get_setting(KEY_API_TOKEN).unwrap(), None);
    }
}
