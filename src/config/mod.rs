use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::todoist::DEFAULT_BASE_URL;
use crate::tui::theme::ThemeConfig;

/// What the list does when the user submits a task without a usable
/// configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingConfig {
    /// Show a notification and stay on the list.
    #[default]
    Notice,
    /// Jump straight to the setup screen.
    Setup,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Base URL of the Todoist REST API.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Origin the setup screen builds widget URLs on.
    #[serde(default = "default_widget_origin")]
    pub widget_origin: String,

    /// Keep tasks in memory only and never talk to a service.
    #[serde(default)]
    pub local: bool,

    /// Whether a project must be selected before tasks are listed.
    /// When false, tasks from every project are shown.
    #[serde(default = "default_true")]
    pub require_project: bool,

    #[serde(default)]
    pub missing_config: MissingConfig,

    /// Event poll interval in milliseconds.
    #[serde(default = "default_tick_rate_ms")]
    pub tick_rate_ms: u64,

    /// How long a notification stays on screen.
    #[serde(default = "default_toast_seconds")]
    pub toast_seconds: u64,

    #[serde(default)]
    pub theme: ThemeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: default_api_base_url(),
            widget_origin: default_widget_origin(),
            local: false,
            require_project: true,
            missing_config: MissingConfig::default(),
            tick_rate_ms: default_tick_rate_ms(),
            toast_seconds: default_toast_seconds(),
            theme: ThemeConfig::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_api_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_widget_origin() -> String {
    "http://localhost:5173".to_string()
}

fn default_tick_rate_ms() -> u64 {
    100
}

fn default_toast_seconds() -> u64 {
    4
}

/// Returns the base config directory: ~/.streamtasks/
pub fn base_dir() -> Result<PathBuf> {
    let home = dirs::home_dir().context("could not determine home directory")?;
    Ok(home.join(".streamtasks"))
}

/// Returns the path to the `SQLite` settings database
pub fn db_path() -> Result<PathBuf> {
    Ok(base_dir()?.join("streamtasks.db"))
}

pub fn log_path() -> Result<PathBuf> {
    Ok(base_dir()?.join("streamtasks.log"))
}

/// Ensure all required directories exist
pub fn ensure_dirs() -> Result<()> {
    let base = base_dir()?;
    fs::create_dir_all(&base).context("failed to create ~/.streamtasks/")?;
    Ok(())
}

/// Load config from ~/.streamtasks/config.toml (or return defaults if it doesn't exist)
pub fn load() -> Result<Config> {
    let path = base_dir()?.join("config.toml");
    if path.exists() {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        parse(&content).with_context(|| format!("failed to parse {}", path.display()))
    } else {
        Ok(Config::default())
    }
}

pub fn parse(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_yields_defaults() {
        let cfg = parse("").unwrap();
        assert_eq!(cfg.api_base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.widget_origin, "http://localhost:5173");
        assert!(!cfg.local);
        assert!(cfg.require_project);
        assert_eq!(cfg.missing_config, MissingConfig::Notice);
        assert_eq!(cfg.tick_rate_ms, 100);
        assert_eq!(cfg.toast_seconds, 4);
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = parse(
            r#"
            widget_origin = "https://overlay.example.com"
            local = true
            require_project = false
            missing_config = "setup"
            toast_seconds = 9

            [theme]
            accent = "magenta"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.widget_origin, "https://overlay.example.com");
        assert!(cfg.local);
        assert!(!cfg.require_project);
        assert_eq!(cfg.missing_config, MissingConfig::Setup);
        assert_eq!(cfg.toast_seconds, 9);
        assert_eq!(cfg.theme.accent.as_deref(), Some("magenta"));
    }

    #[test]
    fn unknown_missing_config_is_rejected() {
        assert!(parse(r#"missing_config = "explode""#).is_err());
    }
}
