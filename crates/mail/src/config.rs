//! Configuration loading for the sync service
//!
//! Each setting is resolved in order of priority:
//! 1. JSON file (~/.config/mailsync/mailsync.json)
//! 2. Environment variables (`MAILSYNC_*`)
//! 3. Built-in defaults

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::gmail::GmailClient;
use crate::sync::SyncOptions;

/// Config filename in the mailsync config directory
const CONFIG_FILE: &str = "mailsync.json";

/// Default SQLite database filename in the config directory
const DATABASE_FILE: &str = "mail.db";

const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8787";

/// Request handler threads in the HTTP entry point
const DEFAULT_WORKERS: usize = 4;

/// On-disk config file format; every key is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    db_path: Option<PathBuf>,
    listen_addr: Option<String>,
    gmail_base_url: Option<String>,
    page_size: Option<usize>,
    inbox_query: Option<String>,
    abort_on_fetch_error: Option<bool>,
    workers: Option<usize>,
}

/// Settings for the sync service
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// SQLite database location
    pub db_path: PathBuf,
    /// Address the HTTP entry point binds to
    pub listen_addr: String,
    /// Gmail API root
    pub gmail_base_url: String,
    /// Message IDs requested per sync
    pub page_size: usize,
    /// Provider query scoping each sync
    pub inbox_query: String,
    pub abort_on_fetch_error: bool,
    /// Upper bound on requests handled at once
    pub workers: usize,
}

impl ServiceConfig {
    /// Load config from the default config file and environment
    pub fn load() -> Result<Self> {
        let file = if config::config_exists(CONFIG_FILE) {
            config::load_json(CONFIG_FILE)?
        } else {
            ConfigFile::default()
        };
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Load config from a specific JSON file, with environment fallbacks
    pub fn from_file(path: &Path) -> Result<Self> {
        let file: ConfigFile = config::load_json_file(path)?;
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    /// Parse config from a JSON string, with environment fallbacks
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ConfigFile = serde_json::from_str(json).context("Failed to parse config JSON")?;
        Self::resolve(file, |key| std::env::var(key).ok())
    }

    fn resolve(file: ConfigFile, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let page_size = match file.page_size {
            Some(size) => size,
            None => match env("MAILSYNC_PAGE_SIZE") {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid MAILSYNC_PAGE_SIZE: {:?}", raw))?,
                None => SyncOptions::default().max_results,
            },
        };
        if page_size == 0 {
            bail!("Page size must be at least 1");
        }

        let workers = match file.workers {
            Some(workers) => workers,
            None => match env("MAILSYNC_WORKERS") {
                Some(raw) => raw
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid MAILSYNC_WORKERS: {:?}", raw))?,
                None => DEFAULT_WORKERS,
            },
        };
        if workers == 0 {
            bail!("At least one worker is required");
        }

        let abort_on_fetch_error = match file.abort_on_fetch_error {
            Some(flag) => flag,
            None => match env("MAILSYNC_ABORT_ON_FETCH_ERROR") {
                Some(raw) => parse_flag(&raw)
                    .with_context(|| format!("Invalid MAILSYNC_ABORT_ON_FETCH_ERROR: {:?}", raw))?,
                None => false,
            },
        };

        Ok(Self {
            db_path: file
                .db_path
                .or_else(|| env("MAILSYNC_DB_PATH").map(PathBuf::from))
                .unwrap_or_else(Self::default_db_path),
            listen_addr: file
                .listen_addr
                .or_else(|| env("MAILSYNC_LISTEN_ADDR"))
                .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string()),
            gmail_base_url: file
                .gmail_base_url
                .or_else(|| env("MAILSYNC_GMAIL_BASE_URL"))
                .unwrap_or_else(|| GmailClient::BASE_URL.to_string()),
            page_size,
            inbox_query: file
                .inbox_query
                .or_else(|| env("MAILSYNC_INBOX_QUERY"))
                .unwrap_or_else(|| SyncOptions::default().query),
            abort_on_fetch_error,
            workers,
        })
    }

    /// Default database path (~/.config/mailsync/mail.db)
    pub fn default_db_path() -> PathBuf {
        config::config_path(DATABASE_FILE).unwrap_or_else(|| PathBuf::from(DATABASE_FILE))
    }

    /// Sync tuning derived from this config
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            max_results: self.page_size,
            query: self.inbox_query.clone(),
            abort_on_fetch_error: self.abort_on_fetch_error,
        }
    }
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => bail!("expected a boolean, got {:?}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn resolve_with(json: &str, vars: &[(&str, &str)]) -> Result<ServiceConfig> {
        let file: ConfigFile = serde_json::from_str(json).unwrap();
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServiceConfig::resolve(file, |key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = resolve_with("{}", &[]).unwrap();
        assert_eq!(config.page_size, 50);
        assert_eq!(config.inbox_query, "in:inbox");
        assert_eq!(config.listen_addr, "127.0.0.1:8787");
        assert_eq!(config.gmail_base_url, GmailClient::BASE_URL);
        assert!(!config.abort_on_fetch_error);
        assert_eq!(config.workers, 4);
        assert!(config.db_path.ends_with("mail.db"));
    }

    #[test]
    fn test_env_overrides_defaults() {
        let config = resolve_with(
            "{}",
            &[
                ("MAILSYNC_PAGE_SIZE", "10"),
                ("MAILSYNC_INBOX_QUERY", "in:inbox is:unread"),
                ("MAILSYNC_DB_PATH", "/tmp/x.db"),
                ("MAILSYNC_ABORT_ON_FETCH_ERROR", "yes"),
                ("MAILSYNC_WORKERS", "8"),
            ],
        )
        .unwrap();
        assert_eq!(config.page_size, 10);
        assert_eq!(config.inbox_query, "in:inbox is:unread");
        assert_eq!(config.db_path, PathBuf::from("/tmp/x.db"));
        assert!(config.abort_on_fetch_error);
        assert_eq!(config.workers, 8);
    }

    #[test]
    fn test_file_takes_priority_over_env() {
        let config = resolve_with(
            r#"{ "page_size": 25, "listen_addr": "0.0.0.0:9000" }"#,
            &[
                ("MAILSYNC_PAGE_SIZE", "10"),
                ("MAILSYNC_LISTEN_ADDR", "127.0.0.1:1"),
            ],
        )
        .unwrap();
        assert_eq!(config.page_size, 25);
        assert_eq!(config.listen_addr, "0.0.0.0:9000");
    }

    #[test]
    fn test_invalid_values() {
        assert!(resolve_with("{}", &[("MAILSYNC_PAGE_SIZE", "many")]).is_err());
        assert!(resolve_with(r#"{ "page_size": 0 }"#, &[]).is_err());
        assert!(resolve_with(r#"{ "workers": 0 }"#, &[]).is_err());
        assert!(resolve_with("{}", &[("MAILSYNC_ABORT_ON_FETCH_ERROR", "maybe")]).is_err());
    }

    #[test]
    fn test_sync_options() {
        let config = resolve_with(r#"{ "page_size": 5, "abort_on_fetch_error": true }"#, &[])
            .unwrap();
        let options = config.sync_options();
        assert_eq!(options.max_results, 5);
        assert_eq!(options.query, "in:inbox");
        assert!(options.abort_on_fetch_error);
    }

    #[test]
    fn test_from_json() {
        let config = ServiceConfig::from_json(
            r#"{
                "db_path": "/srv/mail.db",
                "listen_addr": "0.0.0.0:80",
                "gmail_base_url": "http://localhost:9999",
                "page_size": 20,
                "inbox_query": "in:inbox newer_than:7d",
                "abort_on_fetch_error": true,
                "workers": 2
            }"#,
        )
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/srv/mail.db"));
        assert_eq!(config.listen_addr, "0.0.0.0:80");
        assert_eq!(config.gmail_base_url, "http://localhost:9999");
        assert_eq!(config.page_size, 20);
        assert_eq!(config.inbox_query, "in:inbox newer_than:7d");
        assert!(config.abort_on_fetch_error);
        assert_eq!(config.workers, 2);

        assert!(ServiceConfig::from_json("not json").is_err());
        assert!(ServiceConfig::from_json(r#"{ "page_size": "ten" }"#).is_err());
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mailsync.json");
        std::fs::write(&path, r#"{ "db_path": "/var/lib/mailsync/mail.db" }"#).unwrap();

        let config = ServiceConfig::from_file(&path).unwrap();
        assert_eq!(config.db_path, PathBuf::from("/var/lib/mailsync/mail.db"));
        assert!(ServiceConfig::from_file(&dir.path().join("missing.json")).is_err());
    }
}
