//! Process configuration read from the environment.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::store::SqliteLocalStore;

const DEFAULT_API_URL: &str = "http://localhost:3000";
const DEFAULT_HEALTH_PATH: &str = "/api/inventory";
const DEFAULT_SYNC_INTERVAL_SECS: u64 = 30;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Settings for the sync layer.
///
/// | variable | default |
/// |---|---|
/// | `PANTRY_API_URL` | `http://localhost:3000` |
/// | `PANTRY_AUTH_TOKEN` | unset |
/// | `PANTRY_DB_PATH` | `{data_dir}/pantry/pantry.db` |
/// | `PANTRY_SYNC_INTERVAL_SECS` | `30` |
/// | `PANTRY_REQUEST_TIMEOUT_SECS` | `10` |
/// | `PANTRY_HEALTH_PATH` | `/api/inventory` |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub api_url: String,
    pub auth_token: Option<String>,
    pub db_path: PathBuf,
    pub sync_interval: Duration,
    pub request_timeout: Duration,
    pub health_path: String,
}

impl SyncConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_url = get("PANTRY_API_URL")
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let db_path = match get("PANTRY_DB_PATH") {
            Some(path) => PathBuf::from(path),
            None => SqliteLocalStore::default_path()?,
        };

        let sync_interval = match get("PANTRY_SYNC_INTERVAL_SECS") {
            Some(raw) => parse_secs("PANTRY_SYNC_INTERVAL_SECS", &raw)?,
            None => Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS),
        };

        let request_timeout = match get("PANTRY_REQUEST_TIMEOUT_SECS") {
            Some(raw) => parse_secs("PANTRY_REQUEST_TIMEOUT_SECS", &raw)?,
            None => Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        };

        let health_path = get("PANTRY_HEALTH_PATH").unwrap_or_else(|| DEFAULT_HEALTH_PATH.to_string());

        Ok(Self {
            api_url,
            auth_token: get("PANTRY_AUTH_TOKEN"),
            db_path,
            sync_interval,
            request_timeout,
            health_path,
        })
    }
}

fn parse_secs(key: &str, raw: &str) -> Result<Duration> {
    let secs: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a whole number of seconds, got {raw:?}"))?;
    anyhow::ensure!(secs > 0, "{key} must be greater than zero");
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = SyncConfig::from_lookup(lookup(&[("PANTRY_DB_PATH", "/tmp/pantry.db")])).unwrap();

        assert_eq!(config.api_url, "http://localhost:3000");
        assert_eq!(config.auth_token, None);
        assert_eq!(config.db_path, PathBuf::from("/tmp/pantry.db"));
        assert_eq!(config.sync_interval, Duration::from_secs(30));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.health_path, "/api/inventory");
    }

    #[test]
    fn values_are_read_and_normalised() {
        let config = SyncConfig::from_lookup(lookup(&[
            ("PANTRY_API_URL", "https://pantry.example.com/"),
            ("PANTRY_AUTH_TOKEN", "secret"),
            ("PANTRY_DB_PATH", "/var/lib/pantry.db"),
            ("PANTRY_SYNC_INTERVAL_SECS", "5"),
            ("PANTRY_REQUEST_TIMEOUT_SECS", " 3 "),
            ("PANTRY_HEALTH_PATH", "/api/health"),
        ]))
        .unwrap();

        assert_eq!(config.api_url, "https://pantry.example.com");
        assert_eq!(config.auth_token.as_deref(), Some("secret"));
        assert_eq!(config.sync_interval, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.health_path, "/api/health");
    }

    #[test]
    fn blank_token_counts_as_unset() {
        let config = SyncConfig::from_lookup(lookup(&[
            ("PANTRY_DB_PATH", "/tmp/pantry.db"),
            ("PANTRY_AUTH_TOKEN", "  "),
        ]))
        .unwrap();
        assert_eq!(config.auth_token, None);
    }

    #[test]
    fn bad_intervals_are_rejected() {
        for raw in ["soon", "0", "-4"] {
            let err = SyncConfig::from_lookup(lookup(&[
                ("PANTRY_DB_PATH", "/tmp/pantry.db"),
                ("PANTRY_SYNC_INTERVAL_SECS", raw),
            ]))
            .unwrap_err();
            assert!(err.to_string().contains("PANTRY_SYNC_INTERVAL_SECS"), "{err}");
        }
    }
}
