//! Runtime configuration for the core.
//!
//! # Responsibility
//! - Hold store location, lock wait bound, demo hold window and the
//!   isolation level used by the dirty-read surface.
//! - Load overrides from `ORGDESK_*` environment variables.
//!
//! # Invariants
//! - `Default` is always a usable configuration (in-memory store).
//! - Malformed environment values are rejected, never silently ignored.

use crate::logging::default_log_level;
use crate::txn::IsolationLevel;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "ORGDESK_DB_PATH";
pub const ENV_LOCK_TIMEOUT_MS: &str = "ORGDESK_LOCK_TIMEOUT_MS";
pub const ENV_DEMO_DELAY_MS: &str = "ORGDESK_DEMO_DELAY_MS";
pub const ENV_DIRTY_READ_ISOLATION: &str = "ORGDESK_DIRTY_READ_ISOLATION";
pub const ENV_LOG_LEVEL: &str = "ORGDESK_LOG_LEVEL";

const DEFAULT_LOCK_TIMEOUT_MS: u64 = 10_000;
const DEFAULT_DEMO_DELAY_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub key: &'static str,
    pub message: String,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid {}: {}", self.key, self.message)
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// SQLite file; `None` keeps the store in memory.
    pub db_path: Option<PathBuf>,
    /// Upper bound on a row-lock wait. Also the only deadlock breaker.
    pub lock_timeout_ms: u64,
    /// Hold window used by the delayed demonstration operations.
    pub demo_delay_ms: u64,
    pub dirty_read_isolation: IsolationLevel,
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            lock_timeout_ms: DEFAULT_LOCK_TIMEOUT_MS,
            demo_delay_ms: DEFAULT_DEMO_DELAY_MS,
            dirty_read_isolation: IsolationLevel::ReadUncommitted,
            log_level: default_log_level().to_string(),
        }
    }
}

impl CoreConfig {
    /// Defaults overlaid with `ORGDESK_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let value_of = |key: &'static str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|raw| !raw.is_empty())
        };

        if let Some(path) = value_of(ENV_DB_PATH) {
            config.db_path = Some(PathBuf::from(path));
        }
        if let Some(raw) = value_of(ENV_LOCK_TIMEOUT_MS) {
            config.lock_timeout_ms = parse_millis(ENV_LOCK_TIMEOUT_MS, &raw)?;
        }
        if let Some(raw) = value_of(ENV_DEMO_DELAY_MS) {
            config.demo_delay_ms = parse_millis(ENV_DEMO_DELAY_MS, &raw)?;
        }
        if let Some(raw) = value_of(ENV_DIRTY_READ_ISOLATION) {
            config.dirty_read_isolation = raw.parse().map_err(|message| ConfigError {
                key: ENV_DIRTY_READ_ISOLATION,
                message,
            })?;
        }
        if let Some(level) = value_of(ENV_LOG_LEVEL) {
            config.log_level = level;
        }

        Ok(config)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn demo_delay(&self) -> Duration {
        Duration::from_millis(self.demo_delay_ms)
    }
}

fn parse_millis(key: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.parse::<u64>().map_err(|err| ConfigError {
        key,
        message: format!("expected milliseconds, got `{raw}`: {err}"),
    })
}

#[cfg(test)]
mod tests {
    use super::{CoreConfig, ENV_DEMO_DELAY_MS, ENV_DIRTY_READ_ISOLATION, ENV_LOCK_TIMEOUT_MS};
    use crate::txn::IsolationLevel;
    use std::collections::HashMap;
    use std::time::Duration;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_use_memory_store_and_dirty_reads() {
        let config = CoreConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, CoreConfig::default());
        assert_eq!(config.db_path, None);
        assert_eq!(config.lock_timeout(), Duration::from_secs(10));
        assert_eq!(config.dirty_read_isolation, IsolationLevel::ReadUncommitted);
    }

    #[test]
    fn environment_overrides_are_applied() {
        let config = CoreConfig::from_lookup(lookup_from(&[
            (ENV_LOCK_TIMEOUT_MS, " 250 "),
            (ENV_DEMO_DELAY_MS, "40"),
            (ENV_DIRTY_READ_ISOLATION, "read_committed"),
        ]))
        .unwrap();

        assert_eq!(config.lock_timeout_ms, 250);
        assert_eq!(config.demo_delay(), Duration::from_millis(40));
        assert_eq!(config.dirty_read_isolation, IsolationLevel::ReadCommitted);
    }

    #[test]
    fn malformed_values_are_rejected() {
        let err = CoreConfig::from_lookup(lookup_from(&[(ENV_LOCK_TIMEOUT_MS, "soon")]))
            .unwrap_err();
        assert_eq!(err.key, ENV_LOCK_TIMEOUT_MS);

        let err = CoreConfig::from_lookup(lookup_from(&[(ENV_DIRTY_READ_ISOLATION, "snapshot")]))
            .unwrap_err();
        assert_eq!(err.key, ENV_DIRTY_READ_ISOLATION);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: CoreConfig = serde_json::from_str(r#"{"demo_delay_ms": 10}"#).unwrap();
        assert_eq!(config.demo_delay_ms, 10);
        assert_eq!(config.lock_timeout_ms, CoreConfig::default().lock_timeout_ms);
    }
}
