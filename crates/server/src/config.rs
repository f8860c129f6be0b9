// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration loading: `textops.toml` plus `TEXTOPS_*` environment
//! overrides.
//!
//! Durations are humane strings (`"500ms"`, `"1s"`, `"5m"`, `"2h"`).

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use textops_core::WorkerId;
use textops_engine::{default_worker_id, WorkerConfig};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid duration {value:?} for {key}")]
    InvalidDuration { key: String, value: String },
}

/// Which database driver backs the repository and queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum PersistenceProvider {
    #[default]
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, rename_all = "snake_case")]
pub struct PersistenceConfig {
    pub provider: PersistenceProvider,
    pub connection_string: Option<String>,
}

impl PersistenceConfig {
    /// Dialect-specific connection string, with a local-file default for
    /// SQLite.
    pub fn connection_string(&self) -> String {
        match (&self.connection_string, self.provider) {
            (Some(s), _) => s.clone(),
            (None, PersistenceProvider::Sqlite) => "sqlite:textops.db".to_string(),
            (None, PersistenceProvider::Postgres) => {
                "postgres://localhost/textops".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct WorkerSettings {
    pub worker_id: Option<String>,
    pub poll_interval: String,
    pub error_retry_delay: String,
    pub max_attempts: i64,
    pub lock_timeout: String,
    pub stale_lock_check_interval: String,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            worker_id: None,
            poll_interval: "1s".to_string(),
            error_retry_delay: "5s".to_string(),
            max_attempts: 3,
            lock_timeout: "5m".to_string(),
            stale_lock_check_interval: "1m".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ServerSettings {
    pub bind_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { bind_addr: "127.0.0.1:8080".to_string() }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default, rename_all = "snake_case")]
pub struct Config {
    pub persistence: PersistenceConfig,
    pub worker: WorkerSettings,
    pub server: ServerSettings,
}

impl Config {
    /// Load from a TOML file when it exists, then apply `TEXTOPS_*`
    /// environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            toml::from_str(&raw)?
        } else {
            Config::default()
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(provider) = std::env::var("TEXTOPS_PERSISTENCE_PROVIDER") {
            if provider.eq_ignore_ascii_case("postgres") {
                self.persistence.provider = PersistenceProvider::Postgres;
            } else if provider.eq_ignore_ascii_case("sqlite") {
                self.persistence.provider = PersistenceProvider::Sqlite;
            }
        }
        if let Ok(cs) = std::env::var("TEXTOPS_PERSISTENCE_CONNECTION_STRING") {
            self.persistence.connection_string = Some(cs);
        }
        if let Ok(id) = std::env::var("TEXTOPS_WORKER_ID") {
            self.worker.worker_id = Some(id);
        }
        if let Ok(addr) = std::env::var("TEXTOPS_BIND_ADDR") {
            self.server.bind_addr = addr;
        }
    }

    /// Resolve the worker settings into engine tunables.
    pub fn worker_config(&self) -> Result<WorkerConfig, ConfigError> {
        Ok(WorkerConfig {
            worker_id: self
                .worker
                .worker_id
                .as_deref()
                .map(WorkerId::new)
                .unwrap_or_else(default_worker_id),
            poll_interval: parse_duration("worker.poll_interval", &self.worker.poll_interval)?,
            error_retry_delay: parse_duration(
                "worker.error_retry_delay",
                &self.worker.error_retry_delay,
            )?,
            max_attempts: self.worker.max_attempts,
            lock_timeout: parse_duration("worker.lock_timeout", &self.worker.lock_timeout)?,
            stale_check_interval: parse_duration(
                "worker.stale_lock_check_interval",
                &self.worker.stale_lock_check_interval,
            )?,
        })
    }
}

/// Parse `"500ms"`, `"30s"`, `"5m"`, or `"2h"`.
pub fn parse_duration(key: &str, value: &str) -> Result<Duration, ConfigError> {
    let value = value.trim();
    let err = || ConfigError::InvalidDuration {
        key: key.to_string(),
        value: value.to_string(),
    };
    let (digits, unit) = value.split_at(value.find(|c: char| !c.is_ascii_digit()).ok_or_else(err)?);
    let n: u64 = digits.parse().map_err(|_| err())?;
    match unit {
        "ms" => Ok(Duration::from_millis(n)),
        "s" => Ok(Duration::from_secs(n)),
        "m" => Ok(Duration::from_secs(n * 60)),
        "h" => Ok(Duration::from_secs(n * 60 * 60)),
        _ => Err(err()),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
