// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Console runtime configuration.
//!
//! Loaded from a TOML file; every field has a default so an absent or
//! empty file yields a usable configuration. Unknown keys are rejected
//! to catch typos early.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors loading the console configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Console-wide settings for the session runtime.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsoleConfig {
    /// Root state directory (session snapshots live underneath).
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    /// Command-file watcher poll cadence, in seconds.
    #[serde(default = "default_watch_interval_secs")]
    pub watch_interval_secs: u64,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            state_dir: default_state_dir(),
            watch_interval_secs: default_watch_interval_secs(),
        }
    }
}

impl ConsoleConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Directory holding per-session snapshot records.
    pub fn sessions_dir(&self) -> PathBuf {
        self.state_dir.join("sessions")
    }

    pub fn watch_interval(&self) -> Duration {
        Duration::from_secs(self.watch_interval_secs)
    }
}

/// `$XDG_STATE_HOME/ats` (or the platform equivalent), falling back to
/// `~/.local/state/ats`.
fn default_state_dir() -> PathBuf {
    dirs::state_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("state")))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ats")
}

fn default_watch_interval_secs() -> u64 {
    20
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
