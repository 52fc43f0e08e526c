// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session identity, configuration, and detail snapshots.
//!
//! `SessionDetail` is the externally visible view of a session:
//! immutable `SessionConfig` captured at creation plus the mutable
//! `SessionOutput` bags (properties, plugin errors, plugin outputs).
//! Holders hand out owned snapshots of these types, never references
//! into their internal state.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque, non-empty session identifier, unique for the lifetime of
/// the process plus any persisted snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh globally-unique identifier for a new session.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading characters of the id, for compact log lines.
    pub fn short(&self) -> &str {
        self.0.get(..8).unwrap_or(&self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Well-known property set when a session is aborted while running.
pub const ABORTED_WHEN_RUNNING_KEY: &str = "session.aborted_when_running";

/// Persistence status recovered sessions are reset to.
pub const INITIAL_PERSISTENCE_STATUS: SessionPersistenceStatus =
    SessionPersistenceStatus::Starting;

/// Immutable configuration captured at session creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub id: SessionId,
    pub name: String,
    /// Initial property bag the session's mutable properties start from.
    #[serde(default)]
    pub initial_properties: IndexMap<String, String>,
}

impl SessionConfig {
    pub fn new(id: impl Into<SessionId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            initial_properties: IndexMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.initial_properties.insert(key.into(), value.into());
        self
    }
}

/// Coarse phase stored with every persisted snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPersistenceStatus {
    Starting,
    Running,
    Finalizing,
}

impl fmt::Display for SessionPersistenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPersistenceStatus::Starting => write!(f, "starting"),
            SessionPersistenceStatus::Running => write!(f, "running"),
            SessionPersistenceStatus::Finalizing => write!(f, "finalizing"),
        }
    }
}

/// Error record appended by a plugin (or on a plugin's behalf).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionPluginError {
    pub plugin_label: String,
    pub message: String,
}

impl SessionPluginError {
    pub fn new(plugin_label: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            plugin_label: plugin_label.into(),
            message: message.into(),
        }
    }
}

/// Mutable session output: properties, plugin errors, plugin outputs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionOutput {
    #[serde(default)]
    pub properties: IndexMap<String, String>,
    #[serde(default)]
    pub plugin_errors: Vec<SessionPluginError>,
    /// Opaque structured value per plugin label.
    #[serde(default)]
    pub plugin_outputs: IndexMap<String, serde_json::Value>,
}

/// Externally visible session view: config plus output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDetail {
    pub config: SessionConfig,
    #[serde(default)]
    pub output: SessionOutput,
}

impl SessionDetail {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            output: SessionOutput::default(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.config.id
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
