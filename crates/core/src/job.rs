// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job records attached to a session.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a job attached to a session.
///
/// Assigned by the job planner and scoped by the owning session, so
/// persisted job-id lists stay unambiguous across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl PartialEq<&str> for JobId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Family of test modules a job executes.
///
/// The runtime treats the two families as labelled disjoint sets; the
/// execution back-end behind each is out of scope here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleFamily {
    Tradefed,
    NonTradefed,
}

impl fmt::Display for ModuleFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleFamily::Tradefed => write!(f, "tradefed"),
            ModuleFamily::NonTradefed => write!(f, "non-tradefed"),
        }
    }
}

/// A job attached to a session's job list.
///
/// Jobs added before the session starts run with the initial batch;
/// jobs added later are picked up by the runner's poll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobInfo {
    pub id: JobId,
    /// Human-readable job name (test plan or module name).
    pub name: String,
    /// Driver that executes the job (opaque to the session runtime).
    pub driver: String,
    pub module_family: ModuleFamily,
    /// Fully assembled driver command arguments.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub command_args: String,
}

impl JobInfo {
    pub fn new(id: impl Into<JobId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            driver: String::new(),
            module_family: ModuleFamily::Tradefed,
            command_args: String::new(),
        }
    }

    pub fn with_driver(mut self, driver: impl Into<String>) -> Self {
        self.driver = driver.into();
        self
    }

    pub fn with_module_family(mut self, family: ModuleFamily) -> Self {
        self.module_family = family;
        self
    }

    pub fn with_command_args(mut self, args: impl Into<String>) -> Self {
        self.command_args = args.into();
        self
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
