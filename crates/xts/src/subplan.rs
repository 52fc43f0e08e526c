// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sub-plan storage.
//!
//! A sub-plan is a saved filter set selecting modules and tests for a
//! retry or curated run. Plans live as JSON under
//! `<xts_root>/subplans/<name>.json`; a running session works from a
//! backup copy so concurrent edits to the live plan cannot affect it.

use ats_core::SessionId;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors from sub-plan storage.
#[derive(Debug, Error)]
pub enum SubPlanError {
    #[error("sub-plan {0} not found")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A saved filter set, plus the device build fingerprint of the run it
/// was captured from (used to warn on retries against other builds).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubPlan {
    pub name: String,
    #[serde(default)]
    pub include_filters: Vec<String>,
    #[serde(default)]
    pub exclude_filters: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_build_fingerprint: Option<String>,
}

impl SubPlan {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.include_filters.is_empty() && self.exclude_filters.is_empty()
    }
}

/// One run's private copy of a live sub-plan.
#[derive(Debug, Clone)]
pub struct SubPlanBackup {
    pub plan: SubPlan,
    pub path: PathBuf,
}

/// Directory-backed sub-plan store.
#[derive(Debug, Clone)]
pub struct SubPlanStore {
    dir: PathBuf,
}

impl SubPlanStore {
    /// Store rooted at `<xts_root>/subplans`.
    pub fn new(xts_root: &Path) -> Self {
        Self {
            dir: xts_root.join("subplans"),
        }
    }

    /// Save a plan atomically (write to `.tmp`, then rename).
    pub fn save(&self, plan: &SubPlan) -> Result<(), SubPlanError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(&plan.name);
        let tmp_path = path.with_extension("tmp");
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, plan)?;
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    pub fn load(&self, name: &str) -> Result<SubPlan, SubPlanError> {
        let path = self.path_for(name);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SubPlanError::NotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    /// Copy the live plan to a run-scoped backup and parse the copy.
    ///
    /// The backup is keyed by plan name and run id, so concurrent runs
    /// of the same plan each get their own copy; the returned plan is
    /// read back from the backup file, so edits to the live plan after
    /// this point cannot reach the run.
    pub fn backup(&self, name: &str, run_id: &SessionId) -> Result<SubPlanBackup, SubPlanError> {
        let backup_dir = self.dir.join("backups");
        fs::create_dir_all(&backup_dir)?;
        let path = backup_dir.join(format!("{name}-{run_id}.json"));

        if let Err(e) = fs::copy(self.path_for(name), &path) {
            if e.kind() == std::io::ErrorKind::NotFound {
                return Err(SubPlanError::NotFound(name.to_string()));
            }
            return Err(e.into());
        }

        let file = File::open(&path)?;
        let plan = serde_json::from_reader(BufReader::new(file))?;
        debug!(plan = name, backup = %path.display(), "backed up sub-plan");
        Ok(SubPlanBackup { plan, path })
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_file()
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

#[cfg(test)]
#[path = "subplan_tests.rs"]
mod tests;
