// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One-snapshot-per-session store.
//!
//! Each session persists as a single JSON record under the sessions
//! directory, rewritten in full on every observable change. Writes go
//! to a `.tmp` sibling and are renamed into place, so readers never see
//! a partial record and the newest write wins. Recovery enumerates the
//! directory; a record that fails to decode is moved aside to `.bak`
//! and skipped, never fatal.

use ats_core::{JobId, SessionDetail, SessionId, SessionPersistenceStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Errors that can occur in session store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Point-in-time record persisted for one session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSession {
    pub detail: SessionDetail,
    pub status: SessionPersistenceStatus,
    /// Ids of the jobs attached to the session, in attach order.
    pub job_ids: Vec<JobId>,
    pub saved_at: DateTime<Utc>,
}

impl PersistedSession {
    pub fn new(
        detail: SessionDetail,
        status: SessionPersistenceStatus,
        job_ids: Vec<JobId>,
    ) -> Self {
        Self {
            detail,
            status,
            job_ids,
            saved_at: Utc::now(),
        }
    }

    pub fn session_id(&self) -> &SessionId {
        self.detail.id()
    }
}

/// Adapter seam the session holder persists through.
///
/// Idempotent keyed by session id; the newest write wins.
pub trait SessionPersister: Send + Sync {
    fn persist(&self, record: &PersistedSession) -> Result<(), StoreError>;
}

/// Directory-backed session store.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save a record atomically (write to `.tmp`, then rename).
    pub fn save(&self, record: &PersistedSession) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;

        let path = self.path_for(record.session_id());
        let tmp_path = path.with_extension("tmp");

        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, record)?;
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }

        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    /// Load one session's record if present.
    ///
    /// Returns `Ok(None)` for a missing or corrupt record; corrupt
    /// files are moved to `.bak` so recovery can proceed.
    pub fn load(&self, id: &SessionId) -> Result<Option<PersistedSession>, StoreError> {
        self.load_path(&self.path_for(id))
    }

    /// Enumerate every recoverable session record.
    pub fn load_all(&self) -> Result<Vec<PersistedSession>, StoreError> {
        let mut records = Vec::new();
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(records),
            Err(e) => return Err(e.into()),
        };

        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        for path in paths {
            if let Some(record) = self.load_path(&path)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Delete a session's record. Missing records are fine.
    pub fn remove(&self, id: &SessionId) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn load_path(&self, path: &Path) -> Result<Option<PersistedSession>, StoreError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_reader(BufReader::new(file)) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                let bak_path = path.with_extension("bak");
                warn!(
                    error = %e,
                    path = %path.display(),
                    bak = %bak_path.display(),
                    "Corrupt session record, moving to .bak and skipping",
                );
                fs::rename(path, &bak_path)?;
                Ok(None)
            }
        }
    }

    fn path_for(&self, id: &SessionId) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(id.as_str())))
    }
}

impl SessionPersister for SessionStore {
    fn persist(&self, record: &PersistedSession) -> Result<(), StoreError> {
        self.save(record)
    }
}

/// Map an opaque session id to a filesystem-safe file stem.
fn file_stem(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
