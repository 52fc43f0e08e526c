// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime-info file shared with out-of-process readers.
//!
//! The writer truncates and rewrites the whole file, at most once per
//! rewrite interval. Writers and readers coordinate through a side-car
//! lockfile (`<path>.lck`); readers return nothing when the file has
//! not changed since their last observation.

use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, UNIX_EPOCH};
use thiserror::Error;

/// Default minimum delay between rewrites.
const DEFAULT_REWRITE_INTERVAL: Duration = Duration::from_secs(3);

#[derive(Debug, Error)]
pub enum InfoFileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Exclusive side-car lock, released on drop.
struct SidecarLock {
    file: File,
}

impl SidecarLock {
    fn acquire(path: &Path) -> Result<Self, InfoFileError> {
        let lock_path = lock_path(path);
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(lock_path)?;
        file.lock_exclusive()?;
        Ok(Self { file })
    }
}

impl Drop for SidecarLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

fn lock_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".lck");
    PathBuf::from(os)
}

/// Throttled truncate-and-rewrite writer.
pub struct RuntimeInfoWriter {
    path: PathBuf,
    rewrite_interval: Duration,
    last_write: Option<Instant>,
}

impl RuntimeInfoWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_interval(path, DEFAULT_REWRITE_INTERVAL)
    }

    pub fn with_interval(path: impl Into<PathBuf>, rewrite_interval: Duration) -> Self {
        Self {
            path: path.into(),
            rewrite_interval,
            last_write: None,
        }
    }

    /// Rewrite the file under the side-car lock.
    ///
    /// Returns `false` (without writing) when the previous write was
    /// less than the rewrite interval ago.
    pub fn write(&mut self, content: &str) -> Result<bool, InfoFileError> {
        if let Some(last) = self.last_write {
            if last.elapsed() < self.rewrite_interval {
                return Ok(false);
            }
        }

        let _lock = SidecarLock::acquire(&self.path)?;
        let mut file = File::create(&self.path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        self.last_write = Some(Instant::now());
        Ok(true)
    }
}

/// Reader that only yields content newer than its last observation.
pub struct RuntimeInfoReader {
    path: PathBuf,
    last_modified_ms: u64,
}

impl RuntimeInfoReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_modified_ms: 0,
        }
    }

    /// Take the side-car lock and read the file if it changed since the
    /// last call; `None` when unchanged or absent.
    pub fn read_if_changed(&mut self) -> Result<Option<String>, InfoFileError> {
        let _lock = SidecarLock::acquire(&self.path)?;

        let modified_ms = match fs::metadata(&self.path) {
            Ok(meta) => meta
                .modified()
                .ok()
                .and_then(|m| m.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if modified_ms == self.last_modified_ms {
            return Ok(None);
        }
        self.last_modified_ms = modified_ms;
        Ok(Some(fs::read_to_string(&self.path)?))
    }
}

#[cfg(test)]
#[path = "info_file_tests.rs"]
mod tests;
