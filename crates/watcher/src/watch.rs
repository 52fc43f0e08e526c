// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watched-file records and the polling loop.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Default poll cadence.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(20);

/// Notified when a watched command file (or one of its dependencies)
/// changes.
pub trait CommandFileListener: Send + Sync {
    /// `extra_args` are the argv tokens to append when the file is
    /// reloaded.
    fn on_command_file_changed(&self, path: &Path, extra_args: &[String]);
}

impl<F> CommandFileListener for F
where
    F: Fn(&Path, &[String]) + Send + Sync,
{
    fn on_command_file_changed(&self, path: &Path, extra_args: &[String]) {
        self(path, extra_args)
    }
}

/// A watched command file: path, last observed mtime, the extra argv to
/// append on reload, and the files it transitively includes.
///
/// Dependencies are watched for change but never reloaded on their own;
/// a dependency change is reported against the declaring file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFile {
    pub path: PathBuf,
    /// Milliseconds since epoch; 0 means unknown.
    pub modified_ms: u64,
    pub extra_args: Vec<String>,
    pub dependencies: Vec<CommandFile>,
}

impl CommandFile {
    /// Record a file with its current on-disk mtime.
    pub fn new(path: impl Into<PathBuf>, extra_args: Vec<String>) -> Self {
        let path = path.into();
        let modified_ms = mtime_ms(&path);
        Self {
            path,
            modified_ms,
            extra_args,
            dependencies: Vec::new(),
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<CommandFile>) -> Self {
        self.dependencies = dependencies;
        self
    }
}

/// Current mtime in epoch milliseconds; 0 on a missing file or I/O
/// error.
pub(crate) fn mtime_ms(path: &Path) -> u64 {
    std::fs::metadata(path)
        .and_then(|meta| meta.modified())
        .ok()
        .and_then(|mtime| mtime.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Polling watcher over a set of command files.
pub struct CommandFileWatcher {
    inner: Arc<Inner>,
}

struct Inner {
    files: Mutex<HashMap<PathBuf, CommandFile>>,
    listener: Box<dyn CommandFileListener>,
    interval: Duration,
    cancelled: AtomicBool,
    wake: Notify,
}

impl CommandFileWatcher {
    pub fn new(listener: impl CommandFileListener + 'static) -> Self {
        Self::with_interval(listener, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_interval(listener: impl CommandFileListener + 'static, interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                files: Mutex::new(HashMap::new()),
                listener: Box::new(listener),
                interval,
                cancelled: AtomicBool::new(false),
                wake: Notify::new(),
            }),
        }
    }

    /// Add (or replace) a watched file, keyed by its path.
    pub fn watch(&self, file: CommandFile) {
        let mut files = self.inner.files.lock();
        files.insert(file.path.clone(), file);
    }

    pub fn unwatch(&self, path: &Path) {
        self.inner.files.lock().remove(path);
    }

    pub fn watched_count(&self) -> usize {
        self.inner.files.lock().len()
    }

    /// Ask the background task to stop; the loop exits before the next
    /// poll.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::SeqCst);
        self.inner.wake.notify_one();
    }

    /// Shorten the current sleep so the next poll happens promptly.
    pub fn poke(&self) {
        self.inner.wake.notify_one();
    }

    /// Run one poll tick over a copy of the watched set.
    ///
    /// Public so callers (and tests) can poll on demand; the background
    /// task calls this on every tick.
    pub fn check_for_updates(&self) {
        let snapshot: Vec<CommandFile> = {
            let files = self.inner.files.lock();
            files.values().cloned().collect()
        };

        let mut checked: HashSet<PathBuf> = HashSet::new();
        let mut updated: Vec<CommandFile> = Vec::new();

        for mut file in snapshot {
            if check_file(&mut file, &mut checked, self.inner.listener.as_ref()) {
                debug!(file = %file.path.display(), "command file changed");
            }
            updated.push(file);
        }

        // Write refreshed mtimes back, but only for files still watched.
        let mut files = self.inner.files.lock();
        for file in updated {
            if files.contains_key(&file.path) {
                files.insert(file.path.clone(), file);
            }
        }
    }

    /// Spawn the polling loop on the current tokio runtime.
    pub fn spawn(&self) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let watcher = CommandFileWatcher {
            inner: Arc::clone(&inner),
        };
        tokio::spawn(async move {
            info!(interval_secs = inner.interval.as_secs(), "command file watcher started");
            loop {
                if inner.cancelled.load(Ordering::SeqCst) {
                    break;
                }
                watcher.check_for_updates();

                tokio::select! {
                    _ = inner.wake.notified() => {}
                    _ = tokio::time::sleep(inner.interval) => {}
                }

                if inner.cancelled.load(Ordering::SeqCst) {
                    break;
                }
            }
            info!("command file watcher stopped");
        })
    }
}

/// Check one file (and, if it is unchanged, its dependencies).
///
/// Returns whether a notification was dispatched for `file`. A path
/// already checked this tick is treated as unchanged, which bounds the
/// work on shared dependencies and short include cycles.
fn check_file(
    file: &mut CommandFile,
    checked: &mut HashSet<PathBuf>,
    listener: &dyn CommandFileListener,
) -> bool {
    if !checked.insert(file.path.clone()) {
        return false;
    }

    let current = mtime_ms(&file.path);
    if current != 0 && current != file.modified_ms {
        file.modified_ms = current;
        listener.on_command_file_changed(&file.path, &file.extra_args);
        return true;
    }

    for dep in &mut file.dependencies {
        if dep_changed(dep, checked) {
            listener.on_command_file_changed(&file.path, &file.extra_args);
            return true;
        }
    }
    false
}

/// Whether a dependency (or any of its own dependencies) changed.
/// Dependencies produce no notification of their own.
fn dep_changed(dep: &mut CommandFile, checked: &mut HashSet<PathBuf>) -> bool {
    if !checked.insert(dep.path.clone()) {
        return false;
    }

    let current = mtime_ms(&dep.path);
    if current != 0 && current != dep.modified_ms {
        dep.modified_ms = current;
        return true;
    }

    dep.dependencies
        .iter_mut()
        .any(|nested| dep_changed(nested, checked))
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
