// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session runner task.
//!
//! One cooperative task drives a session end to end:
//!
//! ```text
//! Created -> Preparing -> Starting -> Running -> Ended -> Closed
//! ```
//!
//! Notifications received before the session runs are cached and
//! delivered in arrival order before `SessionStartingEvent`; later ones
//! dispatch on pool tasks that are all awaited during the Ended drain.
//! Any job-runner error is captured, forwarded to the plugins'
//! `on_session_ended`, and returned after cleanup; plugin close actions
//! run regardless.

use crate::detail::SessionDetailHolder;
use crate::plugin::{PluginRunner, SessionPlugin};
use ats_core::{
    JobInfo, SessionDetail, SessionEndedEvent, SessionId, SessionNotification,
    SessionPersistenceStatus, SessionStartedEvent, SessionStartingEvent, FieldMask,
    ABORTED_WHEN_RUNNING_KEY,
};
use ats_messaging::MessageSender;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Session-level failures surfaced on the `on_session_ended` path.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    #[error("job runner failed: {0}")]
    JobRunner(String),
    #[error("session interrupted: {0}")]
    Interrupted(String),
}

/// Executes the session's jobs. Device scheduling lives behind this
/// seam.
#[async_trait]
pub trait JobRunner: Send + Sync {
    /// Run jobs until completion, polling the holder for late
    /// additions.
    async fn run_jobs(&self, holder: &SessionDetailHolder) -> Result<(), SessionError>;

    /// Ask the in-flight jobs to stop.
    fn abort(&self);
}

/// Runner lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum RunState {
    Created,
    Preparing,
    Starting,
    Running,
    Ended,
    Closed,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Created => "created",
            RunState::Preparing => "preparing",
            RunState::Starting => "starting",
            RunState::Running => "running",
            RunState::Ended => "ended",
            RunState::Closed => "closed",
        };
        write!(f, "{name}")
    }
}

enum NotificationMode {
    /// Before the session runs: notifications are cached.
    Caching,
    /// Session running: notifications dispatch on pool tasks.
    Live,
    /// Final drain started: notifications are refused.
    Draining,
}

struct Notifications {
    mode: NotificationMode,
    cached: Vec<SessionNotification>,
    tasks: Vec<JoinHandle<()>>,
}

/// Orchestrates a single session's lifecycle end-to-end.
pub struct SessionRunner {
    holder: Arc<SessionDetailHolder>,
    plugins: Arc<PluginRunner>,
    configured_plugins: Mutex<Vec<Arc<dyn SessionPlugin>>>,
    initial_jobs: Mutex<Vec<JobInfo>>,
    job_runner: Arc<dyn JobRunner>,
    sender: Option<Arc<MessageSender>>,
    state: Mutex<RunState>,
    aborted: AtomicBool,
    notifications: Mutex<Notifications>,
}

impl SessionRunner {
    pub fn new(
        holder: Arc<SessionDetailHolder>,
        plugins: Vec<Arc<dyn SessionPlugin>>,
        job_runner: Arc<dyn JobRunner>,
        sender: Option<Arc<MessageSender>>,
    ) -> Self {
        let plugin_runner = Arc::new(PluginRunner::new(Arc::clone(&holder)));
        Self {
            holder,
            plugins: plugin_runner,
            configured_plugins: Mutex::new(plugins),
            initial_jobs: Mutex::new(Vec::new()),
            job_runner,
            sender,
            state: Mutex::new(RunState::Created),
            aborted: AtomicBool::new(false),
            notifications: Mutex::new(Notifications {
                mode: NotificationMode::Caching,
                cached: Vec::new(),
                tasks: Vec::new(),
            }),
        }
    }

    pub fn holder(&self) -> &Arc<SessionDetailHolder> {
        &self.holder
    }

    pub fn session_id(&self) -> SessionId {
        self.holder.session_id()
    }

    pub fn state(&self) -> RunState {
        *self.state.lock()
    }

    /// Jobs to attach during the Preparing phase, before any plugin
    /// runs.
    pub fn queue_initial_jobs(&self, jobs: Vec<JobInfo>) {
        self.initial_jobs.lock().extend(jobs);
    }

    /// Safe from any state; returns a consistent view as of the monitor
    /// acquisition.
    pub fn get_session(&self, mask: Option<&FieldMask>) -> SessionDetail {
        self.holder.build_session_detail(mask)
    }

    /// Route a notification to the session's plugins.
    ///
    /// Returns `false` once the final drain has begun. Before the
    /// session runs, notifications are cached in arrival order;
    /// afterwards each accepted one dispatches on a pool task the
    /// runner awaits before closing.
    pub fn notify_session(self: &Arc<Self>, notification: SessionNotification) -> bool {
        let mut notifications = self.notifications.lock();
        match notifications.mode {
            NotificationMode::Caching => {
                notifications.cached.push(notification);
                true
            }
            NotificationMode::Live => {
                let plugins = Arc::clone(&self.plugins);
                let task = tokio::spawn(async move {
                    plugins.fire_notification(&notification);
                });
                notifications.tasks.push(task);
                true
            }
            NotificationMode::Draining => false,
        }
    }

    /// Abort the session. Idempotent; a no-op for the job graph once
    /// the session has ended.
    pub fn abort_session(&self) {
        if self.state() >= RunState::Ended {
            return;
        }
        if self.aborted.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(session_id = %self.session_id().short(), "aborting session");
        self.holder
            .put_session_property(ABORTED_WHEN_RUNNING_KEY, "true");
        self.job_runner.abort();
    }

    /// Drive the session from Created to Closed.
    ///
    /// The job-runner error, if any, is returned after plugins observed
    /// it and every resource was released.
    pub async fn run(self: Arc<Self>) -> Result<(), SessionError> {
        let session_id = self.session_id();
        info!(session_id = %session_id.short(), "session preparing");

        self.set_state(RunState::Preparing);
        self.holder
            .set_persistence_status(SessionPersistenceStatus::Starting);
        for job in std::mem::take(&mut *self.initial_jobs.lock()) {
            self.holder.add_job(job);
        }

        self.set_state(RunState::Starting);
        self.plugins
            .load(std::mem::take(&mut *self.configured_plugins.lock()));
        if let Some(sender) = &self.sender {
            sender.install_subscribers(self.plugins.subscriber_groups());
        }

        // Cached notifications go out synchronously, in arrival order,
        // before on_session_starting.
        let cached = {
            let mut notifications = self.notifications.lock();
            notifications.mode = NotificationMode::Live;
            std::mem::take(&mut notifications.cached)
        };
        for notification in &cached {
            self.plugins.fire_notification(notification);
        }

        let result = if self.aborted.load(Ordering::SeqCst) {
            debug!(session_id = %session_id.short(), "aborted before starting; jobs skipped");
            Ok(())
        } else {
            self.plugins.fire_starting(&SessionStartingEvent {
                session_id: session_id.clone(),
            });

            self.set_state(RunState::Running);
            self.holder
                .set_persistence_status(SessionPersistenceStatus::Running);
            self.plugins.fire_started(&SessionStartedEvent {
                session_id: session_id.clone(),
            });

            self.job_runner.run_jobs(&self.holder).await
        };

        if let Err(error) = &result {
            warn!(session_id = %session_id.short(), %error, "session jobs failed");
        }

        self.set_state(RunState::Ended);
        self.holder
            .set_persistence_status(SessionPersistenceStatus::Finalizing);

        // Refuse new notifications, then settle the in-flight ones.
        let pending = {
            let mut notifications = self.notifications.lock();
            notifications.mode = NotificationMode::Draining;
            std::mem::take(&mut notifications.tasks)
        };

        self.plugins.fire_ended(&SessionEndedEvent {
            session_id: session_id.clone(),
            error: result.as_ref().err().map(ToString::to_string),
        });

        for task in pending {
            if let Err(error) = task.await {
                warn!(%error, "notification task failed");
            }
        }

        self.plugins.close_all();
        if let Some(sender) = &self.sender {
            sender.close();
        }

        self.set_state(RunState::Closed);
        info!(session_id = %session_id.short(), "session closed");
        result
    }

    fn set_state(&self, next: RunState) {
        let mut state = self.state.lock();
        debug!(from = %state, to = %next, "session state transition");
        *state = next;
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
