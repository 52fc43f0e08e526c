//! Test helpers for behavioral specifications.
//!
//! Shared plugins, job runners, and fixture builders used across the
//! workspace specs.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use ats_core::{
    SessionEndedEvent, SessionNotification, SessionStartedEvent, SessionStartingEvent,
};
use ats_session::{JobRunner, PluginError, SessionDetailHolder, SessionError, SessionInfo,
    SessionPlugin};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub type EventLog = Arc<Mutex<Vec<String>>>;

/// Plugin recording every hook invocation into a shared log.
pub struct RecordingPlugin {
    label: String,
    log: EventLog,
}

impl RecordingPlugin {
    pub fn new(label: &str, log: &EventLog) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            log: Arc::clone(log),
        })
    }

    fn record(&self, entry: String) {
        self.log.lock().push(format!("{}:{}", self.label, entry));
    }
}

impl SessionPlugin for RecordingPlugin {
    fn label(&self) -> &str {
        &self.label
    }

    fn on_session_starting(
        &self,
        _info: &SessionInfo,
        _event: &SessionStartingEvent,
    ) -> Result<(), PluginError> {
        self.record("starting".into());
        Ok(())
    }

    fn on_session_started(
        &self,
        _info: &SessionInfo,
        _event: &SessionStartedEvent,
    ) -> Result<(), PluginError> {
        self.record("started".into());
        Ok(())
    }

    fn on_session_notification(
        &self,
        _info: &SessionInfo,
        notification: &SessionNotification,
    ) -> Result<(), PluginError> {
        self.record(format!("notify:{}", notification.message));
        Ok(())
    }

    fn on_session_ended(
        &self,
        _info: &SessionInfo,
        _event: &SessionEndedEvent,
    ) -> Result<(), PluginError> {
        self.record("ended".into());
        Ok(())
    }

    fn close(&self) {
        self.record("close".into());
    }
}

/// Job runner that completes immediately.
pub struct NoopJobRunner;

#[async_trait]
impl JobRunner for NoopJobRunner {
    async fn run_jobs(&self, _holder: &SessionDetailHolder) -> Result<(), SessionError> {
        Ok(())
    }

    fn abort(&self) {}
}

/// Job runner that blocks until released (or aborted).
pub struct GatedJobRunner {
    pub gate: tokio::sync::Notify,
}

impl GatedJobRunner {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            gate: tokio::sync::Notify::new(),
        })
    }
}

#[async_trait]
impl JobRunner for GatedJobRunner {
    async fn run_jobs(&self, _holder: &SessionDetailHolder) -> Result<(), SessionError> {
        self.gate.notified().await;
        Ok(())
    }

    fn abort(&self) {
        self.gate.notify_one();
    }
}

/// Write a command file into `dir` and return its path.
pub fn write_cmdfile(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

pub fn toks(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}
