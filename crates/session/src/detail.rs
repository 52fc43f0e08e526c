// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Thread-safe session state holder.
//!
//! Two monitors: one lock over the detail state (config, properties,
//! plugin errors, plugin outputs, persistence status), a second over
//! the job list so job mutation paths stay short. Readers always get
//! value-level snapshots, never references into the guarded state.
//!
//! Every observable mutation — and only an actual change — invokes the
//! detail listener with the post-state snapshot and attempts a persist.
//! Persist failures are logged and swallowed; the in-memory state is
//! authoritative.

use ats_core::field_mask::{mask_selects, paths};
use ats_core::{
    FieldMask, JobId, JobInfo, SessionConfig, SessionDetail, SessionId, SessionOutput,
    SessionPersistenceStatus, SessionPluginError, INITIAL_PERSISTENCE_STATUS,
};
use ats_storage::{PersistedSession, SessionPersister};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

/// Observes every post-state detail snapshot after a change.
pub type DetailListener = Arc<dyn Fn(&SessionDetail) + Send + Sync>;

struct DetailState {
    config: SessionConfig,
    properties: IndexMap<String, String>,
    plugin_errors: Vec<SessionPluginError>,
    plugin_outputs: IndexMap<String, serde_json::Value>,
    status: SessionPersistenceStatus,
}

impl DetailState {
    fn build_detail(&self, mask: Option<&FieldMask>) -> SessionDetail {
        let config = if mask_selects(mask, paths::CONFIG) {
            self.config.clone()
        } else {
            // Identity survives any mask.
            SessionConfig::new(self.config.id.clone(), "")
        };

        let mut output = SessionOutput::default();
        if mask_selects(mask, paths::SESSION_PROPERTY) {
            output.properties = self.properties.clone();
        }
        if mask_selects(mask, paths::SESSION_PLUGIN_ERROR) {
            output.plugin_errors = self.plugin_errors.clone();
        }
        if mask_selects(mask, paths::SESSION_PLUGIN_OUTPUT) {
            output.plugin_outputs = self.plugin_outputs.clone();
        }

        SessionDetail { config, output }
    }
}

#[derive(Default)]
struct JobsState {
    jobs: Vec<JobInfo>,
    /// Index of the first job not yet returned by `poll_jobs`.
    polled: usize,
}

/// Monitor object guarding one session's mutable state.
pub struct SessionDetailHolder {
    state: Mutex<DetailState>,
    jobs: Mutex<JobsState>,
    listener: Mutex<Option<DetailListener>>,
    persister: Option<Arc<dyn SessionPersister>>,
}

impl SessionDetailHolder {
    /// New holder for a fresh session; properties start from the
    /// config's initial bag.
    pub fn new(config: SessionConfig, persister: Option<Arc<dyn SessionPersister>>) -> Self {
        let properties = config.initial_properties.clone();
        Self {
            state: Mutex::new(DetailState {
                config,
                properties,
                plugin_errors: Vec::new(),
                plugin_outputs: IndexMap::new(),
                status: INITIAL_PERSISTENCE_STATUS,
            }),
            jobs: Mutex::new(JobsState::default()),
            listener: Mutex::new(None),
            persister,
        }
    }

    /// Rebuild a holder from a persisted record; the status is reset to
    /// the initial one so a new runner replays the lifecycle.
    pub fn from_persisted(
        record: PersistedSession,
        persister: Option<Arc<dyn SessionPersister>>,
    ) -> Self {
        let PersistedSession { detail, .. } = record;
        Self {
            state: Mutex::new(DetailState {
                config: detail.config,
                properties: detail.output.properties,
                plugin_errors: detail.output.plugin_errors,
                plugin_outputs: detail.output.plugin_outputs,
                status: INITIAL_PERSISTENCE_STATUS,
            }),
            jobs: Mutex::new(JobsState::default()),
            listener: Mutex::new(None),
            persister,
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.state.lock().config.id.clone()
    }

    pub fn set_listener(&self, listener: DetailListener) {
        *self.listener.lock() = Some(listener);
    }

    // --- jobs (second monitor) ---

    /// Append a job. Jobs added before the session starts run with the
    /// initial batch; later ones are picked up by the runner's poll.
    pub fn add_job(&self, job: JobInfo) {
        {
            let mut jobs = self.jobs.lock();
            jobs.jobs.push(job);
        }
        self.persist_session();
    }

    /// Jobs added since the previous `poll_jobs` call.
    pub fn poll_jobs(&self) -> Vec<JobInfo> {
        let mut jobs = self.jobs.lock();
        let fresh = jobs.jobs[jobs.polled..].to_vec();
        jobs.polled = jobs.jobs.len();
        fresh
    }

    /// Snapshot of the whole job list.
    pub fn all_jobs(&self) -> Vec<JobInfo> {
        self.jobs.lock().jobs.clone()
    }

    pub fn job_ids(&self) -> Vec<JobId> {
        self.jobs.lock().jobs.iter().map(|j| j.id.clone()).collect()
    }

    // --- detail state (first monitor) ---

    /// Upsert a property, returning the previous value. Listener and
    /// persist fire only when the value actually changes.
    pub fn put_session_property(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        let key = key.into();
        let value = value.into();
        let (previous, snapshot) = {
            let mut state = self.state.lock();
            if state.properties.get(&key).map(String::as_str) == Some(value.as_str()) {
                return state.properties.get(&key).cloned();
            }
            let previous = state.properties.insert(key, value);
            (previous, state.build_detail(None))
        };
        self.on_change(&snapshot);
        previous
    }

    pub fn get_session_property(&self, key: &str) -> Option<String> {
        self.state.lock().properties.get(key).cloned()
    }

    /// Append a plugin error. Listener and persist fire
    /// unconditionally: every append is a change.
    pub fn add_session_plugin_error(&self, error: SessionPluginError) {
        let snapshot = {
            let mut state = self.state.lock();
            state.plugin_errors.push(error);
            state.build_detail(None)
        };
        self.on_change(&snapshot);
    }

    /// Atomically compute the next plugin output from the previous one.
    /// Returning `None` clears the entry. Listener and persist fire iff
    /// the stored value changed.
    pub fn set_session_plugin_output<F>(&self, label: &str, compute: F)
    where
        F: FnOnce(Option<&serde_json::Value>) -> Option<serde_json::Value>,
    {
        let snapshot = {
            let mut state = self.state.lock();
            let previous = state.plugin_outputs.get(label);
            let next = compute(previous);
            if next.as_ref() == previous {
                return;
            }
            match next {
                Some(value) => {
                    state.plugin_outputs.insert(label.to_string(), value);
                }
                None => {
                    state.plugin_outputs.shift_remove(label);
                }
            }
            state.build_detail(None)
        };
        self.on_change(&snapshot);
    }

    pub fn get_session_plugin_output(&self, label: &str) -> Option<serde_json::Value> {
        self.state.lock().plugin_outputs.get(label).cloned()
    }

    /// Update the persisted status. No listener (status is not part of
    /// the detail view); persists so restarts resume from the right
    /// phase.
    pub fn set_persistence_status(&self, status: SessionPersistenceStatus) {
        {
            let mut state = self.state.lock();
            if state.status == status {
                return;
            }
            state.status = status;
        }
        self.persist_session();
    }

    pub fn persistence_status(&self) -> SessionPersistenceStatus {
        self.state.lock().status
    }

    /// Assemble a view as of the monitor acquisition. An absent mask
    /// means everything; a mask names a subset; unrecognised paths are
    /// ignored.
    pub fn build_session_detail(&self, mask: Option<&FieldMask>) -> SessionDetail {
        self.state.lock().build_detail(mask)
    }

    /// Serialise a point-in-time copy of the detail, status, and job
    /// ids. Failures are warned, never propagated.
    pub fn persist_session(&self) {
        let Some(persister) = &self.persister else {
            return;
        };
        let (detail, status) = {
            let state = self.state.lock();
            (state.build_detail(None), state.status)
        };
        let record = PersistedSession::new(detail, status, self.job_ids());
        if let Err(error) = persister.persist(&record) {
            warn!(
                session_id = %record.session_id(),
                %error,
                "failed to persist session; in-memory state stays authoritative"
            );
        }
    }

    /// Listener then persist, both observing post-state values.
    fn on_change(&self, snapshot: &SessionDetail) {
        let listener = self.listener.lock().clone();
        if let Some(listener) = listener {
            listener(snapshot);
        }
        self.persist_session();
    }
}

#[cfg(test)]
#[path = "detail_tests.rs"]
mod tests;
