// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session registry: creation, lookup, and crash recovery.

use crate::detail::SessionDetailHolder;
use crate::plugin::SessionPlugin;
use crate::runner::{JobRunner, SessionRunner};
use ats_core::{FieldMask, SessionConfig, SessionDetail, SessionId, SessionNotification};
use ats_messaging::{MessageDestination, MessageManager, MessageSender};
use ats_storage::{SessionPersister, SessionStore, StoreError};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Everything a session needs besides its config: plugins and the job
/// execution seam.
pub struct SessionSetup {
    pub plugins: Vec<Arc<dyn SessionPlugin>>,
    pub job_runner: Arc<dyn JobRunner>,
}

/// Creates sessions, recovers persisted ones at process start, and
/// routes lookups/aborts/notifications to the right runner.
pub struct SessionManager {
    store: Arc<SessionStore>,
    messaging: Arc<MessageManager>,
    runners: Mutex<HashMap<SessionId, Arc<SessionRunner>>>,
}

impl SessionManager {
    pub fn new(store: Arc<SessionStore>, messaging: Arc<MessageManager>) -> Self {
        Self {
            store,
            messaging,
            runners: Mutex::new(HashMap::new()),
        }
    }

    /// Create a new session and its runner. The caller drives the
    /// runner (usually on a spawned task).
    pub fn create_session(
        &self,
        name: impl Into<String>,
        initial_properties: IndexMap<String, String>,
        setup: SessionSetup,
    ) -> Arc<SessionRunner> {
        let mut config = SessionConfig::new(SessionId::generate(), name);
        config.initial_properties = initial_properties;
        let session_id = config.id.clone();
        info!(session_id = %session_id.short(), "creating session");

        self.register(config, None, setup)
    }

    /// Rebuild runners for every persisted session.
    ///
    /// Holders come back with their properties, errors, and outputs;
    /// the persistence status resets to the initial one so the runner
    /// replays the lifecycle. `setup` supplies plugins and a job runner
    /// per recovered session.
    pub fn recover<F>(&self, mut setup: F) -> Result<Vec<Arc<SessionRunner>>, StoreError>
    where
        F: FnMut(&SessionDetail) -> SessionSetup,
    {
        let mut recovered = Vec::new();
        for record in self.store.load_all()? {
            info!(session_id = %record.session_id().short(), "recovering session");
            let setup = setup(&record.detail);
            let config = record.detail.config.clone();
            recovered.push(self.register(config, Some(record), setup));
        }
        Ok(recovered)
    }

    fn register(
        &self,
        config: SessionConfig,
        persisted: Option<ats_storage::PersistedSession>,
        setup: SessionSetup,
    ) -> Arc<SessionRunner> {
        let session_id = config.id.clone();
        let persister = Some(Arc::clone(&self.store) as Arc<dyn SessionPersister>);
        let holder = Arc::new(match persisted {
            Some(record) => SessionDetailHolder::from_persisted(record, persister),
            None => {
                let holder = SessionDetailHolder::new(config, persister);
                // A session exists from the moment it is created, even
                // if nothing has mutated it yet.
                holder.persist_session();
                holder
            }
        });

        let sender = Arc::new(MessageSender::new());
        self.messaging.register_sender(
            MessageDestination::session(session_id.clone()),
            Arc::clone(&sender),
        );

        let runner = Arc::new(SessionRunner::new(
            holder,
            setup.plugins,
            setup.job_runner,
            Some(sender),
        ));
        self.runners.lock().insert(session_id, Arc::clone(&runner));
        runner
    }

    pub fn runner(&self, id: &SessionId) -> Option<Arc<SessionRunner>> {
        self.runners.lock().get(id).cloned()
    }

    pub fn get_session(&self, id: &SessionId, mask: Option<&FieldMask>) -> Option<SessionDetail> {
        self.runner(id).map(|runner| runner.get_session(mask))
    }

    pub fn list_sessions(&self) -> Vec<SessionDetail> {
        self.runners
            .lock()
            .values()
            .map(|runner| runner.get_session(None))
            .collect()
    }

    /// Abort a session; `false` if the id is unknown.
    pub fn abort_session(&self, id: &SessionId) -> bool {
        match self.runner(id) {
            Some(runner) => {
                runner.abort_session();
                true
            }
            None => false,
        }
    }

    /// Route a notification; `false` if the session is unknown or no
    /// longer accepting.
    pub fn notify_session(&self, id: &SessionId, notification: SessionNotification) -> bool {
        match self.runner(id) {
            Some(runner) => runner.notify_session(notification),
            None => false,
        }
    }

    /// Drop a finished session: unregister the runner and its messaging
    /// scope and delete the snapshot.
    pub fn remove_session(&self, id: &SessionId) -> Result<(), StoreError> {
        self.runners.lock().remove(id);
        if let Some(sender) = self
            .messaging
            .remove_sender(&MessageDestination::session(id.clone()))
        {
            sender.close();
        }
        self.store.remove(id)
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
