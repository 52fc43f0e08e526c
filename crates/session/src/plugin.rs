// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session plugins and event dispatch.
//!
//! Plugins subscribe to the session lifecycle and to user
//! notifications, and may declare message subscribers for the
//! messaging fabric. A subscriber failure is wrapped into a
//! [`SessionPluginError`] on the session and never aborts it.

use crate::detail::SessionDetailHolder;
use ats_core::{
    JobInfo, SessionEndedEvent, SessionId, SessionNotification, SessionStartedEvent,
    SessionStartingEvent, SessionPluginError,
};
use ats_messaging::{MessageSubscriber, SubscriberGroup};
use parking_lot::RwLock;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Failure raised by a plugin subscriber.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct PluginError(pub String);

impl PluginError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The view a plugin gets of its session: read/write properties,
/// append jobs, read/write its own output slot.
#[derive(Clone)]
pub struct SessionInfo {
    holder: Arc<SessionDetailHolder>,
    plugin_label: String,
}

impl SessionInfo {
    pub fn new(holder: Arc<SessionDetailHolder>, plugin_label: impl Into<String>) -> Self {
        Self {
            holder,
            plugin_label: plugin_label.into(),
        }
    }

    pub fn session_id(&self) -> SessionId {
        self.holder.session_id()
    }

    pub fn plugin_label(&self) -> &str {
        &self.plugin_label
    }

    pub fn get_property(&self, key: &str) -> Option<String> {
        self.holder.get_session_property(key)
    }

    pub fn put_property(&self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.holder.put_session_property(key, value)
    }

    pub fn add_job(&self, job: JobInfo) {
        self.holder.add_job(job);
    }

    /// Read this plugin's output slot.
    pub fn output(&self) -> Option<serde_json::Value> {
        self.holder.get_session_plugin_output(&self.plugin_label)
    }

    /// Transform this plugin's output slot; returning `None` clears it.
    pub fn set_output<F>(&self, compute: F)
    where
        F: FnOnce(Option<&serde_json::Value>) -> Option<serde_json::Value>,
    {
        self.holder
            .set_session_plugin_output(&self.plugin_label, compute);
    }
}

/// A user-supplied session plugin.
///
/// Lifecycle events arrive in order: `on_session_starting`,
/// `on_session_started`, `on_session_ended`. Notification dispatch may
/// happen from pool threads while the session runs.
pub trait SessionPlugin: Send + Sync {
    fn label(&self) -> &str;

    fn on_session_starting(
        &self,
        _info: &SessionInfo,
        _event: &SessionStartingEvent,
    ) -> Result<(), PluginError> {
        Ok(())
    }

    fn on_session_started(
        &self,
        _info: &SessionInfo,
        _event: &SessionStartedEvent,
    ) -> Result<(), PluginError> {
        Ok(())
    }

    fn on_session_notification(
        &self,
        _info: &SessionInfo,
        _notification: &SessionNotification,
    ) -> Result<(), PluginError> {
        Ok(())
    }

    fn on_session_ended(
        &self,
        _info: &SessionInfo,
        _event: &SessionEndedEvent,
    ) -> Result<(), PluginError> {
        Ok(())
    }

    /// Message subscribers this plugin contributes to the session's
    /// messaging scope.
    fn message_subscribers(&self) -> Vec<Arc<dyn MessageSubscriber>> {
        Vec::new()
    }

    /// Release plugin resources; called exactly once per session.
    fn close(&self) {}
}

struct LoadedPlugin {
    plugin: Arc<dyn SessionPlugin>,
    info: SessionInfo,
}

/// Ordered list of loaded plugins plus the dispatch logic.
pub struct PluginRunner {
    holder: Arc<SessionDetailHolder>,
    plugins: RwLock<Vec<LoadedPlugin>>,
}

impl PluginRunner {
    pub fn new(holder: Arc<SessionDetailHolder>) -> Self {
        Self {
            holder,
            plugins: RwLock::new(Vec::new()),
        }
    }

    /// Initialise plugins with their session views, in registration
    /// order.
    pub fn load(&self, plugins: Vec<Arc<dyn SessionPlugin>>) {
        let loaded: Vec<LoadedPlugin> = plugins
            .into_iter()
            .map(|plugin| {
                let info = SessionInfo::new(Arc::clone(&self.holder), plugin.label());
                LoadedPlugin { plugin, info }
            })
            .collect();
        debug!(count = loaded.len(), "loaded session plugins");
        *self.plugins.write() = loaded;
    }

    /// Message subscriber groups, one per plugin that declares any.
    pub fn subscriber_groups(&self) -> Vec<SubscriberGroup> {
        self.plugins
            .read()
            .iter()
            .filter_map(|loaded| {
                let subscribers = loaded.plugin.message_subscribers();
                if subscribers.is_empty() {
                    None
                } else {
                    Some(SubscriberGroup::new(loaded.plugin.label(), subscribers))
                }
            })
            .collect()
    }

    pub fn fire_starting(&self, event: &SessionStartingEvent) {
        for loaded in self.plugins.read().iter() {
            self.dispatch(loaded, "on_session_starting", |p, info| {
                p.on_session_starting(info, event)
            });
        }
    }

    pub fn fire_started(&self, event: &SessionStartedEvent) {
        for loaded in self.plugins.read().iter() {
            self.dispatch(loaded, "on_session_started", |p, info| {
                p.on_session_started(info, event)
            });
        }
    }

    pub fn fire_notification(&self, notification: &SessionNotification) {
        for loaded in self.plugins.read().iter() {
            self.dispatch(loaded, "on_session_notification", |p, info| {
                p.on_session_notification(info, notification)
            });
        }
    }

    /// Ended events run in reverse plugin order.
    pub fn fire_ended(&self, event: &SessionEndedEvent) {
        for loaded in self.plugins.read().iter().rev() {
            self.dispatch(loaded, "on_session_ended", |p, info| {
                p.on_session_ended(info, event)
            });
        }
    }

    /// Close every plugin, reverse order, exactly once per session.
    pub fn close_all(&self) {
        let plugins = std::mem::take(&mut *self.plugins.write());
        for loaded in plugins.iter().rev() {
            loaded.plugin.close();
        }
    }

    fn dispatch<F>(&self, loaded: &LoadedPlugin, hook: &str, call: F)
    where
        F: FnOnce(&dyn SessionPlugin, &SessionInfo) -> Result<(), PluginError>,
    {
        if let Err(error) = call(loaded.plugin.as_ref(), &loaded.info) {
            warn!(
                plugin = %loaded.plugin.label(),
                hook,
                %error,
                "session plugin failed"
            );
            self.holder.add_session_plugin_error(SessionPluginError::new(
                loaded.plugin.label(),
                format!("{hook}: {error}"),
            ));
        }
    }
}

#[cfg(test)]
#[path = "plugin_tests.rs"]
mod tests;
