// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session lifecycle events and notifications.
//!
//! Lifecycle events are dispatched to plugins in a fixed order:
//! `SessionStartingEvent`, then `SessionStartedEvent`, then
//! `SessionEndedEvent`. `SessionStartedEvent` fires at most once per
//! session and never if the session was aborted before starting.

use crate::session::SessionId;
use serde::{Deserialize, Serialize};

/// Fired after plugins are loaded, before jobs start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStartingEvent {
    pub session_id: SessionId,
}

/// Fired once the session's jobs have been handed to the job runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStartedEvent {
    pub session_id: SessionId,
}

/// Fired when the session ends, normally or with an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEndedEvent {
    pub session_id: SessionId,
    /// Error captured from the job runner, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Arbitrary user notification routed to plugin subscribers.
///
/// Notifications received before the session is running are cached and
/// delivered in arrival order before `SessionStartingEvent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionNotification {
    pub session_id: SessionId,
    pub message: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub payload: serde_json::Value,
}

impl SessionNotification {
    pub fn new(session_id: impl Into<SessionId>, message: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            message: message.into(),
            payload: serde_json::Value::Null,
        }
    }
}
