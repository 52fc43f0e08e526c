// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message payloads and reception records.

use ats_core::SessionId;
use serde::{Deserialize, Serialize};

/// Identifier generated for each `send_message` call; every reception
/// batch carries it so handlers can tell interleaved sends apart.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh unique id for one send.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a message is routed: a session, optionally narrowed to a test
/// scope within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageDestination {
    pub session_id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_scope: Option<String>,
}

impl MessageDestination {
    pub fn session(session_id: impl Into<SessionId>) -> Self {
        Self {
            session_id: session_id.into(),
            test_scope: None,
        }
    }
}

/// A message to deliver to plugin subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSend {
    pub destination: MessageDestination,
    /// Subscribers bind to a message type; only matching subscribers
    /// receive the payload.
    pub message_type: String,
    pub payload: serde_json::Value,
}

/// One reception record observed by the caller's handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum MessageReception {
    /// A subscriber handled (or failed to handle) the message.
    Subscriber {
        subscriber: String,
        receipt: serde_json::Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// All subscribers of the local component have been visited.
    ComponentEnd,
    /// No further receptions will arrive for this message.
    GlobalEnd,
}

impl MessageReception {
    pub fn is_end_marker(&self) -> bool {
        matches!(
            self,
            MessageReception::ComponentEnd | MessageReception::GlobalEnd
        )
    }
}

/// A batch of receptions for one message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageReceptions {
    pub message_id: MessageId,
    pub receptions: Vec<MessageReception>,
}

impl MessageReceptions {
    pub fn new(message_id: MessageId, receptions: Vec<MessageReception>) -> Self {
        Self {
            message_id,
            receptions,
        }
    }

    /// Append another batch's receptions onto this one.
    pub fn merge(&mut self, other: MessageReceptions) {
        self.receptions.extend(other.receptions);
    }
}

/// A plugin-declared message subscriber bound to one message type.
pub trait MessageSubscriber: Send + Sync {
    fn message_type(&self) -> &str;

    /// Handle the message, returning an opaque receipt.
    fn on_message(&self, send: &MessageSend) -> Result<serde_json::Value, String>;
}
