// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-scope message sender.
//!
//! Sends block until the scope's local subscribers are installed (they
//! arrive once plugins are loaded), then dispatch synchronously, one
//! reception batch per subscriber group, and finish with a batch
//! holding the `ComponentEnd` and `GlobalEnd` markers in that order.
//! Closing the sender releases blocked senders without delivering and
//! without markers.

use crate::types::{MessageId, MessageReception, MessageReceptions, MessageSend, MessageSubscriber};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, warn};

/// Subscribers contributed by one plugin.
#[derive(Clone)]
pub struct SubscriberGroup {
    pub label: String,
    pub subscribers: Vec<Arc<dyn MessageSubscriber>>,
}

impl SubscriberGroup {
    pub fn new(label: impl Into<String>, subscribers: Vec<Arc<dyn MessageSubscriber>>) -> Self {
        Self {
            label: label.into(),
            subscribers,
        }
    }
}

#[derive(Clone)]
enum State {
    /// Plugins not loaded yet; senders wait.
    Waiting,
    Installed(Arc<Vec<SubscriberGroup>>),
    Closed,
}

/// Message sender for one session scope.
pub struct MessageSender {
    state_tx: watch::Sender<State>,
}

impl MessageSender {
    /// A sender whose subscribers are not yet known.
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(State::Waiting);
        Self { state_tx }
    }

    /// Install the local subscriber groups, releasing blocked senders.
    ///
    /// Installation after `close` is ignored.
    pub fn install_subscribers(&self, groups: Vec<SubscriberGroup>) {
        self.state_tx.send_if_modified(|state| match state {
            State::Closed => false,
            _ => {
                *state = State::Installed(Arc::new(groups));
                true
            }
        });
    }

    /// Cancel waiting senders and refuse messages queued after close.
    pub fn close(&self) {
        self.state_tx.send_replace(State::Closed);
    }

    pub fn is_closed(&self) -> bool {
        matches!(*self.state_tx.borrow(), State::Closed)
    }

    /// Deliver `send` to every matching local subscriber.
    ///
    /// `emit` observes one `MessageReceptions` per subscriber group
    /// that produced receptions, then the end-marker batch. A sender
    /// closed before subscribers were installed returns without
    /// emitting anything, markers included.
    pub async fn send_message(
        &self,
        message_id: MessageId,
        send: &MessageSend,
        emit: &mut (dyn FnMut(MessageReceptions) + Send),
    ) {
        let Some(groups) = self.wait_for_subscribers().await else {
            debug!(message_id = %message_id, "sender closed; dropping message");
            return;
        };

        for group in groups.iter() {
            let receptions = dispatch_to_group(group, send);
            if !receptions.is_empty() {
                emit(MessageReceptions::new(message_id.clone(), receptions));
            }
        }

        emit(MessageReceptions::new(
            message_id,
            vec![MessageReception::ComponentEnd, MessageReception::GlobalEnd],
        ));
    }

    /// Wait until subscribers are installed; `None` when closed.
    async fn wait_for_subscribers(&self) -> Option<Arc<Vec<SubscriberGroup>>> {
        let mut state_rx = self.state_tx.subscribe();
        loop {
            {
                let state = state_rx.borrow_and_update();
                match &*state {
                    State::Installed(groups) => return Some(Arc::clone(groups)),
                    State::Closed => return None,
                    State::Waiting => {}
                }
            }
            if state_rx.changed().await.is_err() {
                return None;
            }
        }
    }
}

impl Default for MessageSender {
    fn default() -> Self {
        Self::new()
    }
}

/// Dispatch to one plugin's subscribers, collecting a reception per
/// matching subscriber. Subscriber failures become error receptions,
/// never a failed send.
fn dispatch_to_group(group: &SubscriberGroup, send: &MessageSend) -> Vec<MessageReception> {
    let mut receptions = Vec::new();
    for subscriber in &group.subscribers {
        if subscriber.message_type() != send.message_type {
            continue;
        }
        match subscriber.on_message(send) {
            Ok(receipt) => receptions.push(MessageReception::Subscriber {
                subscriber: group.label.clone(),
                receipt,
                error: None,
            }),
            Err(message) => {
                warn!(
                    plugin = %group.label,
                    message_type = %send.message_type,
                    error = %message,
                    "message subscriber failed"
                );
                receptions.push(MessageReception::Subscriber {
                    subscriber: group.label.clone(),
                    receipt: serde_json::Value::Null,
                    error: Some(message),
                });
            }
        }
    }
    receptions
}

#[cfg(test)]
#[path = "sender_tests.rs"]
mod tests;
