// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Public messaging entry point.
//!
//! `send_message` pairs two tasks on the shared runtime: a producer
//! that drives the destination's [`MessageSender`] and feeds reception
//! batches into a queue, and a consumer that takes the first batch,
//! drains whatever else is already queued into one merged batch, and
//! invokes the caller's handler. The producer enqueues an explicit end
//! item when it finishes, so the consumer always terminates; merging
//! never crosses that end item.

use crate::sender::MessageSender;
use crate::types::{MessageDestination, MessageId, MessageReceptions, MessageSend};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;

/// Errors surfaced by [`MessageManager::send_message`].
#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("no message sender registered for destination {0:?}")]
    DestinationNotFound(MessageDestination),
}

enum QueueItem {
    Batch(MessageReceptions),
    End,
}

/// Routes messages to per-scope senders and runs the producer/consumer
/// pair for each send.
pub struct MessageManager {
    senders: Mutex<HashMap<MessageDestination, Arc<MessageSender>>>,
}

impl MessageManager {
    pub fn new() -> Self {
        Self {
            senders: Mutex::new(HashMap::new()),
        }
    }

    /// Register the sender serving `destination`, replacing any
    /// previous one.
    pub fn register_sender(&self, destination: MessageDestination, sender: Arc<MessageSender>) {
        self.senders.lock().insert(destination, sender);
    }

    /// Drop the sender for `destination`, returning it so the caller
    /// can close it.
    pub fn remove_sender(&self, destination: &MessageDestination) -> Option<Arc<MessageSender>> {
        self.senders.lock().remove(destination)
    }

    pub fn sender(&self, destination: &MessageDestination) -> Option<Arc<MessageSender>> {
        self.senders.lock().get(destination).cloned()
    }

    /// Send `send` to its destination, delivering merged reception
    /// batches to `handler` on a pool task.
    ///
    /// Returns the generated message id immediately; delivery is
    /// asynchronous. Handler failures are logged and do not stop the
    /// remaining receptions.
    pub fn send_message<H>(&self, send: MessageSend, handler: H) -> Result<MessageId, MessagingError>
    where
        H: FnMut(MessageReceptions) -> Result<(), String> + Send + 'static,
    {
        let sender = self
            .sender(&send.destination)
            .ok_or_else(|| MessagingError::DestinationNotFound(send.destination.clone()))?;

        let message_id = MessageId::generate();
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();

        let producer_id = message_id.clone();
        tokio::spawn(async move {
            {
                let mut emit = |batch: MessageReceptions| {
                    let _ = queue_tx.send(QueueItem::Batch(batch));
                };
                sender.send_message(producer_id, &send, &mut emit).await;
            }
            // Always enqueued, so the consumer always exits.
            let _ = queue_tx.send(QueueItem::End);
        });

        tokio::spawn(consume(queue_rx, handler));

        Ok(message_id)
    }
}

impl Default for MessageManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Take the first queued item, drain contiguous batches into one merged
/// batch, hand it to the handler, and repeat until the end item.
async fn consume<H>(mut queue_rx: mpsc::UnboundedReceiver<QueueItem>, mut handler: H)
where
    H: FnMut(MessageReceptions) -> Result<(), String> + Send + 'static,
{
    while let Some(item) = queue_rx.recv().await {
        let mut merged = match item {
            QueueItem::Batch(batch) => batch,
            QueueItem::End => break,
        };

        let mut finished = false;
        loop {
            match queue_rx.try_recv() {
                Ok(QueueItem::Batch(next)) => merged.merge(next),
                Ok(QueueItem::End) => {
                    finished = true;
                    break;
                }
                Err(_) => break,
            }
        }

        if let Err(error) = handler(merged) {
            warn!(%error, "message receptions handler failed");
        }

        if finished {
            break;
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
