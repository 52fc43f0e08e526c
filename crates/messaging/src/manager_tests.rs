// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::sender::SubscriberGroup;
use crate::types::{MessageReception, MessageSubscriber};
use serde_json::json;
use std::time::Duration;

struct EchoSubscriber;

impl MessageSubscriber for EchoSubscriber {
    fn message_type(&self) -> &str {
        "test.message"
    }

    fn on_message(&self, send: &MessageSend) -> Result<serde_json::Value, String> {
        Ok(send.payload.clone())
    }
}

fn installed_sender() -> Arc<MessageSender> {
    let sender = Arc::new(MessageSender::new());
    sender.install_subscribers(vec![SubscriberGroup::new(
        "plugin-a",
        vec![Arc::new(EchoSubscriber)],
    )]);
    sender
}

fn test_send() -> MessageSend {
    MessageSend {
        destination: MessageDestination::session("s-1"),
        message_type: "test.message".to_string(),
        payload: json!({"n": 1}),
    }
}

fn batch(id: &str, receptions: Vec<MessageReception>) -> MessageReceptions {
    MessageReceptions::new(MessageId::new(id), receptions)
}

fn subscriber_reception(n: u64) -> MessageReception {
    MessageReception::Subscriber {
        subscriber: "plugin-a".to_string(),
        receipt: json!({ "n": n }),
        error: None,
    }
}

#[tokio::test]
async fn unknown_destination_is_an_error() {
    let manager = MessageManager::new();
    let result = manager.send_message(test_send(), |_| Ok(()));
    assert!(matches!(
        result,
        Err(MessagingError::DestinationNotFound(_))
    ));
}

#[tokio::test]
async fn end_markers_arrive_once_in_order_and_last() {
    let manager = MessageManager::new();
    manager.register_sender(MessageDestination::session("s-1"), installed_sender());

    let (done_tx, done_rx) = tokio::sync::oneshot::channel();
    let mut done_tx = Some(done_tx);
    let all = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&all);

    manager
        .send_message(test_send(), move |batch| {
            let mut all = sink.lock();
            all.extend(batch.receptions);
            if all.iter().any(|r| matches!(r, MessageReception::GlobalEnd)) {
                if let Some(tx) = done_tx.take() {
                    let _ = tx.send(());
                }
            }
            Ok(())
        })
        .unwrap();

    tokio::time::timeout(Duration::from_secs(5), done_rx)
        .await
        .expect("send should complete")
        .unwrap();

    let all = all.lock();
    let markers: Vec<_> = all.iter().filter(|r| r.is_end_marker()).collect();
    assert_eq!(markers.len(), 2);
    // The last two receptions are ComponentEnd then GlobalEnd.
    assert_eq!(all[all.len() - 2], MessageReception::ComponentEnd);
    assert_eq!(all[all.len() - 1], MessageReception::GlobalEnd);
}

#[tokio::test]
async fn send_returns_a_fresh_message_id_per_call() {
    let manager = MessageManager::new();
    manager.register_sender(MessageDestination::session("s-1"), installed_sender());

    let first = manager.send_message(test_send(), |_| Ok(())).unwrap();
    let second = manager.send_message(test_send(), |_| Ok(())).unwrap();
    assert_ne!(first, second);
}

#[tokio::test]
async fn consumer_merges_contiguous_batches() {
    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(QueueItem::Batch(batch("m", vec![subscriber_reception(1)])))
        .unwrap();
    tx.send(QueueItem::Batch(batch("m", vec![subscriber_reception(2)])))
        .unwrap();
    tx.send(QueueItem::Batch(batch("m", vec![subscriber_reception(3)])))
        .unwrap();
    tx.send(QueueItem::End).unwrap();

    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    consume(rx, move |merged: MessageReceptions| {
        sink.lock().push(merged);
        Ok(())
    })
    .await;

    let calls = calls.lock();
    assert_eq!(calls.len(), 1, "queued batches merge into one callback");
    assert_eq!(
        calls[0].receptions,
        vec![
            subscriber_reception(1),
            subscriber_reception(2),
            subscriber_reception(3)
        ]
    );
}

#[tokio::test]
async fn merge_never_crosses_the_end_item() {
    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(QueueItem::Batch(batch("m", vec![subscriber_reception(1)])))
        .unwrap();
    tx.send(QueueItem::End).unwrap();
    // Anything after the end item is never observed.
    tx.send(QueueItem::Batch(batch("m", vec![subscriber_reception(9)])))
        .unwrap();

    let calls = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&calls);
    consume(rx, move |merged: MessageReceptions| {
        sink.lock().push(merged);
        Ok(())
    })
    .await;

    let calls = calls.lock();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].receptions, vec![subscriber_reception(1)]);
}

#[tokio::test]
async fn consumer_exits_when_producer_drops_without_end() {
    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(QueueItem::Batch(batch("m", vec![subscriber_reception(1)])))
        .unwrap();
    drop(tx);

    let calls = Arc::new(Mutex::new(0usize));
    let sink = Arc::clone(&calls);
    tokio::time::timeout(
        Duration::from_secs(5),
        consume(rx, move |_| {
            *sink.lock() += 1;
            Ok(())
        }),
    )
    .await
    .expect("consumer must exit on a closed queue");

    assert_eq!(*calls.lock(), 1);
}

#[tokio::test]
async fn handler_failure_does_not_stop_the_drain() {
    let (tx, rx) = mpsc::unbounded_channel();
    tx.send(QueueItem::Batch(batch("m", vec![subscriber_reception(1)])))
        .unwrap();

    let calls = Arc::new(Mutex::new(0usize));
    let sink = Arc::clone(&calls);
    let consumer = tokio::spawn(consume(rx, move |_| {
        *sink.lock() += 1;
        Err("handler failed".to_string())
    }));

    tokio::time::sleep(Duration::from_millis(20)).await;
    tx.send(QueueItem::Batch(batch("m", vec![subscriber_reception(2)])))
        .unwrap();
    tx.send(QueueItem::End).unwrap();

    tokio::time::timeout(Duration::from_secs(5), consumer)
        .await
        .expect("consumer should finish")
        .unwrap();
    assert_eq!(*calls.lock(), 2, "both batches reach the handler");
}

#[tokio::test]
async fn remove_sender_returns_it_for_closing() {
    let manager = MessageManager::new();
    let destination = MessageDestination::session("s-1");
    manager.register_sender(destination.clone(), installed_sender());

    let removed = manager.remove_sender(&destination).unwrap();
    removed.close();
    assert!(manager.sender(&destination).is_none());
    assert!(matches!(
        manager.send_message(test_send(), |_| Ok(())),
        Err(MessagingError::DestinationNotFound(_))
    ));
}
