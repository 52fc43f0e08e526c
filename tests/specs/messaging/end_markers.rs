//! Messaging through a live session: subscribers, batching, markers.

use crate::prelude::*;
use ats_messaging::{
    MessageDestination, MessageManager, MessageReception, MessageSend, MessageSubscriber,
};
use ats_session::{JobRunner, SessionManager, SessionPlugin, SessionSetup};
use ats_storage::SessionStore;
use indexmap::IndexMap;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct CountingSubscriber;

impl MessageSubscriber for CountingSubscriber {
    fn message_type(&self) -> &str {
        "progress.request"
    }

    fn on_message(&self, send: &MessageSend) -> Result<serde_json::Value, String> {
        Ok(json!({ "seen": send.payload }))
    }
}

struct SubscribingPlugin;

impl SessionPlugin for SubscribingPlugin {
    fn label(&self) -> &str {
        "progress"
    }

    fn message_subscribers(&self) -> Vec<Arc<dyn MessageSubscriber>> {
        vec![Arc::new(CountingSubscriber)]
    }
}

#[tokio::test]
async fn a_session_message_ends_with_both_markers() {
    let dir = TempDir::new().unwrap();
    let messaging = Arc::new(MessageManager::new());
    let manager = SessionManager::new(
        Arc::new(SessionStore::new(dir.path())),
        Arc::clone(&messaging),
    );

    let jobs = GatedJobRunner::new();
    let runner = manager.create_session(
        "messaged",
        IndexMap::new(),
        SessionSetup {
            plugins: vec![Arc::new(SubscribingPlugin)],
            job_runner: Arc::clone(&jobs) as Arc<dyn JobRunner>,
        },
    );
    let id = runner.session_id();

    let running = tokio::spawn(Arc::clone(&runner).run());
    tokio::time::sleep(Duration::from_millis(20)).await;

    let (done_tx, done_rx) = tokio::sync::oneshot::channel();
    let mut done_tx = Some(done_tx);
    let all = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&all);

    messaging
        .send_message(
            MessageSend {
                destination: MessageDestination::session(id.clone()),
                message_type: "progress.request".to_string(),
                payload: json!({"want": "status"}),
            },
            move |batch| {
                let mut all = sink.lock();
                all.extend(batch.receptions);
                if all.iter().any(|r| matches!(r, MessageReception::GlobalEnd)) {
                    if let Some(tx) = done_tx.take() {
                        let _ = tx.send(());
                    }
                }
                Ok(())
            },
        )
        .unwrap();

    tokio::time::timeout(Duration::from_secs(5), done_rx)
        .await
        .expect("message should finish")
        .unwrap();

    let all = all.lock();
    // One subscriber reception, then exactly the two markers, in order.
    assert_eq!(all.len(), 3);
    assert!(matches!(all[0], MessageReception::Subscriber { .. }));
    assert_eq!(all[1], MessageReception::ComponentEnd);
    assert_eq!(all[2], MessageReception::GlobalEnd);

    jobs.gate.notify_one();
    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .expect("session should end")
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn a_message_sent_before_plugins_load_waits_for_them() {
    let dir = TempDir::new().unwrap();
    let messaging = Arc::new(MessageManager::new());
    let manager = SessionManager::new(
        Arc::new(SessionStore::new(dir.path())),
        Arc::clone(&messaging),
    );

    let jobs = GatedJobRunner::new();
    let runner = manager.create_session(
        "early-message",
        IndexMap::new(),
        SessionSetup {
            plugins: vec![Arc::new(SubscribingPlugin)],
            job_runner: Arc::clone(&jobs) as Arc<dyn JobRunner>,
        },
    );
    let id = runner.session_id();

    // Send before the runner has loaded plugins: the producer blocks on
    // subscriber installation.
    let (done_tx, done_rx) = tokio::sync::oneshot::channel();
    let mut done_tx = Some(done_tx);
    messaging
        .send_message(
            MessageSend {
                destination: MessageDestination::session(id.clone()),
                message_type: "progress.request".to_string(),
                payload: json!(1),
            },
            move |batch| {
                if batch
                    .receptions
                    .iter()
                    .any(|r| matches!(r, MessageReception::GlobalEnd))
                {
                    if let Some(tx) = done_tx.take() {
                        let _ = tx.send(());
                    }
                }
                Ok(())
            },
        )
        .unwrap();

    // Starting the runner installs the subscribers, which releases the
    // blocked producer; the job gate stays shut until the send is done.
    let running = tokio::spawn(Arc::clone(&runner).run());
    tokio::time::timeout(Duration::from_secs(5), done_rx)
        .await
        .expect("blocked send should complete once plugins load")
        .unwrap();

    jobs.gate.notify_one();
    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
