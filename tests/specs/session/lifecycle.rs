//! Full session lifecycle through the manager.

use crate::prelude::*;
use ats_core::{FieldMask, SessionNotification};
use ats_messaging::MessageManager;
use ats_session::{JobRunner, SessionManager, SessionSetup};
use ats_storage::SessionStore;
use indexmap::IndexMap;
use std::sync::Arc;
use tempfile::TempDir;

fn manager(dir: &TempDir) -> SessionManager {
    SessionManager::new(
        Arc::new(SessionStore::new(dir.path())),
        Arc::new(MessageManager::new()),
    )
}

#[tokio::test]
async fn plugins_observe_the_full_lifecycle_in_order() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let log: EventLog = Arc::default();

    let mut properties = IndexMap::new();
    properties.insert("branch".to_string(), "main".to_string());

    let runner = manager.create_session(
        "nightly",
        properties,
        SessionSetup {
            plugins: vec![RecordingPlugin::new("report", &log)],
            job_runner: Arc::new(NoopJobRunner),
        },
    );

    // A notification before the session runs is cached.
    let id = runner.session_id();
    assert!(manager.notify_session(&id, SessionNotification::new(id.clone(), "early")));

    Arc::clone(&runner).run().await.unwrap();

    assert_eq!(
        log.lock().as_slice(),
        &[
            "report:notify:early",
            "report:starting",
            "report:started",
            "report:ended",
            "report:close",
        ]
    );
}

#[tokio::test]
async fn field_mask_restricts_the_external_view() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let runner = manager.create_session(
        "masked",
        IndexMap::new(),
        SessionSetup {
            plugins: vec![],
            job_runner: Arc::new(NoopJobRunner),
        },
    );
    let id = runner.session_id();
    runner.holder().put_session_property("k", "v");

    let full = manager.get_session(&id, None).unwrap();
    assert_eq!(full.output.properties.len(), 1);
    assert_eq!(full.config.name, "masked");

    let mask = FieldMask::new(["output.session_plugin_error"]);
    let masked = manager.get_session(&id, Some(&mask)).unwrap();
    assert!(masked.output.properties.is_empty());
    assert!(masked.config.name.is_empty());
}

#[tokio::test]
async fn aborting_a_running_session_sets_the_well_known_property() {
    let dir = TempDir::new().unwrap();
    let manager = manager(&dir);
    let jobs = GatedJobRunner::new();
    let runner = manager.create_session(
        "aborted",
        IndexMap::new(),
        SessionSetup {
            plugins: vec![],
            job_runner: Arc::clone(&jobs) as Arc<dyn JobRunner>,
        },
    );
    let id = runner.session_id();

    let running = tokio::spawn(Arc::clone(&runner).run());
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    assert!(manager.abort_session(&id));
    tokio::time::timeout(std::time::Duration::from_secs(5), running)
        .await
        .expect("abort should end the session")
        .unwrap()
        .unwrap();

    let detail = manager.get_session(&id, None).unwrap();
    assert_eq!(
        detail
            .output
            .properties
            .get("session.aborted_when_running")
            .map(String::as_str),
        Some("true")
    );
}
