//! Crash recovery: persisted sessions resume across a restart.

use crate::prelude::*;
use ats_messaging::MessageManager;
use ats_session::{SessionManager, SessionSetup};
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
async fn a_restarted_console_resumes_persisted_sessions() {
    let dir = TempDir::new().unwrap();

    // First console incarnation: run a session that records state.
    let id = {
        let manager = manager(&dir);
        let runner = manager.create_session(
            "interrupted",
            IndexMap::new(),
            SessionSetup {
                plugins: vec![],
                job_runner: Arc::new(NoopJobRunner),
            },
        );
        runner.holder().put_session_property("progress", "3/10");
        runner.session_id()
        // Holder persisted on every change; the "crash" is simply
        // dropping the manager here without running the session.
    };

    // Second incarnation recovers from the same store.
    let manager = manager(&dir);
    let log: EventLog = Arc::default();
    let recovered = manager
        .recover(|detail| {
            assert_eq!(detail.config.name, "interrupted");
            SessionSetup {
                plugins: vec![RecordingPlugin::new("report", &log)],
                job_runner: Arc::new(NoopJobRunner),
            }
        })
        .unwrap();
    assert_eq!(recovered.len(), 1);

    let runner = &recovered[0];
    assert_eq!(runner.session_id(), id);
    assert_eq!(
        runner.holder().get_session_property("progress").as_deref(),
        Some("3/10")
    );

    // The recovered session replays a full lifecycle.
    Arc::clone(runner).run().await.unwrap();
    assert_eq!(
        log.lock().as_slice(),
        &[
            "report:starting",
            "report:started",
            "report:ended",
            "report:close",
        ]
    );
}

#[tokio::test]
async fn removed_sessions_do_not_come_back() {
    let dir = TempDir::new().unwrap();
    let id = {
        let manager = manager(&dir);
        let runner = manager.create_session(
            "short-lived",
            IndexMap::new(),
            SessionSetup {
                plugins: vec![],
                job_runner: Arc::new(NoopJobRunner),
            },
        );
        let id = runner.session_id();
        Arc::clone(&runner).run().await.unwrap();
        manager.remove_session(&id).unwrap();
        id
    };

    let manager = manager(&dir);
    let recovered = manager
        .recover(|_| SessionSetup {
            plugins: vec![],
            job_runner: Arc::new(NoopJobRunner),
        })
        .unwrap();
    assert!(recovered.is_empty(), "{id} should not be recovered");
}
