//! Job planning feeding the session runtime.

use crate::prelude::*;
use ats_messaging::MessageManager;
use ats_session::{SessionManager, SessionSetup};
use ats_storage::SessionStore;
use ats_xts::{FilterManager, JobCreator, ModuleSplit, SessionRequestInfo, SubPlanStore};
use indexmap::IndexMap;
use std::sync::Arc;
use tempfile::TempDir;

/// Everything the inventory knows is Tradefed except `NtFrameworkTest`.
struct FixedInventory;

impl FilterManager for FixedInventory {
    fn split_modules(&self, modules: &[String]) -> ModuleSplit {
        let mut split = ModuleSplit::default();
        for module in modules {
            if module == "NtFrameworkTest" {
                split.non_tradefed.push(module.clone());
            } else {
                split.tradefed.push(module.clone());
            }
        }
        split
    }
}

#[tokio::test]
async fn planned_jobs_attach_to_the_session_and_poll_in_order() {
    let xts_root = TempDir::new().unwrap();
    let state = TempDir::new().unwrap();

    let manager = SessionManager::new(
        Arc::new(SessionStore::new(state.path())),
        Arc::new(MessageManager::new()),
    );
    let runner = manager.create_session(
        "planned",
        IndexMap::new(),
        SessionSetup {
            plugins: vec![],
            job_runner: Arc::new(NoopJobRunner),
        },
    );

    let mut request = SessionRequestInfo::new("cts", xts_root.path());
    request.module_names = vec!["CtsExampleTest".to_string(), "NtFrameworkTest".to_string()];
    request.shard_count = Some(2);

    let creator = JobCreator::new(FixedInventory, SubPlanStore::new(xts_root.path()));
    let jobs = creator.create_jobs(&runner.session_id(), &request).unwrap();
    assert_eq!(jobs.len(), 2);

    runner.queue_initial_jobs(jobs);

    Arc::clone(&runner).run().await.unwrap();

    let attached = runner.holder().all_jobs();
    assert_eq!(attached.len(), 2);
    assert!(attached[0].command_args.contains("--shard-count 2"));
    assert_eq!(attached[1].name, "NtFrameworkTest");

    // Nothing polled them yet, so the first poll sees the full list.
    assert_eq!(runner.holder().poll_jobs().len(), 2);
}
