// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session request data and the module filter seam.

use indexmap::IndexMap;
use std::path::PathBuf;

/// Everything a client supplies when asking for a test session.
#[derive(Debug, Clone, Default)]
pub struct SessionRequestInfo {
    /// Test plan name; `retry` selects retry mode, and some plans tweak
    /// argument assembly (`csuite-app-crawl` drops `--skip-device-info`).
    pub test_plan: String,
    /// Root of the xTS installation the jobs run against.
    pub xts_root_dir: PathBuf,
    /// Requested modules (`-m`).
    pub module_names: Vec<String>,
    /// Single test to run (`-t`).
    pub test_name: Option<String>,
    pub shard_count: Option<u32>,
    pub include_filters: Vec<String>,
    pub exclude_filters: Vec<String>,
    /// Previous session to retry; retry mode loads its sub-plan.
    pub retry_session_id: Option<String>,
    /// Curated sub-plan to apply.
    pub sub_plan_name: Option<String>,
    pub env_vars: IndexMap<String, String>,
    /// `--module-metadata-include-filter` key/value pairs.
    pub module_metadata_include_filters: Vec<(String, String)>,
    pub module_metadata_exclude_filters: Vec<(String, String)>,
    /// `--module-arg` entries, already in `module:arg:value` form.
    pub module_args: Vec<String>,
    /// Passed through verbatim, last.
    pub extra_args: Vec<String>,
}

impl SessionRequestInfo {
    pub fn new(test_plan: impl Into<String>, xts_root_dir: impl Into<PathBuf>) -> Self {
        Self {
            test_plan: test_plan.into(),
            xts_root_dir: xts_root_dir.into(),
            ..Self::default()
        }
    }

    pub fn is_retry(&self) -> bool {
        self.test_plan == "retry"
    }
}

/// Requested modules partitioned into the two execution families.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModuleSplit {
    pub tradefed: Vec<String>,
    pub non_tradefed: Vec<String>,
}

/// Partitions requested modules into Tradefed and non-Tradefed sets.
///
/// The concrete manager knows the installed module inventory; the
/// planner only consumes the split.
pub trait FilterManager: Send + Sync {
    /// Split `modules` against the installed inventory. An empty
    /// request means "everything installed".
    fn split_modules(&self, modules: &[String]) -> ModuleSplit;
}
