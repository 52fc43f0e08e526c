// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job spec creation from session requests.

use crate::request::{FilterManager, ModuleSplit, SessionRequestInfo};
use crate::subplan::{SubPlan, SubPlanError, SubPlanStore};
use ats_core::{JobId, JobInfo, ModuleFamily, SessionId};
use thiserror::Error;
use tracing::{debug, warn};

/// Plans whose devices are crawled rather than provisioned keep their
/// device info collection.
const PLANS_KEEPING_DEVICE_INFO: [&str; 1] = ["csuite-app-crawl"];

/// Errors while planning jobs. The skippable ones demote to warnings:
/// the session proceeds with whatever jobs could be planned.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("retry of session {0} found no sub-plan filters")]
    MissingRetryFilters(String),
    #[error("no test modules matched the request")]
    NoMatchedModules,
    #[error("no non-tradefed modules matched the request")]
    NoMatchedNonTradefedModules,
    #[error(transparent)]
    SubPlan(#[from] SubPlanError),
}

impl PlanError {
    /// Known benign identities that surface as warnings, not session
    /// failures.
    pub fn is_skippable(&self) -> bool {
        matches!(
            self,
            PlanError::MissingRetryFilters(_)
                | PlanError::NoMatchedModules
                | PlanError::NoMatchedNonTradefedModules
        )
    }
}

/// Filters merged from the request and its sub-plan or retry source.
#[derive(Debug, Default)]
struct EffectiveFilters {
    include: Vec<String>,
    exclude: Vec<String>,
    previous_build_fingerprint: Option<String>,
}

/// Job ids handed out within one planning call: `<session>-job-<n>`.
///
/// Session ids are globally unique, so the scoped ids are too, and a
/// replanned session reproduces the same ids.
struct JobIdSeq<'a> {
    session_id: &'a SessionId,
    seq: u32,
}

impl<'a> JobIdSeq<'a> {
    fn new(session_id: &'a SessionId) -> Self {
        Self { session_id, seq: 0 }
    }

    fn next(&mut self) -> JobId {
        self.seq += 1;
        JobId::new(format!("{}-job-{}", self.session_id, self.seq))
    }
}

/// Builds job specs from a [`SessionRequestInfo`].
pub struct JobCreator<F: FilterManager> {
    filter_manager: F,
    sub_plans: SubPlanStore,
}

impl<F: FilterManager> JobCreator<F> {
    pub fn new(filter_manager: F, sub_plans: SubPlanStore) -> Self {
        Self {
            filter_manager,
            sub_plans,
        }
    }

    /// Plan the jobs for one session's request.
    ///
    /// Skippable plan errors are logged and skipped, so the result may
    /// be fewer jobs than requested, or none at all.
    pub fn create_jobs(
        &self,
        session_id: &SessionId,
        request: &SessionRequestInfo,
    ) -> Result<Vec<JobInfo>, PlanError> {
        let filters = match self.effective_filters(session_id, request) {
            Ok(filters) => filters,
            Err(e) if e.is_skippable() => {
                warn!(plan = %request.test_plan, error = %e, "continuing without merged filters");
                EffectiveFilters::default()
            }
            Err(e) => return Err(e),
        };

        if let Some(fingerprint) = &filters.previous_build_fingerprint {
            warn!(
                plan = %request.test_plan,
                fingerprint = %fingerprint,
                "retrying results recorded against a previous device build"
            );
        }

        let split = self.filter_manager.split_modules(&request.module_names);
        let mut job_ids = JobIdSeq::new(session_id);
        let mut jobs = Vec::new();

        match tradefed_job(request, &filters, &split, &mut job_ids) {
            Ok(job) => jobs.push(job),
            Err(e) if e.is_skippable() => warn!(error = %e, "skipping tradefed job"),
            Err(e) => return Err(e),
        }

        match non_tradefed_jobs(request, &split, &mut job_ids) {
            Ok(mut non_tradefed) => jobs.append(&mut non_tradefed),
            Err(e) if e.is_skippable() => warn!(error = %e, "skipping non-tradefed jobs"),
            Err(e) => return Err(e),
        }

        Ok(jobs)
    }

    /// Merge request filters with the retry or sub-plan source.
    fn effective_filters(
        &self,
        session_id: &SessionId,
        request: &SessionRequestInfo,
    ) -> Result<EffectiveFilters, PlanError> {
        let mut filters = EffectiveFilters {
            include: request.include_filters.clone(),
            exclude: request.exclude_filters.clone(),
            previous_build_fingerprint: None,
        };

        let source_plan: Option<SubPlan> = if request.is_retry() {
            let session = request
                .retry_session_id
                .clone()
                .unwrap_or_else(|| "unknown".to_string());
            let plan = self.sub_plans.load(&retry_plan_name(&session)).map_err(
                |e| match e {
                    SubPlanError::NotFound(_) => PlanError::MissingRetryFilters(session.clone()),
                    other => PlanError::SubPlan(other),
                },
            )?;
            if plan.is_empty() {
                return Err(PlanError::MissingRetryFilters(session));
            }
            Some(plan)
        } else if let Some(name) = &request.sub_plan_name {
            // This run plans from its own backup copy of the live plan.
            let backup = self.sub_plans.backup(name, session_id)?;
            debug!(
                plan = %name,
                backup = %backup.path.display(),
                "planning from sub-plan backup"
            );
            Some(backup.plan)
        } else {
            None
        };

        if let Some(plan) = source_plan {
            filters.include.extend(plan.include_filters);
            filters.exclude.extend(plan.exclude_filters);
            filters.previous_build_fingerprint = plan.previous_build_fingerprint;
        }
        Ok(filters)
    }
}

fn tradefed_job(
    request: &SessionRequestInfo,
    filters: &EffectiveFilters,
    split: &ModuleSplit,
    job_ids: &mut JobIdSeq<'_>,
) -> Result<JobInfo, PlanError> {
    // A plain plan with no module request still runs the whole plan
    // through Tradefed; an explicit module request that matched
    // nothing does not.
    if !request.module_names.is_empty() && split.tradefed.is_empty() {
        return Err(PlanError::NoMatchedModules);
    }

    let command_args = build_command_args(request, filters, &split.tradefed);
    Ok(JobInfo::new(job_ids.next(), request.test_plan.clone())
        .with_driver("tradefed")
        .with_module_family(ModuleFamily::Tradefed)
        .with_command_args(command_args))
}

/// One job per matched non-Tradefed module.
fn non_tradefed_jobs(
    request: &SessionRequestInfo,
    split: &ModuleSplit,
    job_ids: &mut JobIdSeq<'_>,
) -> Result<Vec<JobInfo>, PlanError> {
    if request.module_names.is_empty() {
        return Ok(Vec::new());
    }
    if split.non_tradefed.is_empty() {
        return Err(PlanError::NoMatchedNonTradefedModules);
    }

    Ok(split
        .non_tradefed
        .iter()
        .map(|module| {
            let mut args = vec![format!("-m {module}")];
            if let Some(test) = &request.test_name {
                args.push(format!("-t {test}"));
            }
            JobInfo::new(job_ids.next(), module.clone())
                .with_driver("non-tradefed")
                .with_module_family(ModuleFamily::NonTradefed)
                .with_command_args(args.join(" "))
        })
        .collect())
}

/// Name of the sub-plan a session's retry data is saved under.
pub(crate) fn retry_plan_name(session_id: &str) -> String {
    format!("retry-{session_id}")
}

/// Assemble the driver argument string in its fixed order: modules,
/// test, shards, include/exclude filters, metadata filters, system
/// checkers, device info, module args, extra args.
fn build_command_args(
    request: &SessionRequestInfo,
    filters: &EffectiveFilters,
    modules: &[String],
) -> String {
    let mut args: Vec<String> = Vec::new();

    for module in modules {
        args.push(format!("-m {module}"));
    }
    if let Some(test) = &request.test_name {
        args.push(format!("-t {test}"));
    }
    if let Some(shards) = request.shard_count {
        args.push(format!("--shard-count {shards}"));
    }
    for filter in &filters.include {
        args.push(format!("--include-filter \"{filter}\""));
    }
    for filter in &filters.exclude {
        args.push(format!("--exclude-filter \"{filter}\""));
    }
    for (key, value) in &request.module_metadata_include_filters {
        args.push(format!("--module-metadata-include-filter {key} {value}"));
    }
    for (key, value) in &request.module_metadata_exclude_filters {
        args.push(format!("--module-metadata-exclude-filter {key} {value}"));
    }
    args.push("--report-system-checkers".to_string());
    if !PLANS_KEEPING_DEVICE_INFO.contains(&request.test_plan.as_str()) {
        args.push("--skip-device-info".to_string());
    }
    for module_arg in &request.module_args {
        args.push(format!("--module-arg {module_arg}"));
    }
    args.extend(request.extra_args.iter().cloned());

    args.join(" ")
}

#[cfg(test)]
#[path = "creator_tests.rs"]
mod tests;
