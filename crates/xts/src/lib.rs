// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! xTS job planning: turns a session request into concrete job specs.
//!
//! Covers the three request modes (plain, sub-plan, retry), the
//! Tradefed / non-Tradefed module split, deterministic command-argument
//! assembly, and the sub-plan store with run-scoped backups. Known
//! benign failures (nothing matched, retry without filters) are
//! demoted to warnings instead of failing the session.

mod creator;
mod info_file;
mod request;
mod subplan;

pub use creator::{JobCreator, PlanError};
pub use info_file::{InfoFileError, RuntimeInfoReader, RuntimeInfoWriter};
pub use request::{FilterManager, ModuleSplit, SessionRequestInfo};
pub use subplan::{SubPlan, SubPlanBackup, SubPlanError, SubPlanStore};
