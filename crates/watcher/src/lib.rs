// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Polling watcher over command files and their include dependencies.
//!
//! A single long-lived background task polls the watched set at a fixed
//! cadence (20 s by default). A watched file changes when its observed
//! mtime differs from the recorded one; a change in any of its
//! dependency files is reported against the watched file itself, since
//! dependencies are never reloaded on their own.

mod watch;

pub use watch::{CommandFile, CommandFileListener, CommandFileWatcher, DEFAULT_POLL_INTERVAL};
