// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Field masks over session detail snapshots.
//!
//! A mask is a set of dot-separated paths relative to the top-level
//! detail view (`config`, `output`, `output.session_property`, ...).
//! An absent mask means "everything"; a present mask names a subset.
//! Unrecognised paths are ignored for forward compatibility.

use serde::{Deserialize, Serialize};

/// Output sub-paths understood when building a masked snapshot.
pub mod paths {
    pub const CONFIG: &str = "config";
    pub const OUTPUT: &str = "output";
    pub const SESSION_PROPERTY: &str = "output.session_property";
    pub const SESSION_PLUGIN_ERROR: &str = "output.session_plugin_error";
    pub const SESSION_PLUGIN_OUTPUT: &str = "output.session_plugin_output";
}

/// A structured selector over a detail snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMask {
    paths: Vec<String>,
}

impl FieldMask {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Whether the mask selects the section at `path`.
    ///
    /// A section is selected when any mask path equals it, is an
    /// ancestor of it, or is a descendant of it. A descendant path
    /// selects the section because the section must be materialised to
    /// hold the selected sub-field.
    pub fn selects(&self, path: &str) -> bool {
        self.paths.iter().any(|p| {
            p == path
                || path
                    .strip_prefix(p.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
                || p.strip_prefix(path)
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }
}

/// Whether `mask` selects `path`, treating an absent mask as "all".
pub fn mask_selects(mask: Option<&FieldMask>, path: &str) -> bool {
    match mask {
        None => true,
        Some(mask) => mask.selects(path),
    }
}

#[cfg(test)]
#[path = "field_mask_tests.rs"]
mod tests;
