// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command line value type with source provenance.
//!
//! A `CommandLine` is the unit the command-file parser and macro
//! expander operate on: an ordered token list plus the file and
//! 1-based line number it came from. Provenance survives macro
//! expansion, so diagnostics always point at the source line the
//! user wrote, not at a macro definition.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// An ordered token sequence tagged with its originating file and line.
///
/// Equality covers tokens, file, and line together: two identical token
/// lists read from different places are different command lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandLine {
    pub tokens: Vec<String>,
    pub file: PathBuf,
    pub line: u32,
}

impl CommandLine {
    /// Create a command line from tokens and its source position.
    pub fn new(tokens: Vec<String>, file: impl Into<PathBuf>, line: u32) -> Self {
        Self {
            tokens,
            file: file.into(),
            line,
        }
    }

    /// Rebuild this line with different tokens, keeping provenance.
    pub fn with_tokens(&self, tokens: Vec<String>) -> Self {
        Self {
            tokens,
            file: self.file.clone(),
            line: self.line,
        }
    }

    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tokens.join(" "))
    }
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
