// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Line-oriented command-file parser.
//!
//! Parsing is a two-phase affair: this module reads files into command
//! lines and macro tables (resolving `INCLUDE`s and breaking include
//! cycles), then [`crate::expand`] runs the macro fixpoint over the
//! collected lines. All per-parse state lives in a private struct that
//! is created fresh for every [`CommandFileParser::parse_file`] call.

use crate::expand::{expand_macros, MacroTables};
use ats_core::CommandLine;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Errors from reading or parsing a command file.
#[derive(Debug, Error)]
pub enum CmdfileError {
    #[error("failed to read command file {file}: {source}")]
    Read {
        file: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{file}:{line}: {message}")]
    Parse {
        file: PathBuf,
        line: u32,
        message: String,
    },
}

impl CmdfileError {
    pub(crate) fn parse(file: &Path, line: u32, message: impl Into<String>) -> Self {
        Self::Parse {
            file: file.to_path_buf(),
            line,
            message: message.into(),
        }
    }
}

/// Result of parsing one command file and its transitive includes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommandFile {
    /// Command lines in file order, macros fully expanded.
    pub commands: Vec<CommandLine>,
    /// Absolute paths of every included file (the outer file excluded).
    ///
    /// These are the files a watcher should treat as dependencies of
    /// the outer file.
    pub dependencies: BTreeSet<PathBuf>,
}

/// Macro-expanding, include-resolving command-file parser.
///
/// The parser itself is stateless and reusable; macro tables, command
/// lines, and the included-files set are reset at the top of each
/// `parse_file` call.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandFileParser;

impl CommandFileParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse `path` and expand all macros.
    ///
    /// Include paths are resolved relative to the including file's
    /// directory unless absolute. Repeat includes of the same absolute
    /// path (including cycles) are silently collapsed.
    pub fn parse_file(&self, path: &Path) -> Result<ParsedCommandFile, CmdfileError> {
        let mut state = ParseState::default();
        let outer = absolutize(path);
        state.parse_into(&outer)?;

        // The outer file is not a dependency of itself.
        state.included.remove(&outer);

        let commands = expand_macros(&state.macros, state.lines)?;
        Ok(ParsedCommandFile {
            commands,
            dependencies: state.included.into_iter().collect(),
        })
    }
}

/// Per-parse working state, rebuilt for every parse.
#[derive(Debug, Default)]
struct ParseState {
    macros: MacroTables,
    lines: Vec<CommandLine>,
    included: BTreeSet<PathBuf>,
}

impl ParseState {
    fn parse_into(&mut self, file: &Path) -> Result<(), CmdfileError> {
        if !self.included.insert(file.to_path_buf()) {
            // Already parsed in this session; includes are idempotent.
            return Ok(());
        }

        let content = fs::read_to_string(file).map_err(|source| CmdfileError::Read {
            file: file.to_path_buf(),
            source,
        })?;

        let mut lines = content.lines().enumerate();
        while let Some((idx, raw)) = lines.next() {
            let line_no = idx as u32 + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let tokens = tokenize_line(file, line_no, trimmed)?;

            if let Some((name, expansion)) = classify_short_macro(&tokens) {
                let def = CommandLine::new(expansion, file, line_no);
                if self.macros.define_short(name, def).is_some() {
                    warn!(macro_name = name, file = %file.display(), "redefining short macro");
                }
            } else if let Some(name) = classify_long_macro_header(&tokens) {
                let name = name.to_string();
                let body = read_long_macro_body(file, line_no, &mut lines)?;
                if self.macros.define_long(&name, body).is_some() {
                    warn!(macro_name = %name, file = %file.display(), "redefining long macro");
                }
            } else if let Some(target) = classify_include(&tokens) {
                let resolved = resolve_include(file, target);
                self.parse_into(&resolved)?;
            } else {
                self.lines.push(CommandLine::new(tokens, file, line_no));
            }
        }

        Ok(())
    }
}

/// `MACRO name = expansion...` with a well-formed name.
fn classify_short_macro(tokens: &[String]) -> Option<(&str, Vec<String>)> {
    if tokens.len() >= 4
        && tokens[0] == "MACRO"
        && tokens[2] == "="
        && MacroTables::is_valid_name(&tokens[1])
    {
        Some((&tokens[1], tokens[3..].to_vec()))
    } else {
        None
    }
}

/// `LONG MACRO name` with a well-formed name.
fn classify_long_macro_header(tokens: &[String]) -> Option<&str> {
    if tokens.len() == 3
        && tokens[0] == "LONG"
        && tokens[1] == "MACRO"
        && MacroTables::is_valid_name(&tokens[2])
    {
        Some(&tokens[2])
    } else {
        None
    }
}

/// `INCLUDE <path>`.
fn classify_include(tokens: &[String]) -> Option<&str> {
    if tokens.len() == 2 && tokens[0] == "INCLUDE" {
        Some(&tokens[1])
    } else {
        None
    }
}

/// Read raw lines until a line whose trimmed content is exactly
/// `END MACRO`, tokenising each body line that is not empty or a
/// comment. EOF before the terminator is fatal.
fn read_long_macro_body<'a>(
    file: &Path,
    header_line: u32,
    lines: &mut impl Iterator<Item = (usize, &'a str)>,
) -> Result<Vec<CommandLine>, CmdfileError> {
    let mut body = Vec::new();
    for (idx, raw) in lines {
        let line_no = idx as u32 + 1;
        let trimmed = raw.trim();
        if trimmed == "END MACRO" {
            return Ok(body);
        }
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        body.push(CommandLine::new(
            tokenize_line(file, line_no, trimmed)?,
            file,
            line_no,
        ));
    }
    Err(CmdfileError::parse(
        file,
        header_line,
        "LONG MACRO definition without END MACRO",
    ))
}

fn tokenize_line(file: &Path, line_no: u32, line: &str) -> Result<Vec<String>, CmdfileError> {
    ats_shell::tokenize(line).map_err(|e| CmdfileError::parse(file, line_no, e.to_string()))
}

/// Resolve an include target against the including file's directory.
fn resolve_include(including: &Path, target: &str) -> PathBuf {
    let target = Path::new(target);
    if target.is_absolute() {
        return target.to_path_buf();
    }
    match including.parent() {
        Some(dir) => absolutize(&dir.join(target)),
        None => absolutize(target),
    }
}

/// Make a path absolute without requiring it to exist.
fn absolutize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
