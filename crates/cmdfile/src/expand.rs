// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded fixpoint macro expansion.
//!
//! Each pass walks every still-flagged line. Short macros are expanded
//! in-place, every defined call in the line at once; if none fired, the
//! first remaining `name()` call is tried as a long macro, which
//! multiplies the line by its body (prefix and suffix tokens are
//! carried onto every produced line). A line's flag stays set exactly
//! while it may still contain macro calls. The pass count is capped so
//! macro cycles terminate deterministically.

use crate::parser::CmdfileError;
use ats_core::CommandLine;
use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

/// Upper bound on expansion passes before giving up on a fixpoint.
pub const MAX_EXPANSION_PASSES: usize = 20;

/// A token of the form `name()`.
// Allow expect here as the regex is compile-time verified to be valid
#[allow(clippy::expect_used)]
static MACRO_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9_-]*)\(\)$").expect("constant regex pattern is valid")
});

#[allow(clippy::expect_used)]
static MACRO_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_-]*$").expect("constant regex pattern is valid")
});

/// Returns the macro name if `token` is a `name()` call.
fn macro_call_name(token: &str) -> Option<&str> {
    MACRO_CALL
        .captures(token)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Short and long macro tables for one parse session.
///
/// Both tables keep definition order; redefinition overwrites (the
/// parser logs the warning since it knows the file).
#[derive(Debug, Clone, Default)]
pub struct MacroTables {
    short: IndexMap<String, CommandLine>,
    long: IndexMap<String, Vec<CommandLine>>,
}

impl MacroTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `name` is usable as a macro name.
    pub fn is_valid_name(name: &str) -> bool {
        MACRO_NAME.is_match(name)
    }

    /// Define a short macro, returning the previous definition if any.
    pub fn define_short(&mut self, name: &str, expansion: CommandLine) -> Option<CommandLine> {
        self.short.insert(name.to_string(), expansion)
    }

    /// Define a long macro, returning the previous definition if any.
    pub fn define_long(
        &mut self,
        name: &str,
        body: Vec<CommandLine>,
    ) -> Option<Vec<CommandLine>> {
        self.long.insert(name.to_string(), body)
    }

    pub fn short(&self, name: &str) -> Option<&CommandLine> {
        self.short.get(name)
    }

    pub fn long(&self, name: &str) -> Option<&[CommandLine]> {
        self.long.get(name).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.short.is_empty() && self.long.is_empty()
    }
}

/// Expand both macro tables across `lines` until fixpoint or the pass
/// cap.
///
/// Every produced line keeps the file and line number of the command
/// line it came from, never the macro definition's.
pub fn expand_macros(
    tables: &MacroTables,
    lines: Vec<CommandLine>,
) -> Result<Vec<CommandLine>, CmdfileError> {
    let mut lines: Vec<(CommandLine, bool)> = lines.into_iter().map(|l| (l, true)).collect();

    for _pass in 0..MAX_EXPANSION_PASSES {
        if !lines.iter().any(|(_, flagged)| *flagged) {
            return Ok(lines.into_iter().map(|(l, _)| l).collect());
        }

        let mut next: Vec<(CommandLine, bool)> = Vec::with_capacity(lines.len());
        for (line, flagged) in lines {
            if !flagged {
                next.push((line, false));
                continue;
            }

            if let Some(rewritten) = expand_short_calls(tables, &line) {
                next.push((rewritten, true));
                continue;
            }

            match expand_first_long_call(tables, &line)? {
                Some(produced) => next.extend(produced.into_iter().map(|l| (l, true))),
                None => next.push((line, false)),
            }
        }
        lines = next;
    }

    if let Some((line, _)) = lines.iter().find(|(_, flagged)| *flagged) {
        warn!(
            file = %line.file.display(),
            line = line.line,
            passes = MAX_EXPANSION_PASSES,
            "macro expansion did not reach a fixpoint; giving up"
        );
    }
    Ok(lines.into_iter().map(|(l, _)| l).collect())
}

/// Replace every defined short-macro call in the line.
///
/// Returns `None` if nothing was expanded. Undefined calls are left in
/// place; the long-macro scan decides whether they are fatal.
fn expand_short_calls(tables: &MacroTables, line: &CommandLine) -> Option<CommandLine> {
    let mut expanded = false;
    let mut tokens = Vec::with_capacity(line.tokens.len());
    for token in &line.tokens {
        match macro_call_name(token).and_then(|name| tables.short(name)) {
            Some(def) => {
                tokens.extend(def.tokens.iter().cloned());
                expanded = true;
            }
            None => tokens.push(token.clone()),
        }
    }
    expanded.then(|| line.with_tokens(tokens))
}

/// Expand the first `name()` call as a long macro, multiplying the line
/// by the macro body.
///
/// Returns `Ok(None)` when the line has no macro calls left. A call
/// whose name is defined in neither table is fatal: the short pass has
/// already run, so the call can never be resolved.
fn expand_first_long_call(
    tables: &MacroTables,
    line: &CommandLine,
) -> Result<Option<Vec<CommandLine>>, CmdfileError> {
    for (i, token) in line.tokens.iter().enumerate() {
        let Some(name) = macro_call_name(token) else {
            continue;
        };
        let Some(body) = tables.long(name) else {
            if tables.short(name).is_some() {
                // Defined as a short macro; the short pass will get it.
                continue;
            }
            return Err(CmdfileError::parse(
                &line.file,
                line.line,
                format!("Macro call {name} does not match any macro definitions."),
            ));
        };

        let prefix = &line.tokens[..i];
        let suffix = &line.tokens[i + 1..];
        let produced = body
            .iter()
            .map(|body_line| {
                let mut tokens =
                    Vec::with_capacity(prefix.len() + body_line.tokens.len() + suffix.len());
                tokens.extend_from_slice(prefix);
                tokens.extend(body_line.tokens.iter().cloned());
                tokens.extend_from_slice(suffix);
                line.with_tokens(tokens)
            })
            .collect();
        return Ok(Some(produced));
    }
    Ok(None)
}

#[cfg(test)]
#[path = "expand_tests.rs"]
mod tests;
