// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Console command preprocessing.
//!
//! Rewrites `run command` / `run cmdfile` style input into one or more
//! concrete run commands, resolving aliases first. Preprocessing never
//! raises: everything a user can get wrong comes back as
//! [`PreprocessingResult::UserError`].

use crate::parser::CommandFileParser;
use std::path::Path;
use tracing::debug;

/// Trailing command appended by the `...AndExit` variants.
const EXIT_MARKER: [&str; 3] = ["exit", "-c", "-s"];

/// Resolves alias tokens to their replacement text.
///
/// Alias storage is an external concern; the preprocessor only needs
/// lookups.
pub trait AliasResolver {
    fn resolve(&self, token: &str) -> Option<String>;
}

/// An alias resolver with no aliases.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAliases;

impl AliasResolver for NoAliases {
    fn resolve(&self, _token: &str) -> Option<String> {
        None
    }
}

/// Outcome of preprocessing one console input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreprocessingResult {
    /// Input is none of the preprocessor's business; pass it through
    /// unchanged.
    Passthrough,
    /// Input was rewritten into these command token lists. The list may
    /// be empty (an empty cmdfile), which is distinct from
    /// `Passthrough`.
    Commands(Vec<Vec<String>>),
    /// User-facing error message; no command is executed.
    UserError(String),
}

/// Recognises `run command` / `run cmdfile` variants and resolves
/// aliases.
#[derive(Debug, Clone, Default)]
pub struct CommandPreprocessor<A> {
    parser: CommandFileParser,
    aliases: Option<A>,
}

impl CommandPreprocessor<NoAliases> {
    /// A preprocessor without an alias manager.
    pub fn new() -> Self {
        Self {
            parser: CommandFileParser::new(),
            aliases: None,
        }
    }
}

impl<A: AliasResolver> CommandPreprocessor<A> {
    pub fn with_aliases(aliases: A) -> Self {
        Self {
            parser: CommandFileParser::new(),
            aliases: Some(aliases),
        }
    }

    /// Preprocess one tokenised console input line.
    pub fn preprocess(&self, tokens: &[String]) -> PreprocessingResult {
        let (tokens, aliased) = match self.resolve_aliases(tokens) {
            Ok(resolved) => resolved,
            Err(message) => return PreprocessingResult::UserError(message),
        };

        match self.dispatch(&tokens) {
            Dispatch::NotARunCommand if aliased => {
                // Aliases rewrote the input even though no run-variant
                // matched; the caller should use the rewritten tokens.
                PreprocessingResult::Commands(vec![tokens])
            }
            Dispatch::NotARunCommand => PreprocessingResult::Passthrough,
            Dispatch::Done(result) => result,
        }
    }

    /// Splice alias replacements into the token list.
    ///
    /// Returns the (possibly rewritten) tokens and whether any alias
    /// fired. A replacement that fails to tokenise is a user error.
    fn resolve_aliases(&self, tokens: &[String]) -> Result<(Vec<String>, bool), String> {
        let Some(aliases) = &self.aliases else {
            return Ok((tokens.to_vec(), false));
        };

        let mut out = Vec::with_capacity(tokens.len());
        let mut any = false;
        for token in tokens {
            match aliases.resolve(token) {
                Some(replacement) => {
                    let spliced = ats_shell::tokenize(&replacement).map_err(|e| {
                        format!("Failed to expand alias {token}: {e}")
                    })?;
                    debug!(alias = %token, replacement = %replacement, "expanded alias");
                    out.extend(spliced);
                    any = true;
                }
                None => out.push(token.clone()),
            }
        }
        Ok((out, any))
    }

    fn dispatch(&self, tokens: &[String]) -> Dispatch {
        if tokens.len() < 2 || !tokens[0].eq_ignore_ascii_case("run") {
            return Dispatch::NotARunCommand;
        }

        // The sub-command match is exact.
        let result = match tokens[1].as_str() {
            "command" => self.run_command(tokens, false),
            "commandAndExit" => self.run_command(tokens, true),
            "cmdfile" => self.run_cmdfile(tokens, false),
            "cmdfileAndExit" => self.run_cmdfile(tokens, true),
            _ => return Dispatch::NotARunCommand,
        };
        Dispatch::Done(result)
    }

    /// `run command <cfg> [args]` → `[run, <cfg>, args...]`.
    fn run_command(&self, tokens: &[String], and_exit: bool) -> PreprocessingResult {
        let mut command = vec!["run".to_string()];
        command.extend(tokens[2..].iter().cloned());

        let mut commands = vec![command];
        if and_exit {
            commands.push(exit_marker());
        }
        PreprocessingResult::Commands(commands)
    }

    /// `run cmdfile <path> [extra]` → one run command per expanded
    /// command line, with `extra` appended to each.
    fn run_cmdfile(&self, tokens: &[String], and_exit: bool) -> PreprocessingResult {
        if tokens.len() < 3 {
            return PreprocessingResult::UserError("Cmdfile path is not specified".to_string());
        }

        let parsed = match self.parser.parse_file(Path::new(&tokens[2])) {
            Ok(parsed) => parsed,
            Err(e) => {
                return PreprocessingResult::UserError(format!("Failed to read cmdfile: {e}"));
            }
        };

        let extra = &tokens[3..];
        let mut commands: Vec<Vec<String>> = parsed
            .commands
            .into_iter()
            .map(|cmd| {
                let mut command = Vec::with_capacity(cmd.tokens.len() + extra.len() + 1);
                command.push("run".to_string());
                command.extend(cmd.tokens);
                command.extend(extra.iter().cloned());
                command
            })
            .collect();

        if and_exit {
            commands.push(exit_marker());
        }
        PreprocessingResult::Commands(commands)
    }
}

enum Dispatch {
    NotARunCommand,
    Done(PreprocessingResult),
}

fn exit_marker() -> Vec<String> {
    EXIT_MARKER.iter().map(|t| t.to_string()).collect()
}

#[cfg(test)]
#[path = "preprocess_tests.rs"]
mod tests;
