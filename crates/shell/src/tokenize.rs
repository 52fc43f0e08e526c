// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Character-level tokeniser.

use thiserror::Error;

/// Errors from [`tokenize`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenizeError {
    #[error("unterminated {quote} quote opened at column {column}")]
    UnterminatedQuote {
        /// "single" or "double"
        quote: &'static str,
        /// 0-based byte column of the opening quote.
        column: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Unquoted,
    Single { start: usize },
    Double { start: usize },
}

/// Split `line` into tokens.
///
/// An empty quoted string (`''` or `""`) yields an empty token;
/// whitespace runs outside quotes yield no tokens at all.
pub fn tokenize(line: &str) -> Result<Vec<String>, TokenizeError> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut mode = Mode::Unquoted;
    let mut chars = line.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match mode {
            Mode::Unquoted => match c {
                '\'' => {
                    in_token = true;
                    mode = Mode::Single { start: i };
                }
                '"' => {
                    in_token = true;
                    mode = Mode::Double { start: i };
                }
                '\\' => {
                    in_token = true;
                    match chars.next() {
                        Some((_, escaped)) => current.push(escaped),
                        // Dangling backslash at end of line is literal.
                        None => current.push('\\'),
                    }
                }
                c if c.is_whitespace() => {
                    if in_token {
                        tokens.push(std::mem::take(&mut current));
                        in_token = false;
                    }
                }
                c => {
                    in_token = true;
                    current.push(c);
                }
            },
            Mode::Single { .. } => match c {
                '\'' => mode = Mode::Unquoted,
                c => current.push(c),
            },
            Mode::Double { .. } => match c {
                '"' => mode = Mode::Unquoted,
                '\\' => match chars.peek().map(|&(_, next)| next) {
                    // Only `\"` and `\\` are escapes inside double quotes.
                    Some(next @ ('"' | '\\')) => {
                        current.push(next);
                        chars.next();
                    }
                    _ => current.push('\\'),
                },
                c => current.push(c),
            },
        }
    }

    match mode {
        Mode::Single { start } => Err(TokenizeError::UnterminatedQuote {
            quote: "single",
            column: start,
        }),
        Mode::Double { start } => Err(TokenizeError::UnterminatedQuote {
            quote: "double",
            column: start,
        }),
        Mode::Unquoted => {
            if in_token {
                tokens.push(current);
            }
            Ok(tokens)
        }
    }
}

#[cfg(test)]
#[path = "tokenize_tests.rs"]
mod tests;
