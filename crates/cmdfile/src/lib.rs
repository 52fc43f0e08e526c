// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Command-file parsing and command preprocessing.
//!
//! A command file is UTF-8 text where each non-comment line is either a
//! macro definition, an include, or a command line:
//!
//! ```text
//! MACRO name = token [token ...]
//! LONG MACRO name
//!  ... body lines ...
//! END MACRO
//! INCLUDE <path>
//! <arbitrary tokens>
//! ```
//!
//! [`CommandFileParser`] reads a file (and its transitive includes) and
//! returns the command lines with all macro calls expanded.
//! [`CommandPreprocessor`] sits above it and rewrites `run command` /
//! `run cmdfile` style console input into concrete run commands,
//! resolving aliases along the way.

mod expand;
mod parser;
mod preprocess;

pub use expand::{expand_macros, MacroTables, MAX_EXPANSION_PASSES};
pub use parser::{CmdfileError, CommandFileParser, ParsedCommandFile};
pub use preprocess::{AliasResolver, CommandPreprocessor, NoAliases, PreprocessingResult};
