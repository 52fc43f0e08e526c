//! Console input to run-command expansion, end to end.

use crate::prelude::*;
use ats_cmdfile::{CommandPreprocessor, PreprocessingResult};
use tempfile::TempDir;

#[test]
fn cmdfile_with_include_and_macros_expands_fully() {
    let dir = TempDir::new().unwrap();
    write_cmdfile(
        dir.path(),
        "common.txt",
        "MACRO RETRIES = --max-retries 2\n",
    );
    let main = write_cmdfile(
        dir.path(),
        "nightly.txt",
        "INCLUDE common.txt\n\
         # nightly suites\n\
         cts RETRIES()\n\
         LONG MACRO DEVICES\n\
         --serial emulator-5554\n\
         --serial emulator-5556\n\
         END MACRO\n\
         gts DEVICES()\n",
    );

    let input = toks(&[
        "run",
        "cmdfileAndExit",
        main.to_str().unwrap(),
        "--dry-run",
    ]);
    let result = CommandPreprocessor::new().preprocess(&input);

    assert_eq!(
        result,
        PreprocessingResult::Commands(vec![
            toks(&["run", "cts", "--max-retries", "2", "--dry-run"]),
            toks(&["run", "gts", "--serial", "emulator-5554", "--dry-run"]),
            toks(&["run", "gts", "--serial", "emulator-5556", "--dry-run"]),
            toks(&["exit", "-c", "-s"]),
        ])
    );
}

#[test]
fn tokenised_console_line_feeds_the_preprocessor() {
    // The same tokeniser serves the console prompt and command files.
    let tokens = ats_shell::tokenize("run command cts --module 'Camera Suite'").unwrap();
    let result = CommandPreprocessor::new().preprocess(&tokens);
    assert_eq!(
        result,
        PreprocessingResult::Commands(vec![toks(&["run", "cts", "--module", "Camera Suite"])])
    );
}

#[test]
fn parse_failures_surface_as_user_errors_not_panics() {
    let dir = TempDir::new().unwrap();
    let bad = write_cmdfile(dir.path(), "bad.txt", "cts UNDEFINED()\n");

    let input = toks(&["run", "cmdfile", bad.to_str().unwrap()]);
    match CommandPreprocessor::new().preprocess(&input) {
        PreprocessingResult::UserError(message) => {
            assert!(message.contains("UNDEFINED"), "message: {message}");
        }
        other => panic!("expected user error, got {other:?}"),
    }
}
