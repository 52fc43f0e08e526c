//! Command-file watching wired to reparsing.

use crate::prelude::*;
use ats_cmdfile::CommandFileParser;
use ats_watcher::{CommandFile, CommandFileWatcher};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Parse a command file and register it (plus its include dependencies)
/// with the watcher, the way the console does after `run cmdfile`.
fn register(watcher: &CommandFileWatcher, parser: &CommandFileParser, path: &PathBuf) {
    let parsed = parser.parse_file(path).unwrap();
    let dependencies = parsed
        .dependencies
        .iter()
        .map(|dep| CommandFile::new(dep, vec![]))
        .collect();
    watcher.watch(CommandFile::new(path, vec!["--from-reload".to_string()]).with_dependencies(dependencies));
}

#[tokio::test]
async fn an_edited_include_triggers_a_reload_of_the_outer_file() {
    let dir = TempDir::new().unwrap();
    let dep = write_cmdfile(dir.path(), "common.txt", "MACRO M = --a\n");
    let main = write_cmdfile(dir.path(), "main.txt", "INCLUDE common.txt\ncts M()\n");

    let reloaded: Arc<Mutex<Vec<(PathBuf, Vec<String>)>>> = Arc::default();
    let sink = Arc::clone(&reloaded);
    let watcher = CommandFileWatcher::with_interval(
        move |path: &std::path::Path, extra: &[String]| {
            sink.lock().push((path.to_path_buf(), extra.to_vec()));
        },
        Duration::from_secs(3600),
    );

    let parser = CommandFileParser::new();
    register(&watcher, &parser, &main);

    // Nothing changed yet.
    watcher.check_for_updates();
    assert!(reloaded.lock().is_empty());

    // Edit the dependency; ensure the mtime moves even on coarse
    // filesystem clocks.
    std::thread::sleep(Duration::from_millis(1100));
    write_cmdfile(dir.path(), "common.txt", "MACRO M = --b\n");

    watcher.check_for_updates();
    {
        let reloaded = reloaded.lock();
        assert_eq!(reloaded.len(), 1);
        // The outer file is reported, with its reload args; the
        // dependency itself is not.
        assert_eq!(reloaded[0].0, main);
        assert_eq!(reloaded[0].1, vec!["--from-reload".to_string()]);
        assert_ne!(reloaded[0].0, dep);
    }

    // Reparsing picks up the edited macro.
    let parsed = parser.parse_file(&main).unwrap();
    assert_eq!(parsed.commands[0].tokens, toks(&["cts", "--b"]));
}
