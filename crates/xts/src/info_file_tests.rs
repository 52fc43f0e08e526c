// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

#[test]
fn writer_creates_file_and_lockfile() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("runtime_info.txt");
    let mut writer = RuntimeInfoWriter::with_interval(&path, Duration::ZERO);

    assert!(writer.write("invocations: 1\n").unwrap());
    assert_eq!(fs::read_to_string(&path).unwrap(), "invocations: 1\n");
    assert!(dir.path().join("runtime_info.txt.lck").is_file());
}

#[test]
fn writer_truncates_on_rewrite() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("runtime_info.txt");
    let mut writer = RuntimeInfoWriter::with_interval(&path, Duration::ZERO);

    writer.write("a much longer first payload\n").unwrap();
    writer.write("short\n").unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "short\n");
}

#[test]
fn writer_throttles_within_the_interval() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("runtime_info.txt");
    let mut writer = RuntimeInfoWriter::with_interval(&path, Duration::from_secs(3600));

    assert!(writer.write("first\n").unwrap());
    assert!(!writer.write("second\n").unwrap());
    assert_eq!(fs::read_to_string(&path).unwrap(), "first\n");
}

#[test]
fn reader_returns_content_once_per_change() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("runtime_info.txt");
    let mut writer = RuntimeInfoWriter::with_interval(&path, Duration::ZERO);
    let mut reader = RuntimeInfoReader::new(&path);

    writer.write("v1\n").unwrap();
    assert_eq!(reader.read_if_changed().unwrap().as_deref(), Some("v1\n"));
    // Unchanged since the last observation.
    assert_eq!(reader.read_if_changed().unwrap(), None);
}

#[test]
fn reader_on_missing_file_returns_none() {
    let dir = TempDir::new().unwrap();
    let mut reader = RuntimeInfoReader::new(dir.path().join("absent.txt"));
    assert_eq!(reader.read_if_changed().unwrap(), None);
}
