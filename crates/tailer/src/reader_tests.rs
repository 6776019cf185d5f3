// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::fs::OpenOptions;
use std::io::Write;
use tempfile::TempDir;

const NOW: u64 = 1_000_000;

fn append(path: &Path, data: &str) {
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    f.write_all(data.as_bytes()).unwrap();
}

#[test]
fn reads_appended_lines_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("WoWCombatLog-051725.txt");
    let mut pos = FilePosition::default();

    append(&path, "5/17/2025 21:31:04.360  SPELL_CAST_SUCCESS,a\n");
    let out = read_pass(&path, &mut pos, NOW).unwrap();
    assert_eq!(out.lines.len(), 1);
    assert_eq!(out.lines[0].raw, "5/17/2025 21:31:04.360  SPELL_CAST_SUCCESS,a");

    // Nothing new: second pass is empty.
    let out = read_pass(&path, &mut pos, NOW).unwrap();
    assert!(out.lines.is_empty());
}

#[test]
fn fragment_spans_passes() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("WoWCombatLog.txt");
    let mut pos = FilePosition::default();

    append(&path, "5/17/2025 21:31:04.360  SPELL_CAST_SUC");
    let out = read_pass(&path, &mut pos, NOW).unwrap();
    assert!(out.lines.is_empty());

    append(&path, "CESS,a\n");
    let out = read_pass(&path, &mut pos, NOW).unwrap();
    assert_eq!(out.lines.len(), 1);
    assert_eq!(out.lines[0].raw, "5/17/2025 21:31:04.360  SPELL_CAST_SUCCESS,a");
}

#[test]
fn unparseable_timestamp_gets_fallback() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("WoWCombatLog.txt");
    let mut pos = FilePosition::default();

    append(&path, "garbage line without timestamp\n");
    let out = read_pass(&path, &mut pos, NOW).unwrap();
    assert_eq!(out.lines[0].timestamp_ms, NOW);
}

#[test]
fn parsed_timestamp_wins_over_fallback() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("WoWCombatLog.txt");
    let mut pos = FilePosition::default();

    append(&path, "5/17/2025 21:31:04.360  EVENT,x\n");
    let out = read_pass(&path, &mut pos, NOW).unwrap();
    assert_ne!(out.lines[0].timestamp_ms, NOW);
}

#[test]
fn truncation_rebases_without_replay() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("WoWCombatLog.txt");
    let mut pos = FilePosition::default();

    append(&path, "line one\nline two\n");
    read_pass(&path, &mut pos, NOW).unwrap();

    std::fs::write(&path, "short\n").unwrap();
    let out = read_pass(&path, &mut pos, NOW).unwrap();
    assert!(out.lines.is_empty());
    assert_eq!(pos.byte_position, 6);
}

#[test]
fn missing_file_is_not_found() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("WoWCombatLog.txt");
    let mut pos = FilePosition::default();

    let err = read_pass(&path, &mut pos, NOW).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn baseline_skips_history() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("WoWCombatLog.txt");

    append(&path, "historical line\n");
    let mut pos = FilePosition {
        byte_position: std::fs::metadata(&path).unwrap().len(),
        ..Default::default()
    };

    append(&path, "new line\n");
    let out = read_pass(&path, &mut pos, NOW).unwrap();
    assert_eq!(out.lines.len(), 1);
    assert_eq!(out.lines[0].raw, "new line");
}
