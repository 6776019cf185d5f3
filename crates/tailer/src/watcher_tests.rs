// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Driver-level tests exercising scheduling, rotation, and idle reporting
//! without a live notify watcher: events are injected via `on_fs_event`.

use super::*;
use mw_core::FakeClock;
use notify::event::{CreateKind, ModifyKind, RemoveKind};
use std::fs::OpenOptions;
use std::io::Write;
use tempfile::TempDir;

fn append(path: &Path, data: &str) {
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    f.write_all(data.as_bytes()).unwrap();
}

fn setup(dir: &TempDir) -> (Arc<LogTailer<FakeClock>>, mpsc::Receiver<TailerEvent>, FakeClock) {
    let clock = FakeClock::new();
    let config = TailerConfig::new(dir.path());
    let (tailer, rx) = LogTailer::new(config, clock.clone(), PipelineCounters::new());
    (tailer, rx, clock)
}

async fn drain_lines(rx: &mut mpsc::Receiver<TailerEvent>) -> Vec<TimedLine> {
    let mut lines = Vec::new();
    while let Ok(event) = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await {
        match event {
            Some(TailerEvent::Lines { lines: batch, .. }) => {
                lines.extend(batch);
                if rx.is_empty() {
                    break;
                }
            }
            Some(_) => continue,
            None => break,
        }
    }
    lines
}

#[test]
fn name_filter() {
    assert!(is_combat_log_name("WoWCombatLog-051725_213104.txt"));
    assert!(is_combat_log_name("WoWCombatLog.txt"));
    assert!(!is_combat_log_name("WoWCombatLog.txt.bak"));
    assert!(!is_combat_log_name("Errors.txt"));
    assert!(!is_combat_log_name("wowcombatlog.txt"));
}

#[tokio::test]
async fn modify_event_delivers_new_lines() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("WoWCombatLog.txt");
    let (tailer, mut rx, _clock) = setup(&dir);

    std::fs::write(&path, "").unwrap();
    tailer.on_fs_event(EventKind::Create(CreateKind::File), &path).await;

    append(&path, "5/17/2025 21:31:04.360  SPELL_CAST_SUCCESS,a\n");
    tailer.on_fs_event(EventKind::Modify(ModifyKind::Any), &path).await;

    let lines = drain_lines(&mut rx).await;
    assert_eq!(lines.len(), 1);
    assert!(lines[0].raw.contains("SPELL_CAST_SUCCESS"));
}

#[tokio::test]
async fn creation_baselines_at_current_size() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("WoWCombatLog.txt");
    let (tailer, mut rx, _clock) = setup(&dir);

    // Content present before we learn about the file is history.
    std::fs::write(&path, "old line\n").unwrap();
    tailer.on_fs_event(EventKind::Create(CreateKind::File), &path).await;

    append(&path, "new line\n");
    tailer.on_fs_event(EventKind::Modify(ModifyKind::Any), &path).await;

    let lines = drain_lines(&mut rx).await;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].raw, "new line");
}

#[tokio::test]
async fn baseline_existing_skips_history() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("WoWCombatLog.txt");

    std::fs::write(&path, "historical\n").unwrap();
    let (tailer, mut rx, _clock) = setup(&dir);
    tailer.baseline_existing().await.unwrap();

    append(&path, "fresh\n");
    tailer.on_fs_event(EventKind::Modify(ModifyKind::Any), &path).await;

    let lines = drain_lines(&mut rx).await;
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].raw, "fresh");
}

#[tokio::test]
async fn non_matching_names_are_ignored() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("Errors.txt");
    let (tailer, mut rx, _clock) = setup(&dir);

    std::fs::write(&path, "noise\n").unwrap();
    tailer.on_fs_event(EventKind::Modify(ModifyKind::Any), &path).await;

    let lines = drain_lines(&mut rx).await;
    assert!(lines.is_empty());
}

#[tokio::test]
async fn removal_drops_state_and_notifies() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("WoWCombatLog.txt");
    let (tailer, mut rx, _clock) = setup(&dir);

    std::fs::write(&path, "").unwrap();
    tailer.on_fs_event(EventKind::Create(CreateKind::File), &path).await;
    tailer.on_fs_event(EventKind::Remove(RemoveKind::File), &path).await;

    match tokio::time::timeout(Duration::from_millis(500), rx.recv()).await {
        Ok(Some(TailerEvent::Removed { path: removed })) => assert_eq!(removed, path),
        other => panic!("expected Removed, got {other:?}"),
    }
}

#[tokio::test]
async fn second_file_announces_rotation() {
    let dir = TempDir::new().unwrap();
    let first = dir.path().join("WoWCombatLog-1.txt");
    let second = dir.path().join("WoWCombatLog-2.txt");
    let (tailer, mut rx, _clock) = setup(&dir);

    // Collect rotation events up to each file's line batch so the two
    // files' read tasks cannot interleave.
    async fn rotations_until_lines(
        rx: &mut mpsc::Receiver<TailerEvent>,
    ) -> Vec<(Option<PathBuf>, PathBuf)> {
        let mut rotations = Vec::new();
        while let Ok(Some(event)) = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await {
            match event {
                TailerEvent::Rotated { previous_path, current_path, .. } => {
                    rotations.push((previous_path, current_path));
                }
                TailerEvent::Lines { .. } => break,
                _ => {}
            }
        }
        rotations
    }

    std::fs::write(&first, "").unwrap();
    tailer.on_fs_event(EventKind::Create(CreateKind::File), &first).await;
    append(&first, "line a\n");
    tailer.on_fs_event(EventKind::Modify(ModifyKind::Any), &first).await;
    let first_rotations = rotations_until_lines(&mut rx).await;

    std::fs::write(&second, "").unwrap();
    tailer.on_fs_event(EventKind::Create(CreateKind::File), &second).await;
    append(&second, "line b\n");
    tailer.on_fs_event(EventKind::Modify(ModifyKind::Any), &second).await;
    let second_rotations = rotations_until_lines(&mut rx).await;

    // First attach has no previous; the switch to the second file names it.
    assert_eq!(first_rotations, vec![(None, first.clone())]);
    assert_eq!(second_rotations, vec![(Some(first), second)]);
}

#[tokio::test]
async fn counters_track_lines() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("WoWCombatLog.txt");
    let (tailer, mut rx, _clock) = setup(&dir);

    std::fs::write(&path, "").unwrap();
    tailer.on_fs_event(EventKind::Create(CreateKind::File), &path).await;
    append(&path, "one\ntwo\nthree\n");
    tailer.on_fs_event(EventKind::Modify(ModifyKind::Any), &path).await;

    let lines = drain_lines(&mut rx).await;
    assert_eq!(lines.len(), 3);
    assert_eq!(tailer.counters().snapshot().lines_processed, 3);
}
