// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Directory watcher and per-file tail scheduling.
//!
//! One notify watcher covers the log directory; change notifications fan out
//! to per-file read tasks. Per-file processing is serialized with a
//! dirty-flag + processing-flag pair: while one task is reading a file,
//! further notifications only mark it dirty, and the task re-checks size
//! after each pass until it has caught up (the do-while invariant). This
//! yields at-most-one reader per file and exactly-once byte delivery across
//! concurrent notifications.
//!
//! File reads and stats are blocking syscalls; they run on the blocking
//! pool via `spawn_blocking`, never on the async workers.

use crate::error::TailError;
use crate::lines::TimedLine;
use crate::reader::{read_pass, FilePosition};
use mw_core::{Clock, PipelineCounters};
use notify::{Event as NotifyEvent, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// Combat-log file name filter: `WoWCombatLog*.txt`.
pub fn is_combat_log_name(name: &str) -> bool {
    name.starts_with("WoWCombatLog") && name.ends_with(".txt")
}

/// Tailer configuration.
#[derive(Debug, Clone)]
pub struct TailerConfig {
    /// Directory to watch for combat-log files.
    pub log_directory: PathBuf,
    /// Fallback poll interval; inotify can drop events under pressure.
    pub poll_interval: Duration,
    /// Whole-pipeline inactivity reporting threshold.
    pub idle_timeout: Duration,
}

impl TailerConfig {
    pub fn new(log_directory: impl Into<PathBuf>) -> Self {
        Self {
            log_directory: log_directory.into(),
            poll_interval: Duration::from_secs(2),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

/// Events emitted downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailerEvent {
    /// A batch of complete lines from one file, in file order.
    Lines {
        path: PathBuf,
        lines: Vec<TimedLine>,
    },
    /// The active log file changed; downstream snapshots and resets its parser.
    Rotated {
        previous_path: Option<PathBuf>,
        current_path: PathBuf,
        timestamp_ms: u64,
    },
    /// A watched file vanished (rename-out or delete).
    Removed { path: PathBuf },
    /// No lines have arrived for the idle timeout.
    Idle { quiet_for: Duration },
}

#[derive(Debug, Default)]
struct FileState {
    pos: FilePosition,
    /// Set when a notification arrives while a read task holds the file.
    dirty: bool,
    /// At most one read task per file.
    processing: bool,
}

/// Watches one directory of combat logs and streams line batches.
pub struct LogTailer<C: Clock> {
    config: TailerConfig,
    clock: C,
    counters: PipelineCounters,
    states: Arc<Mutex<HashMap<PathBuf, FileState>>>,
    /// File currently feeding the parser; a batch from a different file is a rotation.
    active_file: Arc<Mutex<Option<PathBuf>>>,
    last_activity_ms: Arc<AtomicU64>,
    out: mpsc::Sender<TailerEvent>,
}

/// Running tailer: keeps the notify watcher alive and owns shutdown.
pub struct TailerHandle {
    shutdown_tx: watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
    _watcher: RecommendedWatcher,
}

impl TailerHandle {
    /// Stop watching and wait for in-flight reads to drain.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
    }
}

/// Stat a file off the async workers; `None` when it cannot be statted.
async fn blocking_file_size(path: PathBuf) -> Option<u64> {
    tokio::task::spawn_blocking(move || std::fs::metadata(&path).map(|m| m.len()).ok())
        .await
        .ok()
        .flatten()
}

impl<C: Clock + 'static> LogTailer<C> {
    pub fn new(
        config: TailerConfig,
        clock: C,
        counters: PipelineCounters,
    ) -> (Arc<Self>, mpsc::Receiver<TailerEvent>) {
        let (out, rx) = mpsc::channel(256);
        let last = clock.epoch_ms();
        let tailer = Arc::new(Self {
            config,
            clock,
            counters,
            states: Arc::new(Mutex::new(HashMap::new())),
            active_file: Arc::new(Mutex::new(None)),
            last_activity_ms: Arc::new(AtomicU64::new(last)),
            out,
        });
        (tailer, rx)
    }

    /// Record current sizes of existing combat logs as their baselines.
    /// Historical bytes are never replayed.
    pub async fn baseline_existing(&self) -> Result<(), TailError> {
        let dir = self.config.log_directory.clone();
        let scanned = tokio::task::spawn_blocking(
            move || -> Result<Vec<(PathBuf, u64)>, std::io::Error> {
                let mut found = Vec::new();
                for entry in std::fs::read_dir(&dir)?.flatten() {
                    let path = entry.path();
                    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                        continue;
                    };
                    if !is_combat_log_name(name) {
                        continue;
                    }
                    let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
                    found.push((path, size));
                }
                Ok(found)
            },
        )
        .await
        .unwrap_or_else(|e| Err(std::io::Error::other(e)));

        let found = scanned.map_err(|source| TailError::Io {
            path: self.config.log_directory.clone(),
            source,
        })?;

        let mut states = self.states.lock();
        for (path, size) in found {
            let state = states.entry(path.clone()).or_default();
            state.pos.byte_position = size;
            debug!(path = %path.display(), size, "baselined existing log");
        }
        Ok(())
    }

    /// Start the notify watcher and the driver loop.
    pub fn spawn(self: &Arc<Self>) -> Result<TailerHandle, TailError> {
        let (fs_tx, fs_rx) = mpsc::channel::<(EventKind, PathBuf)>(256);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<NotifyEvent>| {
            if let Ok(event) = res {
                for path in event.paths {
                    // Full channel means the driver is already behind; the
                    // poll fallback will catch anything dropped here.
                    let _ = fs_tx.try_send((event.kind.clone(), path));
                }
            }
        })
        .map_err(|source| TailError::Watch {
            path: self.config.log_directory.clone(),
            source,
        })?;

        watcher
            .watch(&self.config.log_directory, RecursiveMode::NonRecursive)
            .map_err(|source| TailError::Watch {
                path: self.config.log_directory.clone(),
                source,
            })?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let driver = Arc::clone(self);
        let task = tokio::spawn(async move {
            driver.run(fs_rx, shutdown_rx).await;
        });

        info!(dir = %self.config.log_directory.display(), "log tailer started");
        Ok(TailerHandle {
            shutdown_tx,
            task,
            _watcher: watcher,
        })
    }

    async fn run(
        self: Arc<Self>,
        mut fs_rx: mpsc::Receiver<(EventKind, PathBuf)>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut poll = tokio::time::interval(self.config.poll_interval);
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut idle_check = tokio::time::interval(Duration::from_secs(60));
        idle_check.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                maybe = fs_rx.recv() => {
                    match maybe {
                        Some((kind, path)) => self.on_fs_event(kind, &path).await,
                        None => break,
                    }
                }
                _ = poll.tick() => self.poll_all().await,
                _ = idle_check.tick() => self.check_idle().await,
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("log tailer driver stopped");
    }

    /// Route one file-system notification.
    pub async fn on_fs_event(self: &Arc<Self>, kind: EventKind, path: &Path) {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return;
        };
        if !is_combat_log_name(name) {
            return;
        }

        match kind {
            EventKind::Remove(_) => self.on_removed(path).await,
            EventKind::Create(_) => self.on_created(path).await,
            _ => self.schedule(path).await,
        }
    }

    /// New file: baseline at its current size, read nothing yet.
    async fn on_created(self: &Arc<Self>, path: &Path) {
        let size = blocking_file_size(path.to_path_buf()).await.unwrap_or(0);
        let mut states = self.states.lock();
        let state = states.entry(path.to_path_buf()).or_default();
        state.pos.byte_position = size;
        info!(path = %path.display(), size, "combat log appeared");
    }

    async fn on_removed(self: &Arc<Self>, path: &Path) {
        let existed = self.states.lock().remove(path).is_some();
        if !existed {
            return;
        }
        {
            let mut active = self.active_file.lock();
            if active.as_deref() == Some(path) {
                *active = None;
            }
        }
        info!(path = %path.display(), "combat log removed, dropping tail state");
        let _ = self
            .out
            .send(TailerEvent::Removed {
                path: path.to_path_buf(),
            })
            .await;
    }

    /// Kick (or mark dirty) the read task for one file.
    pub async fn schedule(self: &Arc<Self>, path: &Path) {
        let known = {
            let mut states = self.states.lock();
            match states.get_mut(path) {
                Some(state) if state.processing => {
                    state.dirty = true;
                    return;
                }
                Some(state) => {
                    state.processing = true;
                    true
                }
                None => false,
            }
        };
        if !known {
            // Missed creation (watcher race): learn the file now without
            // replaying its history.
            self.on_created(path).await;
            return;
        }

        let this = Arc::clone(self);
        let path = path.to_path_buf();
        tokio::spawn(async move {
            this.process_file(&path).await;
        });
    }

    /// Drain one file until its size equals the processed position.
    async fn process_file(self: &Arc<Self>, path: &Path) {
        // The processing flag makes this task the position's sole owner.
        let mut pos = match self.states.lock().get_mut(path) {
            Some(state) => std::mem::take(&mut state.pos),
            None => return,
        };
        let path_buf = path.to_path_buf();

        loop {
            let pass_started = self.clock.epoch_ms();
            let blocking_path = path_buf.clone();
            let blocking_pos = pos;
            let join = tokio::task::spawn_blocking(move || {
                let mut pos = blocking_pos;
                let outcome = read_pass(&blocking_path, &mut pos, pass_started);
                (outcome, pos)
            })
            .await;
            let outcome = match join {
                Ok((outcome, returned)) => {
                    pos = returned;
                    outcome
                }
                Err(e) => {
                    // The read task died with the position; drop the file
                    // state so it re-baselines without replaying.
                    warn!(path = %path.display(), error = %e, "tail read task failed");
                    self.counters.record_error();
                    self.states.lock().remove(path);
                    return;
                }
            };

            match outcome {
                Ok(outcome) => {
                    if !outcome.lines.is_empty() {
                        self.counters.record_lines(outcome.lines.len() as u64);
                        self.counters.record_processing_at(pass_started);
                        self.last_activity_ms.store(pass_started, Ordering::Relaxed);
                        self.announce_rotation(path, pass_started).await;
                        let _ = self
                            .out
                            .send(TailerEvent::Lines {
                                path: path.to_path_buf(),
                                lines: outcome.lines,
                            })
                            .await;
                    }
                }
                Err(e) if e.is_not_found() => {
                    self.on_removed(path).await;
                    return;
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "tail pass failed");
                    self.counters.record_error();
                    break;
                }
            }

            // Do-while recheck: a notification may have landed mid-read, or
            // the file may have grown since the pass statted it.
            let size_now = blocking_file_size(path_buf.clone()).await;
            let again = {
                let mut states = self.states.lock();
                match states.get_mut(path) {
                    Some(state) if state.dirty => {
                        state.dirty = false;
                        true
                    }
                    Some(_) => size_now.map(|s| s > pos.byte_position).unwrap_or(false),
                    // Removed while we were reading.
                    None => return,
                }
            };
            if !again {
                break;
            }
        }

        let mut states = self.states.lock();
        if let Some(state) = states.get_mut(path) {
            state.pos = pos;
            state.processing = false;
        }
    }

    /// Emit a rotation signal when a batch comes from a new file.
    async fn announce_rotation(self: &Arc<Self>, path: &Path, now_ms: u64) {
        let previous = {
            let mut active = self.active_file.lock();
            if active.as_deref() == Some(path) {
                return;
            }
            active.replace(path.to_path_buf())
        };
        if previous.is_some() {
            info!(
                previous = ?previous.as_ref().map(|p| p.display().to_string()),
                current = %path.display(),
                "combat log rotated"
            );
        }
        let _ = self
            .out
            .send(TailerEvent::Rotated {
                previous_path: previous,
                current_path: path.to_path_buf(),
                timestamp_ms: now_ms,
            })
            .await;
    }

    /// Fallback sweep for appends whose notifications were dropped.
    async fn poll_all(self: &Arc<Self>) {
        let candidates: Vec<(PathBuf, u64)> = {
            let states = self.states.lock();
            states
                .iter()
                .filter(|(_, s)| !s.processing)
                .map(|(p, s)| (p.clone(), s.pos.byte_position))
                .collect()
        };
        if candidates.is_empty() {
            return;
        }

        let grown: Vec<PathBuf> = tokio::task::spawn_blocking(move || {
            candidates
                .into_iter()
                .filter(|(path, position)| {
                    std::fs::metadata(path)
                        .map(|m| m.len() > *position)
                        .unwrap_or(false)
                })
                .map(|(path, _)| path)
                .collect()
        })
        .await
        .unwrap_or_default();

        for path in grown {
            self.schedule(&path).await;
        }
    }

    async fn check_idle(self: &Arc<Self>) {
        let last = self.last_activity_ms.load(Ordering::Relaxed);
        let now = self.clock.epoch_ms();
        let quiet = Duration::from_millis(now.saturating_sub(last));
        if quiet >= self.config.idle_timeout {
            // Rearm so the report fires once per quiet period.
            self.last_activity_ms.store(now, Ordering::Relaxed);
            let _ = self.out.send(TailerEvent::Idle { quiet_for: quiet }).await;
        }
    }

    /// Snapshot of the tailer's observability counters.
    pub fn counters(&self) -> &PipelineCounters {
        &self.counters
    }
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
