// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The lifecycle authority.
//!
//! Single source of truth for session state. Events for one session are
//! processed strictly in arrival order on that session's queue worker;
//! different sessions interleave freely. Errors are caught at the queue
//! boundary, appended to the session's error log, and never escape to the
//! pipeline.

mod validate;

pub use validate::{validate_completeness, ValidationFailure};

use crate::recorder::Recorder;
use mw_core::{
    Clock, EarlyEndTrigger, EnrichmentPhase, Event, MatchCompletionStatus, MatchHash,
    MatchMetadata, Session, SessionId, SessionState, SessionTransitionError, StoredMatchMetadata,
    UploadStatus,
};
use mw_storage::{MetadataStore, StoreError};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transition(#[from] SessionTransitionError),
}

/// Per-session queue depth; a session never has more than a handful of
/// in-flight lifecycle events.
const SESSION_QUEUE_DEPTH: usize = 32;

/// Triggers that describe how a buffer ended rather than what the match
/// contained. Only these are eligible for the kill-aware reclassification;
/// a trigger the validator already resolved (wrong roster, no deaths,
/// instant match) is final.
fn is_ambiguous_end(trigger: EarlyEndTrigger) -> bool {
    matches!(
        trigger,
        EarlyEndTrigger::DataTimeout
            | EarlyEndTrigger::ZoneChange
            | EarlyEndTrigger::NewMatchStart
            | EarlyEndTrigger::ForceEnd
            | EarlyEndTrigger::LogFileChange
            | EarlyEndTrigger::ProcessStop
            | EarlyEndTrigger::SafetyTimeout
    )
}

struct Authority<C: Clock, R: Recorder> {
    sessions: Mutex<HashMap<SessionId, Session>>,
    session_errors: Mutex<HashMap<SessionId, Vec<String>>>,
    store: Arc<MetadataStore<C>>,
    recorder: Arc<R>,
    clock: C,
    /// Chunk files live here; hard deletes remove them alongside metadata.
    chunk_directory: PathBuf,
    events: mpsc::Sender<Event>,
}

/// Public entry: routes events onto per-session workers.
pub struct Lifecycle<C: Clock, R: Recorder> {
    authority: Arc<Authority<C, R>>,
    senders: Mutex<HashMap<SessionId, mpsc::Sender<Event>>>,
    workers: Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl<C: Clock + 'static, R: Recorder + 'static> Lifecycle<C, R> {
    pub fn new(
        store: Arc<MetadataStore<C>>,
        recorder: Arc<R>,
        clock: C,
        chunk_directory: PathBuf,
        events: mpsc::Sender<Event>,
    ) -> Self {
        Self {
            authority: Arc::new(Authority {
                sessions: Mutex::new(HashMap::new()),
                session_errors: Mutex::new(HashMap::new()),
                store,
                recorder,
                clock,
                chunk_directory,
                events,
            }),
            senders: Mutex::new(HashMap::new()),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Enqueue a lifecycle event for its session's worker.
    ///
    /// Events without a session id are not lifecycle concerns and are
    /// dropped here.
    pub async fn submit(&self, event: Event) {
        let Some(session_id) = event.session_id().cloned() else {
            return;
        };

        // One worker per session for the lifetime of the pipeline. Late
        // events after a terminal still land on the same queue, where the
        // monotonic state machine rejects them in order.
        let tx = {
            let mut senders = self.senders.lock();
            match senders.get(&session_id) {
                Some(tx) => tx.clone(),
                None => {
                    let (tx, mut rx) = mpsc::channel::<Event>(SESSION_QUEUE_DEPTH);
                    let authority = Arc::clone(&self.authority);
                    let worker = tokio::spawn(async move {
                        while let Some(event) = rx.recv().await {
                            authority.handle(event).await;
                        }
                    });
                    self.workers.lock().push(worker);
                    senders.insert(session_id.clone(), tx.clone());
                    tx
                }
            }
        };

        if tx.send(event).await.is_err() {
            warn!(session_id = %session_id, "lifecycle worker gone, event dropped");
        }
    }

    /// Drop all queues and wait for in-flight handlers to finish.
    pub async fn drain(&self) {
        self.senders.lock().clear();
        let workers: Vec<_> = std::mem::take(&mut *self.workers.lock());
        for worker in workers {
            let _ = worker.await;
        }
    }

    /// Lifecycle state of a session, if tracked.
    pub fn session_state(&self, session_id: &SessionId) -> Option<SessionState> {
        self.authority.sessions.lock().get(session_id).map(|s| s.state)
    }

    /// Whether a duplicate start was flagged for the session.
    pub fn duplicate_start_detected(&self, session_id: &SessionId) -> bool {
        self.authority
            .sessions
            .lock()
            .get(session_id)
            .map(|s| s.duplicate_start_detected)
            .unwrap_or(false)
    }

    /// Errors recorded against a session at the queue boundary.
    pub fn session_errors(&self, session_id: &SessionId) -> Vec<String> {
        self.authority
            .session_errors
            .lock()
            .get(session_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl<C: Clock, R: Recorder> Authority<C, R> {
    async fn handle(&self, event: Event) {
        let session_id = event.session_id().cloned();
        let result = match event {
            Event::MatchStarted {
                session_id,
                timestamp,
                zone_id,
                bracket,
                season,
                is_ranked,
            } => {
                self.handle_match_started(session_id, timestamp, zone_id, bracket, season, is_ranked)
                    .await
            }
            Event::MatchEnded {
                session_id,
                timestamp,
                metadata,
            } => self.handle_match_ended(session_id, timestamp, metadata).await,
            Event::MatchEndedIncomplete {
                session_id,
                trigger,
                lines,
                timestamp,
                metadata,
            } => {
                self.handle_match_ended_incomplete(session_id, trigger, lines, timestamp, metadata, None)
                    .await
            }
            other => {
                debug!(event = ?other, "lifecycle ignoring event");
                Ok(())
            }
        };

        if let Err(e) = result {
            // Queue boundary: the error stays with this session.
            error!(error = %e, "lifecycle handler failed");
            if let Some(session_id) = session_id {
                self.session_errors
                    .lock()
                    .entry(session_id)
                    .or_default()
                    .push(e.to_string());
            }
        }
    }

    async fn handle_match_started(
        &self,
        session_id: SessionId,
        timestamp: u64,
        zone_id: u32,
        bracket: mw_core::Bracket,
        season: u32,
        is_ranked: bool,
    ) -> Result<(), LifecycleError> {
        {
            let mut sessions = self.sessions.lock();
            if let Some(session) = sessions.get_mut(&session_id) {
                if session.state == SessionState::Active {
                    session.duplicate_start_detected = true;
                    warn!(session_id = %session_id, "duplicate match start flagged");
                } else {
                    warn!(session_id = %session_id, state = %session.state, "start for terminal session ignored");
                }
                return Ok(());
            }
            sessions.insert(session_id.clone(), Session::new(session_id.clone()));
        }

        info!(session_id = %session_id, %bracket, zone_id, "match lifecycle started");
        let metadata = MatchMetadata::new(timestamp, zone_id, bracket, season, is_ranked);
        let record =
            StoredMatchMetadata::initial(session_id.clone(), metadata, self.clock.utc_now());
        if let Err(e) = self.store.save(&record).await {
            // The end-of-match path handles the missing record; the match
            // itself keeps going.
            self.log_store_error(&session_id, "initial save", &e);
        }

        if let Err(e) = self.recorder.start_recording(&session_id).await {
            warn!(session_id = %session_id, error = %e, "recorder start failed");
        }

        self.emit(Event::LifecycleStarted { session_id }).await;
        Ok(())
    }

    async fn handle_match_ended(
        &self,
        session_id: SessionId,
        timestamp: u64,
        metadata: MatchMetadata,
    ) -> Result<(), LifecycleError> {
        let stored = match self.store.load_by_session(&session_id).await {
            Ok(stored) => stored,
            Err(e) => {
                self.log_store_error(&session_id, "load at end", &e);
                None
            }
        };
        let Some(stored) = stored else {
            let reason = "metadata record missing at match end (METADATA_MISSING)".to_string();
            return self
                .preserve_incomplete(session_id, None, Some(metadata), reason)
                .await;
        };

        let duplicate_start = self
            .sessions
            .lock()
            .get(&session_id)
            .map(|s| s.duplicate_start_detected)
            .unwrap_or(false);

        match validate_completeness(&metadata, duplicate_start) {
            Ok(()) => self.complete(session_id, timestamp, metadata, stored).await,
            Err(ValidationFailure::Hard { trigger, reason }) => {
                info!(session_id = %session_id, %trigger, reason, "match hard-invalidated");
                // Same path as a chunker-emitted incomplete.
                self.handle_match_ended_incomplete(
                    session_id,
                    trigger,
                    0,
                    timestamp,
                    Some(metadata),
                    Some(reason),
                )
                .await
            }
            Err(ValidationFailure::Soft { reason }) => {
                info!(session_id = %session_id, reason, "match failed validation, preserving");
                self.preserve_incomplete(session_id, None, Some(metadata), reason)
                    .await
            }
        }
    }

    async fn complete(
        &self,
        session_id: SessionId,
        _timestamp: u64,
        metadata: MatchMetadata,
        mut stored: StoredMatchMetadata,
    ) -> Result<(), LifecycleError> {
        let match_hash = MatchHash::compute(metadata.timestamp, &metadata.player_ids());
        self.transition(&session_id, SessionState::Complete, None)?;

        stored.match_data = metadata;
        stored.match_hash = Some(match_hash.clone());
        stored.match_completion_status = MatchCompletionStatus::Complete;
        stored.enrichment_phase = EnrichmentPhase::Finalized;
        stored.last_updated_at = self.clock.utc_now();
        self.store.save(&stored).await?;

        if let Err(e) = self.recorder.stop_recording(&session_id).await {
            warn!(session_id = %session_id, error = %e, "recorder stop failed");
        }

        info!(session_id = %session_id, hash = %match_hash, "match complete");
        self.emit(Event::LifecycleCompleted {
            session_id,
            match_hash,
        })
        .await;

        if let Err(e) = self.store.cleanup_old_matches().await {
            warn!(error = %e, "retention sweep failed");
        }
        Ok(())
    }

    async fn handle_match_ended_incomplete(
        &self,
        session_id: SessionId,
        trigger: EarlyEndTrigger,
        _lines: usize,
        _timestamp: u64,
        metadata: Option<MatchMetadata>,
        reason: Option<String>,
    ) -> Result<(), LifecycleError> {
        // Kill-aware classification: a 2v2/3v3 buffer that never saw a
        // player death is worthless however its end was detected. Applies
        // only to ambiguous end conditions; a structural verdict like
        // InsufficientCombatants carries through untouched.
        let (effective, reason) = match metadata.as_ref() {
            Some(md)
                if is_ambiguous_end(trigger)
                    && !md.bracket.is_shuffle()
                    && md.player_death_count == 0 =>
            {
                (
                    EarlyEndTrigger::NoPlayerDeath,
                    "no player death observed between match start and end".to_string(),
                )
            }
            _ => (trigger, reason.unwrap_or_else(|| trigger.to_string())),
        };
        if effective != trigger {
            debug!(session_id = %session_id, incoming = %trigger, %effective, "trigger overridden");
        }

        if effective.is_hard_delete() {
            self.hard_delete(session_id, effective, reason).await
        } else {
            self.preserve_incomplete(session_id, Some(effective), metadata, reason)
                .await
        }
    }

    async fn hard_delete(
        &self,
        session_id: SessionId,
        trigger: EarlyEndTrigger,
        reason: String,
    ) -> Result<(), LifecycleError> {
        self.transition(&session_id, SessionState::Incomplete, Some(reason.clone()))?;

        if let Err(e) = self.recorder.stop_recording(&session_id).await {
            warn!(session_id = %session_id, error = %e, "recorder stop failed");
        }

        match self.store.delete_by_session(&session_id).await {
            Ok(true) => debug!(session_id = %session_id, "metadata hard-deleted"),
            Ok(false) => debug!(session_id = %session_id, "no metadata to hard-delete"),
            Err(e) => self.log_store_error(&session_id, "hard delete", &e),
        }

        // A chunk may already exist when validation invalidated a finalized
        // match; it goes too.
        let chunk_path = self.chunk_directory.join(format!("{session_id}.txt"));
        match tokio::fs::remove_file(&chunk_path).await {
            Ok(()) => debug!(path = %chunk_path.display(), "chunk file removed"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %chunk_path.display(), error = %e, "chunk delete failed"),
        }

        info!(session_id = %session_id, %trigger, "match discarded");
        self.emit(Event::LifecycleIncomplete {
            session_id,
            trigger: Some(trigger),
            reason,
            preserved: false,
        })
        .await;
        Ok(())
    }

    async fn preserve_incomplete(
        &self,
        session_id: SessionId,
        trigger: Option<EarlyEndTrigger>,
        metadata: Option<MatchMetadata>,
        reason: String,
    ) -> Result<(), LifecycleError> {
        self.transition(&session_id, SessionState::Incomplete, Some(reason.clone()))?;

        if let Err(e) = self.recorder.stop_recording(&session_id).await {
            warn!(session_id = %session_id, error = %e, "recorder stop failed");
        }

        let existing = match self.store.load_by_session(&session_id).await {
            Ok(existing) => existing,
            Err(e) => {
                self.log_store_error(&session_id, "load for incomplete", &e);
                None
            }
        };

        let mut record = match (existing, metadata) {
            (Some(mut record), Some(snapshot)) => {
                record.match_data = snapshot;
                record
            }
            (Some(record), None) => record,
            (None, Some(snapshot)) => StoredMatchMetadata::initial(
                session_id.clone(),
                snapshot,
                self.clock.utc_now(),
            ),
            (None, None) => {
                // Nothing to preserve: no record and no snapshot.
                warn!(session_id = %session_id, "incomplete with no metadata at all");
                self.emit(Event::LifecycleIncomplete {
                    session_id,
                    trigger,
                    reason,
                    preserved: false,
                })
                .await;
                return Ok(());
            }
        };

        record.match_completion_status = MatchCompletionStatus::Incomplete;
        record.upload_status = UploadStatus::Incomplete;
        record.match_hash = None;
        record.error_message = Some(reason.clone());
        record.enrichment_phase = if record.match_data.players.is_empty() {
            EnrichmentPhase::Initial
        } else {
            EnrichmentPhase::CombatantsAdded
        };
        record.last_updated_at = self.clock.utc_now();

        if let Err(e) = self.store.save(&record).await {
            self.log_store_error(&session_id, "incomplete save", &e);
        }

        info!(session_id = %session_id, reason, "match preserved as incomplete");
        self.emit(Event::LifecycleIncomplete {
            session_id,
            trigger,
            reason,
            preserved: true,
        })
        .await;
        Ok(())
    }

    fn transition(
        &self,
        session_id: &SessionId,
        to: SessionState,
        reason: Option<String>,
    ) -> Result<(), SessionTransitionError> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .entry(session_id.clone())
            .or_insert_with(|| Session::new(session_id.clone()));
        session.transition(to, reason)
    }

    async fn emit(&self, event: Event) {
        if self.events.send(event).await.is_err() {
            debug!("lifecycle event sink closed");
        }
    }

    fn log_store_error(&self, session_id: &SessionId, op: &str, e: &StoreError) {
        if e.is_transient() {
            warn!(session_id = %session_id, op, error = %e, "transient store error");
        } else {
            error!(session_id = %session_id, op, error = %e, "store error");
            self.session_errors
                .lock()
                .entry(session_id.clone())
                .or_default()
                .push(format!("{op}: {e}"));
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
