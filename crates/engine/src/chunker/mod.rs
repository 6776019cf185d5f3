// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Raw-line buffering and chunk extraction.
//!
//! The chunker accumulates the raw lines of each active match between start
//! and terminal, bounds them, and produces exactly one of two outcomes per
//! buffer: a finalized chunk file or an incomplete notification. A proper
//! end is recorded as *pending* and finalized on the chunk boundary that
//! crosses it, so every line up to and around the end event is captured.

mod buffer;
mod paths;
mod policy;
mod writer;

pub use buffer::{MatchBuffer, PendingEnd};
pub use paths::validate_output_directory;
pub use policy::{ExtractionPolicy, NeverExtract};
pub use writer::write_chunk;

use mw_core::{Clock, EarlyEndTrigger, Event, MatchMetadata, SessionId};
use mw_tailer::TimedLine;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Header marker tokens; the first line carrying all three is kept verbatim
/// and prepended to every chunk written afterwards.
const HEADER_TOKENS: [&str; 3] = ["COMBAT_LOG_VERSION", "BUILD_VERSION", "PROJECT_ID"];

/// Chunker errors.
#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid chunk output directory {path}: {reason}")]
    InvalidOutputDir { path: PathBuf, reason: String },
}

/// Chunker configuration.
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    pub output_directory: PathBuf,
    /// When non-empty, the output directory must resolve beneath one of these.
    pub allowed_output_roots: Vec<PathBuf>,
    /// Below this on a proper end, the match is a garbage artifact.
    pub min_match_lines: usize,
    /// Buffer ceiling; reached, the buffer is forced closed.
    pub max_match_lines: usize,
    pub inactivity_timeout: Duration,
}

impl ChunkerConfig {
    pub fn new(output_directory: impl Into<PathBuf>) -> Self {
        Self {
            output_directory: output_directory.into(),
            allowed_output_roots: Vec::new(),
            min_match_lines: 20,
            max_match_lines: 200_000,
            inactivity_timeout: Duration::from_secs(30 * 60),
        }
    }
}

/// Buffers raw lines per active match and extracts chunk files.
pub struct MatchChunker<C: Clock> {
    clock: C,
    output_directory: PathBuf,
    min_match_lines: usize,
    max_match_lines: usize,
    inactivity_timeout: Duration,
    policy: Box<dyn ExtractionPolicy>,
    buffers: HashMap<SessionId, MatchBuffer>,
    header: Option<String>,
}

impl<C: Clock> MatchChunker<C> {
    /// Validates the output directory before anything can be written.
    pub fn new(config: ChunkerConfig, clock: C) -> Result<Self, ChunkError> {
        let output_directory =
            validate_output_directory(&config.output_directory, &config.allowed_output_roots)?;
        Ok(Self {
            clock,
            output_directory,
            min_match_lines: config.min_match_lines,
            max_match_lines: config.max_match_lines,
            inactivity_timeout: config.inactivity_timeout,
            policy: Box::new(NeverExtract),
            buffers: HashMap::new(),
            header: None,
        })
    }

    /// Replace the early-end extraction policy.
    pub fn with_policy(mut self, policy: Box<dyn ExtractionPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn active_count(&self) -> usize {
        self.buffers.len()
    }

    pub fn captured_header(&self) -> Option<&str> {
        self.header.as_deref()
    }

    /// A match started: open its buffer.
    pub async fn on_match_started(
        &mut self,
        session_id: &SessionId,
        start_ms: u64,
        zone_id: u32,
    ) -> Vec<Event> {
        if session_id.as_str().trim().is_empty() {
            warn!("rejecting match start with blank session id");
            return Vec::new();
        }
        if self.buffers.contains_key(session_id) {
            // Duplicate start: survives at the parser/lifecycle layer, the
            // existing buffer keeps accumulating.
            debug!(session_id = %session_id, "duplicate start, keeping buffer");
            return Vec::new();
        }

        // Any other open buffer is an orphan from a restart without a
        // proper end; close it before tracking the new match.
        let stale: Vec<SessionId> = self.buffers.keys().cloned().collect();
        let mut events = Vec::new();
        for id in stale {
            events.extend(self.early_end(&id, EarlyEndTrigger::NewMatchStart, None).await);
        }

        let deadline = self.clock.now() + self.inactivity_timeout;
        self.buffers.insert(
            session_id.clone(),
            MatchBuffer::new(session_id.clone(), start_ms, zone_id, deadline),
        );
        events
    }

    /// Append a chunk of raw lines to every active buffer, then finalize
    /// any buffer whose proper end this chunk crossed.
    pub async fn on_lines(&mut self, lines: &[TimedLine]) -> Vec<Event> {
        if self.header.is_none() {
            if let Some(header) = lines
                .iter()
                .find(|l| HEADER_TOKENS.iter().all(|t| l.raw.contains(t)))
            {
                self.header = Some(header.raw.clone());
            }
        }

        let keys: Vec<SessionId> = self.buffers.keys().cloned().collect();
        let mut events = Vec::new();
        for key in keys {
            events.extend(self.append_to_buffer(&key, lines).await);
        }
        events
    }

    async fn append_to_buffer(&mut self, key: &SessionId, lines: &[TimedLine]) -> Vec<Event> {
        let deadline = self.clock.now() + self.inactivity_timeout;
        let (overflowed, has_pending) = {
            let Some(buffer) = self.buffers.get_mut(key) else {
                return Vec::new();
            };
            let mut overflowed = false;
            let mut appended = 0usize;
            for line in lines {
                if line.timestamp_ms < buffer.start_ms {
                    continue;
                }
                if buffer.raw_lines.len() >= self.max_match_lines {
                    overflowed = true;
                    break;
                }
                buffer.raw_lines.push(line.raw.clone());
                appended += 1;
            }
            if appended > 0 && buffer.pending_end.is_none() {
                buffer.inactivity_deadline = Some(deadline);
            }
            (overflowed, buffer.pending_end.is_some())
        };

        if overflowed {
            warn!(session_id = %key, cap = self.max_match_lines, "buffer ceiling reached");
            return if has_pending {
                self.finalize(key).await
            } else {
                self.early_end(key, EarlyEndTrigger::ForceEnd, None).await
            };
        }
        if has_pending {
            return self.finalize(key).await;
        }
        Vec::new()
    }

    /// A proper end arrived: record it, finalize on the chunk boundary.
    pub fn on_match_ended(
        &mut self,
        session_id: &SessionId,
        end_ms: u64,
        metadata: &MatchMetadata,
    ) -> Vec<Event> {
        let Some(buffer) = self.buffers.get_mut(session_id) else {
            debug!(session_id = %session_id, "end event for unknown buffer, ignoring");
            return Vec::new();
        };
        buffer.pending_end = Some(PendingEnd {
            end_ms,
            metadata: metadata.clone(),
        });
        buffer.inactivity_deadline = None;
        Vec::new()
    }

    /// Zone transition: end every buffer whose arena the player left.
    pub async fn on_zone_change(
        &mut self,
        zone_id: u32,
        snapshot: Option<&MatchMetadata>,
    ) -> Vec<Event> {
        if self.buffers.is_empty() {
            return Vec::new();
        }
        let leaving: Vec<SessionId> = self
            .buffers
            .iter()
            .filter(|(_, b)| b.zone_id != zone_id)
            .map(|(k, _)| k.clone())
            .collect();
        let mut events = Vec::new();
        for key in leaving {
            events.extend(
                self.early_end(&key, EarlyEndTrigger::ZoneChange, snapshot.cloned())
                    .await,
            );
        }
        events
    }

    /// Attach a parser metadata snapshot (log rotation enrichment).
    pub fn attach_snapshot(&mut self, session_id: &SessionId, metadata: MatchMetadata) {
        if let Some(buffer) = self.buffers.get_mut(session_id) {
            buffer.snapshot_metadata = Some(metadata);
        }
    }

    /// Expire buffers whose inactivity deadline has passed.
    pub async fn tick(&mut self) -> Vec<Event> {
        let now = self.clock.now();
        let expired: Vec<SessionId> = self
            .buffers
            .iter()
            .filter(|(_, b)| b.inactivity_deadline.map(|d| now >= d).unwrap_or(false))
            .map(|(k, _)| k.clone())
            .collect();
        let mut events = Vec::new();
        for key in expired {
            info!(session_id = %key, "match buffer idle past deadline");
            events.extend(self.early_end(&key, EarlyEndTrigger::DataTimeout, None).await);
        }
        events
    }

    /// Shutdown path: force-finalize buffers that have a proper end and
    /// enough lines; route the rest through incomplete.
    pub async fn force_end_all(&mut self, trigger: EarlyEndTrigger) -> Vec<Event> {
        let keys: Vec<SessionId> = self.buffers.keys().cloned().collect();
        let mut events = Vec::new();
        for key in keys {
            let ready = self
                .buffers
                .get(&key)
                .map(|b| b.pending_end.is_some() && b.line_count() >= self.min_match_lines)
                .unwrap_or(false);
            if ready {
                events.extend(self.finalize(&key).await);
            } else {
                events.extend(self.early_end(&key, trigger, None).await);
            }
        }
        events
    }

    /// Finalize a buffer with a proper end: write the chunk (bounds
    /// permitting) and release the buffer.
    async fn finalize(&mut self, key: &SessionId) -> Vec<Event> {
        let Some(buffer) = self.buffers.remove(key) else {
            return Vec::new();
        };
        let Some(pending) = buffer.pending_end.clone() else {
            // Finalize is only reachable with a pending end recorded.
            return Vec::new();
        };
        let line_count = buffer.line_count();

        if line_count < self.min_match_lines {
            info!(session_id = %key, lines = line_count, "instant match, discarding");
            return vec![Event::MatchEndedIncomplete {
                session_id: buffer.session_id,
                trigger: EarlyEndTrigger::CancelInstantMatch,
                lines: line_count,
                timestamp: self.clock.epoch_ms(),
                metadata: Some(pending.metadata),
            }];
        }

        match write_chunk(
            &self.output_directory,
            &buffer.session_id,
            self.header.as_deref(),
            &buffer.raw_lines,
        )
        .await
        {
            Ok((file_path, size_bytes)) => {
                info!(
                    session_id = %key,
                    path = %file_path.display(),
                    lines = line_count,
                    "chunk extracted"
                );
                vec![Event::MatchExtracted {
                    session_id: buffer.session_id,
                    file_path,
                    line_count,
                    size_bytes,
                    timed_out: false,
                }]
            }
            Err(e) => {
                // Parity with the incomplete path keeps start/terminal
                // pairing intact even when the disk fails us.
                warn!(session_id = %key, error = %e, "chunk write failed");
                vec![Event::MatchEndedIncomplete {
                    session_id: buffer.session_id,
                    trigger: EarlyEndTrigger::ForceEnd,
                    lines: line_count,
                    timestamp: self.clock.epoch_ms(),
                    metadata: Some(pending.metadata),
                }]
            }
        }
    }

    /// Close a buffer without a proper end.
    async fn early_end(
        &mut self,
        key: &SessionId,
        trigger: EarlyEndTrigger,
        snapshot: Option<MatchMetadata>,
    ) -> Vec<Event> {
        let Some(mut buffer) = self.buffers.remove(key) else {
            return Vec::new();
        };
        if let Some(snapshot) = snapshot {
            buffer.snapshot_metadata = Some(snapshot);
        }

        let mut events = Vec::new();
        if self.policy.should_extract(trigger, buffer.line_count()) {
            match write_chunk(
                &self.output_directory,
                &buffer.session_id,
                self.header.as_deref(),
                &buffer.raw_lines,
            )
            .await
            {
                Ok((file_path, size_bytes)) => events.push(Event::MatchExtracted {
                    session_id: buffer.session_id.clone(),
                    file_path,
                    line_count: buffer.line_count(),
                    size_bytes,
                    timed_out: true,
                }),
                Err(e) => warn!(session_id = %key, error = %e, "early-end chunk write failed"),
            }
        }

        info!(session_id = %key, %trigger, lines = buffer.line_count(), "match ended incomplete");
        events.push(Event::MatchEndedIncomplete {
            session_id: buffer.session_id.clone(),
            trigger,
            lines: buffer.line_count(),
            timestamp: self.clock.epoch_ms(),
            metadata: buffer.best_metadata(),
        });
        events
    }
}

#[cfg(test)]
#[path = "chunker_tests.rs"]
mod tests;
