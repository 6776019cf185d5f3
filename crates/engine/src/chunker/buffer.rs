// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-match raw line buffer.

use mw_core::{MatchMetadata, SessionId};
use std::time::Instant;

/// A proper `ARENA_MATCH_END` waiting for its chunk boundary.
#[derive(Debug, Clone)]
pub struct PendingEnd {
    pub end_ms: u64,
    pub metadata: MatchMetadata,
}

/// Raw lines accumulated for one active match.
///
/// Owned exclusively by the chunker from start to terminal; relinquished
/// only by writing the chunk file or discarding the buffer.
#[derive(Debug)]
pub struct MatchBuffer {
    pub session_id: SessionId,
    /// Start line timestamp; only lines at or after it are buffered.
    pub start_ms: u64,
    /// Arena zone from the start event; leaving it ends the match.
    pub zone_id: u32,
    pub raw_lines: Vec<String>,
    /// Armed while the match runs; `None` once a proper end is pending.
    pub inactivity_deadline: Option<Instant>,
    pub pending_end: Option<PendingEnd>,
    /// Parser metadata captured on zone changes / rotation for early-end
    /// enrichment.
    pub snapshot_metadata: Option<MatchMetadata>,
}

impl MatchBuffer {
    pub fn new(session_id: SessionId, start_ms: u64, zone_id: u32, deadline: Instant) -> Self {
        Self {
            session_id,
            start_ms,
            zone_id,
            raw_lines: Vec::new(),
            inactivity_deadline: Some(deadline),
            pending_end: None,
            snapshot_metadata: None,
        }
    }

    pub fn line_count(&self) -> usize {
        self.raw_lines.len()
    }

    /// Best metadata available for an early end: an explicit snapshot beats
    /// the pending end's metadata beats nothing.
    pub fn best_metadata(&self) -> Option<MatchMetadata> {
        self.snapshot_metadata
            .clone()
            .or_else(|| self.pending_end.as_ref().map(|p| p.metadata.clone()))
    }
}
