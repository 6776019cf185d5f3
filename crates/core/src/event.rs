// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event types flowing between pipeline components.
//!
//! Serializes with `{"type": "match:started", ...fields}` format so host
//! applications can route on the tag without knowing the full schema.

use crate::bracket::Bracket;
use crate::hash::MatchHash;
use crate::metadata::MatchMetadata;
use crate::session::SessionId;
use crate::trigger::EarlyEndTrigger;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Events emitted by the pipeline components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // -- parser --
    #[serde(rename = "match:started")]
    MatchStarted {
        session_id: SessionId,
        /// Start line timestamp, epoch milliseconds.
        timestamp: u64,
        zone_id: u32,
        bracket: Bracket,
        season: u32,
        is_ranked: bool,
    },

    #[serde(rename = "match:ended")]
    MatchEnded {
        session_id: SessionId,
        timestamp: u64,
        metadata: MatchMetadata,
    },

    #[serde(rename = "zone:change")]
    ZoneChange {
        zone_id: u32,
        zone_name: String,
        timestamp: u64,
        /// Rolling metadata at the time of the change, for early-end enrichment.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata_snapshot: Option<MatchMetadata>,
    },

    // -- chunker --
    #[serde(rename = "match:ended_incomplete")]
    MatchEndedIncomplete {
        session_id: SessionId,
        trigger: EarlyEndTrigger,
        lines: usize,
        timestamp: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<MatchMetadata>,
    },

    #[serde(rename = "match:extracted")]
    MatchExtracted {
        session_id: SessionId,
        file_path: PathBuf,
        line_count: usize,
        size_bytes: u64,
        timed_out: bool,
    },

    // -- lifecycle --
    #[serde(rename = "lifecycle:started")]
    LifecycleStarted { session_id: SessionId },

    #[serde(rename = "lifecycle:completed")]
    LifecycleCompleted {
        session_id: SessionId,
        match_hash: MatchHash,
    },

    #[serde(rename = "lifecycle:incomplete")]
    LifecycleIncomplete {
        session_id: SessionId,
        trigger: Option<EarlyEndTrigger>,
        reason: String,
        /// False when the record was hard-deleted.
        preserved: bool,
    },

    // -- tailer --
    #[serde(rename = "log:file_changed")]
    LogFileChanged {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        previous_path: Option<PathBuf>,
        current_path: PathBuf,
        timestamp: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata_snapshot: Option<MatchMetadata>,
    },
}

impl Event {
    /// The session this event concerns, if any.
    pub fn session_id(&self) -> Option<&SessionId> {
        match self {
            Event::MatchStarted { session_id, .. }
            | Event::MatchEnded { session_id, .. }
            | Event::MatchEndedIncomplete { session_id, .. }
            | Event::MatchExtracted { session_id, .. }
            | Event::LifecycleStarted { session_id }
            | Event::LifecycleCompleted { session_id, .. }
            | Event::LifecycleIncomplete { session_id, .. } => Some(session_id),
            Event::ZoneChange { .. } | Event::LogFileChanged { .. } => None,
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
