// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable per-match record persisted by the metadata store.

use crate::hash::MatchHash;
use crate::id::JobId;
use crate::metadata::MatchMetadata;
use crate::session::SessionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the match sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchCompletionStatus {
    InProgress,
    Complete,
    Incomplete,
}

crate::simple_display! {
    MatchCompletionStatus {
        InProgress => "in_progress",
        Complete => "complete",
        Incomplete => "incomplete",
    }
}

/// How much of the metadata has been filled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentPhase {
    Initial,
    CombatantsAdded,
    Finalized,
}

crate::simple_display! {
    EnrichmentPhase {
        Initial => "initial",
        CombatantsAdded => "combatants_added",
        Finalized => "finalized",
    }
}

/// Upload pipeline status maintained by the upload collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Pending,
    Uploading,
    Queued,
    Processing,
    Completed,
    Failed,
    Incomplete,
    Expired,
    NotFound,
}

impl UploadStatus {
    /// Terminal statuses clear the transient progress message on write.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            UploadStatus::Completed
                | UploadStatus::Failed
                | UploadStatus::Incomplete
                | UploadStatus::Expired
                | UploadStatus::NotFound
        )
    }
}

crate::simple_display! {
    UploadStatus {
        Pending => "pending",
        Uploading => "uploading",
        Queued => "queued",
        Processing => "processing",
        Completed => "completed",
        Failed => "failed",
        Incomplete => "incomplete",
        Expired => "expired",
        NotFound => "not_found",
    }
}

/// The durable JSON record for one match, keyed by session id.
///
/// Invariant: `match_hash` is present iff `match_completion_status` is
/// `Complete`. The store validates this on every save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMatchMetadata {
    pub match_data: MatchMetadata,
    pub session_id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_hash: Option<MatchHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_id: Option<String>,
    pub match_completion_status: MatchCompletionStatus,
    pub enrichment_phase: EnrichmentPhase,
    pub upload_status: UploadStatus,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Transient human-readable upload progress; cleared on terminal status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_path: Option<PathBuf>,

    // -- freemium bookkeeping --
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_freemium: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freemium_expires_at: Option<DateTime<Utc>>,
}

impl StoredMatchMetadata {
    /// Fresh in-progress record, created when a match starts.
    pub fn initial(session_id: SessionId, match_data: MatchMetadata, now: DateTime<Utc>) -> Self {
        Self {
            match_data,
            session_id,
            match_hash: None,
            job_id: None,
            analysis_id: None,
            match_completion_status: MatchCompletionStatus::InProgress,
            enrichment_phase: EnrichmentPhase::Initial,
            upload_status: UploadStatus::Pending,
            created_at: now,
            last_updated_at: now,
            error_code: None,
            error_message: None,
            progress_message: None,
            video_path: None,
            thumbnail_path: None,
            is_freemium: None,
            freemium_expires_at: None,
        }
    }
}

#[cfg(test)]
#[path = "stored_tests.rs"]
mod tests;
