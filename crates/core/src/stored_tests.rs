// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::clock::{Clock, FakeClock};
use crate::test_support::complete_3v3;

#[test]
fn initial_record_shape() {
    let clock = FakeClock::new();
    let record = StoredMatchMetadata::initial(SessionId::new("s-1"), complete_3v3(), clock.utc_now());

    assert_eq!(record.match_completion_status, MatchCompletionStatus::InProgress);
    assert_eq!(record.enrichment_phase, EnrichmentPhase::Initial);
    assert_eq!(record.upload_status, UploadStatus::Pending);
    assert!(record.match_hash.is_none());
    assert_eq!(record.created_at, record.last_updated_at);
}

#[test]
fn enum_serde_forms() {
    assert_eq!(
        serde_json::to_string(&MatchCompletionStatus::InProgress).unwrap(),
        "\"in_progress\""
    );
    assert_eq!(
        serde_json::to_string(&EnrichmentPhase::CombatantsAdded).unwrap(),
        "\"combatants_added\""
    );
    assert_eq!(serde_json::to_string(&UploadStatus::NotFound).unwrap(), "\"not_found\"");
}

#[test]
fn upload_terminal_classification() {
    assert!(UploadStatus::Completed.is_terminal());
    assert!(UploadStatus::Failed.is_terminal());
    assert!(UploadStatus::Expired.is_terminal());
    assert!(UploadStatus::NotFound.is_terminal());
    assert!(UploadStatus::Incomplete.is_terminal());

    assert!(!UploadStatus::Pending.is_terminal());
    assert!(!UploadStatus::Uploading.is_terminal());
    assert!(!UploadStatus::Queued.is_terminal());
    assert!(!UploadStatus::Processing.is_terminal());
}

#[test]
fn record_round_trips_with_iso_dates() {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_723_456_789_000);
    let record = StoredMatchMetadata::initial(SessionId::new("s-1"), complete_3v3(), clock.utc_now());

    let json = serde_json::to_string(&record).unwrap();
    assert!(json.contains("2024-08-12T"), "dates serialize as ISO-8601: {json}");

    let parsed: StoredMatchMetadata = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, record);
}
