// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Record validation, run on every save.
//!
//! The enums are already typed; what remains is the cross-field shape: a
//! `complete` record must carry everything downstream consumers rely on,
//! and the hash-presence invariant must hold in both directions.

use crate::error::StoreError;
use mw_core::{MatchCompletionStatus, StoredMatchMetadata};

fn fail(msg: impl Into<String>) -> Result<(), StoreError> {
    Err(StoreError::Validation(msg.into()))
}

/// Validate a record before it reaches disk.
pub fn validate_record(record: &StoredMatchMetadata) -> Result<(), StoreError> {
    if record.session_id.as_str().trim().is_empty() {
        return fail("session_id is empty");
    }
    if record.match_data.timestamp == 0 {
        return fail("match_data.timestamp is missing");
    }

    let complete = record.match_completion_status == MatchCompletionStatus::Complete;

    match (&record.match_hash, complete) {
        (Some(hash), true) => {
            if !hash.is_well_formed() {
                return fail(format!("match_hash {:?} is not 64 hex chars", hash.as_str()));
            }
        }
        (None, true) => return fail("complete record without match_hash"),
        (Some(_), false) => return fail("match_hash on a non-complete record"),
        (None, false) => {}
    }

    if !complete {
        return Ok(());
    }

    let md = &record.match_data;
    if md.player_id.is_none() {
        return fail("complete record without player_id");
    }
    if md.match_duration_s.is_none() {
        return fail("complete record without match_duration_s");
    }
    if md.team0_mmr.is_none() || md.team1_mmr.is_none() {
        return fail("complete record without team MMRs");
    }

    if md.bracket.is_shuffle() {
        if md.shuffle_rounds.is_empty() {
            return fail("complete shuffle record without rounds");
        }
        let Some(recorder) = md.player_id.as_deref().and_then(|id| md.player(id)) else {
            return fail("complete shuffle record: player_id not in players");
        };
        let (Some(wins), Some(losses)) = (recorder.wins, recorder.losses) else {
            return fail("complete shuffle record: recording player missing wins/losses");
        };
        if (wins + losses) as usize != md.shuffle_rounds.len() {
            return fail(format!(
                "shuffle wins+losses ({}) != rounds ({})",
                wins + losses,
                md.shuffle_rounds.len()
            ));
        }
    } else if md.winning_team_id.is_none() {
        return fail("complete record without winning_team_id");
    }

    Ok(())
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
