// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Structural completeness validation per bracket.
//!
//! Run when a match reports a proper end. Failures never throw: they come
//! back as a structured outcome the authority routes. Hard invalidations
//! re-enter the incomplete path with a synthesized trigger; soft failures
//! preserve the record as incomplete.

use mw_core::{Bracket, EarlyEndTrigger, MatchMetadata};

/// Why a finished match cannot be marked complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    /// The match has no value at all: route through hard-delete.
    Hard {
        trigger: EarlyEndTrigger,
        reason: String,
    },
    /// Keep the record around as incomplete.
    Soft { reason: String },
}

impl ValidationFailure {
    pub fn reason(&self) -> &str {
        match self {
            ValidationFailure::Hard { reason, .. } | ValidationFailure::Soft { reason } => reason,
        }
    }
}

/// Check the structural invariants of the bracket.
pub fn validate_completeness(
    metadata: &MatchMetadata,
    duplicate_start: bool,
) -> Result<(), ValidationFailure> {
    if metadata.bracket.is_shuffle() {
        return validate_shuffle(metadata);
    }

    // A reload mid-match re-emits the start line; the match can no longer
    // be trusted end to end.
    if duplicate_start {
        return Err(ValidationFailure::Soft {
            reason: "Multiple ARENA_MATCH_START events detected for one match".to_string(),
        });
    }

    let expected = metadata.bracket.expected_players().unwrap_or(0);
    let got = metadata.players.len();
    if got != expected {
        return Err(ValidationFailure::Hard {
            trigger: EarlyEndTrigger::InsufficientCombatants,
            reason: format!(
                "{} requires exactly {} combatants (got {})",
                metadata.bracket, expected, got
            ),
        });
    }

    if metadata.player_death_count < 1 {
        return Err(ValidationFailure::Hard {
            trigger: EarlyEndTrigger::NoPlayerDeath,
            reason: "no player death observed between match start and end".to_string(),
        });
    }

    Ok(())
}

fn validate_shuffle(metadata: &MatchMetadata) -> Result<(), ValidationFailure> {
    let rounds = metadata.shuffle_rounds.len();
    if rounds != Bracket::SHUFFLE_ROUNDS {
        return Err(ValidationFailure::Soft {
            reason: format!(
                "Solo Shuffle requires exactly {} rounds (got {})",
                Bracket::SHUFFLE_ROUNDS,
                rounds
            ),
        });
    }

    if let Some(recorder_guid) = metadata.player_id.as_deref() {
        let Some(player) = metadata.player(recorder_guid) else {
            return Err(ValidationFailure::Soft {
                reason: format!("Solo Shuffle recording player {recorder_guid} not found in players"),
            });
        };
        let wins = player.wins.unwrap_or(0);
        let losses = player.losses.unwrap_or(0);
        if (wins + losses) as usize != rounds {
            return Err(ValidationFailure::Soft {
                reason: format!(
                    "Solo Shuffle wins+losses ({wins}+{losses}) does not match rounds ({rounds})"
                ),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "validate_tests.rs"]
mod tests;
