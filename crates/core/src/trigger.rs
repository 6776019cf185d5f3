// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Early-end trigger taxonomy.
//!
//! Every non-`ARENA_MATCH_END` termination carries one of these causes. The
//! lifecycle uses [`EarlyEndTrigger::is_hard_delete`] to decide between
//! preserving the match record for local viewing and removing every artifact.

use serde::{Deserialize, Serialize};

/// Cause attributed to a match that terminated without a proper end event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EarlyEndTrigger {
    /// No lines arrived for the buffer within the inactivity window.
    DataTimeout,
    /// The player left the arena zone mid-match.
    ZoneChange,
    /// A new match started while a buffer was still open.
    NewMatchStart,
    /// Shutdown or overflow forced the buffer closed.
    ForceEnd,
    /// The active combat log file rotated out from under the match.
    LogFileChange,
    /// The match ended with too few lines to be a real game.
    CancelInstantMatch,
    /// The host process is stopping.
    ProcessStop,
    /// Whole-pipeline watchdog fired.
    SafetyTimeout,
    /// Validation found the wrong combatant count for the bracket.
    InsufficientCombatants,
    /// Validation found no player death in a 2v2/3v3 match.
    NoPlayerDeath,
}

impl EarlyEndTrigger {
    /// Triggers whose matches have no value to the user: metadata, chunk and
    /// video artifacts are all removed instead of preserved as incomplete.
    pub fn is_hard_delete(&self) -> bool {
        matches!(
            self,
            EarlyEndTrigger::CancelInstantMatch
                | EarlyEndTrigger::InsufficientCombatants
                | EarlyEndTrigger::NoPlayerDeath
                | EarlyEndTrigger::NewMatchStart
        )
    }
}

crate::simple_display! {
    EarlyEndTrigger {
        DataTimeout => "DATA_TIMEOUT",
        ZoneChange => "ZONE_CHANGE",
        NewMatchStart => "NEW_MATCH_START",
        ForceEnd => "FORCE_END",
        LogFileChange => "LOG_FILE_CHANGE",
        CancelInstantMatch => "CANCEL_INSTANT_MATCH",
        ProcessStop => "PROCESS_STOP",
        SafetyTimeout => "SAFETY_TIMEOUT",
        InsufficientCombatants => "INSUFFICIENT_COMBATANTS",
        NoPlayerDeath => "NO_PLAYER_DEATH",
    }
}

#[cfg(test)]
#[path = "trigger_tests.rs"]
mod tests;
