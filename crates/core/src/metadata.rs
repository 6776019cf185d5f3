// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rolling match metadata produced by the parser.

use crate::bracket::Bracket;
use serde::{Deserialize, Serialize};

/// One combatant of a match.
///
/// Identity comes from `COMBATANT_INFO`; name/realm/region are filled in
/// opportunistically from later spell events naming the same GUID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub guid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec_id: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highest_pvp_tier: Option<u32>,
    /// Shuffle round wins for this player (recording player only in practice).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wins: Option<u32>,
    /// Shuffle round losses for this player.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub losses: Option<u32>,
}

impl PlayerInfo {
    pub fn new(guid: impl Into<String>) -> Self {
        Self {
            guid: guid.into(),
            name: None,
            realm: None,
            region: None,
            spec_id: None,
            team_id: None,
            rating: None,
            highest_pvp_tier: None,
            wins: None,
            losses: None,
        }
    }
}

/// One of the sub-matches composing a Solo Shuffle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShuffleRound {
    pub round_number: u32,
    pub start_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_s: Option<u32>,
    /// Fixed by the first `UNIT_DIED` in the round; later deaths are ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winning_team_id: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub killed_player_id: Option<String>,
    #[serde(default)]
    pub team0_players: Vec<String>,
    #[serde(default)]
    pub team1_players: Vec<String>,
}

/// Evolving metadata snapshot for one match.
///
/// The parser grows this record as lines arrive; on `ARENA_MATCH_END` the
/// finalized fields (winner, duration, MMR) are filled in and the whole
/// record travels on the `match:ended` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchMetadata {
    /// Match start, epoch milliseconds (from the start line's timestamp).
    pub timestamp: u64,
    pub map_id: u32,
    pub bracket: Bracket,
    pub season: u32,
    pub is_ranked: bool,
    #[serde(default)]
    pub players: Vec<PlayerInfo>,

    // -- finalized on a complete match --
    /// Absent for Solo Shuffle (wins are per-round).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winning_team_id: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub match_duration_s: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team0_mmr: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team1_mmr: Option<u32>,
    /// Recording player's GUID, when identified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_id: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shuffle_rounds: Vec<ShuffleRound>,
    /// Unique player-GUID `UNIT_DIED` events between start and end (2v2/3v3).
    #[serde(default)]
    pub player_death_count: u32,
}

impl MatchMetadata {
    pub fn new(timestamp: u64, map_id: u32, bracket: Bracket, season: u32, is_ranked: bool) -> Self {
        Self {
            timestamp,
            map_id,
            bracket,
            season,
            is_ranked,
            players: Vec::new(),
            winning_team_id: None,
            match_duration_s: None,
            team0_mmr: None,
            team1_mmr: None,
            player_id: None,
            shuffle_rounds: Vec::new(),
            player_death_count: 0,
        }
    }

    /// Find a player by GUID.
    pub fn player(&self, guid: &str) -> Option<&PlayerInfo> {
        self.players.iter().find(|p| p.guid == guid)
    }

    /// Find or insert a player by GUID, returning a mutable handle.
    pub fn player_mut(&mut self, guid: &str) -> &mut PlayerInfo {
        if let Some(idx) = self.players.iter().position(|p| p.guid == guid) {
            &mut self.players[idx]
        } else {
            self.players.push(PlayerInfo::new(guid));
            // Index is valid: we just pushed.
            let last = self.players.len() - 1;
            &mut self.players[last]
        }
    }

    /// All player GUIDs in discovery order.
    pub fn player_ids(&self) -> Vec<String> {
        self.players.iter().map(|p| p.guid.clone()).collect()
    }
}

#[cfg(test)]
#[path = "metadata_tests.rs"]
mod tests;
