// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Competitive bracket classification.

use serde::{Deserialize, Serialize};

/// The match format of an arena session.
///
/// Serialized with the display strings the rest of the toolchain expects
/// (`"2v2"`, `"3v3"`, `"Solo Shuffle"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bracket {
    #[serde(rename = "2v2")]
    TwoVTwo,
    #[serde(rename = "3v3")]
    ThreeVThree,
    #[serde(rename = "Solo Shuffle")]
    SoloShuffle,
}

impl Bracket {
    /// Map the bracket token from an `ARENA_MATCH_START` line.
    ///
    /// Returns `None` for tokens we do not track (battlegrounds, war games).
    pub fn from_log_token(token: &str) -> Option<Self> {
        match token {
            "2v2" => Some(Bracket::TwoVTwo),
            "3v3" => Some(Bracket::ThreeVThree),
            "Rated Solo Shuffle" => Some(Bracket::SoloShuffle),
            _ => None,
        }
    }

    /// Exact combatant count a complete match must carry.
    ///
    /// Shuffle rosters are validated per-round rather than per-match.
    pub fn expected_players(&self) -> Option<usize> {
        match self {
            Bracket::TwoVTwo => Some(4),
            Bracket::ThreeVThree => Some(6),
            Bracket::SoloShuffle => None,
        }
    }

    pub fn is_shuffle(&self) -> bool {
        matches!(self, Bracket::SoloShuffle)
    }

    /// Rounds a complete shuffle must contain.
    pub const SHUFFLE_ROUNDS: usize = 6;
}

crate::simple_display! {
    Bracket {
        TwoVTwo => "2v2",
        ThreeVThree => "3v3",
        SoloShuffle => "Solo Shuffle",
    }
}

#[cfg(test)]
#[path = "bracket_tests.rs"]
mod tests;
