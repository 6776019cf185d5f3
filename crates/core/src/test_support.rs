// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::bracket::Bracket;
use crate::clock::Clock;
use crate::metadata::{MatchMetadata, PlayerInfo, ShuffleRound};
use crate::session::SessionId;
use crate::stored::StoredMatchMetadata;

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core domain types.
pub mod strategies {
    use crate::bracket::Bracket;
    use crate::session::SessionState;
    use crate::trigger::EarlyEndTrigger;
    use proptest::prelude::*;

    pub fn arb_bracket() -> impl Strategy<Value = Bracket> {
        prop_oneof![
            Just(Bracket::TwoVTwo),
            Just(Bracket::ThreeVThree),
            Just(Bracket::SoloShuffle),
        ]
    }

    pub fn arb_session_state() -> impl Strategy<Value = SessionState> {
        prop_oneof![
            Just(SessionState::Active),
            Just(SessionState::Complete),
            Just(SessionState::Incomplete),
        ]
    }

    pub fn arb_trigger() -> impl Strategy<Value = EarlyEndTrigger> {
        prop_oneof![
            Just(EarlyEndTrigger::DataTimeout),
            Just(EarlyEndTrigger::ZoneChange),
            Just(EarlyEndTrigger::NewMatchStart),
            Just(EarlyEndTrigger::ForceEnd),
            Just(EarlyEndTrigger::LogFileChange),
            Just(EarlyEndTrigger::CancelInstantMatch),
            Just(EarlyEndTrigger::ProcessStop),
            Just(EarlyEndTrigger::SafetyTimeout),
            Just(EarlyEndTrigger::InsufficientCombatants),
            Just(EarlyEndTrigger::NoPlayerDeath),
        ]
    }
}

// ── Fixture factories ───────────────────────────────────────────────────

/// A combatant with a Player-GUID on the given team.
pub fn player(n: u32, team_id: u8) -> PlayerInfo {
    let mut p = PlayerInfo::new(format!("Player-1403-{:08X}", n));
    p.team_id = Some(team_id);
    p.spec_id = Some(62);
    p.rating = Some(1800 + n);
    p
}

/// Metadata for a match with `count` combatants split evenly across teams.
pub fn metadata_with_players(bracket: Bracket, count: usize) -> MatchMetadata {
    let mut md = MatchMetadata::new(1_000_000, 1505, bracket, 39, true);
    for i in 0..count {
        md.players.push(player(i as u32, (i % 2) as u8));
    }
    md
}

/// Finalized 3v3 metadata that passes completeness validation.
pub fn complete_3v3() -> MatchMetadata {
    let mut md = metadata_with_players(Bracket::ThreeVThree, 6);
    md.winning_team_id = Some(0);
    md.match_duration_s = Some(90);
    md.team0_mmr = Some(2064);
    md.team1_mmr = Some(1864);
    md.player_id = Some(md.players[0].guid.clone());
    md.player_death_count = 1;
    md
}

/// A shuffle round where team `winner` took the kill.
pub fn shuffle_round(number: u32, start_ms: u64, winner: u8, killed: &str) -> ShuffleRound {
    ShuffleRound {
        round_number: number,
        start_ms,
        end_ms: Some(start_ms + 60_000),
        duration_s: Some(60),
        winning_team_id: Some(winner),
        killed_player_id: Some(killed.to_string()),
        team0_players: vec!["Player-1403-000000A0".to_string()],
        team1_players: vec!["Player-1403-000000A1".to_string()],
    }
}

/// Finalized shuffle metadata with `rounds` rounds, all won by team 0.
pub fn shuffle_with_rounds(rounds: usize) -> MatchMetadata {
    let mut md = metadata_with_players(Bracket::SoloShuffle, 6);
    for i in 0..rounds {
        md.shuffle_rounds
            .push(shuffle_round(i as u32 + 1, 1_000_000 + i as u64 * 60_000, 0, "Player-1403-000000A1"));
    }
    md.match_duration_s = Some(rounds as u32 * 60);
    md.team0_mmr = Some(1900);
    md.team1_mmr = Some(1900);
    let recorder_guid = md.players[0].guid.clone();
    md.player_id = Some(recorder_guid.clone());
    {
        let p = md.player_mut(&recorder_guid);
        p.wins = Some(rounds as u32);
        p.losses = Some(0);
    }
    md
}

/// An in-progress stored record for the given session.
pub fn stored_in_progress(session_id: &str, md: MatchMetadata, clock: &impl Clock) -> StoredMatchMetadata {
    StoredMatchMetadata::initial(SessionId::new(session_id), md, clock.utc_now())
}
