// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mw_core::Bracket;

/// Build a line whose payload is under test; the parser takes the
/// timestamp from the tailer, not from the raw prefix.
fn at(ts: u64, payload: &str) -> TimedLine {
    TimedLine {
        raw: format!("5/17/2025 21:31:04.360  {payload}"),
        timestamp_ms: ts,
    }
}

fn start_3v3(parser: &mut LogParser, ts: u64) -> SessionId {
    let events = parser.handle_line(&at(ts, "ARENA_MATCH_START,1505,39,3v3,1"));
    match &events[..] {
        [Event::MatchStarted { session_id, .. }] => session_id.clone(),
        other => panic!("expected MatchStarted, got {other:?}"),
    }
}

fn combatant(guid: &str, team: u8) -> String {
    format!("COMBATANT_INFO,{guid},0,62,{team},1800,3")
}

#[test]
fn ranked_start_emits_match_started() {
    let mut parser = LogParser::new();
    let events = parser.handle_line(&at(1_000, "ARENA_MATCH_START,1505,39,3v3,1"));

    match &events[..] {
        [Event::MatchStarted { timestamp, zone_id, bracket, season, is_ranked, .. }] => {
            assert_eq!(*timestamp, 1_000);
            assert_eq!(*zone_id, 1505);
            assert_eq!(*bracket, Bracket::ThreeVThree);
            assert_eq!(*season, 39);
            assert!(*is_ranked);
        }
        other => panic!("expected MatchStarted, got {other:?}"),
    }
}

#[test]
fn skirmish_is_filtered_entirely() {
    let mut parser = LogParser::new();
    let events = parser.handle_line(&at(1_000, "ARENA_MATCH_START,1505,39,3v3,0"));
    assert!(events.is_empty());
    assert!(parser.snapshot().is_none());
    assert_eq!(parser.parse_error_count(), 0);
}

#[test]
fn malformed_start_is_discarded() {
    let mut parser = LogParser::new();
    let events = parser.handle_line(&at(1_000, "ARENA_MATCH_START,notazone,39,3v3,1"));
    assert!(events.is_empty());
    assert_eq!(parser.parse_error_count(), 1);
    assert!(parser.snapshot().is_none());
}

#[test]
fn unknown_bracket_is_ignored_without_error() {
    let mut parser = LogParser::new();
    let events = parser.handle_line(&at(1_000, "ARENA_MATCH_START,1505,39,Rated Battleground,1"));
    assert!(events.is_empty());
    assert_eq!(parser.parse_error_count(), 0);
}

#[test]
fn combatants_populate_rolling_metadata() {
    let mut parser = LogParser::new();
    start_3v3(&mut parser, 1_000);
    for i in 0..6 {
        parser.handle_line(&at(1_100, &combatant(&format!("Player-1403-{i:08X}"), (i % 2) as u8)));
    }

    let md = parser.snapshot().unwrap();
    assert_eq!(md.players.len(), 6);
    assert_eq!(md.players[0].spec_id, Some(62));
    assert_eq!(md.players[0].rating, Some(1800));
}

#[test]
fn unique_player_deaths_are_counted() {
    let mut parser = LogParser::new();
    start_3v3(&mut parser, 1_000);

    let died = |guid: &str| format!("UNIT_DIED,0000000000000000,nil,0x80000000,0x80000000,{guid},\"Victim-Realm\",0x512,0x0");
    parser.handle_line(&at(2_000, &died("Player-1403-000000AA")));
    parser.handle_line(&at(2_100, &died("Player-1403-000000AA")));
    parser.handle_line(&at(2_200, &died("Player-1403-000000BB")));
    parser.handle_line(&at(2_300, &died("Creature-0-1234")));

    assert_eq!(parser.snapshot().unwrap().player_death_count, 2);
}

#[test]
fn end_finalizes_non_shuffle_metadata() {
    let mut parser = LogParser::new();
    let session_id = start_3v3(&mut parser, 1_000);
    parser.handle_line(&at(2_000, "UNIT_DIED,0,nil,0x0,0x0,Player-1403-000000AA,\"V\",0x512,0x0"));

    let events = parser.handle_line(&at(91_000, "ARENA_MATCH_END,0,90,2064,1864"));
    match &events[..] {
        [Event::MatchEnded { session_id: sid, timestamp, metadata }] => {
            assert_eq!(sid, &session_id);
            assert_eq!(*timestamp, 91_000);
            assert_eq!(metadata.winning_team_id, Some(0));
            assert_eq!(metadata.match_duration_s, Some(90));
            assert_eq!(metadata.team0_mmr, Some(2064));
            assert_eq!(metadata.team1_mmr, Some(1864));
            assert_eq!(metadata.player_death_count, 1);
        }
        other => panic!("expected MatchEnded, got {other:?}"),
    }
    assert!(parser.snapshot().is_none());
}

#[test]
fn end_without_active_match_is_discarded() {
    let mut parser = LogParser::new();
    let events = parser.handle_line(&at(1_000, "ARENA_MATCH_END,0,90,2064,1864"));
    assert!(events.is_empty());
    assert_eq!(parser.parse_error_count(), 1);
}

#[test]
fn malformed_end_keeps_match_active() {
    let mut parser = LogParser::new();
    start_3v3(&mut parser, 1_000);
    let events = parser.handle_line(&at(2_000, "ARENA_MATCH_END,zero,90,2064,1864"));
    assert!(events.is_empty());
    assert_eq!(parser.parse_error_count(), 1);
    assert!(parser.snapshot().is_some());
}

#[test]
fn duplicate_start_reuses_session_id() {
    let mut parser = LogParser::new();
    let first = start_3v3(&mut parser, 1_000);

    let events = parser.handle_line(&at(5_000, "ARENA_MATCH_START,1505,39,3v3,1"));
    match &events[..] {
        [Event::MatchStarted { session_id, .. }] => assert_eq!(session_id, &first),
        other => panic!("expected re-emitted MatchStarted, got {other:?}"),
    }
}

#[test]
fn zone_change_always_emits_with_snapshot() {
    let mut parser = LogParser::new();

    // Idle: still emitted, no snapshot.
    let events = parser.handle_line(&at(500, "ZONE_CHANGE,2552,\"Dornogal\",0"));
    match &events[..] {
        [Event::ZoneChange { zone_id, zone_name, metadata_snapshot, .. }] => {
            assert_eq!(*zone_id, 2552);
            assert_eq!(zone_name, "Dornogal");
            assert!(metadata_snapshot.is_none());
        }
        other => panic!("expected ZoneChange, got {other:?}"),
    }

    // Active: snapshot travels along.
    start_3v3(&mut parser, 1_000);
    let events = parser.handle_line(&at(2_000, "ZONE_CHANGE,2563,\"Nokhudon\",0"));
    match &events[..] {
        [Event::ZoneChange { metadata_snapshot, .. }] => assert!(metadata_snapshot.is_some()),
        other => panic!("expected ZoneChange, got {other:?}"),
    }
}

#[test]
fn spell_lines_enrich_known_players() {
    let mut parser = LogParser::new();
    start_3v3(&mut parser, 1_000);
    parser.handle_line(&at(1_100, &combatant("Player-1403-000000AA", 0)));

    parser.handle_line(&at(
        1_200,
        "SPELL_CAST_SUCCESS,Player-1403-000000AA,\"Verope-Tichondrius\",0x511,0x0,133,\"Fireball\"",
    ));

    let md = parser.snapshot().unwrap();
    let player = md.player("Player-1403-000000AA").unwrap();
    assert_eq!(player.name.as_deref(), Some("Verope"));
    assert_eq!(player.realm.as_deref(), Some("Tichondrius"));
    // 0x511 carries the "mine" affiliation: this is the recording player.
    assert_eq!(md.player_id.as_deref(), Some("Player-1403-000000AA"));
}

#[test]
fn spell_lines_for_unknown_guids_are_ignored() {
    let mut parser = LogParser::new();
    start_3v3(&mut parser, 1_000);
    parser.handle_line(&at(
        1_200,
        "SPELL_CAST_SUCCESS,Player-1403-000000FF,\"Someone-Realm\",0x548,0x0,133,\"Fireball\"",
    ));
    assert!(parser.snapshot().unwrap().players.is_empty());
}

#[test]
fn reset_drops_active_match() {
    let mut parser = LogParser::new();
    start_3v3(&mut parser, 1_000);
    parser.reset();
    assert!(parser.snapshot().is_none());
    assert!(parser.active_session().is_none());

    // A fresh start works after reset.
    start_3v3(&mut parser, 2_000);
}

// ── Shuffle ─────────────────────────────────────────────────────────────

fn start_shuffle(parser: &mut LogParser, ts: u64) -> SessionId {
    let events = parser.handle_line(&at(ts, "ARENA_MATCH_START,1552,39,Rated Solo Shuffle,1"));
    match &events[..] {
        [Event::MatchStarted { session_id, bracket, .. }] => {
            assert_eq!(*bracket, Bracket::SoloShuffle);
            session_id.clone()
        }
        other => panic!("expected MatchStarted, got {other:?}"),
    }
}

#[test]
fn shuffle_round_starts_do_not_reemit() {
    let mut parser = LogParser::new();
    start_shuffle(&mut parser, 1_000);

    let events = parser.handle_line(&at(60_000, "ARENA_MATCH_START,1552,39,Rated Solo Shuffle,1"));
    assert!(events.is_empty());
}

#[test]
fn shuffle_end_carries_six_rounds_and_tallies() {
    let mut parser = LogParser::new();
    let session_id = start_shuffle(&mut parser, 0);

    // Six rounds; Player-A (team 0 every round) takes every kill.
    for round in 0..6u64 {
        if round > 0 {
            parser.handle_line(&at(round * 60_000, "ARENA_MATCH_START,1552,39,Rated Solo Shuffle,1"));
        }
        parser.handle_line(&at(round * 60_000 + 100, &combatant("Player-1403-000000AA", 0)));
        parser.handle_line(&at(round * 60_000 + 100, &combatant("Player-1403-000000BB", 1)));
        parser.handle_line(&at(
            round * 60_000 + 30_000,
            "UNIT_DIED,0,nil,0x0,0x0,Player-1403-000000BB,\"B\",0x512,0x0",
        ));
    }

    let events = parser.handle_line(&at(360_000, "ARENA_MATCH_END,0,360,1900,1900"));
    match &events[..] {
        [Event::MatchEnded { session_id: sid, metadata, .. }] => {
            assert_eq!(sid, &session_id);
            assert_eq!(metadata.shuffle_rounds.len(), 6);
            // Shuffle has no match-level winner.
            assert_eq!(metadata.winning_team_id, None);
            for round in &metadata.shuffle_rounds {
                assert_eq!(round.winning_team_id, Some(0));
                assert_eq!(round.killed_player_id.as_deref(), Some("Player-1403-000000BB"));
            }

            let a = metadata.player("Player-1403-000000AA").unwrap();
            assert_eq!((a.wins, a.losses), (Some(6), Some(0)));
            let b = metadata.player("Player-1403-000000BB").unwrap();
            assert_eq!((b.wins, b.losses), (Some(0), Some(6)));
        }
        other => panic!("expected MatchEnded, got {other:?}"),
    }
}

#[test]
fn shuffle_first_death_wins_per_round() {
    let mut parser = LogParser::new();
    start_shuffle(&mut parser, 0);
    parser.handle_line(&at(100, &combatant("Player-1403-000000AA", 0)));
    parser.handle_line(&at(100, &combatant("Player-1403-000000BB", 1)));

    parser.handle_line(&at(10_000, "UNIT_DIED,0,nil,0x0,0x0,Player-1403-000000BB,\"B\",0x512,0x0"));
    // A second death in the same round must not flip the winner.
    parser.handle_line(&at(11_000, "UNIT_DIED,0,nil,0x0,0x0,Player-1403-000000AA,\"A\",0x512,0x0"));

    let events = parser.handle_line(&at(60_000, "ARENA_MATCH_END,0,60,1900,1900"));
    match &events[..] {
        [Event::MatchEnded { metadata, .. }] => {
            assert_eq!(metadata.shuffle_rounds[0].winning_team_id, Some(0));
            assert_eq!(
                metadata.shuffle_rounds[0].killed_player_id.as_deref(),
                Some("Player-1403-000000BB")
            );
        }
        other => panic!("expected MatchEnded, got {other:?}"),
    }
}
