// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stateful interpretation of the combat-log line stream.
//!
//! The parser owns the currently-active match: it mints the session id on
//! `ARENA_MATCH_START`, grows a rolling [`MatchMetadata`] from combatant and
//! kill lines, and emits typed events downstream. It is single-threaded by
//! contract (owned by the per-file processing task) and reset explicitly
//! on log rotation.
//!
//! Argument positions recognized per event token:
//!
//! - `ARENA_MATCH_START,<zone_id>,<season>,<bracket_token>,<is_ranked>`
//! - `ARENA_MATCH_END,<winning_team>,<duration_s>,<team0_mmr>,<team1_mmr>`
//! - `COMBATANT_INFO,<guid>,<faction>,<spec_id>,<team_id>,<rating>,<highest_pvp_tier>`
//! - `ZONE_CHANGE,<zone_id>,"<zone_name>",<flags>`
//! - `UNIT_DIED,<src_guid>,"<src>",<src_flags>,<src_raid_flags>,<victim_guid>,"<victim>",…`
//! - `SPELL_*,<src_guid>,"<Name-Realm>",<src_flags>,…`

mod line;
mod shuffle;

pub use line::{split_quoted_csv, ParsedLine};
pub use shuffle::ShuffleRoundTracker;

use mw_core::{Bracket, Event, MatchMetadata, SessionId};
use mw_tailer::TimedLine;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Unit affiliation bit marking the recording player's own actions.
const AFFILIATION_MINE: u64 = 0x1;

fn is_player_guid(guid: &str) -> bool {
    guid.starts_with("Player-")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    Idle,
    ActiveNonShuffle,
    ActiveShuffle,
}

#[derive(Debug)]
struct ActiveMatch {
    session_id: SessionId,
    metadata: MatchMetadata,
    /// Arena zone from the start line; a zone change away from it ends the match.
    zone_id: u32,
    /// Unique player GUIDs seen dying (2v2/3v3 kill rule).
    deaths: HashSet<String>,
    rounds: Option<ShuffleRoundTracker>,
}

/// Stateful combat-log parser for one file's line stream.
pub struct LogParser {
    state: ParserState,
    active: Option<ActiveMatch>,
    parse_errors: u64,
}

impl Default for LogParser {
    fn default() -> Self {
        Self::new()
    }
}

impl LogParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::Idle,
            active: None,
            parse_errors: 0,
        }
    }

    /// Lines that failed structural parsing (observability only).
    pub fn parse_error_count(&self) -> u64 {
        self.parse_errors
    }

    /// Rolling metadata of the active match, if any.
    pub fn snapshot(&self) -> Option<MatchMetadata> {
        self.active.as_ref().map(|a| a.metadata.clone())
    }

    /// Session id of the active match, if any.
    pub fn active_session(&self) -> Option<&SessionId> {
        self.active.as_ref().map(|a| &a.session_id)
    }

    /// Drop all match state (log rotation). The caller is responsible for
    /// snapshotting first if the metadata is still wanted.
    pub fn reset(&mut self) {
        self.state = ParserState::Idle;
        self.active = None;
    }

    /// Interpret one line, returning the events it produced.
    pub fn handle_line(&mut self, line: &TimedLine) -> Vec<Event> {
        let Some(parsed) = ParsedLine::parse(&line.raw, line.timestamp_ms) else {
            // Opaque payload: not an error, the chunker still buffers it.
            return Vec::new();
        };

        match parsed.event_type.as_str() {
            "ARENA_MATCH_START" => self.on_match_start(&parsed),
            "ARENA_MATCH_END" => self.on_match_end(&parsed),
            "COMBATANT_INFO" => {
                self.on_combatant(&parsed);
                Vec::new()
            }
            "ZONE_CHANGE" => self.on_zone_change(&parsed),
            "UNIT_DIED" => {
                self.on_unit_died(&parsed);
                Vec::new()
            }
            t if t.starts_with("SPELL_") => {
                self.on_spell(&parsed);
                Vec::new()
            }
            _ => Vec::new(),
        }
    }

    fn on_match_start(&mut self, parsed: &ParsedLine) -> Vec<Event> {
        let fields = (
            parsed.arg(0).and_then(|v| v.parse::<u32>().ok()),
            parsed.arg(1).and_then(|v| v.parse::<u32>().ok()),
            parsed.arg(2).map(Bracket::from_log_token),
            parsed.arg(3),
        );
        let (Some(zone_id), Some(season), Some(bracket), Some(ranked_flag)) = fields else {
            warn!(args = ?parsed.args, "malformed ARENA_MATCH_START, discarding");
            self.parse_errors += 1;
            return Vec::new();
        };
        let Some(bracket) = bracket else {
            debug!(token = parsed.arg(2), "untracked bracket, ignoring match");
            return Vec::new();
        };
        if ranked_flag != "1" {
            // Skirmishes never enter the pipeline.
            debug!(zone_id, "skirmish filtered");
            return Vec::new();
        }

        match self.state {
            ParserState::Idle => {
                let session_id = SessionId::mint(parsed.timestamp_ms);
                let metadata =
                    MatchMetadata::new(parsed.timestamp_ms, zone_id, bracket, season, true);
                let mut rounds = None;
                if bracket.is_shuffle() {
                    let mut tracker = ShuffleRoundTracker::new();
                    tracker.open_round(parsed.timestamp_ms);
                    rounds = Some(tracker);
                }
                self.active = Some(ActiveMatch {
                    session_id: session_id.clone(),
                    metadata,
                    zone_id,
                    deaths: HashSet::new(),
                    rounds,
                });
                self.state = if bracket.is_shuffle() {
                    ParserState::ActiveShuffle
                } else {
                    ParserState::ActiveNonShuffle
                };
                vec![Event::MatchStarted {
                    session_id,
                    timestamp: parsed.timestamp_ms,
                    zone_id,
                    bracket,
                    season,
                    is_ranked: true,
                }]
            }
            ParserState::ActiveShuffle => {
                // Next shuffle round, same session. Rosters are per-round.
                if let Some(active) = self.active.as_mut() {
                    if let Some(tracker) = active.rounds.as_mut() {
                        tracker.open_round(parsed.timestamp_ms);
                    }
                }
                Vec::new()
            }
            ParserState::ActiveNonShuffle => {
                // Duplicate start (client reload mid-match): re-emit under
                // the same session so the lifecycle can flag it.
                let Some(active) = self.active.as_ref() else {
                    return Vec::new();
                };
                warn!(session_id = %active.session_id, "duplicate ARENA_MATCH_START");
                vec![Event::MatchStarted {
                    session_id: active.session_id.clone(),
                    timestamp: parsed.timestamp_ms,
                    zone_id,
                    bracket,
                    season,
                    is_ranked: true,
                }]
            }
        }
    }

    fn on_match_end(&mut self, parsed: &ParsedLine) -> Vec<Event> {
        if self.active.is_none() {
            debug!("ARENA_MATCH_END with no active match, discarding");
            self.parse_errors += 1;
            return Vec::new();
        }
        let fields = (
            parsed.arg(0).and_then(|v| v.parse::<u8>().ok()),
            parsed.arg(1).and_then(|v| v.parse::<u32>().ok()),
            parsed.arg(2).and_then(|v| v.parse::<u32>().ok()),
            parsed.arg(3).and_then(|v| v.parse::<u32>().ok()),
        );
        let (Some(winning_team), Some(duration_s), Some(team0_mmr), Some(team1_mmr)) = fields
        else {
            warn!(args = ?parsed.args, "malformed ARENA_MATCH_END, discarding");
            self.parse_errors += 1;
            return Vec::new();
        };

        // Checked non-None above.
        let Some(active) = self.active.take() else {
            return Vec::new();
        };
        self.state = ParserState::Idle;

        let mut metadata = active.metadata;
        metadata.match_duration_s = Some(duration_s);
        metadata.team0_mmr = Some(team0_mmr);
        metadata.team1_mmr = Some(team1_mmr);

        if let Some(tracker) = active.rounds {
            let rounds = tracker.finalize(parsed.timestamp_ms);
            for (guid, wins, losses) in ShuffleRoundTracker::tally(&rounds) {
                let player = metadata.player_mut(&guid);
                player.wins = Some(wins);
                player.losses = Some(losses);
            }
            metadata.shuffle_rounds = rounds;
        } else {
            metadata.winning_team_id = Some(winning_team);
            metadata.player_death_count = active.deaths.len() as u32;
        }

        vec![Event::MatchEnded {
            session_id: active.session_id,
            timestamp: parsed.timestamp_ms,
            metadata,
        }]
    }

    fn on_combatant(&mut self, parsed: &ParsedLine) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let Some(guid) = parsed.arg(0).filter(|g| !g.is_empty()) else {
            self.parse_errors += 1;
            return;
        };

        let spec_id = parsed.arg(2).and_then(|v| v.parse::<u32>().ok());
        let team_id = parsed.arg(3).and_then(|v| v.parse::<u8>().ok());
        let rating = parsed.arg(4).and_then(|v| v.parse::<u32>().ok());
        let tier = parsed.arg(5).and_then(|v| v.parse::<u32>().ok());

        let guid = guid.to_string();
        let player = active.metadata.player_mut(&guid);
        player.spec_id = spec_id.or(player.spec_id);
        player.team_id = team_id.or(player.team_id);
        player.rating = rating.or(player.rating);
        player.highest_pvp_tier = tier.or(player.highest_pvp_tier);

        if let (Some(tracker), Some(team)) = (active.rounds.as_mut(), team_id) {
            tracker.add_combatant(&guid, team);
        }
    }

    fn on_zone_change(&mut self, parsed: &ParsedLine) -> Vec<Event> {
        let zone_id = parsed.arg(0).and_then(|v| v.parse::<u32>().ok()).unwrap_or(0);
        let zone_name = parsed.arg(1).unwrap_or("").to_string();
        vec![Event::ZoneChange {
            zone_id,
            zone_name,
            timestamp: parsed.timestamp_ms,
            metadata_snapshot: self.snapshot(),
        }]
    }

    fn on_unit_died(&mut self, parsed: &ParsedLine) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let Some(victim) = parsed.arg(4) else {
            return;
        };
        if !is_player_guid(victim) {
            return;
        }

        match active.rounds.as_mut() {
            Some(tracker) => tracker.record_death(victim),
            None => {
                active.deaths.insert(victim.to_string());
                active.metadata.player_death_count = active.deaths.len() as u32;
            }
        }
    }

    /// Opportunistic identity enrichment from any `SPELL_*` source fields.
    fn on_spell(&mut self, parsed: &ParsedLine) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let Some(guid) = parsed.arg(0) else {
            return;
        };
        if !is_player_guid(guid) || active.metadata.player(guid).is_none() {
            return;
        }

        let name_realm = parsed.arg(1).unwrap_or("");
        let flags = parsed
            .arg(2)
            .and_then(|v| v.strip_prefix("0x"))
            .and_then(|v| u64::from_str_radix(v, 16).ok());

        let guid = guid.to_string();
        if let Some((name, realm)) = name_realm.split_once('-') {
            let player = active.metadata.player_mut(&guid);
            if player.name.is_none() && !name.is_empty() {
                player.name = Some(name.to_string());
                player.realm = Some(realm.to_string());
            }
        }

        // The recording player's own actions carry the "mine" affiliation.
        if let Some(flags) = flags {
            if flags & AFFILIATION_MINE != 0 && active.metadata.player_id.is_none() {
                active.metadata.player_id = Some(guid);
            }
        }
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
