// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Round tracking for Solo Shuffle sessions.
//!
//! A shuffle is one session containing six sub-matches. Each
//! `ARENA_MATCH_START` under an active shuffle opens a round; rosters are
//! scoped per round (players swap teams between rounds); the first
//! `UNIT_DIED` in a round fixes its winner and the kill.

use mw_core::ShuffleRound;

#[derive(Debug, Default)]
pub struct ShuffleRoundTracker {
    rounds: Vec<ShuffleRound>,
}

impl ShuffleRoundTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }

    /// Open the next round at `start_ms` with an empty roster.
    pub fn open_round(&mut self, start_ms: u64) {
        let number = self.rounds.len() as u32 + 1;
        self.rounds.push(ShuffleRound {
            round_number: number,
            start_ms,
            end_ms: None,
            duration_s: None,
            winning_team_id: None,
            killed_player_id: None,
            team0_players: Vec::new(),
            team1_players: Vec::new(),
        });
    }

    /// Add a combatant to the current round's roster.
    pub fn add_combatant(&mut self, guid: &str, team_id: u8) {
        let Some(round) = self.rounds.last_mut() else {
            return;
        };
        let roster = if team_id == 0 {
            &mut round.team0_players
        } else {
            &mut round.team1_players
        };
        if !roster.iter().any(|g| g == guid) {
            roster.push(guid.to_string());
        }
    }

    /// Record a death in the current round. Only the first death counts:
    /// it fixes `killed_player_id` and the winning team (the team the
    /// victim is not on).
    pub fn record_death(&mut self, victim_guid: &str) {
        let Some(round) = self.rounds.last_mut() else {
            return;
        };
        if round.killed_player_id.is_some() {
            return;
        }
        round.killed_player_id = Some(victim_guid.to_string());
        round.winning_team_id = if round.team0_players.iter().any(|g| g == victim_guid) {
            Some(1)
        } else if round.team1_players.iter().any(|g| g == victim_guid) {
            Some(0)
        } else {
            // Victim not on either roster: kill recorded, winner unknown.
            None
        };
    }

    /// Close out all rounds at match end.
    ///
    /// Every round ends at the match end wallclock; durations derive from
    /// adjacent round starts (the last round runs to match end).
    pub fn finalize(mut self, match_end_ms: u64) -> Vec<ShuffleRound> {
        let starts: Vec<u64> = self.rounds.iter().map(|r| r.start_ms).collect();
        for (i, round) in self.rounds.iter_mut().enumerate() {
            round.end_ms = Some(match_end_ms);
            let until = starts.get(i + 1).copied().unwrap_or(match_end_ms);
            round.duration_s = Some((until.saturating_sub(round.start_ms) / 1000) as u32);
        }
        self.rounds
    }

    /// Per-player win/loss tallies across tracked rounds.
    ///
    /// A player wins a round when present on the round's winning roster,
    /// loses when present on the other one. Rounds without a known winner
    /// count for no one.
    pub fn tally(rounds: &[ShuffleRound]) -> impl Iterator<Item = (String, u32, u32)> + '_ {
        let mut order: Vec<String> = Vec::new();
        let mut wins: std::collections::HashMap<String, u32> = std::collections::HashMap::new();
        let mut losses: std::collections::HashMap<String, u32> = std::collections::HashMap::new();

        for round in rounds {
            let Some(winner) = round.winning_team_id else {
                continue;
            };
            let (winning, losing) = if winner == 0 {
                (&round.team0_players, &round.team1_players)
            } else {
                (&round.team1_players, &round.team0_players)
            };
            for guid in winning {
                if !order.contains(guid) {
                    order.push(guid.clone());
                }
                *wins.entry(guid.clone()).or_default() += 1;
            }
            for guid in losing {
                if !order.contains(guid) {
                    order.push(guid.clone());
                }
                *losses.entry(guid.clone()).or_default() += 1;
            }
        }

        order.into_iter().map(move |guid| {
            let w = wins.get(&guid).copied().unwrap_or(0);
            let l = losses.get(&guid).copied().unwrap_or(0);
            (guid, w, l)
        })
    }
}

#[cfg(test)]
#[path = "shuffle_tests.rs"]
mod tests;
