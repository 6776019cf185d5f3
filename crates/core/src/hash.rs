// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Match fingerprinting.
//!
//! A [`MatchHash`] exists only for matches that reached the `complete`
//! terminal state. It is stable across machines observing the same match:
//! the preimage is the start timestamp plus the sorted player GUIDs, so two
//! clients in the same arena derive the same hash.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// 64-hex-character SHA-256 fingerprint of a completed match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchHash(pub String);

impl MatchHash {
    /// Compute the fingerprint from the match start time and player GUIDs.
    ///
    /// GUIDs are sorted before hashing so combatant discovery order does not
    /// change the result.
    pub fn compute(start_ms: u64, player_ids: &[String]) -> Self {
        let mut ids: Vec<&str> = player_ids.iter().map(String::as_str).collect();
        ids.sort_unstable();

        let mut hasher = Sha256::new();
        hasher.update(start_ms.to_string().as_bytes());
        hasher.update(b":");
        hasher.update(ids.join(",").as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the string is a well-formed fingerprint (64 lowercase hex chars).
    pub fn is_well_formed(&self) -> bool {
        self.0.len() == 64 && self.0.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
    }
}

impl std::fmt::Display for MatchHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for MatchHash {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MatchHash {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
#[path = "hash_tests.rs"]
mod tests;
