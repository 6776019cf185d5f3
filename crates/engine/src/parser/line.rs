// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Combat-log line splitting.
//!
//! Payloads are comma-separated with double-quoted string fields; commas
//! inside quotes belong to the field. Quotes are stripped from the stored
//! argument.

use mw_tailer::timestamp::split_timestamp;

/// One split combat-log line: the leading event token and its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    pub timestamp_ms: u64,
    pub event_type: String,
    pub args: Vec<String>,
}

impl ParsedLine {
    /// Split a raw line into event token and arguments.
    ///
    /// Returns `None` when the line has no timestamp separator or an empty
    /// payload; such lines are opaque to the parser but still buffer as
    /// chunk content.
    pub fn parse(raw: &str, timestamp_ms: u64) -> Option<Self> {
        let (_, payload) = split_timestamp(raw)?;
        let mut fields = split_quoted_csv(payload);
        if fields.is_empty() {
            return None;
        }
        let event_type = fields.remove(0);
        if event_type.is_empty() {
            return None;
        }
        Some(Self {
            timestamp_ms,
            event_type,
            args: fields,
        })
    }

    pub fn arg(&self, idx: usize) -> Option<&str> {
        self.args.get(idx).map(String::as_str)
    }
}

/// Split on commas, preserving commas inside double-quoted fields.
pub fn split_quoted_csv(payload: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in payload.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
#[path = "line_tests.rs"]
mod tests;
