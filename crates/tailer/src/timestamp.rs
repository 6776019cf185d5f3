// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Combat-log timestamp parsing.
//!
//! Each line opens with `M/D/YYYY HH:MM:SS.mmm` followed by two spaces and
//! the event payload. Month and day are not zero-padded.

use chrono::NaiveDateTime;

const LOG_TIMESTAMP_FORMAT: &str = "%m/%d/%Y %H:%M:%S%.3f";

/// Parse the timestamp prefix of a combat-log line into epoch milliseconds.
///
/// Returns `None` when the line does not open with a well-formed timestamp;
/// such lines still flow downstream as opaque payload, stamped with the
/// wall clock by the caller.
pub fn parse_line_timestamp(line: &str) -> Option<u64> {
    let (prefix, _) = line.split_once("  ")?;
    let dt = NaiveDateTime::parse_from_str(prefix, LOG_TIMESTAMP_FORMAT).ok()?;
    let ms = dt.and_utc().timestamp_millis();
    u64::try_from(ms).ok()
}

/// Split a combat-log line into its timestamp prefix and event payload.
pub fn split_timestamp(line: &str) -> Option<(&str, &str)> {
    line.split_once("  ")
}

#[cfg(test)]
#[path = "timestamp_tests.rs"]
mod tests;
