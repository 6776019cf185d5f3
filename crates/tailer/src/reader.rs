// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single bounded read pass over one watched file.

use crate::error::TailError;
use crate::lines::{LineAssembler, TimedLine};
use crate::timestamp::parse_line_timestamp;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use tracing::warn;

/// Per-pass read cap. A span larger than this fails the pass rather than
/// ballooning memory; the position is left untouched so a later pass can
/// retry after investigation.
pub const MAX_READ_BYTES: u64 = 100 * 1024 * 1024;

/// Tail state for one watched file.
#[derive(Debug, Default)]
pub struct FilePosition {
    /// Next unread byte offset.
    pub byte_position: u64,
    /// Unterminated tail carried between passes.
    pub assembler: LineAssembler,
}

/// Outcome of one read pass.
#[derive(Debug)]
pub struct ReadOutcome {
    pub lines: Vec<TimedLine>,
    /// File size observed at the start of the pass.
    pub size: u64,
}

/// Read every byte between the stored position and the current file size,
/// returning the complete lines that span closed.
///
/// Lines whose timestamp prefix fails to parse are stamped with
/// `fallback_now_ms` and passed through as opaque payload.
pub fn read_pass(
    path: &Path,
    pos: &mut FilePosition,
    fallback_now_ms: u64,
) -> Result<ReadOutcome, TailError> {
    let io_err = |source| TailError::Io {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(io_err)?;
    let size = file.metadata().map_err(io_err)?.len();

    if size < pos.byte_position {
        // Truncated in place. Restart from the new end; the bytes that
        // vanished were already delivered.
        warn!(path = %path.display(), old = pos.byte_position, new = size, "file shrank, rebasing");
        pos.byte_position = size;
        pos.assembler.reset();
        return Ok(ReadOutcome { lines: Vec::new(), size });
    }

    let bytes_to_read = size - pos.byte_position;
    if bytes_to_read == 0 {
        return Ok(ReadOutcome { lines: Vec::new(), size });
    }
    if bytes_to_read > MAX_READ_BYTES {
        return Err(TailError::ReadTooLarge {
            path: path.to_path_buf(),
            bytes: bytes_to_read,
            cap: MAX_READ_BYTES,
        });
    }

    file.seek(SeekFrom::Start(pos.byte_position)).map_err(io_err)?;
    let mut buf = vec![0u8; bytes_to_read as usize];
    file.read_exact(&mut buf).map_err(io_err)?;
    pos.byte_position = size;

    let chunk = String::from_utf8_lossy(&buf);
    let lines = pos
        .assembler
        .push(&chunk)
        .into_iter()
        .map(|raw| {
            let timestamp_ms = parse_line_timestamp(&raw).unwrap_or(fallback_now_ms);
            TimedLine { raw, timestamp_ms }
        })
        .collect();

    Ok(ReadOutcome { lines, size })
}

#[cfg(test)]
#[path = "reader_tests.rs"]
mod tests;
