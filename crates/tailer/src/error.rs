// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tailer error taxonomy.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from a single tail pass over one file.
#[derive(Debug, Error)]
pub enum TailError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The unread span exceeds the per-pass memory safety bound.
    #[error("refusing to read {bytes} bytes from {path} (cap {cap})")]
    ReadTooLarge { path: PathBuf, bytes: u64, cap: u64 },

    #[error("failed to watch {path}: {source}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}

impl TailError {
    /// A vanished file is a rotation signal, not a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TailError::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}
