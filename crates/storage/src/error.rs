// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store error taxonomy with transient/permanent classification.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from metadata store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid record: {0}")]
    Validation(String),

    #[error("session id {0:?} sanitizes to an empty key")]
    InvalidKey(String),
}

/// EBUSY has no stable `ErrorKind`; match the raw errno.
#[cfg(unix)]
const EBUSY: i32 = 16;
#[cfg(not(unix))]
const EBUSY: i32 = 32; // ERROR_SHARING_VIOLATION

impl StoreError {
    /// Transient errors (`EBUSY`, `EPERM`, `ENOENT`) never raise beyond a
    /// warning; everything else is treated as permanent for the key.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Io { source, .. } => {
                matches!(
                    source.kind(),
                    std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied
                ) || source.raw_os_error() == Some(EBUSY)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
