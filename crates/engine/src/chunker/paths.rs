// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Output-directory validation.
//!
//! The chunk output directory comes from configuration, which may cross a
//! trust boundary (IPC from the host shell). Traversal and expansion
//! tricks are rejected at construction, before any file is written.

use super::ChunkError;
use std::path::{Component, Path, PathBuf};

/// Validate and absolutize the chunk output directory.
///
/// Rejects null bytes, `..` components, and `~` expansion. When
/// `allowed_roots` is non-empty the resolved path must live beneath one of
/// them.
pub fn validate_output_directory(
    dir: &Path,
    allowed_roots: &[PathBuf],
) -> Result<PathBuf, ChunkError> {
    let display = dir.to_string_lossy();
    if display.contains('\0') {
        return Err(ChunkError::InvalidOutputDir {
            path: dir.to_path_buf(),
            reason: "contains null byte".to_string(),
        });
    }
    if display.starts_with('~') {
        return Err(ChunkError::InvalidOutputDir {
            path: dir.to_path_buf(),
            reason: "tilde expansion is not supported".to_string(),
        });
    }
    if dir.components().any(|c| matches!(c, Component::ParentDir)) {
        return Err(ChunkError::InvalidOutputDir {
            path: dir.to_path_buf(),
            reason: "parent-directory traversal".to_string(),
        });
    }

    let resolved = std::path::absolute(dir).map_err(|source| ChunkError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    if !allowed_roots.is_empty() {
        let permitted = allowed_roots.iter().any(|root| {
            std::path::absolute(root)
                .map(|r| resolved.starts_with(&r))
                .unwrap_or(false)
        });
        if !permitted {
            return Err(ChunkError::InvalidOutputDir {
                path: dir.to_path_buf(),
                reason: "outside allowed output roots".to_string(),
            });
        }
    }

    Ok(resolved)
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
