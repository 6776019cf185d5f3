// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic chunk-file writes.

use super::ChunkError;
use mw_core::SessionId;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Write `<session_id>.txt` atomically: temp file in the same directory,
/// then rename onto the final path.
///
/// Content is the optional combat-log header followed by the buffered
/// lines, `\n`-joined, with no trailing newline.
pub async fn write_chunk(
    dir: &Path,
    session_id: &SessionId,
    header: Option<&str>,
    lines: &[String],
) -> Result<(PathBuf, u64), ChunkError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| ChunkError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

    let final_path = dir.join(format!("{}.txt", session_id));
    let tmp_path = dir.join(format!("{}.txt.tmp", session_id));

    let mut content = String::new();
    if let Some(header) = header {
        content.push_str(header);
    }
    for line in lines {
        if !content.is_empty() {
            content.push('\n');
        }
        content.push_str(line);
    }

    let write_result = async {
        let mut file = tokio::fs::File::create(&tmp_path).await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;
        tokio::fs::rename(&tmp_path, &final_path).await
    }
    .await;

    if let Err(source) = write_result {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(ChunkError::Io {
            path: final_path,
            source,
        });
    }

    Ok((final_path, content.len() as u64))
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod tests;
