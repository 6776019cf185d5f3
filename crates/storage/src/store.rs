// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The metadata store proper.
//!
//! Filename = `<sanitized session id>.json`; the numeric session id prefix
//! makes reverse-lexicographic listing approximate reverse time order,
//! which `list_page` exploits to paginate before parsing.

use crate::error::StoreError;
use crate::validate::validate_record;
use mw_core::{Clock, JobId, MatchHash, SessionId, StoredMatchMetadata, UploadStatus};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Restrict a session id to filename-safe characters (`[A-Za-z0-9_-]`).
pub fn sanitize_key(session_id: &str) -> Result<String, StoreError> {
    let key: String = session_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    if key.is_empty() {
        return Err(StoreError::InvalidKey(session_id.to_string()));
    }
    Ok(key)
}

/// Store configuration.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub storage_directory: PathBuf,
    /// Retention ceiling for metadata files; 0 disables cleanup.
    pub max_files: usize,
}

impl StoreConfig {
    pub fn new(storage_directory: impl Into<PathBuf>) -> Self {
        Self {
            storage_directory: storage_directory.into(),
            max_files: 1000,
        }
    }
}

/// Optional fields merged by [`MetadataStore::update_status`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatusFields {
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub progress_message: Option<String>,
    pub analysis_id: Option<String>,
    pub job_id: Option<JobId>,
}

/// Durable per-session JSON records with per-key serialization.
pub struct MetadataStore<C: Clock> {
    dir: PathBuf,
    max_files: usize,
    clock: C,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl<C: Clock> MetadataStore<C> {
    /// Open (and create) the storage directory, then run a retention sweep.
    pub async fn open(config: StoreConfig, clock: C) -> Result<Self, StoreError> {
        tokio::fs::create_dir_all(&config.storage_directory)
            .await
            .map_err(|source| StoreError::Io {
                path: config.storage_directory.clone(),
                source,
            })?;
        let store = Self {
            dir: config.storage_directory,
            max_files: config.max_files,
            clock,
            locks: Mutex::new(HashMap::new()),
        };
        store.cleanup_old_matches().await?;
        Ok(store)
    }

    fn key_lock(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        Arc::clone(locks.entry(key.to_string()).or_default())
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Validate and atomically persist a record.
    pub async fn save(&self, record: &StoredMatchMetadata) -> Result<(), StoreError> {
        validate_record(record)?;
        let key = sanitize_key(record.session_id.as_str())?;
        let lock = self.key_lock(&key);
        let _guard = lock.lock().await;
        self.write_record(&self.path_for(&key), record).await
    }

    async fn write_record(
        &self,
        path: &Path,
        record: &StoredMatchMetadata,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(record)?;
        let tmp = path.with_extension("json.tmp");

        if let Err(source) = tokio::fs::write(&tmp, &json).await {
            return Err(StoreError::Io { path: tmp, source });
        }

        if let Err(source) = tokio::fs::rename(&tmp, path).await {
            if !is_rename_contention(&source) {
                let _ = tokio::fs::remove_file(&tmp).await;
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
            // Windows-style sharing violation: unlink the target and retry
            // once after a small jitter.
            warn!(path = %path.display(), error = %source, "rename contention, retrying");
            tokio::time::sleep(rename_retry_jitter()).await;
            let _ = tokio::fs::remove_file(path).await;
            if let Err(source) = tokio::fs::rename(&tmp, path).await {
                let _ = tokio::fs::remove_file(&tmp).await;
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }

        debug!(path = %path.display(), "metadata record written");
        Ok(())
    }

    /// Load one record by session id.
    pub async fn load_by_session(
        &self,
        session_id: &SessionId,
    ) -> Result<Option<StoredMatchMetadata>, StoreError> {
        let key = sanitize_key(session_id.as_str())?;
        let path = self.path_for(&key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    /// Scan for the record carrying this match hash.
    pub async fn load_by_match_hash(
        &self,
        hash: &MatchHash,
    ) -> Result<Option<StoredMatchMetadata>, StoreError> {
        self.scan_first(|record| record.match_hash.as_ref() == Some(hash))
            .await
    }

    /// Scan for the record carrying this upload job id.
    pub async fn find_by_job_id(
        &self,
        job_id: &JobId,
    ) -> Result<Option<StoredMatchMetadata>, StoreError> {
        self.scan_first(|record| record.job_id.as_ref() == Some(job_id))
            .await
    }

    async fn scan_first(
        &self,
        pred: impl Fn(&StoredMatchMetadata) -> bool,
    ) -> Result<Option<StoredMatchMetadata>, StoreError> {
        for name in self.record_filenames().await? {
            match self.parse_file(&self.dir.join(&name)).await {
                Ok(record) if pred(&record) => return Ok(Some(record)),
                Ok(_) => {}
                Err(e) => warn!(file = %name, error = %e, "skipping unreadable record"),
            }
        }
        Ok(None)
    }

    /// Page through records, newest first.
    ///
    /// Filenames sort reverse-lexicographically (numeric id prefix ≈ match
    /// time), so pagination happens at the file level and only the page's
    /// files are parsed.
    pub async fn list_page(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<StoredMatchMetadata>, StoreError> {
        let mut names = self.record_filenames().await?;
        names.sort_unstable_by(|a, b| b.cmp(a));

        let mut page = Vec::new();
        for name in names.into_iter().skip(offset).take(limit) {
            match self.parse_file(&self.dir.join(&name)).await {
                Ok(record) => page.push(record),
                Err(e) => warn!(file = %name, error = %e, "skipping unreadable record"),
            }
        }
        Ok(page)
    }

    /// Merge an upload status change into the record carrying `hash`.
    ///
    /// Returns `false` (without touching the disk) when the status and all
    /// provided fields already match.
    pub async fn update_status(
        &self,
        hash: &MatchHash,
        status: UploadStatus,
        fields: StatusFields,
    ) -> Result<bool, StoreError> {
        let lock = self.key_lock(hash.as_str());
        let _guard = lock.lock().await;

        let Some(mut record) = self.load_by_match_hash(hash).await? else {
            debug!(hash = %hash, "update_status: no record for hash");
            return Ok(false);
        };

        let unchanged = record.upload_status == status
            && fields.error_code.as_ref().map_or(true, |v| record.error_code.as_ref() == Some(v))
            && fields
                .error_message
                .as_ref()
                .map_or(true, |v| record.error_message.as_ref() == Some(v))
            && fields
                .progress_message
                .as_ref()
                .map_or(true, |v| record.progress_message.as_ref() == Some(v))
            && fields
                .analysis_id
                .as_ref()
                .map_or(true, |v| record.analysis_id.as_ref() == Some(v))
            && fields.job_id.as_ref().map_or(true, |v| record.job_id.as_ref() == Some(v));
        if unchanged {
            return Ok(false);
        }

        record.upload_status = status;
        if let Some(v) = fields.error_code {
            record.error_code = Some(v);
        }
        if let Some(v) = fields.error_message {
            record.error_message = Some(v);
        }
        if let Some(v) = fields.progress_message {
            record.progress_message = Some(v);
        }
        if let Some(v) = fields.analysis_id {
            record.analysis_id = Some(v);
        }
        if let Some(v) = fields.job_id {
            record.job_id = Some(v);
        }
        if status.is_terminal() {
            record.progress_message = None;
        }
        record.last_updated_at = self.clock.utc_now();

        let key = sanitize_key(record.session_id.as_str())?;
        self.write_record(&self.path_for(&key), &record).await?;
        Ok(true)
    }

    /// Attach video artifacts to a session's record, preserving its upload
    /// status.
    pub async fn update_video_metadata_by_session(
        &self,
        session_id: &SessionId,
        video_path: Option<PathBuf>,
        thumbnail_path: Option<PathBuf>,
    ) -> Result<bool, StoreError> {
        let key = sanitize_key(session_id.as_str())?;
        let lock = self.key_lock(&key);
        let _guard = lock.lock().await;

        let Some(mut record) = self.load_by_session(session_id).await? else {
            return Ok(false);
        };
        if record.video_path == video_path && record.thumbnail_path == thumbnail_path {
            return Ok(false);
        }
        record.video_path = video_path;
        record.thumbnail_path = thumbnail_path;
        record.last_updated_at = self.clock.utc_now();
        self.write_record(&self.path_for(&key), &record).await?;
        Ok(true)
    }

    /// Delete a session's record and its video artifacts.
    ///
    /// Artifacts go first so a crash cannot orphan them; the JSON file is
    /// only removed once they are gone. Returns `false` when an artifact
    /// could not be removed (the metadata is kept so the pointer survives).
    pub async fn delete_by_session(&self, session_id: &SessionId) -> Result<bool, StoreError> {
        let key = sanitize_key(session_id.as_str())?;
        let lock = self.key_lock(&key);
        let _guard = lock.lock().await;

        let path = self.path_for(&key);
        let record = match self.load_by_session(session_id).await? {
            Some(record) => record,
            None => return Ok(false),
        };

        for artifact in [&record.video_path, &record.thumbnail_path].into_iter().flatten() {
            if !artifact.is_absolute() {
                // Relative artifact paths are never unlinked; dropping the
                // record would orphan whatever they point at.
                warn!(path = %artifact.display(), "refusing to delete non-absolute artifact path");
                continue;
            }
            match tokio::fs::remove_file(artifact).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %artifact.display(), error = %e, "artifact delete failed, keeping metadata");
                    return Ok(false);
                }
            }
        }

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                info!(session_id = %session_id, "metadata record deleted");
                Ok(true)
            }
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    /// Retention sweep: keep the newest `max_files` records by match
    /// timestamp, delete the rest (artifacts included).
    pub async fn cleanup_old_matches(&self) -> Result<usize, StoreError> {
        if self.max_files == 0 {
            return Ok(0);
        }

        let mut records: Vec<(u64, SessionId)> = Vec::new();
        for name in self.record_filenames().await? {
            match self.parse_file(&self.dir.join(&name)).await {
                Ok(record) => records.push((record.match_data.timestamp, record.session_id)),
                Err(e) => warn!(file = %name, error = %e, "skipping unreadable record"),
            }
        }
        if records.len() <= self.max_files {
            return Ok(0);
        }

        records.sort_unstable_by(|a, b| b.0.cmp(&a.0));
        let excess: Vec<SessionId> = records.split_off(self.max_files).into_iter().map(|(_, id)| id).collect();

        let mut deleted = 0usize;
        for session_id in excess {
            if self.delete_by_session(&session_id).await? {
                deleted += 1;
            }
        }
        if deleted > 0 {
            info!(deleted, cap = self.max_files, "retention sweep removed old matches");
        }
        Ok(deleted)
    }

    async fn record_filenames(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(|source| StoreError::Io {
            path: self.dir.clone(),
            source,
        })?;
        let mut names = Vec::new();
        loop {
            match entries.next_entry().await {
                Ok(Some(entry)) => {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    if name.ends_with(".json") {
                        names.push(name);
                    }
                }
                Ok(None) => break,
                Err(source) => {
                    return Err(StoreError::Io {
                        path: self.dir.clone(),
                        source,
                    })
                }
            }
        }
        Ok(names)
    }

    async fn parse_file(&self, path: &Path) -> Result<StoredMatchMetadata, StoreError> {
        let bytes = tokio::fs::read(path).await.map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

fn is_rename_contention(e: &std::io::Error) -> bool {
    matches!(
        e.kind(),
        std::io::ErrorKind::PermissionDenied | std::io::ErrorKind::AlreadyExists
    )
}

/// 25–50 ms, seeded off the subsecond clock; enough to get past a scanner
/// holding the target open.
fn rename_retry_jitter() -> Duration {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    Duration::from_millis(25 + (nanos % 26) as u64)
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
