// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration.
//!
//! Values come from `mw.toml` in the state directory (all keys optional),
//! overridden by `MW_*` environment variables. Path security (traversal,
//! null bytes, tilde, allow-list roots) is enforced at load time so the
//! pipeline never constructs against an unvalidated directory.

use crate::env;
use mw_engine::chunker::{validate_output_directory, ChunkerConfig};
use mw_storage::StoreConfig;
use mw_tailer::TailerConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("no home directory available to derive default paths")]
    NoHome,

    #[error(transparent)]
    InvalidOutputDir(#[from] mw_engine::ChunkError),
}

/// Raw file shape; every key optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    log_directory: Option<PathBuf>,
    chunk_output_directory: Option<PathBuf>,
    allowed_output_roots: Option<Vec<PathBuf>>,
    metadata_storage_directory: Option<PathBuf>,
    max_match_files: Option<usize>,
    min_match_lines: Option<usize>,
    max_match_lines: Option<usize>,
    inactivity_timeout_ms: Option<u64>,
    timeout_minutes: Option<u64>,
}

/// Resolved daemon configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory watched for `WoWCombatLog*.txt`.
    pub log_directory: PathBuf,
    /// Destination for `<session_id>.txt` chunk files (validated).
    pub chunk_output_directory: PathBuf,
    pub allowed_output_roots: Vec<PathBuf>,
    /// Destination for `<session_id>.json` metadata records.
    pub metadata_storage_directory: PathBuf,
    /// Retention ceiling for metadata files; 0 = unlimited.
    pub max_match_files: usize,
    pub min_match_lines: usize,
    pub max_match_lines: usize,
    pub inactivity_timeout: Duration,
    /// Whole-pipeline inactivity reporting threshold.
    pub idle_timeout: Duration,
}

impl Config {
    /// Load from an explicit path, or the default `mw.toml` under the state
    /// directory when `path` is `None` (a missing file means defaults).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let state_dir = env::state_dir().ok_or(ConfigError::NoHome)?;
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => env::config_path().unwrap_or_else(|| state_dir.join("mw.toml")),
        };

        let file = if config_path.exists() {
            let text = std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
                path: config_path.clone(),
                source,
            })?;
            toml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: config_path.clone(),
                source,
            })?
        } else {
            ConfigFile::default()
        };

        let log_directory = env::log_directory()
            .or(file.log_directory)
            .or_else(default_log_directory)
            .ok_or(ConfigError::NoHome)?;
        let chunk_output_directory = env::chunk_output_directory()
            .or(file.chunk_output_directory)
            .unwrap_or_else(|| state_dir.join("chunks"));
        let metadata_storage_directory = env::metadata_storage_directory()
            .or(file.metadata_storage_directory)
            .unwrap_or_else(|| state_dir.join("logs/matches"));
        let allowed_output_roots = file.allowed_output_roots.unwrap_or_default();

        // Fail configuration, not runtime: the chunk directory is checked
        // here even though the chunker re-validates at construction.
        let chunk_output_directory =
            validate_output_directory(&chunk_output_directory, &allowed_output_roots)?;

        Ok(Self {
            log_directory,
            chunk_output_directory,
            allowed_output_roots,
            metadata_storage_directory,
            max_match_files: file.max_match_files.unwrap_or(1000),
            min_match_lines: file.min_match_lines.unwrap_or(20),
            max_match_lines: file.max_match_lines.unwrap_or(200_000),
            inactivity_timeout: Duration::from_millis(file.inactivity_timeout_ms.unwrap_or(1_800_000)),
            idle_timeout: Duration::from_secs(file.timeout_minutes.unwrap_or(10) * 60),
        })
    }

    pub fn tailer_config(&self) -> TailerConfig {
        let mut config = TailerConfig::new(&self.log_directory);
        config.idle_timeout = self.idle_timeout;
        config
    }

    pub fn chunker_config(&self) -> ChunkerConfig {
        let mut config = ChunkerConfig::new(&self.chunk_output_directory);
        config.allowed_output_roots = self.allowed_output_roots.clone();
        config.min_match_lines = self.min_match_lines;
        config.max_match_lines = self.max_match_lines;
        config.inactivity_timeout = self.inactivity_timeout;
        config
    }

    pub fn store_config(&self) -> StoreConfig {
        let mut config = StoreConfig::new(&self.metadata_storage_directory);
        config.max_files = self.max_match_files;
        config
    }
}

/// The game writes combat logs under the user's documents folder.
fn default_log_directory() -> Option<PathBuf> {
    dirs::document_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Documents")))
        .map(|docs| docs.join("World of Warcraft/_retail_/Logs"))
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
