// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;

/// Resolve state directory: MW_STATE_DIR > XDG_STATE_HOME/mw > ~/.local/state/mw
pub fn state_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var("MW_STATE_DIR") {
        return Some(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Some(PathBuf::from(xdg).join("mw"));
    }
    dirs::home_dir().map(|home| home.join(".local/state/mw"))
}

/// Combat-log directory override.
pub fn log_directory() -> Option<PathBuf> {
    std::env::var("MW_LOG_DIR").ok().map(PathBuf::from)
}

/// Chunk output directory override.
pub fn chunk_output_directory() -> Option<PathBuf> {
    std::env::var("MW_CHUNK_DIR").ok().map(PathBuf::from)
}

/// Metadata storage directory override.
pub fn metadata_storage_directory() -> Option<PathBuf> {
    std::env::var("MW_METADATA_DIR").ok().map(PathBuf::from)
}

/// Config file override.
pub fn config_path() -> Option<PathBuf> {
    std::env::var("MW_CONFIG").ok().map(PathBuf::from)
}
