// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;

#[test]
fn plain_absolute_dir_passes() {
    let dir = TempDir::new().unwrap();
    let resolved = validate_output_directory(dir.path(), &[]).unwrap();
    assert!(resolved.is_absolute());
}

#[test]
fn relative_dir_is_absolutized() {
    let resolved = validate_output_directory(Path::new("chunks"), &[]).unwrap();
    assert!(resolved.is_absolute());
    assert!(resolved.ends_with("chunks"));
}

#[test]
fn traversal_is_rejected() {
    let err = validate_output_directory(Path::new("/data/../etc"), &[]).unwrap_err();
    assert!(matches!(err, ChunkError::InvalidOutputDir { .. }));
}

#[test]
fn tilde_is_rejected() {
    let err = validate_output_directory(Path::new("~/chunks"), &[]).unwrap_err();
    assert!(matches!(err, ChunkError::InvalidOutputDir { .. }));
}

#[test]
fn null_byte_is_rejected() {
    let err = validate_output_directory(Path::new("/data/\0/chunks"), &[]).unwrap_err();
    assert!(matches!(err, ChunkError::InvalidOutputDir { .. }));
}

#[test]
fn allow_list_admits_paths_beneath_roots() {
    let root = TempDir::new().unwrap();
    let target = root.path().join("output");
    let roots = vec![root.path().to_path_buf()];

    assert!(validate_output_directory(&target, &roots).is_ok());
}

#[test]
fn allow_list_rejects_outside_paths() {
    let root = TempDir::new().unwrap();
    let other = TempDir::new().unwrap();
    let roots = vec![root.path().to_path_buf()];

    let err = validate_output_directory(other.path(), &roots).unwrap_err();
    assert!(matches!(err, ChunkError::InvalidOutputDir { .. }));
}
