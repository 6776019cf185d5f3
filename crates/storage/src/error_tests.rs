// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io;

fn io_error(kind: io::ErrorKind) -> StoreError {
    StoreError::Io {
        path: PathBuf::from("/tmp/x.json"),
        source: io::Error::new(kind, "test"),
    }
}

#[test]
fn not_found_is_transient() {
    assert!(io_error(io::ErrorKind::NotFound).is_transient());
}

#[test]
fn permission_denied_is_transient() {
    assert!(io_error(io::ErrorKind::PermissionDenied).is_transient());
}

#[test]
fn ebusy_is_transient() {
    let err = StoreError::Io {
        path: PathBuf::from("/tmp/x.json"),
        source: io::Error::from_raw_os_error(16),
    };
    #[cfg(unix)]
    assert!(err.is_transient());
    #[cfg(not(unix))]
    let _ = err;
}

#[test]
fn other_io_errors_are_permanent() {
    assert!(!io_error(io::ErrorKind::UnexpectedEof).is_transient());
    assert!(!io_error(io::ErrorKind::OutOfMemory).is_transient());
}

#[test]
fn validation_errors_are_permanent() {
    assert!(!StoreError::Validation("bad".to_string()).is_transient());
    assert!(!StoreError::InvalidKey("///".to_string()).is_transient());
}
