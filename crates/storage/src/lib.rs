// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mw-storage: durable JSON-per-match metadata records.
//!
//! One file per session under the storage directory, written atomically,
//! mutated under a per-key lock. Scans rehydrate ISO-8601 dates through
//! serde on every read.

pub mod error;
pub mod store;
pub mod validate;

pub use error::StoreError;
pub use store::{sanitize_key, MetadataStore, StatusFields, StoreConfig};
pub use validate::validate_record;
