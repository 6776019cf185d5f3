// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Observability counters shared between pipeline components and the host.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Point-in-time view of the pipeline counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountersSnapshot {
    pub lines_processed: u64,
    pub errors_handled: u64,
    /// Epoch ms of the most recent processing pass.
    pub last_processing_ms: u64,
}

/// Cheap shared counters; cloned handles observe the same values.
#[derive(Debug, Clone, Default)]
pub struct PipelineCounters {
    lines_processed: Arc<AtomicU64>,
    errors_handled: Arc<AtomicU64>,
    last_processing_ms: Arc<AtomicU64>,
}

impl PipelineCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_lines(&self, n: u64) {
        self.lines_processed.fetch_add(n, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors_handled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_processing_at(&self, epoch_ms: u64) {
        self.last_processing_ms.store(epoch_ms, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CountersSnapshot {
        CountersSnapshot {
            lines_processed: self.lines_processed.load(Ordering::Relaxed),
            errors_handled: self.errors_handled.load(Ordering::Relaxed),
            last_processing_ms: self.last_processing_ms.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
#[path = "counters_tests.rs"]
mod tests;
