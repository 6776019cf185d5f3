// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn counters_accumulate() {
    let counters = PipelineCounters::new();
    counters.record_lines(10);
    counters.record_lines(5);
    counters.record_error();

    let snap = counters.snapshot();
    assert_eq!(snap.lines_processed, 15);
    assert_eq!(snap.errors_handled, 1);
}

#[test]
fn clones_observe_same_values() {
    let counters = PipelineCounters::new();
    let handle = counters.clone();
    handle.record_lines(7);
    handle.record_processing_at(1_000_000);

    let snap = counters.snapshot();
    assert_eq!(snap.lines_processed, 7);
    assert_eq!(snap.last_processing_ms, 1_000_000);
}

#[test]
fn snapshot_is_detached() {
    let counters = PipelineCounters::new();
    counters.record_lines(1);
    let snap = counters.snapshot();
    counters.record_lines(1);
    assert_eq!(snap.lines_processed, 1);
}
