// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Recorder collaborator adapter.
//!
//! The video recorder lives outside the core; the lifecycle only tells it
//! when matches begin and end. Failures here are always best-effort: they
//! are logged and never affect match state.

use async_trait::async_trait;
use mw_core::SessionId;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("recorder failure: {0}")]
pub struct RecorderError(pub String);

/// Adapter to the host's video recorder.
#[async_trait]
pub trait Recorder: Send + Sync {
    async fn start_recording(&self, session_id: &SessionId) -> Result<(), RecorderError>;
    async fn stop_recording(&self, session_id: &SessionId) -> Result<(), RecorderError>;
}

/// Recorder that does nothing (headless runs, tests).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRecorder;

#[async_trait]
impl Recorder for NoopRecorder {
    async fn start_recording(&self, _session_id: &SessionId) -> Result<(), RecorderError> {
        Ok(())
    }

    async fn stop_recording(&self, _session_id: &SessionId) -> Result<(), RecorderError> {
        Ok(())
    }
}
