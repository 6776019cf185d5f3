// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! mwd: headless match-watch daemon.
//!
//! Watches the configured combat-log directory, extracts matches, and
//! writes chunk files plus metadata records. The host desktop shell embeds
//! the same pipeline through `mw_daemon::Pipeline`; this binary exists for
//! headless runs and development.

use fs2::FileExt;
use mw_core::SystemClock;
use mw_daemon::pipeline::{Pipeline, PipelineConfig};
use mw_daemon::{env, Config, NoopRecorder};
use std::fs::File;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_tracing(state_dir: &std::path::Path) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match std::fs::create_dir_all(state_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::daily(state_dir, "mwd.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        Err(_) => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
            None
        }
    }
}

/// Exclusive pid-file lock: one daemon per state directory.
fn acquire_lock(state_dir: &std::path::Path) -> std::io::Result<File> {
    let lock_path = state_dir.join("mwd.pid");
    let file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)?;
    file.try_lock_exclusive()?;
    let mut file = file;
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    Ok(file)
}

#[tokio::main]
async fn main() -> ExitCode {
    let Some(state_dir) = env::state_dir() else {
        eprintln!("mwd: no home directory available");
        return ExitCode::FAILURE;
    };
    let _log_guard = init_tracing(&state_dir);

    let _lock = match acquire_lock(&state_dir) {
        Ok(lock) => lock,
        Err(e) => {
            error!(error = %e, "another mwd appears to be running");
            return ExitCode::FAILURE;
        }
    };

    let config = match Config::load(None) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "configuration rejected");
            return ExitCode::FAILURE;
        }
    };
    info!(
        logs = %config.log_directory.display(),
        chunks = %config.chunk_output_directory.display(),
        metadata = %config.metadata_storage_directory.display(),
        "mwd starting"
    );

    let (events_tx, mut events_rx) = mpsc::channel(256);
    let pipeline = match Pipeline::start(PipelineConfig {
        config,
        clock: SystemClock,
        recorder: Arc::new(NoopRecorder),
        events: events_tx,
    })
    .await
    {
        Ok(pipeline) => pipeline,
        Err(e) => {
            error!(error = %e, "pipeline failed to start");
            return ExitCode::FAILURE;
        }
    };

    // Headless event sink: every typed event lands in the log.
    let event_logger = tokio::spawn(async move {
        while let Some(event) = events_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => info!(event = %json, "pipeline event"),
                Err(_) => info!(?event, "pipeline event"),
            }
        }
    });

    shutdown_signal().await;
    info!("shutdown signal received");
    pipeline.shutdown().await;
    event_logger.abort();
    ExitCode::SUCCESS
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = term.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
