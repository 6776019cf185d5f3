// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline wiring: tailer → parser → chunker → lifecycle.
//!
//! One task owns the parser and chunker for the active file's line stream;
//! handlers run sequentially with respect to that stream. Ordering rule per
//! batch: parser events route to the chunker inline (line order), the raw
//! batch is appended afterwards, and the parser's `match:ended` reaches the
//! lifecycle only after the chunk boundary, so a finalized chunk file is
//! on disk before validation can decide to delete it.

use crate::config::Config;
use crate::lifecycle::Lifecycle;
use crate::recorder::Recorder;
use mw_core::{Clock, CountersSnapshot, EarlyEndTrigger, Event, PipelineCounters};
use mw_engine::chunker::MatchChunker;
use mw_engine::parser::LogParser;
use mw_engine::ChunkError;
use mw_storage::{MetadataStore, StoreError};
use mw_tailer::{LogTailer, TailError, TailerEvent, TailerHandle, TimedLine};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Tail(#[from] TailError),

    #[error(transparent)]
    Chunk(#[from] ChunkError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Everything the pipeline needs besides the [`Config`].
pub struct PipelineConfig<C: Clock, R: Recorder> {
    pub config: Config,
    pub clock: C,
    pub recorder: Arc<R>,
    /// Sink for every typed event the host wants to observe.
    pub events: mpsc::Sender<Event>,
}

/// Running pipeline.
pub struct Pipeline<C: Clock, R: Recorder> {
    lifecycle: Arc<Lifecycle<C, R>>,
    store: Arc<MetadataStore<C>>,
    counters: PipelineCounters,
    tailer_handle: TailerHandle,
    shutdown_tx: watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

impl<C: Clock + 'static, R: Recorder + 'static> Pipeline<C, R> {
    /// Open the store, validate directories, start watching.
    pub async fn start(params: PipelineConfig<C, R>) -> Result<Self, PipelineError> {
        let PipelineConfig {
            config,
            clock,
            recorder,
            events,
        } = params;

        let store = Arc::new(MetadataStore::open(config.store_config(), clock.clone()).await?);
        let lifecycle = Arc::new(Lifecycle::new(
            Arc::clone(&store),
            recorder,
            clock.clone(),
            config.chunk_output_directory.clone(),
            events.clone(),
        ));

        let chunker = MatchChunker::new(config.chunker_config(), clock.clone())?;
        let parser = LogParser::new();

        // The game may not have created the log directory yet.
        if let Err(e) = tokio::fs::create_dir_all(&config.log_directory).await {
            warn!(dir = %config.log_directory.display(), error = %e, "cannot create log directory");
        }

        let counters = PipelineCounters::new();
        let (tailer, tailer_rx) =
            LogTailer::new(config.tailer_config(), clock.clone(), counters.clone());
        tailer.baseline_existing().await?;
        let tailer_handle = tailer.spawn()?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let driver = Driver {
            parser,
            chunker,
            lifecycle: Arc::clone(&lifecycle),
            events,
        };
        let task = tokio::spawn(driver.run(tailer_rx, shutdown_rx));

        info!("match pipeline started");
        Ok(Self {
            lifecycle,
            store,
            counters,
            tailer_handle,
            shutdown_tx,
            task,
        })
    }

    pub fn lifecycle(&self) -> &Arc<Lifecycle<C, R>> {
        &self.lifecycle
    }

    pub fn store(&self) -> &Arc<MetadataStore<C>> {
        &self.store
    }

    pub fn counters(&self) -> CountersSnapshot {
        self.counters.snapshot()
    }

    /// Stop watching, drain in-flight work, force-end open buffers, and
    /// wait for the lifecycle queues to empty.
    pub async fn shutdown(self) {
        info!("pipeline shutting down");
        self.tailer_handle.shutdown().await;
        let _ = self.shutdown_tx.send(true);
        let _ = self.task.await;
        self.lifecycle.drain().await;
        info!("pipeline stopped");
    }
}

/// The single task owning parser + chunker for the active file.
struct Driver<C: Clock, R: Recorder> {
    parser: LogParser,
    chunker: MatchChunker<C>,
    lifecycle: Arc<Lifecycle<C, R>>,
    events: mpsc::Sender<Event>,
}

impl<C: Clock + 'static, R: Recorder + 'static> Driver<C, R> {
    async fn run(
        mut self,
        mut tailer_rx: mpsc::Receiver<TailerEvent>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut tick = tokio::time::interval(Duration::from_secs(1));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                maybe = tailer_rx.recv() => match maybe {
                    Some(event) => self.on_tailer_event(event).await,
                    None => break,
                },
                _ = tick.tick() => {
                    let expired = self.chunker.tick().await;
                    self.route_chunker_events(expired).await;
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        // Shutdown: finish whatever the tailer already delivered, then
        // force the remaining buffers through their terminal.
        while let Ok(event) = tailer_rx.try_recv() {
            self.on_tailer_event(event).await;
        }
        let remaining = self.chunker.force_end_all(EarlyEndTrigger::ProcessStop).await;
        self.route_chunker_events(remaining).await;
        debug!("pipeline driver stopped");
    }

    async fn on_tailer_event(&mut self, event: TailerEvent) {
        match event {
            TailerEvent::Lines { lines, .. } => self.process_batch(&lines).await,
            TailerEvent::Rotated {
                previous_path,
                current_path,
                timestamp_ms,
            } => {
                let snapshot = self.parser.snapshot();
                if previous_path.is_some() {
                    // Mid-stream rotation: whatever was active ends here,
                    // enriched with the parser's last view of it.
                    if let (Some(session_id), Some(metadata)) =
                        (self.parser.active_session().cloned(), snapshot.clone())
                    {
                        self.chunker.attach_snapshot(&session_id, metadata);
                    }
                    let ended = self.chunker.force_end_all(EarlyEndTrigger::LogFileChange).await;
                    self.route_chunker_events(ended).await;
                    self.parser.reset();
                }
                self.emit(Event::LogFileChanged {
                    previous_path,
                    current_path,
                    timestamp: timestamp_ms,
                    metadata_snapshot: snapshot,
                })
                .await;
            }
            TailerEvent::Removed { path } => {
                debug!(path = %path.display(), "tail state dropped");
            }
            TailerEvent::Idle { quiet_for } => {
                warn!(quiet_secs = quiet_for.as_secs(), "no combat log activity");
            }
        }
    }

    async fn process_batch(&mut self, lines: &[TimedLine]) {
        // Parser events route to the chunker in strict line order; proper
        // ends are deferred past the chunk boundary below.
        let mut deferred_ends = Vec::new();
        for line in lines {
            for event in self.parser.handle_line(line) {
                match &event {
                    Event::MatchStarted {
                        session_id,
                        timestamp,
                        zone_id,
                        ..
                    } => {
                        let stale = self
                            .chunker
                            .on_match_started(session_id, *timestamp, *zone_id)
                            .await;
                        self.route_chunker_events(stale).await;
                        self.lifecycle.submit(event.clone()).await;
                    }
                    Event::MatchEnded {
                        session_id,
                        timestamp,
                        metadata,
                    } => {
                        self.chunker.on_match_ended(session_id, *timestamp, metadata);
                        deferred_ends.push(event.clone());
                    }
                    Event::ZoneChange {
                        zone_id,
                        metadata_snapshot,
                        ..
                    } => {
                        let left = self
                            .chunker
                            .on_zone_change(*zone_id, metadata_snapshot.as_ref())
                            .await;
                        self.route_chunker_events(left).await;
                    }
                    _ => {}
                }
                self.emit(event).await;
            }
        }

        let boundary = self.chunker.on_lines(lines).await;

        // The chunk file (if any) is on disk; now the lifecycle may judge.
        for event in deferred_ends {
            self.lifecycle.submit(event).await;
        }
        self.route_chunker_events(boundary).await;
    }

    async fn route_chunker_events(&self, events: Vec<Event>) {
        for event in events {
            self.lifecycle.submit(event.clone()).await;
            self.emit(event).await;
        }
    }

    async fn emit(&self, event: Event) {
        if self.events.send(event).await.is_err() {
            debug!("host event sink closed");
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
