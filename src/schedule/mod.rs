//! Timer-driven scheduling for the mapping and transcription sweeps.
//!
//! Two independent periodic cadences drive the two stages; analysis runs
//! on demand only. Each job type carries a single-flight guard so an
//! overlapping tick (or a manual trigger racing a timer) skips instead of
//! doing redundant work.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::Mutex;

use crate::domain::CallRecord;
use crate::error::PipelineError;
use crate::ingest::Mapper;
use crate::transcribe::Transcriber;

/// Cadences and per-sweep limits.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub map_interval: Duration,
    pub map_limit: usize,
    pub transcribe_interval: Duration,
    pub transcribe_limit: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            map_interval: Duration::from_secs(10),
            map_limit: 50,
            transcribe_interval: Duration::from_secs(600),
            transcribe_limit: 20,
        }
    }
}

/// Result of a triggered sweep.
#[derive(Debug)]
pub enum SweepOutcome {
    /// The sweep ran; contains the records it processed.
    Completed(Vec<CallRecord>),

    /// Another sweep of the same job type was already in flight.
    Skipped,
}

impl SweepOutcome {
    pub fn records(&self) -> &[CallRecord] {
        match self {
            Self::Completed(records) => records,
            Self::Skipped => &[],
        }
    }
}

/// Drives the mapper and transcriber on their cadences and exposes the
/// equivalent manual triggers through the same guards.
pub struct Scheduler {
    mapper: Arc<Mapper>,
    transcriber: Arc<Transcriber>,
    config: ScheduleConfig,
    map_guard: Mutex<()>,
    transcribe_guard: Mutex<()>,
}

impl Scheduler {
    pub fn new(mapper: Arc<Mapper>, transcriber: Arc<Transcriber>, config: ScheduleConfig) -> Self {
        Self {
            mapper,
            transcriber,
            config,
            map_guard: Mutex::new(()),
            transcribe_guard: Mutex::new(()),
        }
    }

    /// Trigger a mapping sweep, skipping if one is already in flight.
    pub async fn run_mapping(&self, limit: usize) -> Result<SweepOutcome, PipelineError> {
        let Ok(_token) = self.map_guard.try_lock() else {
            tracing::info!("mapping sweep already in progress, skipping");
            return Ok(SweepOutcome::Skipped);
        };

        let mapped = self.mapper.map_latest_files(limit).await?;
        Ok(SweepOutcome::Completed(mapped))
    }

    /// Trigger a transcription sweep, skipping if one is already in flight.
    pub async fn run_transcription(&self, limit: usize) -> Result<SweepOutcome, PipelineError> {
        let Ok(_token) = self.transcribe_guard.try_lock() else {
            tracing::info!("transcription sweep already in progress, skipping");
            return Ok(SweepOutcome::Skipped);
        };

        let transcribed = self.transcriber.transcribe_mapped_files(limit).await?;
        Ok(SweepOutcome::Completed(transcribed))
    }

    /// Run both cadences until Ctrl+C.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        tracing::info!(
            "scheduler started (map every {:?}, transcribe every {:?})",
            self.config.map_interval,
            self.config.transcribe_interval
        );

        let map_task = {
            let scheduler = self.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(scheduler.config.map_interval);
                loop {
                    interval.tick().await;
                    match scheduler.run_mapping(scheduler.config.map_limit).await {
                        Ok(SweepOutcome::Completed(records)) if !records.is_empty() => {
                            tracing::info!("scheduled mapping processed {} file(s)", records.len());
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!("scheduled mapping failed: {}", e),
                    }
                }
            })
        };

        let transcribe_task = {
            let scheduler = self.clone();
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(scheduler.config.transcribe_interval);
                loop {
                    interval.tick().await;
                    match scheduler
                        .run_transcription(scheduler.config.transcribe_limit)
                        .await
                    {
                        Ok(SweepOutcome::Completed(records)) if !records.is_empty() => {
                            tracing::info!(
                                "scheduled transcription processed {} record(s)",
                                records.len()
                            );
                        }
                        Ok(_) => {}
                        Err(e) => tracing::error!("scheduled transcription failed: {}", e),
                    }
                }
            })
        };

        tokio::signal::ctrl_c().await?;
        tracing::info!("scheduler stopping");
        map_task.abort();
        transcribe_task.abort();

        Ok(())
    }
}
