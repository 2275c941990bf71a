//! JSONL-backed record store.
//!
//! Follows the append-only pattern: every upsert appends the full record as
//! one JSON line, and current state is derived by replay with the latest
//! line winning per record id. All selection queries are computed over the
//! replayed state.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::domain::CallRecord;

/// Errors that can occur with the record store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Aggregate counters surfaced to operators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecordStats {
    pub total: usize,
    pub transcribed: usize,
    pub analyzed: usize,
    pub pending_analysis: usize,
    pub successful_sales: usize,
    pub failed_sales: usize,
}

/// Append-only record store keyed by record id.
pub struct RecordStore {
    store_path: PathBuf,
}

impl RecordStore {
    pub fn new(store_path: PathBuf) -> Self {
        Self { store_path }
    }

    /// Open a store, creating the parent directory if needed.
    pub async fn open(store_path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = store_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(Self::new(store_path))
    }

    pub fn path(&self) -> &Path {
        &self.store_path
    }

    /// Persist a record snapshot. Appending the same id again replaces the
    /// previous state on replay, which makes overwrites naturally idempotent.
    pub async fn upsert(&self, record: &CallRecord) -> Result<(), StoreError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.store_path)
            .await?;

        let json = serde_json::to_string(record)?;
        file.write_all(format!("{}\n", json).as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }

    /// Replay all snapshots to build current state (latest wins per id).
    pub async fn replay(&self) -> Result<HashMap<String, CallRecord>, StoreError> {
        let mut records: HashMap<String, CallRecord> = HashMap::new();

        if !self.store_path.exists() {
            return Ok(records);
        }

        let file = File::open(&self.store_path).await?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let record: CallRecord = serde_json::from_str(&line)?;
            records.insert(record.id.clone(), record);
        }

        Ok(records)
    }

    /// Look up a record by id.
    pub async fn get(&self, id: &str) -> Result<CallRecord, StoreError> {
        let records = self.replay().await?;
        records
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// Look up a record by its current file path (the upsert key used by
    /// the mapper).
    pub async fn find_by_path(&self, path: &Path) -> Result<Option<CallRecord>, StoreError> {
        let records = self.replay().await?;
        Ok(records.into_values().find(|r| r.file == path))
    }

    /// The scan watermark: maximum parsed timestamp among mapped records,
    /// 0 if none exist.
    pub async fn max_mapped_timestamp(&self) -> Result<i64, StoreError> {
        let records = self.replay().await?;
        Ok(records
            .values()
            .filter_map(|r| r.timestamp)
            .max()
            .unwrap_or(0))
    }

    /// Records that still need transcription (tri-state: false, or flag
    /// absent), newest first.
    pub async fn untranscribed(&self, limit: usize) -> Result<Vec<CallRecord>, StoreError> {
        let records = self.replay().await?;
        let mut selected: Vec<CallRecord> = records
            .into_values()
            .filter(|r| r.needs_transcription())
            .collect();

        selected.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        selected.truncate(limit);
        Ok(selected)
    }

    /// Records with a transcript but no outcome yet.
    pub async fn pending_analysis(&self, limit: usize) -> Result<Vec<CallRecord>, StoreError> {
        let records = self.replay().await?;
        let mut selected: Vec<CallRecord> = records
            .into_values()
            .filter(|r| r.needs_analysis())
            .collect();

        selected.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        selected.truncate(limit);
        Ok(selected)
    }

    /// Records with a non-empty transcript, newest first.
    pub async fn transcribed(&self, limit: usize) -> Result<Vec<CallRecord>, StoreError> {
        let records = self.replay().await?;
        let mut selected: Vec<CallRecord> = records
            .into_values()
            .filter(|r| !r.transcription.is_empty())
            .collect();

        selected.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        selected.truncate(limit);
        Ok(selected)
    }

    /// All records, newest first.
    pub async fn all(&self, limit: usize) -> Result<Vec<CallRecord>, StoreError> {
        let records = self.replay().await?;
        let mut selected: Vec<CallRecord> = records.into_values().collect();

        selected.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        selected.truncate(limit);
        Ok(selected)
    }

    /// Aggregate counters over the whole collection.
    pub async fn stats(&self) -> Result<RecordStats, StoreError> {
        let records = self.replay().await?;

        let mut stats = RecordStats::default();
        for record in records.values() {
            stats.total += 1;
            if !record.transcription.is_empty() {
                stats.transcribed += 1;
            }
            match &record.outcome {
                Some(outcome) => {
                    stats.analyzed += 1;
                    if outcome.success_sell {
                        stats.successful_sales += 1;
                    } else {
                        stats.failed_sales += 1;
                    }
                }
                None => {
                    if record.needs_analysis() {
                        stats.pending_analysis += 1;
                    }
                }
            }
        }

        Ok(stats)
    }
}
