//! Mapping sweep: scan → parse → dedup by watermark → persist → relocate.
//!
//! Persistence is deliberately decoupled from relocation: a crash between
//! the two leaves a record that is retried on the next sweep, at the cost
//! of a possible duplicate move attempt, which is treated as a skip.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tokio::fs;

use crate::domain::CallRecord;
use crate::error::PipelineError;
use crate::store::RecordStore;

use super::filename::parse_recording_name;
use super::scanner::{scan_audio_files, AUDIO_EXTENSIONS};

/// Maps raw recordings from the watch directory into persisted records.
pub struct Mapper {
    store: Arc<RecordStore>,
    inbox: PathBuf,
    processed: PathBuf,
}

impl Mapper {
    pub fn new(store: Arc<RecordStore>, inbox: PathBuf, processed: PathBuf) -> Self {
        Self {
            store,
            inbox,
            processed,
        }
    }

    /// Map up to `limit` new recordings, newest modification first.
    ///
    /// Returns the records processed in this call, whether or not their
    /// file move succeeded.
    pub async fn map_latest_files(&self, limit: usize) -> Result<Vec<CallRecord>, PipelineError> {
        let watermark = self.store.max_mapped_timestamp().await?;
        tracing::debug!(watermark, "starting mapping sweep");

        let mut candidates = scan_audio_files(&self.inbox, AUDIO_EXTENSIONS).await?;
        candidates.sort_by(|a, b| b.modified.cmp(&a.modified));
        candidates.truncate(limit);

        let mut mapped = Vec::new();

        for candidate in candidates {
            let parsed = match parse_recording_name(&candidate.path) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!("skipping {}: {}", candidate.path.display(), e);
                    continue;
                }
            };

            if parsed.caller_id.is_empty() {
                tracing::warn!("skipping {}: empty caller id", candidate.path.display());
                continue;
            }

            if parsed.timestamp <= watermark {
                tracing::debug!(
                    "skipping {}: timestamp {} <= watermark {}",
                    candidate.path.display(),
                    parsed.timestamp,
                    watermark
                );
                continue;
            }

            // Upsert by file path: update parsed fields in place, or create
            // a fresh record with an empty transcription.
            let mut record = match self.store.find_by_path(&candidate.path).await? {
                Some(mut existing) => {
                    existing.timestamp = Some(parsed.timestamp);
                    existing.caller_id = parsed.caller_id;
                    existing.record_type = parsed.record_type;
                    existing.target_name = Some(parsed.target_name);
                    existing.target_number = Some(parsed.target_number);
                    existing.touch();
                    existing
                }
                None => {
                    let mut record = CallRecord::new(&candidate.path, parsed.caller_id);
                    record.record_type = parsed.record_type;
                    record.timestamp = Some(parsed.timestamp);
                    record.target_name = Some(parsed.target_name);
                    record.target_number = Some(parsed.target_number);
                    record
                }
            };

            // A failed persist affects only this file: leave it in the inbox
            // and let the next sweep retry it.
            if let Err(e) = self.store.upsert(&record).await {
                tracing::error!("failed to persist {}: {}", candidate.path.display(), e);
                continue;
            }

            // Relocate after the record is safely persisted. On failure the
            // pre-move path is kept and the file is picked up again later.
            match self.move_to_processed(&candidate.path).await {
                Ok(new_path) => {
                    record.file = new_path;
                    record.touch();
                    // The stored path goes stale if this fails; downstream
                    // stages treat the missing file as retryable.
                    match self.store.upsert(&record).await {
                        Ok(()) => tracing::info!("mapped and moved {}", record.file.display()),
                        Err(e) => tracing::error!(
                            "moved {} but failed to persist the new path: {}",
                            record.file.display(),
                            e
                        ),
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "mapped {} but could not move it: {}",
                        candidate.path.display(),
                        e
                    );
                }
            }

            mapped.push(record);
        }

        tracing::info!("mapping sweep processed {} file(s)", mapped.len());
        Ok(mapped)
    }

    /// Move a recording into the processed directory (created on demand).
    ///
    /// If the source is already gone but the destination exists, a previous
    /// attempt won the race; treat it as done.
    async fn move_to_processed(&self, source: &Path) -> Result<PathBuf, PipelineError> {
        fs::create_dir_all(&self.processed).await?;

        let filename = source.file_name().ok_or_else(|| {
            PipelineError::Configuration(format!("no file name in {}", source.display()))
        })?;
        let destination = self.processed.join(filename);

        if !source.exists() && destination.exists() {
            return Ok(destination);
        }

        fs::rename(source, &destination).await?;
        Ok(destination)
    }
}
