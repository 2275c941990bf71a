//! Speech-to-text stage.
//!
//! The engine sits behind a trait so sweeps can be tested with a mock;
//! the production implementation is the Whisper HTTP API.

pub mod whisper;

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::CallRecord;
use crate::error::PipelineError;
use crate::ingest::{is_audio_file, parse_export_name, EXPORT_EXTENSIONS};
use crate::store::RecordStore;

pub use whisper::WhisperClient;

/// A speech-to-text engine: audio file in, transcript text out.
#[async_trait]
pub trait SpeechToText: Send + Sync {
    fn name(&self) -> &str;

    /// Transcribe an audio file with a language hint.
    async fn transcribe(&self, audio: &Path, language: &str) -> Result<String, PipelineError>;
}

/// Runs transcription sweeps over mapped records.
pub struct Transcriber {
    store: Arc<RecordStore>,
    engine: Arc<dyn SpeechToText>,
    language: String,
}

impl Transcriber {
    pub fn new(store: Arc<RecordStore>, engine: Arc<dyn SpeechToText>, language: String) -> Self {
        Self {
            store,
            engine,
            language,
        }
    }

    /// Transcribe up to `limit` mapped-but-untranscribed records, newest
    /// first. Per-record failures never abort the batch.
    ///
    /// Returns the records successfully transcribed in this call.
    pub async fn transcribe_mapped_files(
        &self,
        limit: usize,
    ) -> Result<Vec<CallRecord>, PipelineError> {
        let selected = self.store.untranscribed(limit).await?;
        tracing::info!("found {} record(s) to transcribe", selected.len());

        let mut transcribed = Vec::new();

        for mut record in selected {
            // A vanished file is retryable: leave the flag untouched so the
            // record is selected again once the path is corrected.
            if !record.file.exists() {
                tracing::warn!("file not found, skipping: {}", record.file.display());
                continue;
            }

            match self.engine.transcribe(&record.file, &self.language).await {
                Ok(text) => {
                    record.transcription = text;
                    record.transcribed = Some(true);
                    record.touch();
                    // A failed persist loses this transcript but not the
                    // batch; the record stays selected for the next sweep.
                    if let Err(e) = self.store.upsert(&record).await {
                        tracing::error!("failed to persist transcription for {}: {}", record.id, e);
                        continue;
                    }
                    tracing::info!("transcribed {}", record.file.display());
                    transcribed.push(record);
                }
                Err(e) => {
                    tracing::error!("failed to transcribe {}: {}", record.file.display(), e);
                    // Explicit false marks "tried and failed" rather than
                    // "never attempted"; both select for the next sweep.
                    record.transcribed = Some(false);
                    record.touch();
                    if let Err(e) = self.store.upsert(&record).await {
                        tracing::error!("failed to persist failure mark for {}: {}", record.id, e);
                    }
                }
            }
        }

        tracing::info!("transcription sweep completed {} record(s)", transcribed.len());
        Ok(transcribed)
    }

    /// Transcribe one specific file, creating or updating its record.
    ///
    /// This path uses the deprecated export filename grammar and propagates
    /// all errors to the caller.
    pub async fn transcribe_file(&self, path: &Path) -> Result<CallRecord, PipelineError> {
        if !path.exists() {
            return Err(PipelineError::MissingFile(path.to_path_buf()));
        }
        if !is_audio_file(path, EXPORT_EXTENSIONS) {
            return Err(PipelineError::Parse(format!(
                "not a supported audio format: {}",
                path.display()
            )));
        }

        let parsed = parse_export_name(path)?;
        let text = self.engine.transcribe(path, &self.language).await?;

        let mut record = match self.store.find_by_path(path).await? {
            Some(existing) => existing,
            None => {
                let caller = parsed.contact_phone.clone().unwrap_or_else(|| "unknown".to_string());
                let mut record = CallRecord::new(path, caller);
                record.user = parsed.user_id;
                record.record_type = parsed.record_type;
                record.target_name = parsed.contact_name;
                record
            }
        };

        record.transcription = text;
        record.transcribed = Some(true);
        record.touch();
        self.store.upsert(&record).await?;

        Ok(record)
    }
}
