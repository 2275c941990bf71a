//! Transcription Integration Tests
//!
//! Tests for the transcription sweep over mapped records: per-record
//! failure isolation, tri-state flag handling, and retry selection.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use callscribe::domain::CallRecord;
use callscribe::error::PipelineError;
use callscribe::store::RecordStore;
use callscribe::transcribe::{SpeechToText, Transcriber};
use tempfile::TempDir;
use tokio::fs;

/// Engine that returns a fixed transcript and counts invocations
struct CountingEngine {
    text: String,
    calls: AtomicUsize,
}

impl CountingEngine {
    fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SpeechToText for CountingEngine {
    fn name(&self) -> &str {
        "counting"
    }

    async fn transcribe(&self, _audio: &Path, _language: &str) -> Result<String, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.text.clone())
    }
}

/// Engine that always fails
struct BrokenEngine;

#[async_trait]
impl SpeechToText for BrokenEngine {
    fn name(&self) -> &str {
        "broken"
    }

    async fn transcribe(&self, _audio: &Path, _language: &str) -> Result<String, PipelineError> {
        Err(PipelineError::Transport("connection refused".to_string()))
    }
}

async fn seed_record(store: &RecordStore, temp: &TempDir, name: &str) -> CallRecord {
    let audio = temp.path().join(name);
    fs::write(&audio, b"audio").await.unwrap();

    let record = CallRecord::new(&audio, "DEV1");
    store.upsert(&record).await.unwrap();
    record
}

#[tokio::test]
async fn test_missing_file_does_not_abort_batch() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(RecordStore::new(temp.path().join("records.jsonl")));

    let a = seed_record(&store, &temp, "a.wav").await;
    let gone = seed_record(&store, &temp, "gone.wav").await;
    let b = seed_record(&store, &temp, "b.wav").await;

    fs::remove_file(&gone.file).await.unwrap();

    let engine = Arc::new(CountingEngine::new("hola"));
    let transcriber = Transcriber::new(store.clone(), engine, "es".to_string());

    let transcribed = transcriber.transcribe_mapped_files(20).await.unwrap();
    assert_eq!(transcribed.len(), 2);

    for id in [&a.id, &b.id] {
        let record = store.get(id).await.unwrap();
        assert_eq!(record.transcribed, Some(true));
        assert_eq!(record.transcription, "hola");
    }

    // The vanished file's record keeps its untouched flag so it is
    // selected again once the path is restored
    let skipped = store.get(&gone.id).await.unwrap();
    assert_eq!(skipped.transcribed, None);
    assert!(skipped.transcription.is_empty());
}

#[tokio::test]
async fn test_failed_transcription_marked_and_retried() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(RecordStore::new(temp.path().join("records.jsonl")));

    let record = seed_record(&store, &temp, "call.wav").await;

    let broken = Transcriber::new(store.clone(), Arc::new(BrokenEngine), "es".to_string());
    let transcribed = broken.transcribe_mapped_files(20).await.unwrap();
    assert!(transcribed.is_empty());

    // Failure is recorded as an explicit false, not left untouched
    let failed = store.get(&record.id).await.unwrap();
    assert_eq!(failed.transcribed, Some(false));

    // A later sweep with a working engine picks the record up again
    let working = Transcriber::new(
        store.clone(),
        Arc::new(CountingEngine::new("sí, acepto")),
        "es".to_string(),
    );
    let retried = working.transcribe_mapped_files(20).await.unwrap();
    assert_eq!(retried.len(), 1);

    let done = store.get(&record.id).await.unwrap();
    assert_eq!(done.transcribed, Some(true));
    assert_eq!(done.transcription, "sí, acepto");
}

#[tokio::test]
async fn test_completed_records_are_not_reprocessed() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(RecordStore::new(temp.path().join("records.jsonl")));

    seed_record(&store, &temp, "call.wav").await;

    let engine = Arc::new(CountingEngine::new("hola"));
    let transcriber = Transcriber::new(store.clone(), engine.clone(), "es".to_string());

    let first = transcriber.transcribe_mapped_files(20).await.unwrap();
    assert_eq!(first.len(), 1);

    let second = transcriber.transcribe_mapped_files(20).await.unwrap();
    assert!(second.is_empty());

    // The engine ran exactly once across both sweeps
    assert_eq!(engine.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_limit_caps_the_sweep() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(RecordStore::new(temp.path().join("records.jsonl")));

    for i in 0..5 {
        seed_record(&store, &temp, &format!("call{}.wav", i)).await;
    }

    let engine = Arc::new(CountingEngine::new("hola"));
    let transcriber = Transcriber::new(store.clone(), engine, "es".to_string());

    let transcribed = transcriber.transcribe_mapped_files(2).await.unwrap();
    assert_eq!(transcribed.len(), 2);

    let remaining = store.untranscribed(20).await.unwrap();
    assert_eq!(remaining.len(), 3);
}
