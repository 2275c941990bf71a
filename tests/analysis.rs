//! Analysis Integration Tests
//!
//! Tests for the sale-outcome analysis stage: registry chain resolution,
//! fallback policy, and batch failure isolation.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use callscribe::analyze::{AnalysisEngine, Analyzer};
use callscribe::domain::{AnalysisConfig, CallRecord, Device, Outcome, Project, Registry};
use callscribe::error::PipelineError;
use callscribe::store::RecordStore;
use tempfile::TempDir;

/// Engine that always returns the same outcome
struct CannedEngine {
    outcome: Outcome,
}

#[async_trait]
impl AnalysisEngine for CannedEngine {
    fn name(&self) -> &str {
        "canned"
    }

    async fn analyze(
        &self,
        _system_prompt: &str,
        _transcript: &str,
    ) -> Result<Outcome, PipelineError> {
        Ok(self.outcome.clone())
    }

    async fn health_check(&self) -> Result<(), PipelineError> {
        Ok(())
    }
}

/// Engine that always fails at the transport level
struct DownEngine;

#[async_trait]
impl AnalysisEngine for DownEngine {
    fn name(&self) -> &str {
        "down"
    }

    async fn analyze(
        &self,
        _system_prompt: &str,
        _transcript: &str,
    ) -> Result<Outcome, PipelineError> {
        Err(PipelineError::Transport("connection refused".to_string()))
    }

    async fn health_check(&self) -> Result<(), PipelineError> {
        Err(PipelineError::Transport("connection refused".to_string()))
    }
}

fn sample_registry() -> Registry {
    let config = AnalysisConfig {
        instructions: vec!["Eres un analista de llamadas de ventas.".to_string()],
        fields: BTreeMap::new(),
        output_format: serde_json::json!({
            "successSell": "boolean",
            "amountToPay": "number | null",
            "reasonFail": "string | null"
        }),
        example_analysis: serde_json::json!({"successSell": true, "amountToPay": 2000000}),
        example_analysis_fail: serde_json::json!({"successSell": false, "reasonFail": "..."}),
    };

    Registry::from_parts(
        vec![
            Device {
                id: "DEV1".to_string(),
                title: "Booth 1".to_string(),
                project: Some("campaign-a".to_string()),
            },
            Device {
                id: "ORPHAN".to_string(),
                title: "Unassigned booth".to_string(),
                project: None,
            },
        ],
        vec![Project {
            id: "campaign-a".to_string(),
            title: "Campaign A".to_string(),
            analysis: Some(config),
        }],
    )
}

async fn seed_transcribed(store: &RecordStore, path: &str, caller: &str, text: &str) -> CallRecord {
    let mut record = CallRecord::new(path, caller);
    record.transcription = text.to_string();
    record.transcribed = Some(true);
    store.upsert(&record).await.unwrap();
    record
}

fn analyzer_with(store: Arc<RecordStore>, engine: Arc<dyn AnalysisEngine>) -> Analyzer {
    Analyzer::new(store, Arc::new(sample_registry()), engine)
}

#[tokio::test]
async fn test_engine_outcome_is_persisted_atomically() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(RecordStore::new(temp.path().join("records.jsonl")));

    let record = seed_transcribed(&store, "/records/a.wav", "DEV1", "sí, acepto pagar").await;

    let engine = Arc::new(CannedEngine {
        outcome: Outcome {
            success_sell: true,
            amount_to_pay: Some(2_000_000.0),
            reason_fail: None,
        },
    });
    let analyzer = analyzer_with(store.clone(), engine);

    let analyzed = analyzer.analyze_pending(20).await.unwrap();
    assert_eq!(analyzed.len(), 1);

    let stored = store.get(&record.id).await.unwrap();
    let outcome = stored.outcome.unwrap();
    assert!(outcome.success_sell);
    assert_eq!(outcome.amount_to_pay, Some(2_000_000.0));
    assert!(outcome.reason_fail.is_none());
}

#[tokio::test]
async fn test_failing_engine_falls_back_to_heuristic() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(RecordStore::new(temp.path().join("records.jsonl")));

    let record = seed_transcribed(
        &store,
        "/records/a.wav",
        "DEV1",
        "Perfecto, acepto pagar 2 millones",
    )
    .await;

    let analyzer = analyzer_with(store.clone(), Arc::new(DownEngine));
    let analyzed = analyzer.analyze_pending(20).await.unwrap();
    assert_eq!(analyzed.len(), 1);

    // The heuristic produced the outcome
    let stored = store.get(&record.id).await.unwrap();
    let outcome = stored.outcome.unwrap();
    assert!(outcome.success_sell);
    assert_eq!(outcome.amount_to_pay, Some(2_000_000.0));
}

#[tokio::test]
async fn test_without_fallback_engine_failure_propagates() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(RecordStore::new(temp.path().join("records.jsonl")));

    let record = seed_transcribed(&store, "/records/a.wav", "DEV1", "sí, acepto").await;

    let analyzer = analyzer_with(store.clone(), Arc::new(DownEngine)).without_fallback();

    let err = analyzer.analyze_record(&record.id).await.unwrap_err();
    assert!(matches!(err, PipelineError::Transport(_)));

    // No partial outcome was written
    let stored = store.get(&record.id).await.unwrap();
    assert!(stored.outcome.is_none());
}

#[tokio::test]
async fn test_batch_continues_past_unresolvable_records() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(RecordStore::new(temp.path().join("records.jsonl")));

    let good = seed_transcribed(&store, "/records/good.wav", "DEV1", "sí").await;
    let unknown = seed_transcribed(&store, "/records/unknown.wav", "GHOST", "sí").await;
    let orphan = seed_transcribed(&store, "/records/orphan.wav", "ORPHAN", "sí").await;

    let engine = Arc::new(CannedEngine {
        outcome: Outcome {
            success_sell: false,
            amount_to_pay: None,
            reason_fail: Some("no interesado".to_string()),
        },
    });
    let analyzer = analyzer_with(store.clone(), engine);

    // Unknown device and unassigned device each abort only their own record
    let analyzed = analyzer.analyze_pending(20).await.unwrap();
    assert_eq!(analyzed.len(), 1);
    assert_eq!(analyzed[0].id, good.id);

    assert!(store.get(&unknown.id).await.unwrap().outcome.is_none());
    assert!(store.get(&orphan.id).await.unwrap().outcome.is_none());
}

#[tokio::test]
async fn test_single_record_errors_propagate() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(RecordStore::new(temp.path().join("records.jsonl")));

    let engine = Arc::new(CannedEngine {
        outcome: Outcome {
            success_sell: false,
            amount_to_pay: None,
            reason_fail: None,
        },
    });

    // Unknown id
    let analyzer = analyzer_with(store.clone(), engine.clone());
    let err = analyzer.analyze_record("000000000000").await.unwrap_err();
    assert!(matches!(err, PipelineError::NotFound(_)));

    // Record exists but has no transcript yet
    let untranscribed = CallRecord::new("/records/raw.wav", "DEV1");
    store.upsert(&untranscribed).await.unwrap();

    let err = analyzer.analyze_record(&untranscribed.id).await.unwrap_err();
    assert!(matches!(err, PipelineError::Validation(_)));
}

#[tokio::test]
async fn test_store_failure_is_not_reported_as_unknown_id() {
    let temp = TempDir::new().unwrap();

    // A directory where the store file should be: replay fails with an IO
    // error rather than finding nothing
    let store_path = temp.path().join("records.jsonl");
    std::fs::create_dir_all(&store_path).unwrap();
    let store = Arc::new(RecordStore::new(store_path));

    let analyzer = analyzer_with(store, Arc::new(DownEngine));

    let err = analyzer.analyze_record("abcdef123456").await.unwrap_err();
    assert!(matches!(err, PipelineError::Store(_)));
}

#[tokio::test]
async fn test_analyzed_records_are_not_reprocessed() {
    let temp = TempDir::new().unwrap();
    let store = Arc::new(RecordStore::new(temp.path().join("records.jsonl")));

    seed_transcribed(&store, "/records/a.wav", "DEV1", "no gracias").await;

    let engine = Arc::new(CannedEngine {
        outcome: Outcome {
            success_sell: false,
            amount_to_pay: None,
            reason_fail: Some("no interesado".to_string()),
        },
    });
    let analyzer = analyzer_with(store.clone(), engine);

    let first = analyzer.analyze_pending(20).await.unwrap();
    assert_eq!(first.len(), 1);

    let second = analyzer.analyze_pending(20).await.unwrap();
    assert!(second.is_empty());
}
