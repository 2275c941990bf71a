//! Sale-outcome analysis stage.
//!
//! The language-model step is a capability interface with three
//! implementations: a remote chat-completion API, a locally hosted
//! inference server, and a deterministic lexical heuristic. The analyzer
//! is backend-agnostic; an explicit fallback policy decides what happens
//! when the primary engine fails.

pub mod heuristic;
pub mod ollama;
pub mod openai;
pub mod prompt;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{CallRecord, Outcome, Registry};
use crate::error::PipelineError;
use crate::store::{RecordStore, StoreError};

pub use heuristic::HeuristicEngine;
pub use ollama::OllamaEngine;
pub use openai::OpenAiEngine;
pub use prompt::{build_system_prompt, build_user_prompt};

/// Which analysis backend to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    OpenAi,
    Ollama,
    Heuristic,
}

impl Default for EngineKind {
    fn default() -> Self {
        Self::OpenAi
    }
}

/// A sale-outcome extraction engine.
#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    /// Human-readable engine name
    fn name(&self) -> &str;

    /// Extract an outcome from a transcript, guided by the system prompt.
    async fn analyze(
        &self,
        system_prompt: &str,
        transcript: &str,
    ) -> Result<Outcome, PipelineError>;

    /// Check that the backend is reachable and configured.
    async fn health_check(&self) -> Result<(), PipelineError>;
}

/// Engine wire format: the JSON object the model must respond with.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireOutcome {
    success_sell: bool,
    #[serde(default)]
    amount_to_pay: Option<f64>,
    #[serde(default)]
    reason_fail: Option<String>,
}

/// Parse and strictly type-check an engine response.
pub fn parse_outcome(content: &str) -> Result<Outcome, PipelineError> {
    let wire: WireOutcome = serde_json::from_str(content.trim())
        .map_err(|e| PipelineError::Validation(format!("malformed outcome JSON: {}", e)))?;

    Ok(Outcome {
        success_sell: wire.success_sell,
        amount_to_pay: wire.amount_to_pay,
        reason_fail: wire.reason_fail,
    })
}

/// Runs analysis over transcribed records.
pub struct Analyzer {
    store: Arc<RecordStore>,
    registry: Arc<Registry>,
    engine: Arc<dyn AnalysisEngine>,
    fallback: Option<HeuristicEngine>,
}

impl Analyzer {
    pub fn new(
        store: Arc<RecordStore>,
        registry: Arc<Registry>,
        engine: Arc<dyn AnalysisEngine>,
    ) -> Self {
        Self {
            store,
            registry,
            engine,
            fallback: Some(HeuristicEngine::default()),
        }
    }

    /// Disable the heuristic fallback so engine failures surface directly.
    /// Used by tests to force a specific path.
    pub fn without_fallback(mut self) -> Self {
        self.fallback = None;
        self
    }

    /// Analyze up to `limit` transcribed records that have no outcome yet.
    /// A failure tied to one record (unresolvable configuration chain
    /// included) aborts only that record.
    pub async fn analyze_pending(&self, limit: usize) -> Result<Vec<CallRecord>, PipelineError> {
        let selected = self.store.pending_analysis(limit).await?;

        if selected.is_empty() {
            tracing::info!("no records pending analysis");
            return Ok(Vec::new());
        }

        let mut analyzed = Vec::new();

        for mut record in selected {
            match self.analyze_one(&record).await {
                Ok(outcome) => {
                    record.set_outcome(outcome);
                    // A failed persist drops this outcome but not the batch;
                    // the record stays pending for the next pass.
                    if let Err(e) = self.store.upsert(&record).await {
                        tracing::error!("failed to persist outcome for record {}: {}", record.id, e);
                        continue;
                    }
                    tracing::info!("analysis completed for record {}", record.id);
                    analyzed.push(record);
                }
                Err(e) => {
                    tracing::error!("error analyzing record {}: {}", record.id, e);
                }
            }
        }

        Ok(analyzed)
    }

    /// Analyze one record by id; all errors propagate to the caller.
    pub async fn analyze_record(&self, id: &str) -> Result<Outcome, PipelineError> {
        let mut record = match self.store.get(id).await {
            Ok(record) => record,
            Err(StoreError::NotFound(_)) => {
                return Err(PipelineError::NotFound(format!("record {}", id)))
            }
            Err(e) => return Err(e.into()),
        };

        if record.transcription.is_empty() {
            return Err(PipelineError::Validation(format!(
                "record {} has no transcription",
                id
            )));
        }

        let outcome = self.analyze_one(&record).await?;
        record.set_outcome(outcome.clone());
        self.store.upsert(&record).await?;

        Ok(outcome)
    }

    /// Resolve configuration, run the engine, and apply the fallback
    /// policy. Transport and validation failures at the primary engine are
    /// swallowed by the heuristic when one is configured.
    async fn analyze_one(&self, record: &CallRecord) -> Result<Outcome, PipelineError> {
        let config = self.registry.analysis_config(&record.caller_id)?;
        let system_prompt = build_system_prompt(config);

        match self.engine.analyze(&system_prompt, &record.transcription).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => match &self.fallback {
                Some(heuristic) => {
                    tracing::warn!(
                        "engine {} failed ({}), falling back to heuristic",
                        self.engine.name(),
                        e
                    );
                    Ok(heuristic.analyze_text(&record.transcription))
                }
                None => Err(e),
            },
        }
    }
}
