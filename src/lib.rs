//! callscribe - Call recording transcription and sale-outcome analysis
//!
//! A pipeline that ingests call recordings dropped into a watch directory,
//! transcribes them, and extracts a structured sale outcome from each
//! transcript.
//!
//! # Architecture
//!
//! Three stages run over a shared append-only record store:
//! - Mapping: parse recording filenames, register records, relocate files
//! - Transcription: speech-to-text over mapped records
//! - Analysis: language-model (or heuristic) sale-outcome extraction
//!
//! The store is a JSONL snapshot log: every update appends the full record
//! and replay derives current state with the latest line winning, so every
//! stage is idempotent and restartable.
//!
//! # Modules
//!
//! - `ingest`: filename grammars, inbox scanning, the mapper
//! - `transcribe`: speech-to-text engines and sweeps
//! - `analyze`: outcome extraction engines, prompts, fallback policy
//! - `schedule`: timer-driven sweeps with single-flight guards
//! - `store`: the JSONL record store
//! - `domain`: data structures (CallRecord, Outcome, Registry)
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Run the daemon
//! callscribe run
//!
//! # One-shot sweeps
//! callscribe map --limit 50
//! callscribe transcribe --limit 20
//! callscribe analyze
//!
//! # Inspect state
//! callscribe records
//! callscribe stats
//! ```

pub mod analyze;
pub mod cli;
pub mod config;
pub mod domain;
pub mod error;
pub mod ingest;
pub mod schedule;
pub mod store;
pub mod transcribe;

// Re-export main types at crate root for convenience
pub use analyze::{AnalysisEngine, Analyzer, EngineKind, HeuristicEngine};
pub use config::Config;
pub use domain::{AnalysisConfig, CallRecord, Device, Outcome, Project, Registry};
pub use error::PipelineError;
pub use ingest::Mapper;
pub use schedule::{ScheduleConfig, Scheduler, SweepOutcome};
pub use store::{RecordStats, RecordStore, StoreError};
pub use transcribe::{SpeechToText, Transcriber, WhisperClient};
