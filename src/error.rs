//! Error taxonomy for the recording pipeline.
//!
//! Batch sweeps log and skip per-record errors; single-record operations
//! propagate them to the caller.

use std::path::PathBuf;

use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur while mapping, transcribing or analyzing recordings
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Filename does not match the expected grammar. Callers skip the file
    /// and continue; this is never fatal to a sweep.
    #[error("invalid filename: {0}")]
    Parse(String),

    /// The recording file vanished before it could be processed. The record
    /// stays in its pre-stage state and is retried on the next sweep.
    #[error("recording file not found: {0}")]
    MissingFile(PathBuf),

    /// A speech-to-text or language-model backend was unreachable or errored.
    #[error("engine transport error: {0}")]
    Transport(String),

    /// The language-model response was not valid, strictly-typed JSON.
    #[error("invalid engine response: {0}")]
    Validation(String),

    /// Missing path configuration or an unresolvable device → project →
    /// analysis-config chain.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Unknown record, device or project id.
    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
