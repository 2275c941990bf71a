//! The call record: one row per recording, mutated in place by each
//! pipeline stage and never deleted.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Owner placeholder until a user is assigned out of band.
pub const UNASSIGNED_USER: &str = "unknown";

/// Sale outcome extracted from a transcript.
///
/// The three fields are persisted as a group: a record either has a full
/// outcome or none at all.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outcome {
    /// Whether the call closed a sale
    pub success_sell: bool,

    /// Agreed amount, if one was mentioned
    pub amount_to_pay: Option<f64>,

    /// Why the sale failed (None on success)
    pub reason_fail: Option<String>,
}

/// A single call recording and everything the pipeline knows about it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallRecord {
    /// Stable id: 12 hex chars of SHA-256 over the file path at creation
    /// time. Survives relocation to the processed directory.
    pub id: String,

    /// Owning user (placeholder until assigned)
    pub user: String,

    /// Current file path. Natural key for upserts; updated after a
    /// successful move, so a stale path is possible if the move fails.
    pub file: PathBuf,

    /// Caller/device identifier from the filename
    pub caller_id: String,

    /// Recording type from the filename (e.g. "sale")
    pub record_type: String,

    /// Parsed filename timestamp. Doubles as the scan watermark: the
    /// maximum over all mapped records bounds the next sweep.
    pub timestamp: Option<i64>,

    /// Called party name, if the filename carried one
    pub target_name: Option<String>,

    /// Called party number, if the filename carried one
    pub target_number: Option<String>,

    /// Transcript text (empty until transcribed)
    #[serde(default)]
    pub transcription: String,

    /// Tri-state transcription flag: `Some(true)` done, `Some(false)`
    /// tried and failed, `None` never attempted. Everything except
    /// `Some(true)` selects for the next transcription sweep.
    #[serde(default)]
    pub transcribed: Option<bool>,

    /// Analysis outcome, set atomically after a single analysis pass
    #[serde(default)]
    pub outcome: Option<Outcome>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CallRecord {
    /// Create a freshly mapped record with no transcription or outcome.
    pub fn new(file: impl Into<PathBuf>, caller_id: impl Into<String>) -> Self {
        let file = file.into();
        let now = Utc::now();
        Self {
            id: record_id(&file),
            user: UNASSIGNED_USER.to_string(),
            file,
            caller_id: caller_id.into(),
            record_type: UNASSIGNED_USER.to_string(),
            timestamp: None,
            target_name: None,
            target_number: None,
            transcription: String::new(),
            transcribed: None,
            outcome: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this record still needs a transcription pass.
    pub fn needs_transcription(&self) -> bool {
        self.transcribed != Some(true)
    }

    /// Whether this record is ready for analysis: transcribed text present
    /// and no outcome yet.
    pub fn needs_analysis(&self) -> bool {
        !self.transcription.is_empty() && self.outcome.is_none()
    }

    /// Record a completed analysis pass.
    pub fn set_outcome(&mut self, outcome: Outcome) {
        self.outcome = Some(outcome);
        self.touch();
    }

    /// Bump the update timestamp after a mutation.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Derive a short stable id from a file path (12 hex chars of SHA-256).
pub fn record_id(path: &Path) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.to_string_lossy().as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..6])
}
