//! Domain types for the recording pipeline.
//!
//! This module contains the core data structures:
//! - CallRecord: one recording and everything the pipeline knows about it
//! - Outcome: the sale-outcome extraction, persisted as a group
//! - Registry: caller id → device → project → analysis-config resolution

pub mod record;
pub mod registry;

// Re-export commonly used types
pub use record::{record_id, CallRecord, Outcome, UNASSIGNED_USER};
pub use registry::{AnalysisConfig, Device, Project, Registry};
