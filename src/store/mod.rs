//! Persistence for call records.
//!
//! The store is deliberately a plain document collection: JSONL snapshots
//! with replay, no transactions. Pipeline correctness relies on idempotent
//! upserts, not on locking.

pub mod records;

pub use records::{RecordStats, RecordStore, StoreError};
