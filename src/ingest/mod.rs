//! Recording ingestion: filename parsing, directory scanning, mapping.
//!
//! The telephony side deposits audio files into a watch directory. The
//! mapping sweep turns them into persisted records and relocates them:
//!
//! ```text
//! inbox/ → Scanner → FilenameParser → Mapper → records.jsonl
//!                                       ↓
//!                                  processed/
//! ```

pub mod filename;
pub mod mapper;
pub mod scanner;

// Re-export key types
pub use filename::{parse_export_name, parse_recording_name, ExportName, RecordingName};
pub use mapper::Mapper;
pub use scanner::{is_audio_file, scan_audio_files, AudioFile, AUDIO_EXTENSIONS, EXPORT_EXTENSIONS};
