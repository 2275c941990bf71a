//! Watch-directory scanner.
//!
//! Pure I/O wrapper: lists candidate audio files with modification times.
//! Scanning is sweep-based; there is no inotify watcher, the scheduler
//! simply rescans on its cadence.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::PipelineError;

/// Extensions accepted by the mapping sweep.
pub const AUDIO_EXTENSIONS: &[&str] = &["wav", "mp3", "m4a"];

/// Extensions additionally accepted by the single-file transcription path.
pub const EXPORT_EXTENSIONS: &[&str] = &["wav", "mp3", "m4a", "aac", "ogg"];

/// A candidate audio file with its last-modified time.
#[derive(Debug, Clone)]
pub struct AudioFile {
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// Whether a path carries one of the allow-listed extensions.
pub fn is_audio_file(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// List regular audio files in a directory.
///
/// A missing directory is a configuration error; an empty listing is a
/// valid result.
pub async fn scan_audio_files(
    dir: &Path,
    extensions: &[&str],
) -> Result<Vec<AudioFile>, PipelineError> {
    if dir.as_os_str().is_empty() {
        return Err(PipelineError::Configuration(
            "watch directory is not configured".to_string(),
        ));
    }
    if !dir.exists() {
        return Err(PipelineError::Configuration(format!(
            "watch directory does not exist: {}",
            dir.display()
        )));
    }

    let mut files = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();

        if !is_audio_file(&path, extensions) {
            continue;
        }

        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) => m,
            Err(_) => continue,
        };
        if !metadata.is_file() {
            continue;
        }

        let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        files.push(AudioFile { path, modified });
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_scan_filters_by_extension() {
        let temp = TempDir::new().unwrap();
        tokio::fs::write(temp.path().join("a.wav"), b"x").await.unwrap();
        tokio::fs::write(temp.path().join("b.MP3"), b"x").await.unwrap();
        tokio::fs::write(temp.path().join("c.txt"), b"x").await.unwrap();
        tokio::fs::write(temp.path().join("d.ogg"), b"x").await.unwrap();

        let files = scan_audio_files(temp.path(), AUDIO_EXTENSIONS).await.unwrap();
        assert_eq!(files.len(), 2);

        let export = scan_audio_files(temp.path(), EXPORT_EXTENSIONS).await.unwrap();
        assert_eq!(export.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_directory_is_not_an_error() {
        let temp = TempDir::new().unwrap();
        let files = scan_audio_files(temp.path(), AUDIO_EXTENSIONS).await.unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_missing_directory_is_configuration_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");

        let err = scan_audio_files(&missing, AUDIO_EXTENSIONS).await.unwrap_err();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }
}
