//! Configuration for callscribe paths and engines.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (CALLSCRIBE_HOME, CALLSCRIBE_INBOX,
//!    CALLSCRIBE_PROCESSED, OPENAI_API_KEY, OLLAMA_HOST)
//! 2. Config file (.callscribe/config.yaml)
//! 3. Defaults (~/.callscribe)
//!
//! Config file discovery:
//! - Searches current directory and parents for .callscribe/config.yaml
//! - Paths in the config file are relative to the config file's parent
//!
//! There is no process-global cache: `Config::load()` is called once in
//! main and the handle is passed explicitly into each component.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::analyze::EngineKind;
use crate::schedule::ScheduleConfig;

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub transcription: Option<TranscriptionSettings>,
    #[serde(default)]
    pub analysis: Option<AnalysisSettings>,
    #[serde(default)]
    pub schedule: Option<ScheduleSettings>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// Pipeline state directory (relative to config file)
    pub home: Option<String>,
    /// Watch directory the recorder deposits audio into
    pub inbox: Option<String>,
    /// Directory mapped recordings are relocated to
    pub processed: Option<String>,
    /// Device/project registry file
    pub registry: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionSettings {
    pub language: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalysisSettings {
    pub engine: Option<EngineKind>,
    pub openai_model: Option<String>,
    pub ollama_host: Option<String>,
    pub ollama_model: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleSettings {
    pub map_interval_secs: Option<u64>,
    pub map_limit: Option<usize>,
    pub transcribe_interval_secs: Option<u64>,
    pub transcribe_limit: Option<usize>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct Config {
    /// Absolute path to callscribe home (pipeline state)
    pub home: PathBuf,
    /// Watch directory
    pub inbox: PathBuf,
    /// Processed directory (created on demand by the mapper)
    pub processed: PathBuf,
    /// Record store file ($CALLSCRIBE_HOME/records.jsonl)
    pub store_path: PathBuf,
    /// Device/project registry file
    pub registry_path: PathBuf,
    /// Language hint for transcription
    pub language: String,
    /// Speech-to-text model
    pub whisper_model: String,
    /// Which analysis backend to construct
    pub engine: EngineKind,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub ollama_host: String,
    pub ollama_model: String,
    /// Sweep cadences and limits
    pub schedule: ScheduleConfig,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self> {
        let default_home = dirs::home_dir()
            .context("Failed to determine home directory")?
            .join(".callscribe");

        let config_file = find_config_file();

        let (file, base_dir) = match &config_file {
            Some(config_path) => {
                let file = load_config_file(config_path)?;
                // Base directory is the parent of .callscribe/
                let base = config_path
                    .parent()
                    .and_then(|p| p.parent())
                    .unwrap_or(Path::new("."))
                    .to_path_buf();
                (file, base)
            }
            None => (ConfigFile::default(), PathBuf::from(".")),
        };

        let home = if let Ok(env_home) = std::env::var("CALLSCRIBE_HOME") {
            PathBuf::from(env_home)
        } else if let Some(ref home_path) = file.paths.home {
            resolve_path(&base_dir, home_path)
        } else {
            default_home
        };

        let inbox = if let Ok(env_inbox) = std::env::var("CALLSCRIBE_INBOX") {
            PathBuf::from(env_inbox)
        } else if let Some(ref inbox_path) = file.paths.inbox {
            resolve_path(&base_dir, inbox_path)
        } else {
            home.join("inbox")
        };

        let processed = if let Ok(env_processed) = std::env::var("CALLSCRIBE_PROCESSED") {
            PathBuf::from(env_processed)
        } else if let Some(ref processed_path) = file.paths.processed {
            resolve_path(&base_dir, processed_path)
        } else {
            home.join("processed")
        };

        let registry_path = file
            .paths
            .registry
            .as_ref()
            .map(|p| resolve_path(&base_dir, p))
            .unwrap_or_else(|| home.join("registry.yaml"));

        let transcription = file.transcription.as_ref();
        let analysis = file.analysis.as_ref();

        let defaults = ScheduleConfig::default();
        let schedule_file = file.schedule.as_ref();
        let schedule = ScheduleConfig {
            map_interval: schedule_file
                .and_then(|s| s.map_interval_secs)
                .map(Duration::from_secs)
                .unwrap_or(defaults.map_interval),
            map_limit: schedule_file
                .and_then(|s| s.map_limit)
                .unwrap_or(defaults.map_limit),
            transcribe_interval: schedule_file
                .and_then(|s| s.transcribe_interval_secs)
                .map(Duration::from_secs)
                .unwrap_or(defaults.transcribe_interval),
            transcribe_limit: schedule_file
                .and_then(|s| s.transcribe_limit)
                .unwrap_or(defaults.transcribe_limit),
        };

        Ok(Self {
            store_path: home.join("records.jsonl"),
            inbox,
            processed,
            registry_path,
            home,
            language: transcription
                .and_then(|t| t.language.clone())
                .unwrap_or_else(|| "es".to_string()),
            whisper_model: transcription
                .and_then(|t| t.model.clone())
                .unwrap_or_else(|| "whisper-1".to_string()),
            engine: analysis.and_then(|a| a.engine).unwrap_or_default(),
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            openai_model: analysis
                .and_then(|a| a.openai_model.clone())
                .unwrap_or_else(|| "gpt-4".to_string()),
            ollama_host: std::env::var("OLLAMA_HOST").ok().unwrap_or_else(|| {
                analysis
                    .and_then(|a| a.ollama_host.clone())
                    .unwrap_or_else(|| "http://localhost:11434".to_string())
            }),
            ollama_model: analysis
                .and_then(|a| a.ollama_model.clone())
                .unwrap_or_else(|| "deepseek-llm".to_string()),
            schedule,
            config_file,
        })
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".callscribe").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's parent
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}
