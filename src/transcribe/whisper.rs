//! Whisper HTTP transcription backend.
//!
//! Uploads the audio file as multipart form data to an OpenAI-compatible
//! `audio/transcriptions` endpoint.

use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;

use crate::error::PipelineError;

use super::SpeechToText;

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/audio/transcriptions";
const DEFAULT_MODEL: &str = "whisper-1";

/// Whisper transcription response
#[derive(Debug, Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Whisper API client
pub struct WhisperClient {
    endpoint: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl WhisperClient {
    pub fn new(api_key: String) -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl SpeechToText for WhisperClient {
    fn name(&self) -> &str {
        "whisper"
    }

    async fn transcribe(&self, audio: &Path, language: &str) -> Result<String, PipelineError> {
        let bytes = tokio::fs::read(audio)
            .await
            .map_err(|_| PipelineError::MissingFile(audio.to_path_buf()))?;

        let file_name = audio
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio".to_string());

        let part = multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/octet-stream")
            .map_err(|e| PipelineError::Transport(e.to_string()))?;

        let form = multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("language", language.to_string());

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| PipelineError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Transport(format!(
                "whisper API returned {}: {}",
                status, body
            )));
        }

        let parsed: WhisperResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Transport(e.to_string()))?;

        Ok(parsed.text.trim().to_string())
    }
}
