//! Locally hosted inference server backend (Ollama-compatible).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::Outcome;
use crate::error::PipelineError;

use super::{parse_outcome, AnalysisEngine};
use crate::analyze::prompt::build_user_prompt;

const DEFAULT_HOST: &str = "http://localhost:11434";
const DEFAULT_MODEL: &str = "deepseek-llm";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Debug, Deserialize)]
struct ModelTag {
    name: String,
}

/// Ollama chat engine
pub struct OllamaEngine {
    host: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaEngine {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            model: DEFAULT_MODEL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_env() -> Self {
        let host = std::env::var("OLLAMA_HOST").unwrap_or_else(|_| DEFAULT_HOST.to_string());
        Self::new(host)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl AnalysisEngine for OllamaEngine {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn analyze(
        &self,
        system_prompt: &str,
        transcript: &str,
    ) -> Result<Outcome, PipelineError> {
        let user_prompt = build_user_prompt(transcript);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &user_prompt,
                },
            ],
            stream: false,
            options: ChatOptions {
                temperature: 0.1,
                num_predict: 500,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.host))
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::Transport(format!(
                "ollama returned {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Transport(e.to_string()))?;

        let content = parsed
            .message
            .map(|m| m.content)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| PipelineError::Validation("empty completion".to_string()))?;

        parse_outcome(&content)
    }

    /// Check that the configured model is available on the server.
    async fn health_check(&self) -> Result<(), PipelineError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.host))
            .send()
            .await
            .map_err(|e| PipelineError::Transport(e.to_string()))?;

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::Transport(e.to_string()))?;

        if !tags.models.iter().any(|m| m.name.contains(&self.model)) {
            return Err(PipelineError::Configuration(format!(
                "model {} not available on {}",
                self.model, self.host
            )));
        }

        Ok(())
    }
}
