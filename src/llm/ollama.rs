//! Client for a local Ollama inference server.

use super::chat::{ChatModel, Message};
use crate::config::LocalLlmConfig;
use crate::error::{EvalError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct OllamaError {
    error: String,
}

/// Chat client for `POST /api/chat` on an Ollama server.
#[derive(Clone)]
pub struct OllamaClient {
    client: Client,
    config: LocalLlmConfig,
}

impl OllamaClient {
    pub fn new(config: LocalLlmConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.config.host.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatModel for OllamaClient {
    async fn chat(&self, messages: &[Message]) -> Result<Message> {
        let request = OllamaChatRequest {
            model: &self.config.model,
            messages,
            stream: false,
            options: self
                .config
                .temperature
                .map(|temperature| OllamaOptions { temperature }),
        };

        let response = self
            .client
            .post(self.endpoint())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let detail = serde_json::from_str::<OllamaError>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            return Err(EvalError::LlmApi(format!(
                "Ollama request failed ({}): {}",
                status, detail
            )));
        }

        let reply: OllamaChatResponse = serde_json::from_str(&body)?;
        Ok(reply.message)
    }
}
