//! OpenAI-compatible LLM client.
//!
//! Works with any endpoint that speaks the chat-completions protocol. The
//! default configuration points at the provider's OpenAI-compatible API.

use super::chat::{ChatModel, Message};
use crate::config::LlmConfig;
use crate::error::{EvalError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Request body for chat completion.
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Response from chat completion.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// Model listing response.
#[derive(Debug, Deserialize)]
struct ModelList {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

/// OpenAI API error response. Some providers wrap it in a one-element array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ApiError {
    Single { error: ApiErrorDetail },
    Wrapped(Vec<ApiErrorBody>),
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl ApiError {
    fn message(&self) -> Option<&str> {
        match self {
            ApiError::Single { error } => Some(&error.message),
            ApiError::Wrapped(items) => items.first().map(|b| b.error.message.as_str()),
        }
    }
}

/// Response from an LLM call including metadata.
#[derive(Debug)]
pub struct LlmResponse {
    /// The generated content.
    pub content: String,
    /// Reason the model stopped generating.
    pub finish_reason: Option<String>,
    /// Token usage (if available).
    pub usage: Option<TokenUsage>,
}

#[derive(Debug)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// OpenAI-compatible LLM client.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    config: LlmConfig,
}

impl LlmClient {
    /// Create a new LLM client with the given configuration.
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Model this client sends requests to.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn url(&self, path: &str) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        format!("{}/{}", base, path)
    }

    /// Turn a non-success body into an `LlmApi` error.
    fn api_error(status: reqwest::StatusCode, body: &str) -> EvalError {
        let parsed = serde_json::from_str::<ApiError>(body).ok();
        if let Some(message) = parsed.as_ref().and_then(ApiError::message) {
            return EvalError::LlmApi(format!("API error ({}): {}", status, message));
        }
        EvalError::LlmApi(format!("Request failed ({}): {}", status, body))
    }

    /// Send a chat completion request.
    pub async fn chat_completion(&self, messages: &[Message]) -> Result<LlmResponse> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages,
            max_tokens: Some(self.config.max_tokens),
            temperature: Some(self.config.temperature),
        };

        let response = self
            .client
            .post(self.url("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Self::api_error(status, &body));
        }

        let completion: ChatCompletionResponse = serde_json::from_str(&body)?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| EvalError::LlmApi("No choices in response".to_string()))?;

        let usage = completion.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });
        if let Some(u) = &usage {
            tracing::debug!(
                model = %self.config.model,
                prompt_tokens = u.prompt_tokens,
                completion_tokens = u.completion_tokens,
                total_tokens = u.total_tokens,
                "chat completion"
            );
        }

        Ok(LlmResponse {
            content: choice.message.content.unwrap_or_default(),
            finish_reason: choice.finish_reason,
            usage,
        })
    }

    /// List the model ids the provider exposes.
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let response = self
            .client
            .get(self.url("models"))
            .bearer_auth(&self.config.api_key)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Self::api_error(status, &body));
        }

        let list: ModelList = serde_json::from_str(&body)?;
        Ok(list.data.into_iter().map(|m| m.id).collect())
    }

    /// Test connectivity to the API.
    pub async fn test_connection(&self) -> Result<()> {
        let messages = [Message::user("Say 'hello' and nothing else.")];

        let response = self.chat_completion(&messages).await?;

        if response.content.to_lowercase().contains("hello") {
            Ok(())
        } else {
            Err(EvalError::LlmApi(format!(
                "Unexpected response: {}",
                response.content
            )))
        }
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    async fn chat(&self, messages: &[Message]) -> Result<Message> {
        let response = self.chat_completion(messages).await?;
        Ok(Message::assistant(response.content))
    }
}
