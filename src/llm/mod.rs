//! LLM integration module.
//!
//! Provides the [`ChatModel`] capability, an OpenAI-compatible client for the
//! hosted provider, an Ollama client for local inference, and the prompts
//! used for grading.

mod chat;
mod client;
mod ollama;
mod prompts;

pub use chat::{ChatModel, Message, Role};
pub use client::{LlmClient, LlmResponse, TokenUsage};
pub use ollama::OllamaClient;
pub use prompts::Prompts;
