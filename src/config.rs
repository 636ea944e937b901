//! Configuration for the evaluation harness.
//!
//! Supports both environment variables and YAML config file.
//! Environment variables take precedence over config file values.
//! A `.env` file in the working directory is read by the binary before
//! [`Config::load`] runs.

use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Default OpenAI-compatible endpoint of the generative-model provider.
pub const DEFAULT_PROVIDER_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Default address of a local Ollama server.
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";

/// Hosted provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Base URL for the OpenAI-compatible API, including the version path.
    pub api_base: String,

    /// API key for authentication
    pub api_key: String,

    /// Model name (e.g., "gemini-1.5-flash")
    pub model: String,

    /// Maximum tokens for response (optional)
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Temperature for generation (optional)
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_temperature() -> f32 {
    0.0
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_PROVIDER_BASE.to_string(),
            api_key: String::new(),
            model: "gemini-1.5-flash".to_string(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
        }
    }
}

/// Local inference server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalLlmConfig {
    /// Server address (e.g., "http://localhost:11434")
    pub host: String,

    /// Model tag served locally
    pub model: String,

    /// Sampling temperature; `None` leaves the server default in place
    pub temperature: Option<f32>,
}

impl Default for LocalLlmConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_OLLAMA_HOST.to_string(),
            model: "gemma2:2b".to_string(),
            temperature: None,
        }
    }
}

/// RAG service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagConfig {
    /// Base URL of the RAG service
    pub api_base: String,

    /// Number of documents the retriever should return per query
    pub top_k: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            api_base: "http://localhost:8000".to_string(),
            top_k: 3,
        }
    }
}

/// Observability backend credentials. All optional.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TelemetryConfig {
    pub public_key: Option<String>,
    pub secret_key: Option<String>,
    pub host: Option<String>,
}

impl TelemetryConfig {
    /// True when both keys are present.
    pub fn is_configured(&self) -> bool {
        self.public_key.is_some() && self.secret_key.is_some()
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Hosted provider settings
    pub llm: LlmConfig,
    /// Local inference server settings
    pub local: LocalLlmConfig,
    /// RAG service settings
    pub rag: RagConfig,
    /// Telemetry credentials
    pub telemetry: TelemetryConfig,
    /// Root directory for datasets and experiment reports
    pub base_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm: LlmConfig::default(),
            local: LocalLlmConfig::default(),
            rag: RagConfig::default(),
            telemetry: TelemetryConfig::default(),
            base_dir: PathBuf::from("evals"),
        }
    }
}

/// Configuration file structure (YAML format).
#[derive(Debug, Deserialize)]
struct ConfigFile {
    llm: Option<LlmFileSection>,
    local: Option<LocalFileSection>,
    rag: Option<RagFileSection>,
    base_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct LlmFileSection {
    api_base: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct LocalFileSection {
    host: Option<String>,
    model: Option<String>,
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct RagFileSection {
    api_base: Option<String>,
    top_k: Option<usize>,
}

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (GOOGLE_GEN_AI, LLM_MODEL, OLLAMA_HOST, RAG_API_BASE, ...)
    /// 2. Config file (~/.config/rag-evals/config.yaml)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                config = Self::load_from_file(&config_path)?;
            }
        }

        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    /// Override fields from a variable lookup.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(api_base) = var("LLM_API_BASE") {
            self.llm.api_base = api_base;
        }

        // GOOGLE_GEN_AI is the provider key; LLM_API_KEY is accepted for
        // other OpenAI-compatible providers.
        if let Some(api_key) = var("GOOGLE_GEN_AI").or_else(|| var("LLM_API_KEY")) {
            self.llm.api_key = api_key;
        }

        if let Some(model) = var("LLM_MODEL") {
            self.llm.model = model;
        }

        if let Some(max_tokens) = var("LLM_MAX_TOKENS") {
            if let Ok(tokens) = max_tokens.parse() {
                self.llm.max_tokens = tokens;
            }
        }

        if let Some(temperature) = var("LLM_TEMPERATURE") {
            if let Ok(temp) = temperature.parse() {
                self.llm.temperature = temp;
            }
        }

        if let Some(host) = var("OLLAMA_HOST") {
            self.local.host = host;
        }

        if let Some(model) = var("OLLAMA_MODEL") {
            self.local.model = model;
        }

        if let Some(api_base) = var("RAG_API_BASE") {
            self.rag.api_base = api_base;
        }

        if let Some(top_k) = var("RAG_TOP_K") {
            if let Ok(k) = top_k.parse() {
                self.rag.top_k = k;
            }
        }

        if let Some(dir) = var("EVAL_BASE_DIR") {
            self.base_dir = PathBuf::from(dir);
        }

        self.telemetry.public_key = var("LANGFUSE_PUBLIC_KEY").or(self.telemetry.public_key.take());
        self.telemetry.secret_key = var("LANGFUSE_SECRET_KEY").or(self.telemetry.secret_key.take());
        self.telemetry.host = var("LANGFUSE_HOST").or(self.telemetry.host.take());
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
        Self::from_yaml(&content)
    }

    fn from_yaml(content: &str) -> Result<Self> {
        let file_config: ConfigFile = serde_yaml::from_str(content)
            .map_err(|e| EvalError::Config(format!("Failed to parse config file: {}", e)))?;

        let mut config = Config::default();

        if let Some(llm) = file_config.llm {
            if let Some(api_base) = llm.api_base {
                config.llm.api_base = api_base;
            }
            if let Some(api_key) = llm.api_key {
                config.llm.api_key = api_key;
            }
            if let Some(model) = llm.model {
                config.llm.model = model;
            }
            if let Some(max_tokens) = llm.max_tokens {
                config.llm.max_tokens = max_tokens;
            }
            if let Some(temperature) = llm.temperature {
                config.llm.temperature = temperature;
            }
        }

        if let Some(local) = file_config.local {
            if let Some(host) = local.host {
                config.local.host = host;
            }
            if let Some(model) = local.model {
                config.local.model = model;
            }
            config.local.temperature = local.temperature;
        }

        if let Some(rag) = file_config.rag {
            if let Some(api_base) = rag.api_base {
                config.rag.api_base = api_base;
            }
            if let Some(top_k) = rag.top_k {
                config.rag.top_k = top_k;
            }
        }

        if let Some(base_dir) = file_config.base_dir {
            config.base_dir = base_dir;
        }

        Ok(config)
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "rag-evals")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate that the hosted provider can be called.
    pub fn validate_provider(&self) -> Result<()> {
        if self.llm.api_base.is_empty() {
            return Err(EvalError::Config(
                "LLM API base URL is required. Set LLM_API_BASE environment variable or add to config file.".to_string()
            ));
        }

        if self.llm.api_key.is_empty() {
            return Err(EvalError::Config(
                "Provider API key is required. Set GOOGLE_GEN_AI environment variable or add to config file.".to_string()
            ));
        }

        if self.llm.model.is_empty() {
            return Err(EvalError::Config(
                "LLM model is required. Set LLM_MODEL environment variable or add to config file."
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// Validate the local server and RAG settings.
    pub fn validate_local(&self) -> Result<()> {
        if self.local.host.is_empty() || self.local.model.is_empty() {
            return Err(EvalError::Config(
                "Local model host and name are required. Set OLLAMA_HOST and OLLAMA_MODEL."
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// Validate that the RAG service is reachable by address.
    pub fn validate_rag(&self) -> Result<()> {
        if self.rag.api_base.is_empty() {
            return Err(EvalError::Config(
                "RAG service URL is required. Set RAG_API_BASE environment variable or add to config file.".to_string()
            ));
        }
        if self.rag.top_k == 0 {
            return Err(EvalError::Config("rag.top_k must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Create a config from explicit values (useful for testing).
    pub fn with_llm(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            llm: LlmConfig {
                api_base: api_base.into(),
                api_key: api_key.into(),
                model: model.into(),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}
