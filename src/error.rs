//! Error types for the evaluation harness.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, EvalError>;

/// Errors that can occur while running an evaluation.
#[derive(Error, Debug)]
pub enum EvalError {
    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error during serialization/deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration file or environment error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// LLM API error.
    #[error("LLM API error: {0}")]
    LlmApi(String),

    /// LLM response parsing error.
    #[error("Failed to parse LLM response: {0}")]
    LlmParse(String),

    /// HTTP request error.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The RAG service rejected or failed a query.
    #[error("RAG client error: {0}")]
    Rag(String),

    /// A call exceeded its configured deadline.
    #[error("{stage} timed out after {secs:.1}s")]
    Timeout { stage: String, secs: f64 },

    /// Dataset store error.
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// CSV encoding or decoding error.
    #[error("CSV error: {0}")]
    Csv(String),
}

impl EvalError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a timeout error for the named stage.
    pub fn timeout(stage: impl Into<String>, limit: std::time::Duration) -> Self {
        Self::Timeout {
            stage: stage.into(),
            secs: limit.as_secs_f64(),
        }
    }
}

impl From<reqwest::Error> for EvalError {
    fn from(err: reqwest::Error) -> Self {
        EvalError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for EvalError {
    fn from(err: serde_json::Error) -> Self {
        EvalError::LlmParse(err.to_string())
    }
}

impl From<csv::Error> for EvalError {
    fn from(err: csv::Error) -> Self {
        EvalError::Csv(err.to_string())
    }
}
