//! Client side of the RAG pipeline under evaluation.
//!
//! The retriever and generator live in a separate service. The harness only
//! depends on [`RagClient`]: send a question, get back an answer and an
//! optional log reference.

use crate::error::{EvalError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// What the RAG pipeline returned for one query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RagResponse {
    /// Generated answer, if the pipeline produced one.
    #[serde(default)]
    pub answer: Option<String>,
    /// Reference to the pipeline's trace for this query (usually a file path).
    #[serde(default)]
    pub logs: Option<String>,
}

impl RagResponse {
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: Some(answer.into()),
            logs: None,
        }
    }

    pub fn with_logs(mut self, logs: impl Into<String>) -> Self {
        self.logs = Some(logs.into());
        self
    }

    /// The answer, or `placeholder` when the pipeline omitted it.
    pub fn answer_or(&self, placeholder: &str) -> String {
        self.answer
            .clone()
            .unwrap_or_else(|| placeholder.to_string())
    }
}

/// A queryable RAG pipeline.
#[async_trait]
pub trait RagClient: Send + Sync {
    /// Answer `question`, retrieving up to `top_k` documents when given.
    async fn query(&self, question: &str, top_k: Option<usize>) -> Result<RagResponse>;
}

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    question: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<usize>,
}

/// RAG client for a service exposing `POST /query`.
#[derive(Clone)]
pub struct HttpRagClient {
    client: Client,
    api_base: String,
}

impl HttpRagClient {
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_base: api_base.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/query", self.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl RagClient for HttpRagClient {
    async fn query(&self, question: &str, top_k: Option<usize>) -> Result<RagResponse> {
        let response = self
            .client
            .post(self.endpoint())
            .json(&QueryRequest { question, top_k })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(EvalError::Rag(format!("query failed ({}): {}", status, body)));
        }

        serde_json::from_str(&body)
            .map_err(|e| EvalError::Rag(format!("malformed response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_answer_or_substitutes_placeholder() {
        let missing = RagResponse::default();
        assert_eq!(missing.answer_or(""), "");
        assert_eq!(missing.answer_or(" "), " ");

        let present = RagResponse::new("Ragas is a library.");
        assert_eq!(present.answer_or(""), "Ragas is a library.");
    }

    #[test]
    fn test_missing_fields_deserialize_to_none() {
        let response: RagResponse = serde_json::from_str(r#"{"retrieved": []}"#).unwrap();
        assert_eq!(response, RagResponse::default());
    }

    #[tokio::test]
    async fn test_http_query_sends_top_k() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/query"))
            .and(body_json(serde_json::json!({"question": "What is Ragas?", "top_k": 3})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "answer": "An evaluation toolkit.",
                "logs": "logs/run_1.json"
            })))
            .mount(&server)
            .await;

        let client = HttpRagClient::new(server.uri());
        let response = client.query("What is Ragas?", Some(3)).await.unwrap();
        assert_eq!(
            response,
            RagResponse::new("An evaluation toolkit.").with_logs("logs/run_1.json")
        );
    }

    #[tokio::test]
    async fn test_http_query_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("index not loaded"))
            .mount(&server)
            .await;

        let err = HttpRagClient::new(server.uri())
            .query("q", None)
            .await
            .unwrap_err();
        assert!(matches!(err, EvalError::Rag(ref m) if m.contains("index not loaded")));
    }
}
