//! Per-query evaluation: one RAG call followed by every configured metric.

use super::dataset::TestCase;
use super::metrics::{Metric, MetricInput};
use super::record::{EvaluationRecord, NamedScore, ScoreResult, Verdict};
use crate::error::{EvalError, Result};
use crate::llm::ChatModel;
use crate::rag::RagClient;
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How the metrics of one row are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoringMode {
    /// One judge call after another.
    #[default]
    Sequential,
    /// All judge calls in flight at once.
    Concurrent,
}

/// Configuration for the evaluator.
#[derive(Debug, Clone)]
pub struct EvaluatorConfig {
    /// Result count passed to the RAG client.
    pub top_k: Option<usize>,
    /// Answer text used when the RAG response has none.
    pub answer_placeholder: String,
    pub scoring: ScoringMode,
    /// Deadline applied to each RAG and judge call.
    pub call_timeout: Option<Duration>,
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            top_k: Some(3),
            answer_placeholder: String::new(),
            scoring: ScoringMode::Sequential,
            call_timeout: None,
        }
    }
}

/// Runs the RAG client and the metrics for one test case at a time.
pub struct QueryEvaluator {
    rag: Arc<dyn RagClient>,
    judge: Arc<dyn ChatModel>,
    metrics: Vec<Arc<dyn Metric>>,
    config: EvaluatorConfig,
}

impl QueryEvaluator {
    pub fn new(
        rag: Arc<dyn RagClient>,
        judge: Arc<dyn ChatModel>,
        metrics: Vec<Arc<dyn Metric>>,
        config: EvaluatorConfig,
    ) -> Self {
        Self {
            rag,
            judge,
            metrics,
            config,
        }
    }

    /// Metric names in the order their scores appear in each record.
    pub fn metric_names(&self) -> Vec<String> {
        self.metrics.iter().map(|m| m.name().to_string()).collect()
    }

    /// Query the RAG pipeline for `case` and grade the answer.
    pub async fn evaluate(&self, case: &TestCase) -> Result<EvaluationRecord> {
        let start = Instant::now();
        let response = self
            .deadline("rag query", self.rag.query(&case.query, self.config.top_k))
            .await?;
        let rag_latency = start.elapsed();

        if response.answer.is_none() {
            tracing::warn!(query = %case.query, "RAG response has no answer, using placeholder");
        }
        let answer = response.answer_or(&self.config.answer_placeholder);

        let input = MetricInput {
            query: &case.query,
            answer: &answer,
            grading_notes: case.grading_notes.as_deref(),
        };

        let results = match self.config.scoring {
            ScoringMode::Sequential => {
                let mut results = Vec::with_capacity(self.metrics.len());
                for metric in &self.metrics {
                    results.push(self.score(metric.as_ref(), &input).await?);
                }
                results
            }
            ScoringMode::Concurrent => join_all(
                self.metrics
                    .iter()
                    .map(|metric| self.score(metric.as_ref(), &input)),
            )
            .await
            .into_iter()
            .collect::<Result<Vec<_>>>()?,
        };

        let scores = self
            .metrics
            .iter()
            .zip(results)
            .map(|(metric, result)| NamedScore {
                name: metric.name().to_string(),
                result,
            })
            .collect();

        Ok(EvaluationRecord {
            query: case.query.clone(),
            grading_notes: case.grading_notes.clone(),
            answer,
            log_file: response.logs,
            scores,
            rag_latency,
        })
    }

    /// Record for a row that failed; every metric carries the error.
    pub fn error_record(&self, case: &TestCase, error: &EvalError) -> EvaluationRecord {
        let message = error.to_string();
        EvaluationRecord {
            query: case.query.clone(),
            grading_notes: case.grading_notes.clone(),
            answer: self.config.answer_placeholder.clone(),
            log_file: None,
            scores: self
                .metrics
                .iter()
                .map(|metric| NamedScore {
                    name: metric.name().to_string(),
                    result: ScoreResult::new(Verdict::Error(message.clone()), Duration::ZERO),
                })
                .collect(),
            rag_latency: Duration::ZERO,
        }
    }

    async fn score(&self, metric: &dyn Metric, input: &MetricInput<'_>) -> Result<ScoreResult> {
        let stage = format!("{} scoring", metric.name());
        self.deadline(&stage, metric.score(self.judge.as_ref(), input))
            .await
    }

    async fn deadline<T>(&self, stage: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        match self.config.call_timeout {
            Some(limit) => match tokio::time::timeout(limit, fut).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(stage, ?limit, "call timed out");
                    Err(EvalError::timeout(stage, limit))
                }
            },
            None => fut.await,
        }
    }
}
