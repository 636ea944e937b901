//! Experiment runner: evaluates test cases in order and builds the result table.

use super::dataset::{Dataset, TestCase};
use super::evaluator::QueryEvaluator;
use super::record::{ReportLayout, ResultTable};
use crate::error::EvalError;
use std::time::Instant;

/// What to do when a row's RAG or scoring call fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the run at the first failing row.
    #[default]
    Abort,
    /// Record the failure as an error verdict and keep going.
    Record,
}

/// Configuration for the runner.
#[derive(Debug, Clone, Default)]
pub struct RunnerConfig {
    pub failure_policy: FailurePolicy,
    /// Maximum rows to evaluate (for quick testing).
    pub max_items: Option<usize>,
}

/// A run stopped early. Carries every row completed before the failure.
#[derive(Debug, thiserror::Error)]
#[error(
    "run '{}' aborted at row {} ({:?}): {source}",
    .partial.name,
    one_based(.row),
    .query
)]
pub struct RunAborted {
    /// Zero-based index of the failing row.
    pub row: usize,
    pub query: String,
    /// Rows completed before the failure.
    pub partial: ResultTable,
    #[source]
    pub source: EvalError,
}

fn one_based(row: &usize) -> usize {
    row + 1
}

/// Drives a [`QueryEvaluator`] over a list of test cases.
pub struct ExperimentRunner {
    evaluator: QueryEvaluator,
    config: RunnerConfig,
}

impl ExperimentRunner {
    pub fn new(evaluator: QueryEvaluator, config: RunnerConfig) -> Self {
        Self { evaluator, config }
    }

    /// Evaluate literal queries into a latency-report table.
    pub async fn run_queries(
        &self,
        name: &str,
        cases: &[TestCase],
    ) -> Result<ResultTable, Box<RunAborted>> {
        self.run(name, ReportLayout::Latency, cases).await
    }

    /// Evaluate every row of a dataset into an experiment table.
    pub async fn run_experiment(
        &self,
        name: &str,
        dataset: &Dataset,
    ) -> Result<ResultTable, Box<RunAborted>> {
        tracing::info!(dataset = %dataset.name, rows = dataset.len(), "starting experiment");
        self.run(name, ReportLayout::Experiment, dataset.cases()).await
    }

    async fn run(
        &self,
        name: &str,
        layout: ReportLayout,
        cases: &[TestCase],
    ) -> Result<ResultTable, Box<RunAborted>> {
        let start_time = Instant::now();
        let mut table = ResultTable::new(name, layout, self.evaluator.metric_names());

        let limit = self.config.max_items.unwrap_or(cases.len());
        let cases = &cases[..limit.min(cases.len())];

        tracing::info!(run = name, rows = cases.len(), "running evaluation");

        for (idx, case) in cases.iter().enumerate() {
            tracing::info!("[{}/{}] Evaluating query: {}", idx + 1, cases.len(), case.query);

            match self.evaluator.evaluate(case).await {
                Ok(record) => {
                    tracing::debug!(
                        total_latency = ?record.total_latency(),
                        rag_latency = ?record.rag_latency,
                        "row complete"
                    );
                    table.push(record);
                }
                Err(e) => match self.config.failure_policy {
                    FailurePolicy::Abort => {
                        return Err(Box::new(RunAborted {
                            row: idx,
                            query: case.query.clone(),
                            partial: table,
                            source: e,
                        }));
                    }
                    FailurePolicy::Record => {
                        tracing::warn!(query = %case.query, error = %e, "row failed, recording error");
                        table.push(self.evaluator.error_record(case, &e));
                    }
                },
            }
        }

        tracing::info!(
            run = name,
            rows = table.len(),
            failed = table.error_count(),
            elapsed = ?start_time.elapsed(),
            "evaluation complete"
        );
        Ok(table)
    }
}
