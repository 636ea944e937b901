//! Evaluation of RAG answers with an LLM judge.
//!
//! This module provides:
//! - Scoring metrics (numeric 0-1 rubrics and pass/fail grading notes)
//! - A per-query evaluator that times the RAG call and every judge call
//! - A runner that evaluates test cases in order into a result table
//! - The local CSV dataset store

pub mod dataset;
pub mod evaluator;
pub mod metrics;
pub mod record;
pub mod runner;

pub use dataset::{Dataset, TestCase, create_sample_dataset, load_or_seed, sample_queries};
pub use evaluator::{EvaluatorConfig, QueryEvaluator, ScoringMode};
pub use metrics::{DiscreteMetric, Metric, MetricInput, NumericMetric, extract_first_number};
pub use record::{
    EvaluationRecord, MetricSummary, NamedScore, ReportLayout, ResultTable, ScoreResult, Verdict,
};
pub use runner::{ExperimentRunner, FailurePolicy, RunAborted, RunnerConfig};
