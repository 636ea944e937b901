//! RAG Evals - LLM-graded evaluation of retrieval-augmented-generation pipelines.
//!
//! For each test case the harness queries a RAG pipeline, asks a language
//! model to grade the answer, and records the verdicts together with the
//! latency of every call. Results are written as CSV reports.
//!
//! # Quick Start
//!
//! ```no_run
//! use rag_evals::{
//!     config::Config,
//!     eval::{
//!         sample_queries, EvaluatorConfig, ExperimentRunner, Metric, NumericMetric,
//!         QueryEvaluator, RunnerConfig,
//!     },
//!     llm::OllamaClient,
//!     rag::HttpRagClient,
//!     report::{ReportWriter, DEFAULT_REPORT_PREFIX},
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!
//!     let metrics: Vec<Arc<dyn Metric>> = vec![
//!         Arc::new(NumericMetric::relevance()),
//!         Arc::new(NumericMetric::completeness()),
//!         Arc::new(NumericMetric::factual_accuracy()),
//!     ];
//!     let evaluator = QueryEvaluator::new(
//!         Arc::new(HttpRagClient::new(config.rag.api_base.clone())),
//!         Arc::new(OllamaClient::new(config.local.clone())),
//!         metrics,
//!         EvaluatorConfig::default(),
//!     );
//!
//!     let runner = ExperimentRunner::new(evaluator, RunnerConfig::default());
//!     let table = runner.run_queries("latency", &sample_queries()).await?;
//!
//!     let writer = ReportWriter::new(&config.base_dir);
//!     let path = writer.timestamped_path(
//!         DEFAULT_REPORT_PREFIX,
//!         chrono::Local::now().naive_local(),
//!     );
//!     writer.write(&table, &path)?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **ChatModel**: one-method judge capability (`LlmClient`, `OllamaClient`)
//! - **RagClient**: the pipeline under test (`HttpRagClient`)
//! - **Metric**: prompt + verdict extraction (`NumericMetric`, `DiscreteMetric`)
//! - **QueryEvaluator** / **ExperimentRunner**: per-row and per-run drivers
//! - **ReportWriter**: timestamped CSV output

pub mod config;
pub mod error;
pub mod eval;
pub mod llm;
pub mod rag;
pub mod report;

// Re-export commonly used types
pub use config::Config;
pub use error::{EvalError, Result};
pub use eval::{Dataset, EvaluationRecord, ExperimentRunner, QueryEvaluator, ResultTable, TestCase};
pub use llm::{ChatModel, LlmClient, OllamaClient};
pub use rag::{HttpRagClient, RagClient, RagResponse};
pub use report::ReportWriter;
