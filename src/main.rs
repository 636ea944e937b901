//! RAG Evals CLI
//!
//! Grades a RAG pipeline's answers with an LLM judge and writes CSV reports.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rag_evals::{
    config::Config,
    eval::{
        Dataset, DiscreteMetric, EvaluatorConfig, ExperimentRunner, FailurePolicy, Metric,
        NumericMetric, QueryEvaluator, ResultTable, RunAborted, RunnerConfig, ScoringMode,
        TestCase, load_or_seed, sample_queries,
    },
    llm::{ChatModel, LlmClient, OllamaClient},
    rag::HttpRagClient,
    report::{DEFAULT_REPORT_PREFIX, ReportWriter, partial_path},
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// RAG Evals - LLM-graded evaluation of a RAG pipeline
#[derive(Parser)]
#[command(name = "rag-eval")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Which model grades the answers (default depends on the command)
    #[arg(long, global = true, value_enum)]
    judge: Option<JudgeKind>,

    /// Number of documents the RAG pipeline retrieves per query
    #[arg(short = 'k', long, global = true)]
    top_k: Option<usize>,

    /// Record failing rows as errors instead of aborting the run
    #[arg(long, global = true)]
    continue_on_error: bool,

    /// Run all metrics of a row concurrently
    #[arg(long, global = true)]
    concurrent_scoring: bool,

    /// Per-call timeout for RAG and judge requests, in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<f64>,

    /// Maximum number of rows to evaluate
    #[arg(long, global = true)]
    max_items: Option<usize>,

    /// Root directory for datasets and reports (overrides EVAL_BASE_DIR)
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Score relevance, completeness and factual accuracy with latency columns
    Latency {
        /// File with one query per line (defaults to the built-in queries)
        #[arg(long)]
        queries: Option<PathBuf>,

        /// Report file-name prefix
        #[arg(long, default_value = DEFAULT_REPORT_PREFIX)]
        prefix: String,
    },

    /// Grade answers pass/fail against a dataset's grading notes
    Experiment {
        /// Dataset name under <base-dir>/datasets
        #[arg(long, default_value = "test_dataset")]
        dataset: String,

        /// Require the saved dataset instead of seeding the sample rows when it is missing
        #[arg(long)]
        load: bool,

        /// Experiment name (defaults to <dataset>_<timestamp>)
        #[arg(long)]
        name: Option<String>,
    },

    /// List models available from the provider
    Models,

    /// Test provider connection
    Test,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum JudgeKind {
    /// Hosted generative-model provider
    Provider,
    /// Local inference server
    Local,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    dotenvy::dotenv().ok();
    init_tracing(cli.verbose);

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(dir) = &cli.base_dir {
        config.base_dir = dir.clone();
    }
    if let Some(k) = cli.top_k {
        config.rag.top_k = k;
    }

    if config.telemetry.is_configured() {
        tracing::info!(
            host = config.telemetry.host.as_deref().unwrap_or("default"),
            "telemetry credentials present; traces are not exported by this tool"
        );
    }

    match &cli.command {
        Commands::Latency { queries, prefix } => {
            cmd_latency(&cli, &config, queries.as_deref(), prefix).await
        }
        Commands::Experiment {
            dataset,
            load,
            name,
        } => cmd_experiment(&cli, &config, dataset, *load, name.as_deref()).await,
        Commands::Models => cmd_models(&config).await,
        Commands::Test => cmd_test(&config).await,
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "rag_evals=debug,rag_eval=debug"
    } else {
        "rag_evals=info,rag_eval=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn cmd_latency(
    cli: &Cli,
    config: &Config,
    queries_path: Option<&Path>,
    prefix: &str,
) -> Result<()> {
    let cases = match queries_path {
        Some(path) => read_queries(path)?,
        None => sample_queries(),
    };

    let metrics: Vec<Arc<dyn Metric>> = vec![
        Arc::new(NumericMetric::relevance()),
        Arc::new(NumericMetric::completeness()),
        Arc::new(NumericMetric::factual_accuracy()),
    ];
    let runner = build_runner(cli, config, cli.judge.unwrap_or(JudgeKind::Local), metrics)?;

    let writer = ReportWriter::new(&config.base_dir);
    let path = writer.timestamped_path(prefix, chrono::Local::now().naive_local());
    let run_name = file_stem(&path);

    let result = runner.run_queries(&run_name, &cases).await;
    persist(&writer, result, &path)
}

async fn cmd_experiment(
    cli: &Cli,
    config: &Config,
    dataset_name: &str,
    load: bool,
    name: Option<&str>,
) -> Result<()> {
    let dataset = if load {
        Dataset::load(dataset_name, &config.base_dir).context("Failed to load dataset")?
    } else {
        let (dataset, seeded) =
            load_or_seed(dataset_name, &config.base_dir).context("Failed to prepare dataset")?;
        if seeded {
            tracing::info!(path = %dataset.path().display(), rows = dataset.len(), "sample dataset saved");
        } else {
            tracing::info!(path = %dataset.path().display(), "using existing dataset");
        }
        dataset
    };
    println!("Dataset: {} ({} rows)", dataset.name, dataset.len());

    let metrics: Vec<Arc<dyn Metric>> = vec![Arc::new(DiscreteMetric::correctness())];
    let runner = build_runner(cli, config, cli.judge.unwrap_or(JudgeKind::Provider), metrics)?;

    let writer = ReportWriter::new(&config.base_dir);
    let path = match name {
        Some(name) => writer.named_path(name),
        None => writer.timestamped_path(
            &format!("{}_", dataset.name),
            chrono::Local::now().naive_local(),
        ),
    };
    let run_name = file_stem(&path);

    let result = runner.run_experiment(&run_name, &dataset).await;
    persist(&writer, result, &path)
}

async fn cmd_models(config: &Config) -> Result<()> {
    config.validate_provider().context("Invalid configuration")?;
    let client = LlmClient::new(config.llm.clone());

    let models = client.list_models().await.context("Failed to list models")?;
    for model in &models {
        println!("{}", model);
    }
    println!("\n{} models available at {}", models.len(), config.llm.api_base);
    Ok(())
}

async fn cmd_test(config: &Config) -> Result<()> {
    config.validate_provider().context("Invalid configuration")?;

    println!("Testing connection to: {}", config.llm.api_base);
    println!("Using model: {}", config.llm.model);

    let client = LlmClient::new(config.llm.clone());
    client
        .test_connection()
        .await
        .context("Connection test failed")?;

    println!("Connection successful!");
    Ok(())
}

fn build_runner(
    cli: &Cli,
    config: &Config,
    judge_kind: JudgeKind,
    metrics: Vec<Arc<dyn Metric>>,
) -> Result<ExperimentRunner> {
    config.validate_rag().context("Invalid configuration")?;

    let judge: Arc<dyn ChatModel> = match judge_kind {
        JudgeKind::Provider => {
            config.validate_provider().context("Invalid configuration")?;
            println!("Judge: {} (provider)", config.llm.model);
            Arc::new(LlmClient::new(config.llm.clone()))
        }
        JudgeKind::Local => {
            config.validate_local().context("Invalid configuration")?;
            println!("Judge: {} (local, {})", config.local.model, config.local.host);
            Arc::new(OllamaClient::new(config.local.clone()))
        }
    };

    let call_timeout = cli.timeout_secs.map(parse_timeout).transpose()?;

    let evaluator = QueryEvaluator::new(
        Arc::new(HttpRagClient::new(config.rag.api_base.clone())),
        judge,
        metrics,
        EvaluatorConfig {
            top_k: Some(config.rag.top_k),
            scoring: if cli.concurrent_scoring {
                ScoringMode::Concurrent
            } else {
                ScoringMode::Sequential
            },
            call_timeout,
            ..Default::default()
        },
    );

    Ok(ExperimentRunner::new(
        evaluator,
        RunnerConfig {
            failure_policy: if cli.continue_on_error {
                FailurePolicy::Record
            } else {
                FailurePolicy::Abort
            },
            max_items: cli.max_items,
        },
    ))
}

/// Write the finished table, or whatever completed before an abort.
fn persist(
    writer: &ReportWriter,
    result: std::result::Result<ResultTable, Box<RunAborted>>,
    path: &Path,
) -> Result<()> {
    match result {
        Ok(table) => {
            writer.write(&table, path).context("Failed to write report")?;
            table.print_summary();
            let shown = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
            println!("Results saved to: {}", shown.display());
            Ok(())
        }
        Err(aborted) => {
            if !aborted.partial.is_empty() {
                let partial = partial_path(path);
                writer
                    .write(&aborted.partial, &partial)
                    .context("Failed to write partial report")?;
                eprintln!(
                    "Partial results ({} rows) saved to: {}",
                    aborted.partial.len(),
                    partial.display()
                );
            }
            Err(anyhow::Error::from(aborted).context("Evaluation run failed"))
        }
    }
}

fn parse_timeout(secs: f64) -> Result<Duration> {
    match Duration::try_from_secs_f64(secs) {
        Ok(limit) if !limit.is_zero() => Ok(limit),
        _ => anyhow::bail!("--timeout-secs must be a positive, finite number of seconds"),
    }
}

fn read_queries(path: &Path) -> Result<Vec<TestCase>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read queries file: {}", path.display()))?;
    let cases: Vec<TestCase> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(TestCase::new)
        .collect();
    if cases.is_empty() {
        anyhow::bail!("No queries found in {}", path.display());
    }
    Ok(cases)
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_timeout() {
        assert_eq!(parse_timeout(1.5).unwrap(), Duration::from_millis(1500));
        assert!(parse_timeout(0.0).is_err());
        assert!(parse_timeout(-2.0).is_err());
        assert!(parse_timeout(f64::INFINITY).is_err());
        assert!(parse_timeout(f64::NAN).is_err());
        assert!(parse_timeout(1e30).is_err());
    }
}
