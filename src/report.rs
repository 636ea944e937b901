//! CSV report writer for result tables.
//!
//! Reports land in `<base_dir>/experiments/`. Timestamped names have
//! one-second resolution, so two runs with the same prefix started in the
//! same second write to the same file.

use crate::error::{EvalError, Result};
use crate::eval::{EvaluationRecord, ReportLayout, ResultTable};
use chrono::NaiveDateTime;
use std::fs;
use std::path::{Path, PathBuf};

/// Directory under the base dir that holds reports.
pub const EXPERIMENTS_DIR: &str = "experiments";

/// File-name prefix for latency reports.
pub const DEFAULT_REPORT_PREFIX: &str = "rag_eval_report";

/// Score column of an experiment report with exactly one metric.
pub const SCORE_COLUMN: &str = "score";

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Writes [`ResultTable`]s as CSV files.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    base_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn experiments_dir(&self) -> PathBuf {
        self.base_dir.join(EXPERIMENTS_DIR)
    }

    /// `<base>/experiments/<prefix><YYYYMMDD_HHMMSS>.csv`
    pub fn timestamped_path(&self, prefix: &str, now: NaiveDateTime) -> PathBuf {
        self.experiments_dir()
            .join(format!("{}{}.csv", prefix, now.format(TIMESTAMP_FORMAT)))
    }

    /// `<base>/experiments/<name>.csv`
    pub fn named_path(&self, name: &str) -> PathBuf {
        self.experiments_dir().join(format!("{}.csv", name))
    }

    /// Write `table` to `path`, creating parent directories. Returns the path written.
    pub fn write(&self, table: &ResultTable, path: &Path) -> Result<PathBuf> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).map_err(|e| EvalError::io(parent, e))?;
            }
        }

        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(header(table))?;
        for record in &table.records {
            writer.write_record(row(table.layout, record))?;
        }
        writer.flush().map_err(|e| EvalError::io(path, e))?;

        tracing::info!(path = %path.display(), rows = table.len(), "report written");
        Ok(path.to_path_buf())
    }
}

/// Sibling path for a run that aborted: `report.csv` becomes `report_partial.csv`.
pub fn partial_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}_partial.csv", stem))
}

/// Column names in construction order.
pub fn header(table: &ResultTable) -> Vec<String> {
    let metrics = table.metrics.iter().cloned();
    match table.layout {
        ReportLayout::Latency => ["query", "answer"]
            .into_iter()
            .map(String::from)
            .chain(metrics)
            .chain(
                ["rag_latency_sec", "evaluation_latency_sec", "total_latency_sec"]
                    .into_iter()
                    .map(String::from),
            )
            .collect(),
        ReportLayout::Experiment => {
            // A single metric keeps the plain `score` column of experiment reports.
            let scores: Vec<String> = if table.metrics.len() == 1 {
                vec![SCORE_COLUMN.to_string()]
            } else {
                metrics.collect()
            };
            ["question", "grading_notes", "response"]
                .into_iter()
                .map(String::from)
                .chain(scores)
                .chain(std::iter::once("log_file".to_string()))
                .collect()
        }
    }
}

fn row(layout: ReportLayout, record: &EvaluationRecord) -> Vec<String> {
    let scores = record.scores.iter().map(|s| s.result.verdict.to_string());
    match layout {
        ReportLayout::Latency => [record.query.clone(), record.answer.clone()]
            .into_iter()
            .chain(scores)
            .chain([
                record.rag_latency.as_secs_f64().to_string(),
                record.evaluation_latency().as_secs_f64().to_string(),
                record.total_latency().as_secs_f64().to_string(),
            ])
            .collect(),
        ReportLayout::Experiment => [
            record.query.clone(),
            record.grading_notes.clone().unwrap_or_default(),
            record.answer.clone(),
        ]
        .into_iter()
        .chain(scores)
        .chain(std::iter::once(record.log_file.clone().unwrap_or_default()))
        .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::eval::{NamedScore, ScoreResult, Verdict};
    use chrono::NaiveDate;
    use std::time::Duration;
    use tempfile::TempDir;

    fn record(query: &str, verdicts: &[(&str, Verdict)]) -> EvaluationRecord {
        EvaluationRecord {
            query: query.to_string(),
            grading_notes: Some("- point one, point two".to_string()),
            answer: "It is, in short, a toolkit.".to_string(),
            log_file: Some("logs/run.json".to_string()),
            scores: verdicts
                .iter()
                .map(|(name, v)| NamedScore {
                    name: name.to_string(),
                    result: ScoreResult::new(v.clone(), Duration::from_millis(250)),
                })
                .collect(),
            rag_latency: Duration::from_millis(500),
        }
    }

    fn latency_table() -> ResultTable {
        let mut table = ResultTable::new(
            "rag_eval_report",
            ReportLayout::Latency,
            vec!["relevance".into(), "completeness".into()],
        );
        table.push(record(
            "What is Ragas?",
            &[("relevance", Verdict::Score(0.75)), ("completeness", Verdict::Score(1.0))],
        ));
        table
    }

    #[test]
    fn test_timestamped_path() {
        let writer = ReportWriter::new("evals");
        let now = NaiveDate::from_ymd_opt(2026, 3, 7)
            .unwrap()
            .and_hms_opt(9, 5, 1)
            .unwrap();
        assert_eq!(
            writer.timestamped_path(DEFAULT_REPORT_PREFIX, now),
            PathBuf::from("evals/experiments/rag_eval_report20260307_090501.csv")
        );
        assert_eq!(
            writer.named_path("test_dataset_run"),
            PathBuf::from("evals/experiments/test_dataset_run.csv")
        );
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("evals/experiments/report.csv")),
            PathBuf::from("evals/experiments/report_partial.csv")
        );
    }

    #[test]
    fn test_latency_header() {
        assert_eq!(
            header(&latency_table()),
            [
                "query",
                "answer",
                "relevance",
                "completeness",
                "rag_latency_sec",
                "evaluation_latency_sec",
                "total_latency_sec"
            ]
        );
    }

    #[test]
    fn test_experiment_header_names_metrics_when_several() {
        let table = ResultTable::new(
            "exp",
            ReportLayout::Experiment,
            vec!["correctness".into(), "relevance".into()],
        );
        assert_eq!(
            header(&table),
            ["question", "grading_notes", "response", "correctness", "relevance", "log_file"]
        );
    }

    #[test]
    fn test_write_latency_report() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path().join("nested"));
        let path = writer.named_path("report");

        writer.write(&latency_table(), &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next(),
            Some("query,answer,relevance,completeness,rag_latency_sec,evaluation_latency_sec,total_latency_sec")
        );
        assert_eq!(
            lines.next(),
            Some("What is Ragas?,\"It is, in short, a toolkit.\",0.75,1,0.5,0.5,1")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_write_experiment_report() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path());
        let mut table = ResultTable::new("exp", ReportLayout::Experiment, vec!["correctness".into()]);
        table.push(record("Q1", &[("correctness", Verdict::Label("pass".into()))]));
        table.push(record("Q2", &[("correctness", Verdict::Error("timed out".into()))]));

        let path = writer.write(&table, &writer.named_path("exp")).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            ["question", "grading_notes", "response", "score", "log_file"]
        );
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][1], "- point one, point two");
        assert_eq!(&rows[0][3], "pass");
        assert_eq!(&rows[0][4], "logs/run.json");
        assert_eq!(&rows[1][3], "error: timed out");
    }

    #[test]
    fn test_empty_table_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path());
        let table = ResultTable::new("empty", ReportLayout::Experiment, vec!["correctness".into()]);
        let path = writer.write(&table, &writer.named_path("empty")).unwrap();
        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "question,grading_notes,response,score,log_file\n"
        );
    }
}
