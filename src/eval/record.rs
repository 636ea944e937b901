//! Row-level evaluation output and the table that collects it.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Outcome of one scoring call.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// Continuous score, nominally in `[0, 1]`.
    Score(f64),
    /// Categorical label from the metric's allowed set.
    Label(String),
    /// The row failed before this metric could produce a verdict.
    Error(String),
}

impl Verdict {
    pub fn as_score(&self) -> Option<f64> {
        match self {
            Verdict::Score(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            Verdict::Label(l) => Some(l),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Verdict::Error(_))
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Score(v) => write!(f, "{}", v),
            Verdict::Label(l) => f.write_str(l),
            Verdict::Error(e) => write!(f, "error: {}", e),
        }
    }
}

/// A verdict and how long the judge took to produce it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreResult {
    pub verdict: Verdict,
    pub latency: Duration,
}

impl ScoreResult {
    pub fn new(verdict: Verdict, latency: Duration) -> Self {
        Self { verdict, latency }
    }
}

/// A score tagged with the metric that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedScore {
    pub name: String,
    pub result: ScoreResult,
}

/// One evaluated test case.
///
/// Latency totals are derived from the stored per-stage latencies, so the
/// total always equals the RAG call plus every scoring call.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationRecord {
    /// The question sent to the RAG pipeline.
    pub query: String,
    /// Rubric the answer was graded against, when the test case had one.
    pub grading_notes: Option<String>,
    /// Answer text, with the placeholder substituted if the pipeline omitted it.
    pub answer: String,
    /// Log reference returned by the pipeline.
    pub log_file: Option<String>,
    /// Scores in metric-declaration order.
    pub scores: Vec<NamedScore>,
    /// Wall-clock time of the RAG call.
    pub rag_latency: Duration,
}

impl EvaluationRecord {
    /// Sum of all scoring-call latencies.
    pub fn evaluation_latency(&self) -> Duration {
        self.scores.iter().map(|s| s.result.latency).sum()
    }

    /// RAG latency plus all scoring latencies.
    pub fn total_latency(&self) -> Duration {
        self.rag_latency + self.evaluation_latency()
    }

    /// Verdict of the named metric.
    pub fn verdict(&self, metric: &str) -> Option<&Verdict> {
        self.scores
            .iter()
            .find(|s| s.name == metric)
            .map(|s| &s.result.verdict)
    }

    /// True when the row was recorded as a failure.
    pub fn is_error(&self) -> bool {
        self.scores.iter().any(|s| s.result.verdict.is_error())
    }
}

/// Column set used when the table is written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLayout {
    /// `query, answer, <metrics>, rag_latency_sec, evaluation_latency_sec, total_latency_sec`
    Latency,
    /// `question, grading_notes, response, <metrics>, log_file`
    Experiment,
}

/// Ordered evaluation results for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultTable {
    pub name: String,
    pub layout: ReportLayout,
    /// Metric names in column order; kept so an empty table still has a header.
    pub metrics: Vec<String>,
    pub records: Vec<EvaluationRecord>,
}

/// Aggregate of one metric over a table.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSummary {
    pub name: String,
    /// Mean of numeric verdicts, if there were any.
    pub mean: Option<f64>,
    /// Count per categorical label.
    pub labels: BTreeMap<String, usize>,
    pub errors: usize,
}

impl ResultTable {
    pub fn new(name: impl Into<String>, layout: ReportLayout, metrics: Vec<String>) -> Self {
        Self {
            name: name.into(),
            layout,
            metrics,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn push(&mut self, record: EvaluationRecord) {
        self.records.push(record);
    }

    /// Number of rows recorded as failures.
    pub fn error_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_error()).count()
    }

    /// Per-metric aggregates, in column order.
    pub fn summarize(&self) -> Vec<MetricSummary> {
        self.metrics
            .iter()
            .map(|name| {
                let mut scores = Vec::new();
                let mut labels = BTreeMap::new();
                let mut errors = 0;
                for verdict in self.records.iter().filter_map(|r| r.verdict(name)) {
                    match verdict {
                        Verdict::Score(v) => scores.push(*v),
                        Verdict::Label(l) => *labels.entry(l.clone()).or_insert(0) += 1,
                        Verdict::Error(_) => errors += 1,
                    }
                }
                let mean = if scores.is_empty() {
                    None
                } else {
                    Some(scores.iter().sum::<f64>() / scores.len() as f64)
                };
                MetricSummary {
                    name: name.clone(),
                    mean,
                    labels,
                    errors,
                }
            })
            .collect()
    }

    /// Mean total latency over all rows, in seconds.
    pub fn mean_total_latency_secs(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        let total: f64 = self
            .records
            .iter()
            .map(|r| r.total_latency().as_secs_f64())
            .sum();
        total / self.records.len() as f64
    }

    /// Print summary to stdout.
    pub fn print_summary(&self) {
        println!("\n========== Evaluation Results ==========");
        println!("Run: {}", self.name);
        println!("Rows: {} ({} failed)", self.len(), self.error_count());
        println!("----------------------------------------");
        for summary in self.summarize() {
            if let Some(mean) = summary.mean {
                println!("{:<20} mean {:.3}", summary.name, mean);
            }
            for (label, count) in &summary.labels {
                let pct = if self.is_empty() {
                    0.0
                } else {
                    *count as f64 / self.len() as f64 * 100.0
                };
                println!("{:<20} {}: {} ({:.1}%)", summary.name, label, count, pct);
            }
        }
        println!("----------------------------------------");
        println!("Avg total latency: {:.2}s", self.mean_total_latency_secs());
        println!("========================================\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(name: &str, verdict: Verdict, ms: u64) -> NamedScore {
        NamedScore {
            name: name.to_string(),
            result: ScoreResult::new(verdict, Duration::from_millis(ms)),
        }
    }

    fn record(query: &str, scores: Vec<NamedScore>) -> EvaluationRecord {
        EvaluationRecord {
            query: query.to_string(),
            grading_notes: None,
            answer: "answer".to_string(),
            log_file: None,
            scores,
            rag_latency: Duration::from_millis(250),
        }
    }

    #[test]
    fn test_total_latency_is_sum_of_stages() {
        let r = record(
            "q",
            vec![
                scored("relevance", Verdict::Score(0.5), 10),
                scored("completeness", Verdict::Score(1.0), 20),
                scored("factual_accuracy", Verdict::Score(0.0), 30),
            ],
        );
        assert_eq!(r.evaluation_latency(), Duration::from_millis(60));
        assert_eq!(r.total_latency(), Duration::from_millis(310));
    }

    #[test]
    fn test_verdict_display() {
        assert_eq!(Verdict::Score(0.75).to_string(), "0.75");
        assert_eq!(Verdict::Score(1.0).to_string(), "1");
        assert_eq!(Verdict::Label("pass".into()).to_string(), "pass");
        assert_eq!(Verdict::Error("timeout".into()).to_string(), "error: timeout");
    }

    #[test]
    fn test_summarize() {
        let mut table = ResultTable::new(
            "t",
            ReportLayout::Experiment,
            vec!["relevance".into(), "correctness".into()],
        );
        table.push(record(
            "a",
            vec![
                scored("relevance", Verdict::Score(1.0), 1),
                scored("correctness", Verdict::Label("pass".into()), 1),
            ],
        ));
        table.push(record(
            "b",
            vec![
                scored("relevance", Verdict::Score(0.5), 1),
                scored("correctness", Verdict::Label("fail".into()), 1),
            ],
        ));
        table.push(record(
            "c",
            vec![
                scored("relevance", Verdict::Error("boom".into()), 0),
                scored("correctness", Verdict::Error("boom".into()), 0),
            ],
        ));

        let summary = table.summarize();
        assert_eq!(summary[0].name, "relevance");
        assert!((summary[0].mean.unwrap() - 0.75).abs() < 1e-9);
        assert_eq!(summary[0].errors, 1);
        assert_eq!(summary[1].mean, None);
        assert_eq!(summary[1].labels.get("pass"), Some(&1));
        assert_eq!(summary[1].labels.get("fail"), Some(&1));
        assert_eq!(table.error_count(), 1);
    }

    #[test]
    fn test_empty_table_latency() {
        let table = ResultTable::new("t", ReportLayout::Latency, vec![]);
        assert!(table.is_empty());
        assert_eq!(table.mean_total_latency_secs(), 0.0);
    }
}
