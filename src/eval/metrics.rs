//! LLM-as-judge scoring metrics.
//!
//! Each metric renders one prompt, sends it to a [`ChatModel`], and turns the
//! free-text reply into a [`Verdict`]. Unparseable replies never fail: numeric
//! metrics fall back to `0.0` and categorical metrics to their fallback label.

use super::record::{ScoreResult, Verdict};
use crate::error::Result;
use crate::llm::{ChatModel, Message, Prompts};
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Instant;

static FIRST_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]*\.?[0-9]+").expect("number pattern is valid"));

/// Parse the first decimal number anywhere in `text`, or `0.0` if there is none.
///
/// Only ASCII digits count, so the first match always parses. Signs are not
/// part of the pattern, so `"-0.5"` yields `0.5`.
pub fn extract_first_number(text: &str) -> f64 {
    FIRST_NUMBER
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
        .unwrap_or(0.0)
}

/// The texts a metric may embed in its prompt.
#[derive(Debug, Clone, Copy)]
pub struct MetricInput<'a> {
    pub query: &'a str,
    pub answer: &'a str,
    pub grading_notes: Option<&'a str>,
}

impl MetricInput<'_> {
    fn render(&self, template: &str) -> String {
        Prompts::render(
            template,
            &[
                ("query", self.query),
                ("answer", self.answer),
                ("grading_notes", self.grading_notes.unwrap_or("")),
            ],
        )
    }
}

/// A scoring function backed by one judge call.
#[async_trait]
pub trait Metric: Send + Sync {
    /// Column name for this metric's verdicts.
    fn name(&self) -> &str;

    /// Judge `input` and report the verdict with the latency of the judge call.
    async fn score(&self, judge: &dyn ChatModel, input: &MetricInput<'_>) -> Result<ScoreResult>;
}

/// Send `prompt` as a single user message and time the call.
async fn ask(judge: &dyn ChatModel, prompt: String) -> Result<(String, std::time::Duration)> {
    tracing::debug!(%prompt, "judge prompt");
    let messages = [Message::user(prompt)];
    let start = Instant::now();
    let reply = judge.chat(&messages).await?;
    let latency = start.elapsed();
    tracing::debug!(reply = %reply.content, ?latency, "judge reply");
    Ok((reply.content, latency))
}

/// Metric whose verdict is the first number in the judge's reply.
#[derive(Debug, Clone)]
pub struct NumericMetric {
    name: String,
    template: String,
}

impl NumericMetric {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
        }
    }

    pub fn relevance() -> Self {
        Self::new("relevance", Prompts::relevance())
    }

    pub fn completeness() -> Self {
        Self::new("completeness", Prompts::completeness())
    }

    pub fn factual_accuracy() -> Self {
        Self::new("factual_accuracy", Prompts::factual_accuracy())
    }
}

#[async_trait]
impl Metric for NumericMetric {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, judge: &dyn ChatModel, input: &MetricInput<'_>) -> Result<ScoreResult> {
        let (reply, latency) = ask(judge, input.render(&self.template)).await?;
        Ok(ScoreResult::new(
            Verdict::Score(extract_first_number(&reply)),
            latency,
        ))
    }
}

/// Metric whose verdict is one label from an allowed set.
#[derive(Debug, Clone)]
pub struct DiscreteMetric {
    name: String,
    template: String,
    allowed: Vec<String>,
    fallback: String,
}

impl DiscreteMetric {
    /// The fallback label defaults to the last allowed value.
    pub fn new(name: impl Into<String>, template: impl Into<String>, allowed: &[&str]) -> Self {
        let allowed: Vec<String> = allowed.iter().map(|s| s.to_lowercase()).collect();
        let fallback = allowed.last().cloned().unwrap_or_default();
        Self {
            name: name.into(),
            template: template.into(),
            allowed,
            fallback,
        }
    }

    pub fn with_fallback(mut self, label: impl Into<String>) -> Self {
        self.fallback = label.into();
        self
    }

    /// Pass/fail grading against the test case's grading notes.
    pub fn correctness() -> Self {
        Self::new(
            "correctness",
            Prompts::grading_notes_correctness(),
            &["pass", "fail"],
        )
    }

    pub fn allowed_values(&self) -> &[String] {
        &self.allowed
    }

    /// The allowed label that occurs earliest in `reply` as a whole word.
    pub fn match_label(&self, reply: &str) -> Option<&str> {
        let reply = reply.to_lowercase();
        self.allowed
            .iter()
            .filter_map(|label| first_word_match(&reply, label).map(|pos| (pos, label)))
            .min_by_key(|(pos, _)| *pos)
            .map(|(_, label)| label.as_str())
    }
}

/// Byte offset of the first occurrence of `needle` bounded by non-word characters.
fn first_word_match(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    haystack.match_indices(needle).map(|(pos, _)| pos).find(|&pos| {
        let before = haystack[..pos].chars().next_back();
        let after = haystack[pos + needle.len()..].chars().next();
        !before.is_some_and(is_word) && !after.is_some_and(is_word)
    })
}

#[async_trait]
impl Metric for DiscreteMetric {
    fn name(&self) -> &str {
        &self.name
    }

    async fn score(&self, judge: &dyn ChatModel, input: &MetricInput<'_>) -> Result<ScoreResult> {
        let (reply, latency) = ask(judge, input.render(&self.template)).await?;
        let label = match self.match_label(&reply) {
            Some(label) => label.to_string(),
            None => {
                tracing::warn!(metric = %self.name, %reply, "no allowed label in reply, using fallback");
                self.fallback.clone()
            }
        };
        Ok(ScoreResult::new(Verdict::Label(label), latency))
    }
}
