//! Prompt templates used by the scoring metrics.
//!
//! Placeholders are written as `{name}` and filled with [`Prompts::render`].

use regex::{Captures, Regex};
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("placeholder pattern is valid"));

/// Collection of prompts used for grading RAG answers.
pub struct Prompts;

impl Prompts {
    /// Does the answer address the question?
    pub fn relevance() -> &'static str {
        r#"
You are an evaluator. Score 0-1.
Question: {query}
Answer: {answer}
Return only a number between 0 and 1.
"#
    }

    /// Does the answer cover every part of the question?
    pub fn completeness() -> &'static str {
        r#"
You are an evaluator. Score 0-1.
Question: {query}
Answer: {answer}

Does the answer fully cover all parts of the question?
Return only a number between 0 and 1.
"#
    }

    /// Is the answer factually correct on its own?
    pub fn factual_accuracy() -> &'static str {
        r#"
You are an evaluator. Score 0-1.
Answer: {answer}

Is this answer factually correct? Penalize hallucinations.
Return only a number between 0 and 1.
"#
    }

    /// Pass/fail check of an answer against handwritten grading notes.
    pub fn grading_notes_correctness() -> &'static str {
        "Check if the response contains points mentioned from the grading notes and return 'pass' or 'fail'.\nResponse: {answer} Grading Notes: {grading_notes}"
    }

    /// Substitute every `{key}` in `template` with its value.
    ///
    /// The template is scanned once, so substituted values are never
    /// themselves expanded. Unknown placeholders are left untouched.
    pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
        PLACEHOLDER
            .replace_all(template, |caps: &Captures| {
                let key = &caps[1];
                vars.iter()
                    .find(|(name, _)| *name == key)
                    .map(|(_, value)| value.to_string())
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_fills_placeholders() {
        let prompt = Prompts::render(
            Prompts::relevance(),
            &[("query", "What is Ragas?"), ("answer", "A library.")],
        );
        assert!(prompt.contains("Question: What is Ragas?"));
        assert!(prompt.contains("Answer: A library."));
        assert!(!prompt.contains('{'));
    }

    #[test]
    fn test_render_leaves_unknown_placeholders() {
        let prompt = Prompts::render("{a} and {b}", &[("a", "x")]);
        assert_eq!(prompt, "x and {b}");
    }

    #[test]
    fn test_render_keeps_values_verbatim() {
        let prompt = Prompts::render(
            Prompts::relevance(),
            &[("query", "What does {answer} mean?"), ("answer", "ANSWER_TEXT")],
        );
        assert!(prompt.contains("Question: What does {answer} mean?"));
        assert!(prompt.contains("Answer: ANSWER_TEXT"));

        let prompt = Prompts::render(
            Prompts::grading_notes_correctness(),
            &[("answer", "see {grading_notes}"), ("grading_notes", "- secret")],
        );
        assert!(prompt.ends_with("Response: see {grading_notes} Grading Notes: - secret"));
    }

    #[test]
    fn test_grading_prompt_mentions_labels() {
        let prompt = Prompts::render(
            Prompts::grading_notes_correctness(),
            &[("answer", "resp"), ("grading_notes", "- point one")],
        );
        assert!(prompt.contains("'pass' or 'fail'"));
        assert!(prompt.ends_with("Response: resp Grading Notes: - point one"));
    }
}
