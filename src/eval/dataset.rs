//! Test cases and the local CSV dataset store.
//!
//! A dataset named `n` under root `r` lives at `r/datasets/n.csv` with the
//! columns `question,grading_notes`.

use crate::error::{EvalError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Directory under the backend root that holds dataset files.
pub const DATASETS_DIR: &str = "datasets";

/// A single evaluation unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// The question to send to the RAG pipeline.
    #[serde(rename = "question")]
    pub query: String,
    /// Rubric describing what a correct answer should contain.
    #[serde(default)]
    pub grading_notes: Option<String>,
}

impl TestCase {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            grading_notes: None,
        }
    }

    pub fn with_grading_notes(mut self, notes: impl Into<String>) -> Self {
        self.grading_notes = Some(notes.into());
        self
    }
}

/// A named collection of test cases backed by a CSV file.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// Dataset name.
    pub name: String,
    root: PathBuf,
    cases: Vec<TestCase>,
}

impl Dataset {
    /// Create a new empty dataset under `root`.
    pub fn new(name: &str, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            root: root.into(),
            cases: Vec::new(),
        }
    }

    /// Location of the dataset file.
    pub fn path(&self) -> PathBuf {
        dataset_path(&self.root, &self.name)
    }

    /// Add a row to the dataset.
    pub fn append(&mut self, case: TestCase) {
        self.cases.push(case);
    }

    /// Number of rows in the dataset.
    pub fn len(&self) -> usize {
        self.cases.len()
    }

    /// Check if dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TestCase> {
        self.cases.iter()
    }

    pub fn cases(&self) -> &[TestCase] {
        &self.cases
    }

    /// Get a subset of rows (for quick testing).
    pub fn take(&self, n: usize) -> Self {
        Self {
            name: self.name.clone(),
            root: self.root.clone(),
            cases: self.cases.iter().take(n).cloned().collect(),
        }
    }

    /// Write all rows to [`Dataset::path`], replacing any previous file.
    pub fn save(&self) -> Result<PathBuf> {
        let path = self.path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| EvalError::io(parent, e))?;
        }

        let mut writer = csv::Writer::from_path(&path)?;
        for case in &self.cases {
            writer.serialize(case)?;
        }
        writer.flush().map_err(|e| EvalError::io(&path, e))?;

        tracing::debug!(dataset = %self.name, rows = self.len(), path = %path.display(), "dataset saved");
        Ok(path)
    }

    /// Load a previously saved dataset.
    pub fn load(name: &str, root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let path = dataset_path(&root, name);
        if !path.exists() {
            return Err(EvalError::Dataset(format!(
                "dataset '{}' not found at {}",
                name,
                path.display()
            )));
        }

        let mut reader = csv::Reader::from_path(&path)?;
        let cases = reader
            .deserialize()
            .collect::<std::result::Result<Vec<TestCase>, _>>()?;

        Ok(Self {
            name: name.to_string(),
            root,
            cases,
        })
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a TestCase;
    type IntoIter = std::slice::Iter<'a, TestCase>;

    fn into_iter(self) -> Self::IntoIter {
        self.cases.iter()
    }
}

fn dataset_path(root: &Path, name: &str) -> PathBuf {
    root.join(DATASETS_DIR).join(format!("{}.csv", name))
}

/// Load dataset `name`, or seed it with the sample rows if no file exists yet.
///
/// An existing file is never overwritten. The flag is `true` when the sample
/// rows were written.
pub fn load_or_seed(name: &str, root: impl Into<PathBuf>) -> Result<(Dataset, bool)> {
    let root = root.into();
    if dataset_path(&root, name).exists() {
        return Ok((Dataset::load(name, root)?, false));
    }

    let mut dataset = create_sample_dataset(root);
    dataset.name = name.to_string();
    dataset.save()?;
    Ok((dataset, true))
}

/// The three open questions used for latency runs.
pub fn sample_queries() -> Vec<TestCase> {
    [
        "What is Ragas?",
        "Explain the types of ragas and their purposes.",
        "How are ragas performed and used in classical music?",
    ]
    .into_iter()
    .map(TestCase::new)
    .collect()
}

/// Create the grading-notes dataset used for correctness experiments.
pub fn create_sample_dataset(root: impl Into<PathBuf>) -> Dataset {
    let mut dataset = Dataset::new("test_dataset", root);

    dataset.append(
        TestCase::new("What is ragas 0.3").with_grading_notes(
            "- experimentation as the central pillar - provides abstraction for datasets, experiments and metrics - supports evals for RAG, LLM workflows and Agents",
        ),
    );
    dataset.append(
        TestCase::new("how are experiment results stored in ragas 0.3?").with_grading_notes(
            "- configured using different backends like local, gdrive, etc - stored under experiments/ folder in the backend storage",
        ),
    );
    dataset.append(
        TestCase::new("What metrics are supported in ragas 0.3?").with_grading_notes(
            "- provides abstraction for discrete, numerical and ranking metrics",
        ),
    );

    dataset
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_dataset_operations() {
        let mut dataset = Dataset::new("test", "evals");
        assert!(dataset.is_empty());

        dataset.append(TestCase::new("Test question?").with_grading_notes("- a point"));

        assert_eq!(dataset.len(), 1);
        assert!(!dataset.is_empty());
        assert_eq!(dataset.path(), PathBuf::from("evals/datasets/test.csv"));
    }

    #[test]
    fn test_dataset_take() {
        let dataset = create_sample_dataset("evals");
        assert_eq!(dataset.len(), 3);

        let subset = dataset.take(2);
        assert_eq!(subset.len(), 2);
        assert_eq!(subset.cases()[0], dataset.cases()[0]);
    }

    #[test]
    fn test_sample_dataset() {
        let dataset = create_sample_dataset("evals");
        assert_eq!(dataset.name, "test_dataset");

        for case in &dataset {
            assert!(!case.query.is_empty());
            assert!(case.grading_notes.is_some());
        }
    }

    #[test]
    fn test_sample_queries_order() {
        let queries = sample_queries();
        assert_eq!(queries.len(), 3);
        assert_eq!(queries[0].query, "What is Ragas?");
        assert!(queries.iter().all(|q| q.grading_notes.is_none()));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let original = create_sample_dataset(dir.path());

        let path = original.save().unwrap();
        assert!(path.ends_with("datasets/test_dataset.csv"));

        let header = fs::read_to_string(&path).unwrap();
        assert!(header.starts_with("question,grading_notes\n"));

        let loaded = Dataset::load("test_dataset", dir.path()).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn test_missing_notes_round_trip_as_none() {
        let dir = TempDir::new().unwrap();
        let mut dataset = Dataset::new("bare", dir.path());
        dataset.append(TestCase::new("Why?"));
        dataset.save().unwrap();

        let loaded = Dataset::load("bare", dir.path()).unwrap();
        assert_eq!(loaded.cases()[0].grading_notes, None);
    }

    #[test]
    fn test_load_or_seed_keeps_existing_rows() {
        let dir = TempDir::new().unwrap();
        let mut mine = Dataset::new("mydata", dir.path());
        mine.append(TestCase::new("Only my question").with_grading_notes("- mine"));
        mine.save().unwrap();

        let (dataset, seeded) = load_or_seed("mydata", dir.path()).unwrap();
        assert!(!seeded);
        assert_eq!(dataset.cases(), mine.cases());
        assert_eq!(Dataset::load("mydata", dir.path()).unwrap().len(), 1);
    }

    #[test]
    fn test_load_or_seed_writes_sample_when_missing() {
        let dir = TempDir::new().unwrap();
        let (dataset, seeded) = load_or_seed("fresh", dir.path()).unwrap();
        assert!(seeded);
        assert_eq!(dataset.len(), 3);
        assert!(dir.path().join("datasets/fresh.csv").exists());
    }

    #[test]
    fn test_load_nonexistent() {
        let dir = TempDir::new().unwrap();
        let result = Dataset::load("missing", dir.path());
        assert!(matches!(result, Err(EvalError::Dataset(_))));
    }
}
