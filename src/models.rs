//! Data models for the evaluation reporter.
//!
//! This module contains the records that flow from evaluation config files,
//! through the hosted store, into the rendered report.

use crate::threshold::ThresholdOutcome;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Config written by an evaluation job, one per experiment.
///
/// Required fields are optional here so that a missing name can be reported
/// as a skip reason instead of a JSON error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EvaluationConfig {
    #[serde(default)]
    pub experiment_name: Option<String>,
    #[serde(default)]
    pub dataset_name: Option<String>,
    /// Feedback key to threshold expression, e.g. `"response_relevance": ">=0.8"`.
    ///
    /// Values stay raw JSON: a non-string threshold fails its metric, not the
    /// whole config. `null` is treated as no criteria.
    #[serde(default)]
    pub criteria: Option<BTreeMap<String, Value>>,
}

impl EvaluationConfig {
    /// Threshold expressions by feedback key; empty when none are configured.
    pub fn criteria(&self) -> BTreeMap<&str, &Value> {
        self.criteria
            .iter()
            .flatten()
            .map(|(key, value)| (key.as_str(), value))
            .collect()
    }
}

/// Aggregate statistics for one feedback key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedbackStats {
    /// Mean score; absent when no scored feedback exists.
    #[serde(default)]
    pub avg: Option<f64>,
    /// Number of scored feedback records.
    #[serde(default, alias = "n")]
    pub count: u64,
}

/// Statistics for one experiment as reported by the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExperimentStats {
    /// Number of root runs (one per dataset example).
    pub run_count: u64,
    /// Per-key feedback statistics.
    pub feedback: BTreeMap<String, FeedbackStats>,
}

/// One row of the metrics list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    pub key: String,
    pub avg_score: Option<f64>,
    pub num_runs: u64,
    /// Threshold expression from the config criteria, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub threshold: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ThresholdOutcome>,
}

impl MetricRow {
    /// Creates a row without a threshold.
    pub fn new(key: impl Into<String>, avg_score: Option<f64>, num_runs: u64) -> Self {
        Self {
            key: key.into(),
            avg_score,
            num_runs,
            threshold: None,
            outcome: None,
        }
    }
}

/// Outcome of processing one evaluation config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentResult {
    pub experiment_name: String,
    pub dataset_name: Option<String>,
    pub experiment_url: Option<String>,
    pub dataset_url: Option<String>,
    pub rows: Vec<MetricRow>,
    pub num_examples: u64,
    pub num_passed: usize,
    pub num_failed: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExperimentResult {
    /// Creates a result that carries only identity fields and an error.
    pub fn failed(
        experiment_name: impl Into<String>,
        dataset_name: Option<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            experiment_name: experiment_name.into(),
            dataset_name,
            experiment_url: None,
            dataset_url: None,
            rows: Vec::new(),
            num_examples: 0,
            num_passed: 0,
            num_failed: 0,
            error: Some(error.into()),
        }
    }

    /// Returns true if the experiment was fetched without error.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Number of metrics that had a criterion applied.
    pub fn num_checked(&self) -> usize {
        self.num_passed + self.num_failed
    }
}

/// Reason a config was skipped without producing a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The file could not be read.
    Unreadable,
    /// The file is not valid JSON for an evaluation config.
    Malformed,
    MissingExperimentName,
    MissingDatasetName,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Unreadable => write!(f, "config file could not be read"),
            SkipReason::Malformed => write!(f, "config file is not valid JSON"),
            SkipReason::MissingExperimentName => write!(f, "no experiment_name in config"),
            SkipReason::MissingDatasetName => write!(f, "no dataset_name in config"),
        }
    }
}

/// Result of running the config processor on one file.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    Processed(ExperimentResult),
    Skipped(SkipReason),
}

#[cfg(test)]
impl ProcessOutcome {
    /// Returns the result, discarding skip reasons.
    pub fn into_result(self) -> Option<ExperimentResult> {
        match self {
            ProcessOutcome::Processed(result) => Some(result),
            ProcessOutcome::Skipped(_) => None,
        }
    }
}
