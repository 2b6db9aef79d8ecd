//! Hosted evaluation store access.
//!
//! The store holds experiment runs and their feedback scores. The report only
//! needs per-key aggregates, which the [`EvaluationStore`] trait exposes in
//! two shapes: pre-aggregated statistics (one request) and raw feedback
//! records for local aggregation.

pub mod client;

pub use client::LangSmithClient;

use crate::models::ExperimentStats;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Report message for connectivity failures.
pub const CONNECTION_MESSAGE: &str =
    "Connection error: unable to reach the evaluation store. Check network access and the API key.";

/// Report message for errors that mention the store host.
pub const API_MESSAGE: &str =
    "Evaluation store API error. Check that the experiment exists and the API key is valid.";

/// Report message for timeouts.
pub const TIMEOUT_MESSAGE: &str = "Request to the evaluation store timed out.";

/// Errors returned by the evaluation store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// No API key in the environment.
    #[error("No API key found. Set the LANGSMITH_API_KEY environment variable.")]
    MissingApiKey,

    /// The API key cannot be sent as a header value.
    #[error("API key contains invalid characters")]
    InvalidApiKey,

    /// The HTTP client could not be built.
    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    /// The store answered with a non-success status.
    #[error("API error {status} from {url}: {body}")]
    Api {
        status: u16,
        url: String,
        body: String,
    },

    #[error("Experiment not found: {0}")]
    ExperimentNotFound(String),

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Request failed: {0}")]
    Other(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            StoreError::Timeout(e.to_string())
        } else if e.is_connect() {
            StoreError::Connection(e.to_string())
        } else if e.is_decode() {
            StoreError::Decode {
                url: e.url().map(|u| u.to_string()).unwrap_or_default(),
                message: e.to_string(),
            }
        } else {
            StoreError::Other(e.to_string())
        }
    }
}

impl StoreError {
    /// Short message for the report.
    ///
    /// Known connectivity failures are replaced with fixed messages; anything
    /// else is passed through.
    pub fn user_message(&self, store_host: &str) -> String {
        match self {
            StoreError::Connection(_) => CONNECTION_MESSAGE.to_string(),
            StoreError::Timeout(_) => TIMEOUT_MESSAGE.to_string(),
            other => normalize_error_message(&other.to_string(), store_host),
        }
    }
}

/// Replace known network-failure texts with short messages.
pub fn normalize_error_message(message: &str, store_host: &str) -> String {
    let lower = message.to_lowercase();

    if lower.contains("connection error") || lower.contains("max retries exceeded") {
        CONNECTION_MESSAGE.to_string()
    } else if !store_host.is_empty() && lower.contains(&store_host.to_lowercase()) {
        API_MESSAGE.to_string()
    } else {
        message.to_string()
    }
}

/// A single feedback record attached to a run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeedbackRecord {
    pub key: String,
    /// Numeric or boolean score; absent for comment-only feedback.
    #[serde(default)]
    pub score: Option<Value>,
}

impl FeedbackRecord {
    /// Numeric score, with booleans counted as 1.0 and 0.0.
    pub fn numeric_score(&self) -> Option<f64> {
        match self.score.as_ref()? {
            Value::Number(n) => n.as_f64(),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}

/// Raw runs and feedback of one experiment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawFeedback {
    pub run_count: u64,
    pub records: Vec<FeedbackRecord>,
}

/// Read access to the hosted evaluation store.
#[async_trait]
pub trait EvaluationStore: Send + Sync {
    /// Pre-aggregated statistics for an experiment, in a single request.
    async fn experiment_stats(&self, experiment_name: &str) -> Result<ExperimentStats, StoreError>;

    /// Every root run's feedback records for an experiment.
    async fn raw_feedback(&self, experiment_name: &str) -> Result<RawFeedback, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_connectivity_messages() {
        let raw = "HTTPSConnectionPool(host='x', port=443): Max retries exceeded with url: /sessions";
        assert_eq!(normalize_error_message(raw, ""), CONNECTION_MESSAGE);
        assert_eq!(
            normalize_error_message("Connection error while fetching", ""),
            CONNECTION_MESSAGE
        );
    }

    #[test]
    fn test_normalize_host_message() {
        let raw = "API error 403 from https://api.smith.langchain.com/api/v1/sessions: forbidden";
        assert_eq!(
            normalize_error_message(raw, "api.smith.langchain.com"),
            API_MESSAGE
        );
    }

    #[test]
    fn test_normalize_passes_through_unknown() {
        assert_eq!(
            normalize_error_message("Experiment not found: exp-1", "api.smith.langchain.com"),
            "Experiment not found: exp-1"
        );
        assert_eq!(normalize_error_message("anything", ""), "anything");
    }

    #[test]
    fn test_user_message_by_variant() {
        let host = "api.smith.langchain.com";
        assert_eq!(
            StoreError::Connection("refused".to_string()).user_message(host),
            CONNECTION_MESSAGE
        );
        assert_eq!(
            StoreError::Timeout("slow".to_string()).user_message(host),
            TIMEOUT_MESSAGE
        );
        assert_eq!(
            StoreError::ExperimentNotFound("exp".to_string()).user_message(host),
            "Experiment not found: exp"
        );
    }

    #[test]
    fn test_numeric_score() {
        let record: FeedbackRecord =
            serde_json::from_value(json!({"key": "k", "score": 0.5})).unwrap();
        assert_eq!(record.numeric_score(), Some(0.5));

        let record: FeedbackRecord =
            serde_json::from_value(json!({"key": "k", "score": true})).unwrap();
        assert_eq!(record.numeric_score(), Some(1.0));

        let record: FeedbackRecord =
            serde_json::from_value(json!({"key": "k", "score": null})).unwrap();
        assert_eq!(record.numeric_score(), None);

        let record: FeedbackRecord = serde_json::from_value(json!({"key": "k"})).unwrap();
        assert_eq!(record.numeric_score(), None);
    }
}
