//! Evaluation config processing.
//!
//! Each config names one experiment. The processor fetches the experiment's
//! feedback statistics, applies the config's criteria and produces an
//! [`ExperimentResult`]. Failures are contained here: a bad file becomes a
//! skip, a store failure becomes a result carrying `error`.

use crate::analysis::aggregator::stats_from_raw;
use crate::config::{StatsSource, StoreSettings};
use crate::models::{
    EvaluationConfig, ExperimentResult, ExperimentStats, MetricRow, ProcessOutcome, SkipReason,
};
use crate::store::{EvaluationStore, StoreError};
use crate::threshold::{Threshold, ThresholdOutcome};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Error stored on results whose experiment has no feedback yet.
pub const NO_STATS_MESSAGE: &str = "No feedback statistics available for this experiment";

/// Processes evaluation configs against an evaluation store.
pub struct ConfigProcessor<'a> {
    store: &'a dyn EvaluationStore,
    stats_source: StatsSource,
    web_url: String,
    organization: String,
    store_host: String,
}

impl<'a> ConfigProcessor<'a> {
    /// Create a processor using the given store and settings.
    pub fn new(store: &'a dyn EvaluationStore, settings: &StoreSettings) -> Self {
        let store_host = reqwest::Url::parse(&settings.api_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_default();

        Self {
            store,
            stats_source: settings.stats_source,
            web_url: settings.web_url.trim_end_matches('/').to_string(),
            organization: settings.organization.clone(),
            store_host,
        }
    }

    /// Process a single evaluation config file.
    pub async fn process(&self, config_path: &Path) -> ProcessOutcome {
        info!("Processing evaluation config: {}", config_path.display());

        let config = match load_config(config_path) {
            Ok(config) => config,
            Err(reason) => return ProcessOutcome::Skipped(reason),
        };

        let Some(experiment_name) = non_empty(config.experiment_name.as_deref()) else {
            warn!("No experiment_name found in {}", config_path.display());
            return ProcessOutcome::Skipped(SkipReason::MissingExperimentName);
        };

        let Some(dataset_name) = non_empty(config.dataset_name.as_deref()) else {
            warn!(
                "No dataset_name found in {}; skipping {}",
                config_path.display(),
                experiment_name
            );
            return ProcessOutcome::Skipped(SkipReason::MissingDatasetName);
        };

        let result = match self.fetch_stats(experiment_name).await {
            Ok(stats) => {
                self.build_result(experiment_name, dataset_name, stats, &config.criteria())
            }
            Err(e) => {
                warn!("Error processing experiment {}: {}", experiment_name, e);
                ExperimentResult::failed(
                    experiment_name,
                    Some(dataset_name.to_string()),
                    e.user_message(&self.store_host),
                )
            }
        };

        ProcessOutcome::Processed(result)
    }

    async fn fetch_stats(&self, experiment_name: &str) -> Result<ExperimentStats, StoreError> {
        match self.stats_source {
            StatsSource::Aggregated => self.store.experiment_stats(experiment_name).await,
            StatsSource::Raw => {
                let raw = self.store.raw_feedback(experiment_name).await?;
                Ok(stats_from_raw(&raw))
            }
        }
    }

    fn build_result(
        &self,
        experiment_name: &str,
        dataset_name: &str,
        stats: ExperimentStats,
        criteria: &BTreeMap<&str, &Value>,
    ) -> ExperimentResult {
        if stats.feedback.is_empty() {
            warn!("No feedback statistics for experiment: {}", experiment_name);
            return ExperimentResult::failed(
                experiment_name,
                Some(dataset_name.to_string()),
                NO_STATS_MESSAGE,
            );
        }

        let mut rows = Vec::with_capacity(stats.feedback.len());
        let mut num_passed = 0;
        let mut num_failed = 0;

        for (key, feedback) in stats.feedback {
            let mut row = MetricRow::new(key, feedback.avg, feedback.count);

            if let Some(&value) = criteria.get(row.key.as_str()) {
                let (expr, outcome) = check_criterion(&row.key, value, row.avg_score);

                if outcome.is_pass() {
                    num_passed += 1;
                } else {
                    num_failed += 1;
                }

                row.threshold = Some(expr);
                row.outcome = Some(outcome);
            }

            rows.push(row);
        }

        for key in criteria.keys() {
            if !rows.iter().any(|row| row.key == *key) {
                debug!("Criterion for '{}' has no feedback in {}", key, experiment_name);
            }
        }

        ExperimentResult {
            experiment_name: experiment_name.to_string(),
            dataset_name: Some(dataset_name.to_string()),
            experiment_url: Some(self.experiment_url(dataset_name, experiment_name)),
            dataset_url: Some(self.dataset_url(dataset_name)),
            rows,
            num_examples: stats.run_count,
            num_passed,
            num_failed,
            error: None,
        }
    }

    /// Link to the experiment comparison view.
    pub fn experiment_url(&self, dataset_name: &str, experiment_name: &str) -> String {
        format!(
            "{}/compare?selectedSessions={}",
            self.dataset_url(dataset_name),
            experiment_name
        )
    }

    /// Link to the dataset view.
    pub fn dataset_url(&self, dataset_name: &str) -> String {
        format!(
            "{}/o/{}/datasets/{}",
            self.web_url, self.organization, dataset_name
        )
    }
}

/// Check a score against one criterion.
///
/// Returns the expression as shown in the report and the outcome. Anything
/// that is not a valid threshold string is `Invalid`.
fn check_criterion(key: &str, value: &Value, score: Option<f64>) -> (String, ThresholdOutcome) {
    let Some(expr) = value.as_str() else {
        warn!("Threshold for key '{}' is not a string: {}", key, value);
        return (value.to_string(), ThresholdOutcome::Invalid);
    };

    let outcome = match Threshold::parse(expr) {
        Ok(threshold) => threshold.check(score),
        Err(e) => {
            warn!("Invalid threshold '{}' for key '{}': {}", expr, key, e);
            ThresholdOutcome::Invalid
        }
    };
    (expr.to_string(), outcome)
}

/// Read and parse an evaluation config.
fn load_config(path: &Path) -> Result<EvaluationConfig, SkipReason> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        warn!("Failed to read config {}: {}", path.display(), e);
        SkipReason::Unreadable
    })?;

    serde_json::from_str(&content).map_err(|e| {
        warn!("Failed to parse config {}: {}", path.display(), e);
        SkipReason::Malformed
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
