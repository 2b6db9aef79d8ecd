//! Markdown report generation.
//!
//! This module renders processed experiment results into the markdown
//! document posted as a pull-request comment, plus a JSON variant.

use crate::metrics::describe;
use crate::models::{ExperimentResult, MetricRow};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;

/// Placeholder for metrics without a scored average.
const MISSING_SCORE: &str = "N/A";

/// Appended to truncated error messages.
const TRUNCATION_MARKER: &str = "...";

/// Options controlling report rendering.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    pub title: String,
    /// Error messages longer than this many characters are truncated.
    pub error_max_chars: usize,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            title: "Financial Agents Evaluation Results".to_string(),
            error_max_chars: 200,
        }
    }
}

impl From<&crate::config::ReportSettings> for ReportOptions {
    fn from(settings: &crate::config::ReportSettings) -> Self {
        Self {
            title: settings.title.clone(),
            error_max_chars: settings.error_max_chars,
        }
    }
}

/// Generate the complete markdown report.
pub fn generate_markdown_report(results: &[ExperimentResult], options: &ReportOptions) -> String {
    let mut output = String::new();

    output.push_str(&format!("# {}\n\n", options.title));

    for result in results {
        output.push_str(&generate_experiment_section(result, options));
    }

    output
}

/// Generate the section for a single experiment, separator included.
fn generate_experiment_section(result: &ExperimentResult, options: &ReportOptions) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", result.experiment_name));

    if let Some(ref error) = result.error {
        section.push_str(&format!(
            "**Error:** {}\n\n",
            truncate_error(error, options.error_max_chars)
        ));
    } else if result.rows.is_empty() {
        section.push_str("No evaluation results found.\n\n");
    } else {
        section.push_str(&generate_metrics_section(result));
    }

    section.push_str("---\n\n");

    section
}

/// Links, counts and the metric list of a successful experiment.
fn generate_metrics_section(result: &ExperimentResult) -> String {
    let mut section = String::new();

    if let Some(ref url) = result.experiment_url {
        section.push_str(&format!("[View Experiment in LangSmith]({})\n\n", url));
    }

    if let Some(ref dataset) = result.dataset_name {
        section.push_str(&format!("**Dataset:** {}", dataset));
        if let Some(ref url) = result.dataset_url {
            section.push_str(&format!(" ([view]({}))", url));
        }
        section.push_str("\n\n");
    }

    section.push_str(&format!("**Examples:** {}\n\n", result.num_examples));

    if result.num_checked() > 0 {
        section.push_str(&format!(
            "**Thresholds:** {} passed, {} failed\n\n",
            result.num_passed, result.num_failed
        ));
    }

    section.push_str("**Metrics:**\n\n");
    for row in &result.rows {
        section.push_str(&generate_metric_line(row));
    }
    section.push('\n');

    section
}

/// A single metric bullet.
fn generate_metric_line(row: &MetricRow) -> String {
    let mut line = format!(
        "- **{}**: {} — {}",
        row.key,
        format_score(row.avg_score),
        describe(&row.key)
    );

    if let (Some(threshold), Some(outcome)) = (&row.threshold, row.outcome) {
        line.push_str(&format!(" (threshold: {}, {})", threshold, outcome));
    }

    line.push('\n');
    line
}

/// Format a score with two decimals.
pub fn format_score(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.2}", v),
        None => MISSING_SCORE.to_string(),
    }
}

/// Truncate an error message to `max_chars` characters.
pub fn truncate_error(message: &str, max_chars: usize) -> String {
    match message.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &message[..cut], TRUNCATION_MARKER),
        None => message.to_string(),
    }
}

/// Write the markdown report, replacing any existing file.
pub fn write_markdown_report(
    results: &[ExperimentResult],
    options: &ReportOptions,
    path: &Path,
) -> Result<()> {
    let content = generate_markdown_report(results, options);
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

#[derive(Serialize)]
struct JsonReport<'a> {
    title: &'a str,
    generated_at: DateTime<Utc>,
    total_experiments: usize,
    successful_experiments: usize,
    experiments: &'a [ExperimentResult],
}

/// Generate a JSON report.
pub fn generate_json_report(
    results: &[ExperimentResult],
    options: &ReportOptions,
) -> Result<String> {
    let report = JsonReport {
        title: &options.title,
        generated_at: Utc::now(),
        total_experiments: results.len(),
        successful_experiments: results.iter().filter(|r| r.is_success()).count(),
        experiments: results,
    };

    serde_json::to_string_pretty(&report).map_err(Into::into)
}
