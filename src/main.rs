//! evalreport - evaluation results as a pull-request comment
//!
//! A CLI tool that reads the evaluation config files written by the agent
//! evaluation jobs, fetches each experiment's feedback statistics from
//! LangSmith and renders a markdown report.
//!
//! Exit codes:
//!   0 - Report written (per-experiment errors are reported, not fatal)
//!   1 - No configs, no results, client initialization failure or I/O error
//!   2 - A metric failed its threshold and --fail-on-threshold is set

mod analysis;
mod cli;
mod config;
mod metrics;
mod models;
mod report;
mod scanner;
mod store;
mod threshold;

use analysis::ConfigProcessor;
use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::Settings;
use models::ProcessOutcome;
use report::ReportOptions;
use std::path::{Path, PathBuf};
use store::{EvaluationStore, LangSmithClient};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("evalreport v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Report failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default settings file.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::SETTINGS_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::SETTINGS_FILE
        );
        std::process::exit(1);
    }

    let content = Settings::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::SETTINGS_FILE))?;

    println!("✅ Created {} with default settings.", config::SETTINGS_FILE);
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level())
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Set up the store client and generate the report. Returns the exit code.
async fn run(args: Args) -> Result<i32> {
    let mut settings = load_settings(&args)?;
    settings.merge_with_args(&args);

    let client = match LangSmithClient::from_env(&settings.store) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to initialize LangSmith client: {}", e);
            eprintln!("Failed to initialize LangSmith client: {}", e);
            eprintln!("Make sure LANGSMITH_API_KEY environment variable is set.");
            return Ok(1);
        }
    };

    let working_dir = std::env::current_dir().context("Failed to read working directory")?;
    generate_report(&args, &settings, &client, &working_dir).await
}

/// Process every config and write the report. Returns the exit code.
///
/// Configs are discovered in `dir` when none are given explicitly.
async fn generate_report(
    args: &Args,
    settings: &Settings,
    store: &dyn EvaluationStore,
    dir: &Path,
) -> Result<i32> {
    let config_files = scanner::resolve_configs(&args.config_files, dir)?;

    if config_files.is_empty() {
        eprintln!("No evaluation config files found.");
        eprintln!(
            "Expected files matching pattern: {}*{}",
            scanner::CONFIG_PREFIX,
            scanner::CONFIG_SUFFIX
        );
        return Ok(1);
    }

    debug!(
        "Found {} config files: {:?}",
        config_files.len(),
        config_files
    );

    let existing: Vec<PathBuf> = config_files
        .into_iter()
        .filter(|path| {
            let exists = path.exists();
            if !exists {
                warn!("Config file not found: {}", path.display());
            }
            exists
        })
        .collect();

    if existing.is_empty() {
        eprintln!("None of the given config files exist.");
        return Ok(1);
    }

    // Sequential: one experiment's failure must not affect the next
    let processor = ConfigProcessor::new(store, &settings.store);
    let mut results = Vec::with_capacity(existing.len());
    for path in &existing {
        match processor.process(path).await {
            ProcessOutcome::Processed(result) => results.push(result),
            ProcessOutcome::Skipped(reason) => debug!("Skipped {}: {}", path.display(), reason),
        }
    }

    if results.is_empty() {
        eprintln!("No valid evaluation results to process.");
        return Ok(1);
    }

    let output = PathBuf::from(&settings.report.output);
    let options = ReportOptions::from(&settings.report);

    info!("Writing report to {}", output.display());
    match args.format {
        OutputFormat::Markdown => report::write_markdown_report(&results, &options, &output)?,
        OutputFormat::Json => {
            let json = report::generate_json_report(&results, &options)?;
            std::fs::write(&output, json)
                .with_context(|| format!("Failed to write report to {}", output.display()))?;
        }
    }

    let successful = results.iter().filter(|r| r.is_success()).count();
    println!("📝 Report written to {}", output.display());
    println!(
        "Processed {}/{} experiments successfully",
        successful,
        results.len()
    );

    if args.fail_on_threshold {
        let failed: usize = results.iter().map(|r| r.num_failed).sum();
        if failed > 0 {
            eprintln!(
                "\n⛔ {} metric(s) failed their thresholds. Failing (exit code 2).",
                failed
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Load settings from file or use defaults.
fn load_settings(args: &Args) -> Result<Settings> {
    if let Some(ref path) = args.config {
        info!("Loading settings from: {}", path.display());
        return Settings::load(path);
    }

    match Settings::load_default() {
        Ok(Some(settings)) => {
            info!("Loaded settings from {}", config::SETTINGS_FILE);
            Ok(settings)
        }
        Ok(None) => {
            debug!("No settings file found, using defaults");
            Ok(Settings::default())
        }
        Err(e) => {
            warn!("Failed to load settings: {:#}", e);
            Ok(Settings::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ExperimentStats, FeedbackStats};
    use crate::store::{RawFeedback, StoreError};
    use async_trait::async_trait;
    use clap::Parser;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    /// Store that knows one experiment and fails for every other name.
    struct SingleExperimentStore;

    #[async_trait]
    impl EvaluationStore for SingleExperimentStore {
        async fn experiment_stats(
            &self,
            experiment_name: &str,
        ) -> Result<ExperimentStats, StoreError> {
            if experiment_name != "exp-1" {
                return Err(StoreError::Other(
                    "Max retries exceeded with url: /api/v1/sessions".to_string(),
                ));
            }

            let mut feedback = BTreeMap::new();
            feedback.insert(
                "accuracy".to_string(),
                FeedbackStats {
                    avg: Some(0.92),
                    count: 10,
                },
            );
            feedback.insert(
                "response_relevance".to_string(),
                FeedbackStats {
                    avg: Some(0.5),
                    count: 10,
                },
            );
            Ok(ExperimentStats {
                run_count: 10,
                feedback,
            })
        }

        async fn raw_feedback(&self, _experiment_name: &str) -> Result<RawFeedback, StoreError> {
            Err(StoreError::Other("raw feedback not supported".to_string()))
        }
    }

    fn settings_for(dir: &TempDir) -> Settings {
        let mut settings = Settings::default();
        settings.report.output = dir.path().join("eval_comment.md").display().to_string();
        settings
    }

    fn write_config(dir: &TempDir, experiment: &str, body: &str) -> PathBuf {
        let path = dir.path().join(scanner::config_file_name(experiment));
        std::fs::write(&path, body).unwrap();
        path
    }

    async fn run_in(dir: &TempDir, argv: &[&str]) -> i32 {
        let mut full = vec!["evalreport"];
        full.extend_from_slice(argv);
        let args = Args::try_parse_from(full).unwrap();
        generate_report(&args, &settings_for(dir), &SingleExperimentStore, dir.path())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_discovered_configs_produce_report() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            &dir,
            "exp-1",
            r#"{"experiment_name": "exp-1", "dataset_name": "ds-1"}"#,
        );
        write_config(
            &dir,
            "exp-2",
            r#"{"experiment_name": "exp-2", "dataset_name": "ds-2"}"#,
        );

        assert_eq!(run_in(&dir, &[]).await, 0);

        let report = std::fs::read_to_string(dir.path().join("eval_comment.md")).unwrap();
        assert!(report.contains("## exp-1"));
        assert!(report.contains("- **accuracy**: 0.92 — Evaluates response accuracy\n"));
        assert!(report.contains("## exp-2\n\n**Error:** Connection error"));
    }

    #[tokio::test]
    async fn test_no_results_exits_without_report() {
        let dir = tempfile::tempdir().unwrap();
        write_config(&dir, "exp-1", r#"{"experiment_name": "exp-1"}"#);

        assert_eq!(run_in(&dir, &[]).await, 1);
        assert!(!dir.path().join("eval_comment.md").exists());
    }

    #[tokio::test]
    async fn test_no_configs_found() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(run_in(&dir, &[]).await, 1);
    }

    #[tokio::test]
    async fn test_missing_explicit_paths_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let present = write_config(
            &dir,
            "exp-1",
            r#"{"experiment_name": "exp-1", "dataset_name": "ds-1"}"#,
        );
        let absent = dir.path().join("evaluation_config__gone.json");

        let present = present.display().to_string();
        let absent = absent.display().to_string();

        assert_eq!(run_in(&dir, &[absent.as_str()]).await, 1);
        assert_eq!(run_in(&dir, &[absent.as_str(), present.as_str()]).await, 0);
    }

    #[tokio::test]
    async fn test_fail_on_threshold_gate() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            &dir,
            "exp-1",
            r#"{
                "experiment_name": "exp-1",
                "dataset_name": "ds-1",
                "criteria": {"accuracy": ">=0.9", "response_relevance": ">=0.8"}
            }"#,
        );

        assert_eq!(run_in(&dir, &[]).await, 0);
        assert_eq!(run_in(&dir, &["--fail-on-threshold"]).await, 2);

        let report = std::fs::read_to_string(dir.path().join("eval_comment.md")).unwrap();
        assert!(report.contains("**Thresholds:** 1 passed, 1 failed"));
    }

    #[tokio::test]
    async fn test_json_format() {
        let dir = tempfile::tempdir().unwrap();
        write_config(
            &dir,
            "exp-1",
            r#"{"experiment_name": "exp-1", "dataset_name": "ds-1"}"#,
        );

        assert_eq!(run_in(&dir, &["--format", "json"]).await, 0);

        let report = std::fs::read_to_string(dir.path().join("eval_comment.md")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&report).unwrap();
        assert_eq!(value["experiments"][0]["experiment_name"], "exp-1");
    }
}
