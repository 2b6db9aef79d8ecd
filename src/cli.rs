//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// evalreport - evaluation results as a pull-request comment
///
/// Reads the evaluation config files written by the agent evaluation jobs,
/// fetches feedback statistics for each experiment from LangSmith and
/// writes a markdown report.
///
/// Examples:
///   evalreport
///   evalreport evaluation_config__*.json
///   evalreport evaluation_config__my_experiment.json -o comment.md
///   evalreport --fail-on-threshold
///   evalreport --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Evaluation config files to process
    ///
    /// Default: every evaluation_config__*.json in the working directory.
    #[arg(value_name = "CONFIG_FILES")]
    pub config_files: Vec<PathBuf>,

    /// Output file path for the report (default: eval_comment.md)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to settings file
    ///
    /// If not specified, looks for .evalreport.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// LangSmith API endpoint URL
    #[arg(long, value_name = "URL", env = "LANGSMITH_ENDPOINT")]
    pub api_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Aggregate raw runs and feedback locally instead of using experiment stats
    #[arg(long)]
    pub raw_feedback: bool,

    /// Exit with code 2 if any metric fails its threshold
    #[arg(long)]
    pub fail_on_threshold: bool,

    /// Generate a default .evalreport.toml settings file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref api_url) = self.api_url {
            if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
