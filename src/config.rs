//! Settings file handling.
//!
//! This module handles loading and merging settings from
//! `.evalreport.toml` files. Evaluation config files written by the
//! evaluation jobs are a separate thing, see [`crate::models::EvaluationConfig`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default settings file name, looked up in the working directory.
pub const SETTINGS_FILE: &str = ".evalreport.toml";

/// Root settings structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Hosted evaluation store settings.
    #[serde(default)]
    pub store: StoreSettings,

    /// Report settings.
    #[serde(default)]
    pub report: ReportSettings,
}

/// How per-key feedback statistics are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatsSource {
    /// One request for the pre-aggregated experiment statistics.
    #[default]
    Aggregated,
    /// List every run and feedback record and aggregate locally.
    Raw,
}

/// Hosted evaluation store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSettings {
    /// Base URL of the store API.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Base URL of the store web UI, used for report links.
    #[serde(default = "default_web_url")]
    pub web_url: String,

    /// Organization slug in web UI links.
    #[serde(default = "default_organization")]
    pub organization: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    #[serde(default)]
    pub stats_source: StatsSource,

    /// Page size for the raw listing endpoints.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            web_url: default_web_url(),
            organization: default_organization(),
            timeout_seconds: default_timeout(),
            stats_source: StatsSource::default(),
            page_size: default_page_size(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.smith.langchain.com".to_string()
}

fn default_web_url() -> String {
    "https://smith.langchain.com".to_string()
}

fn default_organization() -> String {
    "default".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_page_size() -> usize {
    100
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSettings {
    /// Top-level report title.
    #[serde(default = "default_title")]
    pub title: String,

    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Error messages longer than this are truncated in the report.
    #[serde(default = "default_error_max_chars")]
    pub error_max_chars: usize,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            title: default_title(),
            output: default_output(),
            error_max_chars: default_error_max_chars(),
        }
    }
}

fn default_title() -> String {
    "Financial Agents Evaluation Results".to_string()
}

fn default_output() -> String {
    "eval_comment.md".to_string()
}

fn default_error_max_chars() -> usize {
    200
}

impl Settings {
    /// Load settings from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;

        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))?;

        Ok(settings)
    }

    /// Try to load settings from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(SETTINGS_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge these settings with CLI arguments.
    ///
    /// CLI arguments take precedence, but only when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref api_url) = args.api_url {
            self.store.api_url = api_url.trim_end_matches('/').to_string();
        }

        if let Some(timeout) = args.timeout {
            self.store.timeout_seconds = timeout;
        }

        if args.raw_feedback {
            self.store.stats_source = StatsSource::Raw;
        }

        if let Some(ref output) = args.output {
            self.report.output = output.display().to_string();
        }
    }

    /// Generate the default settings file content.
    pub fn default_toml() -> String {
        let settings = Settings::default();
        toml::to_string_pretty(&settings).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.store.api_url, "https://api.smith.langchain.com");
        assert_eq!(settings.store.stats_source, StatsSource::Aggregated);
        assert_eq!(settings.report.output, "eval_comment.md");
        assert_eq!(settings.report.error_max_chars, 200);
    }

    #[test]
    fn test_parse_settings() {
        let toml_content = r#"
[store]
web_url = "https://eu.smith.langchain.com"
organization = "fin-team"
stats_source = "raw"

[report]
title = "Nightly Evals"
"#;

        let settings: Settings = toml::from_str(toml_content).unwrap();
        assert_eq!(settings.store.web_url, "https://eu.smith.langchain.com");
        assert_eq!(settings.store.organization, "fin-team");
        assert_eq!(settings.store.stats_source, StatsSource::Raw);
        assert_eq!(settings.store.timeout_seconds, 30);
        assert_eq!(settings.report.title, "Nightly Evals");
        assert_eq!(settings.report.output, "eval_comment.md");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "[store]\ntimeout_seconds = 5\n").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.store.timeout_seconds, 5);

        std::fs::write(&path, "[store\n").unwrap();
        assert!(Settings::load(&path).is_err());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Settings::default_toml();
        assert!(toml_str.contains("[store]"));
        assert!(toml_str.contains("[report]"));

        let reparsed: Settings = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.report.title, default_title());
    }
}
