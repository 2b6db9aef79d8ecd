//! Discovery of evaluation config files.
//!
//! Evaluation jobs write one `evaluation_config__<name>.json` per experiment
//! into their working directory. This module finds those files and owns the
//! naming convention.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name prefix of evaluation config files.
pub const CONFIG_PREFIX: &str = "evaluation_config__";

/// File name suffix of evaluation config files.
pub const CONFIG_SUFFIX: &str = ".json";

/// Build the config file name for an experiment.
///
/// `:` and `/` are replaced with `-` so the name is safe on every platform.
/// The evaluation jobs write these files; the reporter only reads them.
#[cfg(test)]
pub fn config_file_name(experiment_name: &str) -> String {
    let safe_name = experiment_name.replace([':', '/'], "-");
    format!("{}{}{}", CONFIG_PREFIX, safe_name, CONFIG_SUFFIX)
}

/// Returns true if the file name follows the config naming convention.
pub fn is_config_file_name(name: &str) -> bool {
    name.len() > CONFIG_PREFIX.len() + CONFIG_SUFFIX.len()
        && name.starts_with(CONFIG_PREFIX)
        && name.ends_with(CONFIG_SUFFIX)
}

/// Finds evaluation config files in a directory.
pub struct ConfigScanner {
    dir: PathBuf,
}

impl ConfigScanner {
    /// Create a scanner for the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// List matching files, sorted by path so reports are stable.
    ///
    /// Only the top level of the directory is searched.
    pub fn scan(&self) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read directory: {}", self.dir.display()))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Failed to read directory entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            if is_config_file_name(name) && path.is_file() {
                debug!("Found config: {}", path.display());
                files.push(path);
            }
        }

        files.sort();
        Ok(files)
    }
}

/// Resolve the list of configs to process.
///
/// Explicit paths are returned as given; otherwise the directory is scanned.
pub fn resolve_configs(explicit: &[PathBuf], dir: &Path) -> Result<Vec<PathBuf>> {
    if !explicit.is_empty() {
        return Ok(explicit.to_vec());
    }

    ConfigScanner::new(dir).scan()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_name() {
        assert_eq!(
            config_file_name("financial-market-eval-1a2b"),
            "evaluation_config__financial-market-eval-1a2b.json"
        );
        assert_eq!(
            config_file_name("org/eval:2024-01-01"),
            "evaluation_config__org-eval-2024-01-01.json"
        );
    }

    #[test]
    fn test_is_config_file_name() {
        assert!(is_config_file_name("evaluation_config__x.json"));
        assert!(!is_config_file_name("evaluation_config__.json"));
        assert!(!is_config_file_name("evaluation_config__x.toml"));
        assert!(!is_config_file_name("eval_comment.md"));
    }

    #[test]
    fn test_scan_finds_only_matching_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            config_file_name("b-exp"),
            config_file_name("a-exp"),
            "notes.json".to_string(),
            "evaluation_config__c.txt".to_string(),
        ] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }
        fs::create_dir(dir.path().join("evaluation_config__dir.json")).unwrap();

        let files = ConfigScanner::new(dir.path()).scan().unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();

        assert_eq!(
            names,
            vec!["evaluation_config__a-exp.json", "evaluation_config__b-exp.json"]
        );
    }

    #[test]
    fn test_resolve_prefers_explicit_paths() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(config_file_name("found")), "{}").unwrap();

        let explicit = vec![PathBuf::from("does-not-exist.json")];
        assert_eq!(resolve_configs(&explicit, dir.path()).unwrap(), explicit);

        let discovered = resolve_configs(&[], dir.path()).unwrap();
        assert_eq!(discovered.len(), 1);
    }
}
