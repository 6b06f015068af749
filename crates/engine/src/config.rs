//! Run configuration via `parquery.toml`
//!
//! Every field has a default, so an empty file (or no file at all) gives a
//! usable configuration. `ParallelQuery::run` overrides batch size, worker
//! count and stats reporting per call; the success-status set and dry-run
//! flag come from here.

use std::path::Path;

use parquery_core::{Error, Result, SuccessStatuses};
use serde::{Deserialize, Serialize};

/// Config file name looked up by callers that keep one next to their data.
pub const CONFIG_FILE_NAME: &str = "parquery.toml";

/// Configuration for one run.
///
/// # Example
///
/// ```toml
/// batch_size = 100
/// worker_count = 8
/// success_statuses = [0, 2]
/// dry_run = false
/// report_stats = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Records merged into one transaction.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Concurrent workers, each with its own connection.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
    /// Command statuses that count as success.
    #[serde(default)]
    pub success_statuses: SuccessStatuses,
    /// Assemble batches but send nothing.
    #[serde(default)]
    pub dry_run: bool,
    /// Print the stats report when a run finishes.
    #[serde(default)]
    pub report_stats: bool,
}

fn default_batch_size() -> usize {
    1
}

fn default_worker_count() -> usize {
    4
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            worker_count: default_worker_count(),
            success_statuses: SuccessStatuses::default(),
            dry_run: false,
            report_stats: false,
        }
    }
}

impl RunConfig {
    /// Check that the configuration can drive a run.
    ///
    /// # Errors
    ///
    /// Returns an error if batch size or worker count is zero, or the
    /// success-status set is empty.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(Error::config("batch_size must be at least 1"));
        }
        if self.worker_count == 0 {
            return Err(Error::config("worker_count must be at least 1"));
        }
        if self.success_statuses.is_empty() {
            return Err(Error::config("success_statuses must not be empty"));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# parquery run configuration

# Records merged into one transaction (default: 1)
batch_size = 1

# Concurrent workers, each with its own connection (default: 4)
worker_count = 4

# Command statuses that count as success (default: [0, 2])
#   0 = success, 2 = object already existed
success_statuses = [0, 2]

# Assemble batches without sending them (default: false)
dry_run = false

# Print the stats report at the end of a run (default: false)
report_stats = false
"#
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the file cannot be read, and
    /// [`Error::Config`] if it cannot be parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: RunConfig = toml::from_str(&content).map_err(|e| {
            Error::config(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml())?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| Error::Serialization(format!("config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
