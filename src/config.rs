//! Analyzer configuration file
//!
//! Every key is optional; command-line flags take precedence over the file.
//!
//! # Example schedspread.toml
//!
//! ```toml
//! root_thread = "4242"
//! processors = 8
//! strict = false
//!
//! [acquisition]
//! command = ["perf", "sched", "script", "-i", "perf.data"]
//! timeout_secs = 60
//! ```

use crate::source::DEFAULT_TRACE_COMMAND;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Root configuration for schedspread.toml
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AnalyzerConfig {
    /// Thread id of the workload's initial process
    pub root_thread: Option<String>,

    /// Processor count; queried from the system when absent
    pub processors: Option<usize>,

    /// Abort on the first malformed trigger line
    pub strict: bool,

    pub acquisition: AcquisitionConfig,
}

/// How the trace is obtained when no input file is given
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct AcquisitionConfig {
    /// Command whose stdout is the trace
    pub command: Vec<String>,

    /// Deadline for the whole acquisition phase; none when absent or zero
    pub timeout_secs: Option<u64>,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            command: DEFAULT_TRACE_COMMAND.iter().map(|s| s.to_string()).collect(),
            timeout_secs: None,
        }
    }
}

impl AcquisitionConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

impl AnalyzerConfig {
    /// Load configuration from a TOML file
    ///
    /// ```no_run
    /// use schedspread::config::AnalyzerConfig;
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = AnalyzerConfig::from_file("schedspread.toml")?;
    /// println!("root thread: {:?}", config.root_thread);
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Self::from_toml_str(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    /// Load configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML")
    }
}
