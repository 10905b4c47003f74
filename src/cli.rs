//! CLI argument parsing for schedspread

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for the analysis report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
    /// CSV format for spreadsheet analysis
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "schedspread")]
#[command(version)]
#[command(
    about = "Measure how long the scheduler takes to spread a workload across all processors",
    long_about = None
)]
pub struct Cli {
    /// Thread id of the workload's initial process
    #[arg(short = 'p', long = "pid", value_name = "TID")]
    pub pid: Option<String>,

    /// Read the trace from a file ("-" for stdin) instead of running perf
    #[arg(short = 'i', long = "input", value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// perf.data file handed to `perf sched script -i`
    #[arg(long = "perf-data", value_name = "FILE", conflicts_with = "input")]
    pub perf_data: Option<PathBuf>,

    /// Number of processors (default: online processors of this machine)
    #[arg(long = "cpus", value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    pub cpus: Option<u32>,

    /// Output format
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Configuration file (TOML)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Deadline in seconds for reading the trace
    #[arg(long = "timeout", value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Fail on the first malformed trace line instead of skipping it
    #[arg(long = "strict")]
    pub strict: bool,

    /// Enable debug logging to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
