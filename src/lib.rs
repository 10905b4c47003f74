//! schedspread - scheduler distribution-time analyzer
//!
//! Consumes a scheduler trace (`sched_wakeup`, `sched_migrate_task` and
//! `sched_process_fork` events) for a multi-threaded workload and measures
//! how long the scheduler takes to spread the workload's threads across all
//! processors, along with each thread's final placement.

pub mod analyzer;
pub mod cli;
pub mod config;
pub mod coverage;
pub mod csv_output;
pub mod estimate;
pub mod events;
pub mod json_output;
pub mod membership;
pub mod source;
pub mod text_output;
pub mod timestamp;
pub mod tracker;

pub use analyzer::{
    analyze, AnalysisReport, AnalysisSettings, DistributionAnalyzer, DistributionOutcome,
};
