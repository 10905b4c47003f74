//! JSON output format for distribution reports

use crate::analyzer::{AnalysisCounters, AnalysisReport, DistributionOutcome, LineDiagnostic};
use crate::timestamp::{format_duration, Timestamp};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single distribution time
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonDistributionTime {
    /// Seconds, formatted like trace timestamps
    pub seconds: String,
    /// Exact value in nanoseconds
    pub nanos: u64,
}

impl From<Duration> for JsonDistributionTime {
    fn from(duration: Duration) -> Self {
        Self {
            seconds: format_duration(duration),
            nanos: u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX),
        }
    }
}

/// Final placement of a workload thread
#[derive(Debug, Clone, Serialize)]
pub struct JsonPlacement {
    pub tid: String,
    pub last_timestamp: Timestamp,
    /// Absent while the thread was never placed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_cpu: Option<u32>,
    pub created: Timestamp,
}

/// Root JSON output structure
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Format version identifier
    pub version: String,
    /// Format name
    pub format: String,
    pub root_thread: String,
    pub processor_count: usize,
    /// `never_covered`, `covered_once` or `distributed`
    pub outcome: String,
    /// Reported distribution times (first reading discarded)
    pub distribution_times: Vec<JsonDistributionTime>,
    /// Every distinct reading, including the discarded first one
    pub readings: Vec<JsonDistributionTime>,
    pub placements: Vec<JsonPlacement>,
    pub counters: AnalysisCounters,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<LineDiagnostic>,
}

impl JsonOutput {
    pub fn from_report(report: &AnalysisReport) -> Self {
        let outcome = match report.outcome() {
            DistributionOutcome::NeverCovered => "never_covered",
            DistributionOutcome::CoveredOnce => "covered_once",
            DistributionOutcome::Distributed(_) => "distributed",
        };

        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            format: "schedspread-json-v1".to_string(),
            root_thread: report.root_thread.clone(),
            processor_count: report.processor_count,
            outcome: outcome.to_string(),
            distribution_times: report
                .distribution_times()
                .iter()
                .copied()
                .map(JsonDistributionTime::from)
                .collect(),
            readings: report
                .readings
                .iter()
                .copied()
                .map(JsonDistributionTime::from)
                .collect(),
            placements: report
                .placements
                .iter()
                .map(|p| JsonPlacement {
                    tid: p.tid.clone(),
                    last_timestamp: p.last_timestamp,
                    last_cpu: p.last_processor,
                    created: p.creation_timestamp,
                })
                .collect(),
            counters: report.counters.clone(),
            diagnostics: report.diagnostics.clone(),
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> anyhow::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
