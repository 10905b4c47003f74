//! CSV output format for distribution reports
//!
//! One row per reported distribution time, then one row per workload
//! thread placement:
//!
//! ```text
//! record,tid,timestamp,cpu,distribution_secs
//! distribution,,,,0.000120
//! placement,4243,20.000000,3,
//! ```

use crate::analyzer::AnalysisReport;
use crate::timestamp::format_duration;

/// CSV record for a single report row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CsvRecord {
    Distribution { seconds: String },
    Placement {
        tid: String,
        timestamp: String,
        cpu: Option<u32>,
    },
}

/// CSV output formatter
#[derive(Debug, Default)]
pub struct CsvOutput {
    records: Vec<CsvRecord>,
}

impl CsvOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_report(report: &AnalysisReport) -> Self {
        let mut output = Self::new();
        for time in report.distribution_times() {
            output.add_record(CsvRecord::Distribution {
                seconds: format_duration(*time),
            });
        }
        for placement in &report.placements {
            output.add_record(CsvRecord::Placement {
                tid: placement.tid.clone(),
                timestamp: placement.last_timestamp.to_string(),
                cpu: placement.last_processor,
            });
        }
        output
    }

    pub fn add_record(&mut self, record: CsvRecord) {
        self.records.push(record);
    }

    fn header() -> &'static str {
        "record,tid,timestamp,cpu,distribution_secs"
    }

    /// Escape CSV field (handle commas, quotes, newlines)
    fn escape_field(field: &str) -> String {
        if field.contains(',') || field.contains('"') || field.contains('\n') {
            format!("\"{}\"", field.replace('"', "\"\""))
        } else {
            field.to_string()
        }
    }

    fn format_record(record: &CsvRecord) -> String {
        match record {
            CsvRecord::Distribution { seconds } => format!("distribution,,,,{}", seconds),
            CsvRecord::Placement { tid, timestamp, cpu } => format!(
                "placement,{},{},{},",
                Self::escape_field(tid),
                timestamp,
                cpu.map(|c| c.to_string()).unwrap_or_default()
            ),
        }
    }

    /// Render header plus all rows, newline-terminated
    pub fn to_csv(&self) -> String {
        let mut output = String::new();
        output.push_str(Self::header());
        output.push('\n');
        for record in &self.records {
            output.push_str(&Self::format_record(record));
            output.push('\n');
        }
        output
    }
}
