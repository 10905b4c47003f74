//! Human-readable report

use crate::analyzer::{AnalysisReport, DistributionOutcome};
use crate::timestamp::format_duration;
use std::fmt::Write;

/// Render the report as text
pub fn render(report: &AnalysisReport) -> String {
    let mut out = String::new();

    match report.outcome() {
        DistributionOutcome::NeverCovered => {
            out.push_str("No full distribution observed\n");
        }
        DistributionOutcome::CoveredOnce => {
            out.push_str(
                "Workload covered all processors only once (degenerate reading discarded)\n",
            );
        }
        DistributionOutcome::Distributed(times) => {
            let times: Vec<String> = times.into_iter().map(format_duration).collect();
            let _ = writeln!(out, "Distribution time = [{}]", times.join(", "));
        }
    }

    let _ = writeln!(
        out,
        "Workload root {} on {} processors, {} threads tracked",
        report.root_thread,
        report.processor_count,
        report.placements.len()
    );

    out.push_str("Final thread settlement when workload ends\n");
    out.push_str("TID\tTIMESTAMP\tCPU\n");
    for placement in &report.placements {
        let cpu = placement
            .last_processor
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(out, "{}\t{}\t{}", placement.tid, placement.last_timestamp, cpu);
    }

    if report.counters.malformed > 0 {
        let _ = writeln!(
            out,
            "Skipped {} malformed trace line(s)",
            report.counters.malformed
        );
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::{AnalysisCounters, ThreadPlacement};
    use std::time::Duration;

    fn report(readings: Vec<Duration>) -> AnalysisReport {
        AnalysisReport {
            root_thread: "100".to_string(),
            processor_count: 4,
            readings,
            placements: vec![ThreadPlacement {
                tid: "100".to_string(),
                last_timestamp: "20.0".parse().unwrap(),
                last_processor: Some(3),
                creation_timestamp: "5.0".parse().unwrap(),
            }],
            diagnostics: Vec::new(),
            counters: AnalysisCounters::default(),
        }
    }

    #[test]
    fn test_render_distributed() {
        let text = render(&report(vec![
            Duration::from_secs(5),
            Duration::from_secs(12),
            Duration::from_millis(1500),
        ]));
        assert!(text.starts_with("Distribution time = [12.000000, 1.500000]\n"));
        assert!(text.contains("100\t20.000000\t3\n"));
        assert!(!text.contains("malformed"));
    }

    #[test]
    fn test_render_never_covered() {
        let text = render(&report(Vec::new()));
        assert!(text.starts_with("No full distribution observed"));
    }

    #[test]
    fn test_render_covered_once() {
        let text = render(&report(vec![Duration::from_secs(5)]));
        assert!(text.contains("only once"));
    }

    #[test]
    fn test_render_unplaced_and_malformed() {
        let mut r = report(Vec::new());
        r.placements[0].last_processor = None;
        r.counters.malformed = 2;
        let text = render(&r);
        assert!(text.contains("100\t20.000000\t-\n"));
        assert!(text.contains("Skipped 2 malformed trace line(s)"));
    }
}
