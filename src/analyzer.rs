//! Distribution analysis over a scheduler trace
//!
//! A single forward pass over the trace lines. For every relevant event the
//! analyzer:
//!
//! 1. extracts the event, admitting fork children of workload threads into
//!    the workload and ignoring everything that concerns other threads
//! 2. records stragglers (known but unplaced threads that just got a
//!    processor) in the [`DistributionEstimate`], then updates the tracker
//! 3. evaluates processor coverage
//! 4. on full coverage, tightens the bound and records the resulting
//!    distribution time unless that exact value was already seen
//!
//! The first recorded reading is taken while the workload is still being
//! created and is dropped from the reported distribution times.
//!
//! # Example
//!
//! ```
//! use schedspread::analyzer::{analyze, AnalysisSettings, DistributionOutcome};
//!
//! let trace = [
//!     "  bash 100 [000]  5.000000: sched:sched_wakeup: comm=bash pid=100 prio=120 target_cpu=000",
//!     "  bash 100 [000]  6.000000: sched:sched_process_fork: comm=bash pid=100 child_comm=bash child_pid=101",
//!     "  bash 101 [000]  9.000000: sched:sched_migrate_task: comm=bash pid=101 prio=120 orig_cpu=0 dest_cpu=1",
//! ];
//! let settings = AnalysisSettings::new("100", 2);
//! let report = analyze(trace, &settings).unwrap();
//! assert!(matches!(report.outcome(), DistributionOutcome::Distributed(_)));
//! assert_eq!(report.placements.len(), 2);
//! ```

use crate::coverage::{self, Coverage};
use crate::estimate::DistributionEstimate;
use crate::events::{self, EventKind, ExtractError, TraceEvent};
use crate::membership::WorkloadMembership;
use crate::timestamp::Timestamp;
use crate::tracker::ThreadTracker;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Errors that stop an analysis run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("processor count must be at least 1")]
    NoProcessors,

    #[error("workload root thread id must not be empty")]
    EmptyRoot,

    #[error("malformed trace line {line_number}: {source}")]
    Malformed {
        line_number: usize,
        #[source]
        source: ExtractError,
    },
}

/// Inputs of one analysis run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisSettings {
    /// Thread id of the workload's initial process
    pub root_thread: String,
    /// Number of processors the workload can spread over
    pub processor_count: usize,
    /// Abort on the first malformed trigger line instead of skipping it
    pub strict: bool,
}

impl AnalysisSettings {
    pub fn new(root_thread: impl Into<String>, processor_count: usize) -> Self {
        Self {
            root_thread: root_thread.into(),
            processor_count,
            strict: false,
        }
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// A trigger line that was skipped
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineDiagnostic {
    /// 1-based line number in the trace
    pub line_number: usize,
    pub kind: EventKind,
    pub reason: String,
    pub line: String,
}

/// Event accounting for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisCounters {
    pub lines: u64,
    pub wakeups: u64,
    pub migrations: u64,
    pub forks_accepted: u64,
    /// Forks whose parent is not a workload thread
    pub forks_ignored: u64,
    /// Wakeups and migrations of threads outside the workload
    pub foreign_events: u64,
    pub malformed: u64,
    /// Placements on a processor id beyond the processor count
    pub out_of_range_placements: u64,
}

/// What a single line did to the analysis state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    /// No relevant tracepoint on the line
    Irrelevant,
    /// Relevant trigger but malformed fields; skipped
    Malformed,
    /// Well-formed event about a thread outside the workload
    Ignored,
    /// Event applied; coverage as evaluated right after it
    Applied(Coverage),
}

/// Final placement of one workload thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadPlacement {
    pub tid: String,
    pub last_timestamp: Timestamp,
    pub last_processor: Option<u32>,
    pub creation_timestamp: Timestamp,
}

/// How the workload ended up distributed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DistributionOutcome {
    /// Coverage was never reached
    NeverCovered,
    /// Coverage was only reached while the workload was still being
    /// created; that reading is discarded
    CoveredOnce,
    /// Distribution times after discarding the first reading
    Distributed(Vec<Duration>),
}

/// Result of an analysis run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisReport {
    pub root_thread: String,
    pub processor_count: usize,
    /// Every distinct distribution time, in discovery order
    pub readings: Vec<Duration>,
    /// Workload threads with a known state, in the order they joined
    pub placements: Vec<ThreadPlacement>,
    pub diagnostics: Vec<LineDiagnostic>,
    pub counters: AnalysisCounters,
}

impl AnalysisReport {
    /// Reported distribution times: all readings but the first
    pub fn distribution_times(&self) -> &[Duration] {
        self.readings.get(1..).unwrap_or(&[])
    }

    pub fn outcome(&self) -> DistributionOutcome {
        match self.readings.len() {
            0 => DistributionOutcome::NeverCovered,
            1 => DistributionOutcome::CoveredOnce,
            _ => DistributionOutcome::Distributed(self.distribution_times().to_vec()),
        }
    }
}

/// Single-pass distribution analyzer
#[derive(Debug)]
pub struct DistributionAnalyzer {
    processor_count: usize,
    strict: bool,
    membership: WorkloadMembership,
    tracker: ThreadTracker,
    estimate: DistributionEstimate,
    current_timestamp: Option<Timestamp>,
    readings: Vec<Duration>,
    diagnostics: Vec<LineDiagnostic>,
    counters: AnalysisCounters,
}

impl DistributionAnalyzer {
    pub fn new(settings: &AnalysisSettings) -> Result<Self, AnalysisError> {
        if settings.processor_count == 0 {
            return Err(AnalysisError::NoProcessors);
        }
        if settings.root_thread.trim().is_empty() {
            return Err(AnalysisError::EmptyRoot);
        }

        Ok(Self {
            processor_count: settings.processor_count,
            strict: settings.strict,
            membership: WorkloadMembership::new(settings.root_thread.trim()),
            tracker: ThreadTracker::new(),
            estimate: DistributionEstimate::new(),
            current_timestamp: None,
            readings: Vec::new(),
            diagnostics: Vec::new(),
            counters: AnalysisCounters::default(),
        })
    }

    /// Feed the next trace line
    ///
    /// Malformed trigger lines are recorded as diagnostics and skipped,
    /// unless the analyzer is strict.
    pub fn process_line(&mut self, line: &str) -> Result<LineOutcome, AnalysisError> {
        self.counters.lines += 1;
        let line_number = self.counters.lines as usize;

        match events::extract(line) {
            Ok(None) => Ok(LineOutcome::Irrelevant),
            Ok(Some(event)) => Ok(self.apply(event)),
            Err(source) => {
                self.counters.malformed += 1;
                tracing::warn!(
                    line_number,
                    kind = %source.kind(),
                    "skipping malformed trace line: {}",
                    source
                );
                if self.strict {
                    return Err(AnalysisError::Malformed {
                        line_number,
                        source,
                    });
                }
                self.diagnostics.push(LineDiagnostic {
                    line_number,
                    kind: source.kind(),
                    reason: source.to_string(),
                    line: line.to_string(),
                });
                Ok(LineOutcome::Malformed)
            }
        }
    }

    /// Apply one extracted event
    pub fn apply(&mut self, event: TraceEvent) -> LineOutcome {
        match &event {
            TraceEvent::Wakeup { .. } => self.counters.wakeups += 1,
            TraceEvent::Migrate { .. } => self.counters.migrations += 1,
            TraceEvent::Fork { .. } => {}
        }

        match &event {
            TraceEvent::Fork { parent, child, .. } => {
                if !self.membership.contains(parent) {
                    self.counters.forks_ignored += 1;
                    return LineOutcome::Ignored;
                }
                self.counters.forks_accepted += 1;
                if self.membership.admit(child) {
                    tracing::debug!(parent = %parent, child = %child, "workload thread created");
                } else {
                    tracing::debug!(child = %child, "repeated fork of a workload thread");
                }
            }
            TraceEvent::Wakeup { tid, .. } | TraceEvent::Migrate { tid, .. } => {
                if !self.membership.contains(tid) {
                    self.counters.foreign_events += 1;
                    tracing::trace!(tid = %tid, "event for a thread outside the workload");
                    return LineOutcome::Ignored;
                }
            }
        }

        let timestamp = event.timestamp();
        let processor = event.processor();
        let tid = event.subject();

        if let Some(cpu) = processor {
            if cpu as usize >= self.processor_count {
                self.counters.out_of_range_placements += 1;
                tracing::warn!(
                    tid = %tid,
                    cpu,
                    processor_count = self.processor_count,
                    "placement on a processor beyond the processor count"
                );
            }
        }

        if let Some(prior) = self.tracker.get(tid).copied() {
            if !prior.is_placed()
                && self
                    .estimate
                    .record_straggler(prior.creation_timestamp, timestamp)
            {
                tracing::debug!(
                    tid = %tid,
                    created = %prior.creation_timestamp,
                    at = %timestamp,
                    "straggler placed, distribution bound moved"
                );
            }
        }

        self.tracker.observe(tid, timestamp, processor);
        self.current_timestamp = Some(timestamp);

        let coverage = coverage::evaluate(&self.membership, &self.tracker, self.processor_count);
        if coverage.is_full() {
            self.record_full_coverage(timestamp);
        }

        LineOutcome::Applied(coverage)
    }

    fn record_full_coverage(&mut self, now: Timestamp) {
        self.estimate.tighten(now);
        let Some(distance) = self.estimate.distance() else {
            return;
        };
        if !self.readings.contains(&distance) {
            tracing::debug!(
                at = %now,
                distance_ns = u64::try_from(distance.as_nanos()).unwrap_or(u64::MAX),
                "full distribution reached"
            );
            self.readings.push(distance);
        }
    }

    /// Coverage of the current tracker state
    pub fn coverage(&self) -> Coverage {
        coverage::evaluate(&self.membership, &self.tracker, self.processor_count)
    }

    pub fn membership(&self) -> &WorkloadMembership {
        &self.membership
    }

    pub fn tracker(&self) -> &ThreadTracker {
        &self.tracker
    }

    pub fn estimate(&self) -> &DistributionEstimate {
        &self.estimate
    }

    /// Timestamp of the last applied event
    pub fn current_timestamp(&self) -> Option<Timestamp> {
        self.current_timestamp
    }

    /// Distinct distribution times so far, including the first
    pub fn readings(&self) -> &[Duration] {
        &self.readings
    }

    pub fn diagnostics(&self) -> &[LineDiagnostic] {
        &self.diagnostics
    }

    pub fn counters(&self) -> &AnalysisCounters {
        &self.counters
    }

    /// Close the run and build the report
    pub fn finish(self) -> AnalysisReport {
        let placements = self
            .membership
            .iter()
            .filter_map(|tid| {
                self.tracker.get(tid).map(|state| ThreadPlacement {
                    tid: tid.to_string(),
                    last_timestamp: state.last_timestamp,
                    last_processor: state.last_processor,
                    creation_timestamp: state.creation_timestamp,
                })
            })
            .collect();

        tracing::info!(
            lines = self.counters.lines,
            workload_threads = self.membership.len(),
            readings = self.readings.len(),
            malformed = self.counters.malformed,
            "analysis finished"
        );

        AnalysisReport {
            root_thread: self.membership.root().to_string(),
            processor_count: self.processor_count,
            readings: self.readings,
            placements,
            diagnostics: self.diagnostics,
            counters: self.counters,
        }
    }
}

/// Run a complete analysis over `lines`
pub fn analyze<I, S>(
    lines: I,
    settings: &AnalysisSettings,
) -> Result<AnalysisReport, AnalysisError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut analyzer = DistributionAnalyzer::new(settings)?;
    for line in lines {
        analyzer.process_line(line.as_ref())?;
    }
    Ok(analyzer.finish())
}
