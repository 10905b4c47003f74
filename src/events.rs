//! Scheduler trace event extraction
//!
//! Turns one line of `perf sched script` (or ftrace) text into a typed
//! [`TraceEvent`]. A line is classified by the tracepoint name it carries:
//!
//! - `sched_wakeup` (including `sched_wakeup_new`): thread became runnable
//!   on a target processor
//! - `sched_migrate_task`: thread moved to `dest_cpu`
//! - `sched_process_fork`: `pid` created `child_pid`
//!
//! Lines without any of these names are not relevant and yield `Ok(None)`.
//! A relevant line whose fields do not match the layout for its kind is an
//! [`ExtractError`]; no placeholder values are ever produced for it.
//!
//! # Example
//!
//! ```
//! use schedspread::events::{extract, TraceEvent};
//!
//! let line = "  worker 4243 [001]  20.000000: sched:sched_migrate_task: \
//!             comm=worker pid=4243 prio=120 orig_cpu=1 dest_cpu=3";
//! match extract(line).unwrap() {
//!     Some(TraceEvent::Migrate { tid, processor, .. }) => {
//!         assert_eq!(tid, "4243");
//!         assert_eq!(processor, 3);
//!     }
//!     other => panic!("unexpected {:?}", other),
//! }
//! ```

use crate::timestamp::Timestamp;
use regex::{Captures, Regex};
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

const WAKEUP_TRIGGER: &str = "sched_wakeup";
const MIGRATE_TRIGGER: &str = "sched_migrate_task";
const FORK_TRIGGER: &str = "sched_process_fork";

/// Wakeup rendered by the traceevent sched plugin: `comm:TID [prio] success=1 CPU:003`
static WAKEUP_PLUGIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*\s(?P<ts>\d+\.\d+):\s.*sched_wakeup.*:(?P<tid>\d+)\b.*\sCPU:(?P<cpu>\d+)")
        .expect("Invalid plugin wakeup regex pattern")
});

/// Wakeup rendered from raw tracepoint fields: `comm=.. pid=TID prio=.. target_cpu=003`
static WAKEUP_RAW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*\s(?P<ts>\d+\.\d+):\s.*sched_wakeup.*\spid=(?P<tid>\d+)\b.*\starget_cpu=(?P<cpu>\d+)")
        .expect("Invalid raw wakeup regex pattern")
});

static MIGRATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*\s(?P<ts>\d+\.\d+):\s.*sched_migrate_task.*\spid=(?P<tid>\d+)\b.*\sdest_cpu=(?P<cpu>\d+)")
        .expect("Invalid migrate regex pattern")
});

static FORK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*\s(?P<ts>\d+\.\d+):\s.*sched_process_fork.*\spid=(?P<parent>\d+)\b.*\schild_pid=(?P<child>\d+)")
        .expect("Invalid fork regex pattern")
});

/// Kind of scheduler event, as classified by its trigger substring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Wakeup,
    Migrate,
    Fork,
}

impl EventKind {
    /// Classify a line by trigger substring. Wakeup wins over migrate,
    /// migrate over fork.
    pub fn classify(line: &str) -> Option<Self> {
        if line.contains(WAKEUP_TRIGGER) {
            Some(EventKind::Wakeup)
        } else if line.contains(MIGRATE_TRIGGER) {
            Some(EventKind::Migrate)
        } else if line.contains(FORK_TRIGGER) {
            Some(EventKind::Fork)
        } else {
            None
        }
    }

    pub fn trigger(self) -> &'static str {
        match self {
            EventKind::Wakeup => WAKEUP_TRIGGER,
            EventKind::Migrate => MIGRATE_TRIGGER,
            EventKind::Fork => FORK_TRIGGER,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.trigger())
    }
}

/// A relevant scheduler event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    /// `tid` became runnable on `processor`
    Wakeup {
        timestamp: Timestamp,
        tid: String,
        processor: u32,
    },
    /// `tid` was moved to `processor`
    Migrate {
        timestamp: Timestamp,
        tid: String,
        processor: u32,
    },
    /// `parent` created `child`; the child has no processor yet
    Fork {
        timestamp: Timestamp,
        parent: String,
        child: String,
    },
}

impl TraceEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            TraceEvent::Wakeup { .. } => EventKind::Wakeup,
            TraceEvent::Migrate { .. } => EventKind::Migrate,
            TraceEvent::Fork { .. } => EventKind::Fork,
        }
    }

    pub fn timestamp(&self) -> Timestamp {
        match self {
            TraceEvent::Wakeup { timestamp, .. }
            | TraceEvent::Migrate { timestamp, .. }
            | TraceEvent::Fork { timestamp, .. } => *timestamp,
        }
    }

    /// The thread whose placement this event reports (the child for forks)
    pub fn subject(&self) -> &str {
        match self {
            TraceEvent::Wakeup { tid, .. } | TraceEvent::Migrate { tid, .. } => tid,
            TraceEvent::Fork { child, .. } => child,
        }
    }

    /// Processor the subject landed on; forks carry none
    pub fn processor(&self) -> Option<u32> {
        match self {
            TraceEvent::Wakeup { processor, .. } | TraceEvent::Migrate { processor, .. } => {
                Some(*processor)
            }
            TraceEvent::Fork { .. } => None,
        }
    }
}

/// A trigger line that does not match the field layout for its kind
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("{kind} line does not match the expected field layout")]
    FieldMismatch { kind: EventKind },

    #[error("{kind} line has an unparseable timestamp {value:?}")]
    InvalidTimestamp { kind: EventKind, value: String },

    #[error("{kind} line has an out-of-range processor id {value:?}")]
    InvalidProcessor { kind: EventKind, value: String },
}

impl ExtractError {
    pub fn kind(&self) -> EventKind {
        match self {
            ExtractError::FieldMismatch { kind }
            | ExtractError::InvalidTimestamp { kind, .. }
            | ExtractError::InvalidProcessor { kind, .. } => *kind,
        }
    }
}

/// Extract a typed event from one trace line
///
/// Returns `Ok(None)` when the line carries no relevant tracepoint.
pub fn extract(line: &str) -> Result<Option<TraceEvent>, ExtractError> {
    let Some(kind) = EventKind::classify(line) else {
        return Ok(None);
    };

    let event = match kind {
        EventKind::Wakeup => {
            let caps = WAKEUP_PLUGIN_RE
                .captures(line)
                .or_else(|| WAKEUP_RAW_RE.captures(line))
                .ok_or(ExtractError::FieldMismatch { kind })?;
            TraceEvent::Wakeup {
                timestamp: timestamp_field(&caps, kind)?,
                tid: caps["tid"].to_string(),
                processor: processor_field(&caps, kind)?,
            }
        }
        EventKind::Migrate => {
            let caps = MIGRATE_RE
                .captures(line)
                .ok_or(ExtractError::FieldMismatch { kind })?;
            TraceEvent::Migrate {
                timestamp: timestamp_field(&caps, kind)?,
                tid: caps["tid"].to_string(),
                processor: processor_field(&caps, kind)?,
            }
        }
        EventKind::Fork => {
            let caps = FORK_RE
                .captures(line)
                .ok_or(ExtractError::FieldMismatch { kind })?;
            TraceEvent::Fork {
                timestamp: timestamp_field(&caps, kind)?,
                parent: caps["parent"].to_string(),
                child: caps["child"].to_string(),
            }
        }
    };

    Ok(Some(event))
}

fn timestamp_field(caps: &Captures<'_>, kind: EventKind) -> Result<Timestamp, ExtractError> {
    let value = &caps["ts"];
    value.parse().map_err(|_| ExtractError::InvalidTimestamp {
        kind,
        value: value.to_string(),
    })
}

fn processor_field(caps: &Captures<'_>, kind: EventKind) -> Result<u32, ExtractError> {
    let value = &caps["cpu"];
    value.parse().map_err(|_| ExtractError::InvalidProcessor {
        kind,
        value: value.to_string(),
    })
}
