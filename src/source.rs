//! Trace acquisition and processor count
//!
//! The analyzer only consumes text lines; this module obtains them. The
//! trace is read completely before analysis starts, from a file, from stdin,
//! or from the stdout of a command (by default `perf sched script`).
//!
//! Reading happens on a worker thread that hands the text back over a
//! channel, so an optional deadline can bound the whole acquisition phase.
//! A command that misses the deadline is sent SIGTERM and then killed.

use crossbeam::channel::{self, RecvTimeoutError};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Default command producing the scheduler trace
pub const DEFAULT_TRACE_COMMAND: [&str; 3] = ["perf", "sched", "script"];

/// Grace period between SIGTERM and SIGKILL for a timed-out command
const TERMINATE_GRACE: Duration = Duration::from_millis(200);

/// Errors raised while obtaining the trace or the processor count
#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("failed to read trace file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read trace from stdin: {0}")]
    ReadStdin(#[source] io::Error),

    #[error("trace command is empty")]
    EmptyCommand,

    #[error("failed to run trace command `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("trace command `{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("trace acquisition did not finish within {0:?}")]
    DeadlineExceeded(Duration),

    #[error("trace reader stopped unexpectedly")]
    ReaderLost,

    #[error("cannot determine the number of online processors: {0}")]
    ProcessorCount(#[source] io::Error),
}

/// Where the trace text comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceSource {
    File(PathBuf),
    Stdin,
    Command { program: String, args: Vec<String> },
}

impl TraceSource {
    /// Build a command source from `argv`-style parts
    pub fn command<I, S>(parts: I) -> Result<Self, AcquisitionError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parts = parts.into_iter().map(Into::into);
        let program = parts.next().ok_or(AcquisitionError::EmptyCommand)?;
        if program.is_empty() {
            return Err(AcquisitionError::EmptyCommand);
        }
        Ok(TraceSource::Command {
            program,
            args: parts.collect(),
        })
    }

    /// `perf sched script`, optionally reading a specific `perf.data`
    pub fn perf_sched_script(data_file: Option<PathBuf>) -> Self {
        let mut args: Vec<String> = DEFAULT_TRACE_COMMAND[1..]
            .iter()
            .map(|s| s.to_string())
            .collect();
        if let Some(path) = data_file {
            args.push("-i".to_string());
            args.push(path.display().to_string());
        }
        TraceSource::Command {
            program: DEFAULT_TRACE_COMMAND[0].to_string(),
            args,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            TraceSource::File(path) => path.display().to_string(),
            TraceSource::Stdin => "<stdin>".to_string(),
            TraceSource::Command { program, args } => command_line(program, args),
        }
    }
}

fn command_line(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Read the whole trace, giving up after `deadline` if one is set
pub fn read_trace(
    source: &TraceSource,
    deadline: Option<Duration>,
) -> Result<String, AcquisitionError> {
    tracing::debug!(source = %source.describe(), ?deadline, "acquiring trace");

    match source {
        TraceSource::File(path) => {
            let path = path.clone();
            run_with_deadline(deadline, move || {
                std::fs::read(&path)
                    .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
                    .map_err(|source| AcquisitionError::ReadFile { path, source })
            })
        }
        TraceSource::Stdin => run_with_deadline(deadline, || {
            let mut bytes = Vec::new();
            io::stdin()
                .lock()
                .read_to_end(&mut bytes)
                .map_err(AcquisitionError::ReadStdin)?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }),
        TraceSource::Command { program, args } => run_command(program, args, deadline),
    }
}

fn run_with_deadline<F>(deadline: Option<Duration>, read: F) -> Result<String, AcquisitionError>
where
    F: FnOnce() -> Result<String, AcquisitionError> + Send + 'static,
{
    let Some(deadline) = deadline else {
        return read();
    };

    let (tx, rx) = channel::bounded(1);
    thread::spawn(move || {
        // The receiver may be gone after a timeout
        let _ = tx.send(read());
    });

    match rx.recv_timeout(deadline) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => Err(AcquisitionError::DeadlineExceeded(deadline)),
        Err(RecvTimeoutError::Disconnected) => Err(AcquisitionError::ReaderLost),
    }
}

fn run_command(
    program: &str,
    args: &[String],
    deadline: Option<Duration>,
) -> Result<String, AcquisitionError> {
    let command = command_line(program, args);
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| AcquisitionError::Spawn {
            command: command.clone(),
            source,
        })?;

    let mut stdout = child.stdout.take().ok_or(AcquisitionError::ReaderLost)?;
    let mut stderr = child.stderr.take().ok_or(AcquisitionError::ReaderLost)?;

    // Drain both pipes concurrently so a chatty stderr cannot stall perf
    let (tx, rx) = channel::bounded(1);
    thread::spawn(move || {
        let mut out = Vec::new();
        let result = stdout.read_to_end(&mut out).map(|_| out);
        let _ = tx.send(result);
    });
    let stderr_reader = thread::spawn(move || {
        let mut err = Vec::new();
        let _ = stderr.read_to_end(&mut err);
        String::from_utf8_lossy(&err).trim().to_string()
    });

    let received = match deadline {
        Some(deadline) => match rx.recv_timeout(deadline) {
            Ok(result) => Ok(result),
            Err(RecvTimeoutError::Timeout) => {
                tracing::warn!(command = %command, ?deadline, "trace command timed out, terminating");
                terminate(&mut child);
                return Err(AcquisitionError::DeadlineExceeded(deadline));
            }
            Err(RecvTimeoutError::Disconnected) => Err(()),
        },
        None => rx.recv().map_err(|_| ()),
    };

    let bytes = take_output(&mut child, &command, received)?;
    let status = child.wait().map_err(|source| AcquisitionError::Spawn {
        command: command.clone(),
        source,
    })?;
    let stderr = stderr_reader.join().unwrap_or_default();

    if !status.success() {
        return Err(AcquisitionError::CommandFailed {
            command,
            status: status.to_string(),
            stderr,
        });
    }
    if !stderr.is_empty() {
        tracing::debug!(command = %command, stderr = %stderr, "trace command wrote to stderr");
    }

    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Unwrap the reader thread's result, reaping the child when there is none
fn take_output(
    child: &mut Child,
    command: &str,
    received: Result<io::Result<Vec<u8>>, ()>,
) -> Result<Vec<u8>, AcquisitionError> {
    match received {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(source)) => {
            terminate(child);
            Err(AcquisitionError::Spawn {
                command: command.to_string(),
                source,
            })
        }
        Err(()) => {
            terminate(child);
            Err(AcquisitionError::ReaderLost)
        }
    }
}

/// Ask politely first, then kill
fn terminate(child: &mut Child) {
    if let Ok(raw) = i32::try_from(child.id()) {
        let _ = signal::kill(Pid::from_raw(raw), Signal::SIGTERM);
        thread::sleep(TERMINATE_GRACE);
    }
    if let Ok(None) = child.try_wait() {
        let _ = child.kill();
    }
    let _ = child.wait();
}

/// Number of processors currently online
pub fn online_processors() -> Result<usize, AcquisitionError> {
    // SAFETY: sysconf has no memory-safety preconditions
    let count = unsafe { libc::sysconf(libc::_SC_NPROCESSORS_ONLN) };
    if count < 1 {
        return Err(AcquisitionError::ProcessorCount(io::Error::last_os_error()));
    }
    usize::try_from(count).map_err(|_| {
        AcquisitionError::ProcessorCount(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("sysconf returned {}", count),
        ))
    })
}
