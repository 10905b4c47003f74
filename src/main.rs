use anyhow::{Context, Result};
use clap::Parser;
use schedspread::cli::{Cli, OutputFormat};
use schedspread::config::AnalyzerConfig;
use schedspread::source::{self, TraceSource};
use schedspread::{analyze, csv_output, json_output, text_output, AnalysisSettings};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; warnings always reach stderr
///
/// The level only applies when `RUST_LOG` is unset or invalid.
fn init_tracing(debug: bool) {
    let level = if debug {
        tracing::Level::TRACE
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Pick the trace source from flags, falling back to the configured command
fn trace_source(args: &Cli, config: &AnalyzerConfig) -> Result<TraceSource> {
    if let Some(input) = &args.input {
        if input == Path::new("-") {
            return Ok(TraceSource::Stdin);
        }
        return Ok(TraceSource::File(input.clone()));
    }
    if args.perf_data.is_some() {
        return Ok(TraceSource::perf_sched_script(args.perf_data.clone()));
    }
    Ok(TraceSource::command(config.acquisition.command.iter().cloned())?)
}

fn main() -> Result<()> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let config = match &args.config {
        Some(path) => AnalyzerConfig::from_file(path)?,
        None => AnalyzerConfig::default(),
    };

    let root_thread = args
        .pid
        .clone()
        .or_else(|| config.root_thread.clone())
        .context("Must specify the workload root thread with -p TID or root_thread in the config")?;

    let processor_count = match args.cpus.map(|n| n as usize).or(config.processors) {
        Some(count) => count,
        None => source::online_processors()?,
    };

    let deadline = match args.timeout {
        Some(0) => None,
        Some(secs) => Some(std::time::Duration::from_secs(secs)),
        None => config.acquisition.timeout(),
    };

    let source = trace_source(&args, &config)?;
    let trace = source::read_trace(&source, deadline)
        .with_context(|| format!("Failed to acquire trace from {}", source.describe()))?;

    let settings =
        AnalysisSettings::new(root_thread, processor_count).with_strict(args.strict || config.strict);
    let report = analyze(trace.lines(), &settings)?;

    match args.format {
        OutputFormat::Text => print!("{}", text_output::render(&report)),
        OutputFormat::Json => {
            println!("{}", json_output::JsonOutput::from_report(&report).to_json()?)
        }
        OutputFormat::Csv => print!("{}", csv_output::CsvOutput::from_report(&report).to_csv()),
    }

    Ok(())
}
