// Command-line behaviour: trace input, output formats, configuration

use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

const TRACE: &str = "\
          worker   100 [000]     5.000000:       sched:sched_wakeup: worker:100 [120] success=1 CPU:000
          worker   100 [000]     6.000000: sched:sched_process_fork: comm=worker pid=100 child_comm=worker child_pid=101
          worker   100 [000]     6.500000: sched:sched_switch: prev_comm=worker prev_pid=100 prev_prio=120 prev_state=S ==> next_comm=swapper/0 next_pid=0 next_prio=120
          worker   101 [000]     9.000000: sched:sched_migrate_task: comm=worker pid=101 prio=120 orig_cpu=0 dest_cpu=1
          worker   101 [001]     9.500000: sched:sched_migrate_task: comm=worker pid=101 prio=120 orig_cpu=1
";

fn trace_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn schedspread() -> assert_cmd::Command {
    assert_cmd::cargo::cargo_bin_cmd!("schedspread")
}

#[test]
fn test_text_report() {
    let trace = trace_file(TRACE);

    schedspread()
        .args(["-p", "100", "--cpus", "2", "-i"])
        .arg(trace.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Distribution time = [3.000000]"))
        .stdout(predicate::str::contains("101\t9.000000\t1"))
        .stdout(predicate::str::contains("Skipped 1 malformed trace line(s)"))
        .stderr(predicate::str::contains("skipping malformed trace line"));
}

#[test]
fn test_rust_log_level_is_honored() {
    let trace = trace_file(TRACE);

    schedspread()
        .env("RUST_LOG", "info")
        .args(["-p", "100", "--cpus", "2", "-i"])
        .arg(trace.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("analysis finished"));
}

#[test]
fn test_default_log_level_hides_info() {
    let trace = trace_file(TRACE);

    schedspread()
        .env_remove("RUST_LOG")
        .args(["-p", "100", "--cpus", "2", "-i"])
        .arg(trace.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("analysis finished").not())
        .stderr(predicate::str::contains("skipping malformed trace line"));
}

#[test]
fn test_json_report() {
    let trace = trace_file(TRACE);

    let output = schedspread()
        .args(["-p", "100", "--cpus", "2", "--format", "json", "-i"])
        .arg(trace.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["format"], "schedspread-json-v1");
    assert_eq!(json["outcome"], "distributed");
    assert_eq!(json["distribution_times"][0]["nanos"], 3_000_000_000u64);
    assert_eq!(json["placements"].as_array().unwrap().len(), 2);
    assert_eq!(json["diagnostics"][0]["line_number"], 5);
    assert_eq!(json["counters"]["forks_accepted"], 1);
}

#[test]
fn test_csv_report() {
    let trace = trace_file(TRACE);

    schedspread()
        .args(["-p", "100", "--cpus", "2", "--format", "csv", "-i"])
        .arg(trace.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "record,tid,timestamp,cpu,distribution_secs\ndistribution,,,,3.000000\n",
        ))
        .stdout(predicate::str::contains("placement,100,5.000000,0,"));
}

#[test]
fn test_trace_from_stdin() {
    schedspread()
        .args(["-p", "100", "--cpus", "2", "-i", "-"])
        .write_stdin(TRACE)
        .assert()
        .success()
        .stdout(predicate::str::contains("Distribution time = [3.000000]"));
}

#[test]
fn test_no_distribution_is_not_an_error() {
    let trace = trace_file(TRACE);

    schedspread()
        .args(["-p", "4242", "--cpus", "2", "-i"])
        .arg(trace.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("No full distribution observed"));
}

#[test]
fn test_strict_mode_fails_on_malformed_line() {
    let trace = trace_file(TRACE);

    schedspread()
        .args(["-p", "100", "--cpus", "2", "--strict", "-i"])
        .arg(trace.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("malformed trace line 5"));
}

#[test]
fn test_missing_root_thread() {
    let trace = trace_file(TRACE);

    schedspread()
        .args(["--cpus", "2", "-i"])
        .arg(trace.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("root thread"));
}

#[test]
fn test_missing_trace_file() {
    schedspread()
        .args(["-p", "100", "--cpus", "2", "-i", "/nonexistent/schedspread/trace.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to acquire trace"));
}

#[test]
fn test_config_file_supplies_settings() {
    let trace = trace_file(TRACE);
    let mut config = NamedTempFile::new().unwrap();
    writeln!(config, "root_thread = \"100\"\nprocessors = 2").unwrap();

    schedspread()
        .arg("--config")
        .arg(config.path())
        .arg("-i")
        .arg(trace.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Workload root 100 on 2 processors"));
}

#[test]
fn test_flags_override_config() {
    let trace = trace_file(TRACE);
    let mut config = NamedTempFile::new().unwrap();
    writeln!(config, "root_thread = \"4242\"\nprocessors = 8").unwrap();

    schedspread()
        .args(["-p", "100", "--cpus", "2", "--config"])
        .arg(config.path())
        .arg("-i")
        .arg(trace.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Workload root 100 on 2 processors"));
}

#[test]
fn test_configured_command_supplies_trace() {
    let trace = trace_file(TRACE);
    let mut config = NamedTempFile::new().unwrap();
    writeln!(
        config,
        "root_thread = \"100\"\nprocessors = 2\n[acquisition]\ncommand = [\"cat\", \"{}\"]\ntimeout_secs = 30",
        trace.path().display()
    )
    .unwrap();

    schedspread()
        .arg("--config")
        .arg(config.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Distribution time = [3.000000]"));
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut config = NamedTempFile::new().unwrap();
    writeln!(config, "unknown_key = 1").unwrap();

    schedspread()
        .args(["-p", "100", "--cpus", "2", "--config"])
        .arg(config.path())
        .args(["-i", "-"])
        .write_stdin("")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid config"));
}
