use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;

use mts_core::errors::{ErrorInfo, SweepError};
use mts_exp::{
    DriverOptions, ExitOutcome, Invocation, LaunchLimits, Launcher, RunState, RunTimeout,
    SweepDriver, SweepSpec,
};

/// Writes both artefacts unless the pattern is listed as failing.
#[derive(Default)]
struct ScriptedLauncher {
    failing_patterns: Vec<&'static str>,
    unlaunchable_patterns: Vec<&'static str>,
    calls: RefCell<Vec<Invocation>>,
}

fn flag_value<'a>(invocation: &'a Invocation, flag: &str) -> &'a str {
    let pos = invocation
        .args
        .iter()
        .position(|arg| arg == flag)
        .expect("flag present");
    &invocation.args[pos + 1]
}

impl Launcher for ScriptedLauncher {
    fn launch(
        &self,
        invocation: &Invocation,
        _limits: &LaunchLimits,
    ) -> Result<ExitOutcome, SweepError> {
        self.calls.borrow_mut().push(invocation.clone());
        let pattern = flag_value(invocation, "-p");
        if self.unlaunchable_patterns.contains(&pattern) {
            return Err(SweepError::Launch(ErrorInfo::new(
                "spawn_failed",
                "scripted spawn failure",
            )));
        }
        if self.failing_patterns.contains(&pattern) {
            return Ok(ExitOutcome::Failure { code: Some(1) });
        }
        fs::write(flag_value(invocation, "--output"), "percentile,latency_ns\n").unwrap();
        fs::write(flag_value(invocation, "--periodic-output"), "Latency(ns)\n").unwrap();
        Ok(ExitOutcome::Success)
    }
}

fn three_pattern_spec() -> SweepSpec {
    pattern_spec(&["first", "second", "third"], 1)
}

fn pattern_spec(patterns: &[&'static str], running_time: i32) -> SweepSpec {
    SweepSpec::new()
        .with_values("pattern", patterns.iter().copied())
        .with_value("client_tier_sizes", "10 20")
        .with_value("server_mem_sizes", "100,200")
        .with_value("buffer_size", 4096)
        .with_value("running_time", running_time)
        .with_value("policy_type", "lru")
        .with_value("num_tiers", 2)
        .with_value("scan_interval", 1)
        .with_value("sample_rate", 1)
        .with_value("hot_threshold", 5)
        .with_value("cold_threshold", 10)
}

fn options(root: PathBuf) -> DriverOptions {
    DriverOptions {
        result_root: root,
        ..DriverOptions::default()
    }
}

#[test]
fn failing_run_does_not_stop_the_sweep() {
    let temp = tempfile::tempdir().expect("tmp dir");
    let launcher = ScriptedLauncher {
        failing_patterns: vec!["second"],
        ..ScriptedLauncher::default()
    };
    let mut driver = SweepDriver::with_launcher("isolation", options(temp.path().into()), launcher);
    let report = driver.run(&three_pattern_spec()).expect("sweep completes");

    assert_eq!(driver.launcher().calls.borrow().len(), 3);
    let states: Vec<RunState> = report.runs.iter().map(|run| run.state).collect();
    assert_eq!(
        states,
        [RunState::Succeeded, RunState::Failed, RunState::Succeeded]
    );
    assert_eq!(report.runs[1].outcome, Some(ExitOutcome::Failure { code: Some(1) }));
    assert_eq!(report.summary.succeeded, 2);
    assert_eq!(report.summary.failed, 1);
    assert!(report.has_failures());

    for (run, expect_files) in report.runs.iter().zip([true, false, true]) {
        let outputs = run.outputs.as_ref().expect("outputs derived");
        assert_eq!(outputs.cdf.exists(), expect_files);
        assert_eq!(outputs.periodic.exists(), expect_files);
    }
}

#[test]
fn spawn_errors_are_isolated_like_exit_failures() {
    let temp = tempfile::tempdir().expect("tmp dir");
    let launcher = ScriptedLauncher {
        unlaunchable_patterns: vec!["first"],
        ..ScriptedLauncher::default()
    };
    let mut driver = SweepDriver::with_launcher("spawn", options(temp.path().into()), launcher);
    let report = driver.run(&three_pattern_spec()).expect("sweep completes");
    assert_eq!(driver.launcher().calls.borrow().len(), 3);
    assert_eq!(report.runs[0].state, RunState::Failed);
    assert_eq!(
        report.runs[0].error.as_ref().map(|err| err.code()),
        Some("spawn_failed")
    );
    assert_eq!(report.summary.succeeded, 2);
}

#[test]
fn missing_required_field_fails_only_that_combination() {
    let temp = tempfile::tempdir().expect("tmp dir");
    // frequency runs have no hot_count/cold_count in this spec.
    let spec = three_pattern_spec()
        .with_value("pattern", "only")
        .with_values("policy_type", ["lru", "frequency"]);
    let mut driver = SweepDriver::with_launcher(
        "missing",
        options(temp.path().into()),
        ScriptedLauncher::default(),
    );
    let report = driver.run(&spec).expect("sweep completes");
    assert_eq!(report.runs.len(), 2);
    assert_eq!(report.runs[0].state, RunState::Succeeded);
    assert_eq!(report.runs[1].state, RunState::Failed);
    let err = report.runs[1].error.as_ref().expect("error recorded");
    assert_eq!(err.code(), "missing_required_field");
    assert_eq!(
        err.info().context.get("field").map(String::as_str),
        Some("hot_count")
    );
    assert!(report.runs[1].identifier.is_none());
    assert_eq!(driver.launcher().calls.borrow().len(), 1);
}

#[cfg(unix)]
mod process {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::thread;
    use std::time::{Duration, Instant};

    const FAKE_BENCHMARK: &str = r#"#!/bin/sh
pattern=""
running=0
cdf=""
periodic=""
while [ $# -gt 0 ]; do
  case "$1" in
    -p) pattern="$2"; shift 2 ;;
    --running-time) running="$2"; shift 2 ;;
    --output) cdf="$2"; shift 2 ;;
    --periodic-output) periodic="$2"; shift 2 ;;
    *) shift ;;
  esac
done
case "$pattern" in
  second) exit 7 ;;
  hang) sleep 30 ;;
  announce) touch "$(dirname "$cdf")/started"; sleep 30 ;;
  steady) sleep "$running" ;;
esac
echo "percentile,latency_ns" > "$cdf"
echo "Latency(ns),Throughput(ops/s)" > "$periodic"
"#;

    fn install_benchmark(dir: &Path) -> PathBuf {
        let path = dir.join("fake-benchmark.sh");
        fs::write(&path, FAKE_BENCHMARK).expect("write script");
        let mut perms = fs::metadata(&path).expect("metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("chmod");
        path
    }

    #[test]
    fn real_process_failure_is_isolated() {
        let temp = tempfile::tempdir().expect("tmp dir");
        let executable = install_benchmark(temp.path());
        let options = DriverOptions {
            executable,
            result_root: temp.path().join("result"),
            timeout: RunTimeout::Fixed(Duration::from_secs(30)),
            poll_interval: Duration::from_millis(10),
        };
        let mut driver = SweepDriver::new("process", options);
        let report = driver.run(&three_pattern_spec()).expect("sweep completes");

        assert_eq!(report.summary.total, 3);
        assert_eq!(report.runs[1].outcome, Some(ExitOutcome::Failure { code: Some(7) }));
        let dir = temp.path().join("result").join("process");
        let produced: Vec<_> = fs::read_dir(&dir)
            .expect("result dir")
            .map(|entry| entry.expect("entry").file_name().into_string().unwrap())
            .collect();
        assert_eq!(produced.len(), 4);
        assert!(produced.iter().all(|name| !name.contains("_second_")));
        assert!(produced
            .iter()
            .any(|name| name.starts_with("cdf_third_") && name.ends_with(".csv")));
    }

    #[test]
    fn missing_executable_is_isolated() {
        let temp = tempfile::tempdir().expect("tmp dir");
        let options = DriverOptions {
            executable: temp.path().join("does-not-exist"),
            result_root: temp.path().join("result"),
            ..DriverOptions::default()
        };
        let mut driver = SweepDriver::new("absent", options);
        let report = driver.run(&three_pattern_spec()).expect("sweep completes");
        assert_eq!(report.summary.failed, 3);
        assert!(report.runs.iter().all(|run| run.error.is_some()));
    }

    fn process_options(root: &Path, executable: PathBuf, timeout: RunTimeout) -> DriverOptions {
        DriverOptions {
            executable,
            result_root: root.join("result"),
            timeout,
            poll_interval: Duration::from_millis(10),
        }
    }

    #[test]
    fn hung_run_times_out_and_the_sweep_continues() {
        let temp = tempfile::tempdir().expect("tmp dir");
        let executable = install_benchmark(temp.path());
        let timeout = RunTimeout::Fixed(Duration::from_millis(500));
        let options = process_options(temp.path(), executable, timeout);
        let mut driver = SweepDriver::new("hung", options);
        let started = Instant::now();
        let report = driver
            .run(&pattern_spec(&["first", "hang", "third"], 1))
            .expect("sweep completes");

        assert!(started.elapsed() < Duration::from_secs(20));
        assert_eq!(report.runs.len(), 3);
        assert_eq!(report.runs[0].state, RunState::Succeeded);
        assert_eq!(report.runs[1].state, RunState::Failed);
        assert!(matches!(report.runs[1].outcome, Some(ExitOutcome::TimedOut { .. })));
        assert_eq!(report.runs[2].state, RunState::Succeeded);
        assert_eq!(report.runs[2].outcome, Some(ExitOutcome::Success));
        assert_eq!(report.summary.failed, 1);
        assert!(!report.summary.cancelled);
    }

    #[test]
    fn default_budget_covers_the_requested_running_time() {
        let temp = tempfile::tempdir().expect("tmp dir");
        let executable = install_benchmark(temp.path());
        // The benchmark sleeps its full two second running time, past the one second grace.
        let timeout = RunTimeout::RunningTimePlus(Duration::from_secs(1));
        let options = process_options(temp.path(), executable, timeout);
        let mut driver = SweepDriver::new("steady", options);
        let report = driver.run(&pattern_spec(&["steady"], 2)).expect("sweep completes");

        assert_eq!(report.runs[0].state, RunState::Succeeded);
        assert_eq!(report.runs[0].outcome, Some(ExitOutcome::Success));
    }

    #[test]
    fn fixed_budget_shorter_than_running_time_times_out() {
        let temp = tempfile::tempdir().expect("tmp dir");
        let executable = install_benchmark(temp.path());
        let timeout = RunTimeout::Fixed(Duration::from_secs(1));
        let options = process_options(temp.path(), executable, timeout);
        let mut driver = SweepDriver::new("steady", options);
        let report = driver.run(&pattern_spec(&["steady"], 2)).expect("sweep completes");

        assert_eq!(report.runs[0].state, RunState::Failed);
        assert!(matches!(report.runs[0].outcome, Some(ExitOutcome::TimedOut { .. })));
    }

    #[test]
    fn cancelling_mid_run_kills_the_benchmark_and_stops_the_sweep() {
        let temp = tempfile::tempdir().expect("tmp dir");
        let executable = install_benchmark(temp.path());
        let mut driver = SweepDriver::new(
            "cancel",
            process_options(temp.path(), executable, RunTimeout::default()),
        );
        let marker = temp.path().join("result").join("cancel").join("started");
        let token = driver.cancel_token();
        let canceller = thread::spawn(move || {
            let deadline = Instant::now() + Duration::from_secs(20);
            while !marker.exists() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }
            token.cancel();
        });

        let started = Instant::now();
        let report = driver
            .run(&pattern_spec(&["first", "announce", "third"], 1))
            .expect("sweep completes");
        canceller.join().expect("canceller thread");

        assert!(started.elapsed() < Duration::from_secs(25));
        assert_eq!(report.runs.len(), 2);
        assert_eq!(report.runs[0].state, RunState::Succeeded);
        assert_eq!(report.runs[1].state, RunState::Failed);
        assert_eq!(report.runs[1].outcome, Some(ExitOutcome::Cancelled));
        assert!(report.summary.cancelled);
        assert_eq!(report.summary.total, 2);
    }
}
