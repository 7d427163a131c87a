use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::Utc;
use mts_core::errors::{ErrorInfo, SweepError};
use serde::Serialize;
use tracing::{debug, error, info, info_span, warn, Span};

use crate::combos::Combination;
use crate::command::Invocation;
use crate::config::RunConfig;
use crate::coverage::uncovered_fields;
use crate::filter::ConstraintTable;
use crate::ident::build_identifier;
use crate::launch::{CancelToken, ExitOutcome, LaunchLimits, Launcher, ProcessLauncher};
use crate::paths::{OutputPaths, ResultLayout};
use crate::report::{RunRecord, RunState, SweepReport};
use crate::spec::SweepSpec;

/// Wall clock budget for one benchmark run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunTimeout {
    /// Wait for the benchmark however long it takes.
    Disabled,
    /// The same budget for every run, whatever its `running_time`.
    Fixed(Duration),
    /// The run's `running_time` (seconds) plus a grace period for start-up and teardown.
    RunningTimePlus(Duration),
}

impl RunTimeout {
    /// Budget for the run described by `config`; `None` means no timeout.
    ///
    /// A `running_time` that is negative or not finite counts as zero.
    pub fn budget(&self, config: &RunConfig) -> Option<Duration> {
        match *self {
            RunTimeout::Disabled => None,
            RunTimeout::Fixed(budget) => Some(budget),
            RunTimeout::RunningTimePlus(grace) => {
                let running = config
                    .running_time
                    .as_f64()
                    .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
                    .unwrap_or_default();
                Some(running.saturating_add(grace))
            }
        }
    }
}

impl Default for RunTimeout {
    fn default() -> Self {
        let grace = Duration::from_secs(DriverOptions::DEFAULT_TIMEOUT_GRACE_SECS);
        RunTimeout::RunningTimePlus(grace)
    }
}

/// Knobs controlling how a sweep invokes the benchmark.
#[derive(Debug, Clone, PartialEq)]
pub struct DriverOptions {
    /// Path to the benchmark executable.
    pub executable: PathBuf,
    /// Root under which `<experiment>/` result directories are created.
    pub result_root: PathBuf,
    pub timeout: RunTimeout,
    /// Poll period while waiting for the benchmark to exit.
    pub poll_interval: Duration,
}

impl DriverOptions {
    pub const DEFAULT_EXECUTABLE: &'static str = "./build/main";
    pub const DEFAULT_RESULT_ROOT: &'static str = "result";
    pub const DEFAULT_TIMEOUT_GRACE_SECS: u64 = 600;
    pub const DEFAULT_POLL_MS: u64 = 50;
}

impl Default for DriverOptions {
    fn default() -> Self {
        Self {
            executable: PathBuf::from(Self::DEFAULT_EXECUTABLE),
            result_root: PathBuf::from(Self::DEFAULT_RESULT_ROOT),
            timeout: RunTimeout::default(),
            poll_interval: Duration::from_millis(Self::DEFAULT_POLL_MS),
        }
    }
}

/// Everything derived from a combination before the benchmark is launched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreparedRun {
    pub config: RunConfig,
    pub identifier: String,
    pub outputs: OutputPaths,
    pub invocation: Invocation,
}

/// Validates a combination and derives its identifier, paths and command line.
///
/// Pure: the result directory is not created.
pub fn prepare_run(
    combination: &Combination,
    layout: &ResultLayout,
    executable: &Path,
) -> Result<PreparedRun, SweepError> {
    let config = RunConfig::from_combination(combination)?;
    let identifier = build_identifier(&config);
    let outputs = layout.paths_for(&identifier);
    let invocation = Invocation::build(executable, &config, &outputs);
    Ok(PreparedRun {
        config,
        identifier,
        outputs,
        invocation,
    })
}

/// One entry of a dry run.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRun {
    pub index: usize,
    pub params: Combination,
    pub prepared: Result<PreparedRun, SweepError>,
}

/// Lazily derives every run of `spec` without touching the filesystem.
pub fn plan_sweep<'a>(
    spec: &'a SweepSpec,
    layout: &'a ResultLayout,
    executable: &'a Path,
) -> impl Iterator<Item = PlannedRun> + 'a {
    spec.combinations()
        .enumerate()
        .map(move |(index, params)| PlannedRun {
            index,
            prepared: prepare_run(&params, layout, executable),
            params,
        })
}

/// Sequential sweep driver.
///
/// Runs combinations one at a time in generator order. A failing run is
/// recorded and logged; only result directory creation errors abort the sweep.
pub struct SweepDriver<L = ProcessLauncher> {
    layout: ResultLayout,
    options: DriverOptions,
    launcher: L,
    table: ConstraintTable,
    cancel: CancelToken,
    span: Span,
    started: BTreeMap<String, Vec<String>>,
}

impl SweepDriver<ProcessLauncher> {
    pub fn new(experiment: impl Into<String>, options: DriverOptions) -> Self {
        Self::with_launcher(experiment, options, ProcessLauncher)
    }
}

impl<L: Launcher> SweepDriver<L> {
    pub fn with_launcher(
        experiment: impl Into<String>,
        options: DriverOptions,
        launcher: L,
    ) -> Self {
        let experiment = experiment.into();
        let span = info_span!("sweep", experiment = %experiment);
        Self {
            layout: ResultLayout::new(options.result_root.clone(), experiment),
            options,
            launcher,
            table: ConstraintTable::default(),
            cancel: CancelToken::new(),
            span,
            started: BTreeMap::new(),
        }
    }

    /// Replaces the validity constraints used to filter combinations.
    pub fn with_constraints(mut self, table: ConstraintTable) -> Self {
        self.table = table;
        self
    }

    /// Handle that stops the sweep (and kills the running benchmark) when cancelled.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn layout(&self) -> &ResultLayout {
        &self.layout
    }

    pub fn launcher(&self) -> &L {
        &self.launcher
    }

    /// Executes every valid combination of `spec`.
    pub fn run(&mut self, spec: &SweepSpec) -> Result<SweepReport, SweepError> {
        let span = self.span.clone();
        let _entered = span.enter();
        let started_at = Utc::now().to_rfc3339();
        let spec_hash = spec.spec_hash()?;

        for field in spec.unrecognized_fields() {
            warn!(field, "unrecognized specification field is not forwarded");
        }
        for gap in uncovered_fields(spec) {
            warn!(
                field = %gap.field,
                policy = %gap.policy,
                forwarded = gap.forwarded,
                "field varies but is not part of the run identifier"
            );
        }
        info!(product = spec.product_size(), "starting sweep");

        let mut combinations = spec.combinations_with(self.table.clone());
        let mut runs = Vec::new();
        for (index, combination) in combinations.by_ref().enumerate() {
            if self.cancel.is_cancelled() {
                warn!("sweep cancelled; remaining combinations are not started");
                break;
            }
            runs.push(self.run_combination(index, combination)?);
        }

        let summary =
            SweepReport::summarize(&runs, combinations.pruned(), self.cancel.is_cancelled());
        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            pruned = summary.pruned,
            "sweep finished"
        );
        Ok(SweepReport {
            experiment: self.layout.experiment().to_string(),
            spec_hash,
            started_at,
            finished_at: Utc::now().to_rfc3339(),
            runs,
            summary,
        })
    }

    /// Runs a single combination and returns its terminal record.
    ///
    /// Only a failure to create the result directory is returned as `Err`.
    pub fn run_combination(
        &mut self,
        index: usize,
        combination: Combination,
    ) -> Result<RunRecord, SweepError> {
        let clock = Instant::now();
        debug!(index, state = ?RunState::Pending, "combination queued");

        let prepared = match prepare_run(&combination, &self.layout, &self.options.executable) {
            Ok(prepared) => prepared,
            Err(err) => {
                error!(index, combination = %combination, error = %err, "invalid combination");
                return Ok(finish(
                    index,
                    combination,
                    None,
                    RunState::Failed,
                    None,
                    Some(err),
                    clock,
                ));
            }
        };

        if let Some(previous) = self.started.get(&prepared.identifier) {
            if *previous == prepared.invocation.args {
                info!(
                    index,
                    identifier = %prepared.identifier,
                    "identical invocation already executed; skipping"
                );
                return Ok(finish(
                    index,
                    combination,
                    Some(prepared),
                    RunState::Skipped,
                    None,
                    None,
                    clock,
                ));
            }
            let err = SweepError::Config(
                ErrorInfo::new(
                    "identifier_collision",
                    "identifier already used by a different invocation",
                )
                .with_context("identifier", prepared.identifier.clone())
                .with_hint("a varying field is missing from the identifier"),
            );
            error!(
                index,
                command = %prepared.invocation.command_line(),
                error = %err,
                "refusing to overwrite artefacts of another run"
            );
            return Ok(finish(
                index,
                combination,
                Some(prepared),
                RunState::Failed,
                None,
                Some(err),
                clock,
            ));
        }

        self.layout.ensure_dir()?;
        self.started
            .insert(prepared.identifier.clone(), prepared.invocation.args.clone());

        let limits = self.limits(&prepared.config);
        info!(
            index,
            identifier = %prepared.identifier,
            command = %prepared.invocation.command_line(),
            timeout_secs = limits.timeout.map(|budget| budget.as_secs_f64()),
            "running benchmark"
        );
        debug!(index, state = ?RunState::Running, "benchmark started");
        let (state, outcome, failure) = match self.launcher.launch(&prepared.invocation, &limits) {
            Ok(ExitOutcome::Success) => (RunState::Succeeded, Some(ExitOutcome::Success), None),
            Ok(outcome) => {
                error!(
                    index,
                    command = %prepared.invocation.command_line(),
                    outcome = ?outcome,
                    "benchmark run failed"
                );
                (RunState::Failed, Some(outcome), None)
            }
            Err(err) => {
                error!(
                    index,
                    command = %prepared.invocation.command_line(),
                    error = %err,
                    "benchmark could not be run"
                );
                (RunState::Failed, None, Some(err))
            }
        };
        Ok(finish(
            index,
            combination,
            Some(prepared),
            state,
            outcome,
            failure,
            clock,
        ))
    }

    fn limits(&self, config: &RunConfig) -> LaunchLimits {
        LaunchLimits {
            timeout: self.options.timeout.budget(config),
            poll_interval: self.options.poll_interval,
            cancel: self.cancel.clone(),
        }
    }
}

fn finish(
    index: usize,
    params: Combination,
    prepared: Option<PreparedRun>,
    state: RunState,
    outcome: Option<ExitOutcome>,
    error: Option<SweepError>,
    clock: Instant,
) -> RunRecord {
    debug_assert!(state.is_terminal());
    let (identifier, outputs, command) = match prepared {
        Some(prepared) => (
            Some(prepared.identifier),
            Some(prepared.outputs),
            Some(prepared.invocation.command_line()),
        ),
        None => (None, None, None),
    };
    RunRecord {
        index,
        params,
        identifier,
        outputs,
        command,
        state,
        outcome,
        error,
        elapsed_ms: clock.elapsed().as_millis() as u64,
    }
}
