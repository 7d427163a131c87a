use std::process::Child;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use mts_core::errors::{ErrorInfo, SweepError};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::command::Invocation;

/// Shared flag used to stop a sweep from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that is not yet cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation; every clone observes it.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether [`CancelToken::cancel`] has been called on any clone.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Bounds applied to a single invocation.
#[derive(Debug, Clone)]
pub struct LaunchLimits {
    /// Wall clock budget; `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// How often the child is polled for exit, timeout and cancellation.
    pub poll_interval: Duration,
    pub cancel: CancelToken,
}

impl Default for LaunchLimits {
    fn default() -> Self {
        Self {
            timeout: None,
            poll_interval: Duration::from_millis(50),
            cancel: CancelToken::new(),
        }
    }
}

/// How a launched process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ExitOutcome {
    Success,
    /// Non-zero exit; `code` is `None` when the process was killed by a signal.
    Failure { code: Option<i32> },
    TimedOut { after_ms: u64 },
    Cancelled,
}

impl ExitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExitOutcome::Success)
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ExitOutcome::Success => Some(0),
            ExitOutcome::Failure { code } => *code,
            ExitOutcome::TimedOut { .. } | ExitOutcome::Cancelled => None,
        }
    }
}

/// Runs a benchmark invocation to completion.
///
/// Errors are reserved for failures to start or observe the process; a
/// process that ran and failed is reported through [`ExitOutcome`].
pub trait Launcher {
    fn launch(&self, invocation: &Invocation, limits: &LaunchLimits)
        -> Result<ExitOutcome, SweepError>;
}

/// Launcher spawning a real child process with inherited stdout/stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessLauncher;

impl Launcher for ProcessLauncher {
    fn launch(
        &self,
        invocation: &Invocation,
        limits: &LaunchLimits,
    ) -> Result<ExitOutcome, SweepError> {
        let child = invocation.to_command().spawn().map_err(|err| {
            SweepError::Launch(
                ErrorInfo::new("spawn_failed", "failed to start benchmark executable")
                    .with_context("program", invocation.program.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
        supervise(child, invocation, limits)
    }
}

fn supervise(
    mut child: Child,
    invocation: &Invocation,
    limits: &LaunchLimits,
) -> Result<ExitOutcome, SweepError> {
    let started = Instant::now();
    loop {
        let polled = child.try_wait().map_err(|err| wait_error(invocation, err))?;
        if let Some(status) = polled {
            return Ok(if status.success() {
                ExitOutcome::Success
            } else {
                ExitOutcome::Failure {
                    code: status.code(),
                }
            });
        }
        if limits.cancel.is_cancelled() {
            terminate(&mut child, invocation);
            return Ok(ExitOutcome::Cancelled);
        }
        let elapsed = started.elapsed();
        if let Some(timeout) = limits.timeout {
            if elapsed >= timeout {
                terminate(&mut child, invocation);
                return Ok(ExitOutcome::TimedOut {
                    after_ms: elapsed.as_millis() as u64,
                });
            }
        }
        thread::sleep(limits.poll_interval);
    }
}

fn terminate(child: &mut Child, invocation: &Invocation) {
    if let Err(err) = child.kill() {
        warn!(
            program = %invocation.program.display(),
            error = %err,
            "failed to kill benchmark process"
        );
    }
    // Reap so the child does not linger as a zombie.
    if let Err(err) = child.wait() {
        warn!(
            program = %invocation.program.display(),
            error = %err,
            "failed to reap benchmark process"
        );
    }
}

fn wait_error(invocation: &Invocation, err: std::io::Error) -> SweepError {
    SweepError::Launch(
        ErrorInfo::new("wait_failed", "failed to observe benchmark process")
            .with_context("program", invocation.program.display().to_string())
            .with_hint(err.to_string()),
    )
}
