use std::error::Error;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::Args;
use mts_exp::{CancelToken, DriverOptions, RunTimeout, SweepDriver};
use tracing::{info, warn};

use super::SpecArgs;

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub spec: SpecArgs,
    /// Benchmark executable invoked once per combination.
    #[arg(long, default_value = DriverOptions::DEFAULT_EXECUTABLE)]
    pub executable: PathBuf,
    /// Root directory for `<experiment>/` result folders.
    #[arg(long, default_value = DriverOptions::DEFAULT_RESULT_ROOT)]
    pub result_root: PathBuf,
    /// Fixed per-run timeout in seconds, replacing the `running_time` based budget.
    /// 0 waits indefinitely.
    #[arg(long)]
    pub timeout_secs: Option<u64>,
    /// Seconds a run may take beyond its own `running_time` before it is killed.
    #[arg(long, default_value_t = DriverOptions::DEFAULT_TIMEOUT_GRACE_SECS)]
    pub timeout_grace_secs: u64,
    /// Child process poll period in milliseconds.
    #[arg(long, default_value_t = DriverOptions::DEFAULT_POLL_MS)]
    pub poll_ms: u64,
    /// Write the sweep report as canonical JSON to this path.
    #[arg(long)]
    pub report: Option<PathBuf>,
    /// Exit non-zero when any run failed.
    #[arg(long)]
    pub fail_on_error: bool,
}

impl RunArgs {
    fn options(&self) -> DriverOptions {
        DriverOptions {
            executable: self.executable.clone(),
            result_root: self.result_root.clone(),
            timeout: match self.timeout_secs {
                Some(0) => RunTimeout::Disabled,
                Some(secs) => RunTimeout::Fixed(Duration::from_secs(secs)),
                None => RunTimeout::RunningTimePlus(Duration::from_secs(self.timeout_grace_secs)),
            },
            poll_interval: Duration::from_millis(self.poll_ms.max(1)),
        }
    }
}

pub fn run(args: &RunArgs) -> Result<ExitCode, Box<dyn Error>> {
    let spec = args.spec.load()?;
    let mut driver = SweepDriver::new(args.spec.experiment.clone(), args.options());
    cancel_on_interrupt(driver.cancel_token())?;
    let report = driver.run(&spec)?;

    for failed in report.failures() {
        warn!(
            index = failed.index,
            identifier = failed.identifier.as_deref().unwrap_or("-"),
            "run failed"
        );
    }
    if let Some(path) = &args.report {
        let written = report.persist(path)?;
        info!(path = %written.display(), "sweep report written");
    }

    if args.fail_on_error && report.has_failures() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

/// Cancels the sweep on the first Ctrl-C: the running benchmark is killed and no
/// further combinations start. The report is still written.
fn cancel_on_interrupt(token: CancelToken) -> io::Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    // Registered before returning so an interrupt during the first run is not missed.
    #[cfg(unix)]
    let mut interrupt = {
        let _guard = runtime.enter();
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?
    };
    thread::Builder::new()
        .name("mts-interrupt".into())
        .spawn(move || {
            #[cfg(unix)]
            let received = runtime.block_on(interrupt.recv()).is_some();
            #[cfg(not(unix))]
            let received = runtime.block_on(tokio::signal::ctrl_c()).is_ok();
            if received {
                warn!("interrupt received; stopping the sweep");
                token.cancel();
            }
        })?;
    Ok(())
}
