use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Args;
use mts_exp::{plan_sweep, to_canonical_json_bytes, DriverOptions, ResultLayout};
use serde_json::json;
use tracing::warn;

use super::SpecArgs;

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub spec: SpecArgs,
    #[arg(long, default_value = DriverOptions::DEFAULT_EXECUTABLE)]
    pub executable: PathBuf,
    #[arg(long, default_value = DriverOptions::DEFAULT_RESULT_ROOT)]
    pub result_root: PathBuf,
    /// Emit one canonical JSON object per line instead of text.
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: &PlanArgs) -> Result<ExitCode, Box<dyn Error>> {
    let spec = args.spec.load()?;
    let layout = ResultLayout::new(args.result_root.clone(), args.spec.experiment.clone());
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut invalid = 0usize;

    for planned in plan_sweep(&spec, &layout, &args.executable) {
        match planned.prepared {
            Ok(prepared) if args.json => {
                let line = to_canonical_json_bytes(&json!({
                    "index": planned.index,
                    "identifier": prepared.identifier,
                    "argv": prepared.invocation.args,
                    "outputs": prepared.outputs,
                }))?;
                out.write_all(&line)?;
                writeln!(out)?;
            }
            Ok(prepared) => {
                writeln!(
                    out,
                    "{}\t{}",
                    prepared.identifier,
                    prepared.invocation.command_line()
                )?;
            }
            Err(err) => {
                invalid += 1;
                warn!(
                    index = planned.index,
                    combination = %planned.params,
                    error = %err,
                    "combination would fail"
                );
            }
        }
    }
    if invalid > 0 {
        warn!(invalid, "some combinations fail validation");
    }
    Ok(ExitCode::SUCCESS)
}
