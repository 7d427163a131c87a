use std::path::PathBuf;

use clap::Args;
use mts_core::SweepError;
use mts_exp::{load_spec, spec_path, SweepSpec};

pub mod check;
pub mod plan;
pub mod run;

/// Locates the specification of one experiment.
#[derive(Args, Debug)]
pub struct SpecArgs {
    /// Experiment name; also names the result subdirectory.
    pub experiment: String,
    /// Directory holding `<experiment>.yaml`.
    #[arg(long, default_value = "experiment")]
    pub experiment_dir: PathBuf,
    /// Explicit specification file, overriding `--experiment-dir`.
    #[arg(long)]
    pub spec: Option<PathBuf>,
}

impl SpecArgs {
    pub fn path(&self) -> PathBuf {
        self.spec
            .clone()
            .unwrap_or_else(|| spec_path(&self.experiment_dir, &self.experiment))
    }

    pub fn load(&self) -> Result<SweepSpec, SweepError> {
        load_spec(self.path())
    }
}
