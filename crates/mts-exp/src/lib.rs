//! Parameter sweep orchestration for the memory tiering benchmark.

mod canonical;
mod combos;
mod command;
mod config;
mod coverage;
mod driver;
mod filter;
mod ident;
mod launch;
mod paths;
mod report;
mod spec;

pub use canonical::{from_json_slice, stable_hash_string, to_canonical_json_bytes};
pub use combos::{Combination, Combinations};
pub use command::Invocation;
pub use config::RunConfig;
pub use coverage::{uncovered_fields, UncoveredField};
pub use driver::{
    plan_sweep, prepare_run, DriverOptions, PlannedRun, PreparedRun, RunTimeout, SweepDriver,
};
pub use filter::{ConstraintRule, ConstraintTable, Predicate};
pub use ident::{build_identifier, identifier_fields, COMMON_IDENTIFIER_FIELDS, SEPARATOR};
pub use launch::{CancelToken, ExitOutcome, LaunchLimits, Launcher, ProcessLauncher};
pub use paths::{OutputPaths, ResultLayout};
pub use report::{RunRecord, RunState, SweepReport, SweepSummary};
pub use spec::{load_spec, spec_path, SpecParam, SweepSpec};
