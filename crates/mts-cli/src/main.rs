use std::process::ExitCode;

use clap::{Parser, Subcommand};
use commands::{
    check::{self, CheckArgs},
    plan::{self, PlanArgs},
    run::{self, RunArgs},
};
use tracing::error;
use tracing_subscriber::{fmt, EnvFilter};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "mts-sweep", about = "Memory tiering benchmark parameter sweep")]
struct Cli {
    /// Log at debug level (pruned combinations, run state transitions).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every valid combination of an experiment against the benchmark.
    Run(RunArgs),
    /// Print the identifier and command line of every run without executing.
    Plan(PlanArgs),
    /// Report varying fields that do not reach the run identifier.
    Check(CheckArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if cli.verbose { "debug" } else { "info" })
    });
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Command::Run(args) => run::run(&args),
        Command::Plan(args) => plan::run(&args),
        Command::Check(args) => check::run(&args),
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            error!(error = %err, "sweep aborted");
            ExitCode::FAILURE
        }
    }
}
