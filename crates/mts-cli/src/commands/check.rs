use std::error::Error;
use std::process::ExitCode;

use clap::Args;
use mts_exp::uncovered_fields;
use tracing::info;

use super::SpecArgs;

#[derive(Args, Debug)]
pub struct CheckArgs {
    #[command(flatten)]
    pub spec: SpecArgs,
}

pub fn run(args: &CheckArgs) -> Result<ExitCode, Box<dyn Error>> {
    let spec = args.spec.load()?;
    for field in spec.unrecognized_fields() {
        println!("unrecognized\t{field}");
    }
    let gaps = uncovered_fields(&spec);
    for gap in &gaps {
        let effect = if gap.forwarded { "collides" } else { "duplicates" };
        println!(
            "uncovered\t{}\t{}\t{} values\t{effect}",
            gap.policy, gap.field, gap.distinct_values
        );
    }
    if gaps.is_empty() {
        info!(fields = spec.len(), "every varying field reaches the identifier");
        return Ok(ExitCode::SUCCESS);
    }
    Ok(ExitCode::FAILURE)
}
