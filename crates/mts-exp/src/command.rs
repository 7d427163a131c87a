use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Serialize;

use crate::config::RunConfig;
use crate::paths::OutputPaths;

/// Program and argument vector for one benchmark invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    /// Maps a run configuration onto the benchmark's command line.
    pub fn build(program: &Path, config: &RunConfig, outputs: &OutputPaths) -> Self {
        let mut args = vec![
            "-p".to_string(),
            config.pattern.clone(),
            "-c".to_string(),
            config.client_tier_sizes.clone(),
            "-b".to_string(),
            config.buffer_size.to_string(),
            "--running-time".to_string(),
            config.running_time.to_string(),
            "-s".to_string(),
            config.server_mem_sizes.clone(),
            "--policy-type".to_string(),
            config.policy_type.as_str().to_string(),
            "-t".to_string(),
            config.num_tiers.to_string(),
            "--scan-interval".to_string(),
            config.scan_interval.to_string(),
            "--sample-rate".to_string(),
            config.sample_rate.to_string(),
            "--output".to_string(),
            outputs.cdf.to_string_lossy().into_owned(),
            "--periodic-output".to_string(),
            outputs.periodic.to_string_lossy().into_owned(),
        ];
        for (field, value) in config.policy_values() {
            args.push(field.flag.to_string());
            args.push(value.to_string());
        }
        Self {
            program: program.to_path_buf(),
            args,
        }
    }

    /// Space separated rendering for logs.
    pub fn command_line(&self) -> String {
        let mut line = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    pub(crate) fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args).stdin(Stdio::null());
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combos::Combination;
    use mts_core::ParamValue;

    fn frequency_config() -> RunConfig {
        let entries: Vec<(String, ParamValue)> = vec![
            ("pattern".into(), "uniform".into()),
            ("client_tier_sizes".into(), "10 20".into()),
            ("server_mem_sizes".into(), "100,200".into()),
            ("buffer_size".into(), 4096.into()),
            ("running_time".into(), 30.into()),
            ("policy_type".into(), "frequency".into()),
            ("num_tiers".into(), 2.into()),
            ("scan_interval".into(), 1.into()),
            ("sample_rate".into(), 10.into()),
            ("hot_count".into(), 8.into()),
            ("cold_count".into(), 2.into()),
            ("hot_threshold".into(), 5.into()),
        ];
        RunConfig::from_combination(&Combination::new(entries)).expect("config")
    }

    #[test]
    fn frequency_flags_follow_common_flags() {
        let outputs = OutputPaths {
            cdf: PathBuf::from("result/e/cdf_x.csv"),
            periodic: PathBuf::from("result/e/periodic_x.csv"),
        };
        let invocation =
            Invocation::build(Path::new("./build/main"), &frequency_config(), &outputs);
        assert_eq!(
            invocation.args,
            [
                "-p", "uniform", "-c", "10 20", "-b", "4096", "--running-time", "30", "-s",
                "100,200", "--policy-type", "frequency", "-t", "2", "--scan-interval", "1",
                "--sample-rate", "10", "--output", "result/e/cdf_x.csv", "--periodic-output",
                "result/e/periodic_x.csv", "--hot-count", "8", "--cold-count", "2",
            ]
        );
        assert!(invocation
            .command_line()
            .starts_with("./build/main -p uniform -c 10 20 -b 4096"));
    }
}
