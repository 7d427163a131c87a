use std::fs;
use std::path::{Path, PathBuf};

use mts_core::errors::{ErrorInfo, SweepError};
use mts_core::schema::{CDF_PREFIX, OUTPUT_EXTENSION, PERIODIC_PREFIX};
use serde::Serialize;

/// The two artefacts written by one benchmark run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputPaths {
    pub cdf: PathBuf,
    pub periodic: PathBuf,
}

/// Result directory layout for one experiment: `<root>/<experiment>/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultLayout {
    root: PathBuf,
    experiment: String,
}

impl ResultLayout {
    pub fn new(root: impl Into<PathBuf>, experiment: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            experiment: experiment.into(),
        }
    }

    pub fn experiment(&self) -> &str {
        &self.experiment
    }

    /// Directory holding every artefact of the experiment.
    pub fn experiment_dir(&self) -> PathBuf {
        self.root.join(&self.experiment)
    }

    /// Creates the experiment directory and its parents. Existing directories are not an error.
    pub fn ensure_dir(&self) -> Result<PathBuf, SweepError> {
        let dir = self.experiment_dir();
        fs::create_dir_all(&dir).map_err(|err| {
            SweepError::Io(
                ErrorInfo::new("result_dir", "failed to create result directory")
                    .with_context("path", dir.display().to_string())
                    .with_hint(err.to_string()),
            )
        })?;
        Ok(dir)
    }

    /// Output paths for `identifier`; does not touch the filesystem.
    pub fn paths_for(&self, identifier: &str) -> OutputPaths {
        let dir = self.experiment_dir();
        OutputPaths {
            cdf: artefact(&dir, CDF_PREFIX, identifier),
            periodic: artefact(&dir, PERIODIC_PREFIX, identifier),
        }
    }

    /// Ensures the directory exists and returns the output paths for `identifier`.
    pub fn prepare(&self, identifier: &str) -> Result<OutputPaths, SweepError> {
        self.ensure_dir()?;
        Ok(self.paths_for(identifier))
    }
}

fn artefact(dir: &Path, prefix: &str, identifier: &str) -> PathBuf {
    dir.join(format!("{prefix}_{identifier}.{OUTPUT_EXTENSION}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_result_layout() {
        let layout = ResultLayout::new("result", "tiers");
        let paths = layout.paths_for("uniform_10_100_buf4096");
        assert_eq!(
            paths.cdf,
            PathBuf::from("result/tiers/cdf_uniform_10_100_buf4096.csv")
        );
        assert_eq!(
            paths.periodic,
            PathBuf::from("result/tiers/periodic_uniform_10_100_buf4096.csv")
        );
    }
}
