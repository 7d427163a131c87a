use std::fs;
use std::path::{Path, PathBuf};

use mts_core::errors::{ErrorInfo, SweepError};
use serde::Serialize;

use crate::canonical::to_canonical_json_bytes;
use crate::combos::Combination;
use crate::launch::ExitOutcome;
use crate::paths::OutputPaths;

/// Lifecycle of one combination within a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RunState {
    Pending,
    Running,
    Succeeded,
    Failed,
    /// Identical invocation already executed under the same identifier.
    Skipped,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Succeeded | RunState::Failed | RunState::Skipped)
    }
}

/// Terminal record of one combination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRecord {
    /// Position in generator order (after filtering).
    pub index: usize,
    pub params: Combination,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<OutputPaths>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    pub state: RunState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ExitOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<SweepError>,
    pub elapsed_ms: u64,
}

impl RunRecord {
    pub fn succeeded(&self) -> bool {
        self.state == RunState::Succeeded
    }
}

/// Aggregate counters for a sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Combinations discarded by the validity filter.
    pub pruned: usize,
    pub cancelled: bool,
}

/// Structured outcome of a sweep invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SweepReport {
    pub experiment: String,
    pub spec_hash: String,
    pub started_at: String,
    pub finished_at: String,
    pub runs: Vec<RunRecord>,
    pub summary: SweepSummary,
}

impl SweepReport {
    pub(crate) fn summarize(runs: &[RunRecord], pruned: usize, cancelled: bool) -> SweepSummary {
        let count = |state: RunState| runs.iter().filter(|run| run.state == state).count();
        SweepSummary {
            total: runs.len(),
            succeeded: count(RunState::Succeeded),
            failed: count(RunState::Failed),
            skipped: count(RunState::Skipped),
            pruned,
            cancelled,
        }
    }

    pub fn has_failures(&self) -> bool {
        self.summary.failed > 0
    }

    /// Records that ended in [`RunState::Failed`].
    pub fn failures(&self) -> impl Iterator<Item = &RunRecord> {
        self.runs.iter().filter(|run| run.state == RunState::Failed)
    }

    /// Writes the report as canonical JSON, creating parent directories.
    pub fn persist(&self, path: &Path) -> Result<PathBuf, SweepError> {
        let io_error = |code: &str, err: std::io::Error| {
            SweepError::Io(
                ErrorInfo::new(code, "failed to persist sweep report")
                    .with_context("path", path.display().to_string())
                    .with_hint(err.to_string()),
            )
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| io_error("report_dir", err))?;
        }
        let bytes = to_canonical_json_bytes(self)?;
        fs::write(path, bytes).map_err(|err| io_error("report_write", err))?;
        Ok(path.to_path_buf())
    }
}
