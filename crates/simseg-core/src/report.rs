//! Run manifest written when a batch run ends.
//!
//! Result files are overwritten in place, so a file is only known to be
//! complete when a report lists it under `completed`. Aborted runs leave
//! `finished_at` unset.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{SearchConfig, SimError, Symbol, TradingDate};

/// Directory under the output root holding run reports.
pub const RUNS_DIR: &str = "_runs";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedQuery {
    pub symbol: Symbol,
    pub step: usize,
    pub as_of: TradingDate,
    pub path: PathBuf,
    pub results: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedQuery {
    pub symbol: Symbol,
    pub step: usize,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub finished_at: Option<OffsetDateTime>,
    pub window_len: usize,
    pub steps: usize,
    pub workers: usize,
    pub completed: Vec<CompletedQuery>,
    /// Queries with no visible anchor segment or no neighbour at that step.
    pub skipped_empty: usize,
    pub failed: Vec<FailedQuery>,
}

impl RunReport {
    pub fn start(config: &SearchConfig, workers: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: OffsetDateTime::now_utc(),
            finished_at: None,
            window_len: config.window_len,
            steps: config.steps,
            workers,
            completed: Vec::new(),
            skipped_empty: 0,
            failed: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(OffsetDateTime::now_utc());
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    pub fn path_in(&self, output_root: &Path) -> PathBuf {
        output_root
            .join(RUNS_DIR)
            .join(format!("{}.json", self.run_id))
    }

    pub fn write(&self, output_root: &Path) -> Result<PathBuf, SimError> {
        let path = self.path_in(output_root);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, serde_json::to_vec_pretty(self)?)?;
        Ok(path)
    }

    pub fn read(path: &Path) -> Result<Self, SimError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}
