//! Batch search configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dispatch::DEFAULT_WORKERS;
use crate::search::{GLOBAL_TOP_K, PER_INSTRUMENT_K};
use crate::snapshot::DEFAULT_STEPS;
use crate::{SimError, Symbol, ValidationError};

/// Default segment length.
pub const DEFAULT_WINDOW_LEN: usize = 5;
/// Default root directory for result files.
pub const DEFAULT_OUTPUT_ROOT: &str = "sim_seg";

/// What a batch run does after a query fails with `WorkerFailure`.
///
/// Contract violations always skip to the next query and fatal errors always
/// end the run, whatever the policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the run and return the worker failure.
    #[default]
    Abort,
    /// Record the worker failure and continue with the next query.
    SkipQuery,
}

/// Parameters of a batch similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    pub window_len: usize,
    pub steps: usize,
    pub workers: usize,
    pub per_instrument_k: usize,
    pub top_k: usize,
    pub output_root: PathBuf,
    pub on_query_failure: FailurePolicy,
    /// Skip instruments whose series cannot be normalized instead of aborting.
    pub lenient: bool,
    /// Query instruments; empty means every loaded instrument.
    pub targets: Vec<Symbol>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            window_len: DEFAULT_WINDOW_LEN,
            steps: DEFAULT_STEPS,
            workers: DEFAULT_WORKERS,
            per_instrument_k: PER_INSTRUMENT_K,
            top_k: GLOBAL_TOP_K,
            output_root: PathBuf::from(DEFAULT_OUTPUT_ROOT),
            on_query_failure: FailurePolicy::Abort,
            lenient: false,
            targets: Vec::new(),
        }
    }
}

impl SearchConfig {
    /// Load a JSON config file; absent fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, SimError> {
        let raw = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let positive = [
            ("window_len", self.window_len),
            ("steps", self.steps),
            ("workers", self.workers),
            ("per_instrument_k", self.per_instrument_k),
            ("top_k", self.top_k),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ValidationError::ZeroConfigValue { field });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_batch_settings() {
        let config = SearchConfig::default();
        assert_eq!(config.window_len, 5);
        assert_eq!(config.steps, 30);
        assert_eq!(config.workers, 20);
        assert_eq!(config.per_instrument_k, 3);
        assert_eq!(config.top_k, 10);
        assert_eq!(config.output_root, PathBuf::from("sim_seg"));
        assert_eq!(config.on_query_failure, FailurePolicy::Abort);
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: SearchConfig = serde_json::from_str(
            r#"{"window_len": 10, "on_query_failure": "skip_query", "targets": ["005930"]}"#,
        )
        .expect("parse");
        assert_eq!(config.window_len, 10);
        assert_eq!(config.steps, 30);
        assert_eq!(config.on_query_failure, FailurePolicy::SkipQuery);
        assert_eq!(config.targets[0].as_str(), "005930");
    }

    #[test]
    fn rejects_zero_workers() {
        let config = SearchConfig {
            workers: 0,
            ..SearchConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::ZeroConfigValue { field: "workers" })
        ));
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("search.json");
        fs::write(&path, r#"{"steps": 2, "lenient": true}"#).expect("write");

        let config = SearchConfig::from_json_file(&path).expect("load");
        assert_eq!(config.steps, 2);
        assert!(config.lenient);

        fs::write(&path, r#"{"steps": 0}"#).expect("write");
        assert!(matches!(
            SearchConfig::from_json_file(&path),
            Err(SimError::Validation(ValidationError::ZeroConfigValue { field: "steps" }))
        ));
    }
}
