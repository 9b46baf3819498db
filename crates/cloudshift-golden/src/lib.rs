//! Golden corpus infrastructure for the CloudShift transformation engine
//!
//! Each corpus case is a directory holding an input file, a `case.json`
//! describing the request, and the expected output plus a result summary.
//! The runner transforms the input with the bundled catalog and diffs the
//! result against the stored expectations. Set `UPDATE_GOLDEN=1` to rewrite
//! expectations from the current engine output.

pub mod corpus;
pub mod diff;
pub mod runner;
pub mod snapshot;

use std::path::PathBuf;
use thiserror::Error;

pub use corpus::{CorpusManager, GoldenCase};
pub use diff::{DiffEngine, DiffOptions};
pub use runner::{GoldenTestRunner, TestResult};
pub use snapshot::{ResultSummary, Snapshot, SnapshotManager};

/// Golden test error types
#[derive(Debug, Error)]
pub enum GoldenError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] cloudshift_core::Error),

    #[error("Snapshot mismatch: {0}")]
    SnapshotMismatch(String),

    #[error("Corpus error: {0}")]
    CorpusError(String),

    #[error("Test failed: {0}")]
    TestFailed(String),
}

pub type Result<T> = std::result::Result<T, GoldenError>;

/// Configuration for golden tests
#[derive(Debug, Clone)]
pub struct GoldenConfig {
    /// Root directory of the corpus
    pub corpus_dir: PathBuf,

    /// Rewrite expectations that differ
    pub update_snapshots: bool,

    /// Write expectations for cases that have none
    pub create_missing: bool,

    pub diff_options: DiffOptions,

    pub verbose: bool,
}

impl Default for GoldenConfig {
    fn default() -> Self {
        let update_snapshots = env_flag("UPDATE_GOLDEN");

        Self {
            corpus_dir: PathBuf::from("../../golden-corpus"),
            update_snapshots,
            create_missing: update_snapshots,
            diff_options: DiffOptions::default(),
            verbose: false,
        }
    }
}

impl GoldenConfig {
    /// Create config from environment and defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(corpus_dir) = std::env::var("GOLDEN_CORPUS_DIR") {
            config.corpus_dir = PathBuf::from(corpus_dir);
        }
        config.verbose = env_flag("GOLDEN_VERBOSE");
        if std::env::var_os("NO_COLOR").is_some() {
            config.diff_options.colored = false;
        }

        config
    }
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Define a test running one corpus case
#[macro_export]
macro_rules! golden_test {
    ($name:ident, $case:expr) => {
        #[test]
        fn $name() {
            use $crate::{GoldenConfig, GoldenTestRunner};

            let runner = GoldenTestRunner::new(GoldenConfig::from_env()).expect("golden runner");
            if let Err(e) = runner.run_test($case) {
                panic!("Golden test failed: {}: {}", $case, e);
            }
        }
    };
}

/// Define a test running every case whose name or category contains a pattern
#[macro_export]
macro_rules! golden_test_batch {
    ($pattern:expr) => {
        #[test]
        fn golden_tests() {
            use $crate::{GoldenConfig, GoldenTestRunner};

            let runner = GoldenTestRunner::new(GoldenConfig::from_env()).expect("golden runner");
            if let Err(e) = runner.run_batch($pattern) {
                panic!("Golden test batch failed: {}: {}", $pattern, e);
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        let config = GoldenConfig::from_env();
        assert!(!config.corpus_dir.as_os_str().is_empty());
        assert_eq!(config.create_missing, config.update_snapshots);
    }
}
