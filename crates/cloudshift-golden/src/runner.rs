//! Golden test runner

use crate::{
    corpus::{CorpusManager, GoldenCase},
    diff::DiffEngine,
    snapshot::{ResultSummary, SnapshotManager},
    GoldenConfig, GoldenError, Result,
};
use cloudshift_core::{Engine, PatternCatalog, TransformRequest};
use colored::*;
use regex::Regex;
use std::time::Instant;

/// Result of running one case
#[derive(Debug)]
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub error: Option<String>,
    pub diff: Option<String>,
    pub duration_ms: u64,
    /// Whether expectations were written
    pub updated: bool,
}

impl TestResult {
    pub fn print(&self, verbose: bool) {
        let status = if self.passed {
            "PASS".green().bold()
        } else {
            "FAIL".red().bold()
        };

        println!("{} {} ({}ms)", status, self.name, self.duration_ms);

        if let Some(ref error) = self.error {
            println!("  {}: {}", "Error".red(), error);
        }
        if verbose || !self.passed {
            if let Some(ref diff) = self.diff {
                println!("{}", diff);
            }
        }
        if self.updated {
            println!("  {}", "Snapshot updated".yellow());
        }
    }
}

/// What one execution produced before it is turned into a [`TestResult`]
struct Execution {
    passed: bool,
    error: Option<String>,
    diff: Option<String>,
    updated: bool,
}

impl Execution {
    fn pass(updated: bool) -> Self {
        Self {
            passed: true,
            error: None,
            diff: None,
            updated,
        }
    }

    fn fail(error: String, diff: Option<String>) -> Self {
        Self {
            passed: false,
            error: Some(error),
            diff,
            updated: false,
        }
    }
}

/// Runs corpus cases against the bundled catalog
pub struct GoldenTestRunner {
    config: GoldenConfig,
    corpus_manager: CorpusManager,
    engine: Engine,
}

impl GoldenTestRunner {
    pub fn new(config: GoldenConfig) -> Result<Self> {
        let catalog = PatternCatalog::from_sources(cloudshift_providers::builtin_catalog_sources())?;
        Ok(Self::with_engine(config, Engine::new(catalog)))
    }

    /// Runner over a caller-supplied engine
    pub fn with_engine(config: GoldenConfig, engine: Engine) -> Self {
        let corpus_manager = CorpusManager::new(&config.corpus_dir);
        Self {
            config,
            corpus_manager,
            engine,
        }
    }

    /// Run one case by `category/name`; an error means the case failed
    pub fn run_test(&self, id: &str) -> Result<TestResult> {
        let case = self.corpus_manager.find(id)?;
        let result = self.run_case(&case);

        if self.config.verbose {
            result.print(true);
        }

        if result.passed {
            Ok(result)
        } else {
            Err(GoldenError::TestFailed(format!(
                "Case '{}' failed: {}{}",
                id,
                result.error.as_deref().unwrap_or("unknown error"),
                result
                    .diff
                    .as_deref()
                    .map(|d| format!("\n{}", d))
                    .unwrap_or_default()
            )))
        }
    }

    /// Run every enabled case whose id contains `pattern` (`*` for all)
    pub fn run_batch(&self, pattern: &str) -> Result<Vec<TestResult>> {
        let cases = self
            .corpus_manager
            .filter_enabled(self.corpus_manager.discover_tests()?);
        let selected: Vec<_> = cases
            .into_iter()
            .filter(|c| pattern == "*" || c.id().contains(pattern))
            .collect();

        if selected.is_empty() {
            return Err(GoldenError::CorpusError(format!(
                "No cases found matching pattern '{}'",
                pattern
            )));
        }

        println!("Running {} cases...\n", selected.len());

        let results: Vec<TestResult> = selected.iter().map(|case| self.run_case(case)).collect();
        for result in &results {
            result.print(self.config.verbose);
        }

        let failed = results.iter().filter(|r| !r.passed).count();
        println!("\n{}", "=== Golden Summary ===".bold());
        println!(
            "{}: {} passed, {} failed",
            "Results".bold(),
            (results.len() - failed).to_string().green(),
            failed.to_string().red()
        );

        if failed > 0 {
            Err(GoldenError::TestFailed(format!("{} case(s) failed", failed)))
        } else {
            Ok(results)
        }
    }

    fn run_case(&self, case: &GoldenCase) -> TestResult {
        let start = Instant::now();
        let execution = if case.metadata.enabled {
            self.execute(case)
                .unwrap_or_else(|e| Execution::fail(e.to_string(), None))
        } else {
            Execution::pass(false)
        };

        TestResult {
            name: case.id(),
            passed: execution.passed,
            error: execution.error,
            diff: execution.diff,
            duration_ms: start.elapsed().as_millis() as u64,
            updated: execution.updated,
        }
    }

    fn execute(&self, case: &GoldenCase) -> Result<Execution> {
        let language = case.language()?;
        let request = TransformRequest::new(
            case.read_input()?,
            language,
            case.input.source.as_str(),
            case.input.target.as_str(),
        );

        let result = match self.engine.transform_blocking(request) {
            Ok(result) => result,
            Err(e) => return expected_failure(case, &e.to_string()),
        };
        if !case.expectations.should_succeed {
            return Ok(Execution::fail(
                "transform succeeded but the case expects an error".to_string(),
                None,
            ));
        }
        if let Some(outcome) = case.expectations.outcome {
            if outcome != result.outcome {
                return Ok(Execution::fail(
                    format!("expected outcome {}, got {}", outcome, result.outcome),
                    None,
                ));
            }
        }

        let snapshots = SnapshotManager::new(&case.dir, language);
        if !snapshots.exists() {
            if self.config.create_missing || self.config.update_snapshots {
                snapshots.create(&result, Some(case.metadata.description.clone()))?;
                return Ok(Execution::pass(true));
            }
            return Err(GoldenError::SnapshotMismatch(format!(
                "Case '{}' has no expectations. Run with UPDATE_GOLDEN=1 to create them.",
                case.id()
            )));
        }

        let snapshot = snapshots.load()?;
        let mut diff_engine = DiffEngine::new(self.config.diff_options.clone());
        for pattern in &case.expectations.volatile_lines {
            diff_engine.add_volatile_pattern(pattern)?;
        }

        let output_diff = diff_engine.compare(&snapshot.output, &result.output);
        let summary = ResultSummary::from(&result);
        let summary_diff = diff_engine.compare(
            &serde_json::to_string_pretty(&snapshot.summary)?,
            &serde_json::to_string_pretty(&summary)?,
        );

        if output_diff.matches && summary_diff.matches {
            return Ok(Execution::pass(false));
        }

        let diff = [output_diff, summary_diff]
            .into_iter()
            .filter(|d| !d.matches)
            .map(|d| d.diff_output)
            .collect::<Vec<_>>()
            .join("\n");

        if self.config.update_snapshots {
            snapshots.backup()?;
            snapshots.update(&result)?;
            return Ok(Execution {
                passed: true,
                error: None,
                diff: Some(diff),
                updated: true,
            });
        }
        Ok(Execution::fail("Snapshot mismatch".to_string(), Some(diff)))
    }

    pub fn init_corpus(&self) -> Result<()> {
        self.corpus_manager.init_corpus()
    }

    /// Ids of every case in the corpus
    pub fn list_tests(&self) -> Result<Vec<String>> {
        Ok(self
            .corpus_manager
            .discover_tests()?
            .iter()
            .map(GoldenCase::id)
            .collect())
    }

    pub fn print_statistics(&self) -> Result<()> {
        self.corpus_manager.get_statistics()?.print();
        Ok(())
    }
}

/// Judge a request error against the case's expectations
fn expected_failure(case: &GoldenCase, message: &str) -> Result<Execution> {
    if case.expectations.should_succeed {
        return Ok(Execution::fail(format!("transform failed: {}", message), None));
    }
    match &case.expectations.error_pattern {
        Some(pattern) => {
            let regex = Regex::new(pattern)
                .map_err(|e| GoldenError::CorpusError(format!("Invalid error pattern: {}", e)))?;
            if regex.is_match(message) {
                Ok(Execution::pass(false))
            } else {
                Ok(Execution::fail(
                    format!("error '{}' does not match '{}'", message, pattern),
                    None,
                ))
            }
        }
        None => Ok(Execution::pass(false)),
    }
}
