//! Stored expectations of a corpus case
//!
//! A snapshot is two files in the case directory: `expected.<ext>` with the
//! transformed text and `expected.json` with a summary of the result.

use crate::{GoldenError, Result};
use chrono::Utc;
use cloudshift_core::{LanguageVariant, Outcome, TransformResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Snapshot format version
pub const SNAPSHOT_VERSION: &str = "1.0.0";

/// The comparable part of a [`TransformResult`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSummary {
    pub outcome: Outcome,
    /// Applied rule ids in document order
    pub hits: Vec<String>,
    /// Unmapped construct names with their reasons, sorted
    pub unmapped: Vec<String>,
    /// Cleanup rule ids in application order
    #[serde(default)]
    pub cleanup: Vec<String>,
    /// Failing validator checks
    #[serde(default)]
    pub failing_checks: Vec<String>,
}

impl From<&TransformResult> for ResultSummary {
    fn from(result: &TransformResult) -> Self {
        let mut unmapped: Vec<String> = result
            .unmapped
            .iter()
            .map(|u| format!("{} ({})", u.site.name, u.reason))
            .collect();
        unmapped.sort();

        Self {
            outcome: result.outcome,
            hits: result.hits.iter().map(|h| h.rule_id.to_string()).collect(),
            unmapped,
            cleanup: result.cleanup.iter().map(|c| c.rule_id.clone()).collect(),
            failing_checks: result
                .validation
                .failing()
                .iter()
                .map(|c| c.check.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    pub version: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Contents of `expected.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SummaryFile {
    metadata: SnapshotMetadata,
    summary: ResultSummary,
}

/// Expected output of one case
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub output: String,
    pub summary: ResultSummary,
    pub metadata: SnapshotMetadata,
}

/// Reads and writes snapshots inside one case directory
pub struct SnapshotManager {
    case_dir: PathBuf,
    language: LanguageVariant,
}

impl SnapshotManager {
    pub fn new(case_dir: impl AsRef<Path>, language: LanguageVariant) -> Self {
        Self {
            case_dir: case_dir.as_ref().to_path_buf(),
            language,
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.case_dir
            .join(format!("expected.{}", self.language.extension()))
    }

    pub fn summary_path(&self) -> PathBuf {
        self.case_dir.join("expected.json")
    }

    pub fn exists(&self) -> bool {
        self.output_path().exists() && self.summary_path().exists()
    }

    pub fn load(&self) -> Result<Snapshot> {
        if !self.exists() {
            return Err(GoldenError::CorpusError(format!(
                "No snapshot in {:?}",
                self.case_dir
            )));
        }

        let output = fs::read_to_string(self.output_path())?;
        let file: SummaryFile = serde_json::from_str(&fs::read_to_string(self.summary_path())?)?;

        Ok(Snapshot {
            output,
            summary: file.summary,
            metadata: file.metadata,
        })
    }

    pub fn save(&self, snapshot: &Snapshot) -> Result<()> {
        fs::create_dir_all(&self.case_dir)?;
        fs::write(self.output_path(), &snapshot.output)?;

        let file = SummaryFile {
            metadata: snapshot.metadata.clone(),
            summary: snapshot.summary.clone(),
        };
        let mut content = serde_json::to_string_pretty(&file)?;
        content.push('\n');
        fs::write(self.summary_path(), content)?;
        Ok(())
    }

    /// Write a first snapshot for a case
    pub fn create(&self, result: &TransformResult, description: Option<String>) -> Result<Snapshot> {
        let now = Utc::now().to_rfc3339();
        let snapshot = Snapshot {
            output: result.output.clone(),
            summary: ResultSummary::from(result),
            metadata: SnapshotMetadata {
                version: SNAPSHOT_VERSION.to_string(),
                created_at: now.clone(),
                updated_at: now,
                description,
            },
        };
        self.save(&snapshot)?;
        Ok(snapshot)
    }

    /// Replace the stored expectations, keeping the creation metadata
    pub fn update(&self, result: &TransformResult) -> Result<Snapshot> {
        let mut snapshot = self.load()?;
        snapshot.output = result.output.clone();
        snapshot.summary = ResultSummary::from(result);
        snapshot.metadata.updated_at = Utc::now().to_rfc3339();
        self.save(&snapshot)?;
        Ok(snapshot)
    }

    /// Copy the current snapshot aside before it is overwritten
    pub fn backup(&self) -> Result<()> {
        if !self.exists() {
            return Ok(());
        }
        let stamp = Utc::now().timestamp();
        for path in [self.output_path(), self.summary_path()] {
            let mut name = path.file_name().unwrap_or_default().to_os_string();
            name.push(format!(".backup.{}", stamp));
            fs::copy(&path, path.with_file_name(name))?;
        }
        Ok(())
    }

    pub fn delete(&self) -> Result<()> {
        for path in [self.output_path(), self.summary_path()] {
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }
}
