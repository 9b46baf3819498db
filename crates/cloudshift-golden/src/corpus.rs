//! Corpus discovery and case loading
//!
//! Layout: `<corpus>/<category>/<case>/case.json` next to the input file it
//! names. Expectations live in the same directory (see [`crate::snapshot`]).

use crate::{GoldenError, Result};
use cloudshift_core::{LanguageVariant, Outcome};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// File name of a case description
pub const CASE_FILE: &str = "case.json";

/// One corpus case
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoldenCase {
    pub name: String,
    pub category: String,
    pub input: CaseInput,
    #[serde(default)]
    pub expectations: CaseExpectations,
    pub metadata: CaseMetadata,

    /// Directory the case was loaded from
    #[serde(skip)]
    pub dir: PathBuf,
}

/// The request a case runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseInput {
    /// Source file, relative to the case directory
    pub file: String,

    /// Defaults to the variant implied by the file extension
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<LanguageVariant>,

    pub source: String,
    pub target: String,
}

/// What the run must satisfy besides matching the stored snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseExpectations {
    #[serde(default = "default_true")]
    pub should_succeed: bool,

    /// Regex the error message must match when `should_succeed` is false
    #[serde(default)]
    pub error_pattern: Option<String>,

    #[serde(default)]
    pub outcome: Option<Outcome>,

    /// Regexes for output lines that may differ between runs
    #[serde(default)]
    pub volatile_lines: Vec<String>,
}

impl Default for CaseExpectations {
    fn default() -> Self {
        Self {
            should_succeed: true,
            error_pattern: None,
            outcome: None,
            volatile_lines: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseMetadata {
    pub description: String,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Lower runs first
    #[serde(default = "default_priority")]
    pub priority: u32,
}

fn default_true() -> bool {
    true
}

fn default_priority() -> u32 {
    100
}

impl GoldenCase {
    /// `category/name`
    pub fn id(&self) -> String {
        format!("{}/{}", self.category, self.name)
    }

    pub fn input_path(&self) -> PathBuf {
        self.dir.join(&self.input.file)
    }

    pub fn language(&self) -> Result<LanguageVariant> {
        if let Some(language) = self.input.language {
            return Ok(language);
        }
        Path::new(&self.input.file)
            .extension()
            .and_then(|e| e.to_str())
            .and_then(LanguageVariant::from_extension)
            .ok_or_else(|| {
                GoldenError::CorpusError(format!(
                    "case '{}' has no language and '{}' has no known extension",
                    self.id(),
                    self.input.file
                ))
            })
    }

    pub fn read_input(&self) -> Result<String> {
        Ok(fs::read_to_string(self.input_path())?)
    }
}

/// Manages the test corpus
pub struct CorpusManager {
    corpus_dir: PathBuf,
}

impl CorpusManager {
    pub fn new(corpus_dir: impl AsRef<Path>) -> Self {
        Self {
            corpus_dir: corpus_dir.as_ref().to_path_buf(),
        }
    }

    pub fn corpus_dir(&self) -> &Path {
        &self.corpus_dir
    }

    /// Every loadable case, by priority then id
    pub fn discover_tests(&self) -> Result<Vec<GoldenCase>> {
        let mut cases = Vec::new();

        if !self.corpus_dir.exists() {
            return Ok(cases);
        }

        for entry in WalkDir::new(&self.corpus_dir)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.is_file() && path.file_name() == Some(std::ffi::OsStr::new(CASE_FILE)) {
                match self.load_case(path) {
                    Ok(case) => cases.push(case),
                    Err(e) => eprintln!("Warning: Failed to load case {:?}: {}", path, e),
                }
            }
        }

        cases.sort_by(|a, b| {
            a.metadata
                .priority
                .cmp(&b.metadata.priority)
                .then_with(|| a.id().cmp(&b.id()))
        });
        Ok(cases)
    }

    /// Load the `case.json` at `path`
    pub fn load_case(&self, path: &Path) -> Result<GoldenCase> {
        let content = fs::read_to_string(path)?;
        let mut case: GoldenCase = serde_json::from_str(&content)?;
        case.dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.corpus_dir.clone());
        Ok(case)
    }

    /// Load a case by `category/name`
    pub fn find(&self, id: &str) -> Result<GoldenCase> {
        let path = self.corpus_dir.join(id).join(CASE_FILE);
        if !path.exists() {
            return Err(GoldenError::CorpusError(format!(
                "no case '{}' under {:?}",
                id, self.corpus_dir
            )));
        }
        self.load_case(&path)
    }

    pub fn filter_by_category(&self, cases: Vec<GoldenCase>, category: &str) -> Vec<GoldenCase> {
        cases
            .into_iter()
            .filter(|c| category == "*" || c.category == category)
            .collect()
    }

    pub fn filter_by_tags(&self, cases: Vec<GoldenCase>, tags: &[String]) -> Vec<GoldenCase> {
        if tags.is_empty() {
            return cases;
        }
        cases
            .into_iter()
            .filter(|c| tags.iter().any(|tag| c.metadata.tags.contains(tag)))
            .collect()
    }

    pub fn filter_enabled(&self, cases: Vec<GoldenCase>) -> Vec<GoldenCase> {
        cases.into_iter().filter(|c| c.metadata.enabled).collect()
    }

    /// Create the category directories and one sample case
    pub fn init_corpus(&self) -> Result<()> {
        for dir in [
            "object-storage",
            "document-database",
            "function-runtime",
            "unmapped",
            "cleanup",
        ] {
            fs::create_dir_all(self.corpus_dir.join(dir))?;
        }
        self.create_sample_case()
    }

    fn create_sample_case(&self) -> Result<()> {
        let dir = self.corpus_dir.join("object-storage/python-s3-put");
        if dir.join(CASE_FILE).exists() {
            return Ok(());
        }
        fs::create_dir_all(&dir)?;

        fs::write(
            dir.join("input.py"),
            "import boto3\n\ns3 = boto3.client(\"s3\")\ns3.put_object(Bucket=\"reports\", Key=\"a.txt\", Body=b\"x\")\n",
        )?;

        let case = GoldenCase {
            name: "python-s3-put".to_string(),
            category: "object-storage".to_string(),
            input: CaseInput {
                file: "input.py".to_string(),
                language: None,
                source: "aws".to_string(),
                target: "azure".to_string(),
            },
            expectations: CaseExpectations {
                outcome: Some(Outcome::Success),
                ..CaseExpectations::default()
            },
            metadata: CaseMetadata {
                description: "boto3 put_object becomes a Blob Storage upload".to_string(),
                tags: vec!["python".to_string(), "s3".to_string()],
                enabled: true,
                priority: 1,
            },
            dir: dir.clone(),
        };
        fs::write(dir.join(CASE_FILE), serde_json::to_string_pretty(&case)?)?;
        Ok(())
    }

    /// Category directory names
    pub fn list_categories(&self) -> Result<Vec<String>> {
        let mut categories = Vec::new();

        if !self.corpus_dir.exists() {
            return Ok(categories);
        }

        for entry in fs::read_dir(&self.corpus_dir)? {
            let path = entry?.path();
            if path.is_dir() {
                if let Some(name) = path.file_name().and_then(|s| s.to_str()) {
                    categories.push(name.to_string());
                }
            }
        }

        categories.sort();
        Ok(categories)
    }

    pub fn get_statistics(&self) -> Result<CorpusStatistics> {
        let cases = self.discover_tests()?;
        let mut stats = CorpusStatistics {
            total_tests: cases.len(),
            ..Default::default()
        };

        for case in cases {
            if case.metadata.enabled {
                stats.enabled_tests += 1;
            } else {
                stats.disabled_tests += 1;
            }
            if let Ok(language) = case.language() {
                *stats.tests_by_language.entry(language.to_string()).or_insert(0) += 1;
            }
            *stats.tests_by_category.entry(case.category).or_insert(0) += 1;
        }

        Ok(stats)
    }
}

/// Counts over the corpus
#[derive(Debug, Default)]
pub struct CorpusStatistics {
    pub total_tests: usize,
    pub enabled_tests: usize,
    pub disabled_tests: usize,
    pub tests_by_category: BTreeMap<String, usize>,
    pub tests_by_language: BTreeMap<String, usize>,
}

impl CorpusStatistics {
    pub fn print(&self) {
        println!("=== Corpus Statistics ===");
        println!("Total cases: {}", self.total_tests);
        println!("Enabled: {}", self.enabled_tests);
        println!("Disabled: {}", self.disabled_tests);

        for (title, counts) in [
            ("category", &self.tests_by_category),
            ("language", &self.tests_by_language),
        ] {
            if !counts.is_empty() {
                println!("\nCases by {}:", title);
                for (key, count) in counts {
                    println!("  {}: {}", key, count);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_corpus_manager_init() {
        let temp_dir = TempDir::new().unwrap();
        let manager = CorpusManager::new(temp_dir.path());

        manager.init_corpus().unwrap();

        assert!(temp_dir.path().join("object-storage").exists());
        assert!(temp_dir.path().join("unmapped").exists());
        assert!(temp_dir
            .path()
            .join("object-storage/python-s3-put/case.json")
            .exists());
    }

    #[test]
    fn test_discover_and_find() {
        let temp_dir = TempDir::new().unwrap();
        let manager = CorpusManager::new(temp_dir.path());
        manager.init_corpus().unwrap();

        let cases = manager.discover_tests().unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].id(), "object-storage/python-s3-put");
        assert_eq!(cases[0].language().unwrap(), LanguageVariant::Python);
        assert!(cases[0].read_input().unwrap().contains("boto3"));

        let found = manager.find("object-storage/python-s3-put").unwrap();
        assert_eq!(found.dir, cases[0].dir);
        assert!(manager.find("object-storage/missing").is_err());
    }

    #[test]
    fn test_filters_and_statistics() {
        let temp_dir = TempDir::new().unwrap();
        let manager = CorpusManager::new(temp_dir.path());
        manager.init_corpus().unwrap();

        let cases = manager.discover_tests().unwrap();
        assert_eq!(manager.filter_by_category(cases.clone(), "unmapped").len(), 0);
        assert_eq!(manager.filter_by_category(cases.clone(), "*").len(), 1);
        assert_eq!(
            manager.filter_by_tags(cases, &["s3".to_string()]).len(),
            1
        );

        let stats = manager.get_statistics().unwrap();
        assert_eq!(stats.enabled_tests, 1);
        assert_eq!(stats.tests_by_language.get("python"), Some(&1));
        assert_eq!(
            manager.list_categories().unwrap(),
            vec!["cleanup", "document-database", "function-runtime", "object-storage", "unmapped"]
        );
    }
}
