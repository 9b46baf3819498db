//! Catalog loading
//!
//! A catalog is read from one or more files (or a directory of them), each
//! holding a [`CatalogDocument`] fragment. Fragments are merged in path order
//! and the result is validated as a whole.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use cloudshift_schemas::loader::CatalogLoader;
//! use std::path::Path;
//!
//! let loader = CatalogLoader::new();
//! let catalog = loader.load_dir(Path::new("catalog"))?;
//! println!("{} mappings", catalog.mappings.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Copyright (c) 2025 CloudShift Team
//! Licensed under the Apache-2.0 license

pub mod error;
pub mod parser;

pub use error::{LoaderError, LoaderResult};
pub use parser::{parse_document, Format};

use crate::catalog::CatalogDocument;
use crate::validation::CatalogValidator;
use std::path::{Path, PathBuf};

/// Reads, merges and validates catalog fragments
#[derive(Debug, Clone)]
pub struct CatalogLoader {
    validate: bool,
}

impl Default for CatalogLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogLoader {
    /// Loader that validates the merged document
    pub fn new() -> Self {
        Self { validate: true }
    }

    /// Loader that returns the merged document without validation
    pub fn unchecked() -> Self {
        Self { validate: false }
    }

    /// Load a single catalog file
    pub fn load_file(&self, path: &Path) -> LoaderResult<CatalogDocument> {
        let document = read_fragment(path)?;
        self.finish(document, path)
    }

    /// Load catalog text that did not come from disk, such as an embedded artifact
    pub fn load_str(&self, content: &str, format: Format, origin: &Path) -> LoaderResult<CatalogDocument> {
        let document = parse_document(content, format, origin)?;
        self.finish(document, origin)
    }

    /// Load several in-memory fragments in order and merge them
    pub fn load_sources<'a, I>(&self, sources: I) -> LoaderResult<CatalogDocument>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut merged = CatalogDocument::default();
        let mut last = PathBuf::from("<empty>");
        for (name, content) in sources {
            let origin = PathBuf::from(name);
            let format = Format::from_path(&origin).unwrap_or(Format::Yaml);
            let fragment = parse_document(content, format, &origin)?;
            merged
                .merge(fragment)
                .map_err(|source| LoaderError::MergeError {
                    path: origin.clone(),
                    source,
                })?;
            last = origin;
        }
        self.finish(merged, &last)
    }

    /// Load and merge a list of files; directories are expanded
    pub fn load_paths(&self, paths: &[PathBuf]) -> LoaderResult<CatalogDocument> {
        let mut merged = CatalogDocument::default();
        let mut origin = PathBuf::from("<empty>");
        for path in paths {
            for file in expand(path)? {
                let fragment = read_fragment(&file)?;
                merged
                    .merge(fragment)
                    .map_err(|source| LoaderError::MergeError {
                        path: file.clone(),
                        source,
                    })?;
                origin = file;
            }
        }
        self.finish(merged, &origin)
    }

    /// Load every catalog file in a directory, in file-name order
    pub fn load_dir(&self, dir: &Path) -> LoaderResult<CatalogDocument> {
        self.load_paths(&[dir.to_path_buf()])
    }

    fn finish(&self, document: CatalogDocument, origin: &Path) -> LoaderResult<CatalogDocument> {
        if self.validate {
            CatalogValidator::new()
                .validate(&document)
                .map_err(|source| LoaderError::Invalid {
                    path: origin.to_path_buf(),
                    source,
                })?;
        }
        Ok(document)
    }
}

fn read_fragment(path: &Path) -> LoaderResult<CatalogDocument> {
    let format = Format::from_path(path)?;
    let content =
        std::fs::read_to_string(path).map_err(|e| LoaderError::io_error(path.to_path_buf(), e))?;
    parse_document(&content, format, path)
}

fn expand(path: &Path) -> LoaderResult<Vec<PathBuf>> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }

    let entries = std::fs::read_dir(path).map_err(|e| LoaderError::io_error(path.to_path_buf(), e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| LoaderError::io_error(path.to_path_buf(), e))?;
        let file = entry.path();
        if file.is_file() && Format::is_catalog_file(&file) {
            files.push(file);
        }
    }
    if files.is_empty() {
        return Err(LoaderError::EmptyDirectory {
            path: path.to_path_buf(),
        });
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const PROVIDERS: &str = "catalog_version: 1.0.0\nfamilies:\n  - id: object_storage\nproviders:\n  - id: aws\n  - id: azure\n";
    const MAPPING: &str = "catalog_version: 1.0.0\nmappings:\n  - source: aws\n    target: azure\n";

    #[test]
    fn test_load_dir_merges_in_name_order() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("00-providers.yaml"), PROVIDERS).unwrap();
        fs::write(dir.path().join("10-aws-azure.yml"), MAPPING).unwrap();
        fs::write(dir.path().join("README.md"), "ignored").unwrap();

        let doc = CatalogLoader::new().load_dir(dir.path()).unwrap();
        assert_eq!(doc.providers.len(), 2);
        assert_eq!(doc.mappings.len(), 1);
    }

    #[test]
    fn test_load_dir_requires_files() {
        let dir = TempDir::new().unwrap();
        let err = CatalogLoader::new().load_dir(dir.path()).unwrap_err();
        assert!(matches!(err, LoaderError::EmptyDirectory { .. }));
    }

    #[test]
    fn test_invalid_merged_catalog_is_rejected() {
        let err = CatalogLoader::new()
            .load_sources([("mapping.yaml", MAPPING)])
            .unwrap_err();
        assert!(matches!(err, LoaderError::Invalid { .. }));

        // Same input is accepted when validation is skipped
        assert!(CatalogLoader::unchecked()
            .load_sources([("mapping.yaml", MAPPING)])
            .is_ok());
    }

    #[test]
    fn test_load_sources() {
        let doc = CatalogLoader::new()
            .load_sources([("providers.yaml", PROVIDERS), ("aws-azure.yaml", MAPPING)])
            .unwrap();
        assert_eq!(doc.catalog_version.as_deref(), Some("1.0.0"));
    }
}
