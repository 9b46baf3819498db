//! Shared utilities for command handlers

use crate::cli::RequestArgs;
use crate::config::Config;
use crate::error::{Error, Result};
use cloudshift_core::{LanguageVariant, PatternCatalog, TransformRequest};
use cloudshift_schemas::{CatalogDocument, CatalogLoader, LoaderError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Catalog document from the bundled fragments and configured paths
///
/// Fragments are merged without validation; the caller validates the result.
pub fn load_catalog_document(config: &Config, extra: &[PathBuf], builtin: bool) -> Result<CatalogDocument> {
    let loader = CatalogLoader::unchecked();
    let mut document = if builtin {
        loader.load_sources(cloudshift_providers::builtin_catalog_sources())?
    } else {
        CatalogDocument::default()
    };

    for path in config.catalog.paths.iter().chain(extra) {
        if !path.exists() {
            return Err(Error::FileNotFound { path: path.clone() });
        }
        debug!(path = %path.display(), "Merging catalog path");
        let fragment = loader.load_paths(std::slice::from_ref(path))?;
        document
            .merge(fragment)
            .map_err(|source| LoaderError::MergeError {
                path: path.clone(),
                source,
            })?;
    }

    Ok(document)
}

/// Validated, compiled catalog
pub fn load_catalog(config: &Config, extra: &[PathBuf]) -> Result<PatternCatalog> {
    let document = load_catalog_document(config, extra, config.catalog.builtin)?;
    Ok(PatternCatalog::from_document(&document)?)
}

/// Provider pair of a request, falling back to the configured defaults
pub fn resolve_providers(args: &RequestArgs, config: &Config) -> Result<(String, String)> {
    let source = args
        .from
        .clone()
        .unwrap_or_else(|| config.defaults.source.clone());
    let target = args
        .to
        .clone()
        .or_else(|| config.defaults.target.clone())
        .ok_or_else(|| Error::invalid_args("no target provider; pass --to or set defaults.target"))?;
    Ok((source, target))
}

/// Language of a file, explicit or inferred from its extension
pub fn resolve_language(args: &RequestArgs, path: &Path) -> Result<LanguageVariant> {
    if let Some(language) = args.language {
        return Ok(language);
    }
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(LanguageVariant::from_extension)
        .ok_or_else(|| Error::UnknownLanguage {
            path: path.to_path_buf(),
        })
}

/// Read a file and build the engine request for it
pub fn build_request(args: &RequestArgs, config: &Config, path: &Path) -> Result<TransformRequest> {
    if !path.is_file() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let language = resolve_language(args, path)?;
    let (source, target) = resolve_providers(args, config)?;
    let text = fs::read_to_string(path)?;
    debug!(
        file = %path.display(),
        language = %language,
        bytes = text.len(),
        "Built request"
    );
    Ok(TransformRequest::new(text, language, source, target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request_args() -> RequestArgs {
        RequestArgs {
            from: None,
            to: None,
            language: None,
            catalogs: Vec::new(),
        }
    }

    #[test]
    fn test_language_inference() {
        let args = request_args();
        assert_eq!(
            resolve_language(&args, Path::new("handler.ts")).unwrap(),
            LanguageVariant::TypeScript
        );
        assert_eq!(
            resolve_language(&args, Path::new("main.go")).unwrap(),
            LanguageVariant::Go
        );
        assert!(matches!(
            resolve_language(&args, Path::new("Makefile")),
            Err(Error::UnknownLanguage { .. })
        ));

        let explicit = RequestArgs {
            language: Some(LanguageVariant::Python),
            ..request_args()
        };
        assert_eq!(
            resolve_language(&explicit, Path::new("Makefile")).unwrap(),
            LanguageVariant::Python
        );
    }

    #[test]
    fn test_provider_defaults() {
        let mut config = Config::default();
        assert!(matches!(
            resolve_providers(&request_args(), &config),
            Err(Error::InvalidArgs(_))
        ));

        config.defaults.target = Some("gcp".to_string());
        assert_eq!(
            resolve_providers(&request_args(), &config).unwrap(),
            ("aws".to_string(), "gcp".to_string())
        );

        let args = RequestArgs {
            to: Some("azure".to_string()),
            ..request_args()
        };
        assert_eq!(resolve_providers(&args, &config).unwrap().1, "azure");
    }

    #[test]
    fn test_builtin_catalog_loads() {
        let catalog = load_catalog(&Config::default(), &[]).unwrap();
        assert_eq!(catalog.version().to_string(), cloudshift_providers::CATALOG_VERSION);
        assert!(catalog.rule_count() > 0);
    }

    #[test]
    fn test_missing_catalog_path() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.yaml");
        assert!(matches!(
            load_catalog(&Config::default(), &[missing]),
            Err(Error::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_build_request_reads_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("upload.py");
        std::fs::write(&path, "import boto3\n").unwrap();

        let args = RequestArgs {
            to: Some("azure".to_string()),
            ..request_args()
        };
        let request = build_request(&args, &Config::default(), &path).unwrap();
        assert_eq!(request.language, LanguageVariant::Python);
        assert_eq!(request.source_text, "import boto3\n");
        assert_eq!(request.target_provider.as_str(), "azure");
    }
}
