//! Format detection and typed parsing of catalog files
//!
//! Copyright (c) 2025 CloudShift Team
//! Licensed under the Apache-2.0 license

use crate::catalog::CatalogDocument;
use crate::loader::error::{LoaderError, LoaderResult};
use std::path::Path;

/// Supported catalog file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// YAML format (.yaml, .yml)
    Yaml,
    /// JSON format (.json)
    Json,
}

impl Format {
    /// Detect format from file extension
    pub fn from_path(path: &Path) -> LoaderResult<Self> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .as_deref()
        {
            Some("yaml") | Some("yml") => Ok(Format::Yaml),
            Some("json") => Ok(Format::Json),
            _ => Err(LoaderError::unsupported_format(path.to_path_buf())),
        }
    }

    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Format::Yaml => &["yaml", "yml"],
            Format::Json => &["json"],
        }
    }

    /// Whether a path carries one of the catalog extensions
    pub fn is_catalog_file(path: &Path) -> bool {
        Self::from_path(path).is_ok()
    }
}

/// Parse catalog content in an explicit format; `origin` is used for error context
pub fn parse_document(content: &str, format: Format, origin: &Path) -> LoaderResult<CatalogDocument> {
    match format {
        Format::Yaml => serde_yaml::from_str(content)
            .map_err(|e| LoaderError::yaml_parse_error(origin.to_path_buf(), e)),
        Format::Json => serde_json::from_str(content)
            .map_err(|e| LoaderError::json_parse_error(origin.to_path_buf(), e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_detection() {
        assert_eq!(Format::from_path(Path::new("a.yaml")).unwrap(), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("a.YML")).unwrap(), Format::Yaml);
        assert_eq!(Format::from_path(Path::new("a.json")).unwrap(), Format::Json);
        assert!(Format::from_path(Path::new("a.toml")).is_err());
        assert!(Format::from_path(Path::new("catalog")).is_err());
    }

    #[test]
    fn test_parse_json_document() {
        let doc = parse_document(
            r#"{"catalog_version": "1.0.0", "providers": [{"id": "aws"}]}"#,
            Format::Json,
            &PathBuf::from("inline.json"),
        )
        .unwrap();
        assert_eq!(doc.providers[0].id, "aws");
    }

    #[test]
    fn test_parse_error_keeps_origin() {
        let err = parse_document("providers: [", Format::Yaml, Path::new("broken.yaml")).unwrap_err();
        assert_eq!(err.path(), &PathBuf::from("broken.yaml"));
    }
}
