//! Error types for catalog loading
//!
//! Copyright (c) 2025 CloudShift Team
//! Licensed under the Apache-2.0 license

use crate::validation::{ValidationError, ValidationErrors};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for loader operations
pub type LoaderResult<T> = Result<T, LoaderError>;

/// Failures while reading catalog files
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to read file '{path}': {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse YAML file '{path}': {source}")]
    YamlParseError {
        path: PathBuf,
        source: serde_yaml::Error,
    },

    #[error("Failed to parse JSON file '{path}': {source}")]
    JsonParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Unsupported file format for '{path}'. Expected .yaml, .yml, or .json")]
    UnsupportedFormat { path: PathBuf },

    #[error("No catalog files found in '{path}'")]
    EmptyDirectory { path: PathBuf },

    #[error("Catalog fragment '{path}' could not be merged: {source}")]
    MergeError {
        path: PathBuf,
        source: ValidationError,
    },

    #[error("Catalog '{path}' is invalid: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationErrors,
    },
}

impl LoaderError {
    pub fn io_error(path: PathBuf, error: std::io::Error) -> Self {
        Self::IoError {
            path,
            source: error,
        }
    }

    pub fn yaml_parse_error(path: PathBuf, error: serde_yaml::Error) -> Self {
        Self::YamlParseError {
            path,
            source: error,
        }
    }

    pub fn json_parse_error(path: PathBuf, error: serde_json::Error) -> Self {
        Self::JsonParseError {
            path,
            source: error,
        }
    }

    pub fn unsupported_format(path: PathBuf) -> Self {
        Self::UnsupportedFormat { path }
    }

    /// Path of the file the error refers to
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::IoError { path, .. }
            | Self::YamlParseError { path, .. }
            | Self::JsonParseError { path, .. }
            | Self::UnsupportedFormat { path }
            | Self::EmptyDirectory { path }
            | Self::MergeError { path, .. }
            | Self::Invalid { path, .. } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_path() {
        let path = PathBuf::from("catalog/aws-to-azure.yaml");
        let err = LoaderError::io_error(
            path.clone(),
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        );
        assert_eq!(err.path(), &path);
        assert!(err.to_string().contains("aws-to-azure.yaml"));

        let err = LoaderError::yaml_parse_error(
            path.clone(),
            serde_yaml::from_str::<serde_yaml::Value>("{").unwrap_err(),
        );
        assert!(matches!(err, LoaderError::YamlParseError { .. }));
    }
}
