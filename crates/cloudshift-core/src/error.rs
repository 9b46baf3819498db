//! Error types for the CloudShift core library
//!
//! Only three conditions abort a request: the input does not parse, the
//! catalog cannot be loaded, or an adapter call runs past its budget. Per-site
//! problems and validator failures are findings on the result instead (see
//! [`crate::report`]).

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Main error type for CloudShift operations
#[derive(Error, Debug)]
pub enum Error {
    /// Source text does not conform to the variant's grammar
    #[error("Parse error ({language}) at {line}:{column}: {message}")]
    Parse {
        language: String,
        line: usize,
        column: usize,
        message: String,
    },

    /// Malformed or overlapping catalog
    #[error("Catalog load failed: {message}")]
    CatalogLoad {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Adapter parse/render exceeded the request budget
    #[error("Timeout during {stage} after {budget_ms}ms")]
    Timeout { stage: Stage, budget_ms: u64 },

    /// The request was cancelled by its caller
    #[error("Request cancelled before {stage}")]
    Cancelled { stage: Stage },

    /// No mapping for the provider pair
    #[error("No mapping from '{source_provider}' to '{target_provider}' in catalog {catalog_version}")]
    UnsupportedMapping {
        source_provider: String,
        target_provider: String,
        catalog_version: String,
    },

    /// No adapter registered for the language variant
    #[error("No adapter registered for language '{language}'")]
    UnsupportedLanguage { language: String },

    /// Adapter failed for reasons other than the input grammar
    #[error("Adapter error ({language}): {message}")]
    Adapter { language: String, message: String },

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// YAML parsing and serialization errors
    #[error("YAML error: {message}")]
    Yaml {
        message: String,
        #[source]
        source: serde_yaml::Error,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic internal error with context
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Catalog error without an underlying cause
    pub fn catalog<M: Into<String>>(message: M) -> Self {
        Error::CatalogLoad {
            message: message.into(),
            source: None,
        }
    }

    /// Whether retrying the same request could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Timeout { .. } | Error::Cancelled { .. })
    }
}

/// Pipeline stage, used to locate timeouts and cancellations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Parse,
    Detect,
    Transform,
    Render,
    Cleanup,
    Validate,
}

/// Severity levels for findings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Informational, no action required
    Info,
    /// Warning, should be reviewed
    Warning,
    /// Error, part of the migration did not happen
    Error,
    /// Critical, output cannot be trusted
    Critical,
}

/// Codes for non-fatal findings recorded on a transform result
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FindingCode {
    /// Provider site with no applicable rule
    Unmapped,
    /// Rule matched but its template could not bind every slot
    BindingMismatch,
    /// Template needs more structure than the adapter offers
    CapabilityUnsupported,
    /// Wrapper rule whose wrapped call was not rewritten
    NestedRewriteMissing,
    /// Rewrite inside a provider call that was not itself rewritten
    EnclosingRewriteMissing,
    /// Residual cleanup edited the rendered text
    CleanupApplied,
    /// Output does not parse in the target variant
    SyntaxInvalid,
    /// Source-provider pattern still present in the output
    ResidualPattern,
    /// Family touched by a rewrite has no target construct in the output
    TargetMissing,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Parse => "parse",
            Stage::Detect => "detect",
            Stage::Transform => "transform",
            Stage::Render => "render",
            Stage::Cleanup => "cleanup",
            Stage::Validate => "validate",
        };
        f.write_str(name)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

impl fmt::Display for FindingCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FindingCode::Unmapped => "Unmapped",
            FindingCode::BindingMismatch => "BindingMismatch",
            FindingCode::CapabilityUnsupported => "CapabilityUnsupported",
            FindingCode::NestedRewriteMissing => "NestedRewriteMissing",
            FindingCode::EnclosingRewriteMissing => "EnclosingRewriteMissing",
            FindingCode::CleanupApplied => "CleanupApplied",
            FindingCode::SyntaxInvalid => "SyntaxInvalid",
            FindingCode::ResidualPattern => "ResidualPattern",
            FindingCode::TargetMissing => "TargetMissing",
        };
        f.write_str(name)
    }
}

// Conversion implementations
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Error::Yaml {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<cloudshift_schemas::LoaderError> for Error {
    fn from(err: cloudshift_schemas::LoaderError) -> Self {
        Error::CatalogLoad {
            message: err.to_string(),
            source: Some(anyhow::Error::new(err)),
        }
    }
}

impl From<cloudshift_schemas::ValidationErrors> for Error {
    fn from(err: cloudshift_schemas::ValidationErrors) -> Self {
        Error::CatalogLoad {
            message: err.to_string(),
            source: Some(anyhow::Error::new(err)),
        }
    }
}
