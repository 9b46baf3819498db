//! Error types and handling for the CLI

use std::io;
use std::path::PathBuf;

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for CLI operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error (file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Error from the transformation engine
    #[error("{0}")]
    Core(#[from] cloudshift_core::Error),

    /// Catalog files that failed to load or validate
    #[error("{0}")]
    Catalog(#[from] cloudshift_schemas::LoaderError),

    /// File not found
    #[error("File not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    /// No language given and none implied by the extension
    #[error("Cannot infer the language of {}; pass --language", path.display())]
    UnknownLanguage { path: PathBuf },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid argument combination
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    /// Some files could not be transformed
    #[error("{failed} of {total} file(s) could not be transformed")]
    Failed { failed: usize, total: usize },

    /// Strict mode and some output is incomplete
    #[error("{count} file(s) were only partially migrated")]
    Partial { count: usize },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error with context
    #[error("{message}")]
    Other { message: String },
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an invalid arguments error
    pub fn invalid_args(message: impl Into<String>) -> Self {
        Self::InvalidArgs(message.into())
    }

    /// Create a generic error with message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Io(_) => 1,
            Self::Core(_) => 2,
            Self::Catalog(_) => 3,
            Self::FileNotFound { .. } => 4,
            Self::UnknownLanguage { .. } => 5,
            Self::Config(_) => 6,
            Self::InvalidArgs(_) => 7,
            Self::Failed { .. } => 8,
            Self::Partial { .. } => 9,
            Self::Json(_) => 12,
            Self::Yaml(_) => 13,
            Self::Other { .. } => 99,
        }
    }

    /// Check if this error should display usage help
    pub fn should_show_help(&self) -> bool {
        matches!(self, Self::InvalidArgs(_) | Self::UnknownLanguage { .. })
    }
}

/// Extension trait for displaying errors with context
pub trait ErrorContext<T> {
    /// Add context to an error
    fn context(self, msg: &str) -> Result<T>;

    /// Add context with a closure (only evaluated on error)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn context(self, msg: &str) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other {
                message: format!("{}: {}", msg, inner),
            }
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other {
                message: format!("{}: {}", f(), inner),
            }
        })
    }
}

/// Format an error for display to the user
pub fn format_error(error: &Error, use_color: bool) -> String {
    let mut message = error.to_string();

    if let Error::Core(core) = error {
        if core.is_retryable() {
            message.push_str("\n  (retrying with a larger adapter timeout may help)");
        }
    }

    if use_color {
        use colored::Colorize;
        format!("{} {}", "Error:".red().bold(), message)
    } else {
        format!("Error: {}", message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudshift_core::Stage;

    #[test]
    fn test_exit_codes_are_distinct() {
        let errors = [
            Error::Io(io::Error::new(io::ErrorKind::Other, "x")),
            Error::Core(cloudshift_core::Error::Cancelled { stage: Stage::Parse }),
            Error::FileNotFound { path: PathBuf::from("a") },
            Error::config("x"),
            Error::invalid_args("x"),
            Error::Failed { failed: 1, total: 2 },
            Error::Partial { count: 1 },
            Error::other("x"),
        ];
        let mut codes: Vec<_> = errors.iter().map(Error::exit_code).collect();
        codes.sort();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_context_wraps_message() {
        let result: std::result::Result<(), io::Error> =
            Err(io::Error::new(io::ErrorKind::NotFound, "missing"));
        let err = result.context("reading input").unwrap_err();
        assert_eq!(err.to_string(), "reading input: IO error: missing");
    }

    #[test]
    fn test_format_error_plain() {
        let err = Error::Core(cloudshift_core::Error::Timeout {
            stage: Stage::Parse,
            budget_ms: 20,
        });
        let text = format_error(&err, false);
        assert!(text.starts_with("Error: Timeout during parse after 20ms"));
        assert!(text.contains("adapter timeout"));
        assert!(Error::invalid_args("x").should_show_help());
    }
}
