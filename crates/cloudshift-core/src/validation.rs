//! Output validation
//!
//! Three independent checks run over the final text: it must parse in the
//! target variant, the source provider's suspected scan must come back
//! empty, and every family a rewrite touched must show at least one of the
//! target provider's markers. A failing check does not stop the others.

use crate::adapter::LanguageAdapter;
use crate::catalog::{PatternCatalog, ProviderProfile};
use crate::detection::{scan, SuspectKind};
use crate::error::Result;
use crate::syntax::lexer::mask_comments;
use crate::types::{ServiceFamily, Span};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Which validator check a result belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Check {
    Syntax,
    Residual,
    Presence,
}

impl fmt::Display for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Check::Syntax => f.write_str("syntax"),
            Check::Residual => f.write_str("residual"),
            Check::Presence => f.write_str("presence"),
        }
    }
}

/// One failing site or family
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckFailure {
    /// Where in the output, when the failure has a location
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    /// Construct name, literal text or family id
    pub subject: String,
    pub message: String,
}

impl CheckFailure {
    pub fn locator(&self) -> String {
        match &self.span {
            Some(span) => span.locator(),
            None => self.subject.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub check: Check,
    pub passed: bool,
    pub failures: Vec<CheckFailure>,
}

impl CheckResult {
    fn from_failures(check: Check, failures: Vec<CheckFailure>) -> Self {
        Self {
            check,
            passed: failures.is_empty(),
            failures,
        }
    }
}

/// Outcome of all three checks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub syntax: CheckResult,
    pub residual: CheckResult,
    pub presence: CheckResult,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.checks().iter().all(|c| c.passed)
    }

    pub fn checks(&self) -> [&CheckResult; 3] {
        [&self.syntax, &self.residual, &self.presence]
    }

    pub fn failing(&self) -> Vec<&CheckResult> {
        self.checks().into_iter().filter(|c| !c.passed).collect()
    }
}

/// Validates output of one source→target request
#[derive(Debug, Clone, Copy)]
pub struct Validator<'c> {
    catalog: &'c PatternCatalog,
    source: &'c ProviderProfile,
    target: &'c ProviderProfile,
}

impl<'c> Validator<'c> {
    pub fn new(
        catalog: &'c PatternCatalog,
        source: &'c ProviderProfile,
        target: &'c ProviderProfile,
    ) -> Self {
        Self {
            catalog,
            source,
            target,
        }
    }

    /// Run every check; `touched` lists families with an applied rewrite
    pub fn validate(
        &self,
        adapter: &dyn LanguageAdapter,
        output: &str,
        touched: &BTreeSet<ServiceFamily>,
    ) -> Result<ValidationReport> {
        let tree = adapter.analyze(output)?;

        let syntax = tree
            .diagnostics
            .iter()
            .map(|d| CheckFailure {
                span: None,
                subject: format!("{}:{}", d.line, d.column),
                message: format!("{} parse error: {}", adapter.variant(), d.message),
            })
            .collect();

        let residual = scan(&tree, self.source)
            .into_iter()
            .map(|suspect| {
                let (subject, message) = match &suspect.kind {
                    SuspectKind::Site { kind, name } => {
                        (name.clone(), format!("{} {} '{}' remains", self.source.name, kind, name))
                    }
                    SuspectKind::UriLiteral { scheme } => (
                        suspect.snippet.clone(),
                        format!("string literal still uses {}", scheme),
                    ),
                };
                CheckFailure {
                    span: Some(suspect.span),
                    subject,
                    message,
                }
            })
            .collect();

        let masked = mask_comments(output, adapter.lex_syntax());
        let mut presence = Vec::new();
        for family in touched {
            let verify = self
                .catalog
                .family(family)
                .map_or(true, |profile| profile.verify_presence);
            if !verify {
                continue;
            }
            let markers = self.target.markers_for(family);
            let message = if markers.is_empty() {
                format!("{} declares no markers for this family", self.target.name)
            } else if markers.iter().any(|m| m.is_match(&masked)) {
                continue;
            } else {
                format!("no {} construct found", self.target.name)
            };
            presence.push(CheckFailure {
                span: None,
                subject: family.to_string(),
                message,
            });
        }

        Ok(ValidationReport {
            syntax: CheckResult::from_failures(Check::Syntax, syntax),
            residual: CheckResult::from_failures(Check::Residual, residual),
            presence: CheckResult::from_failures(Check::Presence, presence),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{JsAdapter, PythonAdapter};
    use crate::testing;

    fn validate(adapter: &dyn LanguageAdapter, output: &str, touched: &[&str]) -> ValidationReport {
        let catalog = testing::catalog();
        let (_, aws, azure) = testing::aws_azure(&catalog);
        let touched = touched.iter().map(|f| ServiceFamily::new(*f)).collect();
        Validator::new(&catalog, aws, azure)
            .validate(adapter, output, &touched)
            .unwrap()
    }

    #[test]
    fn test_clean_target_output_passes() {
        let output = "const { BlobServiceClient } = require('@azure/storage-blob');\nconst c = BlobServiceClient.fromConnectionString(x);\n";
        let report = validate(&JsAdapter::javascript(), output, &["object_storage", "common"]);
        assert!(report.passed(), "{:?}", report.failing());
    }

    #[test]
    fn test_each_check_fails_independently() {
        let output = "import boto3\nURL = \"s3://b/k\"\nclient = boto3.client(\n";
        let report = validate(&PythonAdapter::new(), output, &["object_storage"]);

        assert!(!report.syntax.passed);
        assert!(!report.residual.passed);
        let subjects: Vec<_> = report.residual.failures.iter().map(|f| f.subject.as_str()).collect();
        assert!(subjects.contains(&"boto3"));
        assert!(subjects.contains(&"\"s3://b/k\""));
        assert!(!report.presence.passed);
        assert_eq!(report.presence.failures[0].subject, "object_storage");
        assert_eq!(report.failing().len(), 3);
    }

    #[test]
    fn test_markers_in_comments_do_not_count() {
        let output = "// BlobServiceClient goes here\nrun();\n";
        let report = validate(&JsAdapter::javascript(), output, &["object_storage"]);
        assert!(report.syntax.passed);
        assert!(report.residual.passed);
        assert!(!report.presence.passed);
    }

    #[test]
    fn test_family_without_presence_check() {
        let report = validate(&JsAdapter::javascript(), "run();\n", &["common"]);
        assert!(report.passed());
    }
}
