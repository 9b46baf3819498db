//! Core data types shared across the engine

use crate::report::CoverageReport;
use crate::validation::ValidationReport;
use cloudshift_schemas::{Fidelity, LanguageVariant, SiteKind};
use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new<S: Into<String>>(value: S) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Provider identifier as declared in the catalog (`aws`, `azure`, …)
    ProviderId
);
string_id!(
    /// Service family identifier (`object_storage`, `function_runtime`, …)
    ServiceFamily
);
string_id!(
    /// Catalog rule identifier
    RuleId
);

/// Byte range in a document plus the 1-based position of its start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, column: usize) -> Self {
        Self {
            start,
            end,
            line,
            column,
        }
    }

    /// Span with line/column computed from the document text
    pub fn locate(text: &str, start: usize, end: usize) -> Self {
        let prefix = &text[..start.min(text.len())];
        let line = prefix.matches('\n').count() + 1;
        let line_start = prefix.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = prefix[line_start..].chars().count() + 1;
        Self::new(start, end, line, column)
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `other` lies entirely inside this span
    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// `line:column` locator used in reports
    pub fn locator(&self) -> String {
        format!("{}:{}", self.line, self.column)
    }
}

/// A located fragment of source text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Part {
    pub text: String,
    pub span: Span,
}

impl Part {
    pub fn new<S: Into<String>>(text: S, span: Span) -> Self {
        Self {
            text: text.into(),
            span,
        }
    }

    /// Part covering `text[start..end]`
    pub fn slice(text: &str, start: usize, end: usize) -> Self {
        Self::new(&text[start..end], Span::locate(text, start, end))
    }
}

/// Identity of a site in a report, detached from the syntax tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteRef {
    pub id: usize,
    pub kind: SiteKind,
    pub name: String,
    pub span: Span,
    /// First line of the site text, shortened
    pub snippet: String,
}

/// A rule matched at a site, with the text captured for each template slot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionHit {
    pub site: SiteRef,
    pub rule_id: RuleId,
    pub family: ServiceFamily,
    pub priority: i32,
    /// Slot-indexed captures; `None` when the site lacks that sub-element
    pub captures: Vec<Option<Part>>,
}

impl DetectionHit {
    /// Indexes of slots that could not be captured
    pub fn missing_slots(&self) -> Vec<usize> {
        self.captures
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_none())
            .map(|(i, _)| i)
            .collect()
    }
}

/// Why a provider site was left untouched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum UnmappedReason {
    /// Matches a provider naming convention but no rule's full shape
    NoMatchingRule,
    /// The matching rule could not bind all of its slots
    BindingMismatch {
        rule_id: RuleId,
        missing_slots: Vec<usize>,
    },
    /// The rule needs a fuller structural representation than the adapter has
    CapabilityUnsupported {
        rule_id: RuleId,
        required: Fidelity,
        available: Fidelity,
    },
    /// A wrapper rule applies only around a rewritten call
    NestedRewriteMissing { rule_id: RuleId },
    /// The site sits inside a provider call that is left as written, or the
    /// rule applies only within a rewritten call and none encloses it
    EnclosingRewriteMissing { rule_id: RuleId },
}

impl fmt::Display for UnmappedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnmappedReason::NoMatchingRule => write!(f, "no catalog rule matches this construct"),
            UnmappedReason::BindingMismatch {
                rule_id,
                missing_slots,
            } => write!(
                f,
                "rule '{}' could not bind slot(s) {:?}",
                rule_id, missing_slots
            ),
            UnmappedReason::CapabilityUnsupported {
                rule_id,
                required,
                available,
            } => write!(
                f,
                "rule '{}' requires {} fidelity, adapter offers {}",
                rule_id, required, available
            ),
            UnmappedReason::NestedRewriteMissing { rule_id } => write!(
                f,
                "rule '{}' only applies around a rewritten call",
                rule_id
            ),
            UnmappedReason::EnclosingRewriteMissing { rule_id } => write!(
                f,
                "rule '{}' only applies inside a rewritten call",
                rule_id
            ),
        }
    }
}

/// A provider site the engine could not migrate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnmappedSite {
    pub site: SiteRef,
    #[serde(flatten)]
    pub reason: UnmappedReason,
    /// Family of the closest candidate rule, when one exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<ServiceFamily>,
}

/// Where a cleanup edit came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupOrigin {
    /// A catalog cleanup rule
    Catalog,
    /// A source-provider import left unreferenced by cleanup edits
    OrphanedImport,
    /// Language idiom left empty by import removal
    IdiomDebris,
}

/// One residual cleanup edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupAction {
    pub rule_id: String,
    pub origin: CleanupOrigin,
    pub line: usize,
    pub before: String,
    pub after: String,
}

/// Overall outcome of a completed request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Every provider site migrated and every validator check passed
    Success,
    /// Some sites or checks are unresolved; see the result's lists
    Partial,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => f.write_str("success"),
            Outcome::Partial => f.write_str("partial"),
        }
    }
}

/// Input of one transformation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformRequest {
    pub source_text: String,
    pub language: LanguageVariant,
    pub source_provider: ProviderId,
    pub target_provider: ProviderId,
}

impl TransformRequest {
    pub fn new<T, S, D>(source_text: T, language: LanguageVariant, source: S, target: D) -> Self
    where
        T: Into<String>,
        S: Into<ProviderId>,
        D: Into<ProviderId>,
    {
        Self {
            source_text: source_text.into(),
            language,
            source_provider: source.into(),
            target_provider: target.into(),
        }
    }
}

/// Everything a completed request produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformResult {
    pub output: String,
    pub outcome: Outcome,
    /// Hits whose rewrite was applied
    pub hits: Vec<DetectionHit>,
    /// Provider sites left as they were
    pub unmapped: Vec<UnmappedSite>,
    pub cleanup: Vec<CleanupAction>,
    pub validation: ValidationReport,
    pub report: CoverageReport,
    pub metadata: TransformMetadata,
}

impl TransformResult {
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }

    /// Names of the unmapped constructs, in document order
    pub fn unmapped_names(&self) -> Vec<&str> {
        self.unmapped.iter().map(|u| u.site.name.as_str()).collect()
    }
}

/// Metadata about a transformation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformMetadata {
    pub catalog_version: String,
    pub source_provider: ProviderId,
    pub target_provider: ProviderId,
    pub language: LanguageVariant,
    pub timestamp: String,
    pub duration_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_locate() {
        let text = "a\nbc\ndef";
        let span = Span::locate(text, 5, 8);
        assert_eq!((span.line, span.column), (3, 1));
        let span = Span::locate(text, 3, 4);
        assert_eq!((span.line, span.column), (2, 2));
        assert_eq!(span.locator(), "2:2");
    }

    #[test]
    fn test_span_containment() {
        let outer = Span::new(0, 10, 1, 1);
        let inner = Span::new(2, 5, 1, 3);
        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(outer.overlaps(&inner));
        assert!(!Span::new(0, 2, 1, 1).overlaps(&Span::new(2, 4, 1, 3)));
    }

    #[test]
    fn test_missing_slots() {
        let hit = DetectionHit {
            site: SiteRef {
                id: 0,
                kind: SiteKind::Call,
                name: "putObject".to_string(),
                span: Span::default(),
                snippet: String::new(),
            },
            rule_id: RuleId::new("r"),
            family: ServiceFamily::new("object_storage"),
            priority: 0,
            captures: vec![Some(Part::new("s3", Span::default())), None, None],
        };
        assert_eq!(hit.missing_slots(), vec![1, 2]);
    }

    #[test]
    fn test_unmapped_reason_serialization() {
        let reason = UnmappedReason::BindingMismatch {
            rule_id: RuleId::new("js.s3.put-object"),
            missing_slots: vec![2],
        };
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(json["reason"], "binding_mismatch");
        assert_eq!(json["missing_slots"][0], 2);
    }
}
