//! Coverage tracking
//!
//! Every non-fatal condition met while serving a request becomes a
//! [`Finding`]: unmapped sites, failed bindings, cleanup edits and validator
//! failures. The tracker assigns severities and the final
//! [`CoverageReport`] summarizes them by severity and code.

use crate::error::{FindingCode, Severity};
use crate::types::{CleanupAction, ServiceFamily, UnmappedReason, UnmappedSite};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One non-fatal finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    pub code: FindingCode,
    /// `line:column` of the site, or the family id for presence findings
    pub path: String,
    pub message: String,
    pub severity: Severity,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub before: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub after: Option<String>,
}

/// Findings of one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageReport {
    pub items: Vec<Finding>,
    pub max_severity: Severity,
    pub summary: CoverageSummary,
}

impl CoverageReport {
    pub fn has_errors(&self) -> bool {
        self.max_severity >= Severity::Error
    }

    pub fn count(&self, code: FindingCode) -> usize {
        self.items.iter().filter(|i| i.code == code).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CoverageSummary {
    pub total_items: usize,
    pub by_severity: BTreeMap<String, usize>,
    pub by_code: BTreeMap<String, usize>,
}

/// Collects findings while a request runs
#[derive(Debug, Default)]
pub struct CoverageTracker {
    items: Vec<Finding>,
}

impl CoverageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a provider site that was left untouched
    pub fn add_unmapped(&mut self, unmapped: &UnmappedSite) {
        let code = match unmapped.reason {
            UnmappedReason::NoMatchingRule => FindingCode::Unmapped,
            UnmappedReason::BindingMismatch { .. } => FindingCode::BindingMismatch,
            UnmappedReason::CapabilityUnsupported { .. } => FindingCode::CapabilityUnsupported,
            UnmappedReason::NestedRewriteMissing { .. } => FindingCode::NestedRewriteMissing,
            UnmappedReason::EnclosingRewriteMissing { .. } => FindingCode::EnclosingRewriteMissing,
        };
        let message = format!(
            "{} '{}' left unchanged: {}",
            unmapped.site.kind, unmapped.site.name, unmapped.reason
        );
        self.push(
            code,
            unmapped.site.span.locator(),
            message,
            Some(unmapped.site.snippet.clone()),
            None,
        );
    }

    pub fn add_cleanup(&mut self, action: &CleanupAction) {
        self.push(
            FindingCode::CleanupApplied,
            format!("{}:1", action.line),
            format!("cleanup '{}' rewrote a residual fragment", action.rule_id),
            Some(action.before.clone()),
            Some(action.after.clone()),
        );
    }

    pub fn add_syntax_invalid(&mut self, locator: &str, message: &str) {
        self.push(
            FindingCode::SyntaxInvalid,
            locator.to_string(),
            format!("output does not parse: {}", message),
            None,
            None,
        );
    }

    pub fn add_residual(&mut self, locator: &str, snippet: &str) {
        self.push(
            FindingCode::ResidualPattern,
            locator.to_string(),
            "source-provider pattern remains in the output".to_string(),
            Some(snippet.to_string()),
            None,
        );
    }

    pub fn add_target_missing(&mut self, family: &ServiceFamily, target: &str) {
        self.push(
            FindingCode::TargetMissing,
            family.to_string(),
            format!("no {} construct found for family '{}'", target, family),
            None,
            None,
        );
    }

    pub fn add_item(&mut self, item: Finding) {
        self.items.push(item);
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|item| item.severity >= Severity::Error)
    }

    fn push(
        &mut self,
        code: FindingCode,
        path: String,
        message: String,
        before: Option<String>,
        after: Option<String>,
    ) {
        self.items.push(Finding {
            code,
            path,
            message,
            severity: severity_of(code),
            before,
            after,
        });
    }

    /// Build the final report
    pub fn build_report(self) -> CoverageReport {
        let max_severity = self
            .items
            .iter()
            .map(|item| item.severity)
            .max()
            .unwrap_or(Severity::Info);

        let mut by_severity = BTreeMap::new();
        let mut by_code = BTreeMap::new();
        for item in &self.items {
            *by_severity.entry(item.severity.to_string()).or_insert(0) += 1;
            *by_code.entry(item.code.to_string()).or_insert(0) += 1;
        }

        let summary = CoverageSummary {
            total_items: self.items.len(),
            by_severity,
            by_code,
        };

        CoverageReport {
            items: self.items,
            max_severity,
            summary,
        }
    }
}

fn severity_of(code: FindingCode) -> Severity {
    match code {
        // Output that no longer parses cannot be used at all
        FindingCode::SyntaxInvalid => Severity::Critical,
        FindingCode::ResidualPattern | FindingCode::TargetMissing => Severity::Error,
        FindingCode::Unmapped
        | FindingCode::BindingMismatch
        | FindingCode::CapabilityUnsupported
        | FindingCode::NestedRewriteMissing
        | FindingCode::EnclosingRewriteMissing => Severity::Warning,
        FindingCode::CleanupApplied => Severity::Info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CleanupOrigin, RuleId, SiteRef, Span};
    use cloudshift_schemas::SiteKind;

    fn unmapped(reason: UnmappedReason) -> UnmappedSite {
        UnmappedSite {
            site: SiteRef {
                id: 3,
                kind: SiteKind::Call,
                name: "copyObject".to_string(),
                span: Span::new(40, 60, 4, 5),
                snippet: "s3.copyObject(params)".to_string(),
            },
            reason,
            family: None,
        }
    }

    #[test]
    fn test_empty_report() {
        let report = CoverageTracker::new().build_report();
        assert!(report.items.is_empty());
        assert_eq!(report.max_severity, Severity::Info);
        assert!(!report.has_errors());
    }

    #[test]
    fn test_unmapped_findings() {
        let mut tracker = CoverageTracker::new();
        tracker.add_unmapped(&unmapped(UnmappedReason::NoMatchingRule));
        tracker.add_unmapped(&unmapped(UnmappedReason::BindingMismatch {
            rule_id: RuleId::new("js.s3.copy"),
            missing_slots: vec![1],
        }));
        let report = tracker.build_report();

        assert_eq!(report.items[0].code, FindingCode::Unmapped);
        assert_eq!(report.items[0].path, "4:5");
        assert!(report.items[0].message.contains("copyObject"));
        assert_eq!(report.items[1].code, FindingCode::BindingMismatch);
        assert_eq!(report.max_severity, Severity::Warning);
        assert_eq!(report.summary.by_severity.get("warning"), Some(&2));
    }

    #[test]
    fn test_validation_findings_raise_severity() {
        let mut tracker = CoverageTracker::new();
        tracker.add_cleanup(&CleanupAction {
            rule_id: "s3-uri".to_string(),
            origin: CleanupOrigin::Catalog,
            line: 2,
            before: "s3://b".to_string(),
            after: "https://b".to_string(),
        });
        assert!(!tracker.has_errors());
        tracker.add_target_missing(&ServiceFamily::new("object_storage"), "azure");
        assert!(tracker.has_errors());
        tracker.add_syntax_invalid("1:1", "unexpected syntax");

        let report = tracker.build_report();
        assert_eq!(report.max_severity, Severity::Critical);
        assert_eq!(report.count(FindingCode::CleanupApplied), 1);
        assert_eq!(report.summary.total_items, 3);
        assert_eq!(report.summary.by_code.get("TargetMissing"), Some(&1));
    }
}
