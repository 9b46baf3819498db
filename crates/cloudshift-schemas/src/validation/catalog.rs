//! Document-level validation of pattern catalogs
//!
//! These checks need nothing beyond the document itself. Matcher overlap is
//! checked by the engine once rules are compiled.
//!
//! Copyright (c) 2025 CloudShift Team
//! Licensed under the Apache-2.0 license

use crate::catalog::{
    CaptureDocument, CapturePart, CatalogDocument, CleanupDocument, LanguageScope,
    MappingDocument, ProviderDocument, RuleDocument, SiteKind,
};
use crate::template::{max_slot, parse_template};
use crate::validation::error::{ValidationError, ValidationErrors, ValidationResult};
use crate::versioning::CatalogVersion;
use regex::Regex;
use std::collections::{BTreeSet, HashSet};

/// Validator for merged catalog documents
#[derive(Debug, Default, Clone)]
pub struct CatalogValidator;

impl CatalogValidator {
    pub fn new() -> Self {
        Self
    }

    /// Run every document check, collecting all failures
    pub fn validate(&self, document: &CatalogDocument) -> ValidationResult<()> {
        let mut errors = ValidationErrors::new();

        self.check_version(document, &mut errors);
        let families = self.check_families(document, &mut errors);
        let providers = self.check_providers(document, &families, &mut errors);

        let mut pairs = HashSet::new();
        for (index, mapping) in document.mappings.iter().enumerate() {
            let path = format!("mappings[{}]", index);
            if !pairs.insert((mapping.source.as_str(), mapping.target.as_str())) {
                errors.push(ValidationError::violation(
                    &path,
                    "provider pair declared twice",
                    "unique_mapping",
                    "one mapping per (source, target)",
                    format!("{} -> {}", mapping.source, mapping.target),
                ));
            }
            self.check_mapping(mapping, &path, &providers, &families, &mut errors);
        }

        errors.into_result()
    }

    fn check_version(&self, document: &CatalogDocument, errors: &mut ValidationErrors) {
        match &document.catalog_version {
            None => errors.push(ValidationError::violation(
                "catalog_version",
                "catalog version is required",
                "required_version",
                "a semantic version",
                "nothing",
            )),
            Some(version) => {
                if let Err(e) = CatalogVersion::parse(version) {
                    errors.push(ValidationError::violation(
                        "catalog_version",
                        e.to_string(),
                        "semantic_version",
                        "X.Y.Z",
                        version.clone(),
                    ));
                }
            }
        }
    }

    fn check_families(&self, document: &CatalogDocument, errors: &mut ValidationErrors) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        for (index, family) in document.families.iter().enumerate() {
            let path = format!("families[{}].id", index);
            if family.id.trim().is_empty() {
                errors.push(ValidationError::violation(&path, "family id is empty", "non_empty_id", "an identifier", "\"\""));
            } else if !seen.insert(family.id.clone()) {
                errors.push(ValidationError::violation(&path, "family declared twice", "unique_family", "an unused id", family.id.clone()));
            }
        }
        seen
    }

    fn check_providers(
        &self,
        document: &CatalogDocument,
        families: &BTreeSet<String>,
        errors: &mut ValidationErrors,
    ) -> BTreeSet<String> {
        let mut seen = BTreeSet::new();
        for (index, provider) in document.providers.iter().enumerate() {
            let path = format!("providers[{}]", index);
            if provider.id.trim().is_empty() {
                errors.push(ValidationError::violation(format!("{}.id", path), "provider id is empty", "non_empty_id", "an identifier", "\"\""));
            } else if !seen.insert(provider.id.clone()) {
                errors.push(ValidationError::violation(format!("{}.id", path), "provider declared twice", "unique_provider", "an unused id", provider.id.clone()));
            }
            self.check_markers(provider, &path, families, errors);
        }
        seen
    }

    fn check_markers(
        &self,
        provider: &ProviderDocument,
        path: &str,
        families: &BTreeSet<String>,
        errors: &mut ValidationErrors,
    ) {
        for (family, patterns) in &provider.markers {
            let family_path = format!("{}.markers.{}", path, family);
            if !families.contains(family) {
                errors.push(ValidationError::violation(&family_path, "markers for an undeclared family", "declared_family", "a family listed under `families`", family.clone()));
            }
            for (i, pattern) in patterns.iter().enumerate() {
                check_regex(pattern, &format!("{}[{}]", family_path, i), errors);
            }
        }
    }

    fn check_mapping(
        &self,
        mapping: &MappingDocument,
        path: &str,
        providers: &BTreeSet<String>,
        families: &BTreeSet<String>,
        errors: &mut ValidationErrors,
    ) {
        for (field, provider) in [("source", &mapping.source), ("target", &mapping.target)] {
            if !providers.contains(provider) {
                errors.push(ValidationError::violation(
                    format!("{}.{}", path, field),
                    "mapping refers to an undeclared provider",
                    "declared_provider",
                    "a provider listed under `providers`",
                    provider.clone(),
                ));
            }
        }
        if mapping.source == mapping.target {
            errors.push(ValidationError::violation(path, "mapping source and target are the same provider", "distinct_providers", "two different providers", mapping.source.clone()));
        }

        // Rule and cleanup ids are looked up within their own mapping
        let mut entry_ids = HashSet::new();
        for (index, rule) in mapping.rules.iter().enumerate() {
            let rule_path = format!("{}.rules[{}]", path, index);
            if !entry_ids.insert(rule.id.as_str()) {
                errors.push(ValidationError::violation(format!("{}.id", rule_path), "rule id is not unique", "unique_rule_id", "an unused id", rule.id.clone()));
            }
            self.check_rule(rule, &rule_path, families, errors);
        }

        for (index, cleanup) in mapping.cleanup.iter().enumerate() {
            let cleanup_path = format!("{}.cleanup[{}]", path, index);
            if !entry_ids.insert(cleanup.id.as_str()) {
                errors.push(ValidationError::violation(format!("{}.id", cleanup_path), "cleanup id is not unique", "unique_rule_id", "an unused id", cleanup.id.clone()));
            }
            self.check_cleanup(cleanup, &cleanup_path, errors);
        }
    }

    fn check_rule(
        &self,
        rule: &RuleDocument,
        path: &str,
        families: &BTreeSet<String>,
        errors: &mut ValidationErrors,
    ) {
        if !families.contains(&rule.family) {
            errors.push(ValidationError::violation(format!("{}.family", path), "rule uses an undeclared family", "declared_family", "a family listed under `families`", rule.family.clone()));
        }
        if rule.language == LanguageScope::Any {
            errors.push(ValidationError::violation(
                format!("{}.language", path),
                "structural rules must target one language variant",
                "concrete_language",
                "js, ts, python or go",
                "any",
            ));
        }

        let matcher = &rule.matcher;
        if matcher.kind == SiteKind::Import {
            errors.push(ValidationError::violation(
                format!("{}.match.kind", path),
                "imports are reconciled automatically and cannot be matched by rules",
                "matchable_kind",
                "construction, call, handler or type_reference",
                "import",
            ));
        }
        if matcher.name.trim().is_empty() {
            errors.push(ValidationError::violation(format!("{}.match.name", path), "matcher name is empty", "non_empty_name", "a name or `*`", "\"\""));
        }
        if let Some(receiver) = &matcher.receiver {
            check_regex(receiver, &format!("{}.match.receiver", path), errors);
        }
        if !matcher.receiver_from.is_empty() && matcher.kind != SiteKind::Call {
            errors.push(ValidationError::violation(
                format!("{}.match.receiver_from", path),
                "only call sites have a receiver to trace",
                "receiver_origin_kind",
                "call",
                matcher.kind.to_string(),
            ));
        }
        if let (Some(min), Some(max)) = (matcher.min_args, matcher.max_args) {
            if min > max {
                errors.push(ValidationError::violation(format!("{}.match", path), "min_args exceeds max_args", "arity_range", format!("min_args <= {}", max), min.to_string()));
            }
        }

        for (index, capture) in rule.rewrite.captures.iter().enumerate() {
            check_capture(capture, matcher.kind, &format!("{}.rewrite.captures[{}]", path, index), errors);
        }

        match parse_template(&rule.rewrite.template) {
            Ok(segments) => {
                if let Some(max) = max_slot(&segments) {
                    if max >= rule.rewrite.captures.len() {
                        errors.push(ValidationError::violation(
                            format!("{}.rewrite.template", path),
                            "template refers to a slot with no capture",
                            "bound_slot",
                            format!("slots below {}", rule.rewrite.captures.len()),
                            format!("${}", max),
                        ));
                    }
                }
            }
            Err(e) => errors.push(ValidationError::new(format!("{}.rewrite.template", path), e.to_string())),
        }

        for (index, import) in rule.rewrite.imports.iter().enumerate() {
            if import.module.trim().is_empty() {
                errors.push(ValidationError::violation(format!("{}.rewrite.imports[{}].module", path, index), "import module is empty", "non_empty_module", "a module path", "\"\""));
            }
        }
    }

    fn check_cleanup(&self, cleanup: &CleanupDocument, path: &str, errors: &mut ValidationErrors) {
        if cleanup.pattern.is_empty() {
            errors.push(ValidationError::violation(format!("{}.pattern", path), "cleanup pattern is empty", "non_empty_pattern", "a regex", "\"\""));
            return;
        }
        check_regex(&cleanup.pattern, &format!("{}.pattern", path), errors);
    }
}

fn check_regex(pattern: &str, path: &str, errors: &mut ValidationErrors) {
    if let Err(e) = Regex::new(pattern) {
        errors.push(ValidationError::violation(path, "regular expression does not compile", "valid_regex", "a valid regex", e.to_string()));
    }
}

fn check_capture(capture: &CaptureDocument, kind: SiteKind, path: &str, errors: &mut ValidationErrors) {
    if capture.source_count() != 1 {
        errors.push(ValidationError::violation(
            path,
            "a capture names exactly one of arg, keyword, param, part",
            "single_capture_source",
            "1 source",
            capture.source_count().to_string(),
        ));
        return;
    }
    if capture.field.is_some() && capture.arg.is_none() && capture.keyword.is_none() {
        errors.push(ValidationError::violation(path, "field paths apply to arg or keyword captures", "field_on_argument", "arg or keyword", "other capture"));
    }

    let argument_like = matches!(kind, SiteKind::Call | SiteKind::Construction);
    let allowed = if capture.arg.is_some() || capture.keyword.is_some() {
        argument_like
    } else if capture.param.is_some() {
        kind == SiteKind::Handler
    } else {
        match capture.part {
            Some(CapturePart::Body) => kind == SiteKind::Handler,
            Some(CapturePart::Receiver) => argument_like || kind == SiteKind::TypeReference,
            Some(CapturePart::Callback) | Some(CapturePart::Binding) => argument_like,
            Some(CapturePart::Name) | None => true,
        }
    };
    if !allowed {
        errors.push(ValidationError::violation(path, "capture source does not exist on this site kind", "capture_kind", "a source the matched site provides", kind.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(rules_yaml: &str) -> CatalogDocument {
        let yaml = format!(
            r#"
catalog_version: 1.0.0
families:
  - id: object_storage
providers:
  - id: aws
    markers:
      object_storage: ['\bS3\b']
  - id: azure
mappings:
  - source: aws
    target: azure
    rules:
{}
"#,
            rules_yaml
        );
        serde_yaml::from_str(&yaml).unwrap()
    }

    const GOOD_RULE: &str = r#"
      - id: r1
        family: object_storage
        language: js
        match: { kind: call, name: putObject, max_args: 1 }
        rewrite:
          template: "$0.upload($1)"
          captures: [{ part: receiver }, { arg: 0, field: Body }]
"#;

    #[test]
    fn test_valid_document() {
        assert!(CatalogValidator::new().validate(&document(GOOD_RULE)).is_ok());
    }

    #[test]
    fn test_duplicate_rule_ids() {
        let doc = document(&format!("{}{}", GOOD_RULE, GOOD_RULE));
        let errors = CatalogValidator::new().validate(&doc).unwrap_err();
        assert!(errors.has_rule("unique_rule_id"));
    }

    #[test]
    fn test_rule_ids_scoped_to_mapping() {
        let mut doc = document(GOOD_RULE);
        doc.providers.push(serde_yaml::from_str("id: gcp").unwrap());
        let mut second = doc.mappings[0].clone();
        second.target = "gcp".to_string();
        doc.mappings.push(second);
        assert!(CatalogValidator::new().validate(&doc).is_ok());
    }

    #[test]
    fn test_unbound_template_slot() {
        let doc = document(&GOOD_RULE.replace("$0.upload($1)", "$0.upload($1, $2)"));
        let errors = CatalogValidator::new().validate(&doc).unwrap_err();
        assert!(errors.has_rule("bound_slot"));
    }

    #[test]
    fn test_language_agnostic_structural_rule() {
        let doc = document(&GOOD_RULE.replace("language: js", "language: any"));
        let errors = CatalogValidator::new().validate(&doc).unwrap_err();
        assert!(errors.has_rule("concrete_language"));
    }

    #[test]
    fn test_bad_receiver_regex() {
        let doc = document(&GOOD_RULE.replace("max_args: 1 }", "max_args: 1, receiver: '(' }"));
        let errors = CatalogValidator::new().validate(&doc).unwrap_err();
        assert!(errors.has_rule("valid_regex"));
    }

    #[test]
    fn test_receiver_origin_on_construction() {
        let doc = document(&GOOD_RULE.replace(
            "kind: call, name: putObject, max_args: 1 }",
            "kind: construction, name: S3, max_args: 1, receiver_from: [Session] }",
        ));
        let errors = CatalogValidator::new().validate(&doc).unwrap_err();
        assert!(errors.has_rule("receiver_origin_kind"));
    }

    #[test]
    fn test_param_capture_on_call() {
        let doc = document(&GOOD_RULE.replace("{ part: receiver }", "{ param: 0 }"));
        let errors = CatalogValidator::new().validate(&doc).unwrap_err();
        assert!(errors.has_rule("capture_kind"));
    }

    #[test]
    fn test_undeclared_family_and_provider() {
        let mut doc = document(&GOOD_RULE.replace("family: object_storage", "family: queues"));
        doc.mappings[0].target = "gcp".to_string();
        let errors = CatalogValidator::new().validate(&doc).unwrap_err();
        assert!(errors.has_rule("declared_family"));
        assert!(errors.has_rule("declared_provider"));
    }

    #[test]
    fn test_missing_version() {
        let mut doc = document(GOOD_RULE);
        doc.catalog_version = None;
        let errors = CatalogValidator::new().validate(&doc).unwrap_err();
        assert!(errors.has_rule("required_version"));
    }
}
