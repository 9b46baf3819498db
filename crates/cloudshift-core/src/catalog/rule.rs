//! Compiled pattern rules

use crate::error::{Error, Result};
use crate::syntax::{ArgValue, Site};
use crate::types::{Part, RuleId, ServiceFamily};
use cloudshift_schemas::template::{parse_template, TemplateSegment};
use cloudshift_schemas::{
    CaptureDocument, CapturePart, CleanupDocument, CleanupScope, Fidelity, ImportDocument,
    LanguageScope, LanguageVariant, RuleDocument, SiteKind,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A rule ready for matching
#[derive(Debug, Clone)]
pub struct PatternRule {
    pub id: RuleId,
    pub family: ServiceFamily,
    pub language: LanguageVariant,
    pub priority: i32,
    pub description: Option<String>,
    pub matcher: Matcher,
    pub rewrite: RewriteTemplate,
}

impl PatternRule {
    pub fn compile(doc: &RuleDocument) -> Result<Self> {
        let language = match doc.language {
            LanguageScope::Only(variant) => variant,
            LanguageScope::Any => {
                return Err(Error::catalog(format!(
                    "rule '{}' must target a single language variant",
                    doc.id
                )))
            }
        };

        let matcher = &doc.matcher;
        let receiver = matcher
            .receiver
            .as_deref()
            .map(|pattern| compile_regex(pattern, &doc.id))
            .transpose()?;

        let segments = parse_template(&doc.rewrite.template)
            .map_err(|e| Error::catalog(format!("rule '{}': {}", doc.id, e)))?;
        let captures = doc
            .rewrite
            .captures
            .iter()
            .map(|c| Capture::compile(c, &doc.id))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            id: RuleId::new(&doc.id),
            family: ServiceFamily::new(&doc.family),
            language,
            priority: doc.priority,
            description: doc.description.clone(),
            matcher: Matcher {
                kind: matcher.kind,
                name: (matcher.name != "*").then(|| matcher.name.clone()),
                receiver,
                min_args: matcher.min_args.unwrap_or(0),
                max_args: matcher.max_args,
                literal_args: matcher.literal_args.clone(),
                construct_args: matcher.construct_args.clone(),
                receiver_from: matcher.receiver_from.clone(),
            },
            rewrite: RewriteTemplate {
                source: doc.rewrite.template.clone(),
                segments,
                captures,
                imports: doc.rewrite.imports.iter().map(ImportSpec::from).collect(),
                requires: doc.rewrite.requires,
                requires_nested_rewrite: doc.rewrite.requires_nested_rewrite,
                requires_enclosing_rewrite: doc.rewrite.requires_enclosing_rewrite,
            },
        })
    }

    /// Bind every capture at a site; `None` entries mark unbindable slots
    pub fn capture(&self, site: &Site) -> Vec<Option<Part>> {
        self.rewrite
            .captures
            .iter()
            .map(|capture| capture.resolve(site))
            .collect()
    }
}

/// Construct shape a rule recognizes
#[derive(Debug, Clone)]
pub struct Matcher {
    pub kind: SiteKind,
    /// `None` matches any name
    pub name: Option<String>,
    pub receiver: Option<Regex>,
    pub min_args: usize,
    pub max_args: Option<usize>,
    pub literal_args: BTreeMap<usize, String>,
    pub construct_args: BTreeMap<usize, String>,
    /// Producers the receiver must trace back to; empty accepts any receiver
    pub receiver_from: Vec<String>,
}

impl Matcher {
    pub fn matches(&self, site: &Site) -> bool {
        if site.kind != self.kind {
            return false;
        }
        if let Some(name) = &self.name {
            if site.name.text != *name {
                return false;
            }
        }
        if let Some(receiver) = &self.receiver {
            match &site.receiver {
                Some(part) if receiver.is_match(&part.text) => {}
                _ => return false,
            }
        }

        let arity = site.arity();
        if arity < self.min_args || self.max_args.is_some_and(|max| arity > max) {
            return false;
        }

        let literals_hold = self.literal_args.iter().all(|(index, expected)| {
            matches!(site.positional(*index).map(|a| &a.value), Some(ArgValue::Str(s)) if s == expected)
        });
        let constructs_hold = self.construct_args.iter().all(|(index, expected)| {
            matches!(
                site.positional(*index).map(|a| &a.value),
                Some(ArgValue::Construct { name, .. }) if type_name_matches(name, expected)
            )
        });
        literals_hold && constructs_hold
    }

    /// Inclusive upper arity bound, `usize::MAX` when open
    pub fn upper(&self) -> usize {
        self.max_args.unwrap_or(usize::MAX)
    }
}

/// `s3.PutObjectInput` matches `PutObjectInput` and itself
pub fn type_name_matches(actual: &str, expected: &str) -> bool {
    actual == expected
        || actual
            .strip_suffix(expected)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Source of one template slot
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capture {
    Arg { index: usize, field: Option<String> },
    Keyword { name: String, field: Option<String> },
    Param(usize),
    Part(CapturePart),
}

impl Capture {
    fn compile(doc: &CaptureDocument, rule_id: &str) -> Result<Self> {
        let capture = match (doc.arg, &doc.keyword, doc.param, doc.part) {
            (Some(index), None, None, None) => Capture::Arg {
                index,
                field: doc.field.clone(),
            },
            (None, Some(name), None, None) => Capture::Keyword {
                name: name.clone(),
                field: doc.field.clone(),
            },
            (None, None, Some(index), None) if doc.field.is_none() => Capture::Param(index),
            (None, None, None, Some(part)) if doc.field.is_none() => Capture::Part(part),
            _ => {
                return Err(Error::catalog(format!(
                    "rule '{}' has a capture without exactly one source",
                    rule_id
                )))
            }
        };
        Ok(capture)
    }

    /// Text this capture takes from a site
    pub fn resolve(&self, site: &Site) -> Option<Part> {
        match self {
            Capture::Arg { index, field } => {
                let arg = site.positional(*index)?;
                match field {
                    None => Some(arg.part.clone()),
                    Some(path) => arg.value.field_path(path).map(|f| f.part.clone()),
                }
            }
            Capture::Keyword { name, field } => {
                let arg = site.keyword(name)?;
                match field {
                    None => Some(arg.part.clone()),
                    Some(path) => arg.value.field_path(path).map(|f| f.part.clone()),
                }
            }
            Capture::Param(index) => site.params.get(*index).cloned(),
            Capture::Part(CapturePart::Receiver) => site.receiver.clone(),
            Capture::Part(CapturePart::Body) => site.body.clone(),
            Capture::Part(CapturePart::Binding) => site.binding.clone(),
            Capture::Part(CapturePart::Name) => Some(site.name.clone()),
            Capture::Part(CapturePart::Callback) => site
                .args
                .last()
                .filter(|a| matches!(a.value, ArgValue::Function { .. }))
                .map(|a| a.part.clone()),
        }
    }
}

/// Replacement text with slots, plus what applying it needs
#[derive(Debug, Clone)]
pub struct RewriteTemplate {
    pub source: String,
    pub segments: Vec<TemplateSegment>,
    pub captures: Vec<Capture>,
    pub imports: Vec<ImportSpec>,
    pub requires: Fidelity,
    pub requires_nested_rewrite: bool,
    pub requires_enclosing_rewrite: bool,
}

/// Import required by target code
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImportSpec {
    pub module: String,
    pub names: Vec<String>,
    pub alias: Option<String>,
}

impl ImportSpec {
    pub fn named<M: Into<String>>(module: M, names: &[&str]) -> Self {
        Self {
            module: module.into(),
            names: names.iter().map(|n| n.to_string()).collect(),
            alias: None,
        }
    }

    /// Names this import binds in the file
    pub fn bindings(&self) -> Vec<String> {
        let mut bound = self.names.clone();
        if let Some(alias) = &self.alias {
            bound.push(alias.clone());
        }
        bound
    }
}

impl From<&ImportDocument> for ImportSpec {
    fn from(doc: &ImportDocument) -> Self {
        Self {
            module: doc.module.clone(),
            names: doc.names.clone(),
            alias: doc.alias.clone(),
        }
    }
}

/// Compiled residual cleanup rule
#[derive(Debug, Clone)]
pub struct CleanupRule {
    pub id: String,
    pub language: LanguageScope,
    pub scope: CleanupScope,
    pub pattern: Regex,
    pub replacement: String,
}

impl CleanupRule {
    pub fn compile(doc: &CleanupDocument) -> Result<Self> {
        Ok(Self {
            id: doc.id.clone(),
            language: doc.language,
            scope: doc.scope,
            pattern: compile_regex(&doc.pattern, &doc.id)?,
            replacement: doc.replacement.clone(),
        })
    }
}

fn compile_regex(pattern: &str, owner: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::CatalogLoad {
        message: format!("'{}' has an invalid pattern '{}'", owner, pattern),
        source: Some(anyhow::Error::new(e)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::{Argument, Field};
    use crate::types::Span;

    fn part(text: &str) -> Part {
        Part::new(text, Span::default())
    }

    fn rule(yaml: &str) -> PatternRule {
        PatternRule::compile(&serde_yaml::from_str(yaml).unwrap()).unwrap()
    }

    fn put_object_site() -> Site {
        let mut site = Site::new(SiteKind::Call, Span::default(), part("putObject"));
        site.receiver = Some(part("s3"));
        site.args.push(Argument {
            keyword: None,
            part: part("{ Bucket: 'b', Key: k }"),
            value: ArgValue::Object(vec![
                Field {
                    key: "Bucket".to_string(),
                    part: part("'b'"),
                    value: ArgValue::Str("b".to_string()),
                },
                Field {
                    key: "Key".to_string(),
                    part: part("k"),
                    value: ArgValue::Identifier("k".to_string()),
                },
            ]),
        });
        site
    }

    const PUT: &str = r#"
id: js.s3.put-object
family: object_storage
language: js
match: { kind: call, name: putObject, receiver: '^s3$', max_args: 1 }
rewrite:
  template: "$0.upload($1, $2)"
  captures: [{ part: receiver }, { arg: 0, field: Bucket }, { arg: 0, field: Body }]
"#;

    #[test]
    fn test_matcher_shape() {
        let rule = rule(PUT);
        let site = put_object_site();
        assert!(rule.matcher.matches(&site));

        let mut other = site.clone();
        other.receiver = Some(part("dynamo"));
        assert!(!rule.matcher.matches(&other));

        let mut two_args = site.clone();
        two_args.args.push(two_args.args[0].clone());
        assert!(!rule.matcher.matches(&two_args));
    }

    #[test]
    fn test_capture_reports_missing_field() {
        let rule = rule(PUT);
        let captures = rule.capture(&put_object_site());
        assert_eq!(captures[0].as_ref().map(|p| p.text.as_str()), Some("s3"));
        assert_eq!(captures[1].as_ref().map(|p| p.text.as_str()), Some("'b'"));
        assert!(captures[2].is_none());
    }

    #[test]
    fn test_literal_and_construct_constraints() {
        let rule = rule(
            r#"
id: py.boto3.s3-client
family: object_storage
language: python
match: { kind: call, name: client, literal_args: { 0: s3 } }
rewrite: { template: "x" }
"#,
        );
        let mut site = Site::new(SiteKind::Call, Span::default(), part("client"));
        site.args.push(Argument {
            keyword: None,
            part: part("'s3'"),
            value: ArgValue::Str("s3".to_string()),
        });
        assert!(rule.matcher.matches(&site));
        site.args[0].value = ArgValue::Str("dynamodb".to_string());
        assert!(!rule.matcher.matches(&site));

        assert!(type_name_matches("s3.PutObjectInput", "PutObjectInput"));
        assert!(type_name_matches("PutObjectInput", "PutObjectInput"));
        assert!(!type_name_matches("XPutObjectInput", "PutObjectInput"));
    }

    #[test]
    fn test_wildcard_name() {
        let rule = rule(
            r#"
id: any-call
family: object_storage
language: go
match: { kind: call, name: "*" }
rewrite: { template: "x" }
"#,
        );
        assert!(rule.matcher.name.is_none());
        assert!(rule.matcher.matches(&put_object_site()));
    }
}
