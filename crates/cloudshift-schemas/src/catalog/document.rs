//! Serde model of a pattern catalog file
//!
//! Every section is optional so a catalog can be split across several files
//! (provider profiles in one, one file per migration pair) and merged.
//!
//! Copyright (c) 2025 CloudShift Team
//! Licensed under the Apache-2.0 license

use super::kinds::{CapturePart, CleanupScope, Fidelity, LanguageScope, SiteKind};
use crate::validation::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root of a catalog file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_version: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default)]
    pub families: Vec<FamilyDocument>,

    #[serde(default)]
    pub providers: Vec<ProviderDocument>,

    #[serde(default)]
    pub mappings: Vec<MappingDocument>,
}

/// Declared service family
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FamilyDocument {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether the validator requires target markers for this family
    #[serde(default = "default_true")]
    pub verify_presence: bool,
}

/// Provider profile: how its code is recognized and what its target code looks like
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderDocument {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub signatures: SignatureDocument,

    /// Family id → regexes recognizing this provider's constructs in output
    #[serde(default)]
    pub markers: BTreeMap<String, Vec<String>>,
}

/// Naming conventions that associate code with a provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SignatureDocument {
    /// Substrings of import module paths
    #[serde(default)]
    pub modules: Vec<String>,

    /// Root identifiers bound to the provider without an import
    #[serde(default)]
    pub identifiers: Vec<String>,

    /// Resource URI schemes or prefixes found in string literals
    #[serde(default)]
    pub uri_schemes: Vec<String>,

    /// Conventional serverless entry point names
    #[serde(default)]
    pub handler_names: Vec<String>,

    /// Method names whose result is a provider client (`client`, `Table`, `New`)
    #[serde(default)]
    pub factories: Vec<String>,
}

/// Rules for one (source, target) provider pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MappingDocument {
    pub source: String,
    pub target: String,

    #[serde(default)]
    pub rules: Vec<RuleDocument>,

    #[serde(default)]
    pub cleanup: Vec<CleanupDocument>,
}

/// A structural rewrite rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDocument {
    pub id: String,
    pub family: String,
    pub language: LanguageScope,

    #[serde(default)]
    pub priority: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(rename = "match")]
    pub matcher: MatcherDocument,

    pub rewrite: RewriteDocument,
}

/// Construct shape a rule recognizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MatcherDocument {
    pub kind: SiteKind,

    /// Method, constructor, type or handler name; `*` matches any name
    pub name: String,

    /// Regex the receiver text must match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_args: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_args: Option<usize>,

    /// Positional argument index → required string literal value
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub literal_args: BTreeMap<usize, String>,

    /// Positional argument index → required constructed type name
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub construct_args: BTreeMap<usize, String>,

    /// Constructions or calls the receiver must come from, either bound to
    /// the receiver's variable or chained into it (`Table("users").put_item`)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub receiver_from: Vec<String>,
}

/// Replacement for a matched site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RewriteDocument {
    /// Target text with `$N` slots bound from `captures[N]`
    pub template: String,

    #[serde(default)]
    pub captures: Vec<CaptureDocument>,

    /// Target imports the rewritten code needs
    #[serde(default)]
    pub imports: Vec<ImportDocument>,

    /// Minimum adapter fidelity needed to apply the template safely
    #[serde(default)]
    pub requires: Fidelity,

    /// Only apply when a nested site inside the captures was itself rewritten
    #[serde(default)]
    pub requires_nested_rewrite: bool,

    /// Only apply inside the captures of a rewritten call
    #[serde(default)]
    pub requires_enclosing_rewrite: bool,
}

/// Where a template slot takes its text from; exactly one source is set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaptureDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arg: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part: Option<CapturePart>,

    /// Dotted field path inside an object-shaped `arg` or `keyword`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl CaptureDocument {
    /// Number of primary sources set on this capture
    pub fn source_count(&self) -> usize {
        [
            self.arg.is_some(),
            self.keyword.is_some(),
            self.param.is_some(),
            self.part.is_some(),
        ]
        .iter()
        .filter(|set| **set)
        .count()
    }
}

/// Import a rewrite depends on
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportDocument {
    pub module: String,

    #[serde(default)]
    pub names: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// Text-level residual cleanup rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CleanupDocument {
    pub id: String,

    #[serde(default)]
    pub language: LanguageScope,

    pub scope: CleanupScope,

    pub pattern: String,

    pub replacement: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_true() -> bool {
    true
}

impl CatalogDocument {
    /// Merge another catalog fragment into this one
    ///
    /// Mappings for the same provider pair are concatenated. Identity clashes
    /// are left for [`crate::CatalogValidator`] to report.
    pub fn merge(&mut self, other: CatalogDocument) -> Result<(), ValidationError> {
        match (&self.catalog_version, other.catalog_version) {
            (Some(mine), Some(theirs)) if *mine != theirs => {
                let mut error = ValidationError::new(
                    "catalog_version",
                    "catalog fragments declare different versions",
                );
                error.add_violation(ValidationError::create_violation(
                    "consistent_version",
                    mine.clone(),
                    theirs,
                ));
                return Err(error);
            }
            (None, Some(theirs)) => self.catalog_version = Some(theirs),
            _ => {}
        }

        if self.description.is_none() {
            self.description = other.description;
        }
        self.families.extend(other.families);
        self.providers.extend(other.providers);

        for mapping in other.mappings {
            match self
                .mappings
                .iter_mut()
                .find(|m| m.source == mapping.source && m.target == mapping.target)
            {
                Some(existing) => {
                    existing.rules.extend(mapping.rules);
                    existing.cleanup.extend(mapping.cleanup);
                }
                None => self.mappings.push(mapping),
            }
        }

        Ok(())
    }

    /// Find the mapping for a provider pair
    pub fn mapping(&self, source: &str, target: &str) -> Option<&MappingDocument> {
        self.mappings
            .iter()
            .find(|m| m.source == source && m.target == target)
    }
}
