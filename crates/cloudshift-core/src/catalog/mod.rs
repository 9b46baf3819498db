//! Compiled pattern catalog
//!
//! A [`PatternCatalog`] is built once from validated catalog documents and is
//! immutable afterwards; the engine shares it behind an `Arc` and swaps the
//! whole value on reload. Rules in a mapping are held in match order
//! (descending priority, then id).

pub mod overlap;
pub mod rule;

pub use rule::{
    type_name_matches, Capture, CleanupRule, ImportSpec, Matcher, PatternRule, RewriteTemplate,
};

use crate::error::{Error, Result};
use crate::types::{ProviderId, ServiceFamily};
use cloudshift_schemas::{
    CatalogDocument, CatalogLoader, CatalogValidator, CatalogVersion, Format, LanguageVariant,
    ProviderDocument, SiteKind, VersionRange,
};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Service family metadata
#[derive(Debug, Clone)]
pub struct FamilyProfile {
    pub id: ServiceFamily,
    pub description: Option<String>,
    /// Whether validation checks that the target's markers appear in the output
    pub verify_presence: bool,
}

/// Naming conventions that identify a provider's code
#[derive(Debug, Clone)]
pub struct ProviderProfile {
    pub id: ProviderId,
    pub name: String,
    pub modules: Vec<String>,
    pub identifiers: Vec<String>,
    pub uri_schemes: Vec<String>,
    pub handler_names: Vec<String>,
    pub factories: Vec<String>,
    pub markers: BTreeMap<ServiceFamily, Vec<Regex>>,
}

impl ProviderProfile {
    fn compile(doc: &ProviderDocument) -> Result<Self> {
        let mut markers = BTreeMap::new();
        for (family, patterns) in &doc.markers {
            let compiled = patterns
                .iter()
                .map(|p| {
                    Regex::new(p).map_err(|e| Error::CatalogLoad {
                        message: format!("provider '{}' has an invalid marker '{}'", doc.id, p),
                        source: Some(anyhow::Error::new(e)),
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            markers.insert(ServiceFamily::new(family), compiled);
        }

        Ok(Self {
            id: ProviderId::new(&doc.id),
            name: doc.name.clone().unwrap_or_else(|| doc.id.clone()),
            modules: doc.signatures.modules.clone(),
            identifiers: doc.signatures.identifiers.clone(),
            uri_schemes: doc.signatures.uri_schemes.clone(),
            handler_names: doc.signatures.handler_names.clone(),
            factories: doc.signatures.factories.clone(),
            markers,
        })
    }

    /// Module path belongs to this provider (exact, or a sub-path)
    pub fn matches_module(&self, module: &str) -> bool {
        self.modules.iter().any(|m| {
            module == m
                || module
                    .strip_prefix(m.as_str())
                    .is_some_and(|rest| rest.starts_with(['/', '.']))
                || (m.ends_with('/') && module.starts_with(m.as_str()))
        })
    }

    pub fn is_identifier(&self, name: &str) -> bool {
        self.identifiers.iter().any(|i| i == name)
    }

    pub fn is_handler_name(&self, name: &str) -> bool {
        self.handler_names.iter().any(|h| h == name)
    }

    pub fn is_factory(&self, name: &str) -> bool {
        self.factories.iter().any(|f| f == name)
    }

    /// First URI scheme of this provider found in `text`
    pub fn uri_scheme_in(&self, text: &str) -> Option<&str> {
        self.uri_schemes
            .iter()
            .find(|scheme| text.contains(scheme.as_str()))
            .map(String::as_str)
    }

    /// Whether `text` carries any of this provider's signatures
    pub fn mentions(&self, text: &str) -> bool {
        self.uri_scheme_in(text).is_some()
            || self.modules.iter().any(|m| text.contains(m.as_str()))
            || self.identifiers.iter().any(|i| contains_word(text, i))
    }

    pub fn markers_for(&self, family: &ServiceFamily) -> &[Regex] {
        self.markers.get(family).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// `needle` appears in `text` delimited by non-identifier characters
pub(crate) fn contains_word(text: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    let is_ident = |c: char| c.is_alphanumeric() || c == '_' || c == '$';
    text.match_indices(needle).any(|(i, _)| {
        let before = text[..i].chars().next_back().map_or(true, |c| !is_ident(c));
        let after = text[i + needle.len()..].chars().next().map_or(true, |c| !is_ident(c));
        before && after
    })
}

/// Rules and cleanup for one source→target pair
#[derive(Debug, Clone)]
pub struct Mapping {
    pub source: ProviderId,
    pub target: ProviderId,
    pub rules: Vec<PatternRule>,
    pub cleanup: Vec<CleanupRule>,
}

impl Mapping {
    /// Rules that may apply to a site, in match order
    pub fn candidates(
        &self,
        language: LanguageVariant,
        kind: SiteKind,
    ) -> impl Iterator<Item = &PatternRule> {
        self.rules
            .iter()
            .filter(move |r| r.language == language && r.matcher.kind == kind)
    }

    pub fn rule(&self, id: &str) -> Option<&PatternRule> {
        self.rules.iter().find(|r| r.id.as_str() == id)
    }

    pub fn cleanup_for(&self, language: LanguageVariant) -> impl Iterator<Item = &CleanupRule> {
        self.cleanup
            .iter()
            .filter(move |c| c.language.applies_to(language))
    }

    pub fn languages(&self) -> Vec<LanguageVariant> {
        let mut languages: Vec<_> = self.rules.iter().map(|r| r.language).collect();
        languages.sort();
        languages.dedup();
        languages
    }
}

/// Immutable, compiled catalog
#[derive(Debug, Clone)]
pub struct PatternCatalog {
    version: CatalogVersion,
    description: Option<String>,
    families: BTreeMap<ServiceFamily, FamilyProfile>,
    providers: BTreeMap<ProviderId, ProviderProfile>,
    mappings: BTreeMap<(ProviderId, ProviderId), Mapping>,
}

impl PatternCatalog {
    /// Validate and compile a merged catalog document
    pub fn from_document(doc: &CatalogDocument) -> Result<Self> {
        CatalogValidator::new().validate(doc)?;

        let raw_version = doc
            .catalog_version
            .as_deref()
            .ok_or_else(|| Error::catalog("catalog_version is missing"))?;
        let version = CatalogVersion::parse(raw_version).map_err(|e| Error::CatalogLoad {
            message: format!("invalid catalog_version '{}'", raw_version),
            source: Some(anyhow::Error::new(e)),
        })?;

        let families = doc
            .families
            .iter()
            .map(|f| {
                let id = ServiceFamily::new(&f.id);
                let profile = FamilyProfile {
                    id: id.clone(),
                    description: f.description.clone(),
                    verify_presence: f.verify_presence,
                };
                (id, profile)
            })
            .collect();

        let mut providers = BTreeMap::new();
        for doc in &doc.providers {
            let profile = ProviderProfile::compile(doc)?;
            providers.insert(profile.id.clone(), profile);
        }

        let mut mappings = BTreeMap::new();
        for mapping in &doc.mappings {
            let mut rules = mapping
                .rules
                .iter()
                .map(PatternRule::compile)
                .collect::<Result<Vec<_>>>()?;
            rules.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));
            overlap::check_overlaps(&rules)?;

            let cleanup = mapping
                .cleanup
                .iter()
                .map(CleanupRule::compile)
                .collect::<Result<Vec<_>>>()?;

            let source = ProviderId::new(&mapping.source);
            let target = ProviderId::new(&mapping.target);
            debug!(
                source = %source,
                target = %target,
                rules = rules.len(),
                cleanup = cleanup.len(),
                "Compiled mapping"
            );
            mappings.insert(
                (source.clone(), target.clone()),
                Mapping {
                    source,
                    target,
                    rules,
                    cleanup,
                },
            );
        }

        let catalog = Self {
            version,
            description: doc.description.clone(),
            families,
            providers,
            mappings,
        };
        info!(
            version = %catalog.version,
            mappings = catalog.mappings.len(),
            rules = catalog.rule_count(),
            "Catalog loaded"
        );
        Ok(catalog)
    }

    /// Compile a single YAML document
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let doc = CatalogLoader::unchecked().load_str(content, Format::Yaml, Path::new("<inline>"))?;
        Self::from_document(&doc)
    }

    /// Merge named YAML sources, in order, then compile
    pub fn from_sources<'a, I>(sources: I) -> Result<Self>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let doc = CatalogLoader::unchecked().load_sources(sources)?;
        Self::from_document(&doc)
    }

    /// Load files and directories of catalog documents, then compile
    pub fn from_paths(paths: &[PathBuf]) -> Result<Self> {
        let doc = CatalogLoader::unchecked().load_paths(paths)?;
        Self::from_document(&doc)
    }

    pub fn version(&self) -> &CatalogVersion {
        &self.version
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Fail unless the catalog version satisfies `range`
    pub fn require(&self, range: &VersionRange) -> Result<()> {
        if range.matches(&self.version) {
            Ok(())
        } else {
            Err(Error::catalog(format!(
                "catalog version {} does not satisfy {}",
                self.version, range
            )))
        }
    }

    pub fn provider(&self, id: &ProviderId) -> Option<&ProviderProfile> {
        self.providers.get(id)
    }

    pub fn providers(&self) -> impl Iterator<Item = &ProviderProfile> {
        self.providers.values()
    }

    pub fn family(&self, id: &ServiceFamily) -> Option<&FamilyProfile> {
        self.families.get(id)
    }

    pub fn families(&self) -> impl Iterator<Item = &FamilyProfile> {
        self.families.values()
    }

    pub fn mappings(&self) -> impl Iterator<Item = &Mapping> {
        self.mappings.values()
    }

    /// Mapping for a provider pair
    pub fn mapping(&self, source: &ProviderId, target: &ProviderId) -> Result<&Mapping> {
        self.mappings
            .get(&(source.clone(), target.clone()))
            .ok_or_else(|| Error::UnsupportedMapping {
                source_provider: source.to_string(),
                target_provider: target.to_string(),
                catalog_version: self.version.to_string(),
            })
    }

    pub fn rule_count(&self) -> usize {
        self.mappings.values().map(|m| m.rules.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
catalog_version: "1.2.0"
families:
  - id: object_storage
providers:
  - id: aws
    signatures:
      modules: [aws-sdk, "@aws-sdk/", boto3]
      identifiers: [AWS]
      uri_schemes: ["s3://"]
  - id: azure
    signatures:
      modules: ["@azure/storage-blob"]
    markers:
      object_storage: ['BlobServiceClient']
mappings:
  - source: aws
    target: azure
    rules:
      - id: b-rule
        family: object_storage
        language: js
        match: { kind: call, name: getObject }
        rewrite: { template: "x" }
      - id: a-rule
        family: object_storage
        language: js
        match: { kind: call, name: putObject }
        rewrite: { template: "x" }
      - id: urgent
        family: object_storage
        language: js
        priority: 10
        match: { kind: call, name: deleteObject }
        rewrite: { template: "x" }
"#;

    #[test]
    fn test_rules_in_match_order() {
        let catalog = PatternCatalog::from_yaml_str(CATALOG).unwrap();
        let mapping = catalog
            .mapping(&ProviderId::new("aws"), &ProviderId::new("azure"))
            .unwrap();
        let ids: Vec<_> = mapping.rules.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["urgent", "a-rule", "b-rule"]);
        assert_eq!(catalog.rule_count(), 3);
        assert_eq!(catalog.version().to_string(), "1.2.0");
    }

    #[test]
    fn test_unsupported_mapping() {
        let catalog = PatternCatalog::from_yaml_str(CATALOG).unwrap();
        let err = catalog
            .mapping(&ProviderId::new("azure"), &ProviderId::new("aws"))
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedMapping { .. }));
    }

    #[test]
    fn test_overlap_rejected_at_load() {
        let overlapping = CATALOG.replace("name: getObject", "name: putObject");
        let err = PatternCatalog::from_yaml_str(&overlapping).unwrap_err();
        assert!(matches!(err, Error::CatalogLoad { .. }));
        assert!(err.to_string().contains("overlap"));
    }

    #[test]
    fn test_invalid_document_rejected() {
        let err = PatternCatalog::from_yaml_str("catalog_version: \"1.0.0\"\nfamilies: []\nproviders: []\nmappings:\n  - { source: aws, target: azure }\n").unwrap_err();
        assert!(matches!(err, Error::CatalogLoad { .. }));
    }

    #[test]
    fn test_version_requirement() {
        let catalog = PatternCatalog::from_yaml_str(CATALOG).unwrap();
        assert!(catalog.require(&VersionRange::parse("^1.0.0").unwrap()).is_ok());
        assert!(catalog.require(&VersionRange::parse("^2.0.0").unwrap()).is_err());
    }

    #[test]
    fn test_provider_signatures() {
        let catalog = PatternCatalog::from_yaml_str(CATALOG).unwrap();
        let aws = catalog.provider(&ProviderId::new("aws")).unwrap();
        assert!(aws.matches_module("aws-sdk"));
        assert!(aws.matches_module("aws-sdk/clients/s3"));
        assert!(aws.matches_module("@aws-sdk/client-s3"));
        assert!(!aws.matches_module("aws-sdk-mock"));
        assert!(aws.mentions("const url = 's3://bucket/key'"));
        assert!(aws.mentions("new AWS.S3()"));
        assert!(!aws.mentions("const AWSOME = 1"));
    }

    #[test]
    fn test_contains_word() {
        assert!(contains_word("new AWS.S3()", "AWS"));
        assert!(!contains_word("MY_AWS_KEY", "AWS"));
        assert!(!contains_word("", "AWS"));
    }
}
