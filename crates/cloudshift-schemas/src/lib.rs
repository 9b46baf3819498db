//! CloudShift Schemas - pattern catalog documents and validators
//!
//! This crate defines the declarative artifact that drives the transformation
//! engine: a versioned catalog of provider signatures, service families and
//! (source construct → target construct) rewrite rules.
//!
//! ## Features
//!
//! - **Document Model**: serde types for catalog files (YAML or JSON)
//! - **Loading**: format detection by extension and multi-file merging
//! - **Versioning**: semantic catalog versions and requirement ranges
//! - **Validation**: path-addressed violations for every document-level rule
//! - **Templates**: parsing of `$N` rewrite slots shared with the engine
//!
//! ## Quick Start
//!
//! ```rust
//! use cloudshift_schemas::{CatalogDocument, CatalogValidator};
//!
//! let yaml = r#"
//! catalog_version: 1.0.0
//! families:
//!   - id: object_storage
//! providers:
//!   - id: aws
//!   - id: azure
//! "#;
//!
//! let document: CatalogDocument = serde_yaml::from_str(yaml).unwrap();
//! assert!(CatalogValidator::new().validate(&document).is_ok());
//! ```
//!
//! ## Document Rules
//!
//! - Catalog version must be a semantic version
//! - Family, provider and mapping identities are unique
//! - Rule and cleanup identifiers are unique across the whole catalog
//! - Structural rules name one concrete language; `any` is reserved for cleanup
//! - Every regular expression compiles
//! - Template slots refer to declared captures
//!
//! Copyright (c) 2025 CloudShift Team
//! Licensed under the Apache-2.0 license

pub mod catalog;
pub mod loader;
pub mod template;
pub mod validation;
pub mod versioning;

pub use catalog::{
    CaptureDocument, CapturePart, CatalogDocument, CleanupDocument, CleanupScope,
    FamilyDocument, Fidelity, ImportDocument, LanguageScope, LanguageVariant, MappingDocument,
    MatcherDocument, ProviderDocument, RewriteDocument, RuleDocument, SignatureDocument,
    SiteKind,
};
pub use loader::{CatalogLoader, Format, LoaderError, LoaderResult};
pub use template::{parse_template, TemplateError, TemplateSegment};
pub use validation::{
    CatalogValidator, ValidationError, ValidationErrors, ValidationResult, Violation,
};
pub use versioning::{CatalogVersion, VersionError, VersionRange};
