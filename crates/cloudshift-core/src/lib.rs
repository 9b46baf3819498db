//! CloudShift Core - Catalog-driven cloud provider migration of source code
//!
//! This crate rewrites code written against one cloud provider's SDKs so it
//! targets another provider's equivalent services. Every provider-specific
//! fact lives in a versioned pattern catalog; the engine itself only knows how
//! to find sites, bind them to rules and splice rewrites back into the text.
//!
//! # Main Components
//!
//! - **Adapters**: per-language parsing into a [`SyntaxTree`] of sites, plus
//!   rendering of rewrite plans and import insertion
//! - **Catalog**: the compiled, validated [`PatternCatalog`]
//! - **Detection**: provider association and rule matching over sites
//! - **Transformation**: slot binding, rewrite plans and import reconciliation
//! - **Cleanup**: scoped regex rules, orphaned imports and idiom debris
//! - **Validation**: syntax, residual and presence checks over the output
//! - **Engine**: async request pipeline with timeouts, cancellation and
//!   catalog reload
//!
//! # Example
//!
//! ```no_run
//! use cloudshift_core::{Engine, LanguageVariant, PatternCatalog, Result, TransformRequest};
//!
//! fn example(catalog_yaml: &str, source: &str) -> Result<()> {
//!     let engine = Engine::new(PatternCatalog::from_yaml_str(catalog_yaml)?);
//!     let request = TransformRequest::new(source, LanguageVariant::JavaScript, "aws", "azure");
//!     let result = engine.transform_blocking(request)?;
//!     for site in &result.unmapped {
//!         eprintln!("{}: {}", site.site.span.locator(), site.reason);
//!     }
//!     Ok(())
//! }
//! ```

pub mod adapter;
pub mod catalog;
pub mod cleanup;
pub mod detection;
pub mod engine;
pub mod error;
pub mod report;
pub mod syntax;
pub mod transform;
pub mod types;
pub mod validation;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use adapter::{AdapterRegistry, GoAdapter, JsAdapter, LanguageAdapter, PythonAdapter};
pub use catalog::{FamilyProfile, Mapping, PatternCatalog, PatternRule, ProviderProfile};
pub use engine::{CancellationFlag, DetectionReport, Engine, EngineOptions};
pub use error::{Error, FindingCode, Result, Severity, Stage};
pub use report::{CoverageReport, CoverageSummary, CoverageTracker, Finding};
pub use syntax::{Site, SyntaxTree};
pub use types::{
    // Identifiers
    ProviderId, RuleId, ServiceFamily,

    // Locations
    Part, SiteRef, Span,

    // Per-site results
    CleanupAction, CleanupOrigin, DetectionHit, UnmappedReason, UnmappedSite,

    // Request and result
    Outcome, TransformMetadata, TransformRequest, TransformResult,
};
pub use validation::{Check, CheckFailure, CheckResult, ValidationReport};

pub use cloudshift_schemas::{CatalogVersion, Fidelity, LanguageVariant, SiteKind};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
