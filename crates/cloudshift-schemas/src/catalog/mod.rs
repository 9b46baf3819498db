//! Catalog document model
//!
//! Copyright (c) 2025 CloudShift Team
//! Licensed under the Apache-2.0 license

pub mod document;
pub mod kinds;

pub use document::{
    CaptureDocument, CatalogDocument, CleanupDocument, FamilyDocument, ImportDocument,
    MappingDocument, MatcherDocument, ProviderDocument, RewriteDocument, RuleDocument,
    SignatureDocument,
};
pub use kinds::{CapturePart, CleanupScope, Fidelity, LanguageScope, LanguageVariant, SiteKind};
