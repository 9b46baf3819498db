//! Catalog document validation
//!
//! Copyright (c) 2025 CloudShift Team
//! Licensed under the Apache-2.0 license

pub mod catalog;
pub mod error;

pub use catalog::CatalogValidator;
pub use error::{ValidationError, ValidationErrors, ValidationResult, Violation};
