//! Catalog versioning
//!
//! Copyright (c) 2025 CloudShift Team
//! Licensed under the Apache-2.0 license

pub mod version;

pub use version::{CatalogVersion, VersionError, VersionRange};
