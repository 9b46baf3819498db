//! CloudShift Providers - Bundled pattern catalogs
//!
//! The catalog ships as YAML fragments compiled into the binary:
//! - `providers.yaml`: service families plus the AWS, Azure and Google Cloud
//!   provider profiles
//! - `aws-azure.yaml`: S3, DynamoDB and Lambda to Blob Storage, Cosmos DB and
//!   Azure Functions for JavaScript, TypeScript, Python and Go
//! - `aws-gcp.yaml`: the same services to Cloud Storage, Firestore and Cloud
//!   Functions for JavaScript and Python
//!
//! Fragments are merged in the order returned by [`builtin_catalog_sources`];
//! extra catalog files can be appended to that list by the caller.

use cloudshift_schemas::{CatalogDocument, CatalogLoader, LoaderResult};

/// Shared families and provider profiles
pub const PROVIDERS: &str = include_str!("../catalogs/providers.yaml");

/// AWS to Azure rules
pub const AWS_AZURE: &str = include_str!("../catalogs/aws-azure.yaml");

/// AWS to Google Cloud rules
pub const AWS_GCP: &str = include_str!("../catalogs/aws-gcp.yaml");

/// Version every bundled fragment declares
pub const CATALOG_VERSION: &str = "1.0.0";

/// Named catalog fragments, in merge order
pub fn builtin_catalog_sources() -> Vec<(&'static str, &'static str)> {
    vec![
        ("providers.yaml", PROVIDERS),
        ("aws-azure.yaml", AWS_AZURE),
        ("aws-gcp.yaml", AWS_GCP),
    ]
}

/// Merged and validated bundled catalog document
pub fn builtin_document() -> LoaderResult<CatalogDocument> {
    CatalogLoader::new().load_sources(builtin_catalog_sources())
}
