//! Catalog command handlers

use super::utils::{load_catalog, load_catalog_document};
use crate::cli::{CatalogAction, CatalogArgs, CatalogListArgs, CatalogValidateArgs};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use cloudshift_core::PatternCatalog;
use cloudshift_schemas::CatalogValidator;
use serde::Serialize;
use tracing::{info, instrument, warn};

/// One listed rule
#[derive(Debug, Serialize)]
struct RuleRow {
    id: String,
    source: String,
    target: String,
    language: String,
    family: String,
    kind: String,
    name: String,
    priority: i32,
}

/// Summary printed by catalog validate
#[derive(Debug, Serialize)]
struct CatalogSummary {
    version: String,
    providers: Vec<String>,
    families: Vec<String>,
    mappings: Vec<String>,
    rules: usize,
}

/// Handle the catalog command
pub async fn handle_catalog(args: CatalogArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    match args.action {
        CatalogAction::List(list_args) => handle_list(list_args, config, output),
        CatalogAction::Validate(validate_args) => handle_validate(validate_args, config, output),
    }
}

#[instrument(skip(config, output))]
fn handle_list(args: CatalogListArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let catalog = load_catalog(config, &args.catalogs)?;
    let rows = list_rules(&catalog, &args);
    info!(rules = rows.len(), "Listing catalog rules");

    if !output.is_human() {
        return output.data(&rows);
    }

    output.info(&format!(
        "Catalog {} - {} of {} rules",
        catalog.version(),
        rows.len(),
        catalog.rule_count()
    ))?;
    let table_rows = rows
        .into_iter()
        .map(|r| {
            vec![
                r.id,
                format!("{}→{}", r.source, r.target),
                r.language,
                r.family,
                format!("{} {}", r.kind, r.name),
                r.priority.to_string(),
            ]
        })
        .collect();
    output.table(
        &["RULE", "PAIR", "LANGUAGE", "FAMILY", "MATCHES", "PRIORITY"],
        table_rows,
    )
}

/// Rules matching the list filters, in catalog order
fn list_rules(catalog: &PatternCatalog, args: &CatalogListArgs) -> Vec<RuleRow> {
    catalog
        .mappings()
        .filter(|m| args.from.as_deref().map_or(true, |p| m.source.as_str() == p))
        .filter(|m| args.to.as_deref().map_or(true, |p| m.target.as_str() == p))
        .flat_map(|m| m.rules.iter().map(move |r| (m, r)))
        .filter(|(_, r)| args.language.map_or(true, |l| r.language == l))
        .filter(|(_, r)| args.family.as_deref().map_or(true, |f| r.family.as_str() == f))
        .map(|(m, r)| RuleRow {
            id: r.id.to_string(),
            source: m.source.to_string(),
            target: m.target.to_string(),
            language: r.language.to_string(),
            family: r.family.to_string(),
            kind: r.matcher.kind.to_string(),
            name: r.matcher.name.clone().unwrap_or_else(|| "*".to_string()),
            priority: r.priority,
        })
        .collect()
}

#[instrument(skip(config, output))]
fn handle_validate(args: CatalogValidateArgs, config: &Config, output: &mut OutputWriter) -> Result<()> {
    let _timer = Timer::new("catalog_validate");
    let builtin = config.catalog.builtin && !args.no_builtin;
    let document = load_catalog_document(config, &args.paths, builtin)?;

    if let Err(errors) = CatalogValidator::new().validate(&document) {
        warn!(errors = errors.len(), "Catalog failed validation");
        output.error("✗ Catalog validation failed")?;
        output.validation_errors(&errors)?;
        return Err(Error::other(format!(
            "Catalog validation failed with {} error(s)",
            errors.len()
        )));
    }

    // Rule compilation catches what the document schema cannot, such as bad regexes and overlaps
    let catalog = PatternCatalog::from_document(&document)?;
    let summary = CatalogSummary {
        version: catalog.version().to_string(),
        providers: catalog.providers().map(|p| p.id.to_string()).collect(),
        families: catalog.families().map(|f| f.id.to_string()).collect(),
        mappings: catalog
            .mappings()
            .map(|m| format!("{}->{}", m.source, m.target))
            .collect(),
        rules: catalog.rule_count(),
    };

    if output.is_human() {
        output.success(&format!(
            "✓ Catalog {} is valid: {} mapping(s), {} rule(s)",
            summary.version,
            summary.mappings.len(),
            summary.rules
        ))?;
        output.info(&format!("Providers: {}", summary.providers.join(", ")))?;
        output.info(&format!("Families: {}", summary.families.join(", ")))?;
        Ok(())
    } else {
        output.data(&summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use cloudshift_core::LanguageVariant;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn list_args() -> CatalogListArgs {
        CatalogListArgs {
            from: None,
            to: None,
            language: None,
            family: None,
            catalogs: Vec::new(),
        }
    }

    fn sink() -> OutputWriter {
        OutputWriter::with_writer(OutputFormat::Json, false, Box::new(std::io::sink()))
    }

    #[test]
    fn test_list_filters() {
        let catalog = load_catalog(&Config::default(), &[]).unwrap();
        let all = list_rules(&catalog, &list_args());
        assert_eq!(all.len(), catalog.rule_count());

        let args = CatalogListArgs {
            to: Some("gcp".to_string()),
            language: Some(LanguageVariant::Python),
            family: Some("object_storage".to_string()),
            ..list_args()
        };
        let filtered = list_rules(&catalog, &args);
        assert!(!filtered.is_empty());
        assert!(filtered.iter().all(|r| r.target == "gcp"
            && r.language == "python"
            && r.family == "object_storage"));
        assert!(filtered.iter().any(|r| r.id.starts_with("py.s3.")));
    }

    #[test]
    fn test_validate_builtin() {
        let args = CatalogValidateArgs {
            paths: Vec::new(),
            no_builtin: false,
        };
        handle_validate(args, &Config::default(), &mut sink()).unwrap();
    }

    #[test]
    fn test_validate_rejects_unknown_family() {
        let temp_dir = TempDir::new().unwrap();
        let extra = temp_dir.path().join("extra.yaml");
        fs::write(
            &extra,
            r#"catalog_version: 1.0.0
mappings:
  - source: aws
    target: azure
    rules:
      - id: py.sqs.client
        family: queues
        language: python
        match: { kind: construction, name: client }
        rewrite:
          template: "QueueClient()"
"#,
        )
        .unwrap();

        let args = CatalogValidateArgs {
            paths: vec![extra],
            no_builtin: false,
        };
        let err = handle_validate(args, &Config::default(), &mut sink()).unwrap_err();
        assert!(err.to_string().contains("Catalog validation failed"));
    }

    #[test]
    fn test_validate_missing_path() {
        let args = CatalogValidateArgs {
            paths: vec![PathBuf::from("does-not-exist")],
            no_builtin: true,
        };
        assert!(matches!(
            handle_validate(args, &Config::default(), &mut sink()),
            Err(Error::FileNotFound { .. })
        ));
    }
}
