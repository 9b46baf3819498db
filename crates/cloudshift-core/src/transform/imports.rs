//! Import reconciliation
//!
//! Runs after call rewriting. Source-provider imports whose bindings no
//! longer occur in the rewritten text are deleted whole-line, and the target
//! imports the applied templates need are merged per module and inserted in
//! the file's own import idiom.

use super::plan::{Edit, RewritePlan};
use crate::adapter::LanguageAdapter;
use crate::catalog::ImportSpec;
use crate::syntax::lexer::{expand_to_lines, identifiers};
use crate::syntax::SyntaxTree;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Edits produced by the import pass
#[derive(Debug, Clone, Default)]
pub struct ImportChanges {
    pub edits: Vec<Edit>,
    /// Ids of removed import sites
    pub removed: Vec<usize>,
    pub added: Vec<ImportSpec>,
}

pub fn reconcile(
    adapter: &dyn LanguageAdapter,
    tree: &SyntaxTree,
    calls: &RewritePlan,
    source_imports: &[usize],
    required: &[ImportSpec],
) -> ImportChanges {
    let mut changes = ImportChanges::default();
    let text = tree.text.as_str();

    // identifiers still used once every source import is blanked out
    let mut stripped = calls.clone();
    for site in source_imports.iter().filter_map(|&id| tree.site(id)) {
        stripped.push(Edit::replace(site.span.start, site.span.end, ""));
    }
    let used = identifiers(&stripped.apply(text), adapter.lex_syntax());

    for site in source_imports.iter().filter_map(|&id| tree.site(id)) {
        if site.imported.iter().any(|name| used.contains(name)) {
            continue;
        }
        let (start, end) = expand_to_lines(text, site.span.start, site.span.end);
        debug!(module = %site.name.text, line = site.span.line, "Removing source import");
        changes.edits.push(Edit::replace(start, end, ""));
        changes.removed.push(site.id);
    }

    let missing = missing_imports(tree, &changes.removed, required);
    if let Some(insertion) = adapter.import_insertion(tree, &missing) {
        debug!(count = missing.len(), offset = insertion.offset, "Adding target imports");
        changes.edits.push(Edit::insert(insertion.offset, insertion.text));
        changes.added = missing;
    }
    changes
}

/// Required imports merged per module, minus what the file already imports,
/// in module order
pub fn missing_imports(tree: &SyntaxTree, removed: &[usize], required: &[ImportSpec]) -> Vec<ImportSpec> {
    let mut merged: BTreeMap<&str, ImportSpec> = BTreeMap::new();
    for spec in required {
        let entry = merged.entry(spec.module.as_str()).or_insert_with(|| ImportSpec {
            module: spec.module.clone(),
            names: Vec::new(),
            alias: None,
        });
        for name in &spec.names {
            if !entry.names.contains(name) {
                entry.names.push(name.clone());
            }
        }
        if entry.alias.is_none() {
            entry.alias = spec.alias.clone();
        }
    }

    merged
        .into_values()
        .filter_map(|mut spec| {
            let existing: Vec<_> = tree
                .imports()
                .filter(|s| s.name.text == spec.module && !removed.contains(&s.id))
                .collect();
            let bound: BTreeSet<&str> = existing
                .iter()
                .flat_map(|s| s.imported.iter().map(String::as_str))
                .collect();

            if spec.names.is_empty() {
                let satisfied = match &spec.alias {
                    Some(alias) => bound.contains(alias.as_str()),
                    None => !existing.is_empty(),
                };
                return (!satisfied).then_some(spec);
            }
            spec.names.retain(|n| !bound.contains(n.as_str()));
            (!spec.names.is_empty()).then_some(spec)
        })
        .collect()
}
