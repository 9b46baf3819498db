//! Residual cleanup over rendered text
//!
//! A best-effort safety net behind the structural pass. It works on tokens of
//! the rendered output rather than on sites, and only ever touches fragments
//! that carry a source-provider signature:
//!
//! 1. catalog cleanup rules, scoped to string literals, comments or code;
//! 2. source-provider imports nothing references any more;
//! 3. idiom debris such as an empty import block, only after an import was
//!    removed.
//!
//! Every edit is reported as a [`CleanupAction`] and logged under the
//! `cloudshift::cleanup` target.

use crate::adapter::LanguageAdapter;
use crate::catalog::{CleanupRule, Mapping, ProviderProfile};
use crate::detection::associate;
use crate::error::{Error, Result};
use crate::syntax::lexer::{self, LexSyntax, LineIndex, TokenKind};
use crate::transform::imports;
use crate::transform::plan::{Edit, RewritePlan};
use crate::types::{CleanupAction, CleanupOrigin};
use cloudshift_schemas::{CleanupScope, SiteKind};
use regex::Regex;
use tracing::debug;

/// Cleaned text and the edits that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cleanup {
    pub output: String,
    pub actions: Vec<CleanupAction>,
}

/// Cleanup for one mapping
#[derive(Debug, Clone, Copy)]
pub struct ResidualCleanup<'c> {
    mapping: &'c Mapping,
    source: &'c ProviderProfile,
}

impl<'c> ResidualCleanup<'c> {
    pub fn new(mapping: &'c Mapping, source: &'c ProviderProfile) -> Self {
        Self { mapping, source }
    }

    /// Clean `text`; `imports_removed` reports whether the structural pass
    /// deleted any import
    pub fn run(
        &self,
        adapter: &dyn LanguageAdapter,
        text: &str,
        imports_removed: bool,
    ) -> Result<Cleanup> {
        let syntax = adapter.lex_syntax();
        let mut output = text.to_string();
        let mut actions = Vec::new();

        for rule in self.mapping.cleanup_for(adapter.variant()) {
            output = self.apply_rule(rule, syntax, &output, &mut actions);
        }

        let (orphaned, removed) = self.remove_orphaned_imports(adapter, &output, &mut actions)?;
        output = orphaned;

        if imports_removed || removed {
            for debris in adapter.debris_patterns() {
                let pattern = Regex::new(debris.pattern).map_err(|e| Error::Adapter {
                    language: adapter.variant().to_string(),
                    message: format!("invalid debris pattern '{}': {}", debris.id, e),
                })?;
                let mut plan = RewritePlan::new();
                let index = LineIndex::new(&output);
                for found in pattern.find_iter(&output) {
                    record(
                        &mut actions,
                        debris.id,
                        CleanupOrigin::IdiomDebris,
                        index.position(&output, found.start()).0,
                        found.as_str(),
                        "",
                    );
                    plan.push(Edit::replace(found.start(), found.end(), ""));
                }
                output = plan.apply(&output);
            }
        }

        Ok(Cleanup { output, actions })
    }

    fn apply_rule(
        &self,
        rule: &CleanupRule,
        syntax: &LexSyntax,
        text: &str,
        actions: &mut Vec<CleanupAction>,
    ) -> String {
        let index = LineIndex::new(text);
        let mut plan = RewritePlan::new();

        for (start, end) in scoped_ranges(text, syntax, rule.scope) {
            let fragment = &text[start..end];
            for caps in rule.pattern.captures_iter(fragment) {
                let Some(found) = caps.get(0) else {
                    continue;
                };
                if found.as_str().is_empty() || !self.source.mentions(found.as_str()) {
                    continue;
                }
                let mut replacement = String::new();
                caps.expand(&rule.replacement, &mut replacement);
                if replacement == found.as_str() {
                    continue;
                }
                let offset = start + found.start();
                record(
                    actions,
                    &rule.id,
                    CleanupOrigin::Catalog,
                    index.position(text, offset).0,
                    found.as_str(),
                    &replacement,
                );
                plan.push(Edit::replace(offset, start + found.end(), replacement));
            }
        }
        plan.apply(text)
    }

    fn remove_orphaned_imports(
        &self,
        adapter: &dyn LanguageAdapter,
        text: &str,
        actions: &mut Vec<CleanupAction>,
    ) -> Result<(String, bool)> {
        let tree = adapter.analyze(text)?;
        let association = associate(&tree, self.source);
        let source_imports = association.sites_of(&tree, SiteKind::Import);
        if source_imports.is_empty() {
            return Ok((text.to_string(), false));
        }

        let changes = imports::reconcile(adapter, &tree, &RewritePlan::new(), &source_imports, &[]);
        let mut plan = RewritePlan::new();
        for (edit, id) in changes.edits.into_iter().zip(&changes.removed) {
            if let Some(site) = tree.site(*id) {
                record(
                    actions,
                    "orphaned-import",
                    CleanupOrigin::OrphanedImport,
                    site.span.line,
                    &text[edit.start..edit.end],
                    "",
                );
            }
            plan.push(edit);
        }
        let removed = !plan.is_empty();
        Ok((plan.apply(text), removed))
    }
}

fn record(
    actions: &mut Vec<CleanupAction>,
    rule_id: &str,
    origin: CleanupOrigin,
    line: usize,
    before: &str,
    after: &str,
) {
    debug!(
        target: "cloudshift::cleanup",
        rule = rule_id,
        ?origin,
        line,
        before,
        after,
        "Cleanup applied"
    );
    actions.push(CleanupAction {
        rule_id: rule_id.to_string(),
        origin,
        line,
        before: before.trim_end_matches(['\r', '\n']).to_string(),
        after: after.to_string(),
    });
}

/// Byte ranges of `text` a rule with `scope` may edit
fn scoped_ranges(text: &str, syntax: &LexSyntax, scope: CleanupScope) -> Vec<(usize, usize)> {
    let lexed = lexer::lex(text, syntax);
    let in_scope = |kind: TokenKind| match scope {
        CleanupScope::String => kind == TokenKind::Str,
        CleanupScope::Comment => kind == TokenKind::Comment,
        CleanupScope::Code => !matches!(kind, TokenKind::Str | TokenKind::Comment),
    };

    let mut ranges: Vec<(usize, usize)> = Vec::new();
    for token in lexed.tokens.iter().filter(|t| in_scope(t.kind)) {
        match ranges.last_mut() {
            // adjacent code tokens form one range so patterns can span them
            Some(last) if scope == CleanupScope::Code && last.1 == token.start => last.1 = token.end,
            _ => ranges.push((token.start, token.end)),
        }
    }
    ranges
}
