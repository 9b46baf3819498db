//! Structural transformation
//!
//! Turns detection hits into a [`RewritePlan`]. Hits are bound innermost
//! first so a wrapper rule can see whether the call it wraps was rewritten.
//! A hit that cannot be applied leaves its source untouched and is reported
//! as an unmapped site. Imports are reconciled in a second pass over the
//! call-rewritten text.

pub mod imports;
pub mod plan;

pub use imports::ImportChanges;
pub use plan::{Edit, EditKind, RewritePlan};

use crate::adapter::LanguageAdapter;
use crate::catalog::{ImportSpec, Mapping, PatternRule};
use crate::detection::Detection;
use crate::syntax::lexer::indentation_at;
use crate::syntax::SyntaxTree;
use crate::types::{DetectionHit, ServiceFamily, SiteRef, UnmappedReason, UnmappedSite};
use cloudshift_schemas::SiteKind;
use std::collections::BTreeSet;
use tracing::debug;

/// Result of the structural pass
#[derive(Debug, Clone, Default)]
pub struct Transformation {
    pub plan: RewritePlan,
    /// Hits whose template was applied, in pre-order
    pub applied: Vec<DetectionHit>,
    /// Hits that could not be applied
    pub failed: Vec<UnmappedSite>,
    pub imports: ImportChanges,
}

impl Transformation {
    /// Families with at least one applied rewrite
    pub fn families(&self) -> BTreeSet<ServiceFamily> {
        self.applied.iter().map(|h| h.family.clone()).collect()
    }
}

/// Applies one mapping's templates
#[derive(Debug, Clone, Copy)]
pub struct Transformer<'c> {
    mapping: &'c Mapping,
}

impl<'c> Transformer<'c> {
    pub fn new(mapping: &'c Mapping) -> Self {
        Self { mapping }
    }

    /// Failure reason per hit, `None` for hits that apply
    ///
    /// Failures only ever spread, so the passes repeat until a pass marks no
    /// new hit. Hits inside an unmapped call stay untouched with it.
    fn outcomes(&self, tree: &SyntaxTree, detection: &Detection) -> Vec<Option<UnmappedReason>> {
        let hits = &detection.hits;
        let mut outcome: Vec<Option<UnmappedReason>> = vec![None; hits.len()];

        loop {
            let mut changed = false;
            for index in (0..hits.len()).rev() {
                if outcome[index].is_some() {
                    continue;
                }
                let hit = &hits[index];
                let failure = match self.mapping.rule(hit.rule_id.as_str()) {
                    None => Some(UnmappedReason::NoMatchingRule),
                    Some(rule) => {
                        let applied_inside = hits
                            .iter()
                            .enumerate()
                            .skip(index + 1)
                            .any(|(j, inner)| outcome[j].is_none() && captured(hit, inner));
                        check(rule, hit, tree, applied_inside).or_else(|| {
                            let left_as_written = hits.iter().enumerate().any(|(j, outer)| {
                                j != index && outcome[j].is_some() && encloses(&outer.site, hit)
                            }) || detection.unmapped.iter().any(|u| encloses(&u.site, hit));
                            let enclosing_applied = hits
                                .iter()
                                .enumerate()
                                .take(index)
                                .any(|(j, outer)| outcome[j].is_none() && captured(outer, hit));
                            let needs_enclosing =
                                rule.rewrite.requires_enclosing_rewrite && !enclosing_applied;
                            (left_as_written || needs_enclosing).then(|| {
                                UnmappedReason::EnclosingRewriteMissing {
                                    rule_id: rule.id.clone(),
                                }
                            })
                        })
                    }
                };
                if failure.is_some() {
                    outcome[index] = failure;
                    changed = true;
                }
            }
            if !changed {
                return outcome;
            }
        }
    }

    pub fn transform(
        &self,
        adapter: &dyn LanguageAdapter,
        tree: &SyntaxTree,
        detection: &Detection,
    ) -> Transformation {
        let hits = &detection.hits;
        let outcome = self.outcomes(tree, detection);

        let mut transformation = Transformation::default();
        let mut required: Vec<ImportSpec> = Vec::new();
        for (hit, failure) in hits.iter().zip(outcome) {
            match failure {
                None => {
                    let Some(rule) = self.mapping.rule(hit.rule_id.as_str()) else {
                        continue;
                    };
                    debug!(rule = %rule.id, at = %hit.site.span.locator(), "Applying rewrite");
                    transformation.plan.push(Edit {
                        start: hit.site.span.start,
                        end: hit.site.span.end,
                        kind: EditKind::Rewrite {
                            segments: rule.rewrite.segments.clone(),
                            slots: hit.captures.iter().flatten().cloned().collect(),
                            indent: indentation_at(&tree.text, hit.site.span.start).to_string(),
                        },
                    });
                    required.extend(rule.rewrite.imports.iter().cloned());
                    transformation.applied.push(hit.clone());
                }
                Some(reason) => {
                    debug!(rule = %hit.rule_id, at = %hit.site.span.locator(), %reason, "Rewrite not applied");
                    transformation.failed.push(UnmappedSite {
                        site: hit.site.clone(),
                        reason,
                        family: Some(hit.family.clone()),
                    });
                }
            }
        }

        let changes = imports::reconcile(
            adapter,
            tree,
            &transformation.plan,
            &detection.imports,
            &required,
        );
        for edit in &changes.edits {
            transformation.plan.push(edit.clone());
        }
        transformation.imports = changes;
        transformation
    }
}

/// Why `rule` cannot be applied at `hit`, if it cannot
fn check(
    rule: &PatternRule,
    hit: &DetectionHit,
    tree: &SyntaxTree,
    applied_inside: bool,
) -> Option<UnmappedReason> {
    let missing_slots = hit.missing_slots();
    if !missing_slots.is_empty() {
        return Some(UnmappedReason::BindingMismatch {
            rule_id: rule.id.clone(),
            missing_slots,
        });
    }
    if rule.rewrite.requires > tree.fidelity {
        return Some(UnmappedReason::CapabilityUnsupported {
            rule_id: rule.id.clone(),
            required: rule.rewrite.requires,
            available: tree.fidelity,
        });
    }
    if rule.rewrite.requires_nested_rewrite && !applied_inside {
        return Some(UnmappedReason::NestedRewriteMissing {
            rule_id: rule.id.clone(),
        });
    }
    None
}

/// Whether an unmapped `outer` site must keep `inner` as written; handler
/// bodies are not part of the handler's own rewrite
fn encloses(outer: &SiteRef, inner: &DetectionHit) -> bool {
    outer.kind != SiteKind::Handler
        && outer.id != inner.site.id
        && outer.span.contains(&inner.site.span)
}

/// Whether `inner` sits inside one of `outer`'s captures
fn captured(outer: &DetectionHit, inner: &DetectionHit) -> bool {
    outer
        .captures
        .iter()
        .flatten()
        .any(|capture| capture.span.contains(&inner.site.span))
}
