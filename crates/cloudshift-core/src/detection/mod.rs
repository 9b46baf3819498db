//! Detection of source-provider constructs
//!
//! The detector walks a [`SyntaxTree`]'s sites in pre-order. Sites that
//! belong to the source provider (see [`association`]) are tried against the
//! mapping's candidate rules in priority order and the first full match is
//! recorded as a [`DetectionHit`]. Provider sites no rule matches are kept as
//! [`UnmappedSite`]s. Imports are never rule-matched; they are reconciled
//! after rewriting.

pub mod association;

pub use association::{associate, Association, Strength};

use crate::catalog::{Mapping, ProviderProfile};
use crate::syntax::{Site, SyntaxTree};
use crate::types::{DetectionHit, Span, UnmappedReason, UnmappedSite};
use cloudshift_schemas::SiteKind;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Detector output for one tree
#[derive(Debug, Clone, Default)]
pub struct Detection {
    /// Rule matches in pre-order
    pub hits: Vec<DetectionHit>,
    pub unmapped: Vec<UnmappedSite>,
    /// Ids of source-provider import sites
    pub imports: Vec<usize>,
    pub association: Association,
}

/// Matches one mapping's rules against trees of any variant
#[derive(Debug, Clone, Copy)]
pub struct Detector<'c> {
    mapping: &'c Mapping,
    source: &'c ProviderProfile,
}

impl<'c> Detector<'c> {
    pub fn new(mapping: &'c Mapping, source: &'c ProviderProfile) -> Self {
        Self { mapping, source }
    }

    pub fn detect(&self, tree: &SyntaxTree) -> Detection {
        let association = associate(tree, self.source);
        let mut hits: Vec<DetectionHit> = Vec::new();
        // Hits whose rewrite can apply; only these replace the sites inside them
        let mut covering: Vec<usize> = Vec::new();
        let mut unmapped = Vec::new();
        let mut imports = Vec::new();

        for site in &tree.sites {
            let Some(strength) = association.strength(site.id) else {
                continue;
            };
            if site.kind == SiteKind::Import {
                imports.push(site.id);
                continue;
            }
            if covering.iter().any(|&i| covers(&hits[i], site)) {
                continue;
            }

            let matched = self
                .mapping
                .candidates(tree.variant, site.kind)
                .find(|rule| {
                    rule.matcher.matches(site)
                        && association.receiver_from(tree, site, &rule.matcher.receiver_from)
                });
            match matched {
                Some(rule) => {
                    debug!(
                        rule = %rule.id,
                        site = %site.name.text,
                        at = %site.span.locator(),
                        "Detected"
                    );
                    let hit = DetectionHit {
                        site: site.to_ref(&tree.text),
                        rule_id: rule.id.clone(),
                        family: rule.family.clone(),
                        priority: rule.priority,
                        captures: rule.capture(site),
                    };
                    if hit.missing_slots().is_empty() && rule.rewrite.requires <= tree.fidelity {
                        covering.push(hits.len());
                    }
                    hits.push(hit);
                }
                None if strength == Strength::Strong => {
                    debug!(site = %site.name.text, at = %site.span.locator(), "Unmapped");
                    unmapped.push(UnmappedSite {
                        site: site.to_ref(&tree.text),
                        reason: UnmappedReason::NoMatchingRule,
                        family: self.family_hint(tree, site),
                    });
                }
                None => {}
            }
        }

        Detection {
            hits,
            unmapped,
            imports,
            association,
        }
    }

    /// Family of a rule for the same construct name, in any shape
    fn family_hint(&self, tree: &SyntaxTree, site: &Site) -> Option<crate::types::ServiceFamily> {
        self.mapping
            .candidates(tree.variant, site.kind)
            .find(|rule| rule.matcher.name.as_deref() == Some(site.name.text.as_str()))
            .map(|rule| rule.family.clone())
    }
}

/// Whether `site` is replaced wholesale by an earlier hit's rewrite
fn covers(hit: &DetectionHit, site: &Site) -> bool {
    hit.site.id != site.id
        && hit.site.span.contains(&site.span)
        && !hit
            .captures
            .iter()
            .flatten()
            .any(|capture| capture.span.contains(&site.span))
}

/// What the suspected scan found
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SuspectKind {
    Site { kind: SiteKind, name: String },
    UriLiteral { scheme: String },
}

/// A source-provider fragment found by the suspected scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suspect {
    #[serde(flatten)]
    pub kind: SuspectKind,
    pub span: Span,
    pub snippet: String,
}

/// Every fragment of `tree` that still belongs to `source`: strongly
/// associated sites, imports included, and string literals carrying one of
/// its URI schemes
pub fn scan(tree: &SyntaxTree, source: &ProviderProfile) -> Vec<Suspect> {
    let association = associate(tree, source);
    let mut found: Vec<Suspect> = tree
        .sites
        .iter()
        .filter(|site| association.is_strong(site.id))
        .map(|site| Suspect {
            kind: SuspectKind::Site {
                kind: site.kind,
                name: site.name.text.clone(),
            },
            span: site.span,
            snippet: site.to_ref(&tree.text).snippet,
        })
        .collect();

    for literal in &tree.literals {
        if let Some(scheme) = source.uri_scheme_in(&literal.text) {
            found.push(Suspect {
                kind: SuspectKind::UriLiteral {
                    scheme: scheme.to_string(),
                },
                span: literal.span,
                snippet: literal.text.clone(),
            });
        }
    }

    found.sort_by_key(|s| (s.span.start, std::cmp::Reverse(s.span.end)));
    found
}
