//! Provider association
//!
//! Decides which sites belong to the source provider before any rule is
//! tried. Names bound to the provider start from the profile's signature
//! identifiers and the bindings of its imports, then grow with the variables
//! that provider calls and constructions are assigned to until nothing
//! changes, so a client defined after its first use still counts.
//!
//! Two strengths are tracked. Client values (constructions, factory calls,
//! anything reached directly from an import) are *strong*; results of other
//! provider calls are *weak*. Weak sites are rule-matched like strong ones,
//! but a weak site no rule matches is plain data access (`data.Body`) and is
//! not reported.

use crate::catalog::ProviderProfile;
use crate::syntax::{ArgValue, Site, SyntaxTree};
use cloudshift_schemas::SiteKind;
use std::collections::{BTreeMap, BTreeSet};

/// How firmly a site is tied to the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Strength {
    Weak,
    Strong,
}

/// Association of every site in one tree, indexed by site id
#[derive(Debug, Clone, Default)]
pub struct Association {
    strengths: Vec<Option<Strength>>,
    /// Names bound by the provider's imports, plus its signature identifiers
    pub direct: BTreeSet<String>,
    pub clients: BTreeSet<String>,
    pub values: BTreeSet<String>,
    /// Bound name → names of the provider sites assigned to it
    pub origins: BTreeMap<String, BTreeSet<String>>,
}

impl Association {
    pub fn strength(&self, site: usize) -> Option<Strength> {
        self.strengths.get(site).copied().flatten()
    }

    pub fn is_associated(&self, site: usize) -> bool {
        self.strength(site).is_some()
    }

    pub fn is_strong(&self, site: usize) -> bool {
        self.strength(site) == Some(Strength::Strong)
    }

    /// Whether `site`'s receiver comes from one of `producers`, through a
    /// bound variable or a call chained into the receiver expression
    pub fn receiver_from(&self, tree: &SyntaxTree, site: &Site, producers: &[String]) -> bool {
        if producers.is_empty() {
            return true;
        }
        let Some(receiver) = &site.receiver else {
            return false;
        };
        let bound = access_paths(&receiver.text).iter().any(|path| {
            self.origins
                .get(path)
                .is_some_and(|names| producers.iter().any(|p| names.contains(p)))
        });
        bound
            || tree.sites.iter().any(|inner| {
                matches!(inner.kind, SiteKind::Call | SiteKind::Construction)
                    && inner.id != site.id
                    && receiver.span.contains(&inner.span)
                    && producers.contains(&inner.name.text)
            })
    }

    /// Ids of associated sites of `kind`
    pub fn sites_of(&self, tree: &SyntaxTree, kind: SiteKind) -> Vec<usize> {
        tree.sites
            .iter()
            .filter(|s| s.kind == kind && self.is_associated(s.id))
            .map(|s| s.id)
            .collect()
    }
}

/// Associate the sites of `tree` with `profile`
pub fn associate(tree: &SyntaxTree, profile: &ProviderProfile) -> Association {
    let mut assoc = Association {
        strengths: vec![None; tree.sites.len()],
        ..Association::default()
    };
    assoc.direct.extend(profile.identifiers.iter().cloned());

    for site in tree.imports() {
        if profile.matches_module(&site.name.text) {
            assoc.strengths[site.id] = Some(Strength::Strong);
            assoc.direct.extend(site.imported.iter().cloned());
        }
    }
    assoc.clients.extend(assoc.direct.iter().cloned());

    loop {
        let mut changed = false;
        for site in &tree.sites {
            if !matches!(site.kind, SiteKind::Call | SiteKind::Construction) {
                continue;
            }
            let Some(strength) = reach(site, &assoc) else {
                continue;
            };
            if assoc.strengths[site.id].map_or(true, |s| s < strength) {
                assoc.strengths[site.id] = Some(strength);
                changed = true;
            }
            if let Some(binding) = &site.binding {
                let produces_client = strength == Strength::Strong
                    && (site.kind == SiteKind::Construction
                        || profile.is_factory(&site.name.text)
                        || root_path(site)
                            .first()
                            .is_some_and(|root| assoc.direct.contains(root)));
                let set = if produces_client {
                    &mut assoc.clients
                } else {
                    &mut assoc.values
                };
                changed |= set.insert(binding.text.clone());
                assoc
                    .origins
                    .entry(binding.text.clone())
                    .or_default()
                    .insert(site.name.text.clone());
            }
        }
        if !changed {
            break;
        }
    }

    // Handlers passed by name to a provider call (`lambda.Start(handler)`)
    let registered: BTreeSet<&str> = tree
        .sites
        .iter()
        .filter(|s| s.kind == SiteKind::Call && assoc.is_strong(s.id))
        .flat_map(|s| s.args.iter())
        .filter_map(|a| match &a.value {
            ArgValue::Identifier(name) => Some(name.as_str()),
            _ => None,
        })
        .collect();

    for site in &tree.sites {
        let strong = match site.kind {
            SiteKind::Handler => {
                (site.top_level && profile.is_handler_name(&site.name.text))
                    || registered.contains(site.name.text.as_str())
            }
            SiteKind::TypeReference => root_path(site)
                .first()
                .is_some_and(|root| assoc.direct.contains(root)),
            _ => false,
        };
        if strong {
            assoc.strengths[site.id] = Some(Strength::Strong);
        }
    }

    assoc
}

/// Strength through which a call or construction reaches a provider name
fn reach(site: &Site, assoc: &Association) -> Option<Strength> {
    let paths = root_path(site);
    if paths.iter().any(|p| assoc.clients.contains(p)) {
        Some(Strength::Strong)
    } else if paths.iter().any(|p| assoc.values.contains(p)) {
        Some(Strength::Weak)
    } else {
        None
    }
}

/// Dotted prefixes of the expression a site hangs off: `self.s3.put` gives
/// `self`, `self.s3`, `self.s3.put`
fn root_path(site: &Site) -> Vec<String> {
    let text = site
        .receiver
        .as_ref()
        .map(|r| r.text.as_str())
        .unwrap_or(site.name.text.as_str());
    access_paths(text)
}

pub(crate) fn access_paths(text: &str) -> Vec<String> {
    let trimmed = text
        .trim_start()
        .trim_start_matches(|c: char| c == '(' || c == '&' || c == '*' || c.is_whitespace());
    let trimmed = trimmed
        .strip_prefix("await ")
        .map(str::trim_start)
        .unwrap_or(trimmed);
    let end = trimmed
        .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$' || c == '.'))
        .unwrap_or(trimmed.len());
    let path = trimmed[..end].trim_end_matches('.');
    if path.is_empty() || path.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return Vec::new();
    }

    let mut prefixes: Vec<String> = path
        .match_indices('.')
        .map(|(i, _)| path[..i].to_string())
        .collect();
    prefixes.push(path.to_string());
    prefixes
}
