//! Load-time detection of ambiguous rules
//!
//! Two rules overlap when some site could satisfy both matchers and neither
//! outranks the other. Receiver regexes are assumed to intersect; names,
//! arity ranges and argument or receiver-origin constraints are compared
//! exactly.
//! The check ignores service families, so an ambiguity between families must
//! be settled with priorities in the catalog rather than at match time.

use crate::catalog::rule::{Matcher, PatternRule};
use crate::error::{Error, Result};

/// Fail on the first pair of overlapping rules
pub fn check_overlaps(rules: &[PatternRule]) -> Result<()> {
    for (i, a) in rules.iter().enumerate() {
        for b in &rules[i + 1..] {
            if a.language == b.language && a.priority == b.priority && may_both_match(&a.matcher, &b.matcher) {
                return Err(Error::catalog(format!(
                    "rules '{}' and '{}' overlap for {} {} sites at priority {}; separate their shapes or priorities",
                    a.id, b.id, a.language, a.matcher.kind, a.priority
                )));
            }
        }
    }
    Ok(())
}

fn may_both_match(a: &Matcher, b: &Matcher) -> bool {
    if a.kind != b.kind {
        return false;
    }
    if let (Some(x), Some(y)) = (&a.name, &b.name) {
        if x != y {
            return false;
        }
    }
    if a.min_args.max(b.min_args) > a.upper().min(b.upper()) {
        return false;
    }
    !constraints_disjoint(a, b) && !constraints_disjoint(b, a)
}

fn constraints_disjoint(a: &Matcher, b: &Matcher) -> bool {
    let literal_clash = a.literal_args.iter().any(|(index, value)| {
        b.literal_args.get(index).is_some_and(|other| other != value)
            || b.construct_args.contains_key(index)
    });
    let construct_clash = a
        .construct_args
        .iter()
        .any(|(index, name)| b.construct_args.get(index).is_some_and(|other| other != name));
    let origin_clash = !a.receiver_from.is_empty()
        && !b.receiver_from.is_empty()
        && !a.receiver_from.iter().any(|name| b.receiver_from.contains(name));
    literal_clash || construct_clash || origin_clash
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(id: &str, body: &str) -> PatternRule {
        let yaml = format!(
            "id: {}\nfamily: object_storage\nlanguage: js\nrewrite: {{ template: x }}\n{}",
            id, body
        );
        PatternRule::compile(&serde_yaml::from_str(&yaml).unwrap()).unwrap()
    }

    #[test]
    fn test_same_shape_overlaps() {
        let rules = vec![
            rule("a", "match: { kind: call, name: putObject }"),
            rule("b", "match: { kind: call, name: putObject, receiver: '^s3$' }"),
        ];
        let err = check_overlaps(&rules).unwrap_err();
        assert!(err.to_string().contains("'a' and 'b'"));
    }

    #[test]
    fn test_receiver_origins_separate() {
        let rules = vec![
            rule("a", "match: { kind: call, name: put, receiver_from: [DocumentClient] }"),
            rule("b", "match: { kind: call, name: put, receiver_from: [Table] }"),
        ];
        assert!(check_overlaps(&rules).is_ok());

        let rules = vec![
            rule("a", "match: { kind: call, name: put, receiver_from: [DocumentClient] }"),
            rule("b", "match: { kind: call, name: put }"),
        ];
        assert!(check_overlaps(&rules).is_err());
    }

    #[test]
    fn test_priority_separates() {
        let rules = vec![
            rule("a", "match: { kind: call, name: putObject }"),
            rule("b", "priority: 5\nmatch: { kind: call, name: putObject }"),
        ];
        assert!(check_overlaps(&rules).is_ok());
    }

    #[test]
    fn test_disjoint_arity() {
        let rules = vec![
            rule("a", "match: { kind: call, name: putObject, max_args: 1 }"),
            rule("b", "match: { kind: call, name: putObject, min_args: 2 }"),
        ];
        assert!(check_overlaps(&rules).is_ok());
    }

    #[test]
    fn test_disjoint_literals() {
        let rules = vec![
            rule("a", "match: { kind: call, name: client, literal_args: { 0: s3 } }"),
            rule("b", "match: { kind: call, name: client, literal_args: { 0: dynamodb } }"),
        ];
        assert!(check_overlaps(&rules).is_ok());
    }

    #[test]
    fn test_wildcard_overlaps_named() {
        let rules = vec![
            rule("a", "match: { kind: call, name: '*' }"),
            rule("b", "match: { kind: call, name: send }"),
        ];
        assert!(check_overlaps(&rules).is_err());
    }

    #[test]
    fn test_different_kinds() {
        let rules = vec![
            rule("a", "match: { kind: call, name: S3 }"),
            rule("b", "match: { kind: construction, name: S3 }"),
        ];
        assert!(check_overlaps(&rules).is_ok());
    }
}
