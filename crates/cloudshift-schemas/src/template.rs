//! Rewrite template parsing
//!
//! Templates are plain target-language text with numbered slots: `$0`, `$1`,
//! … bind to the rule's captures in declaration order and `$$` stands for a
//! literal dollar sign. A `$` not followed by a digit or another `$` is kept
//! verbatim, so JavaScript template strings such as `${base}/api` need no
//! escaping.
//!
//! Copyright (c) 2025 CloudShift Team
//! Licensed under the Apache-2.0 license

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One piece of a parsed template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateSegment {
    Text(String),
    Slot(usize),
}

/// Template parsing failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    #[error("slot index at byte {offset} does not fit in usize")]
    SlotOverflow { offset: usize },
}

/// Split a template into literal text and slot references
pub fn parse_template(template: &str) -> Result<Vec<TemplateSegment>, TemplateError> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let bytes = template.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'$' {
            if bytes.get(i + 1) == Some(&b'$') {
                text.push('$');
                i += 2;
                continue;
            }
            let digits_start = i + 1;
            let mut end = digits_start;
            while end < bytes.len() && bytes[end].is_ascii_digit() {
                end += 1;
            }
            if end > digits_start {
                let index = template[digits_start..end]
                    .parse::<usize>()
                    .map_err(|_| TemplateError::SlotOverflow { offset: i })?;
                if !text.is_empty() {
                    segments.push(TemplateSegment::Text(std::mem::take(&mut text)));
                }
                segments.push(TemplateSegment::Slot(index));
                i = end;
                continue;
            }
        }

        // Copy one full UTF-8 character
        let ch_len = template[i..].chars().next().map(char::len_utf8).unwrap_or(1);
        text.push_str(&template[i..i + ch_len]);
        i += ch_len;
    }

    if !text.is_empty() {
        segments.push(TemplateSegment::Text(text));
    }
    Ok(segments)
}

/// Highest slot index referenced by a template
pub fn max_slot(segments: &[TemplateSegment]) -> Option<usize> {
    segments
        .iter()
        .filter_map(|s| match s {
            TemplateSegment::Slot(n) => Some(*n),
            TemplateSegment::Text(_) => None,
        })
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_and_text() {
        let segments = parse_template("$0.getContainerClient($1)").unwrap();
        assert_eq!(
            segments,
            vec![
                TemplateSegment::Slot(0),
                TemplateSegment::Text(".getContainerClient(".to_string()),
                TemplateSegment::Slot(1),
                TemplateSegment::Text(")".to_string()),
            ]
        );
        assert_eq!(max_slot(&segments), Some(1));
    }

    #[test]
    fn test_dollar_escapes() {
        let segments = parse_template("cost: $$5 ${base}/$12").unwrap();
        assert_eq!(
            segments,
            vec![
                TemplateSegment::Text("cost: $5 ${base}/".to_string()),
                TemplateSegment::Slot(12),
            ]
        );
    }

    #[test]
    fn test_no_slots() {
        let segments = parse_template("null").unwrap();
        assert_eq!(max_slot(&segments), None);
        assert!(parse_template("").unwrap().is_empty());
    }

    #[test]
    fn test_multibyte_text() {
        let segments = parse_template("é$0ü").unwrap();
        assert_eq!(segments.len(), 3);
    }
}
