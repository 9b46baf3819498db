//! Rewrite plans and their rendering
//!
//! A plan is a set of edits over the original text. Edits either nest (an
//! inner call rewritten inside an outer rewrite's slot) or are disjoint;
//! rendering is recursive so a slot's text carries every edit inside it.
//! Multi-line slot text is shifted to the depth of the template line it
//! lands on.

use crate::syntax::lexer::indentation_at;
use crate::types::Part;
use cloudshift_schemas::TemplateSegment;
use serde::{Deserialize, Serialize};

/// One edit over the original text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub kind: EditKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditKind {
    /// Instantiate a template; slot text is rendered from the original range
    Rewrite {
        segments: Vec<TemplateSegment>,
        slots: Vec<Part>,
        /// Indentation applied after each newline of template text
        indent: String,
    },
    /// Literal replacement; an empty string deletes, a zero-width range inserts
    Replace(String),
}

impl Edit {
    pub fn replace(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            kind: EditKind::Replace(text.into()),
        }
    }

    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self::replace(offset, offset, text)
    }

    fn is_insertion(&self) -> bool {
        self.start == self.end
    }
}

/// Ordered collection of edits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewritePlan {
    pub edits: Vec<Edit>,
}

impl RewritePlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, edit: Edit) {
        self.edits.push(edit);
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    /// Render the plan against `text`
    pub fn apply(&self, text: &str) -> String {
        let mut order: Vec<usize> = (0..self.edits.len()).collect();
        order.sort_by(|&a, &b| {
            let (x, y) = (&self.edits[a], &self.edits[b]);
            x.start
                .cmp(&y.start)
                .then(y.is_insertion().cmp(&x.is_insertion()))
                .then(y.end.cmp(&x.end))
                .then(a.cmp(&b))
        });
        Renderer {
            text,
            edits: &self.edits,
            order: &order,
        }
        .range(0, text.len(), None)
    }
}

struct Renderer<'a> {
    text: &'a str,
    edits: &'a [Edit],
    order: &'a [usize],
}

impl Renderer<'_> {
    fn range(&self, start: usize, end: usize, within: Option<usize>) -> String {
        let mut out = String::with_capacity(end - start);
        let mut cursor = start;
        for &index in self.order {
            let edit = &self.edits[index];
            if Some(index) == within || edit.start < cursor || edit.end > end {
                continue;
            }
            // Insertions at a range boundary belong to the enclosing level
            if edit.is_insertion() && within.is_some() && (edit.start == start || edit.start == end) {
                continue;
            }
            out.push_str(&self.text[cursor..edit.start]);
            out.push_str(&self.edit(index));
            cursor = edit.end;
        }
        out.push_str(&self.text[cursor..end]);
        out
    }

    fn edit(&self, index: usize) -> String {
        match &self.edits[index].kind {
            EditKind::Replace(text) => text.clone(),
            EditKind::Rewrite {
                segments,
                slots,
                indent,
            } => {
                let mut out = String::new();
                for segment in segments {
                    match segment {
                        TemplateSegment::Text(text) => {
                            out.push_str(&reindent(text, indent));
                        }
                        TemplateSegment::Slot(slot) => {
                            if let Some(part) = slots.get(*slot) {
                                let rendered = self.range(part.span.start, part.span.end, Some(index));
                                let from = indentation_at(self.text, part.span.start);
                                let to = line_indent(&out, indent);
                                out.push_str(&shift(&rendered, from, &to));
                            }
                        }
                    }
                }
                out
            }
        }
    }
}

/// Leading whitespace of the line `out` currently ends on; the first line
/// of a rewrite sits at the site's own indentation
fn line_indent(out: &str, site_indent: &str) -> String {
    match out.rfind('\n') {
        Some(i) => {
            let line = &out[i + 1..];
            let len = line.find(|c: char| c != ' ' && c != '\t').unwrap_or(line.len());
            line[..len].to_string()
        }
        None => site_indent.to_string(),
    }
}

/// Re-base every line after the first from indentation `from` to `to`
fn shift(text: &str, from: &str, to: &str) -> String {
    if from == to || !text.contains('\n') {
        return text.to_string();
    }
    let mut lines = text.split('\n');
    let mut out = lines.next().unwrap_or_default().to_string();
    for line in lines {
        out.push('\n');
        match line.strip_prefix(from) {
            Some(rest) if !line.trim().is_empty() => {
                out.push_str(to);
                out.push_str(rest);
            }
            _ => out.push_str(line),
        }
    }
    out
}

fn reindent(text: &str, indent: &str) -> String {
    if indent.is_empty() || !text.contains('\n') {
        return text.to_string();
    }
    text.replace('\n', &format!("\n{}", indent))
}
