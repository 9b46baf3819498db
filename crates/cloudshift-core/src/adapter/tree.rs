//! Shared tree-sitter plumbing for the full-fidelity adapters

use crate::error::{Error, Result};
use crate::syntax::lexer::LineIndex;
use crate::syntax::SyntaxDiagnostic;
use crate::types::{Part, Span};
use cloudshift_schemas::LanguageVariant;
use tree_sitter::{Language, Node, Parser, Tree};

/// Parse `text` with a fresh parser; parsers are not shared across threads
pub(crate) fn parse(variant: LanguageVariant, language: &Language, text: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser.set_language(language).map_err(|e| Error::Adapter {
        language: variant.to_string(),
        message: format!("failed to load grammar: {}", e),
    })?;
    parser.parse(text, None).ok_or_else(|| Error::Adapter {
        language: variant.to_string(),
        message: "parser returned no tree".to_string(),
    })
}

/// Source text plus line index, borrowed while lowering
pub(crate) struct Source<'t> {
    pub text: &'t str,
    pub index: LineIndex,
}

impl<'t> Source<'t> {
    pub fn new(text: &'t str) -> Self {
        Self {
            text,
            index: LineIndex::new(text),
        }
    }

    pub fn text(&self, node: Node<'_>) -> &'t str {
        &self.text[node.start_byte()..node.end_byte()]
    }

    pub fn part(&self, node: Node<'_>) -> Part {
        self.index.part(self.text, node.start_byte(), node.end_byte())
    }

    pub fn span(&self, node: Node<'_>) -> Span {
        self.index.span(self.text, node.start_byte(), node.end_byte())
    }

    pub fn range(&self, start: usize, end: usize) -> Part {
        self.index.part(self.text, start, end)
    }
}

/// Error and missing nodes, in document order
pub(crate) fn diagnostics(root: Node<'_>) -> Vec<SyntaxDiagnostic> {
    let mut found = Vec::new();
    if root.has_error() {
        collect_errors(root, &mut found);
    }
    found
}

fn collect_errors(node: Node<'_>, found: &mut Vec<SyntaxDiagnostic>) {
    if node.is_error() || node.is_missing() {
        let position = node.start_position();
        let message = if node.is_missing() {
            format!("missing '{}'", node.kind())
        } else {
            "unexpected syntax".to_string()
        };
        found.push(SyntaxDiagnostic {
            line: position.row + 1,
            column: position.column + 1,
            message,
        });
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() || child.is_missing() {
            collect_errors(child, found);
        }
    }
}

pub(crate) fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|c| c.kind() != "comment")
        .collect()
}

pub(crate) fn children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

/// Whether `child` is the node stored in `parent`'s `field`
pub(crate) fn is_field(parent: Node<'_>, field: &str, child: Node<'_>) -> bool {
    parent
        .child_by_field_name(field)
        .is_some_and(|n| n.id() == child.id())
}
