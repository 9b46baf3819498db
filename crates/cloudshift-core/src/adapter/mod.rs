//! Language adapters
//!
//! An adapter turns source text of one language variant into a
//! [`SyntaxTree`] and renders rewrite plans back into text. Adapters are
//! pluggable: the engine holds an [`AdapterRegistry`] and new variants are
//! added by registering another [`LanguageAdapter`] implementation.

pub mod go;
pub mod javascript;
pub mod python;
mod tree;

pub use go::GoAdapter;
pub use javascript::JsAdapter;
pub use python::PythonAdapter;

use crate::catalog::ImportSpec;
use crate::error::{Error, Result};
use crate::syntax::lexer::{self, LexSyntax};
use crate::syntax::SyntaxTree;
use crate::transform::plan::RewritePlan;
use cloudshift_schemas::{Fidelity, LanguageVariant};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Text to insert at a byte offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    pub offset: usize,
    pub text: String,
}

/// Pattern for an empty idiom an import removal can leave behind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebrisPattern {
    pub id: &'static str,
    pub pattern: &'static str,
}

/// Parser and renderer for one language variant
pub trait LanguageAdapter: Send + Sync {
    fn variant(&self) -> LanguageVariant;

    /// Structural representation this adapter produces
    fn fidelity(&self) -> Fidelity;

    fn lex_syntax(&self) -> &'static LexSyntax {
        LexSyntax::for_variant(self.variant())
    }

    /// Lower `text` into a tree, recording syntax errors as diagnostics
    fn analyze(&self, text: &str) -> Result<SyntaxTree>;

    /// Lower `text`, failing on the first syntax error
    fn parse(&self, text: &str) -> Result<SyntaxTree> {
        let tree = self.analyze(text)?;
        match tree.diagnostics.first() {
            None => Ok(tree),
            Some(diagnostic) => Err(Error::Parse {
                language: self.variant().to_string(),
                line: diagnostic.line,
                column: diagnostic.column,
                message: diagnostic.message.clone(),
            }),
        }
    }

    /// Render a plan over the tree's text
    fn render(&self, tree: &SyntaxTree, plan: &RewritePlan) -> Result<String> {
        Ok(plan.apply(&tree.text))
    }

    /// Where and how to add import statements, in this file's idiom
    fn import_insertion(&self, tree: &SyntaxTree, imports: &[ImportSpec]) -> Option<Insertion>;

    /// Empty idioms to remove after imports are deleted
    fn debris_patterns(&self) -> &'static [DebrisPattern] {
        &[]
    }
}

/// Registered adapters, keyed by variant
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: BTreeMap<LanguageVariant, Arc<dyn LanguageAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in JavaScript, TypeScript, Python and Go adapters
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(JsAdapter::javascript()));
        registry.register(Arc::new(JsAdapter::typescript()));
        registry.register(Arc::new(PythonAdapter::new()));
        registry.register(Arc::new(GoAdapter::new()));
        registry
    }

    /// Add or replace the adapter for its variant
    pub fn register(&mut self, adapter: Arc<dyn LanguageAdapter>) {
        self.adapters.insert(adapter.variant(), adapter);
    }

    pub fn get(&self, variant: LanguageVariant) -> Result<Arc<dyn LanguageAdapter>> {
        self.adapters
            .get(&variant)
            .cloned()
            .ok_or_else(|| Error::UnsupportedLanguage {
                language: variant.to_string(),
            })
    }

    pub fn variants(&self) -> impl Iterator<Item = LanguageVariant> + '_ {
        self.adapters.keys().copied()
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("variants", &self.adapters.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Offset just past the line containing `offset`
pub(crate) fn line_end_after(text: &str, offset: usize) -> usize {
    text[offset..]
        .find('\n')
        .map(|i| offset + i + 1)
        .unwrap_or(text.len())
}

/// End of leading comments and blank lines, at a line boundary
pub(crate) fn preamble_end(text: &str, syntax: &LexSyntax) -> usize {
    let lexed = lexer::lex(text, syntax);
    let mut end = 0;
    for token in &lexed.tokens {
        match token.kind {
            lexer::TokenKind::Comment => end = line_end_after(text, token.end.saturating_sub(1)),
            lexer::TokenKind::Whitespace => {}
            _ => break,
        }
    }
    end
}

/// Join rendered import lines into an insertion at `offset`
pub(crate) fn insertion(text: &str, offset: usize, lines: Vec<String>, separate: bool) -> Option<Insertion> {
    if lines.is_empty() {
        return None;
    }
    let mut block = String::new();
    if offset == text.len() && !text.is_empty() && !text.ends_with('\n') {
        block.push('\n');
    }
    for line in lines {
        block.push_str(&line);
        block.push('\n');
    }
    let next = &text[offset..];
    if separate && !next.is_empty() && !next.starts_with('\n') && !next.starts_with("\r\n") {
        block.push('\n');
    }
    Some(Insertion {
        offset,
        text: block,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::lexer::{JAVASCRIPT, PYTHON};

    #[test]
    fn test_registry_defaults() {
        let registry = AdapterRegistry::with_defaults();
        let variants: Vec<_> = registry.variants().collect();
        assert_eq!(variants, LanguageVariant::ALL.to_vec());
        assert_eq!(
            registry.get(LanguageVariant::Go).unwrap().fidelity(),
            Fidelity::TokenStream
        );
        assert_eq!(
            registry.get(LanguageVariant::TypeScript).unwrap().fidelity(),
            Fidelity::Full
        );
    }

    #[test]
    fn test_missing_adapter() {
        let registry = AdapterRegistry::new();
        let err = registry.get(LanguageVariant::Python).err().unwrap();
        assert!(matches!(err, Error::UnsupportedLanguage { .. }));
    }

    #[test]
    fn test_preamble_end() {
        let text = "#!/usr/bin/env python\n# header\n\nimport os\n";
        assert_eq!(preamble_end(text, &PYTHON), text.find("\nimport").unwrap());
        assert_eq!(preamble_end("/* a */\ncode();", &JAVASCRIPT), 8);
        assert_eq!(preamble_end("code();", &JAVASCRIPT), 0);
    }

    #[test]
    fn test_insertion_separates_from_code() {
        let ins = insertion("code();\n", 0, vec!["import a;".to_string()], true).unwrap();
        assert_eq!(ins.text, "import a;\n\n");
        let ins = insertion("import x", 8, vec!["import a".to_string()], false).unwrap();
        assert_eq!(ins.text, "\nimport a\n");
    }
}
