//! Language-neutral structural representation
//!
//! Adapters lower their parser output into a [`SyntaxTree`]: the original
//! text plus a pre-order list of [`Site`]s (imports, constructions, calls,
//! handler definitions, type references) and string literals. Detection,
//! transformation and validation work only on this representation, which is
//! why one catalog and one engine serve every language variant.

pub mod lexer;

use crate::types::{Part, SiteRef, Span};
use cloudshift_schemas::{Fidelity, LanguageVariant, SiteKind};
use serde::{Deserialize, Serialize};

/// Parsed document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntaxTree {
    pub variant: LanguageVariant,
    pub fidelity: Fidelity,
    pub text: String,
    /// Sites in depth-first pre-order (ascending start, outer before inner)
    pub sites: Vec<Site>,
    /// String literal tokens, including their quotes
    pub literals: Vec<Part>,
    /// Syntax errors; empty for a well-formed document
    pub diagnostics: Vec<SyntaxDiagnostic>,
}

impl SyntaxTree {
    pub fn new(variant: LanguageVariant, fidelity: Fidelity, text: impl Into<String>) -> Self {
        Self {
            variant,
            fidelity,
            text: text.into(),
            sites: Vec::new(),
            literals: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn is_well_formed(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn site(&self, id: usize) -> Option<&Site> {
        self.sites.get(id)
    }

    pub fn imports(&self) -> impl Iterator<Item = &Site> {
        self.sites.iter().filter(|s| s.kind == SiteKind::Import)
    }

    /// Append a site, assigning its id; callers push in pre-order
    pub fn push_site(&mut self, mut site: Site) {
        site.id = self.sites.len();
        self.sites.push(site);
    }

    /// Restore pre-order after an adapter collected sites out of order
    pub fn sort_sites(&mut self) {
        self.sites
            .sort_by(|a, b| a.span.start.cmp(&b.span.start).then(b.span.end.cmp(&a.span.end)));
        for (index, site) in self.sites.iter_mut().enumerate() {
            site.id = index;
        }
    }
}

/// A syntax error found while parsing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntaxDiagnostic {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// A syntactic construct the detector can inspect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: usize,
    pub kind: SiteKind,
    pub span: Span,
    /// Method, constructor, type or handler name; the module path for imports
    pub name: Part,
    /// Receiver of a call, or qualifier of a constructed/referenced type
    pub receiver: Option<Part>,
    pub args: Vec<Argument>,
    /// Handler parameter names
    pub params: Vec<Part>,
    /// Handler body
    pub body: Option<Part>,
    /// Variable the site's value is assigned to
    pub binding: Option<Part>,
    /// Names an import brings into scope
    pub imported: Vec<String>,
    /// Whether the site sits at module level
    pub top_level: bool,
}

impl Site {
    pub fn new(kind: SiteKind, span: Span, name: Part) -> Self {
        Self {
            id: 0,
            kind,
            span,
            name,
            receiver: None,
            args: Vec::new(),
            params: Vec::new(),
            body: None,
            binding: None,
            imported: Vec::new(),
            top_level: false,
        }
    }

    /// Argument count for calls, parameter count for handlers
    pub fn arity(&self) -> usize {
        match self.kind {
            SiteKind::Handler => self.params.len(),
            _ => self.args.len(),
        }
    }

    /// Positional argument by index, skipping keyword arguments
    pub fn positional(&self, index: usize) -> Option<&Argument> {
        self.args.iter().filter(|a| a.keyword.is_none()).nth(index)
    }

    pub fn keyword(&self, name: &str) -> Option<&Argument> {
        self.args.iter().find(|a| a.keyword.as_deref() == Some(name))
    }

    /// Identifier at the root of the receiver, or of the name when there is none
    pub fn root_identifier(&self) -> Option<String> {
        let text = self
            .receiver
            .as_ref()
            .map(|r| r.text.as_str())
            .unwrap_or(self.name.text.as_str());
        root_identifier(text)
    }

    /// Report handle for this site
    pub fn to_ref(&self, text: &str) -> SiteRef {
        let raw = &text[self.span.start..self.span.end];
        let first_line = raw.lines().next().unwrap_or("").trim();
        let snippet = if first_line.chars().count() > 80 {
            let cut: String = first_line.chars().take(77).collect();
            format!("{}...", cut)
        } else {
            first_line.to_string()
        };
        SiteRef {
            id: self.id,
            kind: self.kind,
            name: self.name.text.clone(),
            span: self.span,
            snippet,
        }
    }
}

/// An argument at a call or construction site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    /// Keyword for `name=value` arguments
    pub keyword: Option<String>,
    /// The value expression
    pub part: Part,
    pub value: ArgValue,
}

/// Coarse shape of an argument value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArgValue {
    /// String literal, unquoted
    Str(String),
    /// Object or dictionary literal
    Object(Vec<Field>),
    /// Constructed value: `new T({...})`, `&pkg.T{...}`
    Construct { name: String, fields: Vec<Field> },
    /// Function literal with its parameter count
    Function { params: usize },
    Identifier(String),
    Other,
}

impl ArgValue {
    /// Object fields reachable from this value
    pub fn fields(&self) -> Option<&[Field]> {
        match self {
            ArgValue::Object(fields) | ArgValue::Construct { fields, .. } => Some(fields),
            _ => None,
        }
    }

    /// Follow a dotted field path such as `Key.id`
    pub fn field_path(&self, path: &str) -> Option<&Field> {
        let mut current = self;
        let mut found = None;
        for key in path.split('.') {
            let field = current.fields()?.iter().find(|f| f.key == key)?;
            current = &field.value;
            found = Some(field);
        }
        found
    }
}

/// Key/value entry of an object-shaped argument
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub key: String,
    /// The value expression
    pub part: Part,
    pub value: ArgValue,
}

/// Leading identifier of an expression such as `s3.putObject(x).promise`
pub fn root_identifier(text: &str) -> Option<String> {
    let trimmed = text
        .trim_start()
        .trim_start_matches(|c: char| c == '(' || c == '&' || c == '*' || c.is_whitespace());
    let trimmed = trimmed.strip_prefix("await ").map(str::trim_start).unwrap_or(trimmed);
    let ident: String = trimmed
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_' || *c == '$')
        .collect();
    if ident.is_empty() || ident.chars().next().is_some_and(|c| c.is_ascii_digit()) {
        None
    } else {
        Some(ident)
    }
}

/// Strip quotes and string prefixes from a literal token
pub fn unquote(literal: &str) -> String {
    let body = literal.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    for quote in ["\"\"\"", "'''", "\"", "'", "`"] {
        if body.len() >= 2 * quote.len() && body.starts_with(quote) && body.ends_with(quote) {
            return body[quote.len()..body.len() - quote.len()].to_string();
        }
    }
    body.to_string()
}
