//! Go adapter over the shared token stream
//!
//! No Go grammar is wired in, so this adapter recovers sites from token
//! shapes: import declarations, `pkg.Sel(...)` call chains, `&pkg.T{...}`
//! composite literals, qualified type references and top-level `func`
//! declarations. Well-formedness is limited to a package clause, terminated
//! literals and balanced delimiters. Rules that need anything beyond this
//! should declare `requires: full` and will be reported as unsupported.

use super::{line_end_after, DebrisPattern, Insertion, LanguageAdapter};
use crate::catalog::ImportSpec;
use crate::error::Result;
use crate::syntax::lexer::{self, LineIndex, Token, TokenKind, GO};
use crate::syntax::{unquote, ArgValue, Argument, Field, Site, SyntaxDiagnostic, SyntaxTree};
use crate::types::Part;
use cloudshift_schemas::{Fidelity, LanguageVariant, SiteKind};
use std::collections::HashSet;

const KEYWORDS: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough", "for",
    "func", "go", "goto", "if", "import", "interface", "map", "package", "range", "return",
    "select", "struct", "switch", "type", "var",
];

const DEBRIS: &[DebrisPattern] = &[DebrisPattern {
    id: "go.empty-import-block",
    pattern: r"(?m)^import\s*\(\s*\)[ \t]*\r?\n?",
}];

/// Token-stream adapter for Go
#[derive(Debug, Clone, Copy, Default)]
pub struct GoAdapter;

impl GoAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl LanguageAdapter for GoAdapter {
    fn variant(&self) -> LanguageVariant {
        LanguageVariant::Go
    }

    fn fidelity(&self) -> Fidelity {
        Fidelity::TokenStream
    }

    fn analyze(&self, text: &str) -> Result<SyntaxTree> {
        Ok(Scanner::new(text).run())
    }

    fn import_insertion(&self, tree: &SyntaxTree, imports: &[ImportSpec]) -> Option<Insertion> {
        let text = tree.text.as_str();
        let specs: Vec<String> = imports.iter().map(render_spec).collect();
        if specs.is_empty() {
            return None;
        }
        let toks = significant(text);

        let block = toks.iter().enumerate().find_map(|(i, t)| {
            let next = toks.get(i + 1)?;
            (t.text(text) == "import" && next.is_punct(text, '(')).then_some(i + 1)
        });
        if let Some(open) = block {
            let close = structure(text, &toks).0[open]?;
            let close_start = toks[close].start;
            let inner = &text[toks[open].end..close_start];
            let line_start = text[..close_start].rfind('\n').map(|i| i + 1).unwrap_or(0);

            let insertion = if text[line_start..close_start].trim().is_empty() && line_start > toks[open].end {
                Insertion {
                    offset: line_start,
                    text: specs.iter().map(|s| format!("\t{}\n", s)).collect(),
                }
            } else if inner.trim().is_empty() {
                Insertion {
                    offset: toks[open].end,
                    text: format!("\n{}", specs.iter().map(|s| format!("\t{}\n", s)).collect::<String>()),
                }
            } else {
                Insertion {
                    offset: close_start,
                    text: specs.iter().map(|s| format!("; {}", s)).collect(),
                }
            };
            return Some(insertion);
        }

        if let Some(end) = tree.imports().map(|s| s.span.end).max() {
            return Some(Insertion {
                offset: line_end_after(text, end),
                text: specs.iter().map(|s| format!("import {}\n", s)).collect(),
            });
        }

        let package_end = toks
            .windows(2)
            .find(|w| w[0].text(text) == "package" && w[1].kind == TokenKind::Ident)
            .map(|w| w[1].end)?;
        let mut block = String::from("\nimport (\n");
        for spec in &specs {
            block.push_str(&format!("\t{}\n", spec));
        }
        block.push_str(")\n");
        let offset = line_end_after(text, package_end);
        if offset == text.len() && !text.ends_with('\n') {
            block.insert(0, '\n');
        }
        Some(Insertion {
            offset,
            text: block,
        })
    }

    fn debris_patterns(&self) -> &'static [DebrisPattern] {
        DEBRIS
    }
}

fn render_spec(spec: &ImportSpec) -> String {
    match &spec.alias {
        Some(alias) => format!("{} \"{}\"", alias, spec.module),
        None => format!("\"{}\"", spec.module),
    }
}

/// Package name Go assigns to an import path without an alias
fn package_name(path: &str) -> String {
    let mut segments = path.rsplit('/');
    let last = segments.next().unwrap_or(path);
    let is_major_version = last.len() > 1
        && last.starts_with('v')
        && last[1..].chars().all(|c| c.is_ascii_digit());
    let last = if is_major_version {
        segments.next().unwrap_or(last)
    } else {
        last
    };
    let last = last.split(".v").next().unwrap_or(last);
    last.trim_start_matches("go-").replace('-', "_")
}

fn significant(text: &str) -> Vec<Token> {
    lexer::lex(text, &GO)
        .tokens
        .into_iter()
        .filter(|t| !t.is_trivia())
        .collect()
}

/// Matching closer for each opener, and brace depth at each token
fn structure(text: &str, toks: &[Token]) -> (Vec<Option<usize>>, Vec<usize>) {
    let mut close = vec![None; toks.len()];
    let mut depth = vec![0; toks.len()];
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut braces = 0usize;

    for (i, tok) in toks.iter().enumerate() {
        let c = if tok.kind == TokenKind::Punct {
            tok.text(text).chars().next().unwrap_or(' ')
        } else {
            ' '
        };
        if c == '}' {
            braces = braces.saturating_sub(1);
        }
        depth[i] = braces;
        match c {
            '(' | '[' | '{' => {
                if c == '{' {
                    braces += 1;
                }
                stack.push((c, i));
            }
            ')' | ']' | '}' => {
                let opener = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                if stack.last().is_some_and(|(o, _)| *o == opener) {
                    if let Some((_, open)) = stack.pop() {
                        close[open] = Some(i);
                    }
                }
            }
            _ => {}
        }
    }
    (close, depth)
}

struct Scanner<'t> {
    text: &'t str,
    index: LineIndex,
    toks: Vec<Token>,
    close: Vec<Option<usize>>,
    depth: Vec<usize>,
    in_import: Vec<bool>,
    bindings: HashSet<String>,
    tree: SyntaxTree,
}

impl<'t> Scanner<'t> {
    fn new(text: &'t str) -> Self {
        let lexed = lexer::lex(text, &GO);
        let mut tree = SyntaxTree::new(LanguageVariant::Go, Fidelity::TokenStream, text);
        tree.diagnostics = lexed.diagnostics;
        tree.diagnostics
            .extend(lexer::check_delimiters(text, &lexed.tokens));

        let toks: Vec<Token> = lexed.tokens.into_iter().filter(|t| !t.is_trivia()).collect();
        let (close, depth) = structure(text, &toks);
        let index = LineIndex::new(text);

        if let Some(first) = toks.first() {
            if first.text(text) != "package" {
                let (line, column) = index.position(text, first.start);
                tree.diagnostics.push(SyntaxDiagnostic {
                    line,
                    column,
                    message: "expected 'package' clause".to_string(),
                });
            }
        }
        tree.diagnostics.sort_by_key(|d| (d.line, d.column));

        Self {
            text,
            index,
            in_import: vec![false; toks.len()],
            toks,
            close,
            depth,
            bindings: HashSet::new(),
            tree,
        }
    }

    fn run(mut self) -> SyntaxTree {
        self.imports();
        for i in 0..self.toks.len() {
            if self.in_import[i] {
                continue;
            }
            match self.toks[i].kind {
                TokenKind::Str => {
                    let tok = self.toks[i];
                    let part = self.part(tok.start, tok.end);
                    self.tree.literals.push(part);
                }
                TokenKind::Ident => {
                    let word = self.toks[i].text(self.text);
                    if word == "func" {
                        if self.depth[i] == 0 {
                            self.handler(i);
                        }
                    } else if !KEYWORDS.contains(&word)
                        && !(i > 0 && self.punct(i - 1, '.'))
                        && !self.declares_function(i)
                    {
                        self.chain(i);
                    }
                }
                _ => {}
            }
        }
        self.tree.sort_sites();
        self.tree
    }

    /// Name in `func name(` or `func (r T) name(`
    fn declares_function(&self, i: usize) -> bool {
        if i == 0 {
            return false;
        }
        if self.ident(i - 1) == Some("func") {
            return true;
        }
        self.punct(i - 1, ')')
            && self
                .opener(i - 1)
                .is_some_and(|open| open > 0 && self.ident(open - 1) == Some("func"))
    }

    fn opener(&self, close: usize) -> Option<usize> {
        self.close.iter().position(|c| *c == Some(close))
    }

    fn punct(&self, i: usize, c: char) -> bool {
        self.toks.get(i).is_some_and(|t| t.is_punct(self.text, c))
    }

    fn ident(&self, i: usize) -> Option<&'t str> {
        self.toks
            .get(i)
            .filter(|t| t.kind == TokenKind::Ident)
            .map(|t| t.text(self.text))
    }

    fn adjacent(&self, a: usize, b: usize) -> bool {
        self.toks[a].end == self.toks[b].start
    }

    fn part(&self, start: usize, end: usize) -> Part {
        self.index.part(self.text, start, end)
    }

    fn tok_part(&self, i: usize) -> Part {
        self.part(self.toks[i].start, self.toks[i].end)
    }

    fn imports(&mut self) {
        let mut i = 0;
        while i < self.toks.len() {
            if self.depth[i] != 0 || self.ident(i) != Some("import") {
                i += 1;
                continue;
            }
            if self.punct(i + 1, '(') {
                let Some(end) = self.close[i + 1] else {
                    break;
                };
                let mut j = i + 2;
                while j < end {
                    if self.toks[j].kind == TokenKind::Str {
                        self.import_spec(None, j);
                    } else if j + 1 < end && self.toks[j + 1].kind == TokenKind::Str {
                        self.import_spec(Some(j), j + 1);
                        j += 1;
                    }
                    j += 1;
                }
                self.in_import[i..=end].iter_mut().for_each(|f| *f = true);
                i = end + 1;
            } else {
                let (alias, path) = if self.toks.get(i + 1).is_some_and(|t| t.kind == TokenKind::Str) {
                    (None, i + 1)
                } else {
                    (Some(i + 1), i + 2)
                };
                if self.toks.get(path).is_some_and(|t| t.kind == TokenKind::Str) {
                    self.import_spec(alias, path);
                    // a single-spec declaration spans its keyword
                    let keyword = self.toks[i].start;
                    if let Some(site) = self.tree.sites.last_mut() {
                        site.span = self.index.span(self.text, keyword, site.span.end);
                    }
                    self.in_import[i..=path].iter_mut().for_each(|f| *f = true);
                    i = path + 1;
                } else {
                    i += 1;
                }
            }
        }
    }

    fn import_spec(&mut self, alias: Option<usize>, path: usize) {
        let path_tok = self.toks[path];
        let module = unquote(path_tok.text(self.text));
        let start = alias.map(|a| self.toks[a].start).unwrap_or(path_tok.start);

        let binding = match alias.map(|a| self.toks[a].text(self.text)) {
            Some("_") | Some(".") => None,
            Some(name) => Some(name.to_string()),
            None => Some(package_name(&module)),
        };

        let mut site = Site::new(
            SiteKind::Import,
            self.index.span(self.text, start, path_tok.end),
            Part::new(module, self.index.span(self.text, path_tok.start, path_tok.end)),
        );
        if let Some(binding) = binding {
            self.bindings.insert(binding.clone());
            site.imported.push(binding);
        }
        site.top_level = true;
        self.tree.push_site(site);
    }

    /// `func name(params) results { body }` at file level
    fn handler(&mut self, i: usize) {
        if self.ident(i + 1).is_none() || !self.punct(i + 2, '(') {
            return;
        }
        let Some(params_close) = self.close[i + 2] else {
            return;
        };

        let mut j = params_close + 1;
        let body_open = loop {
            let Some(tok) = self.toks.get(j) else {
                return;
            };
            if self.punct(j, '{') {
                if matches!(self.ident(j.wrapping_sub(1)), Some("interface" | "struct")) {
                    match self.close[j] {
                        Some(close) => j = close + 1,
                        None => return,
                    }
                    continue;
                }
                break j;
            }
            if self.punct(j, '(') || self.punct(j, '[') {
                match self.close[j] {
                    Some(close) => j = close + 1,
                    None => return,
                }
                continue;
            }
            let continues_signature = tok.kind == TokenKind::Ident
                || self.punct(j, '.')
                || self.punct(j, '*')
                || self.punct(j, ']')
                || self.punct(j, ',');
            if !continues_signature {
                return;
            }
            j += 1;
        };
        let Some(body_close) = self.close[body_open] else {
            return;
        };

        let mut site = Site::new(
            SiteKind::Handler,
            self.index
                .span(self.text, self.toks[i].start, self.toks[body_close].end),
            self.tok_part(i + 1),
        );
        site.params = self.params(i + 2, params_close);
        site.body = Some(self.part(self.toks[body_open].start, self.toks[body_close].end));
        site.top_level = true;
        self.tree.push_site(site);
    }

    /// Comma-separated pieces between an opener and its closer
    fn pieces(&self, open: usize, close: usize) -> Vec<(usize, usize)> {
        let mut pieces = Vec::new();
        let mut start = open + 1;
        let mut j = open + 1;
        while j < close {
            if self.punct(j, '(') || self.punct(j, '[') || self.punct(j, '{') {
                j = self.close[j].unwrap_or(close);
            } else if self.punct(j, ',') {
                if j > start {
                    pieces.push((start, j));
                }
                start = j + 1;
            }
            j += 1;
        }
        if close > start {
            pieces.push((start, close));
        }
        pieces
    }

    fn params(&self, open: usize, close: usize) -> Vec<Part> {
        let pieces = self.pieces(open, close);
        let named = |(a, b): (usize, usize)| {
            self.ident(a).is_some()
                && b - a >= 2
                && (!self.punct(a + 1, '.') || self.punct(a + 2, '.'))
        };
        if !pieces.iter().any(|p| named(*p)) {
            return Vec::new();
        }
        pieces
            .into_iter()
            .filter(|(a, _)| self.ident(*a).is_some())
            .map(|(a, _)| self.tok_part(a))
            .collect()
    }

    /// Selector/call/composite chain starting at identifier `i`
    fn chain(&mut self, i: usize) {
        let mut last = i;
        let mut name = i;
        let mut dot: Option<usize> = None;
        let mut segments = 1;
        let mut called = false;

        loop {
            if self.punct(last + 1, '.') && self.ident(last + 2).is_some() {
                dot = Some(last + 1);
                name = last + 2;
                last += 2;
                segments += 1;
            } else if self.punct(last + 1, '(') {
                let Some(close) = self.close[last + 1] else {
                    break;
                };
                if name == last {
                    self.call_site(i, name, dot, last + 1, close);
                    called = true;
                }
                last = close;
            } else if self.punct(last + 1, '[') {
                let Some(close) = self.close[last + 1] else {
                    break;
                };
                last = close;
            } else if self.punct(last + 1, '{')
                && !called
                && segments == 2
                && name == last
                && self.composite_context(i)
                && self.ident(name).is_some_and(|n| n.starts_with(|c: char| c.is_uppercase()))
            {
                if let Some(close) = self.close[last + 1] {
                    self.construction_site(i, name, dot, last + 1, close);
                }
                return;
            } else {
                break;
            }
        }

        let qualifier = self.ident(i).unwrap_or_default();
        if !called && segments == 2 && last == name && self.bindings.contains(qualifier) {
            let mut site = Site::new(
                SiteKind::TypeReference,
                self.index
                    .span(self.text, self.toks[i].start, self.toks[name].end),
                self.tok_part(name),
            );
            site.receiver = Some(self.tok_part(i));
            site.top_level = self.depth[i] == 0;
            self.tree.push_site(site);
        }
    }

    /// Whether `{` after a qualified name at `i` opens a composite literal
    fn composite_context(&self, i: usize) -> bool {
        if i == 0 {
            return false;
        }
        let p = i - 1;
        if self.punct(p, '&') || self.punct(p, '(') || self.punct(p, ',') || self.punct(p, ':') {
            return true;
        }
        if self.punct(p, '{') || self.punct(p, '[') {
            return true;
        }
        if self.punct(p, '=') {
            return self.is_assignment(p);
        }
        self.ident(p) == Some("return")
    }

    /// `=` at `p` is `=` or `:=`, not a comparison or compound assignment
    fn is_assignment(&self, p: usize) -> bool {
        if p == 0 {
            return false;
        }
        let prev = &self.toks[p - 1];
        if prev.kind != TokenKind::Punct || !self.adjacent(p - 1, p) {
            return true;
        }
        if self.punct(p + 1, '=') && self.adjacent(p, p + 1) {
            return false;
        }
        self.punct(p - 1, ':')
    }

    fn call_site(&mut self, i: usize, name: usize, dot: Option<usize>, open: usize, close: usize) {
        let start = self.toks[i].start;
        let mut site = Site::new(
            SiteKind::Call,
            self.index.span(self.text, start, self.toks[close].end),
            self.tok_part(name),
        );
        site.receiver = dot.map(|d| self.part(start, self.toks[d].start));
        site.args = self
            .pieces(open, close)
            .into_iter()
            .map(|(a, b)| self.argument(a, b))
            .collect();
        site.binding = self.binding(i);
        site.top_level = self.depth[i] == 0;
        self.tree.push_site(site);
    }

    fn construction_site(&mut self, i: usize, name: usize, dot: Option<usize>, open: usize, close: usize) {
        let has_ref = i > 0 && self.punct(i - 1, '&');
        let start = if has_ref { self.toks[i - 1].start } else { self.toks[i].start };
        let mut site = Site::new(
            SiteKind::Construction,
            self.index.span(self.text, start, self.toks[close].end),
            self.tok_part(name),
        );
        site.receiver = dot.map(|d| self.part(self.toks[i].start, self.toks[d].start));
        site.args = vec![Argument {
            keyword: None,
            part: self.part(self.toks[open].start, self.toks[close].end),
            value: ArgValue::Object(self.fields(open, close)),
        }];
        site.binding = self.binding(if has_ref { i - 1 } else { i });
        site.top_level = self.depth[i] == 0;
        self.tree.push_site(site);
    }

    fn argument(&self, a: usize, b: usize) -> Argument {
        Argument {
            keyword: None,
            part: self.part(self.toks[a].start, self.toks[b - 1].end),
            value: self.value(a, b),
        }
    }

    fn value(&self, a: usize, b: usize) -> ArgValue {
        let tok = self.toks[a];
        if b - a == 1 {
            return match tok.kind {
                TokenKind::Str => ArgValue::Str(unquote(tok.text(self.text))),
                TokenKind::Ident => ArgValue::Identifier(tok.text(self.text).to_string()),
                _ => ArgValue::Other,
            };
        }
        if self.ident(a) == Some("func") && self.punct(a + 1, '(') {
            let params = self.close[a + 1]
                .map(|close| self.pieces(a + 1, close).len())
                .unwrap_or(0);
            return ArgValue::Function { params };
        }
        if self.punct(a, '{') && self.close[a] == Some(b - 1) {
            return ArgValue::Object(self.fields(a, b - 1));
        }

        // &pkg.T{...} or T{...}
        let type_start = if self.punct(a, '&') { a + 1 } else { a };
        let mut j = type_start;
        while self.ident(j).is_some() && self.punct(j + 1, '.') && self.ident(j + 2).is_some() {
            j += 2;
        }
        if self.ident(j).is_some() && self.punct(j + 1, '{') && self.close[j + 1] == Some(b - 1) {
            let name = self.text[self.toks[type_start].start..self.toks[j].end].to_string();
            return ArgValue::Construct {
                name,
                fields: self.fields(j + 1, b - 1),
            };
        }
        ArgValue::Other
    }

    fn fields(&self, open: usize, close: usize) -> Vec<Field> {
        self.pieces(open, close)
            .into_iter()
            .filter_map(|(a, b)| {
                if !self.punct(a + 1, ':') || a + 2 >= b {
                    return None;
                }
                let key = match self.toks[a].kind {
                    TokenKind::Ident => self.toks[a].text(self.text).to_string(),
                    TokenKind::Str => unquote(self.toks[a].text(self.text)),
                    _ => return None,
                };
                Some(Field {
                    key,
                    part: self.part(self.toks[a + 2].start, self.toks[b - 1].end),
                    value: self.value(a + 2, b),
                })
            })
            .collect()
    }

    /// Left-hand side a value starting at token `i` is assigned to
    fn binding(&self, i: usize) -> Option<Part> {
        if i == 0 || !self.punct(i - 1, '=') || !self.is_assignment(i - 1) {
            return None;
        }
        let eq = i - 1;
        let lhs_end = if eq > 0 && self.punct(eq - 1, ':') { eq - 1 } else { eq };
        if lhs_end == 0 {
            return None;
        }

        let mut elements = Vec::new();
        let mut end = lhs_end - 1;
        loop {
            self.ident(end)?;
            let mut start = end;
            while start >= 2 && self.punct(start - 1, '.') && self.ident(start - 2).is_some() {
                start -= 2;
            }
            elements.push((start, end));
            if start >= 2 && self.punct(start - 1, ',') && self.ident(start - 2).is_some() {
                end = start - 2;
            } else {
                break;
            }
        }

        elements
            .iter()
            .rev()
            .find(|(s, e)| !(s == e && self.ident(*s) == Some("_")))
            .map(|(s, e)| self.part(self.toks[*s].start, self.toks[*e].end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAMBDA: &str = r#"package main

import (
	"context"

	"github.com/aws/aws-lambda-go/events"
	"github.com/aws/aws-lambda-go/lambda"
	"github.com/aws/aws-sdk-go/aws"
	"github.com/aws/aws-sdk-go/aws/session"
	"github.com/aws/aws-sdk-go/service/s3"
)

var svc = s3.New(session.Must(session.NewSession()))

func handler(ctx context.Context, req events.APIGatewayProxyRequest) (events.APIGatewayProxyResponse, error) {
	_, err := svc.PutObject(&s3.PutObjectInput{
		Bucket: aws.String("uploads"),
		Key:    aws.String(req.PathParameters["key"]),
	})
	return events.APIGatewayProxyResponse{StatusCode: 200}, err
}

func main() {
	lambda.Start(handler)
}
"#;

    fn find<'a>(tree: &'a SyntaxTree, kind: SiteKind, name: &str) -> &'a Site {
        tree.sites
            .iter()
            .find(|s| s.kind == kind && s.name.text == name)
            .unwrap_or_else(|| panic!("no {} site named {}", kind, name))
    }

    #[test]
    fn test_imports_and_bindings() {
        let tree = GoAdapter::new().parse(LAMBDA).unwrap();
        let imports: Vec<_> = tree.imports().map(|s| s.imported.join(",")).collect();
        assert_eq!(imports, vec!["context", "events", "lambda", "aws", "session", "s3"]);
        assert!(tree.imports().all(|s| s.top_level));
    }

    #[test]
    fn test_calls_and_constructions() {
        let tree = GoAdapter::new().parse(LAMBDA).unwrap();

        let new = find(&tree, SiteKind::Call, "New");
        assert_eq!(new.receiver.as_ref().unwrap().text, "s3");
        assert_eq!(new.binding.as_ref().unwrap().text, "svc");
        assert!(new.top_level);

        let put = find(&tree, SiteKind::Call, "PutObject");
        assert_eq!(put.receiver.as_ref().unwrap().text, "svc");
        assert_eq!(put.binding.as_ref().unwrap().text, "err");
        assert!(!put.top_level);
        match &put.positional(0).unwrap().value {
            ArgValue::Construct { name, fields } => {
                assert_eq!(name, "s3.PutObjectInput");
                assert_eq!(fields[0].key, "Bucket");
                assert_eq!(fields[0].part.text, "aws.String(\"uploads\")");
                assert_eq!(fields[1].key, "Key");
            }
            other => panic!("unexpected argument: {:?}", other),
        }

        let input = find(&tree, SiteKind::Construction, "PutObjectInput");
        assert!(LAMBDA[input.span.start..].starts_with("&s3.PutObjectInput{"));

        let response = find(&tree, SiteKind::Construction, "APIGatewayProxyResponse");
        assert_eq!(response.receiver.as_ref().unwrap().text, "events");

        let start = find(&tree, SiteKind::Call, "Start");
        assert_eq!(start.positional(0).unwrap().value, ArgValue::Identifier("handler".into()));
    }

    #[test]
    fn test_handlers_and_types() {
        let tree = GoAdapter::new().parse(LAMBDA).unwrap();
        let handler = find(&tree, SiteKind::Handler, "handler");
        let params: Vec<_> = handler.params.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(params, vec!["ctx", "req"]);
        assert!(handler.body.as_ref().unwrap().text.starts_with('{'));
        assert!(LAMBDA[handler.span.start..handler.span.end].ends_with('}'));

        find(&tree, SiteKind::Handler, "main");
        let request = find(&tree, SiteKind::TypeReference, "APIGatewayProxyRequest");
        assert_eq!(request.receiver.as_ref().unwrap().text, "events");
        find(&tree, SiteKind::TypeReference, "Context");
    }

    #[test]
    fn test_preorder() {
        let tree = GoAdapter::new().parse(LAMBDA).unwrap();
        let names: Vec<_> = tree
            .sites
            .iter()
            .filter(|s| s.kind == SiteKind::Call)
            .map(|s| s.name.text.as_str())
            .take(3)
            .collect();
        assert_eq!(names, vec!["New", "Must", "NewSession"]);
    }

    #[test]
    fn test_comparison_is_not_composite() {
        let source = "package main\n\nimport \"pkg\"\n\nfunc f(x int) {\n\tif x == pkg.Limit {\n\t\treturn\n\t}\n}\n";
        let tree = GoAdapter::new().parse(source).unwrap();
        assert!(tree.sites.iter().all(|s| s.kind != SiteKind::Construction));
        find(&tree, SiteKind::TypeReference, "Limit");
    }

    #[test]
    fn test_syntax_checks() {
        let adapter = GoAdapter::new();
        assert!(adapter.parse("package main\n\nfunc f() {\n").is_err());
        assert!(adapter.parse("func f() {}\n").is_err());
        assert!(adapter.parse("package main\n\nvar s = \"open\n").is_err());
        assert!(adapter.parse("package main\n").is_ok());
    }

    #[test]
    fn test_package_names() {
        assert_eq!(package_name("github.com/aws/aws-sdk-go/service/s3"), "s3");
        assert_eq!(package_name("github.com/Azure/azure-sdk-for-go/sdk/storage/azblob"), "azblob");
        assert_eq!(package_name("github.com/jackc/pgx/v5"), "pgx");
        assert_eq!(package_name("gopkg.in/yaml.v3"), "yaml");
    }

    #[test]
    fn test_import_insertion_into_block() {
        let adapter = GoAdapter::new();
        let tree = adapter.analyze(LAMBDA).unwrap();
        let spec = ImportSpec::named("github.com/Azure/azure-sdk-for-go/sdk/storage/azblob", &[]);
        let ins = adapter.import_insertion(&tree, &[spec.clone()]).unwrap();
        assert_eq!(ins.offset, LAMBDA.find(")\n\nvar").unwrap());
        assert_eq!(ins.text, "\t\"github.com/Azure/azure-sdk-for-go/sdk/storage/azblob\"\n");

        let bare = "package main\n\nfunc main() {}\n";
        let tree = adapter.analyze(bare).unwrap();
        let ins = adapter.import_insertion(&tree, &[spec]).unwrap();
        assert_eq!(ins.offset, 13);
        assert_eq!(
            ins.text,
            "\nimport (\n\t\"github.com/Azure/azure-sdk-for-go/sdk/storage/azblob\"\n)\n"
        );
    }
}
