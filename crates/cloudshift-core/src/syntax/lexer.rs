//! Shared lexer for token-level work
//!
//! One lexer, parameterized by [`LexSyntax`], serves the token-stream adapter,
//! residual cleanup (which must know whether a match sits in a string, a
//! comment or code) and identifier-reference checks during import
//! reconciliation. It recognizes comments, string literals (including Python
//! triple quotes, Go raw strings and JavaScript template literals with
//! `${...}` interpolation), identifiers, numbers and single-character
//! punctuation. JavaScript regex literals are not recognized.

use crate::syntax::SyntaxDiagnostic;
use crate::types::{Part, Span};
use cloudshift_schemas::LanguageVariant;
use std::collections::HashSet;

/// Lexical conventions of one language variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexSyntax {
    pub line_comments: &'static [&'static str],
    pub block_comment: Option<(&'static str, &'static str)>,
    pub quotes: &'static [char],
    /// `"""` and `'''` strings
    pub triple_quotes: bool,
    /// Quote that opens a string without escapes (Go backtick)
    pub raw_quote: Option<char>,
    /// Quote that opens a template literal with `${...}` interpolation
    pub template_quote: Option<char>,
}

pub const JAVASCRIPT: LexSyntax = LexSyntax {
    line_comments: &["//"],
    block_comment: Some(("/*", "*/")),
    quotes: &['\'', '"'],
    triple_quotes: false,
    raw_quote: None,
    template_quote: Some('`'),
};

pub const PYTHON: LexSyntax = LexSyntax {
    line_comments: &["#"],
    block_comment: None,
    quotes: &['\'', '"'],
    triple_quotes: true,
    raw_quote: None,
    template_quote: None,
};

pub const GO: LexSyntax = LexSyntax {
    line_comments: &["//"],
    block_comment: Some(("/*", "*/")),
    quotes: &['"', '\''],
    triple_quotes: false,
    raw_quote: Some('`'),
    template_quote: None,
};

impl LexSyntax {
    pub fn for_variant(variant: LanguageVariant) -> &'static LexSyntax {
        match variant {
            LanguageVariant::JavaScript | LanguageVariant::TypeScript => &JAVASCRIPT,
            LanguageVariant::Python => &PYTHON,
            LanguageVariant::Go => &GO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Ident,
    Number,
    Str,
    Comment,
    Punct,
    Whitespace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

impl Token {
    pub fn text<'t>(&self, source: &'t str) -> &'t str {
        &source[self.start..self.end]
    }

    /// Whether this is punctuation spelled `p`
    pub fn is_punct(&self, source: &str, p: char) -> bool {
        self.kind == TokenKind::Punct && source[self.start..].starts_with(p)
    }

    pub fn is_trivia(&self) -> bool {
        matches!(self.kind, TokenKind::Whitespace | TokenKind::Comment)
    }
}

/// Lexer output
#[derive(Debug, Clone, Default)]
pub struct Lexed {
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<SyntaxDiagnostic>,
}

/// Tokenize `text`; the tokens cover the input without gaps
pub fn lex(text: &str, syntax: &LexSyntax) -> Lexed {
    let mut lexer = Lexer {
        text,
        bytes: text.as_bytes(),
        pos: 0,
        syntax,
        out: Lexed::default(),
        index: LineIndex::new(text),
    };
    lexer.run(false);
    lexer.out
}

struct Lexer<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    syntax: &'a LexSyntax,
    out: Lexed,
    index: LineIndex,
}

impl<'a> Lexer<'a> {
    fn run(&mut self, in_interpolation: bool) {
        let text = self.text;
        let syntax = self.syntax;
        let mut depth = 0usize;
        while self.pos < self.bytes.len() {
            let start = self.pos;
            let rest = &text[start..];
            let ch = match rest.chars().next() {
                Some(c) => c,
                None => break,
            };

            if in_interpolation && ch == '}' && depth == 0 {
                return;
            }

            if let Some(marker) = syntax.line_comments.iter().find(|m| rest.starts_with(**m)) {
                let len = rest[marker.len()..].find('\n').map(|i| i + marker.len()).unwrap_or(rest.len());
                self.push(TokenKind::Comment, start, start + len);
            } else if let Some((open, close)) = syntax.block_comment.filter(|(o, _)| rest.starts_with(*o)) {
                match rest[open.len()..].find(close) {
                    Some(i) => self.push(TokenKind::Comment, start, start + open.len() + i + close.len()),
                    None => {
                        self.diagnose(start, "unterminated block comment");
                        self.push(TokenKind::Comment, start, self.bytes.len());
                    }
                }
            } else if Some(ch) == syntax.template_quote {
                self.template(start, ch);
            } else if syntax.triple_quotes && (rest.starts_with("\"\"\"") || rest.starts_with("'''")) {
                let delimiter = &rest[..3];
                match find_unescaped(&rest[3..], delimiter) {
                    Some(i) => self.push(TokenKind::Str, start, start + 3 + i + 3),
                    None => {
                        self.diagnose(start, "unterminated triple-quoted string");
                        self.push(TokenKind::Str, start, self.bytes.len());
                    }
                }
            } else if Some(ch) == syntax.raw_quote {
                match rest[1..].find(ch) {
                    Some(i) => self.push(TokenKind::Str, start, start + 1 + i + 1),
                    None => {
                        self.diagnose(start, "unterminated raw string");
                        self.push(TokenKind::Str, start, self.bytes.len());
                    }
                }
            } else if syntax.quotes.contains(&ch) {
                self.quoted(start, ch);
            } else if ch.is_whitespace() {
                let len = rest.find(|c: char| !c.is_whitespace()).unwrap_or(rest.len());
                self.push(TokenKind::Whitespace, start, start + len);
            } else if is_ident_start(ch) {
                let len = rest.find(|c: char| !is_ident_continue(c)).unwrap_or(rest.len());
                self.push(TokenKind::Ident, start, start + len);
            } else if ch.is_ascii_digit() {
                let len = rest
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '.' || c == '_'))
                    .unwrap_or(rest.len());
                self.push(TokenKind::Number, start, start + len);
            } else {
                if in_interpolation {
                    match ch {
                        '{' => depth += 1,
                        '}' => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                }
                self.push(TokenKind::Punct, start, start + ch.len_utf8());
            }
        }
    }

    fn quoted(&mut self, start: usize, quote: char) {
        let mut i = start + quote.len_utf8();
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\\' => i += 2,
                b'\n' => break,
                b if b as char == quote => {
                    self.push(TokenKind::Str, start, i + 1);
                    return;
                }
                _ => i += 1,
            }
        }
        let end = i.min(self.bytes.len());
        self.diagnose(start, "unterminated string literal");
        self.push(TokenKind::Str, start, end);
    }

    fn template(&mut self, start: usize, quote: char) {
        let mut chunk_start = start;
        let mut i = start + 1;
        while i < self.bytes.len() {
            match self.bytes[i] {
                b'\\' => i += 2,
                b if b as char == quote => {
                    self.push(TokenKind::Str, chunk_start, i + 1);
                    return;
                }
                b'$' if self.bytes.get(i + 1) == Some(&b'{') => {
                    self.push(TokenKind::Str, chunk_start, i + 2);
                    self.pos = i + 2;
                    self.run(true);
                    // `run` stops on the closing brace, which resumes the literal
                    chunk_start = self.pos;
                    i = self.pos + 1;
                }
                _ => i += 1,
            }
        }
        self.diagnose(start, "unterminated template literal");
        self.push(TokenKind::Str, chunk_start.min(self.bytes.len()), self.bytes.len());
    }

    fn push(&mut self, kind: TokenKind, start: usize, end: usize) {
        let end = end.min(self.bytes.len());
        self.out.tokens.push(Token { kind, start, end });
        self.pos = end;
    }

    fn diagnose(&mut self, offset: usize, message: &str) {
        let (line, column) = self.index.position(self.text, offset);
        self.out.diagnostics.push(SyntaxDiagnostic {
            line,
            column,
            message: message.to_string(),
        });
    }
}

fn find_unescaped(haystack: &str, needle: &str) -> Option<usize> {
    let bytes = haystack.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if haystack[i..].starts_with(needle) {
            return Some(i);
        }
        i += 1;
    }
    None
}

pub fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

pub fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Report unbalanced `()`, `[]` and `{}` outside strings and comments
pub fn check_delimiters(text: &str, tokens: &[Token]) -> Vec<SyntaxDiagnostic> {
    let index = LineIndex::new(text);
    let mut stack: Vec<(char, usize)> = Vec::new();
    let mut diagnostics = Vec::new();

    for token in tokens.iter().filter(|t| t.kind == TokenKind::Punct) {
        let c = match token.text(text).chars().next() {
            Some(c) => c,
            None => continue,
        };
        match c {
            '(' | '[' | '{' => stack.push((c, token.start)),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => '(',
                    ']' => '[',
                    _ => '{',
                };
                match stack.pop() {
                    Some((open, _)) if open == expected => {}
                    _ => {
                        let (line, column) = index.position(text, token.start);
                        diagnostics.push(SyntaxDiagnostic {
                            line,
                            column,
                            message: format!("unmatched '{}'", c),
                        });
                        return diagnostics;
                    }
                }
            }
            _ => {}
        }
    }

    if let Some((open, offset)) = stack.pop() {
        let (line, column) = index.position(text, offset);
        diagnostics.push(SyntaxDiagnostic {
            line,
            column,
            message: format!("unclosed '{}'", open),
        });
    }
    diagnostics
}

/// Identifiers used as code (outside strings and comments)
pub fn identifiers(text: &str, syntax: &LexSyntax) -> HashSet<String> {
    lex(text, syntax)
        .tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Ident)
        .map(|t| t.text(text).to_string())
        .collect()
}

/// Copy of `text` with comment bytes replaced by spaces, newlines kept
pub fn mask_comments(text: &str, syntax: &LexSyntax) -> String {
    let mut masked = String::with_capacity(text.len());
    for token in lex(text, syntax).tokens {
        let piece = token.text(text);
        if token.kind == TokenKind::Comment {
            masked.extend(piece.chars().map(|c| if c == '\n' { '\n' } else { ' ' }));
        } else {
            masked.push_str(piece);
        }
    }
    masked
}

/// Byte offsets of line starts, for cheap line/column lookups
#[derive(Debug, Clone)]
pub struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(text.match_indices('\n').map(|(i, _)| i + 1));
        Self { starts }
    }

    /// 1-based line and character column of a byte offset
    pub fn position(&self, text: &str, offset: usize) -> (usize, usize) {
        let line = match self.starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let line_start = self.starts[line];
        let end = offset.min(text.len());
        let column = text.get(line_start..end).map(|s| s.chars().count()).unwrap_or(0) + 1;
        (line + 1, column)
    }

    pub fn span(&self, text: &str, start: usize, end: usize) -> Span {
        let (line, column) = self.position(text, start);
        Span::new(start, end, line, column)
    }

    pub fn part(&self, text: &str, start: usize, end: usize) -> Part {
        Part::new(&text[start..end], self.span(text, start, end))
    }

    /// Byte offset where the line containing `offset` starts
    pub fn line_start(&self, offset: usize) -> usize {
        match self.starts.binary_search(&offset) {
            Ok(i) => self.starts[i],
            Err(i) => self.starts[i - 1],
        }
    }
}

/// Leading whitespace of the line containing `offset`
pub fn indentation_at(text: &str, offset: usize) -> &str {
    let line_start = text[..offset.min(text.len())].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let rest = &text[line_start..];
    let len = rest.find(|c: char| c != ' ' && c != '\t').unwrap_or(rest.len());
    &rest[..len]
}

/// Widen a statement span to whole lines when nothing else shares them
pub fn expand_to_lines(text: &str, start: usize, end: usize) -> (usize, usize) {
    let line_start = text[..start].rfind('\n').map(|i| i + 1).unwrap_or(0);
    let before_blank = text[line_start..start].chars().all(|c| c == ' ' || c == '\t');

    let after = &text[end..];
    let line_end_rel = after.find('\n');
    let tail = &after[..line_end_rel.unwrap_or(after.len())];
    let tail_trim = tail.trim_end_matches(['\r', ' ', '\t', ';']);
    let after_blank = tail_trim.is_empty();

    if before_blank && after_blank {
        let new_end = match line_end_rel {
            Some(i) => end + i + 1,
            None => text.len(),
        };
        (line_start, new_end)
    } else {
        (start, end)
    }
}
