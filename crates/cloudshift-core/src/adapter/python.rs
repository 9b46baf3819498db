//! Python adapter built on tree-sitter

use super::tree::{self, children, is_field, named_children, Source};
use super::{insertion, line_end_after, preamble_end, Insertion, LanguageAdapter};
use crate::catalog::ImportSpec;
use crate::error::Result;
use crate::syntax::lexer::{self, TokenKind, PYTHON};
use crate::syntax::{unquote, ArgValue, Argument, Field, Site, SyntaxTree};
use crate::types::Part;
use cloudshift_schemas::{Fidelity, LanguageVariant, SiteKind};
use tree_sitter::Node;

/// Adapter for Python 3 sources
#[derive(Debug, Clone, Copy, Default)]
pub struct PythonAdapter;

impl PythonAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl LanguageAdapter for PythonAdapter {
    fn variant(&self) -> LanguageVariant {
        LanguageVariant::Python
    }

    fn fidelity(&self) -> Fidelity {
        Fidelity::Full
    }

    fn analyze(&self, text: &str) -> Result<SyntaxTree> {
        let language = tree_sitter_python::LANGUAGE.into();
        let parsed = tree::parse(LanguageVariant::Python, &language, text)?;
        let root = parsed.root_node();
        let mut lowering = Lowering {
            src: Source::new(text),
            tree: SyntaxTree::new(LanguageVariant::Python, Fidelity::Full, text),
        };
        lowering.tree.diagnostics = tree::diagnostics(root);
        lowering.visit(root, false);
        lowering.tree.sort_sites();
        Ok(lowering.tree)
    }

    fn import_insertion(&self, tree: &SyntaxTree, imports: &[ImportSpec]) -> Option<Insertion> {
        let text = tree.text.as_str();
        let last_import = tree.imports().filter(|s| s.top_level).map(|s| s.span.end).max();
        let offset = match last_import {
            Some(end) => line_end_after(text, end),
            None => after_docstring(text),
        };
        let lines = imports.iter().flat_map(render_import).collect();
        insertion(text, offset, lines, last_import.is_none())
    }
}

fn render_import(spec: &ImportSpec) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(alias) = &spec.alias {
        lines.push(format!("import {} as {}", spec.module, alias));
    }
    if !spec.names.is_empty() {
        lines.push(format!("from {} import {}", spec.module, spec.names.join(", ")));
    }
    if lines.is_empty() {
        lines.push(format!("import {}", spec.module));
    }
    lines
}

/// Offset after leading comments and the module docstring
fn after_docstring(text: &str) -> usize {
    let start = preamble_end(text, &PYTHON);
    let lexed = lexer::lex(&text[start..], &PYTHON);
    let first = lexed
        .tokens
        .iter()
        .find(|t| !t.is_trivia());
    match first {
        Some(token) if token.kind == TokenKind::Str => line_end_after(text, start + token.end),
        _ => start,
    }
}

struct Lowering<'t> {
    src: Source<'t>,
    tree: SyntaxTree,
}

impl<'t> Lowering<'t> {
    fn visit(&mut self, node: Node<'_>, nested: bool) {
        match node.kind() {
            "comment" => {}
            "string" | "concatenated_string" => {
                self.tree.literals.push(self.src.part(node));
                for child in named_children(node) {
                    if child.kind() == "interpolation" {
                        self.visit_children(child, nested);
                    }
                }
            }
            "import_statement" => self.import_statement(node, nested),
            "import_from_statement" => self.import_from_statement(node, nested),
            "call" => self.call(node, nested),
            "function_definition" => self.function_definition(node, nested),
            "class_definition" | "lambda" => self.visit_children(node, true),
            "type" => self.type_reference(node, nested),
            _ => self.visit_children(node, nested),
        }
    }

    fn visit_children(&mut self, node: Node<'_>, nested: bool) {
        for child in children(node) {
            self.visit(child, nested);
        }
    }

    fn import_statement(&mut self, node: Node<'_>, nested: bool) {
        let mut module: Option<Part> = None;
        let mut imported = Vec::new();
        let mut cursor = node.walk();
        for name in node.children_by_field_name("name", &mut cursor) {
            let (path, binding) = match name.kind() {
                "aliased_import" => {
                    let path = name.child_by_field_name("name");
                    let alias = name.child_by_field_name("alias");
                    match (path, alias) {
                        (Some(path), Some(alias)) => (path, self.src.text(alias).to_string()),
                        _ => continue,
                    }
                }
                _ => {
                    let text = self.src.text(name);
                    let root = text.split('.').next().unwrap_or(text).to_string();
                    (name, root)
                }
            };
            if module.is_none() {
                module = Some(self.src.part(path));
            }
            imported.push(binding);
        }
        let Some(module) = module else {
            return;
        };
        let mut site = Site::new(SiteKind::Import, self.src.span(node), module);
        site.imported = imported;
        site.top_level = !nested;
        self.tree.push_site(site);
    }

    fn import_from_statement(&mut self, node: Node<'_>, nested: bool) {
        let Some(module) = node.child_by_field_name("module_name") else {
            return;
        };
        let mut site = Site::new(SiteKind::Import, self.src.span(node), self.src.part(module));
        let mut cursor = node.walk();
        for name in node.children_by_field_name("name", &mut cursor) {
            let local = match name.kind() {
                "aliased_import" => name.child_by_field_name("alias"),
                _ => Some(name),
            };
            if let Some(local) = local {
                site.imported.push(self.src.text(local).to_string());
            }
        }
        site.top_level = !nested;
        self.tree.push_site(site);
    }

    fn call(&mut self, node: Node<'_>, nested: bool) {
        let Some(function) = node.child_by_field_name("function") else {
            self.visit_children(node, nested);
            return;
        };
        let (name, receiver) = match function.kind() {
            "attribute" => match (
                function.child_by_field_name("object"),
                function.child_by_field_name("attribute"),
            ) {
                (Some(object), Some(attribute)) => {
                    (self.src.part(attribute), Some(self.src.part(object)))
                }
                _ => (self.src.part(function), None),
            },
            _ => (self.src.part(function), None),
        };

        let mut site = Site::new(SiteKind::Call, self.src.span(node), name);
        site.receiver = receiver;
        if let Some(arguments) = node.child_by_field_name("arguments") {
            site.args = self.arguments(arguments);
        }
        site.binding = self.binding(node);
        site.top_level = !nested;
        self.tree.push_site(site);
        self.visit_children(node, nested);
    }

    fn arguments(&self, list: Node<'_>) -> Vec<Argument> {
        if list.kind() == "generator_expression" {
            return vec![Argument {
                keyword: None,
                part: self.src.part(list),
                value: ArgValue::Other,
            }];
        }
        named_children(list)
            .into_iter()
            .map(|arg| match arg.kind() {
                "keyword_argument" => {
                    let keyword = arg
                        .child_by_field_name("name")
                        .map(|n| self.src.text(n).to_string());
                    let value = arg.child_by_field_name("value").unwrap_or(arg);
                    Argument {
                        keyword,
                        part: self.src.part(value),
                        value: self.value(value),
                    }
                }
                _ => Argument {
                    keyword: None,
                    part: self.src.part(arg),
                    value: self.value(arg),
                },
            })
            .collect()
    }

    fn value(&self, node: Node<'_>) -> ArgValue {
        match node.kind() {
            "string" => {
                if named_children(node).iter().any(|c| c.kind() == "interpolation") {
                    ArgValue::Other
                } else {
                    ArgValue::Str(unquote(self.src.text(node)))
                }
            }
            "dictionary" => ArgValue::Object(
                named_children(node)
                    .into_iter()
                    .filter(|entry| entry.kind() == "pair")
                    .filter_map(|pair| {
                        let key = pair.child_by_field_name("key")?;
                        let value = pair.child_by_field_name("value")?;
                        let key = match key.kind() {
                            "string" => unquote(self.src.text(key)),
                            _ => self.src.text(key).to_string(),
                        };
                        Some(Field {
                            key,
                            part: self.src.part(value),
                            value: self.value(value),
                        })
                    })
                    .collect(),
            ),
            "lambda" => ArgValue::Function {
                params: node
                    .child_by_field_name("parameters")
                    .map(|p| named_children(p).len())
                    .unwrap_or(0),
            },
            "identifier" => ArgValue::Identifier(self.src.text(node).to_string()),
            _ => ArgValue::Other,
        }
    }

    fn binding(&self, node: Node<'_>) -> Option<Part> {
        let mut current = node;
        while let Some(parent) = current.parent() {
            match parent.kind() {
                "await" | "parenthesized_expression" => current = parent,
                "assignment" if is_field(parent, "right", current) => {
                    return parent
                        .child_by_field_name("left")
                        .filter(|l| matches!(l.kind(), "identifier" | "attribute"))
                        .map(|l| self.src.part(l));
                }
                _ => return None,
            }
        }
        None
    }

    fn function_definition(&mut self, node: Node<'_>, nested: bool) {
        let top_level = node.parent().is_some_and(|p| {
            p.kind() == "module"
                || (p.kind() == "decorated_definition"
                    && p.parent().is_some_and(|g| g.kind() == "module"))
        });

        if top_level && !nested {
            if let Some(name) = node.child_by_field_name("name") {
                let mut site = Site::new(SiteKind::Handler, self.src.span(node), self.src.part(name));
                if let Some(parameters) = node.child_by_field_name("parameters") {
                    site.params = named_children(parameters)
                        .into_iter()
                        .map(|param| self.param_name(param))
                        .collect();
                }
                site.body = self.body_after_colon(node);
                site.top_level = true;
                self.tree.push_site(site);
            }
        }
        self.visit_children(node, true);
    }

    fn param_name(&self, param: Node<'_>) -> Part {
        let name = match param.kind() {
            "default_parameter" | "typed_default_parameter" => param.child_by_field_name("name"),
            "typed_parameter" => named_children(param)
                .into_iter()
                .find(|c| c.kind() == "identifier"),
            _ => None,
        };
        self.src.part(name.unwrap_or(param))
    }

    /// Everything from just after the signature's `:` to the end of the body
    fn body_after_colon(&self, node: Node<'_>) -> Option<Part> {
        let body = node.child_by_field_name("body")?;
        let colon = children(node)
            .into_iter()
            .take_while(|c| c.id() != body.id())
            .filter(|c| c.kind() == ":")
            .last()?;
        Some(self.src.range(colon.end_byte(), body.end_byte()))
    }

    fn type_reference(&mut self, node: Node<'_>, nested: bool) {
        let inner = named_children(node);
        match inner.as_slice() {
            [ident] if ident.kind() == "identifier" => {
                let mut site = Site::new(SiteKind::TypeReference, self.src.span(node), self.src.part(*ident));
                site.top_level = !nested;
                self.tree.push_site(site);
            }
            [attr] if attr.kind() == "attribute" => {
                let mut site = Site::new(
                    SiteKind::TypeReference,
                    self.src.span(node),
                    attr.child_by_field_name("attribute")
                        .map(|a| self.src.part(a))
                        .unwrap_or_else(|| self.src.part(*attr)),
                );
                site.receiver = attr.child_by_field_name("object").map(|o| self.src.part(o));
                site.top_level = !nested;
                self.tree.push_site(site);
            }
            _ => self.visit_children(node, nested),
        }
    }
}
