//! JavaScript and TypeScript adapter built on tree-sitter
//!
//! Recognizes CommonJS `require` and ES module imports, `new` expressions,
//! calls (with object-literal arguments lowered into fields), exported
//! handlers (`exports.x = fn`, `module.exports.x = fn`, `export const x =
//! fn`, `export function x`) and, for TypeScript, type references.

use super::tree::{self, children, is_field, named_children, Source};
use super::{insertion, line_end_after, preamble_end, DebrisPattern, Insertion, LanguageAdapter};
use crate::catalog::ImportSpec;
use crate::error::Result;
use crate::syntax::lexer::JAVASCRIPT;
use crate::syntax::{unquote, ArgValue, Argument, Field, Site, SyntaxTree};
use crate::types::Part;
use cloudshift_schemas::{Fidelity, LanguageVariant, SiteKind};
use tree_sitter::{Language, Node};

const DEBRIS: &[DebrisPattern] = &[
    DebrisPattern {
        id: "js.empty-require-destructure",
        pattern: r"(?m)^[ \t]*(?:const|let|var)\s*\{\s*\}\s*=\s*require\([^)]*\);?[ \t]*\r?\n?",
    },
    DebrisPattern {
        id: "js.empty-named-import",
        pattern: r#"(?m)^[ \t]*import\s*\{\s*\}\s*from\s*['"][^'"]*['"];?[ \t]*\r?\n?"#,
    },
];

/// Adapter for JavaScript (`js`) and TypeScript (`ts`)
#[derive(Debug, Clone, Copy)]
pub struct JsAdapter {
    variant: LanguageVariant,
}

impl JsAdapter {
    pub fn javascript() -> Self {
        Self {
            variant: LanguageVariant::JavaScript,
        }
    }

    pub fn typescript() -> Self {
        Self {
            variant: LanguageVariant::TypeScript,
        }
    }

    fn language(&self) -> Language {
        match self.variant {
            LanguageVariant::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            _ => tree_sitter_javascript::LANGUAGE.into(),
        }
    }

    fn is_esm(&self, tree: &SyntaxTree, first_import: Option<&Site>) -> bool {
        match first_import {
            Some(site) => tree.text[site.span.start..].starts_with("import"),
            None => {
                self.variant == LanguageVariant::TypeScript
                    || tree.text.lines().any(|line| {
                        let line = line.trim_start();
                        line.starts_with("import ") || line.starts_with("export ")
                    })
            }
        }
    }
}

impl LanguageAdapter for JsAdapter {
    fn variant(&self) -> LanguageVariant {
        self.variant
    }

    fn fidelity(&self) -> Fidelity {
        Fidelity::Full
    }

    fn analyze(&self, text: &str) -> Result<SyntaxTree> {
        let parsed = tree::parse(self.variant, &self.language(), text)?;
        let root = parsed.root_node();
        let mut lowering = Lowering {
            src: Source::new(text),
            tree: SyntaxTree::new(self.variant, Fidelity::Full, text),
            typescript: self.variant == LanguageVariant::TypeScript,
        };
        lowering.tree.diagnostics = tree::diagnostics(root);
        lowering.visit(root, false);
        lowering.tree.sort_sites();
        Ok(lowering.tree)
    }

    fn import_insertion(&self, tree: &SyntaxTree, imports: &[ImportSpec]) -> Option<Insertion> {
        let text = tree.text.as_str();
        let existing: Vec<&Site> = tree.imports().filter(|s| s.top_level).collect();
        let first = existing.first().copied();

        let esm = self.is_esm(tree, first);
        let quote = match first {
            Some(site) if text[site.name.span.start..].starts_with('"') => '"',
            _ => '\'',
        };
        let semicolon = first.map_or(true, |site| text[..site.span.end].ends_with(';'));

        let offset = match existing.iter().map(|s| s.span.end).max() {
            Some(end) => line_end_after(text, end),
            None => {
                let start = preamble_end(text, &JAVASCRIPT);
                let rest = text[start..].trim_start();
                if rest.starts_with("'use strict'") || rest.starts_with("\"use strict\"") {
                    let directive = text.len() - rest.len();
                    line_end_after(text, directive)
                } else {
                    start
                }
            }
        };

        let lines = imports
            .iter()
            .flat_map(|spec| render_import(spec, esm, quote))
            .map(|line| if semicolon { line } else { line.trim_end_matches(';').to_string() })
            .collect();
        insertion(text, offset, lines, existing.is_empty())
    }

    fn debris_patterns(&self) -> &'static [DebrisPattern] {
        DEBRIS
    }
}

fn render_import(spec: &ImportSpec, esm: bool, quote: char) -> Vec<String> {
    let module = format!("{q}{}{q}", spec.module, q = quote);
    let mut lines = Vec::new();
    if let Some(alias) = &spec.alias {
        lines.push(if esm {
            format!("import * as {} from {};", alias, module)
        } else {
            format!("const {} = require({});", alias, module)
        });
    }
    if !spec.names.is_empty() {
        let names = spec.names.join(", ");
        lines.push(if esm {
            format!("import {{ {} }} from {};", names, module)
        } else {
            format!("const {{ {} }} = require({});", names, module)
        });
    }
    if lines.is_empty() {
        lines.push(if esm {
            format!("import {};", module)
        } else {
            format!("require({});", module)
        });
    }
    lines
}

fn is_function(kind: &str) -> bool {
    matches!(
        kind,
        "arrow_function"
            | "function_expression"
            | "function"
            | "function_declaration"
            | "generator_function"
            | "generator_function_declaration"
            | "method_definition"
    )
}

struct Lowering<'t> {
    src: Source<'t>,
    tree: SyntaxTree,
    typescript: bool,
}

impl<'t> Lowering<'t> {
    fn visit(&mut self, node: Node<'_>, nested: bool) {
        match node.kind() {
            "comment" => {}
            "string" => self.tree.literals.push(self.src.part(node)),
            "template_string" => {
                self.tree.literals.push(self.src.part(node));
                for child in named_children(node) {
                    if child.kind() == "template_substitution" {
                        self.visit(child, nested);
                    }
                }
            }
            "import_statement" => self.import_statement(node, nested),
            "lexical_declaration" | "variable_declaration" => {
                if !self.require_declaration(node, nested) {
                    self.visit_children(node, nested);
                }
            }
            "export_statement" => self.export_statement(node, nested),
            "expression_statement" => self.expression_statement(node, nested),
            "call_expression" => self.call(node, nested),
            "new_expression" => self.construction(node, nested),
            "nested_type_identifier" | "type_identifier" if self.typescript => {
                self.type_reference(node, nested)
            }
            "class_declaration" | "class" => self.visit_children(node, true),
            kind if is_function(kind) => self.visit_children(node, true),
            _ => self.visit_children(node, nested),
        }
    }

    fn visit_children(&mut self, node: Node<'_>, nested: bool) {
        for child in children(node) {
            self.visit(child, nested);
        }
    }

    fn import_statement(&mut self, node: Node<'_>, nested: bool) {
        let Some(source) = node.child_by_field_name("source") else {
            return;
        };
        let module = unquote(self.src.text(source));
        let mut site = Site::new(
            SiteKind::Import,
            self.src.span(node),
            Part::new(module, self.src.span(source)),
        );
        for clause in named_children(node).into_iter().filter(|c| c.kind() == "import_clause") {
            for binding in named_children(clause) {
                match binding.kind() {
                    "identifier" => site.imported.push(self.src.text(binding).to_string()),
                    "namespace_import" => {
                        if let Some(ident) = named_children(binding)
                            .into_iter()
                            .find(|n| n.kind() == "identifier")
                        {
                            site.imported.push(self.src.text(ident).to_string());
                        }
                    }
                    "named_imports" => {
                        for spec in named_children(binding) {
                            let local = spec
                                .child_by_field_name("alias")
                                .or_else(|| spec.child_by_field_name("name"));
                            if let Some(local) = local {
                                site.imported.push(self.src.text(local).to_string());
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        site.top_level = !nested;
        self.tree.push_site(site);
    }

    /// `const x = require('m')` and friends; returns false when not an import
    fn require_declaration(&mut self, node: Node<'_>, nested: bool) -> bool {
        let declarators: Vec<_> = named_children(node)
            .into_iter()
            .filter(|c| c.kind() == "variable_declarator")
            .collect();
        let [declarator] = declarators.as_slice() else {
            return false;
        };
        let Some(value) = declarator.child_by_field_name("value") else {
            return false;
        };
        let required = require_module(value, &self.src).or_else(|| {
            // const S3 = require('aws-sdk').S3
            (value.kind() == "member_expression")
                .then(|| value.child_by_field_name("object"))
                .flatten()
                .and_then(|object| require_module(object, &self.src))
        });
        let Some((module, literal)) = required else {
            return false;
        };

        let mut site = Site::new(
            SiteKind::Import,
            self.src.span(node),
            Part::new(module, self.src.span(literal)),
        );
        if let Some(name) = declarator.child_by_field_name("name") {
            site.imported = self.pattern_bindings(name);
        }
        site.top_level = !nested;
        self.tree.push_site(site);
        true
    }

    fn pattern_bindings(&self, pattern: Node<'_>) -> Vec<String> {
        match pattern.kind() {
            "identifier" => vec![self.src.text(pattern).to_string()],
            "object_pattern" => named_children(pattern)
                .into_iter()
                .filter_map(|entry| match entry.kind() {
                    "shorthand_property_identifier_pattern" => Some(self.src.text(entry).to_string()),
                    "pair_pattern" => entry
                        .child_by_field_name("value")
                        .map(|v| self.src.text(v).to_string()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    fn export_statement(&mut self, node: Node<'_>, nested: bool) {
        if let Some(decl) = node.child_by_field_name("declaration") {
            match decl.kind() {
                "function_declaration" | "generator_function_declaration" => {
                    if let Some(name) = decl.child_by_field_name("name") {
                        self.handler(node, name, decl, nested);
                        self.visit(decl, true);
                        return;
                    }
                }
                "lexical_declaration" | "variable_declaration" => {
                    let declarators = named_children(decl);
                    if let [declarator] = declarators.as_slice() {
                        let name = declarator.child_by_field_name("name");
                        let value = declarator.child_by_field_name("value");
                        if let (Some(name), Some(value)) = (name, value) {
                            if name.kind() == "identifier" && is_function(value.kind()) {
                                self.handler(node, name, value, nested);
                                self.visit(value, true);
                                return;
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        self.visit_children(node, nested);
    }

    fn expression_statement(&mut self, node: Node<'_>, nested: bool) {
        if let Some(expr) = named_children(node).first().copied() {
            if expr.kind() == "assignment_expression" {
                let left = expr.child_by_field_name("left");
                let right = expr.child_by_field_name("right");
                if let (Some(left), Some(right)) = (left, right) {
                    if left.kind() == "member_expression" && is_function(right.kind()) {
                        let object = left.child_by_field_name("object").map(|o| self.src.text(o));
                        let property = left.child_by_field_name("property");
                        if let (Some("exports" | "module.exports"), Some(property)) = (object, property) {
                            self.handler(expr, property, right, nested);
                            self.visit(right, true);
                            return;
                        }
                    }
                }
            }

            // require('side-effect')
            if let Some((module, literal)) = require_module(expr, &self.src) {
                let mut site = Site::new(
                    SiteKind::Import,
                    self.src.span(node),
                    Part::new(module, self.src.span(literal)),
                );
                site.top_level = !nested;
                self.tree.push_site(site);
                return;
            }
        }
        self.visit_children(node, nested);
    }

    fn handler(&mut self, outer: Node<'_>, name: Node<'_>, function: Node<'_>, nested: bool) {
        let start = outer.start_byte();
        let mut end = outer.end_byte();
        if self.src.text[start..end].ends_with(';') {
            end -= 1;
        }
        let mut site = Site::new(
            SiteKind::Handler,
            self.src.index.span(self.src.text, start, end),
            self.src.part(name),
        );
        site.params = self.params(function);
        site.body = function.child_by_field_name("body").map(|b| self.src.part(b));
        site.top_level = !nested;
        self.tree.push_site(site);
    }

    fn params(&self, function: Node<'_>) -> Vec<Part> {
        if let Some(single) = function.child_by_field_name("parameter") {
            return vec![self.src.part(single)];
        }
        let Some(list) = function.child_by_field_name("parameters") else {
            return Vec::new();
        };
        named_children(list)
            .into_iter()
            .map(|param| match param.kind() {
                "assignment_pattern" => param.child_by_field_name("left").unwrap_or(param),
                "required_parameter" | "optional_parameter" => {
                    param.child_by_field_name("pattern").unwrap_or(param)
                }
                _ => param,
            })
            .map(|param| self.src.part(param))
            .collect()
    }

    fn call(&mut self, node: Node<'_>, nested: bool) {
        let Some(function) = node.child_by_field_name("function") else {
            self.visit_children(node, nested);
            return;
        };
        if function.kind() == "identifier" && self.src.text(function) == "require" {
            self.visit_children(node, nested);
            return;
        }

        let (name, receiver) = self.callee(function);
        let mut site = Site::new(SiteKind::Call, self.src.span(node), name);
        site.receiver = receiver;
        site.args = self.arguments(node.child_by_field_name("arguments"));
        site.binding = self.binding(node);
        site.top_level = !nested;
        self.tree.push_site(site);
        self.visit_children(node, nested);
    }

    fn construction(&mut self, node: Node<'_>, nested: bool) {
        let Some(constructor) = node.child_by_field_name("constructor") else {
            self.visit_children(node, nested);
            return;
        };
        let (name, receiver) = self.callee(constructor);
        let mut site = Site::new(SiteKind::Construction, self.src.span(node), name);
        site.receiver = receiver;
        site.args = self.arguments(node.child_by_field_name("arguments"));
        site.binding = self.binding(node);
        site.top_level = !nested;
        self.tree.push_site(site);
        self.visit_children(node, nested);
    }

    fn type_reference(&mut self, node: Node<'_>, nested: bool) {
        let mut site = if node.kind() == "nested_type_identifier" {
            let Some(name) = node.child_by_field_name("name") else {
                return;
            };
            let mut site = Site::new(SiteKind::TypeReference, self.src.span(node), self.src.part(name));
            site.receiver = node.child_by_field_name("module").map(|m| self.src.part(m));
            site
        } else {
            Site::new(SiteKind::TypeReference, self.src.span(node), self.src.part(node))
        };
        site.top_level = !nested;
        self.tree.push_site(site);
    }

    /// Name and receiver of a callee or constructor expression
    fn callee(&self, node: Node<'_>) -> (Part, Option<Part>) {
        if node.kind() == "member_expression" {
            if let (Some(object), Some(property)) = (
                node.child_by_field_name("object"),
                node.child_by_field_name("property"),
            ) {
                return (self.src.part(property), Some(self.src.part(object)));
            }
        }
        (self.src.part(node), None)
    }

    fn arguments(&self, node: Option<Node<'_>>) -> Vec<Argument> {
        let Some(node) = node else {
            return Vec::new();
        };
        named_children(node)
            .into_iter()
            .map(|arg| Argument {
                keyword: None,
                part: self.src.part(arg),
                value: self.value(arg),
            })
            .collect()
    }

    fn value(&self, node: Node<'_>) -> ArgValue {
        match node.kind() {
            "string" => ArgValue::Str(unquote(self.src.text(node))),
            "template_string" => {
                if named_children(node)
                    .iter()
                    .any(|c| c.kind() == "template_substitution")
                {
                    ArgValue::Other
                } else {
                    ArgValue::Str(unquote(self.src.text(node)))
                }
            }
            "object" => ArgValue::Object(self.fields(node)),
            "new_expression" => {
                let name = node
                    .child_by_field_name("constructor")
                    .map(|c| self.src.text(c).to_string())
                    .unwrap_or_default();
                let fields = node
                    .child_by_field_name("arguments")
                    .and_then(|args| named_children(args).into_iter().find(|a| a.kind() == "object"))
                    .map(|object| self.fields(object))
                    .unwrap_or_default();
                ArgValue::Construct { name, fields }
            }
            "arrow_function" | "function_expression" | "function" => ArgValue::Function {
                params: self.params(node).len(),
            },
            "identifier" => ArgValue::Identifier(self.src.text(node).to_string()),
            _ => ArgValue::Other,
        }
    }

    fn fields(&self, object: Node<'_>) -> Vec<Field> {
        named_children(object)
            .into_iter()
            .filter_map(|entry| match entry.kind() {
                "pair" => {
                    let key = entry.child_by_field_name("key")?;
                    let value = entry.child_by_field_name("value")?;
                    let key = match key.kind() {
                        "string" => unquote(self.src.text(key)),
                        _ => self.src.text(key).to_string(),
                    };
                    Some(Field {
                        key,
                        part: self.src.part(value),
                        value: self.value(value),
                    })
                }
                "shorthand_property_identifier" => {
                    let name = self.src.text(entry).to_string();
                    Some(Field {
                        key: name.clone(),
                        part: self.src.part(entry),
                        value: ArgValue::Identifier(name),
                    })
                }
                _ => None,
            })
            .collect()
    }

    /// Variable a call or construction result is assigned to
    fn binding(&self, node: Node<'_>) -> Option<Part> {
        let mut current = node;
        while let Some(parent) = current.parent() {
            match parent.kind() {
                "await_expression" | "parenthesized_expression" | "as_expression"
                | "non_null_expression" => current = parent,
                "variable_declarator" if is_field(parent, "value", current) => {
                    return parent
                        .child_by_field_name("name")
                        .filter(|n| n.kind() == "identifier")
                        .map(|n| self.src.part(n));
                }
                "assignment_expression" if is_field(parent, "right", current) => {
                    return parent.child_by_field_name("left").map(|n| self.src.part(n));
                }
                _ => return None,
            }
        }
        None
    }
}

/// Module and literal node of a `require('m')` call
fn require_module<'n>(node: Node<'n>, src: &Source<'_>) -> Option<(String, Node<'n>)> {
    if node.kind() != "call_expression" {
        return None;
    }
    let function = node.child_by_field_name("function")?;
    if function.kind() != "identifier" || src.text(function) != "require" {
        return None;
    }
    let args = named_children(node.child_by_field_name("arguments")?);
    match args.as_slice() {
        [literal] if literal.kind() == "string" => Some((unquote(src.text(*literal)), *literal)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAMBDA: &str = r#"const AWS = require('aws-sdk');
const s3 = new AWS.S3();

exports.handler = async (event, context) => {
  const data = await s3.getObject({ Bucket: 'b', Key: event.key }).promise();
  return data.Body;
};
"#;

    fn kinds(tree: &SyntaxTree) -> Vec<(SiteKind, &str)> {
        tree.sites
            .iter()
            .map(|s| (s.kind, s.name.text.as_str()))
            .collect()
    }

    #[test]
    fn test_commonjs_lambda() {
        let tree = JsAdapter::javascript().parse(LAMBDA).unwrap();
        assert_eq!(
            kinds(&tree),
            vec![
                (SiteKind::Import, "aws-sdk"),
                (SiteKind::Construction, "S3"),
                (SiteKind::Handler, "handler"),
                (SiteKind::Call, "promise"),
                (SiteKind::Call, "getObject"),
            ]
        );

        let import = &tree.sites[0];
        assert_eq!(import.imported, vec!["AWS"]);
        assert!(import.top_level);

        let construct = &tree.sites[1];
        assert_eq!(construct.receiver.as_ref().unwrap().text, "AWS");
        assert_eq!(construct.binding.as_ref().unwrap().text, "s3");

        let handler = &tree.sites[2];
        let params: Vec<_> = handler.params.iter().map(|p| p.text.as_str()).collect();
        assert_eq!(params, vec!["event", "context"]);
        assert!(handler.body.as_ref().unwrap().text.starts_with('{'));
        assert!(!LAMBDA[handler.span.start..handler.span.end].ends_with(';'));

        let promise = &tree.sites[3];
        assert_eq!(promise.binding.as_ref().unwrap().text, "data");
        assert!(!promise.top_level);

        let get = &tree.sites[4];
        assert_eq!(get.receiver.as_ref().unwrap().text, "s3");
        let arg = get.positional(0).unwrap();
        assert_eq!(arg.value.field_path("Bucket").unwrap().value, ArgValue::Str("b".into()));
        assert_eq!(arg.value.field_path("Key").unwrap().part.text, "event.key");
    }

    #[test]
    fn test_esm_imports_and_types() {
        let source = r#"import { S3Client, PutObjectCommand as Put } from "@aws-sdk/client-s3";
import * as lambda from 'aws-lambda';

const client: S3Client = new S3Client({});

export const handler = async (event: lambda.APIGatewayProxyEvent) => {
  await client.send(new Put({ Bucket: 'b', Key: 'k', Body: 'x' }));
};
"#;
        let tree = JsAdapter::typescript().parse(source).unwrap();
        let sites = kinds(&tree);
        assert_eq!(sites[0], (SiteKind::Import, "@aws-sdk/client-s3"));
        assert_eq!(tree.sites[0].imported, vec!["S3Client", "Put"]);
        assert_eq!(tree.sites[1].imported, vec!["lambda"]);
        assert!(sites.contains(&(SiteKind::TypeReference, "S3Client")));
        assert!(sites.contains(&(SiteKind::Construction, "S3Client")));
        assert!(sites.contains(&(SiteKind::Handler, "handler")));

        let event_type = tree
            .sites
            .iter()
            .find(|s| s.kind == SiteKind::TypeReference && s.name.text == "APIGatewayProxyEvent")
            .unwrap();
        assert_eq!(event_type.receiver.as_ref().unwrap().text, "lambda");

        let send = tree.sites.iter().find(|s| s.name.text == "send").unwrap();
        match &send.positional(0).unwrap().value {
            ArgValue::Construct { name, fields } => {
                assert_eq!(name, "Put");
                assert_eq!(fields.len(), 3);
            }
            other => panic!("unexpected argument shape: {:?}", other),
        }

        let handler = tree.sites.iter().find(|s| s.kind == SiteKind::Handler).unwrap();
        assert_eq!(handler.params[0].text, "event");
    }

    #[test]
    fn test_syntax_error_fails_parse() {
        let adapter = JsAdapter::javascript();
        let err = adapter.parse("const s3 = new AWS.S3(;\n").unwrap_err();
        assert!(matches!(err, crate::error::Error::Parse { .. }));
        let lenient = adapter.analyze("const s3 = new AWS.S3(;\n").unwrap();
        assert!(!lenient.is_well_formed());
    }

    #[test]
    fn test_import_insertion_follows_file_idiom() {
        let adapter = JsAdapter::javascript();
        let tree = adapter.analyze(LAMBDA).unwrap();
        let spec = ImportSpec::named("@azure/storage-blob", &["BlobServiceClient"]);
        let ins = adapter.import_insertion(&tree, &[spec.clone()]).unwrap();
        assert_eq!(ins.offset, LAMBDA.find("const s3").unwrap());
        assert_eq!(
            ins.text,
            "const { BlobServiceClient } = require('@azure/storage-blob');\n"
        );

        let esm = "import fs from \"fs\"\n\nfs.readFileSync('x')\n";
        let tree = adapter.analyze(esm).unwrap();
        let ins = adapter.import_insertion(&tree, &[spec]).unwrap();
        assert_eq!(ins.offset, esm.find('\n').unwrap() + 1);
        assert_eq!(
            ins.text,
            "import { BlobServiceClient } from \"@azure/storage-blob\"\n"
        );
    }

    #[test]
    fn test_import_insertion_without_imports() {
        let adapter = JsAdapter::javascript();
        let source = "'use strict';\n\nrun();\n";
        let tree = adapter.analyze(source).unwrap();
        let ins = adapter
            .import_insertion(&tree, &[ImportSpec::named("@azure/functions", &["app"])])
            .unwrap();
        assert_eq!(ins.offset, source.find('\n').unwrap() + 1);
        assert_eq!(ins.text, "const { app } = require('@azure/functions');\n");
    }

    #[test]
    fn test_module_exports_handler() {
        let source = "module.exports.main = function (req) {\n  return 1;\n};\n";
        let tree = JsAdapter::javascript().parse(source).unwrap();
        let handler = &tree.sites[0];
        assert_eq!(handler.kind, SiteKind::Handler);
        assert_eq!(handler.name.text, "main");
        assert_eq!(handler.params.len(), 1);
    }
}
