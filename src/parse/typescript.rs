//! TypeScript/JavaScript front-end over tree-sitter
//!
//! Parses ts/tsx/js/jsx sources into the arena AST and extracts
//! declarations and import/require records. tree-sitter degrades to
//! ERROR nodes on broken input instead of failing, which gives the
//! best-effort extraction the parser contract asks for.

use crate::core::error::{Error, Result};
use crate::graph::DependencyKind;
use crate::parse::ast::{Ast, AstNode, NodeId, SourceSpan};
use crate::parse::parser::{
    DependencyRecord, ParserInfo, SourceParser, SymbolKind, SymbolRecord,
};

/// Longest leaf text captured into the arena
const MAX_LEAF_TEXT: usize = 80;

/// Longest declaration signature captured into the arena
const MAX_SIGNATURE_TEXT: usize = 200;

/// Node kinds whose first source line is kept as a signature
const SIGNATURE_KINDS: &[&str] = &[
    "function_declaration",
    "generator_function_declaration",
    "function_signature",
    "class_declaration",
    "abstract_class_declaration",
    "interface_declaration",
    "type_alias_declaration",
    "enum_declaration",
    "method_definition",
    "variable_declarator",
];

/// tree-sitter based parser for the TS/JS family
pub struct TypeScriptParser;

impl TypeScriptParser {
    pub fn new() -> Self {
        Self
    }

    fn grammar_for(file_path: &str) -> tree_sitter::Language {
        let ext = file_path.rsplit('.').next().unwrap_or("").to_lowercase();
        match ext.as_str() {
            "tsx" => tree_sitter_typescript::LANGUAGE_TSX.into(),
            "js" | "jsx" | "mjs" | "cjs" => tree_sitter_javascript::LANGUAGE.into(),
            _ => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
        }
    }
}

impl Default for TypeScriptParser {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceParser for TypeScriptParser {
    fn info(&self) -> ParserInfo {
        ParserInfo {
            name: "typescript".to_string(),
            version: "1.0.0".to_string(),
            supported_extensions: ["ts", "tsx", "js", "jsx", "mjs", "cjs"]
                .iter()
                .map(|e| e.to_string())
                .collect(),
            supported_languages: vec!["TypeScript".to_string(), "JavaScript".to_string()],
        }
    }

    fn parse(&self, source: &str, file_path: &str) -> Result<Ast> {
        // A parser instance is cheap; a fresh one per call keeps the
        // type Sync without locking
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&Self::grammar_for(file_path))
            .map_err(|e| Error::ParserInitialization {
                name: "typescript".to_string(),
                message: e.to_string(),
            })?;

        let tree = parser.parse(source, None).ok_or_else(|| Error::Parser {
            file_path: file_path.to_string(),
            line: 1,
            column: 0,
            syntax_element: None,
            message: "tree-sitter returned no tree".to_string(),
        })?;

        Ok(convert_tree(&tree, source))
    }

    fn extract_symbols(&self, ast: &Ast) -> Vec<SymbolRecord> {
        let mut symbols = Vec::new();
        let Some(root) = ast.root() else {
            return symbols;
        };

        // (node, enclosing scope name, inherited export marker)
        let mut stack: Vec<(NodeId, Option<String>, bool)> = vec![(root, None, false)];
        while let Some((id, scope, exported)) = stack.pop() {
            let node = ast.node(id);
            let kind = node.kind.as_str();

            // Wrappers forward the export marker to their payload
            if kind == "export_statement" {
                for &child in ast.children(id).iter().rev() {
                    stack.push((child, scope.clone(), true));
                }
                continue;
            }
            if kind == "lexical_declaration" || kind == "variable_declaration" {
                for &child in ast.children(id).iter().rev() {
                    stack.push((child, scope.clone(), exported));
                }
                continue;
            }

            let mut next_scope = scope.clone();
            if let Some(record) = declaration_record(ast, id, scope.as_deref(), exported) {
                if is_container(kind) {
                    next_scope = Some(record.name.clone());
                }
                symbols.push(record);
            }

            for &child in ast.children(id).iter().rev() {
                stack.push((child, next_scope.clone(), false));
            }
        }

        symbols
    }

    fn extract_dependencies(&self, ast: &Ast) -> Vec<DependencyRecord> {
        let mut records = Vec::new();
        for id in ast.walk() {
            let node = ast.node(id);
            match node.kind.as_str() {
                "import_statement" => {
                    if let Some(path) = string_value(ast, id) {
                        let mut record = DependencyRecord::new(path, DependencyKind::Import);
                        record.imported_symbols = import_specifiers(ast, id);
                        records.push(record);
                    }
                }
                // `export ... from "x"` pulls x in just like an import
                "export_statement" => {
                    if ast.has_child_of_kind(id, "string") {
                        if let Some(path) = string_value(ast, id) {
                            let mut record =
                                DependencyRecord::new(path, DependencyKind::Import);
                            record.imported_symbols = import_specifiers(ast, id);
                            records.push(record);
                        }
                    }
                }
                "call_expression" => {
                    let callee = ast.children(id).first().copied();
                    let is_require = callee
                        .map(|c| {
                            ast.node(c).kind == "identifier"
                                && ast.text_of(c) == Some("require")
                        })
                        .unwrap_or(false);
                    let is_dynamic_import =
                        callee.map(|c| ast.node(c).kind == "import").unwrap_or(false);
                    if is_require || is_dynamic_import {
                        if let Some(args) = ast.child_of_kind(id, "arguments") {
                            if let Some(path) = string_value(ast, args) {
                                let kind = if is_require {
                                    DependencyKind::Require
                                } else {
                                    DependencyKind::Import
                                };
                                records.push(DependencyRecord::new(path, kind));
                            }
                        }
                    }
                }
                _ => {}
            }
        }
        records
    }

    fn find_references(&self, ast: &Ast, symbol: &str) -> Vec<SourceSpan> {
        ast.walk()
            .filter(|&id| {
                let node = ast.node(id);
                matches!(
                    node.kind.as_str(),
                    "identifier"
                        | "type_identifier"
                        | "property_identifier"
                        | "shorthand_property_identifier"
                ) && node.text.as_deref() == Some(symbol)
            })
            .map(|id| ast.node(id).span)
            .collect()
    }
}

/// Copy a tree-sitter tree into the arena, preorder. Leaves keep their
/// text; declaration nodes keep their first source line as a signature.
fn convert_tree(tree: &tree_sitter::Tree, source: &str) -> Ast {
    let root = tree.root_node();
    let mut ast = Ast::with_capacity(root.descendant_count());

    let mut stack: Vec<(tree_sitter::Node, Option<NodeId>)> = vec![(root, None)];
    while let Some((node, parent)) = stack.pop() {
        let id = ast.push(make_node(node, source));
        if let Some(parent) = parent {
            ast.add_child(parent, id);
        }

        let mut cursor = node.walk();
        let children: Vec<tree_sitter::Node> = node.children(&mut cursor).collect();
        for child in children.into_iter().rev() {
            stack.push((child, Some(id)));
        }
    }

    ast
}

fn make_node(node: tree_sitter::Node, source: &str) -> AstNode {
    let start = node.start_position();
    let end = node.end_position();
    let span = SourceSpan::new(
        start.row as u32 + 1,
        start.column as u32,
        end.row as u32 + 1,
        end.column as u32,
    );

    let kind = node.kind().to_string();
    let text = if node.child_count() == 0 {
        node.utf8_text(source.as_bytes())
            .ok()
            .map(|t| truncate(t, MAX_LEAF_TEXT))
    } else if SIGNATURE_KINDS.contains(&kind.as_str()) {
        node.utf8_text(source.as_bytes())
            .ok()
            .and_then(|t| t.lines().next())
            .map(|line| truncate(line.trim(), MAX_SIGNATURE_TEXT))
    } else {
        None
    };

    AstNode {
        kind,
        span,
        children: Vec::new(),
        text,
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        text.to_string()
    } else {
        let mut cut = max;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text[..cut].to_string()
    }
}

/// Kinds that scope their children
fn is_container(kind: &str) -> bool {
    matches!(
        kind,
        "class_declaration"
            | "abstract_class_declaration"
            | "interface_declaration"
            | "enum_declaration"
            | "function_declaration"
            | "generator_function_declaration"
            | "method_definition"
    )
}

/// Build a symbol record when `id` is a declaration node
fn declaration_record(
    ast: &Ast,
    id: NodeId,
    scope: Option<&str>,
    exported: bool,
) -> Option<SymbolRecord> {
    let node = ast.node(id);
    let kind = match node.kind.as_str() {
        "function_declaration" | "generator_function_declaration" | "function_signature" => {
            SymbolKind::Function
        }
        "class_declaration" | "abstract_class_declaration" => SymbolKind::Class,
        "interface_declaration" => SymbolKind::Interface,
        "type_alias_declaration" => SymbolKind::TypeAlias,
        "enum_declaration" => SymbolKind::Enum,
        "method_definition" => SymbolKind::Method,
        "public_field_definition" | "property_signature" => SymbolKind::Property,
        "required_parameter" | "optional_parameter" => SymbolKind::Parameter,
        "variable_declarator" => SymbolKind::Variable,
        _ => return None,
    };

    let name = node_name(ast, id)?;
    let mut kind = kind;
    if kind == SymbolKind::Method && name == "constructor" {
        kind = SymbolKind::Constructor;
    }
    // A const bound to a function expression reads as a function
    if kind == SymbolKind::Variable
        && ast
            .children(id)
            .iter()
            .any(|&c| matches!(ast.node(c).kind.as_str(), "arrow_function" | "function_expression"))
    {
        kind = SymbolKind::Function;
    }

    let mut modifiers = Vec::new();
    if exported {
        modifiers.push("export".to_string());
    }
    for &child in ast.children(id) {
        match ast.node(child).kind.as_str() {
            "async" => modifiers.push("async".to_string()),
            "static" => modifiers.push("static".to_string()),
            "abstract" => modifiers.push("abstract".to_string()),
            "readonly" => modifiers.push("readonly".to_string()),
            "accessibility_modifier" => {
                if let Some(text) = ast.text_of(child) {
                    modifiers.push(text.to_string());
                }
            }
            _ => {}
        }
    }

    Some(SymbolRecord {
        name,
        kind,
        span: node.span,
        signature: node.text.clone(),
        modifiers,
        scope: scope.map(String::from),
    })
}

/// Name token of a declaration
fn node_name(ast: &Ast, id: NodeId) -> Option<String> {
    for &child in ast.children(id) {
        let node = ast.node(child);
        if matches!(
            node.kind.as_str(),
            "identifier" | "type_identifier" | "property_identifier"
        ) {
            return node.text.clone();
        }
    }
    None
}

/// Text of the first `string` descendant (import specifiers live in
/// `string > string_fragment`)
fn string_value(ast: &Ast, id: NodeId) -> Option<String> {
    let string_node = if ast.node(id).kind == "string" {
        id
    } else {
        ast.descendants(id).find(|&d| ast.node(d).kind == "string")?
    };
    ast.descendants(string_node)
        .find(|&d| ast.node(d).kind == "string_fragment")
        .and_then(|d| ast.text_of(d))
        .map(String::from)
}

/// Named specifiers of an import/export clause
fn import_specifiers(ast: &Ast, id: NodeId) -> Vec<String> {
    ast.descendants(id)
        .filter(|&d| {
            matches!(
                ast.node(d).kind.as_str(),
                "import_specifier" | "export_specifier"
            )
        })
        .filter_map(|d| node_name(ast, d))
        .collect()
}
