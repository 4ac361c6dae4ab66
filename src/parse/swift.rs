//! Swift front-end delegating to an external AST producer
//!
//! The parser spawns an AST-dump binary (default `swift-ast-dump`,
//! overridable through `SWIFT_PARSER_BIN`), writes the source on the
//! child's stdin and reads a JSON tree from its stdout:
//!
//! ```json
//! { "kind": "source_file", "text": null,
//!   "range": { "startLine": 1, "startColumn": 0, "endLine": 3, "endColumn": 0 },
//!   "children": [ ... ] }
//! ```
//!
//! On failure the child exits non-zero and may emit
//! `{ "diagnostics": [ { "line", "column", "message", "syntaxElement" } ] }`
//! on stderr; the first diagnostic becomes the parse error location.
//! The binary is single-concurrent, so calls are serialised through an
//! internal lock. A bounded wait kills the child when it overruns the
//! per-file timeout.

use crate::core::error::{Error, Result};
use crate::graph::DependencyKind;
use crate::parse::ast::{Ast, AstNode, NodeId, SourceSpan};
use crate::parse::parser::{
    DependencyRecord, ParserInfo, SourceParser, SymbolKind, SymbolRecord,
};
use parking_lot::Mutex;
use serde::Deserialize;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tracing::warn;

/// Environment variable overriding the AST-dump binary path
pub const SWIFT_PARSER_BIN_ENV: &str = "SWIFT_PARSER_BIN";

/// Default binary name resolved on PATH
const DEFAULT_BINARY: &str = "swift-ast-dump";

/// Poll interval while waiting on the child
const WAIT_POLL: Duration = Duration::from_millis(10);

#[derive(Debug, Deserialize)]
struct ExternalNode {
    kind: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    range: Option<ExternalRange>,
    #[serde(default)]
    children: Vec<ExternalNode>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(rename_all = "camelCase")]
struct ExternalRange {
    start_line: u32,
    start_column: u32,
    end_line: u32,
    end_column: u32,
}

#[derive(Debug, Deserialize)]
struct ExternalDiagnostics {
    #[serde(default)]
    diagnostics: Vec<ExternalDiagnostic>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExternalDiagnostic {
    #[serde(default = "one")]
    line: u32,
    #[serde(default)]
    column: u32,
    message: String,
    #[serde(default)]
    syntax_element: Option<String>,
}

fn one() -> u32 {
    1
}

/// Swift parser wrapping the external AST producer
pub struct SwiftParser {
    binary: PathBuf,
    timeout: Duration,
    /// The external binary handles one request at a time
    call_lock: Mutex<()>,
}

impl SwiftParser {
    pub fn new() -> Self {
        Self::with_timeout(Duration::from_secs(crate::core::config::FILE_TIMEOUT_SECS))
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let binary = std::env::var(SWIFT_PARSER_BIN_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_BINARY));
        Self {
            binary,
            timeout,
            call_lock: Mutex::new(()),
        }
    }

    fn run_external(&self, source: &str, file_path: &str) -> Result<(String, String)> {
        let _serialised = self.call_lock.lock();

        let mut child = Command::new(&self.binary)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::Parser {
                file_path: file_path.to_string(),
                line: 1,
                column: 0,
                syntax_element: None,
                message: format!("failed to spawn {}: {}", self.binary.display(), e),
            })?;

        // Writer thread keeps the pipes from deadlocking on large files
        let mut stdin = child.stdin.take().expect("piped stdin");
        let source_owned = source.as_bytes().to_vec();
        let writer = std::thread::spawn(move || {
            let _ = stdin.write_all(&source_owned);
        });

        let mut stdout = child.stdout.take().expect("piped stdout");
        let reader = std::thread::spawn(move || {
            let mut buffer = String::new();
            let _ = stdout.read_to_string(&mut buffer);
            buffer
        });

        let status = self.wait_bounded(&mut child, file_path)?;

        let _ = writer.join();
        let stdout = reader.join().unwrap_or_default();
        let mut stderr = String::new();
        if let Some(mut pipe) = child.stderr.take() {
            let _ = pipe.read_to_string(&mut stderr);
        }

        if !status.success() {
            return Err(diagnostics_error(file_path, &stderr));
        }
        Ok((stdout, stderr))
    }

    fn wait_bounded(
        &self,
        child: &mut Child,
        file_path: &str,
    ) -> Result<std::process::ExitStatus> {
        let deadline = Instant::now() + self.timeout;
        loop {
            match child.try_wait() {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {
                    if Instant::now() >= deadline {
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(Error::Parser {
                            file_path: file_path.to_string(),
                            line: 1,
                            column: 0,
                            syntax_element: None,
                            message: format!(
                                "external parser exceeded {}s timeout",
                                self.timeout.as_secs()
                            ),
                        });
                    }
                    std::thread::sleep(WAIT_POLL);
                }
                Err(e) => {
                    let _ = child.kill();
                    return Err(Error::Parser {
                        file_path: file_path.to_string(),
                        line: 1,
                        column: 0,
                        syntax_element: None,
                        message: format!("wait on external parser failed: {e}"),
                    });
                }
            }
        }
    }
}

impl Default for SwiftParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a failed run to a parse error at the first diagnostic
fn diagnostics_error(file_path: &str, stderr: &str) -> Error {
    if let Ok(parsed) = serde_json::from_str::<ExternalDiagnostics>(stderr) {
        if let Some(first) = parsed.diagnostics.into_iter().next() {
            return Error::Parser {
                file_path: file_path.to_string(),
                line: first.line,
                column: first.column,
                syntax_element: first.syntax_element,
                message: first.message,
            };
        }
    }
    Error::Parser {
        file_path: file_path.to_string(),
        line: 1,
        column: 0,
        syntax_element: None,
        message: format!(
            "external parser failed: {}",
            stderr.lines().next().unwrap_or("no diagnostics")
        ),
    }
}

/// Translate the external JSON tree into the arena shape
fn convert_external(root: ExternalNode) -> Ast {
    let mut ast = Ast::new();
    let mut stack: Vec<(ExternalNode, Option<NodeId>)> = vec![(root, None)];
    while let Some((node, parent)) = stack.pop() {
        let span = node
            .range
            .map(|r| SourceSpan::new(r.start_line, r.start_column, r.end_line, r.end_column))
            .unwrap_or_default();
        let id = ast.push(AstNode {
            kind: node.kind,
            span,
            children: Vec::new(),
            text: node.text,
        });
        if let Some(parent) = parent {
            ast.add_child(parent, id);
        }
        for child in node.children.into_iter().rev() {
            stack.push((child, Some(id)));
        }
    }
    ast
}

impl SourceParser for SwiftParser {
    fn info(&self) -> ParserInfo {
        ParserInfo {
            name: "swift".to_string(),
            version: "1.0.0".to_string(),
            supported_extensions: vec!["swift".to_string()],
            supported_languages: vec!["Swift".to_string()],
        }
    }

    fn parse(&self, source: &str, file_path: &str) -> Result<Ast> {
        let (stdout, stderr) = self.run_external(source, file_path)?;

        let root: ExternalNode = serde_json::from_str(&stdout).map_err(|e| {
            if !stderr.trim().is_empty() {
                return diagnostics_error(file_path, &stderr);
            }
            Error::Parser {
                file_path: file_path.to_string(),
                line: 1,
                column: 0,
                syntax_element: None,
                message: format!("unparsable AST output: {e}"),
            }
        })?;

        Ok(convert_external(root))
    }

    fn extract_symbols(&self, ast: &Ast) -> Vec<SymbolRecord> {
        let mut symbols = Vec::new();
        let Some(root) = ast.root() else {
            return symbols;
        };

        let mut stack: Vec<(NodeId, Option<String>)> = vec![(root, None)];
        while let Some((id, scope)) = stack.pop() {
            let node = ast.node(id);
            let kind = match node.kind.as_str() {
                "function_declaration" => {
                    if scope.is_some() {
                        Some(SymbolKind::Method)
                    } else {
                        Some(SymbolKind::Function)
                    }
                }
                "class_declaration" | "struct_declaration" => Some(SymbolKind::Class),
                "protocol_declaration" => Some(SymbolKind::Interface),
                "enum_declaration" => Some(SymbolKind::Enum),
                "typealias_declaration" => Some(SymbolKind::TypeAlias),
                "variable_declaration" => {
                    if scope.is_some() {
                        Some(SymbolKind::Property)
                    } else {
                        Some(SymbolKind::Variable)
                    }
                }
                "initializer_declaration" => Some(SymbolKind::Constructor),
                _ => None,
            };

            let mut next_scope = scope.clone();
            if let Some(kind) = kind {
                if let Some(name) = swift_name(ast, id) {
                    let modifiers = swift_modifiers(ast, id);
                    if matches!(
                        ast.node(id).kind.as_str(),
                        "class_declaration"
                            | "struct_declaration"
                            | "protocol_declaration"
                            | "enum_declaration"
                            | "function_declaration"
                    ) {
                        next_scope = Some(name.clone());
                    }
                    symbols.push(SymbolRecord {
                        name,
                        kind,
                        span: node.span,
                        signature: None,
                        modifiers,
                        scope,
                    });
                } else {
                    warn!(kind = %node.kind, "Swift declaration without a name token");
                }
            }

            for &child in ast.children(id).iter().rev() {
                stack.push((child, next_scope.clone()));
            }
        }

        symbols
    }

    fn extract_dependencies(&self, ast: &Ast) -> Vec<DependencyRecord> {
        ast.walk()
            .filter(|&id| ast.node(id).kind == "import_declaration")
            .filter_map(|id| swift_name(ast, id))
            .map(|module| DependencyRecord::new(module, DependencyKind::Import))
            .collect()
    }

    fn find_references(&self, ast: &Ast, symbol: &str) -> Vec<SourceSpan> {
        ast.walk()
            .filter(|&id| {
                let node = ast.node(id);
                matches!(node.kind.as_str(), "identifier" | "type_identifier")
                    && node.text.as_deref() == Some(symbol)
            })
            .map(|id| ast.node(id).span)
            .collect()
    }
}

fn swift_name(ast: &Ast, id: NodeId) -> Option<String> {
    for &child in ast.children(id) {
        let node = ast.node(child);
        if matches!(node.kind.as_str(), "identifier" | "type_identifier") {
            if let Some(text) = &node.text {
                return Some(text.clone());
            }
        }
    }
    None
}

/// Modifier tokens (`public`, `open`, `static`, ...) under a
/// `modifiers` child. `public`/`open` count as export markers.
fn swift_modifiers(ast: &Ast, id: NodeId) -> Vec<String> {
    let Some(modifiers) = ast.child_of_kind(id, "modifiers") else {
        return Vec::new();
    };
    ast.children(modifiers)
        .iter()
        .filter_map(|&m| ast.text_of(m).or(Some(ast.node(m).kind.as_str())))
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn external(kind: &str, text: Option<&str>, children: Vec<ExternalNode>) -> ExternalNode {
        ExternalNode {
            kind: kind.to_string(),
            text: text.map(String::from),
            range: Some(ExternalRange {
                start_line: 1,
                start_column: 0,
                end_line: 1,
                end_column: 10,
            }),
            children,
        }
    }

    fn sample_ast() -> Ast {
        // class Greeter { public func greet() {}; var prefix }
        let greet = external(
            "function_declaration",
            None,
            vec![
                external("identifier", Some("greet"), vec![]),
                external(
                    "modifiers",
                    None,
                    vec![external("public", Some("public"), vec![])],
                ),
            ],
        );
        let prefix = external(
            "variable_declaration",
            None,
            vec![external("identifier", Some("prefix"), vec![])],
        );
        let class = external(
            "class_declaration",
            None,
            vec![
                external("type_identifier", Some("Greeter"), vec![]),
                greet,
                prefix,
            ],
        );
        let import = external(
            "import_declaration",
            None,
            vec![external("identifier", Some("Foundation"), vec![])],
        );
        convert_external(external("source_file", None, vec![import, class]))
    }

    #[test]
    fn test_convert_external_shape() {
        let ast = sample_ast();
        assert_eq!(ast.node(ast.root().unwrap()).kind, "source_file");
        assert!(ast.walk().any(|id| ast.node(id).kind == "class_declaration"));
    }

    #[test]
    fn test_extract_swift_symbols() {
        let ast = sample_ast();
        let parser = SwiftParser::new();
        let symbols = parser.extract_symbols(&ast);

        let class = symbols.iter().find(|s| s.name == "Greeter").unwrap();
        assert_eq!(class.kind, SymbolKind::Class);

        let greet = symbols.iter().find(|s| s.name == "greet").unwrap();
        assert_eq!(greet.kind, SymbolKind::Method);
        assert_eq!(greet.scope.as_deref(), Some("Greeter"));
        assert!(greet.is_exported());

        let prefix = symbols.iter().find(|s| s.name == "prefix").unwrap();
        assert_eq!(prefix.kind, SymbolKind::Property);
    }

    #[test]
    fn test_extract_swift_imports() {
        let ast = sample_ast();
        let deps = SwiftParser::new().extract_dependencies(&ast);
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].path, "Foundation");
        assert!(!deps[0].is_relative);
    }

    #[test]
    fn test_diagnostics_error_mapping() {
        let stderr = r#"{"diagnostics":[{"line":3,"column":7,"message":"expected '}'","syntaxElement":"class_body"}]}"#;
        let err = diagnostics_error("App.swift", stderr);
        match err {
            Error::Parser {
                line,
                column,
                syntax_element,
                ..
            } => {
                assert_eq!(line, 3);
                assert_eq!(column, 7);
                assert_eq!(syntax_element.as_deref(), Some("class_body"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_binary_is_per_file_error() {
        std::env::set_var(SWIFT_PARSER_BIN_ENV, "/nonexistent/swift-ast-dump");
        let parser = SwiftParser::new();
        std::env::remove_var(SWIFT_PARSER_BIN_ENV);

        let err = parser.parse("import Foundation\n", "App.swift").unwrap_err();
        assert!(matches!(err, Error::Parser { .. }));
    }
}
