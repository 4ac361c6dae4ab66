//! The per-language parser contract
//!
//! A parser turns source text into an arena [`Ast`] and extracts
//! best-effort symbol and dependency records from it. Implementations
//! must be internally synchronised: the registry shares them by
//! reference across workers.

use crate::core::error::Result;
use crate::graph::DependencyKind;
use crate::parse::ast::{Ast, SourceSpan};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Static facts a parser declares about itself
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserInfo {
    pub name: String,
    /// Semver version string, matched on major by the registry
    pub version: String,
    /// Extensions without the leading dot, lowercase
    pub supported_extensions: Vec<String>,
    pub supported_languages: Vec<String>,
}

/// Registry listing entry: parser facts plus registration time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserMetadata {
    pub name: String,
    pub version: String,
    pub supported_extensions: Vec<String>,
    pub supported_languages: Vec<String>,
    pub registered_at: DateTime<Utc>,
}

/// The kind of a declared symbol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    Function,
    Class,
    Variable,
    Interface,
    TypeAlias,
    Enum,
    Method,
    Property,
    Parameter,
    Constructor,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Class => "class",
            SymbolKind::Variable => "variable",
            SymbolKind::Interface => "interface",
            SymbolKind::TypeAlias => "type",
            SymbolKind::Enum => "enum",
            SymbolKind::Method => "method",
            SymbolKind::Property => "property",
            SymbolKind::Parameter => "parameter",
            SymbolKind::Constructor => "constructor",
        }
    }
}

impl std::fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A declared symbol, positioned at its name token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub name: String,
    pub kind: SymbolKind,
    pub span: SourceSpan,
    /// Declaration signature, single line
    pub signature: Option<String>,
    /// Modifier tokens in source order (`export`, `async`, `static`, ...)
    pub modifiers: Vec<String>,
    /// Name of the enclosing declaration, for nested symbols
    pub scope: Option<String>,
}

impl SymbolRecord {
    pub fn is_exported(&self) -> bool {
        self.modifiers.iter().any(|m| m == "export" || m == "public")
    }
}

/// An import/require/include extracted from a file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyRecord {
    /// The specifier as written (`./util`, `react`, `Foundation`)
    pub path: String,
    pub kind: DependencyKind,
    /// Relative specifiers start with `.` or `/`
    pub is_relative: bool,
    /// Named symbols pulled in, when the syntax lists them
    pub imported_symbols: Vec<String>,
}

impl DependencyRecord {
    pub fn new(path: impl Into<String>, kind: DependencyKind) -> Self {
        let path = path.into();
        let is_relative = path.starts_with('.') || path.starts_with('/');
        Self {
            path,
            kind,
            is_relative,
            imported_symbols: Vec::new(),
        }
    }
}

/// Per-language parsing capability
///
/// All operations may fail with `Error::Parser` carrying the file
/// location of the first diagnostic. Parsers tolerate partial syntax
/// where possible and return what they could extract.
pub trait SourceParser: Send + Sync {
    /// Parser name, version and supported extensions/languages
    fn info(&self) -> ParserInfo;

    /// Parse source text into an arena AST
    fn parse(&self, source: &str, file_path: &str) -> Result<Ast>;

    /// One record per declaration node, nested declarations scoped to
    /// their enclosing declaration's name
    fn extract_symbols(&self, ast: &Ast) -> Vec<SymbolRecord>;

    /// Import/require/include records in source order
    fn extract_dependencies(&self, ast: &Ast) -> Vec<DependencyRecord>;

    /// Locations where `symbol` is referenced by name
    fn find_references(&self, ast: &Ast, symbol: &str) -> Vec<SourceSpan>;
}

impl std::fmt::Debug for dyn SourceParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceParser").field("info", &self.info()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_record_relativity() {
        let rel = DependencyRecord::new("./util", DependencyKind::Import);
        assert!(rel.is_relative);

        let abs = DependencyRecord::new("/shared/util", DependencyKind::Import);
        assert!(abs.is_relative);

        let pkg = DependencyRecord::new("react", DependencyKind::Import);
        assert!(!pkg.is_relative);
    }

    #[test]
    fn test_symbol_export_marker() {
        let sym = SymbolRecord {
            name: "add".to_string(),
            kind: SymbolKind::Function,
            span: SourceSpan::point(1, 0),
            signature: None,
            modifiers: vec!["export".to_string(), "async".to_string()],
            scope: None,
        };
        assert!(sym.is_exported());
    }
}
