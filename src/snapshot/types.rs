//! Snapshot data model
//!
//! The wire form keeps keys short on purpose: a Full-level snapshot of
//! a ~1,000-file project is designed to stay well under ~200 KB. Every
//! record carries a flattened `extra` map so fields added by newer
//! writers survive a load/save round trip.

use crate::parse::parser::SymbolKind;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Fidelity knob for code bodies
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum CompressionLevel {
    /// Declaration signatures only
    Minimal,
    /// Comments stripped, whitespace collapsed
    Medium,
    /// Medium plus invertible local-identifier renaming
    #[default]
    Full,
}

impl CompressionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionLevel::Minimal => "minimal",
            CompressionLevel::Medium => "medium",
            CompressionLevel::Full => "full",
        }
    }
}

impl std::fmt::Display for CompressionLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One- or two-letter symbol kind code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolCode {
    #[serde(rename = "f")]
    Function,
    #[serde(rename = "c")]
    Class,
    #[serde(rename = "v")]
    Variable,
    #[serde(rename = "i")]
    Interface,
    #[serde(rename = "t")]
    TypeAlias,
    #[serde(rename = "e")]
    Enum,
    #[serde(rename = "m")]
    Method,
    #[serde(rename = "p")]
    Property,
    #[serde(rename = "pm")]
    Parameter,
    #[serde(rename = "ct")]
    Constructor,
}

impl From<SymbolKind> for SymbolCode {
    fn from(kind: SymbolKind) -> Self {
        match kind {
            SymbolKind::Function => SymbolCode::Function,
            SymbolKind::Class => SymbolCode::Class,
            SymbolKind::Variable => SymbolCode::Variable,
            SymbolKind::Interface => SymbolCode::Interface,
            SymbolKind::TypeAlias => SymbolCode::TypeAlias,
            SymbolKind::Enum => SymbolCode::Enum,
            SymbolKind::Method => SymbolCode::Method,
            SymbolKind::Property => SymbolCode::Property,
            SymbolKind::Parameter => SymbolCode::Parameter,
            SymbolKind::Constructor => SymbolCode::Constructor,
        }
    }
}

/// A symbol as stored in the snapshot. Lines are 1-indexed and
/// `start_line ≤ end_line`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressedSymbol {
    #[serde(rename = "n")]
    pub name: String,
    #[serde(rename = "k")]
    pub kind_code: SymbolCode,
    #[serde(rename = "s")]
    pub start_line: u32,
    #[serde(rename = "e")]
    pub end_line: u32,
    #[serde(rename = "x", default, skip_serializing_if = "Option::is_none")]
    pub exported: Option<bool>,
    #[serde(rename = "sig", default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(rename = "p", default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// A compressed code body. `symbol_map` is present only at Full and
/// maps each short alias back to the original identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressedCode {
    #[serde(rename = "b")]
    pub body: String,
    #[serde(rename = "sm", default, skip_serializing_if = "Option::is_none")]
    pub symbol_map: Option<BTreeMap<String, String>>,
    #[serde(rename = "ol")]
    pub original_lines: u32,
    #[serde(rename = "cl")]
    pub compressed_lines: u32,
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// Per-file roll-up
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleSummary {
    #[serde(rename = "p")]
    pub rel_path: String,
    #[serde(rename = "ex")]
    pub export_count: u32,
    #[serde(rename = "dep")]
    pub dependency_count: u32,
    #[serde(rename = "ln")]
    pub line_count: u32,
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// Directory tree and module list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ProjectStructure {
    /// Directory prefixes, sorted and unique, root excluded
    #[serde(rename = "dirs")]
    pub directories: Vec<String>,
    #[serde(rename = "mods")]
    pub modules: Vec<ModuleSummary>,
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// File-level dependency section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SnapshotDependencies {
    /// Distinct `(from, to)` pairs, path-sorted
    pub edges: Vec<(String, String)>,
    /// Import specifiers per file, as written in source
    #[serde(rename = "imports")]
    pub imports_by_file: BTreeMap<String, Vec<String>>,
    /// Exported names and re-export sources per file
    #[serde(rename = "exports")]
    pub exports_by_file: BTreeMap<String, Vec<String>>,
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// Opaque record produced by the quality probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct QualityMetrics {
    #[serde(rename = "score")]
    pub shit_score: f64,
    pub complexity: f64,
    pub maintainability: f64,
    /// At most ten issue strings
    #[serde(rename = "issues")]
    pub top_issues: Vec<String>,
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// Hashes and totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SnapshotMeta {
    #[serde(rename = "hashes")]
    pub file_hashes: BTreeMap<String, String>,
    #[serde(rename = "files")]
    pub total_files: u32,
    #[serde(rename = "lines")]
    pub total_lines: u32,
    /// Sorted, unique language names
    #[serde(rename = "langs")]
    pub languages: Vec<String>,
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// The root snapshot record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Snapshot format semver
    #[serde(rename = "v")]
    pub version: String,
    #[serde(rename = "p")]
    pub project_name: String,
    #[serde(rename = "t")]
    pub created_at_epoch_ms: i64,
    #[serde(rename = "h")]
    pub project_hash: String,
    #[serde(rename = "l")]
    pub level: CompressionLevel,
    #[serde(rename = "s")]
    pub structure: ProjectStructure,
    #[serde(rename = "y")]
    pub symbols: BTreeMap<String, Vec<CompressedSymbol>>,
    #[serde(rename = "dp")]
    pub dependencies: SnapshotDependencies,
    #[serde(rename = "c")]
    pub code: BTreeMap<String, CompressedCode>,
    #[serde(rename = "q")]
    pub quality: QualityMetrics,
    #[serde(rename = "md")]
    pub meta: SnapshotMeta,
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl Snapshot {
    /// Structural equality modulo `created_at_epoch_ms`
    pub fn equals_ignoring_timestamp(&self, other: &Snapshot) -> bool {
        let mut a = self.clone();
        let mut b = other.clone();
        a.created_at_epoch_ms = 0;
        b.created_at_epoch_ms = 0;
        a == b
    }
}

/// The fixed extension → language mapping
pub fn language_for_extension(ext: &str) -> Option<&'static str> {
    match ext.trim_start_matches('.').to_lowercase().as_str() {
        "ts" | "tsx" => Some("TypeScript"),
        "js" | "jsx" | "mjs" | "cjs" => Some("JavaScript"),
        "swift" => Some("Swift"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_strings() {
        assert_eq!(
            serde_json::to_string(&CompressionLevel::Minimal).unwrap(),
            "\"minimal\""
        );
        assert_eq!(
            serde_json::to_string(&CompressionLevel::Full).unwrap(),
            "\"full\""
        );
        let parsed: CompressionLevel = serde_json::from_str("\"medium\"").unwrap();
        assert_eq!(parsed, CompressionLevel::Medium);
    }

    #[test]
    fn test_kind_codes() {
        assert_eq!(
            serde_json::to_string(&SymbolCode::Function).unwrap(),
            "\"f\""
        );
        assert_eq!(
            serde_json::to_string(&SymbolCode::Parameter).unwrap(),
            "\"pm\""
        );
        assert_eq!(
            serde_json::to_string(&SymbolCode::Constructor).unwrap(),
            "\"ct\""
        );
        let parsed: SymbolCode = serde_json::from_str("\"i\"").unwrap();
        assert_eq!(parsed, SymbolCode::Interface);
    }

    #[test]
    fn test_symbol_kind_mapping() {
        assert_eq!(SymbolCode::from(SymbolKind::TypeAlias), SymbolCode::TypeAlias);
        assert_eq!(SymbolCode::from(SymbolKind::Method), SymbolCode::Method);
    }

    #[test]
    fn test_language_mapping() {
        assert_eq!(language_for_extension("ts"), Some("TypeScript"));
        assert_eq!(language_for_extension(".tsx"), Some("TypeScript"));
        assert_eq!(language_for_extension("jsx"), Some("JavaScript"));
        assert_eq!(language_for_extension("swift"), Some("Swift"));
        assert_eq!(language_for_extension("py"), None);
    }

    #[test]
    fn test_optional_symbol_fields_omitted() {
        let symbol = CompressedSymbol {
            name: "add".to_string(),
            kind_code: SymbolCode::Function,
            start_line: 1,
            end_line: 1,
            exported: None,
            signature: None,
            parent: None,
            extra: Default::default(),
        };
        let json = serde_json::to_string(&symbol).unwrap();
        assert_eq!(json, r#"{"n":"add","k":"f","s":1,"e":1}"#);
    }
}
