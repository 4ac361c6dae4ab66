//! Per-file symbol and dependency extraction
//!
//! Bridges the parser layer and the snapshot model: resolves the
//! parser for a file, runs it, and reshapes its records into the
//! compressed snapshot form. Import specifiers are resolved against
//! the discovered file set so the dependency graph stays file-to-file.

use crate::core::error::Result;
use crate::parse::parser::DependencyRecord;
use crate::parse::registry::ParserRegistry;
use crate::snapshot::types::{
    language_for_extension, CompressedSymbol, ModuleSummary, SymbolCode,
};
use std::collections::BTreeSet;

/// Everything extracted from one file
#[derive(Debug, Clone)]
pub struct FileExtraction {
    pub rel_path: String,
    pub language: Option<&'static str>,
    pub symbols: Vec<CompressedSymbol>,
    pub dependencies: Vec<DependencyRecord>,
    /// Raw import specifiers, source order
    pub imports: Vec<String>,
    /// Names of exported declarations
    pub exports: Vec<String>,
    pub summary: ModuleSummary,
}

/// Parse one file and reshape its records. `Error::Parser` means the
/// caller should skip the file but keep its hash.
pub fn extract_file(
    registry: &ParserRegistry,
    rel_path: &str,
    source: &str,
) -> Result<FileExtraction> {
    let extension = rel_path.rsplit('.').next().unwrap_or("");
    let parser = registry.get_by_extension(extension)?;
    let ast = parser.parse(source, rel_path)?;

    let records = parser.extract_symbols(&ast);
    let dependencies = parser.extract_dependencies(&ast);

    let mut symbols = Vec::with_capacity(records.len());
    let mut exports = Vec::new();
    for record in &records {
        let exported = record.is_exported();
        if exported {
            exports.push(record.name.clone());
        }
        symbols.push(CompressedSymbol {
            name: record.name.clone(),
            kind_code: SymbolCode::from(record.kind),
            start_line: record.span.start_line,
            end_line: record.span.end_line.max(record.span.start_line),
            exported: exported.then_some(true),
            signature: record.signature.clone(),
            parent: record.scope.clone(),
            extra: Default::default(),
        });
    }

    let imports: Vec<String> = dependencies.iter().map(|d| d.path.clone()).collect();
    let summary = ModuleSummary {
        rel_path: rel_path.to_string(),
        export_count: exports.len() as u32,
        dependency_count: dependencies.len() as u32,
        line_count: source.lines().count() as u32,
        extra: Default::default(),
    };

    Ok(FileExtraction {
        rel_path: rel_path.to_string(),
        language: language_for_extension(extension),
        symbols,
        dependencies,
        imports,
        exports,
        summary,
    })
}

/// Resolve a relative import specifier to a discovered file.
///
/// `./util` from `src/a.ts` tries `src/util` with the known source
/// extensions and `util/index.*`; specifiers starting with `/` resolve
/// from the project root. Package imports return `None`.
pub fn resolve_import(
    importer: &str,
    specifier: &str,
    files: &BTreeSet<String>,
) -> Option<String> {
    let base = if let Some(rooted) = specifier.strip_prefix('/') {
        normalize_segments(rooted.split('/'))
    } else if specifier.starts_with('.') {
        let dir = importer.rsplit_once('/').map(|(d, _)| d).unwrap_or("");
        normalize_segments(dir.split('/').chain(specifier.split('/')))
    } else {
        return None;
    };

    if files.contains(&base) {
        return Some(base);
    }
    const EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "swift"];
    for ext in EXTENSIONS {
        let candidate = format!("{base}.{ext}");
        if files.contains(&candidate) {
            return Some(candidate);
        }
    }
    for ext in EXTENSIONS {
        let candidate = format!("{base}/index.{ext}");
        if files.contains(&candidate) {
            return Some(candidate);
        }
    }
    None
}

fn normalize_segments<'a>(segments: impl Iterator<Item = &'a str>) -> String {
    let mut normalized: Vec<&str> = Vec::new();
    for segment in segments {
        match segment {
            "" | "." => {}
            ".." => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized.join("/")
}

/// Sorted, unique directory prefixes across the file set, root excluded
pub fn collect_directories<'a>(rel_paths: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut directories: BTreeSet<String> = BTreeSet::new();
    for path in rel_paths {
        let mut prefix = String::new();
        let segments: Vec<&str> = path.split('/').collect();
        for segment in &segments[..segments.len().saturating_sub(1)] {
            if !prefix.is_empty() {
                prefix.push('/');
            }
            prefix.push_str(segment);
            directories.insert(prefix.clone());
        }
    }
    directories.into_iter().collect()
}
