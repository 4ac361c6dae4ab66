//! Snapshot assembly
//!
//! Orchestrates the walker, parsers, compressor, dependency graph,
//! cycle detector, quality probe and hasher into one [`Snapshot`].
//! Per-file work fans out on rayon; results are merged in path-sorted
//! order so file discovery order never leaks into the output.

use crate::core::config::SnapshotOptions;
use crate::core::error::{Error, Result};
use crate::graph::{CycleDetector, DependencyGraph};
use crate::hash::{hash_bytes, hash_project};
use crate::parse::registry::{global, ParserRegistry};
use crate::parse::walker::{read_file_text, FileWalker};
use crate::snapshot::compress::compress;
use crate::snapshot::diff;
use crate::snapshot::extract::{collect_directories, extract_file, resolve_import, FileExtraction};
use crate::snapshot::quality::{HeuristicProbe, QualityFileInput, QualityProbe};
use crate::snapshot::store;
use crate::snapshot::types::{
    language_for_extension, CompressedCode, CompressionLevel, ProjectStructure, QualityMetrics,
    Snapshot, SnapshotDependencies, SnapshotMeta,
};
use chrono::Utc;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Outcome of hashing, parsing and compressing one file
#[derive(Debug, Clone)]
pub(crate) struct ProcessedFile {
    pub rel_path: String,
    pub hash: String,
    /// Extraction and compressed body; `None` when the parser skipped
    /// the file (its hash is still recorded)
    pub parsed: Option<(FileExtraction, CompressedCode)>,
    pub source: String,
}

/// Hash, extract and compress one file. Parse failures downgrade to a
/// hash-only record.
pub(crate) fn process_file(
    registry: &ParserRegistry,
    level: CompressionLevel,
    rel_path: &str,
    source: String,
) -> ProcessedFile {
    let hash = hash_bytes(source.as_bytes());
    let parsed = match extract_file(registry, rel_path, &source) {
        Ok(extraction) => {
            let code = compress(&source, level);
            Some((extraction, code))
        }
        Err(Error::ParserNotFound { lookup }) => {
            warn!(file = rel_path, %lookup, "No parser for file, skipping");
            None
        }
        Err(e) => {
            warn!(file = rel_path, error = %e, "Parse failed, skipping file");
            None
        }
    };

    ProcessedFile {
        rel_path: rel_path.to_string(),
        hash,
        parsed,
        source,
    }
}

/// Builds snapshots per [`SnapshotOptions`]
pub struct SnapshotBuilder<'a> {
    options: SnapshotOptions,
    registry: &'a ParserRegistry,
    probe: Box<dyn QualityProbe + 'a>,
}

impl<'a> SnapshotBuilder<'a> {
    pub fn new(options: SnapshotOptions) -> Self {
        Self {
            options,
            registry: global(),
            probe: Box::new(HeuristicProbe),
        }
    }

    /// Swap the parser registry (tests and embedders)
    pub fn with_registry(mut self, registry: &'a ParserRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Swap the quality probe
    pub fn with_probe(mut self, probe: Box<dyn QualityProbe + 'a>) -> Self {
        self.probe = probe;
        self
    }

    /// Build a snapshot. With `incremental` set and a loadable prior
    /// snapshot at `output_path`, only changed files are reprocessed.
    pub fn build(&self) -> Result<Snapshot> {
        if self.options.incremental {
            if let Some(output_path) = &self.options.output_path {
                if output_path.exists() {
                    match store::load(output_path) {
                        // A level change invalidates every stored body;
                        // patching cannot converge, so rebuild
                        Ok(prior) if prior.level != self.options.level => {
                            warn!(
                                prior = %prior.level,
                                requested = %self.options.level,
                                "Compression level changed, running full build"
                            );
                        }
                        Ok(prior) => {
                            return diff::build_incremental(
                                prior,
                                &self.options,
                                self.registry,
                                self.probe.as_ref(),
                            );
                        }
                        Err(e) => {
                            warn!(error = %e, "Prior snapshot unreadable, running full build");
                        }
                    }
                }
            }
        }
        self.build_full()
    }

    /// Full build, ignoring any prior snapshot
    pub fn build_full(&self) -> Result<Snapshot> {
        let start = Instant::now();
        let files = FileWalker::new(&self.options)?.walk()?;
        info!(files = files.len(), root = %self.options.project_path.display(), "Scanning project");

        // Fan out per file; input order is path-sorted and collect
        // preserves it, so the merge below is deterministic
        let timeout = std::time::Duration::from_secs(self.options.file_timeout_secs);
        let processed: Vec<ProcessedFile> = files
            .par_iter()
            .filter_map(|file| match read_file_text(&file.abs_path) {
                Ok(source) => {
                    let started = Instant::now();
                    let entry = process_file(
                        self.registry,
                        self.options.level,
                        &file.rel_path,
                        source,
                    );
                    if started.elapsed() > timeout {
                        warn!(
                            file = %file.rel_path,
                            elapsed_ms = started.elapsed().as_millis(),
                            "File exceeded the per-file time budget"
                        );
                    }
                    Some(entry)
                }
                Err(e) => {
                    warn!(file = %file.rel_path, error = %e, "Unreadable file dropped from scan");
                    None
                }
            })
            .collect();

        let snapshot = self.assemble(processed)?;
        info!(
            files = snapshot.meta.total_files,
            lines = snapshot.meta.total_lines,
            hash = %snapshot.project_hash,
            elapsed_ms = start.elapsed().as_millis(),
            "Snapshot assembled"
        );
        Ok(snapshot)
    }

    /// Merge per-file results into the snapshot record. Input must be
    /// path-sorted.
    fn assemble(&self, processed: Vec<ProcessedFile>) -> Result<Snapshot> {
        let mut file_hashes: BTreeMap<String, String> = BTreeMap::new();
        let mut symbols = BTreeMap::new();
        let mut code = BTreeMap::new();
        let mut imports_by_file = BTreeMap::new();
        let mut exports_by_file = BTreeMap::new();
        let mut modules = Vec::new();
        let mut graph = DependencyGraph::new();
        let mut quality_inputs = Vec::with_capacity(processed.len());

        let file_set: BTreeSet<String> =
            processed.iter().map(|p| p.rel_path.clone()).collect();

        for entry in &processed {
            file_hashes.insert(entry.rel_path.clone(), entry.hash.clone());
            quality_inputs.push(QualityFileInput {
                rel_path: entry.rel_path.clone(),
                source: entry.source.clone(),
            });

            let Some((extraction, compressed)) = &entry.parsed else {
                continue;
            };

            graph.add_node(&entry.rel_path)?;
            for dependency in &extraction.dependencies {
                if let Some(target) =
                    resolve_import(&entry.rel_path, &dependency.path, &file_set)
                {
                    graph.add_edge(&entry.rel_path, &target, dependency.kind)?;
                }
            }

            symbols.insert(entry.rel_path.clone(), extraction.symbols.clone());
            code.insert(entry.rel_path.clone(), compressed.clone());
            if !extraction.imports.is_empty() {
                imports_by_file.insert(entry.rel_path.clone(), extraction.imports.clone());
            }
            if !extraction.exports.is_empty() {
                exports_by_file.insert(entry.rel_path.clone(), extraction.exports.clone());
            }
            modules.push(extraction.summary.clone());
        }

        // Cycle annotation is reporting-only; the snapshot stores edges
        let cycles = CycleDetector::default().detect_cycles(&graph);
        if !cycles.is_empty() {
            info!(cycles = cycles.len(), "Circular dependencies detected");
        }

        let quality = match self.probe.analyze(&quality_inputs) {
            Ok(metrics) => metrics,
            Err(e) => {
                warn!(error = %e, "Quality probe failed, recording zeroed metrics");
                QualityMetrics::default()
            }
        };

        let total_lines: u32 = code
            .values()
            .map(|c: &CompressedCode| c.original_lines)
            .sum();
        let languages: BTreeSet<&'static str> = file_hashes
            .keys()
            .filter_map(|path| path.rsplit('.').next())
            .filter_map(language_for_extension)
            .collect();

        debug!(
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "Dependency graph merged"
        );

        Ok(Snapshot {
            version: crate::core::config::SNAPSHOT_FORMAT_VERSION.to_string(),
            project_name: project_name(&self.options),
            created_at_epoch_ms: Utc::now().timestamp_millis(),
            project_hash: hash_project(&file_hashes),
            level: self.options.level,
            structure: ProjectStructure {
                directories: collect_directories(file_hashes.keys().map(String::as_str)),
                modules,
                extra: Default::default(),
            },
            symbols,
            dependencies: SnapshotDependencies {
                edges: graph.edge_pairs(),
                imports_by_file,
                exports_by_file,
                extra: Default::default(),
            },
            code,
            quality,
            meta: SnapshotMeta {
                total_files: file_hashes.len() as u32,
                total_lines,
                languages: languages.into_iter().map(String::from).collect(),
                file_hashes,
                extra: Default::default(),
            },
            extra: Default::default(),
        })
    }
}

fn project_name(options: &SnapshotOptions) -> String {
    options
        .project_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::types::SymbolCode;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_minimal_snapshot_of_one_file() {
        let dir = tempdir().unwrap();
        let source = "export function add(a: number, b: number): number { return a + b; }";
        fs::write(dir.path().join("a.ts"), source).unwrap();

        let mut options = SnapshotOptions::new(dir.path());
        options.level = CompressionLevel::Minimal;
        let snapshot = SnapshotBuilder::new(options).build().unwrap();

        assert_eq!(snapshot.meta.total_files, 1);
        assert_eq!(snapshot.meta.total_lines, 1);
        assert_eq!(snapshot.meta.languages, vec!["TypeScript"]);

        let add = snapshot.symbols["a.ts"]
            .iter()
            .find(|s| s.name == "add")
            .unwrap();
        assert_eq!(add.kind_code, SymbolCode::Function);
        assert_eq!(add.start_line, 1);
        assert_eq!(add.end_line, 1);
        assert_eq!(add.exported, Some(true));

        assert_eq!(snapshot.code["a.ts"].body, source);
        assert!(snapshot.dependencies.edges.is_empty());
    }

    #[test]
    fn test_empty_project_snapshot() {
        let dir = tempdir().unwrap();
        let snapshot = SnapshotBuilder::new(SnapshotOptions::new(dir.path()))
            .build()
            .unwrap();

        assert_eq!(snapshot.meta.total_files, 0);
        assert_eq!(snapshot.project_hash, hash_bytes(b""));
        assert!(snapshot.symbols.is_empty());
        assert!(snapshot.code.is_empty());
        assert!(snapshot.structure.modules.is_empty());
    }

    #[test]
    fn test_import_edges_resolved() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), "export const one = 1;\n").unwrap();
        fs::write(
            dir.path().join("b.ts"),
            "import { one } from \"./a\";\nexport const two = one + 1;\n",
        )
        .unwrap();

        let snapshot = SnapshotBuilder::new(SnapshotOptions::new(dir.path()))
            .build()
            .unwrap();

        assert_eq!(
            snapshot.dependencies.edges,
            vec![("b.ts".to_string(), "a.ts".to_string())]
        );
        assert_eq!(snapshot.dependencies.imports_by_file["b.ts"], vec!["./a"]);
        assert_eq!(snapshot.dependencies.exports_by_file["a.ts"], vec!["one"]);
    }

    #[test]
    fn test_snapshot_idempotent() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/a.ts"), "export const a = 1;\n").unwrap();
        fs::write(
            dir.path().join("src/b.ts"),
            "import { a } from \"./a\";\nexport function f() { return a; }\n",
        )
        .unwrap();

        let first = SnapshotBuilder::new(SnapshotOptions::new(dir.path()))
            .build()
            .unwrap();
        let second = SnapshotBuilder::new(SnapshotOptions::new(dir.path()))
            .build()
            .unwrap();
        assert!(first.equals_ignoring_timestamp(&second));
    }

    #[test]
    fn test_structure_directories() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src/deep")).unwrap();
        fs::write(dir.path().join("src/deep/a.ts"), "export const a = 1;\n").unwrap();
        fs::write(dir.path().join("top.ts"), "export const t = 1;\n").unwrap();

        let snapshot = SnapshotBuilder::new(SnapshotOptions::new(dir.path()))
            .build()
            .unwrap();
        assert_eq!(snapshot.structure.directories, vec!["src", "src/deep"]);
        assert_eq!(snapshot.structure.modules.len(), 2);
    }

    #[test]
    fn test_parser_skip_keeps_hash() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), "export const one = 1;\n").unwrap();
        // The Swift front-end needs its external binary; point it at
        // nothing so the file is skipped
        std::env::set_var(crate::parse::swift::SWIFT_PARSER_BIN_ENV, "/nonexistent/bin");
        fs::write(dir.path().join("App.swift"), "import Foundation\n").unwrap();

        let snapshot = SnapshotBuilder::new(SnapshotOptions::new(dir.path()))
            .build()
            .unwrap();
        std::env::remove_var(crate::parse::swift::SWIFT_PARSER_BIN_ENV);

        assert!(snapshot.meta.file_hashes.contains_key("App.swift"));
        assert!(!snapshot.symbols.contains_key("App.swift"));
        assert!(!snapshot.code.contains_key("App.swift"));
        assert_eq!(snapshot.meta.total_files, 2);
        assert_eq!(snapshot.meta.languages, vec!["Swift", "TypeScript"]);
    }

    #[test]
    fn test_quality_metrics_embedded() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), "export const a = 1;\n").unwrap();
        let snapshot = SnapshotBuilder::new(SnapshotOptions::new(dir.path()))
            .build()
            .unwrap();
        assert!(snapshot.quality.maintainability > 0.0);
    }
}
