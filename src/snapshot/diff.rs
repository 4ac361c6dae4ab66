//! Incremental snapshot updates
//!
//! Classifies the current file set against a prior snapshot's hashes
//! and patches only the affected slices. An unchanged tree returns the
//! prior snapshot untouched, timestamp included. File-level edges are
//! re-derived from the stored import specifiers after patching, so an
//! added file that satisfies a previously dangling import shows up
//! exactly as a full rebuild would report it.

use crate::core::config::SnapshotOptions;
use crate::core::error::Result;
use crate::graph::DependencyGraph;
use crate::hash::{hash_bytes, hash_project};
use crate::parse::registry::ParserRegistry;
use crate::parse::walker::{read_file_text, FileWalker};
use crate::snapshot::builder::{process_file, ProcessedFile};
use crate::snapshot::extract::{collect_directories, resolve_import};
use crate::snapshot::quality::{QualityFileInput, QualityProbe};
use crate::snapshot::types::{language_for_extension, Snapshot};
use chrono::Utc;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// Per-file deltas between a prior snapshot and the current tree
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.deleted.len()
    }
}

/// Compare hash maps: in current only → added, differing hash →
/// modified, in prior only → deleted.
pub fn classify_changes(
    prior_hashes: &BTreeMap<String, String>,
    current_hashes: &BTreeMap<String, String>,
) -> ChangeSet {
    let mut changes = ChangeSet::default();

    for (path, hash) in current_hashes {
        match prior_hashes.get(path) {
            None => changes.added.push(path.clone()),
            Some(prior) if prior != hash => changes.modified.push(path.clone()),
            Some(_) => {}
        }
    }
    for path in prior_hashes.keys() {
        if !current_hashes.contains_key(path) {
            changes.deleted.push(path.clone());
        }
    }

    changes
}

/// Patch `prior` to match the current tree, reprocessing only changed
/// files.
pub fn build_incremental(
    prior: Snapshot,
    options: &SnapshotOptions,
    registry: &ParserRegistry,
    probe: &dyn QualityProbe,
) -> Result<Snapshot> {
    let files = FileWalker::new(options)?.walk()?;

    // Hashing needs the bytes anyway; what incremental saves is the
    // parse and compress work
    let sources: Vec<(String, String)> = files
        .par_iter()
        .filter_map(|file| {
            read_file_text(&file.abs_path)
                .ok()
                .map(|source| (file.rel_path.clone(), source))
        })
        .collect();

    let current_hashes: BTreeMap<String, String> = sources
        .iter()
        .map(|(path, source)| (path.clone(), hash_bytes(source.as_bytes())))
        .collect();

    let changes = classify_changes(&prior.meta.file_hashes, &current_hashes);
    if changes.is_empty() {
        debug!("No changes since prior snapshot");
        return Ok(prior);
    }
    info!(
        added = changes.added.len(),
        modified = changes.modified.len(),
        deleted = changes.deleted.len(),
        "Applying incremental changes"
    );

    let mut snapshot = prior;

    // Drop every slice owned by deleted and modified files first so no
    // stale entries linger
    for path in changes.deleted.iter().chain(changes.modified.iter()) {
        snapshot.meta.file_hashes.remove(path);
        snapshot.symbols.remove(path);
        snapshot.code.remove(path);
        snapshot.dependencies.imports_by_file.remove(path);
        snapshot.dependencies.exports_by_file.remove(path);
        snapshot.structure.modules.retain(|m| &m.rel_path != path);
    }

    // Reprocess added and modified files in parallel
    let dirty: BTreeSet<&str> = changes
        .added
        .iter()
        .chain(changes.modified.iter())
        .map(String::as_str)
        .collect();
    let reprocessed: Vec<ProcessedFile> = sources
        .par_iter()
        .filter(|(path, _)| dirty.contains(path.as_str()))
        .map(|(path, source)| process_file(registry, snapshot.level, path, source.clone()))
        .collect();

    for entry in reprocessed {
        snapshot
            .meta
            .file_hashes
            .insert(entry.rel_path.clone(), entry.hash.clone());
        let Some((extraction, code)) = entry.parsed else {
            continue;
        };
        snapshot.symbols.insert(entry.rel_path.clone(), extraction.symbols);
        snapshot.code.insert(entry.rel_path.clone(), code);
        if !extraction.imports.is_empty() {
            snapshot
                .dependencies
                .imports_by_file
                .insert(entry.rel_path.clone(), extraction.imports);
        }
        if !extraction.exports.is_empty() {
            snapshot
                .dependencies
                .exports_by_file
                .insert(entry.rel_path.clone(), extraction.exports);
        }
        snapshot.structure.modules.push(extraction.summary);
    }
    snapshot
        .structure
        .modules
        .sort_by(|a, b| a.rel_path.cmp(&b.rel_path));

    // Re-derive file-to-file edges from the stored import specifiers
    // against the new file set
    let file_set: BTreeSet<String> = snapshot.meta.file_hashes.keys().cloned().collect();
    let mut graph = DependencyGraph::new();
    for path in snapshot.symbols.keys() {
        graph.add_node(path)?;
    }
    for (path, imports) in &snapshot.dependencies.imports_by_file {
        for specifier in imports {
            if let Some(target) = resolve_import(path, specifier, &file_set) {
                graph.add_edge(path, &target, crate::graph::DependencyKind::Import)?;
            }
        }
    }
    snapshot.dependencies.edges = graph.edge_pairs();

    // Recompute the derived metadata
    snapshot.structure.directories =
        collect_directories(snapshot.meta.file_hashes.keys().map(String::as_str));
    snapshot.project_hash = hash_project(&snapshot.meta.file_hashes);
    snapshot.meta.total_files = snapshot.meta.file_hashes.len() as u32;
    snapshot.meta.total_lines = snapshot.code.values().map(|c| c.original_lines).sum();
    let languages: BTreeSet<&'static str> = snapshot
        .meta
        .file_hashes
        .keys()
        .filter_map(|path| path.rsplit('.').next())
        .filter_map(language_for_extension)
        .collect();
    snapshot.meta.languages = languages.into_iter().map(String::from).collect();
    snapshot.created_at_epoch_ms = Utc::now().timestamp_millis();

    if options.refresh_quality {
        let inputs: Vec<QualityFileInput> = sources
            .iter()
            .map(|(path, source)| QualityFileInput {
                rel_path: path.clone(),
                source: source.clone(),
            })
            .collect();
        if let Ok(metrics) = probe.analyze(&inputs) {
            snapshot.quality = metrics;
        }
    }

    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::registry::global;
    use crate::snapshot::builder::SnapshotBuilder;
    use crate::snapshot::quality::HeuristicProbe;
    use std::fs;
    use tempfile::tempdir;

    fn hashes(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_classify_changes() {
        let prior = hashes(&[("a.ts", "1111"), ("b.ts", "2222"), ("c.ts", "3333")]);
        let current = hashes(&[("a.ts", "1111"), ("b.ts", "9999"), ("d.ts", "4444")]);

        let changes = classify_changes(&prior, &current);
        assert_eq!(changes.added, vec!["d.ts"]);
        assert_eq!(changes.modified, vec!["b.ts"]);
        assert_eq!(changes.deleted, vec!["c.ts"]);
        assert_eq!(changes.len(), 3);
    }

    #[test]
    fn test_incremental_unchanged_is_identity() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), "export const a = 1;\n").unwrap();

        let options = SnapshotOptions::new(dir.path());
        let prior = SnapshotBuilder::new(options.clone()).build().unwrap();
        let stamp = prior.created_at_epoch_ms;

        let updated =
            build_incremental(prior.clone(), &options, global(), &HeuristicProbe).unwrap();
        assert_eq!(updated, prior);
        assert_eq!(updated.created_at_epoch_ms, stamp);
    }

    #[test]
    fn test_incremental_add_converges() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), "export const one = 1;\n").unwrap();

        // Refresh quality so the result is comparable to a fresh full
        // build, which always runs the probe
        let mut options = SnapshotOptions::new(dir.path());
        options.refresh_quality = true;
        let prior = SnapshotBuilder::new(options.clone()).build().unwrap();
        let prior_hash = prior.project_hash.clone();

        fs::write(
            dir.path().join("b.ts"),
            "import { one } from \"./a\";\nexport const two = one + 1;\n",
        )
        .unwrap();

        let updated =
            build_incremental(prior, &options, global(), &HeuristicProbe).unwrap();
        assert_eq!(updated.meta.total_files, 2);
        assert!(updated.meta.file_hashes.contains_key("a.ts"));
        assert!(updated.meta.file_hashes.contains_key("b.ts"));
        assert_eq!(
            updated.dependencies.edges,
            vec![("b.ts".to_string(), "a.ts".to_string())]
        );
        assert_ne!(updated.project_hash, prior_hash);

        let full = SnapshotBuilder::new(options).build_full().unwrap();
        assert!(updated.equals_ignoring_timestamp(&full));
    }

    #[test]
    fn test_incremental_modify_replaces_slices() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("a.ts"),
            "import { gone } from \"./b\";\nexport const one = 1;\n",
        )
        .unwrap();
        fs::write(dir.path().join("b.ts"), "export const gone = 0;\n").unwrap();

        let mut options = SnapshotOptions::new(dir.path());
        options.refresh_quality = true;
        let prior = SnapshotBuilder::new(options.clone()).build().unwrap();
        assert_eq!(prior.dependencies.edges.len(), 1);

        // Rewrite a.ts without the import; the stale edge must not
        // linger
        fs::write(dir.path().join("a.ts"), "export const standalone = 1;\n").unwrap();

        let updated =
            build_incremental(prior, &options, global(), &HeuristicProbe).unwrap();
        assert!(updated.dependencies.edges.is_empty());
        assert!(!updated.dependencies.imports_by_file.contains_key("a.ts"));
        assert_eq!(
            updated.dependencies.exports_by_file["a.ts"],
            vec!["standalone"]
        );

        let full = SnapshotBuilder::new(options).build_full().unwrap();
        assert!(updated.equals_ignoring_timestamp(&full));
    }

    #[test]
    fn test_incremental_delete_prunes() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), "export const one = 1;\n").unwrap();
        fs::write(
            dir.path().join("b.ts"),
            "import { one } from \"./a\";\nexport const two = one + 1;\n",
        )
        .unwrap();

        let mut options = SnapshotOptions::new(dir.path());
        options.refresh_quality = true;
        let prior = SnapshotBuilder::new(options.clone()).build().unwrap();
        assert_eq!(prior.meta.total_files, 2);

        fs::remove_file(dir.path().join("b.ts")).unwrap();

        let updated =
            build_incremental(prior, &options, global(), &HeuristicProbe).unwrap();
        assert_eq!(updated.meta.total_files, 1);
        assert!(!updated.meta.file_hashes.contains_key("b.ts"));
        assert!(!updated.symbols.contains_key("b.ts"));
        assert!(!updated.code.contains_key("b.ts"));
        assert!(updated.dependencies.edges.is_empty());
        assert_eq!(updated.structure.modules.len(), 1);

        let full = SnapshotBuilder::new(options).build_full().unwrap();
        assert!(updated.equals_ignoring_timestamp(&full));
    }

    #[test]
    fn test_incremental_quality_untouched_by_default() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.ts"), "export const one = 1;\n").unwrap();

        let options = SnapshotOptions::new(dir.path());
        let mut prior = SnapshotBuilder::new(options.clone()).build().unwrap();
        prior.quality.shit_score = 42.5;

        fs::write(dir.path().join("b.ts"), "export const two = 2;\n").unwrap();
        let updated =
            build_incremental(prior.clone(), &options, global(), &HeuristicProbe).unwrap();
        assert_eq!(updated.quality.shit_score, 42.5);

        let mut refresh = options.clone();
        refresh.refresh_quality = true;
        let refreshed =
            build_incremental(prior, &refresh, global(), &HeuristicProbe).unwrap();
        assert_ne!(refreshed.quality.shit_score, 42.5);
    }
}
