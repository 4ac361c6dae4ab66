//! Cycles command implementation

use crate::cli::{CyclesArgs, OutputFormat};
use crate::core::config::SnapshotOptions;
use crate::core::error::Result;
use crate::graph::{
    suggest_fix_strategies, CycleDetector, CycleDetectorOptions, DependencyGraph,
};
use crate::parse::registry::global;
use crate::parse::walker::{read_file_text, FileWalker};
use crate::snapshot::extract::{extract_file, resolve_import};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::env;
use tracing::warn;

/// Run the cycles command: scan, build only the dependency graph,
/// report circular dependencies with fix suggestions.
pub fn run(args: CyclesArgs) -> Result<()> {
    let project_path = match args.project {
        Some(path) => path,
        None => env::current_dir()?,
    };

    let options = SnapshotOptions::new(&project_path);
    let files = FileWalker::new(&options)?.walk()?;
    let file_set: BTreeSet<String> = files.iter().map(|f| f.rel_path.clone()).collect();

    let extractions: Vec<_> = files
        .par_iter()
        .filter_map(|file| {
            let source = read_file_text(&file.abs_path).ok()?;
            match extract_file(global(), &file.rel_path, &source) {
                Ok(extraction) => Some(extraction),
                Err(e) => {
                    warn!(file = %file.rel_path, error = %e, "Skipping file");
                    None
                }
            }
        })
        .collect();

    let mut graph = DependencyGraph::new();
    for extraction in &extractions {
        graph.add_node(&extraction.rel_path)?;
        for dependency in &extraction.dependencies {
            if let Some(target) =
                resolve_import(&extraction.rel_path, &dependency.path, &file_set)
            {
                graph.add_edge(&extraction.rel_path, &target, dependency.kind)?;
            }
        }
    }

    let detector = CycleDetector::new(CycleDetectorOptions {
        ignore_self_loops: !args.include_self_loops,
        report_all_cycles: args.all,
        ..Default::default()
    });
    let cycles = detector.detect_cycles(&graph);
    let strategies = suggest_fix_strategies(&cycles);

    match args.format {
        OutputFormat::Json => {
            let report = serde_json::json!({
                "files": graph.node_count(),
                "edges": graph.edge_count(),
                "cycles": cycles,
                "strategies": strategies,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Human => {
            if cycles.is_empty() {
                println!(
                    "No circular dependencies across {} files ({} edges)",
                    graph.node_count(),
                    graph.edge_count()
                );
                return Ok(());
            }

            println!("{} circular dependencies:", cycles.len());
            for (cycle, strategy) in cycles.iter().zip(&strategies) {
                println!(
                    "  [{:?}] {} (length {})",
                    cycle.severity,
                    cycle.cycle_nodes.join(" -> "),
                    cycle.length
                );
                println!(
                    "      fix: {} - {}",
                    strategy.strategy, strategy.description
                );
            }
        }
    }

    Ok(())
}
