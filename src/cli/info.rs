//! Info command implementation

use crate::cli::{InfoArgs, OutputFormat};
use crate::core::error::Result;
use crate::graph::{CycleDetector, DependencyGraph};
use crate::snapshot::store;
use chrono::{TimeZone, Utc};

/// Run the info command
pub fn run(args: InfoArgs) -> Result<()> {
    let snapshot = store::load(&args.snapshot)?;
    let json = store::to_json_string(&snapshot)?;

    let graph = DependencyGraph::from_edges(
        snapshot
            .dependencies
            .edges
            .iter()
            .map(|(from, to)| (from.as_str(), to.as_str())),
    );
    let cycles = CycleDetector::default().detect_cycles(&graph);
    let symbol_count: usize = snapshot.symbols.values().map(Vec::len).sum();

    match args.format {
        OutputFormat::Json => {
            let summary = serde_json::json!({
                "project": &snapshot.project_name,
                "version": &snapshot.version,
                "createdAtEpochMs": snapshot.created_at_epoch_ms,
                "projectHash": &snapshot.project_hash,
                "level": snapshot.level,
                "files": snapshot.meta.total_files,
                "lines": snapshot.meta.total_lines,
                "languages": &snapshot.meta.languages,
                "symbols": symbol_count,
                "edges": snapshot.dependencies.edges.len(),
                "cycles": cycles.len(),
                "quality": &snapshot.quality,
                "bytes": json.len(),
                "estimatedTokens": store::estimate_tokens(json.len()),
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        OutputFormat::Human => {
            let created = Utc
                .timestamp_millis_opt(snapshot.created_at_epoch_ms)
                .single()
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| snapshot.created_at_epoch_ms.to_string());

            println!("{} (format {})", snapshot.project_name, snapshot.version);
            println!("  created     {}", created);
            println!("  hash        {}", snapshot.project_hash);
            println!("  level       {}", snapshot.level);
            println!(
                "  files       {} ({} lines)",
                snapshot.meta.total_files, snapshot.meta.total_lines
            );
            println!("  languages   {}", snapshot.meta.languages.join(", "));
            println!("  symbols     {}", symbol_count);
            println!(
                "  imports     {} edges, {} cycles",
                snapshot.dependencies.edges.len(),
                cycles.len()
            );
            println!(
                "  quality     score {:.1}, complexity {:.1}, maintainability {:.1}",
                snapshot.quality.shit_score,
                snapshot.quality.complexity,
                snapshot.quality.maintainability
            );
            println!(
                "  size        {} bytes (~{} tokens)",
                json.len(),
                store::estimate_tokens(json.len())
            );
        }
    }

    Ok(())
}
