//! Snapshot command implementation

use crate::cli::SnapshotArgs;
use crate::core::config::SnapshotOptions;
use crate::core::error::Result;
use crate::snapshot::{store, SnapshotBuilder};
use std::env;
use std::time::Instant;
use tracing::info;

/// Run the snapshot command
pub fn run(args: SnapshotArgs) -> Result<()> {
    let project_path = match args.project {
        Some(path) => path,
        None => env::current_dir()?,
    };
    let output_path = args
        .output
        .unwrap_or_else(|| store::default_snapshot_path(&project_path));

    let mut options = SnapshotOptions::new(&project_path);
    options.output_path = Some(output_path.clone());
    options.level = args.level;
    options.incremental = args.incremental;
    options.exclude_globs = args.exclude_globs;
    options.include_tests = args.include_tests;
    options.refresh_quality = args.refresh_quality;
    options.file_timeout_secs = args.timeout;
    options.silent = args.silent;

    let start = Instant::now();
    let snapshot = SnapshotBuilder::new(options).build()?;
    store::save(&snapshot, &output_path)?;

    let json = store::to_json_string(&snapshot)?;
    info!(
        path = %output_path.display(),
        bytes = json.len(),
        elapsed_ms = start.elapsed().as_millis(),
        "Snapshot written"
    );

    if !args.silent {
        println!(
            "Snapshot of {} files ({} lines) written to {}",
            snapshot.meta.total_files,
            snapshot.meta.total_lines,
            output_path.display()
        );
        println!(
            "  level {}  hash {}  {} bytes  ~{} tokens",
            snapshot.level,
            snapshot.project_hash,
            json.len(),
            store::estimate_tokens(json.len())
        );
    }

    Ok(())
}
