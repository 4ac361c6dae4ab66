//! CLI command definitions and handlers

pub mod cycles;
pub mod info;
pub mod snapshot;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::snapshot::CompressionLevel;

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::Cyan.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default())
}

/// Content-addressed code snapshots for AI coding tools
#[derive(Parser, Debug)]
#[command(name = "codepack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = styles())]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build or incrementally update a project snapshot
    Snapshot(SnapshotArgs),

    /// Show statistics for a stored snapshot
    Info(InfoArgs),

    /// Report circular dependencies in a project
    Cycles(CyclesArgs),
}

/// Arguments for the snapshot command
#[derive(Parser, Debug)]
pub struct SnapshotArgs {
    /// Project path (defaults to current directory)
    pub project: Option<PathBuf>,

    /// Output path (defaults to .codepack/snapshot.json in the project)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Patch the existing snapshot instead of rebuilding
    #[arg(long)]
    pub incremental: bool,

    /// Compression level for code bodies
    #[arg(short, long, value_enum, default_value_t = CompressionLevel::Full)]
    pub level: CompressionLevel,

    /// Glob pattern to exclude (can be repeated)
    #[arg(long = "exclude")]
    pub exclude_globs: Vec<String>,

    /// Include test files and fixtures
    #[arg(long)]
    pub include_tests: bool,

    /// Re-run quality analysis on incremental updates
    #[arg(long)]
    pub refresh_quality: bool,

    /// Per-file task timeout in seconds
    #[arg(long, default_value_t = crate::core::config::FILE_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Suppress progress output
    #[arg(short, long)]
    pub silent: bool,
}

/// Arguments for the info command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to a stored snapshot
    pub snapshot: PathBuf,

    /// Output format
    #[arg(short = 'f', long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for the cycles command
#[derive(Parser, Debug)]
pub struct CyclesArgs {
    /// Project path (defaults to current directory)
    pub project: Option<PathBuf>,

    /// Report every minimal cycle per component, not just the first
    #[arg(long)]
    pub all: bool,

    /// Report files that import themselves
    #[arg(long)]
    pub include_self_loops: bool,

    /// Output format
    #[arg(short = 'f', long, default_value = "human")]
    pub format: OutputFormat,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
