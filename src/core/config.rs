//! Snapshot build options and defaults

use crate::snapshot::CompressionLevel;
use std::path::PathBuf;

/// Options controlling a snapshot build
#[derive(Debug, Clone)]
pub struct SnapshotOptions {
    /// Project root to scan
    pub project_path: PathBuf,
    /// Where to write the serialized snapshot (none = don't persist)
    pub output_path: Option<PathBuf>,
    /// Compression fidelity for code bodies
    pub level: CompressionLevel,
    /// Reuse an existing snapshot at `output_path` and patch only
    /// changed files
    pub incremental: bool,
    /// Glob patterns excluded from the scan (in addition to the
    /// built-in exclusions)
    pub exclude_globs: Vec<String>,
    /// File extensions to include (no leading dot)
    pub include_extensions: Vec<String>,
    /// Include test files and fixtures
    pub include_tests: bool,
    /// Suppress progress output
    pub silent: bool,
    /// Per-file task timeout in seconds
    pub file_timeout_secs: u64,
    /// Re-run the quality probe on incremental builds
    pub refresh_quality: bool,
}

impl SnapshotOptions {
    /// Options for a full build of `project_path` with defaults
    pub fn new(project_path: impl Into<PathBuf>) -> Self {
        Self {
            project_path: project_path.into(),
            output_path: None,
            level: CompressionLevel::Full,
            incremental: false,
            exclude_globs: Vec::new(),
            include_extensions: default_extensions(),
            include_tests: false,
            silent: false,
            file_timeout_secs: FILE_TIMEOUT_SECS,
            refresh_quality: false,
        }
    }
}

/// Default set of indexed extensions
pub fn default_extensions() -> Vec<String> {
    DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
}

/// Directories always skipped unless explicitly included
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    "node_modules",
    "dist",
    "build",
    "out",
    ".git",
    "coverage",
    ".next",
    "DerivedData",
    ".build",
];

/// Path segments that mark test files and fixtures
pub const TEST_PATH_MARKERS: &[&str] = &["__tests__", "__mocks__", "fixtures"];

/// File suffixes that mark test files
pub const TEST_FILE_SUFFIXES: &[&str] = &[".test", ".spec"];

/// Extensions included by default (the fixed language map)
pub const DEFAULT_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "swift"];

/// Semver of the snapshot wire format
pub const SNAPSHOT_FORMAT_VERSION: &str = "1.0.0";

/// Default per-file task timeout (seconds)
pub const FILE_TIMEOUT_SECS: u64 = 30;

/// Largest file the walker will hand to a parser (bytes)
pub const MAX_FILE_SIZE: u64 = 1_048_576; // 1MB
