//! codepack - content-addressed code snapshots for AI coding tools
//!
//! Scans a source tree, extracts symbols and file-level dependencies
//! through pluggable parsers, compresses code bodies at a chosen
//! fidelity level, and emits a single snapshot artifact that can be
//! rebuilt incrementally from per-file content hashes.

pub mod cli;
pub mod core;
pub mod graph;
pub mod hash;
pub mod parse;
pub mod snapshot;

pub use core::config::SnapshotOptions;
pub use core::error::{Error, Result};
pub use snapshot::{CompressionLevel, Snapshot, SnapshotBuilder};
