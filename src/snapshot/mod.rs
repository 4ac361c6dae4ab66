pub mod builder;
pub mod compress;
pub mod diff;
pub mod extract;
pub mod quality;
pub mod store;
pub mod types;

pub use builder::SnapshotBuilder;
pub use diff::{classify_changes, ChangeSet};
pub use quality::{HeuristicProbe, QualityFileInput, QualityProbe};
pub use types::{
    CompressedCode, CompressedSymbol, CompressionLevel, ModuleSummary, QualityMetrics,
    Snapshot, SymbolCode,
};
