pub mod cycles;
pub mod dependency;

pub use cycles::{
    suggest_fix_strategies, CircularDependency, CycleDetector, CycleDetectorOptions,
    CycleSeverity, FixPriority, FixStrategy, StronglyConnectedComponent,
};
pub use dependency::{
    DependencyGraph, DependencyKind, DependencyNode, SerializedGraph, TopoSort,
};
