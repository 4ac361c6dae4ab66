//! Circular dependency detection
//!
//! Tarjan's strongly-connected-components algorithm, implemented with
//! an explicit stack so deep import chains cannot overflow the call
//! stack. Minimal cycle paths inside an SCC are recovered by BFS over
//! intra-component edges.

use crate::graph::dependency::DependencyGraph;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use tracing::debug;

/// Cycle classification by length: ≤ 3 low, 4–6 medium, ≥ 7 high
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleSeverity {
    Low,
    Medium,
    High,
}

impl CycleSeverity {
    pub fn from_length(length: usize) -> Self {
        match length {
            0..=3 => CycleSeverity::Low,
            4..=6 => CycleSeverity::Medium,
            _ => CycleSeverity::High,
        }
    }
}

/// One detected cycle, nodes in traversal order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircularDependency {
    pub cycle_nodes: Vec<String>,
    pub length: usize,
    pub severity: CycleSeverity,
}

impl CircularDependency {
    fn from_nodes(cycle_nodes: Vec<String>) -> Self {
        let length = cycle_nodes.len();
        Self {
            cycle_nodes,
            length,
            severity: CycleSeverity::from_length(length),
        }
    }
}

/// Maximal subgraph where every node reaches every other
#[derive(Debug, Clone)]
pub struct StronglyConnectedComponent {
    pub nodes: Vec<String>,
    pub size: usize,
    /// Number of intra-component edges
    pub cycle_complexity: usize,
}

/// Suggested remediation for a cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixStrategy {
    pub cycle_nodes: Vec<String>,
    pub strategy: &'static str,
    pub description: String,
    pub priority: FixPriority,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FixPriority {
    Low,
    Medium,
    High,
}

/// Detector options
#[derive(Debug, Clone)]
pub struct CycleDetectorOptions {
    /// Skip single-node cycles (a file importing itself)
    pub ignore_self_loops: bool,
    /// Largest SCC for which cycle paths are enumerated
    pub max_cycle_length: usize,
    /// Enumerate a minimal cycle per component node instead of
    /// stopping after the first
    pub report_all_cycles: bool,
}

impl Default for CycleDetectorOptions {
    fn default() -> Self {
        Self {
            ignore_self_loops: true,
            max_cycle_length: 10,
            report_all_cycles: false,
        }
    }
}

/// SCC-based cycle detector over a [`DependencyGraph`]
#[derive(Debug, Clone, Default)]
pub struct CycleDetector {
    options: CycleDetectorOptions,
}

impl CycleDetector {
    pub fn new(options: CycleDetectorOptions) -> Self {
        Self { options }
    }

    /// All circular dependencies in the graph, per the options
    pub fn detect_cycles(&self, graph: &DependencyGraph) -> Vec<CircularDependency> {
        let mut cycles = Vec::new();

        for scc in self.find_sccs(graph) {
            if scc.size == 1 {
                let node = &scc.nodes[0];
                let has_self_edge = graph.dependencies_of(node).iter().any(|d| d == node);
                if has_self_edge && !self.options.ignore_self_loops {
                    cycles.push(CircularDependency::from_nodes(vec![node.clone()]));
                }
                continue;
            }

            if scc.size > self.options.max_cycle_length {
                debug!(
                    size = scc.size,
                    max = self.options.max_cycle_length,
                    "Skipping cycle enumeration for oversized component"
                );
                continue;
            }

            let members: BTreeSet<&str> = scc.nodes.iter().map(String::as_str).collect();
            let mut seen: BTreeSet<Vec<String>> = BTreeSet::new();
            for start in &scc.nodes {
                if let Some(path) = minimal_cycle(graph, start, &members) {
                    // A self-edge inside a larger component is still a
                    // self-loop for the ignore option
                    if path.len() == 1 && self.options.ignore_self_loops {
                        continue;
                    }
                    let mut canonical = path.clone();
                    canonical.sort();
                    if seen.insert(canonical) {
                        cycles.push(CircularDependency::from_nodes(path));
                    }
                }
                if !self.options.report_all_cycles {
                    break;
                }
            }
        }

        cycles
    }

    /// Strongly connected components via iterative Tarjan, in
    /// deterministic discovery order
    pub fn find_sccs(&self, graph: &DependencyGraph) -> Vec<StronglyConnectedComponent> {
        let names: Vec<&str> = graph.nodes().collect();
        let index_of: HashMap<&str, usize> =
            names.iter().enumerate().map(|(i, &n)| (n, i)).collect();
        let adjacency: Vec<Vec<usize>> = names
            .iter()
            .map(|&n| {
                graph
                    .dependencies_of(n)
                    .iter()
                    .filter_map(|d| index_of.get(d.as_str()).copied())
                    .collect()
            })
            .collect();

        let n = names.len();
        let mut index: Vec<Option<usize>> = vec![None; n];
        let mut lowlink: Vec<usize> = vec![0; n];
        let mut on_stack: Vec<bool> = vec![false; n];
        let mut stack: Vec<usize> = Vec::new();
        let mut next_index = 0usize;
        let mut sccs = Vec::new();

        for root in 0..n {
            if index[root].is_some() {
                continue;
            }

            // Explicit work stack of (node, next child offset)
            let mut work: Vec<(usize, usize)> = vec![(root, 0)];
            while let Some((v, child_offset)) = work.pop() {
                if child_offset == 0 {
                    index[v] = Some(next_index);
                    lowlink[v] = next_index;
                    next_index += 1;
                    stack.push(v);
                    on_stack[v] = true;
                }

                let mut descended = false;
                for (offset, &w) in adjacency[v].iter().enumerate().skip(child_offset) {
                    match index[w] {
                        None => {
                            work.push((v, offset + 1));
                            work.push((w, 0));
                            descended = true;
                            break;
                        }
                        Some(w_index) => {
                            if on_stack[w] {
                                lowlink[v] = lowlink[v].min(w_index);
                            }
                        }
                    }
                }
                if descended {
                    continue;
                }

                if index[v] == Some(lowlink[v]) {
                    let mut members = Vec::new();
                    loop {
                        let w = stack.pop().expect("tarjan stack underflow");
                        on_stack[w] = false;
                        members.push(names[w].to_string());
                        if w == v {
                            break;
                        }
                    }
                    members.sort();
                    let member_set: BTreeSet<&str> =
                        members.iter().map(String::as_str).collect();
                    let cycle_complexity = members
                        .iter()
                        .map(|m| {
                            graph
                                .dependencies_of(m)
                                .iter()
                                .filter(|d| member_set.contains(d.as_str()))
                                .count()
                        })
                        .sum();
                    sccs.push(StronglyConnectedComponent {
                        size: members.len(),
                        cycle_complexity,
                        nodes: members,
                    });
                }

                if let Some(&(parent, _)) = work.last() {
                    lowlink[parent] = lowlink[parent].min(lowlink[v]);
                }
            }
        }

        sccs
    }
}

/// Shortest cycle through `start` using only intra-SCC edges: BFS until
/// an edge back to `start` is found.
fn minimal_cycle(
    graph: &DependencyGraph,
    start: &str,
    members: &BTreeSet<&str>,
) -> Option<Vec<String>> {
    let mut parents: BTreeMap<String, String> = BTreeMap::new();
    let mut visited: BTreeSet<String> = BTreeSet::new();
    visited.insert(start.to_string());
    let mut queue: VecDeque<String> = VecDeque::new();
    queue.push_back(start.to_string());

    while let Some(current) = queue.pop_front() {
        for next in graph.dependencies_of(&current) {
            if !members.contains(next.as_str()) {
                continue;
            }
            if next == start {
                // Close the loop: walk parents back to start
                let mut path = vec![current.clone()];
                let mut cursor = current.clone();
                while let Some(parent) = parents.get(&cursor) {
                    path.push(parent.clone());
                    cursor = parent.clone();
                }
                path.reverse();
                return Some(path);
            }
            if visited.insert(next.clone()) {
                parents.insert(next.clone(), current.clone());
                queue.push_back(next);
            }
        }
    }

    None
}

/// Map cycles to remediation strategies by length bucket
pub fn suggest_fix_strategies(cycles: &[CircularDependency]) -> Vec<FixStrategy> {
    cycles
        .iter()
        .map(|cycle| {
            let (strategy, description, priority) = match cycle.length {
                1 => (
                    "remove_self_reference",
                    format!("{} imports itself; drop the self import", cycle.cycle_nodes[0]),
                    FixPriority::Low,
                ),
                2 => (
                    "extract_common_dependency",
                    format!(
                        "Move the shared pieces of {} and {} into a module both can import",
                        cycle.cycle_nodes[0], cycle.cycle_nodes[1]
                    ),
                    if cycle.severity == CycleSeverity::High {
                        FixPriority::High
                    } else {
                        FixPriority::Medium
                    },
                ),
                3..=5 => (
                    "dependency_inversion",
                    format!(
                        "Introduce an interface so the {}-file chain depends on an abstraction",
                        cycle.length
                    ),
                    if cycle.severity == CycleSeverity::High {
                        FixPriority::High
                    } else {
                        FixPriority::Medium
                    },
                ),
                _ => (
                    "architectural_refactoring",
                    format!(
                        "A {}-file cycle spans module boundaries; split responsibilities",
                        cycle.length
                    ),
                    FixPriority::High,
                ),
            };
            FixStrategy {
                cycle_nodes: cycle.cycle_nodes.clone(),
                strategy,
                description,
                priority,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::dependency::DependencyKind;

    fn graph_of(edges: &[(&str, &str)]) -> DependencyGraph {
        let mut g = DependencyGraph::new();
        for (from, to) in edges {
            g.add_edge(from, to, DependencyKind::Import).unwrap();
        }
        g
    }

    #[test]
    fn test_self_loop_ignored_by_default() {
        let g = graph_of(&[("x.ts", "x.ts")]);
        let detector = CycleDetector::default();
        assert!(detector.detect_cycles(&g).is_empty());
    }

    #[test]
    fn test_self_loop_reported_when_enabled() {
        let g = graph_of(&[("x.ts", "x.ts")]);
        let detector = CycleDetector::new(CycleDetectorOptions {
            ignore_self_loops: false,
            ..Default::default()
        });
        let cycles = detector.detect_cycles(&g);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].cycle_nodes, vec!["x.ts"]);
        assert_eq!(cycles[0].length, 1);
        assert_eq!(cycles[0].severity, CycleSeverity::Low);
    }

    #[test]
    fn test_two_node_cycle() {
        let g = graph_of(&[("a.ts", "b.ts"), ("b.ts", "a.ts")]);
        let topo = g.topological_sort();
        assert!(topo.has_cycle);
        assert_eq!(topo.cycle_nodes, vec!["a.ts", "b.ts"]);

        let cycles = CycleDetector::default().detect_cycles(&g);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].length, 2);
        assert_eq!(cycles[0].severity, CycleSeverity::Low);

        let strategies = suggest_fix_strategies(&cycles);
        assert_eq!(strategies[0].strategy, "extract_common_dependency");
    }

    #[test]
    fn test_acyclic_graph_is_clean() {
        let g = graph_of(&[("a.ts", "b.ts"), ("b.ts", "c.ts"), ("a.ts", "c.ts")]);
        assert!(!g.topological_sort().has_cycle);
        assert!(CycleDetector::default().detect_cycles(&g).is_empty());
    }

    #[test]
    fn test_detection_agrees_with_toposort() {
        // No self-loops: detectCycles is empty exactly when Kahn
        // completes
        let graphs = [
            graph_of(&[("a.ts", "b.ts"), ("b.ts", "c.ts")]),
            graph_of(&[("a.ts", "b.ts"), ("b.ts", "c.ts"), ("c.ts", "a.ts")]),
            graph_of(&[
                ("a.ts", "b.ts"),
                ("b.ts", "a.ts"),
                ("c.ts", "d.ts"),
                ("d.ts", "e.ts"),
            ]),
        ];
        let detector = CycleDetector::default();
        for g in &graphs {
            let has_cycle = g.topological_sort().has_cycle;
            assert_eq!(!detector.detect_cycles(g).is_empty(), has_cycle);
        }
    }

    #[test]
    fn test_severity_buckets() {
        assert_eq!(CycleSeverity::from_length(1), CycleSeverity::Low);
        assert_eq!(CycleSeverity::from_length(3), CycleSeverity::Low);
        assert_eq!(CycleSeverity::from_length(4), CycleSeverity::Medium);
        assert_eq!(CycleSeverity::from_length(6), CycleSeverity::Medium);
        assert_eq!(CycleSeverity::from_length(7), CycleSeverity::High);
    }

    #[test]
    fn test_medium_cycle_severity_and_strategy() {
        // ring of five
        let g = graph_of(&[
            ("a.ts", "b.ts"),
            ("b.ts", "c.ts"),
            ("c.ts", "d.ts"),
            ("d.ts", "e.ts"),
            ("e.ts", "a.ts"),
        ]);
        let cycles = CycleDetector::default().detect_cycles(&g);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].length, 5);
        assert_eq!(cycles[0].severity, CycleSeverity::Medium);

        let strategies = suggest_fix_strategies(&cycles);
        assert_eq!(strategies[0].strategy, "dependency_inversion");
    }

    #[test]
    fn test_large_cycle_architectural() {
        let files: Vec<String> = (0..8).map(|i| format!("m{}.ts", i)).collect();
        let mut g = DependencyGraph::new();
        for i in 0..8 {
            g.add_edge(&files[i], &files[(i + 1) % 8], DependencyKind::Import)
                .unwrap();
        }
        let cycles = CycleDetector::default().detect_cycles(&g);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].severity, CycleSeverity::High);
        assert_eq!(
            suggest_fix_strategies(&cycles)[0].strategy,
            "architectural_refactoring"
        );
    }

    #[test]
    fn test_sccs_separate_components() {
        let g = graph_of(&[
            ("a.ts", "b.ts"),
            ("b.ts", "a.ts"),
            ("c.ts", "d.ts"),
            ("d.ts", "c.ts"),
            ("b.ts", "c.ts"),
        ]);
        let sccs = CycleDetector::default().find_sccs(&g);
        let mut sizes: Vec<usize> = sccs.iter().map(|s| s.size).collect();
        sizes.sort();
        assert_eq!(sizes, vec![2, 2]);
        for scc in sccs.iter().filter(|s| s.size == 2) {
            assert_eq!(scc.cycle_complexity, 2);
        }
    }

    #[test]
    fn test_report_all_cycles() {
        // Two distinct minimal loops sharing the component:
        // a <-> b and a <-> c
        let g = graph_of(&[
            ("a.ts", "b.ts"),
            ("b.ts", "a.ts"),
            ("a.ts", "c.ts"),
            ("c.ts", "a.ts"),
        ]);
        let first_only = CycleDetector::default().detect_cycles(&g);
        assert_eq!(first_only.len(), 1);

        let all = CycleDetector::new(CycleDetectorOptions {
            report_all_cycles: true,
            ..Default::default()
        })
        .detect_cycles(&g);
        assert!(all.len() >= 2);
    }
}
