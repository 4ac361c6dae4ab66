//! File-level dependency graph
//!
//! Directed multigraph over project-relative paths with forward and
//! reverse adjacency, topological sort, transitive closure and a JSON
//! round-trip form. Adjacency is kept in ordered maps so traversal and
//! serialization are deterministic for equal inputs.

use crate::core::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// The syntactic origin of an edge
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Import,
    Require,
    Include,
}

impl DependencyKind {
    pub fn label(&self) -> &'static str {
        match self {
            DependencyKind::Import => "import",
            DependencyKind::Require => "require",
            DependencyKind::Include => "include",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "import" => Some(DependencyKind::Import),
            "require" => Some(DependencyKind::Require),
            "include" => Some(DependencyKind::Include),
            _ => None,
        }
    }
}

/// Computed per-node view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependencyNode {
    pub rel_path: String,
    pub in_degree: usize,
    pub out_degree: usize,
    pub dependencies: Vec<String>,
    pub dependents: Vec<String>,
}

/// Result of a Kahn topological sort
#[derive(Debug, Clone)]
pub struct TopoSort {
    /// Nodes in dependency order (dependencies before dependents)
    pub order: Vec<String>,
    pub has_cycle: bool,
    /// Nodes left out of `order` when a cycle blocked completion
    pub cycle_nodes: Vec<String>,
}

type Adjacency = BTreeMap<String, BTreeMap<String, BTreeSet<DependencyKind>>>;

/// Directed multigraph over file paths
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeSet<String>,
    /// from -> to -> kinds
    out_edges: Adjacency,
    /// to -> from -> kinds
    in_edges: Adjacency,
}

/// Serialized wire form of the graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedGraph {
    pub nodes: Vec<String>,
    pub edges: Vec<SerializedEdge>,
    pub metadata: GraphMetadata,
}

/// One serialized `(from, to)` pair; `weight` counts collapsed kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerializedEdge {
    pub from: String,
    pub to: String,
    pub weight: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kinds: Vec<DependencyKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphMetadata {
    pub node_count: usize,
    pub edge_count: usize,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a graph from stored `(from, to)` pairs, e.g. out of a
    /// snapshot's dependency section. Kinds default to `Import`.
    pub fn from_edges<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut graph = Self::new();
        for (from, to) in pairs {
            let _ = graph.add_edge(from, to, DependencyKind::Import);
        }
        graph
    }

    /// Add a node. Idempotent for existing nodes; empty or whitespace
    /// paths are rejected.
    pub fn add_node(&mut self, path: &str) -> Result<()> {
        if path.trim().is_empty() {
            return Err(Error::Validation {
                field: "node path",
                value: path.to_string(),
            });
        }
        self.nodes.insert(path.to_string());
        Ok(())
    }

    /// Add an edge, auto-creating missing endpoints. Duplicate
    /// `(from, to, kind)` triples coalesce silently.
    pub fn add_edge(&mut self, from: &str, to: &str, kind: DependencyKind) -> Result<()> {
        self.add_node(from)?;
        self.add_node(to)?;
        self.out_edges
            .entry(from.to_string())
            .or_default()
            .entry(to.to_string())
            .or_default()
            .insert(kind);
        self.in_edges
            .entry(to.to_string())
            .or_default()
            .entry(from.to_string())
            .or_default()
            .insert(kind);
        Ok(())
    }

    /// Remove a node and every edge touching it
    pub fn remove_node(&mut self, path: &str) {
        self.nodes.remove(path);
        if let Some(targets) = self.out_edges.remove(path) {
            for to in targets.keys() {
                prune_endpoint(&mut self.in_edges, to, path);
            }
        }
        if let Some(sources) = self.in_edges.remove(path) {
            for from in sources.keys() {
                prune_endpoint(&mut self.out_edges, from, path);
            }
        }
    }

    /// Remove one `(from, to, kind)` triple
    pub fn remove_edge(&mut self, from: &str, to: &str, kind: DependencyKind) {
        prune_kind(&mut self.out_edges, from, to, kind);
        prune_kind(&mut self.in_edges, to, from, kind);
    }

    pub fn contains_node(&self, path: &str) -> bool {
        self.nodes.contains(path)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Distinct `(from, to, kind)` triples
    pub fn edge_count(&self) -> usize {
        self.out_edges
            .values()
            .flat_map(|targets| targets.values())
            .map(|kinds| kinds.len())
            .sum()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().map(String::as_str)
    }

    /// Direct out-neighbours, ascending
    pub fn dependencies_of(&self, path: &str) -> Vec<String> {
        self.out_edges
            .get(path)
            .map(|targets| targets.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Direct in-neighbours, ascending
    pub fn dependents_of(&self, path: &str) -> Vec<String> {
        self.in_edges
            .get(path)
            .map(|sources| sources.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Kinds recorded on the `(from, to)` pair
    pub fn edge_kinds(&self, from: &str, to: &str) -> Vec<DependencyKind> {
        self.out_edges
            .get(from)
            .and_then(|targets| targets.get(to))
            .map(|kinds| kinds.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Distinct `(from, to)` pairs, ascending
    pub fn edge_pairs(&self) -> Vec<(String, String)> {
        self.out_edges
            .iter()
            .flat_map(|(from, targets)| {
                targets.keys().map(move |to| (from.clone(), to.clone()))
            })
            .collect()
    }

    /// Computed view of one node
    pub fn node_view(&self, path: &str) -> Option<DependencyNode> {
        if !self.nodes.contains(path) {
            return None;
        }
        let dependencies = self.dependencies_of(path);
        let dependents = self.dependents_of(path);
        Some(DependencyNode {
            rel_path: path.to_string(),
            in_degree: dependents.len(),
            out_degree: dependencies.len(),
            dependencies,
            dependents,
        })
    }

    /// Kahn's algorithm on in-degrees. Nodes left unsorted when the
    /// algorithm stalls are reported as `cycle_nodes`.
    pub fn topological_sort(&self) -> TopoSort {
        let mut in_degree: BTreeMap<&str, usize> = self
            .nodes
            .iter()
            .map(|n| {
                let deg = self
                    .in_edges
                    .get(n.as_str())
                    .map(|sources| sources.len())
                    .unwrap_or(0);
                (n.as_str(), deg)
            })
            .collect();

        // Ordered ready-set keeps the output deterministic
        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(&n, _)| n)
            .collect();

        let mut order = Vec::with_capacity(self.nodes.len());
        while let Some(&node) = ready.iter().next() {
            ready.remove(node);
            order.push(node.to_string());

            if let Some(targets) = self.out_edges.get(node) {
                for to in targets.keys() {
                    if let Some(deg) = in_degree.get_mut(to.as_str()) {
                        *deg = deg.saturating_sub(1);
                        if *deg == 0 {
                            ready.insert(to.as_str());
                        }
                    }
                }
            }
        }

        let has_cycle = order.len() < self.nodes.len();
        let cycle_nodes = if has_cycle {
            let sorted: BTreeSet<&str> = order.iter().map(String::as_str).collect();
            self.nodes
                .iter()
                .filter(|n| !sorted.contains(n.as_str()))
                .cloned()
                .collect()
        } else {
            Vec::new()
        };

        TopoSort {
            order,
            has_cycle,
            cycle_nodes,
        }
    }

    /// Everything reachable through out-edges, depth first, each node
    /// once, in first-visit order. The start node is not listed.
    pub fn transitive_dependencies(&self, path: &str) -> Vec<String> {
        self.reachable(path, &self.out_edges)
    }

    /// Everything reachable through in-edges, depth first
    pub fn transitive_dependents(&self, path: &str) -> Vec<String> {
        self.reachable(path, &self.in_edges)
    }

    fn reachable(&self, start: &str, adjacency: &Adjacency) -> Vec<String> {
        let mut visited: BTreeSet<&str> = BTreeSet::new();
        visited.insert(start);
        let mut result = Vec::new();
        let mut stack: Vec<&str> = adjacency
            .get(start)
            .map(|targets| targets.keys().rev().map(String::as_str).collect())
            .unwrap_or_default();

        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            result.push(node.to_string());
            if let Some(targets) = adjacency.get(node) {
                for next in targets.keys().rev() {
                    if !visited.contains(next.as_str()) {
                        stack.push(next);
                    }
                }
            }
        }
        result
    }

    /// Weak connectivity: breadth-first over the undirected view
    pub fn is_connected(&self) -> bool {
        let Some(start) = self.nodes.iter().next() else {
            return true;
        };

        let mut visited: BTreeSet<&str> = BTreeSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        visited.insert(start);
        queue.push_back(start);

        while let Some(node) = queue.pop_front() {
            let forward = self.out_edges.get(node).into_iter().flat_map(|t| t.keys());
            let backward = self.in_edges.get(node).into_iter().flat_map(|t| t.keys());
            for next in forward.chain(backward) {
                if visited.insert(next) {
                    queue.push_back(next);
                }
            }
        }

        visited.len() == self.nodes.len()
    }

    /// Serialize to the wire form
    pub fn serialize(&self) -> SerializedGraph {
        let edges = self
            .out_edges
            .iter()
            .flat_map(|(from, targets)| {
                targets.iter().map(move |(to, kinds)| SerializedEdge {
                    from: from.clone(),
                    to: to.clone(),
                    weight: kinds.len(),
                    kinds: kinds.iter().copied().collect(),
                })
            })
            .collect::<Vec<_>>();

        SerializedGraph {
            nodes: self.nodes.iter().cloned().collect(),
            metadata: GraphMetadata {
                node_count: self.nodes.len(),
                edge_count: self.edge_count(),
            },
            edges,
        }
    }

    /// Rebuild from the wire form
    pub fn deserialize(serialized: &SerializedGraph) -> Result<Self> {
        let mut graph = Self::new();
        for node in &serialized.nodes {
            graph.add_node(node)?;
        }
        for edge in &serialized.edges {
            if edge.kinds.is_empty() {
                graph.add_edge(&edge.from, &edge.to, DependencyKind::Import)?;
            } else {
                for &kind in &edge.kinds {
                    graph.add_edge(&edge.from, &edge.to, kind)?;
                }
            }
        }
        Ok(graph)
    }
}

/// Drop `neighbour` from `adjacency[key]`, removing the entry when it
/// empties
fn prune_endpoint(adjacency: &mut Adjacency, key: &str, neighbour: &str) {
    let emptied = match adjacency.get_mut(key) {
        Some(neighbours) => {
            neighbours.remove(neighbour);
            neighbours.is_empty()
        }
        None => false,
    };
    if emptied {
        adjacency.remove(key);
    }
}

/// Drop one kind from `adjacency[key][neighbour]`, cascading empty maps
fn prune_kind(adjacency: &mut Adjacency, key: &str, neighbour: &str, kind: DependencyKind) {
    let Some(neighbours) = adjacency.get_mut(key) else {
        return;
    };
    let kinds_emptied = match neighbours.get_mut(neighbour) {
        Some(kinds) => {
            kinds.remove(&kind);
            kinds.is_empty()
        }
        None => false,
    };
    if kinds_emptied {
        neighbours.remove(neighbour);
    }
    if neighbours.is_empty() {
        adjacency.remove(key);
    }
}
