//! Arena-allocated syntax trees
//!
//! Parsers of every language produce the same opaque tree shape: a flat
//! vector of nodes with child relations stored as indices. No node owns
//! another and there are no back-references, so extractors can iterate
//! ids without touching an object graph.

use serde::{Deserialize, Serialize};

/// Index of a node within its [`Ast`] arena
pub type NodeId = usize;

/// Source location of a node. Lines are 1-indexed, columns 0-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SourceSpan {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl SourceSpan {
    pub fn new(start_line: u32, start_column: u32, end_line: u32, end_column: u32) -> Self {
        Self {
            start_line,
            start_column,
            end_line,
            end_column,
        }
    }

    /// Span covering a single point
    pub fn point(line: u32, column: u32) -> Self {
        Self::new(line, column, line, column)
    }
}

/// A single syntax node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AstNode {
    /// Grammar-specific node kind (e.g. `function_declaration`)
    pub kind: String,
    /// Location in the source text
    pub span: SourceSpan,
    /// Child node ids, in source order
    pub children: Vec<NodeId>,
    /// Verbatim source text, captured for leaf nodes only
    pub text: Option<String>,
}

/// An arena of syntax nodes. The root, when present, is node 0.
#[derive(Debug, Clone, Default)]
pub struct Ast {
    nodes: Vec<AstNode>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
        }
    }

    /// Append a node and return its id. The caller wires children
    /// afterwards via [`Ast::add_child`] or by pushing a node whose
    /// child list is already complete.
    pub fn push(&mut self, node: AstNode) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Record `child` under `parent`
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[parent].children.push(child);
    }

    pub fn root(&self) -> Option<NodeId> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(0)
        }
    }

    pub fn node(&self, id: NodeId) -> &AstNode {
        &self.nodes[id]
    }

    pub fn get(&self, id: NodeId) -> Option<&AstNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    /// First child with the given kind
    pub fn child_of_kind(&self, id: NodeId, kind: &str) -> Option<NodeId> {
        self.children(id)
            .iter()
            .copied()
            .find(|&c| self.nodes[c].kind == kind)
    }

    pub fn has_child_of_kind(&self, id: NodeId, kind: &str) -> bool {
        self.child_of_kind(id, kind).is_some()
    }

    /// Leaf text of the node, if captured
    pub fn text_of(&self, id: NodeId) -> Option<&str> {
        self.nodes[id].text.as_deref()
    }

    /// Preorder traversal of the whole tree
    pub fn walk(&self) -> Preorder<'_> {
        Preorder {
            ast: self,
            stack: self.root().into_iter().collect(),
        }
    }

    /// Preorder traversal of the subtree rooted at `id`
    pub fn descendants(&self, id: NodeId) -> Preorder<'_> {
        Preorder {
            ast: self,
            stack: vec![id],
        }
    }
}

/// Explicit-stack preorder iterator over node ids
pub struct Preorder<'a> {
    ast: &'a Ast,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Preorder<'a> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        // Push children reversed so the leftmost is visited first
        for &child in self.ast.children(id).iter().rev() {
            self.stack.push(child);
        }
        Some(id)
    }
}
