//! The syntax tree handed to the engine by the external front end.
//!
//! The engine never re-parses or re-tokenizes: it consumes a pre-built
//! tree exposing, per node, a shape tag, a `[start, end)` byte range into
//! the original buffer, ordered children, and a parent link. Nodes live
//! in an arena and refer to each other by [`NodeId`], so walking upward
//! never aliases a mutable borrow of the tree.

use serde::{Deserialize, Serialize};

use crate::errors::ConvertError;

/// Index of a node within a [`SyntaxTree`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Shape tag identifying which rewrite rule pair applies to a node.
///
/// A closed set: the dispatch table is a `match` over this enum, and
/// shapes without registered callbacks pass through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeShape {
    Program,
    Block,
    Identifier,
    NumberLiteral,
    StringLiteral,
    ArrayLiteral,
    ObjectLiteral,
    Member,
    Index,
    Assign,
    Call,
    Function,
    Conditional,
    While,
    Return,
    Throw,
    EqOp,
    NeqOp,
    AndOp,
    OrOp,
    NotOp,
}

/// One arena node: shape, original-buffer range, tree links.
#[derive(Debug, Clone)]
pub struct Node {
    pub shape: NodeShape,
    pub start: usize,
    pub end: usize,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

/// Arena-allocated syntax tree.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl SyntaxTree {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    /// Strict ancestors of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            tree: self,
            next: self.parent(id),
        }
    }

    /// All node ids in depth-first source order starting at the root.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// Build from the nested exchange form, validating the structural
    /// contract along the way.
    pub fn from_raw(raw: &RawNode, source_len: usize) -> Result<Self, ConvertError> {
        let mut nodes = Vec::new();
        let root = Self::intern(raw, None, &mut nodes)?;
        let tree = Self { nodes, root };
        tree.validate(source_len)?;
        Ok(tree)
    }

    fn intern(
        raw: &RawNode,
        parent: Option<NodeId>,
        nodes: &mut Vec<Node>,
    ) -> Result<NodeId, ConvertError> {
        let id = NodeId(
            u32::try_from(nodes.len())
                .map_err(|_| ConvertError::malformed_tree("node count exceeds arena capacity"))?,
        );
        nodes.push(Node {
            shape: raw.shape,
            start: raw.start,
            end: raw.end,
            parent,
            children: Vec::with_capacity(raw.children.len()),
        });
        for child in &raw.children {
            let child_id = Self::intern(child, Some(id), nodes)?;
            nodes[id.index()].children.push(child_id);
        }
        Ok(id)
    }

    /// Check the exchange contract: ranges well-formed and inside the
    /// buffer, children ordered by start and contained in their parent,
    /// sibling ranges disjoint.
    fn validate(&self, source_len: usize) -> Result<(), ConvertError> {
        for id in self.ids() {
            let node = self.node(id);
            if node.start > node.end {
                return Err(ConvertError::malformed_tree(format!(
                    "node {:?} has inverted range [{}, {})",
                    node.shape, node.start, node.end
                )));
            }
            if node.end > source_len {
                return Err(ConvertError::malformed_tree(format!(
                    "node {:?} range [{}, {}) extends past the source ({} bytes)",
                    node.shape, node.start, node.end, source_len
                )));
            }
            let mut prev_end = node.start;
            for &child_id in &node.children {
                let child = self.node(child_id);
                if child.start < node.start || child.end > node.end {
                    return Err(ConvertError::malformed_tree(format!(
                        "child {:?} [{}, {}) not contained in parent {:?} [{}, {})",
                        child.shape, child.start, child.end, node.shape, node.start, node.end
                    )));
                }
                if child.start < prev_end {
                    return Err(ConvertError::malformed_tree(format!(
                        "children of {:?} out of order or overlapping at offset {}",
                        node.shape, child.start
                    )));
                }
                prev_end = child.end;
            }
        }
        Ok(())
    }
}

/// Iterator over strict ancestors, nearest first.
pub struct Ancestors<'a> {
    tree: &'a SyntaxTree,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.tree.parent(current);
        Some(current)
    }
}

/// Nested node form used by the JSON exchange format the external parser
/// emits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawNode {
    pub shape: NodeShape,
    pub start: usize,
    pub end: usize,
    #[serde(default)]
    pub children: Vec<RawNode>,
}

/// Builds arena trees directly; used by tests and embedded front ends.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<Node>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a childless node.
    pub fn leaf(&mut self, shape: NodeShape, start: usize, end: usize) -> NodeId {
        self.node(shape, start, end, Vec::new())
    }

    /// Add a node over already-added children, given in source order.
    pub fn node(
        &mut self,
        shape: NodeShape,
        start: usize,
        end: usize,
        children: Vec<NodeId>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        for &child in &children {
            self.nodes[child.index()].parent = Some(id);
        }
        self.nodes.push(Node {
            shape,
            start,
            end,
            parent: None,
            children,
        });
        id
    }

    /// Finish the tree rooted at `root`, validating the structural
    /// contract against a source of `source_len` bytes.
    pub fn build(self, root: NodeId, source_len: usize) -> Result<SyntaxTree, ConvertError> {
        let tree = SyntaxTree {
            nodes: self.nodes,
            root,
        };
        tree.validate(source_len)?;
        Ok(tree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_links_parents() {
        let mut builder = TreeBuilder::new();
        let a = builder.leaf(NodeShape::Identifier, 0, 1);
        let b = builder.leaf(NodeShape::NumberLiteral, 4, 5);
        let assign = builder.node(NodeShape::Assign, 0, 5, vec![a, b]);
        let root = builder.node(NodeShape::Program, 0, 5, vec![assign]);
        let tree = builder.build(root, 5).expect("valid tree");

        assert_eq!(tree.parent(a), Some(assign));
        assert_eq!(tree.parent(assign), Some(root));
        assert_eq!(tree.parent(root), None);
        let ancestors: Vec<_> = tree.ancestors(a).collect();
        assert_eq!(ancestors, vec![assign, root]);
    }

    #[test]
    fn test_validate_rejects_child_outside_parent() {
        let mut builder = TreeBuilder::new();
        let child = builder.leaf(NodeShape::Identifier, 3, 8);
        let root = builder.node(NodeShape::Program, 0, 5, vec![child]);
        let err = builder.build(root, 10).unwrap_err();
        assert!(matches!(err, ConvertError::MalformedTree(_)));
    }

    #[test]
    fn test_validate_rejects_overlapping_siblings() {
        let mut builder = TreeBuilder::new();
        let a = builder.leaf(NodeShape::Identifier, 0, 4);
        let b = builder.leaf(NodeShape::Identifier, 2, 6);
        let root = builder.node(NodeShape::Program, 0, 6, vec![a, b]);
        let err = builder.build(root, 6).unwrap_err();
        assert!(matches!(err, ConvertError::MalformedTree(_)));
    }

    #[test]
    fn test_validate_rejects_range_past_source() {
        let mut builder = TreeBuilder::new();
        let root = builder.node(NodeShape::Program, 0, 20, Vec::new());
        let err = builder.build(root, 5).unwrap_err();
        assert!(matches!(err, ConvertError::MalformedTree(_)));
    }

    #[test]
    fn test_raw_node_round_trip() {
        let json = r#"{
            "shape": "program",
            "start": 0,
            "end": 5,
            "children": [
                {
                    "shape": "assign",
                    "start": 0,
                    "end": 5,
                    "children": [
                        { "shape": "identifier", "start": 0, "end": 1 },
                        { "shape": "number_literal", "start": 4, "end": 5 }
                    ]
                }
            ]
        }"#;
        let raw: RawNode = serde_json::from_str(json).expect("valid exchange json");
        let tree = SyntaxTree::from_raw(&raw, 5).expect("valid tree");
        assert_eq!(tree.len(), 4);
        assert_eq!(tree.node(tree.root()).shape, NodeShape::Program);
    }
}
