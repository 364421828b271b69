//! Node end marks: the current append point for "insert after this node".
//!
//! Rewrite rules are written locally ("append a comma after this array
//! element"), but several independent rules may want to append after the
//! same logical point. Routing every end-append through the tracker makes
//! them compose in a stable, call-order-respecting way: content lands at
//! the node's current mark, and the mark of the node and every strict
//! ancestor is advanced past the new content, so an ancestor's own
//! end-append always lands after all descendant appends.

use crate::errors::ConvertError;
use crate::patch::Editor;
use crate::tree::{NodeId, SyntaxTree};

/// Append point for one node: an original-buffer offset plus the number
/// of bytes already appended there through this tracker. All offsets stay
/// in original-buffer space (inserts are zero-width there); the appended
/// count is what makes advancement past generated content observable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct EndMark {
    pub offset: usize,
    pub appended: usize,
}

/// Side table of end marks, keyed by node index.
#[derive(Debug)]
pub struct NodeEndTracker {
    marks: Vec<EndMark>,
}

impl NodeEndTracker {
    /// Every mark starts at the node's static range end.
    pub fn new(tree: &SyntaxTree) -> Self {
        let marks = tree
            .ids()
            .map(|id| EndMark {
                offset: tree.node(id).end,
                appended: 0,
            })
            .collect();
        Self { marks }
    }

    pub fn mark(&self, node: NodeId) -> EndMark {
        self.marks[node.index()]
    }

    /// Insert `content` at the node's current end mark, then advance the
    /// mark of the node and every strict ancestor to at least the
    /// position just past the inserted content.
    pub fn append_to_node(
        &mut self,
        tree: &SyntaxTree,
        editor: &mut Editor,
        node: NodeId,
        content: &str,
    ) -> Result<(), ConvertError> {
        let mark = self.marks[node.index()];
        editor.insert(mark.offset, content);
        let advanced = EndMark {
            offset: mark.offset,
            appended: mark.appended + content.len(),
        };
        self.advance(tree, node, advanced)
    }

    fn advance(
        &mut self,
        tree: &SyntaxTree,
        node: NodeId,
        to: EndMark,
    ) -> Result<(), ConvertError> {
        let mut current = Some(node);
        while let Some(id) = current {
            let mark = &mut self.marks[id.index()];
            if to > *mark {
                *mark = to;
            }
            let static_end = tree.node(id).end;
            if mark.offset < static_end {
                return Err(ConvertError::internal(format!(
                    "end mark of node {:?} regressed to {} before its range end {}",
                    tree.node(id).shape,
                    mark.offset,
                    static_end
                )));
            }
            current = tree.parent(id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::SourceBuffer;
    use crate::tree::{NodeShape, TreeBuilder};

    fn call_in_program() -> (SyntaxTree, NodeId, NodeId) {
        // "f 1, 2" with the call spanning the whole program.
        let mut builder = TreeBuilder::new();
        let callee = builder.leaf(NodeShape::Identifier, 0, 1);
        let one = builder.leaf(NodeShape::NumberLiteral, 2, 3);
        let two = builder.leaf(NodeShape::NumberLiteral, 5, 6);
        let call = builder.node(NodeShape::Call, 0, 6, vec![callee, one, two]);
        let root = builder.node(NodeShape::Program, 0, 6, vec![call]);
        let tree = builder.build(root, 6).expect("valid tree");
        (tree, call, root)
    }

    #[test]
    fn test_appends_land_in_call_order() {
        let (tree, call, _root) = call_in_program();
        let buffer = SourceBuffer::new("f 1, 2");
        let mut editor = Editor::new();
        let mut tracker = NodeEndTracker::new(&tree);

        tracker
            .append_to_node(&tree, &mut editor, call, ",")
            .expect("append");
        tracker
            .append_to_node(&tree, &mut editor, call, ")")
            .expect("append");

        let resolved = editor.resolve(&buffer).expect("resolve");
        assert_eq!(resolved.code, "f 1, 2,)");
    }

    #[test]
    fn test_descendant_append_advances_ancestor_marks() {
        let (tree, call, root) = call_in_program();
        let mut editor = Editor::new();
        let mut tracker = NodeEndTracker::new(&tree);

        let before = tracker.mark(root);
        tracker
            .append_to_node(&tree, &mut editor, call, ")")
            .expect("append");
        let after = tracker.mark(root);

        assert!(after > before);
        assert_eq!(after, EndMark { offset: 6, appended: 1 });
        // The ancestor's own append now lands after the descendant's.
        tracker
            .append_to_node(&tree, &mut editor, root, ";")
            .expect("append");
        let resolved = editor
            .resolve(&SourceBuffer::new("f 1, 2"))
            .expect("resolve");
        assert_eq!(resolved.code, "f 1, 2);");
    }

    #[test]
    fn test_marks_never_precede_static_range_end() {
        let (tree, call, root) = call_in_program();
        let mut editor = Editor::new();
        let mut tracker = NodeEndTracker::new(&tree);

        for content in ["a", "bb", "ccc"] {
            tracker
                .append_to_node(&tree, &mut editor, call, content)
                .expect("append");
            assert!(tracker.mark(call).offset >= tree.node(call).end);
            assert!(tracker.mark(root) >= tracker.mark(call));
        }
    }

    #[test]
    fn test_ancestor_mark_is_monotonic_across_appends() {
        let (tree, call, root) = call_in_program();
        let mut editor = Editor::new();
        let mut tracker = NodeEndTracker::new(&tree);

        let mut previous = tracker.mark(root);
        for _ in 0..4 {
            tracker
                .append_to_node(&tree, &mut editor, call, "x")
                .expect("append");
            let current = tracker.mark(root);
            assert!(current >= previous);
            previous = current;
        }
    }
}
