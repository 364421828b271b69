//! The traversal engine: one deterministic depth-first walk that invokes
//! the registered enter/exit callbacks for each node's shape against the
//! editor and scope model.
//!
//! Shapes with only boundary-token edits register an enter callback.
//! Shapes whose edit must wrap already-patched child content register
//! both: the enter opens the wrapper, the exit closes it through the
//! [`NodeEndTracker`] so the closing token lands after all descendant
//! edits.

use crate::buffer::SourceBuffer;
use crate::errors::ConvertError;
use crate::marks::NodeEndTracker;
use crate::patch::{Editor, PatchOrigin};
use crate::scope::ScopeModel;
use crate::suggestions::SuggestionCollector;
use crate::tree::{Node, NodeId, NodeShape, SyntaxTree};

/// Everything a rewrite rule may touch while visiting a node.
///
/// Side effects are limited to editor patches, temp-name allocation, and
/// suggestions; the buffer and tree are read-only.
pub struct PatchContext<'a> {
    pub buffer: &'a SourceBuffer,
    pub tree: &'a SyntaxTree,
    pub editor: &'a mut Editor,
    pub marks: &'a mut NodeEndTracker,
    pub scopes: &'a mut ScopeModel,
    pub suggestions: &'a mut SuggestionCollector,
}

impl PatchContext<'_> {
    pub fn node(&self, id: NodeId) -> &Node {
        self.tree.node(id)
    }

    /// Original text covered by a node.
    pub fn text_of(&self, id: NodeId) -> &str {
        let node = self.tree.node(id);
        self.buffer.slice(node.start, node.end)
    }

    /// Append after a node through the end tracker.
    pub fn append_to_node(&mut self, id: NodeId, content: &str) -> Result<(), ConvertError> {
        self.marks.append_to_node(self.tree, self.editor, id, content)
    }
}

/// Callback signature shared by enter and exit rules.
pub type RuleCallback = fn(&mut PatchContext<'_>, NodeId) -> Result<(), ConvertError>;

/// The enter/exit pair registered for one shape.
#[derive(Clone, Copy, Default)]
pub struct RulePair {
    pub on_enter: Option<RuleCallback>,
    pub on_exit: Option<RuleCallback>,
}

impl RulePair {
    pub fn enter(callback: RuleCallback) -> Self {
        Self {
            on_enter: Some(callback),
            on_exit: None,
        }
    }

    pub fn both(on_enter: RuleCallback, on_exit: RuleCallback) -> Self {
        Self {
            on_enter: Some(on_enter),
            on_exit: Some(on_exit),
        }
    }
}

/// The shape-to-callback-pair table. Shapes without callbacks fall
/// through to a pure pass-through.
pub trait RuleSet {
    fn rules_for(&self, shape: NodeShape) -> RulePair;
}

/// Run one depth-first traversal: enter, children in source order, exit.
pub fn run(
    rules: &dyn RuleSet,
    ctx: &mut PatchContext<'_>,
    root: NodeId,
) -> Result<(), ConvertError> {
    visit(rules, ctx, root)
}

fn visit(rules: &dyn RuleSet, ctx: &mut PatchContext<'_>, id: NodeId) -> Result<(), ConvertError> {
    let node = ctx.tree.node(id);
    let origin = PatchOrigin {
        shape: node.shape,
        start: node.start,
        end: node.end,
    };
    let pair = rules.rules_for(node.shape);

    ctx.editor.set_origin(Some(origin));
    if let Some(on_enter) = pair.on_enter {
        on_enter(ctx, id)?;
    }

    let child_count = ctx.tree.children(id).len();
    for index in 0..child_count {
        let child = ctx.tree.children(id)[index];
        visit(rules, ctx, child)?;
    }

    // Children moved the origin; restore it for the exit callback.
    ctx.editor.set_origin(Some(origin));
    if let Some(on_exit) = pair.on_exit {
        on_exit(ctx, id)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TreeBuilder;

    struct TracingRules;

    fn mark_enter(ctx: &mut PatchContext<'_>, id: NodeId) -> Result<(), ConvertError> {
        let start = ctx.node(id).start;
        ctx.editor.insert(start, "<");
        Ok(())
    }

    fn mark_exit(ctx: &mut PatchContext<'_>, id: NodeId) -> Result<(), ConvertError> {
        ctx.append_to_node(id, ">")
    }

    impl RuleSet for TracingRules {
        fn rules_for(&self, shape: NodeShape) -> RulePair {
            match shape {
                NodeShape::Call | NodeShape::Program => RulePair::both(mark_enter, mark_exit),
                // Everything else passes through.
                _ => RulePair::default(),
            }
        }
    }

    #[test]
    fn test_enter_children_exit_order_nests_wrappers() {
        // "f x": a call inside the program; both get wrapped, and the
        // program's closer must land outside the call's.
        let source = "f x";
        let buffer = SourceBuffer::new(source);
        let mut builder = TreeBuilder::new();
        let callee = builder.leaf(NodeShape::Identifier, 0, 1);
        let arg = builder.leaf(NodeShape::Identifier, 2, 3);
        let call = builder.node(NodeShape::Call, 0, 3, vec![callee, arg]);
        let root = builder.node(NodeShape::Program, 0, 3, vec![call]);
        let tree = builder.build(root, source.len()).expect("valid tree");

        let mut editor = Editor::new();
        let mut marks = NodeEndTracker::new(&tree);
        let mut scopes = ScopeModel::new();
        let mut suggestions = SuggestionCollector::new();
        let mut ctx = PatchContext {
            buffer: &buffer,
            tree: &tree,
            editor: &mut editor,
            marks: &mut marks,
            scopes: &mut scopes,
            suggestions: &mut suggestions,
        };
        run(&TracingRules, &mut ctx, root).expect("dispatch");

        let resolved = editor.resolve(&buffer).expect("resolve");
        assert_eq!(resolved.code, "<<f x>>");
    }

    #[test]
    fn test_unknown_shapes_pass_through() {
        let source = "1 + x";
        let buffer = SourceBuffer::new(source);
        let mut builder = TreeBuilder::new();
        let lit = builder.leaf(NodeShape::NumberLiteral, 0, 1);
        let ident = builder.leaf(NodeShape::Identifier, 4, 5);
        let root = builder.node(NodeShape::Block, 0, 5, vec![lit, ident]);
        let tree = builder.build(root, source.len()).expect("valid tree");

        let mut editor = Editor::new();
        let mut marks = NodeEndTracker::new(&tree);
        let mut scopes = ScopeModel::new();
        let mut suggestions = SuggestionCollector::new();
        let mut ctx = PatchContext {
            buffer: &buffer,
            tree: &tree,
            editor: &mut editor,
            marks: &mut marks,
            scopes: &mut scopes,
            suggestions: &mut suggestions,
        };
        run(&TracingRules, &mut ctx, root).expect("dispatch");

        let resolved = editor.resolve(&buffer).expect("resolve");
        assert_eq!(resolved.code, source);
    }
}
