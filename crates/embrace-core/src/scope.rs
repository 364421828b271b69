//! Scope and binding resolution.
//!
//! Built in a single pre-pass over the tree before any patch is emitted.
//! For every assignment in the program the model decides whether it is
//! the canonical declaring occurrence (and with which placement), and it
//! allocates collision-free synthetic names for rewrite rules that need
//! to hold intermediate values.
//!
//! The source language is function-scoped, so scopes are hosted by the
//! program root and by function bodies; blocks never host declarations.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tracing::debug;

use crate::buffer::SourceBuffer;
use crate::errors::ConvertError;
use crate::tree::{NodeId, NodeShape, SyntaxTree};

/// Index of a scope within the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub u32);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// How a name is bound within its scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// Declared by an enclosing scope; assignments here are plain.
    AlreadyBound,
    /// The first statement-position assignment declares it inline.
    InlineDeclaration,
    /// Assigned only in expression position; a bare declaration goes at
    /// the top of the scope and the assignment stays keyword-free.
    HoistedDeclaration,
}

/// One name's binding record in a scope's table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// The declaring occurrence, when this scope owns the declaration.
    pub declaring_node: Option<NodeId>,
    pub kind: BindingKind,
}

/// What a rewrite rule should do with one specific assignment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationDecision {
    /// The declaring occurrence: prefix with the declaration keyword.
    DeclareInline,
    /// Plain assignment, no keyword.
    Plain,
    /// Target is not a simple name or supported shape; the rule decides
    /// whether to degrade or raise.
    Unsupported { target: NodeId },
}

#[derive(Debug)]
struct Scope {
    parent: Option<ScopeId>,
    /// The hosting node: the program root or a function.
    owner: NodeId,
    /// Where hoisted declarations are inserted: the program root itself
    /// or the function's body block.
    body: NodeId,
    params: HashSet<String>,
    bindings: IndexMap<String, Binding>,
    /// Every name visible as taken in this scope: parameters, local
    /// bindings, and temp names allocated here.
    used_names: HashSet<String>,
}

/// Per-scope binding tables plus the temp-name pool for one conversion.
///
/// Read-only during patch dispatch except for temp-name allocation, which
/// is the only mutation permitted mid-traversal.
#[derive(Debug, Default)]
pub struct ScopeModel {
    scopes: Vec<Scope>,
    scope_of: HashMap<NodeId, ScopeId>,
    body_scopes: HashMap<NodeId, ScopeId>,
    decisions: HashMap<NodeId, DeclarationDecision>,
    /// Every temp name handed out in this run, regardless of scope, so
    /// sibling scopes never receive the same name.
    allocated: HashSet<String>,
}

impl ScopeModel {
    /// An empty model; scopes can be pushed directly. Used by unit tests
    /// and by callers that resolve bindings without a full tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the model for a whole tree in one pre-pass.
    pub fn build(buffer: &SourceBuffer, tree: &SyntaxTree) -> Result<Self, ConvertError> {
        let mut model = Self::new();
        let root = tree.root();
        let root_scope = model.push_scope(None, root, root);
        model.visit(buffer, tree, root, root_scope)?;
        debug!(
            scopes = model.scopes.len(),
            assignments = model.decisions.len(),
            "scope model built"
        );
        Ok(model)
    }

    /// Open a scope hosted by `owner`, with hoisted declarations placed
    /// at the start of `body`.
    pub fn push_scope(&mut self, parent: Option<ScopeId>, owner: NodeId, body: NodeId) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope {
            parent,
            owner,
            body,
            params: HashSet::new(),
            bindings: IndexMap::new(),
            used_names: HashSet::new(),
        });
        self.body_scopes.insert(body, id);
        id
    }

    /// Record a name as declared in `scope`. Exposed so tests and manual
    /// callers can construct a chain without running a pre-pass.
    pub fn declare(&mut self, scope: ScopeId, name: &str) {
        self.scopes[scope.index()].bindings.insert(
            name.to_string(),
            Binding {
                declaring_node: None,
                kind: BindingKind::InlineDeclaration,
            },
        );
        self.scopes[scope.index()]
            .used_names
            .insert(name.to_string());
    }

    fn visit(
        &mut self,
        buffer: &SourceBuffer,
        tree: &SyntaxTree,
        node_id: NodeId,
        scope: ScopeId,
    ) -> Result<(), ConvertError> {
        self.scope_of.insert(node_id, scope);
        let node = tree.node(node_id);
        match node.shape {
            NodeShape::Function => {
                let body = *node.children.last().ok_or_else(|| {
                    ConvertError::malformed_tree(format!(
                        "function at [{}, {}) has no body",
                        node.start, node.end
                    ))
                })?;
                let inner = self.push_scope(Some(scope), node_id, body);
                for &child in &node.children {
                    if child != body && tree.node(child).shape == NodeShape::Identifier {
                        let name = buffer.slice(tree.node(child).start, tree.node(child).end);
                        self.scopes[inner.index()].params.insert(name.to_string());
                        self.scopes[inner.index()]
                            .used_names
                            .insert(name.to_string());
                    }
                }
                for &child in &node.children {
                    self.visit(buffer, tree, child, inner)?;
                }
            }
            NodeShape::Assign => {
                self.classify_assignment(buffer, tree, node_id, scope)?;
                for &child in &node.children {
                    self.visit(buffer, tree, child, scope)?;
                }
            }
            _ => {
                for &child in &node.children {
                    self.visit(buffer, tree, child, scope)?;
                }
            }
        }
        Ok(())
    }

    fn classify_assignment(
        &mut self,
        buffer: &SourceBuffer,
        tree: &SyntaxTree,
        assign: NodeId,
        scope: ScopeId,
    ) -> Result<(), ConvertError> {
        let node = tree.node(assign);
        let target_id = *node.children.first().ok_or_else(|| {
            ConvertError::malformed_tree(format!(
                "assignment at [{}, {}) has no target",
                node.start, node.end
            ))
        })?;
        let target = tree.node(target_id);
        let decision = match target.shape {
            NodeShape::Identifier => {
                let name = buffer.slice(target.start, target.end).to_string();
                if self.is_name_bound(scope, &name) {
                    // An enclosing binding (or an earlier one here)
                    // reaches this point: plain assignment.
                    let local = self.scopes[scope.index()].bindings.contains_key(&name)
                        || self.scopes[scope.index()].params.contains(&name);
                    if !local {
                        self.scopes[scope.index()].bindings.insert(
                            name,
                            Binding {
                                declaring_node: None,
                                kind: BindingKind::AlreadyBound,
                            },
                        );
                    }
                    DeclarationDecision::Plain
                } else {
                    // First assignment to an unbound name: the declaring
                    // occurrence. Statement position gets the keyword
                    // inline; expression position is hoisted.
                    let statement_position = node
                        .parent
                        .map(|p| {
                            matches!(tree.node(p).shape, NodeShape::Program | NodeShape::Block)
                        })
                        .unwrap_or(true);
                    let kind = if statement_position {
                        BindingKind::InlineDeclaration
                    } else {
                        BindingKind::HoistedDeclaration
                    };
                    self.scopes[scope.index()].bindings.insert(
                        name.clone(),
                        Binding {
                            declaring_node: Some(assign),
                            kind,
                        },
                    );
                    self.scopes[scope.index()].used_names.insert(name);
                    if statement_position {
                        DeclarationDecision::DeclareInline
                    } else {
                        DeclarationDecision::Plain
                    }
                }
            }
            // Property and element writes never declare anything.
            NodeShape::Member | NodeShape::Index => DeclarationDecision::Plain,
            _ => DeclarationDecision::Unsupported { target: target_id },
        };
        self.decisions.insert(assign, decision);
        Ok(())
    }

    fn is_name_bound(&self, scope: ScopeId, name: &str) -> bool {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = &self.scopes[id.index()];
            if s.params.contains(name) {
                return true;
            }
            if s.bindings.contains_key(name) {
                return true;
            }
            current = s.parent;
        }
        false
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope.index()].parent
    }

    pub fn owner(&self, scope: ScopeId) -> NodeId {
        self.scopes[scope.index()].owner
    }

    /// The scope a node belongs to, once the pre-pass has run.
    pub fn scope_of_node(&self, node: NodeId) -> Option<ScopeId> {
        self.scope_of.get(&node).copied()
    }

    /// The scope whose hoisted declarations go at the start of `body`,
    /// if `body` hosts one.
    pub fn scope_with_body(&self, body: NodeId) -> Option<ScopeId> {
        self.body_scopes.get(&body).copied()
    }

    /// Whether this assignment is the canonical declaring occurrence that
    /// receives the declaration keyword inline.
    pub fn is_declaring_occurrence(&self, assign: NodeId) -> bool {
        matches!(
            self.decisions.get(&assign),
            Some(DeclarationDecision::DeclareInline)
        )
    }

    pub fn declaration_decision(&self, assign: NodeId) -> Option<DeclarationDecision> {
        self.decisions.get(&assign).copied()
    }

    pub fn binding(&self, scope: ScopeId, name: &str) -> Option<&Binding> {
        self.scopes[scope.index()].bindings.get(name)
    }

    /// Names needing a bare declaration at the top of `scope`, in first-
    /// assignment order.
    pub fn hoisted_names(&self, scope: ScopeId) -> Vec<&str> {
        self.scopes[scope.index()]
            .bindings
            .iter()
            .filter(|(_, b)| b.kind == BindingKind::HoistedDeclaration)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    /// Allocate a collision-free synthetic name near `base`.
    ///
    /// The base is returned as-is when unused in the visible scope chain
    /// and not yet allocated this run; otherwise the smallest
    /// `base1, base2, ...` that collides with nothing. The result is
    /// recorded immediately, so later requests in this or any descendant
    /// scope see it as taken.
    pub fn allocate_temp_name(&mut self, scope: ScopeId, base: &str) -> String {
        let mut candidate = base.to_string();
        let mut suffix = 0usize;
        while self.temp_name_taken(scope, &candidate) {
            suffix += 1;
            candidate = format!("{base}{suffix}");
        }
        self.allocated.insert(candidate.clone());
        self.scopes[scope.index()]
            .used_names
            .insert(candidate.clone());
        candidate
    }

    fn temp_name_taken(&self, scope: ScopeId, name: &str) -> bool {
        if self.allocated.contains(name) {
            return true;
        }
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = &self.scopes[id.index()];
            if s.used_names.contains(name) || s.bindings.contains_key(name) {
                return true;
            }
            current = s.parent;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::TreeBuilder;

    /// Build `x = 1` then a function body reassigning `x = 2`:
    ///
    /// ```text
    /// x = 1
    /// f = -> x = 2
    /// ```
    fn outer_and_nested_assign() -> (SourceBuffer, SyntaxTree, NodeId, NodeId) {
        let source = "x = 1\nf = -> x = 2";
        let buffer = SourceBuffer::new(source);
        let mut builder = TreeBuilder::new();

        let x1 = builder.leaf(NodeShape::Identifier, 0, 1);
        let one = builder.leaf(NodeShape::NumberLiteral, 4, 5);
        let outer_assign = builder.node(NodeShape::Assign, 0, 5, vec![x1, one]);

        let f = builder.leaf(NodeShape::Identifier, 6, 7);
        let x2 = builder.leaf(NodeShape::Identifier, 13, 14);
        let two = builder.leaf(NodeShape::NumberLiteral, 17, 18);
        let inner_assign = builder.node(NodeShape::Assign, 13, 18, vec![x2, two]);
        let body = builder.node(NodeShape::Block, 13, 18, vec![inner_assign]);
        let func = builder.node(NodeShape::Function, 10, 18, vec![body]);
        let f_assign = builder.node(NodeShape::Assign, 6, 18, vec![f, func]);

        let root = builder.node(
            NodeShape::Program,
            0,
            source.len(),
            vec![outer_assign, f_assign],
        );
        let tree = builder.build(root, source.len()).expect("valid tree");
        (buffer, tree, outer_assign, inner_assign)
    }

    #[test]
    fn test_outer_assignment_declares_nested_is_plain() {
        let (buffer, tree, outer, inner) = outer_and_nested_assign();
        let model = ScopeModel::build(&buffer, &tree).expect("build");

        assert!(model.is_declaring_occurrence(outer));
        assert!(!model.is_declaring_occurrence(inner));
        assert_eq!(
            model.declaration_decision(inner),
            Some(DeclarationDecision::Plain)
        );
    }

    #[test]
    fn test_nested_scope_pool_excludes_enclosing_bindings() {
        let (buffer, tree, _outer, inner) = outer_and_nested_assign();
        let mut model = ScopeModel::build(&buffer, &tree).expect("build");

        let nested = model.scope_of_node(inner).expect("nested scope");
        assert_ne!(model.parent(nested), None);
        assert_eq!(model.allocate_temp_name(nested, "x"), "x1");
    }

    #[test]
    fn test_each_scope_name_pair_has_one_declaring_occurrence() {
        // x = 1; x = 2; x = 3 at top level.
        let source = "x = 1\nx = 2\nx = 3";
        let buffer = SourceBuffer::new(source);
        let mut builder = TreeBuilder::new();
        let mut assigns = Vec::new();
        for line in 0..3 {
            let base = line * 6;
            let target = builder.leaf(NodeShape::Identifier, base, base + 1);
            let value = builder.leaf(NodeShape::NumberLiteral, base + 4, base + 5);
            assigns.push(builder.node(NodeShape::Assign, base, base + 5, vec![target, value]));
        }
        let root = builder.node(NodeShape::Program, 0, source.len(), assigns.clone());
        let tree = builder.build(root, source.len()).expect("valid tree");

        let model = ScopeModel::build(&buffer, &tree).expect("build");
        let declaring: Vec<_> = assigns
            .iter()
            .filter(|&&a| model.is_declaring_occurrence(a))
            .collect();
        assert_eq!(declaring.len(), 1);
        assert_eq!(*declaring[0], assigns[0]);
    }

    #[test]
    fn test_expression_position_assignment_is_hoisted() {
        // f(x = 3): the assignment sits inside a call, not a block.
        let source = "f (x = 3)";
        let buffer = SourceBuffer::new(source);
        let mut builder = TreeBuilder::new();
        let callee = builder.leaf(NodeShape::Identifier, 0, 1);
        let x = builder.leaf(NodeShape::Identifier, 3, 4);
        let three = builder.leaf(NodeShape::NumberLiteral, 7, 8);
        let assign = builder.node(NodeShape::Assign, 3, 8, vec![x, three]);
        let call = builder.node(NodeShape::Call, 0, 9, vec![callee, assign]);
        let root = builder.node(NodeShape::Program, 0, source.len(), vec![call]);
        let tree = builder.build(root, source.len()).expect("valid tree");

        let model = ScopeModel::build(&buffer, &tree).expect("build");
        assert!(!model.is_declaring_occurrence(assign));
        assert_eq!(
            model.declaration_decision(assign),
            Some(DeclarationDecision::Plain)
        );
        let root_scope = model.scope_of_node(root).expect("root scope");
        assert_eq!(model.hoisted_names(root_scope), vec!["x"]);
    }

    #[test]
    fn test_parameter_assignment_is_plain() {
        // (a) -> a = 1
        let source = "(a) -> a = 1";
        let buffer = SourceBuffer::new(source);
        let mut builder = TreeBuilder::new();
        let param = builder.leaf(NodeShape::Identifier, 1, 2);
        let a = builder.leaf(NodeShape::Identifier, 7, 8);
        let one = builder.leaf(NodeShape::NumberLiteral, 11, 12);
        let assign = builder.node(NodeShape::Assign, 7, 12, vec![a, one]);
        let body = builder.node(NodeShape::Block, 7, 12, vec![assign]);
        let func = builder.node(NodeShape::Function, 0, 12, vec![param, body]);
        let root = builder.node(NodeShape::Program, 0, source.len(), vec![func]);
        let tree = builder.build(root, source.len()).expect("valid tree");

        let model = ScopeModel::build(&buffer, &tree).expect("build");
        assert!(!model.is_declaring_occurrence(assign));
        assert_eq!(
            model.declaration_decision(assign),
            Some(DeclarationDecision::Plain)
        );
    }

    #[test]
    fn test_property_write_never_declares() {
        // o.x = 1
        let source = "o.x = 1";
        let buffer = SourceBuffer::new(source);
        let mut builder = TreeBuilder::new();
        let o = builder.leaf(NodeShape::Identifier, 0, 1);
        let member = builder.node(NodeShape::Member, 0, 3, vec![o]);
        let one = builder.leaf(NodeShape::NumberLiteral, 6, 7);
        let assign = builder.node(NodeShape::Assign, 0, 7, vec![member, one]);
        let root = builder.node(NodeShape::Program, 0, source.len(), vec![assign]);
        let tree = builder.build(root, source.len()).expect("valid tree");

        let model = ScopeModel::build(&buffer, &tree).expect("build");
        assert_eq!(
            model.declaration_decision(assign),
            Some(DeclarationDecision::Plain)
        );
    }

    #[test]
    fn test_unsupported_target_is_reported_not_guessed() {
        // "s" = 1
        let source = "\"s\" = 1";
        let buffer = SourceBuffer::new(source);
        let mut builder = TreeBuilder::new();
        let target = builder.leaf(NodeShape::StringLiteral, 0, 3);
        let one = builder.leaf(NodeShape::NumberLiteral, 6, 7);
        let assign = builder.node(NodeShape::Assign, 0, 7, vec![target, one]);
        let root = builder.node(NodeShape::Program, 0, source.len(), vec![assign]);
        let tree = builder.build(root, source.len()).expect("valid tree");

        let model = ScopeModel::build(&buffer, &tree).expect("build");
        assert!(matches!(
            model.declaration_decision(assign),
            Some(DeclarationDecision::Unsupported { .. })
        ));
    }

    #[test]
    fn test_temp_names_in_sibling_scopes_never_collide() {
        // A chain built directly, without a tree.
        let mut model = ScopeModel::new();
        let top = model.push_scope(None, NodeId(0), NodeId(0));
        model.declare(top, "left");
        let sibling_a = model.push_scope(Some(top), NodeId(1), NodeId(1));
        let sibling_b = model.push_scope(Some(top), NodeId(2), NodeId(2));

        assert_eq!(model.allocate_temp_name(sibling_a, "left"), "left1");
        assert_eq!(model.allocate_temp_name(sibling_b, "left"), "left2");
    }

    #[test]
    fn test_temp_name_avoids_whole_ancestor_chain() {
        let mut model = ScopeModel::new();
        let top = model.push_scope(None, NodeId(0), NodeId(0));
        model.declare(top, "x");
        let mid = model.push_scope(Some(top), NodeId(1), NodeId(1));
        model.declare(mid, "x1");
        let leaf = model.push_scope(Some(mid), NodeId(2), NodeId(2));
        model.declare(leaf, "x2");

        assert_eq!(model.allocate_temp_name(leaf, "x"), "x3");
        assert_eq!(model.allocate_temp_name(leaf, "x"), "x4");
    }

    #[test]
    fn test_unused_base_name_is_returned_as_is() {
        let mut model = ScopeModel::new();
        let top = model.push_scope(None, NodeId(0), NodeId(0));
        assert_eq!(model.allocate_temp_name(top, "ref"), "ref");
        assert_eq!(model.allocate_temp_name(top, "ref"), "ref1");
    }
}
