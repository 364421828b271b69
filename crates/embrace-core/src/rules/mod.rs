//! Built-in rewrite rules.
//!
//! Each language construct registers an enter/exit callback pair against
//! the dispatch engine; this module holds the representative built-in
//! set and the shape-to-pair table. Rules only ever talk to the engine
//! through [`PatchContext`](crate::dispatch::PatchContext): editor
//! patches, end-tracker appends, scope lookups, and suggestions.

pub mod blocks;
pub mod calls;
pub mod declarations;
pub mod operators;

use crate::dispatch::{RulePair, RuleSet};
use crate::tree::NodeShape;

/// The built-in rule table: one `match` over the shape tag, so adding a
/// shape without deciding its rules is a compile-time question, and
/// shapes without an entry fall through to a pass-through.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRules;

impl RuleSet for DefaultRules {
    fn rules_for(&self, shape: NodeShape) -> RulePair {
        match shape {
            NodeShape::EqOp
            | NodeShape::NeqOp
            | NodeShape::AndOp
            | NodeShape::OrOp
            | NodeShape::NotOp => RulePair::enter(operators::rewrite_word_operator),
            NodeShape::Assign => RulePair::enter(declarations::declare_assignment),
            NodeShape::Program | NodeShape::Block => {
                RulePair::enter(declarations::hoist_scope_declarations)
            }
            NodeShape::Call => {
                RulePair::both(calls::open_implicit_parens, calls::close_implicit_parens)
            }
            NodeShape::Function => RulePair::both(blocks::open_function, blocks::close_function),
            NodeShape::Conditional => {
                RulePair::both(blocks::open_conditional, blocks::close_conditional)
            }
            NodeShape::While => RulePair::both(blocks::open_while, blocks::close_while),
            _ => RulePair::default(),
        }
    }
}
