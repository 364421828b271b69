// Declaration insertion, driven entirely by the scope model built in the
// pre-pass: exactly one assignment per (scope, name) receives a keyword.

use crate::dispatch::PatchContext;
use crate::errors::ConvertError;
use crate::scope::DeclarationDecision;
use crate::tree::NodeId;

/// Prefix the declaring occurrence of an assignment with the declaration
/// keyword; leave every other assignment untouched.
///
/// Unsupported targets are raised as user-facing errors here rather than
/// guessed at: this rule has no conservative rewrite to fall back to.
pub fn declare_assignment(ctx: &mut PatchContext<'_>, id: NodeId) -> Result<(), ConvertError> {
    match ctx.scopes.declaration_decision(id) {
        Some(DeclarationDecision::DeclareInline) => {
            let start = ctx.node(id).start;
            ctx.editor.insert(start, "let ");
            Ok(())
        }
        Some(DeclarationDecision::Plain) | None => Ok(()),
        Some(DeclarationDecision::Unsupported { target }) => {
            let target = ctx.node(target);
            Err(ConvertError::UnsupportedDeclarationTarget {
                start: target.start,
                end: target.end,
                found: format!("{:?}", target.shape),
            })
        }
    }
}

/// Insert the bare declarations for names assigned only in expression
/// position at the top of the scope body this node hosts, if any.
pub fn hoist_scope_declarations(
    ctx: &mut PatchContext<'_>,
    id: NodeId,
) -> Result<(), ConvertError> {
    let scope = match ctx.scopes.scope_with_body(id) {
        Some(scope) => scope,
        None => return Ok(()),
    };
    let names: Vec<String> = ctx
        .scopes
        .hoisted_names(scope)
        .into_iter()
        .map(str::to_string)
        .collect();
    if names.is_empty() {
        return Ok(());
    }

    let start = ctx.node(id).start;
    let indent = ctx.buffer.line_indentation(start).to_string();
    ctx.editor
        .insert(start, format!("let {};\n{indent}", names.join(", ")));
    ctx.suggestions.push(
        "CV102",
        "a variable assigned only inside an expression was given a hoisted declaration at the top of its scope",
    );
    Ok(())
}
