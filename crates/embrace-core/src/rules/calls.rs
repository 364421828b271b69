// Implicit-call parenthesization: the classic enter/exit pair. The
// opening paren replaces the gap after the callee on enter; the closing
// paren goes through the end tracker on exit so it lands after every
// rewrite inside the argument list.

use crate::dispatch::PatchContext;
use crate::errors::ConvertError;
use crate::tree::NodeId;

/// The gap to turn into `(`, when the call has arguments but no explicit
/// parentheses. Recomputed on exit; the answer is deterministic.
fn implicit_paren_gap(ctx: &PatchContext<'_>, id: NodeId) -> Option<(usize, usize)> {
    let children = ctx.tree.children(id);
    if children.len() < 2 {
        return None;
    }
    let gap_start = ctx.node(children[0]).end;
    let gap_end = ctx.node(children[1]).start;
    if ctx.buffer.slice(gap_start, gap_end).contains('(') {
        return None;
    }
    Some((gap_start, gap_end))
}

pub fn open_implicit_parens(ctx: &mut PatchContext<'_>, id: NodeId) -> Result<(), ConvertError> {
    if let Some((gap_start, gap_end)) = implicit_paren_gap(ctx, id) {
        ctx.editor.replace(gap_start, gap_end, "(");
    }
    Ok(())
}

pub fn close_implicit_parens(ctx: &mut PatchContext<'_>, id: NodeId) -> Result<(), ConvertError> {
    if implicit_paren_gap(ctx, id).is_some() {
        ctx.append_to_node(id, ")")?;
        ctx.suggestions.push(
            "CV101",
            "implicit call parentheses were added; check that argument boundaries match the original intent",
        );
    }
    Ok(())
}
