// Brace insertion for function bodies, conditionals, and loops: the
// wrapping enter/exit pairs. Every closing token goes through the end
// tracker, which is what makes nested closers land inside outer ones.

use crate::dispatch::PatchContext;
use crate::errors::ConvertError;
use crate::tree::NodeId;

/// The closing text for an indented body: ` }` when the body sits on the
/// construct's own line, otherwise a newline plus the construct's
/// indentation and `}`.
fn body_closer(ctx: &PatchContext<'_>, construct_start: usize, body: NodeId) -> String {
    let body_start = ctx.node(body).start;
    let same_line = ctx.buffer.position_at(construct_start).line
        == ctx.buffer.position_at(body_start).line;
    if same_line {
        " }".to_string()
    } else {
        format!("\n{}}}", ctx.buffer.line_indentation(construct_start))
    }
}

fn arrow_zone(ctx: &PatchContext<'_>, id: NodeId, body: NodeId) -> (usize, usize) {
    let children = ctx.tree.children(id);
    let zone_start = if children.len() >= 2 {
        ctx.node(children[children.len() - 2]).end
    } else {
        ctx.node(id).start
    };
    (zone_start, ctx.node(body).start)
}

fn function_body(ctx: &PatchContext<'_>, id: NodeId) -> Result<NodeId, ConvertError> {
    ctx.tree.children(id).last().copied().ok_or_else(|| {
        let node = ctx.node(id);
        ConvertError::malformed_tree(format!(
            "function at [{}, {}) has no body",
            node.start, node.end
        ))
    })
}

fn body_is_inline(ctx: &PatchContext<'_>, id: NodeId, body: NodeId) -> bool {
    ctx.buffer.position_at(ctx.node(id).start).line
        == ctx.buffer.position_at(ctx.node(body).start).line
}

/// Swap the arrow and, for an indented body, open the brace with it.
/// An inline body stays an expression arrow and needs no braces.
pub fn open_function(ctx: &mut PatchContext<'_>, id: NodeId) -> Result<(), ConvertError> {
    let body = function_body(ctx, id)?;
    let (zone_start, zone_end) = arrow_zone(ctx, id, body);
    let zone = ctx.buffer.slice(zone_start, zone_end);
    let arrow = match zone.find("->") {
        Some(pos) => zone_start + pos,
        None => {
            return Err(ConvertError::malformed_tree(format!(
                "no arrow between parameters and body at [{zone_start}, {zone_end})"
            )))
        }
    };
    if body_is_inline(ctx, id, body) {
        ctx.editor.replace(arrow, arrow + 2, "=>");
    } else {
        ctx.editor.replace(arrow, arrow + 2, "=> {");
    }
    Ok(())
}

pub fn close_function(ctx: &mut PatchContext<'_>, id: NodeId) -> Result<(), ConvertError> {
    let body = function_body(ctx, id)?;
    if !body_is_inline(ctx, id, body) {
        let closer = body_closer(ctx, ctx.node(id).start, body);
        ctx.append_to_node(body, &closer)?;
    }
    Ok(())
}

fn conditional_parts(
    ctx: &PatchContext<'_>,
    id: NodeId,
) -> Result<(NodeId, NodeId, Option<NodeId>), ConvertError> {
    let children = ctx.tree.children(id);
    match children {
        [cond, then] => Ok((*cond, *then, None)),
        [cond, then, alt] => Ok((*cond, *then, Some(*alt))),
        _ => {
            let node = ctx.node(id);
            Err(ConvertError::malformed_tree(format!(
                "conditional at [{}, {}) does not have a condition and one or two branches",
                node.start, node.end
            )))
        }
    }
}

pub fn open_conditional(ctx: &mut PatchContext<'_>, id: NodeId) -> Result<(), ConvertError> {
    let (cond, _, _) = conditional_parts(ctx, id)?;
    let start = ctx.node(cond).start;
    ctx.editor.insert(start, "(");
    Ok(())
}

pub fn close_conditional(ctx: &mut PatchContext<'_>, id: NodeId) -> Result<(), ConvertError> {
    let (cond, then, alt) = conditional_parts(ctx, id)?;
    let construct_start = ctx.node(id).start;
    ctx.append_to_node(cond, ") {")?;

    // A single-line `then` keyword has no braced equivalent; drop it.
    let cond_end = ctx.node(cond).end;
    let then_start = ctx.node(then).start;
    let gap = ctx.buffer.slice(cond_end, then_start);
    if let Some(pos) = gap.find("then") {
        ctx.editor.remove(cond_end + pos, cond_end + pos + 4);
    }

    match alt {
        None => {
            let closer = body_closer(ctx, construct_start, then);
            ctx.append_to_node(then, &closer)?;
        }
        Some(alt) => {
            let then_end = ctx.node(then).end;
            let alt_start = ctx.node(alt).start;
            let between = ctx.buffer.slice(then_end, alt_start);
            let else_pos = match between.find("else") {
                Some(pos) => then_end + pos,
                None => {
                    return Err(ConvertError::malformed_tree(format!(
                        "no else between branches at [{then_end}, {alt_start})"
                    )))
                }
            };
            let closer = body_closer(ctx, construct_start, then);
            ctx.editor.replace(then_end, else_pos, format!("{closer} "));
            ctx.editor.insert(else_pos + 4, " {");
            let alt_closer = body_closer(ctx, construct_start, alt);
            ctx.append_to_node(alt, &alt_closer)?;
        }
    }
    Ok(())
}

fn while_parts(ctx: &PatchContext<'_>, id: NodeId) -> Result<(NodeId, NodeId), ConvertError> {
    let children = ctx.tree.children(id);
    match children {
        [cond, body] => Ok((*cond, *body)),
        _ => {
            let node = ctx.node(id);
            Err(ConvertError::malformed_tree(format!(
                "loop at [{}, {}) does not have a condition and a body",
                node.start, node.end
            )))
        }
    }
}

pub fn open_while(ctx: &mut PatchContext<'_>, id: NodeId) -> Result<(), ConvertError> {
    let (cond, _) = while_parts(ctx, id)?;
    let start = ctx.node(cond).start;
    ctx.editor.insert(start, "(");
    Ok(())
}

pub fn close_while(ctx: &mut PatchContext<'_>, id: NodeId) -> Result<(), ConvertError> {
    let (cond, body) = while_parts(ctx, id)?;
    ctx.append_to_node(cond, ") {")?;
    let closer = body_closer(ctx, ctx.node(id).start, body);
    ctx.append_to_node(body, &closer)?;
    Ok(())
}
