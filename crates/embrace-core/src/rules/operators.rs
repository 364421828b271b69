// Word-operator rewrites: boundary-token edits that never depend on
// child output, so each registers only an enter callback.

use crate::dispatch::PatchContext;
use crate::errors::ConvertError;
use crate::tree::{NodeId, NodeShape};

/// Rewrite `is`/`isnt`/`and`/`or`/`not` (and their loose symbolic forms)
/// to the strict C-family operators.
pub fn rewrite_word_operator(
    ctx: &mut PatchContext<'_>,
    id: NodeId,
) -> Result<(), ConvertError> {
    if ctx.node(id).shape == NodeShape::NotOp {
        rewrite_not(ctx, id)
    } else {
        rewrite_binary(ctx, id)
    }
}

fn rewrite_binary(ctx: &mut PatchContext<'_>, id: NodeId) -> Result<(), ConvertError> {
    let node = ctx.node(id);
    let children = ctx.tree.children(id);
    let (&left, &right) = match (children.first(), children.last()) {
        (Some(left), Some(right)) if children.len() == 2 => (left, right),
        _ => {
            return Err(ConvertError::malformed_tree(format!(
                "binary operator {:?} at [{}, {}) does not have two operands",
                node.shape, node.start, node.end
            )))
        }
    };

    let gap_start = ctx.node(left).end;
    let gap_end = ctx.node(right).start;
    let gap = ctx.buffer.slice(gap_start, gap_end);

    let (candidates, replacement): (&[&str], &str) = match node.shape {
        NodeShape::EqOp => (&["is", "=="], "==="),
        NodeShape::NeqOp => (&["isnt", "!="], "!=="),
        NodeShape::AndOp => (&["and"], "&&"),
        NodeShape::OrOp => (&["or"], "||"),
        _ => return Ok(()),
    };

    if find_token(gap, replacement).is_some() {
        // Already in target form.
        return Ok(());
    }
    for token in candidates {
        if let Some(pos) = find_token(gap, token) {
            ctx.editor
                .replace(gap_start + pos, gap_start + pos + token.len(), replacement);
            return Ok(());
        }
    }
    Err(ConvertError::malformed_tree(format!(
        "no operator token between operands at [{gap_start}, {gap_end})"
    )))
}

fn rewrite_not(ctx: &mut PatchContext<'_>, id: NodeId) -> Result<(), ConvertError> {
    let (start, end) = {
        let node = ctx.node(id);
        (node.start, node.end)
    };
    let operand = match ctx.tree.children(id).first() {
        Some(&operand) => operand,
        None => {
            return Err(ConvertError::malformed_tree(format!(
                "negation at [{start}, {end}) has no operand"
            )))
        }
    };
    let zone_end = ctx.node(operand).start;
    let zone = ctx.buffer.slice(start, zone_end);
    if zone.contains('!') {
        return Ok(());
    }
    match find_token(zone, "not") {
        Some(pos) => {
            // Swallow the trailing whitespace so `not x` becomes `!x`.
            ctx.editor.replace(start + pos, zone_end, "!");
            Ok(())
        }
        None => Err(ConvertError::malformed_tree(format!(
            "no negation token before operand at [{start}, {zone_end})"
        ))),
    }
}

/// Find `token` in `text` at a word boundary, so `is` never matches
/// inside `isnt`.
fn find_token(text: &str, token: &str) -> Option<usize> {
    let mut search_from = 0;
    while let Some(rel) = text[search_from..].find(token) {
        let pos = search_from + rel;
        let before_ok = pos == 0
            || !text[..pos]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric() || c == '_');
        let after = pos + token.len();
        let after_ok = after == text.len()
            || !text[after..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric() || c == '_');
        if before_ok && after_ok {
            return Some(pos);
        }
        search_from = pos + 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_token_respects_word_boundaries() {
        assert_eq!(find_token(" isnt ", "is"), None);
        assert_eq!(find_token(" is ", "is"), Some(1));
        assert_eq!(find_token(" isnt ", "isnt"), Some(1));
        assert_eq!(find_token("x", "is"), None);
    }

    #[test]
    fn test_find_token_symbolic() {
        assert_eq!(find_token(" == ", "=="), Some(1));
        assert_eq!(find_token(" != ", "!="), Some(1));
    }
}
