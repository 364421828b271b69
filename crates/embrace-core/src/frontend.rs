// Front-end boundary: the engine consumes a pre-built syntax tree from an
// external parser and never tokenizes source itself.

use crate::errors::ConvertError;
use crate::tree::{RawNode, SyntaxTree};

/// Trait for parser collaborators.
///
/// Implementations hand the engine an annotated tree over the given
/// source; the engine only requires that the tree honor the structural
/// contract checked by [`SyntaxTree::from_raw`].
pub trait FrontEnd: Send + Sync {
    /// Parse source code into a syntax tree.
    fn parse(&self, source: &str) -> Result<SyntaxTree, ConvertError>;

    /// Front-end name for logging.
    fn name(&self) -> &'static str;
}

/// Front end backed by a tree the external parser already serialized.
///
/// This is the exchange format used out of process: the parser writes the
/// nested node JSON next to the source file and the engine picks it up.
#[derive(Debug)]
pub struct JsonFrontEnd {
    raw: RawNode,
}

impl JsonFrontEnd {
    pub fn from_json(json: &str) -> Result<Self, ConvertError> {
        let raw = serde_json::from_str(json)
            .map_err(|e| ConvertError::Parse(format!("invalid tree json: {e}")))?;
        Ok(Self { raw })
    }

    pub fn from_raw(raw: RawNode) -> Self {
        Self { raw }
    }
}

impl FrontEnd for JsonFrontEnd {
    fn parse(&self, source: &str) -> Result<SyntaxTree, ConvertError> {
        SyntaxTree::from_raw(&self.raw, source.len())
    }

    fn name(&self) -> &'static str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::NodeShape;

    #[test]
    fn test_json_front_end_parses_exchange_format() {
        let front_end = JsonFrontEnd::from_json(
            r#"{ "shape": "program", "start": 0, "end": 5, "children": [] }"#,
        )
        .expect("valid json");
        let tree = front_end.parse("a = 1").expect("valid tree");
        assert_eq!(tree.node(tree.root()).shape, NodeShape::Program);
    }

    #[test]
    fn test_json_front_end_rejects_garbage() {
        let err = JsonFrontEnd::from_json("not json").unwrap_err();
        assert!(matches!(err, ConvertError::Parse(_)));
    }

    #[test]
    fn test_json_front_end_revalidates_against_source() {
        let front_end = JsonFrontEnd::from_json(
            r#"{ "shape": "program", "start": 0, "end": 99, "children": [] }"#,
        )
        .expect("valid json");
        let err = front_end.parse("a = 1").unwrap_err();
        assert!(matches!(err, ConvertError::MalformedTree(_)));
    }
}
