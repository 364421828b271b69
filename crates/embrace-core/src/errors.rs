use std::fmt;

use thiserror::Error;

use crate::tree::NodeShape;

/// One side of a patch conflict, as shown in the conflict report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictingPatch {
    /// Shape of the node whose rule emitted the patch, when known.
    pub shape: Option<NodeShape>,
    /// Original-buffer range the patch targets.
    pub start: usize,
    pub end: usize,
    /// Short rendering of the operation, e.g. `replace with "==="`.
    pub operation: String,
}

impl fmt::Display for ConflictingPatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shape {
            Some(shape) => write!(
                f,
                "{} at [{}, {}) from {:?}",
                self.operation, self.start, self.end, shape
            ),
            None => write!(f, "{} at [{}, {})", self.operation, self.start, self.end),
        }
    }
}

/// Error type for all conversion failures.
///
/// Every variant aborts the current stage and the whole pipeline; there is
/// no partial-output mode.
#[derive(Error, Debug)]
pub enum ConvertError {
    /// Two replace/remove ranges overlap without an override relationship.
    #[error("patch conflict: {first} overlaps {second}\n{excerpt}")]
    PatchConflict {
        first: ConflictingPatch,
        second: ConflictingPatch,
        excerpt: String,
    },

    /// An assignment target the scope model cannot classify.
    #[error("unsupported declaration target at [{start}, {end}): {found}")]
    UnsupportedDeclarationTarget {
        start: usize,
        end: usize,
        found: String,
    },

    /// A construct combination a rewrite rule refuses to convert.
    #[error("cannot convert {construct}: {reason}")]
    UnsupportedConstruct { construct: String, reason: String },

    /// The front end handed us a tree that violates the exchange contract.
    #[error("malformed syntax tree: {0}")]
    MalformedTree(String),

    /// The front end could not parse the source at all.
    #[error("parse error: {0}")]
    Parse(String),

    /// A structural invariant of the engine was violated. Always a bug,
    /// surfaced with context instead of producing corrupted output.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl ConvertError {
    pub fn malformed_tree(message: impl Into<String>) -> Self {
        Self::MalformedTree(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    pub fn unsupported_construct(construct: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedConstruct {
            construct: construct.into(),
            reason: reason.into(),
        }
    }
}
