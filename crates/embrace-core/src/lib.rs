//! # Embrace Core
//!
//! Engine of the `embrace` source-to-source converter, which rewrites an
//! indentation-delimited scripting language into an equivalent braced,
//! C-family form. Instead of pretty-printing a new program from the
//! syntax tree, the engine edits the original source buffer in place,
//! node by node, so untouched code is byte-identical to the input and
//! position maps stay trivially accurate. It provides:
//!
//! - A source-buffer editor that accumulates insert/replace/remove
//!   patches keyed by byte offsets and resolves them without corruption
//! - Node end tracking, so independent rules can append "after a node"
//!   and compose correctly
//! - Scope and binding resolution: declaring-occurrence selection and
//!   collision-free synthetic names
//! - A dispatch traversal invoking per-shape enter/exit rewrite rules
//! - A staged pipeline threading code and position maps end to end
//!
//! Parsing is an external collaborator: the engine consumes a pre-built
//! annotated tree (see [`frontend`]) and never tokenizes source itself.

#![warn(clippy::all)]

pub mod buffer;
pub mod dispatch;
pub mod errors;
pub mod frontend;
pub mod literate;
pub mod marks;
pub mod patch;
pub mod rules;
pub mod scope;
pub mod sourcemap;
pub mod stage;
pub mod suggestions;
pub mod tree;

// Re-export commonly used types
pub use buffer::{Position, SourceBuffer};
pub use dispatch::{PatchContext, RuleCallback, RulePair, RuleSet};
pub use errors::{ConflictingPatch, ConvertError};
pub use frontend::{FrontEnd, JsonFrontEnd};
pub use literate::LiterateStage;
pub use marks::{EndMark, NodeEndTracker};
pub use patch::{Editor, Patch, PatchKind, PatchOrigin, Resolved};
pub use rules::DefaultRules;
pub use scope::{Binding, BindingKind, DeclarationDecision, ScopeId, ScopeModel};
pub use sourcemap::{PositionMap, RenderedMap, Segment};
pub use stage::{Conversion, Pipeline, RewriteStage, Stage, StageInput, StageOutput};
pub use suggestions::{Suggestion, SuggestionCollector};
pub use tree::{Node, NodeId, NodeShape, RawNode, SyntaxTree, TreeBuilder};

/// Engine version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing for engine components
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("embrace_core=info".parse().unwrap()),
        )
        .init();
}

/// Options controlling one conversion run.
#[derive(Debug, Clone, Default)]
pub struct ConvertOptions {
    /// Treat the input as the documentation-interleaved notation and
    /// reformat it before the rewrite. Also inferred from a `.md`
    /// filename suffix.
    pub literate: bool,
}

/// Convert one source text through the standard pipeline: optional
/// literate preprocessing, then the dispatch-driven rewrite.
pub fn convert(
    code: &str,
    filename: Option<&str>,
    front_end: Box<dyn FrontEnd>,
    options: &ConvertOptions,
) -> Result<Conversion, ConvertError> {
    let literate =
        options.literate || filename.is_some_and(|name| name.ends_with(".md"));
    let mut pipeline = Pipeline::new();
    if literate {
        pipeline.push(LiterateStage);
    }
    pipeline.push(RewriteStage::new(front_end));
    pipeline.convert(code, filename)
}
