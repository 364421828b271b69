//! Stage composition: the ordered pipeline that threads source text and
//! position maps through preprocessing, the main rewrite, and any
//! downstream polishing stages.

use tracing::{debug, info_span};

use crate::buffer::SourceBuffer;
use crate::dispatch::{self, PatchContext, RuleSet};
use crate::errors::ConvertError;
use crate::frontend::FrontEnd;
use crate::marks::NodeEndTracker;
use crate::patch::Editor;
use crate::rules::DefaultRules;
use crate::scope::ScopeModel;
use crate::sourcemap::PositionMap;
use crate::suggestions::{Suggestion, SuggestionCollector};

/// Input to one stage: the code as produced by the previous stage, plus
/// the file identity for notation detection and map naming.
pub struct StageInput<'a> {
    pub code: &'a str,
    pub filename: Option<&'a str>,
}

/// Output of one stage: rewritten code, the map from that code back to
/// this stage's input, and any advisories emitted along the way.
pub struct StageOutput {
    pub code: String,
    pub map: PositionMap,
    pub suggestions: Vec<Suggestion>,
}

/// One named, pure step of the conversion pipeline. Stateless across
/// invocations: the pipeline may be reused for many files.
pub trait Stage {
    fn name(&self) -> &'static str;
    fn run(&self, input: StageInput<'_>) -> Result<StageOutput, ConvertError>;
}

/// Final result of a pipeline run.
#[derive(Debug)]
pub struct Conversion {
    pub code: String,
    /// Maps output positions all the way back to the original input.
    pub map: PositionMap,
    /// Deduplicated, sorted by code.
    pub suggestions: Vec<Suggestion>,
}

/// An ordered list of stages composed by one driver.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, stage: impl Stage + 'static) {
        self.stages.push(Box::new(stage));
    }

    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.push(stage);
        self
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage in order, composing maps so the final map traces
    /// back to the original input, and aggregating suggestions with
    /// first-occurrence-per-code dedup across stages.
    pub fn convert(&self, code: &str, filename: Option<&str>) -> Result<Conversion, ConvertError> {
        let mut current = code.to_string();
        let mut map = PositionMap::identity(code.len());
        let mut collector = SuggestionCollector::new();

        for stage in &self.stages {
            let span = info_span!("stage", name = stage.name());
            let _entered = span.enter();
            let output = stage.run(StageInput {
                code: &current,
                filename,
            })?;
            debug!(
                in_len = current.len(),
                out_len = output.code.len(),
                "stage finished"
            );
            map = map.compose(&output.map);
            collector.extend(output.suggestions);
            current = output.code;
        }

        Ok(Conversion {
            code: current,
            map,
            suggestions: collector.into_sorted(),
        })
    }
}

/// The main rewrite stage: parse through the front-end collaborator,
/// build the scope model, run the dispatch traversal, resolve patches.
pub struct RewriteStage {
    front_end: Box<dyn FrontEnd>,
    rules: Box<dyn RuleSet>,
}

impl RewriteStage {
    pub fn new(front_end: Box<dyn FrontEnd>) -> Self {
        Self {
            front_end,
            rules: Box::new(DefaultRules),
        }
    }

    pub fn with_rules(front_end: Box<dyn FrontEnd>, rules: Box<dyn RuleSet>) -> Self {
        Self { front_end, rules }
    }
}

impl Stage for RewriteStage {
    fn name(&self) -> &'static str {
        "rewrite"
    }

    fn run(&self, input: StageInput<'_>) -> Result<StageOutput, ConvertError> {
        let buffer = SourceBuffer::new(input.code);
        let tree = self.front_end.parse(input.code)?;
        debug!(
            front_end = self.front_end.name(),
            nodes = tree.len(),
            "parsed"
        );

        let mut scopes = ScopeModel::build(&buffer, &tree)?;
        let mut editor = Editor::new();
        let mut marks = NodeEndTracker::new(&tree);
        let mut suggestions = SuggestionCollector::new();

        let mut ctx = PatchContext {
            buffer: &buffer,
            tree: &tree,
            editor: &mut editor,
            marks: &mut marks,
            scopes: &mut scopes,
            suggestions: &mut suggestions,
        };
        dispatch::run(self.rules.as_ref(), &mut ctx, tree.root())?;

        let resolved = editor.resolve(&buffer)?;
        Ok(StageOutput {
            code: resolved.code,
            map: resolved.map,
            suggestions: suggestions.into_sorted(),
        })
    }
}
