//! The literate-notation stage: reclassifies indented vs unindented line
//! runs of the documentation-interleaved variant as code or prose.
//!
//! A code run begins at an indented line preceded by a blank line (or the
//! start of the file) and ends at the first unindented, non-blank line.
//! Prose lines are turned into comment lines in place, so every line
//! keeps its number and code bytes keep their offsets within the line.

use crate::sourcemap::{PositionMap, Segment};
use crate::stage::{Stage, StageInput, StageOutput};
use crate::errors::ConvertError;

const COMMENT_PREFIX: &str = "# ";

pub struct LiterateStage;

impl Stage for LiterateStage {
    fn name(&self) -> &'static str {
        "literate"
    }

    fn run(&self, input: StageInput<'_>) -> Result<StageOutput, ConvertError> {
        let (code, map) = reformat(input.code);
        Ok(StageOutput {
            code,
            map,
            suggestions: Vec::new(),
        })
    }
}

fn reformat(source: &str) -> (String, PositionMap) {
    let mut out = String::with_capacity(source.len());
    let mut segments: Vec<Segment> = Vec::new();
    let mut offset = 0usize;
    let mut in_code = false;
    let mut prev_blank = true;

    for line in source.split_inclusive('\n') {
        let content = line.trim_end_matches(['\n', '\r']);
        let blank = content.trim().is_empty();
        let indented = content.starts_with(' ') || content.starts_with('\t');

        if !in_code {
            if indented && !blank && prev_blank {
                in_code = true;
            }
        } else if !indented && !blank {
            in_code = false;
        }

        if in_code || blank {
            segments.push(Segment {
                out_start: out.len(),
                src_start: offset,
                len: line.len(),
                synthetic: false,
            });
            out.push_str(line);
        } else {
            segments.push(Segment {
                out_start: out.len(),
                src_start: offset,
                len: COMMENT_PREFIX.len(),
                synthetic: true,
            });
            out.push_str(COMMENT_PREFIX);
            segments.push(Segment {
                out_start: out.len(),
                src_start: offset,
                len: line.len(),
                synthetic: false,
            });
            out.push_str(line);
        }

        prev_blank = blank;
        offset += line.len();
    }

    (out, PositionMap::from_segments(segments))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prose_becomes_comments_code_passes_through() {
        let source = "Adds two numbers.\n\n  sum = (a, b) -> a + b\n\nDone.\n";
        let (code, _map) = reformat(source);
        assert_eq!(
            code,
            "# Adds two numbers.\n\n  sum = (a, b) -> a + b\n\n# Done.\n"
        );
    }

    #[test]
    fn test_code_run_requires_preceding_blank_line() {
        // The indented continuation of a prose paragraph is still prose.
        let source = "A list:\n  not code, no blank line before\n";
        let (code, _map) = reformat(source);
        assert_eq!(
            code,
            "# A list:\n#   not code, no blank line before\n"
        );
    }

    #[test]
    fn test_code_run_ends_at_unindented_line() {
        let source = "\n  x = 1\n  y = 2\nprose again\n";
        let (code, _map) = reformat(source);
        assert_eq!(code, "\n  x = 1\n  y = 2\n# prose again\n");
    }

    #[test]
    fn test_blank_lines_inside_code_keep_the_run_alive() {
        let source = "\n  x = 1\n\n  y = 2\n";
        let (code, _map) = reformat(source);
        assert_eq!(code, "\n  x = 1\n\n  y = 2\n");
    }

    #[test]
    fn test_line_numbers_are_preserved() {
        let source = "prose\n\n  x = 1\nmore prose\n";
        let (code, map) = reformat(source);
        assert_eq!(code.lines().count(), source.lines().count());
        // The code byte `x` maps straight back to its original offset.
        let out_x = code.find("x = 1").expect("code kept");
        let src_x = source.find("x = 1").expect("source has it");
        assert_eq!(map.map_offset(out_x), Some(src_x));
    }

    #[test]
    fn test_file_starting_with_code() {
        let source = "  x = 1\nprose\n";
        let (code, _map) = reformat(source);
        assert_eq!(code, "  x = 1\n# prose\n");
    }
}
