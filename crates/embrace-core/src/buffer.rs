// Source buffer: the immutable original text every patch offset refers to.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A zero-based line/column position in a text buffer.
///
/// Displayed one-based, the way editors number lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.column + 1)
    }
}

/// Immutable holder of the original source text.
///
/// Byte-offset addressable and never mutated after construction. The
/// line-start index makes offset to line/column lookup a binary search.
#[derive(Debug, Clone)]
pub struct SourceBuffer {
    text: String,
    line_starts: Vec<usize>,
}

impl SourceBuffer {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0];
        for (offset, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset + 1);
            }
        }
        Self { text, line_starts }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// The original text in `[start, end)`.
    ///
    /// Offsets outside the buffer are clamped rather than panicking so
    /// diagnostic paths can render whatever is available.
    pub fn slice(&self, start: usize, end: usize) -> &str {
        let end = end.min(self.text.len());
        let start = start.min(end);
        &self.text[start..end]
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Zero-based line and column for a byte offset.
    pub fn position_at(&self, offset: usize) -> Position {
        let offset = offset.min(self.text.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(insertion) => insertion - 1,
        };
        Position {
            line: line as u32,
            column: (offset - self.line_starts[line]) as u32,
        }
    }

    /// The text of the given zero-based line, without its newline.
    pub fn line_text(&self, line: usize) -> &str {
        let start = match self.line_starts.get(line) {
            Some(&start) => start,
            None => return "",
        };
        let end = self
            .line_starts
            .get(line + 1)
            .map(|&next| next - 1)
            .unwrap_or(self.text.len());
        &self.text[start..end]
    }

    /// Leading whitespace of the line containing `offset`.
    pub fn line_indentation(&self, offset: usize) -> &str {
        let line = self.position_at(offset).line as usize;
        let text = self.line_text(line);
        let indent_len = text.len() - text.trim_start_matches([' ', '\t']).len();
        &text[..indent_len]
    }

    /// Render the source around `[start, end)` for diagnostic display:
    /// the first covered line with a marker underneath the range.
    pub fn excerpt(&self, start: usize, end: usize) -> String {
        let start_pos = self.position_at(start);
        let end_pos = self.position_at(end.max(start));
        let line = start_pos.line as usize;
        let text = self.line_text(line);

        let marker_start = start_pos.column as usize;
        let marker_end = if end_pos.line as usize == line {
            (end_pos.column as usize).max(marker_start + 1)
        } else {
            text.len().max(marker_start + 1)
        };

        let line_label = format!("{}", line + 1);
        let gutter = " ".repeat(line_label.len());
        let mut out = format!("{} | {}\n", line_label, text);
        out.push_str(&format!(
            "{} | {}{}",
            gutter,
            " ".repeat(marker_start),
            "^".repeat(marker_end - marker_start)
        ));
        if end_pos.line as usize != line {
            out.push_str(" ...");
        }
        out
    }
}
