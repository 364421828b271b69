//! Patch recording and resolution.
//!
//! The [`Editor`] accumulates insert/replace/remove operations against the
//! original buffer during one traversal and resolves them exactly once
//! into output text plus a position map. Offsets always refer to the
//! original buffer, never to partially-patched output, so rules can be
//! written without knowing what other rules have already done.
//!
//! Overlap policy: two replace/remove ranges that overlap are a fatal
//! conflict, with one exception: a range that fully contains an
//! earlier-emitted range is treated as a deliberate override of that
//! sub-range (an exit callback re-rendering the subtree it just visited)
//! and the outer patch wins. Identical ranges, partial overlap, and
//! container-before-containee emission order all conflict.

use tracing::debug;

use crate::buffer::SourceBuffer;
use crate::errors::{ConflictingPatch, ConvertError};
use crate::sourcemap::{PositionMap, Segment};
use crate::tree::NodeShape;

/// The node whose rule produced a patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchOrigin {
    pub shape: NodeShape,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchKind {
    Insert,
    Replace,
    Remove,
}

/// One recorded edit against the original buffer.
#[derive(Debug, Clone)]
pub struct Patch {
    pub kind: PatchKind,
    pub start: usize,
    /// Equal to `start` for inserts.
    pub end: usize,
    /// Empty for removes.
    pub content: String,
    pub origin: Option<PatchOrigin>,
    /// Emission order across the whole traversal.
    pub seq: usize,
}

impl Patch {
    fn describe(&self) -> ConflictingPatch {
        let operation = match self.kind {
            PatchKind::Insert => format!("insert {}", preview(&self.content)),
            PatchKind::Replace => format!("replace with {}", preview(&self.content)),
            PatchKind::Remove => "remove".to_string(),
        };
        ConflictingPatch {
            shape: self.origin.map(|o| o.shape),
            start: self.start,
            end: self.end,
            operation,
        }
    }
}

fn preview(content: &str) -> String {
    const LIMIT: usize = 24;
    if content.chars().count() <= LIMIT {
        format!("{content:?}")
    } else {
        let head: String = content.chars().take(LIMIT).collect();
        format!("{head:?}..")
    }
}

/// Output of [`Editor::resolve`]: the final text and its position map.
#[derive(Debug)]
pub struct Resolved {
    pub code: String,
    pub map: PositionMap,
}

/// Accumulates patches during one traversal; consumed exactly once.
#[derive(Debug, Default)]
pub struct Editor {
    patches: Vec<Patch>,
    origin: Option<PatchOrigin>,
}

impl Editor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp subsequently recorded patches with the node they serve.
    pub fn set_origin(&mut self, origin: Option<PatchOrigin>) {
        self.origin = origin;
    }

    pub fn insert(&mut self, offset: usize, content: impl Into<String>) {
        self.record(PatchKind::Insert, offset, offset, content.into());
    }

    pub fn replace(&mut self, start: usize, end: usize, content: impl Into<String>) {
        self.record(PatchKind::Replace, start, end, content.into());
    }

    pub fn remove(&mut self, start: usize, end: usize) {
        self.record(PatchKind::Remove, start, end, String::new());
    }

    fn record(&mut self, kind: PatchKind, start: usize, end: usize, content: String) {
        let seq = self.patches.len();
        self.patches.push(Patch {
            kind,
            start,
            end,
            content,
            origin: self.origin,
            seq,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.patches.is_empty()
    }

    pub fn patch_count(&self) -> usize {
        self.patches.len()
    }

    /// Sort, check, and apply every recorded patch against the buffer.
    ///
    /// Untouched spans are copied through verbatim; the returned map
    /// traces every output byte back to the original.
    pub fn resolve(self, buffer: &SourceBuffer) -> Result<Resolved, ConvertError> {
        debug!(patches = self.patches.len(), "resolving patch set");

        for patch in &self.patches {
            if patch.start > patch.end || patch.end > buffer.len() {
                return Err(ConvertError::internal(format!(
                    "patch out of range: {} against {} bytes of source",
                    patch.describe(),
                    buffer.len()
                )));
            }
        }

        let (spans, inserts) = self.partition();
        let spans = Self::select_spans(spans, buffer)?;
        let inserts = Self::select_inserts(inserts, &spans, buffer)?;
        Ok(Self::emit(buffer, &spans, &inserts))
    }

    fn partition(self) -> (Vec<Patch>, Vec<Patch>) {
        let mut spans = Vec::new();
        let mut inserts = Vec::new();
        for patch in self.patches {
            match patch.kind {
                PatchKind::Insert => inserts.push(patch),
                PatchKind::Replace | PatchKind::Remove => spans.push(patch),
            }
        }
        (spans, inserts)
    }

    /// Order replace/remove spans and resolve overlaps: accept, override,
    /// or conflict per the policy above.
    fn select_spans(
        mut spans: Vec<Patch>,
        buffer: &SourceBuffer,
    ) -> Result<Vec<Patch>, ConvertError> {
        // Containers sort ahead of their contents: by start, then widest
        // first, then emission order.
        spans.sort_by(|a, b| {
            a.start
                .cmp(&b.start)
                .then(b.end.cmp(&a.end))
                .then(a.seq.cmp(&b.seq))
        });

        let mut accepted: Vec<Patch> = Vec::with_capacity(spans.len());
        let mut overridden = 0usize;
        for span in spans {
            if let Some(current) = accepted.last() {
                if span.start < current.end {
                    let identical = span.start == current.start && span.end == current.end;
                    let contained = span.end <= current.end;
                    if contained && !identical && current.seq > span.seq {
                        // The containing patch was emitted after this one:
                        // a documented full override of the sub-range.
                        overridden += 1;
                        continue;
                    }
                    return Err(conflict(current, &span, buffer));
                }
            }
            accepted.push(span);
        }
        if overridden > 0 {
            debug!(overridden, "dropped sub-range patches overridden by containing patches");
        }
        Ok(accepted)
    }

    /// Order inserts and resolve those falling strictly inside an
    /// accepted span.
    fn select_inserts(
        mut inserts: Vec<Patch>,
        spans: &[Patch],
        buffer: &SourceBuffer,
    ) -> Result<Vec<Patch>, ConvertError> {
        inserts.sort_by(|a, b| a.start.cmp(&b.start).then(a.seq.cmp(&b.seq)));

        let mut kept = Vec::with_capacity(inserts.len());
        for insert in inserts {
            let covering = spans
                .iter()
                .find(|span| span.start < insert.start && insert.start < span.end);
            match covering {
                Some(span) if span.seq > insert.seq => {
                    // Same override rule as contained spans.
                    continue;
                }
                Some(span) => return Err(conflict(span, &insert, buffer)),
                None => kept.push(insert),
            }
        }
        Ok(kept)
    }

    /// Walk the buffer, interleaving copied spans, inserts, and span
    /// content. An insert at offset `o` lands before a span starting at
    /// `o` and after a span ending at `o`; inserts at the same offset
    /// concatenate in emission order (already sorted).
    fn emit(buffer: &SourceBuffer, spans: &[Patch], inserts: &[Patch]) -> Resolved {
        let mut out = String::with_capacity(buffer.len());
        let mut segments: Vec<Segment> = Vec::new();
        let mut cursor = 0usize;
        let mut next_insert = 0usize;

        let copy_through = |out: &mut String,
                            segments: &mut Vec<Segment>,
                            from: usize,
                            to: usize| {
            if to > from {
                segments.push(Segment {
                    out_start: out.len(),
                    src_start: from,
                    len: to - from,
                    synthetic: false,
                });
                out.push_str(buffer.slice(from, to));
            }
        };
        let generate =
            |out: &mut String, segments: &mut Vec<Segment>, anchor: usize, content: &str| {
                if !content.is_empty() {
                    segments.push(Segment {
                        out_start: out.len(),
                        src_start: anchor,
                        len: content.len(),
                        synthetic: true,
                    });
                    out.push_str(content);
                }
            };

        for span in spans {
            while next_insert < inserts.len() && inserts[next_insert].start <= span.start {
                let insert = &inserts[next_insert];
                copy_through(&mut out, &mut segments, cursor, insert.start);
                cursor = insert.start;
                generate(&mut out, &mut segments, insert.start, &insert.content);
                next_insert += 1;
            }
            copy_through(&mut out, &mut segments, cursor, span.start);
            generate(&mut out, &mut segments, span.start, &span.content);
            cursor = span.end;
        }
        while next_insert < inserts.len() {
            let insert = &inserts[next_insert];
            copy_through(&mut out, &mut segments, cursor, insert.start);
            cursor = insert.start;
            generate(&mut out, &mut segments, insert.start, &insert.content);
            next_insert += 1;
        }
        copy_through(&mut out, &mut segments, cursor, buffer.len());

        Resolved {
            code: out,
            map: PositionMap::from_segments(segments),
        }
    }
}

fn conflict(first: &Patch, second: &Patch, buffer: &SourceBuffer) -> ConvertError {
    let lo = first.start.min(second.start);
    let hi = first.end.max(second.end).max(lo + 1);
    ConvertError::PatchConflict {
        first: first.describe(),
        second: second.describe(),
        excerpt: buffer.excerpt(lo, hi),
    }
}
