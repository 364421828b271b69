//! Position maps: tracing output offsets back to original input offsets.
//!
//! Each stage of the pipeline produces a `PositionMap` describing its own
//! output in terms of its own input; the pipeline composes them so the
//! final map traces all the way back to the original source.

use serde::{Deserialize, Serialize};

use crate::buffer::{Position, SourceBuffer};

/// One run of output text and where it came from.
///
/// A copied segment maps its bytes one-to-one onto the source range
/// starting at `src_start`. A synthetic segment is generated content; all
/// of its bytes map back to the anchor offset `src_start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub out_start: usize,
    pub src_start: usize,
    pub len: usize,
    pub synthetic: bool,
}

impl Segment {
    fn out_end(&self) -> usize {
        self.out_start + self.len
    }
}

/// Maps output byte offsets back to input byte offsets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionMap {
    segments: Vec<Segment>,
}

impl PositionMap {
    /// The map of an untouched text: every offset maps to itself.
    pub fn identity(len: usize) -> Self {
        if len == 0 {
            return Self::default();
        }
        Self {
            segments: vec![Segment {
                out_start: 0,
                src_start: 0,
                len,
                synthetic: false,
            }],
        }
    }

    /// Build a map from segments already in output order, merging runs
    /// that continue each other.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        let mut merged: Vec<Segment> = Vec::with_capacity(segments.len());
        for seg in segments {
            if seg.len == 0 {
                continue;
            }
            if let Some(last) = merged.last_mut() {
                let continues_copy = !last.synthetic
                    && !seg.synthetic
                    && last.out_end() == seg.out_start
                    && last.src_start + last.len == seg.src_start;
                let continues_synthetic = last.synthetic
                    && seg.synthetic
                    && last.out_end() == seg.out_start
                    && last.src_start == seg.src_start;
                if continues_copy || continues_synthetic {
                    last.len += seg.len;
                    continue;
                }
            }
            merged.push(seg);
        }
        Self { segments: merged }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Total length of the output side of this map.
    pub fn out_len(&self) -> usize {
        self.segments.last().map(Segment::out_end).unwrap_or(0)
    }

    /// The segment containing an output offset, plus the offset within it.
    fn segment_containing(&self, out: usize) -> Option<(&Segment, usize)> {
        // Largest segment start at or before the target, skylow-style.
        let idx = match self
            .segments
            .binary_search_by_key(&out, |seg| seg.out_start)
        {
            Ok(idx) => idx,
            Err(0) => return None,
            Err(insertion) => insertion - 1,
        };
        let seg = &self.segments[idx];
        if out < seg.out_end() {
            Some((seg, out - seg.out_start))
        } else {
            None
        }
    }

    /// Map an output offset back to the input offset it descends from.
    ///
    /// Generated content maps to its anchor. Returns `None` for offsets
    /// past the end of the output.
    pub fn map_offset(&self, out: usize) -> Option<usize> {
        let (seg, within) = self.segment_containing(out)?;
        if seg.synthetic {
            Some(seg.src_start)
        } else {
            Some(seg.src_start + within)
        }
    }

    /// Compose two maps: `self` maps this stage's input back to the
    /// original, `later` maps the next stage's output back to this
    /// stage's input. The result maps the later output to the original.
    pub fn compose(&self, later: &PositionMap) -> PositionMap {
        if self.segments.is_empty() {
            return later.clone();
        }
        let fallback_src = self
            .segments
            .last()
            .map(|seg| {
                if seg.synthetic {
                    seg.src_start
                } else {
                    seg.src_start + seg.len
                }
            })
            .unwrap_or(0);

        let mut segments = Vec::new();
        for seg in &later.segments {
            if seg.synthetic {
                let anchor = self.map_offset(seg.src_start).unwrap_or(fallback_src);
                segments.push(Segment {
                    out_start: seg.out_start,
                    src_start: anchor,
                    len: seg.len,
                    synthetic: true,
                });
                continue;
            }
            let mut done = 0;
            while done < seg.len {
                let mid = seg.src_start + done;
                match self.segment_containing(mid) {
                    Some((inner, within)) => {
                        let take = (inner.len - within).min(seg.len - done);
                        segments.push(Segment {
                            out_start: seg.out_start + done,
                            src_start: if inner.synthetic {
                                inner.src_start
                            } else {
                                inner.src_start + within
                            },
                            len: take,
                            synthetic: inner.synthetic,
                        });
                        done += take;
                    }
                    None => {
                        // Output past the coverage of the earlier map;
                        // anchor the tail rather than dropping it.
                        segments.push(Segment {
                            out_start: seg.out_start + done,
                            src_start: fallback_src,
                            len: seg.len - done,
                            synthetic: true,
                        });
                        break;
                    }
                }
            }
        }
        PositionMap::from_segments(segments)
    }

    /// Render to the serialized form consumed by downstream tooling: one
    /// entry per segment, both sides as line/column positions.
    pub fn render(
        &self,
        original: &SourceBuffer,
        output: &str,
        file: Option<&str>,
    ) -> RenderedMap {
        let out_buffer = SourceBuffer::new(output);
        let mappings = self
            .segments
            .iter()
            .map(|seg| MappingEntry {
                generated: out_buffer.position_at(seg.out_start),
                original: original.position_at(seg.src_start),
                len: seg.len,
                synthetic: seg.synthetic,
            })
            .collect();
        RenderedMap {
            file: file.map(str::to_owned),
            mappings,
        }
    }
}

/// Line/column rendering of a `PositionMap`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderedMap {
    pub file: Option<String>,
    pub mappings: Vec<MappingEntry>,
}

/// One rendered segment: where a run of output text came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingEntry {
    pub generated: Position,
    pub original: Position,
    pub len: usize,
    pub synthetic: bool,
}
