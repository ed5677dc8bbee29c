//! Segmented text sequence: the read model the pagination engine walks.
//!
//! A sequence is an ordered run of `Segment`s. Each segment carries a stable
//! `SegmentId` that survives edits elsewhere in the sequence (indices shift,
//! identities do not). All offsets in this crate are *character* offsets
//! (Unicode scalar values), never bytes.
//!
//! The engine consumes sequences only through the `TextSequence` trait so any
//! collaborative backend able to expose an ordered, position addressed view
//! can stand in for the in-memory `SegmentStore` shipped here.
//!
//! Invariants:
//! * `len()` equals the sum of the char lengths of all segments.
//! * Marker segments have zero length and never contain text.
//! * `segments_from(o)` yields segments in order; the first yielded text
//!   segment is the one containing `o` with `skip = o - start`.

pub mod boundary;
pub mod loader;
pub mod store;

pub use loader::load_segments;
pub use store::{ChangeKind, SegmentStore, SequenceChange};

use std::fmt;

/// Stable identity of a segment. Never reused within one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SegmentId(pub u64);

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "seg#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Plain text content.
    Text,
    /// Zero-length embedded marker (paragraph/annotation anchors). Skipped by layout.
    Marker,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    id: SegmentId,
    kind: SegmentKind,
    text: String,
    len: usize,
}

impl Segment {
    pub fn text(id: SegmentId, text: impl Into<String>) -> Self {
        let text = text.into();
        let len = text.chars().count();
        Self {
            id,
            kind: SegmentKind::Text,
            text,
            len,
        }
    }

    pub fn marker(id: SegmentId) -> Self {
        Self {
            id,
            kind: SegmentKind::Marker,
            text: String::new(),
            len: 0,
        }
    }

    #[inline]
    pub fn id(&self) -> SegmentId {
        self.id
    }

    #[inline]
    pub fn kind(&self) -> SegmentKind {
        self.kind
    }

    #[inline]
    pub fn is_text(&self) -> bool {
        self.kind == SegmentKind::Text
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in characters.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Character range slice of the segment text. Out of range bounds are clamped.
    pub fn slice(&self, range: std::ops::Range<usize>) -> &str {
        boundary::slice_chars(&self.text, range)
    }

    pub(crate) fn set_text(&mut self, text: String) {
        self.len = text.chars().count();
        self.text = text;
    }
}

/// A segment visited during an ordered walk.
#[derive(Debug, Clone, Copy)]
pub struct SegmentSlice<'a> {
    pub segment: &'a Segment,
    /// Absolute offset of the segment's first character.
    pub start: usize,
    /// Characters of this segment that lie before the walk's start offset.
    pub skip: usize,
}

impl<'a> SegmentSlice<'a> {
    /// Remaining text from `skip` to the end of the segment.
    pub fn remaining(&self) -> &'a str {
        let seg: &'a Segment = self.segment;
        seg.slice(self.skip..seg.len())
    }
}

/// Sequence provider contract consumed by the pagination engine.
pub trait TextSequence {
    /// Total length in characters.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Text segment containing `offset` together with the intra-segment offset.
    /// `None` when `offset >= len()`.
    fn segment_at(&self, offset: usize) -> Option<(&Segment, usize)>;

    /// Ordered walk starting at the segment that contains `offset`.
    fn segments_from(&self, offset: usize) -> Box<dyn Iterator<Item = SegmentSlice<'_>> + '_>;

    /// Current absolute offset of a segment, if it is still part of the sequence.
    fn offset_of(&self, id: SegmentId) -> Option<usize>;

    fn segment(&self, id: SegmentId) -> Option<&Segment>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_lengths_count_chars() {
        let seg = Segment::text(SegmentId(1), "héllo");
        assert_eq!(seg.len(), 5);
        assert_eq!(seg.slice(1..3), "él");
        assert!(seg.is_text());
    }

    #[test]
    fn marker_is_empty() {
        let m = Segment::marker(SegmentId(9));
        assert!(m.is_empty());
        assert_eq!(m.kind(), SegmentKind::Marker);
    }

    #[test]
    fn slice_remaining_honours_skip() {
        let seg = Segment::text(SegmentId(1), "The quick");
        let slice = SegmentSlice {
            segment: &seg,
            start: 10,
            skip: 4,
        };
        assert_eq!(slice.remaining(), "quick");
    }
}
