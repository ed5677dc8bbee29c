//! In-memory segment store with stable identities and a change signal.
//!
//! Edits split and trim segments in place; the segment that held the edit
//! point keeps its id, newly created runs receive fresh ids. After each edit
//! every subscriber receives one `SequenceChange` over a crossbeam channel.
//! Disconnected subscribers are pruned on the next send.

use crate::{Segment, SegmentId, SegmentSlice, TextSequence, boundary, loader};
use ahash::AHashMap;
use crossbeam_channel::{Receiver, Sender, unbounded};
use std::ops::Range;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert { offset: usize, len: usize },
    Remove { offset: usize, len: usize },
    Append { len: usize },
}

/// Change notification delivered to subscribers after each mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceChange {
    pub revision: u64,
    pub kind: ChangeKind,
}

#[derive(Debug, Default)]
pub struct SegmentStore {
    segments: Vec<Segment>,
    /// Absolute start offset per segment (parallel to `segments`).
    starts: Vec<usize>,
    index: AHashMap<SegmentId, usize>,
    len: usize,
    next_id: u64,
    revision: u64,
    subscribers: Vec<Sender<SequenceChange>>,
}

impl SegmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a plain document, one segment per paragraph.
    pub fn from_document(body: &str) -> Self {
        let mut store = Self::new();
        for para in loader::load_segments(body) {
            store.push_segment(Segment::text(SegmentId(0), para));
        }
        store.reindex();
        store
    }

    /// Register for change notifications.
    pub fn subscribe(&mut self) -> Receiver<SequenceChange> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    /// Append a text segment at the end of the sequence.
    pub fn append_text(&mut self, text: &str) -> Option<SegmentId> {
        if text.is_empty() {
            return None;
        }
        let id = self.push_segment(Segment::text(SegmentId(0), text));
        self.reindex();
        let len = boundary::char_count(text);
        self.notify(ChangeKind::Append { len });
        Some(id)
    }

    /// Append a zero-length marker segment.
    pub fn append_marker(&mut self) -> SegmentId {
        let id = self.push_segment(Segment::marker(SegmentId(0)));
        self.reindex();
        id
    }

    /// Insert `text` at absolute `offset` (clamped to `len`). The new text
    /// becomes its own segment; a segment split by the insertion keeps its id
    /// for the leading half.
    pub fn insert_text(&mut self, offset: usize, text: &str) -> Option<SegmentId> {
        if text.is_empty() {
            return None;
        }
        let offset = offset.min(self.len);
        let at = self.split_at(offset);
        let id = self.alloc_id();
        self.segments.insert(at, Segment::text(id, text));
        self.reindex();
        let len = boundary::char_count(text);
        trace!(target: "text.store", offset, len, "insert_text");
        self.notify(ChangeKind::Insert { offset, len });
        Some(id)
    }

    /// Remove the characters in `range` (clamped). Text segments emptied by
    /// the removal disappear; markers are kept.
    pub fn remove_range(&mut self, range: Range<usize>) {
        let start = range.start.min(self.len);
        let end = range.end.min(self.len);
        if start >= end {
            return;
        }
        let first = self.split_at(start);
        self.reindex();
        let last = self.split_at(end);
        let markers: Vec<Segment> = self
            .segments
            .drain(first..last)
            .filter(|s| !s.is_text())
            .collect();
        for (i, m) in markers.into_iter().enumerate() {
            self.segments.insert(first + i, m);
        }
        self.reindex();
        trace!(target: "text.store", start, end, "remove_range");
        self.notify(ChangeKind::Remove {
            offset: start,
            len: end - start,
        });
    }

    /// Copy out the text in a character range.
    pub fn text_range(&self, range: Range<usize>) -> String {
        let mut out = String::new();
        for slice in self.segments_from(range.start) {
            if slice.start >= range.end {
                break;
            }
            let seg = slice.segment;
            let local_end = (range.end - slice.start).min(seg.len());
            out.push_str(seg.slice(slice.skip..local_end));
        }
        out
    }

    fn alloc_id(&mut self) -> SegmentId {
        self.next_id += 1;
        SegmentId(self.next_id)
    }

    fn push_segment(&mut self, mut seg: Segment) -> SegmentId {
        let id = self.alloc_id();
        seg.id = id;
        self.segments.push(seg);
        id
    }

    /// Ensure a segment boundary at `offset`; returns the index of the first
    /// segment starting at or after it. Requires an up to date index.
    fn split_at(&mut self, offset: usize) -> usize {
        if offset >= self.len {
            return self.segments.len();
        }
        let idx = self.locate(offset);
        let local = offset - self.starts[idx];
        if local == 0 {
            return self.first_at(idx, offset);
        }
        let seg = &mut self.segments[idx];
        let head = seg.slice(0..local).to_string();
        let tail = seg.slice(local..seg.len()).to_string();
        seg.set_text(head);
        let tail_id = self.alloc_id();
        self.segments.insert(idx + 1, Segment::text(tail_id, tail));
        idx + 1
    }

    /// Markers sharing `offset` with the segment at `idx` stay in front of it.
    fn first_at(&self, idx: usize, offset: usize) -> usize {
        let mut i = idx;
        while i > 0 && self.starts[i - 1] == offset && !self.segments[i - 1].is_text() {
            i -= 1;
        }
        i
    }

    /// Index of the text segment containing `offset` (`offset < len`).
    fn locate(&self, offset: usize) -> usize {
        // Last segment whose start <= offset, skipping zero-length entries.
        let mut idx = self.starts.partition_point(|&s| s <= offset);
        while idx > 0 {
            idx -= 1;
            let seg = &self.segments[idx];
            if seg.len() > 0 && self.starts[idx] <= offset {
                return idx;
            }
        }
        0
    }

    fn reindex(&mut self) {
        self.starts.clear();
        self.index.clear();
        let mut acc = 0usize;
        for (i, seg) in self.segments.iter().enumerate() {
            self.starts.push(acc);
            self.index.insert(seg.id(), i);
            acc += seg.len();
        }
        self.len = acc;
    }

    fn notify(&mut self, kind: ChangeKind) {
        self.revision += 1;
        let change = SequenceChange {
            revision: self.revision,
            kind,
        };
        self.subscribers.retain(|tx| tx.send(change).is_ok());
    }
}

impl TextSequence for SegmentStore {
    fn len(&self) -> usize {
        self.len
    }

    fn segment_at(&self, offset: usize) -> Option<(&Segment, usize)> {
        if offset >= self.len {
            return None;
        }
        let idx = self.locate(offset);
        Some((&self.segments[idx], offset - self.starts[idx]))
    }

    fn segments_from(&self, offset: usize) -> Box<dyn Iterator<Item = SegmentSlice<'_>> + '_> {
        let first = if offset >= self.len {
            self.segments.len()
        } else {
            self.locate(offset)
        };
        Box::new(
            self.segments[first..]
                .iter()
                .zip(&self.starts[first..])
                .map(move |(segment, &start)| SegmentSlice {
                    segment,
                    start,
                    skip: offset.saturating_sub(start).min(segment.len()),
                }),
        )
    }

    fn offset_of(&self, id: SegmentId) -> Option<usize> {
        self.index.get(&id).map(|&i| self.starts[i])
    }

    fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.index.get(&id).map(|&i| &self.segments[i])
    }
}
