//! Line blocks, fragments and the page produced by one pagination pass.
//!
//! A `Fragment` is a slice of one segment's text tagged with the segment's
//! identity. Its rendered text is the slice verbatim; markup only decides how
//! the slice is split into child nodes (plain text vs. emphasis elements) and
//! which style it is drawn in, so rendered length always equals `len()`.
//!
//! Blocks are built fresh on every pass and never edited afterwards; pruning
//! only drops whole blocks from the tail and re-admits truncated copies.

use crate::probe::NodeKind;
use core_text::SegmentId;
use core_text::boundary::slice_chars;
use regex::Regex;
use smallvec::SmallVec;
use std::ops::Range;

const EMPHASIS_PATTERN: &str = r"_([a-zA-Z]+)_";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FragmentStyle {
    #[default]
    Body,
    Heading,
}

/// Child node of a fragment; `range` is in fragment-relative characters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpan {
    pub kind: NodeKind,
    pub range: Range<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    pub segment: SegmentId,
    /// Intra-segment character range.
    pub range: Range<usize>,
    /// Sequence offset of `range.start` when the fragment was built.
    pub abs_start: usize,
    pub text: String,
    pub style: FragmentStyle,
    pub nodes: SmallVec<[NodeSpan; 1]>,
    /// Cut at a character boundary because no whitespace was available.
    pub hard_split: bool,
}

impl Fragment {
    pub fn len(&self) -> usize {
        self.range.len()
    }

    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    pub fn abs_end(&self) -> usize {
        self.abs_start + self.len()
    }

    pub fn ends_line(&self) -> bool {
        self.text.ends_with('\n')
    }

    /// Prefix `[0, cut)` of this fragment, keeping style and clipping nodes.
    pub fn truncated(&self, cut: usize, hard_split: bool) -> Fragment {
        let cut = cut.min(self.len());
        let nodes = self
            .nodes
            .iter()
            .filter(|n| n.range.start < cut)
            .map(|n| NodeSpan {
                kind: n.kind,
                range: n.range.start..n.range.end.min(cut),
            })
            .collect();
        Fragment {
            segment: self.segment,
            range: self.range.start..self.range.start + cut,
            abs_start: self.abs_start,
            text: slice_chars(&self.text, 0..cut).to_string(),
            style: self.style,
            nodes,
            hard_split,
        }
    }
}

/// One visual line group.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineBlock {
    pub fragments: SmallVec<[Fragment; 4]>,
}

impl LineBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(fragment: Fragment) -> Self {
        let mut block = Self::new();
        block.push(fragment);
        block
    }

    pub fn push(&mut self, fragment: Fragment) {
        self.fragments.push(fragment);
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn char_len(&self) -> usize {
        self.fragments.iter().map(Fragment::len).sum()
    }

    pub fn text(&self) -> String {
        self.fragments.iter().map(|f| f.text.as_str()).collect()
    }
}

/// Result of one pagination pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Page {
    pub blocks: Vec<LineBlock>,
    /// Offset the pass was asked to start at.
    pub requested_offset: usize,
    /// First displayed sequence offset after line-start snapping.
    pub first_offset: usize,
    /// One past the last displayed sequence offset.
    pub end_offset: usize,
    /// Realized content height in pixels.
    pub height: f32,
    /// The trial layout overflowed and was pruned.
    pub pruned: bool,
    pub trial_passes: u32,
}

impl Page {
    pub fn empty(requested_offset: usize) -> Self {
        Self {
            requested_offset,
            first_offset: requested_offset,
            end_offset: requested_offset,
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn char_count(&self) -> usize {
        self.blocks.iter().map(LineBlock::char_len).sum()
    }

    pub fn fragments(&self) -> impl Iterator<Item = &Fragment> {
        self.blocks.iter().flat_map(|b| b.fragments.iter())
    }

    pub fn text(&self) -> String {
        self.blocks.iter().map(LineBlock::text).collect()
    }
}

/// Builds fragments: style detection and emphasis node splitting.
#[derive(Debug, Clone)]
pub struct Markup {
    heading_marker: Option<String>,
    emphasis: Option<Regex>,
}

impl Markup {
    pub fn new(heading_marker: &str, emphasis: bool) -> Self {
        let heading_marker = (!heading_marker.is_empty()).then(|| heading_marker.to_string());
        let emphasis = if emphasis {
            match Regex::new(EMPHASIS_PATTERN) {
                Ok(re) => Some(re),
                Err(err) => {
                    tracing::warn!(target: "render.markup", error = %err, "emphasis_disabled");
                    None
                }
            }
        } else {
            None
        };
        Self {
            heading_marker,
            emphasis,
        }
    }

    /// No headings, no emphasis: every fragment is a single text node.
    pub fn plain() -> Self {
        Self {
            heading_marker: None,
            emphasis: None,
        }
    }

    pub fn style_for(&self, text: &str) -> FragmentStyle {
        match &self.heading_marker {
            Some(marker) if text.contains(marker.as_str()) => FragmentStyle::Heading,
            _ => FragmentStyle::Body,
        }
    }

    pub fn fragment(
        &self,
        segment: SegmentId,
        range: Range<usize>,
        abs_start: usize,
        text: String,
    ) -> Fragment {
        let style = self.style_for(&text);
        let nodes = match (&self.emphasis, style) {
            (Some(re), FragmentStyle::Body) => split_emphasis(re, &text),
            _ => whole_text(&text),
        };
        Fragment {
            segment,
            range,
            abs_start,
            text,
            style,
            nodes,
            hard_split: false,
        }
    }
}

impl Default for Markup {
    fn default() -> Self {
        Self::plain()
    }
}

fn whole_text(text: &str) -> SmallVec<[NodeSpan; 1]> {
    let len = text.chars().count();
    let mut nodes = SmallVec::new();
    if len > 0 {
        nodes.push(NodeSpan {
            kind: NodeKind::Text,
            range: 0..len,
        });
    }
    nodes
}

fn split_emphasis(re: &Regex, text: &str) -> SmallVec<[NodeSpan; 1]> {
    let mut nodes = SmallVec::new();
    // Byte offsets from the regex, converted to char offsets incrementally.
    let mut byte_cursor = 0usize;
    let mut char_cursor = 0usize;
    for m in re.find_iter(text) {
        let gap = text[byte_cursor..m.start()].chars().count();
        if gap > 0 {
            nodes.push(NodeSpan {
                kind: NodeKind::Text,
                range: char_cursor..char_cursor + gap,
            });
        }
        char_cursor += gap;
        let width = m.as_str().chars().count();
        nodes.push(NodeSpan {
            kind: NodeKind::Element,
            range: char_cursor..char_cursor + width,
        });
        char_cursor += width;
        byte_cursor = m.end();
    }
    let tail = text[byte_cursor..].chars().count();
    if tail > 0 {
        nodes.push(NodeSpan {
            kind: NodeKind::Text,
            range: char_cursor..char_cursor + tail,
        });
    }
    nodes
}
