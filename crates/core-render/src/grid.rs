//! `GridSurface`: a deterministic cell-grid display surface.
//!
//! Lays line blocks out the way a `pre-wrap` text container would on a
//! monospace grid, and answers measurement and hit-test queries from that
//! layout. The terminal host paints it; tests use it as a synthetic surface
//! with exact, reproducible bounds.
//!
//! Layout rules:
//! - Each block starts on a fresh row directly below the previous block.
//! - Glyph advance is `unicode-width` columns times the cell width; heading
//!   fragments scale the advance and the row height.
//! - Words wrap as a whole. Whitespace hangs past the right edge instead of
//!   wrapping. A word wider than the content area breaks at the edge.
//! - `\n` ends the current row; no trailing empty row is produced.
//! - Row height is the tallest glyph placed on it.

use crate::block::{FragmentStyle, LineBlock};
use crate::error::ProbeError;
use crate::probe::{
    DisplaySurface, FontSpec, FragmentRef, HitTestProbe, MeasureProbe, NodeHit, NodeKind, Point,
    Rect, RenderedNode, Size,
};
use core_config::Config;
use std::ops::Range;
use unicode_width::UnicodeWidthChar;

const EPS: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Margins {
    pub left: f32,
    pub right: f32,
    pub top: f32,
}

impl Margins {
    /// Margins as percentages of the viewport size.
    pub fn from_percent(viewport: Size, left: u8, right: u8, top: u8) -> Self {
        let pct = |total: f32, p: u8| (total * f32::from(p) / 100.0).floor();
        Self {
            left: pct(viewport.width, left),
            right: pct(viewport.width, right),
            top: pct(viewport.height, top),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingStyle {
    pub glyph_scale: f32,
    pub line_scale: f32,
}

impl Default for HeadingStyle {
    fn default() -> Self {
        Self {
            glyph_scale: 1.0,
            line_scale: 1.0,
        }
    }
}

/// A placed character.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    pub ch: char,
    pub rect: Rect,
    pub fragment: FragmentRef,
    pub node: usize,
    pub node_kind: NodeKind,
    pub node_offset: usize,
    pub style: FragmentStyle,
}

#[derive(Debug, Clone)]
struct Row {
    top: f32,
    height: f32,
    glyphs: Range<usize>,
}

#[derive(Debug, Clone)]
struct PlacedFragment {
    nodes: Vec<RenderedNode>,
    glyphs: Range<usize>,
}

#[derive(Debug, Clone)]
struct PlacedBlock {
    bounds: Rect,
    fragments: Vec<PlacedFragment>,
}

/// Character waiting for placement.
struct Pending {
    ch: char,
    advance: f32,
    height: f32,
    fragment: FragmentRef,
    node: usize,
    node_kind: NodeKind,
    node_offset: usize,
    style: FragmentStyle,
}

/// Row filling state for one block.
struct LineFill {
    left: f32,
    right: f32,
    x: f32,
    rows: Vec<f32>,
    at: Vec<(usize, f32)>,
    break_pending: bool,
}

impl LineFill {
    fn new(left: f32, right: f32, n: usize) -> Self {
        Self {
            left,
            right,
            x: left,
            rows: Vec::new(),
            at: Vec::with_capacity(n),
            break_pending: false,
        }
    }

    fn at_line_start(&self) -> bool {
        self.rows.is_empty() || self.x <= self.left + EPS
    }

    fn break_row(&mut self) {
        self.rows.push(0.0);
        self.x = self.left;
    }

    fn place(&mut self, advance: f32, height: f32) {
        if self.break_pending {
            self.break_pending = false;
            self.break_row();
        }
        if self.rows.is_empty() {
            self.rows.push(0.0);
        }
        let row = self.rows.len() - 1;
        self.at.push((row, self.x));
        self.x += advance;
        self.rows[row] = self.rows[row].max(height);
    }

    fn fits(&self, width: f32) -> bool {
        self.x + width <= self.right + EPS
    }
}

#[derive(Debug, Clone)]
pub struct GridSurface {
    viewport: Size,
    cell: Size,
    margins: Margins,
    heading: HeadingStyle,
    available: bool,
    glyphs: Vec<Glyph>,
    rows: Vec<Row>,
    blocks: Vec<PlacedBlock>,
    renders: u64,
}

impl GridSurface {
    pub fn new(viewport: Size, cell: Size) -> Self {
        Self {
            viewport,
            cell,
            margins: Margins::default(),
            heading: HeadingStyle::default(),
            available: true,
            glyphs: Vec::new(),
            rows: Vec::new(),
            blocks: Vec::new(),
            renders: 0,
        }
    }

    /// Surface with margins and heading style taken from configuration.
    pub fn from_config(cfg: &Config, viewport: Size, cell: Size) -> Self {
        let margins = Margins::from_percent(
            viewport,
            cfg.effective.margin_left_pct,
            cfg.effective.margin_right_pct,
            cfg.effective.margin_top_pct,
        );
        tracing::debug!(
            target: "render.grid",
            left = margins.left,
            right = margins.right,
            top = margins.top,
            fit_ratio = cfg.effective.fit_ratio,
            "surface_from_config"
        );
        Self::new(viewport, cell)
            .with_margins(margins)
            .with_heading(HeadingStyle {
                glyph_scale: cfg.file.style.heading_scale,
                line_scale: cfg.file.style.heading_line_scale,
            })
    }

    pub fn with_margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }

    pub fn with_heading(mut self, heading: HeadingStyle) -> Self {
        self.heading = heading;
        self
    }

    /// Toggle probe availability. An unavailable surface fails every query.
    pub fn set_available(&mut self, available: bool) {
        self.available = available;
    }

    /// Change the viewport. The current layout is discarded.
    pub fn resize(&mut self, viewport: Size) {
        self.viewport = viewport;
        self.clear();
    }

    pub fn set_margins(&mut self, margins: Margins) {
        self.margins = margins;
        self.clear();
    }

    pub fn cell(&self) -> Size {
        self.cell
    }

    pub fn margins(&self) -> Margins {
        self.margins
    }

    pub fn content_width(&self) -> f32 {
        (self.viewport.width - self.margins.left - self.margins.right).max(0.0)
    }

    pub fn glyphs(&self) -> &[Glyph] {
        &self.glyphs
    }

    pub fn render_count(&self) -> u64 {
        self.renders
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Text of each visual row, for diagnostics and tests.
    pub fn row_texts(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|r| self.glyphs[r.glyphs.clone()].iter().map(|g| g.ch).collect())
            .collect()
    }

    fn clear(&mut self) {
        self.glyphs.clear();
        self.rows.clear();
        self.blocks.clear();
    }

    fn check(&self, probe: &'static str) -> Result<(), ProbeError> {
        if self.available {
            Ok(())
        } else {
            Err(ProbeError::Unavailable { probe })
        }
    }

    fn advance_of(&self, ch: char) -> f32 {
        let cols = match ch {
            '\n' => 0,
            '\t' => 1,
            _ => ch.width().unwrap_or(0),
        };
        cols as f32 * self.cell.width
    }

    fn layout_block(&mut self, b: usize, block: &LineBlock, top: f32) -> PlacedBlock {
        let left = self.margins.left;
        let right = left + self.content_width();

        let mut pending = Vec::new();
        let mut fragments = Vec::with_capacity(block.fragments.len());
        for (f, frag) in block.fragments.iter().enumerate() {
            let fragment = FragmentRef::new(b, f);
            let (glyph_scale, line_scale) = match frag.style {
                FragmentStyle::Heading => (self.heading.glyph_scale, self.heading.line_scale),
                FragmentStyle::Body => (1.0, 1.0),
            };
            let chars: Vec<char> = frag.text.chars().collect();
            let mut spans: Vec<(NodeKind, Range<usize>)> =
                frag.nodes.iter().map(|n| (n.kind, n.range.clone())).collect();
            if spans.is_empty() && !chars.is_empty() {
                spans.push((NodeKind::Text, 0..chars.len()));
            }
            let start = self.glyphs.len() + pending.len();
            let mut nodes = Vec::with_capacity(spans.len());
            for (node, (kind, range)) in spans.into_iter().enumerate() {
                let range = range.start.min(chars.len())..range.end.min(chars.len());
                nodes.push(RenderedNode {
                    kind,
                    rendered_len: range.len(),
                });
                for (node_offset, &ch) in chars[range].iter().enumerate() {
                    pending.push(Pending {
                        ch,
                        advance: self.advance_of(ch) * glyph_scale,
                        height: self.cell.height * line_scale,
                        fragment,
                        node,
                        node_kind: kind,
                        node_offset,
                        style: frag.style,
                    });
                }
            }
            fragments.push(PlacedFragment {
                nodes,
                glyphs: start..self.glyphs.len() + pending.len(),
            });
        }

        let fill = fill_rows(&pending, left, right);

        let mut row_tops = Vec::with_capacity(fill.rows.len());
        let mut y = top;
        for h in &fill.rows {
            row_tops.push(y);
            y += h;
        }
        let first_glyph = self.glyphs.len();
        let row_base = self.rows.len();
        for (k, (p, &(row, x))) in pending.iter().zip(&fill.at).enumerate() {
            let row_top = row_tops[row];
            let height = fill.rows[row];
            self.glyphs.push(Glyph {
                ch: p.ch,
                rect: Rect::new(x, row_top, x + p.advance, row_top + height),
                fragment: p.fragment,
                node: p.node,
                node_kind: p.node_kind,
                node_offset: p.node_offset,
                style: p.style,
            });
            let index = first_glyph + k;
            match self.rows.get_mut(row_base + row) {
                Some(existing) => existing.glyphs.end = index + 1,
                None => self.rows.push(Row {
                    top: row_top,
                    height,
                    glyphs: index..index + 1,
                }),
            }
        }
        PlacedBlock {
            bounds: Rect::new(left, top, right, y),
            fragments,
        }
    }
}

fn fill_rows(pending: &[Pending], left: f32, right: f32) -> LineFill {
    let mut fill = LineFill::new(left, right, pending.len());
    let n = pending.len();
    let mut i = 0;
    while i < n {
        let p = &pending[i];
        if p.ch == '\n' {
            fill.place(0.0, p.height);
            fill.break_pending = true;
            i += 1;
            continue;
        }
        if p.ch.is_whitespace() {
            fill.place(p.advance, p.height);
            i += 1;
            continue;
        }
        let j = (i..n)
            .find(|&k| pending[k].ch.is_whitespace())
            .unwrap_or(n);
        let word: f32 = pending[i..j].iter().map(|p| p.advance).sum();
        if fill.break_pending {
            fill.break_pending = false;
            fill.break_row();
        }
        if !fill.at_line_start() && !fill.fits(word) {
            fill.break_row();
        }
        let too_wide = word > right - left + EPS;
        for p in &pending[i..j] {
            if too_wide && !fill.at_line_start() && !fill.fits(p.advance) {
                fill.break_row();
            }
            fill.place(p.advance, p.height);
        }
        i = j;
    }
    fill
}

impl MeasureProbe for GridSurface {
    fn measure_text_width(&self, text: &str, _font: &FontSpec) -> Result<f32, ProbeError> {
        self.check("measure")?;
        Ok(text.chars().map(|ch| self.advance_of(ch)).sum())
    }
}

impl HitTestProbe for GridSurface {
    fn point_to_node(&self, point: Point) -> Result<Option<NodeHit>, ProbeError> {
        self.check("hit-test")?;
        let Some(row) = self
            .rows
            .iter()
            .find(|r| point.y >= r.top && point.y < r.top + r.height)
        else {
            return Ok(None);
        };
        let glyphs = &self.glyphs[row.glyphs.clone()];
        let Some(last) = glyphs.last() else {
            return Ok(None);
        };
        let before = glyphs
            .iter()
            .find(|g| point.x <= g.rect.left + g.rect.width() / 2.0);
        let hit = match before {
            Some(g) => NodeHit {
                fragment: g.fragment,
                node: g.node,
                offset: g.node_offset,
            },
            // Past the end of a hard line: caret sits before the terminator.
            None if last.ch == '\n' => NodeHit {
                fragment: last.fragment,
                node: last.node,
                offset: last.node_offset,
            },
            None => NodeHit {
                fragment: last.fragment,
                node: last.node,
                offset: last.node_offset + 1,
            },
        };
        Ok(Some(hit))
    }

    fn fragment_nodes(&self, fragment: FragmentRef) -> Result<&[RenderedNode], ProbeError> {
        self.check("hit-test")?;
        self.placed(fragment).map(|p| p.nodes.as_slice())
    }
}

impl GridSurface {
    fn placed(&self, fragment: FragmentRef) -> Result<&PlacedFragment, ProbeError> {
        self.blocks
            .get(fragment.block)
            .and_then(|b| b.fragments.get(fragment.fragment))
            .ok_or(ProbeError::FragmentNotRendered(fragment))
    }
}

impl DisplaySurface for GridSurface {
    fn viewport(&self) -> Size {
        self.viewport
    }

    fn render(&mut self, blocks: &[LineBlock]) -> Result<(), ProbeError> {
        self.check("display")?;
        self.clear();
        let mut top = self.margins.top;
        for (b, block) in blocks.iter().enumerate() {
            let placed = self.layout_block(b, block, top);
            top = placed.bounds.bottom;
            self.blocks.push(placed);
        }
        self.renders += 1;
        tracing::trace!(
            target: "render.grid",
            blocks = blocks.len(),
            rows = self.rows.len(),
            bottom = top,
            "rendered"
        );
        Ok(())
    }

    fn block_bounds(&self, block: usize) -> Result<Rect, ProbeError> {
        self.check("display")?;
        self.blocks
            .get(block)
            .map(|b| b.bounds)
            .ok_or(ProbeError::FragmentNotRendered(FragmentRef::new(block, 0)))
    }

    fn fragment_bounds(&self, fragment: FragmentRef) -> Result<Rect, ProbeError> {
        self.check("display")?;
        let placed = self.placed(fragment)?;
        let mut glyphs = self.glyphs[placed.glyphs.clone()].iter();
        match glyphs.next() {
            Some(first) => Ok(glyphs.fold(first.rect, |acc, g| acc.union(&g.rect))),
            None => {
                let b = self.blocks[fragment.block].bounds;
                Ok(Rect::new(b.left, b.top, b.left, b.top))
            }
        }
    }

    fn content_bounds(&self) -> Rect {
        let left = self.margins.left;
        let right = left + self.content_width();
        let top = self.margins.top;
        let bottom = self.blocks.last().map_or(top, |b| b.bounds.bottom);
        Rect::new(left, top, right, bottom)
    }

    fn caret_rect(&self, fragment: FragmentRef, offset: usize) -> Result<Rect, ProbeError> {
        self.check("display")?;
        let placed = self.placed(fragment)?;
        let glyphs = &self.glyphs[placed.glyphs.clone()];
        let cw = self.cell.width;
        if let Some(g) = glyphs.get(offset) {
            let right = if g.rect.width() > 0.0 {
                g.rect.right
            } else {
                g.rect.left + cw
            };
            return Ok(Rect::new(g.rect.left, g.rect.top, right, g.rect.bottom));
        }
        match glyphs.last() {
            Some(g) if g.ch == '\n' => {
                let left = self.margins.left;
                Ok(Rect::new(
                    left,
                    g.rect.bottom,
                    left + cw,
                    g.rect.bottom + self.cell.height,
                ))
            }
            Some(g) => Ok(Rect::new(
                g.rect.right,
                g.rect.top,
                g.rect.right + cw,
                g.rect.bottom,
            )),
            None => {
                let b = self.blocks[fragment.block].bounds;
                Ok(Rect::new(b.left, b.top, b.left + cw, b.top + self.cell.height))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Markup;
    use core_text::SegmentId;

    fn block(markup: &Markup, texts: &[&str]) -> LineBlock {
        let mut b = LineBlock::new();
        let mut abs = 0;
        for (i, t) in texts.iter().enumerate() {
            let len = t.chars().count();
            b.push(markup.fragment(SegmentId(i as u64 + 1), 0..len, abs, t.to_string()));
            abs += len;
        }
        b
    }

    fn surface(cols: f32, rows: f32) -> GridSurface {
        GridSurface::new(Size::new(cols * 10.0, rows * 10.0), Size::new(10.0, 10.0))
    }

    #[test]
    fn wraps_whole_words_with_hanging_space() {
        let mut s = surface(10.0, 5.0);
        s.render(&[block(&Markup::plain(), &["The quick brown fox"])]).unwrap();
        assert_eq!(s.row_texts(), vec!["The quick ", "brown fox"]);
        assert_eq!(s.content_bounds().bottom, 20.0);
    }

    #[test]
    fn overwide_word_breaks_at_edge() {
        let mut s = surface(4.0, 5.0);
        s.render(&[block(&Markup::plain(), &["ab abcdefghij"])]).unwrap();
        assert_eq!(s.row_texts(), vec!["ab ", "abcd", "efgh", "ij"]);
    }

    #[test]
    fn newline_ends_row_without_trailing_row() {
        let mut s = surface(20.0, 5.0);
        s.render(&[block(&Markup::plain(), &["one\n"]), block(&Markup::plain(), &["two"])])
            .unwrap();
        assert_eq!(s.row_texts(), vec!["one\n", "two"]);
        assert_eq!(s.block_bounds(1).unwrap().top, 10.0);
    }

    #[test]
    fn words_span_fragment_boundaries() {
        let mut s = surface(6.0, 5.0);
        s.render(&[block(&Markup::plain(), &["ab he", "llo"])]).unwrap();
        assert_eq!(s.row_texts(), vec!["ab ", "hello"]);
    }

    #[test]
    fn hit_test_rounds_to_nearest_caret() {
        let mut s = surface(10.0, 5.0);
        s.render(&[block(&Markup::plain(), &["The quick brown fox"])]).unwrap();
        let at_row_start = s.point_to_node(Point::new(5.0, 15.0)).unwrap().unwrap();
        assert_eq!(at_row_start.offset, 10);
        let past_end = s.point_to_node(Point::new(100.0, 5.0)).unwrap().unwrap();
        assert_eq!(past_end.offset, 10);
        assert_eq!(s.point_to_node(Point::new(5.0, 45.0)).unwrap(), None);
    }

    #[test]
    fn emphasis_nodes_are_reported() {
        let mut s = surface(40.0, 5.0);
        s.render(&[block(&Markup::new("Chapter", true), &["a _bc_ d"])]).unwrap();
        let nodes = s.fragment_nodes(FragmentRef::new(0, 0)).unwrap();
        assert_eq!(nodes.len(), 3);
        let hit = s.point_to_node(Point::new(79.0, 5.0)).unwrap().unwrap();
        assert_eq!((hit.node, hit.offset), (2, 2));
        let mapped = crate::mapper::point_to_offset(&s, Point::new(79.0, 5.0))
            .unwrap()
            .unwrap();
        assert_eq!(mapped.offset, 8);
    }

    #[test]
    fn heading_rows_are_taller() {
        let mut s = surface(40.0, 10.0).with_heading(HeadingStyle {
            glyph_scale: 1.5,
            line_scale: 2.0,
        });
        s.render(&[
            block(&Markup::new("Chapter", false), &["Chapter 1\n"]),
            block(&Markup::plain(), &["body"]),
        ])
        .unwrap();
        assert_eq!(s.block_bounds(0).unwrap().height(), 20.0);
        assert_eq!(s.content_bounds().bottom, 30.0);
    }

    #[test]
    fn unavailable_surface_fails_queries() {
        let mut s = surface(10.0, 5.0);
        s.set_available(false);
        assert!(matches!(
            s.measure_text_width("x", &FontSpec::new("m", 10.0, 1.0)),
            Err(ProbeError::Unavailable { probe: "measure" })
        ));
        assert!(s.render(&[]).is_err());
    }

    #[test]
    fn caret_after_fragment_end() {
        let mut s = surface(10.0, 5.0);
        s.render(&[block(&Markup::plain(), &["abc"])]).unwrap();
        let r = s.caret_rect(FragmentRef::new(0, 0), 3).unwrap();
        assert_eq!((r.left, r.top), (30.0, 0.0));
    }

    #[test]
    fn margins_offset_layout() {
        let mut s = surface(20.0, 10.0).with_margins(Margins {
            left: 20.0,
            right: 30.0,
            top: 10.0,
        });
        s.render(&[block(&Markup::plain(), &["abcd efgh ijkl mnop"])]).unwrap();
        assert_eq!(s.content_width(), 150.0);
        assert_eq!(s.glyphs()[0].rect.left, 20.0);
        assert_eq!(s.glyphs()[0].rect.top, 10.0);
        assert_eq!(s.row_texts(), vec!["abcd efgh ijkl ", "mnop"]);
    }
}
