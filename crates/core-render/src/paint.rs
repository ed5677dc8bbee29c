//! Paint a `GridSurface` layout into a terminal `Frame`.
//!
//! Surface pixels map to cells by dividing by the surface cell size. Zero
//! width characters join the cluster of the preceding leader cell; line
//! terminators and other control characters are not painted.

use crate::block::FragmentStyle;
use crate::grid::GridSurface;
use crate::probe::{NodeKind, Rect};
use crate::{CellFlags, Frame};
use unicode_width::UnicodeWidthChar;

const INDICATOR_GLYPH: &str = "┃";

/// Caret and indicator overlays, in surface pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Overlay {
    pub caret: Option<Rect>,
    pub caret_visible: bool,
    pub indicator: Option<Rect>,
}

pub fn paint_frame(surface: &GridSurface, cols: u16, rows: u16, overlay: &Overlay) -> Frame {
    let mut frame = Frame::new(cols, rows);
    let cell = surface.cell();
    let to_col = |x: f32| (x / cell.width).floor().max(0.0) as u16;
    let to_row = |y: f32| (y / cell.height).floor().max(0.0) as u16;

    let mut last_leader: Option<(u16, u16)> = None;
    for glyph in surface.glyphs() {
        if glyph.ch.is_control() {
            continue;
        }
        let (x, y) = (to_col(glyph.rect.left), to_row(glyph.rect.top));
        let width = glyph.ch.width().unwrap_or(0) as u16;
        if width == 0 {
            if let Some(cell) = last_leader.and_then(|(lx, ly)| frame.cell_mut(lx, ly)) {
                cell.cluster.push(glyph.ch);
            }
            continue;
        }
        let mut flags = CellFlags::empty();
        if glyph.style == FragmentStyle::Heading {
            flags |= CellFlags::BOLD;
        }
        if glyph.node_kind == NodeKind::Element {
            flags |= CellFlags::ITALIC;
        }
        let mut buf = [0u8; 4];
        frame.set_cluster(x, y, glyph.ch.encode_utf8(&mut buf), width, flags);
        last_leader = Some((x, y));
    }

    if let Some(r) = overlay.indicator {
        let col = cols.saturating_sub(1);
        let first = to_row(r.top);
        let last = to_row((r.bottom - 0.5).max(r.top));
        for y in first..=last.min(rows.saturating_sub(1)) {
            frame.set_cluster(col, y, INDICATOR_GLYPH, 1, CellFlags::INDICATOR);
        }
    }

    if let (true, Some(r)) = (overlay.caret_visible, overlay.caret) {
        frame.apply_flags_span(
            to_col(r.left),
            to_row(r.top),
            1,
            CellFlags::REVERSE | CellFlags::CURSOR,
        );
    }
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{LineBlock, Markup};
    use crate::probe::{DisplaySurface, Size};
    use core_text::SegmentId;

    fn surface_with(text: &str) -> GridSurface {
        let mut s = GridSurface::new(Size::new(10.0, 4.0), Size::new(1.0, 1.0));
        let len = text.chars().count();
        let markup = Markup::new("Chapter", true);
        s.render(&[LineBlock::single(markup.fragment(
            SegmentId(1),
            0..len,
            0,
            text.to_string(),
        ))])
        .unwrap();
        s
    }

    #[test]
    fn glyphs_land_in_cells() {
        let s = surface_with("ab _cd_\nxy");
        let frame = paint_frame(&s, 10, 4, &Overlay::default());
        assert_eq!(&frame.line_clusters(0)[..7], &["a", "b", " ", "_", "c", "d", "_"]);
        assert_eq!(&frame.line_clusters(1)[..2], &["x", "y"]);
        assert!(frame.cells[4].flags.contains(CellFlags::ITALIC));
    }

    #[test]
    fn combining_mark_joins_leader() {
        let s = surface_with("e\u{0301}x");
        let frame = paint_frame(&s, 10, 4, &Overlay::default());
        assert_eq!(frame.line_clusters(0)[0], "e\u{0301}");
        assert_eq!(frame.line_clusters(0)[1], "x");
    }

    #[test]
    fn caret_and_indicator_overlay() {
        let s = surface_with("abc");
        let overlay = Overlay {
            caret: Some(Rect::new(1.0, 0.0, 2.0, 1.0)),
            caret_visible: true,
            indicator: Some(Rect::new(9.0, 1.0, 10.0, 3.0)),
        };
        let frame = paint_frame(&s, 10, 4, &overlay);
        assert!(frame.cells[1].flags.contains(CellFlags::REVERSE));
        assert!(frame.cells[19].flags.contains(CellFlags::INDICATOR));
        assert!(frame.cells[29].flags.contains(CellFlags::INDICATOR));
        assert!(!frame.cells[39].flags.contains(CellFlags::INDICATOR));
    }

    #[test]
    fn hidden_caret_is_not_painted() {
        let s = surface_with("abc");
        let overlay = Overlay {
            caret: Some(Rect::new(0.0, 0.0, 1.0, 1.0)),
            caret_visible: false,
            indicator: None,
        };
        let frame = paint_frame(&s, 10, 4, &overlay);
        assert!(frame.cells[0].flags.is_empty());
    }
}
