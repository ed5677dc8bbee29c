//! Scroll indicator ("lozenge") geometry.
//!
//! Height is proportional to the share of the document one viewport shows,
//! never less than 3px; its top is proportional to the top offset. Pinned to
//! the right edge of the viewport.

use crate::probe::{Rect, Size};

const MIN_HEIGHT: f32 = 3.0;
const WIDTH: f32 = 12.0;

pub fn scroll_indicator(
    top_offset: usize,
    length: usize,
    viewport_chars: usize,
    viewport: Size,
    width: Option<f32>,
) -> Option<Rect> {
    if length == 0 || !viewport.is_drawable() {
        return None;
    }
    let len = length as f32;
    let height = (viewport_chars as f32 * viewport.height / len)
        .floor()
        .max(MIN_HEIGHT)
        .min(viewport.height);
    let top = (top_offset as f32 * viewport.height / len)
        .floor()
        .min(viewport.height - height)
        .max(0.0);
    let width = width.unwrap_or(WIDTH);
    Some(Rect::new(
        viewport.width - width,
        top,
        viewport.width,
        top + height,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proportional_geometry() {
        let r = scroll_indicator(500, 1000, 100, Size::new(800.0, 600.0), None).unwrap();
        assert_eq!(r, Rect::new(788.0, 300.0, 800.0, 360.0));
    }

    #[test]
    fn minimum_height_and_empty_document() {
        let r = scroll_indicator(0, 1_000_000, 10, Size::new(80.0, 24.0), Some(1.0)).unwrap();
        assert_eq!(r.height(), 3.0);
        assert_eq!(r.left, 79.0);
        assert!(scroll_indicator(0, 0, 10, Size::new(80.0, 24.0), None).is_none());
    }

    #[test]
    fn stays_inside_viewport_at_end() {
        let r = scroll_indicator(999, 1000, 500, Size::new(80.0, 24.0), Some(1.0)).unwrap();
        assert!(r.bottom <= 24.0);
    }
}
