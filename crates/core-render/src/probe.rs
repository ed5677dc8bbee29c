//! Host probe interfaces: measurement, hit-testing and the display surface.
//!
//! Any host able to lay text out and answer "what is at pixel (x, y)" can
//! back these traits. `GridSurface` is the in-tree implementation.
//!
//! Coordinates are viewport pixels with the origin at the top-left corner of
//! the viewport; `y` grows downward.

use crate::block::LineBlock;
use crate::error::ProbeError;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_drawable(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Axis-aligned bounding box; `right`/`bottom` are exclusive edges.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.left && p.x < self.right && p.y >= self.top && p.y < self.bottom
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }
}

/// Font used for measurement. Line height is `ceil(size_px * line_spacing)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub family: String,
    pub size_px: f32,
    pub line_spacing: f32,
}

impl FontSpec {
    pub fn new(family: impl Into<String>, size_px: f32, line_spacing: f32) -> Self {
        Self {
            family: family.into(),
            size_px,
            line_spacing,
        }
    }

    pub fn line_height(&self) -> f32 {
        (self.size_px * self.line_spacing).ceil()
    }
}

impl fmt::Display for FontSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}px {}", self.size_px, self.family)
    }
}

/// Address of a rendered fragment: block index, then fragment index in that block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FragmentRef {
    pub block: usize,
    pub fragment: usize,
}

impl FragmentRef {
    pub const fn new(block: usize, fragment: usize) -> Self {
        Self { block, fragment }
    }
}

impl fmt::Display for FragmentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "block {}/fragment {}", self.block, self.fragment)
    }
}

/// Kind of a direct child node of a rendered fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Raw text; contributes its character length.
    Text,
    /// Styled element; contributes its rendered text length.
    Element,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderedNode {
    pub kind: NodeKind,
    pub rendered_len: usize,
}

/// Hit-test answer: the child node of `fragment` under the point and the
/// caret offset inside that node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeHit {
    pub fragment: FragmentRef,
    pub node: usize,
    pub offset: usize,
}

pub trait MeasureProbe {
    fn measure_text_width(&self, text: &str, font: &FontSpec) -> Result<f32, ProbeError>;
}

pub trait HitTestProbe {
    /// Nearest content node at `point`, or `None` when nothing is rendered there.
    fn point_to_node(&self, point: Point) -> Result<Option<NodeHit>, ProbeError>;

    /// Direct child nodes of a rendered fragment, in document order.
    fn fragment_nodes(&self, fragment: FragmentRef) -> Result<&[RenderedNode], ProbeError>;
}

/// The single display surface. `render` replaces the previous output entirely.
pub trait DisplaySurface {
    fn viewport(&self) -> Size;

    fn render(&mut self, blocks: &[LineBlock]) -> Result<(), ProbeError>;

    fn block_bounds(&self, block: usize) -> Result<Rect, ProbeError>;

    fn fragment_bounds(&self, fragment: FragmentRef) -> Result<Rect, ProbeError>;

    /// Bounds of everything currently rendered. Zero height when empty.
    fn content_bounds(&self) -> Rect;

    /// Caret rectangle at a fragment-relative character offset.
    fn caret_rect(&self, fragment: FragmentRef, offset: usize) -> Result<Rect, ProbeError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_height_rounds_up() {
        let font = FontSpec::new("Times", 18.0, 1.25);
        assert_eq!(font.line_height(), 23.0);
        assert_eq!(font.to_string(), "18px Times");
    }

    #[test]
    fn rect_contains_is_half_open() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains(Point::new(0.0, 9.9)));
        assert!(!r.contains(Point::new(10.0, 5.0)));
        let u = r.union(&Rect::new(5.0, -2.0, 12.0, 4.0));
        assert_eq!(u, Rect::new(0.0, -2.0, 12.0, 10.0));
    }
}
