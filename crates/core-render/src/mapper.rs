//! Coordinate ↔ offset mapping.
//!
//! `point_to_offset` asks the hit-test probe for the child node under a point
//! and converts the node-relative caret offset into a fragment-relative one by
//! walking the preceding sibling nodes and summing their rendered lengths.
//!
//! Contract:
//! - `Ok(None)` means no hit. Callers keep their previous state; it is never
//!   treated as offset 0.
//! - Probe failures propagate unchanged.
//! - `resolve` turns a fragment-relative offset into segment identity,
//!   intra-segment offset and absolute sequence offset using the page that
//!   was rendered.

use crate::block::Page;
use crate::error::ProbeError;
use crate::probe::{DisplaySurface, FragmentRef, HitTestProbe, Point};
use core_text::SegmentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappedPoint {
    pub fragment: FragmentRef,
    /// Character offset from the start of the fragment.
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencePosition {
    pub segment: SegmentId,
    pub segment_offset: usize,
    pub offset: usize,
}

pub fn point_to_offset<H: HitTestProbe + ?Sized>(
    probe: &H,
    point: Point,
) -> Result<Option<MappedPoint>, ProbeError> {
    let Some(hit) = probe.point_to_node(point)? else {
        tracing::debug!(target: "render.mapper", x = point.x, y = point.y, "no_hit");
        return Ok(None);
    };
    let nodes = probe.fragment_nodes(hit.fragment)?;
    let preceding: usize = nodes
        .iter()
        .take(hit.node)
        .map(|n| n.rendered_len)
        .sum();
    Ok(Some(MappedPoint {
        fragment: hit.fragment,
        offset: preceding + hit.offset,
    }))
}

pub fn resolve(page: &Page, mapped: MappedPoint) -> Option<SequencePosition> {
    let fragment = page
        .blocks
        .get(mapped.fragment.block)?
        .fragments
        .get(mapped.fragment.fragment)?;
    let local = mapped.offset.min(fragment.len());
    Some(SequencePosition {
        segment: fragment.segment,
        segment_offset: fragment.range.start + local,
        offset: fragment.abs_start + local,
    })
}

/// Screen position of the caret placed before the character at `offset`.
///
/// The end of the last displayed fragment is addressable too. `None` when
/// the offset is not on the page.
pub fn offset_to_point<D: DisplaySurface + ?Sized>(
    surface: &D,
    page: &Page,
    offset: usize,
) -> Result<Option<Point>, ProbeError> {
    let mut last = None;
    for (b, block) in page.blocks.iter().enumerate() {
        for (f, frag) in block.fragments.iter().enumerate() {
            let at = FragmentRef::new(b, f);
            if offset >= frag.abs_start && offset < frag.abs_end() {
                let rect = surface.caret_rect(at, offset - frag.abs_start)?;
                return Ok(Some(Point::new(rect.left, rect.top)));
            }
            last = Some((at, frag));
        }
    }
    match last {
        Some((at, frag)) if offset == frag.abs_end() => {
            let rect = surface.caret_rect(at, frag.len())?;
            Ok(Some(Point::new(rect.left, rect.top)))
        }
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{NodeHit, NodeKind, RenderedNode};

    struct Canned {
        hit: Option<NodeHit>,
        nodes: Vec<RenderedNode>,
    }

    impl HitTestProbe for Canned {
        fn point_to_node(&self, _point: Point) -> Result<Option<NodeHit>, ProbeError> {
            Ok(self.hit)
        }
        fn fragment_nodes(&self, _fragment: FragmentRef) -> Result<&[RenderedNode], ProbeError> {
            Ok(&self.nodes)
        }
    }

    #[test]
    fn sums_preceding_siblings() {
        let probe = Canned {
            hit: Some(NodeHit {
                fragment: FragmentRef::new(0, 0),
                node: 2,
                offset: 3,
            }),
            nodes: vec![
                RenderedNode {
                    kind: NodeKind::Text,
                    rendered_len: 4,
                },
                RenderedNode {
                    kind: NodeKind::Element,
                    rendered_len: 6,
                },
                RenderedNode {
                    kind: NodeKind::Text,
                    rendered_len: 10,
                },
            ],
        };
        let mapped = point_to_offset(&probe, Point::new(1.0, 1.0)).unwrap().unwrap();
        assert_eq!(mapped.offset, 13);
    }

    #[test]
    fn no_hit_is_none_not_zero() {
        let probe = Canned {
            hit: None,
            nodes: Vec::new(),
        };
        assert_eq!(point_to_offset(&probe, Point::new(-5.0, -5.0)).unwrap(), None);
    }
}
