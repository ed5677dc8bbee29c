//! Pagination engine: decides which run of the sequence fits the viewport.
//!
//! One pass:
//! 1. Budget: `charsPerLine = width / glyphWidth`, `charBudget = charsPerLine
//!    * (height / lineHeight)`. The budget only bounds how far the walk goes.
//! 2. Walk text segments from the start offset. When the start lands inside a
//!    segment, that segment is trial-rendered alone and scanned vertically
//!    (`locate_line_start`) for the visual line containing the start, then
//!    snapped back to just after whitespace.
//! 3. Each segment's remaining text becomes a fragment of the current block;
//!    a fragment ending in `\n` closes the block.
//! 4. Once the budget is exceeded the blocks are trial-rendered. If they are
//!    still shorter than the constraint the walk continues, re-measuring about
//!    every line's worth of characters (bounded by `max_trial_passes`).
//! 5. Overflow is pruned: tail blocks are removed while their bottom edge is
//!    below the constraint; the last removed block is re-admitted fragment by
//!    fragment, and the first overflowing fragment is cut at the furthest
//!    whitespace boundary that fits (`locate_fit_end`).
//!
//! Invariants:
//! - The surface always ends the pass showing exactly the returned blocks.
//! - Realized height ≤ `floor(fit_ratio * viewport height)` unless not even a
//!   single line fits.
//! - Every cut lands immediately after whitespace, except `hard_split`
//!   fragments (one token wider than the viewport).
//! - Any probe failure aborts the pass; the caller keeps its previous page.

use crate::block::{Fragment, LineBlock, Markup, Page};
use crate::error::PaginateError;
use crate::mapper;
use crate::metrics::Metrics;
use crate::probe::{DisplaySurface, FragmentRef, HitTestProbe, Point, Rect, Size};
use crate::timing;
use core_config::Config;
use core_text::boundary::{hard_split_point, snap_after_whitespace};
use core_text::{SegmentSlice, TextSequence};
use std::cmp::Ordering;
use std::time::Instant;

/// Upper bound on "one line higher" retries when a re-admitted cut still overflows.
const MAX_FIT_ATTEMPTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaginateSettings {
    pub fit_ratio: f32,
    pub max_trial_passes: u32,
}

impl Default for PaginateSettings {
    fn default() -> Self {
        Self {
            fit_ratio: 0.95,
            max_trial_passes: 64,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Paginator {
    settings: PaginateSettings,
    markup: Markup,
}

impl Paginator {
    pub fn new(settings: PaginateSettings, markup: Markup) -> Self {
        Self { settings, markup }
    }

    pub fn from_config(cfg: &Config) -> Self {
        let style = &cfg.file.style;
        Self::new(
            PaginateSettings {
                fit_ratio: cfg.effective.fit_ratio,
                max_trial_passes: cfg.file.layout.max_trial_passes.max(1),
            },
            Markup::new(&style.heading_marker, style.emphasis),
        )
    }

    pub fn settings(&self) -> PaginateSettings {
        self.settings
    }

    pub fn markup(&self) -> &Markup {
        &self.markup
    }

    /// Bottom edge (viewport pixels) the realized layout must not exceed.
    pub fn constraint(&self, viewport: Size) -> f32 {
        (viewport.height * self.settings.fit_ratio).floor()
    }

    pub fn paginate<S, D>(
        &self,
        seq: &S,
        start: usize,
        surface: &mut D,
        metrics: &Metrics,
    ) -> Result<Page, PaginateError>
    where
        S: TextSequence + ?Sized,
        D: DisplaySurface + HitTestProbe + ?Sized,
    {
        let started = Instant::now();
        let viewport = surface.viewport();
        if !viewport.is_drawable() {
            return Err(PaginateError::EmptyViewport {
                width: viewport.width,
                height: viewport.height,
            });
        }
        let metrics = metrics.validate()?;
        let len = seq.len();
        if start >= len {
            surface.render(&[])?;
            tracing::debug!(target: "render.paginate", start, len, "empty_window");
            return Ok(Page::empty(start.min(len)));
        }

        let chars_per_line = metrics.chars_per_line(viewport.width);
        let budget = metrics.char_budget(viewport).max(1);
        let step = (chars_per_line.ceil() as usize).max(1);
        let constraint = self.constraint(viewport);

        let mut blocks = vec![LineBlock::new()];
        let mut first_offset = None;
        let mut count = 0usize;
        let mut check_at = budget;
        let mut passes = 0u32;
        let mut overflowed = false;
        let mut shown = false;

        for slice in seq.segments_from(start) {
            let seg = slice.segment;
            if !seg.is_text() || seg.is_empty() {
                continue;
            }
            let from = if first_offset.is_none() && slice.skip > 0 {
                self.locate_line_start(surface, &slice, &metrics)?
            } else {
                slice.skip
            };
            let text = seg.slice(from..seg.len());
            if text.is_empty() {
                continue;
            }
            let abs = slice.start + from;
            first_offset.get_or_insert(abs);
            let fragment = self
                .markup
                .fragment(seg.id(), from..seg.len(), abs, text.to_string());
            let closes = fragment.ends_line();
            count += fragment.len();
            if let Some(block) = blocks.last_mut() {
                block.push(fragment);
            }
            if closes {
                blocks.push(LineBlock::new());
            }
            shown = false;

            if count > check_at {
                passes += 1;
                surface.render(without_open_tail(&blocks))?;
                shown = true;
                if surface.content_bounds().bottom > constraint {
                    overflowed = true;
                    break;
                }
                if passes >= self.settings.max_trial_passes {
                    tracing::debug!(target: "render.paginate", passes, count, "trial_pass_limit");
                    break;
                }
                check_at = count + step;
            }
        }
        if blocks.last().is_some_and(LineBlock::is_empty) {
            blocks.pop();
        }
        if !shown {
            passes += 1;
            surface.render(&blocks)?;
            overflowed = surface.content_bounds().bottom > constraint;
        }
        if overflowed {
            blocks = self.prune(surface, blocks, constraint, &metrics)?;
        }

        let first_offset = first_offset.unwrap_or(start);
        let end_offset = blocks
            .last()
            .and_then(|b| b.fragments.last())
            .map_or(first_offset, Fragment::abs_end);
        let page = Page {
            blocks,
            requested_offset: start,
            first_offset,
            end_offset,
            height: surface.content_bounds().height(),
            pruned: overflowed,
            trial_passes: passes,
        };
        let elapsed = started.elapsed().as_nanos() as u64;
        timing::record_last_render_ns(elapsed);
        tracing::debug!(
            target: "render.paginate",
            start,
            first_offset,
            end_offset,
            blocks = page.blocks.len(),
            passes,
            pruned = overflowed,
            height = page.height,
            constraint,
            elapsed_ns = elapsed,
            "paginated"
        );
        Ok(page)
    }

    /// Start of the visual line containing `slice.skip`, snapped back to just
    /// after whitespace. Renders the whole segment as a probe layout.
    pub fn locate_line_start<D>(
        &self,
        surface: &mut D,
        slice: &SegmentSlice<'_>,
        metrics: &Metrics,
    ) -> Result<usize, PaginateError>
    where
        D: DisplaySurface + HitTestProbe + ?Sized,
    {
        let seg = slice.segment;
        let probe = self
            .markup
            .fragment(seg.id(), 0..seg.len(), slice.start, seg.as_str().to_string());
        surface.render(&[LineBlock::single(probe)])?;
        let bounds = surface.block_bounds(0)?;
        let at = FragmentRef::new(0, 0);

        let x = bounds.left + (metrics.avg_char_width / 2.0).floor();
        let mut y = bounds.top + (metrics.line_height / 2.0).floor();
        let mut line_start = 0usize;
        while y < bounds.bottom {
            let Some(hit) = mapper::point_to_offset(&*surface, Point::new(x, y))? else {
                tracing::warn!(target: "render.paginate", segment = %seg.id(), y, "line_scan_no_hit");
                break;
            };
            if hit.fragment != at || hit.offset > slice.skip {
                break;
            }
            line_start = hit.offset;
            y += metrics.line_height;
        }
        let snapped = snap_after_whitespace(seg.as_str(), line_start);
        tracing::trace!(
            target: "render.paginate",
            segment = %seg.id(),
            skip = slice.skip,
            line_start,
            snapped,
            "line_start"
        );
        Ok(snapped)
    }

    /// Furthest cut inside `fragment` that ends on the probe line, snapped
    /// back to just after whitespace. Probes once at the fragment's right
    /// edge. Returns `(cut, hard_split)`, or `None` when nothing fits.
    pub fn locate_fit_end<H>(
        &self,
        probe: &H,
        fragment: &Fragment,
        at: FragmentRef,
        bounds: Rect,
        probe_y: f32,
    ) -> Result<Option<(usize, bool)>, PaginateError>
    where
        H: HitTestProbe + ?Sized,
    {
        let Some(hit) = mapper::point_to_offset(probe, Point::new(bounds.right, probe_y))? else {
            tracing::warn!(target: "render.prune", segment = %fragment.segment, probe_y, "fit_probe_no_hit");
            return Ok(None);
        };
        let len = fragment.len();
        let p = match hit.fragment.cmp(&at) {
            Ordering::Equal => hit.offset.min(len),
            Ordering::Greater => len,
            Ordering::Less => 0,
        };
        if p >= len {
            return Ok(Some((len, false)));
        }
        let cut = snap_after_whitespace(&fragment.text, p + 1);
        if cut > 0 {
            return Ok(Some((cut, false)));
        }
        if p == 0 {
            return Ok(None);
        }
        let hard = hard_split_point(&fragment.text, p);
        tracing::debug!(
            target: "render.prune",
            segment = %fragment.segment,
            cut = hard,
            "unsplittable_token"
        );
        Ok(Some((hard, true)))
    }

    /// Trim an overflowing trial layout (currently on the surface) to the constraint.
    fn prune<D>(
        &self,
        surface: &mut D,
        mut blocks: Vec<LineBlock>,
        constraint: f32,
        metrics: &Metrics,
    ) -> Result<Vec<LineBlock>, PaginateError>
    where
        D: DisplaySurface + HitTestProbe + ?Sized,
    {
        let total = blocks.len();
        let mut keep = total;
        while keep > 0 && surface.block_bounds(keep - 1)?.bottom > constraint {
            keep -= 1;
        }
        let Some(source) = blocks.split_off(keep).into_iter().next() else {
            surface.render(&blocks)?;
            return Ok(blocks);
        };

        let mut partial = LineBlock::new();
        let mut overflow = None;
        for (f, fragment) in source.fragments.iter().enumerate() {
            let at = FragmentRef::new(keep, f);
            let bounds = surface.fragment_bounds(at)?;
            if bounds.bottom <= constraint {
                partial.push(fragment.clone());
                continue;
            }
            overflow = Some((fragment, at, bounds));
            break;
        }

        if let Some((fragment, mut at, mut bounds)) = overflow {
            let mut probe_y = constraint - metrics.line_height / 2.0;
            for _ in 0..MAX_FIT_ATTEMPTS {
                // A row must end on or above the constraint to be re-admitted.
                if probe_y <= bounds.top {
                    break;
                }
                let Some((cut, hard)) =
                    self.locate_fit_end(&*surface, fragment, at, bounds, probe_y)?
                else {
                    break;
                };
                let mut candidate = partial.clone();
                candidate.push(fragment.truncated(cut, hard));
                blocks.push(candidate);
                surface.render(&blocks)?;
                if surface.content_bounds().bottom <= constraint {
                    tracing::debug!(
                        target: "render.prune",
                        removed = total - keep,
                        readmitted = blocks.last().map_or(0, LineBlock::char_len),
                        cut,
                        hard,
                        "pruned"
                    );
                    return Ok(blocks);
                }
                blocks.pop();
                at = FragmentRef::new(keep, partial.fragments.len());
                bounds = surface.fragment_bounds(at)?;
                probe_y -= metrics.line_height;
            }
        }

        if !partial.is_empty() {
            blocks.push(partial);
        }
        if blocks.is_empty() {
            return self.first_line_only(surface, source, metrics);
        }
        surface.render(&blocks)?;
        tracing::debug!(
            target: "render.prune",
            removed = total - keep,
            readmitted = if blocks.len() > keep { blocks[keep].char_len() } else { 0 },
            "pruned"
        );
        Ok(blocks)
    }

    /// Nothing fits under the constraint: keep the first visual line so a
    /// non-empty sequence never paginates to nothing.
    fn first_line_only<D>(
        &self,
        surface: &mut D,
        source: LineBlock,
        metrics: &Metrics,
    ) -> Result<Vec<LineBlock>, PaginateError>
    where
        D: DisplaySurface + HitTestProbe + ?Sized,
    {
        let Some(first) = source.fragments.first() else {
            surface.render(&[])?;
            return Ok(Vec::new());
        };
        surface.render(&[LineBlock::single(first.clone())])?;
        let at = FragmentRef::new(0, 0);
        let bounds = surface.fragment_bounds(at)?;
        let probe_y = bounds.top + (metrics.line_height / 2.0).min(bounds.height() / 2.0);
        let kept = match self.locate_fit_end(&*surface, first, at, bounds, probe_y)? {
            Some((cut, hard)) => first.truncated(cut, hard),
            None => first.clone(),
        };
        tracing::warn!(
            target: "render.prune",
            kept = kept.len(),
            viewport_height = surface.viewport().height,
            "viewport_below_line_height"
        );
        let blocks = vec![LineBlock::single(kept)];
        surface.render(&blocks)?;
        Ok(blocks)
    }
}

fn without_open_tail(blocks: &[LineBlock]) -> &[LineBlock] {
    match blocks.split_last() {
        Some((last, rest)) if last.is_empty() => rest,
        _ => blocks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridSurface;
    use core_text::SegmentStore;

    fn metrics() -> Metrics {
        Metrics {
            avg_char_width: 10.0,
            line_height: 10.0,
        }
    }

    fn grid(cols: f32, rows: f32) -> GridSurface {
        GridSurface::new(Size::new(cols * 10.0, rows * 10.0), Size::new(10.0, 10.0))
    }

    #[test]
    fn line_start_scan_finds_visual_row() {
        let mut store = SegmentStore::new();
        store.append_text("aaaa bbbb cccc dddd");
        let mut surface = grid(10.0, 10.0);
        let slice = store.segments_from(12).next().unwrap();
        let start = Paginator::default()
            .locate_line_start(&mut surface, &slice, &metrics())
            .unwrap();
        assert_eq!(start, 10, "row two opens at 'cccc'");
    }

    #[test]
    fn line_start_snaps_back_over_partial_word() {
        let mut store = SegmentStore::new();
        store.append_text("aaaaaaaaaaaaaa bb");
        let mut surface = grid(10.0, 10.0);
        let slice = store.segments_from(12).next().unwrap();
        let start = Paginator::default()
            .locate_line_start(&mut surface, &slice, &metrics())
            .unwrap();
        assert_eq!(start, 0, "hard-wrapped token has no whitespace before it");
    }

    #[test]
    fn fit_end_cuts_after_whitespace() {
        let mut store = SegmentStore::new();
        store.append_text("The quick brown fox");
        let mut surface = grid(10.0, 10.0);
        let page = Paginator::default()
            .paginate(&store, 0, &mut surface, &metrics())
            .unwrap();
        let fragment = &page.blocks[0].fragments[0];
        let at = FragmentRef::new(0, 0);
        let bounds = surface.fragment_bounds(at).unwrap();
        let cut = Paginator::default()
            .locate_fit_end(&surface, fragment, at, bounds, 5.0)
            .unwrap();
        assert_eq!(cut, Some((10, false)));
    }

    #[test]
    fn readmits_row_ending_exactly_on_constraint() {
        let mut store = SegmentStore::new();
        for _ in 0..18 {
            store.append_text("aaaa bbb\n");
        }
        store.append_text("cccc dddd eeee ffff gggg hhhh");
        let mut surface = grid(10.0, 20.0);
        let paginator = Paginator::default();
        let page = paginator
            .paginate(&store, 0, &mut surface, &metrics())
            .unwrap();
        let constraint = paginator.constraint(surface.viewport());
        assert_eq!(constraint, 190.0);
        assert!(page.pruned);
        assert_eq!(page.blocks.len(), 19);
        assert_eq!(page.blocks[18].text(), "cccc dddd ");
        assert_eq!(page.height, constraint);
        assert_eq!(page.end_offset, 18 * 9 + 10);
    }

    #[test]
    fn open_tail_is_not_rendered() {
        let blocks = vec![LineBlock::new(), LineBlock::new()];
        assert_eq!(without_open_tail(&blocks).len(), 1);
        assert!(without_open_tail(&[]).is_empty());
    }
}
