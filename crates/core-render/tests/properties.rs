//! Property tests: fit, maximality, word-boundary cuts and mapper round trip.

use core_render::mapper::{point_to_offset, resolve};
use core_render::probe::{DisplaySurface, Point, Size};
use core_render::{GridSurface, LineBlock, Markup, Metrics, Page, Paginator};
use core_text::{SegmentStore, TextSequence};
use proptest::prelude::*;

const CELL: f32 = 10.0;

fn metrics() -> Metrics {
    Metrics {
        avg_char_width: CELL,
        line_height: CELL,
    }
}

fn grid(cols: u16, rows: u16) -> GridSurface {
    GridSurface::new(
        Size::new(f32::from(cols) * CELL, f32::from(rows) * CELL),
        Size::new(CELL, CELL),
    )
}

fn paragraphs() -> impl Strategy<Value = Vec<Vec<String>>> {
    prop::collection::vec(prop::collection::vec("[a-z]{1,8}", 1..30), 1..8)
}

fn build(paras: &[Vec<String>]) -> SegmentStore {
    let mut s = SegmentStore::new();
    for p in paras {
        s.append_text(&format!("{}\n", p.join(" ")));
    }
    s
}

fn char_at(seq: &SegmentStore, offset: usize) -> Option<char> {
    seq.text_range(offset..offset + 1).chars().next()
}

fn check_contiguous(page: &Page) -> Result<(), TestCaseError> {
    let mut expect = page.first_offset;
    for f in page.fragments() {
        prop_assert_eq!(f.abs_start, expect);
        expect = f.abs_end();
    }
    prop_assert_eq!(expect, page.end_offset);
    Ok(())
}

/// End of the word starting at `from`, plus the whitespace after it.
fn next_word_end(chars: &[char], from: usize) -> usize {
    let mut next = from;
    while next < chars.len() && !chars[next].is_whitespace() {
        next += 1;
    }
    while next < chars.len() && chars[next].is_whitespace() {
        next += 1;
    }
    next
}

/// The page's blocks with the next word of the sequence appended.
fn with_next_word(seq: &SegmentStore, page: &Page) -> Vec<LineBlock> {
    let chars: Vec<char> = seq.text_range(0..seq.len()).chars().collect();
    let next = next_word_end(&chars, page.end_offset);
    let mut blocks = page.blocks.clone();
    let last = page.fragments().last().cloned();
    match last {
        Some(f) if !f.ends_line() => {
            let text: String = chars[f.abs_start..next].iter().collect();
            let end = f.range.start + (next - f.abs_start);
            if let Some(block) = blocks.last_mut() {
                block.fragments.pop();
                block.push(Markup::plain().fragment(
                    f.segment,
                    f.range.start..end,
                    f.abs_start,
                    text,
                ));
            }
        }
        _ => {
            let slice = seq.segments_from(page.end_offset).next().unwrap();
            let text: String = chars[slice.start..next].iter().collect();
            blocks.push(LineBlock::single(Markup::plain().fragment(
                slice.segment.id(),
                0..next - slice.start,
                slice.start,
                text,
            )));
        }
    }
    blocks
}

proptest! {
    #[test]
    fn pruned_layout_fits_and_cuts_after_whitespace(
        paras in paragraphs(),
        cols in 10u16..40,
        rows in 3u16..14,
        start_pct in 0usize..100,
    ) {
        let seq = build(&paras);
        let start = seq.len() * start_pct / 100;
        let mut surface = grid(cols, rows);
        let paginator = Paginator::default();
        let page = paginator.paginate(&seq, start, &mut surface, &metrics()).unwrap();
        let constraint = paginator.constraint(surface.viewport());

        prop_assert!(!page.is_empty());
        prop_assert!(page.height <= constraint);
        prop_assert_eq!(surface.content_bounds().height(), page.height);
        prop_assert!(page.first_offset <= start);
        check_contiguous(&page)?;

        let first = page.fragments().next().unwrap();
        if first.range.start > 0 {
            prop_assert!(char_at(&seq, first.abs_start - 1).unwrap().is_whitespace());
        }
        let last = page.fragments().last().unwrap();
        let seg_len = seq.segment(last.segment).unwrap().len();
        if last.range.end < seg_len && !last.hard_split {
            prop_assert!(char_at(&seq, last.abs_end() - 1).unwrap().is_whitespace());
        }
    }

    #[test]
    fn pruning_is_maximal_for_a_single_paragraph(
        words in prop::collection::vec("[a-z]{1,8}", 20..200),
        cols in 10u16..30,
        rows in 3u16..10,
    ) {
        let text = words.join(" ");
        let mut seq = SegmentStore::new();
        let id = seq.append_text(&text).unwrap();
        let mut surface = grid(cols, rows);
        let paginator = Paginator::default();
        let page = paginator.paginate(&seq, 0, &mut surface, &metrics()).unwrap();
        let constraint = paginator.constraint(surface.viewport());
        prop_assume!(page.end_offset < seq.len());

        // Extend the shown text by the next word (and its trailing space).
        let chars: Vec<char> = text.chars().collect();
        let mut next = page.end_offset;
        while next < chars.len() && !chars[next].is_whitespace() {
            next += 1;
        }
        while next < chars.len() && chars[next].is_whitespace() {
            next += 1;
        }
        let longer: String = chars[..next].iter().collect();
        let frag = Markup::plain().fragment(id, 0..next, 0, longer);
        surface.render(&[LineBlock::single(frag)]).unwrap();
        prop_assert!(surface.content_bounds().bottom > constraint);
    }

    #[test]
    fn pruning_is_maximal_across_paragraphs(
        paras in prop::collection::vec(prop::collection::vec("[a-z]{1,8}", 1..12), 4..24),
        cols in 10u16..30,
        rows in 3u16..12,
        start_pct in 1usize..60,
    ) {
        let seq = build(&paras);
        let start = seq.len() * start_pct / 100;
        let mut surface = grid(cols, rows);
        let paginator = Paginator::default();
        let page = paginator.paginate(&seq, start, &mut surface, &metrics()).unwrap();
        let constraint = paginator.constraint(surface.viewport());
        prop_assume!(page.end_offset < seq.len());
        prop_assume!(!page.fragments().any(|f| f.hard_split));

        surface.render(&with_next_word(&seq, &page)).unwrap();
        prop_assert!(surface.content_bounds().bottom > constraint);
    }

    #[test]
    fn mapped_points_resolve_to_rendered_fragment(
        paras in paragraphs(),
        cols in 10u16..40,
        rows in 3u16..14,
        pick in any::<prop::sample::Index>(),
    ) {
        let seq = build(&paras);
        let mut surface = grid(cols, rows);
        let page = Paginator::default().paginate(&seq, 0, &mut surface, &metrics()).unwrap();
        let glyphs: Vec<_> = surface
            .glyphs()
            .iter()
            .filter(|g| g.rect.width() > 0.0)
            .copied()
            .collect();
        prop_assume!(!glyphs.is_empty());
        let g = glyphs[pick.index(glyphs.len())];
        let point = Point::new(g.rect.left + g.rect.width() / 4.0, g.rect.top + 1.0);
        let mapped = point_to_offset(&surface, point).unwrap().unwrap();
        prop_assert_eq!(mapped.fragment, g.fragment);
        let pos = resolve(&page, mapped).unwrap();
        let frag = &page.blocks[g.fragment.block].fragments[g.fragment.fragment];
        prop_assert_eq!(pos.segment, frag.segment);
        prop_assert!(frag.range.contains(&pos.segment_offset));
        prop_assert_eq!(char_at(&seq, pos.offset), Some(g.ch));
        prop_assert_eq!(seq.offset_of(pos.segment).unwrap() + pos.segment_offset, pos.offset);
    }
}
