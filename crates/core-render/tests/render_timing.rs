use core_render::probe::Size;
use core_render::timing::{last_render_ns, record_last_render_ns};
use core_render::{GridSurface, Metrics, Paginator};
use core_text::SegmentStore;

fn metrics() -> Metrics {
    Metrics {
        avg_char_width: 1.0,
        line_height: 1.0,
    }
}

// Single test: the sample is process-global.
#[test]
fn pagination_records_duration_and_failures_do_not() {
    let seq = SegmentStore::from_document("hello world\nsecond paragraph\n");
    let mut surface = GridSurface::new(Size::new(80.0, 50.0), Size::new(1.0, 1.0));
    record_last_render_ns(0);
    let page = Paginator::default()
        .paginate(&seq, 0, &mut surface, &metrics())
        .unwrap();
    assert_eq!(page.blocks.len(), 2);
    assert!(last_render_ns() > 0, "pagination pass records its duration");

    let mut empty = GridSurface::new(Size::new(0.0, 50.0), Size::new(1.0, 1.0));
    record_last_render_ns(42);
    assert!(
        Paginator::default()
            .paginate(&seq, 0, &mut empty, &metrics())
            .is_err()
    );
    assert_eq!(last_render_ns(), 42);
}
