//! Render timing instrumentation.
//!
//! Captures the duration of the last completed pagination pass in
//! nanoseconds. A point sample only; no averaging.
use std::sync::atomic::{AtomicU64, Ordering};

static LAST_RENDER_NS: AtomicU64 = AtomicU64::new(0);

/// Record a pagination duration in nanoseconds.
pub fn record_last_render_ns(ns: u64) {
    LAST_RENDER_NS.store(ns, Ordering::Relaxed);
}

/// Fetch the last recorded pagination duration in nanoseconds.
pub fn last_render_ns() -> u64 {
    LAST_RENDER_NS.load(Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn store_and_load_nonzero() {
        record_last_render_ns(1234);
        assert_eq!(last_render_ns(), 1234);
    }
}
