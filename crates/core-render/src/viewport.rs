//! Viewport state: the single mutable record owned by the view controller.
//!
//! Holds the requested top offset plus the character-capacity estimates
//! derived from the current viewport size and metrics.
//!
//! Clamp contract (`clamp_target`), with `L` the sequence length and `H` the
//! half-viewport:
//! 1. `t = min(target, L)`
//! 2. if `t >= L - H` then `t -= H / 2` (once, saturating)
//! 3. `t = min(t, max(0, L - H))`
//!
//! so `0 <= top <= max(0, L - H)` always holds.

use crate::metrics::Metrics;
use crate::probe::Size;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportState {
    /// First sequence offset the window was asked to show.
    pub top_offset: usize,
    /// First offset actually displayed after line-start snapping.
    pub adjusted_top: usize,
    pub viewport_char_estimate: usize,
    pub chars_per_line_estimate: f32,
    pub last_known_length: usize,
}

impl ViewportState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recompute capacity estimates for a viewport.
    pub fn update_geometry(&mut self, viewport: Size, metrics: &Metrics) {
        self.chars_per_line_estimate = metrics.chars_per_line(viewport.width);
        self.viewport_char_estimate = metrics.char_budget(viewport);
        tracing::debug!(
            target: "nav",
            chars_per_line = self.chars_per_line_estimate,
            viewport_chars = self.viewport_char_estimate,
            "geometry_updated"
        );
    }

    pub fn half_port(&self) -> usize {
        self.viewport_char_estimate / 2
    }

    /// Largest top offset that still leaves a half-viewport of content reachable.
    pub fn max_top(&self, len: usize) -> usize {
        len.saturating_sub(self.half_port())
    }

    pub fn clamp_target(&self, target: usize, len: usize) -> usize {
        let half = self.half_port();
        let mut t = target.min(len);
        if t >= len.saturating_sub(half) {
            t = t.saturating_sub(half / 2);
        }
        t.min(self.max_top(len))
    }

    /// Visual lines per viewport, used to scale wheel deltas.
    pub fn wheel_factor(&self) -> i64 {
        if self.chars_per_line_estimate <= 0.0 {
            return 0;
        }
        (self.viewport_char_estimate as f32 / self.chars_per_line_estimate).round() as i64
    }
}
