//! Scroll and navigation operations.
//!
//! Clamp rule for a requested top offset `t` (length `L`, half-viewport `H`):
//! `t` is first bounded by `L`, pulled back by `H / 2` once when it lands in
//! the last half-viewport, then bounded by `max(0, L - H)`.
//!
//! Throttling: paging and wheel input each keep one pending flag. Paging
//! input arriving while a page move is pending is dropped. Wheel input while
//! a wheel scroll is pending only replaces the pending delta, so the single
//! deferred scroll uses the most recent delta against the top offset current
//! when it fires.

use crate::ViewController;
use core_config::Config;
use core_events::{HostScheduler, InputEvent, NavKey, Task};
use core_render::mapper::{SequencePosition, point_to_offset, resolve};
use core_render::probe::{DisplaySurface, HitTestProbe, Point};
use core_text::TextSequence;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavSettings {
    pub wheel_delay: Duration,
    pub page_delay: Duration,
    /// Raw delta of one wheel detent.
    pub wheel_notch: i32,
    pub notch_divisor: i32,
}

impl Default for NavSettings {
    fn default() -> Self {
        Self {
            wheel_delay: Duration::from_millis(20),
            page_delay: Duration::from_millis(20),
            wheel_notch: 120,
            notch_divisor: 6,
        }
    }
}

impl NavSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            wheel_delay: cfg.wheel_delay(),
            page_delay: cfg.page_delay(),
            wheel_notch: cfg.file.scroll.wheel_notch,
            notch_divisor: cfg.effective.notch_divisor.max(1),
        }
    }

    /// A single detent is scaled down; any other delta passes through.
    pub fn normalize(&self, delta: i32) -> i32 {
        if self.wheel_notch != 0 && delta.abs() == self.wheel_notch.abs() {
            delta / self.notch_divisor.max(1)
        } else {
            delta
        }
    }
}

impl<S, D> ViewController<S, D>
where
    S: TextSequence,
    D: DisplaySurface + HitTestProbe,
{
    /// Move the window to `target`. Returns true when a render ran.
    ///
    /// Without `force` the call is a no-op when `target` or its clamped value
    /// equals the current top offset.
    pub fn goto_offset<H: HostScheduler + ?Sized>(
        &mut self,
        target: usize,
        force: bool,
        host: &mut H,
    ) -> bool {
        let top = self.viewport.top_offset;
        if !force && target == top {
            tracing::trace!(target: "nav", target, "goto_unchanged");
            return false;
        }
        let len = self.seq.len();
        let clamped = self.viewport.clamp_target(target, len);
        if !force && clamped == top {
            tracing::trace!(target: "nav", target, clamped, "goto_clamped_unchanged");
            return false;
        }
        tracing::debug!(target: "nav", target, clamped, len, force, "goto");
        self.render_at(clamped, "goto", host)
    }

    pub fn page_up<H: HostScheduler + ?Sized>(&mut self, host: &mut H) -> bool {
        if self.seq.is_empty() || self.viewport.top_offset == 0 {
            return false;
        }
        self.request_page(true, host)
    }

    pub fn page_down<H: HostScheduler + ?Sized>(&mut self, host: &mut H) -> bool {
        let len = self.seq.len();
        if len == 0 || self.viewport.top_offset > len.saturating_sub(self.viewport.half_port()) {
            return false;
        }
        self.request_page(false, host)
    }

    pub fn home<H: HostScheduler + ?Sized>(&mut self, host: &mut H) -> bool {
        self.goto_offset(0, false, host)
    }

    pub fn end<H: HostScheduler + ?Sized>(&mut self, host: &mut H) -> bool {
        let target = self.seq.len().saturating_sub(self.viewport.half_port());
        self.goto_offset(target, false, host)
    }

    /// Accept a raw wheel delta (positive scrolls toward the start).
    pub fn on_wheel<H: HostScheduler + ?Sized>(&mut self, delta: i32, host: &mut H) {
        let normalized = self.nav.normalize(delta);
        self.throttle.pending_wheel_delta = normalized;
        if self.throttle.wheel_pending {
            tracing::trace!(target: "nav.wheel", delta = normalized, "coalesced");
            return;
        }
        self.throttle.wheel_pending = true;
        host.schedule_after(self.nav.wheel_delay, Task::WheelScroll);
    }

    /// Re-estimate capacity from the surface's current viewport and
    /// re-render at the current top offset.
    pub fn on_resize<H: HostScheduler + ?Sized>(&mut self, host: &mut H) -> bool {
        self.viewport
            .update_geometry(self.surface.viewport(), &self.metrics);
        self.rerender_current("resize", host)
    }

    /// Map a viewport point to a sequence position and log it.
    ///
    /// A miss (or probe failure) keeps the previously known position.
    pub fn inspect_click(&mut self, point: Point) -> Option<SequencePosition> {
        let mapped = match point_to_offset(&self.surface, point) {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(target: "nav", error = %e, "click_probe_failed");
                None
            }
        };
        match mapped.and_then(|m| resolve(&self.page, m)) {
            Some(pos) => {
                tracing::info!(
                    target: "nav",
                    segment = %pos.segment,
                    segment_offset = pos.segment_offset,
                    offset = pos.offset,
                    "click"
                );
                self.last_click = Some(pos);
                Some(pos)
            }
            None => {
                tracing::warn!(
                    target: "nav",
                    x = point.x,
                    y = point.y,
                    previous = ?self.last_click.map(|p| p.offset),
                    "click_no_hit_keeping_previous"
                );
                self.last_click
            }
        }
    }

    /// Route a normalized input event. Resize events are expected to have
    /// been applied to the surface by the host already.
    pub fn handle_input<H: HostScheduler + ?Sized>(&mut self, input: InputEvent, host: &mut H) {
        match input {
            InputEvent::Wheel { delta } => self.on_wheel(delta, host),
            InputEvent::Key(NavKey::PageUp) => {
                self.page_up(host);
            }
            InputEvent::Key(NavKey::PageDown) => {
                self.page_down(host);
            }
            InputEvent::Key(NavKey::Home) => {
                self.home(host);
            }
            InputEvent::Key(NavKey::End) => {
                self.end(host);
            }
            InputEvent::Resize { .. } => {
                self.on_resize(host);
            }
            InputEvent::Click { x, y } => {
                self.inspect_click(Point::new(x, y));
            }
        }
    }

    fn request_page<H: HostScheduler + ?Sized>(&mut self, up: bool, host: &mut H) -> bool {
        if self.throttle.paging_pending {
            tracing::trace!(target: "nav", up, "page_dropped_pending");
            return false;
        }
        self.throttle.paging_pending = true;
        host.schedule_after(self.nav.page_delay, Task::PageScroll { up });
        true
    }

    pub(crate) fn fire_page<H: HostScheduler + ?Sized>(&mut self, up: bool, host: &mut H) -> bool {
        self.throttle.paging_pending = false;
        let top = self.viewport.top_offset;
        let half = self.viewport.half_port();
        let target = if up {
            top.saturating_sub(half)
        } else {
            top.saturating_add(half)
        };
        tracing::debug!(target: "nav", up, top, target, "page");
        self.goto_offset(target, false, host)
    }

    pub(crate) fn fire_wheel<H: HostScheduler + ?Sized>(&mut self, host: &mut H) -> bool {
        self.throttle.wheel_pending = false;
        let delta = i64::from(std::mem::take(&mut self.throttle.pending_wheel_delta));
        let factor = self.viewport.wheel_factor();
        let top = self.viewport.top_offset as i64;
        let target = (top - factor * delta).max(0) as usize;
        tracing::debug!(target: "nav.wheel", delta, factor, top, target, "wheel_scroll");
        self.goto_offset(target, false, host)
    }

    /// Re-render at the current top offset, pulled back only if the window
    /// would start past the last reachable half-viewport.
    pub(crate) fn rerender_current<H: HostScheduler + ?Sized>(
        &mut self,
        trigger: &'static str,
        host: &mut H,
    ) -> bool {
        let len = self.seq.len();
        let top = self.viewport.top_offset;
        let max_top = self.viewport.max_top(len);
        let top = if top > max_top {
            tracing::debug!(target: "nav", trigger, top, max_top, "top_reclamped");
            max_top
        } else {
            top
        };
        self.render_at(top, trigger, host)
    }
}
