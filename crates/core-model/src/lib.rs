//! View model: the controller that owns one attached document window.
//!
//! `ViewController` ties the pagination engine to user input and to the
//! backing sequence. It owns the sequence, the display surface, the viewport
//! state and the page currently shown, and exposes named operations instead
//! of handlers closing over shared state:
//!
//! * Navigation (`navigation` module): `goto_offset`, `page_up`,
//!   `page_down`, `home`, `end`, `on_wheel`, `on_resize`, click inspection.
//! * Caret blink (`blink` module): restarted whenever a new page is attached.
//! * Edit reactivity (`reactivity` module): change notifications from the
//!   sequence schedule at most one re-render per frame.
//!
//! Deferred work is scheduled on a `HostScheduler` as plain `Task` values and
//! dispatched back through [`ViewController::run_task`]. Handlers re-read the
//! controller's current state when they run, so anything that happened in
//! between (edits, other scrolls) is picked up rather than overwritten.
//!
//! Render failures never blank the view: the previous page stays displayed
//! and the top offset is left untouched.
//!
//! Lifecycle: `new` (detached) → `attach` (first render) → ... →
//! `into_parts` (detached again, returning sequence and surface).

pub mod blink;
pub mod navigation;
pub mod reactivity;

use blink::{BlinkSettings, CaretBlink};
use core_config::Config;
use core_events::{HostScheduler, Task};
use core_render::gate::{GateMetricsSnapshot, RenderGate};
use core_render::indicator::scroll_indicator;
use core_render::mapper::SequencePosition;
use core_render::paint::Overlay;
use core_render::probe::{DisplaySurface, FragmentRef, HitTestProbe, Rect};
use core_render::{Metrics, Page, Paginator, ViewportState};
use core_text::{SequenceChange, TextSequence};
use crossbeam_channel::Receiver;
use std::time::Duration;

pub use blink::CaretPhase;
pub use navigation::NavSettings;

/// Throttle flags for deferred navigation. Each kind throttles independently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Throttle {
    pub wheel_pending: bool,
    /// Most recent normalized wheel delta; read when the wheel task fires.
    pub pending_wheel_delta: i32,
    pub paging_pending: bool,
    pub render_pending: bool,
}

pub struct ViewController<S, D> {
    seq: S,
    surface: D,
    paginator: Paginator,
    metrics: Metrics,
    viewport: ViewportState,
    gate: RenderGate,
    page: Page,
    nav: NavSettings,
    throttle: Throttle,
    caret: CaretBlink,
    changes: Option<Receiver<SequenceChange>>,
    last_click: Option<SequencePosition>,
    renders: u64,
}

impl<S, D> ViewController<S, D>
where
    S: TextSequence,
    D: DisplaySurface + HitTestProbe,
{
    pub fn new(
        seq: S,
        surface: D,
        paginator: Paginator,
        metrics: Metrics,
        nav: NavSettings,
        blink: BlinkSettings,
    ) -> Self {
        Self {
            seq,
            surface,
            paginator,
            metrics,
            viewport: ViewportState::new(),
            gate: RenderGate::new(),
            page: Page::empty(0),
            nav,
            throttle: Throttle::default(),
            caret: CaretBlink::new(blink),
            changes: None,
            last_click: None,
            renders: 0,
        }
    }

    pub fn from_config(cfg: &Config, seq: S, surface: D, metrics: Metrics) -> Self {
        Self::new(
            seq,
            surface,
            Paginator::from_config(cfg),
            metrics,
            NavSettings::from_config(cfg),
            BlinkSettings::from_config(cfg),
        )
    }

    /// Compute geometry estimates and render the window at offset 0.
    pub fn attach<H: HostScheduler + ?Sized>(&mut self, host: &mut H) -> bool {
        self.viewport
            .update_geometry(self.surface.viewport(), &self.metrics);
        tracing::info!(
            target: "nav",
            len = self.seq.len(),
            viewport_chars = self.viewport.viewport_char_estimate,
            "attach"
        );
        self.render_at(0, "attach", host)
    }

    /// Detach, handing back the sequence and the surface.
    pub fn into_parts(self) -> (S, D) {
        (self.seq, self.surface)
    }

    pub fn sequence(&self) -> &S {
        &self.seq
    }

    /// Mutable sequence access. Edits are picked up through the change
    /// channel registered with `watch`.
    pub fn sequence_mut(&mut self) -> &mut S {
        &mut self.seq
    }

    pub fn surface(&self) -> &D {
        &self.surface
    }

    /// Mutable surface access for host-side changes (resize, margins).
    /// Follow a size change with `on_resize`.
    pub fn surface_mut(&mut self) -> &mut D {
        &mut self.surface
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    pub fn top_offset(&self) -> usize {
        self.viewport.top_offset
    }

    pub fn metrics(&self) -> Metrics {
        self.metrics
    }

    /// Replace the font metrics; takes effect on the next `on_resize`.
    pub fn set_metrics(&mut self, metrics: Metrics) {
        self.metrics = metrics;
    }

    pub fn throttle(&self) -> Throttle {
        self.throttle
    }

    pub fn caret(&self) -> &CaretBlink {
        &self.caret
    }

    pub fn last_click(&self) -> Option<SequencePosition> {
        self.last_click
    }

    /// Number of successful render passes.
    pub fn render_count(&self) -> u64 {
        self.renders
    }

    pub fn gate_metrics(&self) -> GateMetricsSnapshot {
        self.gate.metrics().snapshot()
    }

    pub fn wheel_delay(&self) -> Duration {
        self.nav.wheel_delay
    }

    /// Dispatch a deferred task previously scheduled by this controller.
    pub fn run_task<H: HostScheduler + ?Sized>(&mut self, task: Task, host: &mut H) -> bool {
        match task {
            Task::WheelScroll => self.fire_wheel(host),
            Task::PageScroll { up } => self.fire_page(up, host),
            Task::BlinkTick { generation } => self.caret.on_tick(generation, host),
            Task::ChangeRender => self.fire_change_render(host),
        }
    }

    /// Caret rectangle at the start of the first displayed fragment.
    pub fn caret_rect(&self) -> Option<Rect> {
        if self.page.is_empty() {
            return None;
        }
        match self.surface.caret_rect(FragmentRef::new(0, 0), 0) {
            Ok(rect) => Some(rect),
            Err(e) => {
                tracing::debug!(target: "caret.blink", error = %e, "caret_unavailable");
                None
            }
        }
    }

    /// Caret and scroll indicator overlays for the current page.
    pub fn overlay(&self, indicator_width: Option<f32>) -> Overlay {
        Overlay {
            caret: self.caret_rect(),
            caret_visible: self.caret.is_visible(),
            indicator: scroll_indicator(
                self.viewport.top_offset,
                self.seq.len(),
                self.viewport.viewport_char_estimate,
                self.surface.viewport(),
                indicator_width,
            ),
        }
    }

    /// Render the window starting at `top` without clamping. On failure the
    /// previous page is put back on the surface and state is unchanged.
    fn render_at<H: HostScheduler + ?Sized>(
        &mut self,
        top: usize,
        trigger: &'static str,
        host: &mut H,
    ) -> bool {
        if !self.gate.try_begin(trigger) {
            return false;
        }
        let len = self.seq.len();
        let result = self
            .paginator
            .paginate(&self.seq, top, &mut self.surface, &self.metrics);
        match result {
            Ok(page) => {
                self.gate.finish(true);
                self.viewport.top_offset = page.requested_offset;
                self.viewport.adjusted_top = page.first_offset;
                self.viewport.last_known_length = len;
                tracing::debug!(
                    target: "nav",
                    trigger,
                    top = page.requested_offset,
                    first = page.first_offset,
                    end = page.end_offset,
                    blocks = page.blocks.len(),
                    "window_rendered"
                );
                let attach_caret = !page.is_empty();
                self.page = page;
                self.renders += 1;
                if attach_caret {
                    self.caret.restart(host);
                }
                true
            }
            Err(e) => {
                self.gate.finish(false);
                tracing::warn!(target: "nav", trigger, top, error = %e, "render_failed_keeping_previous");
                if let Err(e) = self.surface.render(&self.page.blocks) {
                    tracing::warn!(target: "nav", error = %e, "restore_previous_failed");
                }
                false
            }
        }
    }
}
