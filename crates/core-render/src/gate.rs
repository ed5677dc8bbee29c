//! Render gate: admits at most one render pass at a time.
//!
//! Competing triggers that arrive while a pass is in flight are dropped, not
//! queued; the first in-flight pass wins. The gate is an explicit two-state
//! machine so callers can hold `&mut self` on their own state between
//! `try_begin` and `finish`.
//!
//! A `ViewController` already serializes its own passes through `&mut self`,
//! so its triggers are always admitted. `dropped` only moves for hosts that
//! call back into the gate while a render is running, for example a surface
//! whose layout callback fires another navigation request.
//!
//! Counters follow the same snapshot pattern as the rest of the render
//! instrumentation.

use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GatePhase {
    #[default]
    Idle,
    Rendering,
}

#[derive(Debug, Default)]
pub struct RenderGate {
    phase: GatePhase,
    metrics: GateMetrics,
}

#[derive(Debug, Default)]
pub struct GateMetrics {
    admitted: AtomicU64,
    dropped: AtomicU64,
    failed: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GateMetricsSnapshot {
    pub admitted: u64,
    pub dropped: u64,
    pub failed: u64,
}

impl GateMetrics {
    pub fn snapshot(&self) -> GateMetricsSnapshot {
        GateMetricsSnapshot {
            admitted: self.admitted.load(Relaxed),
            dropped: self.dropped.load(Relaxed),
            failed: self.failed.load(Relaxed),
        }
    }
}

impl RenderGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> GatePhase {
        self.phase
    }

    pub fn is_rendering(&self) -> bool {
        self.phase == GatePhase::Rendering
    }

    /// Enter the rendering phase. `false` means a pass is already in flight
    /// and this trigger is dropped.
    pub fn try_begin(&mut self, trigger: &'static str) -> bool {
        match self.phase {
            GatePhase::Idle => {
                self.phase = GatePhase::Rendering;
                self.metrics.admitted.fetch_add(1, Relaxed);
                true
            }
            GatePhase::Rendering => {
                self.metrics.dropped.fetch_add(1, Relaxed);
                tracing::trace!(target: "render.gate", trigger, "dropped_reentrant");
                false
            }
        }
    }

    /// Leave the rendering phase, recording whether the pass succeeded.
    pub fn finish(&mut self, ok: bool) {
        if !ok {
            self.metrics.failed.fetch_add(1, Relaxed);
        }
        self.phase = GatePhase::Idle;
    }

    pub fn metrics(&self) -> &GateMetrics {
        &self.metrics
    }
}
