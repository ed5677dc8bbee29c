//! Caret blink state machine.
//!
//! The caret toggles between visible and hidden on a fixed interval for a
//! bounded number of toggles, then settles visible with no timer pending.
//! Every restart bumps a generation token; ticks carrying an older token are
//! ignored, so a restart never races a tick scheduled by an earlier run.

use core_config::Config;
use core_events::{HostScheduler, Task};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaretPhase {
    Visible,
    Hidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkSettings {
    pub interval: Duration,
    pub toggles: u32,
}

impl Default for BlinkSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            toggles: 30,
        }
    }
}

impl BlinkSettings {
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            interval: cfg.blink_interval(),
            toggles: cfg.file.cursor.blink_toggles,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CaretBlink {
    settings: BlinkSettings,
    phase: CaretPhase,
    remaining: u32,
    generation: u64,
    running: bool,
}

impl CaretBlink {
    pub fn new(settings: BlinkSettings) -> Self {
        Self {
            settings,
            phase: CaretPhase::Visible,
            remaining: 0,
            generation: 0,
            running: false,
        }
    }

    pub fn phase(&self) -> CaretPhase {
        self.phase
    }

    pub fn is_visible(&self) -> bool {
        self.phase == CaretPhase::Visible
    }

    /// True while a tick is outstanding.
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Reset the counter and start blinking from visible.
    pub fn restart<H: HostScheduler + ?Sized>(&mut self, host: &mut H) {
        self.generation += 1;
        self.phase = CaretPhase::Visible;
        self.remaining = self.settings.toggles;
        self.running = self.remaining > 0 && !self.settings.interval.is_zero();
        if self.running {
            host.schedule_after(
                self.settings.interval,
                Task::BlinkTick {
                    generation: self.generation,
                },
            );
        }
        tracing::trace!(
            target: "caret.blink",
            generation = self.generation,
            toggles = self.remaining,
            "restart"
        );
    }

    /// Handle a tick. Returns true when the visible phase changed.
    pub fn on_tick<H: HostScheduler + ?Sized>(&mut self, generation: u64, host: &mut H) -> bool {
        if generation != self.generation || !self.running {
            tracing::trace!(
                target: "caret.blink",
                stale = generation,
                current = self.generation,
                "stale_tick"
            );
            return false;
        }
        let before = self.phase;
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.phase = CaretPhase::Visible;
            self.running = false;
            tracing::debug!(target: "caret.blink", generation, "settled");
        } else {
            self.phase = match self.phase {
                CaretPhase::Visible => CaretPhase::Hidden,
                CaretPhase::Hidden => CaretPhase::Visible,
            };
            host.schedule_after(self.settings.interval, Task::BlinkTick { generation });
        }
        before != self.phase
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_events::TaskQueue;

    fn drain(blink: &mut CaretBlink, q: &mut TaskQueue) -> u32 {
        let mut ticks = 0;
        while let Some(at) = q.next_deadline() {
            q.advance_to(at);
            while let Some(Task::BlinkTick { generation }) = q.pop_due() {
                blink.on_tick(generation, q);
                ticks += 1;
            }
        }
        ticks
    }

    #[test]
    fn settles_visible_after_bounded_toggles() {
        let mut q = TaskQueue::new();
        let mut blink = CaretBlink::new(BlinkSettings::default());
        blink.restart(&mut q);
        assert!(blink.is_running());
        assert_eq!(drain(&mut blink, &mut q), 30);
        assert!(blink.is_visible());
        assert!(!blink.is_running());
        assert!(q.is_idle(), "no timer after settling");
        assert_eq!(q.now(), Duration::from_millis(15_000));
    }

    #[test]
    fn odd_toggle_count_still_ends_visible() {
        let mut q = TaskQueue::new();
        let mut blink = CaretBlink::new(BlinkSettings {
            interval: Duration::from_millis(100),
            toggles: 3,
        });
        blink.restart(&mut q);
        q.advance_by(Duration::from_millis(100));
        let Some(Task::BlinkTick { generation }) = q.pop_due() else {
            panic!("tick expected");
        };
        assert!(blink.on_tick(generation, &mut q));
        assert_eq!(blink.phase(), CaretPhase::Hidden);
        drain(&mut blink, &mut q);
        assert!(blink.is_visible());
    }

    #[test]
    fn restart_invalidates_old_ticks() {
        let mut q = TaskQueue::new();
        let mut blink = CaretBlink::new(BlinkSettings::default());
        blink.restart(&mut q);
        let old = blink.generation();
        blink.restart(&mut q);
        assert!(!blink.on_tick(old, &mut q));
        assert_eq!(blink.remaining(), 30);
        assert_eq!(q.pending_timers(), 2);
    }

    #[test]
    fn zero_toggles_never_schedules() {
        let mut q = TaskQueue::new();
        let mut blink = CaretBlink::new(BlinkSettings {
            interval: Duration::from_millis(500),
            toggles: 0,
        });
        blink.restart(&mut q);
        assert!(blink.is_visible());
        assert!(!blink.is_running());
        assert!(q.is_idle());
    }
}
