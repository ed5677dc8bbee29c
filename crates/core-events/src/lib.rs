//! Core event types and host scheduling primitives for Folio.
//!
//! The view engine is single-threaded and cooperative: every piece of work
//! runs from an input event, a timer, a sequence change, or a "before next
//! repaint" callback. Deferred work is expressed as a plain `Task` value
//! handed to a `HostScheduler`; when the host later fires it, the consumer
//! re-reads its current state instead of closing over values captured at
//! scheduling time.
//!
//! `TaskQueue` is the in-tree host: a virtual clock plus a frame list and a
//! timer heap. The terminal binary advances it with wall-clock time; tests
//! advance it explicitly for deterministic timing.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;
use std::time::Duration;

/// Top-level event enum consumed by the central event loop.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Input(InputEvent),
    Command(CommandEvent),
    /// A deferred task came due.
    Task(Task),
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandEvent {
    Quit,
}

/// Navigation keys understood by the view controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavKey {
    PageUp,
    PageDown,
    Home,
    End,
}

impl fmt::Display for NavKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NavKey::PageUp => "PageUp",
            NavKey::PageDown => "PageDown",
            NavKey::Home => "Home",
            NavKey::End => "End",
        };
        f.write_str(name)
    }
}

/// Normalized input events (already translated from the host's native events).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// Raw wheel delta; positive scrolls toward the start of the document.
    Wheel { delta: i32 },
    Key(NavKey),
    /// New viewport size in pixels (or cells for grid hosts).
    Resize { width: f32, height: f32 },
    /// Primary button click at a viewport point.
    Click { x: f32, y: f32 },
}

/// Deferred work items. Carry no captured state beyond identity tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Task {
    /// Coalesced wheel scroll; the pending delta lives with the controller.
    WheelScroll,
    /// Throttled page movement.
    PageScroll { up: bool },
    /// Caret blink tick; stale generations are ignored.
    BlinkTick { generation: u64 },
    /// Re-render after sequence changes.
    ChangeRender,
}

/// Host scheduling primitives.
pub trait HostScheduler {
    /// Run `task` before the next repaint.
    fn request_frame(&mut self, task: Task);
    /// Run `task` after `delay`.
    fn schedule_after(&mut self, delay: Duration, task: Task);
}

/// Counters for scheduling activity (inspected by tests and the debug log).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub frames_requested: u64,
    pub timers_scheduled: u64,
    pub tasks_fired: u64,
}

/// Virtual-clock scheduler: frame tasks plus a deadline ordered timer heap.
#[derive(Debug, Default)]
pub struct TaskQueue {
    now: Duration,
    frame: Vec<Task>,
    /// (deadline, insertion sequence, task); the sequence keeps FIFO order among equal deadlines.
    timers: BinaryHeap<Reverse<(Duration, u64, Task)>>,
    seq: u64,
    stats: QueueStats,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn stats(&self) -> QueueStats {
        self.stats
    }

    pub fn is_idle(&self) -> bool {
        self.frame.is_empty() && self.timers.is_empty()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    /// Earliest timer deadline, if any.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.peek().map(|Reverse((at, _, _))| *at)
    }

    /// Time until the next frame or timer task (zero when a frame is pending).
    pub fn time_to_next(&self) -> Option<Duration> {
        if !self.frame.is_empty() {
            return Some(Duration::ZERO);
        }
        self.next_deadline()
            .map(|at| at.saturating_sub(self.now))
    }

    /// Move the clock forward. Time never runs backwards.
    pub fn advance_to(&mut self, now: Duration) {
        if now > self.now {
            self.now = now;
        }
    }

    pub fn advance_by(&mut self, delta: Duration) {
        self.now += delta;
    }

    /// Drain frame callbacks. Tasks requested while handling these land in
    /// the next frame.
    pub fn take_frame(&mut self) -> Vec<Task> {
        let out = std::mem::take(&mut self.frame);
        self.stats.tasks_fired += out.len() as u64;
        out
    }

    /// Pop the next timer whose deadline has passed.
    pub fn pop_due(&mut self) -> Option<Task> {
        match self.timers.peek() {
            Some(Reverse((at, _, _))) if *at <= self.now => {}
            _ => return None,
        }
        let Reverse((_, _, task)) = self.timers.pop()?;
        self.stats.tasks_fired += 1;
        Some(task)
    }
}

impl HostScheduler for TaskQueue {
    fn request_frame(&mut self, task: Task) {
        tracing::trace!(target: "events.queue", ?task, "request_frame");
        self.stats.frames_requested += 1;
        self.frame.push(task);
    }

    fn schedule_after(&mut self, delay: Duration, task: Task) {
        tracing::trace!(target: "events.queue", ?task, delay_ms = delay.as_millis() as u64, "schedule_after");
        self.stats.timers_scheduled += 1;
        self.seq += 1;
        self.timers.push(Reverse((self.now + delay, self.seq, task)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timers_fire_in_deadline_order() {
        let mut q = TaskQueue::new();
        q.schedule_after(Duration::from_millis(30), Task::ChangeRender);
        q.schedule_after(Duration::from_millis(10), Task::WheelScroll);
        q.schedule_after(Duration::from_millis(20), Task::PageScroll { up: true });
        assert_eq!(q.pop_due(), None, "nothing due at t=0");
        q.advance_to(Duration::from_millis(25));
        assert_eq!(q.pop_due(), Some(Task::WheelScroll));
        assert_eq!(q.pop_due(), Some(Task::PageScroll { up: true }));
        assert_eq!(q.pop_due(), None);
        assert_eq!(q.next_deadline(), Some(Duration::from_millis(30)));
    }

    #[test]
    fn equal_deadlines_keep_fifo_order() {
        let mut q = TaskQueue::new();
        q.schedule_after(Duration::from_millis(5), Task::BlinkTick { generation: 2 });
        q.schedule_after(Duration::from_millis(5), Task::BlinkTick { generation: 1 });
        q.advance_by(Duration::from_millis(5));
        assert_eq!(q.pop_due(), Some(Task::BlinkTick { generation: 2 }));
        assert_eq!(q.pop_due(), Some(Task::BlinkTick { generation: 1 }));
    }

    #[test]
    fn frame_tasks_drain_once() {
        let mut q = TaskQueue::new();
        q.request_frame(Task::ChangeRender);
        assert_eq!(q.time_to_next(), Some(Duration::ZERO));
        assert_eq!(q.take_frame(), vec![Task::ChangeRender]);
        assert!(q.take_frame().is_empty());
        assert!(q.is_idle());
        let stats = q.stats();
        assert_eq!(stats.frames_requested, 1);
        assert_eq!(stats.tasks_fired, 1);
    }

    #[test]
    fn clock_is_monotonic() {
        let mut q = TaskQueue::new();
        q.advance_to(Duration::from_millis(50));
        q.advance_to(Duration::from_millis(10));
        assert_eq!(q.now(), Duration::from_millis(50));
    }

    #[test]
    fn nav_key_display() {
        assert_eq!(NavKey::PageDown.to_string(), "PageDown");
    }
}
