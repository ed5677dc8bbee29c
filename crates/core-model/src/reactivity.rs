//! Edit reactivity: sequence change notifications → one re-render per frame.
//!
//! `poll_changes` drains the change channel. When anything arrived and no
//! re-render is pending, a `ChangeRender` task is requested for the next
//! frame; further changes before it fires are absorbed by the pending flag.
//! The re-render keeps the current top offset unless the sequence shrank
//! below it.

use crate::ViewController;
use core_events::HostScheduler;
use core_render::probe::{DisplaySurface, HitTestProbe};
use core_text::{SequenceChange, TextSequence};
use crossbeam_channel::Receiver;

impl<S, D> ViewController<S, D>
where
    S: TextSequence,
    D: DisplaySurface + HitTestProbe,
{
    /// Subscribe to a change channel, replacing any previous one.
    pub fn watch(&mut self, changes: Receiver<SequenceChange>) {
        self.changes = Some(changes);
    }

    /// Drain pending notifications. Returns how many were received.
    pub fn poll_changes<H: HostScheduler + ?Sized>(&mut self, host: &mut H) -> usize {
        let Some(rx) = &self.changes else {
            return 0;
        };
        let mut received = 0usize;
        let mut revision = None;
        for change in rx.try_iter() {
            received += 1;
            revision = Some(change.revision);
        }
        if received == 0 {
            return 0;
        }
        if self.throttle.render_pending {
            tracing::trace!(target: "edit.reactivity", received, ?revision, "absorbed_pending");
            return received;
        }
        self.throttle.render_pending = true;
        host.request_frame(core_events::Task::ChangeRender);
        tracing::debug!(target: "edit.reactivity", received, ?revision, "render_scheduled");
        received
    }

    pub(crate) fn fire_change_render<H: HostScheduler + ?Sized>(&mut self, host: &mut H) -> bool {
        self.throttle.render_pending = false;
        self.rerender_current("change", host)
    }
}
