//! Process-wide freeze context: the compositor backend plus the append-only,
//! discovery-ordered list of overlays, and the launch gate over them.

use crate::compositor::{Compositor, FrameEvent, SurfaceEvent};
use crate::overlay::{CaptureStatus, Overlay};
use wayland_client::protocol::wl_output::Transform;

/// What the scheduler should do after a capture pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Every overlay is ready and none failed.
    Launch,
    /// Captures are still outstanding.
    Wait,
    /// A capture failed; the remaining in-flight requests are resolving.
    Drain { in_flight: usize },
    /// A capture failed and nothing is left in flight.
    Abort,
}

pub struct Context<C: Compositor> {
    compositor: C,
    overlays: Vec<Overlay<C>>,
    overlay_cursor: bool,
}

impl<C: Compositor> Context<C> {
    /// `overlay_cursor` is fixed for the whole run and sent with every
    /// capture request.
    pub fn new(compositor: C, overlay_cursor: bool) -> Self {
        Self {
            compositor,
            overlays: Vec::new(),
            overlay_cursor,
        }
    }

    /// Register a newly discovered output. Returns its overlay index.
    pub fn add_output(&mut self, output: C::Output) -> usize {
        let index = self.overlays.len();
        self.overlays.push(Overlay::new(index, output));
        index
    }

    pub fn set_transform(&mut self, index: usize, transform: Transform) {
        if let Some(overlay) = self.overlays.get_mut(index) {
            overlay.set_transform(transform);
        }
    }

    pub fn overlays(&self) -> &[Overlay<C>] {
        &self.overlays
    }

    pub fn compositor(&self) -> &C {
        &self.compositor
    }

    pub fn compositor_mut(&mut self) -> &mut C {
        &mut self.compositor
    }

    pub fn count(&self, status: CaptureStatus) -> usize {
        self.overlays.iter().filter(|o| o.status() == status).count()
    }

    /// Issue a capture for every pending overlay, then evaluate the gate.
    ///
    /// Once any overlay has failed no pending overlay is started again.
    pub fn advance(&mut self) -> Gate {
        if self.count(CaptureStatus::Failed) > 0 {
            return match self.count(CaptureStatus::Waiting) {
                0 => Gate::Abort,
                in_flight => Gate::Drain { in_flight },
            };
        }

        for overlay in &mut self.overlays {
            overlay.begin_capture(&mut self.compositor, self.overlay_cursor);
        }

        if self.count(CaptureStatus::Ready) == self.overlays.len() {
            Gate::Launch
        } else {
            Gate::Wait
        }
    }

    pub fn handle_frame_event(&mut self, index: usize, event: FrameEvent) {
        match self.overlays.get_mut(index) {
            Some(overlay) => overlay.on_frame_event(&mut self.compositor, event),
            None => log::warn!("[CAPTURE] Frame event for unknown output {}", index),
        }
    }

    /// Once any capture has failed nothing is presented any more, so a
    /// draining run never shows a partial freeze.
    pub fn handle_surface_event(&mut self, index: usize, event: SurfaceEvent) {
        if matches!(event, SurfaceEvent::Configure { .. }) && self.count(CaptureStatus::Failed) > 0 {
            log::debug!("[OVERLAY] Output {}: not presenting after a failed capture", index);
            return;
        }
        match self.overlays.get_mut(index) {
            Some(overlay) => overlay.on_surface_event(&mut self.compositor, event),
            None => log::warn!("[OVERLAY] Surface event for unknown output {}", index),
        }
    }

    /// Destroy every overlay in discovery order and hand the backend back
    /// so its globals can be released last.
    pub fn teardown(self) -> C {
        let Self {
            mut compositor,
            overlays,
            ..
        } = self;

        for overlay in overlays {
            overlay.destroy(&mut compositor);
        }

        compositor
    }
}
