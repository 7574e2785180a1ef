//! One overlay per output: the output handle, its cached transform, and the
//! capture state that owns every protocol object created on its behalf.

use crate::compositor::{BufferParams, Compositor};
use wayland_client::protocol::wl_output::Transform;

/// Observable capture progress. Monotonic:
/// `Pending → Waiting → {Ready | Failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStatus {
    Pending,
    Waiting,
    Ready,
    Failed,
}

/// Capture progress together with the resources each step owns.
///
/// A presentation surface only exists inside `Ready`.
pub(crate) enum CaptureState<C: Compositor> {
    Pending,
    Waiting {
        frame: C::Frame,
        params: Option<BufferParams>,
        buffer: Option<C::Buffer>,
    },
    Ready {
        frame: C::Frame,
        params: BufferParams,
        buffer: C::Buffer,
        surface: C::Surface,
    },
    Failed {
        frame: Option<C::Frame>,
        buffer: Option<C::Buffer>,
    },
}

pub struct Overlay<C: Compositor> {
    pub(crate) index: usize,
    pub(crate) output: C::Output,
    pub(crate) transform: Transform,
    pub(crate) state: CaptureState<C>,
}

impl<C: Compositor> Overlay<C> {
    pub(crate) fn new(index: usize, output: C::Output) -> Self {
        Self {
            index,
            output,
            transform: Transform::Normal,
            state: CaptureState::Pending,
        }
    }

    /// Position in output discovery order.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn status(&self) -> CaptureStatus {
        match self.state {
            CaptureState::Pending => CaptureStatus::Pending,
            CaptureState::Waiting { .. } => CaptureStatus::Waiting,
            CaptureState::Ready { .. } => CaptureStatus::Ready,
            CaptureState::Failed { .. } => CaptureStatus::Failed,
        }
    }

    /// Learned once from the output's geometry, before any capture request.
    pub(crate) fn set_transform(&mut self, transform: Transform) {
        if matches!(self.state, CaptureState::Pending) {
            self.transform = transform;
        } else {
            log::debug!(
                "[OVERLAY] output {} transform changed to {:?} after capture started, ignoring",
                self.index,
                transform
            );
        }
    }

    /// Release everything this overlay owns.
    ///
    /// Order: presentation surface, then buffer and its shared memory, then
    /// the frame, and the output handle last.
    pub(crate) fn destroy(self, compositor: &mut C) {
        match self.state {
            CaptureState::Pending => {}
            CaptureState::Ready {
                frame,
                buffer,
                surface,
                ..
            } => {
                compositor.destroy_surface(surface);
                compositor.destroy_buffer(buffer);
                compositor.destroy_frame(frame);
            }
            CaptureState::Waiting { frame, buffer, .. } => {
                // The copy may still be in flight: drop the request before
                // the memory it targets.
                compositor.destroy_frame(frame);
                if let Some(buffer) = buffer {
                    compositor.destroy_buffer(buffer);
                }
            }
            CaptureState::Failed { frame, buffer } => {
                if let Some(frame) = frame {
                    compositor.destroy_frame(frame);
                }
                if let Some(buffer) = buffer {
                    compositor.destroy_buffer(buffer);
                }
            }
        }
        compositor.destroy_output(self.output);
    }
}
