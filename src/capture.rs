//! Capture engine — drives one overlay through the screen-capture exchange.
//!
//! `Pending` issues the request, `Waiting` collects the buffer layout,
//! allocates and submits shared memory, and the copy's outcome settles the
//! overlay as `Ready` (handing off to the renderer) or `Failed`. Nothing is
//! retried.

use crate::compositor::{Compositor, FrameEvent};
use crate::overlay::{CaptureState, Overlay};
use crate::render;
use std::mem;

impl<C: Compositor> Overlay<C> {
    /// `Pending → Waiting`. Returns `false` if a request was already issued.
    pub(crate) fn begin_capture(&mut self, compositor: &mut C, overlay_cursor: bool) -> bool {
        if !matches!(self.state, CaptureState::Pending) {
            return false;
        }

        let frame = compositor.capture_output(self.index, &self.output, overlay_cursor);
        self.state = CaptureState::Waiting {
            frame,
            params: None,
            buffer: None,
        };
        log::info!(
            "[CAPTURE] Output {}: frame requested (cursor: {})",
            self.index,
            overlay_cursor
        );
        true
    }

    pub(crate) fn on_frame_event(&mut self, compositor: &mut C, event: FrameEvent) {
        let index = self.index;

        self.state = match (mem::replace(&mut self.state, CaptureState::Pending), event) {
            (
                CaptureState::Waiting {
                    frame,
                    buffer: None,
                    ..
                },
                FrameEvent::Buffer(params),
            ) => {
                log::debug!(
                    "[CAPTURE] Output {}: compositor wants {:?} {}x{} stride {}",
                    index,
                    params.format,
                    params.width,
                    params.height,
                    params.stride
                );
                CaptureState::Waiting {
                    frame,
                    params: Some(params),
                    buffer: None,
                }
            }

            (
                CaptureState::Waiting {
                    frame,
                    params: Some(params),
                    buffer: None,
                },
                FrameEvent::BufferDone,
            ) => match compositor.attach_buffer(index, &frame, &params) {
                Ok(buffer) => CaptureState::Waiting {
                    frame,
                    params: Some(params),
                    buffer: Some(buffer),
                },
                Err(e) => {
                    log::error!("[CAPTURE] Output {}: {}", index, e);
                    CaptureState::Failed {
                        frame: Some(frame),
                        buffer: None,
                    }
                }
            },

            (
                CaptureState::Waiting {
                    frame,
                    params: None,
                    buffer: None,
                },
                FrameEvent::BufferDone,
            ) => {
                log::error!(
                    "[CAPTURE] Output {}: compositor offered no shared-memory buffer type",
                    index
                );
                CaptureState::Failed {
                    frame: Some(frame),
                    buffer: None,
                }
            }

            (
                CaptureState::Waiting {
                    frame,
                    params: Some(params),
                    buffer: Some(buffer),
                },
                FrameEvent::Ready,
            ) => {
                log::info!("[CAPTURE] Output {}: frame ready", index);
                let surface = render::present(compositor, index, &self.output, self.transform);
                CaptureState::Ready {
                    frame,
                    params,
                    buffer,
                    surface,
                }
            }

            (CaptureState::Waiting { frame, buffer, .. }, FrameEvent::Ready) => {
                log::error!(
                    "[CAPTURE] Output {}: copy reported ready before a buffer was submitted",
                    index
                );
                CaptureState::Failed {
                    frame: Some(frame),
                    buffer,
                }
            }

            (CaptureState::Waiting { frame, buffer, .. }, FrameEvent::Failed) => {
                log::error!("[CAPTURE] Output {}: compositor failed to copy the frame", index);
                CaptureState::Failed {
                    frame: Some(frame),
                    buffer,
                }
            }

            (state, event) => {
                log::debug!("[CAPTURE] Output {}: ignoring {:?}", index, event);
                state
            }
        };
    }
}
