//! Overlay renderer — shows a captured frame as a static, full-output surface.
//!
//! Construction starts only once the capture is `Ready`. The content is
//! attached and committed once, on the first configure; the image never
//! changes afterwards so there is no redraw.

use crate::compositor::{Compositor, SurfaceEvent};
use crate::overlay::{CaptureState, Overlay};
use wayland_client::protocol::wl_output::Transform;

/// Create the overlay surface for a freshly captured output.
pub(crate) fn present<C: Compositor>(
    compositor: &mut C,
    index: usize,
    output: &C::Output,
    transform: Transform,
) -> C::Surface {
    log::debug!("[OVERLAY] Output {}: creating overlay surface ({:?})", index, transform);
    compositor.create_surface(index, output, transform)
}

impl<C: Compositor> Overlay<C> {
    pub(crate) fn on_surface_event(&mut self, compositor: &mut C, event: SurfaceEvent) {
        let CaptureState::Ready {
            params,
            buffer,
            surface,
            ..
        } = &mut self.state
        else {
            log::debug!("[OVERLAY] Output {}: surface event without a surface", self.index);
            return;
        };

        match event {
            SurfaceEvent::Configure { width, height, .. } => {
                log::debug!(
                    "[OVERLAY] Output {}: configured {}x{}",
                    self.index,
                    width,
                    height
                );
                compositor.configure_surface(surface, buffer, params, self.transform, event);
            }
            SurfaceEvent::Closed => {
                log::warn!("[OVERLAY] Output {}: overlay closed by the compositor", self.index);
            }
        }
    }
}
