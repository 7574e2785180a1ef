//! Layer-shell overlay surfaces.

use super::globals::Globals;
use super::FreezeState;
use crate::compositor::{BufferParams, SurfaceEvent};
use wayland_client::protocol::wl_buffer::WlBuffer;
use wayland_client::protocol::wl_output::{Transform, WlOutput};
use wayland_client::protocol::wl_region::WlRegion;
use wayland_client::protocol::wl_surface::WlSurface;
use wayland_client::{Connection, Dispatch, QueueHandle};
use wayland_protocols::wp::viewporter::client::wp_viewport::WpViewport;
use wayland_protocols_wlr::layer_shell::v1::client::zwlr_layer_shell_v1::Layer;
use wayland_protocols_wlr::layer_shell::v1::client::zwlr_layer_surface_v1::{
    self, Anchor, KeyboardInteractivity, ZwlrLayerSurfaceV1,
};

const NAMESPACE: &str = "still";

pub struct OverlaySurface {
    surface: WlSurface,
    viewport: WpViewport,
    layer: ZwlrLayerSurfaceV1,
    presented: bool,
}

/// Create an input-transparent overlay covering `output` and make the
/// initial, bufferless commit that asks for a configure.
pub(super) fn create(
    globals: &Globals,
    qh: &QueueHandle<FreezeState>,
    index: usize,
    output: &WlOutput,
    transform: Transform,
) -> OverlaySurface {
    let surface = globals.compositor.create_surface(qh, ());

    let region = globals.compositor.create_region(qh, ());
    surface.set_input_region(Some(&region));
    region.destroy();

    surface.set_buffer_transform(transform);
    let viewport = globals.viewporter.get_viewport(&surface, qh, ());

    let layer = globals.layer_shell.get_layer_surface(
        &surface,
        Some(output),
        Layer::Overlay,
        NAMESPACE.to_string(),
        qh,
        index,
    );
    layer.set_anchor(Anchor::Top | Anchor::Bottom | Anchor::Left | Anchor::Right);
    layer.set_exclusive_zone(-1);
    layer.set_keyboard_interactivity(KeyboardInteractivity::None);
    surface.commit();

    OverlaySurface {
        surface,
        viewport,
        layer,
        presented: false,
    }
}

impl OverlaySurface {
    /// Ack every configure. The first one attaches the frozen frame, scales
    /// it to the logical output size and commits; later ones only ack.
    pub fn configure(
        &mut self,
        buffer: &WlBuffer,
        params: &BufferParams,
        transform: Transform,
        configure: SurfaceEvent,
    ) {
        let SurfaceEvent::Configure {
            serial,
            width,
            height,
        } = configure
        else {
            return;
        };

        self.layer.ack_configure(serial);
        let Some((width, height)) = content_destination(self.presented, width, height, params, transform)
        else {
            return;
        };
        self.viewport.set_destination(width, height);

        self.surface.attach(Some(buffer), 0, 0);
        self.surface.damage_buffer(0, 0, i32::MAX, i32::MAX);
        self.surface.commit();
        self.presented = true;
    }

    pub fn destroy(self) {
        self.layer.destroy();
        self.viewport.destroy();
        self.surface.destroy();
    }
}

/// Viewport destination for the content commit, or `None` once the content
/// is already up. A zero dimension is left to us by the compositor and falls
/// back to the buffer size with the output transform undone.
fn content_destination(
    presented: bool,
    width: u32,
    height: u32,
    params: &BufferParams,
    transform: Transform,
) -> Option<(i32, i32)> {
    if presented {
        return None;
    }
    let (fallback_width, fallback_height) = params.transformed_size(transform);
    let width = if width == 0 { fallback_width } else { width };
    let height = if height == 0 { fallback_height } else { height };
    Some((clamp_i32(width), clamp_i32(height)))
}

fn clamp_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

impl Dispatch<ZwlrLayerSurfaceV1, usize> for FreezeState {
    fn event(
        state: &mut Self,
        _layer: &ZwlrLayerSurfaceV1,
        event: zwlr_layer_surface_v1::Event,
        index: &usize,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        match event {
            zwlr_layer_surface_v1::Event::Configure {
                serial,
                width,
                height,
            } => state.context.handle_surface_event(
                *index,
                SurfaceEvent::Configure {
                    serial,
                    width,
                    height,
                },
            ),
            zwlr_layer_surface_v1::Event::Closed => {
                state.context.handle_surface_event(*index, SurfaceEvent::Closed)
            }
            _ => {}
        }
    }
}

wayland_client::delegate_noop!(FreezeState: ignore WlSurface);
wayland_client::delegate_noop!(FreezeState: WlRegion);
wayland_client::delegate_noop!(FreezeState: WpViewport);

#[cfg(test)]
mod tests {
    use super::*;

    use wayland_client::protocol::wl_shm::Format;

    fn params() -> BufferParams {
        BufferParams {
            format: Format::Xrgb8888,
            width: 3840,
            height: 2160,
            stride: 3840 * 4,
        }
    }

    #[test]
    fn configured_size_becomes_the_destination() {
        assert_eq!(
            content_destination(false, 1920, 1080, &params(), Transform::Normal),
            Some((1920, 1080))
        );
    }

    #[test]
    fn zero_dimensions_fall_back_to_the_transformed_buffer() {
        assert_eq!(
            content_destination(false, 0, 0, &params(), Transform::Normal),
            Some((3840, 2160))
        );
        assert_eq!(
            content_destination(false, 0, 0, &params(), Transform::_90),
            Some((2160, 3840))
        );
        assert_eq!(
            content_destination(false, 1280, 0, &params(), Transform::Flipped270),
            Some((1280, 3840))
        );
    }

    #[test]
    fn later_configures_are_only_acked() {
        assert_eq!(
            content_destination(true, 1920, 1080, &params(), Transform::Normal),
            None
        );
    }

    #[test]
    fn oversized_destinations_saturate() {
        assert_eq!(clamp_i32(2560), 2560);
        assert_eq!(clamp_i32(u32::MAX), i32::MAX);
    }
}
