//! Global binding and output discovery.

use super::{ConnectError, FreezeState};
use std::ops::RangeInclusive;
use wayland_client::globals::{BindError, GlobalList, GlobalListContents};
use wayland_client::protocol::wl_compositor::WlCompositor;
use wayland_client::protocol::wl_output::{self, WlOutput};
use wayland_client::protocol::wl_registry::{self, WlRegistry};
use wayland_client::protocol::wl_shm::WlShm;
use wayland_client::{Connection, Dispatch, Proxy, QueueHandle, WEnum};
use wayland_protocols::wp::viewporter::client::wp_viewporter::WpViewporter;
use wayland_protocols_wlr::layer_shell::v1::client::zwlr_layer_shell_v1::ZwlrLayerShellV1;
use wayland_protocols_wlr::screencopy::v1::client::zwlr_screencopy_manager_v1::ZwlrScreencopyManagerV1;

const OUTPUT_VERSION: u32 = 4;

/// Globals every freeze needs. Bound once, destroyed after all overlays.
pub(super) struct Globals {
    pub compositor: WlCompositor,
    pub shm: WlShm,
    pub viewporter: WpViewporter,
    pub layer_shell: ZwlrLayerShellV1,
    pub screencopy: ZwlrScreencopyManagerV1,
}

fn require<I>(
    list: &GlobalList,
    qh: &QueueHandle<FreezeState>,
    versions: RangeInclusive<u32>,
) -> Result<I, ConnectError>
where
    I: Proxy + 'static,
    FreezeState: Dispatch<I, ()>,
{
    list.bind(qh, versions, ()).map_err(|source: BindError| {
        let interface = I::interface().name;
        log::error!("[WAYLAND] Required global {} unavailable: {}", interface, source);
        ConnectError::MissingGlobal { interface, source }
    })
}

impl Globals {
    pub fn bind(list: &GlobalList, qh: &QueueHandle<FreezeState>) -> Result<Self, ConnectError> {
        Ok(Self {
            compositor: require(list, qh, 4..=4)?,
            shm: require(list, qh, 1..=1)?,
            viewporter: require(list, qh, 1..=1)?,
            layer_shell: require(list, qh, 1..=3)?,
            screencopy: require(list, qh, 1..=3)?,
        })
    }

    /// Release the globals that have a destructor request.
    pub fn destroy(self) {
        self.screencopy.destroy();
        if self.layer_shell.version() >= 3 {
            self.layer_shell.destroy();
        }
        self.viewporter.destroy();
    }
}

/// Bind every advertised output, tagging each with its discovery index.
pub(super) fn bind_outputs(list: &GlobalList, qh: &QueueHandle<FreezeState>) -> Vec<WlOutput> {
    let registry = list.registry();
    list.contents()
        .clone_list()
        .into_iter()
        .filter(|global| global.interface == WlOutput::interface().name)
        .enumerate()
        .map(|(index, global)| {
            log::debug!(
                "[WAYLAND] Output {} is global {} (v{})",
                index,
                global.name,
                global.version
            );
            registry.bind::<WlOutput, _, _>(
                global.name,
                global.version.min(OUTPUT_VERSION),
                qh,
                index,
            )
        })
        .collect()
}

impl Dispatch<WlRegistry, GlobalListContents> for FreezeState {
    fn event(
        _state: &mut Self,
        _registry: &WlRegistry,
        event: wl_registry::Event,
        _data: &GlobalListContents,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        // Outputs are fixed at startup.
        match event {
            wl_registry::Event::Global {
                name, interface, ..
            } => {
                log::debug!("[WAYLAND] Ignoring late global {} ({})", interface, name);
            }
            wl_registry::Event::GlobalRemove { name } => {
                log::debug!("[WAYLAND] Ignoring removal of global {}", name);
            }
            _ => {}
        }
    }
}

impl Dispatch<WlOutput, usize> for FreezeState {
    fn event(
        state: &mut Self,
        _output: &WlOutput,
        event: wl_output::Event,
        index: &usize,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let wl_output::Event::Geometry { transform, .. } = event {
            match transform {
                WEnum::Value(transform) => {
                    log::debug!("[WAYLAND] Output {} transform {:?}", index, transform);
                    state.context.set_transform(*index, transform);
                }
                WEnum::Unknown(raw) => {
                    log::warn!("[WAYLAND] Output {} reports unknown transform {}", index, raw);
                }
            }
        }
    }
}

wayland_client::delegate_noop!(FreezeState: WlCompositor);
wayland_client::delegate_noop!(FreezeState: ignore WlShm);
wayland_client::delegate_noop!(FreezeState: WpViewporter);
wayland_client::delegate_noop!(FreezeState: ZwlrLayerShellV1);
wayland_client::delegate_noop!(FreezeState: ZwlrScreencopyManagerV1);
