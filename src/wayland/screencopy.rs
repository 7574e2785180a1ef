//! wlr-screencopy frames and the shared-memory buffers they are copied into.

use super::FreezeState;
use crate::compositor::{AllocError, BufferParams, FrameEvent};
use rustix::fs::MemfdFlags;
use std::os::fd::{AsFd, OwnedFd};
use wayland_client::protocol::wl_buffer::WlBuffer;
use wayland_client::protocol::wl_output::WlOutput;
use wayland_client::protocol::wl_shm::WlShm;
use wayland_client::protocol::wl_shm_pool::WlShmPool;
use wayland_client::{Connection, Dispatch, Proxy, QueueHandle, WEnum};
use wayland_protocols_wlr::screencopy::v1::client::zwlr_screencopy_frame_v1::{
    self, ZwlrScreencopyFrameV1,
};
use wayland_protocols_wlr::screencopy::v1::client::zwlr_screencopy_manager_v1::ZwlrScreencopyManagerV1;

/// Version that introduced `buffer_done`; older managers announce a single
/// buffer type and expect the copy right away.
const BUFFER_DONE_SINCE: u32 = 3;

/// A `wl_buffer` backed by its own memfd pool.
pub struct ShmBuffer {
    buffer: WlBuffer,
    pool: WlShmPool,
    // Kept open so the pool's backing memory outlives every request on it.
    _memory: OwnedFd,
    len: usize,
}

impl ShmBuffer {
    pub fn wl_buffer(&self) -> &WlBuffer {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn destroy(self) {
        self.buffer.destroy();
        self.pool.destroy();
    }
}

pub(super) fn capture(
    manager: &ZwlrScreencopyManagerV1,
    qh: &QueueHandle<FreezeState>,
    index: usize,
    output: &WlOutput,
    overlay_cursor: bool,
) -> ZwlrScreencopyFrameV1 {
    manager.capture_output(i32::from(overlay_cursor), output, qh, index)
}

/// Allocate anonymous shared memory sized for `params` and wrap it in a pool
/// holding exactly one buffer.
pub(super) fn allocate(
    shm: &WlShm,
    qh: &QueueHandle<FreezeState>,
    params: &BufferParams,
) -> Result<ShmBuffer, AllocError> {
    let invalid = || AllocError::InvalidSize {
        width: params.width,
        height: params.height,
        stride: params.stride,
    };
    let len = params.byte_len().ok_or_else(invalid)?;
    let width = i32::try_from(params.width).map_err(|_| invalid())?;
    let height = i32::try_from(params.height).map_err(|_| invalid())?;
    let stride = i32::try_from(params.stride).map_err(|_| invalid())?;

    let memory = rustix::fs::memfd_create("still-frame", MemfdFlags::CLOEXEC)
        .map_err(std::io::Error::from)?;
    rustix::fs::ftruncate(&memory, len as u64).map_err(std::io::Error::from)?;

    // byte_len() guarantees len fits an i32.
    let pool = shm.create_pool(memory.as_fd(), len as i32, qh, ());
    let buffer = pool.create_buffer(0, width, height, stride, params.format, qh, ());

    Ok(ShmBuffer {
        buffer,
        pool,
        _memory: memory,
        len,
    })
}

/// Translate one protocol event of a frame bound at `version` into engine
/// events.
///
/// Below v3 there is no `buffer_done`; the single `buffer` event is followed
/// by a synthesized one whether or not its format is usable, so an unknown
/// format ends the capture instead of leaving it waiting.
fn frame_events(event: zwlr_screencopy_frame_v1::Event, version: u32) -> Vec<FrameEvent> {
    match event {
        zwlr_screencopy_frame_v1::Event::Buffer {
            format,
            width,
            height,
            stride,
        } => {
            let mut events = Vec::with_capacity(2);
            match format {
                WEnum::Value(format) => events.push(FrameEvent::Buffer(BufferParams {
                    format,
                    width,
                    height,
                    stride,
                })),
                WEnum::Unknown(raw) => {
                    log::warn!("[CAPTURE] Ignoring unknown shm format {:#x}", raw);
                }
            }
            if version < BUFFER_DONE_SINCE {
                events.push(FrameEvent::BufferDone);
            }
            events
        }
        zwlr_screencopy_frame_v1::Event::BufferDone => vec![FrameEvent::BufferDone],
        zwlr_screencopy_frame_v1::Event::Ready { .. } => vec![FrameEvent::Ready],
        zwlr_screencopy_frame_v1::Event::Failed => vec![FrameEvent::Failed],
        // Flags (y-invert), damage and dmabuf offers are not used.
        _ => Vec::new(),
    }
}

impl Dispatch<ZwlrScreencopyFrameV1, usize> for FreezeState {
    fn event(
        state: &mut Self,
        frame: &ZwlrScreencopyFrameV1,
        event: zwlr_screencopy_frame_v1::Event,
        index: &usize,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        for event in frame_events(event, frame.version()) {
            state.context.handle_frame_event(*index, event);
        }
    }
}

wayland_client::delegate_noop!(FreezeState: ignore WlShmPool);
wayland_client::delegate_noop!(FreezeState: ignore WlBuffer);
