//! Wayland backend — the real compositor behind the freeze.
//!
//! Uses `wl_shm` for capture buffers, `zwlr_screencopy_manager_v1` to copy
//! output frames, `zwlr_layer_shell_v1` + `wp_viewporter` to show them.
//! Protocol events are translated into [`FrameEvent`]/[`SurfaceEvent`] and
//! handed to the shared [`Context`]; no logic lives in the dispatch impls.

mod globals;
mod layer;
mod screencopy;

use crate::compositor::{AllocError, BufferParams, Compositor, SurfaceEvent};
use crate::context::Context;
use crate::scheduler::{EventSource, LoopError, Readiness};
use globals::Globals;
use layer::OverlaySurface;
use rustix::event::{PollFd, PollFlags};
use screencopy::ShmBuffer;
use std::io;
use std::os::fd::BorrowedFd;
use wayland_client::backend::{ReadEventsGuard, WaylandError};
use wayland_client::globals::{registry_queue_init, BindError, GlobalError};
use wayland_client::protocol::wl_output::{Transform, WlOutput};
use wayland_client::{Connection, DispatchError, EventQueue, Proxy, QueueHandle};
use wayland_protocols_wlr::screencopy::v1::client::zwlr_screencopy_frame_v1::ZwlrScreencopyFrameV1;

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("failed to connect to a Wayland display: {0}")]
    Connect(#[from] wayland_client::ConnectError),

    #[error("failed to enumerate compositor globals: {0}")]
    Registry(#[from] GlobalError),

    #[error("compositor does not support {interface}: {source}")]
    MissingGlobal {
        interface: &'static str,
        #[source]
        source: BindError,
    },

    #[error("initial roundtrip failed: {0}")]
    Roundtrip(#[from] DispatchError),
}

/// Dispatch target for every protocol object of the freeze.
pub struct FreezeState {
    context: Context<WaylandCompositor>,
}

/// Bound globals plus the queue handle new objects are created on.
pub struct WaylandCompositor {
    qh: QueueHandle<FreezeState>,
    globals: Globals,
}

impl Compositor for WaylandCompositor {
    type Output = WlOutput;
    type Frame = ZwlrScreencopyFrameV1;
    type Buffer = ShmBuffer;
    type Surface = OverlaySurface;

    fn capture_output(&mut self, index: usize, output: &WlOutput, overlay_cursor: bool) -> Self::Frame {
        screencopy::capture(&self.globals.screencopy, &self.qh, index, output, overlay_cursor)
    }

    fn attach_buffer(
        &mut self,
        index: usize,
        frame: &Self::Frame,
        params: &BufferParams,
    ) -> Result<Self::Buffer, AllocError> {
        let buffer = screencopy::allocate(&self.globals.shm, &self.qh, params)?;
        log::debug!("[CAPTURE] Output {}: submitting {} byte buffer", index, buffer.len());
        frame.copy(buffer.wl_buffer());
        Ok(buffer)
    }

    fn create_surface(&mut self, index: usize, output: &WlOutput, transform: Transform) -> Self::Surface {
        layer::create(&self.globals, &self.qh, index, output, transform)
    }

    fn configure_surface(
        &mut self,
        surface: &mut Self::Surface,
        buffer: &Self::Buffer,
        params: &BufferParams,
        transform: Transform,
        configure: SurfaceEvent,
    ) {
        surface.configure(buffer.wl_buffer(), params, transform, configure);
    }

    fn destroy_surface(&mut self, surface: Self::Surface) {
        surface.destroy();
    }

    fn destroy_buffer(&mut self, buffer: Self::Buffer) {
        buffer.destroy();
    }

    fn destroy_frame(&mut self, frame: Self::Frame) {
        frame.destroy();
    }

    fn destroy_output(&mut self, output: WlOutput) {
        if output.version() >= 3 {
            output.release();
        }
    }
}

/// The compositor connection as seen by the event loop.
pub struct WaylandSource {
    connection: Connection,
    queue: EventQueue<FreezeState>,
    state: FreezeState,
    read_guard: Option<ReadEventsGuard>,
}

impl WaylandSource {
    /// Connect, bind the required globals, discover outputs and learn their
    /// transforms. Fails if any required global is missing.
    pub fn connect(overlay_cursor: bool) -> Result<Self, ConnectError> {
        let connection = Connection::connect_to_env()?;
        let (global_list, mut queue) = registry_queue_init::<FreezeState>(&connection)?;
        let qh = queue.handle();

        let globals = Globals::bind(&global_list, &qh)?;
        let outputs = globals::bind_outputs(&global_list, &qh);

        let mut context = Context::new(WaylandCompositor { qh, globals }, overlay_cursor);
        for output in outputs {
            context.add_output(output);
        }
        log::info!(
            "[WAYLAND] Connected, {} output(s) discovered",
            context.overlays().len()
        );

        // Geometry (and with it the transform) arrives before any capture.
        let mut state = FreezeState { context };
        queue.roundtrip(&mut state)?;

        Ok(Self {
            connection,
            queue,
            state,
            read_guard: None,
        })
    }

    /// Destroy every overlay, then the globals, and flush the destructors.
    pub fn shutdown(self) {
        let Self {
            connection,
            state,
            read_guard,
            ..
        } = self;
        drop(read_guard);

        let compositor = state.context.teardown();
        compositor.globals.destroy();

        if let Err(e) = connection.flush() {
            log::warn!("[WAYLAND] Failed to flush teardown requests: {}", e);
        }
    }
}

fn wayland_io(error: WaylandError) -> io::Error {
    match error {
        WaylandError::Io(e) => e,
        WaylandError::Protocol(e) => io::Error::other(e.to_string()),
    }
}

fn would_block(error: &WaylandError) -> bool {
    matches!(error, WaylandError::Io(e) if e.kind() == io::ErrorKind::WouldBlock)
}

impl EventSource for WaylandSource {
    type Compositor = WaylandCompositor;

    fn context(&mut self) -> &mut Context<WaylandCompositor> {
        &mut self.state.context
    }

    fn prepare(&mut self) -> Result<(), LoopError> {
        let guard = loop {
            match self.queue.prepare_read() {
                Some(guard) => break guard,
                None => {
                    self.queue
                        .dispatch_pending(&mut self.state)
                        .map_err(|e| LoopError::Dispatch(e.to_string()))?;
                }
            }
        };
        self.read_guard = Some(guard);

        match self.queue.flush() {
            Err(e) if !would_block(&e) => Err(LoopError::Flush(wayland_io(e))),
            _ => Ok(()),
        }
    }

    fn wait(&mut self, child: BorrowedFd<'_>) -> Result<Readiness, LoopError> {
        let Some(guard) = self.read_guard.as_ref() else {
            return Ok(Readiness::default());
        };

        let connection_fd = guard.connection_fd();
        let mut fds = [
            PollFd::new(&connection_fd, PollFlags::IN),
            PollFd::new(&child, PollFlags::IN),
        ];

        match rustix::event::poll(&mut fds, -1) {
            Ok(_) => {}
            Err(e) if e == rustix::io::Errno::INTR => return Ok(Readiness::default()),
            Err(e) => return Err(LoopError::Poll(e.into())),
        }

        let readable = PollFlags::IN | PollFlags::ERR | PollFlags::HUP;
        Ok(Readiness {
            compositor: fds[0].revents().intersects(readable),
            child: fds[1].revents().intersects(readable),
        })
    }

    fn dispatch(&mut self, readable: bool) -> Result<(), LoopError> {
        if let Some(guard) = self.read_guard.take() {
            if readable {
                match guard.read() {
                    Err(e) if !would_block(&e) => return Err(LoopError::Read(wayland_io(e))),
                    _ => {}
                }
            }
            // An unread guard cancels the read when dropped.
        }

        self.queue
            .dispatch_pending(&mut self.state)
            .map_err(|e| LoopError::Dispatch(e.to_string()))?;
        Ok(())
    }
}
