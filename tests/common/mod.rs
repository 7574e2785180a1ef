//! Shared fake backend: a compositor that answers every request on its own
//! according to a per-output plan, and an event source that delivers those
//! answers while waiting on the real child notifier.

#![allow(dead_code)]

use rustix::event::{PollFd, PollFlags};
use std::collections::VecDeque;
use std::os::fd::BorrowedFd;
use still_lib::compositor::{AllocError, BufferParams, Compositor, FrameEvent, SurfaceEvent};
use still_lib::context::Context;
use still_lib::scheduler::{EventSource, LoopError, Readiness};
use wayland_client::protocol::wl_output::Transform;
use wayland_client::protocol::wl_shm::Format;

/// How the fake compositor answers a capture of one output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    Succeed,
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Capture { index: usize, overlay_cursor: bool },
    Attach(usize),
    CreateSurface(usize),
    Present(usize),
    DestroySurface(usize),
    DestroyBuffer(usize),
    DestroyFrame(usize),
    DestroyOutput(usize),
}

#[derive(Debug)]
pub enum Pending {
    Frame(usize, FrameEvent),
    Surface(usize, SurfaceEvent),
}

pub struct Surface {
    index: usize,
    presented: bool,
}

pub struct PlannedCompositor {
    plans: Vec<Plan>,
    pub calls: Vec<Call>,
    pub pending: VecDeque<Pending>,
}

pub fn params() -> BufferParams {
    BufferParams {
        format: Format::Argb8888,
        width: 2560,
        height: 1440,
        stride: 2560 * 4,
    }
}

impl Compositor for PlannedCompositor {
    type Output = usize;
    type Frame = usize;
    type Buffer = usize;
    type Surface = Surface;

    fn capture_output(&mut self, index: usize, _output: &usize, overlay_cursor: bool) -> usize {
        self.calls.push(Call::Capture {
            index,
            overlay_cursor,
        });
        match self.plans[index] {
            Plan::Succeed => {
                self.pending
                    .push_back(Pending::Frame(index, FrameEvent::Buffer(params())));
                self.pending
                    .push_back(Pending::Frame(index, FrameEvent::BufferDone));
            }
            Plan::Fail => self.pending.push_back(Pending::Frame(index, FrameEvent::Failed)),
        }
        index
    }

    fn attach_buffer(
        &mut self,
        index: usize,
        _frame: &usize,
        _params: &BufferParams,
    ) -> Result<usize, AllocError> {
        self.calls.push(Call::Attach(index));
        self.pending.push_back(Pending::Frame(index, FrameEvent::Ready));
        Ok(index)
    }

    fn create_surface(&mut self, index: usize, _output: &usize, _transform: Transform) -> Surface {
        self.calls.push(Call::CreateSurface(index));
        self.pending.push_back(Pending::Surface(
            index,
            SurfaceEvent::Configure {
                serial: index as u32 + 1,
                width: 1280,
                height: 720,
            },
        ));
        Surface {
            index,
            presented: false,
        }
    }

    fn configure_surface(
        &mut self,
        surface: &mut Surface,
        _buffer: &usize,
        _params: &BufferParams,
        _transform: Transform,
        _configure: SurfaceEvent,
    ) {
        if !surface.presented {
            self.calls.push(Call::Present(surface.index));
            surface.presented = true;
        }
    }

    fn destroy_surface(&mut self, surface: Surface) {
        self.calls.push(Call::DestroySurface(surface.index));
    }

    fn destroy_buffer(&mut self, buffer: usize) {
        self.calls.push(Call::DestroyBuffer(buffer));
    }

    fn destroy_frame(&mut self, frame: usize) {
        self.calls.push(Call::DestroyFrame(frame));
    }

    fn destroy_output(&mut self, output: usize) {
        self.calls.push(Call::DestroyOutput(output));
    }
}

/// Event source backed by [`PlannedCompositor`].
pub struct ScriptedSource {
    context: Context<PlannedCompositor>,
}

impl ScriptedSource {
    pub fn new(plans: &[Plan], overlay_cursor: bool) -> Self {
        let compositor = PlannedCompositor {
            plans: plans.to_vec(),
            calls: Vec::new(),
            pending: VecDeque::new(),
        };
        let mut context = Context::new(compositor, overlay_cursor);
        for index in 0..plans.len() {
            context.add_output(index);
        }
        Self { context }
    }

    pub fn calls(&self) -> &[Call] {
        &self.context.compositor().calls
    }

    pub fn into_context(self) -> Context<PlannedCompositor> {
        self.context
    }
}

impl EventSource for ScriptedSource {
    type Compositor = PlannedCompositor;

    fn context(&mut self) -> &mut Context<PlannedCompositor> {
        &mut self.context
    }

    fn prepare(&mut self) -> Result<(), LoopError> {
        Ok(())
    }

    fn wait(&mut self, child: BorrowedFd<'_>) -> Result<Readiness, LoopError> {
        let queued = !self.context.compositor().pending.is_empty();
        let mut fds = [PollFd::new(&child, PollFlags::IN)];
        let timeout = if queued { 0 } else { 1000 };

        match rustix::event::poll(&mut fds, timeout) {
            Ok(_) => {}
            Err(e) if e == rustix::io::Errno::INTR => {}
            Err(e) => return Err(LoopError::Poll(e.into())),
        }

        Ok(Readiness {
            compositor: queued,
            child: fds[0].revents().contains(PollFlags::IN),
        })
    }

    fn dispatch(&mut self, readable: bool) -> Result<(), LoopError> {
        if !readable {
            return Ok(());
        }
        while let Some(event) = self.context.compositor_mut().pending.pop_front() {
            match event {
                Pending::Frame(index, event) => self.context.handle_frame_event(index, event),
                Pending::Surface(index, event) => self.context.handle_surface_event(index, event),
            }
        }
        Ok(())
    }
}
