//! The compositor seam — everything the capture engine and the overlay
//! renderer ask of the display server.
//!
//! The real implementation lives in `crate::wayland`. Tests substitute a
//! recording fake, so nothing in here may touch a socket.

use wayland_client::protocol::{wl_output::Transform, wl_shm::Format};

/// Shared-memory buffer layout requested by the compositor for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferParams {
    pub format: Format,
    pub width: u32,
    pub height: u32,
    pub stride: u32,
}

impl BufferParams {
    /// Byte size of the backing memory, or `None` if it does not fit the
    /// protocol's signed 32-bit size field.
    pub fn byte_len(&self) -> Option<usize> {
        let len = self.stride.checked_mul(self.height)?;
        if len == 0 || len > i32::MAX as u32 {
            return None;
        }
        Some(len as usize)
    }

    /// Buffer size after undoing the output transform, i.e. the size the
    /// frozen image occupies on screen in buffer pixels.
    pub fn transformed_size(&self, transform: Transform) -> (u32, u32) {
        match transform {
            Transform::_90 | Transform::_270 | Transform::Flipped90 | Transform::Flipped270 => {
                (self.height, self.width)
            }
            _ => (self.width, self.height),
        }
    }
}

/// Screen-capture notifications for one overlay, in protocol order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameEvent {
    /// The compositor announced the shared-memory layout it will copy into.
    Buffer(BufferParams),
    /// All buffer types have been announced; the client may submit.
    BufferDone,
    /// The copy completed; the submitted buffer now holds the frame.
    Ready,
    /// The copy failed and will not be retried.
    Failed,
}

/// Overlay-surface notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceEvent {
    /// Logical size is `0` in a dimension the compositor leaves to us.
    Configure { serial: u32, width: u32, height: u32 },
    Closed,
}

#[derive(Debug, thiserror::Error)]
pub enum AllocError {
    #[error("buffer {width}x{height} with stride {stride} does not fit a shm pool")]
    InvalidSize { width: u32, height: u32, stride: u32 },

    #[error("shared memory allocation failed: {0}")]
    SharedMemory(#[from] std::io::Error),
}

/// Requests issued by the capture engine and the overlay renderer.
///
/// Every handle type is exclusively owned by exactly one overlay and handed
/// back through the matching `destroy_*` call.
pub trait Compositor {
    type Output;
    type Frame;
    type Buffer;
    type Surface;

    /// Ask for a copy of `output`'s current frame. Answers arrive later as
    /// [`FrameEvent`]s tagged with `index`.
    fn capture_output(&mut self, index: usize, output: &Self::Output, overlay_cursor: bool)
        -> Self::Frame;

    /// Allocate shared memory matching `params`, wrap it as a buffer and
    /// submit it to complete the copy.
    fn attach_buffer(
        &mut self,
        index: usize,
        frame: &Self::Frame,
        params: &BufferParams,
    ) -> Result<Self::Buffer, AllocError>;

    /// Create the full-output, input-transparent overlay surface. Content is
    /// attached later, on the first configure.
    fn create_surface(&mut self, index: usize, output: &Self::Output, transform: Transform)
        -> Self::Surface;

    /// Acknowledge a configure; on the first one attach `buffer`, scale it to
    /// the logical size and commit.
    fn configure_surface(
        &mut self,
        surface: &mut Self::Surface,
        buffer: &Self::Buffer,
        params: &BufferParams,
        transform: Transform,
        configure: SurfaceEvent,
    );

    fn destroy_surface(&mut self, surface: Self::Surface);
    fn destroy_buffer(&mut self, buffer: Self::Buffer);
    fn destroy_frame(&mut self, frame: Self::Frame);
    fn destroy_output(&mut self, output: Self::Output);
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_len_is_stride_times_height() {
        let params = fake::params();
        assert_eq!(params.byte_len(), Some(1920 * 4 * 1080));
    }

    #[test]
    fn byte_len_rejects_empty_and_oversized_buffers() {
        let mut params = fake::params();
        params.height = 0;
        assert_eq!(params.byte_len(), None);

        params.height = u32::MAX;
        assert_eq!(params.byte_len(), None);

        params.height = (i32::MAX as u32 / params.stride) + 1;
        assert_eq!(params.byte_len(), None);
    }

    #[test]
    fn rotated_outputs_swap_dimensions() {
        let params = fake::params();
        assert_eq!(params.transformed_size(Transform::Normal), (1920, 1080));
        assert_eq!(params.transformed_size(Transform::Flipped180), (1920, 1080));
        assert_eq!(params.transformed_size(Transform::_90), (1080, 1920));
        assert_eq!(params.transformed_size(Transform::Flipped270), (1080, 1920));
    }
}
