//! Graphics device abstraction.
//!
//! The upload stage only needs one capability from the graphics API: turning
//! a byte slice into an immutable, GPU-visible buffer. [`GraphicsDevice`]
//! captures exactly that so the engine never depends on a concrete API.
//!
//! # Implementors
//!
//! - [`HostDevice`] - keeps buffers in host memory; used headless and in tests
//! - `WgpuDevice` - allocates through `wgpu` (feature `wgpu`)

mod host;
#[cfg(feature = "wgpu")]
mod wgpu_device;

pub use host::{HostBuffer, HostDevice, BUFFER_ALIGNMENT};
#[cfg(feature = "wgpu")]
pub use wgpu_device::{WgpuBuffer, WgpuDevice};

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// How a buffer is bound by the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferUsage {
    Vertex,
    Index,
    Uniform,
}

/// An immutable buffer owned by a graphics device.
pub trait DeviceBuffer: Send + Sync + fmt::Debug {
    /// Debug label given at creation.
    fn label(&self) -> &str;

    /// Number of bytes uploaded.
    fn len(&self) -> usize;

    /// Whether the buffer holds no data.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes actually reserved by the device, including alignment padding.
    ///
    /// This is what the decoded tile cache charges against its budget.
    fn allocated_size(&self) -> usize;

    /// Usage the buffer was created with.
    fn usage(&self) -> BufferUsage;

    /// Access to the concrete buffer type for the renderer.
    fn as_any(&self) -> &dyn Any;
}

/// Capability to allocate immutable GPU-visible buffers.
///
/// Implementations must be thread-safe (`Send + Sync`); buffers are created
/// from the upload stage's worker thread. APIs with thread affinity must
/// marshal creation internally.
pub trait GraphicsDevice: Send + Sync {
    /// Creates a buffer initialised with `contents`.
    fn create_buffer(
        &self,
        label: &str,
        contents: &[u8],
        usage: BufferUsage,
    ) -> Result<Arc<dyn DeviceBuffer>, GpuError>;

    /// Short device name for logging.
    fn name(&self) -> &str;
}

/// Errors raised while allocating device buffers.
#[derive(Debug, Error)]
pub enum GpuError {
    #[error("buffer allocation failed for '{label}': {reason}")]
    Allocation { label: String, reason: String },

    #[error("graphics device unavailable: {0}")]
    Unavailable(String),
}
