//! Host-memory graphics device.

use super::{BufferUsage, DeviceBuffer, GpuError, GraphicsDevice};
use bytes::Bytes;
use std::any::Any;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

/// Allocation granularity of [`HostDevice`].
pub const BUFFER_ALIGNMENT: usize = 16;

/// Buffer stored in host memory.
#[derive(Debug, Clone)]
pub struct HostBuffer {
    label: String,
    data: Bytes,
    allocated: usize,
    usage: BufferUsage,
}

impl HostBuffer {
    /// Uploaded bytes.
    pub fn contents(&self) -> &[u8] {
        &self.data
    }
}

impl DeviceBuffer for HostBuffer {
    fn label(&self) -> &str {
        &self.label
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn allocated_size(&self) -> usize {
        self.allocated
    }

    fn usage(&self) -> BufferUsage {
        self.usage
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Graphics device that keeps buffers in host memory.
///
/// Allocations are rounded up to [`BUFFER_ALIGNMENT`], mirroring how real
/// devices over-allocate. An optional size limit makes oversized uploads
/// fail, which exercises the upload stage's error path.
#[derive(Debug, Default)]
pub struct HostDevice {
    max_buffer_size: Option<usize>,
    buffers_created: AtomicUsize,
    bytes_allocated: AtomicU64,
}

impl HostDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects any buffer larger than `bytes`.
    pub fn with_max_buffer_size(mut self, bytes: usize) -> Self {
        self.max_buffer_size = Some(bytes);
        self
    }

    /// Total buffers created so far.
    pub fn buffers_created(&self) -> usize {
        self.buffers_created.load(Ordering::Relaxed)
    }

    /// Total bytes reserved so far, including padding.
    pub fn bytes_allocated(&self) -> u64 {
        self.bytes_allocated.load(Ordering::Relaxed)
    }

    /// Padded size the device reserves for `len` bytes.
    pub fn aligned_size(len: usize) -> usize {
        len.div_ceil(BUFFER_ALIGNMENT) * BUFFER_ALIGNMENT
    }
}

impl GraphicsDevice for HostDevice {
    fn create_buffer(
        &self,
        label: &str,
        contents: &[u8],
        usage: BufferUsage,
    ) -> Result<Arc<dyn DeviceBuffer>, GpuError> {
        if let Some(max) = self.max_buffer_size {
            if contents.len() > max {
                return Err(GpuError::Allocation {
                    label: label.to_string(),
                    reason: format!("{} bytes exceeds device limit of {}", contents.len(), max),
                });
            }
        }

        let allocated = Self::aligned_size(contents.len());
        self.buffers_created.fetch_add(1, Ordering::Relaxed);
        self.bytes_allocated
            .fetch_add(allocated as u64, Ordering::Relaxed);

        Ok(Arc::new(HostBuffer {
            label: label.to_string(),
            data: Bytes::copy_from_slice(contents),
            allocated,
            usage,
        }))
    }

    fn name(&self) -> &str {
        "host"
    }
}
