//! `wgpu` graphics device.

use super::{BufferUsage, DeviceBuffer, GpuError, GraphicsDevice};
use std::any::Any;
use std::sync::Arc;
use wgpu::util::DeviceExt;

/// Buffer allocated through `wgpu`.
#[derive(Debug)]
pub struct WgpuBuffer {
    label: String,
    buffer: wgpu::Buffer,
    len: usize,
    usage: BufferUsage,
}

impl WgpuBuffer {
    /// Underlying `wgpu` buffer for binding in render passes.
    pub fn raw(&self) -> &wgpu::Buffer {
        &self.buffer
    }
}

impl DeviceBuffer for WgpuBuffer {
    fn label(&self) -> &str {
        &self.label
    }

    fn len(&self) -> usize {
        self.len
    }

    fn allocated_size(&self) -> usize {
        self.buffer.size() as usize
    }

    fn usage(&self) -> BufferUsage {
        self.usage
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Graphics device backed by a `wgpu::Device`.
#[derive(Debug, Clone)]
pub struct WgpuDevice {
    device: wgpu::Device,
}

impl WgpuDevice {
    pub fn new(device: wgpu::Device) -> Self {
        Self { device }
    }
}

impl GraphicsDevice for WgpuDevice {
    fn create_buffer(
        &self,
        label: &str,
        contents: &[u8],
        usage: BufferUsage,
    ) -> Result<Arc<dyn DeviceBuffer>, GpuError> {
        let usages = match usage {
            BufferUsage::Vertex => wgpu::BufferUsages::VERTEX,
            BufferUsage::Index => wgpu::BufferUsages::INDEX,
            BufferUsage::Uniform => wgpu::BufferUsages::UNIFORM,
        };

        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage: usages,
            });

        Ok(Arc::new(WgpuBuffer {
            label: label.to_string(),
            buffer,
            len: contents.len(),
            usage,
        }))
    }

    fn name(&self) -> &str {
        "wgpu"
    }
}
