//! Vertex, index, uniform, texture and indirect buffers plus vertex arrays.
//!
//! Every buffer lives in host-visible, host-coherent memory so it can be
//! mapped and updated without staging.

use std::sync::Arc;

use ash::vk;
use prism_core::{IndexBufferFormat, TextureFormat, VertexAttributes};

use crate::context::VulkanContext;
use crate::error::{Result, VulkanError};
use crate::mapping;
use crate::memory::GpuBuffer;

pub struct VertexBuffer {
    buffer: GpuBuffer,
}

impl VertexBuffer {
    pub fn new(context: &Arc<VulkanContext>, size: u32, data: Option<&[u8]>) -> Result<Self> {
        Ok(Self {
            buffer: GpuBuffer::host_visible(
                context,
                vk::BufferUsageFlags::VERTEX_BUFFER,
                u64::from(size),
                data,
            )?,
        })
    }

    pub fn buffer(&self) -> &GpuBuffer {
        &self.buffer
    }
}

pub struct IndexBuffer {
    buffer: GpuBuffer,
    format: IndexBufferFormat,
}

impl IndexBuffer {
    pub fn new(
        context: &Arc<VulkanContext>,
        format: IndexBufferFormat,
        number_of_indices: u32,
        data: Option<&[u8]>,
    ) -> Result<Self> {
        let size = u64::from(number_of_indices) * u64::from(format.bytes_per_element());
        Ok(Self {
            buffer: GpuBuffer::host_visible(context, vk::BufferUsageFlags::INDEX_BUFFER, size, data)?,
            format,
        })
    }

    pub fn buffer(&self) -> &GpuBuffer {
        &self.buffer
    }

    pub fn format(&self) -> IndexBufferFormat {
        self.format
    }

    pub fn index_type(&self) -> vk::IndexType {
        mapping::index_type(self.format)
    }
}

pub struct UniformBuffer {
    buffer: GpuBuffer,
}

impl UniformBuffer {
    pub fn new(context: &Arc<VulkanContext>, size: u32, data: Option<&[u8]>) -> Result<Self> {
        Ok(Self {
            buffer: GpuBuffer::host_visible(
                context,
                vk::BufferUsageFlags::UNIFORM_BUFFER,
                u64::from(size),
                data,
            )?,
        })
    }

    pub fn buffer(&self) -> &GpuBuffer {
        &self.buffer
    }
}

/// Buffer read in shaders as a typed texel buffer.
pub struct TextureBuffer {
    buffer: GpuBuffer,
    view: vk::BufferView,
    format: TextureFormat,
}

impl TextureBuffer {
    pub fn new(
        context: &Arc<VulkanContext>,
        size: u32,
        format: TextureFormat,
        data: Option<&[u8]>,
    ) -> Result<Self> {
        let buffer = GpuBuffer::host_visible(
            context,
            vk::BufferUsageFlags::UNIFORM_TEXEL_BUFFER,
            u64::from(size),
            data,
        )?;
        let view_info = vk::BufferViewCreateInfo::default()
            .buffer(buffer.handle())
            .format(mapping::texture_format(format))
            .offset(0)
            .range(vk::WHOLE_SIZE);
        let view = unsafe { context.device().create_buffer_view(&view_info, None) }?;
        Ok(Self {
            buffer,
            view,
            format,
        })
    }

    pub fn buffer(&self) -> &GpuBuffer {
        &self.buffer
    }

    pub fn view(&self) -> vk::BufferView {
        self.view
    }

    pub fn format(&self) -> TextureFormat {
        self.format
    }
}

impl Drop for TextureBuffer {
    fn drop(&mut self) {
        unsafe {
            self.buffer
                .context()
                .device()
                .destroy_buffer_view(self.view, None);
        }
    }
}

/// Buffer of draw argument records consumed by indirect draws.
pub struct IndirectBuffer {
    buffer: GpuBuffer,
}

impl IndirectBuffer {
    pub fn new(context: &Arc<VulkanContext>, size: u32, data: Option<&[u8]>) -> Result<Self> {
        Ok(Self {
            buffer: GpuBuffer::host_visible(
                context,
                vk::BufferUsageFlags::INDIRECT_BUFFER,
                u64::from(size),
                data,
            )?,
        })
    }

    pub fn buffer(&self) -> &GpuBuffer {
        &self.buffer
    }
}

/// Vertex buffers, one per input slot, with an optional index buffer.
pub struct VertexArray {
    vertex_buffers: Vec<Arc<VertexBuffer>>,
    index_buffer: Option<Arc<IndexBuffer>>,
}

impl VertexArray {
    pub fn new(
        vertex_attributes: &VertexAttributes,
        vertex_buffers: &[Arc<VertexBuffer>],
        index_buffer: Option<Arc<IndexBuffer>>,
    ) -> Result<Self> {
        let slots = vertex_attributes.slot_count() as usize;
        if vertex_buffers.len() < slots {
            return Err(VulkanError::InvalidState(format!(
                "vertex attributes read {slots} slots but only {} vertex buffers were given",
                vertex_buffers.len()
            )));
        }
        Ok(Self {
            vertex_buffers: vertex_buffers.to_vec(),
            index_buffer,
        })
    }

    pub fn index_buffer(&self) -> Option<&Arc<IndexBuffer>> {
        self.index_buffer.as_ref()
    }

    pub fn vertex_buffer_count(&self) -> usize {
        self.vertex_buffers.len()
    }

    /// Bind the vertex buffers and the index buffer, if any.
    ///
    /// # Safety
    /// The command buffer must be recording.
    pub unsafe fn bind(&self, device: &ash::Device, command_buffer: vk::CommandBuffer) {
        if !self.vertex_buffers.is_empty() {
            let handles: Vec<_> = self
                .vertex_buffers
                .iter()
                .map(|vertex_buffer| vertex_buffer.buffer().handle())
                .collect();
            let offsets = vec![0; handles.len()];
            unsafe { device.cmd_bind_vertex_buffers(command_buffer, 0, &handles, &offsets) };
        }
        if let Some(index_buffer) = &self.index_buffer {
            unsafe {
                device.cmd_bind_index_buffer(
                    command_buffer,
                    index_buffer.buffer().handle(),
                    0,
                    index_buffer.index_type(),
                );
            }
        }
    }
}
