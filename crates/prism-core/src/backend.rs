//! Backend and renderer traits.
//!
//! A [`Backend`] names the concrete resource types of one graphics API.
//! A [`Renderer`] creates those resources and executes recorded
//! [`CommandBuffer`]s. The backend is selected once when the renderer is
//! constructed; recorded commands are generic over it, so no per-call
//! dynamic dispatch happens on the hot path.

use std::fmt;
use std::sync::Arc;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::buffer::{IndexBufferFormat, VertexAttributes};
use crate::command::CommandBuffer;
use crate::format::TextureFormat;
use crate::render_target::RenderPassDesc;
use crate::root_signature::RootSignatureDesc;
use crate::state::{PipelineStateDesc, ProgramDesc, SamplerStateDesc};
use crate::texture::TextureDesc;

/// Concrete resource types of one graphics API.
///
/// Resources are shared through [`Arc`]; whoever stores a resource keeps it
/// alive, and the GPU object is destroyed with the last reference.
pub trait Backend: Sized + 'static {
    type RenderPass;
    type SwapChain;
    type Framebuffer;
    type VertexBuffer;
    type IndexBuffer;
    type VertexArray;
    type UniformBuffer;
    type TextureBuffer;
    type IndirectBuffer;
    type Texture;
    type RootSignature;
    type ResourceGroup;
    type Program;
    type PipelineState;
    type SamplerState;
}

/// Resource bound into one descriptor table of a resource group.
pub enum Resource<B: Backend> {
    UniformBuffer(Arc<B::UniformBuffer>),
    TextureBuffer(Arc<B::TextureBuffer>),
    Texture(Arc<B::Texture>),
    SamplerState(Arc<B::SamplerState>),
    VertexBuffer(Arc<B::VertexBuffer>),
    IndexBuffer(Arc<B::IndexBuffer>),
    IndirectBuffer(Arc<B::IndirectBuffer>),
}

impl<B: Backend> Resource<B> {
    /// Short name of the resource kind, used in diagnostics.
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::UniformBuffer(_) => "uniform buffer",
            Self::TextureBuffer(_) => "texture buffer",
            Self::Texture(_) => "texture",
            Self::SamplerState(_) => "sampler state",
            Self::VertexBuffer(_) => "vertex buffer",
            Self::IndexBuffer(_) => "index buffer",
            Self::IndirectBuffer(_) => "indirect buffer",
        }
    }
}

impl<B: Backend> Clone for Resource<B> {
    fn clone(&self) -> Self {
        match self {
            Self::UniformBuffer(r) => Self::UniformBuffer(Arc::clone(r)),
            Self::TextureBuffer(r) => Self::TextureBuffer(Arc::clone(r)),
            Self::Texture(r) => Self::Texture(Arc::clone(r)),
            Self::SamplerState(r) => Self::SamplerState(Arc::clone(r)),
            Self::VertexBuffer(r) => Self::VertexBuffer(Arc::clone(r)),
            Self::IndexBuffer(r) => Self::IndexBuffer(Arc::clone(r)),
            Self::IndirectBuffer(r) => Self::IndirectBuffer(Arc::clone(r)),
        }
    }
}

impl<B: Backend> fmt::Debug for Resource<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind_name())
    }
}

/// Resource that can be mapped into CPU address space.
pub enum MappableResource<'a, B: Backend> {
    VertexBuffer(&'a B::VertexBuffer),
    IndexBuffer(&'a B::IndexBuffer),
    UniformBuffer(&'a B::UniformBuffer),
    TextureBuffer(&'a B::TextureBuffer),
    IndirectBuffer(&'a B::IndirectBuffer),
}

/// CPU view of a mapped resource.
///
/// The resource is unmapped when this value is dropped or passed to
/// [`Renderer::unmap`].
pub struct MappedSubresource<'a> {
    data: &'a mut [u8],
    row_pitch: u32,
    depth_pitch: u32,
    unmap: Option<Box<dyn FnOnce() + 'a>>,
}

impl<'a> MappedSubresource<'a> {
    /// Wrap mapped memory. `unmap` runs exactly once, when the mapping ends.
    pub fn new(
        data: &'a mut [u8],
        row_pitch: u32,
        depth_pitch: u32,
        unmap: impl FnOnce() + 'a,
    ) -> Self {
        Self {
            data,
            row_pitch,
            depth_pitch,
            unmap: Some(Box::new(unmap)),
        }
    }

    /// Mapped bytes.
    pub fn data(&self) -> &[u8] {
        self.data
    }

    /// Mapped bytes, writable.
    pub fn data_mut(&mut self) -> &mut [u8] {
        self.data
    }

    pub const fn row_pitch(&self) -> u32 {
        self.row_pitch
    }

    pub const fn depth_pitch(&self) -> u32 {
        self.depth_pitch
    }
}

impl Drop for MappedSubresource<'_> {
    fn drop(&mut self) {
        if let Some(unmap) = self.unmap.take() {
            unmap();
        }
    }
}

impl fmt::Debug for MappedSubresource<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedSubresource")
            .field("len", &self.data.len())
            .field("row_pitch", &self.row_pitch)
            .field("depth_pitch", &self.depth_pitch)
            .finish()
    }
}

/// Limits of the device a renderer runs on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub device_name: String,
    pub maximum_texture_dimension: u32,
    pub maximum_3d_texture_dimension: u32,
    pub maximum_cube_dimension: u32,
    pub maximum_number_of_2d_texture_array_slices: u32,
    pub maximum_number_of_viewports: u32,
    pub maximum_number_of_simultaneous_render_targets: u32,
    pub maximum_uniform_buffer_size: u32,
    pub maximum_texture_buffer_size: u32,
    pub maximum_number_of_multisamples: u8,
    pub maximum_anisotropy: u8,
}

/// Resource factory and command executor of one backend.
pub trait Renderer {
    type Backend: Backend;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Limits of the device this renderer runs on.
    fn capabilities(&self) -> &Capabilities;

    fn create_render_pass(
        &self,
        desc: &RenderPassDesc,
    ) -> Result<Arc<<Self::Backend as Backend>::RenderPass>, Self::Error>;

    /// Create a swap chain presenting into the given window.
    fn create_swap_chain<W>(
        &self,
        render_pass: Arc<<Self::Backend as Backend>::RenderPass>,
        window: &W,
        width: u32,
        height: u32,
    ) -> Result<Arc<<Self::Backend as Backend>::SwapChain>, Self::Error>
    where
        W: HasDisplayHandle + HasWindowHandle;

    /// Create a framebuffer rendering into the given textures.
    ///
    /// Width and height of the framebuffer are the minimum across all
    /// attachments.
    fn create_framebuffer(
        &self,
        render_pass: Arc<<Self::Backend as Backend>::RenderPass>,
        color_textures: &[Arc<<Self::Backend as Backend>::Texture>],
        depth_stencil_texture: Option<Arc<<Self::Backend as Backend>::Texture>>,
    ) -> Result<Arc<<Self::Backend as Backend>::Framebuffer>, Self::Error>;

    fn create_vertex_buffer(
        &self,
        size: u32,
        data: Option<&[u8]>,
    ) -> Result<Arc<<Self::Backend as Backend>::VertexBuffer>, Self::Error>;

    fn create_index_buffer(
        &self,
        format: IndexBufferFormat,
        number_of_indices: u32,
        data: Option<&[u8]>,
    ) -> Result<Arc<<Self::Backend as Backend>::IndexBuffer>, Self::Error>;

    /// Create a vertex array combining vertex buffers, one per input slot,
    /// with an optional index buffer.
    fn create_vertex_array(
        &self,
        vertex_attributes: &VertexAttributes,
        vertex_buffers: &[Arc<<Self::Backend as Backend>::VertexBuffer>],
        index_buffer: Option<Arc<<Self::Backend as Backend>::IndexBuffer>>,
    ) -> Result<Arc<<Self::Backend as Backend>::VertexArray>, Self::Error>;

    fn create_uniform_buffer(
        &self,
        size: u32,
        data: Option<&[u8]>,
    ) -> Result<Arc<<Self::Backend as Backend>::UniformBuffer>, Self::Error>;

    fn create_texture_buffer(
        &self,
        size: u32,
        format: TextureFormat,
        data: Option<&[u8]>,
    ) -> Result<Arc<<Self::Backend as Backend>::TextureBuffer>, Self::Error>;

    /// Create a buffer of [`DrawArguments`](crate::DrawArguments) or
    /// [`DrawIndexedArguments`](crate::DrawIndexedArguments) records.
    fn create_indirect_buffer(
        &self,
        size: u32,
        data: Option<&[u8]>,
    ) -> Result<Arc<<Self::Backend as Backend>::IndirectBuffer>, Self::Error>;

    /// Create a texture, uploading `data` when given.
    fn create_texture(
        &self,
        desc: &TextureDesc,
        data: Option<&[u8]>,
    ) -> Result<Arc<<Self::Backend as Backend>::Texture>, Self::Error>;

    fn create_root_signature(
        &self,
        desc: &RootSignatureDesc,
    ) -> Result<Arc<<Self::Backend as Backend>::RootSignature>, Self::Error>;

    /// Create a resource group filling the descriptor table at
    /// `root_parameter_index`.
    ///
    /// `sampler_states[i]` is combined with `resources[i]` when the latter is
    /// a texture.
    fn create_resource_group(
        &self,
        root_signature: &Arc<<Self::Backend as Backend>::RootSignature>,
        root_parameter_index: u32,
        resources: &[Resource<Self::Backend>],
        sampler_states: &[Option<Arc<<Self::Backend as Backend>::SamplerState>>],
    ) -> Result<Arc<<Self::Backend as Backend>::ResourceGroup>, Self::Error>;

    fn create_program(
        &self,
        desc: &ProgramDesc,
    ) -> Result<Arc<<Self::Backend as Backend>::Program>, Self::Error>;

    fn create_pipeline_state(
        &self,
        desc: &PipelineStateDesc<Self::Backend>,
    ) -> Result<Arc<<Self::Backend as Backend>::PipelineState>, Self::Error>;

    fn create_sampler_state(
        &self,
        desc: &SamplerStateDesc,
    ) -> Result<Arc<<Self::Backend as Backend>::SamplerState>, Self::Error>;

    /// Map a resource into CPU address space.
    fn map<'a>(
        &'a self,
        resource: MappableResource<'a, Self::Backend>,
    ) -> Result<MappedSubresource<'a>, Self::Error>;

    /// End a mapping started by [`Renderer::map`].
    fn unmap(&self, mapped: MappedSubresource<'_>) {
        drop(mapped);
    }

    /// Start recording a scene.
    fn begin_scene(&mut self) -> Result<(), Self::Error>;

    /// Execute recorded commands as part of the current scene.
    fn submit_command_buffer(&mut self, command_buffer: &CommandBuffer<Self::Backend>);

    /// Finish the current scene and submit it to the GPU.
    fn end_scene(&mut self) -> Result<(), Self::Error>;

    /// Submit pending work without waiting.
    fn flush(&mut self) -> Result<(), Self::Error>;

    /// Submit pending work and wait for the GPU to finish it.
    fn finish(&mut self) -> Result<(), Self::Error>;
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Backend with unit resources, for exercising generic code.
    pub(crate) struct NullBackend;

    impl Backend for NullBackend {
        type RenderPass = ();
        type SwapChain = ();
        type Framebuffer = ();
        type VertexBuffer = ();
        type IndexBuffer = ();
        type VertexArray = ();
        type UniformBuffer = ();
        type TextureBuffer = ();
        type IndirectBuffer = ();
        type Texture = ();
        type RootSignature = ();
        type ResourceGroup = ();
        type Program = ();
        type PipelineState = ();
        type SamplerState = ();
    }

    #[test]
    fn mapped_subresource_unmaps_once() {
        use std::cell::Cell;

        let unmapped = Cell::new(0);
        let mut storage = [0_u8; 16];
        {
            let mut mapped = MappedSubresource::new(&mut storage, 16, 16, || {
                unmapped.set(unmapped.get() + 1);
            });
            mapped.data_mut()[3] = 7;
            assert_eq!(mapped.data().len(), 16);
        }
        assert_eq!(unmapped.get(), 1);
        assert_eq!(storage[3], 7);
    }

    #[test]
    fn resource_clone_shares_ownership() {
        let texture = Arc::new(());
        let resource = Resource::<NullBackend>::Texture(Arc::clone(&texture));
        let copy = resource.clone();
        assert_eq!(Arc::strong_count(&texture), 3);
        drop((resource, copy));
        assert_eq!(Arc::strong_count(&texture), 1);
        assert_eq!(
            Resource::<NullBackend>::SamplerState(Arc::new(())).kind_name(),
            "sampler state"
        );
    }
}
