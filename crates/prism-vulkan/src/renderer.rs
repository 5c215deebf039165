//! The Vulkan renderer: resource factory and scene submission.

use std::sync::Arc;

use prism_core::{
    Capabilities, CommandBuffer, IndexBufferFormat, MappableResource, MappedSubresource,
    PipelineStateDesc, ProgramDesc, RenderPassDesc, Renderer, Resource, RootSignatureDesc,
    SamplerStateDesc, TextureDesc, TextureFormat, VertexAttributes,
};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::buffer::{
    IndexBuffer, IndirectBuffer, TextureBuffer, UniformBuffer, VertexArray, VertexBuffer,
};
use crate::capabilities::capabilities_from_properties;
use crate::context::VulkanContext;
use crate::dispatch::CommandDispatcher;
use crate::error::{log_critical, Result, VulkanError};
use crate::framebuffer::Framebuffer;
use crate::pipeline::PipelineState;
use crate::program::Program;
use crate::render_pass::RenderPass;
use crate::resource_group::ResourceGroup;
use crate::root_signature::{RootSignature, DEFAULT_MAX_DESCRIPTOR_SETS};
use crate::runtime::{default_validation, RuntimeLinking};
use crate::sampler::SamplerState;
use crate::surface::Surface;
use crate::swapchain::SwapChain;
use crate::texture::Texture;
use crate::Vulkan;

/// Builder for creating a [`VulkanRenderer`].
pub struct VulkanRendererBuilder {
    app_name: String,
    validation: bool,
    max_descriptor_sets: u32,
    vsync: bool,
}

impl Default for VulkanRendererBuilder {
    fn default() -> Self {
        Self {
            app_name: "Prism".to_string(),
            validation: default_validation(),
            max_descriptor_sets: DEFAULT_MAX_DESCRIPTOR_SETS,
            vsync: true,
        }
    }
}

impl VulkanRendererBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the application name reported to the driver.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = name.into();
        self
    }

    /// Enable or disable validation layers.
    pub fn validation(mut self, enable: bool) -> Self {
        self.validation = enable;
        self
    }

    /// Descriptor sets each root signature's pool is sized for.
    pub fn max_descriptor_sets(mut self, count: u32) -> Self {
        self.max_descriptor_sets = count.max(1);
        self
    }

    /// Present with FIFO (`true`) or the fastest available mode.
    pub fn vsync(mut self, enable: bool) -> Self {
        self.vsync = enable;
        self
    }

    /// Bring up the runtime and the device.
    pub fn build(self) -> Result<VulkanRenderer> {
        let runtime = Arc::new(RuntimeLinking::new(self.app_name, self.validation));
        if !runtime.is_vulkan_available() {
            return Err(VulkanError::RuntimeUnavailable(
                "failed to load Vulkan or create the instance".to_string(),
            ));
        }

        let context = Arc::new(VulkanContext::new(runtime)?);
        let capabilities = capabilities_from_properties(context.properties());
        tracing::info!(
            "Vulkan renderer ready on {} (max texture {}, max render targets {})",
            capabilities.device_name,
            capabilities.maximum_texture_dimension,
            capabilities.maximum_number_of_simultaneous_render_targets,
        );

        Ok(VulkanRenderer {
            dispatcher: CommandDispatcher::default(),
            capabilities,
            max_descriptor_sets: self.max_descriptor_sets,
            vsync: self.vsync,
            context,
        })
    }
}

/// Renderer executing recorded command buffers on one Vulkan device.
pub struct VulkanRenderer {
    dispatcher: CommandDispatcher,
    capabilities: Capabilities,
    max_descriptor_sets: u32,
    vsync: bool,
    context: Arc<VulkanContext>,
}

impl VulkanRenderer {
    pub fn builder() -> VulkanRendererBuilder {
        VulkanRendererBuilder::new()
    }

    pub fn context(&self) -> &Arc<VulkanContext> {
        &self.context
    }

    /// Whether a scene is being recorded.
    pub fn is_recording(&self) -> bool {
        self.dispatcher.is_recording()
    }
}

impl Renderer for VulkanRenderer {
    type Backend = Vulkan;
    type Error = VulkanError;

    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn create_render_pass(&self, desc: &RenderPassDesc) -> Result<Arc<RenderPass>> {
        RenderPass::new(&self.context, desc)
            .map(Arc::new)
            .map_err(|e| log_critical("render pass", e))
    }

    fn create_swap_chain<W>(
        &self,
        render_pass: Arc<RenderPass>,
        window: &W,
        width: u32,
        height: u32,
    ) -> Result<Arc<SwapChain>>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        Surface::from_window(&self.context, window)
            .and_then(|surface| {
                SwapChain::new(&self.context, render_pass, surface, width, height, self.vsync)
            })
            .map(Arc::new)
            .map_err(|e| log_critical("swap chain", e))
    }

    fn create_framebuffer(
        &self,
        render_pass: Arc<RenderPass>,
        color_textures: &[Arc<Texture>],
        depth_stencil_texture: Option<Arc<Texture>>,
    ) -> Result<Arc<Framebuffer>> {
        Framebuffer::new(&self.context, render_pass, color_textures, depth_stencil_texture)
            .map(Arc::new)
            .map_err(|e| log_critical("framebuffer", e))
    }

    fn create_vertex_buffer(&self, size: u32, data: Option<&[u8]>) -> Result<Arc<VertexBuffer>> {
        VertexBuffer::new(&self.context, size, data)
            .map(Arc::new)
            .map_err(|e| log_critical("vertex buffer", e))
    }

    fn create_index_buffer(
        &self,
        format: IndexBufferFormat,
        number_of_indices: u32,
        data: Option<&[u8]>,
    ) -> Result<Arc<IndexBuffer>> {
        IndexBuffer::new(&self.context, format, number_of_indices, data)
            .map(Arc::new)
            .map_err(|e| log_critical("index buffer", e))
    }

    fn create_vertex_array(
        &self,
        vertex_attributes: &VertexAttributes,
        vertex_buffers: &[Arc<VertexBuffer>],
        index_buffer: Option<Arc<IndexBuffer>>,
    ) -> Result<Arc<VertexArray>> {
        VertexArray::new(vertex_attributes, vertex_buffers, index_buffer)
            .map(Arc::new)
            .map_err(|e| log_critical("vertex array", e))
    }

    fn create_uniform_buffer(&self, size: u32, data: Option<&[u8]>) -> Result<Arc<UniformBuffer>> {
        UniformBuffer::new(&self.context, size, data)
            .map(Arc::new)
            .map_err(|e| log_critical("uniform buffer", e))
    }

    fn create_texture_buffer(
        &self,
        size: u32,
        format: TextureFormat,
        data: Option<&[u8]>,
    ) -> Result<Arc<TextureBuffer>> {
        TextureBuffer::new(&self.context, size, format, data)
            .map(Arc::new)
            .map_err(|e| log_critical("texture buffer", e))
    }

    fn create_indirect_buffer(&self, size: u32, data: Option<&[u8]>) -> Result<Arc<IndirectBuffer>> {
        IndirectBuffer::new(&self.context, size, data)
            .map(Arc::new)
            .map_err(|e| log_critical("indirect buffer", e))
    }

    fn create_texture(&self, desc: &TextureDesc, data: Option<&[u8]>) -> Result<Arc<Texture>> {
        Texture::new(&self.context, desc, data)
            .map(Arc::new)
            .map_err(|e| log_critical("texture", e))
    }

    fn create_root_signature(&self, desc: &RootSignatureDesc) -> Result<Arc<RootSignature>> {
        RootSignature::new(&self.context, desc, self.max_descriptor_sets)
            .map(Arc::new)
            .map_err(|e| log_critical("root signature", e))
    }

    fn create_resource_group(
        &self,
        root_signature: &Arc<RootSignature>,
        root_parameter_index: u32,
        resources: &[Resource<Vulkan>],
        sampler_states: &[Option<Arc<SamplerState>>],
    ) -> Result<Arc<ResourceGroup>> {
        ResourceGroup::new(root_signature, root_parameter_index, resources, sampler_states)
            .map(Arc::new)
            .map_err(|e| log_critical("resource group", e))
    }

    fn create_program(&self, desc: &ProgramDesc) -> Result<Arc<Program>> {
        Program::new(&self.context, desc)
            .map(Arc::new)
            .map_err(|e| log_critical("program", e))
    }

    fn create_pipeline_state(&self, desc: &PipelineStateDesc<Vulkan>) -> Result<Arc<PipelineState>> {
        PipelineState::new(&self.context, desc)
            .map(Arc::new)
            .map_err(|e| log_critical("pipeline state", e))
    }

    fn create_sampler_state(&self, desc: &SamplerStateDesc) -> Result<Arc<SamplerState>> {
        SamplerState::new(&self.context, desc)
            .map(Arc::new)
            .map_err(|e| log_critical("sampler state", e))
    }

    fn map<'a>(&'a self, resource: MappableResource<'a, Vulkan>) -> Result<MappedSubresource<'a>> {
        let buffer = match resource {
            MappableResource::VertexBuffer(r) => r.buffer(),
            MappableResource::IndexBuffer(r) => r.buffer(),
            MappableResource::UniformBuffer(r) => r.buffer(),
            MappableResource::TextureBuffer(r) => r.buffer(),
            MappableResource::IndirectBuffer(r) => r.buffer(),
        };
        buffer.map()
    }

    fn begin_scene(&mut self) -> Result<()> {
        self.dispatcher.begin_scene(&self.context)
    }

    fn submit_command_buffer(&mut self, command_buffer: &CommandBuffer<Vulkan>) {
        self.dispatcher.dispatch(&self.context, command_buffer);
    }

    fn end_scene(&mut self) -> Result<()> {
        self.dispatcher.end_scene(&self.context)
    }

    fn flush(&mut self) -> Result<()> {
        // Every scene is submitted and waited for in end_scene
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.context.wait_idle()
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        if self.dispatcher.is_recording() {
            tracing::warn!("Vulkan renderer dropped while a scene was being recorded");
        }
        let _ = self.context.wait_idle();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::{ClearFlags, TextureFlags};

    #[test]
    fn builder_defaults() {
        let builder = VulkanRendererBuilder::new();
        assert_eq!(builder.app_name, "Prism");
        assert_eq!(builder.max_descriptor_sets, DEFAULT_MAX_DESCRIPTOR_SETS);
        assert!(builder.vsync);
        assert_eq!(builder.validation, default_validation());
    }

    #[test]
    fn builder_overrides() {
        let builder = VulkanRenderer::builder()
            .app_name("viewer")
            .validation(false)
            .max_descriptor_sets(0)
            .vsync(false);
        assert_eq!(builder.app_name, "viewer");
        assert!(!builder.validation);
        assert_eq!(builder.max_descriptor_sets, 1);
        assert!(!builder.vsync);
    }

    fn renderer() -> VulkanRenderer {
        VulkanRenderer::builder()
            .app_name("prism-renderer-test")
            .build()
            .unwrap()
    }

    #[test]
    #[ignore = "requires a Vulkan device"]
    fn uniform_buffer_reads_back_initial_data() {
        let renderer = renderer();
        let data: Vec<u8> = (0..=255).collect();
        let uniform_buffer = renderer.create_uniform_buffer(256, Some(&data)).unwrap();

        let mapped = renderer
            .map(MappableResource::UniformBuffer(&*uniform_buffer))
            .unwrap();
        assert_eq!(mapped.data(), data.as_slice());
        assert!(renderer
            .map(MappableResource::UniformBuffer(&*uniform_buffer))
            .is_err());
        renderer.unmap(mapped);
        assert!(!uniform_buffer.buffer().is_mapped());
    }

    #[test]
    #[ignore = "requires a Vulkan device"]
    fn scene_into_framebuffer() {
        let mut renderer = renderer();
        let color = renderer
            .create_texture(
                &TextureDesc::new_2d(
                    64,
                    32,
                    TextureFormat::R8G8B8A8Unorm,
                    TextureFlags::RENDER_TARGET,
                ),
                None,
            )
            .unwrap();
        let render_pass = renderer
            .create_render_pass(
                &RenderPassDesc::new(&[TextureFormat::R8G8B8A8Unorm], None, 1).unwrap(),
            )
            .unwrap();
        let framebuffer = renderer
            .create_framebuffer(render_pass, &[color], None)
            .unwrap();
        assert_eq!(framebuffer.width_and_height(), (64, 32));

        let mut commands = CommandBuffer::new();
        commands
            .set_graphics_render_target(Some(prism_core::RenderTarget::Framebuffer(
                framebuffer,
            )))
            .set_graphics_viewport_and_scissor(64, 32)
            .clear_graphics(ClearFlags::COLOR, [0.0, 0.5, 1.0, 1.0], 1.0, 0);

        renderer.begin_scene().unwrap();
        assert!(renderer.begin_scene().is_err());
        renderer.submit_command_buffer(&commands);
        renderer.end_scene().unwrap();
        renderer.finish().unwrap();
        assert!(!renderer.is_recording());
    }
}
