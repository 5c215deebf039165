//! Vulkan backend for Prism.
//!
//! This crate provides:
//! - Runtime linking, instance creation and validation reporting
//! - Physical device selection and logical device bring-up
//! - Buffer and image memory management with staged uploads
//! - Render passes, framebuffers and swap chains
//! - Root signatures translated into descriptor set layouts and pools
//! - The command dispatcher turning recorded command buffers into Vulkan commands

pub mod buffer;
pub mod capabilities;
pub mod command;
pub mod context;
pub mod debug;
pub mod dispatch;
pub mod error;
pub mod framebuffer;
pub mod mapping;
pub mod memory;
pub mod pipeline;
pub mod program;
pub mod render_pass;
pub mod renderer;
pub mod resource_group;
pub mod root_signature;
pub mod runtime;
pub mod sampler;
pub mod surface;
pub mod swapchain;
pub mod sync;
pub mod texture;

#[cfg(test)]
mod test_support;

pub use buffer::{
    IndexBuffer, IndirectBuffer, TextureBuffer, UniformBuffer, VertexArray, VertexBuffer,
};
pub use capabilities::{capabilities_from_properties, PhysicalDeviceSummary, QueueFamilyIndices};
pub use context::VulkanContext;
pub use dispatch::{ClearValues, CommandDispatcher, RenderPassTracker};
pub use error::{Result, VulkanError};
pub use framebuffer::Framebuffer;
pub use memory::{GpuBuffer, GpuImage};
pub use pipeline::PipelineState;
pub use program::Program;
pub use render_pass::RenderPass;
pub use renderer::{VulkanRenderer, VulkanRendererBuilder};
pub use resource_group::ResourceGroup;
pub use root_signature::{RootSignature, DEFAULT_MAX_DESCRIPTOR_SETS};
pub use runtime::RuntimeLinking;
pub use sampler::SamplerState;
pub use surface::{Surface, SurfaceCapabilities};
pub use swapchain::SwapChain;
pub use texture::Texture;

/// The Vulkan backend's resource types.
pub struct Vulkan;

impl prism_core::Backend for Vulkan {
    type RenderPass = RenderPass;
    type SwapChain = SwapChain;
    type Framebuffer = Framebuffer;
    type VertexBuffer = VertexBuffer;
    type IndexBuffer = IndexBuffer;
    type VertexArray = VertexArray;
    type UniformBuffer = UniformBuffer;
    type TextureBuffer = TextureBuffer;
    type IndirectBuffer = IndirectBuffer;
    type Texture = Texture;
    type RootSignature = RootSignature;
    type ResourceGroup = ResourceGroup;
    type Program = Program;
    type PipelineState = PipelineState;
    type SamplerState = SamplerState;
}
