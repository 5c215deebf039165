//! Vulkan backend error types.

use ash::vk;
use thiserror::Error;

/// Errors raised by the Vulkan backend.
#[derive(Error, Debug)]
pub enum VulkanError {
    /// Vulkan call failed.
    #[error("Vulkan error: {0}")]
    Vulkan(#[from] vk::Result),

    /// The Vulkan shared library or instance could not be brought up.
    #[error("Vulkan runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    /// A device-level entry point could not be resolved.
    #[error("Device-level Vulkan entry point missing: {0}")]
    EntryPointMissing(String),

    /// No physical device passed the selection pipeline.
    #[error("No suitable physical device found")]
    NoSuitableDevice,

    /// No memory type matches the requirement mask and property flags.
    #[error("No memory type matches type bits {type_bits:#x} with properties {properties:?}")]
    NoMatchingMemoryType {
        type_bits: u32,
        properties: vk::MemoryPropertyFlags,
    },

    /// Surface creation or query failed.
    #[error("Surface creation failed: {0}")]
    SurfaceCreation(String),

    /// Shader module creation failed.
    #[error("Shader module creation failed: {0}")]
    ShaderModule(String),

    /// Pipeline creation failed.
    #[error("Pipeline creation failed: {0}")]
    PipelineCreation(String),

    /// A description handed to the backend is unusable.
    #[error(transparent)]
    InvalidDescription(#[from] prism_core::Error),

    /// The resource cannot be used the way it was asked to.
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, VulkanError>;

/// Log a failed creation at critical level and hand the error on.
pub(crate) fn log_critical(what: &str, error: VulkanError) -> VulkanError {
    tracing::error!("Failed to create Vulkan {what}: {error}");
    error
}
