//! Backend-agnostic rendering contract for Prism.
//!
//! This crate provides the types shared by every rendering backend:
//! - Texture formats and texture/buffer descriptions
//! - Root signature (binding model) descriptions
//! - Pipeline state sub-state descriptions
//! - The recorded command stream consumed by backends
//! - The [`Backend`] and [`Renderer`] traits
//! - The leveled [`LogType`] used for driver diagnostics

pub mod backend;
pub mod buffer;
pub mod command;
pub mod error;
pub mod format;
pub mod log;
pub mod render_target;
pub mod root_signature;
pub mod state;
pub mod texture;

pub use backend::{
    Backend, Capabilities, MappableResource, MappedSubresource, Renderer, Resource,
};
pub use buffer::{
    DrawArguments, DrawIndexedArguments, IndexBufferFormat, VertexAttribute,
    VertexAttributeFormat, VertexAttributes,
};
pub use command::{
    ClearFlags, Command, CommandBuffer, CommandDispatchFunctionIndex, DrawSource, RenderTarget,
};
pub use error::{Error, Result};
pub use format::TextureFormat;
pub use log::LogType;
pub use render_target::{RenderPassDesc, ScissorRectangle, Viewport};
pub use root_signature::{
    DescriptorRange, DescriptorRangeType, RootParameter, RootSignatureDesc, ShaderVisibility,
    StaticSampler,
};
pub use state::{
    Blend, BlendOp, BlendState, ComparisonFunc, CullMode, DepthStencilOpDesc, DepthStencilState,
    FillMode, FilterMode, PipelineStateDesc, PrimitiveTopology, ProgramDesc, RasterizerState,
    RenderTargetBlendDesc, SamplerStateDesc, StencilOp, TextureAddressMode,
};
pub use texture::{TextureDesc, TextureFlags, TextureKind};

/// Renderer-wide constants
pub mod constants {
    /// Maximum number of simultaneous color render targets
    pub const MAX_COLOR_ATTACHMENTS: usize = 8;
}
