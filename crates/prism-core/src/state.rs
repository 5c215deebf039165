//! Fixed-function state, sampler and shader program descriptions.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::buffer::VertexAttributes;

/// Texture filtering for minification, magnification and mipmap selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterMode {
    MinMagMipPoint,
    MinMagPointMipLinear,
    MinMagLinearMipPoint,
    #[default]
    MinMagMipLinear,
    Anisotropic,
    ComparisonMinMagMipPoint,
    ComparisonMinMagMipLinear,
    ComparisonAnisotropic,
}

impl FilterMode {
    /// Whether the filter performs a depth comparison.
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::ComparisonMinMagMipPoint
                | Self::ComparisonMinMagMipLinear
                | Self::ComparisonAnisotropic
        )
    }

    /// Whether the filter uses anisotropic sampling.
    pub const fn is_anisotropic(self) -> bool {
        matches!(self, Self::Anisotropic | Self::ComparisonAnisotropic)
    }
}

/// Addressing of texture coordinates outside of [0, 1].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureAddressMode {
    #[default]
    Wrap,
    Mirror,
    Clamp,
    Border,
    MirrorOnce,
}

/// Comparison function for depth tests and comparison samplers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonFunc {
    Never,
    #[default]
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    GreaterEqual,
    Always,
}

/// Sampler state description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SamplerStateDesc {
    pub filter: FilterMode,
    pub address_u: TextureAddressMode,
    pub address_v: TextureAddressMode,
    pub address_w: TextureAddressMode,
    pub mip_lod_bias: f32,
    pub max_anisotropy: u32,
    pub comparison_func: ComparisonFunc,
    pub border_color: [f32; 4],
    pub min_lod: f32,
    pub max_lod: f32,
}

impl Default for SamplerStateDesc {
    fn default() -> Self {
        Self {
            filter: FilterMode::MinMagMipLinear,
            address_u: TextureAddressMode::Wrap,
            address_v: TextureAddressMode::Wrap,
            address_w: TextureAddressMode::Wrap,
            mip_lod_bias: 0.0,
            max_anisotropy: 16,
            comparison_func: ComparisonFunc::Never,
            border_color: [0.0; 4],
            min_lod: f32::MIN,
            max_lod: f32::MAX,
        }
    }
}

/// Polygon fill mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FillMode {
    Wireframe,
    #[default]
    Solid,
}

/// Face culling mode.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CullMode {
    None,
    Front,
    #[default]
    Back,
}

/// Rasterizer state description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RasterizerState {
    pub fill_mode: FillMode,
    pub cull_mode: CullMode,
    pub front_counter_clockwise: bool,
    pub depth_bias: i32,
    pub depth_bias_clamp: f32,
    pub slope_scaled_depth_bias: f32,
    pub depth_clip_enable: bool,
    pub multisample_enable: bool,
}

impl Default for RasterizerState {
    fn default() -> Self {
        Self {
            fill_mode: FillMode::Solid,
            cull_mode: CullMode::Back,
            front_counter_clockwise: false,
            depth_bias: 0,
            depth_bias_clamp: 0.0,
            slope_scaled_depth_bias: 0.0,
            depth_clip_enable: true,
            multisample_enable: false,
        }
    }
}

/// Operation applied to the stencil buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StencilOp {
    #[default]
    Keep,
    Zero,
    Replace,
    IncrementSaturate,
    DecrementSaturate,
    Invert,
    IncrementWrap,
    DecrementWrap,
}

/// Stencil operations of one face.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DepthStencilOpDesc {
    pub stencil_fail_op: StencilOp,
    pub stencil_depth_fail_op: StencilOp,
    pub stencil_pass_op: StencilOp,
    pub stencil_func: ComparisonFunc,
}

/// Keeps the stencil buffer untouched and lets every fragment pass.
impl Default for DepthStencilOpDesc {
    fn default() -> Self {
        Self {
            stencil_fail_op: StencilOp::Keep,
            stencil_depth_fail_op: StencilOp::Keep,
            stencil_pass_op: StencilOp::Keep,
            stencil_func: ComparisonFunc::Always,
        }
    }
}

/// Depth-stencil state description.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthStencilState {
    pub depth_enable: bool,
    pub depth_write_enable: bool,
    pub depth_func: ComparisonFunc,
    pub stencil_enable: bool,
    pub stencil_read_mask: u8,
    pub stencil_write_mask: u8,
    /// Reference value the stencil functions compare against
    pub stencil_reference: u8,
    pub front_face: DepthStencilOpDesc,
    pub back_face: DepthStencilOpDesc,
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self {
            depth_enable: true,
            depth_write_enable: true,
            depth_func: ComparisonFunc::Less,
            stencil_enable: false,
            stencil_read_mask: 0xff,
            stencil_write_mask: 0xff,
            stencil_reference: 0,
            front_face: DepthStencilOpDesc::default(),
            back_face: DepthStencilOpDesc::default(),
        }
    }
}

/// Blend factor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Blend {
    Zero,
    One,
    SrcColor,
    InvSrcColor,
    SrcAlpha,
    InvSrcAlpha,
    DestAlpha,
    InvDestAlpha,
    DestColor,
    InvDestColor,
}

/// Blend equation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlendOp {
    Add,
    Subtract,
    RevSubtract,
    Min,
    Max,
}

/// Blending of one render target.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderTargetBlendDesc {
    pub blend_enable: bool,
    pub src_blend: Blend,
    pub dest_blend: Blend,
    pub blend_op: BlendOp,
    pub src_blend_alpha: Blend,
    pub dest_blend_alpha: Blend,
    pub blend_op_alpha: BlendOp,
    /// RGBA write mask, bit 0 is red
    pub write_mask: u8,
}

impl Default for RenderTargetBlendDesc {
    fn default() -> Self {
        Self {
            blend_enable: false,
            src_blend: Blend::One,
            dest_blend: Blend::Zero,
            blend_op: BlendOp::Add,
            src_blend_alpha: Blend::One,
            dest_blend_alpha: Blend::Zero,
            blend_op_alpha: BlendOp::Add,
            write_mask: 0xF,
        }
    }
}

/// Blend state description.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlendState {
    pub alpha_to_coverage_enable: bool,
    /// When false every render target uses `render_targets[0]`
    pub independent_blend_enable: bool,
    pub render_targets: [RenderTargetBlendDesc; 8],
}

impl BlendState {
    /// Blend description used for the given render target index.
    pub fn render_target(&self, index: usize) -> &RenderTargetBlendDesc {
        if self.independent_blend_enable {
            &self.render_targets[index]
        } else {
            &self.render_targets[0]
        }
    }
}

/// Primitive topology of the input assembler.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
    /// Tessellation patch list with the given number of control points
    PatchList(u8),
}

/// Shader bytecode of a program, one optional blob per graphics stage.
///
/// Blobs are passed to the backend unmodified (SPIR-V for Vulkan).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProgramDesc {
    pub vertex: Option<Vec<u8>>,
    pub tessellation_control: Option<Vec<u8>>,
    pub tessellation_evaluation: Option<Vec<u8>>,
    pub geometry: Option<Vec<u8>>,
    pub fragment: Option<Vec<u8>>,
}

/// Everything needed to build one graphics pipeline.
pub struct PipelineStateDesc<B: Backend> {
    pub root_signature: Arc<B::RootSignature>,
    pub program: Arc<B::Program>,
    pub render_pass: Arc<B::RenderPass>,
    pub vertex_attributes: VertexAttributes,
    pub primitive_topology: PrimitiveTopology,
    pub rasterizer_state: RasterizerState,
    pub depth_stencil_state: DepthStencilState,
    pub blend_state: BlendState,
}

impl<B: Backend> PipelineStateDesc<B> {
    /// Pipeline description with default fixed-function state.
    pub fn new(
        root_signature: Arc<B::RootSignature>,
        program: Arc<B::Program>,
        render_pass: Arc<B::RenderPass>,
        vertex_attributes: VertexAttributes,
    ) -> Self {
        Self {
            root_signature,
            program,
            render_pass,
            vertex_attributes,
            primitive_topology: PrimitiveTopology::TriangleList,
            rasterizer_state: RasterizerState::default(),
            depth_stencil_state: DepthStencilState::default(),
            blend_state: BlendState::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_blend_uses_first_target() {
        let mut state = BlendState::default();
        state.render_targets[0].blend_enable = true;
        assert!(state.render_target(3).blend_enable);
        state.independent_blend_enable = true;
        assert!(!state.render_target(3).blend_enable);
    }

    #[test]
    fn filter_classification() {
        assert!(FilterMode::ComparisonAnisotropic.is_comparison());
        assert!(FilterMode::ComparisonAnisotropic.is_anisotropic());
        assert!(!FilterMode::MinMagMipLinear.is_comparison());
    }
}
