//! Translation of backend-agnostic enums into Vulkan enums.

use ash::vk;
use prism_core::{
    Blend, BlendOp, ComparisonFunc, CullMode, DescriptorRangeType, FillMode, FilterMode,
    IndexBufferFormat, PrimitiveTopology, ShaderVisibility, StencilOp, TextureAddressMode,
    TextureFormat, TextureKind, VertexAttributeFormat,
};

pub const fn texture_format(format: TextureFormat) -> vk::Format {
    match format {
        TextureFormat::R8Unorm => vk::Format::R8_UNORM,
        TextureFormat::R8G8B8Unorm => vk::Format::R8G8B8_UNORM,
        TextureFormat::R8G8B8A8Unorm => vk::Format::R8G8B8A8_UNORM,
        TextureFormat::R8G8B8A8Srgb => vk::Format::R8G8B8A8_SRGB,
        TextureFormat::B8G8R8A8Unorm => vk::Format::B8G8R8A8_UNORM,
        TextureFormat::R11G11B10Float => vk::Format::B10G11R11_UFLOAT_PACK32,
        TextureFormat::R16G16B16A16Float => vk::Format::R16G16B16A16_SFLOAT,
        TextureFormat::R32G32B32A32Float => vk::Format::R32G32B32A32_SFLOAT,
        TextureFormat::Bc1 => vk::Format::BC1_RGBA_UNORM_BLOCK,
        TextureFormat::Bc1Srgb => vk::Format::BC1_RGBA_SRGB_BLOCK,
        TextureFormat::Bc2 => vk::Format::BC2_UNORM_BLOCK,
        TextureFormat::Bc3 => vk::Format::BC3_UNORM_BLOCK,
        TextureFormat::Bc4 => vk::Format::BC4_UNORM_BLOCK,
        TextureFormat::Bc5 => vk::Format::BC5_UNORM_BLOCK,
        TextureFormat::R16Unorm => vk::Format::R16_UNORM,
        TextureFormat::R32Uint => vk::Format::R32_UINT,
        TextureFormat::R32Float => vk::Format::R32_SFLOAT,
        TextureFormat::R16G16Snorm => vk::Format::R16G16_SNORM,
        TextureFormat::R16G16Float => vk::Format::R16G16_SFLOAT,
        TextureFormat::D32Float => vk::Format::D32_SFLOAT,
        TextureFormat::Unknown => vk::Format::UNDEFINED,
    }
}

/// Image aspect addressed by views and barriers of the given format.
pub const fn image_aspect(format: TextureFormat) -> vk::ImageAspectFlags {
    if format.is_depth() {
        vk::ImageAspectFlags::DEPTH
    } else {
        vk::ImageAspectFlags::COLOR
    }
}

pub const fn image_type(kind: TextureKind) -> vk::ImageType {
    match kind {
        TextureKind::Texture1D => vk::ImageType::TYPE_1D,
        TextureKind::Texture2D | TextureKind::Texture2DArray | TextureKind::TextureCube => {
            vk::ImageType::TYPE_2D
        }
        TextureKind::Texture3D => vk::ImageType::TYPE_3D,
    }
}

pub const fn image_view_type(kind: TextureKind) -> vk::ImageViewType {
    match kind {
        TextureKind::Texture1D => vk::ImageViewType::TYPE_1D,
        TextureKind::Texture2D => vk::ImageViewType::TYPE_2D,
        TextureKind::Texture2DArray => vk::ImageViewType::TYPE_2D_ARRAY,
        TextureKind::Texture3D => vk::ImageViewType::TYPE_3D,
        TextureKind::TextureCube => vk::ImageViewType::CUBE,
    }
}

pub const fn index_type(format: IndexBufferFormat) -> vk::IndexType {
    match format {
        IndexBufferFormat::UnsignedShort => vk::IndexType::UINT16,
        IndexBufferFormat::UnsignedInt => vk::IndexType::UINT32,
    }
}

pub const fn vertex_attribute_format(format: VertexAttributeFormat) -> vk::Format {
    match format {
        VertexAttributeFormat::Float1 => vk::Format::R32_SFLOAT,
        VertexAttributeFormat::Float2 => vk::Format::R32G32_SFLOAT,
        VertexAttributeFormat::Float3 => vk::Format::R32G32B32_SFLOAT,
        VertexAttributeFormat::Float4 => vk::Format::R32G32B32A32_SFLOAT,
        VertexAttributeFormat::R8G8B8A8Unorm => vk::Format::R8G8B8A8_UNORM,
        VertexAttributeFormat::R8G8B8A8Uint => vk::Format::R8G8B8A8_UINT,
        VertexAttributeFormat::Short2 => vk::Format::R16G16_SINT,
        VertexAttributeFormat::Short4 => vk::Format::R16G16B16A16_SINT,
        VertexAttributeFormat::Uint1 => vk::Format::R32_UINT,
    }
}

/// Descriptor type of a range, `None` for samplers which are folded into
/// combined image samplers.
pub const fn descriptor_type(range_type: DescriptorRangeType) -> Option<vk::DescriptorType> {
    match range_type {
        DescriptorRangeType::Srv => Some(vk::DescriptorType::COMBINED_IMAGE_SAMPLER),
        DescriptorRangeType::Ubv => Some(vk::DescriptorType::UNIFORM_BUFFER),
        DescriptorRangeType::Uav => Some(vk::DescriptorType::UNIFORM_TEXEL_BUFFER),
        DescriptorRangeType::Sampler => None,
    }
}

pub const fn shader_stages(visibility: ShaderVisibility) -> vk::ShaderStageFlags {
    match visibility {
        ShaderVisibility::All => vk::ShaderStageFlags::ALL_GRAPHICS,
        ShaderVisibility::Vertex => vk::ShaderStageFlags::VERTEX,
        ShaderVisibility::TessellationControl => vk::ShaderStageFlags::TESSELLATION_CONTROL,
        ShaderVisibility::TessellationEvaluation => {
            vk::ShaderStageFlags::TESSELLATION_EVALUATION
        }
        ShaderVisibility::Geometry => vk::ShaderStageFlags::GEOMETRY,
        ShaderVisibility::Fragment => vk::ShaderStageFlags::FRAGMENT,
    }
}

/// Minification filter, magnification filter and mipmap mode.
pub const fn filter(mode: FilterMode) -> (vk::Filter, vk::Filter, vk::SamplerMipmapMode) {
    match mode {
        FilterMode::MinMagMipPoint | FilterMode::ComparisonMinMagMipPoint => (
            vk::Filter::NEAREST,
            vk::Filter::NEAREST,
            vk::SamplerMipmapMode::NEAREST,
        ),
        FilterMode::MinMagPointMipLinear => (
            vk::Filter::NEAREST,
            vk::Filter::NEAREST,
            vk::SamplerMipmapMode::LINEAR,
        ),
        FilterMode::MinMagLinearMipPoint => (
            vk::Filter::LINEAR,
            vk::Filter::LINEAR,
            vk::SamplerMipmapMode::NEAREST,
        ),
        FilterMode::MinMagMipLinear
        | FilterMode::Anisotropic
        | FilterMode::ComparisonMinMagMipLinear
        | FilterMode::ComparisonAnisotropic => (
            vk::Filter::LINEAR,
            vk::Filter::LINEAR,
            vk::SamplerMipmapMode::LINEAR,
        ),
    }
}

pub const fn address_mode(mode: TextureAddressMode) -> vk::SamplerAddressMode {
    match mode {
        TextureAddressMode::Wrap => vk::SamplerAddressMode::REPEAT,
        TextureAddressMode::Mirror => vk::SamplerAddressMode::MIRRORED_REPEAT,
        TextureAddressMode::Clamp => vk::SamplerAddressMode::CLAMP_TO_EDGE,
        TextureAddressMode::Border => vk::SamplerAddressMode::CLAMP_TO_BORDER,
        TextureAddressMode::MirrorOnce => vk::SamplerAddressMode::MIRROR_CLAMP_TO_EDGE,
    }
}

pub const fn compare_op(func: ComparisonFunc) -> vk::CompareOp {
    match func {
        ComparisonFunc::Never => vk::CompareOp::NEVER,
        ComparisonFunc::Less => vk::CompareOp::LESS,
        ComparisonFunc::Equal => vk::CompareOp::EQUAL,
        ComparisonFunc::LessEqual => vk::CompareOp::LESS_OR_EQUAL,
        ComparisonFunc::Greater => vk::CompareOp::GREATER,
        ComparisonFunc::NotEqual => vk::CompareOp::NOT_EQUAL,
        ComparisonFunc::GreaterEqual => vk::CompareOp::GREATER_OR_EQUAL,
        ComparisonFunc::Always => vk::CompareOp::ALWAYS,
    }
}

pub const fn stencil_op(op: StencilOp) -> vk::StencilOp {
    match op {
        StencilOp::Keep => vk::StencilOp::KEEP,
        StencilOp::Zero => vk::StencilOp::ZERO,
        StencilOp::Replace => vk::StencilOp::REPLACE,
        StencilOp::IncrementSaturate => vk::StencilOp::INCREMENT_AND_CLAMP,
        StencilOp::DecrementSaturate => vk::StencilOp::DECREMENT_AND_CLAMP,
        StencilOp::Invert => vk::StencilOp::INVERT,
        StencilOp::IncrementWrap => vk::StencilOp::INCREMENT_AND_WRAP,
        StencilOp::DecrementWrap => vk::StencilOp::DECREMENT_AND_WRAP,
    }
}

pub const fn polygon_mode(mode: FillMode) -> vk::PolygonMode {
    match mode {
        FillMode::Wireframe => vk::PolygonMode::LINE,
        FillMode::Solid => vk::PolygonMode::FILL,
    }
}

pub const fn cull_mode(mode: CullMode) -> vk::CullModeFlags {
    match mode {
        CullMode::None => vk::CullModeFlags::NONE,
        CullMode::Front => vk::CullModeFlags::FRONT,
        CullMode::Back => vk::CullModeFlags::BACK,
    }
}

pub const fn blend_factor(blend: Blend) -> vk::BlendFactor {
    match blend {
        Blend::Zero => vk::BlendFactor::ZERO,
        Blend::One => vk::BlendFactor::ONE,
        Blend::SrcColor => vk::BlendFactor::SRC_COLOR,
        Blend::InvSrcColor => vk::BlendFactor::ONE_MINUS_SRC_COLOR,
        Blend::SrcAlpha => vk::BlendFactor::SRC_ALPHA,
        Blend::InvSrcAlpha => vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
        Blend::DestAlpha => vk::BlendFactor::DST_ALPHA,
        Blend::InvDestAlpha => vk::BlendFactor::ONE_MINUS_DST_ALPHA,
        Blend::DestColor => vk::BlendFactor::DST_COLOR,
        Blend::InvDestColor => vk::BlendFactor::ONE_MINUS_DST_COLOR,
    }
}

pub const fn blend_op(op: BlendOp) -> vk::BlendOp {
    match op {
        BlendOp::Add => vk::BlendOp::ADD,
        BlendOp::Subtract => vk::BlendOp::SUBTRACT,
        BlendOp::RevSubtract => vk::BlendOp::REVERSE_SUBTRACT,
        BlendOp::Min => vk::BlendOp::MIN,
        BlendOp::Max => vk::BlendOp::MAX,
    }
}

pub const fn primitive_topology(topology: PrimitiveTopology) -> vk::PrimitiveTopology {
    match topology {
        PrimitiveTopology::PointList => vk::PrimitiveTopology::POINT_LIST,
        PrimitiveTopology::LineList => vk::PrimitiveTopology::LINE_LIST,
        PrimitiveTopology::LineStrip => vk::PrimitiveTopology::LINE_STRIP,
        PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
        PrimitiveTopology::TriangleStrip => vk::PrimitiveTopology::TRIANGLE_STRIP,
        PrimitiveTopology::PatchList(_) => vk::PrimitiveTopology::PATCH_LIST,
    }
}

/// Sample count flag for a sample count, rounded down to a power of two.
pub const fn sample_count(samples: u8) -> vk::SampleCountFlags {
    match samples {
        0 | 1 => vk::SampleCountFlags::TYPE_1,
        2 | 3 => vk::SampleCountFlags::TYPE_2,
        4..=7 => vk::SampleCountFlags::TYPE_4,
        8..=15 => vk::SampleCountFlags::TYPE_8,
        16..=31 => vk::SampleCountFlags::TYPE_16,
        32..=63 => vk::SampleCountFlags::TYPE_32,
        _ => vk::SampleCountFlags::TYPE_64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samplers_produce_no_binding() {
        assert_eq!(descriptor_type(DescriptorRangeType::Sampler), None);
        assert_eq!(
            descriptor_type(DescriptorRangeType::Srv),
            Some(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
        );
        assert_eq!(
            descriptor_type(DescriptorRangeType::Uav),
            Some(vk::DescriptorType::UNIFORM_TEXEL_BUFFER)
        );
    }

    #[test]
    fn all_visibility_is_all_graphics() {
        assert_eq!(
            shader_stages(ShaderVisibility::All),
            vk::ShaderStageFlags::ALL_GRAPHICS
        );
    }

    #[test]
    fn sample_counts_round_down() {
        assert_eq!(sample_count(1), vk::SampleCountFlags::TYPE_1);
        assert_eq!(sample_count(6), vk::SampleCountFlags::TYPE_4);
        assert_eq!(sample_count(8), vk::SampleCountFlags::TYPE_8);
    }

    #[test]
    fn depth_formats_use_depth_aspect() {
        assert_eq!(
            image_aspect(TextureFormat::D32Float),
            vk::ImageAspectFlags::DEPTH
        );
        assert_eq!(
            texture_format(TextureFormat::D32Float),
            vk::Format::D32_SFLOAT
        );
    }
}
