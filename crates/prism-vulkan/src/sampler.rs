//! Sampler states.

use std::sync::Arc;

use ash::vk;
use prism_core::{ComparisonFunc, SamplerStateDesc};

use crate::context::VulkanContext;
use crate::error::Result;
use crate::mapping;

/// Closest Vulkan border color to an RGBA border.
pub fn border_color(rgba: [f32; 4]) -> vk::BorderColor {
    match rgba {
        [r, g, b, _] if r >= 0.5 && g >= 0.5 && b >= 0.5 => vk::BorderColor::FLOAT_OPAQUE_WHITE,
        [_, _, _, a] if a >= 0.5 => vk::BorderColor::FLOAT_OPAQUE_BLACK,
        _ => vk::BorderColor::FLOAT_TRANSPARENT_BLACK,
    }
}

/// Sampler create info for a description.
pub fn sampler_create_info(desc: &SamplerStateDesc) -> vk::SamplerCreateInfo<'static> {
    let (min_filter, mag_filter, mipmap_mode) = mapping::filter(desc.filter);
    let compare = desc.filter.is_comparison() && desc.comparison_func != ComparisonFunc::Never;
    vk::SamplerCreateInfo::default()
        .min_filter(min_filter)
        .mag_filter(mag_filter)
        .mipmap_mode(mipmap_mode)
        .address_mode_u(mapping::address_mode(desc.address_u))
        .address_mode_v(mapping::address_mode(desc.address_v))
        .address_mode_w(mapping::address_mode(desc.address_w))
        .mip_lod_bias(desc.mip_lod_bias)
        .anisotropy_enable(desc.filter.is_anisotropic())
        .max_anisotropy(desc.max_anisotropy.max(1) as f32)
        .compare_enable(compare)
        .compare_op(mapping::compare_op(desc.comparison_func))
        .min_lod(desc.min_lod.max(0.0))
        .max_lod(desc.max_lod.min(vk::LOD_CLAMP_NONE))
        .border_color(border_color(desc.border_color))
        .unnormalized_coordinates(false)
}

pub struct SamplerState {
    context: Arc<VulkanContext>,
    desc: SamplerStateDesc,
    sampler: vk::Sampler,
}

impl SamplerState {
    pub fn new(context: &Arc<VulkanContext>, desc: &SamplerStateDesc) -> Result<Self> {
        let create_info = sampler_create_info(desc);
        let sampler = unsafe { context.device().create_sampler(&create_info, None) }?;
        Ok(Self {
            context: Arc::clone(context),
            desc: desc.clone(),
            sampler,
        })
    }

    pub fn desc(&self) -> &SamplerStateDesc {
        &self.desc
    }

    pub fn handle(&self) -> vk::Sampler {
        self.sampler
    }
}

impl Drop for SamplerState {
    fn drop(&mut self) {
        unsafe { self.context.device().destroy_sampler(self.sampler, None) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::{FilterMode, TextureAddressMode};

    #[test]
    fn default_sampler_is_trilinear_and_clamps_lod() {
        let info = sampler_create_info(&SamplerStateDesc::default());
        assert_eq!(info.min_filter, vk::Filter::LINEAR);
        assert_eq!(info.mipmap_mode, vk::SamplerMipmapMode::LINEAR);
        assert_eq!(info.address_mode_u, vk::SamplerAddressMode::REPEAT);
        assert_eq!(info.anisotropy_enable, vk::FALSE);
        assert_eq!(info.compare_enable, vk::FALSE);
        assert_eq!(info.min_lod, 0.0);
        assert_eq!(info.max_lod, vk::LOD_CLAMP_NONE);
    }

    #[test]
    fn shadow_sampler_enables_comparison() {
        let desc = SamplerStateDesc {
            filter: FilterMode::ComparisonMinMagMipLinear,
            address_u: TextureAddressMode::Border,
            comparison_func: ComparisonFunc::LessEqual,
            border_color: [1.0; 4],
            ..SamplerStateDesc::default()
        };
        let info = sampler_create_info(&desc);
        assert_eq!(info.compare_enable, vk::TRUE);
        assert_eq!(info.compare_op, vk::CompareOp::LESS_OR_EQUAL);
        assert_eq!(info.border_color, vk::BorderColor::FLOAT_OPAQUE_WHITE);
    }

    #[test]
    fn border_colors() {
        assert_eq!(border_color([0.0; 4]), vk::BorderColor::FLOAT_TRANSPARENT_BLACK);
        assert_eq!(
            border_color([0.0, 0.0, 0.0, 1.0]),
            vk::BorderColor::FLOAT_OPAQUE_BLACK
        );
    }
}
