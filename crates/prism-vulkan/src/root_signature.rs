//! Root signatures: descriptor set layouts, pipeline layout and descriptor pool.

use std::sync::Arc;

use ash::vk;
use prism_core::{DescriptorRangeType, RootParameter, RootSignatureDesc};

use crate::context::VulkanContext;
use crate::error::{Result, VulkanError};
use crate::mapping;

/// Descriptor sets a root signature pool is sized for.
///
/// Pool capacity per descriptor type is this factor times the number of
/// descriptors of that type across the whole root signature.
pub const DEFAULT_MAX_DESCRIPTOR_SETS: u32 = 128;

/// Range types in the order pool sizes are emitted.
const POOLED_RANGE_TYPES: [DescriptorRangeType; 3] = [
    DescriptorRangeType::Srv,
    DescriptorRangeType::Ubv,
    DescriptorRangeType::Uav,
];

/// Layout bindings of one root parameter.
///
/// The binding number of a range is its index inside the table. Sampler
/// ranges produce no binding since samplers travel with their texture in a
/// combined image sampler.
pub fn layout_bindings(parameter: &RootParameter) -> Vec<vk::DescriptorSetLayoutBinding<'static>> {
    let RootParameter::DescriptorTable {
        ranges,
        shader_visibility,
    } = parameter
    else {
        return Vec::new();
    };
    let stage_flags = mapping::shader_stages(*shader_visibility);

    ranges
        .iter()
        .enumerate()
        .filter_map(|(index, range)| {
            let descriptor_type = mapping::descriptor_type(range.range_type)?;
            if range.range_type == DescriptorRangeType::Uav {
                tracing::warn!(
                    "Unordered access range \"{}\" is bound as a uniform texel buffer, writes are not supported",
                    range.base_shader_register_name
                );
            }
            Some(
                vk::DescriptorSetLayoutBinding::default()
                    .binding(index as u32)
                    .descriptor_type(descriptor_type)
                    .descriptor_count(range.number_of_descriptors)
                    .stage_flags(stage_flags),
            )
        })
        .collect()
}

/// Descriptor pool sizes for `desc`, one entry per descriptor type in use.
pub fn pool_sizes(desc: &RootSignatureDesc, max_sets: u32) -> Vec<vk::DescriptorPoolSize> {
    POOLED_RANGE_TYPES
        .iter()
        .filter_map(|&range_type| {
            let count = desc.descriptor_count(range_type);
            let ty = mapping::descriptor_type(range_type)?;
            (count > 0).then(|| {
                vk::DescriptorPoolSize::default()
                    .ty(ty)
                    .descriptor_count(count.saturating_mul(max_sets))
            })
        })
        .collect()
}

/// Non-null set layouts in parameter order plus, per parameter, the set
/// index it occupies in the pipeline layout.
pub fn pipeline_set_layouts(
    layouts: &[vk::DescriptorSetLayout],
) -> (Vec<vk::DescriptorSetLayout>, Vec<Option<u32>>) {
    let mut used = Vec::with_capacity(layouts.len());
    let set_indices = layouts
        .iter()
        .map(|&layout| {
            (layout != vk::DescriptorSetLayout::null()).then(|| {
                used.push(layout);
                used.len() as u32 - 1
            })
        })
        .collect();
    (used, set_indices)
}

/// Vulkan translation of a [`RootSignatureDesc`].
///
/// Parameters that are not descriptor tables, and tables without any
/// non-sampler range, get a null set layout and no descriptor set.
pub struct RootSignature {
    context: Arc<VulkanContext>,
    desc: RootSignatureDesc,
    set_layouts: Vec<vk::DescriptorSetLayout>,
    set_indices: Vec<Option<u32>>,
    pipeline_layout: vk::PipelineLayout,
    descriptor_pool: vk::DescriptorPool,
}

impl RootSignature {
    pub fn new(
        context: &Arc<VulkanContext>,
        desc: &RootSignatureDesc,
        max_descriptor_sets: u32,
    ) -> Result<Self> {
        let mut root_signature = Self {
            context: Arc::clone(context),
            desc: desc.clone(),
            set_layouts: Vec::with_capacity(desc.parameters.len()),
            set_indices: Vec::new(),
            pipeline_layout: vk::PipelineLayout::null(),
            descriptor_pool: vk::DescriptorPool::null(),
        };
        let device = context.device();

        // Partially built handles are released by Drop on early return
        for parameter in &desc.parameters {
            let bindings = layout_bindings(parameter);
            let layout = if bindings.is_empty() {
                vk::DescriptorSetLayout::null()
            } else {
                let create_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&bindings);
                unsafe { device.create_descriptor_set_layout(&create_info, None) }?
            };
            root_signature.set_layouts.push(layout);
        }

        let (used_layouts, set_indices) = pipeline_set_layouts(&root_signature.set_layouts);
        root_signature.set_indices = set_indices;
        let layout_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&used_layouts);
        root_signature.pipeline_layout =
            unsafe { device.create_pipeline_layout(&layout_info, None) }?;

        let sizes = pool_sizes(desc, max_descriptor_sets);
        if !sizes.is_empty() {
            let pool_info = vk::DescriptorPoolCreateInfo::default()
                .flags(vk::DescriptorPoolCreateFlags::FREE_DESCRIPTOR_SET)
                .max_sets(max_descriptor_sets)
                .pool_sizes(&sizes);
            root_signature.descriptor_pool =
                unsafe { device.create_descriptor_pool(&pool_info, None) }?;
        }

        Ok(root_signature)
    }

    pub fn context(&self) -> &Arc<VulkanContext> {
        &self.context
    }

    pub fn desc(&self) -> &RootSignatureDesc {
        &self.desc
    }

    pub fn pipeline_layout(&self) -> vk::PipelineLayout {
        self.pipeline_layout
    }

    pub fn descriptor_pool(&self) -> vk::DescriptorPool {
        self.descriptor_pool
    }

    /// Set layout of a root parameter, null for parameters without one.
    pub fn set_layout(&self, root_parameter_index: usize) -> vk::DescriptorSetLayout {
        self.set_layouts
            .get(root_parameter_index)
            .copied()
            .unwrap_or_else(vk::DescriptorSetLayout::null)
    }

    /// Pipeline layout set index of a root parameter.
    pub fn set_index(&self, root_parameter_index: usize) -> Option<u32> {
        self.set_indices.get(root_parameter_index).copied().flatten()
    }

    /// Allocate one descriptor set for a root parameter.
    ///
    /// Returns a null set for parameters without a set layout.
    pub fn allocate_descriptor_set(&self, root_parameter_index: usize) -> Result<vk::DescriptorSet> {
        if root_parameter_index >= self.set_layouts.len() {
            return Err(VulkanError::InvalidState(format!(
                "root parameter {root_parameter_index} is out of range, the root signature has {}",
                self.set_layouts.len()
            )));
        }
        let layout = self.set_layout(root_parameter_index);
        if layout == vk::DescriptorSetLayout::null() {
            return Ok(vk::DescriptorSet::null());
        }

        let alloc_info = vk::DescriptorSetAllocateInfo::default()
            .descriptor_pool(self.descriptor_pool)
            .set_layouts(std::slice::from_ref(&layout));
        let sets = unsafe { self.context.device().allocate_descriptor_sets(&alloc_info) }?;
        sets.into_iter()
            .next()
            .ok_or(VulkanError::Vulkan(vk::Result::ERROR_OUT_OF_POOL_MEMORY))
    }

    /// Return a descriptor set to the pool.
    pub fn free_descriptor_set(&self, set: vk::DescriptorSet) {
        if set == vk::DescriptorSet::null() {
            return;
        }
        if let Err(e) = unsafe {
            self.context
                .device()
                .free_descriptor_sets(self.descriptor_pool, &[set])
        } {
            tracing::error!("Failed to free Vulkan descriptor set: {e}");
        }
    }
}

impl Drop for RootSignature {
    fn drop(&mut self) {
        let device = self.context.device();
        unsafe {
            if self.descriptor_pool != vk::DescriptorPool::null() {
                device.destroy_descriptor_pool(self.descriptor_pool, None);
            }
            if self.pipeline_layout != vk::PipelineLayout::null() {
                device.destroy_pipeline_layout(self.pipeline_layout, None);
            }
            for &layout in &self.set_layouts {
                if layout != vk::DescriptorSetLayout::null() {
                    device.destroy_descriptor_set_layout(layout, None);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;
    use prism_core::{DescriptorRange, SamplerStateDesc, ShaderVisibility, StaticSampler};

    fn material_table() -> RootParameter {
        RootParameter::table(
            vec![
                DescriptorRange::new(DescriptorRangeType::Ubv, 0, "MaterialUniforms"),
                DescriptorRange::new(DescriptorRangeType::Srv, 0, "AlbedoMap"),
                DescriptorRange::new(DescriptorRangeType::Sampler, 0, "AlbedoSampler"),
            ],
            ShaderVisibility::Fragment,
        )
    }

    #[test]
    fn bindings_follow_range_index_and_skip_samplers() {
        let bindings = layout_bindings(&material_table());

        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].binding, 0);
        assert_eq!(bindings[0].descriptor_type, vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(bindings[1].binding, 1);
        assert_eq!(
            bindings[1].descriptor_type,
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER
        );
        assert!(bindings
            .iter()
            .all(|binding| binding.stage_flags == vk::ShaderStageFlags::FRAGMENT));
    }

    #[test]
    fn static_sampler_has_no_bindings() {
        let parameter = RootParameter::StaticSampler(StaticSampler {
            sampler: SamplerStateDesc::default(),
            shader_register: 0,
            shader_visibility: ShaderVisibility::All,
        });
        assert!(layout_bindings(&parameter).is_empty());
    }

    #[test]
    fn pool_sizes_scale_with_max_sets() {
        let desc = RootSignatureDesc::new(vec![
            material_table(),
            RootParameter::table(
                vec![
                    DescriptorRange {
                        number_of_descriptors: 3,
                        ..DescriptorRange::new(DescriptorRangeType::Srv, 1, "ShadowMaps")
                    },
                    DescriptorRange::new(DescriptorRangeType::Uav, 0, "Lights"),
                ],
                ShaderVisibility::All,
            ),
        ]);
        let sizes = pool_sizes(&desc, 10);

        assert_eq!(sizes.len(), 3);
        assert_eq!(sizes[0].ty, vk::DescriptorType::COMBINED_IMAGE_SAMPLER);
        assert_eq!(sizes[0].descriptor_count, 40);
        assert_eq!(sizes[1].ty, vk::DescriptorType::UNIFORM_BUFFER);
        assert_eq!(sizes[1].descriptor_count, 10);
        assert_eq!(sizes[2].ty, vk::DescriptorType::UNIFORM_TEXEL_BUFFER);
        assert_eq!(sizes[2].descriptor_count, 10);
    }

    #[test]
    fn unused_types_are_not_pooled() {
        let desc = RootSignatureDesc::new(vec![RootParameter::table(
            vec![DescriptorRange::new(DescriptorRangeType::Ubv, 0, "Frame")],
            ShaderVisibility::Vertex,
        )]);
        let sizes = pool_sizes(&desc, DEFAULT_MAX_DESCRIPTOR_SETS);
        assert_eq!(sizes.len(), 1);
        assert_eq!(sizes[0].descriptor_count, DEFAULT_MAX_DESCRIPTOR_SETS);
    }

    #[test]
    fn pipeline_layout_keeps_parameter_order() {
        let layouts: Vec<_> = (1..=4).map(vk::DescriptorSetLayout::from_raw).collect();
        let (used, indices) = pipeline_set_layouts(&layouts);
        assert_eq!(used, layouts);
        assert_eq!(indices, vec![Some(0), Some(1), Some(2), Some(3)]);
    }

    #[test]
    fn null_layouts_are_compacted_out() {
        let layouts = [
            vk::DescriptorSetLayout::from_raw(7),
            vk::DescriptorSetLayout::null(),
            vk::DescriptorSetLayout::from_raw(9),
        ];
        let (used, indices) = pipeline_set_layouts(&layouts);
        assert_eq!(used, vec![layouts[0], layouts[2]]);
        assert_eq!(indices, vec![Some(0), None, Some(1)]);
    }
}
