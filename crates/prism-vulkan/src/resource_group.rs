//! Resource groups: one descriptor set filled with concrete resources.

use std::sync::Arc;

use ash::vk;
use prism_core::Resource;

use crate::error::{Result, VulkanError};
use crate::root_signature::RootSignature;
use crate::sampler::SamplerState;
use crate::Vulkan;

/// Resources bound to one descriptor table of a root signature.
///
/// Holds a reference to every resource and sampler it was given and frees
/// its descriptor set back to the root signature pool when dropped.
pub struct ResourceGroup {
    root_signature: Arc<RootSignature>,
    root_parameter_index: u32,
    descriptor_set: vk::DescriptorSet,
    resources: Vec<Resource<Vulkan>>,
    sampler_states: Vec<Option<Arc<SamplerState>>>,
}

impl ResourceGroup {
    /// Allocate a set for `root_parameter_index` and write `resources` into it.
    ///
    /// Resource `i` goes to binding `i`. A texture is combined with
    /// `sampler_states[i]`.
    pub fn new(
        root_signature: &Arc<RootSignature>,
        root_parameter_index: u32,
        resources: &[Resource<Vulkan>],
        sampler_states: &[Option<Arc<SamplerState>>],
    ) -> Result<Self> {
        let descriptor_set = root_signature.allocate_descriptor_set(root_parameter_index as usize)?;
        let group = Self {
            root_signature: Arc::clone(root_signature),
            root_parameter_index,
            descriptor_set,
            resources: resources.to_vec(),
            sampler_states: sampler_states.to_vec(),
        };
        if descriptor_set != vk::DescriptorSet::null() {
            // Dropping the group on error frees the set again
            for (binding, resource) in resources.iter().enumerate() {
                group.write_descriptor(binding, resource)?;
            }
        }
        Ok(group)
    }

    fn write_descriptor(&self, binding: usize, resource: &Resource<Vulkan>) -> Result<()> {
        let device = self.root_signature.context().device();
        let write = vk::WriteDescriptorSet::default()
            .dst_set(self.descriptor_set)
            .dst_binding(binding as u32)
            .dst_array_element(0);

        match resource {
            Resource::UniformBuffer(uniform_buffer) => {
                let buffer_info = vk::DescriptorBufferInfo::default()
                    .buffer(uniform_buffer.buffer().handle())
                    .offset(0)
                    .range(vk::WHOLE_SIZE);
                let write = write
                    .descriptor_type(vk::DescriptorType::UNIFORM_BUFFER)
                    .buffer_info(std::slice::from_ref(&buffer_info));
                unsafe { device.update_descriptor_sets(&[write], &[]) };
            }
            Resource::TextureBuffer(texture_buffer) => {
                let view = texture_buffer.view();
                let write = write
                    .descriptor_type(vk::DescriptorType::UNIFORM_TEXEL_BUFFER)
                    .texel_buffer_view(std::slice::from_ref(&view));
                unsafe { device.update_descriptor_sets(&[write], &[]) };
            }
            Resource::Texture(texture) => {
                let Some(sampler_state) = self.sampler_states.get(binding).and_then(Option::as_ref)
                else {
                    tracing::error!("Texture at resource group binding {binding} has no sampler state");
                    return Err(VulkanError::InvalidState(format!(
                        "texture at binding {binding} has no sampler state"
                    )));
                };
                let image_info = vk::DescriptorImageInfo::default()
                    .sampler(sampler_state.handle())
                    .image_view(texture.view())
                    .image_layout(texture.sampled_layout());
                let write = write
                    .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                    .image_info(std::slice::from_ref(&image_info));
                unsafe { device.update_descriptor_sets(&[write], &[]) };
            }
            // Folded into the combined image sampler of the matching texture
            Resource::SamplerState(_) => {}
            Resource::VertexBuffer(_) | Resource::IndexBuffer(_) | Resource::IndirectBuffer(_) => {
                tracing::error!(
                    "Unsupported Vulkan resource type in resource group: {}",
                    resource.kind_name()
                );
                return Err(VulkanError::InvalidState(format!(
                    "a {} cannot be bound through a resource group",
                    resource.kind_name()
                )));
            }
        }
        Ok(())
    }

    pub fn root_signature(&self) -> &Arc<RootSignature> {
        &self.root_signature
    }

    pub fn root_parameter_index(&self) -> u32 {
        self.root_parameter_index
    }

    pub fn descriptor_set(&self) -> vk::DescriptorSet {
        self.descriptor_set
    }

    pub fn resources(&self) -> &[Resource<Vulkan>] {
        &self.resources
    }

    pub fn sampler_states(&self) -> &[Option<Arc<SamplerState>>] {
        &self.sampler_states
    }
}

impl Drop for ResourceGroup {
    fn drop(&mut self) {
        self.root_signature.free_descriptor_set(self.descriptor_set);
    }
}
