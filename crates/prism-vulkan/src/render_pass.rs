//! Render pass synthesis.
//!
//! Every Vulkan render pass built by the backend follows one template: one
//! attachment per color format (cleared on load, stored), an optional
//! depth-stencil attachment, a single subpass using all of them and a fixed
//! pair of external dependencies around it. Only the final color layout
//! varies, `SHADER_READ_ONLY_OPTIMAL` for textures and `PRESENT_SRC_KHR` for
//! swap chain images.

use std::sync::Arc;

use ash::vk;
use prism_core::RenderPassDesc;

use crate::context::VulkanContext;
use crate::error::Result;
use crate::mapping;

/// Attachment descriptions in attachment order, colors first.
pub fn attachment_descriptions(
    color_formats: &[vk::Format],
    depth_stencil_format: Option<vk::Format>,
    samples: vk::SampleCountFlags,
    color_final_layout: vk::ImageLayout,
) -> Vec<vk::AttachmentDescription> {
    let colors = color_formats.iter().map(|&format| {
        vk::AttachmentDescription::default()
            .format(format)
            .samples(samples)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(color_final_layout)
    });
    let depth = depth_stencil_format.map(|format| {
        vk::AttachmentDescription::default()
            .format(format)
            .samples(samples)
            .load_op(vk::AttachmentLoadOp::CLEAR)
            .store_op(vk::AttachmentStoreOp::STORE)
            .stencil_load_op(vk::AttachmentLoadOp::DONT_CARE)
            .stencil_store_op(vk::AttachmentStoreOp::DONT_CARE)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .final_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
    });
    colors.chain(depth).collect()
}

/// External dependencies before and after the single subpass.
pub fn subpass_dependencies() -> [vk::SubpassDependency; 2] {
    let color_access =
        vk::AccessFlags::COLOR_ATTACHMENT_READ | vk::AccessFlags::COLOR_ATTACHMENT_WRITE;
    [
        vk::SubpassDependency::default()
            .src_subpass(vk::SUBPASS_EXTERNAL)
            .dst_subpass(0)
            .src_stage_mask(vk::PipelineStageFlags::BOTTOM_OF_PIPE)
            .dst_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .src_access_mask(vk::AccessFlags::MEMORY_READ)
            .dst_access_mask(color_access)
            .dependency_flags(vk::DependencyFlags::BY_REGION),
        vk::SubpassDependency::default()
            .src_subpass(0)
            .dst_subpass(vk::SUBPASS_EXTERNAL)
            .src_stage_mask(vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT)
            .dst_stage_mask(vk::PipelineStageFlags::BOTTOM_OF_PIPE)
            .src_access_mask(color_access)
            .dst_access_mask(vk::AccessFlags::MEMORY_READ)
            .dependency_flags(vk::DependencyFlags::BY_REGION),
    ]
}

/// Create a Vulkan render pass from the template.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_vk_render_pass(
    device: &ash::Device,
    color_formats: &[vk::Format],
    depth_stencil_format: Option<vk::Format>,
    samples: vk::SampleCountFlags,
    color_final_layout: vk::ImageLayout,
) -> Result<vk::RenderPass> {
    let attachments =
        attachment_descriptions(color_formats, depth_stencil_format, samples, color_final_layout);
    let color_references: Vec<_> = (0..color_formats.len() as u32)
        .map(|attachment| {
            vk::AttachmentReference::default()
                .attachment(attachment)
                .layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
        })
        .collect();
    let depth_reference = vk::AttachmentReference::default()
        .attachment(color_formats.len() as u32)
        .layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);

    let mut subpass = vk::SubpassDescription::default()
        .pipeline_bind_point(vk::PipelineBindPoint::GRAPHICS)
        .color_attachments(&color_references);
    if depth_stencil_format.is_some() {
        subpass = subpass.depth_stencil_attachment(&depth_reference);
    }
    let dependencies = subpass_dependencies();

    let create_info = vk::RenderPassCreateInfo::default()
        .attachments(&attachments)
        .subpasses(std::slice::from_ref(&subpass))
        .dependencies(&dependencies);

    Ok(unsafe { device.create_render_pass(&create_info, None) }?)
}

/// Render pass description plus a compatible Vulkan render pass that
/// pipeline states are built against.
pub struct RenderPass {
    context: Arc<VulkanContext>,
    desc: RenderPassDesc,
    render_pass: vk::RenderPass,
}

impl RenderPass {
    pub fn new(context: &Arc<VulkanContext>, desc: &RenderPassDesc) -> Result<Self> {
        let render_pass = unsafe {
            create_vk_render_pass(
                context.device(),
                &color_vk_formats(desc),
                depth_vk_format(desc),
                mapping::sample_count(desc.sample_count()),
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            )
        }?;
        Ok(Self {
            context: Arc::clone(context),
            desc: desc.clone(),
            render_pass,
        })
    }

    pub fn desc(&self) -> &RenderPassDesc {
        &self.desc
    }

    pub fn vk_render_pass(&self) -> vk::RenderPass {
        self.render_pass
    }

    pub fn number_of_color_attachments(&self) -> usize {
        self.desc.color_formats().len()
    }

    pub fn sample_count(&self) -> vk::SampleCountFlags {
        mapping::sample_count(self.desc.sample_count())
    }
}

impl Drop for RenderPass {
    fn drop(&mut self) {
        unsafe {
            self.context
                .device()
                .destroy_render_pass(self.render_pass, None);
        }
    }
}

pub fn color_vk_formats(desc: &RenderPassDesc) -> Vec<vk::Format> {
    desc.color_formats()
        .iter()
        .map(|&format| mapping::texture_format(format))
        .collect()
}

pub fn depth_vk_format(desc: &RenderPassDesc) -> Option<vk::Format> {
    desc.depth_stencil_format().map(mapping::texture_format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::TextureFormat;

    #[test]
    fn one_attachment_per_format_in_order() {
        let formats = [
            TextureFormat::R8G8B8A8Unorm,
            TextureFormat::R16G16B16A16Float,
            TextureFormat::R32Float,
        ];
        for count in 1..=formats.len() {
            let desc = RenderPassDesc::new(&formats[..count], None, 1).unwrap();
            let attachments = attachment_descriptions(
                &color_vk_formats(&desc),
                depth_vk_format(&desc),
                vk::SampleCountFlags::TYPE_1,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            );
            assert_eq!(attachments.len(), count);
            for (attachment, format) in attachments.iter().zip(&formats) {
                assert_eq!(attachment.format, mapping::texture_format(*format));
            }
        }
    }

    #[test]
    fn depth_attachment_comes_last() {
        let desc = RenderPassDesc::new(
            &[TextureFormat::R8G8B8A8Unorm; 8],
            Some(TextureFormat::D32Float),
            1,
        )
        .unwrap();
        let attachments = attachment_descriptions(
            &color_vk_formats(&desc),
            depth_vk_format(&desc),
            vk::SampleCountFlags::TYPE_1,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        );

        assert_eq!(attachments.len(), 9);
        let depth = attachments[8];
        assert_eq!(depth.format, vk::Format::D32_SFLOAT);
        assert_eq!(
            depth.final_layout,
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
        );
        for color in &attachments[..8] {
            assert_eq!(color.load_op, vk::AttachmentLoadOp::CLEAR);
            assert_eq!(color.store_op, vk::AttachmentStoreOp::STORE);
            assert_eq!(color.stencil_load_op, vk::AttachmentLoadOp::DONT_CARE);
            assert_eq!(color.stencil_store_op, vk::AttachmentStoreOp::DONT_CARE);
            assert_eq!(color.final_layout, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        }
    }

    #[test]
    fn unknown_depth_adds_no_attachment() {
        let desc = RenderPassDesc::new(
            &[TextureFormat::B8G8R8A8Unorm],
            Some(TextureFormat::Unknown),
            1,
        )
        .unwrap();
        assert_eq!(depth_vk_format(&desc), None);
    }

    #[test]
    fn dependencies_are_symmetric() {
        let [into_pass, out_of_pass] = subpass_dependencies();
        assert_eq!(into_pass.src_subpass, vk::SUBPASS_EXTERNAL);
        assert_eq!(into_pass.dst_subpass, 0);
        assert_eq!(out_of_pass.src_subpass, 0);
        assert_eq!(out_of_pass.dst_subpass, vk::SUBPASS_EXTERNAL);
        assert_eq!(into_pass.src_access_mask, out_of_pass.dst_access_mask);
        assert_eq!(into_pass.dst_access_mask, out_of_pass.src_access_mask);
        assert_eq!(into_pass.src_stage_mask, out_of_pass.dst_stage_mask);
    }
}
