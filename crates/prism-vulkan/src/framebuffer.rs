//! Framebuffers over render target textures.

use std::sync::Arc;

use ash::vk;
use prism_core::TextureKind;

use crate::context::VulkanContext;
use crate::error::{Result, VulkanError};
use crate::render_pass::{create_vk_render_pass, RenderPass};
use crate::texture::Texture;

/// Minimum width and height over all attachment sizes, each at least 1.
pub fn min_extent(sizes: impl IntoIterator<Item = (u32, u32)>) -> (u32, u32) {
    let mut extent: Option<(u32, u32)> = None;
    for (width, height) in sizes {
        extent = Some(match extent {
            Some((min_width, min_height)) => (min_width.min(width), min_height.min(height)),
            None => (width, height),
        });
    }
    debug_assert!(extent.is_some(), "framebuffer without any attachment");
    let (width, height) = extent.unwrap_or((1, 1));
    (width.max(1), height.max(1))
}

/// Whether a texture of this kind can be attached to a framebuffer.
pub const fn is_attachable(kind: TextureKind) -> bool {
    matches!(kind, TextureKind::Texture2D | TextureKind::Texture2DArray)
}

/// Sample count of framebuffer attachments rendered with `render_pass_samples`.
///
/// Textures are single-sampled, so only single-sampled render passes can
/// target them.
pub fn attachment_samples(render_pass_samples: vk::SampleCountFlags) -> Result<vk::SampleCountFlags> {
    if render_pass_samples == vk::SampleCountFlags::TYPE_1 {
        Ok(vk::SampleCountFlags::TYPE_1)
    } else {
        Err(VulkanError::InvalidState(format!(
            "render pass uses {render_pass_samples:?} samples but framebuffer textures are single-sampled"
        )))
    }
}

/// Set of color textures plus an optional depth-stencil texture rendered to
/// together.
///
/// Owns a Vulkan render pass of its own whose attachment formats come from
/// the concrete textures.
pub struct Framebuffer {
    context: Arc<VulkanContext>,
    render_pass: Arc<RenderPass>,
    color_textures: Vec<Arc<Texture>>,
    depth_stencil_texture: Option<Arc<Texture>>,
    vk_render_pass: vk::RenderPass,
    framebuffer: vk::Framebuffer,
    width: u32,
    height: u32,
}

impl Framebuffer {
    pub fn new(
        context: &Arc<VulkanContext>,
        render_pass: Arc<RenderPass>,
        color_textures: &[Arc<Texture>],
        depth_stencil_texture: Option<Arc<Texture>>,
    ) -> Result<Self> {
        let samples = attachment_samples(render_pass.sample_count())?;
        let attached_colors: Vec<&Arc<Texture>> = color_textures
            .iter()
            .filter(|texture| is_attachable(texture.kind()))
            .collect();
        let attached_depth = depth_stencil_texture
            .as_ref()
            .filter(|texture| is_attachable(texture.kind()));

        let color_formats: Vec<vk::Format> =
            attached_colors.iter().map(|texture| texture.vk_format()).collect();
        let mut views: Vec<vk::ImageView> =
            attached_colors.iter().map(|texture| texture.view()).collect();
        if let Some(depth) = attached_depth {
            views.push(depth.view());
        }
        let (width, height) = min_extent(
            attached_colors
                .iter()
                .copied()
                .chain(attached_depth)
                .map(|texture| (texture.width(), texture.height())),
        );

        let device = context.device();
        let vk_render_pass = unsafe {
            create_vk_render_pass(
                device,
                &color_formats,
                attached_depth.map(|texture| texture.vk_format()),
                samples,
                vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            )
        }?;

        let create_info = vk::FramebufferCreateInfo::default()
            .render_pass(vk_render_pass)
            .attachments(&views)
            .width(width)
            .height(height)
            .layers(1);
        let framebuffer = match unsafe { device.create_framebuffer(&create_info, None) } {
            Ok(framebuffer) => framebuffer,
            Err(e) => {
                unsafe { device.destroy_render_pass(vk_render_pass, None) };
                return Err(e.into());
            }
        };

        Ok(Self {
            context: Arc::clone(context),
            render_pass,
            color_textures: color_textures.to_vec(),
            depth_stencil_texture,
            vk_render_pass,
            framebuffer,
            width,
            height,
        })
    }

    pub fn render_pass(&self) -> &Arc<RenderPass> {
        &self.render_pass
    }

    pub fn vk_render_pass(&self) -> vk::RenderPass {
        self.vk_render_pass
    }

    pub fn handle(&self) -> vk::Framebuffer {
        self.framebuffer
    }

    pub fn width_and_height(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn color_textures(&self) -> &[Arc<Texture>] {
        &self.color_textures
    }

    pub fn depth_stencil_texture(&self) -> Option<&Arc<Texture>> {
        self.depth_stencil_texture.as_ref()
    }

    /// Number of color attachments actually bound.
    pub fn number_of_color_attachments(&self) -> usize {
        self.color_textures
            .iter()
            .filter(|texture| is_attachable(texture.kind()))
            .count()
    }

    pub fn has_depth_stencil(&self) -> bool {
        self.depth_stencil_texture
            .as_ref()
            .is_some_and(|texture| is_attachable(texture.kind()))
    }

    /// Record the layouts the render pass leaves the attachments in.
    pub fn mark_render_pass_finished(&self) {
        for texture in &self.color_textures {
            if is_attachable(texture.kind()) {
                texture
                    .image()
                    .set_tracked_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
            }
        }
        if let Some(depth) = &self.depth_stencil_texture {
            depth
                .image()
                .set_tracked_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
        }
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        let device = self.context.device();
        unsafe {
            device.destroy_framebuffer(self.framebuffer, None);
            device.destroy_render_pass(self.vk_render_pass, None);
        }
    }
}
