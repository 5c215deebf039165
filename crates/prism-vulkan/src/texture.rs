//! Textures of every kind.

use std::sync::Arc;

use ash::vk;
use prism_core::{TextureDesc, TextureFlags, TextureKind};

use crate::context::VulkanContext;
use crate::error::Result;
use crate::memory::{create_and_fill_image, GpuImage};

/// 1D, 2D, 2D array, 3D or cube texture.
pub struct Texture {
    desc: TextureDesc,
    image: GpuImage,
}

impl Texture {
    /// Create a texture, uploading `data` when given.
    ///
    /// Render target textures are tracked in `SHADER_READ_ONLY_OPTIMAL`, the
    /// layout render passes leave them in. Depth render targets are moved
    /// to `DEPTH_STENCIL_ATTACHMENT_OPTIMAL` right away.
    pub fn new(
        context: &Arc<VulkanContext>,
        desc: &TextureDesc,
        data: Option<&[u8]>,
    ) -> Result<Self> {
        let image = create_and_fill_image(context, desc, image_usage(desc), data)?;

        if desc.flags.contains(TextureFlags::RENDER_TARGET) {
            if desc.format.is_depth() {
                image.set_tracked_layout(vk::ImageLayout::UNDEFINED);
                image.transition_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)?;
            } else {
                image.set_tracked_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
            }
        }

        Ok(Self {
            desc: desc.clone(),
            image,
        })
    }

    pub fn kind(&self) -> TextureKind {
        self.desc.kind
    }

    pub fn desc(&self) -> &TextureDesc {
        &self.desc
    }

    pub fn width(&self) -> u32 {
        self.desc.width
    }

    pub fn height(&self) -> u32 {
        self.desc.height
    }

    pub fn image(&self) -> &GpuImage {
        &self.image
    }

    pub fn view(&self) -> vk::ImageView {
        self.image.view()
    }

    pub fn vk_format(&self) -> vk::Format {
        self.image.format()
    }

    pub fn layout(&self) -> vk::ImageLayout {
        self.image.layout()
    }

    /// Layout to declare when the texture is sampled through a descriptor.
    pub fn sampled_layout(&self) -> vk::ImageLayout {
        if self.desc.format.is_depth() {
            vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL
        } else {
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL
        }
    }
}

/// Usage flags a texture is created with.
pub fn image_usage(desc: &TextureDesc) -> vk::ImageUsageFlags {
    let mut usage = vk::ImageUsageFlags::SAMPLED;
    if desc.flags.contains(TextureFlags::RENDER_TARGET) {
        usage |= if desc.format.is_depth() {
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT
        } else {
            vk::ImageUsageFlags::COLOR_ATTACHMENT
        };
    }
    if desc.flags.contains(TextureFlags::UNORDERED_ACCESS) {
        usage |= vk::ImageUsageFlags::STORAGE;
    }
    usage
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::TextureFormat;

    #[test]
    fn render_target_usage() {
        let color = TextureDesc::new_2d(
            128,
            128,
            TextureFormat::R8G8B8A8Unorm,
            TextureFlags::RENDER_TARGET | TextureFlags::SHADER_RESOURCE,
        );
        let depth = TextureDesc::new_2d(128, 128, TextureFormat::D32Float, TextureFlags::RENDER_TARGET);
        let sampled = TextureDesc::new_2d(128, 128, TextureFormat::Bc1, TextureFlags::empty());

        assert!(image_usage(&color).contains(vk::ImageUsageFlags::COLOR_ATTACHMENT));
        assert!(image_usage(&depth).contains(vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT));
        assert!(!image_usage(&depth).contains(vk::ImageUsageFlags::COLOR_ATTACHMENT));
        assert_eq!(image_usage(&sampled), vk::ImageUsageFlags::SAMPLED);
    }
}
