//! Swap chains: presentable images, their framebuffers and the present loop.

use std::sync::Arc;

use ash::vk;
use parking_lot::Mutex;
use prism_core::{TextureDesc, TextureFlags, TextureFormat};

use crate::context::VulkanContext;
use crate::error::{Result, VulkanError};
use crate::mapping;
use crate::render_pass::{create_vk_render_pass, RenderPass};
use crate::surface::Surface;
use crate::sync::PresentSemaphores;
use crate::texture::Texture;

/// Surface format matching `preferred`, or the first one offered.
///
/// A lone `UNDEFINED` entry means the surface takes any format.
pub fn select_surface_format(
    available: &[vk::SurfaceFormatKHR],
    preferred: vk::Format,
) -> Option<vk::SurfaceFormatKHR> {
    if let [only] = available {
        if only.format == vk::Format::UNDEFINED {
            return Some(vk::SurfaceFormatKHR {
                format: preferred,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            });
        }
    }
    available
        .iter()
        .find(|format| format.format == preferred)
        .or_else(|| available.first())
        .copied()
}

/// FIFO with vertical synchronization, otherwise mailbox, then immediate.
pub fn select_present_mode(available: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {
    if vsync {
        return vk::PresentModeKHR::FIFO;
    }
    [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE]
        .into_iter()
        .find(|mode| available.contains(mode))
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// Swap chain extent for the requested window size.
pub fn calculate_extent(
    capabilities: &vk::SurfaceCapabilitiesKHR,
    desired_width: u32,
    desired_height: u32,
) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        capabilities.current_extent
    } else {
        vk::Extent2D {
            width: desired_width.clamp(
                capabilities.min_image_extent.width,
                capabilities.max_image_extent.width,
            ),
            height: desired_height.clamp(
                capabilities.min_image_extent.height,
                capabilities.max_image_extent.height,
            ),
        }
    }
}

/// One image more than the minimum, within the surface maximum.
pub fn image_count(capabilities: &vk::SurfaceCapabilitiesKHR) -> u32 {
    let count = capabilities.min_image_count + 1;
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

struct SwapChainImages {
    swapchain: vk::SwapchainKHR,
    format: vk::Format,
    extent: vk::Extent2D,
    vk_render_pass: vk::RenderPass,
    image_views: Vec<vk::ImageView>,
    framebuffers: Vec<vk::Framebuffer>,
    depth_stencil: Option<Texture>,
    acquired_image: Option<u32>,
    rendered: bool,
}

impl SwapChainImages {
    /// # Safety
    /// The swap chain must not be in use.
    unsafe fn destroy(&mut self, device: &ash::Device, loader: &ash::khr::swapchain::Device) {
        unsafe {
            for &framebuffer in &self.framebuffers {
                device.destroy_framebuffer(framebuffer, None);
            }
            for &view in &self.image_views {
                device.destroy_image_view(view, None);
            }
            device.destroy_render_pass(self.vk_render_pass, None);
            loader.destroy_swapchain(self.swapchain, None);
        }
        self.framebuffers.clear();
        self.image_views.clear();
        self.depth_stencil = None;
    }
}

/// Presentable images of one window rendered through a render pass.
pub struct SwapChain {
    context: Arc<VulkanContext>,
    render_pass: Arc<RenderPass>,
    loader: ash::khr::swapchain::Device,
    semaphores: PresentSemaphores,
    vsync: bool,
    images: Mutex<SwapChainImages>,
    // Dropped after the swap chain itself
    surface: Surface,
}

impl SwapChain {
    pub fn new(
        context: &Arc<VulkanContext>,
        render_pass: Arc<RenderPass>,
        surface: Surface,
        width: u32,
        height: u32,
        vsync: bool,
    ) -> Result<Self> {
        let instance = context.instance()?;
        let loader = ash::khr::swapchain::Device::new(instance, context.device());
        let images = create_images(
            context,
            &loader,
            &surface,
            &render_pass,
            width,
            height,
            vsync,
            vk::SwapchainKHR::null(),
        )?;
        let semaphores = match unsafe { PresentSemaphores::new(context.device()) } {
            Ok(semaphores) => semaphores,
            Err(e) => {
                let mut images = images;
                unsafe { images.destroy(context.device(), &loader) };
                return Err(e);
            }
        };

        Ok(Self {
            context: Arc::clone(context),
            render_pass,
            loader,
            semaphores,
            vsync,
            images: Mutex::new(images),
            surface,
        })
    }

    pub fn render_pass(&self) -> &Arc<RenderPass> {
        &self.render_pass
    }

    pub fn semaphores(&self) -> &PresentSemaphores {
        &self.semaphores
    }

    pub fn format(&self) -> vk::Format {
        self.images.lock().format
    }

    pub fn width_and_height(&self) -> (u32, u32) {
        let extent = self.images.lock().extent;
        (extent.width, extent.height)
    }

    pub fn has_depth_stencil(&self) -> bool {
        self.images.lock().depth_stencil.is_some()
    }

    /// Acquire the next image unless one is already acquired.
    ///
    /// Signals `image_available` when a new image is acquired.
    pub fn acquire_next_image(&self) -> Result<u32> {
        let mut images = self.images.lock();
        if let Some(index) = images.acquired_image {
            return Ok(index);
        }
        let (index, suboptimal) = unsafe {
            self.loader.acquire_next_image(
                images.swapchain,
                u64::MAX,
                self.semaphores.image_available,
                vk::Fence::null(),
            )
        }?;
        if suboptimal {
            tracing::debug!("Swap chain is suboptimal for the surface");
        }
        images.acquired_image = Some(index);
        images.rendered = false;
        Ok(index)
    }

    /// Render pass, framebuffer and extent of the acquired image.
    pub fn current_target(&self) -> Option<(vk::RenderPass, vk::Framebuffer, vk::Extent2D)> {
        let images = self.images.lock();
        let index = images.acquired_image? as usize;
        let framebuffer = *images.framebuffers.get(index)?;
        Some((images.vk_render_pass, framebuffer, images.extent))
    }

    /// Whether an acquired image waits for the scene submission.
    pub fn is_waiting_for_submission(&self) -> bool {
        let images = self.images.lock();
        images.acquired_image.is_some() && !images.rendered
    }

    /// Record that the scene rendering into the acquired image was submitted.
    pub fn mark_rendered(&self) {
        let mut images = self.images.lock();
        if images.acquired_image.is_some() {
            images.rendered = true;
        }
    }

    /// Present the acquired image once its rendering was submitted.
    pub fn present(&self) -> Result<()> {
        let mut images = self.images.lock();
        let Some(index) = images.acquired_image else {
            return Ok(());
        };
        if !images.rendered {
            tracing::warn!("Swap chain image {index} was acquired but never rendered, not presenting");
            return Ok(());
        }

        let swapchains = [images.swapchain];
        let image_indices = [index];
        let wait_semaphores = [self.semaphores.render_finished];
        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_semaphores)
            .swapchains(&swapchains)
            .image_indices(&image_indices);
        let result = unsafe {
            self.loader
                .queue_present(self.context.present_queue(), &present_info)
        };
        images.acquired_image = None;
        images.rendered = false;

        match result {
            Ok(_) => Ok(()),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => {
                tracing::debug!("Swap chain is out of date, resize_buffers is needed");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Recreate the swap chain images for a new window size.
    pub fn resize_buffers(&self, width: u32, height: u32) -> Result<()> {
        self.context.wait_idle()?;
        let mut images = self.images.lock();
        if images.acquired_image.is_some() && !images.rendered {
            return Err(VulkanError::InvalidState(
                "cannot resize a swap chain while an acquired image awaits rendering".to_string(),
            ));
        }

        let mut replaced = create_images(
            &self.context,
            &self.loader,
            &self.surface,
            &self.render_pass,
            width,
            height,
            self.vsync,
            images.swapchain,
        )?;
        std::mem::swap(&mut *images, &mut replaced);
        unsafe { replaced.destroy(self.context.device(), &self.loader) };
        tracing::debug!(
            "Swap chain resized to {}x{}",
            images.extent.width,
            images.extent.height
        );
        Ok(())
    }
}

impl Drop for SwapChain {
    fn drop(&mut self) {
        let device = self.context.device();
        unsafe {
            let _ = device.device_wait_idle();
            self.images.get_mut().destroy(device, &self.loader);
            self.semaphores.destroy(device);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn create_images(
    context: &Arc<VulkanContext>,
    loader: &ash::khr::swapchain::Device,
    surface: &Surface,
    render_pass: &RenderPass,
    width: u32,
    height: u32,
    vsync: bool,
    old_swapchain: vk::SwapchainKHR,
) -> Result<SwapChainImages> {
    let caps = surface.capabilities()?;

    let preferred = render_pass
        .desc()
        .color_formats()
        .first()
        .map_or(vk::Format::B8G8R8A8_UNORM, |&format| mapping::texture_format(format));
    let surface_format = select_surface_format(&caps.formats, preferred).ok_or_else(|| {
        VulkanError::SurfaceCreation("surface reports no formats".to_string())
    })?;
    if surface_format.format != preferred {
        tracing::warn!(
            "Surface does not support {preferred:?}, using {:?}",
            surface_format.format
        );
    }
    let present_mode = select_present_mode(&caps.present_modes, vsync);
    let extent = calculate_extent(&caps.capabilities, width, height);

    let create_info = vk::SwapchainCreateInfoKHR::default()
        .surface(surface.handle())
        .min_image_count(image_count(&caps.capabilities))
        .image_format(surface_format.format)
        .image_color_space(surface_format.color_space)
        .image_extent(extent)
        .image_array_layers(1)
        .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
        .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
        .pre_transform(caps.capabilities.current_transform)
        .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
        .present_mode(present_mode)
        .clipped(true)
        .old_swapchain(old_swapchain);
    let swapchain = unsafe { loader.create_swapchain(&create_info, None) }?;

    let mut images = SwapChainImages {
        swapchain,
        format: surface_format.format,
        extent,
        vk_render_pass: vk::RenderPass::null(),
        image_views: Vec::new(),
        framebuffers: Vec::new(),
        depth_stencil: None,
        acquired_image: None,
        rendered: false,
    };
    let depth_format = render_pass.desc().depth_stencil_format();
    match unsafe { create_image_targets(context, loader, &mut images, depth_format) } {
        Ok(()) => Ok(images),
        Err(e) => {
            unsafe { images.destroy(context.device(), loader) };
            Err(e)
        }
    }
}

/// Render pass, depth buffer, views and framebuffers of a fresh swap chain.
///
/// # Safety
/// `images.swapchain` must be a valid swap chain of `loader`.
unsafe fn create_image_targets(
    context: &Arc<VulkanContext>,
    loader: &ash::khr::swapchain::Device,
    images: &mut SwapChainImages,
    depth_format: Option<TextureFormat>,
) -> Result<()> {
    let device = context.device();
    let extent = images.extent;
    images.vk_render_pass = unsafe {
        create_vk_render_pass(
            device,
            &[images.format],
            depth_format.map(mapping::texture_format),
            vk::SampleCountFlags::TYPE_1,
            vk::ImageLayout::PRESENT_SRC_KHR,
        )
    }?;

    if let Some(format) = depth_format {
        let desc = TextureDesc::new_2d(extent.width, extent.height, format, TextureFlags::RENDER_TARGET);
        images.depth_stencil = Some(Texture::new(context, &desc, None)?);
    }

    for image in unsafe { loader.get_swapchain_images(images.swapchain) }? {
        let view_info = vk::ImageViewCreateInfo::default()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(images.format)
            .components(vk::ComponentMapping::default())
            .subresource_range(
                vk::ImageSubresourceRange::default()
                    .aspect_mask(vk::ImageAspectFlags::COLOR)
                    .base_mip_level(0)
                    .level_count(1)
                    .base_array_layer(0)
                    .layer_count(1),
            );
        let view = unsafe { device.create_image_view(&view_info, None) }?;
        images.image_views.push(view);

        let mut attachments = vec![view];
        if let Some(depth) = &images.depth_stencil {
            attachments.push(depth.view());
        }
        let framebuffer_info = vk::FramebufferCreateInfo::default()
            .render_pass(images.vk_render_pass)
            .attachments(&attachments)
            .width(extent.width)
            .height(extent.height)
            .layers(1);
        let framebuffer = unsafe { device.create_framebuffer(&framebuffer_info, None) }?;
        images.framebuffers.push(framebuffer);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface_format(format: vk::Format) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }
    }

    #[test]
    fn preferred_surface_format_wins() {
        let available = [
            surface_format(vk::Format::B8G8R8A8_SRGB),
            surface_format(vk::Format::R8G8B8A8_UNORM),
        ];
        let selected = select_surface_format(&available, vk::Format::R8G8B8A8_UNORM).unwrap();
        assert_eq!(selected.format, vk::Format::R8G8B8A8_UNORM);

        let fallback = select_surface_format(&available, vk::Format::R16G16B16A16_SFLOAT).unwrap();
        assert_eq!(fallback.format, vk::Format::B8G8R8A8_SRGB);
    }

    #[test]
    fn undefined_surface_format_takes_any() {
        let available = [surface_format(vk::Format::UNDEFINED)];
        let selected = select_surface_format(&available, vk::Format::B8G8R8A8_UNORM).unwrap();
        assert_eq!(selected.format, vk::Format::B8G8R8A8_UNORM);
        assert!(select_surface_format(&[], vk::Format::B8G8R8A8_UNORM).is_none());
    }

    #[test]
    fn present_mode_preference() {
        let modes = [vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::MAILBOX];
        assert_eq!(select_present_mode(&modes, true), vk::PresentModeKHR::FIFO);
        assert_eq!(select_present_mode(&modes, false), vk::PresentModeKHR::MAILBOX);
        assert_eq!(
            select_present_mode(&modes[..1], false),
            vk::PresentModeKHR::IMMEDIATE
        );
        assert_eq!(select_present_mode(&[], false), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn extent_follows_surface_or_clamps() {
        let fixed = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D { width: 800, height: 600 },
            ..Default::default()
        };
        assert_eq!(calculate_extent(&fixed, 1920, 1080), fixed.current_extent);

        let free = vk::SurfaceCapabilitiesKHR {
            current_extent: vk::Extent2D { width: u32::MAX, height: u32::MAX },
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D { width: 1024, height: 1024 },
            ..Default::default()
        };
        assert_eq!(
            calculate_extent(&free, 1920, 0),
            vk::Extent2D { width: 1024, height: 1 }
        );
    }

    #[test]
    fn image_count_respects_maximum() {
        let caps = vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 0,
            ..Default::default()
        };
        assert_eq!(image_count(&caps), 3);
        let capped = vk::SurfaceCapabilitiesKHR {
            max_image_count: 2,
            ..caps
        };
        assert_eq!(image_count(&capped), 2);
    }
}
