//! Presentation surfaces created from native window handles.

use std::sync::Arc;

use ash::vk;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};

use crate::context::VulkanContext;
use crate::error::{Result, VulkanError};

/// Surface query result.
pub struct SurfaceCapabilities {
    pub capabilities: vk::SurfaceCapabilitiesKHR,
    pub formats: Vec<vk::SurfaceFormatKHR>,
    pub present_modes: Vec<vk::PresentModeKHR>,
}

/// `VkSurfaceKHR` of one window.
pub struct Surface {
    context: Arc<VulkanContext>,
    loader: ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
}

impl Surface {
    /// Create a surface for `window`.
    ///
    /// Presentation happens on the graphics queue. A surface the graphics
    /// queue family cannot present to is reported but still returned.
    pub fn from_window<W>(context: &Arc<VulkanContext>, window: &W) -> Result<Self>
    where
        W: HasDisplayHandle + HasWindowHandle,
    {
        let entry = context.runtime().entry()?;
        let instance = context.instance()?;

        let display = window
            .display_handle()
            .map_err(|e| VulkanError::SurfaceCreation(format!("Failed to get display handle: {e}")))?;
        let window_handle = window
            .window_handle()
            .map_err(|e| VulkanError::SurfaceCreation(format!("Failed to get window handle: {e}")))?;

        let surface = unsafe {
            ash_window::create_surface(entry, instance, display.as_raw(), window_handle.as_raw(), None)
        }
        .map_err(|e| VulkanError::SurfaceCreation(e.to_string()))?;
        let loader = ash::khr::surface::Instance::new(entry, instance);

        let graphics_family = context.queue_families().graphics;
        let supported = unsafe {
            loader.get_physical_device_surface_support(
                context.physical_device(),
                graphics_family,
                surface,
            )
        };
        if !matches!(supported, Ok(true)) {
            tracing::error!(
                "Queue family {graphics_family} cannot present to the window surface, presentation will fail"
            );
        }

        Ok(Self {
            context: Arc::clone(context),
            loader,
            surface,
        })
    }

    pub fn handle(&self) -> vk::SurfaceKHR {
        self.surface
    }

    /// Query surface capabilities, formats and present modes.
    pub fn capabilities(&self) -> Result<SurfaceCapabilities> {
        let physical_device = self.context.physical_device();
        unsafe {
            Ok(SurfaceCapabilities {
                capabilities: self
                    .loader
                    .get_physical_device_surface_capabilities(physical_device, self.surface)?,
                formats: self
                    .loader
                    .get_physical_device_surface_formats(physical_device, self.surface)?,
                present_modes: self
                    .loader
                    .get_physical_device_surface_present_modes(physical_device, self.surface)?,
            })
        }
    }
}

impl Drop for Surface {
    fn drop(&mut self) {
        unsafe { self.loader.destroy_surface(self.surface, None) };
    }
}
