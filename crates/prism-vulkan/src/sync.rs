//! Semaphores pairing swap chain image acquisition, rendering and presentation.

use ash::vk;

use crate::error::Result;

/// Create a semaphore.
///
/// # Safety
/// The device must be valid.
pub unsafe fn create_semaphore(device: &ash::Device) -> Result<vk::Semaphore> {
    let create_info = vk::SemaphoreCreateInfo::default();
    Ok(unsafe { device.create_semaphore(&create_info, None) }?)
}

/// Acquire/present semaphore pair of one swap chain.
///
/// The scene submission waits on `image_available` and signals
/// `render_finished`; presentation waits on `render_finished`.
pub struct PresentSemaphores {
    pub image_available: vk::Semaphore,
    pub render_finished: vk::Semaphore,
}

impl PresentSemaphores {
    /// # Safety
    /// The device must be valid.
    pub unsafe fn new(device: &ash::Device) -> Result<Self> {
        let image_available = unsafe { create_semaphore(device) }?;
        let render_finished = match unsafe { create_semaphore(device) } {
            Ok(semaphore) => semaphore,
            Err(e) => {
                unsafe { device.destroy_semaphore(image_available, None) };
                return Err(e);
            }
        };
        Ok(Self {
            image_available,
            render_finished,
        })
    }

    /// # Safety
    /// The device must be valid and the semaphores must not be in use.
    pub unsafe fn destroy(&self, device: &ash::Device) {
        unsafe {
            device.destroy_semaphore(self.image_available, None);
            device.destroy_semaphore(self.render_finished, None);
        }
    }
}
