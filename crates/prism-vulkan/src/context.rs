//! Physical device selection and logical device bring-up.

use std::ffi::c_char;
use std::sync::Arc;

use ash::vk;

use crate::capabilities::{
    debug_marker_enabled, required_device_extensions, select_physical_device,
    PhysicalDeviceSummary, QueueFamilyIndices,
};
use crate::command::{execute_single_time_commands, CommandPool};
use crate::debug::DebugMarker;
use crate::error::{Result, VulkanError};
use crate::memory::find_memory_type_index;
use crate::runtime::{load_device_level_entry_points, RuntimeLinking};

/// Device features every logical device is created with.
///
/// Requested unconditionally rather than negotiated with the device.
pub fn required_device_features() -> vk::PhysicalDeviceFeatures {
    vk::PhysicalDeviceFeatures::default()
        .geometry_shader(true)
        .tessellation_shader(true)
        .multi_draw_indirect(true)
        .depth_clamp(true)
        .fill_mode_non_solid(true)
        .sampler_anisotropy(true)
}

/// Logical device, queues and the renderer's long-lived command buffer.
pub struct VulkanContext {
    runtime: Arc<RuntimeLinking>,
    physical_device: vk::PhysicalDevice,
    properties: vk::PhysicalDeviceProperties,
    memory_properties: vk::PhysicalDeviceMemoryProperties,
    device: ash::Device,
    queue_families: QueueFamilyIndices,
    graphics_queue: vk::Queue,
    present_queue: vk::Queue,
    command_pool: CommandPool,
    command_buffer: vk::CommandBuffer,
    debug_marker: Option<DebugMarker>,
}

impl VulkanContext {
    /// Select a physical device and create the logical device on it.
    pub fn new(runtime: Arc<RuntimeLinking>) -> Result<Self> {
        let instance = runtime.instance()?;

        let physical_devices = unsafe { instance.enumerate_physical_devices() }?;
        if physical_devices.is_empty() {
            tracing::error!("Failed to find any Vulkan physical device");
            return Err(VulkanError::NoSuitableDevice);
        }
        let summaries: Vec<_> = physical_devices
            .iter()
            .map(|&device| unsafe { PhysicalDeviceSummary::query(instance, device) })
            .collect();

        let Some((index, queue_families)) = select_physical_device(&summaries) else {
            tracing::error!("Failed to find a suitable Vulkan physical device");
            return Err(VulkanError::NoSuitableDevice);
        };
        let physical_device = physical_devices[index];
        let summary = &summaries[index];
        let debug_markers = debug_marker_enabled(summary, runtime.is_validation_enabled());

        tracing::info!(
            "Selected Vulkan device: {} (Vulkan {}.{}.{})",
            summary.device_name,
            vk::api_version_major(summary.api_version),
            vk::api_version_minor(summary.api_version),
            vk::api_version_patch(summary.api_version),
        );

        let device = unsafe {
            create_device(instance, physical_device, queue_families.graphics, debug_markers)
        }
        .map_err(|error| {
            tracing::error!("Failed to create the Vulkan device instance: {error}");
            error
        })?;

        if !unsafe { load_device_level_entry_points(instance, device.handle()) } {
            unsafe { device.destroy_device(None) };
            return Err(VulkanError::EntryPointMissing(
                "see the log for the unresolved names".to_string(),
            ));
        }

        let graphics_queue = unsafe { device.get_device_queue(queue_families.graphics, 0) };
        let present_queue = unsafe { device.get_device_queue(queue_families.present, 0) };

        let command_pool = match unsafe { CommandPool::new(&device, queue_families.graphics) } {
            Ok(pool) => pool,
            Err(error) => {
                tracing::error!("Failed to create Vulkan command pool: {error}");
                unsafe { device.destroy_device(None) };
                return Err(error);
            }
        };
        let command_buffer = match unsafe { command_pool.allocate_primary(&device) } {
            Ok(command_buffer) => command_buffer,
            Err(error) => {
                tracing::error!("Failed to allocate Vulkan command buffer: {error}");
                unsafe {
                    command_pool.destroy(&device);
                    device.destroy_device(None);
                }
                return Err(error);
            }
        };

        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        let memory_properties =
            unsafe { instance.get_physical_device_memory_properties(physical_device) };
        let debug_marker = debug_markers.then(|| DebugMarker::new(instance, &device));

        Ok(Self {
            physical_device,
            properties,
            memory_properties,
            device,
            queue_families,
            graphics_queue,
            present_queue,
            command_pool,
            command_buffer,
            debug_marker,
            runtime,
        })
    }

    pub fn runtime(&self) -> &RuntimeLinking {
        &self.runtime
    }

    /// The Vulkan instance the device was created from.
    pub fn instance(&self) -> Result<&ash::Instance> {
        self.runtime.instance()
    }

    pub fn device(&self) -> &ash::Device {
        &self.device
    }

    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    pub fn properties(&self) -> &vk::PhysicalDeviceProperties {
        &self.properties
    }

    pub fn memory_properties(&self) -> &vk::PhysicalDeviceMemoryProperties {
        &self.memory_properties
    }

    pub fn graphics_queue(&self) -> vk::Queue {
        self.graphics_queue
    }

    pub fn present_queue(&self) -> vk::Queue {
        self.present_queue
    }

    pub fn queue_families(&self) -> QueueFamilyIndices {
        self.queue_families
    }

    pub fn command_pool(&self) -> &CommandPool {
        &self.command_pool
    }

    /// The primary command buffer all scene work is recorded into.
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    /// Debug marker recorder, present only when `VK_EXT_debug_marker` is enabled.
    pub fn debug_marker(&self) -> Option<&DebugMarker> {
        self.debug_marker.as_ref()
    }

    /// Index of the first memory type allowed by `type_bits` that has all of `properties`.
    pub fn find_memory_type_index(
        &self,
        type_bits: u32,
        properties: vk::MemoryPropertyFlags,
    ) -> Result<u32> {
        find_memory_type_index(&self.memory_properties, type_bits, properties)
    }

    /// Record and run a one-shot command buffer on the graphics queue,
    /// blocking until it has completed.
    pub fn execute_single_time_commands<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&ash::Device, vk::CommandBuffer),
    {
        unsafe {
            execute_single_time_commands(&self.device, &self.command_pool, self.graphics_queue, |cmd| {
                f(&self.device, cmd);
            })
        }
    }

    /// Block until the device has finished all submitted work.
    pub fn wait_idle(&self) -> Result<()> {
        unsafe { self.device.device_wait_idle() }?;
        Ok(())
    }
}

impl Drop for VulkanContext {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
            self.device
                .free_command_buffers(self.command_pool.handle(), &[self.command_buffer]);
            self.command_pool.destroy(&self.device);
            self.device.destroy_device(None);
        }
    }
}

/// Create the logical device with one graphics queue.
///
/// # Safety
/// The instance and physical device must be valid.
unsafe fn create_device(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
    graphics_family: u32,
    debug_markers: bool,
) -> Result<ash::Device> {
    let queue_priority = 0.0_f32;
    let queue_create_info = vk::DeviceQueueCreateInfo::default()
        .queue_family_index(graphics_family)
        .queue_priorities(std::slice::from_ref(&queue_priority));

    let mut extensions = required_device_extensions().to_vec();
    if debug_markers {
        extensions.push(ash::ext::debug_marker::NAME);
    }
    let extension_names: Vec<*const c_char> = extensions.iter().map(|ext| ext.as_ptr()).collect();

    let features = required_device_features();
    let device_create_info = vk::DeviceCreateInfo::default()
        .queue_create_infos(std::slice::from_ref(&queue_create_info))
        .enabled_extension_names(&extension_names)
        .enabled_features(&features);

    Ok(unsafe { instance.create_device(physical_device, &device_create_info, None) }?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::default_validation;

    #[test]
    fn fixed_feature_set() {
        let features = required_device_features();
        assert_eq!(features.geometry_shader, vk::TRUE);
        assert_eq!(features.tessellation_shader, vk::TRUE);
        assert_eq!(features.multi_draw_indirect, vk::TRUE);
        assert_eq!(features.depth_clamp, vk::TRUE);
        assert_eq!(features.fill_mode_non_solid, vk::TRUE);
        assert_eq!(features.sampler_anisotropy, vk::TRUE);
        assert_eq!(features.sparse_binding, vk::FALSE);
        assert_eq!(features.shader_float64, vk::FALSE);
        assert_eq!(features.robust_buffer_access, vk::FALSE);
    }

    #[test]
    #[ignore = "requires a Vulkan device"]
    fn context_bring_up() {
        let runtime = Arc::new(RuntimeLinking::new("prism-context-test", default_validation()));
        assert!(runtime.is_vulkan_available());

        let context = VulkanContext::new(runtime).unwrap();
        assert_ne!(context.device().handle(), vk::Device::null());
        assert_ne!(context.graphics_queue(), vk::Queue::null());
        assert_ne!(context.command_pool().handle(), vk::CommandPool::null());
        assert_ne!(context.command_buffer(), vk::CommandBuffer::null());
        let families = context.queue_families();
        assert_eq!(families.graphics, families.present);
        context.wait_idle().unwrap();
    }
}
