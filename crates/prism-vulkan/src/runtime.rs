//! Runtime linking of the Vulkan library and instance creation.
//!
//! Nothing links against Vulkan at build time. The shared library is loaded
//! on first use, the instance is created with the surface extensions of the
//! current platform, and, when validation is requested, the validation
//! layers plus a debug report callback are installed.

use std::ffi::{c_char, CStr, CString};
use std::sync::OnceLock;

use ash::vk;

use crate::debug::debug_report_create_info;
use crate::error::{Result, VulkanError};

/// Environment variable that force-enables validation when set to `1`.
pub const VALIDATION_ENV_VAR: &str = "PRISM_VULKAN_VALIDATION";

/// Whether validation is enabled when the caller does not decide.
pub fn default_validation() -> bool {
    std::env::var(VALIDATION_ENV_VAR).map_or(cfg!(debug_assertions), |value| value == "1")
}

/// Instance extensions needed to present on the current platform.
pub fn required_instance_extensions() -> Vec<&'static CStr> {
    vec![
        ash::khr::surface::NAME,
        #[cfg(target_os = "windows")]
        ash::khr::win32_surface::NAME,
        #[cfg(all(unix, not(target_os = "android"), not(target_os = "macos")))]
        ash::khr::xlib_surface::NAME,
        #[cfg(all(unix, not(target_os = "android"), not(target_os = "macos")))]
        ash::khr::xcb_surface::NAME,
        #[cfg(all(unix, not(target_os = "android"), not(target_os = "macos")))]
        ash::khr::wayland_surface::NAME,
        #[cfg(target_os = "android")]
        ash::khr::android_surface::NAME,
        #[cfg(target_os = "macos")]
        ash::ext::metal_surface::NAME,
        #[cfg(target_os = "macos")]
        ash::khr::portability_enumeration::NAME,
    ]
}

/// Validation layers requested when validation is enabled.
pub fn validation_layers() -> Vec<&'static CStr> {
    if cfg!(target_os = "android") {
        // The Android loader does not ship the meta layer
        vec![
            c"VK_LAYER_GOOGLE_threading",
            c"VK_LAYER_LUNARG_parameter_validation",
            c"VK_LAYER_LUNARG_object_tracker",
            c"VK_LAYER_LUNARG_core_validation",
            c"VK_LAYER_LUNARG_swapchain",
            c"VK_LAYER_GOOGLE_unique_objects",
        ]
    } else {
        vec![c"VK_LAYER_KHRONOS_validation"]
    }
}

/// Loaded library, instance and optional debug report callback.
pub struct RuntimeLinking {
    app_name: String,
    validation_requested: bool,
    loaded: OnceLock<Option<LoadedRuntime>>,
}

struct LoadedRuntime {
    entry: ash::Entry,
    instance: ash::Instance,
    validation_enabled: bool,
    debug_report: Option<(ash::ext::debug_report::Instance, vk::DebugReportCallbackEXT)>,
}

impl RuntimeLinking {
    /// Prepare runtime linking. Nothing is loaded until
    /// [`is_vulkan_available`](Self::is_vulkan_available) is called.
    pub fn new(app_name: impl Into<String>, validation: bool) -> Self {
        Self {
            app_name: app_name.into(),
            validation_requested: validation,
            loaded: OnceLock::new(),
        }
    }

    /// Load the library and create the instance on first call.
    ///
    /// Later calls return the cached outcome without doing any work.
    pub fn is_vulkan_available(&self) -> bool {
        self.loaded
            .get_or_init(|| {
                match unsafe { LoadedRuntime::load(&self.app_name, self.validation_requested) } {
                    Ok(runtime) => Some(runtime),
                    Err(error) => {
                        tracing::error!("Failed to bring up the Vulkan runtime: {error}");
                        None
                    }
                }
            })
            .is_some()
    }

    fn runtime(&self) -> Result<&LoadedRuntime> {
        if !self.is_vulkan_available() {
            return Err(VulkanError::RuntimeUnavailable(
                "Vulkan library or instance could not be created".to_string(),
            ));
        }
        self.loaded
            .get()
            .and_then(Option::as_ref)
            .ok_or_else(|| VulkanError::RuntimeUnavailable("runtime not loaded".to_string()))
    }

    pub fn entry(&self) -> Result<&ash::Entry> {
        Ok(&self.runtime()?.entry)
    }

    pub fn instance(&self) -> Result<&ash::Instance> {
        Ok(&self.runtime()?.instance)
    }

    /// Whether validation layers ended up enabled.
    ///
    /// False when validation was requested but the layers are not installed.
    pub fn is_validation_enabled(&self) -> bool {
        self.runtime().is_ok_and(|runtime| runtime.validation_enabled)
    }
}

impl LoadedRuntime {
    unsafe fn load(app_name: &str, validation: bool) -> Result<Self> {
        let entry = unsafe { ash::Entry::load() }
            .map_err(|e| VulkanError::RuntimeUnavailable(format!("Failed to load Vulkan: {e}")))?;

        let (instance, validation_enabled) =
            match unsafe { create_instance(&entry, app_name, validation) } {
                Err(VulkanError::Vulkan(vk::Result::ERROR_LAYER_NOT_PRESENT)) if validation => {
                    tracing::warn!(
                        "Failed to create the Vulkan instance with validation enabled, layer is \
                         not present. Install e.g. the LunarG Vulkan SDK to get validation."
                    );
                    (unsafe { create_instance(&entry, app_name, false) }?, false)
                }
                result => (result?, validation),
            };

        let debug_report = if validation_enabled {
            let loader = ash::ext::debug_report::Instance::new(&entry, &instance);
            match unsafe { loader.create_debug_report_callback(&debug_report_create_info(), None) } {
                Ok(callback) => Some((loader, callback)),
                Err(error) => {
                    tracing::warn!("Failed to install the Vulkan debug report callback: {error}");
                    None
                }
            }
        } else {
            None
        };

        Ok(Self {
            entry,
            instance,
            validation_enabled,
            debug_report,
        })
    }
}

impl Drop for LoadedRuntime {
    fn drop(&mut self) {
        unsafe {
            if let Some((loader, callback)) = self.debug_report.take() {
                loader.destroy_debug_report_callback(callback, None);
            }
            self.instance.destroy_instance(None);
        }
    }
}

/// Create a Vulkan instance.
///
/// # Safety
/// The entry must be a valid Vulkan entry point.
unsafe fn create_instance(
    entry: &ash::Entry,
    app_name: &str,
    enable_validation: bool,
) -> Result<ash::Instance> {
    let app_name = CString::new(app_name.replace('\0', "")).unwrap_or_default();

    let app_info = vk::ApplicationInfo::default()
        .application_name(&app_name)
        .application_version(vk::make_api_version(0, 0, 1, 0))
        .engine_name(c"Prism")
        .engine_version(vk::make_api_version(0, 0, 1, 0))
        .api_version(vk::API_VERSION_1_0);

    let mut extensions = required_instance_extensions();
    if enable_validation {
        extensions.push(ash::ext::debug_report::NAME);
    }
    let extension_names: Vec<*const c_char> = extensions.iter().map(|ext| ext.as_ptr()).collect();

    let layers = if enable_validation {
        validation_layers()
    } else {
        vec![]
    };
    let layer_names: Vec<*const c_char> = layers.iter().map(|l| l.as_ptr()).collect();

    #[cfg(target_os = "macos")]
    let create_flags = vk::InstanceCreateFlags::ENUMERATE_PORTABILITY_KHR;
    #[cfg(not(target_os = "macos"))]
    let create_flags = vk::InstanceCreateFlags::empty();

    let create_info = vk::InstanceCreateInfo::default()
        .application_info(&app_info)
        .enabled_extension_names(&extension_names)
        .enabled_layer_names(&layer_names)
        .flags(create_flags);

    Ok(unsafe { entry.create_instance(&create_info, None) }?)
}

/// Device-level commands the backend records or calls.
pub const DEVICE_LEVEL_ENTRY_POINTS: &[&CStr] = &[
    c"vkDestroyDevice",
    c"vkCreateShaderModule",
    c"vkDestroyShaderModule",
    c"vkCreateBuffer",
    c"vkDestroyBuffer",
    c"vkAllocateMemory",
    c"vkFreeMemory",
    c"vkGetBufferMemoryRequirements",
    c"vkBindBufferMemory",
    c"vkCreateRenderPass",
    c"vkDestroyRenderPass",
    c"vkCreateImage",
    c"vkDestroyImage",
    c"vkGetImageSubresourceLayout",
    c"vkGetImageMemoryRequirements",
    c"vkBindImageMemory",
    c"vkCreateImageView",
    c"vkDestroyImageView",
    c"vkCreateSampler",
    c"vkDestroySampler",
    c"vkCreateSemaphore",
    c"vkDestroySemaphore",
    c"vkCreateFence",
    c"vkDestroyFence",
    c"vkWaitForFences",
    c"vkResetFences",
    c"vkCreateCommandPool",
    c"vkDestroyCommandPool",
    c"vkAllocateCommandBuffers",
    c"vkFreeCommandBuffers",
    c"vkBeginCommandBuffer",
    c"vkEndCommandBuffer",
    c"vkResetCommandBuffer",
    c"vkGetDeviceQueue",
    c"vkQueueSubmit",
    c"vkQueueWaitIdle",
    c"vkDeviceWaitIdle",
    c"vkCreateFramebuffer",
    c"vkDestroyFramebuffer",
    c"vkCreatePipelineCache",
    c"vkDestroyPipelineCache",
    c"vkCreatePipelineLayout",
    c"vkDestroyPipelineLayout",
    c"vkCreateGraphicsPipelines",
    c"vkCreateComputePipelines",
    c"vkDestroyPipeline",
    c"vkCreateDescriptorPool",
    c"vkDestroyDescriptorPool",
    c"vkCreateDescriptorSetLayout",
    c"vkDestroyDescriptorSetLayout",
    c"vkAllocateDescriptorSets",
    c"vkFreeDescriptorSets",
    c"vkUpdateDescriptorSets",
    c"vkCreateBufferView",
    c"vkDestroyBufferView",
    c"vkMapMemory",
    c"vkUnmapMemory",
    c"vkFlushMappedMemoryRanges",
    c"vkInvalidateMappedMemoryRanges",
    c"vkCmdPipelineBarrier",
    c"vkCmdBeginRenderPass",
    c"vkCmdEndRenderPass",
    c"vkCmdExecuteCommands",
    c"vkCmdCopyImage",
    c"vkCmdBlitImage",
    c"vkCmdCopyBufferToImage",
    c"vkCmdClearAttachments",
    c"vkCmdCopyBuffer",
    c"vkCmdBindDescriptorSets",
    c"vkCmdBindPipeline",
    c"vkCmdSetViewport",
    c"vkCmdSetScissor",
    c"vkCmdSetLineWidth",
    c"vkCmdSetDepthBias",
    c"vkCmdPushConstants",
    c"vkCmdBindIndexBuffer",
    c"vkCmdBindVertexBuffers",
    c"vkCmdDraw",
    c"vkCmdDrawIndexed",
    c"vkCmdDrawIndirect",
    c"vkCmdDrawIndexedIndirect",
    c"vkCmdDispatch",
    c"vkCmdClearColorImage",
    c"vkCmdClearDepthStencilImage",
    c"vkCmdUpdateBuffer",
];

/// Check that every device-level entry point in
/// [`DEVICE_LEVEL_ENTRY_POINTS`] resolves on `device`.
///
/// A false return leaves the device unusable; already resolved pointers are
/// not reported individually.
///
/// # Safety
/// `device` must have been created from `instance`.
pub unsafe fn load_device_level_entry_points(instance: &ash::Instance, device: vk::Device) -> bool {
    let get_device_proc_addr = instance.fp_v1_0().get_device_proc_addr;
    let mut all_resolved = true;
    for name in DEVICE_LEVEL_ENTRY_POINTS {
        if unsafe { get_device_proc_addr(device, name.as_ptr()) }.is_none() {
            tracing::error!(
                "Failed to load device-level Vulkan entry point \"{}\"",
                name.to_string_lossy()
            );
            all_resolved = false;
        }
    }
    all_resolved
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn availability_is_computed_once() {
        let linking = RuntimeLinking::new("prism-test", false);
        assert!(linking.loaded.get().is_none());

        let first = linking.is_vulkan_available();
        let state = linking.loaded.get().map(std::ptr::from_ref);
        let second = linking.is_vulkan_available();

        assert_eq!(first, second);
        assert_eq!(state, linking.loaded.get().map(std::ptr::from_ref));
    }

    #[test]
    fn surface_extension_always_requested() {
        let extensions = required_instance_extensions();
        assert_eq!(extensions[0], ash::khr::surface::NAME);
        assert!(!extensions.contains(&ash::ext::debug_report::NAME));
    }

    #[test]
    fn desktop_uses_meta_layer() {
        let layers = validation_layers();
        if cfg!(target_os = "android") {
            assert_eq!(layers.len(), 6);
        } else {
            assert_eq!(layers, [c"VK_LAYER_KHRONOS_validation"]);
        }
    }

    #[test]
    fn entry_point_table_has_no_duplicates() {
        let mut names: Vec<_> = DEVICE_LEVEL_ENTRY_POINTS.to_vec();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), DEVICE_LEVEL_ENTRY_POINTS.len());
        assert!(names.len() >= 80);
    }
}
