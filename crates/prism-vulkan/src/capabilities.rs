//! Physical device selection and capability reporting.

use std::ffi::CStr;

use ash::vk;
use prism_core::constants::MAX_COLOR_ATTACHMENTS;
use prism_core::Capabilities;

/// Smallest acceptable `maxImageDimension2D`.
pub const MINIMUM_IMAGE_DIMENSION_2D: u32 = 4096;

/// Device extensions a physical device must expose to be selected.
///
/// `VK_KHR_maintenance1` provides negative viewport heights, which the
/// renderer relies on to flip Vulkan's Y axis.
pub fn required_device_extensions() -> [&'static CStr; 2] {
    [ash::khr::swapchain::NAME, ash::khr::maintenance1::NAME]
}

/// What device selection needs to know about a physical device.
#[derive(Clone, Debug, Default)]
pub struct PhysicalDeviceSummary {
    pub device_name: String,
    pub api_version: u32,
    pub max_image_dimension_2d: u32,
    pub extensions: Vec<String>,
    pub queue_families: Vec<vk::QueueFamilyProperties>,
}

impl PhysicalDeviceSummary {
    /// Query a summary from a physical device.
    ///
    /// # Safety
    /// The instance and physical device must be valid.
    pub unsafe fn query(instance: &ash::Instance, physical_device: vk::PhysicalDevice) -> Self {
        let properties = unsafe { instance.get_physical_device_properties(physical_device) };
        let extensions = unsafe { instance.enumerate_device_extension_properties(physical_device) }
            .unwrap_or_default()
            .iter()
            .filter_map(|ext| {
                ext.extension_name_as_c_str()
                    .ok()
                    .and_then(|name| name.to_str().ok())
                    .map(String::from)
            })
            .collect();
        let queue_families =
            unsafe { instance.get_physical_device_queue_family_properties(physical_device) };

        Self {
            device_name: device_name(&properties),
            api_version: properties.api_version,
            max_image_dimension_2d: properties.limits.max_image_dimension2_d,
            extensions,
            queue_families,
        }
    }

    /// Whether the device exposes the named extension.
    pub fn supports_extension(&self, name: &CStr) -> bool {
        name.to_str()
            .is_ok_and(|name| self.extensions.iter().any(|ext| ext == name))
    }
}

/// Why a physical device was not selected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeviceRejection {
    MissingExtension(String),
    ApiVersionTooOld(u32),
    ImageDimensionTooSmall(u32),
    NoGraphicsQueue,
}

/// Queue family assignment of a selected device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueueFamilyIndices {
    pub graphics: u32,
    /// Always the graphics family; a separate present family is not searched for
    pub present: u32,
}

/// Run one physical device through the rejection pipeline.
///
/// Checks, in order: required extensions, API version and 2D image
/// dimension, then a queue family with graphics support and a nonzero queue
/// count.
pub fn evaluate_physical_device(
    summary: &PhysicalDeviceSummary,
) -> Result<QueueFamilyIndices, DeviceRejection> {
    if let Some(missing) = required_device_extensions()
        .into_iter()
        .find(|name| !summary.supports_extension(name))
    {
        return Err(DeviceRejection::MissingExtension(
            missing.to_string_lossy().into_owned(),
        ));
    }

    if vk::api_version_major(summary.api_version) < 1 {
        return Err(DeviceRejection::ApiVersionTooOld(summary.api_version));
    }
    if summary.max_image_dimension_2d < MINIMUM_IMAGE_DIMENSION_2D {
        return Err(DeviceRejection::ImageDimensionTooSmall(
            summary.max_image_dimension_2d,
        ));
    }

    summary
        .queue_families
        .iter()
        .position(|family| {
            family.queue_count > 0 && family.queue_flags.contains(vk::QueueFlags::GRAPHICS)
        })
        .map(|index| QueueFamilyIndices {
            graphics: index as u32,
            present: index as u32,
        })
        .ok_or(DeviceRejection::NoGraphicsQueue)
}

/// Pick the first device, in enumeration order, that passes
/// [`evaluate_physical_device`]. No ranking is done.
pub fn select_physical_device(
    summaries: &[PhysicalDeviceSummary],
) -> Option<(usize, QueueFamilyIndices)> {
    summaries.iter().enumerate().find_map(|(index, summary)| {
        match evaluate_physical_device(summary) {
            Ok(families) => Some((index, families)),
            Err(rejection) => {
                tracing::debug!(
                    "Physical device \"{}\" rejected: {rejection:?}",
                    summary.device_name
                );
                None
            }
        }
    })
}

/// Whether to enable `VK_EXT_debug_marker` on the selected device.
///
/// Debug markers and the validation layers do not work together, so markers
/// lose when both are present.
pub fn debug_marker_enabled(summary: &PhysicalDeviceSummary, validation_enabled: bool) -> bool {
    let supported = summary.supports_extension(ash::ext::debug_marker::NAME);
    if supported && validation_enabled {
        tracing::warn!(
            "Vulkan validation layers are enabled: disabling debug markers, the two are known \
             to conflict"
        );
        return false;
    }
    supported
}

fn device_name(properties: &vk::PhysicalDeviceProperties) -> String {
    properties
        .device_name_as_c_str()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Renderer capabilities derived from the selected device's properties.
pub fn capabilities_from_properties(properties: &vk::PhysicalDeviceProperties) -> Capabilities {
    let limits = &properties.limits;
    let samples = limits.framebuffer_color_sample_counts;
    let maximum_number_of_multisamples = [
        (vk::SampleCountFlags::TYPE_8, 8),
        (vk::SampleCountFlags::TYPE_4, 4),
        (vk::SampleCountFlags::TYPE_2, 2),
    ]
    .into_iter()
    .find(|(flag, _)| samples.contains(*flag))
    .map_or(1, |(_, count)| count);

    Capabilities {
        device_name: device_name(properties),
        maximum_texture_dimension: limits.max_image_dimension2_d,
        maximum_3d_texture_dimension: limits.max_image_dimension3_d,
        maximum_cube_dimension: limits.max_image_dimension_cube,
        maximum_number_of_2d_texture_array_slices: limits.max_image_array_layers,
        maximum_number_of_viewports: 1,
        maximum_number_of_simultaneous_render_targets: limits
            .max_color_attachments
            .min(MAX_COLOR_ATTACHMENTS as u32),
        maximum_uniform_buffer_size: limits.max_uniform_buffer_range,
        maximum_texture_buffer_size: limits.max_texel_buffer_elements,
        maximum_number_of_multisamples,
        maximum_anisotropy: limits.max_sampler_anisotropy.clamp(1.0, 16.0) as u8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graphics_family(count: u32) -> vk::QueueFamilyProperties {
        vk::QueueFamilyProperties {
            queue_flags: vk::QueueFlags::GRAPHICS | vk::QueueFlags::TRANSFER,
            queue_count: count,
            ..Default::default()
        }
    }

    fn stub_device() -> PhysicalDeviceSummary {
        PhysicalDeviceSummary {
            device_name: "Stub GPU".to_string(),
            api_version: vk::API_VERSION_1_0,
            max_image_dimension_2d: 4096,
            extensions: vec!["VK_KHR_swapchain".to_string(), "VK_KHR_maintenance1".to_string()],
            queue_families: vec![graphics_family(1)],
        }
    }

    #[test]
    fn minimal_device_is_selected() {
        let families = evaluate_physical_device(&stub_device()).unwrap();
        assert_eq!(families.graphics, 0);
        assert_eq!(families.present, families.graphics);
    }

    #[test]
    fn rejections_follow_pipeline_order() {
        let mut device = stub_device();
        device.extensions.pop();
        device.max_image_dimension_2d = 1024;
        assert_eq!(
            evaluate_physical_device(&device),
            Err(DeviceRejection::MissingExtension("VK_KHR_maintenance1".to_string()))
        );

        let mut device = stub_device();
        device.max_image_dimension_2d = 2048;
        device.queue_families.clear();
        assert_eq!(
            evaluate_physical_device(&device),
            Err(DeviceRejection::ImageDimensionTooSmall(2048))
        );

        let mut device = stub_device();
        device.api_version = vk::make_api_version(0, 0, 9, 0);
        assert!(matches!(
            evaluate_physical_device(&device),
            Err(DeviceRejection::ApiVersionTooOld(_))
        ));
    }

    #[test]
    fn graphics_family_needs_queues() {
        let mut device = stub_device();
        device.queue_families = vec![
            vk::QueueFamilyProperties {
                queue_flags: vk::QueueFlags::COMPUTE,
                queue_count: 4,
                ..Default::default()
            },
            graphics_family(0),
            graphics_family(2),
        ];
        assert_eq!(evaluate_physical_device(&device).unwrap().graphics, 2);

        device.queue_families.truncate(2);
        assert_eq!(
            evaluate_physical_device(&device),
            Err(DeviceRejection::NoGraphicsQueue)
        );
    }

    #[test]
    fn first_suitable_device_wins() {
        let mut unsuitable = stub_device();
        unsuitable.extensions.clear();
        let mut big = stub_device();
        big.max_image_dimension_2d = 16384;
        let devices = [unsuitable, stub_device(), big];
        assert_eq!(select_physical_device(&devices).map(|(i, _)| i), Some(1));
        assert_eq!(select_physical_device(&devices[..1]), None);
    }

    #[test]
    fn validation_disables_debug_markers() {
        let mut device = stub_device();
        assert!(!debug_marker_enabled(&device, false));
        device.extensions.push("VK_EXT_debug_marker".to_string());
        assert!(debug_marker_enabled(&device, false));
        assert!(!debug_marker_enabled(&device, true));
    }

    #[test]
    fn capabilities_follow_limits() {
        let mut properties = vk::PhysicalDeviceProperties::default();
        for (dst, src) in properties.device_name.iter_mut().zip(b"Stub GPU") {
            *dst = *src as std::ffi::c_char;
        }
        properties.limits.max_image_dimension2_d = 16384;
        properties.limits.max_color_attachments = 16;
        properties.limits.framebuffer_color_sample_counts =
            vk::SampleCountFlags::TYPE_1 | vk::SampleCountFlags::TYPE_4;
        properties.limits.max_sampler_anisotropy = 16.0;

        let caps = capabilities_from_properties(&properties);
        assert_eq!(caps.device_name, "Stub GPU");
        assert_eq!(caps.maximum_texture_dimension, 16384);
        assert_eq!(caps.maximum_number_of_simultaneous_render_targets, 8);
        assert_eq!(caps.maximum_number_of_viewports, 1);
        assert_eq!(caps.maximum_number_of_multisamples, 4);
        assert_eq!(caps.maximum_anisotropy, 16);
    }
}
