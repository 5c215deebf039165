//! Validation-layer reporting and debug markers.

use std::borrow::Cow;
use std::ffi::{c_char, c_void, CStr, CString};

use ash::vk;
use prism_core::LogType;

/// Location and message code of the validation report for rebinding a
/// descriptor set that is still compatible with the bound pipeline layout.
///
/// The layer raises it for every resource group switch between pipeline
/// states sharing a root signature, which is valid usage.
pub const SUPPRESSED_DESCRIPTOR_SET_REPORT: (usize, i32) = (5460, 0);

/// Map report flags to a log level. The most severe set bit wins.
pub fn log_type_for_report_flags(flags: vk::DebugReportFlagsEXT) -> LogType {
    if flags.contains(vk::DebugReportFlagsEXT::ERROR) {
        LogType::Critical
    } else if flags.contains(vk::DebugReportFlagsEXT::WARNING) {
        LogType::Warning
    } else if flags.contains(vk::DebugReportFlagsEXT::PERFORMANCE_WARNING) {
        LogType::PerformanceWarning
    } else if flags.contains(vk::DebugReportFlagsEXT::INFORMATION) {
        LogType::Information
    } else if flags.contains(vk::DebugReportFlagsEXT::DEBUG) {
        LogType::Debug
    } else {
        LogType::Trace
    }
}

/// Whether a report is a known false positive that is dropped.
pub fn is_suppressed_report(
    object_type: vk::DebugReportObjectTypeEXT,
    location: usize,
    message_code: i32,
) -> bool {
    object_type == vk::DebugReportObjectTypeEXT::DESCRIPTOR_SET
        && (location, message_code) == SUPPRESSED_DESCRIPTOR_SET_REPORT
}

/// Render one validation report as a single log line.
pub fn format_report(
    object_type: vk::DebugReportObjectTypeEXT,
    object: u64,
    location: usize,
    message_code: i32,
    layer_prefix: &str,
    message: &str,
) -> String {
    format!(
        "Vulkan debug report callback: Object type: \"{object_type:?}\" Object: \"{object}\" \
         Location: \"{location}\" Message code: \"{message_code}\" Layer prefix: \
         \"{layer_prefix}\" Message: \"{message}\""
    )
}

unsafe fn lossy<'a>(text: *const c_char) -> Cow<'a, str> {
    if text.is_null() {
        Cow::Borrowed("")
    } else {
        unsafe { CStr::from_ptr(text) }.to_string_lossy()
    }
}

/// Debug report callback handed to the validation layers.
///
/// Never asks the layer to abort the call that triggered the report.
///
/// # Safety
/// Called by the Vulkan loader with valid, NUL-terminated strings or null.
pub unsafe extern "system" fn debug_report_callback(
    flags: vk::DebugReportFlagsEXT,
    object_type: vk::DebugReportObjectTypeEXT,
    object: u64,
    location: usize,
    message_code: i32,
    layer_prefix: *const c_char,
    message: *const c_char,
    _user_data: *mut c_void,
) -> vk::Bool32 {
    if is_suppressed_report(object_type, location, message_code) {
        return vk::FALSE;
    }

    let (layer_prefix, message) = unsafe { (lossy(layer_prefix), lossy(message)) };
    log_type_for_report_flags(flags).emit(&format_report(
        object_type,
        object,
        location,
        message_code,
        &layer_prefix,
        &message,
    ));
    vk::FALSE
}

/// Create info for the instance-wide debug report callback.
pub fn debug_report_create_info() -> vk::DebugReportCallbackCreateInfoEXT<'static> {
    vk::DebugReportCallbackCreateInfoEXT::default()
        .flags(
            vk::DebugReportFlagsEXT::ERROR
                | vk::DebugReportFlagsEXT::WARNING
                | vk::DebugReportFlagsEXT::PERFORMANCE_WARNING,
        )
        .pfn_callback(Some(debug_report_callback))
}

/// `VK_EXT_debug_marker` command recorder.
pub struct DebugMarker {
    loader: ash::ext::debug_marker::Device,
}

impl DebugMarker {
    pub fn new(instance: &ash::Instance, device: &ash::Device) -> Self {
        Self {
            loader: ash::ext::debug_marker::Device::new(instance, device),
        }
    }

    /// Insert a single named marker.
    ///
    /// # Safety
    /// The command buffer must be in the recording state.
    pub unsafe fn insert(&self, command_buffer: vk::CommandBuffer, name: &str) {
        let name = marker_name(name);
        let info = vk::DebugMarkerMarkerInfoEXT::default()
            .marker_name(&name)
            .color([0.0, 1.0, 0.0, 1.0]);
        unsafe { self.loader.cmd_debug_marker_insert(command_buffer, &info) };
    }

    /// Open a named region.
    ///
    /// # Safety
    /// The command buffer must be in the recording state.
    pub unsafe fn begin(&self, command_buffer: vk::CommandBuffer, name: &str) {
        let name = marker_name(name);
        let info = vk::DebugMarkerMarkerInfoEXT::default()
            .marker_name(&name)
            .color([1.0, 1.0, 1.0, 1.0]);
        unsafe { self.loader.cmd_debug_marker_begin(command_buffer, &info) };
    }

    /// Close the innermost region.
    ///
    /// # Safety
    /// The command buffer must be in the recording state with an open region.
    pub unsafe fn end(&self, command_buffer: vk::CommandBuffer) {
        unsafe { self.loader.cmd_debug_marker_end(command_buffer) };
    }
}

/// Marker names are C strings; interior NULs are dropped.
fn marker_name(name: &str) -> CString {
    CString::new(name.replace('\0', "")).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn most_severe_flag_wins() {
        let flags = vk::DebugReportFlagsEXT::DEBUG
            | vk::DebugReportFlagsEXT::WARNING
            | vk::DebugReportFlagsEXT::PERFORMANCE_WARNING;
        assert_eq!(log_type_for_report_flags(flags), LogType::Warning);
        assert_eq!(
            log_type_for_report_flags(
                vk::DebugReportFlagsEXT::ERROR | vk::DebugReportFlagsEXT::INFORMATION
            ),
            LogType::Critical
        );
        assert_eq!(
            log_type_for_report_flags(vk::DebugReportFlagsEXT::PERFORMANCE_WARNING),
            LogType::PerformanceWarning
        );
        assert_eq!(
            log_type_for_report_flags(vk::DebugReportFlagsEXT::empty()),
            LogType::Trace
        );
    }

    #[test]
    fn report_line_layout() {
        let line = format_report(
            vk::DebugReportObjectTypeEXT::IMAGE,
            42,
            7,
            -3,
            "Validation",
            "bad layout",
        );
        assert_eq!(
            line,
            "Vulkan debug report callback: Object type: \"IMAGE\" Object: \"42\" \
             Location: \"7\" Message code: \"-3\" Layer prefix: \"Validation\" \
             Message: \"bad layout\""
        );
    }

    #[test]
    fn only_the_descriptor_set_pair_is_suppressed() {
        let (location, code) = SUPPRESSED_DESCRIPTOR_SET_REPORT;
        assert!(is_suppressed_report(
            vk::DebugReportObjectTypeEXT::DESCRIPTOR_SET,
            location,
            code
        ));
        assert!(!is_suppressed_report(
            vk::DebugReportObjectTypeEXT::BUFFER,
            location,
            code
        ));
        assert!(!is_suppressed_report(
            vk::DebugReportObjectTypeEXT::DESCRIPTOR_SET,
            location + 1,
            code
        ));
    }

    #[test]
    fn callback_never_aborts() {
        let message = c"message";
        let prefix = c"DS";
        let result = unsafe {
            debug_report_callback(
                vk::DebugReportFlagsEXT::ERROR,
                vk::DebugReportObjectTypeEXT::UNKNOWN,
                0,
                0,
                0,
                prefix.as_ptr(),
                message.as_ptr(),
                std::ptr::null_mut(),
            )
        };
        assert_eq!(result, vk::FALSE);
    }

    #[test]
    fn marker_names_drop_interior_nul() {
        assert_eq!(marker_name("Sh\0adow").as_bytes(), b"Shadow");
    }
}
