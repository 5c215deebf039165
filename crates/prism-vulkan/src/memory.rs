//! Device memory for buffers and images.
//!
//! This is the only module that allocates device memory or creates buffers
//! and images directly. Memory types are found by a linear scan of the
//! physical device's memory types; every buffer and image gets its own
//! allocation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ash::vk;
use parking_lot::Mutex;
use prism_core::{MappedSubresource, TextureDesc, TextureKind};

use crate::context::VulkanContext;
use crate::error::{Result, VulkanError};
use crate::mapping;

/// Index of the first memory type allowed by `type_bits` whose property
/// flags contain all of `properties`.
pub fn find_memory_type_index(
    memory_properties: &vk::PhysicalDeviceMemoryProperties,
    type_bits: u32,
    properties: vk::MemoryPropertyFlags,
) -> Result<u32> {
    memory_properties.memory_types[..memory_properties.memory_type_count as usize]
        .iter()
        .enumerate()
        .find(|(index, memory_type)| {
            type_bits & (1 << index) != 0 && memory_type.property_flags.contains(properties)
        })
        .map(|(index, _)| index as u32)
        .ok_or(VulkanError::NoMatchingMemoryType {
            type_bits,
            properties,
        })
}

/// Allocate memory matching `requirements` and `properties`.
///
/// # Safety
/// The context's device must be valid.
unsafe fn allocate_memory(
    context: &VulkanContext,
    requirements: vk::MemoryRequirements,
    properties: vk::MemoryPropertyFlags,
) -> Result<vk::DeviceMemory> {
    let memory_type_index =
        context.find_memory_type_index(requirements.memory_type_bits, properties)?;
    let allocate_info = vk::MemoryAllocateInfo::default()
        .allocation_size(requirements.size)
        .memory_type_index(memory_type_index);
    Ok(unsafe { context.device().allocate_memory(&allocate_info, None) }?)
}

/// Create a buffer with its own memory, optionally filled with `data`.
///
/// Memory is only mapped when `data` is given; that path expects
/// host-visible, host-coherent memory so no flush is needed.
///
/// # Safety
/// The context's device must be valid.
pub unsafe fn create_and_allocate_buffer(
    context: &VulkanContext,
    usage: vk::BufferUsageFlags,
    properties: vk::MemoryPropertyFlags,
    size: vk::DeviceSize,
    data: Option<&[u8]>,
) -> Result<(vk::Buffer, vk::DeviceMemory)> {
    let device = context.device();
    let buffer_info = vk::BufferCreateInfo::default()
        .size(size)
        .usage(usage)
        .sharing_mode(vk::SharingMode::EXCLUSIVE);
    let buffer = unsafe { device.create_buffer(&buffer_info, None) }?;

    let requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
    let memory = match unsafe { allocate_memory(context, requirements, properties) } {
        Ok(memory) => memory,
        Err(error) => {
            unsafe { device.destroy_buffer(buffer, None) };
            return Err(error);
        }
    };

    let filled = unsafe { bind_and_fill(device, buffer, memory, size, data) };
    if let Err(error) = filled {
        unsafe {
            device.destroy_buffer(buffer, None);
            device.free_memory(memory, None);
        }
        return Err(error);
    }
    Ok((buffer, memory))
}

unsafe fn bind_and_fill(
    device: &ash::Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
    data: Option<&[u8]>,
) -> Result<()> {
    unsafe { device.bind_buffer_memory(buffer, memory, 0) }?;
    if let Some(data) = data {
        let len = data.len().min(size as usize);
        unsafe {
            let mapped = device.map_memory(memory, 0, size, vk::MemoryMapFlags::empty())?;
            std::ptr::copy_nonoverlapping(data.as_ptr(), mapped.cast::<u8>(), len);
            device.unmap_memory(memory);
        }
    }
    Ok(())
}

/// Buffer plus its memory, destroyed together.
pub struct GpuBuffer {
    context: Arc<VulkanContext>,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
    mapped: AtomicBool,
}

impl GpuBuffer {
    /// Create a buffer through [`create_and_allocate_buffer`].
    pub fn new(
        context: &Arc<VulkanContext>,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
        size: vk::DeviceSize,
        data: Option<&[u8]>,
    ) -> Result<Self> {
        if size == 0 {
            return Err(VulkanError::InvalidState("buffer size must not be zero".to_string()));
        }
        let (buffer, memory) =
            unsafe { create_and_allocate_buffer(context, usage, properties, size, data) }?;
        Ok(Self {
            context: Arc::clone(context),
            buffer,
            memory,
            size,
            mapped: AtomicBool::new(false),
        })
    }

    /// Host-visible, host-coherent buffer for CPU-written data.
    pub fn host_visible(
        context: &Arc<VulkanContext>,
        usage: vk::BufferUsageFlags,
        size: vk::DeviceSize,
        data: Option<&[u8]>,
    ) -> Result<Self> {
        Self::new(
            context,
            usage,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
            size,
            data,
        )
    }

    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    pub fn memory(&self) -> vk::DeviceMemory {
        self.memory
    }

    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    pub fn context(&self) -> &Arc<VulkanContext> {
        &self.context
    }

    /// Whether the buffer is currently mapped.
    pub fn is_mapped(&self) -> bool {
        self.mapped.load(Ordering::Acquire)
    }

    /// Map the whole buffer. Only one mapping may exist at a time.
    pub fn map(&self) -> Result<MappedSubresource<'_>> {
        if self
            .mapped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(VulkanError::InvalidState("buffer is already mapped".to_string()));
        }

        let device = self.context.device();
        let pointer = match unsafe {
            device.map_memory(self.memory, 0, self.size, vk::MemoryMapFlags::empty())
        } {
            Ok(pointer) => pointer,
            Err(error) => {
                self.mapped.store(false, Ordering::Release);
                return Err(error.into());
            }
        };

        // Exclusive access is guaranteed by the `mapped` flag until the unmap closure runs
        let data = unsafe { std::slice::from_raw_parts_mut(pointer.cast::<u8>(), self.size as usize) };
        let pitch = self.size as u32;
        Ok(MappedSubresource::new(data, pitch, pitch, move || unsafe {
            device.unmap_memory(self.memory);
            self.mapped.store(false, Ordering::Release);
        }))
    }

    /// Copy `data` into the buffer at `offset` through a temporary mapping.
    pub fn write(&self, offset: usize, data: &[u8]) -> Result<()> {
        let end = offset
            .checked_add(data.len())
            .filter(|end| *end as u64 <= self.size)
            .ok_or_else(|| {
                VulkanError::InvalidState(format!(
                    "write of {} bytes at offset {offset} exceeds buffer size {}",
                    data.len(),
                    self.size
                ))
            })?;
        let mut mapped = self.map()?;
        mapped.data_mut()[offset..end].copy_from_slice(data);
        Ok(())
    }
}

impl Drop for GpuBuffer {
    fn drop(&mut self) {
        unsafe {
            let device = self.context.device();
            device.destroy_buffer(self.buffer, None);
            device.free_memory(self.memory, None);
        }
    }
}

/// Access masks and pipeline stages of one layout transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionMasks {
    pub src_access: vk::AccessFlags,
    pub dst_access: vk::AccessFlags,
    pub src_stage: vk::PipelineStageFlags,
    pub dst_stage: vk::PipelineStageFlags,
}

/// Masks of the supported layout transitions, `None` for any other pair.
pub fn transition_masks(
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) -> Option<TransitionMasks> {
    match (old_layout, new_layout) {
        (vk::ImageLayout::PREINITIALIZED, vk::ImageLayout::TRANSFER_DST_OPTIMAL) => {
            Some(TransitionMasks {
                src_access: vk::AccessFlags::HOST_WRITE,
                dst_access: vk::AccessFlags::TRANSFER_WRITE,
                src_stage: vk::PipelineStageFlags::HOST,
                dst_stage: vk::PipelineStageFlags::TRANSFER,
            })
        }
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL) => {
            Some(TransitionMasks {
                src_access: vk::AccessFlags::TRANSFER_WRITE,
                dst_access: vk::AccessFlags::SHADER_READ,
                src_stage: vk::PipelineStageFlags::TRANSFER,
                dst_stage: vk::PipelineStageFlags::FRAGMENT_SHADER,
            })
        }
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL) => {
            Some(TransitionMasks {
                src_access: vk::AccessFlags::empty(),
                dst_access: vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_READ
                    | vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE,
                src_stage: vk::PipelineStageFlags::TOP_OF_PIPE,
                dst_stage: vk::PipelineStageFlags::EARLY_FRAGMENT_TESTS,
            })
        }
        _ => None,
    }
}

/// Build the barrier for a layout transition of a whole image.
///
/// Unsupported pairs are logged and get empty access masks; the barrier is
/// still returned so the caller records it.
pub fn layout_transition_barrier(
    image: vk::Image,
    subresource_range: vk::ImageSubresourceRange,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) -> (vk::ImageMemoryBarrier<'static>, vk::PipelineStageFlags, vk::PipelineStageFlags) {
    let masks = transition_masks(old_layout, new_layout).unwrap_or_else(|| {
        tracing::error!(
            "Unsupported Vulkan image layout transition from {old_layout:?} to {new_layout:?}"
        );
        TransitionMasks {
            src_access: vk::AccessFlags::empty(),
            dst_access: vk::AccessFlags::empty(),
            src_stage: vk::PipelineStageFlags::ALL_COMMANDS,
            dst_stage: vk::PipelineStageFlags::ALL_COMMANDS,
        }
    });

    let barrier = vk::ImageMemoryBarrier::default()
        .src_access_mask(masks.src_access)
        .dst_access_mask(masks.dst_access)
        .old_layout(old_layout)
        .new_layout(new_layout)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(subresource_range);
    (barrier, masks.src_stage, masks.dst_stage)
}

/// Record a layout transition into `command_buffer`.
///
/// # Safety
/// The command buffer must be recording and `image` must be valid.
pub unsafe fn transition_image_layout(
    device: &ash::Device,
    command_buffer: vk::CommandBuffer,
    image: vk::Image,
    subresource_range: vk::ImageSubresourceRange,
    old_layout: vk::ImageLayout,
    new_layout: vk::ImageLayout,
) {
    let (barrier, src_stage, dst_stage) =
        layout_transition_barrier(image, subresource_range, old_layout, new_layout);
    unsafe {
        device.cmd_pipeline_barrier(
            command_buffer,
            src_stage,
            dst_stage,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier],
        );
    }
}

/// One buffer-to-image copy per mipmap level the data contains.
pub fn mip_copy_regions(desc: &TextureDesc) -> Vec<vk::BufferImageCopy> {
    let aspect = mapping::image_aspect(desc.format);
    let mut offset = 0;
    (0..desc.data_mip_levels())
        .map(|level| {
            let (width, height, depth) = desc.mip_extent(level);
            let region = vk::BufferImageCopy::default()
                .buffer_offset(offset)
                .image_subresource(
                    vk::ImageSubresourceLayers::default()
                        .aspect_mask(aspect)
                        .mip_level(level)
                        .base_array_layer(0)
                        .layer_count(desc.layer_count()),
                )
                .image_extent(vk::Extent3D {
                    width,
                    height,
                    depth,
                });
            offset += desc.mip_level_size(level);
            region
        })
        .collect()
}

/// Image, memory and view, destroyed together, with a tracked layout.
pub struct GpuImage {
    context: Arc<VulkanContext>,
    image: vk::Image,
    memory: vk::DeviceMemory,
    view: vk::ImageView,
    format: vk::Format,
    subresource_range: vk::ImageSubresourceRange,
    layout: Mutex<vk::ImageLayout>,
}

impl GpuImage {
    pub fn handle(&self) -> vk::Image {
        self.image
    }

    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    pub fn format(&self) -> vk::Format {
        self.format
    }

    pub fn subresource_range(&self) -> vk::ImageSubresourceRange {
        self.subresource_range
    }

    /// Layout the image is tracked to be in.
    pub fn layout(&self) -> vk::ImageLayout {
        *self.layout.lock()
    }

    /// Overwrite the tracked layout without recording anything.
    pub fn set_tracked_layout(&self, layout: vk::ImageLayout) {
        *self.layout.lock() = layout;
    }

    /// Transition the whole image to `new_layout` with a one-shot command buffer.
    pub fn transition_layout(&self, new_layout: vk::ImageLayout) -> Result<()> {
        let mut layout = self.layout.lock();
        let old_layout = *layout;
        self.context.execute_single_time_commands(|device, cmd| unsafe {
            transition_image_layout(
                device,
                cmd,
                self.image,
                self.subresource_range,
                old_layout,
                new_layout,
            );
        })?;
        *layout = new_layout;
        Ok(())
    }
}

impl Drop for GpuImage {
    fn drop(&mut self) {
        unsafe {
            let device = self.context.device();
            device.destroy_image_view(self.view, None);
            device.destroy_image(self.image, None);
            device.free_memory(self.memory, None);
        }
    }
}

/// Create a device-local image with a view, uploading `data` when given.
///
/// The mip count follows the mipmap flags of `desc`, one level otherwise.
/// Uploads go through a host-visible staging buffer and block until the
/// graphics queue is idle. Without data the image stays `PREINITIALIZED`.
pub fn create_and_fill_image(
    context: &Arc<VulkanContext>,
    desc: &TextureDesc,
    usage: vk::ImageUsageFlags,
    data: Option<&[u8]>,
) -> Result<GpuImage> {
    desc.validate()?;
    if let Some(data) = data {
        let expected = desc.data_size();
        if (data.len() as u64) < expected {
            return Err(prism_core::Error::InvalidData(format!(
                "texture data holds {} bytes, {expected} expected",
                data.len()
            ))
            .into());
        }
    }

    let device = context.device();
    let format = mapping::texture_format(desc.format);
    let subresource_range = vk::ImageSubresourceRange::default()
        .aspect_mask(mapping::image_aspect(desc.format))
        .base_mip_level(0)
        .level_count(desc.mip_levels())
        .base_array_layer(0)
        .layer_count(desc.layer_count());

    let usage = if data.is_some() {
        usage | vk::ImageUsageFlags::TRANSFER_DST
    } else {
        usage
    };
    let flags = if desc.kind == TextureKind::TextureCube {
        vk::ImageCreateFlags::CUBE_COMPATIBLE
    } else {
        vk::ImageCreateFlags::empty()
    };
    let image_info = vk::ImageCreateInfo::default()
        .flags(flags)
        .image_type(mapping::image_type(desc.kind))
        .format(format)
        .extent(vk::Extent3D {
            width: desc.width,
            height: desc.height,
            depth: if desc.kind == TextureKind::Texture3D { desc.depth } else { 1 },
        })
        .mip_levels(desc.mip_levels())
        .array_layers(desc.layer_count())
        .samples(vk::SampleCountFlags::TYPE_1)
        .tiling(vk::ImageTiling::OPTIMAL)
        .usage(usage)
        .sharing_mode(vk::SharingMode::EXCLUSIVE)
        .initial_layout(vk::ImageLayout::PREINITIALIZED);

    let image = unsafe { device.create_image(&image_info, None) }?;
    let requirements = unsafe { device.get_image_memory_requirements(image) };
    let memory = match unsafe {
        allocate_memory(context, requirements, vk::MemoryPropertyFlags::DEVICE_LOCAL)
    } {
        Ok(memory) => memory,
        Err(error) => {
            unsafe { device.destroy_image(image, None) };
            return Err(error);
        }
    };
    if let Err(error) = unsafe { device.bind_image_memory(image, memory, 0) } {
        unsafe {
            device.destroy_image(image, None);
            device.free_memory(memory, None);
        }
        return Err(error.into());
    }

    let view_info = vk::ImageViewCreateInfo::default()
        .image(image)
        .view_type(mapping::image_view_type(desc.kind))
        .format(format)
        .subresource_range(subresource_range);
    let view = match unsafe { device.create_image_view(&view_info, None) } {
        Ok(view) => view,
        Err(error) => {
            unsafe {
                device.destroy_image(image, None);
                device.free_memory(memory, None);
            }
            return Err(error.into());
        }
    };

    // From here on the image owns its handles and cleans up on error
    let gpu_image = GpuImage {
        context: Arc::clone(context),
        image,
        memory,
        view,
        format,
        subresource_range,
        layout: Mutex::new(vk::ImageLayout::PREINITIALIZED),
    };

    if let Some(data) = data {
        upload(context, &gpu_image, desc, data)?;
    }
    Ok(gpu_image)
}

fn upload(context: &Arc<VulkanContext>, image: &GpuImage, desc: &TextureDesc, data: &[u8]) -> Result<()> {
    let size = desc.data_size();
    let staging = GpuBuffer::host_visible(
        context,
        vk::BufferUsageFlags::TRANSFER_SRC,
        size,
        Some(&data[..size as usize]),
    )?;
    let regions = mip_copy_regions(desc);

    context.execute_single_time_commands(|device, cmd| unsafe {
        transition_image_layout(
            device,
            cmd,
            image.image,
            image.subresource_range,
            vk::ImageLayout::PREINITIALIZED,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        );
        device.cmd_copy_buffer_to_image(
            cmd,
            staging.handle(),
            image.image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &regions,
        );
        transition_image_layout(
            device,
            cmd,
            image.image,
            image.subresource_range,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        );
    })?;

    image.set_tracked_layout(vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::count_errors;
    use prism_core::{TextureFlags, TextureFormat};

    fn memory_properties(types: &[vk::MemoryPropertyFlags]) -> vk::PhysicalDeviceMemoryProperties {
        let mut properties = vk::PhysicalDeviceMemoryProperties {
            memory_type_count: types.len() as u32,
            ..Default::default()
        };
        for (slot, flags) in properties.memory_types.iter_mut().zip(types) {
            *slot = vk::MemoryType {
                property_flags: *flags,
                heap_index: 0,
            };
        }
        properties
    }

    #[test]
    fn memory_type_scan_takes_first_superset() {
        let host = vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT;
        let properties = memory_properties(&[
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
            vk::MemoryPropertyFlags::HOST_VISIBLE,
            host | vk::MemoryPropertyFlags::HOST_CACHED,
            host,
        ]);

        assert_eq!(find_memory_type_index(&properties, 0b1111, host).unwrap(), 2);
        assert_eq!(find_memory_type_index(&properties, 0b1011, host).unwrap(), 3);
        assert_eq!(
            find_memory_type_index(&properties, 0b1111, vk::MemoryPropertyFlags::DEVICE_LOCAL)
                .unwrap(),
            0
        );
        assert!(matches!(
            find_memory_type_index(&properties, 0b0011, host),
            Err(VulkanError::NoMatchingMemoryType { .. })
        ));
    }

    #[test]
    fn memory_type_scan_ignores_unused_slots() {
        let properties = memory_properties(&[vk::MemoryPropertyFlags::DEVICE_LOCAL]);
        assert!(find_memory_type_index(&properties, u32::MAX, vk::MemoryPropertyFlags::HOST_VISIBLE)
            .is_err());
    }

    #[test]
    fn supported_transitions_have_pair_specific_masks() {
        let pairs = [
            (vk::ImageLayout::PREINITIALIZED, vk::ImageLayout::TRANSFER_DST_OPTIMAL),
            (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
            (vk::ImageLayout::UNDEFINED, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL),
        ];
        let masks: Vec<_> = pairs
            .iter()
            .map(|&(old, new)| transition_masks(old, new).unwrap())
            .collect();

        assert_eq!(masks[0].src_access, vk::AccessFlags::HOST_WRITE);
        assert_eq!(masks[0].dst_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(masks[1].src_access, vk::AccessFlags::TRANSFER_WRITE);
        assert_eq!(masks[1].dst_access, vk::AccessFlags::SHADER_READ);
        assert!(masks[2].src_access.is_empty());
        assert!(masks[2]
            .dst_access
            .contains(vk::AccessFlags::DEPTH_STENCIL_ATTACHMENT_WRITE));
        for mask in &masks {
            assert!(!mask.dst_access.is_empty());
        }
        assert_ne!(masks[0], masks[1]);
    }

    #[test]
    fn unsupported_transition_logs_once_and_zeroes_masks() {
        let range = vk::ImageSubresourceRange::default()
            .aspect_mask(vk::ImageAspectFlags::COLOR)
            .level_count(1)
            .layer_count(1);
        let (result, errors) = count_errors(|| {
            layout_transition_barrier(
                vk::Image::null(),
                range,
                vk::ImageLayout::GENERAL,
                vk::ImageLayout::PRESENT_SRC_KHR,
            )
        });
        let (barrier, _, _) = result;

        assert_eq!(errors, 1);
        assert!(barrier.src_access_mask.is_empty());
        assert!(barrier.dst_access_mask.is_empty());
        assert_eq!(barrier.new_layout, vk::ImageLayout::PRESENT_SRC_KHR);
    }

    #[test]
    fn supported_transition_logs_nothing() {
        let (_, errors) = count_errors(|| {
            layout_transition_barrier(
                vk::Image::null(),
                vk::ImageSubresourceRange::default(),
                vk::ImageLayout::PREINITIALIZED,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            )
        });
        assert_eq!(errors, 0);
    }

    #[test]
    fn copy_regions_cover_each_data_level() {
        let desc = TextureDesc::new_2d(
            8,
            4,
            TextureFormat::R8G8B8A8Unorm,
            TextureFlags::DATA_CONTAINS_MIPMAPS,
        );
        let regions = mip_copy_regions(&desc);
        let offsets: Vec<_> = regions.iter().map(|r| r.buffer_offset).collect();
        let widths: Vec<_> = regions.iter().map(|r| r.image_extent.width).collect();

        assert_eq!(regions.len(), 4);
        assert_eq!(offsets, [0, 128, 160, 168]);
        assert_eq!(widths, [8, 4, 2, 1]);
        assert_eq!(regions[3].image_extent.height, 1);
    }

    #[test]
    fn generated_mipmaps_copy_only_the_base_level() {
        let desc = TextureDesc::new_2d(
            64,
            64,
            TextureFormat::R8G8B8A8Unorm,
            TextureFlags::GENERATE_MIPMAPS,
        );
        assert_eq!(desc.mip_levels(), 7);
        assert_eq!(mip_copy_regions(&desc).len(), 1);
    }

    #[test]
    #[ignore = "requires a Vulkan device"]
    fn uniform_buffer_round_trip() {
        use crate::runtime::{default_validation, RuntimeLinking};

        let runtime = Arc::new(RuntimeLinking::new("prism-memory-test", default_validation()));
        let context = Arc::new(VulkanContext::new(runtime).unwrap());
        let bytes: Vec<u8> = (0..=255).collect();

        let buffer = GpuBuffer::host_visible(
            &context,
            vk::BufferUsageFlags::UNIFORM_BUFFER,
            256,
            Some(&bytes),
        )
        .unwrap();
        assert!(!buffer.is_mapped());
        {
            let mapped = buffer.map().unwrap();
            assert_eq!(mapped.data(), bytes.as_slice());
            assert!(buffer.map().is_err());
        }
        assert!(!buffer.is_mapped());

        let empty =
            GpuBuffer::host_visible(&context, vk::BufferUsageFlags::UNIFORM_BUFFER, 256, None)
                .unwrap();
        assert!(!empty.is_mapped());
        empty.write(16, &bytes[..32]).unwrap();
        assert_eq!(&empty.map().unwrap().data()[16..48], &bytes[..32]);
    }
}
