//! Translation of recorded command streams into Vulkan commands.
//!
//! Vulkan render passes must be begun and ended explicitly, and clearing is
//! folded into the render pass load operation. The dispatcher therefore
//! opens the render pass of the current render target lazily, on the first
//! draw, and closes it when the render target changes or the scene ends.
//! Clear values are cached outside of a render pass and consumed when the
//! next one opens.

use std::any::Any;
use std::sync::Arc;

use ash::vk;
use prism_core::{
    ClearFlags, Command, CommandBuffer, DrawArguments, DrawIndexedArguments, DrawSource,
    RenderTarget, ScissorRectangle, Viewport,
};

use crate::buffer::VertexArray;
use crate::context::VulkanContext;
use crate::error::{Result, VulkanError};
use crate::pipeline::PipelineState;
use crate::root_signature::RootSignature;
use crate::swapchain::SwapChain;
use crate::Vulkan;

/// Clear values applied when a render pass opens.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClearValues {
    pub color: [f32; 4],
    pub depth: f32,
    pub stencil: u32,
}

impl Default for ClearValues {
    fn default() -> Self {
        Self {
            color: [0.0, 0.0, 0.0, 1.0],
            depth: 1.0,
            stencil: 0,
        }
    }
}

impl ClearValues {
    /// Vulkan clear values for `color_attachments` colors plus an optional depth-stencil.
    pub fn to_vk(self, color_attachments: usize, depth_stencil: bool) -> Vec<vk::ClearValue> {
        let color = vk::ClearValue {
            color: vk::ClearColorValue {
                float32: self.color,
            },
        };
        let mut values = vec![color; color_attachments];
        if depth_stencil {
            values.push(vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue {
                    depth: self.depth,
                    stencil: self.stencil,
                },
            });
        }
        values
    }
}

/// What has to be recorded for the render pass of a render target being left.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PassTransition {
    /// Nothing is open and nothing is pending
    None,
    /// The render pass is open and must be ended
    End,
    /// The render pass never opened; begin and end it so clears still happen
    BeginAndEnd,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PassState {
    NoTarget,
    Pending,
    Open,
}

/// Render pass open/close bookkeeping, independent of any Vulkan object.
#[derive(Debug)]
pub struct RenderPassTracker {
    state: PassState,
    clear_values: ClearValues,
}

impl Default for RenderPassTracker {
    fn default() -> Self {
        Self {
            state: PassState::NoTarget,
            clear_values: ClearValues::default(),
        }
    }
}

impl RenderPassTracker {
    pub fn clear_values(&self) -> ClearValues {
        self.clear_values
    }

    pub fn is_open(&self) -> bool {
        self.state == PassState::Open
    }

    pub fn has_target(&self) -> bool {
        self.state != PassState::NoTarget
    }

    /// Switch to a new render target, or to none.
    ///
    /// Returns what must be recorded for the target being left.
    pub fn bind_target(&mut self, has_target: bool) -> PassTransition {
        let transition = self.leave();
        self.state = if has_target {
            PassState::Pending
        } else {
            PassState::NoTarget
        };
        transition
    }

    /// Mark the render pass open for a draw.
    ///
    /// Returns `Some(true)` when the caller has to begin the render pass now,
    /// `Some(false)` when it is already open and `None` without a target.
    pub fn open_for_draw(&mut self) -> Option<bool> {
        match self.state {
            PassState::NoTarget => None,
            PassState::Open => Some(false),
            PassState::Pending => {
                self.state = PassState::Open;
                Some(true)
            }
        }
    }

    /// Update the cached clear values selected by `flags`.
    ///
    /// Clearing is only possible while no render pass is open; otherwise
    /// the request is rejected and nothing changes.
    pub fn clear(&mut self, flags: ClearFlags, color: [f32; 4], depth: f32, stencil: u32) -> bool {
        if self.is_open() {
            tracing::error!("Clearing is not possible inside an open Vulkan render pass");
            return false;
        }
        if flags.contains(ClearFlags::COLOR) {
            self.clear_values.color = color;
        }
        if flags.contains(ClearFlags::DEPTH) {
            self.clear_values.depth = depth;
        }
        if flags.contains(ClearFlags::STENCIL) {
            self.clear_values.stencil = stencil;
        }
        true
    }

    /// Leave the current target at the end of a scene.
    pub fn end_scene(&mut self) -> PassTransition {
        self.bind_target(false)
    }

    fn leave(&self) -> PassTransition {
        match self.state {
            PassState::NoTarget => PassTransition::None,
            PassState::Pending => PassTransition::BeginAndEnd,
            PassState::Open => PassTransition::End,
        }
    }
}

/// Vulkan viewport for a top-left-origin viewport.
///
/// Y is flipped through a negative height so every backend shares one
/// coordinate convention without touching shaders.
pub fn flip_viewport(viewport: &Viewport) -> vk::Viewport {
    vk::Viewport {
        x: viewport.top_left_x,
        y: viewport.top_left_y + viewport.height,
        width: viewport.width,
        height: -viewport.height,
        min_depth: viewport.min_depth,
        max_depth: viewport.max_depth,
    }
}

pub fn scissor_rect(rectangle: &ScissorRectangle) -> vk::Rect2D {
    vk::Rect2D {
        offset: vk::Offset2D {
            x: rectangle.top_left_x,
            y: rectangle.top_left_y,
        },
        extent: vk::Extent2D {
            width: rectangle.width(),
            height: rectangle.height(),
        },
    }
}

/// Descriptor set index a resource group binds to, `None` when nothing is bound.
///
/// A group built for another root signature or another root parameter is
/// rejected; a parameter without a descriptor set binds nothing.
pub fn resource_group_set_index(
    root_parameter_index: u32,
    set_index: Option<u32>,
    group_root_parameter_index: u32,
    same_root_signature: bool,
) -> Option<u32> {
    if !same_root_signature {
        tracing::error!(
            "Resource group was created for a different root signature than the bound one, not binding it"
        );
        return None;
    }
    if group_root_parameter_index != root_parameter_index {
        tracing::error!(
            "Resource group was created for root parameter {group_root_parameter_index} but is bound to root parameter {root_parameter_index}"
        );
        return None;
    }
    if set_index.is_none() {
        tracing::debug!(
            "Root parameter {root_parameter_index} has no descriptor set, resource group binds nothing"
        );
    }
    set_index
}

type Retained = Arc<dyn Any + Send + Sync>;

/// Everything needed to begin the render pass of a render target.
struct PassTarget {
    render_pass: vk::RenderPass,
    framebuffer: vk::Framebuffer,
    extent: vk::Extent2D,
    color_attachments: usize,
    depth_stencil: bool,
}

/// Executes recorded commands into the context's primary command buffer.
#[derive(Default)]
pub struct CommandDispatcher {
    recording: bool,
    tracker: RenderPassTracker,
    render_target: Option<RenderTarget<Vulkan>>,
    root_signature: Option<Arc<RootSignature>>,
    vertex_array: Option<Arc<VertexArray>>,
    swap_chains: Vec<Arc<SwapChain>>,
    // Resources referenced by the recording, released once the GPU is done
    retained: Vec<Retained>,
}

impl CommandDispatcher {
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    pub fn tracker(&self) -> &RenderPassTracker {
        &self.tracker
    }

    /// Reset and begin the primary command buffer.
    pub fn begin_scene(&mut self, context: &VulkanContext) -> Result<()> {
        if self.recording {
            return Err(VulkanError::InvalidState(
                "begin_scene called while a scene is already being recorded".to_string(),
            ));
        }
        let device = context.device();
        let command_buffer = context.command_buffer();
        unsafe {
            device.reset_command_buffer(command_buffer, vk::CommandBufferResetFlags::empty())?;
            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            device.begin_command_buffer(command_buffer, &begin_info)?;
        }
        self.recording = true;
        Ok(())
    }

    /// Record every command of `command_buffer`.
    pub fn dispatch(&mut self, context: &VulkanContext, command_buffer: &CommandBuffer<Vulkan>) {
        if !self.recording {
            tracing::error!("Command buffer submitted outside of begin_scene/end_scene, ignoring it");
            return;
        }
        for command in command_buffer {
            tracing::trace!(index = ?command.dispatch_index(), "dispatch");
            self.execute(context, command);
        }
    }

    /// Close the render pass, submit the scene and wait for it to complete.
    pub fn end_scene(&mut self, context: &VulkanContext) -> Result<()> {
        if !self.recording {
            return Err(VulkanError::InvalidState(
                "end_scene called without begin_scene".to_string(),
            ));
        }
        self.recording = false;
        let transition = self.tracker.end_scene();
        self.finish_target(context, transition);
        self.render_target = None;
        self.root_signature = None;
        self.vertex_array = None;

        let result = self.submit(context);
        self.swap_chains.clear();
        self.retained.clear();
        result
    }

    fn submit(&self, context: &VulkanContext) -> Result<()> {
        let device = context.device();
        let command_buffer = context.command_buffer();
        unsafe { device.end_command_buffer(command_buffer) }?;

        let presenting: Vec<&Arc<SwapChain>> = self
            .swap_chains
            .iter()
            .filter(|swap_chain| swap_chain.is_waiting_for_submission())
            .collect();
        let wait_semaphores: Vec<_> = presenting
            .iter()
            .map(|swap_chain| swap_chain.semaphores().image_available)
            .collect();
        let wait_stages =
            vec![vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT; wait_semaphores.len()];
        let signal_semaphores: Vec<_> = presenting
            .iter()
            .map(|swap_chain| swap_chain.semaphores().render_finished)
            .collect();

        let submit_info = vk::SubmitInfo::default()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(std::slice::from_ref(&command_buffer))
            .signal_semaphores(&signal_semaphores);
        unsafe {
            device.queue_submit(
                context.graphics_queue(),
                std::slice::from_ref(&submit_info),
                vk::Fence::null(),
            )?;
            device.queue_wait_idle(context.graphics_queue())?;
        }

        for swap_chain in presenting {
            swap_chain.mark_rendered();
        }
        Ok(())
    }

    fn execute(&mut self, context: &VulkanContext, command: &Command<Vulkan>) {
        let device = context.device();
        let cmd = context.command_buffer();

        match command {
            Command::ExecuteCommandBuffer(nested) => {
                self.retained.push(nested.clone());
                for nested_command in nested.iter() {
                    self.execute(context, nested_command);
                }
            }
            Command::SetGraphicsRootSignature(root_signature) => {
                if let Some(root_signature) = root_signature {
                    self.retained.push(root_signature.clone());
                }
                self.root_signature = root_signature.clone();
            }
            Command::SetGraphicsPipelineState(pipeline_state) => {
                if let Some(pipeline_state) = pipeline_state {
                    self.bind_pipeline_state(device, cmd, pipeline_state);
                }
            }
            Command::SetGraphicsResourceGroup {
                root_parameter_index,
                resource_group,
            } => {
                let Some(resource_group) = resource_group else {
                    return;
                };
                let Some(root_signature) = &self.root_signature else {
                    tracing::error!("No graphics root signature set, cannot bind a resource group");
                    return;
                };
                let Some(set_index) = resource_group_set_index(
                    *root_parameter_index,
                    root_signature.set_index(*root_parameter_index as usize),
                    resource_group.root_parameter_index(),
                    Arc::ptr_eq(root_signature, resource_group.root_signature()),
                ) else {
                    return;
                };
                unsafe {
                    device.cmd_bind_descriptor_sets(
                        cmd,
                        vk::PipelineBindPoint::GRAPHICS,
                        root_signature.pipeline_layout(),
                        set_index,
                        &[resource_group.descriptor_set()],
                        &[],
                    );
                }
                self.retained.push(resource_group.clone());
            }
            Command::SetGraphicsVertexArray(vertex_array) => {
                if let Some(vertex_array) = vertex_array {
                    unsafe { vertex_array.bind(device, cmd) };
                    self.retained.push(vertex_array.clone());
                }
                self.vertex_array = vertex_array.clone();
            }
            Command::SetGraphicsViewports(viewports) => {
                let Some(viewport) = viewports.first() else {
                    tracing::error!("Empty viewport list");
                    return;
                };
                unsafe { device.cmd_set_viewport(cmd, 0, &[flip_viewport(viewport)]) };
            }
            Command::SetGraphicsScissorRectangles(rectangles) => {
                let Some(rectangle) = rectangles.first() else {
                    tracing::error!("Empty scissor rectangle list");
                    return;
                };
                unsafe { device.cmd_set_scissor(cmd, 0, &[scissor_rect(rectangle)]) };
            }
            Command::SetGraphicsRenderTarget(render_target) => {
                self.set_render_target(context, render_target.as_ref());
            }
            Command::ClearGraphics {
                flags,
                color,
                z,
                stencil,
            } => {
                self.tracker.clear(*flags, *color, *z, *stencil);
            }
            Command::DrawGraphics(source) => {
                if !self.ensure_render_pass_open(context) {
                    return;
                }
                self.draw(device, cmd, source);
            }
            Command::DrawIndexedGraphics(source) => {
                let has_index_buffer = self
                    .vertex_array
                    .as_ref()
                    .is_some_and(|vertex_array| vertex_array.index_buffer().is_some());
                if !has_index_buffer {
                    tracing::error!("Indexed draw without a vertex array owning an index buffer");
                    return;
                }
                if !self.ensure_render_pass_open(context) {
                    return;
                }
                self.draw_indexed(device, cmd, source);
            }
            Command::CopyUniformBufferData {
                uniform_buffer,
                data,
            } => {
                if let Err(e) = uniform_buffer.buffer().write(0, data) {
                    tracing::error!("Failed to copy uniform buffer data: {e}");
                }
            }
            Command::SetDebugMarker(name) => {
                if let Some(marker) = context.debug_marker() {
                    unsafe { marker.insert(cmd, name) };
                }
            }
            Command::BeginDebugEvent(name) => {
                if let Some(marker) = context.debug_marker() {
                    unsafe { marker.begin(cmd, name) };
                }
            }
            Command::EndDebugEvent => {
                if let Some(marker) = context.debug_marker() {
                    unsafe { marker.end(cmd) };
                }
            }
        }
    }

    fn bind_pipeline_state(
        &mut self,
        device: &ash::Device,
        cmd: vk::CommandBuffer,
        pipeline_state: &Arc<PipelineState>,
    ) {
        unsafe {
            device.cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, pipeline_state.handle());
        }
        self.retained.push(pipeline_state.clone());
    }

    fn draw(
        &self,
        device: &ash::Device,
        cmd: vk::CommandBuffer,
        source: &DrawSource<Vulkan, DrawArguments>,
    ) {
        match source {
            DrawSource::IndirectBuffer {
                buffer,
                offset,
                number_of_draws,
            } => unsafe {
                device.cmd_draw_indirect(
                    cmd,
                    buffer.buffer().handle(),
                    u64::from(*offset),
                    *number_of_draws,
                    std::mem::size_of::<DrawArguments>() as u32,
                );
            },
            DrawSource::Emulated(records) => {
                for args in records {
                    unsafe {
                        device.cmd_draw(
                            cmd,
                            args.vertex_count_per_instance,
                            args.instance_count,
                            args.start_vertex_location,
                            args.start_instance_location,
                        );
                    }
                }
            }
        }
    }

    fn draw_indexed(
        &self,
        device: &ash::Device,
        cmd: vk::CommandBuffer,
        source: &DrawSource<Vulkan, DrawIndexedArguments>,
    ) {
        match source {
            DrawSource::IndirectBuffer {
                buffer,
                offset,
                number_of_draws,
            } => unsafe {
                device.cmd_draw_indexed_indirect(
                    cmd,
                    buffer.buffer().handle(),
                    u64::from(*offset),
                    *number_of_draws,
                    std::mem::size_of::<DrawIndexedArguments>() as u32,
                );
            },
            DrawSource::Emulated(records) => {
                for args in records {
                    unsafe {
                        device.cmd_draw_indexed(
                            cmd,
                            args.index_count_per_instance,
                            args.instance_count,
                            args.start_index_location,
                            args.base_vertex_location,
                            args.start_instance_location,
                        );
                    }
                }
            }
        }
    }

    fn set_render_target(&mut self, context: &VulkanContext, render_target: Option<&RenderTarget<Vulkan>>) {
        if let (Some(current), Some(new)) = (&self.render_target, render_target) {
            if current.same_as(new) {
                return;
            }
        }

        let transition = self.tracker.bind_target(false);
        self.finish_target(context, transition);
        self.render_target = None;

        let Some(render_target) = render_target else {
            return;
        };
        match render_target {
            RenderTarget::SwapChain(swap_chain) => {
                if let Err(e) = swap_chain.acquire_next_image() {
                    tracing::error!("Failed to acquire the next swap chain image: {e}");
                    return;
                }
                if !self
                    .swap_chains
                    .iter()
                    .any(|used| Arc::ptr_eq(used, swap_chain))
                {
                    self.swap_chains.push(Arc::clone(swap_chain));
                }
            }
            RenderTarget::Framebuffer(framebuffer) => {
                self.retained.push(framebuffer.clone());
            }
        }
        self.tracker.bind_target(true);
        self.render_target = Some(render_target.clone());
    }

    fn pass_target(&self) -> Option<PassTarget> {
        match self.render_target.as_ref()? {
            RenderTarget::SwapChain(swap_chain) => {
                let (render_pass, framebuffer, extent) = swap_chain.current_target()?;
                Some(PassTarget {
                    render_pass,
                    framebuffer,
                    extent,
                    color_attachments: 1,
                    depth_stencil: swap_chain.has_depth_stencil(),
                })
            }
            RenderTarget::Framebuffer(framebuffer) => {
                let (width, height) = framebuffer.width_and_height();
                Some(PassTarget {
                    render_pass: framebuffer.vk_render_pass(),
                    framebuffer: framebuffer.handle(),
                    extent: vk::Extent2D { width, height },
                    color_attachments: framebuffer.number_of_color_attachments(),
                    depth_stencil: framebuffer.has_depth_stencil(),
                })
            }
        }
    }

    fn begin_render_pass(&self, context: &VulkanContext) -> bool {
        let Some(target) = self.pass_target() else {
            tracing::error!("Render target has no Vulkan framebuffer to render into");
            return false;
        };
        let clear_values = self
            .tracker
            .clear_values()
            .to_vk(target.color_attachments, target.depth_stencil);
        let begin_info = vk::RenderPassBeginInfo::default()
            .render_pass(target.render_pass)
            .framebuffer(target.framebuffer)
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: target.extent,
            })
            .clear_values(&clear_values);
        unsafe {
            context.device().cmd_begin_render_pass(
                context.command_buffer(),
                &begin_info,
                vk::SubpassContents::INLINE,
            );
        }
        true
    }

    fn end_render_pass(&self, context: &VulkanContext) {
        unsafe { context.device().cmd_end_render_pass(context.command_buffer()) };
        if let Some(RenderTarget::Framebuffer(framebuffer)) = &self.render_target {
            framebuffer.mark_render_pass_finished();
        }
    }

    /// Open the render pass of the current target if needed.
    fn ensure_render_pass_open(&mut self, context: &VulkanContext) -> bool {
        match self.tracker.open_for_draw() {
            None => {
                tracing::error!("No graphics render target set, cannot draw");
                false
            }
            Some(false) => true,
            Some(true) => {
                if self.begin_render_pass(context) {
                    true
                } else {
                    // Nothing was begun, leave the tracker without a target
                    self.tracker.bind_target(false);
                    self.render_target = None;
                    false
                }
            }
        }
    }

    /// Record whatever the target being left still needs.
    fn finish_target(&self, context: &VulkanContext, transition: PassTransition) {
        match transition {
            PassTransition::None => {}
            PassTransition::End => self.end_render_pass(context),
            PassTransition::BeginAndEnd => {
                if self.begin_render_pass(context) {
                    self.end_render_pass(context);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::count_errors;

    #[test]
    fn viewport_is_flipped() {
        let viewport = Viewport {
            top_left_x: 10.0,
            top_left_y: 20.0,
            width: 640.0,
            height: 480.0,
            min_depth: 0.0,
            max_depth: 1.0,
        };
        let flipped = flip_viewport(&viewport);
        assert_eq!(flipped.x, 10.0);
        assert_eq!(flipped.y, 500.0);
        assert_eq!(flipped.width, 640.0);
        assert_eq!(flipped.height, -480.0);
    }

    #[test]
    fn scissor_uses_exclusive_corner() {
        let rect = scissor_rect(&ScissorRectangle {
            top_left_x: 8,
            top_left_y: 16,
            bottom_right_x: 108,
            bottom_right_y: 66,
        });
        assert_eq!((rect.offset.x, rect.offset.y), (8, 16));
        assert_eq!((rect.extent.width, rect.extent.height), (100, 50));
    }

    #[test]
    fn render_pass_opens_lazily_on_first_draw() {
        let mut tracker = RenderPassTracker::default();
        assert_eq!(tracker.open_for_draw(), None);

        assert_eq!(tracker.bind_target(true), PassTransition::None);
        assert!(!tracker.is_open());
        assert_eq!(tracker.open_for_draw(), Some(true));
        assert_eq!(tracker.open_for_draw(), Some(false));
        assert!(tracker.is_open());
    }

    #[test]
    fn switching_target_closes_or_flushes_the_pass() {
        let mut tracker = RenderPassTracker::default();
        tracker.bind_target(true);
        tracker.open_for_draw();
        assert_eq!(tracker.bind_target(true), PassTransition::End);

        // Never drawn into: begin and end so the clear still lands
        assert_eq!(tracker.bind_target(false), PassTransition::BeginAndEnd);
        assert_eq!(tracker.end_scene(), PassTransition::None);
    }

    #[test]
    fn end_scene_closes_open_pass() {
        let mut tracker = RenderPassTracker::default();
        tracker.bind_target(true);
        tracker.open_for_draw();
        assert_eq!(tracker.end_scene(), PassTransition::End);
        assert!(!tracker.has_target());
    }

    #[test]
    fn clear_outside_pass_updates_selected_values() {
        let mut tracker = RenderPassTracker::default();
        tracker.bind_target(true);
        assert!(tracker.clear(ClearFlags::COLOR, [0.2, 0.4, 0.6, 1.0], 0.5, 7));

        let values = tracker.clear_values();
        assert_eq!(values.color, [0.2, 0.4, 0.6, 1.0]);
        assert_eq!(values.depth, ClearValues::default().depth);
        assert_eq!(values.stencil, 0);

        assert!(tracker.clear(ClearFlags::DEPTH | ClearFlags::STENCIL, [0.0; 4], 0.25, 3));
        let values = tracker.clear_values();
        assert_eq!(values.color, [0.2, 0.4, 0.6, 1.0]);
        assert_eq!((values.depth, values.stencil), (0.25, 3));
    }

    #[test]
    fn clear_inside_open_pass_is_rejected() {
        let mut tracker = RenderPassTracker::default();
        tracker.bind_target(true);
        tracker.clear(ClearFlags::COLOR, [0.1, 0.1, 0.1, 1.0], 1.0, 0);
        tracker.open_for_draw();
        let before = tracker.clear_values();

        let (accepted, errors) =
            count_errors(|| tracker.clear(ClearFlags::COLOR, [1.0, 0.0, 0.0, 1.0], 1.0, 0));

        assert!(!accepted);
        assert_eq!(errors, 1);
        assert_eq!(tracker.clear_values(), before);

        // Still the cached values on the next frame
        tracker.end_scene();
        tracker.bind_target(true);
        assert_eq!(tracker.clear_values().color, [0.1, 0.1, 0.1, 1.0]);
    }

    #[test]
    fn resource_group_binds_to_matching_parameter() {
        let (set, errors) = count_errors(|| resource_group_set_index(2, Some(1), 2, true));
        assert_eq!(set, Some(1));
        assert_eq!(errors, 0);

        // Sampler-only parameters have no set, which is not an error
        let (set, errors) = count_errors(|| resource_group_set_index(0, None, 0, true));
        assert_eq!(set, None);
        assert_eq!(errors, 0);
    }

    #[test]
    fn mismatched_resource_group_is_reported() {
        let (set, errors) = count_errors(|| resource_group_set_index(1, Some(1), 0, true));
        assert_eq!(set, None);
        assert_eq!(errors, 1);

        let (set, errors) = count_errors(|| resource_group_set_index(0, Some(0), 0, false));
        assert_eq!(set, None);
        assert_eq!(errors, 1);
    }

    #[test]
    fn clear_values_cover_every_attachment() {
        let values = ClearValues {
            color: [0.5, 0.25, 0.125, 1.0],
            depth: 0.75,
            stencil: 9,
        }
        .to_vk(3, true);
        assert_eq!(values.len(), 4);
        unsafe {
            assert_eq!(values[2].color.float32, [0.5, 0.25, 0.125, 1.0]);
            assert_eq!(values[3].depth_stencil.depth, 0.75);
            assert_eq!(values[3].depth_stencil.stencil, 9);
        }
        assert_eq!(ClearValues::default().to_vk(2, false).len(), 2);
    }
}
