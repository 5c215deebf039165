//! Recorded command stream.
//!
//! Commands are recorded into a [`CommandBuffer`] without touching any
//! graphics API and are later handed to a backend in one go. Every command
//! carries a dense [`CommandDispatchFunctionIndex`] that backends use to
//! select the handler; variable-length payloads (viewport arrays, emulated
//! draw arguments, uniform data) travel inside the command itself.

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;

use crate::backend::Backend;
use crate::buffer::{DrawArguments, DrawIndexedArguments};
use crate::render_target::{ScissorRectangle, Viewport};

bitflags! {
    /// Which parts of the current render target a clear affects.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
        const COLOR_DEPTH = Self::COLOR.bits() | Self::DEPTH.bits();
    }
}

/// Dense index selecting a command handler.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandDispatchFunctionIndex {
    ExecuteCommandBuffer = 0,
    SetGraphicsRootSignature,
    SetGraphicsPipelineState,
    SetGraphicsResourceGroup,
    SetGraphicsVertexArray,
    SetGraphicsViewports,
    SetGraphicsScissorRectangles,
    SetGraphicsRenderTarget,
    ClearGraphics,
    DrawGraphics,
    DrawIndexedGraphics,
    CopyUniformBufferData,
    SetDebugMarker,
    BeginDebugEvent,
    EndDebugEvent,
}

impl CommandDispatchFunctionIndex {
    /// Number of dispatch functions.
    pub const COUNT: usize = Self::EndDebugEvent as usize + 1;
}

/// Surface a scene renders into.
pub enum RenderTarget<B: Backend> {
    SwapChain(Arc<B::SwapChain>),
    Framebuffer(Arc<B::Framebuffer>),
}

impl<B: Backend> RenderTarget<B> {
    /// Whether both values refer to the same underlying object.
    pub fn same_as(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::SwapChain(a), Self::SwapChain(b)) => Arc::ptr_eq(a, b),
            (Self::Framebuffer(a), Self::Framebuffer(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<B: Backend> Clone for RenderTarget<B> {
    fn clone(&self) -> Self {
        match self {
            Self::SwapChain(swap_chain) => Self::SwapChain(Arc::clone(swap_chain)),
            Self::Framebuffer(framebuffer) => Self::Framebuffer(Arc::clone(framebuffer)),
        }
    }
}

impl<B: Backend> fmt::Debug for RenderTarget<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SwapChain(swap_chain) => write!(f, "SwapChain({:p})", Arc::as_ptr(swap_chain)),
            Self::Framebuffer(framebuffer) => {
                write!(f, "Framebuffer({:p})", Arc::as_ptr(framebuffer))
            }
        }
    }
}

/// Where the arguments of a draw come from.
pub enum DrawSource<B: Backend, A> {
    /// GPU-side argument records read at `offset` bytes into the buffer
    IndirectBuffer {
        buffer: Arc<B::IndirectBuffer>,
        offset: u32,
        number_of_draws: u32,
    },
    /// CPU-side argument records, issued as one direct draw per record
    Emulated(Vec<A>),
}

/// One recorded command.
pub enum Command<B: Backend> {
    ExecuteCommandBuffer(Arc<CommandBuffer<B>>),
    SetGraphicsRootSignature(Option<Arc<B::RootSignature>>),
    SetGraphicsPipelineState(Option<Arc<B::PipelineState>>),
    SetGraphicsResourceGroup {
        root_parameter_index: u32,
        resource_group: Option<Arc<B::ResourceGroup>>,
    },
    SetGraphicsVertexArray(Option<Arc<B::VertexArray>>),
    SetGraphicsViewports(Vec<Viewport>),
    SetGraphicsScissorRectangles(Vec<ScissorRectangle>),
    SetGraphicsRenderTarget(Option<RenderTarget<B>>),
    ClearGraphics {
        flags: ClearFlags,
        color: [f32; 4],
        z: f32,
        stencil: u32,
    },
    DrawGraphics(DrawSource<B, DrawArguments>),
    DrawIndexedGraphics(DrawSource<B, DrawIndexedArguments>),
    CopyUniformBufferData {
        uniform_buffer: Arc<B::UniformBuffer>,
        data: Vec<u8>,
    },
    SetDebugMarker(String),
    BeginDebugEvent(String),
    EndDebugEvent,
}

impl<B: Backend> Command<B> {
    /// Index of the handler that executes this command.
    pub const fn dispatch_index(&self) -> CommandDispatchFunctionIndex {
        use CommandDispatchFunctionIndex as Index;
        match self {
            Self::ExecuteCommandBuffer(_) => Index::ExecuteCommandBuffer,
            Self::SetGraphicsRootSignature(_) => Index::SetGraphicsRootSignature,
            Self::SetGraphicsPipelineState(_) => Index::SetGraphicsPipelineState,
            Self::SetGraphicsResourceGroup { .. } => Index::SetGraphicsResourceGroup,
            Self::SetGraphicsVertexArray(_) => Index::SetGraphicsVertexArray,
            Self::SetGraphicsViewports(_) => Index::SetGraphicsViewports,
            Self::SetGraphicsScissorRectangles(_) => Index::SetGraphicsScissorRectangles,
            Self::SetGraphicsRenderTarget(_) => Index::SetGraphicsRenderTarget,
            Self::ClearGraphics { .. } => Index::ClearGraphics,
            Self::DrawGraphics(_) => Index::DrawGraphics,
            Self::DrawIndexedGraphics(_) => Index::DrawIndexedGraphics,
            Self::CopyUniformBufferData { .. } => Index::CopyUniformBufferData,
            Self::SetDebugMarker(_) => Index::SetDebugMarker,
            Self::BeginDebugEvent(_) => Index::BeginDebugEvent,
            Self::EndDebugEvent => Index::EndDebugEvent,
        }
    }
}

/// Append-only list of recorded commands.
pub struct CommandBuffer<B: Backend> {
    commands: Vec<Command<B>>,
}

impl<B: Backend> Default for CommandBuffer<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: Backend> CommandBuffer<B> {
    /// Create an empty command buffer.
    pub const fn new() -> Self {
        Self {
            commands: Vec::new(),
        }
    }

    /// Append a command.
    pub fn push(&mut self, command: Command<B>) -> &mut Self {
        self.commands.push(command);
        self
    }

    /// Recorded commands in submission order.
    pub fn commands(&self) -> &[Command<B>] {
        &self.commands
    }

    /// Iterate over the recorded commands in submission order.
    pub fn iter(&self) -> std::slice::Iter<'_, Command<B>> {
        self.commands.iter()
    }

    /// Number of recorded commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drop all recorded commands, releasing the resources they reference.
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Record execution of another command buffer.
    pub fn execute_command_buffer(&mut self, command_buffer: Arc<Self>) -> &mut Self {
        self.push(Command::ExecuteCommandBuffer(command_buffer))
    }

    /// Record a root signature change.
    pub fn set_graphics_root_signature(
        &mut self,
        root_signature: Option<Arc<B::RootSignature>>,
    ) -> &mut Self {
        self.push(Command::SetGraphicsRootSignature(root_signature))
    }

    /// Record a pipeline state change.
    pub fn set_graphics_pipeline_state(
        &mut self,
        pipeline_state: Option<Arc<B::PipelineState>>,
    ) -> &mut Self {
        self.push(Command::SetGraphicsPipelineState(pipeline_state))
    }

    /// Record binding a resource group to a root parameter.
    pub fn set_graphics_resource_group(
        &mut self,
        root_parameter_index: u32,
        resource_group: Option<Arc<B::ResourceGroup>>,
    ) -> &mut Self {
        self.push(Command::SetGraphicsResourceGroup {
            root_parameter_index,
            resource_group,
        })
    }

    /// Record a vertex array change.
    pub fn set_graphics_vertex_array(
        &mut self,
        vertex_array: Option<Arc<B::VertexArray>>,
    ) -> &mut Self {
        self.push(Command::SetGraphicsVertexArray(vertex_array))
    }

    /// Record a viewport change.
    pub fn set_graphics_viewports(&mut self, viewports: &[Viewport]) -> &mut Self {
        self.push(Command::SetGraphicsViewports(viewports.to_vec()))
    }

    /// Record a scissor rectangle change.
    pub fn set_graphics_scissor_rectangles(&mut self, rectangles: &[ScissorRectangle]) -> &mut Self {
        self.push(Command::SetGraphicsScissorRectangles(rectangles.to_vec()))
    }

    /// Record viewport and scissor rectangle covering the given area.
    pub fn set_graphics_viewport_and_scissor(&mut self, width: u32, height: u32) -> &mut Self {
        self.set_graphics_viewports(&[Viewport::new(width as f32, height as f32)]);
        self.set_graphics_scissor_rectangles(&[ScissorRectangle {
            top_left_x: 0,
            top_left_y: 0,
            bottom_right_x: i32::try_from(width).unwrap_or(i32::MAX),
            bottom_right_y: i32::try_from(height).unwrap_or(i32::MAX),
        }])
    }

    /// Record a render target change.
    pub fn set_graphics_render_target(&mut self, render_target: Option<RenderTarget<B>>) -> &mut Self {
        self.push(Command::SetGraphicsRenderTarget(render_target))
    }

    /// Record a clear of the current render target.
    pub fn clear_graphics(&mut self, flags: ClearFlags, color: [f32; 4], z: f32, stencil: u32) -> &mut Self {
        self.push(Command::ClearGraphics {
            flags,
            color,
            z,
            stencil,
        })
    }

    /// Record indirect draws read from a GPU buffer.
    pub fn draw_graphics(
        &mut self,
        indirect_buffer: Arc<B::IndirectBuffer>,
        offset: u32,
        number_of_draws: u32,
    ) -> &mut Self {
        self.push(Command::DrawGraphics(DrawSource::IndirectBuffer {
            buffer: indirect_buffer,
            offset,
            number_of_draws,
        }))
    }

    /// Record draws whose arguments are supplied by the CPU.
    pub fn draw_graphics_emulated(&mut self, arguments: &[DrawArguments]) -> &mut Self {
        self.push(Command::DrawGraphics(DrawSource::Emulated(arguments.to_vec())))
    }

    /// Record indexed indirect draws read from a GPU buffer.
    pub fn draw_indexed_graphics(
        &mut self,
        indirect_buffer: Arc<B::IndirectBuffer>,
        offset: u32,
        number_of_draws: u32,
    ) -> &mut Self {
        self.push(Command::DrawIndexedGraphics(DrawSource::IndirectBuffer {
            buffer: indirect_buffer,
            offset,
            number_of_draws,
        }))
    }

    /// Record indexed draws whose arguments are supplied by the CPU.
    pub fn draw_indexed_graphics_emulated(&mut self, arguments: &[DrawIndexedArguments]) -> &mut Self {
        self.push(Command::DrawIndexedGraphics(DrawSource::Emulated(
            arguments.to_vec(),
        )))
    }

    /// Record an update of a uniform buffer's contents.
    pub fn copy_uniform_buffer_data(
        &mut self,
        uniform_buffer: Arc<B::UniformBuffer>,
        data: &[u8],
    ) -> &mut Self {
        self.push(Command::CopyUniformBufferData {
            uniform_buffer,
            data: data.to_vec(),
        })
    }

    /// Record a debug marker.
    pub fn set_debug_marker(&mut self, name: &str) -> &mut Self {
        self.push(Command::SetDebugMarker(name.to_string()))
    }

    /// Record the start of a named debug region.
    pub fn begin_debug_event(&mut self, name: &str) -> &mut Self {
        self.push(Command::BeginDebugEvent(name.to_string()))
    }

    /// Record the end of the innermost debug region.
    pub fn end_debug_event(&mut self) -> &mut Self {
        self.push(Command::EndDebugEvent)
    }
}

impl<'a, B: Backend> IntoIterator for &'a CommandBuffer<B> {
    type Item = &'a Command<B>;
    type IntoIter = std::slice::Iter<'a, Command<B>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::tests::NullBackend;

    #[test]
    fn records_in_order_with_dispatch_indices() {
        let mut commands = CommandBuffer::<NullBackend>::new();
        commands
            .begin_debug_event("Scene")
            .set_graphics_viewport_and_scissor(640, 480)
            .clear_graphics(ClearFlags::COLOR_DEPTH, [0.0, 0.0, 0.0, 1.0], 1.0, 0)
            .draw_graphics_emulated(&[DrawArguments::vertices(3)])
            .end_debug_event();

        let indices: Vec<_> = commands.iter().map(Command::dispatch_index).collect();
        assert_eq!(
            indices,
            [
                CommandDispatchFunctionIndex::BeginDebugEvent,
                CommandDispatchFunctionIndex::SetGraphicsViewports,
                CommandDispatchFunctionIndex::SetGraphicsScissorRectangles,
                CommandDispatchFunctionIndex::ClearGraphics,
                CommandDispatchFunctionIndex::DrawGraphics,
                CommandDispatchFunctionIndex::EndDebugEvent,
            ]
        );
    }

    #[test]
    fn dispatch_indices_are_dense() {
        assert_eq!(CommandDispatchFunctionIndex::ExecuteCommandBuffer as usize, 0);
        assert_eq!(CommandDispatchFunctionIndex::COUNT, 15);
    }

    #[test]
    fn viewport_and_scissor_cover_area() {
        let mut commands = CommandBuffer::<NullBackend>::new();
        commands.set_graphics_viewport_and_scissor(800, 600);
        match &commands.commands()[1] {
            Command::SetGraphicsScissorRectangles(rectangles) => {
                assert_eq!(rectangles[0].width(), 800);
                assert_eq!(rectangles[0].height(), 600);
            }
            _ => panic!("expected scissor rectangles"),
        }
    }

    #[test]
    fn nested_buffers_share_ownership() {
        let mut inner = CommandBuffer::<NullBackend>::new();
        inner.set_debug_marker("inner");
        let inner = Arc::new(inner);

        let mut outer = CommandBuffer::<NullBackend>::new();
        outer.execute_command_buffer(Arc::clone(&inner));
        assert_eq!(Arc::strong_count(&inner), 2);

        outer.clear();
        assert!(outer.is_empty());
        assert_eq!(Arc::strong_count(&inner), 1);
    }
}
