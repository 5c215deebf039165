//! Graphics pipeline states.

use std::sync::Arc;

use ash::vk;
use prism_core::{
    DepthStencilOpDesc, DepthStencilState, PipelineStateDesc, PrimitiveTopology, RasterizerState,
    RenderTargetBlendDesc, VertexAttributes,
};

use crate::context::VulkanContext;
use crate::error::{Result, VulkanError};
use crate::program::Program;
use crate::render_pass::RenderPass;
use crate::root_signature::RootSignature;
use crate::Vulkan;

/// Vertex buffer bindings, one per input slot, and attribute descriptions
/// with the attribute index as shader location.
pub fn vertex_input_descriptions(
    vertex_attributes: &VertexAttributes,
) -> (
    Vec<vk::VertexInputBindingDescription>,
    Vec<vk::VertexInputAttributeDescription>,
) {
    let bindings = (0..vertex_attributes.slot_count())
        .filter_map(|slot| {
            let first = vertex_attributes
                .attributes
                .iter()
                .find(|attribute| attribute.input_slot == slot)?;
            let input_rate = if first.instances_per_element > 0 {
                vk::VertexInputRate::INSTANCE
            } else {
                vk::VertexInputRate::VERTEX
            };
            Some(
                vk::VertexInputBindingDescription::default()
                    .binding(slot)
                    .stride(first.stride_in_bytes)
                    .input_rate(input_rate),
            )
        })
        .collect();

    let attributes = vertex_attributes
        .attributes
        .iter()
        .enumerate()
        .map(|(location, attribute)| {
            vk::VertexInputAttributeDescription::default()
                .location(location as u32)
                .binding(attribute.input_slot)
                .format(crate::mapping::vertex_attribute_format(attribute.format))
                .offset(attribute.aligned_byte_offset)
        })
        .collect();

    (bindings, attributes)
}

pub fn rasterization_state(
    rasterizer: &RasterizerState,
) -> vk::PipelineRasterizationStateCreateInfo<'static> {
    let front_face = if rasterizer.front_counter_clockwise {
        vk::FrontFace::COUNTER_CLOCKWISE
    } else {
        vk::FrontFace::CLOCKWISE
    };
    let depth_bias_enable =
        rasterizer.depth_bias != 0 || rasterizer.slope_scaled_depth_bias != 0.0;
    vk::PipelineRasterizationStateCreateInfo::default()
        .depth_clamp_enable(!rasterizer.depth_clip_enable)
        .rasterizer_discard_enable(false)
        .polygon_mode(crate::mapping::polygon_mode(rasterizer.fill_mode))
        .cull_mode(crate::mapping::cull_mode(rasterizer.cull_mode))
        .front_face(front_face)
        .depth_bias_enable(depth_bias_enable)
        .depth_bias_constant_factor(rasterizer.depth_bias as f32)
        .depth_bias_clamp(rasterizer.depth_bias_clamp)
        .depth_bias_slope_factor(rasterizer.slope_scaled_depth_bias)
        .line_width(1.0)
}

fn stencil_op_state(
    face: &DepthStencilOpDesc,
    depth_stencil: &DepthStencilState,
) -> vk::StencilOpState {
    use crate::mapping::{compare_op, stencil_op};
    vk::StencilOpState {
        fail_op: stencil_op(face.stencil_fail_op),
        pass_op: stencil_op(face.stencil_pass_op),
        depth_fail_op: stencil_op(face.stencil_depth_fail_op),
        compare_op: compare_op(face.stencil_func),
        compare_mask: u32::from(depth_stencil.stencil_read_mask),
        write_mask: u32::from(depth_stencil.stencil_write_mask),
        reference: u32::from(depth_stencil.stencil_reference),
    }
}

pub fn depth_stencil_state(
    depth_stencil: &DepthStencilState,
) -> vk::PipelineDepthStencilStateCreateInfo<'static> {
    vk::PipelineDepthStencilStateCreateInfo::default()
        .depth_test_enable(depth_stencil.depth_enable)
        .depth_write_enable(depth_stencil.depth_write_enable)
        .depth_compare_op(crate::mapping::compare_op(depth_stencil.depth_func))
        .depth_bounds_test_enable(false)
        .stencil_test_enable(depth_stencil.stencil_enable)
        .front(stencil_op_state(&depth_stencil.front_face, depth_stencil))
        .back(stencil_op_state(&depth_stencil.back_face, depth_stencil))
        .min_depth_bounds(0.0)
        .max_depth_bounds(1.0)
}

pub fn color_blend_attachment(blend: &RenderTargetBlendDesc) -> vk::PipelineColorBlendAttachmentState {
    use crate::mapping::{blend_factor, blend_op};
    vk::PipelineColorBlendAttachmentState::default()
        .blend_enable(blend.blend_enable)
        .src_color_blend_factor(blend_factor(blend.src_blend))
        .dst_color_blend_factor(blend_factor(blend.dest_blend))
        .color_blend_op(blend_op(blend.blend_op))
        .src_alpha_blend_factor(blend_factor(blend.src_blend_alpha))
        .dst_alpha_blend_factor(blend_factor(blend.dest_blend_alpha))
        .alpha_blend_op(blend_op(blend.blend_op_alpha))
        .color_write_mask(vk::ColorComponentFlags::from_raw(u32::from(blend.write_mask & 0xF)))
}

/// Compiled graphics pipeline plus everything it was built from.
pub struct PipelineState {
    context: Arc<VulkanContext>,
    root_signature: Arc<RootSignature>,
    // Shader modules must outlive the pipeline on some drivers
    _program: Arc<Program>,
    render_pass: Arc<RenderPass>,
    pipeline: vk::Pipeline,
}

impl PipelineState {
    pub fn new(context: &Arc<VulkanContext>, desc: &PipelineStateDesc<Vulkan>) -> Result<Self> {
        let render_pass = &desc.render_pass;
        let stages = desc.program.stage_infos();

        let (bindings, attributes) = vertex_input_descriptions(&desc.vertex_attributes);
        let vertex_input = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&bindings)
            .vertex_attribute_descriptions(&attributes);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(crate::mapping::primitive_topology(desc.primitive_topology))
            .primitive_restart_enable(false);

        let patch_control_points = match desc.primitive_topology {
            PrimitiveTopology::PatchList(points) => u32::from(points),
            _ => 0,
        };
        if patch_control_points == 0 && desc.program.has_tessellation() {
            return Err(VulkanError::PipelineCreation(
                "tessellation shaders require a patch list topology".to_string(),
            ));
        }
        let tessellation = vk::PipelineTessellationStateCreateInfo::default()
            .patch_control_points(patch_control_points);

        // Viewport and scissor are set while recording
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let rasterization = rasterization_state(&desc.rasterizer_state);
        let multisampling = vk::PipelineMultisampleStateCreateInfo::default()
            .rasterization_samples(render_pass.sample_count())
            .sample_shading_enable(false)
            .alpha_to_coverage_enable(desc.blend_state.alpha_to_coverage_enable);
        let depth_stencil = depth_stencil_state(&desc.depth_stencil_state);

        let color_blend_attachments: Vec<_> = (0..render_pass.number_of_color_attachments())
            .map(|index| color_blend_attachment(desc.blend_state.render_target(index)))
            .collect();
        let color_blending = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state =
            vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

        let mut pipeline_info = vk::GraphicsPipelineCreateInfo::default()
            .stages(&stages)
            .vertex_input_state(&vertex_input)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization)
            .multisample_state(&multisampling)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blending)
            .dynamic_state(&dynamic_state)
            .layout(desc.root_signature.pipeline_layout())
            .render_pass(render_pass.vk_render_pass())
            .subpass(0);
        if patch_control_points > 0 {
            pipeline_info = pipeline_info.tessellation_state(&tessellation);
        }

        let pipelines = unsafe {
            context.device().create_graphics_pipelines(
                vk::PipelineCache::null(),
                std::slice::from_ref(&pipeline_info),
                None,
            )
        }
        .map_err(|(_pipelines, e)| VulkanError::PipelineCreation(e.to_string()))?;
        let pipeline = pipelines
            .into_iter()
            .next()
            .ok_or_else(|| VulkanError::PipelineCreation("no pipeline returned".to_string()))?;

        Ok(Self {
            context: Arc::clone(context),
            root_signature: Arc::clone(&desc.root_signature),
            _program: Arc::clone(&desc.program),
            render_pass: Arc::clone(render_pass),
            pipeline,
        })
    }

    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    pub fn root_signature(&self) -> &Arc<RootSignature> {
        &self.root_signature
    }

    pub fn render_pass(&self) -> &Arc<RenderPass> {
        &self.render_pass
    }
}

impl Drop for PipelineState {
    fn drop(&mut self) {
        unsafe { self.context.device().destroy_pipeline(self.pipeline, None) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prism_core::{
        Blend, BlendOp, ComparisonFunc, CullMode, FillMode, StencilOp, VertexAttribute,
        VertexAttributeFormat,
    };

    fn attribute(name: &str, slot: u32, offset: u32, stride: u32, instanced: bool) -> VertexAttribute {
        VertexAttribute {
            format: VertexAttributeFormat::Float3,
            name: name.to_string(),
            input_slot: slot,
            aligned_byte_offset: offset,
            stride_in_bytes: stride,
            instances_per_element: u32::from(instanced),
        }
    }

    #[test]
    fn one_binding_per_slot_and_location_per_attribute() {
        let layout = VertexAttributes::new(vec![
            attribute("Position", 0, 0, 24, false),
            attribute("Normal", 0, 12, 24, false),
            attribute("InstanceOffset", 1, 0, 12, true),
        ]);
        let (bindings, attributes) = vertex_input_descriptions(&layout);

        assert_eq!(bindings.len(), 2);
        assert_eq!(bindings[0].stride, 24);
        assert_eq!(bindings[0].input_rate, vk::VertexInputRate::VERTEX);
        assert_eq!(bindings[1].stride, 12);
        assert_eq!(bindings[1].input_rate, vk::VertexInputRate::INSTANCE);

        let locations: Vec<_> = attributes.iter().map(|a| (a.location, a.binding, a.offset)).collect();
        assert_eq!(locations, vec![(0, 0, 0), (1, 0, 12), (2, 1, 0)]);
    }

    #[test]
    fn disabled_depth_clip_clamps_depth() {
        let state = RasterizerState {
            fill_mode: FillMode::Wireframe,
            cull_mode: CullMode::None,
            depth_clip_enable: false,
            ..RasterizerState::default()
        };
        let info = rasterization_state(&state);
        assert_eq!(info.depth_clamp_enable, vk::TRUE);
        assert_eq!(info.polygon_mode, vk::PolygonMode::LINE);
        assert_eq!(info.cull_mode, vk::CullModeFlags::NONE);
        assert_eq!(info.depth_bias_enable, vk::FALSE);
    }

    #[test]
    fn default_stencil_faces_pass_everything() {
        let state = DepthStencilState {
            stencil_enable: true,
            ..DepthStencilState::default()
        };
        let info = depth_stencil_state(&state);
        assert_eq!(info.stencil_test_enable, vk::TRUE);
        for face in [info.front, info.back] {
            assert_eq!(face.compare_op, vk::CompareOp::ALWAYS);
            assert_eq!(face.fail_op, vk::StencilOp::KEEP);
            assert_eq!(face.pass_op, vk::StencilOp::KEEP);
            assert_eq!(face.depth_fail_op, vk::StencilOp::KEEP);
            assert_eq!(face.compare_mask, 0xff);
            assert_eq!(face.write_mask, 0xff);
        }
    }

    #[test]
    fn stencil_faces_translate_independently() {
        let state = DepthStencilState {
            stencil_enable: true,
            stencil_read_mask: 0x0f,
            stencil_write_mask: 0xf0,
            stencil_reference: 3,
            front_face: DepthStencilOpDesc {
                stencil_pass_op: StencilOp::Replace,
                stencil_func: ComparisonFunc::Equal,
                ..DepthStencilOpDesc::default()
            },
            back_face: DepthStencilOpDesc {
                stencil_depth_fail_op: StencilOp::DecrementWrap,
                stencil_func: ComparisonFunc::NotEqual,
                ..DepthStencilOpDesc::default()
            },
            ..DepthStencilState::default()
        };
        let info = depth_stencil_state(&state);
        assert_eq!(info.front.pass_op, vk::StencilOp::REPLACE);
        assert_eq!(info.front.compare_op, vk::CompareOp::EQUAL);
        assert_eq!(info.back.depth_fail_op, vk::StencilOp::DECREMENT_AND_WRAP);
        assert_eq!(info.back.compare_op, vk::CompareOp::NOT_EQUAL);
        assert_eq!((info.front.compare_mask, info.front.write_mask), (0x0f, 0xf0));
        assert_eq!(info.back.reference, 3);
    }

    #[test]
    fn alpha_blending_translates() {
        let blend = RenderTargetBlendDesc {
            blend_enable: true,
            src_blend: Blend::SrcAlpha,
            dest_blend: Blend::InvSrcAlpha,
            blend_op: BlendOp::Add,
            write_mask: 0b0111,
            ..RenderTargetBlendDesc::default()
        };
        let attachment = color_blend_attachment(&blend);
        assert_eq!(attachment.blend_enable, vk::TRUE);
        assert_eq!(attachment.src_color_blend_factor, vk::BlendFactor::SRC_ALPHA);
        assert_eq!(
            attachment.dst_color_blend_factor,
            vk::BlendFactor::ONE_MINUS_SRC_ALPHA
        );
        assert_eq!(
            attachment.color_write_mask,
            vk::ColorComponentFlags::R | vk::ColorComponentFlags::G | vk::ColorComponentFlags::B
        );
    }
}
