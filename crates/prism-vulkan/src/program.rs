//! Shader programs built from SPIR-V blobs.

use std::io::Cursor;
use std::sync::Arc;

use ash::vk;
use prism_core::ProgramDesc;

use crate::context::VulkanContext;
use crate::error::{Result, VulkanError};

/// Entry point every shader stage must export.
pub const SHADER_ENTRY_POINT: &std::ffi::CStr = c"main";

/// Decode a SPIR-V byte blob into words.
pub fn spirv_words(bytes: &[u8]) -> Result<Vec<u32>> {
    ash::util::read_spv(&mut Cursor::new(bytes))
        .map_err(|e| VulkanError::ShaderModule(format!("invalid SPIR-V: {e}")))
}

/// Stage/blob pairs of a program in pipeline order.
fn stages(desc: &ProgramDesc) -> impl Iterator<Item = (vk::ShaderStageFlags, &[u8])> {
    [
        (vk::ShaderStageFlags::VERTEX, &desc.vertex),
        (
            vk::ShaderStageFlags::TESSELLATION_CONTROL,
            &desc.tessellation_control,
        ),
        (
            vk::ShaderStageFlags::TESSELLATION_EVALUATION,
            &desc.tessellation_evaluation,
        ),
        (vk::ShaderStageFlags::GEOMETRY, &desc.geometry),
        (vk::ShaderStageFlags::FRAGMENT, &desc.fragment),
    ]
    .into_iter()
    .filter_map(|(stage, blob)| blob.as_deref().map(|bytes| (stage, bytes)))
}

/// Shader modules of one graphics program.
pub struct Program {
    context: Arc<VulkanContext>,
    modules: Vec<(vk::ShaderStageFlags, vk::ShaderModule)>,
}

impl Program {
    pub fn new(context: &Arc<VulkanContext>, desc: &ProgramDesc) -> Result<Self> {
        if desc.vertex.is_none() {
            return Err(VulkanError::ShaderModule(
                "a program needs at least a vertex shader".to_string(),
            ));
        }

        let mut program = Self {
            context: Arc::clone(context),
            modules: Vec::new(),
        };
        for (stage, bytes) in stages(desc) {
            let code = spirv_words(bytes)?;
            let create_info = vk::ShaderModuleCreateInfo::default().code(&code);
            let module = unsafe { context.device().create_shader_module(&create_info, None) }
                .map_err(|e| VulkanError::ShaderModule(format!("{stage:?}: {e}")))?;
            program.modules.push((stage, module));
        }
        Ok(program)
    }

    /// Shader stage infos for pipeline creation.
    pub fn stage_infos(&self) -> Vec<vk::PipelineShaderStageCreateInfo<'static>> {
        self.modules
            .iter()
            .map(|&(stage, module)| {
                vk::PipelineShaderStageCreateInfo::default()
                    .stage(stage)
                    .module(module)
                    .name(SHADER_ENTRY_POINT)
            })
            .collect()
    }

    pub fn has_tessellation(&self) -> bool {
        self.modules
            .iter()
            .any(|(stage, _)| *stage == vk::ShaderStageFlags::TESSELLATION_CONTROL)
    }
}

impl Drop for Program {
    fn drop(&mut self) {
        let device = self.context.device();
        for &(_, module) in &self.modules {
            unsafe { device.destroy_shader_module(module, None) };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPIRV_MAGIC: u32 = 0x0723_0203;

    #[test]
    fn stages_are_in_pipeline_order() {
        let desc = ProgramDesc {
            vertex: Some(vec![1]),
            fragment: Some(vec![2]),
            geometry: Some(vec![3]),
            ..ProgramDesc::default()
        };
        let order: Vec<_> = stages(&desc).map(|(stage, _)| stage).collect();
        assert_eq!(
            order,
            vec![
                vk::ShaderStageFlags::VERTEX,
                vk::ShaderStageFlags::GEOMETRY,
                vk::ShaderStageFlags::FRAGMENT,
            ]
        );
    }

    #[test]
    fn spirv_blob_decodes_to_words() {
        let mut bytes = SPIRV_MAGIC.to_le_bytes().to_vec();
        bytes.extend_from_slice(&0x0001_0000u32.to_le_bytes());
        assert_eq!(spirv_words(&bytes).unwrap(), vec![SPIRV_MAGIC, 0x0001_0000]);
    }

    #[test]
    fn misaligned_blob_is_rejected() {
        assert!(matches!(
            spirv_words(&[0x03, 0x02, 0x23]),
            Err(VulkanError::ShaderModule(_))
        ));
    }
}
