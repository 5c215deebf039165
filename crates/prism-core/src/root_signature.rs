//! Root signature (binding model) descriptions.
//!
//! A root signature groups shader-visible resources into tables. Each
//! descriptor table parameter becomes one bindable group of resources; a
//! resource group created against the root signature fills one table.

use serde::{Deserialize, Serialize};

use crate::state::SamplerStateDesc;

/// Kind of resource a descriptor range binds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DescriptorRangeType {
    /// Shader resource view, e.g. a sampled texture
    Srv,
    /// Unordered access view, e.g. a texture buffer
    Uav,
    /// Uniform buffer view
    Ubv,
    /// Sampler state
    Sampler,
}

/// Shader stages that can see a root parameter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShaderVisibility {
    #[default]
    All,
    Vertex,
    TessellationControl,
    TessellationEvaluation,
    Geometry,
    Fragment,
}

/// Contiguous range of descriptors of one type inside a table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptorRange {
    pub range_type: DescriptorRangeType,
    pub number_of_descriptors: u32,
    pub base_shader_register: u32,
    /// Name of the first resource as declared in the shader
    pub base_shader_register_name: String,
}

impl DescriptorRange {
    /// Range of a single descriptor.
    pub fn new(
        range_type: DescriptorRangeType,
        base_shader_register: u32,
        base_shader_register_name: impl Into<String>,
    ) -> Self {
        Self {
            range_type,
            number_of_descriptors: 1,
            base_shader_register,
            base_shader_register_name: base_shader_register_name.into(),
        }
    }
}

/// Sampler baked into the root signature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StaticSampler {
    pub sampler: SamplerStateDesc,
    pub shader_register: u32,
    pub shader_visibility: ShaderVisibility,
}

/// One entry of a root signature.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum RootParameter {
    /// Table of descriptor ranges bound together as one resource group
    DescriptorTable {
        ranges: Vec<DescriptorRange>,
        shader_visibility: ShaderVisibility,
    },
    /// Sampler described inline
    StaticSampler(StaticSampler),
}

impl RootParameter {
    /// Create a descriptor table parameter.
    pub const fn table(ranges: Vec<DescriptorRange>, shader_visibility: ShaderVisibility) -> Self {
        Self::DescriptorTable {
            ranges,
            shader_visibility,
        }
    }

    /// Descriptor ranges of a table parameter, empty for other parameters.
    pub fn ranges(&self) -> &[DescriptorRange] {
        match self {
            Self::DescriptorTable { ranges, .. } => ranges,
            Self::StaticSampler(_) => &[],
        }
    }

    /// Whether this parameter is a descriptor table.
    pub const fn is_table(&self) -> bool {
        matches!(self, Self::DescriptorTable { .. })
    }
}

/// Complete root signature description.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RootSignatureDesc {
    pub parameters: Vec<RootParameter>,
}

impl RootSignatureDesc {
    /// Create a root signature description from its parameters.
    pub const fn new(parameters: Vec<RootParameter>) -> Self {
        Self { parameters }
    }

    /// Number of descriptor table parameters.
    pub fn descriptor_table_count(&self) -> usize {
        self.parameters.iter().filter(|parameter| parameter.is_table()).count()
    }

    /// Total number of descriptors of the given type across all parameters.
    pub fn descriptor_count(&self, range_type: DescriptorRangeType) -> u32 {
        self.parameters
            .iter()
            .flat_map(RootParameter::ranges)
            .filter(|range| range.range_type == range_type)
            .map(|range| range.number_of_descriptors)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_desc() -> RootSignatureDesc {
        RootSignatureDesc::new(vec![
            RootParameter::table(
                vec![
                    DescriptorRange::new(DescriptorRangeType::Ubv, 0, "PassUniforms"),
                    DescriptorRange::new(DescriptorRangeType::Srv, 0, "AlbedoMap"),
                    DescriptorRange::new(DescriptorRangeType::Sampler, 0, "AlbedoSampler"),
                ],
                ShaderVisibility::All,
            ),
            RootParameter::table(
                vec![DescriptorRange {
                    number_of_descriptors: 4,
                    ..DescriptorRange::new(DescriptorRangeType::Srv, 1, "ShadowMaps")
                }],
                ShaderVisibility::Fragment,
            ),
            RootParameter::StaticSampler(StaticSampler {
                sampler: SamplerStateDesc::default(),
                shader_register: 0,
                shader_visibility: ShaderVisibility::Fragment,
            }),
        ])
    }

    #[test]
    fn counts_tables_only() {
        assert_eq!(sample_desc().descriptor_table_count(), 2);
    }

    #[test]
    fn descriptor_counts_aggregate_across_parameters() {
        let desc = sample_desc();
        assert_eq!(desc.descriptor_count(DescriptorRangeType::Srv), 5);
        assert_eq!(desc.descriptor_count(DescriptorRangeType::Ubv), 1);
        assert_eq!(desc.descriptor_count(DescriptorRangeType::Uav), 0);
    }
}
