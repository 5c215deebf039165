//! Buffer descriptions, vertex layouts and draw argument records.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Element type of an index buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndexBufferFormat {
    UnsignedShort,
    UnsignedInt,
}

impl IndexBufferFormat {
    /// Size of one index in bytes.
    pub const fn bytes_per_element(self) -> u32 {
        match self {
            Self::UnsignedShort => 2,
            Self::UnsignedInt => 4,
        }
    }
}

/// Format of a single vertex attribute.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexAttributeFormat {
    Float1,
    Float2,
    Float3,
    Float4,
    R8G8B8A8Unorm,
    R8G8B8A8Uint,
    Short2,
    Short4,
    Uint1,
}

impl VertexAttributeFormat {
    /// Size of the attribute in bytes.
    pub const fn size(self) -> u32 {
        match self {
            Self::Float1 | Self::R8G8B8A8Unorm | Self::R8G8B8A8Uint | Self::Short2 | Self::Uint1 => 4,
            Self::Float2 | Self::Short4 => 8,
            Self::Float3 => 12,
            Self::Float4 => 16,
        }
    }
}

/// One vertex attribute read from a vertex buffer slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexAttribute {
    pub format: VertexAttributeFormat,
    /// Attribute name as declared in the shader, used by backends that bind by name
    pub name: String,
    /// Vertex buffer slot the attribute is read from
    pub input_slot: u32,
    pub aligned_byte_offset: u32,
    /// Stride of the vertex buffer bound at `input_slot`
    pub stride_in_bytes: u32,
    /// Zero for per-vertex data, otherwise the number of instances per element
    pub instances_per_element: u32,
}

/// Vertex layout shared by pipeline states and vertex arrays.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VertexAttributes {
    pub attributes: Vec<VertexAttribute>,
}

impl VertexAttributes {
    /// Create a vertex layout from a list of attributes.
    pub const fn new(attributes: Vec<VertexAttribute>) -> Self {
        Self { attributes }
    }

    /// Number of vertex buffer slots referenced, i.e. highest slot plus one.
    pub fn slot_count(&self) -> u32 {
        self.attributes
            .iter()
            .map(|attribute| attribute.input_slot + 1)
            .max()
            .unwrap_or(0)
    }
}

/// Arguments of one non-indexed draw, laid out as the GPU consumes them.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawArguments {
    pub vertex_count_per_instance: u32,
    pub instance_count: u32,
    pub start_vertex_location: u32,
    pub start_instance_location: u32,
}

impl DrawArguments {
    /// Arguments for a single instance starting at vertex zero.
    pub const fn vertices(vertex_count: u32) -> Self {
        Self {
            vertex_count_per_instance: vertex_count,
            instance_count: 1,
            start_vertex_location: 0,
            start_instance_location: 0,
        }
    }
}

/// Arguments of one indexed draw, laid out as the GPU consumes them.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct DrawIndexedArguments {
    pub index_count_per_instance: u32,
    pub instance_count: u32,
    pub start_index_location: u32,
    pub base_vertex_location: i32,
    pub start_instance_location: u32,
}

impl DrawIndexedArguments {
    /// Arguments for a single instance starting at index zero.
    pub const fn indices(index_count: u32) -> Self {
        Self {
            index_count_per_instance: index_count,
            instance_count: 1,
            start_index_location: 0,
            base_vertex_location: 0,
            start_instance_location: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argument_records_match_gpu_layout() {
        assert_eq!(std::mem::size_of::<DrawArguments>(), 16);
        assert_eq!(std::mem::size_of::<DrawIndexedArguments>(), 20);
    }

    #[test]
    fn slot_count_uses_highest_slot() {
        let attribute = |slot| VertexAttribute {
            format: VertexAttributeFormat::Float3,
            name: "Position".to_string(),
            input_slot: slot,
            aligned_byte_offset: 0,
            stride_in_bytes: 12,
            instances_per_element: 0,
        };
        let layout = VertexAttributes::new(vec![attribute(0), attribute(2)]);
        assert_eq!(layout.slot_count(), 3);
        assert_eq!(VertexAttributes::default().slot_count(), 0);
    }
}
