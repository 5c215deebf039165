//! Texture descriptions and mipmap math.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::format::TextureFormat;

bitflags! {
    /// Texture creation flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct TextureFlags: u32 {
        /// Supplied data contains a complete mipmap chain
        const DATA_CONTAINS_MIPMAPS = 1 << 0;
        /// Allocate a complete mipmap chain and generate it from level 0
        const GENERATE_MIPMAPS = 1 << 1;
        /// Texture can be sampled in shaders
        const SHADER_RESOURCE = 1 << 2;
        /// Texture can be used as a render target
        const RENDER_TARGET = 1 << 3;
        /// Texture can be used for unordered access
        const UNORDERED_ACCESS = 1 << 4;
    }
}

/// Dimensionality of a texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureKind {
    Texture1D,
    Texture2D,
    Texture2DArray,
    Texture3D,
    TextureCube,
}

/// Description of a texture to create.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextureDesc {
    pub kind: TextureKind,
    pub format: TextureFormat,
    pub width: u32,
    pub height: u32,
    /// Depth in texels, only meaningful for 3D textures
    pub depth: u32,
    /// Number of array slices, only meaningful for 2D array textures
    pub array_layers: u32,
    pub flags: TextureFlags,
}

impl TextureDesc {
    /// Describe a 1D texture.
    pub const fn new_1d(width: u32, format: TextureFormat, flags: TextureFlags) -> Self {
        Self {
            kind: TextureKind::Texture1D,
            format,
            width,
            height: 1,
            depth: 1,
            array_layers: 1,
            flags,
        }
    }

    /// Describe a 2D texture.
    pub const fn new_2d(width: u32, height: u32, format: TextureFormat, flags: TextureFlags) -> Self {
        Self {
            kind: TextureKind::Texture2D,
            format,
            width,
            height,
            depth: 1,
            array_layers: 1,
            flags,
        }
    }

    /// Describe a 2D array texture.
    pub const fn new_2d_array(
        width: u32,
        height: u32,
        array_layers: u32,
        format: TextureFormat,
        flags: TextureFlags,
    ) -> Self {
        Self {
            kind: TextureKind::Texture2DArray,
            format,
            width,
            height,
            depth: 1,
            array_layers,
            flags,
        }
    }

    /// Describe a 3D texture.
    pub const fn new_3d(
        width: u32,
        height: u32,
        depth: u32,
        format: TextureFormat,
        flags: TextureFlags,
    ) -> Self {
        Self {
            kind: TextureKind::Texture3D,
            format,
            width,
            height,
            depth,
            array_layers: 1,
            flags,
        }
    }

    /// Describe a cube texture (six square faces).
    pub const fn new_cube(size: u32, format: TextureFormat, flags: TextureFlags) -> Self {
        Self {
            kind: TextureKind::TextureCube,
            format,
            width: size,
            height: size,
            depth: 1,
            array_layers: 6,
            flags,
        }
    }

    /// Check that all used dimensions are non-zero.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 || self.depth == 0 || self.layer_count() == 0 {
            return Err(Error::InvalidExtent(format!(
                "{:?} {}x{}x{} with {} layers",
                self.kind,
                self.width,
                self.height,
                self.depth,
                self.layer_count()
            )));
        }
        Ok(())
    }

    /// Number of array layers, six for cube textures.
    pub const fn layer_count(&self) -> u32 {
        match self.kind {
            TextureKind::Texture2DArray => self.array_layers,
            TextureKind::TextureCube => 6,
            _ => 1,
        }
    }

    /// Whether a full mipmap chain is allocated.
    pub fn has_mipmap_chain(&self) -> bool {
        self.flags
            .intersects(TextureFlags::DATA_CONTAINS_MIPMAPS | TextureFlags::GENERATE_MIPMAPS)
    }

    /// Number of mipmap levels allocated for this texture.
    pub fn mip_levels(&self) -> u32 {
        if self.has_mipmap_chain() {
            number_of_mipmaps(self.width, self.height, self.depth)
        } else {
            1
        }
    }

    /// Number of mipmap levels the caller supplies data for.
    ///
    /// `GENERATE_MIPMAPS` alone still expects data for level 0 only.
    pub fn data_mip_levels(&self) -> u32 {
        if self.flags.contains(TextureFlags::DATA_CONTAINS_MIPMAPS) {
            self.mip_levels()
        } else {
            1
        }
    }

    /// Extent of a mipmap level, each dimension halved per level and floored at one.
    pub const fn mip_extent(&self, level: u32) -> (u32, u32, u32) {
        (
            mip_dimension(self.width, level),
            mip_dimension(self.height, level),
            mip_dimension(self.depth, level),
        )
    }

    /// Byte size of a single mipmap level across all layers.
    pub const fn mip_level_size(&self, level: u32) -> u64 {
        let (width, height, depth) = self.mip_extent(level);
        self.format.bytes_per_slice(width, height) * depth as u64 * self.layer_count() as u64
    }

    /// Total byte size of the supplied data: every data level, all layers.
    pub fn data_size(&self) -> u64 {
        (0..self.data_mip_levels())
            .map(|level| self.mip_level_size(level))
            .sum()
    }
}

/// Number of levels in a complete mipmap chain.
pub const fn number_of_mipmaps(width: u32, height: u32, depth: u32) -> u32 {
    let mut largest = width;
    if height > largest {
        largest = height;
    }
    if depth > largest {
        largest = depth;
    }
    if largest == 0 {
        return 1;
    }
    32 - largest.leading_zeros()
}

/// Size of one dimension at the given mipmap level.
pub const fn mip_dimension(size: u32, level: u32) -> u32 {
    let reduced = if level >= 32 { 0 } else { size >> level };
    if reduced == 0 {
        1
    } else {
        reduced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mipmap_count() {
        assert_eq!(number_of_mipmaps(1, 1, 1), 1);
        assert_eq!(number_of_mipmaps(256, 256, 1), 9);
        assert_eq!(number_of_mipmaps(300, 17, 1), 9);
        assert_eq!(number_of_mipmaps(4, 4, 64), 7);
    }

    #[test]
    fn single_level_without_flags() {
        let desc = TextureDesc::new_2d(64, 64, TextureFormat::R8G8B8A8Unorm, TextureFlags::empty());
        assert_eq!(desc.mip_levels(), 1);
        assert_eq!(desc.data_size(), 64 * 64 * 4);
    }

    #[test]
    fn data_size_sums_levels_and_layers() {
        let desc = TextureDesc::new_2d_array(
            4,
            2,
            3,
            TextureFormat::R8Unorm,
            TextureFlags::DATA_CONTAINS_MIPMAPS,
        );
        // Levels: 4x2, 2x1, 1x1
        assert_eq!(desc.mip_levels(), 3);
        assert_eq!(desc.data_size(), (8 + 2 + 1) * 3);
    }

    #[test]
    fn generate_flag_allocates_chain_but_expects_one_level() {
        let desc = TextureDesc::new_2d(8, 8, TextureFormat::R8Unorm, TextureFlags::GENERATE_MIPMAPS);
        assert_eq!(desc.mip_levels(), 4);
        assert_eq!(desc.data_mip_levels(), 1);
        assert_eq!(desc.data_size(), 64);
    }

    #[test]
    fn volume_halves_depth() {
        let desc = TextureDesc::new_3d(4, 4, 4, TextureFormat::R8Unorm, TextureFlags::DATA_CONTAINS_MIPMAPS);
        assert_eq!(desc.mip_extent(1), (2, 2, 2));
        assert_eq!(desc.mip_extent(5), (1, 1, 1));
        assert_eq!(desc.data_size(), 64 + 8 + 1);
    }

    #[test]
    fn cube_has_six_layers() {
        let desc = TextureDesc::new_cube(2, TextureFormat::R8G8B8A8Unorm, TextureFlags::empty());
        assert_eq!(desc.layer_count(), 6);
        assert_eq!(desc.data_size(), 2 * 2 * 4 * 6);
    }

    #[test]
    fn data_size_beyond_four_gibibytes() {
        let desc = TextureDesc::new_2d(
            16384,
            16384,
            TextureFormat::R32G32B32A32Float,
            TextureFlags::empty(),
        );
        assert_eq!(desc.data_size(), 4_294_967_296);

        let array = TextureDesc::new_2d_array(
            16384,
            16384,
            4,
            TextureFormat::R32G32B32A32Float,
            TextureFlags::empty(),
        );
        assert_eq!(array.data_size(), 4 * 4_294_967_296);
    }

    #[test]
    fn zero_extent_is_rejected() {
        let desc = TextureDesc::new_2d(0, 4, TextureFormat::R8Unorm, TextureFlags::empty());
        assert!(desc.validate().is_err());
    }
}
