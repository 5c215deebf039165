//! Texture formats.

use serde::{Deserialize, Serialize};

/// Pixel format of a texture or render target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextureFormat {
    /// 8-bit single channel, normalized
    R8Unorm,
    /// 8-bit RGB, normalized
    R8G8B8Unorm,
    /// 8-bit RGBA, normalized
    R8G8B8A8Unorm,
    /// 8-bit RGBA, sRGB
    R8G8B8A8Srgb,
    /// 8-bit BGRA, normalized
    B8G8R8A8Unorm,
    /// Packed unsigned float, 11/11/10 bits
    R11G11B10Float,
    /// 16-bit RGBA float
    R16G16B16A16Float,
    /// 32-bit RGBA float
    R32G32B32A32Float,
    /// BC1 block compression (DXT1)
    Bc1,
    /// BC1 block compression, sRGB
    Bc1Srgb,
    /// BC2 block compression (DXT3)
    Bc2,
    /// BC3 block compression (DXT5)
    Bc3,
    /// BC4 single channel block compression
    Bc4,
    /// BC5 two channel block compression
    Bc5,
    /// 16-bit single channel, normalized
    R16Unorm,
    /// 32-bit single channel, unsigned integer
    R32Uint,
    /// 32-bit single channel float
    R32Float,
    /// 16-bit two channel, signed normalized
    R16G16Snorm,
    /// 16-bit two channel float
    R16G16Float,
    /// 32-bit depth
    D32Float,
    /// No format
    #[default]
    Unknown,
}

impl TextureFormat {
    /// Whether the format is block compressed (4x4 blocks).
    pub const fn is_compressed(self) -> bool {
        matches!(
            self,
            Self::Bc1 | Self::Bc1Srgb | Self::Bc2 | Self::Bc3 | Self::Bc4 | Self::Bc5
        )
    }

    /// Whether the format is a depth format.
    pub const fn is_depth(self) -> bool {
        matches!(self, Self::D32Float)
    }

    /// Bytes per texel, or bytes per 4x4 block for compressed formats.
    pub const fn bytes_per_element(self) -> u32 {
        match self {
            Self::R8Unorm => 1,
            Self::R8G8B8Unorm => 3,
            Self::R8G8B8A8Unorm | Self::R8G8B8A8Srgb | Self::B8G8R8A8Unorm => 4,
            Self::R11G11B10Float => 4,
            Self::R16G16B16A16Float => 8,
            Self::R32G32B32A32Float => 16,
            Self::Bc1 | Self::Bc1Srgb | Self::Bc4 => 8,
            Self::Bc2 | Self::Bc3 | Self::Bc5 => 16,
            Self::R16Unorm => 2,
            Self::R32Uint | Self::R32Float | Self::R16G16Snorm | Self::R16G16Float => 4,
            Self::D32Float => 4,
            Self::Unknown => 0,
        }
    }

    /// Number of bytes in one row of the given width.
    ///
    /// For compressed formats a row is a row of 4x4 blocks.
    pub const fn bytes_per_row(self, width: u32) -> u64 {
        let elements = if self.is_compressed() {
            width.div_ceil(4)
        } else {
            width
        };
        elements as u64 * self.bytes_per_element() as u64
    }

    /// Number of bytes in one 2D slice of the given size.
    pub const fn bytes_per_slice(self, width: u32, height: u32) -> u64 {
        let rows = if self.is_compressed() {
            height.div_ceil(4)
        } else {
            height
        };
        self.bytes_per_row(width) * rows as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncompressed_slice_size() {
        assert_eq!(TextureFormat::R8G8B8A8Unorm.bytes_per_slice(16, 8), 16 * 8 * 4);
        assert_eq!(TextureFormat::R16G16B16A16Float.bytes_per_row(3), 24);
    }

    #[test]
    fn compressed_sizes_round_up_to_blocks() {
        // 5x5 texels occupy 2x2 blocks
        assert_eq!(TextureFormat::Bc1.bytes_per_slice(5, 5), 4 * 8);
        assert_eq!(TextureFormat::Bc3.bytes_per_slice(1, 1), 16);
        assert!(TextureFormat::Bc5.is_compressed());
        assert!(!TextureFormat::R32Float.is_compressed());
    }

    #[test]
    fn large_slices_do_not_wrap() {
        assert_eq!(
            TextureFormat::R32G32B32A32Float.bytes_per_slice(16384, 16384),
            1 << 32
        );
        assert_eq!(TextureFormat::R32G32B32A32Float.bytes_per_row(u32::MAX), u64::from(u32::MAX) * 16);
    }

    #[test]
    fn depth_detection() {
        assert!(TextureFormat::D32Float.is_depth());
        assert!(!TextureFormat::B8G8R8A8Unorm.is_depth());
        assert_eq!(TextureFormat::Unknown.bytes_per_element(), 0);
    }
}
