//! Render pass descriptions, viewports and scissor rectangles.

use serde::{Deserialize, Serialize};

use crate::constants::MAX_COLOR_ATTACHMENTS;
use crate::error::{Error, Result};
use crate::format::TextureFormat;

/// Format-level description of a render pass.
///
/// Shared by swap chains, framebuffers and pipeline states. It owns no
/// images; backends derive their concrete render pass objects from it.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RenderPassDesc {
    color_formats: Vec<TextureFormat>,
    depth_stencil_format: Option<TextureFormat>,
    sample_count: u8,
}

impl RenderPassDesc {
    /// Create a render pass description.
    ///
    /// A depth-stencil format of [`TextureFormat::Unknown`] is treated as "no depth".
    pub fn new(
        color_formats: &[TextureFormat],
        depth_stencil_format: Option<TextureFormat>,
        sample_count: u8,
    ) -> Result<Self> {
        if color_formats.len() > MAX_COLOR_ATTACHMENTS {
            return Err(Error::TooManyColorAttachments(color_formats.len()));
        }
        if sample_count == 0 {
            return Err(Error::InvalidData("sample count must be at least 1".to_string()));
        }
        Ok(Self {
            color_formats: color_formats.to_vec(),
            depth_stencil_format: depth_stencil_format
                .filter(|format| *format != TextureFormat::Unknown),
            sample_count,
        })
    }

    /// Color attachment formats in attachment order.
    pub fn color_formats(&self) -> &[TextureFormat] {
        &self.color_formats
    }

    /// Depth-stencil attachment format, if any.
    pub const fn depth_stencil_format(&self) -> Option<TextureFormat> {
        self.depth_stencil_format
    }

    /// Number of samples per pixel.
    pub const fn sample_count(&self) -> u8 {
        self.sample_count
    }

    /// Total number of attachments including the depth-stencil attachment.
    pub fn attachment_count(&self) -> usize {
        self.color_formats.len() + usize::from(self.depth_stencil_format.is_some())
    }
}

/// Viewport with a top-left origin.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub top_left_x: f32,
    pub top_left_y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Viewport covering `width` x `height` with the full depth range.
    pub const fn new(width: f32, height: f32) -> Self {
        Self {
            top_left_x: 0.0,
            top_left_y: 0.0,
            width,
            height,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Scissor rectangle in pixels, with an exclusive bottom-right corner.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScissorRectangle {
    pub top_left_x: i32,
    pub top_left_y: i32,
    pub bottom_right_x: i32,
    pub bottom_right_y: i32,
}

impl ScissorRectangle {
    /// Width of the rectangle, zero if inverted.
    pub fn width(&self) -> u32 {
        u32::try_from(self.bottom_right_x - self.top_left_x).unwrap_or(0)
    }

    /// Height of the rectangle, zero if inverted.
    pub fn height(&self) -> u32 {
        u32::try_from(self.bottom_right_y - self.top_left_y).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_more_than_eight_color_attachments() {
        let formats = [TextureFormat::R8G8B8A8Unorm; 9];
        assert_eq!(
            RenderPassDesc::new(&formats, None, 1),
            Err(Error::TooManyColorAttachments(9))
        );
        assert!(RenderPassDesc::new(&formats[..8], None, 1).is_ok());
    }

    #[test]
    fn unknown_depth_means_no_depth() {
        let desc = RenderPassDesc::new(
            &[TextureFormat::B8G8R8A8Unorm],
            Some(TextureFormat::Unknown),
            1,
        )
        .unwrap();
        assert_eq!(desc.depth_stencil_format(), None);
        assert_eq!(desc.attachment_count(), 1);
    }

    #[test]
    fn scissor_extent() {
        let rect = ScissorRectangle {
            top_left_x: 10,
            top_left_y: 20,
            bottom_right_x: 110,
            bottom_right_y: 70,
        };
        assert_eq!((rect.width(), rect.height()), (100, 50));
        let inverted = ScissorRectangle {
            bottom_right_x: 5,
            ..rect
        };
        assert_eq!(inverted.width(), 0);
    }
}
