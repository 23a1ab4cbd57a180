/// Frame buffer - groups the attachments a rendering scope writes to
///
/// With dynamic rendering there is no native framebuffer object: a frame
/// buffer is just a validated set of textures. Created once and reused each
/// frame; recreate it when the attachments change (e.g., window resize).

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::flags::TextureUsage;
use crate::graphics_device::{Extent3D, Format, Texture, TextureType};

/// Color and depth/stencil attachments sharing one 2D extent
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    color: Vec<Arc<Texture>>,
    depth: Option<Arc<Texture>>,
    extent: Extent3D,
}

impl FrameBuffer {
    pub(crate) fn new(color: Vec<Arc<Texture>>, depth: Option<Arc<Texture>>) -> Result<Self> {
        let first = color.first().or(depth.as_ref()).ok_or_else(|| {
            Error::InvalidResource("frame buffer needs at least one attachment".to_string())
        })?;
        let extent = first.extent();

        for (index, texture) in color.iter().enumerate() {
            check_attachment(texture, extent, &format!("color attachment {}", index))?;
            if !texture.usage().contains(TextureUsage::COLOR_ATTACHMENT) {
                return Err(Error::InvalidResource(format!(
                    "color attachment {} lacks COLOR_ATTACHMENT usage",
                    index
                )));
            }
            if texture.format().is_depth_stencil() {
                return Err(Error::InvalidResource(format!(
                    "color attachment {} has depth format {:?}",
                    index,
                    texture.format()
                )));
            }
        }

        if let Some(texture) = &depth {
            check_attachment(texture, extent, "depth attachment")?;
            if !texture.usage().contains(TextureUsage::DEPTH_STENCIL_ATTACHMENT) {
                return Err(Error::InvalidResource(
                    "depth attachment lacks DEPTH_STENCIL_ATTACHMENT usage".to_string(),
                ));
            }
            if !texture.format().is_depth_stencil() {
                return Err(Error::InvalidResource(format!(
                    "depth attachment has color format {:?}",
                    texture.format()
                )));
            }
        }

        Ok(Self { color, depth, extent })
    }

    /// Shared attachment extent (depth is always 1)
    pub fn extent(&self) -> Extent3D {
        self.extent
    }

    pub fn width(&self) -> u32 {
        self.extent.width
    }

    pub fn height(&self) -> u32 {
        self.extent.height
    }

    pub fn color_attachments(&self) -> &[Arc<Texture>] {
        &self.color
    }

    pub fn depth_attachment(&self) -> Option<&Arc<Texture>> {
        self.depth.as_ref()
    }

    /// Formats of the color attachments, in order (pipeline compatibility)
    pub fn color_formats(&self) -> Vec<Format> {
        self.color.iter().map(|texture| texture.format()).collect()
    }

    pub fn depth_format(&self) -> Option<Format> {
        self.depth.as_ref().map(|texture| texture.format())
    }
}

fn check_attachment(texture: &Texture, extent: Extent3D, what: &str) -> Result<()> {
    if texture.texture_type() != TextureType::D2 {
        return Err(Error::InvalidResource(format!(
            "{} must be a 2D texture, got {:?}",
            what,
            texture.texture_type()
        )));
    }
    if texture.extent() != extent {
        return Err(Error::InvalidResource(format!(
            "{} extent {}x{} differs from frame buffer extent {}x{}",
            what,
            texture.extent().width,
            texture.extent().height,
            extent.width,
            extent.height
        )));
    }
    Ok(())
}
