/// Texture resource: layouts, creation info, backend trait and frontend object

use std::any::Any;
use std::sync::{Arc, Mutex};

use crate::flags::TextureUsage;
use crate::graphics_device::{ContextShared, Format, PendingDeletion, Sampler, SamplerCreateInfo, TextureId};

/// Layout a texture's memory is currently in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureLayout {
    /// Contents undefined (initial layout, or "discard")
    #[default]
    Undefined,
    /// Any access, suboptimal (storage images)
    General,
    ColorAttachment,
    DepthStencilAttachment,
    DepthStencilReadOnly,
    ShaderReadOnly,
    TransferSrc,
    TransferDst,
    /// Ready for presentation (swapchain images)
    Present,
}

/// Texture dimensionality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureType {
    D1,
    #[default]
    D2,
    D3,
    /// Six-layer cube map
    Cube,
}

/// Size of a texture in texels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent3D {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Extent3D {
    pub fn new(width: u32, height: u32, depth: u32) -> Self {
        Self { width, height, depth }
    }

    /// 2D extent (depth 1)
    pub fn d2(width: u32, height: u32) -> Self {
        Self { width, height, depth: 1 }
    }

    /// Extent of mip level `level` (each dimension halves, minimum 1)
    pub fn mip(&self, level: u32) -> Self {
        Self {
            width: (self.width >> level).max(1),
            height: (self.height >> level).max(1),
            depth: (self.depth >> level).max(1),
        }
    }

    /// Number of levels in a full mip chain
    pub fn max_mip_levels(&self) -> u32 {
        let largest = self.width.max(self.height).max(self.depth).max(1);
        32 - largest.leading_zeros()
    }
}

impl Default for Extent3D {
    fn default() -> Self {
        Self::d2(1, 1)
    }
}

/// Which aspect of a depth/stencil texture a view exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureAspect {
    Color,
    Depth,
    Stencil,
}

/// Mip/layer range touched by a barrier or clear
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubresourceRange {
    pub base_mip_level: u32,
    /// `REMAINING` covers every level from `base_mip_level`
    pub mip_level_count: u32,
    pub base_array_layer: u32,
    /// `REMAINING` covers every layer from `base_array_layer`
    pub array_layer_count: u32,
}

impl SubresourceRange {
    /// "Up to the end" count for levels and layers
    pub const REMAINING: u32 = u32::MAX;

    /// Every mip level and array layer
    pub fn all() -> Self {
        Self {
            base_mip_level: 0,
            mip_level_count: Self::REMAINING,
            base_array_layer: 0,
            array_layer_count: Self::REMAINING,
        }
    }

    /// A single mip level of a single layer
    pub fn single(mip_level: u32, array_layer: u32) -> Self {
        Self {
            base_mip_level: mip_level,
            mip_level_count: 1,
            base_array_layer: array_layer,
            array_layer_count: 1,
        }
    }
}

impl Default for SubresourceRange {
    fn default() -> Self {
        Self::all()
    }
}

/// Descriptor for creating a texture
#[derive(Debug, Clone, PartialEq)]
pub struct TextureCreateInfo {
    pub extent: Extent3D,
    pub format: Format,
    pub texture_type: TextureType,
    pub usage: TextureUsage,
    /// Number of array layers (6 for cube maps)
    pub array_layers: u32,
    pub mip_levels: u32,
    /// Optional sampler created alongside the texture
    pub sampler: Option<SamplerCreateInfo>,
}

impl Default for TextureCreateInfo {
    fn default() -> Self {
        Self {
            extent: Extent3D::default(),
            format: Format::R8G8B8A8_UNORM,
            texture_type: TextureType::D2,
            usage: TextureUsage::default(),
            array_layers: 1,
            mip_levels: 1,
            sampler: None,
        }
    }
}

/// Read-only properties of a created texture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureInfo {
    pub extent: Extent3D,
    pub format: Format,
    pub texture_type: TextureType,
    pub usage: TextureUsage,
    pub array_layers: u32,
    pub mip_levels: u32,
}

impl From<&TextureCreateInfo> for TextureInfo {
    fn from(info: &TextureCreateInfo) -> Self {
        Self {
            extent: info.extent,
            format: info.format,
            texture_type: info.texture_type,
            usage: info.usage,
            array_layers: info.array_layers,
            mip_levels: info.mip_levels,
        }
    }
}

/// Backend texture object
///
/// Owns the native image, its memory and its views. Swapchain images are
/// exposed through non-owning implementations whose drop is a no-op.
pub trait RawTexture: Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

/// GPU texture
///
/// The current layout is tracked on the object and updated as soon as a
/// barrier is recorded against it, so recording code can always ask where a
/// texture stands. Bindable textures (`SAMPLED` or `STORAGE` usage) own a
/// bindless slot; depth/stencil formats own a second one for the stencil
/// aspect.
pub struct Texture {
    shared: Arc<ContextShared>,
    raw: Option<Box<dyn RawTexture>>,
    info: TextureInfo,
    layout: Mutex<TextureLayout>,
    id: Option<TextureId>,
    stencil_id: Option<TextureId>,
    sampler: Option<Arc<Sampler>>,
}

impl Texture {
    pub(crate) fn new(
        shared: Arc<ContextShared>,
        raw: Box<dyn RawTexture>,
        info: TextureInfo,
        id: Option<TextureId>,
        stencil_id: Option<TextureId>,
        sampler: Option<Arc<Sampler>>,
    ) -> Self {
        Self {
            shared,
            raw: Some(raw),
            info,
            layout: Mutex::new(TextureLayout::Undefined),
            id,
            stencil_id,
            sampler,
        }
    }

    pub fn info(&self) -> &TextureInfo {
        &self.info
    }

    pub fn extent(&self) -> Extent3D {
        self.info.extent
    }

    pub fn format(&self) -> Format {
        self.info.format
    }

    pub fn texture_type(&self) -> TextureType {
        self.info.texture_type
    }

    pub fn usage(&self) -> TextureUsage {
        self.info.usage
    }

    pub fn array_layers(&self) -> u32 {
        self.info.array_layers
    }

    pub fn mip_levels(&self) -> u32 {
        self.info.mip_levels
    }

    /// Layout after the last recorded barrier
    pub fn layout(&self) -> TextureLayout {
        *self.layout.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn set_layout(&self, layout: TextureLayout) {
        *self.layout.lock().unwrap_or_else(|e| e.into_inner()) = layout;
    }

    /// Bindless slot (depth aspect for depth/stencil formats)
    ///
    /// `None` for textures without `SAMPLED`/`STORAGE` usage and for
    /// swapchain images.
    pub fn id(&self) -> Option<TextureId> {
        self.id
    }

    /// Bindless slot of the stencil aspect (depth/stencil formats only)
    pub fn stencil_id(&self) -> Option<TextureId> {
        self.stencil_id
    }

    /// Sampler created from `TextureCreateInfo::sampler`
    pub fn sampler(&self) -> Option<&Arc<Sampler>> {
        self.sampler.as_ref()
    }

    /// Backend object
    pub fn raw(&self) -> &dyn RawTexture {
        match &self.raw {
            Some(raw) => raw.as_ref(),
            None => unreachable!("texture backend object taken before drop"),
        }
    }
}

impl std::fmt::Debug for Texture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.id)
            .field("stencil_id", &self.stencil_id)
            .field("info", &self.info)
            .field("layout", &self.layout())
            .finish()
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        if let Some(id) = self.id {
            self.shared.defer(PendingDeletion::TextureId(id));
        }
        if let Some(id) = self.stencil_id {
            self.shared.defer(PendingDeletion::TextureId(id));
        }
        if let Some(raw) = self.raw.take() {
            self.shared.defer(PendingDeletion::Texture(raw));
        }
    }
}

#[cfg(test)]
#[path = "texture_tests.rs"]
mod tests;
