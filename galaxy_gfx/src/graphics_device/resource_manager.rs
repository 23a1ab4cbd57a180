/// Bindless resource manager
///
/// Hands out stable slot IDs in the global descriptor set and keeps the
/// backend descriptors in sync:
///
/// | binding | contents          | ID type     |
/// |---------|-------------------|-------------|
/// | 0       | storage buffers   | `BufferId`  |
/// | 1       | samplers          | `SamplerId` |
/// | 2       | sampled textures  | `TextureId` |
/// | 3       | storage textures  | `TextureId` |
///
/// Bindings 2 and 3 share the texture ID space: a texture with both usages
/// appears at the same index in both arrays. Depth/stencil textures get one
/// ID per aspect. Unbinding writes the backend's safe default descriptor
/// into the slot before the ID becomes reusable, so a stale index read by a
/// shader never hits a destroyed resource.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::flags::TextureUsage;
use crate::graphics_device::{
    BufferId, Format, GraphicsDevice, RawBuffer, RawSampler, RawTexture, SamplerId, TextureAspect, TextureId,
};
use crate::utils::{ResourceIdPool, DEFAULT_POOL_CAPACITY};
use crate::engine_error;

/// Slots owned by one bound texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextureBinding {
    /// Color aspect, or depth aspect for depth/stencil formats
    pub id: Option<TextureId>,
    /// Stencil aspect (formats with a stencil component)
    pub stencil_id: Option<TextureId>,
}

/// Thread-safe allocator of bindless slots
pub struct ResourceManager {
    device: Arc<dyn GraphicsDevice>,
    buffers: ResourceIdPool,
    textures: ResourceIdPool,
    samplers: ResourceIdPool,
}

impl ResourceManager {
    /// Create pools sized to `min(65536, device capacity)`
    pub fn new(device: Arc<dyn GraphicsDevice>) -> Self {
        let capacity = DEFAULT_POOL_CAPACITY.min(device.bindless_capacity());
        Self::with_capacity(device, capacity)
    }

    /// Create pools of an explicit size per kind
    pub fn with_capacity(device: Arc<dyn GraphicsDevice>, capacity: u32) -> Self {
        Self {
            device,
            buffers: ResourceIdPool::new(capacity),
            textures: ResourceIdPool::new(capacity),
            samplers: ResourceIdPool::new(capacity),
        }
    }

    /// Slots per kind
    pub fn capacity(&self) -> u32 {
        self.buffers.capacity()
    }

    // ===== BUFFERS =====

    pub fn bind_buffer(&self, buffer: &dyn RawBuffer) -> Result<BufferId> {
        let id = allocate(&self.buffers, "storage buffer", BufferId::new)?;
        self.device.write_buffer_descriptor(id, buffer);
        Ok(id)
    }

    pub fn unbind_buffer(&self, id: BufferId) {
        self.device.clear_buffer_descriptor(id);
        self.buffers.free(id.index());
    }

    // ===== TEXTURES =====

    /// Bind a texture according to its usage and format
    ///
    /// Textures with neither `SAMPLED` nor `STORAGE` usage get no slot.
    pub fn bind_texture(&self, texture: &dyn RawTexture, format: Format, usage: TextureUsage) -> Result<TextureBinding> {
        if !usage.intersects(TextureUsage::SAMPLED | TextureUsage::STORAGE) {
            return Ok(TextureBinding::default());
        }

        let first_aspect = if format.has_depth() {
            TextureAspect::Depth
        } else if format.has_stencil() {
            TextureAspect::Stencil
        } else {
            TextureAspect::Color
        };
        let id = allocate(&self.textures, "texture", TextureId::new)?;
        self.device.write_texture_descriptor(id, texture, first_aspect, usage);

        let stencil_id = if format.has_depth() && format.has_stencil() {
            match allocate(&self.textures, "texture", TextureId::new) {
                Ok(stencil_id) => {
                    self.device.write_texture_descriptor(stencil_id, texture, TextureAspect::Stencil, usage);
                    Some(stencil_id)
                }
                Err(e) => {
                    self.unbind_texture(id);
                    return Err(e);
                }
            }
        } else {
            None
        };

        Ok(TextureBinding {
            id: Some(id),
            stencil_id,
        })
    }

    pub fn unbind_texture(&self, id: TextureId) {
        self.device.clear_texture_descriptor(id);
        self.textures.free(id.index());
    }

    // ===== SAMPLERS =====

    pub fn bind_sampler(&self, sampler: &dyn RawSampler) -> Result<SamplerId> {
        let id = allocate(&self.samplers, "sampler", SamplerId::new)?;
        self.device.write_sampler_descriptor(id, sampler);
        Ok(id)
    }

    pub fn unbind_sampler(&self, id: SamplerId) {
        self.device.clear_sampler_descriptor(id);
        self.samplers.free(id.index());
    }

    // ===== STATISTICS =====

    pub fn live_buffers(&self) -> u32 {
        self.buffers.len()
    }

    /// Live texture slots (depth/stencil textures count twice)
    pub fn live_textures(&self) -> u32 {
        self.textures.len()
    }

    pub fn live_samplers(&self) -> u32 {
        self.samplers.len()
    }
}

fn allocate<T>(pool: &ResourceIdPool, kind: &str, wrap: fn(u32) -> Option<T>) -> Result<T> {
    match pool.allocate().and_then(wrap) {
        Some(id) => Ok(id),
        None => {
            engine_error!(
                "gfx::ResourceManager",
                "Bindless {} slots exhausted ({} in use)",
                kind,
                pool.capacity()
            );
            Err(Error::ResourceExhausted(format!(
                "all {} bindless {} slots are in use",
                pool.capacity(),
                kind
            )))
        }
    }
}

#[cfg(test)]
#[path = "resource_manager_tests.rs"]
mod tests;
