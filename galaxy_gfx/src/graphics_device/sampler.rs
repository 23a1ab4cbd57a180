/// Sampler resource

use std::any::Any;
use std::sync::Arc;

use crate::graphics_device::{CompareOp, ContextShared, PendingDeletion, SamplerId};

/// Texel filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Filter {
    Nearest,
    #[default]
    Linear,
}

/// Filtering between mip levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MipmapMode {
    Nearest,
    #[default]
    Linear,
}

/// Addressing outside [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    #[default]
    Repeat,
    MirroredRepeat,
    ClampToEdge,
    ClampToBorder,
}

/// Descriptor for creating a sampler
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerCreateInfo {
    /// Max anisotropy; values <= 1.0 disable anisotropic filtering
    pub anisotropy: f32,
    /// Min and mag filter
    pub filter: Filter,
    pub mipmap_mode: MipmapMode,
    pub lod_bias: f32,
    /// Addressing on every axis
    pub address_mode: AddressMode,
    /// Depth comparison (shadow samplers)
    pub compare: Option<CompareOp>,
}

impl Default for SamplerCreateInfo {
    fn default() -> Self {
        Self {
            anisotropy: 1.0,
            filter: Filter::Linear,
            mipmap_mode: MipmapMode::Linear,
            lod_bias: 0.0,
            address_mode: AddressMode::Repeat,
            compare: None,
        }
    }
}

pub trait RawSampler: Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

/// GPU sampler with its bindless slot (binding 1)
pub struct Sampler {
    shared: Arc<ContextShared>,
    raw: Option<Box<dyn RawSampler>>,
    info: SamplerCreateInfo,
    id: SamplerId,
}

impl Sampler {
    pub(crate) fn new(
        shared: Arc<ContextShared>,
        raw: Box<dyn RawSampler>,
        info: SamplerCreateInfo,
        id: SamplerId,
    ) -> Self {
        Self {
            shared,
            raw: Some(raw),
            info,
            id,
        }
    }

    pub fn info(&self) -> &SamplerCreateInfo {
        &self.info
    }

    pub fn id(&self) -> SamplerId {
        self.id
    }

    pub fn raw(&self) -> &dyn RawSampler {
        match &self.raw {
            Some(raw) => raw.as_ref(),
            None => unreachable!("sampler backend object taken before drop"),
        }
    }
}

impl std::fmt::Debug for Sampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sampler")
            .field("id", &self.id)
            .field("info", &self.info)
            .finish()
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.shared.defer(PendingDeletion::SamplerId(self.id));
        if let Some(raw) = self.raw.take() {
            self.shared.defer(PendingDeletion::Sampler(raw));
        }
    }
}
