/// Sampler - Vulkan implementation of RawSampler

use galaxy_gfx::gfx::{AddressMode, RawSampler, Result, SamplerCreateInfo};
use galaxy_gfx::engine_err;
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{address_mode_to_vk, compare_op_to_vk, filter_to_vk, mipmap_mode_to_vk};

/// Vulkan sampler implementation
pub struct VulkanSampler {
    ctx: Arc<GpuContext>,
    pub(crate) sampler: vk::Sampler,
}

/// Native create info; anisotropy is clamped to the device limit
pub(crate) fn sampler_create_info(info: &SamplerCreateInfo, max_anisotropy: f32) -> vk::SamplerCreateInfo<'static> {
    let filter = filter_to_vk(info.filter);
    let address = address_mode_to_vk(info.address_mode);

    // Shadow samplers clamp to a white border so out-of-range lookups pass
    let border = if info.compare.is_some() && info.address_mode == AddressMode::ClampToBorder {
        vk::BorderColor::FLOAT_OPAQUE_WHITE
    } else {
        vk::BorderColor::FLOAT_OPAQUE_BLACK
    };

    let mut create_info = vk::SamplerCreateInfo::default()
        .mag_filter(filter)
        .min_filter(filter)
        .mipmap_mode(mipmap_mode_to_vk(info.mipmap_mode))
        .address_mode_u(address)
        .address_mode_v(address)
        .address_mode_w(address)
        .mip_lod_bias(info.lod_bias)
        .min_lod(0.0)
        .max_lod(vk::LOD_CLAMP_NONE)
        .border_color(border)
        .unnormalized_coordinates(false);

    create_info = match info.compare {
        Some(op) => create_info.compare_enable(true).compare_op(compare_op_to_vk(op)),
        None => create_info.compare_enable(false).compare_op(vk::CompareOp::ALWAYS),
    };

    let anisotropy = info.anisotropy.min(max_anisotropy);
    if anisotropy > 1.0 {
        create_info.anisotropy_enable(true).max_anisotropy(anisotropy)
    } else {
        create_info.anisotropy_enable(false).max_anisotropy(1.0)
    }
}

impl VulkanSampler {
    pub(crate) fn new(ctx: Arc<GpuContext>, info: &SamplerCreateInfo) -> Result<Self> {
        let create_info = sampler_create_info(info, ctx.max_anisotropy);
        let sampler = unsafe {
            ctx.device.create_sampler(&create_info, None)
                .map_err(|e| engine_err!("gfx::vulkan", "Failed to create sampler: {:?}", e))?
        };
        Ok(Self { ctx, sampler })
    }

    /// Native sampler handle
    pub fn handle(&self) -> vk::Sampler {
        self.sampler
    }
}

impl RawSampler for VulkanSampler {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanSampler {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_sampler(self.sampler, None);
        }
    }
}
