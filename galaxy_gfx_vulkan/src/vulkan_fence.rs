/// Fence - Vulkan implementation of RawFence

use galaxy_gfx::gfx::{RawFence, Result};
use galaxy_gfx::engine_err;
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

pub struct VulkanFence {
    ctx: Arc<GpuContext>,
    pub(crate) fence: vk::Fence,
}

impl VulkanFence {
    pub(crate) fn new(ctx: Arc<GpuContext>, signaled: bool) -> Result<Self> {
        let flags = if signaled {
            vk::FenceCreateFlags::SIGNALED
        } else {
            vk::FenceCreateFlags::empty()
        };
        let create_info = vk::FenceCreateInfo::default().flags(flags);
        let fence = unsafe {
            ctx.device.create_fence(&create_info, None)
                .map_err(|e| engine_err!("gfx::vulkan", "Failed to create fence: {:?}", e))?
        };
        Ok(Self { ctx, fence })
    }

    pub fn handle(&self) -> vk::Fence {
        self.fence
    }
}

impl RawFence for VulkanFence {
    fn wait(&self, timeout_ns: u64) -> Result<bool> {
        unsafe {
            match self.ctx.device.wait_for_fences(&[self.fence], true, timeout_ns) {
                Ok(()) => Ok(true),
                Err(vk::Result::TIMEOUT) => Ok(false),
                Err(e) => Err(engine_err!("gfx::vulkan", "Failed to wait for fence: {:?}", e)),
            }
        }
    }

    fn reset(&self) -> Result<()> {
        unsafe {
            self.ctx.device.reset_fences(&[self.fence])
                .map_err(|e| engine_err!("gfx::vulkan", "Failed to reset fence: {:?}", e))
        }
    }

    fn is_signaled(&self) -> Result<bool> {
        unsafe {
            self.ctx.device.get_fence_status(self.fence)
                .map_err(|e| engine_err!("gfx::vulkan", "Failed to query fence status: {:?}", e))
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanFence {
    fn drop(&mut self) {
        unsafe {
            self.ctx.device.destroy_fence(self.fence, None);
        }
    }
}
