/// Buffer - Vulkan implementation of RawBuffer

use galaxy_gfx::gfx::{BufferCreateInfo, Error, MapMode, RawBuffer, Result};
use galaxy_gfx::{engine_err, engine_error};
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;

/// Every buffer can be a storage buffer, a vertex/index/indirect source and
/// a transfer endpoint, and has a device address
const BUFFER_USAGE: vk::BufferUsageFlags = vk::BufferUsageFlags::from_raw(
    vk::BufferUsageFlags::STORAGE_BUFFER.as_raw()
        | vk::BufferUsageFlags::VERTEX_BUFFER.as_raw()
        | vk::BufferUsageFlags::INDEX_BUFFER.as_raw()
        | vk::BufferUsageFlags::INDIRECT_BUFFER.as_raw()
        | vk::BufferUsageFlags::TRANSFER_SRC.as_raw()
        | vk::BufferUsageFlags::TRANSFER_DST.as_raw()
        | vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS.as_raw(),
);

/// Memory location for a buffer's map mode
///
/// `IfOptimal` only maps when device-local memory is host visible
/// (resizable BAR or unified memory).
pub(crate) fn memory_location(info: &BufferCreateInfo, host_visible_device_memory: bool) -> MemoryLocation {
    let mapped = match info.map_mode {
        MapMode::Always => true,
        MapMode::Never => false,
        MapMode::IfOptimal => host_visible_device_memory,
    };
    match (mapped, info.cached) {
        (false, _) => MemoryLocation::GpuOnly,
        (true, true) => MemoryLocation::GpuToCpu,
        (true, false) => MemoryLocation::CpuToGpu,
    }
}

/// Vulkan buffer implementation
pub struct VulkanBuffer {
    /// Shared GPU context (device, allocator, queue)
    ctx: Arc<GpuContext>,
    pub(crate) buffer: vk::Buffer,
    pub(crate) allocation: Option<Allocation>,
    pub(crate) size: u64,
    device_address: u64,
}

impl VulkanBuffer {
    pub(crate) fn new(ctx: Arc<GpuContext>, info: &BufferCreateInfo, host_visible_device_memory: bool) -> Result<Self> {
        unsafe {
            let create_info = vk::BufferCreateInfo::default()
                .size(info.size)
                .usage(BUFFER_USAGE)
                .sharing_mode(vk::SharingMode::EXCLUSIVE);

            let buffer = ctx.device.create_buffer(&create_info, None)
                .map_err(|e| engine_err!("gfx::vulkan", "Failed to create buffer of size {} bytes: {:?}", info.size, e))?;

            let requirements = ctx.device.get_buffer_memory_requirements(buffer);
            let location = memory_location(info, host_visible_device_memory);

            let allocation = ctx.allocator().allocate(&AllocationCreateDesc {
                name: "buffer",
                requirements,
                location,
                linear: true,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_buffer(buffer, None);
                    let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                    engine_error!("gfx::vulkan", "Out of GPU memory for buffer (required: {:.2} MB): {:?}", size_mb, e);
                    return Err(Error::OutOfMemory);
                }
            };

            if let Err(e) = ctx.device.bind_buffer_memory(buffer, allocation.memory(), allocation.offset()) {
                ctx.allocator().free(allocation).ok();
                ctx.device.destroy_buffer(buffer, None);
                return Err(engine_err!("gfx::vulkan", "Failed to bind buffer memory: {:?}", e));
            }

            let address_info = vk::BufferDeviceAddressInfo::default().buffer(buffer);
            let device_address = ctx.device.get_buffer_device_address(&address_info);

            Ok(Self {
                ctx,
                buffer,
                allocation: Some(allocation),
                size: info.size,
                device_address,
            })
        }
    }

    /// Native buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    fn mapped_ptr(&self) -> Result<*mut u8> {
        self.allocation
            .as_ref()
            .and_then(|allocation| allocation.mapped_ptr())
            .map(|ptr| ptr.as_ptr() as *mut u8)
            .ok_or_else(|| Error::InvalidResource("buffer is not CPU-accessible".to_string()))
    }

    fn check_range(&self, offset: u64, len: usize) -> Result<()> {
        match offset.checked_add(len as u64) {
            Some(end) if end <= self.size => Ok(()),
            _ => Err(Error::InvalidResource(format!(
                "range [{}, +{}) exceeds buffer of {} bytes",
                offset, len, self.size
            ))),
        }
    }
}

impl RawBuffer for VulkanBuffer {
    fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        self.check_range(offset, data.len())?;
        let ptr = self.mapped_ptr()?;
        unsafe {
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr.add(offset as usize), data.len());
        }
        Ok(())
    }

    fn read(&self, offset: u64, out: &mut [u8]) -> Result<()> {
        self.check_range(offset, out.len())?;
        let ptr = self.mapped_ptr()?;
        unsafe {
            std::ptr::copy_nonoverlapping(ptr.add(offset as usize) as *const u8, out.as_mut_ptr(), out.len());
        }
        Ok(())
    }

    fn is_mapped(&self) -> bool {
        self.allocation
            .as_ref()
            .is_some_and(|allocation| allocation.mapped_ptr().is_some())
    }

    fn device_address(&self) -> u64 {
        self.device_address
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanBuffer {
    fn drop(&mut self) {
        unsafe {
            if let Some(allocation) = self.allocation.take() {
                self.ctx.allocator().free(allocation).ok();
            }
            self.ctx.device.destroy_buffer(self.buffer, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_location_per_map_mode() {
        assert_eq!(memory_location(&BufferCreateInfo::mapped(16), false), MemoryLocation::CpuToGpu);
        assert_eq!(memory_location(&BufferCreateInfo::device_local(16), true), MemoryLocation::GpuOnly);
    }

    #[test]
    fn test_if_optimal_follows_device_memory() {
        let info = BufferCreateInfo {
            size: 16,
            map_mode: MapMode::IfOptimal,
            cached: false,
        };
        assert_eq!(memory_location(&info, true), MemoryLocation::CpuToGpu);
        assert_eq!(memory_location(&info, false), MemoryLocation::GpuOnly);
    }

    #[test]
    fn test_cached_readback() {
        let info = BufferCreateInfo {
            cached: true,
            ..BufferCreateInfo::mapped(16)
        };
        assert_eq!(memory_location(&info, false), MemoryLocation::GpuToCpu);
    }

    #[test]
    fn test_buffer_usage_covers_bindless_and_transfers() {
        assert!(BUFFER_USAGE.contains(vk::BufferUsageFlags::STORAGE_BUFFER));
        assert!(BUFFER_USAGE.contains(vk::BufferUsageFlags::SHADER_DEVICE_ADDRESS));
        assert!(BUFFER_USAGE.contains(vk::BufferUsageFlags::TRANSFER_SRC | vk::BufferUsageFlags::TRANSFER_DST));
    }
}
