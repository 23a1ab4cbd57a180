/// GpuContext - Shared GPU state for all Vulkan objects
///
/// Every backend object (buffers, textures, command buffers, the device
/// itself) holds an `Arc<GpuContext>`. The logical device and the instance
/// are destroyed when the last reference goes away, so objects released
/// after the frontend context is gone still find a live device.

use ash::vk;
use galaxy_gfx::gfx::Result;
use galaxy_gfx::engine_err;
use gpu_allocator::vulkan::Allocator;
use std::mem::ManuallyDrop;
use std::sync::{Mutex, MutexGuard};

/// Instance-level objects kept alive with the device
pub(crate) struct InstanceObjects {
    pub entry: ash::Entry,
    pub instance: ash::Instance,
    pub debug_utils_loader: Option<ash::ext::debug_utils::Instance>,
    pub debug_messenger: Option<vk::DebugUtilsMessengerEXT>,
    pub surface_loader: ash::khr::surface::Instance,
    /// Window surface; null on headless devices
    pub surface: vk::SurfaceKHR,
}

/// Shared GPU context for all Vulkan resources
pub struct GpuContext {
    /// Vulkan logical device
    pub device: ash::Device,

    pub physical_device: vk::PhysicalDevice,

    /// GPU memory allocator
    /// Wrapped in ManuallyDrop so it is dropped BEFORE the device is destroyed
    pub allocator: ManuallyDrop<Mutex<Allocator>>,

    /// Graphics queue (also used for compute, transfer and present)
    pub graphics_queue: vk::Queue,

    pub graphics_queue_family: u32,

    /// Serializes every use of `graphics_queue`
    queue_lock: Mutex<()>,

    /// Reusable command pool for one-shot work
    /// (created with TRANSIENT + RESET_COMMAND_BUFFER flags)
    upload_command_pool: Mutex<vk::CommandPool>,

    /// Largest anisotropy the device accepts
    pub max_anisotropy: f32,

    pub(crate) instance: InstanceObjects,
}

impl GpuContext {
    pub(crate) fn new(
        device: ash::Device,
        physical_device: vk::PhysicalDevice,
        allocator: Allocator,
        graphics_queue: vk::Queue,
        graphics_queue_family: u32,
        upload_command_pool: vk::CommandPool,
        max_anisotropy: f32,
        instance: InstanceObjects,
    ) -> Self {
        Self {
            device,
            physical_device,
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
            graphics_queue,
            graphics_queue_family,
            queue_lock: Mutex::new(()),
            upload_command_pool: Mutex::new(upload_command_pool),
            max_anisotropy,
            instance,
        }
    }

    /// Lock the allocator
    pub fn allocator(&self) -> MutexGuard<'_, Allocator> {
        self.allocator.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Hold while submitting to or presenting on `graphics_queue`
    pub fn lock_queue(&self) -> MutexGuard<'_, ()> {
        self.queue_lock.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record with `record`, submit, and block until the GPU is done
    pub(crate) fn one_shot_submit(&self, record: impl FnOnce(vk::CommandBuffer)) -> Result<()> {
        let pool = self.upload_command_pool.lock().unwrap_or_else(|e| e.into_inner());
        unsafe {
            let alloc_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(*pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);
            let command_buffer = self.device.allocate_command_buffers(&alloc_info)
                .map_err(|e| engine_err!("gfx::vulkan", "Failed to allocate one-shot command buffer: {:?}", e))?
                .into_iter()
                .next()
                .ok_or_else(|| engine_err!("gfx::vulkan", "Driver returned no command buffer"))?;

            let fence = match self.device.create_fence(&vk::FenceCreateInfo::default(), None) {
                Ok(fence) => fence,
                Err(e) => {
                    self.device.free_command_buffers(*pool, &[command_buffer]);
                    return Err(engine_err!("gfx::vulkan", "Failed to create one-shot fence: {:?}", e));
                }
            };

            let result = (|| -> Result<()> {
                let begin_info = vk::CommandBufferBeginInfo::default()
                    .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
                self.device.begin_command_buffer(command_buffer, &begin_info)
                    .map_err(|e| engine_err!("gfx::vulkan", "Failed to begin one-shot command buffer: {:?}", e))?;
                record(command_buffer);
                self.device.end_command_buffer(command_buffer)
                    .map_err(|e| engine_err!("gfx::vulkan", "Failed to end one-shot command buffer: {:?}", e))?;

                let command_buffer_infos = [vk::CommandBufferSubmitInfo::default().command_buffer(command_buffer)];
                let submit_info = vk::SubmitInfo2::default().command_buffer_infos(&command_buffer_infos);
                {
                    let _queue = self.lock_queue();
                    self.device.queue_submit2(self.graphics_queue, &[submit_info], fence)
                        .map_err(|e| engine_err!("gfx::vulkan", "Failed to submit one-shot commands: {:?}", e))?;
                }
                self.device.wait_for_fences(&[fence], true, u64::MAX)
                    .map_err(|e| engine_err!("gfx::vulkan", "Failed to wait for one-shot commands: {:?}", e))
            })();

            self.device.destroy_fence(fence, None);
            self.device.free_command_buffers(*pool, &[command_buffer]);
            result
        }
    }

    pub fn instance(&self) -> &ash::Instance {
        &self.instance.instance
    }

    pub fn surface(&self) -> Option<vk::SurfaceKHR> {
        (self.instance.surface != vk::SurfaceKHR::null()).then_some(self.instance.surface)
    }

    pub fn surface_loader(&self) -> &ash::khr::surface::Instance {
        &self.instance.surface_loader
    }
}

impl Drop for GpuContext {
    fn drop(&mut self) {
        unsafe {
            self.device.device_wait_idle().ok();

            let pool = self.upload_command_pool.get_mut().unwrap_or_else(|e| e.into_inner());
            self.device.destroy_command_pool(*pool, None);

            // 1. Free VkDeviceMemory pages while the device is alive
            ManuallyDrop::drop(&mut self.allocator);

            // 2. Device
            self.device.destroy_device(None);

            // 3. Surface
            if self.instance.surface != vk::SurfaceKHR::null() {
                self.instance.surface_loader.destroy_surface(self.instance.surface, None);
            }

            // 4. Stop callbacks, then destroy the messenger BEFORE the instance
            crate::debug::cleanup_debug_config();
            if let (Some(debug_utils), Some(messenger)) =
                (&self.instance.debug_utils_loader, self.instance.debug_messenger)
            {
                debug_utils.destroy_debug_utils_messenger(messenger, None);
            }

            // 5. Instance
            self.instance.instance.destroy_instance(None);
        }
    }
}
