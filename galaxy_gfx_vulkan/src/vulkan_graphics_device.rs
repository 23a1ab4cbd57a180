/// VulkanGraphicsDevice - Vulkan implementation of GraphicsDevice
///
/// Brings up a Vulkan 1.3 instance and device with dynamic rendering,
/// synchronization2, descriptor indexing and buffer device addresses. One
/// queue family serves graphics, compute, transfer and present.
///
/// Frame tracking: every submission gets a fence from a pool, filed under
/// the frame slot it was submitted for. `wait_for_frame(slot)` waits on and
/// recycles the fences of that slot.

use galaxy_gfx::gfx::{
    Api, BufferCreateInfo, BufferId, ComputePipelineCreateInfo, ContextCreateInfo, Error, Format, FormatSupport,
    GraphicsDevice, GraphicsPipelineCreateInfo, HardwareSupport, RawBuffer, RawCommandBuffer, RawFence, RawPipeline,
    RawSampler, RawShader, RawSwapchain, RawTexture, Result, SamplerCreateInfo, SamplerId, ShaderCreateInfo,
    Submission, SwapchainCreateInfo, TextureAspect, TextureCreateInfo, TextureId, TextureUsage, WindowApi,
};
use galaxy_gfx::{engine_debug, engine_err, engine_error, engine_info, engine_warn};
use ash::vk;
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use rustc_hash::FxHashMap;
use std::ffi::{c_char, CStr, CString};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::vulkan_bindless::{bindless_capacity, BindlessTable};
use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_command_buffer::VulkanCommandBuffer;
use crate::vulkan_context::{GpuContext, InstanceObjects};
use crate::vulkan_fence::VulkanFence;
use crate::vulkan_format::{format_support_from_vk, format_to_vk};
use crate::vulkan_pipeline::VulkanPipeline;
use crate::vulkan_sampler::VulkanSampler;
use crate::vulkan_shader::VulkanShader;
use crate::vulkan_swapchain::VulkanSwapchain;
use crate::vulkan_texture::VulkanTexture;

const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

/// Upper bound on frames in flight
pub const MAX_FRAMES_IN_FLIGHT: usize = 3;

/// Device-local heaps smaller than this are treated as a small BAR window
const MIN_HOST_VISIBLE_HEAP: u64 = 256 * 1024 * 1024;

// ============================================================================
// Device selection helpers
// ============================================================================

/// Preference order: discrete, integrated, virtual, anything else
pub(crate) fn device_type_score(device_type: vk::PhysicalDeviceType) -> u32 {
    match device_type {
        vk::PhysicalDeviceType::DISCRETE_GPU => 4,
        vk::PhysicalDeviceType::INTEGRATED_GPU => 3,
        vk::PhysicalDeviceType::VIRTUAL_GPU => 2,
        vk::PhysicalDeviceType::CPU => 1,
        _ => 0,
    }
}

/// Names of the required 1.2 / 1.3 features the device lacks
pub(crate) fn missing_features(
    features12: &vk::PhysicalDeviceVulkan12Features,
    features13: &vk::PhysicalDeviceVulkan13Features,
) -> Vec<&'static str> {
    let required = [
        (features12.descriptor_indexing, "descriptorIndexing"),
        (features12.runtime_descriptor_array, "runtimeDescriptorArray"),
        (features12.descriptor_binding_partially_bound, "descriptorBindingPartiallyBound"),
        (features12.descriptor_binding_update_unused_while_pending, "descriptorBindingUpdateUnusedWhilePending"),
        (features12.descriptor_binding_storage_buffer_update_after_bind, "descriptorBindingStorageBufferUpdateAfterBind"),
        (features12.descriptor_binding_sampled_image_update_after_bind, "descriptorBindingSampledImageUpdateAfterBind"),
        (features12.descriptor_binding_storage_image_update_after_bind, "descriptorBindingStorageImageUpdateAfterBind"),
        (features12.shader_sampled_image_array_non_uniform_indexing, "shaderSampledImageArrayNonUniformIndexing"),
        (features12.shader_storage_buffer_array_non_uniform_indexing, "shaderStorageBufferArrayNonUniformIndexing"),
        (features12.buffer_device_address, "bufferDeviceAddress"),
        (features13.dynamic_rendering, "dynamicRendering"),
        (features13.synchronization2, "synchronization2"),
    ];
    required
        .into_iter()
        .filter(|&(supported, _)| supported == vk::FALSE)
        .map(|(_, name)| name)
        .collect()
}

/// Whether a large device-local heap is also host visible (resizable BAR or UMA)
pub(crate) fn has_host_visible_device_memory(properties: &vk::PhysicalDeviceMemoryProperties) -> bool {
    let wanted = vk::MemoryPropertyFlags::DEVICE_LOCAL | vk::MemoryPropertyFlags::HOST_VISIBLE;
    let type_count = (properties.memory_type_count as usize).min(properties.memory_types.len());
    properties.memory_types[..type_count].iter().any(|memory_type| {
        memory_type.property_flags.contains(wanted)
            && properties
                .memory_heaps
                .get(memory_type.heap_index as usize)
                .is_some_and(|heap| heap.size >= MIN_HOST_VISIBLE_HEAP)
    })
}

/// Frames in flight actually used for a preference
pub(crate) fn clamp_frames_in_flight(preferred: usize) -> usize {
    preferred.clamp(1, MAX_FRAMES_IN_FLIGHT)
}

struct DeviceCandidate {
    physical_device: vk::PhysicalDevice,
    queue_family: u32,
    properties: vk::PhysicalDeviceProperties,
    indexing: vk::PhysicalDeviceDescriptorIndexingProperties<'static>,
    sampler_anisotropy: bool,
}

/// Everything created between the instance and the shared context
struct DeviceObjects {
    device: ash::Device,
    candidate: DeviceCandidate,
    graphics_queue: vk::Queue,
    allocator: Allocator,
    upload_command_pool: vk::CommandPool,
}

// ============================================================================
// Frame fences
// ============================================================================

struct FrameFences {
    /// Unsignaled fences ready for reuse
    pool: Vec<vk::Fence>,
    /// Fences of submissions per frame slot
    in_flight: Vec<Vec<vk::Fence>>,
}

// ============================================================================
// VulkanGraphicsDevice
// ============================================================================

/// Vulkan backend device
pub struct VulkanGraphicsDevice {
    ctx: Arc<GpuContext>,
    support: HardwareSupport,
    frames_in_flight: usize,
    bindless: BindlessTable,
    /// Global layout: bindless set 0 + one push-constant range for all stages
    pipeline_layout: vk::PipelineLayout,
    frames: Mutex<FrameFences>,
    format_cache: Mutex<FxHashMap<Format, FormatSupport>>,
}

impl VulkanGraphicsDevice {
    pub fn new(info: &ContextCreateInfo) -> Result<Self> {
        info.validate()?;
        let enable_validation = info.enable_validation || cfg!(feature = "vulkan-validation");

        unsafe {
            let instance_objects = Self::create_instance(info, enable_validation)?;
            let device_objects = match Self::create_device(&instance_objects) {
                Ok(objects) => objects,
                Err(e) => {
                    Self::destroy_instance_objects(&instance_objects);
                    return Err(e);
                }
            };

            let DeviceObjects {
                device,
                candidate,
                graphics_queue,
                allocator,
                upload_command_pool,
            } = device_objects;

            let memory_properties = instance_objects
                .instance
                .get_physical_device_memory_properties(candidate.physical_device);
            let host_visible_device_memory = has_host_visible_device_memory(&memory_properties);
            let limits = candidate.properties.limits;
            let max_anisotropy = if candidate.sampler_anisotropy {
                limits.max_sampler_anisotropy
            } else {
                1.0
            };
            let device_name = candidate
                .properties
                .device_name_as_c_str()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|_| "Unknown GPU".to_string());

            // From here on the context owns device and instance teardown
            let ctx = Arc::new(GpuContext::new(
                device,
                candidate.physical_device,
                allocator,
                graphics_queue,
                candidate.queue_family,
                upload_command_pool,
                max_anisotropy,
                instance_objects,
            ));

            let capacity = bindless_capacity(&candidate.indexing);
            let bindless = BindlessTable::new(Arc::clone(&ctx), capacity)?;

            let push_constant_ranges = [vk::PushConstantRange {
                stage_flags: vk::ShaderStageFlags::ALL,
                offset: 0,
                size: limits.max_push_constants_size,
            }];
            let set_layouts = [bindless.layout];
            let layout_create_info = vk::PipelineLayoutCreateInfo::default()
                .set_layouts(&set_layouts)
                .push_constant_ranges(&push_constant_ranges);
            let pipeline_layout = ctx.device.create_pipeline_layout(&layout_create_info, None)
                .map_err(|e| engine_err!("gfx::vulkan", "Failed to create global pipeline layout: {:?}", e))?;

            let frames_in_flight = clamp_frames_in_flight(info.preferred_frames_in_flight);
            if frames_in_flight != info.preferred_frames_in_flight {
                engine_warn!(
                    "gfx::vulkan",
                    "{} frames in flight requested, using {}",
                    info.preferred_frames_in_flight,
                    frames_in_flight
                );
            }

            let support = HardwareSupport {
                device_name,
                bindless: true,
                buffer_device_address: true,
                max_bindless_resources: capacity,
                max_anisotropy,
                max_push_constant_size: limits.max_push_constants_size,
                host_visible_device_memory,
            };

            engine_info!(
                "gfx::vulkan",
                "Device ready: {} ({:?}), {} bindless slots, {} frames in flight, validation {}",
                support.device_name,
                candidate.properties.device_type,
                capacity,
                frames_in_flight,
                if enable_validation { "on" } else { "off" }
            );

            Ok(Self {
                ctx,
                support,
                frames_in_flight,
                bindless,
                pipeline_layout,
                frames: Mutex::new(FrameFences {
                    pool: Vec::new(),
                    in_flight: vec![Vec::new(); frames_in_flight],
                }),
                format_cache: Mutex::new(FxHashMap::default()),
            })
        }
    }

    unsafe fn create_instance(info: &ContextCreateInfo, enable_validation: bool) -> Result<InstanceObjects> {
        let entry = ash::Entry::load().map_err(|e| {
            engine_error!("gfx::vulkan", "Failed to load Vulkan library: {:?}", e);
            Error::InitializationFailed(format!("Failed to load Vulkan library: {:?}", e))
        })?;

        let window = match info.window_api {
            WindowApi::Winit => info.window.as_deref(),
            WindowApi::Headless => None,
        };

        let app_name = CString::new(info.app_name.as_str()).unwrap_or_else(|_| c"Galaxy GFX Application".to_owned());
        let app_info = vk::ApplicationInfo::default()
            .application_name(&app_name)
            .application_version(vk::make_api_version(0, 1, 0, 0))
            .engine_name(c"Galaxy GFX")
            .engine_version(vk::make_api_version(0, 0, 1, 0))
            .api_version(vk::API_VERSION_1_3);

        let mut extension_names: Vec<*const c_char> = Vec::new();
        if let Some(window) = window {
            let display_handle = window.display_handle().map_err(|e| {
                engine_error!("gfx::vulkan", "Failed to get display handle: {}", e);
                Error::InitializationFailed(format!("Failed to get display handle: {}", e))
            })?;
            let required = ash_window::enumerate_required_extensions(display_handle.as_raw()).map_err(|e| {
                engine_error!("gfx::vulkan", "Failed to get required extensions: {}", e);
                Error::InitializationFailed(format!("Failed to get required extensions: {}", e))
            })?;
            extension_names.extend_from_slice(required);
        }

        let validation_available = entry
            .enumerate_instance_layer_properties()
            .unwrap_or_default()
            .iter()
            .any(|layer| layer.layer_name_as_c_str().is_ok_and(|name| name == VALIDATION_LAYER));
        let enable_validation = if enable_validation && !validation_available {
            engine_warn!("gfx::vulkan", "Validation requested but {:?} is not installed", VALIDATION_LAYER);
            false
        } else {
            enable_validation
        };

        let layer_names = if enable_validation {
            extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
            vec![VALIDATION_LAYER.as_ptr()]
        } else {
            vec![]
        };

        let create_info = vk::InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_layer_names(&layer_names)
            .enabled_extension_names(&extension_names);

        let instance = entry.create_instance(&create_info, None).map_err(|e| {
            engine_error!("gfx::vulkan", "Failed to create Vulkan instance: {:?}", e);
            Error::InitializationFailed(format!("Failed to create instance: {:?}", e))
        })?;

        let (debug_utils_loader, debug_messenger) = if enable_validation {
            let debug_utils = ash::ext::debug_utils::Instance::new(&entry, &instance);
            crate::debug::init_debug_config(info.debug.clone());

            let debug_info = vk::DebugUtilsMessengerCreateInfoEXT::default()
                .message_severity(crate::debug::severity_flags(info.debug.severity))
                .message_type(
                    vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                        | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                        | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
                )
                .pfn_user_callback(Some(crate::debug::vulkan_debug_callback));

            match debug_utils.create_debug_utils_messenger(&debug_info, None) {
                Ok(messenger) => (Some(debug_utils), Some(messenger)),
                Err(e) => {
                    crate::debug::cleanup_debug_config();
                    instance.destroy_instance(None);
                    engine_error!("gfx::vulkan", "Failed to create debug messenger: {:?}", e);
                    return Err(Error::InitializationFailed(format!("Failed to create debug messenger: {:?}", e)));
                }
            }
        } else {
            (None, None)
        };

        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);
        let mut objects = InstanceObjects {
            entry,
            instance,
            debug_utils_loader,
            debug_messenger,
            surface_loader,
            surface: vk::SurfaceKHR::null(),
        };

        if let Some(window) = window {
            let surface = window
                .display_handle()
                .and_then(|display| window.window_handle().map(|handle| (display, handle)))
                .map_err(|e| Error::InitializationFailed(format!("Failed to get window handle: {}", e)))
                .and_then(|(display, handle)| {
                    ash_window::create_surface(&objects.entry, &objects.instance, display.as_raw(), handle.as_raw(), None)
                        .map_err(|e| Error::InitializationFailed(format!("Failed to create surface: {:?}", e)))
                });
            match surface {
                Ok(surface) => objects.surface = surface,
                Err(e) => {
                    engine_error!("gfx::vulkan", "{}", e);
                    Self::destroy_instance_objects(&objects);
                    return Err(e);
                }
            }
        }

        Ok(objects)
    }

    /// Teardown for failures before the shared context exists
    unsafe fn destroy_instance_objects(objects: &InstanceObjects) {
        if objects.surface != vk::SurfaceKHR::null() {
            objects.surface_loader.destroy_surface(objects.surface, None);
        }
        crate::debug::cleanup_debug_config();
        if let (Some(debug_utils), Some(messenger)) = (&objects.debug_utils_loader, objects.debug_messenger) {
            debug_utils.destroy_debug_utils_messenger(messenger, None);
        }
        objects.instance.destroy_instance(None);
    }

    unsafe fn select_physical_device(objects: &InstanceObjects) -> Result<DeviceCandidate> {
        let instance = &objects.instance;
        let surface = (objects.surface != vk::SurfaceKHR::null()).then_some(objects.surface);

        let physical_devices = instance.enumerate_physical_devices().map_err(|e| {
            engine_error!("gfx::vulkan", "Failed to enumerate physical devices: {:?}", e);
            Error::InitializationFailed(format!("Failed to enumerate physical devices: {:?}", e))
        })?;

        let mut best: Option<(u32, DeviceCandidate)> = None;
        for physical_device in physical_devices {
            let mut indexing = vk::PhysicalDeviceDescriptorIndexingProperties::default();
            let mut properties2 = vk::PhysicalDeviceProperties2::default().push_next(&mut indexing);
            instance.get_physical_device_properties2(physical_device, &mut properties2);
            let properties = properties2.properties;
            let name = properties
                .device_name_as_c_str()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();

            if properties.api_version < vk::API_VERSION_1_3 {
                engine_debug!("gfx::vulkan", "Skipping {}: Vulkan 1.3 not supported", name);
                continue;
            }

            let mut features12 = vk::PhysicalDeviceVulkan12Features::default();
            let mut features13 = vk::PhysicalDeviceVulkan13Features::default();
            let mut features2 = vk::PhysicalDeviceFeatures2::default()
                .push_next(&mut features12)
                .push_next(&mut features13);
            instance.get_physical_device_features2(physical_device, &mut features2);
            let sampler_anisotropy = features2.features.sampler_anisotropy == vk::TRUE;
            let missing = missing_features(&features12, &features13);
            if !missing.is_empty() {
                engine_debug!("gfx::vulkan", "Skipping {}: missing features {:?}", name, missing);
                continue;
            }

            if surface.is_some() {
                let extensions = instance
                    .enumerate_device_extension_properties(physical_device)
                    .unwrap_or_default();
                let has_swapchain = extensions
                    .iter()
                    .any(|ext| ext.extension_name_as_c_str().is_ok_and(|ext_name| ext_name == ash::khr::swapchain::NAME));
                if !has_swapchain {
                    engine_debug!("gfx::vulkan", "Skipping {}: no swapchain support", name);
                    continue;
                }
            }

            let queue_families = instance.get_physical_device_queue_family_properties(physical_device);
            let queue_family = queue_families.iter().enumerate().find_map(|(index, family)| {
                let index = index as u32;
                let capable = family.queue_flags.contains(vk::QueueFlags::GRAPHICS | vk::QueueFlags::COMPUTE);
                let presents = match surface {
                    Some(surface) => objects
                        .surface_loader
                        .get_physical_device_surface_support(physical_device, index, surface)
                        .unwrap_or(false),
                    None => true,
                };
                (capable && presents).then_some(index)
            });
            let Some(queue_family) = queue_family else {
                engine_debug!("gfx::vulkan", "Skipping {}: no graphics+compute queue that can present", name);
                continue;
            };

            let score = device_type_score(properties.device_type);
            if best.as_ref().map_or(true, |(best_score, _)| score > *best_score) {
                // Detach the properties chain before keeping it
                let indexing = vk::PhysicalDeviceDescriptorIndexingProperties {
                    p_next: std::ptr::null_mut(),
                    ..indexing
                };
                best = Some((
                    score,
                    DeviceCandidate {
                        physical_device,
                        queue_family,
                        properties,
                        indexing,
                        sampler_anisotropy,
                    },
                ));
            }
        }

        best.map(|(_, candidate)| candidate).ok_or_else(|| {
            engine_error!("gfx::vulkan", "No GPU supports Vulkan 1.3 with bindless descriptors");
            Error::InitializationFailed("No suitable Vulkan 1.3 GPU found".to_string())
        })
    }

    unsafe fn create_device(objects: &InstanceObjects) -> Result<DeviceObjects> {
        let candidate = Self::select_physical_device(objects)?;
        let instance = &objects.instance;

        let queue_priorities = [1.0];
        let queue_create_infos = [vk::DeviceQueueCreateInfo::default()
            .queue_family_index(candidate.queue_family)
            .queue_priorities(&queue_priorities)];

        let mut device_extension_names = Vec::new();
        if objects.surface != vk::SurfaceKHR::null() {
            device_extension_names.push(ash::khr::swapchain::NAME.as_ptr());
        }

        let mut features12 = vk::PhysicalDeviceVulkan12Features::default()
            .descriptor_indexing(true)
            .runtime_descriptor_array(true)
            .descriptor_binding_partially_bound(true)
            .descriptor_binding_update_unused_while_pending(true)
            .descriptor_binding_storage_buffer_update_after_bind(true)
            .descriptor_binding_sampled_image_update_after_bind(true)
            .descriptor_binding_storage_image_update_after_bind(true)
            .shader_sampled_image_array_non_uniform_indexing(true)
            .shader_storage_buffer_array_non_uniform_indexing(true)
            .buffer_device_address(true);
        let mut features13 = vk::PhysicalDeviceVulkan13Features::default()
            .dynamic_rendering(true)
            .synchronization2(true);
        let base_features = vk::PhysicalDeviceFeatures::default()
            .sampler_anisotropy(candidate.sampler_anisotropy);
        let mut features2 = vk::PhysicalDeviceFeatures2::default()
            .features(base_features)
            .push_next(&mut features12)
            .push_next(&mut features13);

        let device_create_info = vk::DeviceCreateInfo::default()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&device_extension_names)
            .push_next(&mut features2);

        let device = instance
            .create_device(candidate.physical_device, &device_create_info, None)
            .map_err(|e| {
                engine_error!("gfx::vulkan", "Failed to create logical device: {:?}", e);
                Error::InitializationFailed(format!("Failed to create device: {:?}", e))
            })?;

        let graphics_queue = device.get_device_queue(candidate.queue_family, 0);

        let allocator = match Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: device.clone(),
            physical_device: candidate.physical_device,
            debug_settings: Default::default(),
            buffer_device_address: true,
            allocation_sizes: Default::default(),
        }) {
            Ok(allocator) => allocator,
            Err(e) => {
                device.destroy_device(None);
                engine_error!("gfx::vulkan", "Failed to create GPU allocator: {:?}", e);
                return Err(Error::InitializationFailed(format!("Failed to create allocator: {:?}", e)));
            }
        };

        let upload_pool_create_info = vk::CommandPoolCreateInfo::default()
            .queue_family_index(candidate.queue_family)
            .flags(vk::CommandPoolCreateFlags::TRANSIENT | vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);
        let upload_command_pool = match device.create_command_pool(&upload_pool_create_info, None) {
            Ok(pool) => pool,
            Err(e) => {
                drop(allocator);
                device.destroy_device(None);
                engine_error!("gfx::vulkan", "Failed to create upload command pool: {:?}", e);
                return Err(Error::InitializationFailed(format!("Failed to create upload command pool: {:?}", e)));
            }
        };

        Ok(DeviceObjects {
            device,
            candidate,
            graphics_queue,
            allocator,
            upload_command_pool,
        })
    }

    /// Shared GPU context, for code that talks to Vulkan directly
    pub fn gpu_context(&self) -> &Arc<GpuContext> {
        &self.ctx
    }

    fn lock_frames(&self) -> MutexGuard<'_, FrameFences> {
        self.frames.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// An unsignaled fence from the pool, or a new one
    fn take_fence(&self) -> Result<vk::Fence> {
        if let Some(fence) = self.lock_frames().pool.pop() {
            return Ok(fence);
        }
        unsafe {
            self.ctx.device.create_fence(&vk::FenceCreateInfo::default(), None)
                .map_err(|e| engine_err!("gfx::vulkan", "Failed to create submit fence: {:?}", e))
        }
    }

    /// Reset signaled fences and return them to the pool
    fn recycle_fences(&self, fences: Vec<vk::Fence>) -> Result<()> {
        if fences.is_empty() {
            return Ok(());
        }
        unsafe {
            self.ctx.device.reset_fences(&fences)
                .map_err(|e| engine_err!("gfx::vulkan", "Failed to reset submit fences: {:?}", e))?;
        }
        self.lock_frames().pool.extend(fences);
        Ok(())
    }

    fn queue_submit(&self, submit_info: vk::SubmitInfo2<'_>, fence: vk::Fence) -> Result<()> {
        let _queue = self.ctx.lock_queue();
        unsafe {
            self.ctx.device
                .queue_submit2(self.ctx.graphics_queue, &[submit_info], fence)
                .map_err(|e| match e {
                    vk::Result::ERROR_OUT_OF_DEVICE_MEMORY | vk::Result::ERROR_OUT_OF_HOST_MEMORY => {
                        engine_error!("gfx::vulkan", "Out of memory during queue submit: {:?}", e);
                        Error::OutOfMemory
                    }
                    e => engine_err!("gfx::vulkan", "Queue submit failed: {:?}", e),
                })
        }
    }

    fn vulkan_command_buffer(command_buffer: &dyn RawCommandBuffer) -> Result<&VulkanCommandBuffer> {
        let command_buffer = command_buffer
            .as_any()
            .downcast_ref::<VulkanCommandBuffer>()
            .ok_or_else(|| Error::InvalidResource("command buffer was not created by the Vulkan backend".to_string()))?;
        if command_buffer.is_recording() {
            return Err(Error::InvalidResource("command buffer submitted while recording".to_string()));
        }
        Ok(command_buffer)
    }
}

impl GraphicsDevice for VulkanGraphicsDevice {
    fn api(&self) -> Api {
        Api::Vulkan
    }

    fn hardware_support(&self) -> HardwareSupport {
        self.support.clone()
    }

    fn format_support(&self, format: Format) -> FormatSupport {
        if format == Format::Undefined {
            return FormatSupport::empty();
        }
        let mut cache = self.format_cache.lock().unwrap_or_else(|e| e.into_inner());
        *cache.entry(format).or_insert_with(|| unsafe {
            let properties = self
                .ctx
                .instance()
                .get_physical_device_format_properties(self.ctx.physical_device, format_to_vk(format));
            format_support_from_vk(&properties)
        })
    }

    fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    // ===== FACTORIES =====

    fn create_buffer(&self, info: &BufferCreateInfo) -> Result<Box<dyn RawBuffer>> {
        let buffer = VulkanBuffer::new(Arc::clone(&self.ctx), info, self.support.host_visible_device_memory)?;
        Ok(Box::new(buffer))
    }

    fn create_texture(&self, info: &TextureCreateInfo) -> Result<Box<dyn RawTexture>> {
        Ok(Box::new(VulkanTexture::new(Arc::clone(&self.ctx), info)?))
    }

    fn create_sampler(&self, info: &SamplerCreateInfo) -> Result<Box<dyn RawSampler>> {
        Ok(Box::new(VulkanSampler::new(Arc::clone(&self.ctx), info)?))
    }

    fn create_shader(&self, info: &ShaderCreateInfo) -> Result<Box<dyn RawShader>> {
        Ok(Box::new(VulkanShader::new(Arc::clone(&self.ctx), info)?))
    }

    fn create_graphics_pipeline(&self, info: &GraphicsPipelineCreateInfo) -> Result<Box<dyn RawPipeline>> {
        Ok(Box::new(VulkanPipeline::graphics(Arc::clone(&self.ctx), self.pipeline_layout, info)?))
    }

    fn create_compute_pipeline(&self, info: &ComputePipelineCreateInfo) -> Result<Box<dyn RawPipeline>> {
        Ok(Box::new(VulkanPipeline::compute(Arc::clone(&self.ctx), self.pipeline_layout, info)?))
    }

    fn create_swapchain(&self, info: &SwapchainCreateInfo) -> Result<Box<dyn RawSwapchain>> {
        Ok(Box::new(VulkanSwapchain::new(Arc::clone(&self.ctx), info, self.frames_in_flight)?))
    }

    fn create_command_buffer(&self) -> Result<Box<dyn RawCommandBuffer>> {
        Ok(Box::new(VulkanCommandBuffer::new(
            Arc::clone(&self.ctx),
            self.pipeline_layout,
            self.bindless.set,
        )?))
    }

    fn create_fence(&self, signaled: bool) -> Result<Box<dyn RawFence>> {
        Ok(Box::new(VulkanFence::new(Arc::clone(&self.ctx), signaled)?))
    }

    // ===== BINDLESS DESCRIPTORS =====

    fn bindless_capacity(&self) -> u32 {
        self.bindless.capacity()
    }

    fn write_buffer_descriptor(&self, id: BufferId, buffer: &dyn RawBuffer) {
        match buffer.as_any().downcast_ref::<VulkanBuffer>() {
            Some(buffer) => self.bindless.write_buffer(id.index(), buffer.buffer),
            None => engine_error!("gfx::vulkan", "Buffer {} was not created by the Vulkan backend", id.index()),
        }
    }

    fn write_texture_descriptor(&self, id: TextureId, texture: &dyn RawTexture, aspect: TextureAspect, usage: TextureUsage) {
        let Some(texture) = texture.as_any().downcast_ref::<VulkanTexture>() else {
            engine_error!("gfx::vulkan", "Texture {} was not created by the Vulkan backend", id.index());
            return;
        };
        if usage.contains(TextureUsage::SAMPLED) {
            let layout = match aspect {
                TextureAspect::Color => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
                TextureAspect::Depth | TextureAspect::Stencil => vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
            };
            self.bindless.write_sampled_texture(id.index(), texture.sampled_view(aspect), layout);
        }
        if usage.contains(TextureUsage::STORAGE) && aspect == TextureAspect::Color {
            self.bindless.write_storage_texture(id.index(), texture.storage_view);
        }
    }

    fn write_sampler_descriptor(&self, id: SamplerId, sampler: &dyn RawSampler) {
        match sampler.as_any().downcast_ref::<VulkanSampler>() {
            Some(sampler) => self.bindless.write_sampler(id.index(), sampler.sampler),
            None => engine_error!("gfx::vulkan", "Sampler {} was not created by the Vulkan backend", id.index()),
        }
    }

    fn clear_buffer_descriptor(&self, id: BufferId) {
        self.bindless.clear_buffer(id.index());
    }

    fn clear_texture_descriptor(&self, id: TextureId) {
        self.bindless.clear_texture(id.index());
    }

    fn clear_sampler_descriptor(&self, id: SamplerId) {
        self.bindless.clear_sampler(id.index());
    }

    // ===== SUBMISSION =====

    fn wait_for_frame(&self, frame: usize) -> Result<()> {
        let slot = frame % self.frames_in_flight;
        let fences = std::mem::take(&mut self.lock_frames().in_flight[slot]);
        if fences.is_empty() {
            return Ok(());
        }
        unsafe {
            if let Err(e) = self.ctx.device.wait_for_fences(&fences, true, u64::MAX) {
                // Keep them filed so a later wait retries
                self.lock_frames().in_flight[slot].extend(fences);
                return Err(engine_err!("gfx::vulkan", "Failed to wait for frame {}: {:?}", slot, e));
            }
        }
        self.recycle_fences(fences)
    }

    fn submit(&self, command_buffer: &dyn RawCommandBuffer, submission: Submission<'_>) -> Result<()> {
        let command_buffer = Self::vulkan_command_buffer(command_buffer)?;
        let swapchain = match submission.swapchain {
            Some(swapchain) => Some(
                swapchain
                    .as_any()
                    .downcast_ref::<VulkanSwapchain>()
                    .ok_or_else(|| Error::InvalidResource("swapchain was not created by the Vulkan backend".to_string()))?,
            ),
            None => None,
        };
        let user_fence = match submission.fence {
            Some(fence) => Some(
                fence
                    .as_any()
                    .downcast_ref::<VulkanFence>()
                    .ok_or_else(|| Error::InvalidResource("fence was not created by the Vulkan backend".to_string()))?,
            ),
            None => None,
        };

        let semaphores = swapchain.and_then(|swapchain| swapchain.submit_semaphores());
        let wait_infos: Vec<vk::SemaphoreSubmitInfo> = semaphores
            .iter()
            .map(|&(wait, _)| {
                vk::SemaphoreSubmitInfo::default()
                    .semaphore(wait)
                    .stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)
            })
            .collect();
        let signal_infos: Vec<vk::SemaphoreSubmitInfo> = semaphores
            .iter()
            .map(|&(_, signal)| {
                vk::SemaphoreSubmitInfo::default()
                    .semaphore(signal)
                    .stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)
            })
            .collect();
        let command_buffer_infos = [vk::CommandBufferSubmitInfo::default().command_buffer(command_buffer.command_buffer())];
        let submit_info = vk::SubmitInfo2::default()
            .wait_semaphore_infos(&wait_infos)
            .command_buffer_infos(&command_buffer_infos)
            .signal_semaphore_infos(&signal_infos);

        let fence = self.take_fence()?;
        if let Err(e) = self.queue_submit(submit_info, fence) {
            self.lock_frames().pool.push(fence);
            return Err(e);
        }
        self.lock_frames().in_flight[submission.frame % self.frames_in_flight].push(fence);

        if let Some(swapchain) = swapchain {
            if semaphores.is_some() {
                swapchain.mark_rendered();
            }
        }

        // Signals once everything submitted before it has completed
        if let Some(user_fence) = user_fence {
            self.queue_submit(vk::SubmitInfo2::default(), user_fence.fence)?;
        }
        Ok(())
    }

    fn submit_and_wait(&self, command_buffer: &dyn RawCommandBuffer) -> Result<()> {
        let command_buffer = Self::vulkan_command_buffer(command_buffer)?;
        let command_buffer_infos = [vk::CommandBufferSubmitInfo::default().command_buffer(command_buffer.command_buffer())];
        let submit_info = vk::SubmitInfo2::default().command_buffer_infos(&command_buffer_infos);

        let fence = self.take_fence()?;
        if let Err(e) = self.queue_submit(submit_info, fence) {
            self.lock_frames().pool.push(fence);
            return Err(e);
        }
        unsafe {
            self.ctx.device.wait_for_fences(&[fence], true, u64::MAX)
                .map_err(|e| engine_err!("gfx::vulkan", "Failed to wait for temporary submission: {:?}", e))?;
        }
        self.recycle_fences(vec![fence])
    }

    fn wait_idle(&self) -> Result<()> {
        {
            let _queue = self.ctx.lock_queue();
            unsafe {
                self.ctx.device.device_wait_idle()
                    .map_err(|e| engine_err!("gfx::vulkan", "Failed to wait for device idle: {:?}", e))?;
            }
        }
        let fences: Vec<vk::Fence> = self
            .lock_frames()
            .in_flight
            .iter_mut()
            .flat_map(std::mem::take)
            .collect();
        self.recycle_fences(fences)
    }
}

impl Drop for VulkanGraphicsDevice {
    fn drop(&mut self) {
        unsafe {
            {
                let _queue = self.ctx.lock_queue();
                self.ctx.device.device_wait_idle().ok();
            }

            let frames = self.frames.get_mut().unwrap_or_else(|e| e.into_inner());
            for fence in frames.pool.drain(..).chain(frames.in_flight.iter_mut().flat_map(std::mem::take)) {
                self.ctx.device.destroy_fence(fence, None);
            }
            self.ctx.device.destroy_pipeline_layout(self.pipeline_layout, None);
        }
        // The bindless table and the context drop after this; the device
        // itself goes with the last Arc<GpuContext>
    }
}

#[cfg(test)]
#[path = "vulkan_graphics_device_tests.rs"]
mod tests;
