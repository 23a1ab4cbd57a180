/// Graphics context - the entry point of the layer
///
/// Owns the backend device, the bindless resource manager, the queue and the
/// per-frame deletion queue. Every GPU object is created here and keeps the
/// context's shared state alive, so objects may outlive the `Context` value
/// itself; their release is then immediate instead of deferred.

use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::flags::FormatSupport;
use crate::graphics_device::{
    check_spirv_header, with_backend_registry, Api, Buffer, BufferCopy, BufferCreateInfo, BufferId, BufferSuballocator, CommandBuffer,
    ComputePipelineCreateInfo, ContextCreateInfo, DataDependency, Fence, Format, FrameBuffer, GpuCommand,
    GraphicsDevice, GraphicsPipelineCreateInfo, HardwareSupport, Pipeline, PipelineBindPoint, Queue, RawBuffer,
    RawCommandBuffer, RawFence, RawPipeline, RawSampler, RawShader, RawSwapchain, RawTexture, ResourceManager,
    Sampler, SamplerCreateInfo, SamplerId, Shader, ShaderCreateInfo, ShaderStage, Swapchain, SwapchainCreateInfo,
    Texture, TextureCreateInfo, TextureId, TextureInfo, TextureType,
};
use crate::utils::DeletionQueue;
use crate::{engine_debug, engine_error, engine_info, engine_trace};

// ============================================================================
// Deferred deletion
// ============================================================================

/// Backend object or bindless slot waiting for its frame slot to retire
pub(crate) enum PendingDeletion {
    Buffer(Box<dyn RawBuffer>),
    Texture(Box<dyn RawTexture>),
    Sampler(Box<dyn RawSampler>),
    Shader(Box<dyn RawShader>),
    Pipeline(Box<dyn RawPipeline>),
    Swapchain(Box<dyn RawSwapchain>),
    /// Native command buffer plus the resources its last recording used
    CommandBuffer {
        raw: Box<dyn RawCommandBuffer>,
        commands: Vec<GpuCommand>,
        dependencies: Vec<DataDependency>,
    },
    Fence(Box<dyn RawFence>),
    BufferId(BufferId),
    TextureId(TextureId),
    SamplerId(SamplerId),
}

/// State shared by the context and every object it created
pub(crate) struct ContextShared {
    pub(crate) device: Arc<dyn GraphicsDevice>,
    pub(crate) resources: ResourceManager,
    deletions: DeletionQueue<PendingDeletion>,
    frame_index: AtomicUsize,
    frames_in_flight: usize,
    /// Set once the `Context` is dropped: releases become immediate
    closed: AtomicBool,
}

impl ContextShared {
    fn new(device: Arc<dyn GraphicsDevice>) -> Self {
        let frames_in_flight = device.frames_in_flight().max(1);
        Self {
            resources: ResourceManager::new(Arc::clone(&device)),
            device,
            deletions: DeletionQueue::new(frames_in_flight),
            frame_index: AtomicUsize::new(0),
            frames_in_flight,
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn frame_index(&self) -> usize {
        self.frame_index.load(Ordering::Acquire)
    }

    pub(crate) fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    pub(crate) fn set_frame_index(&self, frame: usize) {
        self.frame_index.store(frame, Ordering::Release);
    }

    /// Queue `item` for release when the current frame slot comes around
    pub(crate) fn defer(&self, item: PendingDeletion) {
        if self.closed.load(Ordering::Acquire) {
            self.release(item);
        } else {
            self.deletions.push(self.frame_index(), item);
        }
    }

    /// Take every item queued for `frame` without releasing it
    pub(crate) fn take_deletions(&self, frame: usize) -> Vec<PendingDeletion> {
        self.deletions.drain(frame)
    }

    pub(crate) fn pending_deletions(&self, frame: usize) -> usize {
        self.deletions.pending(frame)
    }

    /// Release items in queue order; returns how many were released
    pub(crate) fn release_all(&self, items: Vec<PendingDeletion>) -> usize {
        let count = items.len();
        for item in items {
            self.release(item);
        }
        count
    }

    fn release(&self, item: PendingDeletion) {
        match item {
            PendingDeletion::BufferId(id) => self.resources.unbind_buffer(id),
            PendingDeletion::TextureId(id) => self.resources.unbind_texture(id),
            PendingDeletion::SamplerId(id) => self.resources.unbind_sampler(id),
            // Dropping the backend object destroys the native handles
            other => drop(other),
        }
    }

    /// Release everything queued in every slot, including items queued by
    /// releases themselves (resources kept alive by a command buffer)
    fn flush(&self) -> usize {
        let mut released = 0;
        loop {
            let items = self.deletions.drain_all();
            if items.is_empty() {
                return released;
            }
            released += self.release_all(items);
        }
    }
}

// ============================================================================
// Context
// ============================================================================

/// Graphics context
///
/// # Example
///
/// ```ignore
/// galaxy_gfx_vulkan::register();
/// let context = Context::create(&ContextCreateInfo::default())?;
/// let buffer = context.create_buffer(&BufferCreateInfo::mapped(256))?;
/// buffer.write(0, &[1, 2, 3, 4])?;
/// ```
pub struct Context {
    shared: Arc<ContextShared>,
    queue: Queue,
}

impl Context {
    /// Create a context with the backend registered for `info.api`
    ///
    /// Fails with `Error::UnsupportedApi` when no such backend is registered.
    pub fn create(info: &ContextCreateInfo) -> Result<Self> {
        info.validate()?;
        let device = with_backend_registry(|registry| registry.create_device(info))?;
        Self::from_device(device)
    }

    /// Wrap an already created backend device
    pub fn from_device(device: Box<dyn GraphicsDevice>) -> Result<Self> {
        let device: Arc<dyn GraphicsDevice> = Arc::from(device);
        let support = device.hardware_support();
        if !support.bindless {
            return Err(Error::InitializationFailed(format!(
                "device '{}' lacks descriptor indexing (bindless)",
                support.device_name
            )));
        }

        let shared = Arc::new(ContextShared::new(device));
        engine_info!(
            "gfx::Context",
            "Context created on '{}' ({:?}): {} frames in flight, {} bindless slots per kind",
            support.device_name,
            shared.device.api(),
            shared.frames_in_flight,
            shared.resources.capacity()
        );
        Ok(Self {
            queue: Queue::new(Arc::clone(&shared)),
            shared,
        })
    }

    // ===== QUERIES =====

    pub fn api(&self) -> Api {
        self.shared.device.api()
    }

    pub fn hardware_support(&self) -> HardwareSupport {
        self.shared.device.hardware_support()
    }

    /// Capabilities of `format` on this device
    pub fn format_support(&self, format: Format) -> FormatSupport {
        if format == Format::Undefined {
            return FormatSupport::empty();
        }
        self.shared.device.format_support(format)
    }

    pub fn queue(&self) -> &Queue {
        &self.queue
    }

    pub fn resource_manager(&self) -> &ResourceManager {
        &self.shared.resources
    }

    pub fn frames_in_flight(&self) -> usize {
        self.shared.frames_in_flight
    }

    pub fn frame_index(&self) -> usize {
        self.shared.frame_index()
    }

    /// Backend device (for backend-specific extensions)
    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.shared.device
    }

    // ===== BUFFERS =====

    pub fn create_buffer(&self, info: &BufferCreateInfo) -> Result<Arc<Buffer>> {
        if info.size == 0 {
            return Err(Error::InvalidResource("buffer size must be greater than 0".to_string()));
        }
        let raw = self.shared.device.create_buffer(info)?;
        let id = self.shared.resources.bind_buffer(raw.as_ref())?;
        engine_trace!("gfx::Context", "Created {} ({} bytes, {:?})", id, info.size, info.map_mode);
        Ok(Arc::new(Buffer::new(Arc::clone(&self.shared), raw, *info, id)))
    }

    /// Create a buffer filled with `data`
    ///
    /// Mapped buffers are written directly; device-local buffers are filled
    /// through a staging buffer and an out-of-band transfer that is waited on.
    pub fn create_buffer_with_data(&self, info: &BufferCreateInfo, data: &[u8]) -> Result<Arc<Buffer>> {
        if (data.len() as u64) > info.size {
            return Err(Error::InvalidResource(format!(
                "{} bytes of data do not fit a buffer of {} bytes",
                data.len(),
                info.size
            )));
        }
        let buffer = self.create_buffer(info)?;
        if data.is_empty() {
            return Ok(buffer);
        }
        if buffer.is_mapped() {
            buffer.write(0, data)?;
            return Ok(buffer);
        }

        let staging = self.create_buffer(&BufferCreateInfo::mapped(data.len() as u64))?;
        staging.write(0, data)?;
        let command_buffer = self.create_command_buffer()?;
        command_buffer.begin();
        command_buffer.copy_buffer(
            &staging,
            &buffer,
            BufferCopy {
                src_offset: 0,
                dst_offset: 0,
                size: data.len() as u64,
            },
        );
        command_buffer.end()?;
        self.queue.submit_temporary(&command_buffer)?;
        Ok(buffer)
    }

    /// Create a buffer carved into sub-ranges by a virtual allocator
    pub fn create_suballocator(&self, info: &BufferCreateInfo) -> Result<BufferSuballocator> {
        Ok(BufferSuballocator::new(self.create_buffer(info)?))
    }

    // ===== TEXTURES / SAMPLERS =====

    pub fn create_texture(&self, info: &TextureCreateInfo) -> Result<Arc<Texture>> {
        self.validate_texture(info)?;

        let sampler = match &info.sampler {
            Some(sampler_info) => Some(self.create_sampler(sampler_info)?),
            None => None,
        };
        let raw = self.shared.device.create_texture(info)?;
        let binding = self.shared.resources.bind_texture(raw.as_ref(), info.format, info.usage)?;
        engine_trace!(
            "gfx::Context",
            "Created texture {}x{}x{} {:?} (id {:?}, stencil id {:?})",
            info.extent.width,
            info.extent.height,
            info.extent.depth,
            info.format,
            binding.id,
            binding.stencil_id
        );
        Ok(Arc::new(Texture::new(
            Arc::clone(&self.shared),
            raw,
            TextureInfo::from(info),
            binding.id,
            binding.stencil_id,
            sampler,
        )))
    }

    fn validate_texture(&self, info: &TextureCreateInfo) -> Result<()> {
        let extent = info.extent;
        if extent.width == 0 || extent.height == 0 || extent.depth == 0 {
            return Err(Error::InvalidResource(format!(
                "texture extent {}x{}x{} has a zero dimension",
                extent.width, extent.height, extent.depth
            )));
        }
        if info.format == Format::Undefined {
            return Err(Error::InvalidResource("texture format is Undefined".to_string()));
        }
        if info.usage.is_empty() {
            return Err(Error::InvalidResource("texture usage is empty".to_string()));
        }
        if info.array_layers == 0 {
            return Err(Error::InvalidResource("texture needs at least one array layer".to_string()));
        }
        if info.mip_levels == 0 || info.mip_levels > extent.max_mip_levels() {
            return Err(Error::InvalidResource(format!(
                "mip level count {} outside 1..={}",
                info.mip_levels,
                extent.max_mip_levels()
            )));
        }
        match info.texture_type {
            TextureType::D1 if extent.height != 1 || extent.depth != 1 => {
                return Err(Error::InvalidResource("1D texture must have height and depth 1".to_string()));
            }
            TextureType::D2 if extent.depth != 1 => {
                return Err(Error::InvalidResource("2D texture must have depth 1".to_string()));
            }
            TextureType::D3 if info.array_layers != 1 => {
                return Err(Error::InvalidResource("3D texture cannot have array layers".to_string()));
            }
            TextureType::Cube if extent.width != extent.height || info.array_layers % 6 != 0 => {
                return Err(Error::InvalidResource(
                    "cube texture must be square with a multiple of 6 layers".to_string(),
                ));
            }
            _ => {}
        }

        let required = FormatSupport::required_for(info.usage);
        let supported = self.format_support(info.format);
        if !supported.contains(required) {
            return Err(Error::InvalidResource(format!(
                "format {:?} does not support {:?} (supports {:?})",
                info.format,
                required.difference(supported),
                supported
            )));
        }
        Ok(())
    }

    pub fn create_sampler(&self, info: &SamplerCreateInfo) -> Result<Arc<Sampler>> {
        let raw = self.shared.device.create_sampler(info)?;
        let id = self.shared.resources.bind_sampler(raw.as_ref())?;
        Ok(Arc::new(Sampler::new(Arc::clone(&self.shared), raw, *info, id)))
    }

    // ===== SHADERS / PIPELINES =====

    pub fn create_shader(&self, info: &ShaderCreateInfo) -> Result<Arc<Shader>> {
        if let Err(reason) = check_spirv_header(&info.code) {
            return Err(Error::InvalidResource(format!(
                "{:?} shader is not a SPIR-V module: {}",
                info.stage, reason
            )));
        }
        let raw = self.shared.device.create_shader(info)?;
        Ok(Arc::new(Shader::new(
            Arc::clone(&self.shared),
            raw,
            info.stage,
            info.entry_point.clone(),
        )))
    }

    /// Load a `.spv` file and create a shader from it
    pub fn load_shader(&self, path: impl AsRef<Path>, stage: ShaderStage) -> Result<Arc<Shader>> {
        let code = crate::graphics_device::read_spirv_file(path)?;
        self.create_shader(&ShaderCreateInfo::new(code, stage))
    }

    pub fn create_graphics_pipeline(&self, info: &GraphicsPipelineCreateInfo) -> Result<Arc<Pipeline>> {
        if info.vertex.stage() != ShaderStage::Vertex {
            return Err(Error::InvalidResource(format!(
                "vertex slot holds a {:?} shader",
                info.vertex.stage()
            )));
        }
        if let Some(fragment) = &info.fragment {
            if fragment.stage() != ShaderStage::Fragment {
                return Err(Error::InvalidResource(format!(
                    "fragment slot holds a {:?} shader",
                    fragment.stage()
                )));
            }
        }
        if info.blend.len() != info.color_formats.len() {
            return Err(Error::InvalidResource(format!(
                "{} blend states for {} color attachments",
                info.blend.len(),
                info.color_formats.len()
            )));
        }
        if let Some(format) = info.depth_format {
            if !format.is_depth_stencil() {
                return Err(Error::InvalidResource(format!("{:?} is not a depth format", format)));
            }
        }

        let reflected = info
            .fragment
            .iter()
            .map(|shader| shader.push_constant_size())
            .fold(info.vertex.push_constant_size(), u32::max);
        let push_constant_size = self.resolve_push_constant_size(info.push_constant_size, reflected)?;

        let raw = self.shared.device.create_graphics_pipeline(info)?;
        engine_debug!(
            "gfx::Context",
            "Graphics pipeline created ({} color targets, {} push constant bytes)",
            info.color_formats.len(),
            push_constant_size
        );
        Ok(Arc::new(Pipeline::new(
            Arc::clone(&self.shared),
            raw,
            PipelineBindPoint::Graphics,
            push_constant_size,
        )))
    }

    pub fn create_compute_pipeline(&self, info: &ComputePipelineCreateInfo) -> Result<Arc<Pipeline>> {
        if info.shader.stage() != ShaderStage::Compute {
            return Err(Error::InvalidResource(format!(
                "compute pipeline given a {:?} shader",
                info.shader.stage()
            )));
        }
        let push_constant_size =
            self.resolve_push_constant_size(info.push_constant_size, info.shader.push_constant_size())?;
        let raw = self.shared.device.create_compute_pipeline(info)?;
        Ok(Arc::new(Pipeline::new(
            Arc::clone(&self.shared),
            raw,
            PipelineBindPoint::Compute,
            push_constant_size,
        )))
    }

    fn resolve_push_constant_size(&self, requested: u32, reflected: u32) -> Result<u32> {
        let size = if requested == 0 { reflected } else { requested };
        let max = self.shared.device.hardware_support().max_push_constant_size;
        if size > max {
            return Err(Error::InvalidResource(format!(
                "{} push constant bytes exceed the device limit of {}",
                size, max
            )));
        }
        Ok(size)
    }

    // ===== PRESENTATION / COMMANDS / SYNC =====

    pub fn create_frame_buffer(&self, color: Vec<Arc<Texture>>, depth: Option<Arc<Texture>>) -> Result<Arc<FrameBuffer>> {
        Ok(Arc::new(FrameBuffer::new(color, depth)?))
    }

    pub fn create_swapchain(&self, info: &SwapchainCreateInfo) -> Result<Arc<Swapchain>> {
        let raw = self.shared.device.create_swapchain(info)?;
        engine_info!(
            "gfx::Context",
            "Swapchain created: {}x{} {:?}, {} images",
            raw.extent().width,
            raw.extent().height,
            raw.format(),
            raw.image_count()
        );
        Ok(Arc::new(Swapchain::new(Arc::clone(&self.shared), raw)))
    }

    pub fn create_command_buffer(&self) -> Result<Arc<CommandBuffer>> {
        let raw = self.shared.device.create_command_buffer()?;
        Ok(Arc::new(CommandBuffer::new(Arc::clone(&self.shared), raw)))
    }

    pub fn create_fence(&self, signaled: bool) -> Result<Arc<Fence>> {
        let raw = self.shared.device.create_fence(signaled)?;
        Ok(Arc::new(Fence::new(Arc::clone(&self.shared), raw)))
    }

    // ===== DELETION =====

    /// Release everything queued for frame slot `frame`
    ///
    /// Only call once the GPU work of that slot has completed;
    /// `Queue::start_next_frame` does this for the slot it enters.
    pub fn process_deletions(&self, frame: usize) -> usize {
        let items = self.shared.take_deletions(frame);
        self.shared.release_all(items)
    }

    /// Items queued for frame slot `frame`
    pub fn pending_deletions(&self, frame: usize) -> usize {
        self.shared.pending_deletions(frame)
    }

    pub fn wait_idle(&self) -> Result<()> {
        self.shared.device.wait_idle()
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        if let Err(e) = self.shared.device.wait_idle() {
            engine_error!("gfx::Context", "wait_idle failed during shutdown: {}", e);
        }
        self.shared.closed.store(true, Ordering::Release);
        let released = self.shared.flush();
        engine_info!("gfx::Context", "Context destroyed ({} pending deletions flushed)", released);
    }
}

#[cfg(test)]
#[path = "context_tests.rs"]
mod tests;
