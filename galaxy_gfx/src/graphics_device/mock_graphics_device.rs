/// Mock graphics device for unit tests (no GPU required)
///
/// Every native call is appended as a line of text to a shared call log, so
/// tests can assert on exactly what the frontend asked the backend to do
/// (descriptor writes, destructions, submissions, encoded commands).

use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::flags::{FormatSupport, TextureUsage};
use crate::graphics_device::{
    Api, BufferCreateInfo, BufferId, ComputePipelineCreateInfo, Context, Extent3D, Format, GpuCommand, GraphicsDevice,
    GraphicsPipelineCreateInfo, HardwareSupport, MapMode, RawBuffer, RawCommandBuffer, RawFence, RawPipeline,
    RawSampler, RawShader, RawSwapchain, RawTexture, SamplerCreateInfo, SamplerId, ShaderCreateInfo, Submission,
    SwapchainCreateInfo, TextureAspect, TextureCreateInfo, TextureId, SPIRV_MAGIC,
};

// ============================================================================
// Call log
// ============================================================================

/// Shared, ordered log of native calls
#[derive(Clone, Debug, Default)]
pub struct MockCalls(Arc<Mutex<Vec<String>>>);

impl MockCalls {
    pub fn push(&self, call: String) {
        self.0.lock().unwrap().push(call);
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    /// Calls starting with `prefix`
    pub fn matching(&self, prefix: &str) -> Vec<String> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn contains(&self, call: &str) -> bool {
        self.0.lock().unwrap().iter().any(|c| c == call)
    }
}

// ============================================================================
// Mock objects
// ============================================================================

#[derive(Debug)]
pub struct MockBuffer {
    pub handle: u64,
    pub mapped: bool,
    memory: Mutex<Vec<u8>>,
    calls: MockCalls,
}

impl RawBuffer for MockBuffer {
    fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        let mut memory = self.memory.lock().unwrap();
        let start = offset as usize;
        memory[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn read(&self, offset: u64, out: &mut [u8]) -> Result<()> {
        let memory = self.memory.lock().unwrap();
        let start = offset as usize;
        out.copy_from_slice(&memory[start..start + out.len()]);
        Ok(())
    }

    fn is_mapped(&self) -> bool {
        self.mapped
    }

    fn device_address(&self) -> u64 {
        self.handle << 32
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockBuffer {
    fn drop(&mut self) {
        self.calls.push(format!("destroy_buffer #{}", self.handle));
    }
}

#[derive(Debug)]
pub struct MockTexture {
    pub handle: u64,
    /// False for swapchain images
    pub owned: bool,
    calls: MockCalls,
}

impl RawTexture for MockTexture {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockTexture {
    fn drop(&mut self) {
        if self.owned {
            self.calls.push(format!("destroy_texture #{}", self.handle));
        }
    }
}

#[derive(Debug)]
pub struct MockSampler {
    pub handle: u64,
    calls: MockCalls,
}

impl RawSampler for MockSampler {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockSampler {
    fn drop(&mut self) {
        self.calls.push(format!("destroy_sampler #{}", self.handle));
    }
}

#[derive(Debug)]
pub struct MockShader {
    pub handle: u64,
    pub push_constant_size: u32,
    calls: MockCalls,
}

impl RawShader for MockShader {
    fn push_constant_size(&self) -> u32 {
        self.push_constant_size
    }

    fn entry_points(&self) -> Vec<String> {
        vec!["main".to_string()]
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockShader {
    fn drop(&mut self) {
        self.calls.push(format!("destroy_shader #{}", self.handle));
    }
}

#[derive(Debug)]
pub struct MockPipeline {
    pub handle: u64,
    calls: MockCalls,
}

impl RawPipeline for MockPipeline {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockPipeline {
    fn drop(&mut self) {
        self.calls.push(format!("destroy_pipeline #{}", self.handle));
    }
}

#[derive(Debug)]
pub struct MockFence {
    pub handle: u64,
    signaled: AtomicBool,
    calls: MockCalls,
}

impl RawFence for MockFence {
    fn wait(&self, _timeout_ns: u64) -> Result<bool> {
        Ok(self.signaled.load(Ordering::SeqCst))
    }

    fn reset(&self) -> Result<()> {
        self.signaled.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_signaled(&self) -> Result<bool> {
        Ok(self.signaled.load(Ordering::SeqCst))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockFence {
    fn drop(&mut self) {
        self.calls.push(format!("destroy_fence #{}", self.handle));
    }
}

#[derive(Debug)]
pub struct MockCommandBuffer {
    pub handle: u64,
    recording: bool,
    fail_encode: Arc<AtomicBool>,
    calls: MockCalls,
}

impl MockCommandBuffer {
    /// Log a native call issued from a user-defined command
    pub fn native(&mut self, call: &str) {
        self.calls.push(format!("cmd #{} native {}", self.handle, call));
    }
}

fn texture_handle(texture: &crate::graphics_device::Texture) -> u64 {
    texture
        .raw()
        .as_any()
        .downcast_ref::<MockTexture>()
        .map_or(0, |texture| texture.handle)
}

fn buffer_handle(buffer: &crate::graphics_device::Buffer) -> u64 {
    buffer
        .raw()
        .as_any()
        .downcast_ref::<MockBuffer>()
        .map_or(0, |buffer| buffer.handle)
}

fn describe(command: &GpuCommand) -> String {
    match command {
        GpuCommand::Draw { vertex_count, instance_count, first_vertex, first_instance } => {
            format!("draw {} {} {} {}", vertex_count, instance_count, first_vertex, first_instance)
        }
        GpuCommand::DrawIndexed { index_count, instance_count, first_index, vertex_offset, first_instance } => {
            format!(
                "draw_indexed {} {} {} {} {}",
                index_count, instance_count, first_index, vertex_offset, first_instance
            )
        }
        GpuCommand::Dispatch { x, y, z } => format!("dispatch {} {} {}", x, y, z),
        GpuCommand::TextureBarrier { texture, old_layout, new_layout, .. } => {
            format!("texture_barrier #{} {:?} -> {:?}", texture_handle(texture), old_layout, new_layout)
        }
        GpuCommand::BufferBarrier { buffer, .. } => format!("buffer_barrier #{}", buffer_handle(buffer)),
        GpuCommand::Blit { src, dst, .. } => {
            format!("blit #{} -> #{}", texture_handle(src), texture_handle(dst))
        }
        GpuCommand::SetViewport(viewport) => format!("set_viewport {}x{}", viewport.width, viewport.height),
        GpuCommand::SetScissor(rect) => format!("set_scissor {}x{}", rect.width, rect.height),
        GpuCommand::ClearTexture { texture, .. } => format!("clear_texture #{}", texture_handle(texture)),
        GpuCommand::BeginRendering { frame_buffer, .. } => format!(
            "begin_rendering {} color {}",
            frame_buffer.width(),
            frame_buffer.color_attachments().len()
        ),
        GpuCommand::EndRendering => "end_rendering".to_string(),
        GpuCommand::CopyBuffer { src, dst, region } => format!(
            "copy_buffer #{} -> #{} {} bytes",
            buffer_handle(src),
            buffer_handle(dst),
            region.size
        ),
        GpuCommand::CopyBufferToTexture { buffer, texture, .. } => {
            format!("copy_buffer_to_texture #{} -> #{}", buffer_handle(buffer), texture_handle(texture))
        }
        GpuCommand::CopyTextureToBuffer { texture, buffer, .. } => {
            format!("copy_texture_to_buffer #{} -> #{}", texture_handle(texture), buffer_handle(buffer))
        }
        GpuCommand::BindPipeline(_) => "bind_pipeline".to_string(),
        GpuCommand::PushConstants { offset, data } => format!("push_constants {} {:?}", offset, data),
        GpuCommand::BindIndexBuffer { buffer, index_type, .. } => {
            format!("bind_index_buffer #{} {:?}", buffer_handle(buffer), index_type)
        }
        GpuCommand::BindVertexBuffer { binding, buffer, .. } => {
            format!("bind_vertex_buffer {} #{}", binding, buffer_handle(buffer))
        }
        GpuCommand::UserDefined(_) => "user_defined".to_string(),
    }
}

impl RawCommandBuffer for MockCommandBuffer {
    fn begin(&mut self) -> Result<()> {
        if self.recording {
            self.calls.push(format!("cmd #{} begin while recording", self.handle));
            return Err(Error::BackendError("mock command buffer already recording".to_string()));
        }
        self.recording = true;
        self.calls.push(format!("cmd #{} begin", self.handle));
        Ok(())
    }

    fn encode(&mut self, command: &GpuCommand) -> Result<()> {
        if self.fail_encode.load(Ordering::SeqCst) {
            self.calls.push(format!("cmd #{} {} failed", self.handle, describe(command)));
            return Err(Error::BackendError(format!("mock encode of {} failed", command.name())));
        }
        self.calls.push(format!("cmd #{} {}", self.handle, describe(command)));
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        self.recording = false;
        self.calls.push(format!("cmd #{} end", self.handle));
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for MockCommandBuffer {
    fn drop(&mut self) {
        self.calls.push(format!("destroy_command_buffer #{}", self.handle));
    }
}

#[derive(Debug)]
pub struct MockSwapchain {
    pub handle: u64,
    extent: Extent3D,
    format: Format,
    image_count: u32,
    next_image: u32,
    out_of_date: Arc<AtomicBool>,
    next_handle: Arc<AtomicU64>,
    calls: MockCalls,
}

impl RawSwapchain for MockSwapchain {
    fn acquire_next_image(&mut self) -> Result<u32> {
        if self.out_of_date.load(Ordering::SeqCst) {
            self.calls.push(format!("swapchain #{} acquire out_of_date", self.handle));
            return Err(Error::SwapchainOutOfDate);
        }
        let index = self.next_image;
        self.next_image = (self.next_image + 1) % self.image_count;
        self.calls.push(format!("swapchain #{} acquire {}", self.handle, index));
        Ok(index)
    }

    fn present(&mut self, image_index: u32) -> Result<()> {
        if self.out_of_date.load(Ordering::SeqCst) {
            self.calls.push(format!("swapchain #{} present out_of_date", self.handle));
            return Err(Error::SwapchainOutOfDate);
        }
        self.calls.push(format!("swapchain #{} present {}", self.handle, image_index));
        Ok(())
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        self.out_of_date.store(false, Ordering::SeqCst);
        self.extent = Extent3D::d2(width, height);
        self.next_image = 0;
        self.calls.push(format!("swapchain #{} recreate {}x{}", self.handle, width, height));
        Ok(())
    }

    fn image_textures(&self) -> Vec<Box<dyn RawTexture>> {
        (0..self.image_count)
            .map(|_| {
                Box::new(MockTexture {
                    handle: self.next_handle.fetch_add(1, Ordering::SeqCst),
                    owned: false,
                    calls: self.calls.clone(),
                }) as Box<dyn RawTexture>
            })
            .collect()
    }

    fn extent(&self) -> Extent3D {
        self.extent
    }

    fn format(&self) -> Format {
        self.format
    }

    fn image_count(&self) -> usize {
        self.image_count as usize
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for MockSwapchain {
    fn drop(&mut self) {
        self.calls.push(format!("destroy_swapchain #{}", self.handle));
    }
}

// ============================================================================
// Mock device
// ============================================================================

pub struct MockGraphicsDevice {
    calls: MockCalls,
    next_handle: Arc<AtomicU64>,
    frames_in_flight: usize,
    bindless_capacity: AtomicU32,
    support: HardwareSupport,
    out_of_date: Arc<AtomicBool>,
    fail_encode: Arc<AtomicBool>,
}

impl MockGraphicsDevice {
    pub fn new() -> Self {
        Self {
            calls: MockCalls::default(),
            next_handle: Arc::new(AtomicU64::new(1)),
            frames_in_flight: 2,
            bindless_capacity: AtomicU32::new(1024),
            support: HardwareSupport {
                device_name: "Mock Device".to_string(),
                bindless: true,
                buffer_device_address: true,
                max_bindless_resources: 1024,
                max_anisotropy: 16.0,
                max_push_constant_size: 128,
                host_visible_device_memory: false,
            },
            out_of_date: Arc::new(AtomicBool::new(false)),
            fail_encode: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_frames_in_flight(mut self, frames: usize) -> Self {
        self.frames_in_flight = frames;
        self
    }

    pub fn with_bindless_capacity(self, capacity: u32) -> Self {
        self.bindless_capacity.store(capacity, Ordering::SeqCst);
        self
    }

    pub fn with_support(mut self, support: HardwareSupport) -> Self {
        self.support = support;
        self
    }

    /// Handle to the call log (stays valid after the device is boxed)
    pub fn calls(&self) -> MockCalls {
        self.calls.clone()
    }

    /// Flag making acquire/present fail with `SwapchainOutOfDate` until the
    /// swapchain is recreated
    pub fn out_of_date_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.out_of_date)
    }

    /// Flag making every command buffer encode fail with `BackendError`
    pub fn fail_encode_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.fail_encode)
    }

    fn handle(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::SeqCst)
    }
}

impl Default for MockGraphicsDevice {
    fn default() -> Self {
        Self::new()
    }
}

fn raw_handle<T: 'static>(object: &dyn Any, handle: impl Fn(&T) -> u64) -> u64 {
    object.downcast_ref::<T>().map_or(0, handle)
}

impl GraphicsDevice for MockGraphicsDevice {
    fn api(&self) -> Api {
        Api::Custom("mock")
    }

    fn hardware_support(&self) -> HardwareSupport {
        self.support.clone()
    }

    fn format_support(&self, format: Format) -> FormatSupport {
        let transfer = FormatSupport::TRANSFER_SRC | FormatSupport::TRANSFER_DST;
        if format == Format::Undefined {
            FormatSupport::empty()
        } else if format.is_depth_stencil() {
            FormatSupport::SAMPLED | FormatSupport::DEPTH_STENCIL_ATTACHMENT | transfer
        } else if format.is_compressed() {
            FormatSupport::SAMPLED | FormatSupport::SAMPLED_LINEAR_FILTER | transfer
        } else {
            FormatSupport::all() - FormatSupport::DEPTH_STENCIL_ATTACHMENT
        }
    }

    fn frames_in_flight(&self) -> usize {
        self.frames_in_flight
    }

    fn create_buffer(&self, info: &BufferCreateInfo) -> Result<Box<dyn RawBuffer>> {
        let handle = self.handle();
        let mapped = match info.map_mode {
            MapMode::Always => true,
            MapMode::Never => false,
            MapMode::IfOptimal => self.support.host_visible_device_memory,
        };
        self.calls.push(format!("create_buffer #{} {}", handle, info.size));
        Ok(Box::new(MockBuffer {
            handle,
            mapped,
            memory: Mutex::new(vec![0; info.size as usize]),
            calls: self.calls.clone(),
        }))
    }

    fn create_texture(&self, info: &TextureCreateInfo) -> Result<Box<dyn RawTexture>> {
        let handle = self.handle();
        self.calls.push(format!(
            "create_texture #{} {}x{} {:?}",
            handle, info.extent.width, info.extent.height, info.format
        ));
        Ok(Box::new(MockTexture {
            handle,
            owned: true,
            calls: self.calls.clone(),
        }))
    }

    fn create_sampler(&self, _info: &SamplerCreateInfo) -> Result<Box<dyn RawSampler>> {
        let handle = self.handle();
        self.calls.push(format!("create_sampler #{}", handle));
        Ok(Box::new(MockSampler {
            handle,
            calls: self.calls.clone(),
        }))
    }

    fn create_shader(&self, info: &ShaderCreateInfo) -> Result<Box<dyn RawShader>> {
        let handle = self.handle();
        self.calls.push(format!("create_shader #{} {:?}", handle, info.stage));
        // Word 1 doubles as the reflected push-constant size in test modules
        Ok(Box::new(MockShader {
            handle,
            push_constant_size: info.code.get(1).copied().unwrap_or(0),
            calls: self.calls.clone(),
        }))
    }

    fn create_graphics_pipeline(&self, _info: &GraphicsPipelineCreateInfo) -> Result<Box<dyn RawPipeline>> {
        let handle = self.handle();
        self.calls.push(format!("create_graphics_pipeline #{}", handle));
        Ok(Box::new(MockPipeline {
            handle,
            calls: self.calls.clone(),
        }))
    }

    fn create_compute_pipeline(&self, _info: &ComputePipelineCreateInfo) -> Result<Box<dyn RawPipeline>> {
        let handle = self.handle();
        self.calls.push(format!("create_compute_pipeline #{}", handle));
        Ok(Box::new(MockPipeline {
            handle,
            calls: self.calls.clone(),
        }))
    }

    fn create_swapchain(&self, info: &SwapchainCreateInfo) -> Result<Box<dyn RawSwapchain>> {
        let handle = self.handle();
        self.calls.push(format!("create_swapchain #{}", handle));
        Ok(Box::new(MockSwapchain {
            handle,
            extent: info.extent,
            format: info.format,
            image_count: info.image_count.max(2),
            next_image: 0,
            out_of_date: Arc::clone(&self.out_of_date),
            next_handle: Arc::clone(&self.next_handle),
            calls: self.calls.clone(),
        }))
    }

    fn create_command_buffer(&self) -> Result<Box<dyn RawCommandBuffer>> {
        let handle = self.handle();
        self.calls.push(format!("create_command_buffer #{}", handle));
        Ok(Box::new(MockCommandBuffer {
            handle,
            recording: false,
            fail_encode: Arc::clone(&self.fail_encode),
            calls: self.calls.clone(),
        }))
    }

    fn create_fence(&self, signaled: bool) -> Result<Box<dyn RawFence>> {
        let handle = self.handle();
        self.calls.push(format!("create_fence #{}", handle));
        Ok(Box::new(MockFence {
            handle,
            signaled: AtomicBool::new(signaled),
            calls: self.calls.clone(),
        }))
    }

    fn bindless_capacity(&self) -> u32 {
        self.bindless_capacity.load(Ordering::SeqCst)
    }

    fn write_buffer_descriptor(&self, id: BufferId, buffer: &dyn RawBuffer) {
        let handle = raw_handle::<MockBuffer>(buffer.as_any(), |b| b.handle);
        self.calls.push(format!("write_buffer_descriptor {} -> #{}", id.index(), handle));
    }

    fn write_texture_descriptor(&self, id: TextureId, texture: &dyn RawTexture, aspect: TextureAspect, usage: TextureUsage) {
        let handle = raw_handle::<MockTexture>(texture.as_any(), |t| t.handle);
        if usage.contains(TextureUsage::SAMPLED) {
            self.calls.push(format!("write_sampled_texture {} {:?} -> #{}", id.index(), aspect, handle));
        }
        if usage.contains(TextureUsage::STORAGE) {
            self.calls.push(format!("write_storage_texture {} {:?} -> #{}", id.index(), aspect, handle));
        }
    }

    fn write_sampler_descriptor(&self, id: SamplerId, sampler: &dyn RawSampler) {
        let handle = raw_handle::<MockSampler>(sampler.as_any(), |s| s.handle);
        self.calls.push(format!("write_sampler_descriptor {} -> #{}", id.index(), handle));
    }

    fn clear_buffer_descriptor(&self, id: BufferId) {
        self.calls.push(format!("write_buffer_descriptor {} -> default", id.index()));
    }

    fn clear_texture_descriptor(&self, id: TextureId) {
        self.calls.push(format!("write_sampled_texture {} -> default", id.index()));
        self.calls.push(format!("write_storage_texture {} -> default", id.index()));
    }

    fn clear_sampler_descriptor(&self, id: SamplerId) {
        self.calls.push(format!("write_sampler_descriptor {} -> default", id.index()));
    }

    fn wait_for_frame(&self, frame: usize) -> Result<()> {
        self.calls.push(format!("wait_for_frame {}", frame));
        Ok(())
    }

    fn submit(&self, command_buffer: &dyn RawCommandBuffer, submission: Submission<'_>) -> Result<()> {
        let handle = raw_handle::<MockCommandBuffer>(command_buffer.as_any(), |c| c.handle);
        let mut call = format!("submit #{} frame {}", handle, submission.frame);
        if submission.swapchain.is_some() {
            call.push_str(" present");
        }
        if let Some(fence) = submission.fence {
            if let Some(fence) = fence.as_any().downcast_ref::<MockFence>() {
                fence.signaled.store(true, Ordering::SeqCst);
            }
            call.push_str(" fence");
        }
        self.calls.push(call);
        Ok(())
    }

    fn submit_and_wait(&self, command_buffer: &dyn RawCommandBuffer) -> Result<()> {
        let handle = raw_handle::<MockCommandBuffer>(command_buffer.as_any(), |c| c.handle);
        self.calls.push(format!("submit_and_wait #{}", handle));
        Ok(())
    }

    fn wait_idle(&self) -> Result<()> {
        self.calls.push("wait_idle".to_string());
        Ok(())
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Context on a fresh mock device, plus its call log
pub fn mock_context() -> (Context, MockCalls) {
    mock_context_with(MockGraphicsDevice::new())
}

pub fn mock_context_with(device: MockGraphicsDevice) -> (Context, MockCalls) {
    let calls = device.calls();
    let context = Context::from_device(Box::new(device)).unwrap();
    (context, calls)
}

/// Smallest module the mock accepts; word 1 is the reflected push-constant size
pub fn spirv_stub(push_constant_size: u32) -> Vec<u32> {
    vec![SPIRV_MAGIC, push_constant_size, 0, 0, 0]
}

/// Handle of the mock object behind a buffer
pub fn buffer_handle_of(buffer: &crate::graphics_device::Buffer) -> u64 {
    buffer_handle(buffer)
}

/// Handle of the mock object behind a texture
pub fn texture_handle_of(texture: &crate::graphics_device::Texture) -> u64 {
    texture_handle(texture)
}
