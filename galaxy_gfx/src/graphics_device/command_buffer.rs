/// Deferred command buffer
///
/// Commands are recorded as `GpuCommand` values (thread-safe, any number of
/// threads may record into the same buffer) and translated to the backend in
/// one pass at `end()`. Recording never touches the native command buffer,
/// so a buffer that is re-begun or dropped before `end()` leaves no trace in
/// the backend.
///
/// ```text
/// begin() ──► Recording ──record*──► end() ──► Ready ──► Queue::submit
///   ▲                                                        │
///   └────────────────────────── begin() ◄────────────────────┘
/// ```

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::flags::{layout_access_and_stage, Access, PipelineStage, TextureUsage};
use crate::graphics_device::{
    BlitRegion, Buffer, BufferCopy, BufferTextureCopy, ClearValue, ColorAttachmentOps, ContextShared,
    DataDependency, DepthAttachmentOps, Filter, FrameBuffer, GpuCommand, IndexType, PendingDeletion,
    Pipeline, Rect, SubresourceRange, Texture, TextureLayout, Viewport,
};
use crate::{engine_trace, engine_warn};

/// Backend command buffer
pub trait RawCommandBuffer: Send + Sync {
    /// Reset and start recording native commands
    fn begin(&mut self) -> Result<()>;

    /// Translate one recorded command into native commands
    fn encode(&mut self, command: &GpuCommand) -> Result<()>;

    /// Finish native recording
    fn end(&mut self) -> Result<()>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Lifecycle state of a `CommandBuffer`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandBufferState {
    /// Created or failed; nothing recorded
    Initial,
    /// Between `begin()` and `end()`
    Recording,
    /// Translated; can be submitted
    Ready,
}

/// Explicit texture barrier parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureBarrierInfo {
    /// Must match the tracked layout unless `Undefined` (discard contents)
    pub old_layout: TextureLayout,
    pub new_layout: TextureLayout,
    pub src_stage: PipelineStage,
    pub dst_stage: PipelineStage,
    pub src_access: Access,
    pub dst_access: Access,
    pub range: SubresourceRange,
}

impl TextureBarrierInfo {
    /// Barrier with stages and access inferred from both layouts
    pub fn transition(old_layout: TextureLayout, new_layout: TextureLayout) -> Self {
        let (src_access, src_stage) = layout_access_and_stage(old_layout);
        let (dst_access, dst_stage) = layout_access_and_stage(new_layout);
        Self {
            old_layout,
            new_layout,
            src_stage,
            dst_stage,
            src_access,
            dst_access,
            range: SubresourceRange::all(),
        }
    }
}

struct Recording {
    state: CommandBufferState,
    commands: Vec<GpuCommand>,
    dependencies: Vec<DataDependency>,
    inside_rendering: bool,
}

/// Deferred, thread-safe command buffer
pub struct CommandBuffer {
    shared: Arc<ContextShared>,
    raw: Mutex<Option<Box<dyn RawCommandBuffer>>>,
    recording: Mutex<Recording>,
}

impl CommandBuffer {
    pub(crate) fn new(shared: Arc<ContextShared>, raw: Box<dyn RawCommandBuffer>) -> Self {
        Self {
            shared,
            raw: Mutex::new(Some(raw)),
            recording: Mutex::new(Recording {
                state: CommandBufferState::Initial,
                commands: Vec::new(),
                dependencies: Vec::new(),
                inside_rendering: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Recording> {
        self.recording.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ===== LIFECYCLE =====

    /// Start recording, discarding previously recorded commands and
    /// dependencies (and the resource references they held)
    ///
    /// A buffer that was submitted must only be re-begun once the GPU is
    /// done with it, i.e. after the frame slot it was submitted in has been
    /// waited on.
    pub fn begin(&self) {
        let (commands, dependencies) = {
            let mut recording = self.lock();
            recording.state = CommandBufferState::Recording;
            recording.inside_rendering = false;
            (
                std::mem::take(&mut recording.commands),
                std::mem::take(&mut recording.dependencies),
            )
        };
        // Released outside the lock: dropping the last reference of a
        // resource re-enters the context's deletion queue
        drop(commands);
        drop(dependencies);
    }

    /// Translate every recorded command, in order, into the backend
    pub fn end(&self) -> Result<()> {
        let mut recording = self.lock();
        debug_assert!(
            recording.state == CommandBufferState::Recording,
            "CommandBuffer::end called in state {:?}",
            recording.state
        );
        debug_assert!(!recording.inside_rendering, "CommandBuffer::end inside a rendering scope");
        if recording.state != CommandBufferState::Recording {
            return Err(Error::InvalidResource(format!(
                "command buffer ended in state {:?}",
                recording.state
            )));
        }

        let mut raw_guard = self.raw.lock().unwrap_or_else(|e| e.into_inner());
        let raw = match raw_guard.as_mut() {
            Some(raw) => raw.as_mut(),
            None => unreachable!("command buffer backend object taken before drop"),
        };

        let result = encode_all(raw, &recording.commands);
        recording.state = match result {
            Ok(()) => CommandBufferState::Ready,
            Err(_) => CommandBufferState::Initial,
        };
        engine_trace!(
            "gfx::CommandBuffer",
            "Encoded {} commands ({} data dependencies)",
            recording.commands.len(),
            recording.dependencies.len()
        );
        result
    }

    pub fn state(&self) -> CommandBufferState {
        self.lock().state
    }

    /// Number of commands recorded since `begin()`
    pub fn command_count(&self) -> usize {
        self.lock().commands.len()
    }

    /// Number of data dependencies recorded since `begin()`
    pub fn dependency_count(&self) -> usize {
        self.lock().dependencies.len()
    }

    /// Variant names of the recorded commands, in order
    pub fn command_names(&self) -> Vec<&'static str> {
        self.lock().commands.iter().map(GpuCommand::name).collect()
    }

    fn record(&self, command: GpuCommand) {
        let mut recording = self.lock();
        Self::check_recording(&recording);
        recording.commands.push(command);
    }

    fn check_recording(recording: &Recording) {
        debug_assert!(
            recording.state == CommandBufferState::Recording,
            "command recorded outside begin()/end() (state {:?})",
            recording.state
        );
    }

    // ===== DRAW / DISPATCH =====

    pub fn draw(&self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) {
        let mut recording = self.lock();
        Self::check_recording(&recording);
        debug_assert!(recording.inside_rendering, "draw outside begin_rendering/end_rendering");
        recording.commands.push(GpuCommand::Draw {
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        });
    }

    pub fn draw_indexed(
        &self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) {
        let mut recording = self.lock();
        Self::check_recording(&recording);
        debug_assert!(recording.inside_rendering, "draw_indexed outside begin_rendering/end_rendering");
        recording.commands.push(GpuCommand::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        });
    }

    pub fn dispatch(&self, x: u32, y: u32, z: u32) {
        let mut recording = self.lock();
        Self::check_recording(&recording);
        debug_assert!(!recording.inside_rendering, "dispatch inside a rendering scope");
        recording.commands.push(GpuCommand::Dispatch { x, y, z });
    }

    // ===== BARRIERS =====

    /// Record a texture barrier and update the texture's tracked layout
    /// immediately
    pub fn texture_barrier(&self, texture: &Arc<Texture>, barrier: TextureBarrierInfo) {
        let mut recording = self.lock();
        Self::check_recording(&recording);
        debug_assert!(
            barrier.old_layout == TextureLayout::Undefined || barrier.old_layout == texture.layout(),
            "barrier old layout {:?} disagrees with tracked layout {:?}",
            barrier.old_layout,
            texture.layout()
        );
        recording.commands.push(GpuCommand::TextureBarrier {
            texture: Arc::clone(texture),
            old_layout: barrier.old_layout,
            new_layout: barrier.new_layout,
            src_stage: barrier.src_stage,
            dst_stage: barrier.dst_stage,
            src_access: barrier.src_access,
            dst_access: barrier.dst_access,
            range: barrier.range,
        });
        texture.set_layout(barrier.new_layout);
    }

    /// Move a texture from its tracked layout to `new_layout`, inferring
    /// stages and access masks from both layouts
    pub fn transition_texture(&self, texture: &Arc<Texture>, new_layout: TextureLayout) {
        let barrier = TextureBarrierInfo::transition(texture.layout(), new_layout);
        self.texture_barrier(texture, barrier);
    }

    /// Record a buffer memory barrier over `[offset, offset + size)`
    /// (`size == u64::MAX` covers the rest of the buffer)
    #[allow(clippy::too_many_arguments)]
    pub fn buffer_barrier(
        &self,
        buffer: &Arc<Buffer>,
        offset: u64,
        size: u64,
        src_stage: PipelineStage,
        dst_stage: PipelineStage,
        src_access: Access,
        dst_access: Access,
    ) {
        self.record(GpuCommand::BufferBarrier {
            buffer: Arc::clone(buffer),
            offset,
            size,
            src_stage,
            dst_stage,
            src_access,
            dst_access,
        });
    }

    // ===== TRANSFER =====

    /// Blit between textures (`src` in `TransferSrc`, `dst` in `TransferDst`)
    pub fn blit(&self, src: &Arc<Texture>, dst: &Arc<Texture>, region: BlitRegion, filter: Filter) {
        let mut recording = self.lock();
        Self::check_recording(&recording);
        debug_assert!(!recording.inside_rendering, "blit inside a rendering scope");
        debug_assert!(
            src.layout() == TextureLayout::TransferSrc,
            "blit source is in {:?}, expected TransferSrc",
            src.layout()
        );
        debug_assert!(
            dst.layout() == TextureLayout::TransferDst,
            "blit destination is in {:?}, expected TransferDst",
            dst.layout()
        );
        recording.commands.push(GpuCommand::Blit {
            src: Arc::clone(src),
            dst: Arc::clone(dst),
            region,
            filter,
        });
    }

    /// Clear a texture (must be in `TransferDst`)
    pub fn clear_texture(&self, texture: &Arc<Texture>, value: ClearValue, range: SubresourceRange) {
        let mut recording = self.lock();
        Self::check_recording(&recording);
        debug_assert!(!recording.inside_rendering, "clear_texture inside a rendering scope");
        debug_assert!(
            texture.layout() == TextureLayout::TransferDst,
            "clear_texture on a texture in {:?}, expected TransferDst",
            texture.layout()
        );
        debug_assert!(
            texture.usage().contains(TextureUsage::TRANSFER_DST),
            "clear_texture on a texture without TRANSFER_DST usage"
        );
        recording.commands.push(GpuCommand::ClearTexture {
            texture: Arc::clone(texture),
            value,
            range,
        });
    }

    pub fn copy_buffer(&self, src: &Arc<Buffer>, dst: &Arc<Buffer>, region: BufferCopy) {
        let mut recording = self.lock();
        Self::check_recording(&recording);
        debug_assert!(!recording.inside_rendering, "copy_buffer inside a rendering scope");
        debug_assert!(
            region.src_offset + region.size <= src.size() && region.dst_offset + region.size <= dst.size(),
            "copy_buffer region out of range"
        );
        recording.commands.push(GpuCommand::CopyBuffer {
            src: Arc::clone(src),
            dst: Arc::clone(dst),
            region,
        });
    }

    /// Copy buffer bytes into a texture (must be in `TransferDst`)
    pub fn copy_buffer_to_texture(&self, buffer: &Arc<Buffer>, texture: &Arc<Texture>, region: BufferTextureCopy) {
        let mut recording = self.lock();
        Self::check_recording(&recording);
        debug_assert!(!recording.inside_rendering, "copy_buffer_to_texture inside a rendering scope");
        debug_assert!(
            texture.layout() == TextureLayout::TransferDst,
            "copy_buffer_to_texture into a texture in {:?}, expected TransferDst",
            texture.layout()
        );
        recording.commands.push(GpuCommand::CopyBufferToTexture {
            buffer: Arc::clone(buffer),
            texture: Arc::clone(texture),
            region,
        });
    }

    /// Copy texels into a buffer (texture must be in `TransferSrc`)
    pub fn copy_texture_to_buffer(&self, texture: &Arc<Texture>, buffer: &Arc<Buffer>, region: BufferTextureCopy) {
        let mut recording = self.lock();
        Self::check_recording(&recording);
        debug_assert!(!recording.inside_rendering, "copy_texture_to_buffer inside a rendering scope");
        debug_assert!(
            texture.layout() == TextureLayout::TransferSrc,
            "copy_texture_to_buffer from a texture in {:?}, expected TransferSrc",
            texture.layout()
        );
        recording.commands.push(GpuCommand::CopyTextureToBuffer {
            texture: Arc::clone(texture),
            buffer: Arc::clone(buffer),
            region,
        });
    }

    // ===== RENDERING =====

    /// Open a dynamic rendering scope over `frame_buffer`
    ///
    /// `color_ops` pairs with the frame buffer's color attachments; missing
    /// entries use `ColorAttachmentOps::default()`.
    pub fn begin_rendering(
        &self,
        frame_buffer: &Arc<FrameBuffer>,
        color_ops: &[ColorAttachmentOps],
        depth_ops: Option<DepthAttachmentOps>,
        render_area: Rect,
    ) {
        let mut recording = self.lock();
        Self::check_recording(&recording);
        debug_assert!(!recording.inside_rendering, "nested begin_rendering");
        debug_assert!(
            color_ops.len() <= frame_buffer.color_attachments().len(),
            "more color ops than color attachments"
        );
        for (index, color) in frame_buffer.color_attachments().iter().enumerate() {
            debug_assert!(
                color.layout() == TextureLayout::ColorAttachment,
                "color attachment {} is in {:?}, expected ColorAttachment",
                index,
                color.layout()
            );
        }
        if let Some(depth) = frame_buffer.depth_attachment() {
            debug_assert!(
                matches!(
                    depth.layout(),
                    TextureLayout::DepthStencilAttachment | TextureLayout::DepthStencilReadOnly
                ),
                "depth attachment is in {:?}, expected DepthStencilAttachment",
                depth.layout()
            );
        }
        let color_ops = (0..frame_buffer.color_attachments().len())
            .map(|index| color_ops.get(index).copied().unwrap_or_default())
            .collect();
        let depth_ops = frame_buffer
            .depth_attachment()
            .map(|_| depth_ops.unwrap_or_default());
        recording.inside_rendering = true;
        recording.commands.push(GpuCommand::BeginRendering {
            frame_buffer: Arc::clone(frame_buffer),
            color_ops,
            depth_ops,
            render_area,
        });
    }

    pub fn end_rendering(&self) {
        let mut recording = self.lock();
        Self::check_recording(&recording);
        debug_assert!(recording.inside_rendering, "end_rendering without begin_rendering");
        recording.inside_rendering = false;
        recording.commands.push(GpuCommand::EndRendering);
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        self.record(GpuCommand::SetViewport(viewport));
    }

    pub fn set_scissor(&self, scissor: Rect) {
        self.record(GpuCommand::SetScissor(scissor));
    }

    // ===== BINDING =====

    /// Bind a pipeline (the global bindless set is bound with it)
    pub fn bind_pipeline(&self, pipeline: &Arc<Pipeline>) {
        self.record(GpuCommand::BindPipeline(Arc::clone(pipeline)));
    }

    /// Write raw bytes into the push-constant block at `offset`
    pub fn set_push_constant(&self, offset: u32, data: &[u8]) {
        debug_assert!(offset % 4 == 0 && data.len() % 4 == 0, "push constants must be 4-byte aligned");
        self.record(GpuCommand::PushConstants {
            offset,
            data: data.to_vec(),
        });
    }

    /// Write a plain-old-data value into the push-constant block at `offset`
    pub fn set_push_constant_pod<T: bytemuck::Pod>(&self, offset: u32, value: &T) {
        self.set_push_constant(offset, bytemuck::bytes_of(value));
    }

    pub fn bind_index_buffer(&self, buffer: &Arc<Buffer>, offset: u64, index_type: IndexType) {
        self.record(GpuCommand::BindIndexBuffer {
            buffer: Arc::clone(buffer),
            offset,
            index_type,
        });
    }

    pub fn bind_vertex_buffer(&self, binding: u32, buffer: &Arc<Buffer>, offset: u64) {
        self.record(GpuCommand::BindVertexBuffer {
            binding,
            buffer: Arc::clone(buffer),
            offset,
        });
    }

    // ===== ESCAPE HATCH / DEPENDENCIES =====

    /// Run `callback` against the native command buffer at this point of the
    /// stream during `end()`
    pub fn user_defined<F>(&self, callback: F)
    where
        F: Fn(&mut dyn RawCommandBuffer) + Send + Sync + 'static,
    {
        self.record(GpuCommand::UserDefined(Arc::new(callback)));
    }

    /// Keep `dependency` alive until this buffer is re-begun or dropped
    pub fn insert_data_dependency(&self, dependency: DataDependency) {
        let mut recording = self.lock();
        Self::check_recording(&recording);
        recording.dependencies.push(dependency);
    }

    /// Run `f` with the backend object locked (submission)
    pub(crate) fn with_raw<R>(&self, f: impl FnOnce(&dyn RawCommandBuffer) -> R) -> R {
        let raw = self.raw.lock().unwrap_or_else(|e| e.into_inner());
        match raw.as_ref() {
            Some(raw) => f(raw.as_ref()),
            None => unreachable!("command buffer backend object taken before drop"),
        }
    }
}

/// Encode `commands` between begin/end; the backend object is ended even
/// when an encode fails so it can be begun again
fn encode_all(raw: &mut dyn RawCommandBuffer, commands: &[GpuCommand]) -> Result<()> {
    raw.begin()?;
    let encoded = commands.iter().try_for_each(|command| match command {
        GpuCommand::UserDefined(callback) => {
            callback(&mut *raw);
            Ok(())
        }
        command => raw.encode(command),
    });
    match encoded {
        Ok(()) => raw.end(),
        Err(err) => {
            if let Err(end_err) = raw.end() {
                engine_warn!("gfx::CommandBuffer", "Failed to end after encode error: {}", end_err);
            }
            Err(err)
        }
    }
}

impl Drop for CommandBuffer {
    fn drop(&mut self) {
        let recording = self.recording.get_mut().unwrap_or_else(|e| e.into_inner());
        let commands = std::mem::take(&mut recording.commands);
        let dependencies = std::mem::take(&mut recording.dependencies);
        let raw = self.raw.get_mut().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(raw) = raw {
            self.shared.defer(PendingDeletion::CommandBuffer {
                raw,
                commands,
                dependencies,
            });
        }
    }
}

#[cfg(test)]
#[path = "command_buffer_tests.rs"]
mod tests;
