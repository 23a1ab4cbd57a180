/// Recorded GPU commands
///
/// `GpuCommand` is a closed set: every variant owns `Arc`s of the resources
/// it touches, so a recorded command list keeps its resources alive until the
/// command buffer is re-begun or dropped. Backends translate each variant in
/// `RawCommandBuffer::encode`.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::flags::{Access, PipelineStage};
use crate::graphics_device::{
    Buffer, Extent3D, Filter, FrameBuffer, IndexType, Pipeline, RawCommandBuffer, Sampler,
    SubresourceRange, Texture, TextureLayout,
};

/// Viewport transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Full-target viewport with depth range [0, 1]
    pub fn from_size(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }
}

/// Integer rectangle (scissor, render area, blit region)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn from_size(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }
}

/// Texel offset inside a texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Offset3D {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// Attachment load operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LoadOp {
    /// Preserve existing contents
    Load,
    /// Clear to the attachment's clear value
    #[default]
    Clear,
    /// Contents undefined
    DontCare,
}

/// Attachment store operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StoreOp {
    #[default]
    Store,
    DontCare,
}

/// Load/store behavior of one color attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorAttachmentOps {
    pub load: LoadOp,
    pub store: StoreOp,
    pub clear: [f32; 4],
}

impl Default for ColorAttachmentOps {
    fn default() -> Self {
        Self {
            load: LoadOp::Clear,
            store: StoreOp::Store,
            clear: [0.0, 0.0, 0.0, 1.0],
        }
    }
}

/// Load/store behavior of the depth/stencil attachment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthAttachmentOps {
    pub load: LoadOp,
    pub store: StoreOp,
    pub clear_depth: f32,
    pub clear_stencil: u32,
}

impl Default for DepthAttachmentOps {
    fn default() -> Self {
        Self {
            load: LoadOp::Clear,
            store: StoreOp::DontCare,
            clear_depth: 1.0,
            clear_stencil: 0,
        }
    }
}

/// Value written by `clear_texture`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClearValue {
    Color([f32; 4]),
    DepthStencil { depth: f32, stencil: u32 },
}

/// One region of a buffer-to-buffer copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferCopy {
    pub src_offset: u64,
    pub dst_offset: u64,
    pub size: u64,
}

/// One region of a buffer/texture copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferTextureCopy {
    pub buffer_offset: u64,
    /// Texels per row in the buffer; 0 = tightly packed
    pub buffer_row_length: u32,
    pub mip_level: u32,
    pub base_array_layer: u32,
    pub array_layer_count: u32,
    pub texture_offset: Offset3D,
    pub extent: Extent3D,
}

impl BufferTextureCopy {
    /// Whole mip 0 of layer 0, tightly packed at buffer offset 0
    pub fn full(extent: Extent3D) -> Self {
        Self {
            buffer_offset: 0,
            buffer_row_length: 0,
            mip_level: 0,
            base_array_layer: 0,
            array_layer_count: 1,
            texture_offset: Offset3D::default(),
            extent,
        }
    }
}

/// Source and destination regions of a blit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlitRegion {
    pub src_mip_level: u32,
    pub src_rect: Rect,
    pub dst_mip_level: u32,
    pub dst_rect: Rect,
}

/// Escape hatch run against the native command buffer during `end()`
pub type UserCommand = Arc<dyn Fn(&mut dyn RawCommandBuffer) + Send + Sync>;

/// A recorded command
#[derive(Clone)]
pub enum GpuCommand {
    Draw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    },
    Dispatch {
        x: u32,
        y: u32,
        z: u32,
    },
    TextureBarrier {
        texture: Arc<Texture>,
        old_layout: TextureLayout,
        new_layout: TextureLayout,
        src_stage: PipelineStage,
        dst_stage: PipelineStage,
        src_access: Access,
        dst_access: Access,
        range: SubresourceRange,
    },
    BufferBarrier {
        buffer: Arc<Buffer>,
        offset: u64,
        /// `u64::MAX` = to the end of the buffer
        size: u64,
        src_stage: PipelineStage,
        dst_stage: PipelineStage,
        src_access: Access,
        dst_access: Access,
    },
    Blit {
        src: Arc<Texture>,
        dst: Arc<Texture>,
        region: BlitRegion,
        filter: Filter,
    },
    SetViewport(Viewport),
    SetScissor(Rect),
    ClearTexture {
        texture: Arc<Texture>,
        value: ClearValue,
        range: SubresourceRange,
    },
    BeginRendering {
        frame_buffer: Arc<FrameBuffer>,
        color_ops: Vec<ColorAttachmentOps>,
        depth_ops: Option<DepthAttachmentOps>,
        render_area: Rect,
    },
    EndRendering,
    CopyBuffer {
        src: Arc<Buffer>,
        dst: Arc<Buffer>,
        region: BufferCopy,
    },
    CopyBufferToTexture {
        buffer: Arc<Buffer>,
        texture: Arc<Texture>,
        region: BufferTextureCopy,
    },
    CopyTextureToBuffer {
        texture: Arc<Texture>,
        buffer: Arc<Buffer>,
        region: BufferTextureCopy,
    },
    BindPipeline(Arc<Pipeline>),
    PushConstants {
        offset: u32,
        data: Vec<u8>,
    },
    BindIndexBuffer {
        buffer: Arc<Buffer>,
        offset: u64,
        index_type: IndexType,
    },
    BindVertexBuffer {
        binding: u32,
        buffer: Arc<Buffer>,
        offset: u64,
    },
    UserDefined(UserCommand),
}

impl GpuCommand {
    /// Short variant name (logging and tests)
    pub fn name(&self) -> &'static str {
        match self {
            GpuCommand::Draw { .. } => "Draw",
            GpuCommand::DrawIndexed { .. } => "DrawIndexed",
            GpuCommand::Dispatch { .. } => "Dispatch",
            GpuCommand::TextureBarrier { .. } => "TextureBarrier",
            GpuCommand::BufferBarrier { .. } => "BufferBarrier",
            GpuCommand::Blit { .. } => "Blit",
            GpuCommand::SetViewport(_) => "SetViewport",
            GpuCommand::SetScissor(_) => "SetScissor",
            GpuCommand::ClearTexture { .. } => "ClearTexture",
            GpuCommand::BeginRendering { .. } => "BeginRendering",
            GpuCommand::EndRendering => "EndRendering",
            GpuCommand::CopyBuffer { .. } => "CopyBuffer",
            GpuCommand::CopyBufferToTexture { .. } => "CopyBufferToTexture",
            GpuCommand::CopyTextureToBuffer { .. } => "CopyTextureToBuffer",
            GpuCommand::BindPipeline(_) => "BindPipeline",
            GpuCommand::PushConstants { .. } => "PushConstants",
            GpuCommand::BindIndexBuffer { .. } => "BindIndexBuffer",
            GpuCommand::BindVertexBuffer { .. } => "BindVertexBuffer",
            GpuCommand::UserDefined(_) => "UserDefined",
        }
    }
}

impl fmt::Debug for GpuCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuCommand::Draw { vertex_count, instance_count, .. } => f
                .debug_struct("Draw")
                .field("vertex_count", vertex_count)
                .field("instance_count", instance_count)
                .finish(),
            GpuCommand::TextureBarrier { old_layout, new_layout, .. } => f
                .debug_struct("TextureBarrier")
                .field("old_layout", old_layout)
                .field("new_layout", new_layout)
                .finish(),
            GpuCommand::SetViewport(viewport) => f.debug_tuple("SetViewport").field(viewport).finish(),
            GpuCommand::SetScissor(rect) => f.debug_tuple("SetScissor").field(rect).finish(),
            other => f.write_str(other.name()),
        }
    }
}

/// Resource kept alive by a command buffer without being referenced by any
/// command (e.g. buffers read through bindless IDs or device addresses)
#[derive(Clone)]
pub enum DataDependency {
    Buffer(Arc<Buffer>),
    Texture(Arc<Texture>),
    Sampler(Arc<Sampler>),
    Pipeline(Arc<Pipeline>),
    FrameBuffer(Arc<FrameBuffer>),
    Other(Arc<dyn Any + Send + Sync>),
}

impl fmt::Debug for DataDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataDependency::Buffer(buffer) => f.debug_tuple("Buffer").field(&buffer.id()).finish(),
            DataDependency::Texture(texture) => f.debug_tuple("Texture").field(&texture.id()).finish(),
            DataDependency::Sampler(sampler) => f.debug_tuple("Sampler").field(&sampler.id()).finish(),
            DataDependency::Pipeline(_) => f.write_str("Pipeline"),
            DataDependency::FrameBuffer(_) => f.write_str("FrameBuffer"),
            DataDependency::Other(_) => f.write_str("Other"),
        }
    }
}
