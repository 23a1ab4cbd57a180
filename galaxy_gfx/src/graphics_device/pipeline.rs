/// Graphics and compute pipelines with their fixed-function state
///
/// Every pipeline shares one layout: the global bindless descriptor set plus
/// a single push-constant range visible to all stages. Pipelines are built
/// for dynamic rendering, so they name attachment formats instead of a
/// render pass.

use std::any::Any;
use std::sync::Arc;

use crate::flags::ColorWriteMask;
use crate::graphics_device::{ContextShared, Format, PendingDeletion, Shader};

// ===== VERTEX INPUT =====

/// Primitive topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    #[default]
    TriangleList,
    TriangleStrip,
    LineList,
    LineStrip,
    PointList,
}

/// Index buffer element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexType {
    /// 16-bit indices (max 65535 vertices)
    U16,
    /// 32-bit indices
    U32,
}

impl IndexType {
    /// Size in bytes of one index element
    pub fn size_bytes(&self) -> u32 {
        match self {
            IndexType::U16 => 2,
            IndexType::U32 => 4,
        }
    }
}

/// Data type and component count of a vertex attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(non_camel_case_types)]
pub enum VertexFormat {
    R32_SFLOAT,
    R32G32_SFLOAT,
    R32G32B32_SFLOAT,
    R32G32B32A32_SFLOAT,
    R32_UINT,
    R32G32_UINT,
    R32G32B32A32_UINT,
    R16G16_SFLOAT,
    R16G16B16A16_SFLOAT,
    R8G8B8A8_UNORM,
    R8G8B8A8_UINT,
}

impl VertexFormat {
    /// Returns size in bytes for this format
    pub fn size_bytes(&self) -> u32 {
        match self {
            VertexFormat::R32_SFLOAT | VertexFormat::R32_UINT => 4,
            VertexFormat::R16G16_SFLOAT | VertexFormat::R8G8B8A8_UNORM | VertexFormat::R8G8B8A8_UINT => 4,
            VertexFormat::R32G32_SFLOAT | VertexFormat::R32G32_UINT | VertexFormat::R16G16B16A16_SFLOAT => 8,
            VertexFormat::R32G32B32_SFLOAT => 12,
            VertexFormat::R32G32B32A32_SFLOAT | VertexFormat::R32G32B32A32_UINT => 16,
        }
    }
}

/// Vertex input rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VertexInputRate {
    #[default]
    Vertex,
    Instance,
}

/// Vertex attribute description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// Attribute location in shader
    pub location: u32,
    pub binding: u32,
    pub format: VertexFormat,
    /// Offset in bytes from the start of the vertex
    pub offset: u32,
}

/// Vertex binding description
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBinding {
    pub binding: u32,
    /// Stride in bytes between consecutive elements
    pub stride: u32,
    pub input_rate: VertexInputRate,
}

/// Vertex input layout (empty for vertex pulling from bindless buffers)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VertexLayout {
    pub bindings: Vec<VertexBinding>,
    pub attributes: Vec<VertexAttribute>,
}

// ===== RASTERIZATION =====

/// Face culling mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullMode {
    None,
    Front,
    Back,
}

/// Front face winding order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrontFace {
    CounterClockwise,
    Clockwise,
}

/// Polygon rendering mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolygonMode {
    Fill,
    Line,
    Point,
}

/// Depth bias parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthBias {
    pub constant_factor: f32,
    pub slope_factor: f32,
    pub clamp: f32,
}

/// Rasterization fixed-function state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterizationState {
    pub cull_mode: CullMode,
    pub front_face: FrontFace,
    pub polygon_mode: PolygonMode,
    /// None = disabled
    pub depth_bias: Option<DepthBias>,
}

impl Default for RasterizationState {
    fn default() -> Self {
        Self {
            cull_mode: CullMode::Back,
            front_face: FrontFace::CounterClockwise,
            polygon_mode: PolygonMode::Fill,
            depth_bias: None,
        }
    }
}

// ===== DEPTH / STENCIL =====

/// Comparison operator for depth, stencil and sampler compare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Never,
    Less,
    Equal,
    LessOrEqual,
    Greater,
    NotEqual,
    GreaterOrEqual,
    Always,
}

/// Stencil operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilOp {
    Keep,
    Zero,
    Replace,
    IncrementAndClamp,
    DecrementAndClamp,
    Invert,
    IncrementAndWrap,
    DecrementAndWrap,
}

/// Stencil operation state (per face)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilOpState {
    pub fail_op: StencilOp,
    pub pass_op: StencilOp,
    pub depth_fail_op: StencilOp,
    pub compare_op: CompareOp,
    pub compare_mask: u32,
    pub write_mask: u32,
    pub reference: u32,
}

impl Default for StencilOpState {
    fn default() -> Self {
        Self {
            fail_op: StencilOp::Keep,
            pass_op: StencilOp::Keep,
            depth_fail_op: StencilOp::Keep,
            compare_op: CompareOp::Always,
            compare_mask: 0xFF,
            write_mask: 0xFF,
            reference: 0,
        }
    }
}

/// Depth and stencil testing state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepthStencilState {
    pub depth_test_enable: bool,
    pub depth_write_enable: bool,
    pub depth_compare_op: CompareOp,
    pub stencil_test_enable: bool,
    pub front: StencilOpState,
    pub back: StencilOpState,
}

impl Default for DepthStencilState {
    fn default() -> Self {
        Self {
            depth_test_enable: true,
            depth_write_enable: true,
            depth_compare_op: CompareOp::Less,
            stencil_test_enable: false,
            front: StencilOpState::default(),
            back: StencilOpState::default(),
        }
    }
}

// ===== COLOR BLEND =====

/// Blend factor for color blending equations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    DstColor,
    OneMinusDstColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    ConstantColor,
    OneMinusConstantColor,
    SrcAlphaSaturate,
}

/// Blend operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOp {
    /// src * srcFactor + dst * dstFactor
    Add,
    /// src * srcFactor - dst * dstFactor
    Subtract,
    /// dst * dstFactor - src * srcFactor
    ReverseSubtract,
    Min,
    Max,
}

/// Blend state of one color attachment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorBlendState {
    pub blend_enable: bool,
    pub src_color_factor: BlendFactor,
    pub dst_color_factor: BlendFactor,
    pub color_blend_op: BlendOp,
    pub src_alpha_factor: BlendFactor,
    pub dst_alpha_factor: BlendFactor,
    pub alpha_blend_op: BlendOp,
    pub color_write_mask: ColorWriteMask,
}

impl ColorBlendState {
    /// Standard premultiplied-free alpha blending
    pub fn alpha_blending() -> Self {
        Self {
            blend_enable: true,
            src_color_factor: BlendFactor::SrcAlpha,
            dst_color_factor: BlendFactor::OneMinusSrcAlpha,
            color_blend_op: BlendOp::Add,
            src_alpha_factor: BlendFactor::One,
            dst_alpha_factor: BlendFactor::OneMinusSrcAlpha,
            alpha_blend_op: BlendOp::Add,
            color_write_mask: ColorWriteMask::ALL,
        }
    }
}

impl Default for ColorBlendState {
    fn default() -> Self {
        Self {
            blend_enable: false,
            src_color_factor: BlendFactor::One,
            dst_color_factor: BlendFactor::Zero,
            color_blend_op: BlendOp::Add,
            src_alpha_factor: BlendFactor::One,
            dst_alpha_factor: BlendFactor::Zero,
            alpha_blend_op: BlendOp::Add,
            color_write_mask: ColorWriteMask::ALL,
        }
    }
}

// ===== MULTISAMPLE =====

/// Multisample count
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SampleCount {
    #[default]
    S1,
    S2,
    S4,
    S8,
}

// ===== PIPELINES =====

/// Bind point a pipeline is used at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineBindPoint {
    Graphics,
    Compute,
}

/// Descriptor for creating a graphics pipeline
#[derive(Debug, Clone)]
pub struct GraphicsPipelineCreateInfo {
    pub vertex: Arc<Shader>,
    pub fragment: Option<Arc<Shader>>,
    pub vertex_layout: VertexLayout,
    pub topology: PrimitiveTopology,
    pub rasterization: RasterizationState,
    pub depth_stencil: DepthStencilState,
    /// One entry per color attachment, same order as `color_formats`
    pub blend: Vec<ColorBlendState>,
    pub color_formats: Vec<Format>,
    pub depth_format: Option<Format>,
    pub samples: SampleCount,
    /// Bytes of push constants used; 0 = take the reflected size
    pub push_constant_size: u32,
}

impl GraphicsPipelineCreateInfo {
    /// Pipeline with default fixed-function state for one color target
    pub fn new(vertex: Arc<Shader>, fragment: Arc<Shader>, color_format: Format) -> Self {
        Self {
            vertex,
            fragment: Some(fragment),
            vertex_layout: VertexLayout::default(),
            topology: PrimitiveTopology::TriangleList,
            rasterization: RasterizationState::default(),
            depth_stencil: DepthStencilState {
                depth_test_enable: false,
                depth_write_enable: false,
                ..DepthStencilState::default()
            },
            blend: vec![ColorBlendState::default()],
            color_formats: vec![color_format],
            depth_format: None,
            samples: SampleCount::S1,
            push_constant_size: 0,
        }
    }
}

/// Descriptor for creating a compute pipeline
#[derive(Debug, Clone)]
pub struct ComputePipelineCreateInfo {
    pub shader: Arc<Shader>,
    /// Bytes of push constants used; 0 = take the reflected size
    pub push_constant_size: u32,
}

/// Backend pipeline object
pub trait RawPipeline: Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

/// Graphics or compute pipeline
pub struct Pipeline {
    shared: Arc<ContextShared>,
    raw: Option<Box<dyn RawPipeline>>,
    bind_point: PipelineBindPoint,
    push_constant_size: u32,
}

impl Pipeline {
    pub(crate) fn new(
        shared: Arc<ContextShared>,
        raw: Box<dyn RawPipeline>,
        bind_point: PipelineBindPoint,
        push_constant_size: u32,
    ) -> Self {
        Self {
            shared,
            raw: Some(raw),
            bind_point,
            push_constant_size,
        }
    }

    pub fn bind_point(&self) -> PipelineBindPoint {
        self.bind_point
    }

    /// Push-constant bytes the pipeline reads
    pub fn push_constant_size(&self) -> u32 {
        self.push_constant_size
    }

    pub fn raw(&self) -> &dyn RawPipeline {
        match &self.raw {
            Some(raw) => raw.as_ref(),
            None => unreachable!("pipeline backend object taken before drop"),
        }
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("bind_point", &self.bind_point)
            .field("push_constant_size", &self.push_constant_size)
            .finish()
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        if let Some(raw) = self.raw.take() {
            self.shared.defer(PendingDeletion::Pipeline(raw));
        }
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
