/// Conversions between frontend enums/flags and their Vulkan counterparts
///
/// Every forward mapping is total over the frontend type. The only reverse
/// mapping (`vk_to_format`) falls back to `Format::Undefined` for native
/// formats the frontend does not know.

use ash::vk;
use galaxy_gfx::gfx::{
    Access, AddressMode, BlendFactor, BlendOp, ColorWriteMask, CompareOp, CullMode, Filter, Format,
    FormatSupport, FrontFace, IndexType, LoadOp, MipmapMode, PipelineStage, PolygonMode, PrimitiveTopology,
    SampleCount, ShaderStage, StencilOp, StencilOpState, StoreOp, SubresourceRange, TextureAspect,
    TextureLayout, TextureType, TextureUsage, VertexFormat, VertexInputRate,
};

// ===== FORMATS =====

/// Convert a frontend format to the Vulkan format
pub fn format_to_vk(format: Format) -> vk::Format {
    match format {
        Format::Undefined => vk::Format::UNDEFINED,
        Format::R8_UNORM => vk::Format::R8_UNORM,
        Format::R8G8_UNORM => vk::Format::R8G8_UNORM,
        Format::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        Format::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_SRGB,
        Format::B8G8R8A8_UNORM => vk::Format::B8G8R8A8_UNORM,
        Format::B8G8R8A8_SRGB => vk::Format::B8G8R8A8_SRGB,
        Format::R32_UINT => vk::Format::R32_UINT,
        Format::R32G32_UINT => vk::Format::R32G32_UINT,
        Format::R32G32B32A32_UINT => vk::Format::R32G32B32A32_UINT,
        Format::R16_SFLOAT => vk::Format::R16_SFLOAT,
        Format::R16G16_SFLOAT => vk::Format::R16G16_SFLOAT,
        Format::R16G16B16A16_SFLOAT => vk::Format::R16G16B16A16_SFLOAT,
        Format::R32_SFLOAT => vk::Format::R32_SFLOAT,
        Format::R32G32_SFLOAT => vk::Format::R32G32_SFLOAT,
        Format::R32G32B32A32_SFLOAT => vk::Format::R32G32B32A32_SFLOAT,
        Format::A2B10G10R10_UNORM => vk::Format::A2B10G10R10_UNORM_PACK32,
        Format::B10G11R11_UFLOAT => vk::Format::B10G11R11_UFLOAT_PACK32,
        Format::BC1_RGBA_UNORM => vk::Format::BC1_RGBA_UNORM_BLOCK,
        Format::BC3_UNORM => vk::Format::BC3_UNORM_BLOCK,
        Format::BC5_UNORM => vk::Format::BC5_UNORM_BLOCK,
        Format::BC7_UNORM => vk::Format::BC7_UNORM_BLOCK,
        Format::BC7_SRGB => vk::Format::BC7_SRGB_BLOCK,
        Format::D16_UNORM => vk::Format::D16_UNORM,
        Format::D32_SFLOAT => vk::Format::D32_SFLOAT,
        Format::D24_UNORM_S8_UINT => vk::Format::D24_UNORM_S8_UINT,
        Format::D32_SFLOAT_S8_UINT => vk::Format::D32_SFLOAT_S8_UINT,
    }
}

/// Convert a Vulkan format back to the frontend format
///
/// Formats without a frontend equivalent map to `Format::Undefined`.
pub fn vk_to_format(format: vk::Format) -> Format {
    match format {
        vk::Format::R8_UNORM => Format::R8_UNORM,
        vk::Format::R8G8_UNORM => Format::R8G8_UNORM,
        vk::Format::R8G8B8A8_UNORM => Format::R8G8B8A8_UNORM,
        vk::Format::R8G8B8A8_SRGB => Format::R8G8B8A8_SRGB,
        vk::Format::B8G8R8A8_UNORM => Format::B8G8R8A8_UNORM,
        vk::Format::B8G8R8A8_SRGB => Format::B8G8R8A8_SRGB,
        vk::Format::R32_UINT => Format::R32_UINT,
        vk::Format::R32G32_UINT => Format::R32G32_UINT,
        vk::Format::R32G32B32A32_UINT => Format::R32G32B32A32_UINT,
        vk::Format::R16_SFLOAT => Format::R16_SFLOAT,
        vk::Format::R16G16_SFLOAT => Format::R16G16_SFLOAT,
        vk::Format::R16G16B16A16_SFLOAT => Format::R16G16B16A16_SFLOAT,
        vk::Format::R32_SFLOAT => Format::R32_SFLOAT,
        vk::Format::R32G32_SFLOAT => Format::R32G32_SFLOAT,
        vk::Format::R32G32B32A32_SFLOAT => Format::R32G32B32A32_SFLOAT,
        vk::Format::A2B10G10R10_UNORM_PACK32 => Format::A2B10G10R10_UNORM,
        vk::Format::B10G11R11_UFLOAT_PACK32 => Format::B10G11R11_UFLOAT,
        vk::Format::BC1_RGBA_UNORM_BLOCK => Format::BC1_RGBA_UNORM,
        vk::Format::BC3_UNORM_BLOCK => Format::BC3_UNORM,
        vk::Format::BC5_UNORM_BLOCK => Format::BC5_UNORM,
        vk::Format::BC7_UNORM_BLOCK => Format::BC7_UNORM,
        vk::Format::BC7_SRGB_BLOCK => Format::BC7_SRGB,
        vk::Format::D16_UNORM => Format::D16_UNORM,
        vk::Format::D32_SFLOAT => Format::D32_SFLOAT,
        vk::Format::D24_UNORM_S8_UINT => Format::D24_UNORM_S8_UINT,
        vk::Format::D32_SFLOAT_S8_UINT => Format::D32_SFLOAT_S8_UINT,
        _ => Format::Undefined,
    }
}

pub fn vertex_format_to_vk(format: VertexFormat) -> vk::Format {
    match format {
        VertexFormat::R32_SFLOAT => vk::Format::R32_SFLOAT,
        VertexFormat::R32G32_SFLOAT => vk::Format::R32G32_SFLOAT,
        VertexFormat::R32G32B32_SFLOAT => vk::Format::R32G32B32_SFLOAT,
        VertexFormat::R32G32B32A32_SFLOAT => vk::Format::R32G32B32A32_SFLOAT,
        VertexFormat::R32_UINT => vk::Format::R32_UINT,
        VertexFormat::R32G32_UINT => vk::Format::R32G32_UINT,
        VertexFormat::R32G32B32A32_UINT => vk::Format::R32G32B32A32_UINT,
        VertexFormat::R16G16_SFLOAT => vk::Format::R16G16_SFLOAT,
        VertexFormat::R16G16B16A16_SFLOAT => vk::Format::R16G16B16A16_SFLOAT,
        VertexFormat::R8G8B8A8_UNORM => vk::Format::R8G8B8A8_UNORM,
        VertexFormat::R8G8B8A8_UINT => vk::Format::R8G8B8A8_UINT,
    }
}

/// Capabilities implied by the optimal-tiling and buffer feature flags of a
/// format
pub fn format_support_from_vk(properties: &vk::FormatProperties) -> FormatSupport {
    let optimal = properties.optimal_tiling_features;
    let mut support = FormatSupport::empty();
    let pairs = [
        (vk::FormatFeatureFlags::SAMPLED_IMAGE, FormatSupport::SAMPLED),
        (vk::FormatFeatureFlags::SAMPLED_IMAGE_FILTER_LINEAR, FormatSupport::SAMPLED_LINEAR_FILTER),
        (vk::FormatFeatureFlags::STORAGE_IMAGE, FormatSupport::STORAGE),
        (vk::FormatFeatureFlags::COLOR_ATTACHMENT, FormatSupport::COLOR_ATTACHMENT),
        (vk::FormatFeatureFlags::COLOR_ATTACHMENT_BLEND, FormatSupport::COLOR_ATTACHMENT_BLEND),
        (vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT, FormatSupport::DEPTH_STENCIL_ATTACHMENT),
        (vk::FormatFeatureFlags::BLIT_SRC, FormatSupport::BLIT_SRC),
        (vk::FormatFeatureFlags::BLIT_DST, FormatSupport::BLIT_DST),
        (vk::FormatFeatureFlags::TRANSFER_SRC, FormatSupport::TRANSFER_SRC),
        (vk::FormatFeatureFlags::TRANSFER_DST, FormatSupport::TRANSFER_DST),
    ];
    for (native, flag) in pairs {
        if optimal.contains(native) {
            support |= flag;
        }
    }
    if properties.buffer_features.contains(vk::FormatFeatureFlags::VERTEX_BUFFER) {
        support |= FormatSupport::VERTEX_BUFFER;
    }
    support
}

// ===== TEXTURES =====

pub fn texture_layout_to_vk(layout: TextureLayout) -> vk::ImageLayout {
    match layout {
        TextureLayout::Undefined => vk::ImageLayout::UNDEFINED,
        TextureLayout::General => vk::ImageLayout::GENERAL,
        TextureLayout::ColorAttachment => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
        TextureLayout::DepthStencilAttachment => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
        TextureLayout::DepthStencilReadOnly => vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
        TextureLayout::ShaderReadOnly => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
        TextureLayout::TransferSrc => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
        TextureLayout::TransferDst => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
        TextureLayout::Present => vk::ImageLayout::PRESENT_SRC_KHR,
    }
}

pub fn texture_usage_to_vk(usage: TextureUsage) -> vk::ImageUsageFlags {
    let mut flags = vk::ImageUsageFlags::empty();
    if usage.contains(TextureUsage::SAMPLED) {
        flags |= vk::ImageUsageFlags::SAMPLED;
    }
    if usage.contains(TextureUsage::STORAGE) {
        flags |= vk::ImageUsageFlags::STORAGE;
    }
    if usage.contains(TextureUsage::COLOR_ATTACHMENT) {
        flags |= vk::ImageUsageFlags::COLOR_ATTACHMENT;
    }
    if usage.contains(TextureUsage::DEPTH_STENCIL_ATTACHMENT) {
        flags |= vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT;
    }
    if usage.contains(TextureUsage::TRANSFER_SRC) {
        flags |= vk::ImageUsageFlags::TRANSFER_SRC;
    }
    if usage.contains(TextureUsage::TRANSFER_DST) {
        flags |= vk::ImageUsageFlags::TRANSFER_DST;
    }
    flags
}

pub fn texture_type_to_vk(texture_type: TextureType) -> vk::ImageType {
    match texture_type {
        TextureType::D1 => vk::ImageType::TYPE_1D,
        TextureType::D2 | TextureType::Cube => vk::ImageType::TYPE_2D,
        TextureType::D3 => vk::ImageType::TYPE_3D,
    }
}

/// View type covering `array_layers` layers of a texture
pub fn view_type_to_vk(texture_type: TextureType, array_layers: u32) -> vk::ImageViewType {
    match (texture_type, array_layers > 1) {
        (TextureType::D1, false) => vk::ImageViewType::TYPE_1D,
        (TextureType::D1, true) => vk::ImageViewType::TYPE_1D_ARRAY,
        (TextureType::D2, false) => vk::ImageViewType::TYPE_2D,
        (TextureType::D2, true) => vk::ImageViewType::TYPE_2D_ARRAY,
        (TextureType::D3, _) => vk::ImageViewType::TYPE_3D,
        (TextureType::Cube, _) if array_layers > 6 => vk::ImageViewType::CUBE_ARRAY,
        (TextureType::Cube, _) => vk::ImageViewType::CUBE,
    }
}

pub fn aspect_to_vk(aspect: TextureAspect) -> vk::ImageAspectFlags {
    match aspect {
        TextureAspect::Color => vk::ImageAspectFlags::COLOR,
        TextureAspect::Depth => vk::ImageAspectFlags::DEPTH,
        TextureAspect::Stencil => vk::ImageAspectFlags::STENCIL,
    }
}

/// Every aspect of `format` (barriers, clears and copies)
pub fn format_aspect_mask(format: Format) -> vk::ImageAspectFlags {
    let mut mask = vk::ImageAspectFlags::empty();
    if format.has_depth() {
        mask |= vk::ImageAspectFlags::DEPTH;
    }
    if format.has_stencil() {
        mask |= vk::ImageAspectFlags::STENCIL;
    }
    if mask.is_empty() {
        vk::ImageAspectFlags::COLOR
    } else {
        mask
    }
}

pub fn subresource_range_to_vk(range: SubresourceRange, aspect_mask: vk::ImageAspectFlags) -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask,
        base_mip_level: range.base_mip_level,
        level_count: if range.mip_level_count == SubresourceRange::REMAINING {
            vk::REMAINING_MIP_LEVELS
        } else {
            range.mip_level_count
        },
        base_array_layer: range.base_array_layer,
        layer_count: if range.array_layer_count == SubresourceRange::REMAINING {
            vk::REMAINING_ARRAY_LAYERS
        } else {
            range.array_layer_count
        },
    }
}

// ===== SYNCHRONIZATION =====

pub fn access_to_vk(access: Access) -> vk::AccessFlags2 {
    let pairs = [
        (Access::INDIRECT_COMMAND_READ, vk::AccessFlags2::INDIRECT_COMMAND_READ),
        (Access::INDEX_READ, vk::AccessFlags2::INDEX_READ),
        (Access::VERTEX_ATTRIBUTE_READ, vk::AccessFlags2::VERTEX_ATTRIBUTE_READ),
        (Access::UNIFORM_READ, vk::AccessFlags2::UNIFORM_READ),
        (Access::SHADER_READ, vk::AccessFlags2::SHADER_READ),
        (Access::SHADER_WRITE, vk::AccessFlags2::SHADER_WRITE),
        (Access::COLOR_ATTACHMENT_READ, vk::AccessFlags2::COLOR_ATTACHMENT_READ),
        (Access::COLOR_ATTACHMENT_WRITE, vk::AccessFlags2::COLOR_ATTACHMENT_WRITE),
        (Access::DEPTH_STENCIL_READ, vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ),
        (Access::DEPTH_STENCIL_WRITE, vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE),
        (Access::TRANSFER_READ, vk::AccessFlags2::TRANSFER_READ),
        (Access::TRANSFER_WRITE, vk::AccessFlags2::TRANSFER_WRITE),
        (Access::HOST_READ, vk::AccessFlags2::HOST_READ),
        (Access::HOST_WRITE, vk::AccessFlags2::HOST_WRITE),
        (Access::MEMORY_READ, vk::AccessFlags2::MEMORY_READ),
        (Access::MEMORY_WRITE, vk::AccessFlags2::MEMORY_WRITE),
    ];
    pairs
        .into_iter()
        .filter(|(flag, _)| access.contains(*flag))
        .fold(vk::AccessFlags2::NONE, |acc, (_, native)| acc | native)
}

pub fn pipeline_stage_to_vk(stage: PipelineStage) -> vk::PipelineStageFlags2 {
    let pairs = [
        (PipelineStage::TOP_OF_PIPE, vk::PipelineStageFlags2::TOP_OF_PIPE),
        (PipelineStage::DRAW_INDIRECT, vk::PipelineStageFlags2::DRAW_INDIRECT),
        (PipelineStage::VERTEX_INPUT, vk::PipelineStageFlags2::VERTEX_INPUT),
        (PipelineStage::VERTEX_SHADER, vk::PipelineStageFlags2::VERTEX_SHADER),
        (PipelineStage::FRAGMENT_SHADER, vk::PipelineStageFlags2::FRAGMENT_SHADER),
        (PipelineStage::EARLY_FRAGMENT_TESTS, vk::PipelineStageFlags2::EARLY_FRAGMENT_TESTS),
        (PipelineStage::LATE_FRAGMENT_TESTS, vk::PipelineStageFlags2::LATE_FRAGMENT_TESTS),
        (PipelineStage::COLOR_ATTACHMENT_OUTPUT, vk::PipelineStageFlags2::COLOR_ATTACHMENT_OUTPUT),
        (PipelineStage::COMPUTE_SHADER, vk::PipelineStageFlags2::COMPUTE_SHADER),
        (PipelineStage::TRANSFER, vk::PipelineStageFlags2::ALL_TRANSFER),
        (PipelineStage::BOTTOM_OF_PIPE, vk::PipelineStageFlags2::BOTTOM_OF_PIPE),
        (PipelineStage::HOST, vk::PipelineStageFlags2::HOST),
        (PipelineStage::ALL_GRAPHICS, vk::PipelineStageFlags2::ALL_GRAPHICS),
        (PipelineStage::ALL_COMMANDS, vk::PipelineStageFlags2::ALL_COMMANDS),
    ];
    pairs
        .into_iter()
        .filter(|(flag, _)| stage.contains(*flag))
        .fold(vk::PipelineStageFlags2::NONE, |acc, (_, native)| acc | native)
}

// ===== PIPELINE STATE =====

pub fn shader_stage_to_vk(stage: ShaderStage) -> vk::ShaderStageFlags {
    match stage {
        ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
        ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
        ShaderStage::Compute => vk::ShaderStageFlags::COMPUTE,
    }
}

pub fn topology_to_vk(topology: PrimitiveTopology) -> vk::PrimitiveTopology {
    match topology {
        PrimitiveTopology::TriangleList => vk::PrimitiveTopology::TRIANGLE_LIST,
        PrimitiveTopology::TriangleStrip => vk::PrimitiveTopology::TRIANGLE_STRIP,
        PrimitiveTopology::LineList => vk::PrimitiveTopology::LINE_LIST,
        PrimitiveTopology::LineStrip => vk::PrimitiveTopology::LINE_STRIP,
        PrimitiveTopology::PointList => vk::PrimitiveTopology::POINT_LIST,
    }
}

pub fn cull_mode_to_vk(mode: CullMode) -> vk::CullModeFlags {
    match mode {
        CullMode::None => vk::CullModeFlags::NONE,
        CullMode::Front => vk::CullModeFlags::FRONT,
        CullMode::Back => vk::CullModeFlags::BACK,
    }
}

pub fn front_face_to_vk(face: FrontFace) -> vk::FrontFace {
    match face {
        FrontFace::CounterClockwise => vk::FrontFace::COUNTER_CLOCKWISE,
        FrontFace::Clockwise => vk::FrontFace::CLOCKWISE,
    }
}

pub fn polygon_mode_to_vk(mode: PolygonMode) -> vk::PolygonMode {
    match mode {
        PolygonMode::Fill => vk::PolygonMode::FILL,
        PolygonMode::Line => vk::PolygonMode::LINE,
        PolygonMode::Point => vk::PolygonMode::POINT,
    }
}

pub fn compare_op_to_vk(op: CompareOp) -> vk::CompareOp {
    match op {
        CompareOp::Never => vk::CompareOp::NEVER,
        CompareOp::Less => vk::CompareOp::LESS,
        CompareOp::Equal => vk::CompareOp::EQUAL,
        CompareOp::LessOrEqual => vk::CompareOp::LESS_OR_EQUAL,
        CompareOp::Greater => vk::CompareOp::GREATER,
        CompareOp::NotEqual => vk::CompareOp::NOT_EQUAL,
        CompareOp::GreaterOrEqual => vk::CompareOp::GREATER_OR_EQUAL,
        CompareOp::Always => vk::CompareOp::ALWAYS,
    }
}

pub fn stencil_op_to_vk(op: StencilOp) -> vk::StencilOp {
    match op {
        StencilOp::Keep => vk::StencilOp::KEEP,
        StencilOp::Zero => vk::StencilOp::ZERO,
        StencilOp::Replace => vk::StencilOp::REPLACE,
        StencilOp::IncrementAndClamp => vk::StencilOp::INCREMENT_AND_CLAMP,
        StencilOp::DecrementAndClamp => vk::StencilOp::DECREMENT_AND_CLAMP,
        StencilOp::Invert => vk::StencilOp::INVERT,
        StencilOp::IncrementAndWrap => vk::StencilOp::INCREMENT_AND_WRAP,
        StencilOp::DecrementAndWrap => vk::StencilOp::DECREMENT_AND_WRAP,
    }
}

pub fn stencil_op_state_to_vk(state: &StencilOpState) -> vk::StencilOpState {
    vk::StencilOpState {
        fail_op: stencil_op_to_vk(state.fail_op),
        pass_op: stencil_op_to_vk(state.pass_op),
        depth_fail_op: stencil_op_to_vk(state.depth_fail_op),
        compare_op: compare_op_to_vk(state.compare_op),
        compare_mask: state.compare_mask,
        write_mask: state.write_mask,
        reference: state.reference,
    }
}

pub fn blend_factor_to_vk(factor: BlendFactor) -> vk::BlendFactor {
    match factor {
        BlendFactor::Zero => vk::BlendFactor::ZERO,
        BlendFactor::One => vk::BlendFactor::ONE,
        BlendFactor::SrcColor => vk::BlendFactor::SRC_COLOR,
        BlendFactor::OneMinusSrcColor => vk::BlendFactor::ONE_MINUS_SRC_COLOR,
        BlendFactor::DstColor => vk::BlendFactor::DST_COLOR,
        BlendFactor::OneMinusDstColor => vk::BlendFactor::ONE_MINUS_DST_COLOR,
        BlendFactor::SrcAlpha => vk::BlendFactor::SRC_ALPHA,
        BlendFactor::OneMinusSrcAlpha => vk::BlendFactor::ONE_MINUS_SRC_ALPHA,
        BlendFactor::DstAlpha => vk::BlendFactor::DST_ALPHA,
        BlendFactor::OneMinusDstAlpha => vk::BlendFactor::ONE_MINUS_DST_ALPHA,
        BlendFactor::ConstantColor => vk::BlendFactor::CONSTANT_COLOR,
        BlendFactor::OneMinusConstantColor => vk::BlendFactor::ONE_MINUS_CONSTANT_COLOR,
        BlendFactor::SrcAlphaSaturate => vk::BlendFactor::SRC_ALPHA_SATURATE,
    }
}

pub fn blend_op_to_vk(op: BlendOp) -> vk::BlendOp {
    match op {
        BlendOp::Add => vk::BlendOp::ADD,
        BlendOp::Subtract => vk::BlendOp::SUBTRACT,
        BlendOp::ReverseSubtract => vk::BlendOp::REVERSE_SUBTRACT,
        BlendOp::Min => vk::BlendOp::MIN,
        BlendOp::Max => vk::BlendOp::MAX,
    }
}

pub fn color_write_mask_to_vk(mask: ColorWriteMask) -> vk::ColorComponentFlags {
    let mut flags = vk::ColorComponentFlags::empty();
    if mask.contains(ColorWriteMask::R) { flags |= vk::ColorComponentFlags::R; }
    if mask.contains(ColorWriteMask::G) { flags |= vk::ColorComponentFlags::G; }
    if mask.contains(ColorWriteMask::B) { flags |= vk::ColorComponentFlags::B; }
    if mask.contains(ColorWriteMask::A) { flags |= vk::ColorComponentFlags::A; }
    flags
}

pub fn sample_count_to_vk(count: SampleCount) -> vk::SampleCountFlags {
    match count {
        SampleCount::S1 => vk::SampleCountFlags::TYPE_1,
        SampleCount::S2 => vk::SampleCountFlags::TYPE_2,
        SampleCount::S4 => vk::SampleCountFlags::TYPE_4,
        SampleCount::S8 => vk::SampleCountFlags::TYPE_8,
    }
}

pub fn vertex_input_rate_to_vk(rate: VertexInputRate) -> vk::VertexInputRate {
    match rate {
        VertexInputRate::Vertex => vk::VertexInputRate::VERTEX,
        VertexInputRate::Instance => vk::VertexInputRate::INSTANCE,
    }
}

pub fn index_type_to_vk(index_type: IndexType) -> vk::IndexType {
    match index_type {
        IndexType::U16 => vk::IndexType::UINT16,
        IndexType::U32 => vk::IndexType::UINT32,
    }
}

// ===== ATTACHMENTS =====

pub fn load_op_to_vk(load_op: LoadOp) -> vk::AttachmentLoadOp {
    match load_op {
        LoadOp::Load => vk::AttachmentLoadOp::LOAD,
        LoadOp::Clear => vk::AttachmentLoadOp::CLEAR,
        LoadOp::DontCare => vk::AttachmentLoadOp::DONT_CARE,
    }
}

pub fn store_op_to_vk(store_op: StoreOp) -> vk::AttachmentStoreOp {
    match store_op {
        StoreOp::Store => vk::AttachmentStoreOp::STORE,
        StoreOp::DontCare => vk::AttachmentStoreOp::DONT_CARE,
    }
}

// ===== SAMPLERS =====

pub fn filter_to_vk(filter: Filter) -> vk::Filter {
    match filter {
        Filter::Nearest => vk::Filter::NEAREST,
        Filter::Linear => vk::Filter::LINEAR,
    }
}

pub fn mipmap_mode_to_vk(mode: MipmapMode) -> vk::SamplerMipmapMode {
    match mode {
        MipmapMode::Nearest => vk::SamplerMipmapMode::NEAREST,
        MipmapMode::Linear => vk::SamplerMipmapMode::LINEAR,
    }
}

pub fn address_mode_to_vk(mode: AddressMode) -> vk::SamplerAddressMode {
    match mode {
        AddressMode::Repeat => vk::SamplerAddressMode::REPEAT,
        AddressMode::MirroredRepeat => vk::SamplerAddressMode::MIRRORED_REPEAT,
        AddressMode::ClampToEdge => vk::SamplerAddressMode::CLAMP_TO_EDGE,
        AddressMode::ClampToBorder => vk::SamplerAddressMode::CLAMP_TO_BORDER,
    }
}

#[cfg(test)]
#[path = "vulkan_format_tests.rs"]
mod tests;
