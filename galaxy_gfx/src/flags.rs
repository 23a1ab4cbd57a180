//! Bitmask types shared by the whole layer
//!
//! All masks are `bitflags` types so combining, testing and printing them is
//! type-checked: a `PipelineStage` can never be passed where an `Access` is
//! expected.

use bitflags::bitflags;

use crate::graphics_device::TextureLayout;

bitflags! {
    /// How a texture may be used over its lifetime
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        /// Sampled from shaders (bindless sampled-texture array)
        const SAMPLED = 1 << 0;
        /// Read/written as a storage image (bindless storage-texture array)
        const STORAGE = 1 << 1;
        /// Rendered to as a color attachment
        const COLOR_ATTACHMENT = 1 << 2;
        /// Rendered to as a depth/stencil attachment
        const DEPTH_STENCIL_ATTACHMENT = 1 << 3;
        /// Source of copies and blits
        const TRANSFER_SRC = 1 << 4;
        /// Destination of copies, blits and clears
        const TRANSFER_DST = 1 << 5;
    }
}

impl Default for TextureUsage {
    fn default() -> Self {
        Self::SAMPLED | Self::TRANSFER_DST
    }
}

bitflags! {
    /// Memory access kinds used in barriers
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Access: u32 {
        const INDIRECT_COMMAND_READ = 1 << 0;
        const INDEX_READ = 1 << 1;
        const VERTEX_ATTRIBUTE_READ = 1 << 2;
        const UNIFORM_READ = 1 << 3;
        const SHADER_READ = 1 << 4;
        const SHADER_WRITE = 1 << 5;
        const COLOR_ATTACHMENT_READ = 1 << 6;
        const COLOR_ATTACHMENT_WRITE = 1 << 7;
        const DEPTH_STENCIL_READ = 1 << 8;
        const DEPTH_STENCIL_WRITE = 1 << 9;
        const TRANSFER_READ = 1 << 10;
        const TRANSFER_WRITE = 1 << 11;
        const HOST_READ = 1 << 12;
        const HOST_WRITE = 1 << 13;
        const MEMORY_READ = 1 << 14;
        const MEMORY_WRITE = 1 << 15;
    }
}

impl Access {
    /// Every write access bit
    pub const WRITES: Self = Self::SHADER_WRITE
        .union(Self::COLOR_ATTACHMENT_WRITE)
        .union(Self::DEPTH_STENCIL_WRITE)
        .union(Self::TRANSFER_WRITE)
        .union(Self::HOST_WRITE)
        .union(Self::MEMORY_WRITE);

    /// Whether any write access is included
    pub fn is_write(self) -> bool {
        self.intersects(Self::WRITES)
    }
}

bitflags! {
    /// Pipeline stages used as barrier scopes
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PipelineStage: u32 {
        const TOP_OF_PIPE = 1 << 0;
        const DRAW_INDIRECT = 1 << 1;
        const VERTEX_INPUT = 1 << 2;
        const VERTEX_SHADER = 1 << 3;
        const FRAGMENT_SHADER = 1 << 4;
        const EARLY_FRAGMENT_TESTS = 1 << 5;
        const LATE_FRAGMENT_TESTS = 1 << 6;
        const COLOR_ATTACHMENT_OUTPUT = 1 << 7;
        const COMPUTE_SHADER = 1 << 8;
        const TRANSFER = 1 << 9;
        const BOTTOM_OF_PIPE = 1 << 10;
        const HOST = 1 << 11;
        const ALL_GRAPHICS = 1 << 12;
        const ALL_COMMANDS = 1 << 13;
    }
}

bitflags! {
    /// Shader stages a push-constant range or shader module applies to
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ShaderStages: u32 {
        const VERTEX = 1 << 0;
        const FRAGMENT = 1 << 1;
        const COMPUTE = 1 << 2;
        const ALL_GRAPHICS = Self::VERTEX.bits() | Self::FRAGMENT.bits();
        const ALL = Self::ALL_GRAPHICS.bits() | Self::COMPUTE.bits();
    }
}

bitflags! {
    /// Color channels written by a blend attachment
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ColorWriteMask: u8 {
        const R = 1 << 0;
        const G = 1 << 1;
        const B = 1 << 2;
        const A = 1 << 3;
        const ALL = Self::R.bits() | Self::G.bits() | Self::B.bits() | Self::A.bits();
    }
}

impl Default for ColorWriteMask {
    fn default() -> Self {
        Self::ALL
    }
}

bitflags! {
    /// Per-format capabilities reported by the device
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FormatSupport: u32 {
        const SAMPLED = 1 << 0;
        const SAMPLED_LINEAR_FILTER = 1 << 1;
        const STORAGE = 1 << 2;
        const COLOR_ATTACHMENT = 1 << 3;
        const COLOR_ATTACHMENT_BLEND = 1 << 4;
        const DEPTH_STENCIL_ATTACHMENT = 1 << 5;
        const BLIT_SRC = 1 << 6;
        const BLIT_DST = 1 << 7;
        const TRANSFER_SRC = 1 << 8;
        const TRANSFER_DST = 1 << 9;
        const VERTEX_BUFFER = 1 << 10;
    }
}

impl FormatSupport {
    /// Capabilities a texture with `usage` needs from its format
    pub fn required_for(usage: TextureUsage) -> Self {
        let mut required = Self::empty();
        if usage.contains(TextureUsage::SAMPLED) {
            required |= Self::SAMPLED;
        }
        if usage.contains(TextureUsage::STORAGE) {
            required |= Self::STORAGE;
        }
        if usage.contains(TextureUsage::COLOR_ATTACHMENT) {
            required |= Self::COLOR_ATTACHMENT;
        }
        if usage.contains(TextureUsage::DEPTH_STENCIL_ATTACHMENT) {
            required |= Self::DEPTH_STENCIL_ATTACHMENT;
        }
        if usage.contains(TextureUsage::TRANSFER_SRC) {
            required |= Self::TRANSFER_SRC;
        }
        if usage.contains(TextureUsage::TRANSFER_DST) {
            required |= Self::TRANSFER_DST;
        }
        required
    }
}

/// Canonical access mask and stage scope for a texture sitting in `layout`.
///
/// Used on both sides of an automatic transition: as the source scope for
/// the layout being left and as the destination scope for the layout being
/// entered.
pub fn layout_access_and_stage(layout: TextureLayout) -> (Access, PipelineStage) {
    match layout {
        TextureLayout::Undefined => (Access::empty(), PipelineStage::TOP_OF_PIPE),
        TextureLayout::General => (
            Access::SHADER_READ | Access::SHADER_WRITE,
            PipelineStage::ALL_COMMANDS,
        ),
        TextureLayout::ColorAttachment => (
            Access::COLOR_ATTACHMENT_READ | Access::COLOR_ATTACHMENT_WRITE,
            PipelineStage::COLOR_ATTACHMENT_OUTPUT,
        ),
        TextureLayout::DepthStencilAttachment => (
            Access::DEPTH_STENCIL_READ | Access::DEPTH_STENCIL_WRITE,
            PipelineStage::EARLY_FRAGMENT_TESTS | PipelineStage::LATE_FRAGMENT_TESTS,
        ),
        TextureLayout::DepthStencilReadOnly => (
            Access::DEPTH_STENCIL_READ | Access::SHADER_READ,
            PipelineStage::EARLY_FRAGMENT_TESTS
                | PipelineStage::LATE_FRAGMENT_TESTS
                | PipelineStage::FRAGMENT_SHADER,
        ),
        TextureLayout::ShaderReadOnly => (
            Access::SHADER_READ,
            PipelineStage::VERTEX_SHADER
                | PipelineStage::FRAGMENT_SHADER
                | PipelineStage::COMPUTE_SHADER,
        ),
        TextureLayout::TransferSrc => (Access::TRANSFER_READ, PipelineStage::TRANSFER),
        TextureLayout::TransferDst => (Access::TRANSFER_WRITE, PipelineStage::TRANSFER),
        TextureLayout::Present => (Access::empty(), PipelineStage::BOTTOM_OF_PIPE),
    }
}

#[cfg(test)]
#[path = "flags_tests.rs"]
mod tests;
