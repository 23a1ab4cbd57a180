/// Pixel formats shared by textures, attachments and swapchains

/// Texture / attachment pixel format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[allow(non_camel_case_types)]
pub enum Format {
    /// No format (safe fallback for unknown native formats)
    #[default]
    Undefined,

    // 8-bit color formats
    R8_UNORM,
    R8G8_UNORM,
    R8G8B8A8_UNORM,
    R8G8B8A8_SRGB,
    B8G8R8A8_UNORM,
    B8G8R8A8_SRGB,

    // Integer formats
    R32_UINT,
    R32G32_UINT,
    R32G32B32A32_UINT,

    // HDR / float formats
    R16_SFLOAT,
    R16G16_SFLOAT,
    R16G16B16A16_SFLOAT,
    R32_SFLOAT,
    R32G32_SFLOAT,
    R32G32B32A32_SFLOAT,
    A2B10G10R10_UNORM,
    B10G11R11_UFLOAT,

    // Block-compressed formats
    BC1_RGBA_UNORM,
    BC3_UNORM,
    BC5_UNORM,
    BC7_UNORM,
    BC7_SRGB,

    // Depth / stencil formats
    D16_UNORM,
    D32_SFLOAT,
    D24_UNORM_S8_UINT,
    D32_SFLOAT_S8_UINT,
}

impl Format {
    /// Whether the format has a depth component
    pub fn has_depth(&self) -> bool {
        matches!(
            self,
            Format::D16_UNORM | Format::D32_SFLOAT | Format::D24_UNORM_S8_UINT | Format::D32_SFLOAT_S8_UINT
        )
    }

    /// Whether the format has a stencil component
    pub fn has_stencil(&self) -> bool {
        matches!(self, Format::D24_UNORM_S8_UINT | Format::D32_SFLOAT_S8_UINT)
    }

    /// Whether the format is a depth and/or stencil format
    pub fn is_depth_stencil(&self) -> bool {
        self.has_depth() || self.has_stencil()
    }

    /// Whether the format stores color in sRGB space
    pub fn is_srgb(&self) -> bool {
        matches!(self, Format::R8G8B8A8_SRGB | Format::B8G8R8A8_SRGB | Format::BC7_SRGB)
    }

    /// Whether the format is block-compressed (4x4 blocks)
    pub fn is_compressed(&self) -> bool {
        matches!(
            self,
            Format::BC1_RGBA_UNORM | Format::BC3_UNORM | Format::BC5_UNORM | Format::BC7_UNORM | Format::BC7_SRGB
        )
    }

    /// Size in bytes of one texel, or of one 4x4 block for compressed formats
    pub fn block_size(&self) -> u32 {
        match self {
            Format::Undefined => 0,
            Format::R8_UNORM => 1,
            Format::R8G8_UNORM | Format::R16_SFLOAT | Format::D16_UNORM => 2,
            Format::R8G8B8A8_UNORM
            | Format::R8G8B8A8_SRGB
            | Format::B8G8R8A8_UNORM
            | Format::B8G8R8A8_SRGB
            | Format::R32_UINT
            | Format::R16G16_SFLOAT
            | Format::R32_SFLOAT
            | Format::A2B10G10R10_UNORM
            | Format::B10G11R11_UFLOAT
            | Format::D32_SFLOAT
            | Format::D24_UNORM_S8_UINT => 4,
            Format::R32G32_UINT
            | Format::R16G16B16A16_SFLOAT
            | Format::R32G32_SFLOAT
            | Format::D32_SFLOAT_S8_UINT
            | Format::BC1_RGBA_UNORM => 8,
            Format::R32G32B32A32_UINT
            | Format::R32G32B32A32_SFLOAT
            | Format::BC3_UNORM
            | Format::BC5_UNORM
            | Format::BC7_UNORM
            | Format::BC7_SRGB => 16,
        }
    }

    /// Bytes needed for a tightly packed `width` x `height` image
    pub fn image_size(&self, width: u32, height: u32) -> u64 {
        if self.is_compressed() {
            let blocks_x = width.div_ceil(4) as u64;
            let blocks_y = height.div_ceil(4) as u64;
            blocks_x * blocks_y * self.block_size() as u64
        } else {
            width as u64 * height as u64 * self.block_size() as u64
        }
    }
}
