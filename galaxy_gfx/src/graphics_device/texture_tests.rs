use crate::error::Error;
use crate::flags::TextureUsage;
use crate::graphics_device::mock_graphics_device::*;
use crate::graphics_device::{
    Extent3D, Format, SamplerCreateInfo, TextureCreateInfo, TextureLayout, TextureType,
};

fn texture_info(width: u32, height: u32, format: Format, usage: TextureUsage) -> TextureCreateInfo {
    TextureCreateInfo {
        extent: Extent3D::d2(width, height),
        format,
        usage,
        ..TextureCreateInfo::default()
    }
}

// ============================================================================
// Extent helpers
// ============================================================================

#[test]
fn test_extent_mip_chain() {
    let extent = Extent3D::d2(256, 64);
    assert_eq!(extent.max_mip_levels(), 9);
    assert_eq!(extent.mip(1), Extent3D::d2(128, 32));
    assert_eq!(extent.mip(7), Extent3D::d2(2, 1));
    assert_eq!(extent.mip(12), Extent3D::d2(1, 1));
}

#[test]
fn test_extent_single_texel() {
    assert_eq!(Extent3D::default().max_mip_levels(), 1);
}

// ============================================================================
// Bindless IDs
// ============================================================================

#[test]
fn test_sampled_texture_gets_one_id() {
    let (context, calls) = mock_context();
    let texture = context
        .create_texture(&texture_info(64, 64, Format::R8G8B8A8_UNORM, TextureUsage::default()))
        .unwrap();

    let id = texture.id().unwrap();
    assert_eq!(texture.stencil_id(), None);
    let handle = texture_handle_of(&texture);
    assert!(calls.contains(&format!("write_sampled_texture {} Color -> #{}", id.index(), handle)));
    assert!(calls.matching("write_storage_texture").is_empty());
}

#[test]
fn test_storage_texture_is_written_to_both_arrays() {
    let (context, calls) = mock_context();
    let texture = context
        .create_texture(&texture_info(
            32,
            32,
            Format::R32G32B32A32_SFLOAT,
            TextureUsage::SAMPLED | TextureUsage::STORAGE,
        ))
        .unwrap();

    let id = texture.id().unwrap().index();
    assert_eq!(calls.matching(&format!("write_sampled_texture {} ", id)).len(), 1);
    assert_eq!(calls.matching(&format!("write_storage_texture {} ", id)).len(), 1);
}

#[test]
fn test_depth_stencil_texture_gets_two_ids() {
    let (context, calls) = mock_context();
    let texture = context
        .create_texture(&texture_info(
            128,
            128,
            Format::D24_UNORM_S8_UINT,
            TextureUsage::SAMPLED | TextureUsage::DEPTH_STENCIL_ATTACHMENT,
        ))
        .unwrap();

    let depth = texture.id().unwrap();
    let stencil = texture.stencil_id().unwrap();
    assert_ne!(depth, stencil);
    assert!(calls.contains(&format!(
        "write_sampled_texture {} Depth -> #{}",
        depth.index(),
        texture_handle_of(&texture)
    )));
    assert!(calls.contains(&format!(
        "write_sampled_texture {} Stencil -> #{}",
        stencil.index(),
        texture_handle_of(&texture)
    )));
    assert_eq!(context.resource_manager().live_textures(), 2);
}

#[test]
fn test_depth_only_texture_gets_one_id() {
    let (context, _calls) = mock_context();
    let texture = context
        .create_texture(&texture_info(
            16,
            16,
            Format::D32_SFLOAT,
            TextureUsage::SAMPLED | TextureUsage::DEPTH_STENCIL_ATTACHMENT,
        ))
        .unwrap();
    assert!(texture.id().is_some());
    assert_eq!(texture.stencil_id(), None);
}

#[test]
fn test_attachment_only_texture_has_no_id() {
    let (context, calls) = mock_context();
    let texture = context
        .create_texture(&texture_info(16, 16, Format::R8G8B8A8_UNORM, TextureUsage::COLOR_ATTACHMENT))
        .unwrap();
    assert_eq!(texture.id(), None);
    assert!(calls.matching("write_sampled_texture").is_empty());
    assert_eq!(context.resource_manager().live_textures(), 0);
}

#[test]
fn test_drop_releases_both_ids() {
    let (context, calls) = mock_context();
    let texture = context
        .create_texture(&texture_info(
            8,
            8,
            Format::D32_SFLOAT_S8_UINT,
            TextureUsage::SAMPLED | TextureUsage::DEPTH_STENCIL_ATTACHMENT,
        ))
        .unwrap();
    let depth = texture.id().unwrap().index();
    let stencil = texture.stencil_id().unwrap().index();
    drop(texture);
    context.process_deletions(0);

    assert!(calls.contains(&format!("write_sampled_texture {} -> default", depth)));
    assert!(calls.contains(&format!("write_sampled_texture {} -> default", stencil)));
    assert_eq!(context.resource_manager().live_textures(), 0);
}

// ============================================================================
// Layout tracking and built-in sampler
// ============================================================================

#[test]
fn test_new_texture_starts_undefined() {
    let (context, _calls) = mock_context();
    let texture = context.create_texture(&TextureCreateInfo::default()).unwrap();
    assert_eq!(texture.layout(), TextureLayout::Undefined);
}

#[test]
fn test_texture_with_sampler() {
    let (context, _calls) = mock_context();
    let info = TextureCreateInfo {
        sampler: Some(SamplerCreateInfo::default()),
        ..TextureCreateInfo::default()
    };
    let texture = context.create_texture(&info).unwrap();
    assert!(texture.sampler().is_some());
    assert_eq!(context.resource_manager().live_samplers(), 1);
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_zero_extent_is_invalid() {
    let (context, _calls) = mock_context();
    let result = context.create_texture(&texture_info(0, 16, Format::R8G8B8A8_UNORM, TextureUsage::SAMPLED));
    assert!(matches!(result, Err(Error::InvalidResource(_))));
}

#[test]
fn test_too_many_mips_is_invalid() {
    let (context, _calls) = mock_context();
    let info = TextureCreateInfo {
        mip_levels: 6,
        ..texture_info(16, 16, Format::R8G8B8A8_UNORM, TextureUsage::SAMPLED)
    };
    assert!(matches!(context.create_texture(&info), Err(Error::InvalidResource(_))));
}

#[test]
fn test_cube_must_be_square_with_six_layers() {
    let (context, _calls) = mock_context();
    let info = TextureCreateInfo {
        texture_type: TextureType::Cube,
        array_layers: 6,
        ..texture_info(32, 16, Format::R8G8B8A8_UNORM, TextureUsage::SAMPLED)
    };
    assert!(context.create_texture(&info).is_err());

    let info = TextureCreateInfo {
        extent: Extent3D::d2(32, 32),
        ..info
    };
    assert!(context.create_texture(&info).is_ok());
}

#[test]
fn test_unsupported_usage_for_format_is_rejected() {
    let (context, _calls) = mock_context();
    // Depth formats cannot be storage images on the mock device
    let result = context.create_texture(&texture_info(16, 16, Format::D32_SFLOAT, TextureUsage::STORAGE));
    assert!(matches!(result, Err(Error::InvalidResource(_))));
}

#[test]
fn test_undefined_format_is_rejected() {
    let (context, _calls) = mock_context();
    let result = context.create_texture(&texture_info(16, 16, Format::Undefined, TextureUsage::SAMPLED));
    assert!(matches!(result, Err(Error::InvalidResource(_))));
}
