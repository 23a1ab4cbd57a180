//! Unit tests for Pipeline module
//!
//! Tests vertex input types and pipeline creation through the context
//! (stage checks, blend/attachment agreement, push-constant resolution).

use std::sync::Arc;

use crate::error::Error;
use crate::graphics_device::mock_graphics_device::*;
use crate::graphics_device::{
    ColorBlendState, ComputePipelineCreateInfo, Context, Format, GraphicsPipelineCreateInfo, IndexType,
    PipelineBindPoint, Shader, ShaderCreateInfo, ShaderStage, VertexFormat,
};

fn shader(context: &Context, stage: ShaderStage, push_constant_size: u32) -> Arc<Shader> {
    context
        .create_shader(&ShaderCreateInfo::new(spirv_stub(push_constant_size), stage))
        .unwrap()
}

// ============================================================================
// VERTEX INPUT TESTS
// ============================================================================

#[test]
fn test_index_type_size_bytes() {
    assert_eq!(IndexType::U16.size_bytes(), 2);
    assert_eq!(IndexType::U32.size_bytes(), 4);
}

#[test]
fn test_vertex_format_size_bytes() {
    assert_eq!(VertexFormat::R32_SFLOAT.size_bytes(), 4);
    assert_eq!(VertexFormat::R32G32B32_SFLOAT.size_bytes(), 12);
    assert_eq!(VertexFormat::R16G16B16A16_SFLOAT.size_bytes(), 8);
    assert_eq!(VertexFormat::R32G32B32A32_UINT.size_bytes(), 16);
    assert_eq!(VertexFormat::R8G8B8A8_UNORM.size_bytes(), 4);
}

#[test]
fn test_alpha_blending_preset() {
    let blend = ColorBlendState::alpha_blending();
    assert!(blend.blend_enable);
    assert!(!ColorBlendState::default().blend_enable);
}

// ============================================================================
// GRAPHICS PIPELINE TESTS
// ============================================================================

#[test]
fn test_graphics_pipeline_takes_largest_reflected_push_constants() {
    let (context, _calls) = mock_context();
    let info = GraphicsPipelineCreateInfo::new(
        shader(&context, ShaderStage::Vertex, 16),
        shader(&context, ShaderStage::Fragment, 48),
        Format::B8G8R8A8_SRGB,
    );
    let pipeline = context.create_graphics_pipeline(&info).unwrap();
    assert_eq!(pipeline.bind_point(), PipelineBindPoint::Graphics);
    assert_eq!(pipeline.push_constant_size(), 48);
}

#[test]
fn test_explicit_push_constant_size_wins() {
    let (context, _calls) = mock_context();
    let info = GraphicsPipelineCreateInfo {
        push_constant_size: 96,
        ..GraphicsPipelineCreateInfo::new(
            shader(&context, ShaderStage::Vertex, 16),
            shader(&context, ShaderStage::Fragment, 0),
            Format::R8G8B8A8_UNORM,
        )
    };
    assert_eq!(context.create_graphics_pipeline(&info).unwrap().push_constant_size(), 96);
}

#[test]
fn test_push_constants_over_device_limit() {
    let (context, calls) = mock_context();
    let info = GraphicsPipelineCreateInfo::new(
        shader(&context, ShaderStage::Vertex, 256),
        shader(&context, ShaderStage::Fragment, 0),
        Format::R8G8B8A8_UNORM,
    );
    assert!(matches!(context.create_graphics_pipeline(&info), Err(Error::InvalidResource(_))));
    assert!(calls.matching("create_graphics_pipeline").is_empty());
}

#[test]
fn test_wrong_shader_stage_is_rejected() {
    let (context, _calls) = mock_context();
    let info = GraphicsPipelineCreateInfo::new(
        shader(&context, ShaderStage::Fragment, 0),
        shader(&context, ShaderStage::Fragment, 0),
        Format::R8G8B8A8_UNORM,
    );
    assert!(context.create_graphics_pipeline(&info).is_err());
}

#[test]
fn test_blend_count_must_match_color_targets() {
    let (context, _calls) = mock_context();
    let mut info = GraphicsPipelineCreateInfo::new(
        shader(&context, ShaderStage::Vertex, 0),
        shader(&context, ShaderStage::Fragment, 0),
        Format::R8G8B8A8_UNORM,
    );
    info.color_formats.push(Format::R16G16B16A16_SFLOAT);
    assert!(context.create_graphics_pipeline(&info).is_err());

    info.blend.push(ColorBlendState::alpha_blending());
    assert!(context.create_graphics_pipeline(&info).is_ok());
}

#[test]
fn test_depth_format_must_be_depth() {
    let (context, _calls) = mock_context();
    let mut info = GraphicsPipelineCreateInfo::new(
        shader(&context, ShaderStage::Vertex, 0),
        shader(&context, ShaderStage::Fragment, 0),
        Format::R8G8B8A8_UNORM,
    );
    info.depth_format = Some(Format::R32_SFLOAT);
    assert!(context.create_graphics_pipeline(&info).is_err());

    info.depth_format = Some(Format::D32_SFLOAT);
    assert!(context.create_graphics_pipeline(&info).is_ok());
}

#[test]
fn test_depth_only_pipeline() {
    let (context, _calls) = mock_context();
    let info = GraphicsPipelineCreateInfo {
        fragment: None,
        blend: Vec::new(),
        color_formats: Vec::new(),
        depth_format: Some(Format::D32_SFLOAT),
        ..GraphicsPipelineCreateInfo::new(
            shader(&context, ShaderStage::Vertex, 0),
            shader(&context, ShaderStage::Fragment, 0),
            Format::R8G8B8A8_UNORM,
        )
    };
    assert!(context.create_graphics_pipeline(&info).is_ok());
}

// ============================================================================
// COMPUTE PIPELINE TESTS
// ============================================================================

#[test]
fn test_compute_pipeline() {
    let (context, calls) = mock_context();
    let info = ComputePipelineCreateInfo {
        shader: shader(&context, ShaderStage::Compute, 32),
        push_constant_size: 0,
    };
    let pipeline = context.create_compute_pipeline(&info).unwrap();
    assert_eq!(pipeline.bind_point(), PipelineBindPoint::Compute);
    assert_eq!(pipeline.push_constant_size(), 32);
    assert_eq!(calls.matching("create_compute_pipeline").len(), 1);
}

#[test]
fn test_compute_pipeline_rejects_vertex_shader() {
    let (context, _calls) = mock_context();
    let info = ComputePipelineCreateInfo {
        shader: shader(&context, ShaderStage::Vertex, 0),
        push_constant_size: 0,
    };
    assert!(matches!(context.create_compute_pipeline(&info), Err(Error::InvalidResource(_))));
}

#[test]
fn test_pipeline_drop_is_deferred() {
    let (context, calls) = mock_context();
    let info = ComputePipelineCreateInfo {
        shader: shader(&context, ShaderStage::Compute, 0),
        push_constant_size: 0,
    };
    let pipeline = context.create_compute_pipeline(&info).unwrap();
    drop(pipeline);
    assert!(calls.matching("destroy_pipeline").is_empty());
    context.process_deletions(0);
    assert_eq!(calls.matching("destroy_pipeline").len(), 1);
}
