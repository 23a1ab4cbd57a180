/// Pipeline - Vulkan implementation of RawPipeline
///
/// Every pipeline shares the device's global layout (bindless set 0 plus one
/// push-constant range), so binding a pipeline never invalidates the
/// bindless descriptors. Graphics pipelines target dynamic rendering and
/// keep viewport and scissor dynamic.

use galaxy_gfx::gfx::{
    ComputePipelineCreateInfo, Error, GraphicsPipelineCreateInfo, RawPipeline, Result, Shader,
};
use galaxy_gfx::engine_err;
use ash::vk;
use std::any::Any;
use std::ffi::CString;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{
    blend_factor_to_vk, blend_op_to_vk, color_write_mask_to_vk, compare_op_to_vk, cull_mode_to_vk, format_to_vk,
    front_face_to_vk, polygon_mode_to_vk, sample_count_to_vk, stencil_op_state_to_vk, topology_to_vk,
    vertex_format_to_vk, vertex_input_rate_to_vk,
};
use crate::vulkan_shader::VulkanShader;

/// Vulkan pipeline implementation
pub struct VulkanPipeline {
    ctx: Arc<GpuContext>,
    pub(crate) pipeline: vk::Pipeline,
    pub(crate) bind_point: vk::PipelineBindPoint,
}

fn shader_stage<'a>(shader: &'a Shader, entry_point: &'a CString) -> Result<vk::PipelineShaderStageCreateInfo<'a>> {
    let module = shader
        .raw()
        .as_any()
        .downcast_ref::<VulkanShader>()
        .ok_or_else(|| Error::InvalidResource("shader was not created by the Vulkan backend".to_string()))?
        .module;
    Ok(vk::PipelineShaderStageCreateInfo::default()
        .stage(crate::vulkan_format::shader_stage_to_vk(shader.stage()))
        .module(module)
        .name(entry_point))
}

fn entry_point_name(shader: &Shader) -> Result<CString> {
    CString::new(shader.entry_point())
        .map_err(|_| Error::InvalidResource(format!("entry point '{}' contains a NUL byte", shader.entry_point())))
}

impl VulkanPipeline {
    pub(crate) fn graphics(
        ctx: Arc<GpuContext>,
        layout: vk::PipelineLayout,
        info: &GraphicsPipelineCreateInfo,
    ) -> Result<Self> {
        let vertex_entry = entry_point_name(&info.vertex)?;
        let fragment_entry = info.fragment.as_deref().map(entry_point_name).transpose()?;

        let mut shader_stages = vec![shader_stage(&info.vertex, &vertex_entry)?];
        if let (Some(fragment), Some(entry)) = (info.fragment.as_deref(), fragment_entry.as_ref()) {
            shader_stages.push(shader_stage(fragment, entry)?);
        }

        // Vertex input state
        let vertex_bindings: Vec<vk::VertexInputBindingDescription> = info.vertex_layout.bindings
            .iter()
            .map(|binding| vk::VertexInputBindingDescription {
                binding: binding.binding,
                stride: binding.stride,
                input_rate: vertex_input_rate_to_vk(binding.input_rate),
            })
            .collect();

        let vertex_attributes: Vec<vk::VertexInputAttributeDescription> = info.vertex_layout.attributes
            .iter()
            .map(|attribute| vk::VertexInputAttributeDescription {
                location: attribute.location,
                binding: attribute.binding,
                format: vertex_format_to_vk(attribute.format),
                offset: attribute.offset,
            })
            .collect();

        let vertex_input_state = vk::PipelineVertexInputStateCreateInfo::default()
            .vertex_binding_descriptions(&vertex_bindings)
            .vertex_attribute_descriptions(&vertex_attributes);

        let input_assembly_state = vk::PipelineInputAssemblyStateCreateInfo::default()
            .topology(topology_to_vk(info.topology))
            .primitive_restart_enable(false);

        // Viewport state (dynamic, counts only)
        let viewport_state = vk::PipelineViewportStateCreateInfo::default()
            .viewport_count(1)
            .scissor_count(1);

        let rasterization_state = {
            let mut state = vk::PipelineRasterizationStateCreateInfo::default()
                .depth_clamp_enable(false)
                .rasterizer_discard_enable(false)
                .polygon_mode(polygon_mode_to_vk(info.rasterization.polygon_mode))
                .line_width(1.0)
                .cull_mode(cull_mode_to_vk(info.rasterization.cull_mode))
                .front_face(front_face_to_vk(info.rasterization.front_face));
            if let Some(bias) = info.rasterization.depth_bias {
                state = state
                    .depth_bias_enable(true)
                    .depth_bias_constant_factor(bias.constant_factor)
                    .depth_bias_slope_factor(bias.slope_factor)
                    .depth_bias_clamp(bias.clamp);
            } else {
                state = state.depth_bias_enable(false);
            }
            state
        };

        let depth_stencil_state = vk::PipelineDepthStencilStateCreateInfo::default()
            .depth_test_enable(info.depth_stencil.depth_test_enable)
            .depth_write_enable(info.depth_stencil.depth_write_enable)
            .depth_compare_op(compare_op_to_vk(info.depth_stencil.depth_compare_op))
            .depth_bounds_test_enable(false)
            .stencil_test_enable(info.depth_stencil.stencil_test_enable)
            .front(stencil_op_state_to_vk(&info.depth_stencil.front))
            .back(stencil_op_state_to_vk(&info.depth_stencil.back));

        let multisample_state = vk::PipelineMultisampleStateCreateInfo::default()
            .sample_shading_enable(false)
            .rasterization_samples(sample_count_to_vk(info.samples));

        let blend_attachments: Vec<vk::PipelineColorBlendAttachmentState> = info.blend
            .iter()
            .map(|blend| {
                let mut attachment = vk::PipelineColorBlendAttachmentState::default()
                    .color_write_mask(color_write_mask_to_vk(blend.color_write_mask))
                    .blend_enable(blend.blend_enable);
                if blend.blend_enable {
                    attachment = attachment
                        .src_color_blend_factor(blend_factor_to_vk(blend.src_color_factor))
                        .dst_color_blend_factor(blend_factor_to_vk(blend.dst_color_factor))
                        .color_blend_op(blend_op_to_vk(blend.color_blend_op))
                        .src_alpha_blend_factor(blend_factor_to_vk(blend.src_alpha_factor))
                        .dst_alpha_blend_factor(blend_factor_to_vk(blend.dst_alpha_factor))
                        .alpha_blend_op(blend_op_to_vk(blend.alpha_blend_op));
                }
                attachment
            })
            .collect();

        let color_blend_state = vk::PipelineColorBlendStateCreateInfo::default()
            .logic_op_enable(false)
            .attachments(&blend_attachments);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::default()
            .dynamic_states(&dynamic_states);

        // Attachment formats for dynamic rendering (no render pass)
        let color_formats: Vec<vk::Format> = info.color_formats.iter().map(|&f| format_to_vk(f)).collect();
        let depth_format = info.depth_format.map(format_to_vk).unwrap_or(vk::Format::UNDEFINED);
        let stencil_format = match info.depth_format {
            Some(format) if format.has_stencil() => format_to_vk(format),
            _ => vk::Format::UNDEFINED,
        };
        let mut rendering_info = vk::PipelineRenderingCreateInfo::default()
            .color_attachment_formats(&color_formats)
            .depth_attachment_format(depth_format)
            .stencil_attachment_format(stencil_format);

        let pipeline_create_info = vk::GraphicsPipelineCreateInfo::default()
            .push_next(&mut rendering_info)
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_state)
            .input_assembly_state(&input_assembly_state)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterization_state)
            .depth_stencil_state(&depth_stencil_state)
            .multisample_state(&multisample_state)
            .color_blend_state(&color_blend_state)
            .dynamic_state(&dynamic_state)
            .layout(layout);

        let pipeline = unsafe {
            ctx.device
                .create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_create_info], None)
                .map_err(|(_, e)| engine_err!("gfx::vulkan", "Failed to create graphics pipeline: {:?}", e))?
        };
        let pipeline = pipeline
            .into_iter()
            .next()
            .ok_or_else(|| engine_err!("gfx::vulkan", "Driver returned no graphics pipeline"))?;

        Ok(Self {
            ctx,
            pipeline,
            bind_point: vk::PipelineBindPoint::GRAPHICS,
        })
    }

    pub(crate) fn compute(
        ctx: Arc<GpuContext>,
        layout: vk::PipelineLayout,
        info: &ComputePipelineCreateInfo,
    ) -> Result<Self> {
        let entry = entry_point_name(&info.shader)?;
        let stage = shader_stage(&info.shader, &entry)?;
        let pipeline_create_info = vk::ComputePipelineCreateInfo::default()
            .stage(stage)
            .layout(layout);

        let pipeline = unsafe {
            ctx.device
                .create_compute_pipelines(vk::PipelineCache::null(), &[pipeline_create_info], None)
                .map_err(|(_, e)| engine_err!("gfx::vulkan", "Failed to create compute pipeline: {:?}", e))?
        };
        let pipeline = pipeline
            .into_iter()
            .next()
            .ok_or_else(|| engine_err!("gfx::vulkan", "Driver returned no compute pipeline"))?;

        Ok(Self {
            ctx,
            pipeline,
            bind_point: vk::PipelineBindPoint::COMPUTE,
        })
    }

    /// Native pipeline handle
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }
}

impl RawPipeline for VulkanPipeline {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanPipeline {
    fn drop(&mut self) {
        unsafe {
            // The layout is shared and owned by the device
            self.ctx.device.destroy_pipeline(self.pipeline, None);
        }
    }
}
