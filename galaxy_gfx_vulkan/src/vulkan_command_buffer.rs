/// CommandBuffer - Vulkan implementation of RawCommandBuffer
///
/// Translates recorded `GpuCommand`s into native commands. Barriers use
/// synchronization2 and render passes use dynamic rendering. Transfer
/// commands expect the tracked layouts TRANSFER_SRC / TRANSFER_DST, and
/// attachments are expected in their attachment-optimal layout when
/// rendering begins.

use galaxy_gfx::gfx::{
    Buffer, ClearValue, ColorAttachmentOps, DepthAttachmentOps, Error, FrameBuffer, GpuCommand, Pipeline,
    RawCommandBuffer, Rect, Result, Texture,
};
use galaxy_gfx::{engine_err, engine_error, engine_warn};
use ash::vk;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{
    access_to_vk, filter_to_vk, format_aspect_mask, index_type_to_vk, load_op_to_vk, pipeline_stage_to_vk,
    store_op_to_vk, subresource_range_to_vk, texture_layout_to_vk,
};
use crate::vulkan_pipeline::VulkanPipeline;
use crate::vulkan_texture::VulkanTexture;

pub(crate) fn vulkan_texture(texture: &Texture) -> Result<&VulkanTexture> {
    texture
        .raw()
        .as_any()
        .downcast_ref::<VulkanTexture>()
        .ok_or_else(|| Error::InvalidResource("texture was not created by the Vulkan backend".to_string()))
}

pub(crate) fn vulkan_buffer(buffer: &Buffer) -> Result<&VulkanBuffer> {
    buffer
        .raw()
        .as_any()
        .downcast_ref::<VulkanBuffer>()
        .ok_or_else(|| Error::InvalidResource("buffer was not created by the Vulkan backend".to_string()))
}

fn vulkan_pipeline(pipeline: &Pipeline) -> Result<&VulkanPipeline> {
    pipeline
        .raw()
        .as_any()
        .downcast_ref::<VulkanPipeline>()
        .ok_or_else(|| Error::InvalidResource("pipeline was not created by the Vulkan backend".to_string()))
}

/// Single aspect used by copies (depth for depth formats)
fn copy_aspect(texture: &Texture) -> vk::ImageAspectFlags {
    if texture.format().has_depth() {
        vk::ImageAspectFlags::DEPTH
    } else {
        vk::ImageAspectFlags::COLOR
    }
}

/// Vulkan command buffer implementation
///
/// Owns its command pool so buffers can be recorded from several threads.
pub struct VulkanCommandBuffer {
    ctx: Arc<GpuContext>,
    command_pool: vk::CommandPool,
    command_buffer: vk::CommandBuffer,
    /// Global layout shared by every pipeline
    pipeline_layout: vk::PipelineLayout,
    bindless_set: vk::DescriptorSet,
    is_recording: bool,
    in_rendering: bool,
    /// Bindless set already bound for [graphics, compute]
    set_bound: [bool; 2],
}

impl VulkanCommandBuffer {
    pub(crate) fn new(
        ctx: Arc<GpuContext>,
        pipeline_layout: vk::PipelineLayout,
        bindless_set: vk::DescriptorSet,
    ) -> Result<Self> {
        unsafe {
            let command_pool_create_info = vk::CommandPoolCreateInfo::default()
                .queue_family_index(ctx.graphics_queue_family)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER);

            let command_pool = ctx.device.create_command_pool(&command_pool_create_info, None)
                .map_err(|e| engine_err!("gfx::vulkan", "Failed to create command pool: {:?}", e))?;

            let command_buffer_allocate_info = vk::CommandBufferAllocateInfo::default()
                .command_pool(command_pool)
                .level(vk::CommandBufferLevel::PRIMARY)
                .command_buffer_count(1);

            let command_buffer = match ctx.device.allocate_command_buffers(&command_buffer_allocate_info) {
                Ok(buffers) => buffers.into_iter().next().unwrap_or_default(),
                Err(e) => {
                    ctx.device.destroy_command_pool(command_pool, None);
                    return Err(engine_err!("gfx::vulkan", "Failed to allocate command buffer: {:?}", e));
                }
            };

            Ok(Self {
                ctx,
                command_pool,
                command_buffer,
                pipeline_layout,
                bindless_set,
                is_recording: false,
                in_rendering: false,
                set_bound: [false; 2],
            })
        }
    }

    /// Native command buffer, for user-defined commands
    pub fn command_buffer(&self) -> vk::CommandBuffer {
        self.command_buffer
    }

    /// Logical device, for user-defined commands
    pub fn device(&self) -> &ash::Device {
        &self.ctx.device
    }

    /// Global pipeline layout (push constants, bindless set 0)
    pub fn pipeline_layout(&self) -> vk::PipelineLayout {
        self.pipeline_layout
    }

    pub(crate) fn is_recording(&self) -> bool {
        self.is_recording
    }

    fn bind_pipeline(&mut self, pipeline: &Pipeline) -> Result<()> {
        let pipeline = vulkan_pipeline(pipeline)?;
        let slot = if pipeline.bind_point == vk::PipelineBindPoint::COMPUTE { 1 } else { 0 };
        unsafe {
            self.ctx.device.cmd_bind_pipeline(self.command_buffer, pipeline.bind_point, pipeline.pipeline);
            if !self.set_bound[slot] {
                self.ctx.device.cmd_bind_descriptor_sets(
                    self.command_buffer,
                    pipeline.bind_point,
                    self.pipeline_layout,
                    0,
                    &[self.bindless_set],
                    &[],
                );
                self.set_bound[slot] = true;
            }
        }
        Ok(())
    }

    fn begin_rendering(
        &mut self,
        frame_buffer: &FrameBuffer,
        color_ops: &[ColorAttachmentOps],
        depth_ops: Option<&DepthAttachmentOps>,
        render_area: Rect,
    ) -> Result<()> {
        if self.in_rendering {
            return Err(engine_err!("gfx::vulkan", "BeginRendering inside an active rendering scope"));
        }

        let mut color_attachments = Vec::with_capacity(frame_buffer.color_attachments().len());
        for (index, texture) in frame_buffer.color_attachments().iter().enumerate() {
            let ops = color_ops.get(index).copied().unwrap_or_default();
            let view = vulkan_texture(texture)?.attachment_view;
            color_attachments.push(
                vk::RenderingAttachmentInfo::default()
                    .image_view(view)
                    .image_layout(vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL)
                    .load_op(load_op_to_vk(ops.load))
                    .store_op(store_op_to_vk(ops.store))
                    .clear_value(vk::ClearValue {
                        color: vk::ClearColorValue { float32: ops.clear },
                    }),
            );
        }

        let mut depth_attachment = None;
        let mut stencil_attachment = None;
        if let Some(texture) = frame_buffer.depth_attachment() {
            let ops = depth_ops.copied().unwrap_or_default();
            let attachment = vk::RenderingAttachmentInfo::default()
                .image_view(vulkan_texture(texture)?.attachment_view)
                .image_layout(vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL)
                .load_op(load_op_to_vk(ops.load))
                .store_op(store_op_to_vk(ops.store))
                .clear_value(vk::ClearValue {
                    depth_stencil: vk::ClearDepthStencilValue {
                        depth: ops.clear_depth,
                        stencil: ops.clear_stencil,
                    },
                });
            if texture.format().has_depth() {
                depth_attachment = Some(attachment);
            }
            if texture.format().has_stencil() {
                stencil_attachment = Some(attachment);
            }
        }

        let mut rendering_info = vk::RenderingInfo::default()
            .render_area(vk::Rect2D {
                offset: vk::Offset2D { x: render_area.x, y: render_area.y },
                extent: vk::Extent2D { width: render_area.width, height: render_area.height },
            })
            .layer_count(1)
            .color_attachments(&color_attachments);
        if let Some(depth) = depth_attachment.as_ref() {
            rendering_info = rendering_info.depth_attachment(depth);
        }
        if let Some(stencil) = stencil_attachment.as_ref() {
            rendering_info = rendering_info.stencil_attachment(stencil);
        }

        unsafe {
            self.ctx.device.cmd_begin_rendering(self.command_buffer, &rendering_info);
        }
        self.in_rendering = true;
        Ok(())
    }
}

impl RawCommandBuffer for VulkanCommandBuffer {
    fn begin(&mut self) -> Result<()> {
        if self.is_recording {
            engine_warn!("gfx::vulkan", "Command buffer begun while still recording, resetting it");
        }
        // Reset clears any recording left by a failed encode
        self.is_recording = false;
        self.in_rendering = false;

        unsafe {
            self.ctx.device
                .reset_command_buffer(self.command_buffer, vk::CommandBufferResetFlags::empty())
                .map_err(|e| engine_err!("gfx::vulkan", "Failed to reset command buffer: {:?}", e))?;

            let begin_info = vk::CommandBufferBeginInfo::default()
                .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT);
            self.ctx.device
                .begin_command_buffer(self.command_buffer, &begin_info)
                .map_err(|e| engine_err!("gfx::vulkan", "Failed to begin command buffer: {:?}", e))?;
        }

        self.is_recording = true;
        self.set_bound = [false; 2];
        Ok(())
    }

    fn encode(&mut self, command: &GpuCommand) -> Result<()> {
        if !self.is_recording {
            return Err(engine_err!("gfx::vulkan", "{} encoded outside begin/end", command.name()));
        }

        let device = &self.ctx.device;
        let cmd = self.command_buffer;

        match command {
            GpuCommand::Draw { vertex_count, instance_count, first_vertex, first_instance } => unsafe {
                device.cmd_draw(cmd, *vertex_count, *instance_count, *first_vertex, *first_instance);
            },
            GpuCommand::DrawIndexed { index_count, instance_count, first_index, vertex_offset, first_instance } => unsafe {
                device.cmd_draw_indexed(cmd, *index_count, *instance_count, *first_index, *vertex_offset, *first_instance);
            },
            GpuCommand::Dispatch { x, y, z } => unsafe {
                device.cmd_dispatch(cmd, *x, *y, *z);
            },
            GpuCommand::TextureBarrier {
                texture,
                old_layout,
                new_layout,
                src_stage,
                dst_stage,
                src_access,
                dst_access,
                range,
            } => {
                let image = vulkan_texture(texture)?.image;
                let barrier = vk::ImageMemoryBarrier2::default()
                    .src_stage_mask(pipeline_stage_to_vk(*src_stage))
                    .src_access_mask(access_to_vk(*src_access))
                    .dst_stage_mask(pipeline_stage_to_vk(*dst_stage))
                    .dst_access_mask(access_to_vk(*dst_access))
                    .old_layout(texture_layout_to_vk(*old_layout))
                    .new_layout(texture_layout_to_vk(*new_layout))
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .image(image)
                    .subresource_range(subresource_range_to_vk(*range, format_aspect_mask(texture.format())));
                let barriers = [barrier];
                let dependency = vk::DependencyInfo::default().image_memory_barriers(&barriers);
                unsafe {
                    device.cmd_pipeline_barrier2(cmd, &dependency);
                }
            }
            GpuCommand::BufferBarrier { buffer, offset, size, src_stage, dst_stage, src_access, dst_access } => {
                let handle = vulkan_buffer(buffer)?.buffer;
                let size = if *size == u64::MAX { vk::WHOLE_SIZE } else { *size };
                let barrier = vk::BufferMemoryBarrier2::default()
                    .src_stage_mask(pipeline_stage_to_vk(*src_stage))
                    .src_access_mask(access_to_vk(*src_access))
                    .dst_stage_mask(pipeline_stage_to_vk(*dst_stage))
                    .dst_access_mask(access_to_vk(*dst_access))
                    .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                    .buffer(handle)
                    .offset(*offset)
                    .size(size);
                let barriers = [barrier];
                let dependency = vk::DependencyInfo::default().buffer_memory_barriers(&barriers);
                unsafe {
                    device.cmd_pipeline_barrier2(cmd, &dependency);
                }
            }
            GpuCommand::Blit { src, dst, region, filter } => {
                let src_image = vulkan_texture(src)?.image;
                let dst_image = vulkan_texture(dst)?.image;
                let corners = |rect: Rect| {
                    [
                        vk::Offset3D { x: rect.x, y: rect.y, z: 0 },
                        vk::Offset3D {
                            x: rect.x + rect.width as i32,
                            y: rect.y + rect.height as i32,
                            z: 1,
                        },
                    ]
                };
                let layers = |texture: &Texture, mip_level: u32| vk::ImageSubresourceLayers {
                    aspect_mask: format_aspect_mask(texture.format()),
                    mip_level,
                    base_array_layer: 0,
                    layer_count: 1,
                };
                let regions = [vk::ImageBlit2::default()
                    .src_subresource(layers(src.as_ref(), region.src_mip_level))
                    .src_offsets(corners(region.src_rect))
                    .dst_subresource(layers(dst.as_ref(), region.dst_mip_level))
                    .dst_offsets(corners(region.dst_rect))];
                let blit_info = vk::BlitImageInfo2::default()
                    .src_image(src_image)
                    .src_image_layout(vk::ImageLayout::TRANSFER_SRC_OPTIMAL)
                    .dst_image(dst_image)
                    .dst_image_layout(vk::ImageLayout::TRANSFER_DST_OPTIMAL)
                    .regions(&regions)
                    .filter(filter_to_vk(*filter));
                unsafe {
                    device.cmd_blit_image2(cmd, &blit_info);
                }
            }
            GpuCommand::SetViewport(viewport) => unsafe {
                let viewports = [vk::Viewport {
                    x: viewport.x,
                    y: viewport.y,
                    width: viewport.width,
                    height: viewport.height,
                    min_depth: viewport.min_depth,
                    max_depth: viewport.max_depth,
                }];
                device.cmd_set_viewport(cmd, 0, &viewports);
            },
            GpuCommand::SetScissor(rect) => unsafe {
                let scissors = [vk::Rect2D {
                    offset: vk::Offset2D { x: rect.x, y: rect.y },
                    extent: vk::Extent2D { width: rect.width, height: rect.height },
                }];
                device.cmd_set_scissor(cmd, 0, &scissors);
            },
            GpuCommand::ClearTexture { texture, value, range } => {
                let image = vulkan_texture(texture)?.image;
                let ranges = [subresource_range_to_vk(*range, format_aspect_mask(texture.format()))];
                unsafe {
                    match value {
                        ClearValue::Color(color) => {
                            let clear = vk::ClearColorValue { float32: *color };
                            device.cmd_clear_color_image(cmd, image, vk::ImageLayout::TRANSFER_DST_OPTIMAL, &clear, &ranges);
                        }
                        ClearValue::DepthStencil { depth, stencil } => {
                            let clear = vk::ClearDepthStencilValue { depth: *depth, stencil: *stencil };
                            device.cmd_clear_depth_stencil_image(
                                cmd,
                                image,
                                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                                &clear,
                                &ranges,
                            );
                        }
                    }
                }
            }
            GpuCommand::BeginRendering { frame_buffer, color_ops, depth_ops, render_area } => {
                self.begin_rendering(frame_buffer, color_ops, depth_ops.as_ref(), *render_area)?;
            }
            GpuCommand::EndRendering => {
                if !self.in_rendering {
                    return Err(engine_err!("gfx::vulkan", "EndRendering without BeginRendering"));
                }
                unsafe {
                    device.cmd_end_rendering(cmd);
                }
                self.in_rendering = false;
            }
            GpuCommand::CopyBuffer { src, dst, region } => {
                let regions = [vk::BufferCopy {
                    src_offset: region.src_offset,
                    dst_offset: region.dst_offset,
                    size: region.size,
                }];
                unsafe {
                    device.cmd_copy_buffer(cmd, vulkan_buffer(src)?.buffer, vulkan_buffer(dst)?.buffer, &regions);
                }
            }
            GpuCommand::CopyBufferToTexture { buffer, texture, region }
            | GpuCommand::CopyTextureToBuffer { texture, buffer, region } => {
                let regions = [vk::BufferImageCopy {
                    buffer_offset: region.buffer_offset,
                    buffer_row_length: region.buffer_row_length,
                    buffer_image_height: 0,
                    image_subresource: vk::ImageSubresourceLayers {
                        aspect_mask: copy_aspect(texture),
                        mip_level: region.mip_level,
                        base_array_layer: region.base_array_layer,
                        layer_count: region.array_layer_count,
                    },
                    image_offset: vk::Offset3D {
                        x: region.texture_offset.x,
                        y: region.texture_offset.y,
                        z: region.texture_offset.z,
                    },
                    image_extent: vk::Extent3D {
                        width: region.extent.width,
                        height: region.extent.height,
                        depth: region.extent.depth,
                    },
                }];
                let handle = vulkan_buffer(buffer)?.buffer;
                let image = vulkan_texture(texture)?.image;
                unsafe {
                    if matches!(command, GpuCommand::CopyBufferToTexture { .. }) {
                        device.cmd_copy_buffer_to_image(cmd, handle, image, vk::ImageLayout::TRANSFER_DST_OPTIMAL, &regions);
                    } else {
                        device.cmd_copy_image_to_buffer(cmd, image, vk::ImageLayout::TRANSFER_SRC_OPTIMAL, handle, &regions);
                    }
                }
            }
            GpuCommand::BindPipeline(pipeline) => {
                self.bind_pipeline(pipeline)?;
            }
            GpuCommand::PushConstants { offset, data } => unsafe {
                device.cmd_push_constants(cmd, self.pipeline_layout, vk::ShaderStageFlags::ALL, *offset, data);
            },
            GpuCommand::BindIndexBuffer { buffer, offset, index_type } => {
                let handle = vulkan_buffer(buffer)?.buffer;
                unsafe {
                    device.cmd_bind_index_buffer(cmd, handle, *offset, index_type_to_vk(*index_type));
                }
            }
            GpuCommand::BindVertexBuffer { binding, buffer, offset } => {
                let handle = vulkan_buffer(buffer)?.buffer;
                unsafe {
                    device.cmd_bind_vertex_buffers(cmd, *binding, &[handle], &[*offset]);
                }
            }
            GpuCommand::UserDefined(callback) => callback(self),
        }
        Ok(())
    }

    fn end(&mut self) -> Result<()> {
        if !self.is_recording {
            return Err(engine_err!("gfx::vulkan", "Command buffer not recording"));
        }

        unsafe {
            if self.in_rendering {
                engine_error!("gfx::vulkan", "Command buffer ended inside a rendering scope, closing it");
                self.ctx.device.cmd_end_rendering(self.command_buffer);
                self.in_rendering = false;
            }
            self.is_recording = false;
            self.ctx.device
                .end_command_buffer(self.command_buffer)
                .map_err(|e| engine_err!("gfx::vulkan", "Failed to end command buffer: {:?}", e))?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for VulkanCommandBuffer {
    fn drop(&mut self) {
        unsafe {
            // Frees the command buffer with it
            self.ctx.device.destroy_command_pool(self.command_pool, None);
        }
    }
}
