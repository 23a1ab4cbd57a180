/// Bindless descriptor table
///
/// A single update-after-bind descriptor set with four arrays:
///
/// | binding | contents          |
/// |---------|-------------------|
/// | 0       | storage buffers   |
/// | 1       | samplers          |
/// | 2       | sampled textures  |
/// | 3       | storage textures  |
///
/// Every slot always holds a valid descriptor. Unused and released slots
/// point at small default objects so a stale index reads harmless data
/// instead of faulting.

use galaxy_gfx::gfx::{
    BufferCreateInfo, Result, SamplerCreateInfo, TextureCreateInfo, TextureUsage,
};
use galaxy_gfx::engine_err;
use ash::vk;
use std::sync::{Arc, Mutex};

use crate::vulkan_buffer::VulkanBuffer;
use crate::vulkan_context::GpuContext;
use crate::vulkan_sampler::VulkanSampler;
use crate::vulkan_texture::VulkanTexture;

pub(crate) const STORAGE_BUFFER_BINDING: u32 = 0;
pub(crate) const SAMPLER_BINDING: u32 = 1;
pub(crate) const SAMPLED_TEXTURE_BINDING: u32 = 2;
pub(crate) const STORAGE_TEXTURE_BINDING: u32 = 3;

/// Slots per array, never more than the frontend can address
pub(crate) const MAX_BINDLESS_RESOURCES: u32 = 65_536;

/// Largest array size the device supports for all four bindings
pub(crate) fn bindless_capacity(properties: &vk::PhysicalDeviceDescriptorIndexingProperties) -> u32 {
    [
        properties.max_descriptor_set_update_after_bind_storage_buffers,
        properties.max_descriptor_set_update_after_bind_samplers,
        properties.max_descriptor_set_update_after_bind_sampled_images,
        properties.max_descriptor_set_update_after_bind_storage_images,
        properties.max_per_stage_descriptor_update_after_bind_storage_buffers,
        properties.max_per_stage_descriptor_update_after_bind_samplers,
        properties.max_per_stage_descriptor_update_after_bind_sampled_images,
        properties.max_per_stage_descriptor_update_after_bind_storage_images,
        properties.max_per_stage_update_after_bind_resources / 4,
        MAX_BINDLESS_RESOURCES,
    ]
    .into_iter()
    .min()
    .unwrap_or(0)
}

/// Objects referenced by empty slots
struct BindlessDefaults {
    buffer: VulkanBuffer,
    texture: VulkanTexture,
    sampler: VulkanSampler,
}

pub(crate) struct BindlessTable {
    ctx: Arc<GpuContext>,
    pub(crate) layout: vk::DescriptorSetLayout,
    pool: vk::DescriptorPool,
    pub(crate) set: vk::DescriptorSet,
    capacity: u32,
    defaults: BindlessDefaults,
    /// Serializes descriptor writes
    write_lock: Mutex<()>,
}

impl BindlessTable {
    pub(crate) fn new(ctx: Arc<GpuContext>, capacity: u32) -> Result<Self> {
        let defaults = Self::create_defaults(&ctx)?;

        let types = [
            (STORAGE_BUFFER_BINDING, vk::DescriptorType::STORAGE_BUFFER),
            (SAMPLER_BINDING, vk::DescriptorType::SAMPLER),
            (SAMPLED_TEXTURE_BINDING, vk::DescriptorType::SAMPLED_IMAGE),
            (STORAGE_TEXTURE_BINDING, vk::DescriptorType::STORAGE_IMAGE),
        ];

        let bindings: Vec<vk::DescriptorSetLayoutBinding> = types
            .iter()
            .map(|&(binding, descriptor_type)| {
                vk::DescriptorSetLayoutBinding::default()
                    .binding(binding)
                    .descriptor_type(descriptor_type)
                    .descriptor_count(capacity)
                    .stage_flags(vk::ShaderStageFlags::ALL)
            })
            .collect();
        let binding_flags = [vk::DescriptorBindingFlags::UPDATE_AFTER_BIND
            | vk::DescriptorBindingFlags::PARTIALLY_BOUND
            | vk::DescriptorBindingFlags::UPDATE_UNUSED_WHILE_PENDING; 4];
        let mut flags_info = vk::DescriptorSetLayoutBindingFlagsCreateInfo::default()
            .binding_flags(&binding_flags);
        let layout_info = vk::DescriptorSetLayoutCreateInfo::default()
            .flags(vk::DescriptorSetLayoutCreateFlags::UPDATE_AFTER_BIND_POOL)
            .bindings(&bindings)
            .push_next(&mut flags_info);

        let pool_sizes: Vec<vk::DescriptorPoolSize> = types
            .iter()
            .map(|&(_, ty)| vk::DescriptorPoolSize {
                ty,
                descriptor_count: capacity,
            })
            .collect();
        let pool_info = vk::DescriptorPoolCreateInfo::default()
            .flags(vk::DescriptorPoolCreateFlags::UPDATE_AFTER_BIND)
            .max_sets(1)
            .pool_sizes(&pool_sizes);

        unsafe {
            let layout = ctx.device.create_descriptor_set_layout(&layout_info, None)
                .map_err(|e| engine_err!("gfx::vulkan", "Failed to create bindless set layout: {:?}", e))?;

            let pool = match ctx.device.create_descriptor_pool(&pool_info, None) {
                Ok(pool) => pool,
                Err(e) => {
                    ctx.device.destroy_descriptor_set_layout(layout, None);
                    return Err(engine_err!("gfx::vulkan", "Failed to create bindless descriptor pool: {:?}", e));
                }
            };

            let layouts = [layout];
            let alloc_info = vk::DescriptorSetAllocateInfo::default()
                .descriptor_pool(pool)
                .set_layouts(&layouts);
            let set = match ctx.device.allocate_descriptor_sets(&alloc_info) {
                Ok(sets) => sets.into_iter().next().unwrap_or_default(),
                Err(e) => {
                    ctx.device.destroy_descriptor_pool(pool, None);
                    ctx.device.destroy_descriptor_set_layout(layout, None);
                    return Err(engine_err!("gfx::vulkan", "Failed to allocate bindless descriptor set: {:?}", e));
                }
            };

            let table = Self {
                ctx,
                layout,
                pool,
                set,
                capacity,
                defaults,
                write_lock: Mutex::new(()),
            };
            table.fill_with_defaults();
            Ok(table)
        }
    }

    fn create_defaults(ctx: &Arc<GpuContext>) -> Result<BindlessDefaults> {
        let buffer = VulkanBuffer::new(Arc::clone(ctx), &BufferCreateInfo::device_local(256), false)?;
        let texture = VulkanTexture::new(
            Arc::clone(ctx),
            &TextureCreateInfo {
                usage: TextureUsage::SAMPLED | TextureUsage::STORAGE,
                ..TextureCreateInfo::default()
            },
        )?;
        let sampler = VulkanSampler::new(Arc::clone(ctx), &SamplerCreateInfo::default())?;

        // The default image stays in GENERAL, valid for both image arrays
        let image = texture.image;
        ctx.one_shot_submit(|command_buffer| unsafe {
            let barrier = vk::ImageMemoryBarrier2::default()
                .src_stage_mask(vk::PipelineStageFlags2::NONE)
                .src_access_mask(vk::AccessFlags2::NONE)
                .dst_stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)
                .dst_access_mask(vk::AccessFlags2::SHADER_READ)
                .old_layout(vk::ImageLayout::UNDEFINED)
                .new_layout(vk::ImageLayout::GENERAL)
                .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
                .image(image)
                .subresource_range(vk::ImageSubresourceRange {
                    aspect_mask: vk::ImageAspectFlags::COLOR,
                    base_mip_level: 0,
                    level_count: 1,
                    base_array_layer: 0,
                    layer_count: 1,
                });
            let barriers = [barrier];
            let dependency = vk::DependencyInfo::default().image_memory_barriers(&barriers);
            ctx.device.cmd_pipeline_barrier2(command_buffer, &dependency);
        })?;

        Ok(BindlessDefaults { buffer, texture, sampler })
    }

    fn fill_with_defaults(&self) {
        let count = self.capacity as usize;
        let buffer_infos = vec![self.default_buffer_info(); count];
        let sampler_infos = vec![self.default_sampler_info(); count];
        let sampled_infos = vec![self.default_image_info(); count];
        let storage_infos = vec![self.default_image_info(); count];

        let writes = [
            self.write(STORAGE_BUFFER_BINDING, 0, vk::DescriptorType::STORAGE_BUFFER)
                .buffer_info(&buffer_infos),
            self.write(SAMPLER_BINDING, 0, vk::DescriptorType::SAMPLER)
                .image_info(&sampler_infos),
            self.write(SAMPLED_TEXTURE_BINDING, 0, vk::DescriptorType::SAMPLED_IMAGE)
                .image_info(&sampled_infos),
            self.write(STORAGE_TEXTURE_BINDING, 0, vk::DescriptorType::STORAGE_IMAGE)
                .image_info(&storage_infos),
        ];
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        unsafe {
            self.ctx.device.update_descriptor_sets(&writes, &[]);
        }
    }

    fn write<'a>(&self, binding: u32, index: u32, descriptor_type: vk::DescriptorType) -> vk::WriteDescriptorSet<'a> {
        vk::WriteDescriptorSet::default()
            .dst_set(self.set)
            .dst_binding(binding)
            .dst_array_element(index)
            .descriptor_type(descriptor_type)
    }

    fn default_buffer_info(&self) -> vk::DescriptorBufferInfo {
        vk::DescriptorBufferInfo {
            buffer: self.defaults.buffer.buffer,
            offset: 0,
            range: vk::WHOLE_SIZE,
        }
    }

    fn default_sampler_info(&self) -> vk::DescriptorImageInfo {
        vk::DescriptorImageInfo {
            sampler: self.defaults.sampler.sampler,
            image_view: vk::ImageView::null(),
            image_layout: vk::ImageLayout::UNDEFINED,
        }
    }

    fn default_image_info(&self) -> vk::DescriptorImageInfo {
        vk::DescriptorImageInfo {
            sampler: vk::Sampler::null(),
            image_view: self.defaults.texture.storage_view,
            image_layout: vk::ImageLayout::GENERAL,
        }
    }

    fn in_range(&self, index: u32) -> bool {
        index < self.capacity
    }

    pub(crate) fn capacity(&self) -> u32 {
        self.capacity
    }

    pub(crate) fn write_buffer(&self, index: u32, buffer: vk::Buffer) {
        if !self.in_range(index) {
            return;
        }
        let infos = [vk::DescriptorBufferInfo {
            buffer,
            offset: 0,
            range: vk::WHOLE_SIZE,
        }];
        self.update(self.write(STORAGE_BUFFER_BINDING, index, vk::DescriptorType::STORAGE_BUFFER).buffer_info(&infos));
    }

    pub(crate) fn write_sampler(&self, index: u32, sampler: vk::Sampler) {
        if !self.in_range(index) {
            return;
        }
        let infos = [vk::DescriptorImageInfo {
            sampler,
            image_view: vk::ImageView::null(),
            image_layout: vk::ImageLayout::UNDEFINED,
        }];
        self.update(self.write(SAMPLER_BINDING, index, vk::DescriptorType::SAMPLER).image_info(&infos));
    }

    /// `layout` is the layout the image is in whenever shaders sample it
    pub(crate) fn write_sampled_texture(&self, index: u32, view: vk::ImageView, layout: vk::ImageLayout) {
        if !self.in_range(index) || view == vk::ImageView::null() {
            return;
        }
        let infos = [vk::DescriptorImageInfo {
            sampler: vk::Sampler::null(),
            image_view: view,
            image_layout: layout,
        }];
        self.update(self.write(SAMPLED_TEXTURE_BINDING, index, vk::DescriptorType::SAMPLED_IMAGE).image_info(&infos));
    }

    pub(crate) fn write_storage_texture(&self, index: u32, view: vk::ImageView) {
        if !self.in_range(index) || view == vk::ImageView::null() {
            return;
        }
        let infos = [vk::DescriptorImageInfo {
            sampler: vk::Sampler::null(),
            image_view: view,
            image_layout: vk::ImageLayout::GENERAL,
        }];
        self.update(self.write(STORAGE_TEXTURE_BINDING, index, vk::DescriptorType::STORAGE_IMAGE).image_info(&infos));
    }

    pub(crate) fn clear_buffer(&self, index: u32) {
        self.write_buffer(index, self.defaults.buffer.buffer);
    }

    pub(crate) fn clear_sampler(&self, index: u32) {
        self.write_sampler(index, self.defaults.sampler.sampler);
    }

    /// Reset both image arrays at `index`
    pub(crate) fn clear_texture(&self, index: u32) {
        let view = self.defaults.texture.storage_view;
        self.write_sampled_texture(index, view, vk::ImageLayout::GENERAL);
        self.write_storage_texture(index, view);
    }

    fn update(&self, write: vk::WriteDescriptorSet<'_>) {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        unsafe {
            self.ctx.device.update_descriptor_sets(&[write], &[]);
        }
    }
}

impl Drop for BindlessTable {
    fn drop(&mut self) {
        unsafe {
            // Frees the set with it
            self.ctx.device.destroy_descriptor_pool(self.pool, None);
            self.ctx.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties(limit: u32) -> vk::PhysicalDeviceDescriptorIndexingProperties<'static> {
        vk::PhysicalDeviceDescriptorIndexingProperties {
            max_descriptor_set_update_after_bind_storage_buffers: limit,
            max_descriptor_set_update_after_bind_samplers: limit,
            max_descriptor_set_update_after_bind_sampled_images: limit,
            max_descriptor_set_update_after_bind_storage_images: limit,
            max_per_stage_descriptor_update_after_bind_storage_buffers: limit,
            max_per_stage_descriptor_update_after_bind_samplers: limit,
            max_per_stage_descriptor_update_after_bind_sampled_images: limit,
            max_per_stage_descriptor_update_after_bind_storage_images: limit,
            max_per_stage_update_after_bind_resources: u32::MAX,
            ..Default::default()
        }
    }

    #[test]
    fn test_capacity_never_exceeds_id_space() {
        assert_eq!(bindless_capacity(&properties(1 << 20)), MAX_BINDLESS_RESOURCES);
    }

    #[test]
    fn test_capacity_follows_smallest_limit() {
        let mut props = properties(500_000);
        props.max_descriptor_set_update_after_bind_samplers = 4_000;
        assert_eq!(bindless_capacity(&props), 4_000);
    }

    #[test]
    fn test_capacity_shares_per_stage_resources() {
        let mut props = properties(500_000);
        props.max_per_stage_update_after_bind_resources = 100_000;
        assert_eq!(bindless_capacity(&props), 25_000);
    }

    #[test]
    fn test_binding_numbers() {
        assert_eq!(
            [STORAGE_BUFFER_BINDING, SAMPLER_BINDING, SAMPLED_TEXTURE_BINDING, STORAGE_TEXTURE_BINDING],
            [0, 1, 2, 3]
        );
    }
}
