/// Texture - Vulkan implementation of RawTexture
///
/// An owned texture holds its image, memory and one view per use: the
/// sampled view (color or depth aspect), a stencil view for combined
/// depth/stencil formats, a storage view over mip 0, and an attachment view
/// over mip 0 with every aspect. Swapchain images are wrapped without
/// ownership; the swapchain destroys them.

use galaxy_gfx::gfx::{
    Error, Extent3D, Format, RawTexture, Result, TextureAspect, TextureCreateInfo, TextureType, TextureUsage,
};
use galaxy_gfx::{engine_err, engine_error};
use ash::vk;
use gpu_allocator::vulkan::{Allocation, AllocationCreateDesc, AllocationScheme};
use gpu_allocator::MemoryLocation;
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{
    format_aspect_mask, format_to_vk, texture_type_to_vk, texture_usage_to_vk, view_type_to_vk,
};

/// Vulkan texture implementation
pub struct VulkanTexture {
    ctx: Arc<GpuContext>,
    pub(crate) image: vk::Image,
    allocation: Option<Allocation>,
    pub(crate) format: Format,
    pub(crate) extent: Extent3D,
    /// Sampled view (color, or depth for depth formats)
    pub(crate) view: vk::ImageView,
    pub(crate) stencil_view: vk::ImageView,
    pub(crate) storage_view: vk::ImageView,
    /// Mip 0 with every aspect (dynamic rendering)
    pub(crate) attachment_view: vk::ImageView,
    /// False for swapchain images
    owned: bool,
}

impl VulkanTexture {
    pub(crate) fn new(ctx: Arc<GpuContext>, info: &TextureCreateInfo) -> Result<Self> {
        let vk_format = format_to_vk(info.format);
        let flags = if info.texture_type == TextureType::Cube {
            vk::ImageCreateFlags::CUBE_COMPATIBLE
        } else {
            vk::ImageCreateFlags::empty()
        };

        let image_info = vk::ImageCreateInfo::default()
            .flags(flags)
            .image_type(texture_type_to_vk(info.texture_type))
            .format(vk_format)
            .extent(vk::Extent3D {
                width: info.extent.width,
                height: info.extent.height,
                depth: info.extent.depth,
            })
            .mip_levels(info.mip_levels)
            .array_layers(info.array_layers)
            .samples(vk::SampleCountFlags::TYPE_1)
            .tiling(vk::ImageTiling::OPTIMAL)
            .usage(texture_usage_to_vk(info.usage))
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .initial_layout(vk::ImageLayout::UNDEFINED);

        unsafe {
            let image = ctx.device.create_image(&image_info, None)
                .map_err(|e| engine_err!("gfx::vulkan", "Failed to create image {:?}: {:?}", info.format, e))?;

            let requirements = ctx.device.get_image_memory_requirements(image);
            let allocation = ctx.allocator().allocate(&AllocationCreateDesc {
                name: "texture",
                requirements,
                location: MemoryLocation::GpuOnly,
                linear: false,
                allocation_scheme: AllocationScheme::GpuAllocatorManaged,
            });
            let allocation = match allocation {
                Ok(allocation) => allocation,
                Err(e) => {
                    ctx.device.destroy_image(image, None);
                    let size_mb = requirements.size as f64 / (1024.0 * 1024.0);
                    engine_error!("gfx::vulkan", "Out of GPU memory for texture (required: {:.2} MB): {:?}", size_mb, e);
                    return Err(Error::OutOfMemory);
                }
            };

            // From here on, Drop cleans up whatever was created
            let mut texture = Self {
                ctx,
                image,
                allocation: Some(allocation),
                format: info.format,
                extent: info.extent,
                view: vk::ImageView::null(),
                stencil_view: vk::ImageView::null(),
                storage_view: vk::ImageView::null(),
                attachment_view: vk::ImageView::null(),
                owned: true,
            };

            if let Some(allocation) = &texture.allocation {
                texture.ctx.device
                    .bind_image_memory(image, allocation.memory(), allocation.offset())
                    .map_err(|e| engine_err!("gfx::vulkan", "Failed to bind image memory: {:?}", e))?;
            }

            let all_layers_type = view_type_to_vk(info.texture_type, info.array_layers);
            let flat_type = if info.texture_type == TextureType::D3 {
                vk::ImageViewType::TYPE_3D
            } else if info.array_layers > 1 {
                vk::ImageViewType::TYPE_2D_ARRAY
            } else {
                view_type_to_vk(info.texture_type, 1)
            };

            if info.usage.contains(TextureUsage::SAMPLED) {
                let aspect = if info.format.has_depth() {
                    vk::ImageAspectFlags::DEPTH
                } else {
                    vk::ImageAspectFlags::COLOR
                };
                texture.view = texture.create_view(vk_format, all_layers_type, aspect, info.mip_levels, info.array_layers)?;
                if info.format.has_stencil() {
                    texture.stencil_view = texture.create_view(
                        vk_format,
                        all_layers_type,
                        vk::ImageAspectFlags::STENCIL,
                        info.mip_levels,
                        info.array_layers,
                    )?;
                }
            }
            if info.usage.contains(TextureUsage::STORAGE) {
                texture.storage_view =
                    texture.create_view(vk_format, flat_type, vk::ImageAspectFlags::COLOR, 1, info.array_layers)?;
            }
            if info.usage.intersects(TextureUsage::COLOR_ATTACHMENT | TextureUsage::DEPTH_STENCIL_ATTACHMENT) {
                texture.attachment_view =
                    texture.create_view(vk_format, flat_type, format_aspect_mask(info.format), 1, info.array_layers)?;
            }

            Ok(texture)
        }
    }

    /// Non-owning wrapper around a swapchain image and its view
    pub(crate) fn swapchain_image(
        ctx: Arc<GpuContext>,
        image: vk::Image,
        view: vk::ImageView,
        format: Format,
        extent: Extent3D,
    ) -> Self {
        Self {
            ctx,
            image,
            allocation: None,
            format,
            extent,
            view: vk::ImageView::null(),
            stencil_view: vk::ImageView::null(),
            storage_view: vk::ImageView::null(),
            attachment_view: view,
            owned: false,
        }
    }

    fn create_view(
        &self,
        format: vk::Format,
        view_type: vk::ImageViewType,
        aspect_mask: vk::ImageAspectFlags,
        level_count: u32,
        layer_count: u32,
    ) -> Result<vk::ImageView> {
        let create_info = vk::ImageViewCreateInfo::default()
            .image(self.image)
            .view_type(view_type)
            .format(format)
            .components(vk::ComponentMapping::default())
            .subresource_range(vk::ImageSubresourceRange {
                aspect_mask,
                base_mip_level: 0,
                level_count,
                base_array_layer: 0,
                layer_count,
            });
        unsafe {
            self.ctx.device.create_image_view(&create_info, None)
                .map_err(|e| engine_err!("gfx::vulkan", "Failed to create image view ({:?}): {:?}", aspect_mask, e))
        }
    }

    /// Native image handle
    pub fn handle(&self) -> vk::Image {
        self.image
    }

    /// View written to the sampled-texture array for `aspect`
    pub(crate) fn sampled_view(&self, aspect: TextureAspect) -> vk::ImageView {
        match aspect {
            TextureAspect::Stencil => self.stencil_view,
            TextureAspect::Color | TextureAspect::Depth => self.view,
        }
    }
}

impl RawTexture for VulkanTexture {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanTexture {
    fn drop(&mut self) {
        if !self.owned {
            return;
        }
        unsafe {
            // Null handles are ignored by vkDestroyImageView
            self.ctx.device.destroy_image_view(self.view, None);
            self.ctx.device.destroy_image_view(self.stencil_view, None);
            self.ctx.device.destroy_image_view(self.storage_view, None);
            self.ctx.device.destroy_image_view(self.attachment_view, None);

            if let Some(allocation) = self.allocation.take() {
                self.ctx.allocator().free(allocation).ok();
            }
            self.ctx.device.destroy_image(self.image, None);
        }
    }
}
