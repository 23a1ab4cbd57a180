/// Swapchain - Vulkan implementation of RawSwapchain
///
/// Image-available semaphores rotate per frame in flight; render-finished
/// semaphores exist per image. The device reads both through
/// `submit_semaphores` when a submission targets this swapchain.

use galaxy_gfx::gfx::{Error, Extent3D, Format, RawSwapchain, RawTexture, Result, SwapchainCreateInfo};
use galaxy_gfx::{engine_debug, engine_err, engine_warn};
use ash::vk;
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{format_to_vk, vk_to_format};
use crate::vulkan_texture::VulkanTexture;

/// Surface format closest to `requested`: exact match, then any 8-bit sRGB
/// BGRA/RGBA format, then whatever the surface lists first
pub(crate) fn choose_surface_format(
    available: &[vk::SurfaceFormatKHR],
    requested: vk::Format,
) -> Option<vk::SurfaceFormatKHR> {
    available
        .iter()
        .find(|f| f.format == requested)
        .or_else(|| {
            available
                .iter()
                .find(|f| f.format == vk::Format::B8G8R8A8_SRGB || f.format == vk::Format::R8G8B8A8_SRGB)
        })
        .or_else(|| available.first())
        .copied()
}

/// FIFO with vsync; otherwise mailbox, then immediate, then FIFO
pub(crate) fn choose_present_mode(available: &[vk::PresentModeKHR], vsync: bool) -> vk::PresentModeKHR {
    if vsync {
        return vk::PresentModeKHR::FIFO;
    }
    [vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE]
        .into_iter()
        .find(|mode| available.contains(mode))
        .unwrap_or(vk::PresentModeKHR::FIFO)
}

/// Surface-imposed extent if any, else `width` x `height` clamped to limits
pub(crate) fn choose_extent(capabilities: &vk::SurfaceCapabilitiesKHR, width: u32, height: u32) -> vk::Extent2D {
    if capabilities.current_extent.width != u32::MAX {
        return capabilities.current_extent;
    }
    vk::Extent2D {
        width: width.clamp(capabilities.min_image_extent.width, capabilities.max_image_extent.width),
        height: height.clamp(capabilities.min_image_extent.height, capabilities.max_image_extent.height),
    }
}

/// `requested` clamped to the surface limits (max 0 means unbounded)
pub(crate) fn choose_image_count(capabilities: &vk::SurfaceCapabilitiesKHR, requested: u32) -> u32 {
    let count = requested.max(capabilities.min_image_count);
    if capabilities.max_image_count > 0 {
        count.min(capabilities.max_image_count)
    } else {
        count
    }
}

/// Vulkan swapchain implementation
pub struct VulkanSwapchain {
    ctx: Arc<GpuContext>,
    surface: vk::SurfaceKHR,
    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    image_views: Vec<vk::ImageView>,
    format: Format,
    extent: Extent3D,
    info: SwapchainCreateInfo,

    image_available_semaphores: Vec<vk::Semaphore>,
    render_finished_semaphores: Vec<vk::Semaphore>,
    current_frame: usize,

    /// Image handed out by the last acquire, until presented
    acquired: Option<u32>,
    /// Whether a submission signaled the acquired image's render-finished semaphore
    rendered: AtomicBool,
}

impl VulkanSwapchain {
    pub(crate) fn new(ctx: Arc<GpuContext>, info: &SwapchainCreateInfo, frames_in_flight: usize) -> Result<Self> {
        let surface = ctx.surface().ok_or_else(|| {
            Error::InitializationFailed("cannot create a swapchain on a headless device".to_string())
        })?;
        let swapchain_loader = ash::khr::swapchain::Device::new(ctx.instance(), &ctx.device);

        let mut swapchain = Self {
            ctx,
            surface,
            swapchain_loader,
            swapchain: vk::SwapchainKHR::null(),
            images: Vec::new(),
            image_views: Vec::new(),
            format: info.format,
            extent: info.extent,
            info: *info,
            image_available_semaphores: Vec::new(),
            render_finished_semaphores: Vec::new(),
            current_frame: 0,
            acquired: None,
            rendered: AtomicBool::new(false),
        };

        // On failure, Drop releases whatever was created
        unsafe {
            for _ in 0..frames_in_flight.max(1) {
                let semaphore = swapchain.create_semaphore()?;
                swapchain.image_available_semaphores.push(semaphore);
            }
        }
        swapchain.create_swapchain(info.extent.width, info.extent.height)?;
        Ok(swapchain)
    }

    unsafe fn create_semaphore(&self) -> Result<vk::Semaphore> {
        self.ctx.device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None)
            .map_err(|e| engine_err!("gfx::vulkan", "Failed to create swapchain semaphore: {:?}", e))
    }

    /// Create (or replace) the swapchain, its views and per-image semaphores
    fn create_swapchain(&mut self, width: u32, height: u32) -> Result<()> {
        unsafe {
            let surface_loader = self.ctx.surface_loader();
            let physical_device = self.ctx.physical_device;

            let capabilities = surface_loader
                .get_physical_device_surface_capabilities(physical_device, self.surface)
                .map_err(|e| engine_err!("gfx::vulkan", "Failed to get surface capabilities: {:?}", e))?;
            let formats = surface_loader
                .get_physical_device_surface_formats(physical_device, self.surface)
                .map_err(|e| engine_err!("gfx::vulkan", "Failed to get surface formats: {:?}", e))?;
            let present_modes = surface_loader
                .get_physical_device_surface_present_modes(physical_device, self.surface)
                .map_err(|e| engine_err!("gfx::vulkan", "Failed to get present modes: {:?}", e))?;

            let surface_format = choose_surface_format(&formats, format_to_vk(self.info.format))
                .ok_or_else(|| engine_err!("gfx::vulkan", "Surface reports no formats"))?;
            let extent = choose_extent(&capabilities, width, height);
            if extent.width == 0 || extent.height == 0 {
                // Minimized window
                return Err(Error::SwapchainOutOfDate);
            }
            let present_mode = choose_present_mode(&present_modes, self.info.vsync);

            let old_swapchain = self.swapchain;
            let create_info = vk::SwapchainCreateInfoKHR::default()
                .surface(self.surface)
                .min_image_count(choose_image_count(&capabilities, self.info.image_count))
                .image_format(surface_format.format)
                .image_color_space(surface_format.color_space)
                .image_extent(extent)
                .image_array_layers(1)
                .image_usage(vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::TRANSFER_DST)
                .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
                .pre_transform(capabilities.current_transform)
                .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
                .present_mode(present_mode)
                .clipped(true)
                .old_swapchain(old_swapchain);

            let swapchain = self.swapchain_loader
                .create_swapchain(&create_info, None)
                .map_err(|e| engine_err!("gfx::vulkan", "Failed to create swapchain: {:?}", e))?;

            self.destroy_image_resources();
            if old_swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(old_swapchain, None);
            }
            self.swapchain = swapchain;

            self.images = self.swapchain_loader
                .get_swapchain_images(swapchain)
                .map_err(|e| engine_err!("gfx::vulkan", "Failed to get swapchain images: {:?}", e))?;

            for &image in &self.images {
                let view_info = vk::ImageViewCreateInfo::default()
                    .image(image)
                    .view_type(vk::ImageViewType::TYPE_2D)
                    .format(surface_format.format)
                    .components(vk::ComponentMapping::default())
                    .subresource_range(vk::ImageSubresourceRange {
                        aspect_mask: vk::ImageAspectFlags::COLOR,
                        base_mip_level: 0,
                        level_count: 1,
                        base_array_layer: 0,
                        layer_count: 1,
                    });
                let view = self.ctx.device.create_image_view(&view_info, None)
                    .map_err(|e| engine_err!("gfx::vulkan", "Failed to create swapchain image view: {:?}", e))?;
                self.image_views.push(view);
            }

            for _ in 0..self.images.len() {
                let semaphore = self.create_semaphore()?;
                self.render_finished_semaphores.push(semaphore);
            }

            self.format = vk_to_format(surface_format.format);
            self.extent = Extent3D::d2(extent.width, extent.height);
            self.acquired = None;
            self.rendered.store(false, Ordering::Release);

            engine_debug!(
                "gfx::vulkan",
                "Swapchain created: {}x{}, {} images, {:?}, {:?}",
                extent.width,
                extent.height,
                self.images.len(),
                surface_format.format,
                present_mode
            );
            Ok(())
        }
    }

    /// Views and render-finished semaphores of the current images
    unsafe fn destroy_image_resources(&mut self) {
        for view in self.image_views.drain(..) {
            self.ctx.device.destroy_image_view(view, None);
        }
        for semaphore in self.render_finished_semaphores.drain(..) {
            self.ctx.device.destroy_semaphore(semaphore, None);
        }
        self.images.clear();
    }

    /// Semaphores for a submission rendering to the acquired image:
    /// (wait on image available, signal render finished)
    pub(crate) fn submit_semaphores(&self) -> Option<(vk::Semaphore, vk::Semaphore)> {
        let index = self.acquired? as usize;
        if self.rendered.load(Ordering::Acquire) {
            // Already consumed by an earlier submission this frame
            return None;
        }
        Some((
            self.image_available_semaphores[self.current_frame],
            self.render_finished_semaphores[index],
        ))
    }

    /// Called once the submission using `submit_semaphores` is queued
    pub(crate) fn mark_rendered(&self) {
        self.rendered.store(true, Ordering::Release);
    }

    /// Native swapchain handle
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.swapchain
    }
}

impl RawSwapchain for VulkanSwapchain {
    fn acquire_next_image(&mut self) -> Result<u32> {
        if let Some(index) = self.acquired {
            engine_warn!("gfx::vulkan", "Image {} acquired twice without present", index);
            return Ok(index);
        }

        unsafe {
            let result = self.swapchain_loader.acquire_next_image(
                self.swapchain,
                u64::MAX,
                self.image_available_semaphores[self.current_frame],
                vk::Fence::null(),
            );
            match result {
                Ok((index, suboptimal)) => {
                    if suboptimal {
                        engine_debug!("gfx::vulkan", "Swapchain suboptimal during acquire");
                    }
                    self.acquired = Some(index);
                    self.rendered.store(false, Ordering::Release);
                    Ok(index)
                }
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Err(Error::SwapchainOutOfDate),
                Err(e) => Err(engine_err!("gfx::vulkan", "Failed to acquire next swapchain image: {:?}", e)),
            }
        }
    }

    fn present(&mut self, image_index: u32) -> Result<()> {
        if self.acquired != Some(image_index) {
            return Err(Error::InvalidResource(format!(
                "image {} presented but {:?} was acquired",
                image_index, self.acquired
            )));
        }

        let render_finished = self.render_finished_semaphores[image_index as usize];
        unsafe {
            let _queue = self.ctx.lock_queue();

            if !self.rendered.load(Ordering::Acquire) {
                // Nothing rendered: consume the acquire semaphore and signal
                // render-finished so presentation can wait on it
                let waits = [vk::SemaphoreSubmitInfo::default()
                    .semaphore(self.image_available_semaphores[self.current_frame])
                    .stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)];
                let signals = [vk::SemaphoreSubmitInfo::default()
                    .semaphore(render_finished)
                    .stage_mask(vk::PipelineStageFlags2::ALL_COMMANDS)];
                let submit_info = vk::SubmitInfo2::default()
                    .wait_semaphore_infos(&waits)
                    .signal_semaphore_infos(&signals);
                self.ctx.device
                    .queue_submit2(self.ctx.graphics_queue, &[submit_info], vk::Fence::null())
                    .map_err(|e| engine_err!("gfx::vulkan", "Failed to submit empty present work: {:?}", e))?;
            }

            let wait_semaphores = [render_finished];
            let swapchains = [self.swapchain];
            let image_indices = [image_index];
            let present_info = vk::PresentInfoKHR::default()
                .wait_semaphores(&wait_semaphores)
                .swapchains(&swapchains)
                .image_indices(&image_indices);

            let result = self.swapchain_loader.queue_present(self.ctx.graphics_queue, &present_info);

            self.acquired = None;
            self.rendered.store(false, Ordering::Release);
            self.current_frame = (self.current_frame + 1) % self.image_available_semaphores.len();

            match result {
                Ok(suboptimal) => {
                    if suboptimal {
                        engine_debug!("gfx::vulkan", "Swapchain suboptimal during present");
                    }
                    Ok(())
                }
                Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Err(Error::SwapchainOutOfDate),
                Err(e) => Err(engine_err!("gfx::vulkan", "Failed to present swapchain image: {:?}", e)),
            }
        }
    }

    fn recreate(&mut self, width: u32, height: u32) -> Result<()> {
        unsafe {
            {
                // vkDeviceWaitIdle requires every queue to be externally synchronized
                let _queue = self.ctx.lock_queue();
                self.ctx.device.device_wait_idle()
                    .map_err(|e| engine_err!("gfx::vulkan", "Failed to wait for device idle: {:?}", e))?;
            }

            // An acquire that was never presented leaves its semaphore signaled
            for semaphore in self.image_available_semaphores.iter_mut() {
                self.ctx.device.destroy_semaphore(*semaphore, None);
                *semaphore = vk::Semaphore::null();
            }
            for index in 0..self.image_available_semaphores.len() {
                self.image_available_semaphores[index] = self.create_semaphore()?;
            }
        }
        self.current_frame = 0;
        self.create_swapchain(width, height)
    }

    fn image_textures(&self) -> Vec<Box<dyn RawTexture>> {
        self.images
            .iter()
            .zip(&self.image_views)
            .map(|(&image, &view)| {
                Box::new(VulkanTexture::swapchain_image(
                    Arc::clone(&self.ctx),
                    image,
                    view,
                    self.format,
                    self.extent,
                )) as Box<dyn RawTexture>
            })
            .collect()
    }

    fn extent(&self) -> Extent3D {
        self.extent
    }

    fn format(&self) -> Format {
        self.format
    }

    fn image_count(&self) -> usize {
        self.images.len()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanSwapchain {
    fn drop(&mut self) {
        unsafe {
            {
                let _queue = self.ctx.lock_queue();
                self.ctx.device.queue_wait_idle(self.ctx.graphics_queue).ok();
            }
            self.destroy_image_resources();
            for semaphore in self.image_available_semaphores.drain(..) {
                self.ctx.device.destroy_semaphore(semaphore, None);
            }
            if self.swapchain != vk::SwapchainKHR::null() {
                self.swapchain_loader.destroy_swapchain(self.swapchain, None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface_format(format: vk::Format) -> vk::SurfaceFormatKHR {
        vk::SurfaceFormatKHR {
            format,
            color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
        }
    }

    fn capabilities(current: vk::Extent2D) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: 2,
            max_image_count: 4,
            current_extent: current,
            min_image_extent: vk::Extent2D { width: 1, height: 1 },
            max_image_extent: vk::Extent2D { width: 4096, height: 4096 },
            ..Default::default()
        }
    }

    #[test]
    fn test_surface_format_exact_match_first() {
        let available = [surface_format(vk::Format::B8G8R8A8_SRGB), surface_format(vk::Format::R8G8B8A8_UNORM)];
        let chosen = choose_surface_format(&available, vk::Format::R8G8B8A8_UNORM);
        assert_eq!(chosen.map(|f| f.format), Some(vk::Format::R8G8B8A8_UNORM));
    }

    #[test]
    fn test_surface_format_falls_back_to_srgb() {
        let available = [surface_format(vk::Format::A2B10G10R10_UNORM_PACK32), surface_format(vk::Format::B8G8R8A8_SRGB)];
        let chosen = choose_surface_format(&available, vk::Format::R16G16B16A16_SFLOAT);
        assert_eq!(chosen.map(|f| f.format), Some(vk::Format::B8G8R8A8_SRGB));
    }

    #[test]
    fn test_surface_format_empty() {
        assert!(choose_surface_format(&[], vk::Format::B8G8R8A8_SRGB).is_none());
    }

    #[test]
    fn test_present_mode() {
        let all = [vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::MAILBOX];
        assert_eq!(choose_present_mode(&all, true), vk::PresentModeKHR::FIFO);
        assert_eq!(choose_present_mode(&all, false), vk::PresentModeKHR::MAILBOX);
        assert_eq!(
            choose_present_mode(&[vk::PresentModeKHR::FIFO, vk::PresentModeKHR::IMMEDIATE], false),
            vk::PresentModeKHR::IMMEDIATE
        );
        assert_eq!(choose_present_mode(&[vk::PresentModeKHR::FIFO], false), vk::PresentModeKHR::FIFO);
    }

    #[test]
    fn test_extent_follows_surface_when_fixed() {
        let caps = capabilities(vk::Extent2D { width: 800, height: 600 });
        assert_eq!(choose_extent(&caps, 1920, 1080), vk::Extent2D { width: 800, height: 600 });
    }

    #[test]
    fn test_extent_clamped_when_free() {
        let caps = capabilities(vk::Extent2D { width: u32::MAX, height: u32::MAX });
        assert_eq!(choose_extent(&caps, 10_000, 0), vk::Extent2D { width: 4096, height: 1 });
    }

    #[test]
    fn test_image_count_clamped() {
        let caps = capabilities(vk::Extent2D { width: 1, height: 1 });
        assert_eq!(choose_image_count(&caps, 1), 2);
        assert_eq!(choose_image_count(&caps, 8), 4);
        let unbounded = vk::SurfaceCapabilitiesKHR {
            max_image_count: 0,
            ..caps
        };
        assert_eq!(choose_image_count(&unbounded, 8), 8);
    }
}
