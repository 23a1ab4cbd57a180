/*!
# Galaxy GFX - Vulkan Backend

Vulkan 1.3 implementation of the galaxy_gfx device traits.

This crate uses the Ash library for Vulkan bindings and gpu-allocator for
memory management. Every resource is reachable from shaders through one
bindless descriptor set; rendering uses dynamic rendering and all barriers
go through synchronization2.

The backend is registered as a plugin and selected at runtime by
`ContextCreateInfo::api`.
*/

mod debug;
mod vulkan_bindless;
mod vulkan_buffer;
mod vulkan_command_buffer;
mod vulkan_context;
mod vulkan_fence;
mod vulkan_format;
mod vulkan_graphics_device;
mod vulkan_pipeline;
mod vulkan_sampler;
mod vulkan_shader;
mod vulkan_swapchain;
mod vulkan_texture;

use galaxy_gfx::gfx::{register_backend_plugin, Api};

pub use vulkan_graphics_device::{VulkanGraphicsDevice, MAX_FRAMES_IN_FLIGHT};
pub use vulkan_context::GpuContext;
pub use vulkan_buffer::VulkanBuffer;
pub use vulkan_texture::VulkanTexture;
pub use vulkan_sampler::VulkanSampler;
pub use vulkan_shader::VulkanShader;
pub use vulkan_pipeline::VulkanPipeline;
pub use vulkan_fence::VulkanFence;
pub use vulkan_swapchain::VulkanSwapchain;
pub use vulkan_command_buffer::VulkanCommandBuffer;

// Re-export debug utilities
pub use debug::{get_validation_stats, print_validation_stats_report};

/// Register the Vulkan backend with the plugin system
///
/// # Example
///
/// ```no_run
/// use galaxy_gfx::gfx::{Context, ContextCreateInfo};
///
/// galaxy_gfx_vulkan::register();
/// let context = Context::create(&ContextCreateInfo::default())?;
/// # Ok::<(), galaxy_gfx::gfx::Error>(())
/// ```
pub fn register() {
    register_backend_plugin(Api::Vulkan, |info| Ok(Box::new(VulkanGraphicsDevice::new(info)?)));
}
