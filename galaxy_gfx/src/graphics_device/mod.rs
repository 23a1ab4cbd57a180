/// Graphics device module - backend seam and the frontend objects built on it

// Module declarations
pub mod graphics_device;
pub mod format;
pub mod resource_id;
pub mod debug_config;
pub mod buffer;
pub mod texture;
pub mod sampler;
pub mod shader;
pub mod pipeline;
pub mod fence;

// Recording and presentation
pub mod command;
pub mod command_buffer;
pub mod frame_buffer;
pub mod swapchain;

// Context and the state it owns
pub mod resource_manager;
pub mod context;
pub mod queue;
pub mod suballocator;

// Re-export everything from graphics_device.rs
pub use graphics_device::*;

// Re-export from other modules
pub use format::*;
pub use resource_id::*;
pub use debug_config::*;
pub use buffer::*;
pub use texture::*;
pub use sampler::*;
pub use shader::*;
pub use pipeline::*;
pub use fence::*;

pub use command::*;
pub use command_buffer::*;
pub use frame_buffer::*;
pub use swapchain::*;

pub use resource_manager::*;
pub use context::*;
pub use queue::*;
pub use suballocator::*;

// Mock graphics device for tests (no GPU required)
#[cfg(test)]
pub mod mock_graphics_device;
