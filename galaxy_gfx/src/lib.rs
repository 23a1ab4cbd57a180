/*!
# Galaxy GFX

Backend-agnostic graphics layer for the Galaxy engines.

This crate provides the platform-agnostic API for explicit GPU programming
using trait-based dynamic polymorphism. Backend implementations (Vulkan, ...)
register a factory in the plugin registry and are selected at runtime.

## Architecture

- **Context**: Factory for every GPU object, owner of the deletion queue
- **Queue**: Frame cycle, submission and presentation
- **ResourceManager**: Bindless slot IDs (buffers, samplers, textures)
- **CommandBuffer**: Records `GpuCommand`s, encodes them on `end()`
- **GraphicsDevice**: Backend trait, with `Raw*` traits per object kind

Resources are addressed by shaders through bindless IDs:
binding 0 holds storage buffers, binding 1 samplers, binding 2 sampled
textures and binding 3 storage textures.
*/

// Internal modules
mod error;
pub mod log;
pub mod flags;
pub mod utils;
pub mod graphics_device;

// Main gfx namespace module
pub mod gfx {
    // Error types
    pub use crate::error::{Error, Result};

    // Context, queue, resources and the backend traits
    pub use crate::graphics_device::*;

    // Usage, access and stage flags
    pub use crate::flags::*;

    // Logging sub-module (types only, macros live at the crate root)
    pub mod log {
        pub use crate::log::{
            Logger, LogEntry, LogSeverity, DefaultLogger, set_logger, reset_logger, set_min_severity, min_severity,
        };
    }
}
