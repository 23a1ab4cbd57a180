/// GraphicsDevice trait - the backend seam
///
/// Every backend (Vulkan, the test mock) implements `GraphicsDevice` and the
/// `Raw*` object traits. The frontend (`Context`, `Queue`, resources, command
/// buffers) only ever talks to these traits; backend objects are reached
/// through `as_any()` downcasts inside the backend itself.

use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;
use winit::window::Window;

use crate::error::{Error, Result};
use crate::flags::{FormatSupport, TextureUsage};
use crate::graphics_device::{
    BufferCreateInfo, BufferId, ComputePipelineCreateInfo, DebugConfig, Format, GraphicsPipelineCreateInfo,
    RawBuffer, RawCommandBuffer, RawFence, RawPipeline, RawSampler, RawShader, RawSwapchain, RawTexture,
    SamplerCreateInfo, SamplerId, ShaderCreateInfo, SwapchainCreateInfo, TextureAspect, TextureCreateInfo,
    TextureId,
};
use crate::{engine_info, engine_warn};

// ============================================================================
// Configuration
// ============================================================================

/// Native graphics API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Api {
    Vulkan,
    /// Out-of-tree backend registered under a name
    Custom(&'static str),
}

/// How the window surface is provided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WindowApi {
    /// No surface; offscreen rendering and compute only
    #[default]
    Headless,
    /// A `winit` window passed in `ContextCreateInfo::window`
    Winit,
}

/// Context creation parameters
#[derive(Debug, Clone)]
pub struct ContextCreateInfo {
    pub api: Api,
    pub window_api: WindowApi,
    /// Required when `window_api` is `Winit`
    pub window: Option<Arc<Window>>,
    /// Frames the CPU may record ahead of the GPU
    pub preferred_frames_in_flight: usize,
    pub app_name: String,
    /// Enable validation layers and the debug messenger
    pub enable_validation: bool,
    pub debug: DebugConfig,
}

impl Default for ContextCreateInfo {
    fn default() -> Self {
        Self {
            api: Api::Vulkan,
            window_api: WindowApi::Headless,
            window: None,
            preferred_frames_in_flight: 2,
            app_name: "Galaxy GFX Application".to_string(),
            enable_validation: cfg!(debug_assertions),
            debug: DebugConfig::default(),
        }
    }
}

impl ContextCreateInfo {
    /// Windowed context presenting to `window`
    pub fn with_window(window: Arc<Window>) -> Self {
        Self {
            window_api: WindowApi::Winit,
            window: Some(window),
            ..Self::default()
        }
    }

    /// Check the combination of window settings
    pub fn validate(&self) -> Result<()> {
        if self.preferred_frames_in_flight == 0 {
            return Err(Error::InitializationFailed(
                "preferred_frames_in_flight must be at least 1".to_string(),
            ));
        }
        if self.window_api == WindowApi::Winit && self.window.is_none() {
            return Err(Error::InitializationFailed(
                "window_api is Winit but no window was provided".to_string(),
            ));
        }
        Ok(())
    }
}

/// Device capabilities relevant to the frontend
#[derive(Debug, Clone, PartialEq)]
pub struct HardwareSupport {
    pub device_name: String,
    /// Descriptor indexing with update-after-bind and partially bound arrays
    pub bindless: bool,
    pub buffer_device_address: bool,
    /// Largest descriptor array per bindless binding
    pub max_bindless_resources: u32,
    pub max_anisotropy: f32,
    pub max_push_constant_size: u32,
    /// Host-visible device-local memory (resizable BAR or unified memory)
    pub host_visible_device_memory: bool,
}

/// Where a submission signals and waits
#[derive(Clone, Copy)]
pub struct Submission<'a> {
    /// Frame slot whose completion the submission is tracked under
    pub frame: usize,
    /// Wait on the acquire semaphore and signal the present semaphore
    pub swapchain: Option<&'a dyn RawSwapchain>,
    /// Extra fence signaled on completion
    pub fence: Option<&'a dyn RawFence>,
}

// ============================================================================
// GraphicsDevice trait
// ============================================================================

/// Backend device: resource factory, bindless table owner, submission queue
pub trait GraphicsDevice: Send + Sync {
    fn api(&self) -> Api;

    fn hardware_support(&self) -> HardwareSupport;

    /// Capabilities of `format` on this device (empty if unsupported)
    fn format_support(&self, format: Format) -> FormatSupport;

    /// Frame slots the device tracks completion for
    fn frames_in_flight(&self) -> usize;

    // ===== FACTORIES =====

    fn create_buffer(&self, info: &BufferCreateInfo) -> Result<Box<dyn RawBuffer>>;

    fn create_texture(&self, info: &TextureCreateInfo) -> Result<Box<dyn RawTexture>>;

    fn create_sampler(&self, info: &SamplerCreateInfo) -> Result<Box<dyn RawSampler>>;

    fn create_shader(&self, info: &ShaderCreateInfo) -> Result<Box<dyn RawShader>>;

    fn create_graphics_pipeline(&self, info: &GraphicsPipelineCreateInfo) -> Result<Box<dyn RawPipeline>>;

    fn create_compute_pipeline(&self, info: &ComputePipelineCreateInfo) -> Result<Box<dyn RawPipeline>>;

    /// Fails with `InitializationFailed` on a headless device
    fn create_swapchain(&self, info: &SwapchainCreateInfo) -> Result<Box<dyn RawSwapchain>>;

    fn create_command_buffer(&self) -> Result<Box<dyn RawCommandBuffer>>;

    fn create_fence(&self, signaled: bool) -> Result<Box<dyn RawFence>>;

    // ===== BINDLESS DESCRIPTORS =====

    /// Descriptor array size per binding (clamped to device limits)
    fn bindless_capacity(&self) -> u32;

    /// Point storage-buffer slot `id` at `buffer`
    fn write_buffer_descriptor(&self, id: BufferId, buffer: &dyn RawBuffer);

    /// Point the texture slot `id` at `texture`'s `aspect` view, in the
    /// sampled array if `usage` has `SAMPLED` and in the storage array if it
    /// has `STORAGE`
    fn write_texture_descriptor(&self, id: TextureId, texture: &dyn RawTexture, aspect: TextureAspect, usage: TextureUsage);

    fn write_sampler_descriptor(&self, id: SamplerId, sampler: &dyn RawSampler);

    /// Reset slot `id` to the safe default buffer
    fn clear_buffer_descriptor(&self, id: BufferId);

    /// Reset slot `id` in both texture arrays to the safe default texture
    fn clear_texture_descriptor(&self, id: TextureId);

    /// Reset slot `id` to the safe default sampler
    fn clear_sampler_descriptor(&self, id: SamplerId);

    // ===== SUBMISSION =====

    /// Block until all work submitted under `frame` has completed
    fn wait_for_frame(&self, frame: usize) -> Result<()>;

    fn submit(&self, command_buffer: &dyn RawCommandBuffer, submission: Submission<'_>) -> Result<()>;

    /// Submit outside the frame cycle and block until it completes
    fn submit_and_wait(&self, command_buffer: &dyn RawCommandBuffer) -> Result<()>;

    fn wait_idle(&self) -> Result<()>;
}

// ============================================================================
// Plugin system for registering backends
// ============================================================================

/// Backend plugin factory function type
type BackendPluginFactory = Box<dyn Fn(&ContextCreateInfo) -> Result<Box<dyn GraphicsDevice>> + Send + Sync>;

/// Plugin registry for backends, keyed by API
pub struct BackendPluginRegistry {
    plugins: FxHashMap<Api, BackendPluginFactory>,
}

impl BackendPluginRegistry {
    fn new() -> Self {
        Self {
            plugins: FxHashMap::default(),
        }
    }

    /// Register (or replace) the factory for `api`
    pub fn register_plugin<F>(&mut self, api: Api, factory: F)
    where
        F: Fn(&ContextCreateInfo) -> Result<Box<dyn GraphicsDevice>> + Send + Sync + 'static,
    {
        if self.plugins.insert(api, Box::new(factory)).is_some() {
            engine_warn!("gfx::Registry", "Backend plugin {:?} replaced", api);
        }
    }

    /// Remove the factory for `api`; returns whether one was registered
    pub fn unregister_plugin(&mut self, api: Api) -> bool {
        self.plugins.remove(&api).is_some()
    }

    pub fn is_registered(&self, api: Api) -> bool {
        self.plugins.contains_key(&api)
    }

    /// Create a device with the factory registered for `info.api`
    pub fn create_device(&self, info: &ContextCreateInfo) -> Result<Box<dyn GraphicsDevice>> {
        let factory = self
            .plugins
            .get(&info.api)
            .ok_or_else(|| Error::UnsupportedApi(format!("no backend registered for {:?}", info.api)))?;
        factory(info)
    }
}

static BACKEND_REGISTRY: Mutex<Option<BackendPluginRegistry>> = Mutex::new(None);

/// Run `f` on the global registry, creating it on first access
pub fn with_backend_registry<R>(f: impl FnOnce(&mut BackendPluginRegistry) -> R) -> R {
    let mut registry = BACKEND_REGISTRY.lock().unwrap_or_else(|e| e.into_inner());
    f(registry.get_or_insert_with(BackendPluginRegistry::new))
}

/// Register a backend plugin in the global registry
///
/// # Arguments
///
/// * `api` - API the backend implements
/// * `factory` - Device factory
pub fn register_backend_plugin<F>(api: Api, factory: F)
where
    F: Fn(&ContextCreateInfo) -> Result<Box<dyn GraphicsDevice>> + Send + Sync + 'static,
{
    with_backend_registry(|registry| registry.register_plugin(api, factory));
    engine_info!("gfx::Registry", "Backend plugin {:?} registered", api);
}

/// Remove a backend plugin from the global registry
pub fn unregister_backend_plugin(api: Api) -> bool {
    with_backend_registry(|registry| registry.unregister_plugin(api))
}

/// Whether a backend is registered for `api`
pub fn is_backend_registered(api: Api) -> bool {
    with_backend_registry(|registry| registry.is_registered(api))
}

#[cfg(test)]
#[path = "graphics_device_tests.rs"]
mod tests;
