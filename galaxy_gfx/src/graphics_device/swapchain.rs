/// Swapchain - window presentation
///
/// The swapchain images are exposed as `Texture`s so they can be used as
/// color attachments, blit/copy destinations and barrier targets like any
/// other texture. They never receive a bindless slot.

use std::any::Any;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::flags::TextureUsage;
use crate::graphics_device::{
    ContextShared, Extent3D, Format, PendingDeletion, RawTexture, Texture, TextureInfo, TextureLayout, TextureType,
};
use crate::{engine_debug, engine_warn};

/// Descriptor for creating a swapchain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapchainCreateInfo {
    /// Requested size; the surface's current extent wins when it is fixed
    pub extent: Extent3D,
    /// Preferred format; the backend falls back to a supported one
    pub format: Format,
    /// FIFO presentation when true, mailbox/immediate otherwise
    pub vsync: bool,
    /// Preferred image count, clamped to the surface limits
    pub image_count: u32,
}

impl Default for SwapchainCreateInfo {
    fn default() -> Self {
        Self {
            extent: Extent3D::d2(1280, 720),
            format: Format::B8G8R8A8_SRGB,
            vsync: true,
            image_count: 3,
        }
    }
}

/// Backend swapchain object
pub trait RawSwapchain: Send + Sync {
    /// Acquire the next image; `Error::SwapchainOutOfDate` when the surface
    /// changed and the swapchain must be recreated
    fn acquire_next_image(&mut self) -> Result<u32>;

    /// Present `image_index`; `Error::SwapchainOutOfDate` when stale
    fn present(&mut self, image_index: u32) -> Result<()>;

    /// Rebuild for a new surface size (waits for the device to go idle)
    fn recreate(&mut self, width: u32, height: u32) -> Result<()>;

    /// Non-owning texture wrappers over the current images, in index order
    fn image_textures(&self) -> Vec<Box<dyn RawTexture>>;

    fn extent(&self) -> Extent3D;

    fn format(&self) -> Format;

    fn image_count(&self) -> usize;

    fn as_any(&self) -> &dyn Any;
}

struct SwapchainState {
    raw: Option<Box<dyn RawSwapchain>>,
    textures: Vec<Arc<Texture>>,
    current: Option<u32>,
}

impl SwapchainState {
    fn raw(&self) -> &dyn RawSwapchain {
        match &self.raw {
            Some(raw) => raw.as_ref(),
            None => unreachable!("swapchain backend object taken before drop"),
        }
    }

    fn raw_mut(&mut self) -> &mut dyn RawSwapchain {
        match &mut self.raw {
            Some(raw) => raw.as_mut(),
            None => unreachable!("swapchain backend object taken before drop"),
        }
    }
}

/// Presentable image chain bound to a window surface
pub struct Swapchain {
    shared: Arc<ContextShared>,
    state: Mutex<SwapchainState>,
}

impl Swapchain {
    pub(crate) fn new(shared: Arc<ContextShared>, raw: Box<dyn RawSwapchain>) -> Self {
        let textures = wrap_images(&shared, raw.as_ref());
        Self {
            shared,
            state: Mutex::new(SwapchainState {
                raw: Some(raw),
                textures,
                current: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SwapchainState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Acquire the next image and make it current
    ///
    /// Returns `Error::SwapchainOutOfDate` when the window surface changed;
    /// call `resize` and try again.
    pub fn acquire_next_image(&self) -> Result<u32> {
        let mut state = self.lock();
        match state.raw_mut().acquire_next_image() {
            Ok(index) => {
                state.current = Some(index);
                Ok(index)
            }
            Err(Error::SwapchainOutOfDate) => {
                state.current = None;
                engine_warn!("gfx::Swapchain", "Swapchain out of date on acquire");
                Err(Error::SwapchainOutOfDate)
            }
            Err(e) => Err(e),
        }
    }

    /// Index of the image acquired last, if not yet presented
    pub fn current_image_index(&self) -> Option<u32> {
        self.lock().current
    }

    /// Texture of the image acquired last, if not yet presented
    pub fn current_texture(&self) -> Option<Arc<Texture>> {
        let state = self.lock();
        state
            .current
            .and_then(|index| state.textures.get(index as usize).cloned())
    }

    /// Every swapchain image, in index order
    pub fn textures(&self) -> Vec<Arc<Texture>> {
        self.lock().textures.clone()
    }

    /// Recreate the swapchain for a new window size
    ///
    /// Previously returned textures stay valid objects but no longer refer to
    /// presentable images; fetch them again.
    pub fn resize(&self, width: u32, height: u32) -> Result<()> {
        let mut state = self.lock();
        state.raw_mut().recreate(width, height)?;
        state.textures = wrap_images(&self.shared, state.raw());
        state.current = None;
        engine_debug!(
            "gfx::Swapchain",
            "Swapchain resized to {}x{} ({} images)",
            width,
            height,
            state.textures.len()
        );
        Ok(())
    }

    pub fn extent(&self) -> Extent3D {
        self.lock().raw().extent()
    }

    pub fn format(&self) -> Format {
        self.lock().raw().format()
    }

    pub fn image_count(&self) -> usize {
        self.lock().raw().image_count()
    }

    /// Present the current image and clear it
    pub(crate) fn present_current(&self) -> Result<()> {
        let mut state = self.lock();
        let index = state.current.take().ok_or_else(|| {
            Error::InvalidResource("present called without an acquired swapchain image".to_string())
        })?;
        if let Some(texture) = state.textures.get(index as usize) {
            debug_assert!(
                texture.layout() == TextureLayout::Present,
                "presenting swapchain image {} in {:?}, expected Present",
                index,
                texture.layout()
            );
        }
        match state.raw_mut().present(index) {
            Err(Error::SwapchainOutOfDate) => {
                engine_warn!("gfx::Swapchain", "Swapchain out of date on present");
                Err(Error::SwapchainOutOfDate)
            }
            other => other,
        }
    }

    /// Run `f` with the backend object locked
    pub(crate) fn with_raw<R>(&self, f: impl FnOnce(&dyn RawSwapchain) -> R) -> R {
        let state = self.lock();
        f(state.raw())
    }
}

impl Drop for Swapchain {
    fn drop(&mut self) {
        let mut state = self.lock();
        state.textures.clear();
        if let Some(raw) = state.raw.take() {
            self.shared.defer(PendingDeletion::Swapchain(raw));
        }
    }
}

fn wrap_images(shared: &Arc<ContextShared>, raw: &dyn RawSwapchain) -> Vec<Arc<Texture>> {
    let info = TextureInfo {
        extent: raw.extent(),
        format: raw.format(),
        texture_type: TextureType::D2,
        usage: TextureUsage::COLOR_ATTACHMENT | TextureUsage::TRANSFER_DST,
        array_layers: 1,
        mip_levels: 1,
    };
    raw.image_textures()
        .into_iter()
        .map(|image| Arc::new(Texture::new(Arc::clone(shared), image, info, None, None, None)))
        .collect()
}
