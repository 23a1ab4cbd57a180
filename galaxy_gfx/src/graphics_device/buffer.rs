/// Buffer resource: backend trait, creation info and frontend object

use std::any::Any;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::graphics_device::{BufferId, ContextShared, PendingDeletion};

/// Host visibility of a buffer's memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapMode {
    /// Device-local, never host mapped; filled through transfers
    #[default]
    Never,
    /// Always host mapped (upload heap)
    Always,
    /// Mapped only when the device has host-visible device-local memory
    /// (resizable BAR or unified memory); otherwise behaves like `Never`
    IfOptimal,
}

/// Descriptor for creating a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferCreateInfo {
    /// Size in bytes
    pub size: u64,
    /// Host visibility
    pub map_mode: MapMode,
    /// Prefer host-cached memory (read-back buffers)
    pub cached: bool,
}

impl Default for BufferCreateInfo {
    fn default() -> Self {
        Self {
            size: 0,
            map_mode: MapMode::Never,
            cached: false,
        }
    }
}

impl BufferCreateInfo {
    /// Host-mapped buffer of `size` bytes
    pub fn mapped(size: u64) -> Self {
        Self {
            size,
            map_mode: MapMode::Always,
            cached: false,
        }
    }

    /// Device-local buffer of `size` bytes
    pub fn device_local(size: u64) -> Self {
        Self {
            size,
            map_mode: MapMode::Never,
            cached: false,
        }
    }
}

/// Backend buffer object
///
/// Implemented by backend-specific buffer types (e.g., VulkanBuffer).
/// The native buffer is destroyed when the object is dropped, which the
/// frontend only lets happen once the owning frame slot has retired.
pub trait RawBuffer: Send + Sync {
    /// Copy `data` into mapped memory at `offset`
    fn write(&self, offset: u64, data: &[u8]) -> Result<()>;

    /// Copy mapped memory at `offset` into `out`
    fn read(&self, offset: u64, out: &mut [u8]) -> Result<()>;

    /// Whether the buffer memory is host mapped
    fn is_mapped(&self) -> bool;

    /// GPU virtual address (0 when unsupported)
    fn device_address(&self) -> u64;

    fn as_any(&self) -> &dyn Any;
}

/// GPU buffer
///
/// Created through `Context::create_buffer`. Owns its bindless storage-buffer
/// slot; dropping the last `Arc` queues both the slot and the native buffer
/// for release when the current frame slot comes around again.
pub struct Buffer {
    shared: Arc<ContextShared>,
    raw: Option<Box<dyn RawBuffer>>,
    info: BufferCreateInfo,
    id: BufferId,
}

impl Buffer {
    pub(crate) fn new(
        shared: Arc<ContextShared>,
        raw: Box<dyn RawBuffer>,
        info: BufferCreateInfo,
        id: BufferId,
    ) -> Self {
        Self {
            shared,
            raw: Some(raw),
            info,
            id,
        }
    }

    /// Size in bytes
    pub fn size(&self) -> u64 {
        self.info.size
    }

    pub fn map_mode(&self) -> MapMode {
        self.info.map_mode
    }

    pub fn is_cached(&self) -> bool {
        self.info.cached
    }

    /// Whether the buffer is host mapped (always true for `MapMode::Always`)
    pub fn is_mapped(&self) -> bool {
        self.raw().is_mapped()
    }

    /// Bindless storage-buffer slot
    pub fn id(&self) -> BufferId {
        self.id
    }

    /// GPU virtual address of the first byte
    pub fn device_address(&self) -> u64 {
        self.raw().device_address()
    }

    /// Write `data` at `offset` through the host mapping
    ///
    /// Fails with `Error::InvalidResource` if the buffer is not mapped or the
    /// range exceeds the buffer.
    pub fn write(&self, offset: u64, data: &[u8]) -> Result<()> {
        self.check_host_access(offset, data.len() as u64)?;
        self.raw().write(offset, data)
    }

    /// Write a slice of plain-old-data values at `offset`
    pub fn write_pod<T: bytemuck::Pod>(&self, offset: u64, values: &[T]) -> Result<()> {
        self.write(offset, bytemuck::cast_slice(values))
    }

    /// Read `out.len()` bytes at `offset` through the host mapping
    pub fn read(&self, offset: u64, out: &mut [u8]) -> Result<()> {
        self.check_host_access(offset, out.len() as u64)?;
        self.raw().read(offset, out)
    }

    /// Backend object
    pub fn raw(&self) -> &dyn RawBuffer {
        match &self.raw {
            Some(raw) => raw.as_ref(),
            None => unreachable!("buffer backend object taken before drop"),
        }
    }

    fn check_host_access(&self, offset: u64, len: u64) -> Result<()> {
        if !self.is_mapped() {
            return Err(Error::InvalidResource(format!(
                "{} is not host mapped (map mode {:?})",
                self.id, self.info.map_mode
            )));
        }
        match offset.checked_add(len) {
            Some(end) if end <= self.info.size => Ok(()),
            _ => Err(Error::InvalidResource(format!(
                "host access [{}, +{}) out of range for {} of {} bytes",
                offset, len, self.id, self.info.size
            ))),
        }
    }
}

impl std::fmt::Debug for Buffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Buffer")
            .field("id", &self.id)
            .field("info", &self.info)
            .finish()
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        self.shared.defer(PendingDeletion::BufferId(self.id));
        if let Some(raw) = self.raw.take() {
            self.shared.defer(PendingDeletion::Buffer(raw));
        }
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
