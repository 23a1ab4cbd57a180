/// Sub-allocation of one GPU buffer into many ranges

use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::graphics_device::Buffer;
use crate::utils::VirtualAllocator;

/// Range of a suballocated buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferSlice {
    pub offset: u64,
    pub size: u64,
}

/// One buffer carved into ranges by a best-fit `VirtualAllocator`
///
/// Shaders reach a slice through the buffer's bindless ID plus the slice
/// offset, or through `device_address() + offset`.
pub struct BufferSuballocator {
    buffer: Arc<Buffer>,
    allocator: Mutex<VirtualAllocator>,
}

impl BufferSuballocator {
    pub fn new(buffer: Arc<Buffer>) -> Self {
        let size = buffer.size();
        Self {
            buffer,
            allocator: Mutex::new(VirtualAllocator::new(size)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VirtualAllocator> {
        self.allocator.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn buffer(&self) -> &Arc<Buffer> {
        &self.buffer
    }

    /// Reserve `size` bytes aligned to `alignment`; `None` when nothing fits
    pub fn allocate(&self, size: u64, alignment: u64) -> Option<BufferSlice> {
        self.lock()
            .allocate(size, alignment)
            .map(|offset| BufferSlice { offset, size })
    }

    /// Return a slice to the free space
    pub fn free(&self, slice: BufferSlice) {
        self.lock().free(slice.offset, slice.size);
    }

    /// Write `data` at the start of `slice` (buffer must be mapped)
    pub fn write(&self, slice: BufferSlice, data: &[u8]) -> Result<()> {
        if data.len() as u64 > slice.size {
            return Err(Error::InvalidResource(format!(
                "{} bytes do not fit a slice of {} bytes",
                data.len(),
                slice.size
            )));
        }
        self.buffer.write(slice.offset, data)
    }

    /// GPU address of the first byte of `slice`
    pub fn device_address(&self, slice: BufferSlice) -> u64 {
        self.buffer.device_address() + slice.offset
    }

    pub fn free_space(&self) -> u64 {
        self.lock().free_space()
    }

    pub fn used_space(&self) -> u64 {
        self.lock().used_space()
    }
}

#[cfg(test)]
#[path = "suballocator_tests.rs"]
mod tests;
