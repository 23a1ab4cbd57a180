/// CPU-GPU fence

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;
use crate::graphics_device::{ContextShared, PendingDeletion};

pub trait RawFence: Send + Sync {
    /// Block until signaled or `timeout_ns` elapses; `Ok(false)` on timeout
    fn wait(&self, timeout_ns: u64) -> Result<bool>;

    fn reset(&self) -> Result<()>;

    fn is_signaled(&self) -> Result<bool>;

    fn as_any(&self) -> &dyn Any;
}

/// Fence signaled by the GPU when a submission completes
///
/// Pass it to `Queue::submit_with_fence` and wait on it from the CPU.
pub struct Fence {
    shared: Arc<ContextShared>,
    raw: Option<Box<dyn RawFence>>,
}

impl Fence {
    pub(crate) fn new(shared: Arc<ContextShared>, raw: Box<dyn RawFence>) -> Self {
        Self { shared, raw: Some(raw) }
    }

    /// Wait up to `timeout`; returns whether the fence was signaled
    pub fn wait(&self, timeout: Duration) -> Result<bool> {
        let timeout_ns = u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX);
        self.raw().wait(timeout_ns)
    }

    /// Wait with no timeout
    pub fn wait_forever(&self) -> Result<()> {
        self.raw().wait(u64::MAX).map(|_| ())
    }

    pub fn reset(&self) -> Result<()> {
        self.raw().reset()
    }

    pub fn is_signaled(&self) -> Result<bool> {
        self.raw().is_signaled()
    }

    pub fn raw(&self) -> &dyn RawFence {
        match &self.raw {
            Some(raw) => raw.as_ref(),
            None => unreachable!("fence backend object taken before drop"),
        }
    }
}

impl Drop for Fence {
    fn drop(&mut self) {
        if let Some(raw) = self.raw.take() {
            self.shared.defer(PendingDeletion::Fence(raw));
        }
    }
}
