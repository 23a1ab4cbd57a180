/// Queue - submission, presentation and the frame cycle

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::graphics_device::{CommandBuffer, CommandBufferState, ContextShared, Fence, Submission, Swapchain};
use crate::engine_trace;

/// Submission queue of a `Context`
///
/// Frame cycle with N frames in flight:
///
/// ```text
/// start_next_frame()  f = (f + 1) % N
///                     wait for the GPU work submitted under f last time
///                     release everything dropped while f was current
/// record + submit     work is tagged with f
/// present
/// ```
pub struct Queue {
    shared: Arc<ContextShared>,
}

impl Queue {
    pub(crate) fn new(shared: Arc<ContextShared>) -> Self {
        Self { shared }
    }

    /// Index of the current frame slot
    pub fn frame_index(&self) -> usize {
        self.shared.frame_index()
    }

    pub fn frames_in_flight(&self) -> usize {
        self.shared.frames_in_flight()
    }

    /// Advance to the next frame slot, wait for its previous GPU work and
    /// release the objects that were dropped while it was last current
    ///
    /// Returns the new frame index.
    pub fn start_next_frame(&self) -> Result<usize> {
        let next = (self.shared.frame_index() + 1) % self.shared.frames_in_flight();
        // Snapshot before advancing: objects dropped from now on are tagged
        // with `next` and wait a full cycle
        let retired = self.shared.take_deletions(next);
        self.shared.set_frame_index(next);

        if let Err(e) = self.shared.device.wait_for_frame(next) {
            // Not released: the GPU may still use them
            for item in retired {
                self.shared.defer(item);
            }
            return Err(e);
        }

        let released = self.shared.release_all(retired);
        engine_trace!("gfx::Queue", "Frame slot {} started ({} deletions processed)", next, released);
        Ok(next)
    }

    /// Submit a ready command buffer under the current frame slot
    pub fn submit(&self, command_buffer: &CommandBuffer) -> Result<()> {
        check_ready(command_buffer)?;
        let submission = Submission {
            frame: self.frame_index(),
            swapchain: None,
            fence: None,
        };
        command_buffer.with_raw(|raw| self.shared.device.submit(raw, submission))
    }

    /// Submit and signal `fence` on completion
    pub fn submit_with_fence(&self, command_buffer: &CommandBuffer, fence: &Fence) -> Result<()> {
        check_ready(command_buffer)?;
        let submission = Submission {
            frame: self.frame_index(),
            swapchain: None,
            fence: Some(fence.raw()),
        };
        command_buffer.with_raw(|raw| self.shared.device.submit(raw, submission))
    }

    /// Submit work that renders into the swapchain's current image: waits
    /// for the image to be acquired and signals its presentation
    pub fn submit_for_present(&self, command_buffer: &CommandBuffer, swapchain: &Swapchain) -> Result<()> {
        check_ready(command_buffer)?;
        let frame = self.frame_index();
        swapchain.with_raw(|raw_swapchain| {
            let submission = Submission {
                frame,
                swapchain: Some(raw_swapchain),
                fence: None,
            };
            command_buffer.with_raw(|raw| self.shared.device.submit(raw, submission))
        })
    }

    /// Present the swapchain's current image
    ///
    /// `Error::SwapchainOutOfDate` is recoverable: resize the swapchain and
    /// continue with the next frame.
    pub fn present(&self, swapchain: &Swapchain) -> Result<()> {
        swapchain.present_current()
    }

    /// Submit outside the frame cycle and block until the GPU is done
    /// (uploads, one-off transfers)
    pub fn submit_temporary(&self, command_buffer: &CommandBuffer) -> Result<()> {
        check_ready(command_buffer)?;
        command_buffer.with_raw(|raw| self.shared.device.submit_and_wait(raw))
    }

    pub fn wait_idle(&self) -> Result<()> {
        self.shared.device.wait_idle()
    }
}

fn check_ready(command_buffer: &CommandBuffer) -> Result<()> {
    let state = command_buffer.state();
    debug_assert!(
        state == CommandBufferState::Ready,
        "submitting a command buffer in state {:?}",
        state
    );
    if state != CommandBufferState::Ready {
        return Err(Error::InvalidResource(format!(
            "command buffer submitted in state {:?}",
            state
        )));
    }
    Ok(())
}
