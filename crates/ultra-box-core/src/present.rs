//! Presentation: swap the display source and rotate the frame index in
//! lock-step with display refresh.

use ultra_box_hal::{EventSource, PhysAddr, Platform};

use crate::channel::{ChannelBank, WaitPolicy};
use crate::dispatch::wait_for;
use crate::error::PipelineError;
use crate::frame::{FrameSlots, SlotIndex};

/// Hands finished frames to the display, one per refresh.
#[derive(Debug)]
pub struct Presenter {
    policy: WaitPolicy,
    presented: u64,
    stale_refreshes: u64,
}

impl Presenter {
    /// A presenter whose refresh waits use `policy`.
    pub fn new(policy: WaitPolicy) -> Self {
        Self {
            policy,
            presented: 0,
            stale_refreshes: 0,
        }
    }

    /// Frames presented since boot.
    pub fn presented(&self) -> u64 {
        self.presented
    }

    /// Refresh signals that fired with no one waiting and were discarded.
    pub fn stale_refreshes(&self) -> u64 {
        self.stale_refreshes
    }

    /// Point the display at `framebuffer` before the first frame.
    pub fn prime<P: Platform>(
        &mut self,
        platform: &mut P,
        framebuffer: PhysAddr,
    ) -> Result<(), PipelineError<P::Error>> {
        log::debug!("priming display with framebuffer {framebuffer:#010x}");
        platform
            .swap_buffer(framebuffer)
            .map_err(PipelineError::Hardware)
    }

    /// Show the current slot, wait for a retrace after the swap, then
    /// rotate. Returns the slot that was presented.
    pub fn present<P: Platform, O, const CLEAR: usize, const DRAW: usize>(
        &mut self,
        platform: &mut P,
        channels: &ChannelBank,
        slots: &mut FrameSlots<O, CLEAR, DRAW>,
    ) -> Result<SlotIndex, PipelineError<P::Error>> {
        let source = EventSource::DisplayRefresh;
        let current = slots.current();
        let channel = channels.get(source);

        platform
            .swap_buffer(slots.slot(current).framebuffer())
            .map_err(PipelineError::Hardware)?;
        // Arm after the swap: a retrace that fired before it cannot have
        // latched the new framebuffer. Refresh fires whether or not anyone
        // waits, so a discarded signal is routine.
        if channel.arm() {
            self.stale_refreshes += 1;
        }
        wait_for(platform, channel, source, self.policy)?;

        slots.rotate();
        self.presented += 1;
        Ok(current)
    }
}
