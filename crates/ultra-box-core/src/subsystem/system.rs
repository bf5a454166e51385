use ultra_box_hal::{EventSource, Platform};

use super::{bind_channel, require_single_slot, Subsystem};
use crate::channel::ChannelBank;
use crate::error::BootError;

/// Timing subsystem: memory transfer and coprocessor completion events.
///
/// Only the rasterizer channel gates the frame loop. The signal-processor
/// channel is bound so its completions have a sink, but nothing waits on it:
/// it fires once per job and its `coalesced` count grows with every frame.
/// Read its `delivered` count as a job counter, not as a handshake.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemState {
    pub dma_queue_depth: usize,
    pub signal_processor_queue_depth: usize,
    pub rasterizer_queue_depth: usize,
}

impl<P: Platform> Subsystem<P> for SystemState {
    const NAME: &'static str = "system";

    fn set_defaults(&mut self) {
        *self = SystemState {
            dma_queue_depth: 1,
            signal_processor_queue_depth: 1,
            rasterizer_queue_depth: 1,
        };
    }

    fn initialize(
        &mut self,
        platform: &mut P,
        channels: &'static ChannelBank,
    ) -> Result<(), BootError<P::Error>> {
        let bindings = [
            (EventSource::MemoryTransfer, self.dma_queue_depth),
            (EventSource::SignalProcessor, self.signal_processor_queue_depth),
            (EventSource::Rasterizer, self.rasterizer_queue_depth),
        ];
        for (source, depth) in bindings {
            require_single_slot(<Self as Subsystem<P>>::NAME, depth)?;
            bind_channel(platform, channels, source)?;
        }
        Ok(())
    }
}
