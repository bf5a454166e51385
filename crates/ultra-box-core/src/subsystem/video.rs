use ultra_box_hal::{DisplayFeatures, DisplayMode, EventSource, PhysAddr, Platform};

use super::{bind_channel, require_single_slot, Subsystem};
use crate::channel::ChannelBank;
use crate::error::BootError;

/// Display subsystem configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoState {
    pub mode: DisplayMode,
    /// Gamma, dither filter and divot are all off by default.
    pub features: DisplayFeatures,
    pub retrace_queue_depth: usize,
    /// Framebuffer for each frame slot. The two must differ; there is no
    /// default, so `on_boot` has to fill them in.
    pub framebuffers: [PhysAddr; 2],
}

impl<P: Platform> Subsystem<P> for VideoState {
    const NAME: &'static str = "video";

    fn set_defaults(&mut self) {
        *self = VideoState {
            retrace_queue_depth: 1,
            ..VideoState::default()
        };
    }

    fn initialize(
        &mut self,
        platform: &mut P,
        channels: &'static ChannelBank,
    ) -> Result<(), BootError<P::Error>> {
        require_single_slot(<Self as Subsystem<P>>::NAME, self.retrace_queue_depth)?;
        let [front, back] = self.framebuffers;
        if front == back {
            return Err(BootError::AliasedFramebuffers(front));
        }

        platform
            .start_display_manager()
            .map_err(BootError::Display)?;
        platform.set_mode(self.mode).map_err(BootError::Display)?;
        platform
            .set_features(self.features)
            .map_err(BootError::Display)?;
        log::debug!(
            "display mode {} ({}x{} @ {} Hz)",
            self.mode.index(),
            self.mode.width(),
            self.mode.height(),
            self.mode.refresh_hz()
        );

        bind_channel(platform, channels, EventSource::DisplayRefresh)
    }
}
