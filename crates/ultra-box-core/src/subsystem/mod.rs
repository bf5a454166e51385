//! Subsystem registry.
//!
//! Each subsystem has a two-phase lifecycle: `set_defaults` runs at cold
//! start, before any interrupt vector exists, and only fills in plain data;
//! `initialize` runs in the bring-up context, resets and binds the
//! subsystem's completion channels and applies its configuration. Game code
//! may edit the defaults in between.

mod device;
mod system;
mod video;

pub use device::{DeviceState, DEFAULT_STORAGE_QUEUE_DEPTH};
pub use system::SystemState;
pub use video::VideoState;

use ultra_box_hal::{EventSource, Platform};

use crate::channel::ChannelBank;
use crate::error::BootError;

pub trait Subsystem<P: Platform> {
    const NAME: &'static str;

    fn set_defaults(&mut self);

    fn initialize(
        &mut self,
        platform: &mut P,
        channels: &'static ChannelBank,
    ) -> Result<(), BootError<P::Error>>;
}

/// All subsystem state, owned by the engine context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Subsystems {
    pub system: SystemState,
    pub video: VideoState,
    pub device: DeviceState,
}

impl Subsystems {
    /// Reset every subsystem to its defaults. Touches no hardware.
    pub fn set_defaults<P: Platform>(&mut self) {
        Subsystem::<P>::set_defaults(&mut self.system);
        Subsystem::<P>::set_defaults(&mut self.video);
        Subsystem::<P>::set_defaults(&mut self.device);
    }

    /// Bring the subsystems up in order: system, video, device. Stops at the
    /// first failure.
    pub fn initialize<P: Platform>(
        &mut self,
        platform: &mut P,
        channels: &'static ChannelBank,
    ) -> Result<(), BootError<P::Error>> {
        initialize_one(&mut self.system, platform, channels)?;
        initialize_one(&mut self.video, platform, channels)?;
        initialize_one(&mut self.device, platform, channels)?;
        Ok(())
    }
}

fn initialize_one<P: Platform, S: Subsystem<P>>(
    subsystem: &mut S,
    platform: &mut P,
    channels: &'static ChannelBank,
) -> Result<(), BootError<P::Error>> {
    subsystem.initialize(platform, channels)?;
    log::info!("{} subsystem initialized", S::NAME);
    Ok(())
}

/// Reset the channel for `source` and route the hardware event to it.
pub(crate) fn bind_channel<P: Platform>(
    platform: &mut P,
    channels: &'static ChannelBank,
    source: EventSource,
) -> Result<(), BootError<P::Error>> {
    let channel = channels.get(source);
    channel.reset();
    platform
        .bind_event(source, channel)
        .map_err(|error| BootError::Bind { source, error })
}

/// Completion channels hold exactly one pending signal.
pub(crate) fn require_single_slot<E: core::fmt::Debug>(
    subsystem: &'static str,
    depth: usize,
) -> Result<(), BootError<E>> {
    if depth == 1 {
        Ok(())
    } else {
        Err(BootError::UnsupportedQueueDepth { subsystem, depth })
    }
}
