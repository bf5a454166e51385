use ultra_box_hal::{MediaHandle, MediaKind, Platform};

use super::Subsystem;
use crate::channel::ChannelBank;
use crate::error::BootError;

/// Request slots for the storage transfer manager.
pub const DEFAULT_STORAGE_QUEUE_DEPTH: usize = 8;

/// Storage subsystem: media handles and the transfer manager.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceState {
    pub cart_rom: Option<MediaHandle>,
    pub disk_drive: Option<MediaHandle>,
    pub drive_rom: Option<MediaHandle>,
    pub queue_depth: usize,
}

impl<P: Platform> Subsystem<P> for DeviceState {
    const NAME: &'static str = "device";

    fn set_defaults(&mut self) {
        *self = DeviceState {
            queue_depth: DEFAULT_STORAGE_QUEUE_DEPTH,
            ..DeviceState::default()
        };
    }

    fn initialize(
        &mut self,
        platform: &mut P,
        _channels: &'static ChannelBank,
    ) -> Result<(), BootError<P::Error>> {
        if self.queue_depth == 0 {
            return Err(BootError::UnsupportedQueueDepth {
                subsystem: <Self as Subsystem<P>>::NAME,
                depth: 0,
            });
        }

        self.cart_rom = platform.open_media(MediaKind::CartridgeRom);
        self.disk_drive = platform.open_media(MediaKind::DiskDrive);
        self.drive_rom = platform.open_media(MediaKind::DriveRom);

        platform
            .start_transfer_manager(self.queue_depth)
            .map_err(BootError::Storage)
    }
}
