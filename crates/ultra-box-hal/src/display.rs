//! Display controller configuration.

/// Broadcast standard the display controller is timed for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VideoStandard {
    #[default]
    Ntsc,
    Pal,
    Mpal,
}

/// Non-interlaced point-sampled output resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Resolution {
    /// 320x240.
    #[default]
    Low,
    /// 640x480.
    High,
}

/// Display mode, identified by its index into the controller's mode table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayMode {
    pub standard: VideoStandard,
    pub resolution: Resolution,
}

/// Number of modes each standard contributes to the mode table.
const MODES_PER_STANDARD: u8 = 14;

impl DisplayMode {
    pub const fn new(standard: VideoStandard, resolution: Resolution) -> Self {
        Self {
            standard,
            resolution,
        }
    }

    /// Index into the mode table (LPN1 / HPN1 entries of each standard).
    pub const fn index(&self) -> u8 {
        let base = match self.standard {
            VideoStandard::Ntsc => 0,
            VideoStandard::Pal => MODES_PER_STANDARD,
            VideoStandard::Mpal => 2 * MODES_PER_STANDARD,
        };
        let offset = match self.resolution {
            Resolution::Low => 0,
            Resolution::High => 8,
        };
        base + offset
    }

    pub const fn width(&self) -> u16 {
        match self.resolution {
            Resolution::Low => 320,
            Resolution::High => 640,
        }
    }

    pub const fn height(&self) -> u16 {
        match self.resolution {
            Resolution::Low => 240,
            Resolution::High => 480,
        }
    }

    pub const fn refresh_hz(&self) -> u32 {
        match self.standard {
            VideoStandard::Pal => 50,
            VideoStandard::Ntsc | VideoStandard::Mpal => 60,
        }
    }

    /// Seconds between two refresh signals.
    pub fn refresh_period(&self) -> f32 {
        1.0 / self.refresh_hz() as f32
    }
}

/// Optional output filters of the display controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DisplayFeatures {
    pub gamma: bool,
    pub gamma_dither: bool,
    pub divot: bool,
    pub dither_filter: bool,
}
