#![no_std]

//! Platform abstraction traits for the ultra-box frame pipeline.
//!
//! The engine core is generic over these traits so the same boot sequence and
//! frame loop drive real hardware or the threaded host simulator. Data layouts
//! that cross the hardware boundary (job descriptors, physical regions,
//! display modes) live here too, so implementations never depend on the core.

mod display;
mod job;

pub use display::{DisplayFeatures, DisplayMode, Resolution, VideoStandard};
pub use job::{JobDescriptor, PhysAddr, PhysRegion, TaskFlags, TaskType};

/// Mask applied to a KSEG0 (cached, directly mapped) address to obtain the
/// physical address seen by the coprocessor and display controller.
pub const KSEG0_PHYSICAL_MASK: u32 = 0x1FFF_FFFF;

/// Translate a KSEG0 virtual address to a physical address.
pub const fn k0_to_physical(virt: usize) -> PhysAddr {
    (virt as u32) & KSEG0_PHYSICAL_MASK
}

/// Hardware units that raise completion interrupts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventSource {
    /// Memory transfer engine finished a DMA.
    MemoryTransfer,
    /// Signal processor finished executing a task.
    SignalProcessor,
    /// Rasterizer drained its pipeline (full sync reached).
    Rasterizer,
    /// Display controller reached vertical retrace.
    DisplayRefresh,
}

impl EventSource {
    /// Periodic sources fire whether or not anyone is waiting.
    pub const fn is_periodic(self) -> bool {
        matches!(self, EventSource::DisplayRefresh)
    }

    pub const fn name(self) -> &'static str {
        match self {
            EventSource::MemoryTransfer => "memory-transfer",
            EventSource::SignalProcessor => "signal-processor",
            EventSource::Rasterizer => "rasterizer",
            EventSource::DisplayRefresh => "display-refresh",
        }
    }
}

impl core::fmt::Display for EventSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Interrupt-side half of a completion channel.
///
/// Implementations must be callable from interrupt context (or from another
/// hardware thread in a simulator), hence `Sync`.
pub trait Signal: Sync {
    fn signal(&self);
}

/// Common error type and bring-up entry point shared by every platform trait.
pub trait Hardware {
    type Error: core::fmt::Debug;

    /// Initialize the machine. Called exactly once at cold start.
    fn bring_up(&mut self) -> Result<(), Self::Error>;

    /// Called repeatedly while the CPU is blocked on `waiting_on`.
    ///
    /// The default spins. Simulators yield the host thread here; firmware may
    /// execute a wait-for-interrupt.
    fn idle(&mut self, waiting_on: EventSource) {
        let _ = waiting_on;
        core::hint::spin_loop();
    }
}

/// Routes hardware completion interrupts to completion channels.
pub trait EventBinder: Hardware {
    /// Deliver every future event from `source` to `sink`.
    ///
    /// Binding the same source again replaces the previous sink.
    fn bind_event(&mut self, source: EventSource, sink: &'static dyn Signal)
        -> Result<(), Self::Error>;
}

/// The graphics coprocessor's task queue.
pub trait Coprocessor: Hardware {
    /// Load and start a task. The descriptor is copied by the hardware; the
    /// regions it references must stay untouched until the task completes.
    fn start_task(&mut self, job: &JobDescriptor) -> Result<(), Self::Error>;
}

/// CPU data cache maintenance for memory shared with non-coherent units.
pub trait DataCache {
    /// Write back `len` bytes starting at virtual address `virt`.
    fn writeback(&mut self, virt: usize, len: usize);

    /// Translate a CPU virtual address to the physical address space.
    fn to_physical(&self, virt: usize) -> PhysAddr {
        k0_to_physical(virt)
    }
}

/// The display (video interface) controller.
pub trait DisplayController: Hardware {
    /// Start the display manager that services retrace interrupts.
    fn start_display_manager(&mut self) -> Result<(), Self::Error>;

    fn set_mode(&mut self, mode: DisplayMode) -> Result<(), Self::Error>;

    fn set_features(&mut self, features: DisplayFeatures) -> Result<(), Self::Error>;

    /// Latch `framebuffer` as the scan-out source at the next retrace.
    ///
    /// Any `DisplayRefresh` event raised after this call returns must come
    /// from a retrace that has already latched `framebuffer`.
    fn swap_buffer(&mut self, framebuffer: PhysAddr) -> Result<(), Self::Error>;
}

/// Storage media attached to the parallel interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    CartridgeRom,
    DiskDrive,
    DriveRom,
}

/// Opaque handle to an opened storage medium.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediaHandle(pub u32);

/// Storage media access. Handle creation is treated as an opaque capability
/// acquisition by the engine.
pub trait StorageMedia: Hardware {
    /// Open a storage medium. Returns `None` when it is not present.
    fn open_media(&mut self, kind: MediaKind) -> Option<MediaHandle>;

    /// Start the transfer manager that serializes storage access requests.
    fn start_transfer_manager(&mut self, queue_depth: usize) -> Result<(), Self::Error>;
}

/// Everything the frame pipeline needs from a machine.
pub trait Platform: EventBinder + Coprocessor + DataCache + DisplayController + StorageMedia {}

impl<T> Platform for T where
    T: EventBinder + Coprocessor + DataCache + DisplayController + StorageMedia
{
}
