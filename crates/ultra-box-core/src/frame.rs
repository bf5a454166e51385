//! Double-buffered frame slots.
//!
//! Each slot moves `Idle -> Building -> InFlight`. The current slot becomes
//! `InFlight` when its draw job is submitted and stays there while the display
//! scans it out. It returns to `Idle` only when the *other* slot's
//! presentation rotates past it.

use core::fmt;

use ultra_box_hal::{JobDescriptor, PhysAddr};

use crate::gfx::{CommandBuffer, Transform};

/// Clear list capacity in words.
pub const DEFAULT_CLEAR_CAPACITY: usize = 16;
/// Draw list capacity in words.
pub const DEFAULT_DRAW_CAPACITY: usize = 2048;

/// Frame index: which of the two slots a frame builds into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SlotIndex(u8);

impl SlotIndex {
    pub const ZERO: SlotIndex = SlotIndex(0);
    pub const ONE: SlotIndex = SlotIndex(1);

    /// `None` unless `index` is 0 or 1.
    pub const fn new(index: usize) -> Option<Self> {
        match index {
            0 => Some(Self::ZERO),
            1 => Some(Self::ONE),
            _ => None,
        }
    }

    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    pub const fn other(self) -> Self {
        SlotIndex(self.0 ^ 1)
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SlotState {
    #[default]
    Idle,
    Building,
    /// The coprocessor or the display may read the slot.
    InFlight,
}

/// Write access was requested for a slot that hardware may still read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotInFlight(pub SlotIndex);

/// Everything one frame owns.
pub struct FrameSlot<O, const CLEAR: usize, const DRAW: usize> {
    pub(crate) state: SlotState,
    pub(crate) clear: CommandBuffer<CLEAR>,
    pub(crate) draw: CommandBuffer<DRAW>,
    pub(crate) transform: Transform,
    pub(crate) objects: O,
    pub(crate) clear_job: JobDescriptor,
    pub(crate) draw_job: JobDescriptor,
    pub(crate) framebuffer: PhysAddr,
}

impl<O: Default, const CLEAR: usize, const DRAW: usize> FrameSlot<O, CLEAR, DRAW> {
    fn new(framebuffer: PhysAddr) -> Self {
        Self {
            state: SlotState::Idle,
            clear: CommandBuffer::new(),
            draw: CommandBuffer::new(),
            transform: Transform::default(),
            objects: O::default(),
            clear_job: JobDescriptor::default(),
            draw_job: JobDescriptor::default(),
            framebuffer,
        }
    }
}

impl<O, const CLEAR: usize, const DRAW: usize> FrameSlot<O, CLEAR, DRAW> {
    pub fn state(&self) -> SlotState {
        self.state
    }

    pub fn framebuffer(&self) -> PhysAddr {
        self.framebuffer
    }

    pub fn clear_buffer(&self) -> &CommandBuffer<CLEAR> {
        &self.clear
    }

    pub fn draw_buffer(&self) -> &CommandBuffer<DRAW> {
        &self.draw
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn objects(&self) -> &O {
        &self.objects
    }

    pub fn objects_mut(&mut self) -> &mut O {
        &mut self.objects
    }

    pub fn clear_job(&self) -> &JobDescriptor {
        &self.clear_job
    }

    pub fn draw_job(&self) -> &JobDescriptor {
        &self.draw_job
    }
}

/// The two frame slots and the frame index selecting between them.
pub struct FrameSlots<
    O,
    const CLEAR: usize = DEFAULT_CLEAR_CAPACITY,
    const DRAW: usize = DEFAULT_DRAW_CAPACITY,
> {
    slots: [FrameSlot<O, CLEAR, DRAW>; 2],
    current: SlotIndex,
}

impl<O: Default, const CLEAR: usize, const DRAW: usize> FrameSlots<O, CLEAR, DRAW> {
    /// Two idle slots on `framebuffers`, with `current` building first.
    pub fn new(framebuffers: [PhysAddr; 2], current: SlotIndex) -> Self {
        Self {
            slots: [FrameSlot::new(framebuffers[0]), FrameSlot::new(framebuffers[1])],
            current,
        }
    }
}

impl<O, const CLEAR: usize, const DRAW: usize> FrameSlots<O, CLEAR, DRAW> {
    /// The slot the next frame builds into.
    pub fn current(&self) -> SlotIndex {
        self.current
    }

    pub fn slot(&self, index: SlotIndex) -> &FrameSlot<O, CLEAR, DRAW> {
        &self.slots[index.as_usize()]
    }

    /// Mutable access to a slot hardware is not reading.
    pub fn slot_mut(
        &mut self,
        index: SlotIndex,
    ) -> Result<&mut FrameSlot<O, CLEAR, DRAW>, SlotInFlight> {
        let slot = &mut self.slots[index.as_usize()];
        if slot.state == SlotState::InFlight {
            return Err(SlotInFlight(index));
        }
        Ok(slot)
    }

    /// Per-slot object state for both slots, indexed by slot.
    ///
    /// Only available while neither slot is in flight.
    pub fn objects_mut(&mut self) -> Result<[&mut O; 2], SlotInFlight> {
        let [first, second] = &mut self.slots;
        for (index, slot) in [(SlotIndex::ZERO, &*first), (SlotIndex::ONE, &*second)] {
            if slot.state == SlotState::InFlight {
                return Err(SlotInFlight(index));
            }
        }
        Ok([&mut first.objects, &mut second.objects])
    }

    /// Object state of both slots before the first frame. Neither slot has
    /// been submitted yet, so there is nothing to reject.
    pub(crate) fn initial_objects(&mut self) -> [&mut O; 2] {
        debug_assert!(
            self.slots.iter().all(|slot| slot.state == SlotState::Idle),
            "initial_objects after the first frame"
        );
        let [first, second] = &mut self.slots;
        [&mut first.objects, &mut second.objects]
    }

    /// Start building the current slot.
    pub(crate) fn begin(&mut self) -> Result<&mut FrameSlot<O, CLEAR, DRAW>, SlotInFlight> {
        let index = self.current;
        let slot = self.slot_mut(index)?;
        slot.state = SlotState::Building;
        Ok(slot)
    }

    /// Release the previous slot and advance the frame index.
    ///
    /// Called once the current slot is on screen: the display no longer reads
    /// the other one.
    pub(crate) fn rotate(&mut self) -> SlotIndex {
        let previous = self.current.other();
        self.slots[previous.as_usize()].state = SlotState::Idle;
        self.current = previous;
        previous
    }
}
