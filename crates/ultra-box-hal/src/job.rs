//! Coprocessor task descriptor, laid out exactly as the signal processor's
//! boot microcode reads it.

/// 32-bit physical address.
pub type PhysAddr = u32;

/// A physical memory range referenced by a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhysRegion {
    pub addr: PhysAddr,
    /// Size in bytes.
    pub size: u32,
}

impl PhysRegion {
    pub const EMPTY: PhysRegion = PhysRegion { addr: 0, size: 0 };

    pub const fn new(addr: PhysAddr, size: u32) -> Self {
        Self { addr, size }
    }

    /// Region covering `[start, end)`.
    pub const fn from_bounds(start: PhysAddr, end: PhysAddr) -> Self {
        Self {
            addr: start,
            size: end.wrapping_sub(start),
        }
    }

    pub const fn end(&self) -> PhysAddr {
        self.addr.wrapping_add(self.size)
    }

    pub const fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// Task type field values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum TaskType {
    Graphics = 1,
    Audio = 2,
}

/// Task flag bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaskFlags(pub u32);

impl TaskFlags {
    pub const NONE: TaskFlags = TaskFlags(0);
    pub const YIELDED: TaskFlags = TaskFlags(0x0001);
    /// Wait for the rasterizer to drain before the task is considered done.
    pub const DP_WAIT: TaskFlags = TaskFlags(0x0002);
    pub const LOADABLE: TaskFlags = TaskFlags(0x0004);
    pub const SP_ONLY: TaskFlags = TaskFlags(0x0008);

    pub const fn contains(self, other: TaskFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn union(self, other: TaskFlags) -> TaskFlags {
        TaskFlags(self.0 | other.0)
    }
}

/// Bit-compatible coprocessor task descriptor (64 bytes).
///
/// Every pointer/size pair is a physical address and a byte count. The field
/// order must not change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C, align(8))]
pub struct JobDescriptor {
    pub task_type: u32,
    pub flags: u32,

    pub ucode_boot: PhysAddr,
    pub ucode_boot_size: u32,

    pub ucode: PhysAddr,
    pub ucode_size: u32,

    pub ucode_data: PhysAddr,
    pub ucode_data_size: u32,

    pub dram_stack: PhysAddr,
    pub dram_stack_size: u32,

    pub output_buff: PhysAddr,
    pub output_buff_size: u32,

    pub data_ptr: PhysAddr,
    pub data_size: u32,

    pub yield_data_ptr: PhysAddr,
    pub yield_data_size: u32,
}

impl JobDescriptor {
    pub const fn new(task_type: TaskType, flags: TaskFlags) -> Self {
        Self {
            task_type: task_type as u32,
            flags: flags.0,
            ucode_boot: 0,
            ucode_boot_size: 0,
            ucode: 0,
            ucode_size: 0,
            ucode_data: 0,
            ucode_data_size: 0,
            dram_stack: 0,
            dram_stack_size: 0,
            output_buff: 0,
            output_buff_size: 0,
            data_ptr: 0,
            data_size: 0,
            yield_data_ptr: 0,
            yield_data_size: 0,
        }
    }

    pub fn set_boot_ucode(&mut self, region: PhysRegion) {
        self.ucode_boot = region.addr;
        self.ucode_boot_size = region.size;
    }

    pub fn set_ucode(&mut self, region: PhysRegion) {
        self.ucode = region.addr;
        self.ucode_size = region.size;
    }

    pub fn set_ucode_data(&mut self, region: PhysRegion) {
        self.ucode_data = region.addr;
        self.ucode_data_size = region.size;
    }

    pub fn set_dram_stack(&mut self, region: PhysRegion) {
        self.dram_stack = region.addr;
        self.dram_stack_size = region.size;
    }

    pub fn set_output(&mut self, region: PhysRegion) {
        self.output_buff = region.addr;
        self.output_buff_size = region.size;
    }

    pub fn set_data(&mut self, region: PhysRegion) {
        self.data_ptr = region.addr;
        self.data_size = region.size;
    }

    pub fn set_yield_data(&mut self, region: PhysRegion) {
        self.yield_data_ptr = region.addr;
        self.yield_data_size = region.size;
    }

    /// The command data (display list) region.
    pub const fn data(&self) -> PhysRegion {
        PhysRegion::new(self.data_ptr, self.data_size)
    }

    pub const fn flags(&self) -> TaskFlags {
        TaskFlags(self.flags)
    }
}
