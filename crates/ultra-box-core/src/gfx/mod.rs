//! Coprocessor data formats: display-list words, matrices, vertices, and the
//! bounds-checked command buffer builder.

pub mod command_buffer;
pub mod matrix;
pub mod opcode;
pub mod vertex;

pub use command_buffer::{CommandBuffer, CommandBufferError, CommandSink};
pub use matrix::{persp_norm, perspective, Mtx, Transform};
pub use opcode::{CombineCycle, Opcode};
pub use vertex::{Vp, Vtx};

/// One 64-bit display-list command word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C, align(8))]
pub struct Gfx {
    pub w0: u32,
    pub w1: u32,
}

impl Gfx {
    pub const SIZE: usize = core::mem::size_of::<Gfx>();

    pub const fn new(w0: u32, w1: u32) -> Self {
        Self { w0, w1 }
    }

    /// The command byte of this word.
    pub const fn command(&self) -> u8 {
        (self.w0 >> 24) as u8
    }
}
