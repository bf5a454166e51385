//! Vertex and viewport formats loaded by the geometry microcode.

/// A 16-byte vertex with position, texture coordinates and color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C, align(8))]
pub struct Vtx {
    /// Object-space position.
    pub ob: [i16; 3],
    pub flag: u16,
    /// Texture coordinates in s10.5.
    pub tc: [i16; 2],
    /// RGBA color.
    pub cn: [u8; 4],
}

impl Vtx {
    pub const SIZE: usize = core::mem::size_of::<Vtx>();

    pub const fn new(ob: [i16; 3], tc: [i16; 2], cn: [u8; 4]) -> Self {
        Self { ob, flag: 0, tc, cn }
    }

    pub fn set_position(&mut self, x: i16, y: i16, z: i16) {
        self.ob = [x, y, z];
    }
}

/// Maximum depth in viewport units.
pub const MAX_Z: i16 = 0x3FF;

/// Viewport scale and translation, in s13.2 screen units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C, align(8))]
pub struct Vp {
    pub scale: [i16; 4],
    pub trans: [i16; 4],
}

impl Vp {
    pub const SIZE: usize = core::mem::size_of::<Vp>();

    /// Map clip space onto a `width` x `height` screen.
    pub const fn full_screen(width: u16, height: u16) -> Self {
        let half = [(width as i16) << 1, (height as i16) << 1, MAX_Z >> 1, 0];
        Self {
            scale: half,
            trans: half,
        }
    }
}
