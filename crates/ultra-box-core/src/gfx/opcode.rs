//! Display-list opcodes and their 64-bit command word encodings.

use ultra_box_hal::PhysAddr;

use super::Gfx;

// Command byte (bits 63:56 of each word).
pub const G_VTX: u8 = 0x01;
pub const G_TRI1: u8 = 0x05;
pub const G_TEXTURE: u8 = 0xD7;
pub const G_GEOMETRYMODE: u8 = 0xD9;
pub const G_MTX: u8 = 0xDA;
pub const G_MOVEWORD: u8 = 0xDB;
pub const G_MOVEMEM: u8 = 0xDC;
pub const G_DL: u8 = 0xDE;
pub const G_ENDDL: u8 = 0xDF;
pub const G_SETOTHERMODE_L: u8 = 0xE2;
pub const G_SETOTHERMODE_H: u8 = 0xE3;
pub const G_RDPPIPESYNC: u8 = 0xE7;
pub const G_RDPFULLSYNC: u8 = 0xE9;
pub const G_SETSCISSOR: u8 = 0xED;
pub const G_FILLRECT: u8 = 0xF6;
pub const G_SETFILLCOLOR: u8 = 0xF7;
pub const G_SETPRIMCOLOR: u8 = 0xFA;
pub const G_SETCOMBINE: u8 = 0xFC;
pub const G_SETZIMG: u8 = 0xFE;
pub const G_SETCIMG: u8 = 0xFF;

// Move-word indices.
const G_MW_SEGMENT: u8 = 0x06;
const G_MW_PERSPNORM: u8 = 0x0E;

// Move-mem indices.
const G_MV_VIEWPORT: u8 = 8;

/// Geometry mode bits.
pub mod geometry {
    pub const ZBUFFER: u32 = 0x0000_0001;
    pub const SHADE: u32 = 0x0000_0004;
    pub const CULL_FRONT: u32 = 0x0000_0200;
    pub const CULL_BACK: u32 = 0x0000_0400;
    pub const CULL_BOTH: u32 = 0x0000_0600;
    pub const FOG: u32 = 0x0001_0000;
    pub const LIGHTING: u32 = 0x0002_0000;
    pub const TEXTURE_GEN: u32 = 0x0004_0000;
    pub const TEXTURE_GEN_LINEAR: u32 = 0x0008_0000;
    pub const LOD: u32 = 0x0010_0000;
    pub const SHADING_SMOOTH: u32 = 0x0020_0000;
    pub const CLIPPING: u32 = 0x0080_0000;
}

/// Matrix load parameters.
pub mod matrix {
    pub const MODELVIEW: u8 = 0x00;
    pub const PROJECTION: u8 = 0x04;
    pub const MUL: u8 = 0x00;
    pub const LOAD: u8 = 0x02;
    pub const NOPUSH: u8 = 0x00;
    pub const PUSH: u8 = 0x01;
}

/// Other-mode fields as `(shift, len)` pairs with their values pre-shifted.
pub mod other_mode {
    pub const PIPELINE: (u8, u8) = (23, 1);
    pub const PM_NPRIMITIVE: u32 = 0;
    pub const PM_1PRIMITIVE: u32 = 1 << 23;

    pub const CYCLE_TYPE: (u8, u8) = (20, 2);
    pub const CYC_1CYCLE: u32 = 0;
    pub const CYC_2CYCLE: u32 = 1 << 20;
    pub const CYC_COPY: u32 = 2 << 20;
    pub const CYC_FILL: u32 = 3 << 20;

    pub const TEXTURE_PERSP: (u8, u8) = (19, 1);
    pub const TP_NONE: u32 = 0;
    pub const TP_PERSP: u32 = 1 << 19;

    pub const TEXTURE_DETAIL: (u8, u8) = (17, 2);
    pub const TD_CLAMP: u32 = 0;
    pub const TD_SHARPEN: u32 = 1 << 17;
    pub const TD_DETAIL: u32 = 2 << 17;

    pub const TEXTURE_LOD: (u8, u8) = (16, 1);
    pub const TL_TILE: u32 = 0;
    pub const TL_LOD: u32 = 1 << 16;

    pub const TEXTURE_LUT: (u8, u8) = (14, 2);
    pub const TT_NONE: u32 = 0;
    pub const TT_RGBA16: u32 = 2 << 14;
    pub const TT_IA16: u32 = 3 << 14;

    pub const TEXTURE_FILTER: (u8, u8) = (12, 2);
    pub const TF_POINT: u32 = 0;
    pub const TF_BILERP: u32 = 2 << 12;
    pub const TF_AVERAGE: u32 = 3 << 12;

    pub const TEXTURE_CONVERT: (u8, u8) = (9, 3);
    pub const TC_CONV: u32 = 0;
    pub const TC_FILTCONV: u32 = 5 << 9;
    pub const TC_FILT: u32 = 6 << 9;

    pub const COMBINE_KEY: (u8, u8) = (8, 1);
    pub const CK_NONE: u32 = 0;
    pub const CK_KEY: u32 = 1 << 8;

    pub const COLOR_DITHER: (u8, u8) = (6, 2);
    pub const CD_MAGICSQ: u32 = 0;
    pub const CD_BAYER: u32 = 1 << 6;
    pub const CD_NOISE: u32 = 2 << 6;
    pub const CD_DISABLE: u32 = 3 << 6;

    // Low word.
    pub const ALPHA_COMPARE: (u8, u8) = (0, 2);
    pub const AC_NONE: u32 = 0;
    pub const AC_THRESHOLD: u32 = 1;
    pub const AC_DITHER: u32 = 3;

    pub const RENDER_MODE: (u8, u8) = (3, 29);
}

/// Blender render modes for the two pipeline cycles.
pub mod render_mode {
    /// Z-buffered translucent surface, first cycle.
    pub const ZB_XLU_SURF: u32 = 0x0040_4A50;
    /// Z-buffered translucent surface, second cycle.
    pub const ZB_XLU_SURF2: u32 = 0x0010_4A50;
    /// Z-buffered opaque surface, first cycle.
    pub const ZB_OPA_SURF: u32 = 0x0C08_4230;
    /// Z-buffered opaque surface, second cycle.
    pub const ZB_OPA_SURF2: u32 = 0x0302_4230;
}

/// Image formats and pixel sizes for color/depth image commands.
pub mod image {
    pub const FMT_RGBA: u8 = 0;
    pub const FMT_YUV: u8 = 1;
    pub const FMT_CI: u8 = 2;
    pub const FMT_IA: u8 = 3;
    pub const FMT_I: u8 = 4;

    pub const SIZ_4B: u8 = 0;
    pub const SIZ_8B: u8 = 1;
    pub const SIZ_16B: u8 = 2;
    pub const SIZ_32B: u8 = 3;
}

/// Maximum framebuffer depth value.
pub const MAX_FB_Z: u16 = 0x3FFF;

/// Pack a 5-5-5-1 color.
pub const fn pack_rgba5551(r: u8, g: u8, b: u8, a: u8) -> u16 {
    (((r as u16) << 8) & 0xF800)
        | (((g as u16) << 3) & 0x07C0)
        | (((b as u16) >> 2) & 0x003E)
        | (a as u16 & 0x1)
}

/// Pack a depth value and its slope.
pub const fn pack_zdz(z: u16, dz: u16) -> u16 {
    (z << 2) | dz
}

/// Fill color for a 16-bit image: the pixel is replicated in both halves.
pub const fn fill_color16(pixel: u16) -> u32 {
    ((pixel as u32) << 16) | pixel as u32
}

/// One cycle of the color combiner: `(a - b) * c + d` for RGB and alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombineCycle {
    pub rgb_a: u8,
    pub rgb_b: u8,
    pub rgb_c: u8,
    pub rgb_d: u8,
    pub alpha_a: u8,
    pub alpha_b: u8,
    pub alpha_c: u8,
    pub alpha_d: u8,
}

impl CombineCycle {
    const CCMUX_ZERO: u8 = 31;
    const CCMUX_SHADE: u8 = 4;
    const ACMUX_ZERO: u8 = 7;
    const ACMUX_SHADE: u8 = 4;

    /// Pass the interpolated shade color through.
    pub const SHADE: CombineCycle = CombineCycle {
        rgb_a: Self::CCMUX_ZERO,
        rgb_b: Self::CCMUX_ZERO,
        rgb_c: Self::CCMUX_ZERO,
        rgb_d: Self::CCMUX_SHADE,
        alpha_a: Self::ACMUX_ZERO,
        alpha_b: Self::ACMUX_ZERO,
        alpha_c: Self::ACMUX_ZERO,
        alpha_d: Self::ACMUX_SHADE,
    };
}

/// A single display-list command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// Set a segment base address.
    Segment { segment: u8, base: PhysAddr },
    /// Call a nested display list and return.
    DisplayList(PhysAddr),
    /// Jump to a display list without returning.
    BranchList(PhysAddr),
    /// Terminate the current display list.
    EndDisplayList,
    /// Load `count` vertices into the vertex cache at `start`.
    Vertex { addr: PhysAddr, count: u8, start: u8 },
    /// Draw one triangle from cached vertices.
    Triangle { v0: u8, v1: u8, v2: u8, flag: u8 },
    /// Load a matrix; `params` combines the `matrix` module bits.
    Matrix { addr: PhysAddr, params: u8 },
    /// Perspective normalization scale for the projection.
    PerspNormalize(u16),
    /// Clear then set geometry mode bits.
    GeometryMode { clear: u32, set: u32 },
    Texture { s: u16, t: u16, level: u8, tile: u8, on: bool },
    Viewport(PhysAddr),
    /// Set an other-mode high field.
    SetOtherModeH { field: (u8, u8), value: u32 },
    /// Set an other-mode low field.
    SetOtherModeL { field: (u8, u8), value: u32 },
    SetCombine { cycle0: CombineCycle, cycle1: CombineCycle },
    SetColorImage { format: u8, size: u8, width: u16, addr: PhysAddr },
    SetDepthImage(PhysAddr),
    SetFillColor(u32),
    /// Fill a rectangle with inclusive integer pixel bounds.
    FillRectangle { ulx: u16, uly: u16, lrx: u16, lry: u16 },
    SetScissor { mode: u8, ulx: u16, uly: u16, lrx: u16, lry: u16 },
    SetPrimColor { min_level: u8, lod_fraction: u8, color: [u8; 4] },
    PipeSync,
    FullSync,
}

const fn shl(value: u32, shift: u32, width: u32) -> u32 {
    (value & ((1 << width) - 1)) << shift
}

const fn cmd(op: u8) -> u32 {
    (op as u32) << 24
}

impl Opcode {
    pub fn set_geometry_mode(bits: u32) -> Self {
        Opcode::GeometryMode { clear: 0, set: bits }
    }

    pub fn clear_geometry_mode(bits: u32) -> Self {
        Opcode::GeometryMode { clear: bits, set: 0 }
    }

    pub fn cycle_type(value: u32) -> Self {
        Opcode::SetOtherModeH {
            field: other_mode::CYCLE_TYPE,
            value,
        }
    }

    pub fn render_mode(cycle0: u32, cycle1: u32) -> Self {
        Opcode::SetOtherModeL {
            field: other_mode::RENDER_MODE,
            value: cycle0 | cycle1,
        }
    }

    pub fn combine_mode(cycle0: CombineCycle, cycle1: CombineCycle) -> Self {
        Opcode::SetCombine { cycle0, cycle1 }
    }

    /// Encode into a 64-bit command word.
    pub fn encode(&self) -> Gfx {
        match *self {
            Opcode::Segment { segment, base } => Gfx::new(
                cmd(G_MOVEWORD) | shl(G_MW_SEGMENT as u32, 16, 8) | shl(segment as u32 * 4, 0, 16),
                base,
            ),
            Opcode::DisplayList(addr) => Gfx::new(cmd(G_DL), addr),
            Opcode::BranchList(addr) => Gfx::new(cmd(G_DL) | shl(1, 16, 8), addr),
            Opcode::EndDisplayList => Gfx::new(cmd(G_ENDDL), 0),
            Opcode::Vertex { addr, count, start } => Gfx::new(
                cmd(G_VTX) | shl(count as u32, 12, 8) | shl(start as u32 + count as u32, 1, 7),
                addr,
            ),
            Opcode::Triangle { v0, v1, v2, flag } => {
                let (a, b, c) = match flag {
                    1 => (v1, v2, v0),
                    2 => (v2, v0, v1),
                    _ => (v0, v1, v2),
                };
                Gfx::new(
                    cmd(G_TRI1)
                        | shl(a as u32 * 2, 16, 8)
                        | shl(b as u32 * 2, 8, 8)
                        | shl(c as u32 * 2, 0, 8),
                    0,
                )
            }
            Opcode::Matrix { addr, params } => Gfx::new(
                cmd(G_MTX) | shl((64 - 1) / 8, 19, 5) | shl((params ^ matrix::PUSH) as u32, 0, 8),
                addr,
            ),
            Opcode::PerspNormalize(scale) => Gfx::new(
                cmd(G_MOVEWORD) | shl(G_MW_PERSPNORM as u32, 16, 8),
                scale as u32,
            ),
            Opcode::GeometryMode { clear, set } => {
                Gfx::new(cmd(G_GEOMETRYMODE) | shl(!clear, 0, 24), set)
            }
            Opcode::Texture {
                s,
                t,
                level,
                tile,
                on,
            } => Gfx::new(
                cmd(G_TEXTURE) | shl(level as u32, 11, 3) | shl(tile as u32, 8, 3) | shl(on as u32, 1, 7),
                shl(s as u32, 16, 16) | shl(t as u32, 0, 16),
            ),
            Opcode::Viewport(addr) => Gfx::new(
                cmd(G_MOVEMEM) | shl((16 - 1) / 8, 19, 5) | shl(G_MV_VIEWPORT as u32, 0, 8),
                addr,
            ),
            Opcode::SetOtherModeH { field, value } => other_mode_word(G_SETOTHERMODE_H, field, value),
            Opcode::SetOtherModeL { field, value } => other_mode_word(G_SETOTHERMODE_L, field, value),
            Opcode::SetCombine { cycle0, cycle1 } => encode_combine(&cycle0, &cycle1),
            Opcode::SetColorImage {
                format,
                size,
                width,
                addr,
            } => Gfx::new(
                cmd(G_SETCIMG)
                    | shl(format as u32, 21, 3)
                    | shl(size as u32, 19, 2)
                    | shl(width.saturating_sub(1) as u32, 0, 12),
                addr,
            ),
            Opcode::SetDepthImage(addr) => Gfx::new(cmd(G_SETZIMG), addr),
            Opcode::SetFillColor(color) => Gfx::new(cmd(G_SETFILLCOLOR), color),
            Opcode::FillRectangle { ulx, uly, lrx, lry } => Gfx::new(
                cmd(G_FILLRECT) | shl(lrx as u32, 14, 10) | shl(lry as u32, 2, 10),
                shl(ulx as u32, 14, 10) | shl(uly as u32, 2, 10),
            ),
            Opcode::SetScissor {
                mode,
                ulx,
                uly,
                lrx,
                lry,
            } => Gfx::new(
                cmd(G_SETSCISSOR) | shl(ulx as u32 * 4, 12, 12) | shl(uly as u32 * 4, 0, 12),
                shl(mode as u32, 24, 2) | shl(lrx as u32 * 4, 12, 12) | shl(lry as u32 * 4, 0, 12),
            ),
            Opcode::SetPrimColor {
                min_level,
                lod_fraction,
                color: [r, g, b, a],
            } => Gfx::new(
                cmd(G_SETPRIMCOLOR) | shl(min_level as u32, 8, 8) | shl(lod_fraction as u32, 0, 8),
                u32::from_be_bytes([r, g, b, a]),
            ),
            Opcode::PipeSync => Gfx::new(cmd(G_RDPPIPESYNC), 0),
            Opcode::FullSync => Gfx::new(cmd(G_RDPFULLSYNC), 0),
        }
    }
}

fn other_mode_word(op: u8, (shift, len): (u8, u8), value: u32) -> Gfx {
    let shift = shift as u32;
    let len = len as u32;
    Gfx::new(cmd(op) | shl(32 - shift - len, 8, 8) | shl(len - 1, 0, 8), value)
}

fn encode_combine(c0: &CombineCycle, c1: &CombineCycle) -> Gfx {
    let w0 = shl(c0.rgb_a as u32, 20, 4)
        | shl(c0.rgb_c as u32, 15, 5)
        | shl(c0.alpha_a as u32, 12, 3)
        | shl(c0.alpha_c as u32, 9, 3)
        | shl(c1.rgb_a as u32, 5, 4)
        | shl(c1.rgb_c as u32, 0, 5);
    let w1 = shl(c0.rgb_b as u32, 28, 4)
        | shl(c0.rgb_d as u32, 15, 3)
        | shl(c0.alpha_b as u32, 12, 3)
        | shl(c0.alpha_d as u32, 9, 3)
        | shl(c1.rgb_b as u32, 24, 4)
        | shl(c1.alpha_a as u32, 21, 3)
        | shl(c1.alpha_c as u32, 18, 3)
        | shl(c1.rgb_d as u32, 6, 3)
        | shl(c1.alpha_b as u32, 3, 3)
        | shl(c1.alpha_d as u32, 0, 3);
    Gfx::new(cmd(G_SETCOMBINE) | shl(w0, 0, 24), w1)
}
