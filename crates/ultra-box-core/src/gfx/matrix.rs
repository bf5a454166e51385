//! s15.16 fixed-point matrices as consumed by the geometry microcode.

use fixed::types::I16F16;
use glam::Mat4;

/// A 4x4 matrix in the coprocessor's split fixed-point layout.
///
/// The first eight words hold the integer halves of all sixteen elements,
/// packed two per word; the last eight hold the fractional halves in the same
/// order. Elements are stored in row-vector order, which is the memory order
/// of a column-major `glam::Mat4`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C, align(8))]
pub struct Mtx {
    pub m: [u32; 16],
}

fn to_fix32(value: f32) -> u32 {
    I16F16::saturating_from_num(value).to_bits() as u32
}

fn from_fix32(bits: u32) -> f32 {
    I16F16::from_bits(bits as i32).to_num::<f32>()
}

impl Mtx {
    pub const IDENTITY: Mtx = Mtx {
        m: [
            0x0001_0000, 0x0000_0000, 0x0000_0001, 0x0000_0000, 0x0000_0000, 0x0001_0000, 0x0000_0000,
            0x0000_0001, 0, 0, 0, 0, 0, 0, 0, 0,
        ],
    };

    /// Convert a float matrix, saturating elements outside s15.16 range.
    pub fn from_mat4(mat: &Mat4) -> Self {
        let mf = mat.to_cols_array_2d();
        let mut m = [0u32; 16];
        for (i, row) in mf.iter().enumerate() {
            for j in 0..2 {
                let e1 = to_fix32(row[j * 2]);
                let e2 = to_fix32(row[j * 2 + 1]);
                m[i * 2 + j] = (e1 & 0xFFFF_0000) | (e2 >> 16);
                m[8 + i * 2 + j] = (e1 << 16) | (e2 & 0xFFFF);
            }
        }
        Self { m }
    }

    pub fn to_mat4(&self) -> Mat4 {
        let mut mf = [[0f32; 4]; 4];
        for (i, row) in mf.iter_mut().enumerate() {
            for j in 0..2 {
                let int = self.m[i * 2 + j];
                let frac = self.m[8 + i * 2 + j];
                row[j * 2] = from_fix32((int & 0xFFFF_0000) | (frac >> 16));
                row[j * 2 + 1] = from_fix32((int << 16) | (frac & 0xFFFF));
            }
        }
        Mat4::from_cols_array_2d(&mf)
    }
}

/// Per-frame transform block referenced by the draw list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[repr(C, align(8))]
pub struct Transform {
    pub model_view: Mtx,
    pub projection: Mtx,
}

impl Transform {
    pub const MODEL_VIEW_OFFSET: usize = core::mem::offset_of!(Transform, model_view);
    pub const PROJECTION_OFFSET: usize = core::mem::offset_of!(Transform, projection);
}

/// Normalization factor the geometry microcode divides W by.
pub fn persp_norm(near: f32, far: f32) -> u16 {
    if near + far <= 2.0 {
        return u16::MAX;
    }
    let norm = (2.0 * 65536.0) / (near + far);
    if norm < 1.0 {
        1
    } else {
        norm as u16
    }
}

/// Right-handed perspective projection with a vertical field of view in
/// degrees, paired with its [`persp_norm`].
pub fn perspective(fovy_degrees: f32, aspect: f32, near: f32, far: f32) -> (Mat4, u16) {
    let proj = Mat4::perspective_rh_gl(fovy_degrees.to_radians(), aspect, near, far);
    (proj, persp_norm(near, far))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn identity_matches_converted_identity() {
        assert_eq!(Mtx::from_mat4(&Mat4::IDENTITY), Mtx::IDENTITY);
    }

    #[test]
    fn translation_lands_in_last_row() {
        let mtx = Mtx::from_mat4(&Mat4::from_translation(Vec3::new(2.0, -1.0, 0.5)));
        // Row 3 integer words: (tx, ty) then (tz, 1).
        assert_eq!(mtx.m[6], 0x0002_FFFF);
        assert_eq!(mtx.m[7], 0x0000_0001);
        // Row 3 fractional words.
        assert_eq!(mtx.m[14], 0x0000_0000);
        assert_eq!(mtx.m[15], 0x8000_0000);
    }

    #[test]
    fn out_of_range_elements_saturate() {
        let mtx = Mtx::from_mat4(&Mat4::from_scale(Vec3::splat(1.0e6)));
        assert!((mtx.to_mat4().x_axis.x - 32767.99998).abs() < 0.001);
    }

    #[test]
    fn persp_norm_follows_depth_range() {
        assert_eq!(persp_norm(0.5, 1.0), u16::MAX);
        assert_eq!(persp_norm(0.01, 10.0), 13094);
        assert_eq!(persp_norm(1.0, 1.0e6), 1);
    }

    #[test]
    fn perspective_projects_w_from_depth() {
        let (proj, norm) = perspective(80.0, 4.0 / 3.0, 0.01, 10.0);
        assert_eq!(norm, 13094);
        let cols = proj.to_cols_array_2d();
        assert_eq!(cols[2][3], -1.0);
        assert_eq!(cols[3][3], 0.0);
    }
}
