//! Render vertex layout

use super::vector::{Vec2, Vec3};

/// Engine render vertex
///
/// Kernels address individual fields of this struct while walking arrays of it,
/// so the layout is fixed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct DrawVert {
    pub xyz: Vec3,
    pub st: Vec2,
    pub normal: Vec3,
    pub tangents: [Vec3; 2],
    pub color: [u8; 4],
}

impl DrawVert {
    /// Vertex at `xyz` with every other field zeroed
    pub const fn at(xyz: Vec3) -> Self {
        Self {
            xyz,
            st: Vec2::new(0.0, 0.0),
            normal: Vec3::ZERO,
            tangents: [Vec3::ZERO, Vec3::ZERO],
            color: [0; 4],
        }
    }
}

/// Precomputed dominant triangle of a vertex, for unsmoothed tangents
///
/// The vertex itself is the first corner; `v2` and `v3` index the other two.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DominantTri {
    pub v2: u32,
    pub v3: u32,
    pub normalization_scale: [f32; 3],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_draw_vert_layout_is_packed_floats() {
        // 3 + 2 + 3 + 6 floats plus 4 color bytes
        assert_eq!(std::mem::size_of::<DrawVert>(), 14 * 4 + 4);
        assert_eq!(std::mem::align_of::<DrawVert>(), 4);
    }

    #[test]
    fn test_at_zeroes_other_fields() {
        let v = DrawVert::at(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(v.xyz, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(v.normal, Vec3::ZERO);
        assert_eq!(v.color, [0; 4]);
    }
}
