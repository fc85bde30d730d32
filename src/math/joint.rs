//! Skeletal joint representations
//!
//! A joint is either a rotation quaternion plus translation ([`JointQuat`]) or a
//! 3x4 row-major affine matrix ([`JointMat`]). Both describe the same transform
//! `p' = R * p + t`.

use super::vector::{Vec3, Vec4};

/// Euler angles in degrees
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Angles {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl Angles {
    pub const fn new(pitch: f32, yaw: f32, roll: f32) -> Self {
        Self { pitch, yaw, roll }
    }

    /// Rotation quaternion for these angles
    pub fn to_quat(&self) -> Quat {
        let (sz, cz) = (self.yaw.to_radians() * 0.5).sin_cos();
        let (sy, cy) = (self.pitch.to_radians() * 0.5).sin_cos();
        let (sx, cx) = (self.roll.to_radians() * 0.5).sin_cos();

        let sxcy = sx * cy;
        let cxcy = cx * cy;
        let sxsy = sx * sy;
        let cxsy = cx * sy;

        Quat::new(
            cxsy * sz - sxcy * cz,
            -cxsy * cz - sxcy * sz,
            sxsy * cz - cxcy * sz,
            cxcy * cz + sxsy * sz,
        )
    }
}

/// Rotation quaternion `(x, y, z, w)`
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    #[inline]
    pub fn dot(&self, other: &Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    /// Spherical interpolation along the shorter arc
    pub fn slerp(&self, to: &Self, t: f32) -> Self {
        if t <= 0.0 {
            return *self;
        }
        if t >= 1.0 || self == to {
            return *to;
        }

        let mut cosom = self.dot(to);
        let target = if cosom < 0.0 {
            cosom = -cosom;
            Quat::new(-to.x, -to.y, -to.z, -to.w)
        } else {
            *to
        };

        let (scale0, scale1) = if 1.0 - cosom > 1e-6 {
            let sin_sq = 1.0 - cosom * cosom;
            let inv_sin = 1.0 / sin_sq.sqrt();
            let omega = (sin_sq * inv_sin).atan2(cosom);
            (
                ((1.0 - t) * omega).sin() * inv_sin,
                (t * omega).sin() * inv_sin,
            )
        } else {
            (1.0 - t, t)
        };

        Quat::new(
            scale0 * self.x + scale1 * target.x,
            scale0 * self.y + scale1 * target.y,
            scale0 * self.z + scale1 * target.z,
            scale0 * self.w + scale1 * target.w,
        )
    }

    /// Rotation matrix, rows first
    pub fn to_mat3(&self) -> [[f32; 3]; 3] {
        let (x2, y2, z2) = (self.x + self.x, self.y + self.y, self.z + self.z);
        let (xx, xy, xz) = (self.x * x2, self.x * y2, self.x * z2);
        let (yy, yz, zz) = (self.y * y2, self.y * z2, self.z * z2);
        let (wx, wy, wz) = (self.w * x2, self.w * y2, self.w * z2);

        [
            [1.0 - (yy + zz), xy - wz, xz + wy],
            [xy + wz, 1.0 - (xx + zz), yz - wx],
            [xz - wy, yz + wx, 1.0 - (xx + yy)],
        ]
    }

    /// Quaternion of a pure rotation matrix
    pub fn from_mat3(m: &[[f32; 3]; 3]) -> Self {
        let trace = m[0][0] + m[1][1] + m[2][2];
        if trace > 0.0 {
            let t = trace + 1.0;
            let s = 0.5 / t.sqrt();
            return Quat::new(
                (m[2][1] - m[1][2]) * s,
                (m[0][2] - m[2][0]) * s,
                (m[1][0] - m[0][1]) * s,
                s * t,
            );
        }

        if m[0][0] >= m[1][1] && m[0][0] >= m[2][2] {
            let t = m[0][0] - m[1][1] - m[2][2] + 1.0;
            let s = 0.5 / t.sqrt();
            Quat::new(
                s * t,
                (m[0][1] + m[1][0]) * s,
                (m[0][2] + m[2][0]) * s,
                (m[2][1] - m[1][2]) * s,
            )
        } else if m[1][1] >= m[2][2] {
            let t = -m[0][0] + m[1][1] - m[2][2] + 1.0;
            let s = 0.5 / t.sqrt();
            Quat::new(
                (m[0][1] + m[1][0]) * s,
                s * t,
                (m[1][2] + m[2][1]) * s,
                (m[0][2] - m[2][0]) * s,
            )
        } else {
            let t = -m[0][0] - m[1][1] + m[2][2] + 1.0;
            let s = 0.5 / t.sqrt();
            Quat::new(
                (m[0][2] + m[2][0]) * s,
                (m[1][2] + m[2][1]) * s,
                s * t,
                (m[1][0] - m[0][1]) * s,
            )
        }
    }

    /// Component-wise comparison within `epsilon`
    pub fn compare(&self, other: &Self, epsilon: f32) -> bool {
        (self.x - other.x).abs() <= epsilon
            && (self.y - other.y).abs() <= epsilon
            && (self.z - other.z).abs() <= epsilon
            && (self.w - other.w).abs() <= epsilon
    }
}

/// Joint as rotation plus translation
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct JointQuat {
    pub q: Quat,
    pub t: Vec3,
}

/// Joint as a 3x4 row-major affine matrix
///
/// Row `r` holds `[R[r][0], R[r][1], R[r][2], t[r]]`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(C)]
pub struct JointMat {
    pub mat: [f32; 12],
}

impl Default for JointMat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl JointMat {
    pub const IDENTITY: Self = Self {
        mat: [
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0,
        ],
    };

    pub fn from_rotation_translation(rotation: &[[f32; 3]; 3], t: Vec3) -> Self {
        let mut m = Self::IDENTITY;
        m.set_rotation(rotation);
        m.set_translation(t);
        m
    }

    pub fn set_rotation(&mut self, r: &[[f32; 3]; 3]) {
        for (row, src) in r.iter().enumerate() {
            self.mat[row * 4..row * 4 + 3].copy_from_slice(src);
        }
    }

    pub fn set_translation(&mut self, t: Vec3) {
        self.mat[3] = t.x;
        self.mat[7] = t.y;
        self.mat[11] = t.z;
    }

    pub fn rotation(&self) -> [[f32; 3]; 3] {
        let m = &self.mat;
        [[m[0], m[1], m[2]], [m[4], m[5], m[6]], [m[8], m[9], m[10]]]
    }

    #[inline]
    pub fn translation(&self) -> Vec3 {
        Vec3::new(self.mat[3], self.mat[7], self.mat[11])
    }

    /// `R * v.xyz + t * v.w`
    #[inline]
    pub fn transform_vec4(&self, v: &Vec4) -> Vec3 {
        let m = &self.mat;
        Vec3::new(
            m[0] * v.x + m[1] * v.y + m[2] * v.z + m[3] * v.w,
            m[4] * v.x + m[5] * v.y + m[6] * v.z + m[7] * v.w,
            m[8] * v.x + m[9] * v.y + m[10] * v.z + m[11] * v.w,
        )
    }

    /// `parent ∘ self`: apply `self`, then `parent`
    pub fn concat(&self, parent: &JointMat) -> JointMat {
        let (p, m) = (&parent.mat, &self.mat);
        let mut out = [0.0f32; 12];
        for r in 0..3 {
            for c in 0..4 {
                let mut v = p[r * 4] * m[c] + p[r * 4 + 1] * m[4 + c] + p[r * 4 + 2] * m[8 + c];
                if c == 3 {
                    v += p[r * 4 + 3];
                }
                out[r * 4 + c] = v;
            }
        }
        JointMat { mat: out }
    }

    /// `parent⁻¹ ∘ self` for an orthonormal `parent` rotation
    pub fn unconcat(&self, parent: &JointMat) -> JointMat {
        let (p, m) = (&parent.mat, &self.mat);
        let mut out = [0.0f32; 12];
        for r in 0..3 {
            for c in 0..4 {
                let (m0, m1, m2) = if c == 3 {
                    (m[3] - p[3], m[7] - p[7], m[11] - p[11])
                } else {
                    (m[c], m[4 + c], m[8 + c])
                };
                out[r * 4 + c] = p[r] * m0 + p[4 + r] * m1 + p[8 + r] * m2;
            }
        }
        JointMat { mat: out }
    }

    /// Element-wise comparison within `epsilon`
    pub fn compare(&self, other: &Self, epsilon: f32) -> bool {
        self.mat
            .iter()
            .zip(other.mat.iter())
            .all(|(a, b)| (a - b).abs() <= epsilon)
    }
}

/// One entry of a skinning weight list
///
/// Weights for a vertex are consecutive; the entry with `last` set closes the
/// vertex and the next entry starts the following one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JointWeight {
    pub joint: u32,
    pub last: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rotation_close(a: &[[f32; 3]; 3], b: &[[f32; 3]; 3], eps: f32) -> bool {
        a.iter()
            .flatten()
            .zip(b.iter().flatten())
            .all(|(x, y)| (x - y).abs() <= eps)
    }

    #[test]
    fn test_identity_quat_is_identity_matrix() {
        let m = Quat::IDENTITY.to_mat3();
        assert!(rotation_close(&m, &JointMat::IDENTITY.rotation(), 0.0));
    }

    #[test]
    fn test_angles_to_quat_is_unit() {
        let q = Angles::new(30.0, -75.0, 120.0).to_quat();
        assert!((q.dot(&q) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_quat_mat_round_trip_all_branches() {
        let samples = [
            Angles::new(10.0, 20.0, 30.0),
            Angles::new(179.0, 0.0, 0.0),
            Angles::new(0.0, 179.0, 0.0),
            Angles::new(0.0, 0.0, 179.0),
            Angles::new(-120.0, 45.0, 170.0),
        ];
        for angles in samples {
            let q = angles.to_quat();
            let back = Quat::from_mat3(&q.to_mat3());
            // q and -q are the same rotation
            let same = back.compare(&q, 1e-4)
                || back.compare(&Quat::new(-q.x, -q.y, -q.z, -q.w), 1e-4);
            assert!(same, "{angles:?}: {q:?} vs {back:?}");
        }
    }

    #[test]
    fn test_slerp_endpoints_and_midpoint() {
        let a = Angles::new(0.0, 0.0, 0.0).to_quat();
        let b = Angles::new(0.0, 90.0, 0.0).to_quat();
        assert_eq!(a.slerp(&b, 0.0), a);
        assert_eq!(a.slerp(&b, 1.0), b);
        let mid = a.slerp(&b, 0.5);
        let expected = Angles::new(0.0, 45.0, 0.0).to_quat();
        assert!(mid.compare(&expected, 1e-5), "{mid:?} vs {expected:?}");
    }

    #[test]
    fn test_concat_then_unconcat_restores_local() {
        let parent = JointMat::from_rotation_translation(
            &Angles::new(20.0, 40.0, 60.0).to_quat().to_mat3(),
            Vec3::new(1.0, -2.0, 0.5),
        );
        let local = JointMat::from_rotation_translation(
            &Angles::new(-35.0, 10.0, 5.0).to_quat().to_mat3(),
            Vec3::new(0.25, 0.75, -1.5),
        );
        let world = local.concat(&parent);
        let back = world.unconcat(&parent);
        assert!(back.compare(&local, 1e-5), "{back:?} vs {local:?}");
    }

    #[test]
    fn test_concat_applies_local_first() {
        let rotation = JointMat::IDENTITY.rotation();
        let parent = JointMat::from_rotation_translation(&rotation, Vec3::new(0.0, 0.0, 5.0));
        let local = JointMat::from_rotation_translation(&rotation, Vec3::new(1.0, 0.0, 0.0));
        let world = local.concat(&parent);
        assert_eq!(world.translation(), Vec3::new(1.0, 0.0, 5.0));
    }

    #[test]
    fn test_transform_vec4_uses_w_for_translation() {
        let rotation = JointMat::IDENTITY.rotation();
        let m = JointMat::from_rotation_translation(&rotation, Vec3::new(1.0, 2.0, 3.0));
        let p = m.transform_vec4(&Vec4::new(1.0, 1.0, 1.0, 0.5));
        assert_eq!(p, Vec3::new(1.5, 2.0, 2.5));
    }
}
