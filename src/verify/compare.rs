//! Tolerance predicates used to judge candidate output
//!
//! Every bound is absolute except [`approx`], which only the prefix
//! multiply-accumulate kernels use.

use crate::math::{DrawVert, JointMat, JointQuat, Plane, Vec2, Vec3, Vec4};

/// `|a - b| <= eps * max(1, |a|)`
#[inline]
pub fn approx(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps * a.abs().max(1.0)
}

/// `|a - b| <= eps`
#[inline]
pub fn within(a: f32, b: f32, eps: f32) -> bool {
    (a - b).abs() <= eps
}

pub fn all_approx(a: &[f32], b: &[f32], eps: f32) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(&x, &y)| approx(x, y, eps))
}

pub fn all_within(a: &[f32], b: &[f32], eps: f32) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(&x, &y)| within(x, y, eps))
}

/// Flat dot products agree to `eps` scaled by `Σ|x·y|`
///
/// Reordered summation error grows with the magnitude of the summed terms,
/// not with the (possibly cancelled) result.
pub fn dot_agrees(a: f32, b: f32, x: &[f32], y: &[f32], eps: f32) -> bool {
    let magnitude: f32 = x.iter().zip(y).map(|(p, q)| (p * q).abs()).sum();
    (a - b).abs() <= eps * magnitude.max(1.0)
}

pub fn vec2s_within(a: &[Vec2], b: &[Vec2], eps: f32) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.compare(y, eps))
}

pub fn vec3_within(a: &Vec3, b: &Vec3, eps: f32) -> bool {
    within(a.x, b.x, eps) && within(a.y, b.y, eps) && within(a.z, b.z, eps)
}

pub fn vec4s_within(a: &[Vec4], b: &[Vec4], eps: f32) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| {
            within(x.x, y.x, eps)
                && within(x.y, y.y, eps)
                && within(x.z, y.z, eps)
                && within(x.w, y.w, eps)
        })
}

pub fn planes_within(a: &[Plane], b: &[Plane], eps: f32) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.compare(y, eps, eps))
}

/// Skinned positions agree; all other vertex fields must be untouched and equal
pub fn verts_xyz_within(a: &[DrawVert], b: &[DrawVert], eps: f32) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| {
            vec3_within(&x.xyz, &y.xyz, eps)
                && x.st == y.st
                && x.normal == y.normal
                && x.tangents == y.tangents
                && x.color == y.color
        })
}

/// Tangent frames agree; position, texture coordinates and color are bit-equal
pub fn verts_tangents_within(a: &[DrawVert], b: &[DrawVert], eps: f32) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| {
            x.xyz == y.xyz
                && x.st == y.st
                && x.color == y.color
                && vec3_within(&x.normal, &y.normal, eps)
                && vec3_within(&x.tangents[0], &y.tangents[0], eps)
                && vec3_within(&x.tangents[1], &y.tangents[1], eps)
        })
}

pub fn joint_mats_within(a: &[JointMat], b: &[JointMat], eps: f32) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.compare(y, eps))
}

/// Rotations within `rot_eps`, translations within `trans_eps`
pub fn joint_quats_within(a: &[JointQuat], b: &[JointQuat], rot_eps: f32, trans_eps: f32) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| x.q.compare(&y.q, rot_eps) && x.t.compare(&y.t, trans_eps))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_is_absolute_at_every_magnitude() {
        assert!(!within(14.0, 14.000_13, 1e-5));
        assert!(!all_within(&[0.0, 14.0], &[0.0, 14.000_13], 1e-5));
        assert!(all_within(&[14.0], &[14.000_005], 1e-5));
        assert!(!vec3_within(&Vec3::new(0.0, 14.0, 0.0), &Vec3::new(0.0, 14.000_13, 0.0), 1e-5));
    }

    #[test]
    fn test_approx_is_relative_above_one() {
        assert!(approx(1000.0, 1000.005, 1e-5));
        assert!(!approx(1000.0, 1000.05, 1e-5));
        assert!(approx(0.5, 0.500_001, 1e-5));
        assert!(!approx(0.5, 0.5001, 1e-5));
    }

    #[test]
    fn test_length_mismatch_disagrees() {
        assert!(!all_approx(&[1.0], &[1.0, 2.0], 1.0));
        assert!(all_within(&[], &[], 0.0));
    }

    #[test]
    fn test_nan_never_agrees() {
        assert!(!approx(f32::NAN, f32::NAN, 1.0));
        assert!(!within(f32::NAN, f32::NAN, 1.0));
    }

    #[test]
    fn test_dot_tolerance_scales_with_terms() {
        let x = [1e4f32, -1e4, 1.0];
        let y = [1e4f32, 1e4, 1.0];
        // exact result 1, but the terms are 1e8 in magnitude
        assert!(dot_agrees(1.0, 9.0, &x, &y, 1e-4));
        assert!(!dot_agrees(1.0, 9.0, &[1.0], &[1.0], 1e-4));
    }

    #[test]
    fn test_verts_xyz_rejects_disturbed_fields() {
        let a = DrawVert::at(Vec3::new(1.0, 2.0, 3.0));
        let mut b = a;
        assert!(verts_xyz_within(&[a], &[b], 0.0));
        b.color[2] = 9;
        assert!(!verts_xyz_within(&[a], &[b], 1.0));
    }
}
