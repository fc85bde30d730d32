//! Seeded input generators shared by the test groups

use crate::math::{Angles, DrawVert, JointQuat, Plane, Vec2, Vec3};
use crate::random::SeededRandom;

/// `n` floats in `[-scale, scale)`
pub fn floats(rng: &mut SeededRandom, n: usize, scale: f32) -> Vec<f32> {
    (0..n).map(|_| rng.crandom_float() * scale).collect()
}

/// `n` floats in `[-scale, scale)` with magnitude at least `min`
pub fn divisors(rng: &mut SeededRandom, n: usize, scale: f32, min: f32) -> Vec<f32> {
    (0..n)
        .map(|_| loop {
            let v = rng.crandom_float() * scale;
            if v.abs() >= min {
                break v;
            }
        })
        .collect()
}

pub fn vec3(rng: &mut SeededRandom, scale: f32) -> Vec3 {
    Vec3::new(
        rng.crandom_float() * scale,
        rng.crandom_float() * scale,
        rng.crandom_float() * scale,
    )
}

pub fn vec3s(rng: &mut SeededRandom, n: usize, scale: f32) -> Vec<Vec3> {
    (0..n).map(|_| vec3(rng, scale)).collect()
}

pub fn vec2s(rng: &mut SeededRandom, n: usize, scale: f32) -> Vec<Vec2> {
    (0..n)
        .map(|_| Vec2::new(rng.crandom_float() * scale, rng.crandom_float() * scale))
        .collect()
}

pub fn plane(rng: &mut SeededRandom, scale: f32) -> Plane {
    Plane::new(
        rng.crandom_float() * scale,
        rng.crandom_float() * scale,
        rng.crandom_float() * scale,
        rng.crandom_float() * scale,
    )
}

pub fn planes(rng: &mut SeededRandom, n: usize, scale: f32) -> Vec<Plane> {
    (0..n).map(|_| plane(rng, scale)).collect()
}

/// Vertices with every field randomized
pub fn verts(rng: &mut SeededRandom, n: usize, scale: f32) -> Vec<DrawVert> {
    (0..n)
        .map(|_| DrawVert {
            xyz: vec3(rng, scale),
            st: Vec2::new(rng.random_float(), rng.random_float()),
            normal: vec3(rng, 1.0),
            tangents: [vec3(rng, 1.0), vec3(rng, 1.0)],
            color: [
                rng.random_int_max(256) as u8,
                rng.random_int_max(256) as u8,
                rng.random_int_max(256) as u8,
                rng.random_int_max(256) as u8,
            ],
        })
        .collect()
}

/// `n` indexes into a table of `len` entries
pub fn indexes(rng: &mut SeededRandom, n: usize, len: usize) -> Vec<u32> {
    let len = i32::try_from(len).unwrap_or(i32::MAX);
    (0..n).map(|_| rng.random_int_max(len) as u32).collect()
}

/// Joints with random orientation and translation
pub fn joint_quats(rng: &mut SeededRandom, n: usize) -> Vec<JointQuat> {
    (0..n)
        .map(|_| {
            let angles = Angles::new(
                rng.crandom_float() * 180.0,
                rng.crandom_float() * 180.0,
                rng.crandom_float() * 180.0,
            );
            JointQuat {
                q: angles.to_quat(),
                t: vec3(rng, 10.0),
            }
        })
        .collect()
}

/// RGBA8 image of `stride * height` random bytes
pub fn image(rng: &mut SeededRandom, stride: usize, height: usize) -> Vec<u8> {
    (0..stride * height).map(|_| rng.random_int_max(256) as u8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generators_are_reproducible() {
        let a = verts(&mut SeededRandom::new(7), 16, 10.0);
        let b = verts(&mut SeededRandom::new(7), 16, 10.0);
        assert_eq!(a, b);
    }

    #[test]
    fn test_divisors_respect_minimum() {
        let d = divisors(&mut SeededRandom::new(1), 512, 10.0, 0.01);
        assert!(d.iter().all(|v| v.abs() >= 0.01));
    }

    #[test]
    fn test_indexes_in_range() {
        let ix = indexes(&mut SeededRandom::new(3), 100, 17);
        assert!(ix.iter().all(|&i| i < 17));
    }
}
