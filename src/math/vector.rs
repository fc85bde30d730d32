//! Small fixed-size vectors and planes

use std::ops::{Add, AddAssign, Index, IndexMut, Mul, Neg, Sub, SubAssign};

/// Two-component vector (texture coordinates)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Component-wise comparison within `epsilon`
    pub fn compare(&self, other: &Self, epsilon: f32) -> bool {
        (self.x - other.x).abs() <= epsilon && (self.y - other.y).abs() <= epsilon
    }
}

/// Three-component vector
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub fn dot(&self, other: &Self) -> f32 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    #[inline]
    pub fn cross(&self, other: &Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    #[inline]
    pub fn length_squared(&self) -> f32 {
        self.dot(self)
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.length_squared().sqrt()
    }

    /// Unit-length copy; the zero vector stays zero
    pub fn normalized(&self) -> Self {
        let len_sq = self.length_squared();
        if len_sq == 0.0 {
            return *self;
        }
        *self * (1.0 / len_sq.sqrt())
    }

    /// Linear interpolation, clamped to the endpoints outside `[0, 1]`
    pub fn lerp(&self, to: &Self, t: f32) -> Self {
        if t <= 0.0 {
            *self
        } else if t >= 1.0 {
            *to
        } else {
            *self + (*to - *self) * t
        }
    }

    /// Component-wise comparison within `epsilon`
    pub fn compare(&self, other: &Self, epsilon: f32) -> bool {
        (self.x - other.x).abs() <= epsilon
            && (self.y - other.y).abs() <= epsilon
            && (self.z - other.z).abs() <= epsilon
    }
}

impl Add for Vec3 {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vec3 {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl SubAssign for Vec3 {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul<f32> for Vec3 {
    type Output = Self;
    #[inline]
    fn mul(self, s: f32) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }
}

impl Neg for Vec3 {
    type Output = Self;
    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl Index<usize> for Vec3 {
    type Output = f32;
    fn index(&self, i: usize) -> &f32 {
        match i {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("Vec3 index out of range: {i}"),
        }
    }
}

impl IndexMut<usize> for Vec3 {
    fn index_mut(&mut self, i: usize) -> &mut f32 {
        match i {
            0 => &mut self.x,
            1 => &mut self.y,
            2 => &mut self.z,
            _ => panic!("Vec3 index out of range: {i}"),
        }
    }
}

/// Four-component vector (skinning weights, shadow cache entries)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct Vec4 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Vec4 {
    #[inline]
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    #[inline]
    pub const fn from_vec3(v: Vec3, w: f32) -> Self {
        Self::new(v.x, v.y, v.z, w)
    }

    #[inline]
    pub const fn xyz(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }

    /// Component-wise comparison within `epsilon`
    pub fn compare(&self, other: &Self, epsilon: f32) -> bool {
        (self.x - other.x).abs() <= epsilon
            && (self.y - other.y).abs() <= epsilon
            && (self.z - other.z).abs() <= epsilon
            && (self.w - other.w).abs() <= epsilon
    }
}

/// Plane `a*x + b*y + c*z + d = 0`
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct Plane {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
}

impl Plane {
    #[inline]
    pub const fn new(a: f32, b: f32, c: f32, d: f32) -> Self {
        Self { a, b, c, d }
    }

    #[inline]
    pub const fn from_normal(normal: Vec3, d: f32) -> Self {
        Self::new(normal.x, normal.y, normal.z, d)
    }

    #[inline]
    pub const fn normal(&self) -> Vec3 {
        Vec3::new(self.a, self.b, self.c)
    }

    /// Signed distance of `v` from the plane
    #[inline]
    pub fn distance(&self, v: &Vec3) -> f32 {
        self.a * v.x + self.b * v.y + self.c * v.z + self.d
    }

    /// Move the plane along its normal so it passes through `p`
    #[inline]
    pub fn fit_through_point(&mut self, p: &Vec3) {
        self.d = -self.normal().dot(p);
    }

    /// Compare normals within `normal_eps` and offsets within `dist_eps`
    pub fn compare(&self, other: &Self, normal_eps: f32, dist_eps: f32) -> bool {
        self.normal().compare(&other.normal(), normal_eps) && (self.d - other.d).abs() <= dist_eps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_follows_right_hand_rule() {
        let x = Vec3::new(1.0, 0.0, 0.0);
        let y = Vec3::new(0.0, 1.0, 0.0);
        assert_eq!(x.cross(&y), Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_normalized_zero_is_zero() {
        assert_eq!(Vec3::ZERO.normalized(), Vec3::ZERO);
        let n = Vec3::new(3.0, 0.0, 4.0).normalized();
        assert!((n.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_lerp_clamps_endpoints() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(10.0, -10.0, 2.0);
        assert_eq!(a.lerp(&b, -1.0), a);
        assert_eq!(a.lerp(&b, 2.0), b);
        assert!(a.lerp(&b, 0.5).compare(&Vec3::new(5.0, -5.0, 1.0), 1e-6));
    }

    #[test]
    fn test_plane_distance_and_fit() {
        let mut p = Plane::from_normal(Vec3::new(0.0, 0.0, 1.0), 0.0);
        p.fit_through_point(&Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(p.d, -3.0);
        assert_eq!(p.distance(&Vec3::new(7.0, 7.0, 5.0)), 2.0);
    }

    #[test]
    fn test_plane_compare_uses_separate_epsilons() {
        let p = Plane::new(0.0, 1.0, 0.0, 5.0);
        let q = Plane::new(0.05, 1.0, 0.0, 5.5);
        assert!(p.compare(&q, 0.1, 1.0));
        assert!(!p.compare(&q, 0.01, 1.0));
        assert!(!p.compare(&q, 0.1, 0.1));
    }

    #[test]
    fn test_vec3_index() {
        let mut v = Vec3::new(1.0, 2.0, 3.0);
        v[2] = 9.0;
        assert_eq!(v[0] + v[1] + v[2], 12.0);
    }
}
