//! Reference (generic) backend
//!
//! Portable scalar implementations of the whole kernel catalogue. They define the
//! semantics every accelerated tier must reproduce, and they are the oracle the
//! verification harness compares against.
//!
//! # Conventions
//!
//! - The output slice determines the element count; inputs must be at least as
//!   long. Shorter inputs panic through slice indexing.
//! - Reductions and dot products accumulate left to right in `f32`, except the
//!   triangular solves and the LDLᵀ factorization, which accumulate in `f64`.

use super::SimdProcessor;
use crate::audio::{Channels, SampleRate};
use crate::math::{
    DominantTri, DrawVert, JointMat, JointQuat, JointWeight, MatX, Plane, Quat, Vec2, Vec3, Vec4,
    VecX,
};
use crate::Backend;

/// Reference backend processor
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericProcessor;

impl SimdProcessor for GenericProcessor {
    fn backend(&self) -> Backend {
        Backend::Generic
    }
}

// ---------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------

pub fn add_scalar(dst: &mut [f32], constant: f32, src: &[f32]) {
    let src = &src[..dst.len()];
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = constant + s;
    }
}

pub fn add(dst: &mut [f32], src0: &[f32], src1: &[f32]) {
    let n = dst.len();
    for ((d, &a), &b) in dst.iter_mut().zip(&src0[..n]).zip(&src1[..n]) {
        *d = a + b;
    }
}

pub fn sub_scalar(dst: &mut [f32], constant: f32, src: &[f32]) {
    let src = &src[..dst.len()];
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = constant - s;
    }
}

pub fn sub(dst: &mut [f32], src0: &[f32], src1: &[f32]) {
    let n = dst.len();
    for ((d, &a), &b) in dst.iter_mut().zip(&src0[..n]).zip(&src1[..n]) {
        *d = a - b;
    }
}

pub fn mul_scalar(dst: &mut [f32], constant: f32, src: &[f32]) {
    let src = &src[..dst.len()];
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = constant * s;
    }
}

pub fn mul(dst: &mut [f32], src0: &[f32], src1: &[f32]) {
    let n = dst.len();
    for ((d, &a), &b) in dst.iter_mut().zip(&src0[..n]).zip(&src1[..n]) {
        *d = a * b;
    }
}

pub fn div_scalar(dst: &mut [f32], constant: f32, src: &[f32]) {
    let src = &src[..dst.len()];
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = constant / s;
    }
}

pub fn div(dst: &mut [f32], src0: &[f32], src1: &[f32]) {
    let n = dst.len();
    for ((d, &a), &b) in dst.iter_mut().zip(&src0[..n]).zip(&src1[..n]) {
        *d = a / b;
    }
}

/// `dst[i] += constant * src[i]`
pub fn mul_add(dst: &mut [f32], constant: f32, src: &[f32]) {
    let src = &src[..dst.len()];
    for (d, &s) in dst.iter_mut().zip(src) {
        *d += constant * s;
    }
}

/// `dst[i] -= constant * src[i]`
pub fn mul_sub(dst: &mut [f32], constant: f32, src: &[f32]) {
    let src = &src[..dst.len()];
    for (d, &s) in dst.iter_mut().zip(src) {
        *d -= constant * s;
    }
}

// ---------------------------------------------------------------------------
// Dot products
// ---------------------------------------------------------------------------

pub fn dot_vec3_vec3s(dst: &mut [f32], constant: &Vec3, src: &[Vec3]) {
    let src = &src[..dst.len()];
    for (d, v) in dst.iter_mut().zip(src) {
        *d = constant.dot(v);
    }
}

pub fn dot_vec3_planes(dst: &mut [f32], constant: &Vec3, src: &[Plane]) {
    let src = &src[..dst.len()];
    for (d, p) in dst.iter_mut().zip(src) {
        *d = constant.x * p.a + constant.y * p.b + constant.z * p.c + p.d;
    }
}

pub fn dot_vec3_verts(dst: &mut [f32], constant: &Vec3, src: &[DrawVert]) {
    let src = &src[..dst.len()];
    for (d, v) in dst.iter_mut().zip(src) {
        *d = constant.dot(&v.xyz);
    }
}

pub fn dot_plane_vec3s(dst: &mut [f32], constant: &Plane, src: &[Vec3]) {
    let src = &src[..dst.len()];
    for (d, v) in dst.iter_mut().zip(src) {
        *d = constant.distance(v);
    }
}

pub fn dot_plane_planes(dst: &mut [f32], constant: &Plane, src: &[Plane]) {
    let src = &src[..dst.len()];
    for (d, p) in dst.iter_mut().zip(src) {
        *d = constant.a * p.a + constant.b * p.b + constant.c * p.c + constant.d * p.d;
    }
}

pub fn dot_plane_verts(dst: &mut [f32], constant: &Plane, src: &[DrawVert]) {
    let src = &src[..dst.len()];
    for (d, v) in dst.iter_mut().zip(src) {
        *d = constant.distance(&v.xyz);
    }
}

pub fn dot_vec3s(dst: &mut [f32], src0: &[Vec3], src1: &[Vec3]) {
    let n = dst.len();
    for ((d, a), b) in dst.iter_mut().zip(&src0[..n]).zip(&src1[..n]) {
        *d = a.dot(b);
    }
}

/// Sum of `src0[i] * src1[i]` over `src0`
pub fn dot(src0: &[f32], src1: &[f32]) -> f32 {
    let n = src0.len();
    src0.iter().zip(&src1[..n]).map(|(a, b)| a * b).sum()
}

// ---------------------------------------------------------------------------
// Comparisons
// ---------------------------------------------------------------------------

#[inline]
fn compare_into(dst: &mut [u8], src: &[f32], pred: impl Fn(f32) -> bool) {
    let src = &src[..dst.len()];
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = pred(s) as u8;
    }
}

#[inline]
fn compare_or_bit(dst: &mut [u8], bit: u8, src: &[f32], pred: impl Fn(f32) -> bool) {
    let src = &src[..dst.len()];
    for (d, &s) in dst.iter_mut().zip(src) {
        *d |= (pred(s) as u8) << bit;
    }
}

pub fn cmp_gt(dst: &mut [u8], src: &[f32], constant: f32) {
    compare_into(dst, src, |s| s > constant);
}

pub fn cmp_ge(dst: &mut [u8], src: &[f32], constant: f32) {
    compare_into(dst, src, |s| s >= constant);
}

pub fn cmp_lt(dst: &mut [u8], src: &[f32], constant: f32) {
    compare_into(dst, src, |s| s < constant);
}

pub fn cmp_le(dst: &mut [u8], src: &[f32], constant: f32) {
    compare_into(dst, src, |s| s <= constant);
}

pub fn cmp_gt_bit(dst: &mut [u8], bit: u8, src: &[f32], constant: f32) {
    compare_or_bit(dst, bit, src, |s| s > constant);
}

pub fn cmp_ge_bit(dst: &mut [u8], bit: u8, src: &[f32], constant: f32) {
    compare_or_bit(dst, bit, src, |s| s >= constant);
}

pub fn cmp_lt_bit(dst: &mut [u8], bit: u8, src: &[f32], constant: f32) {
    compare_or_bit(dst, bit, src, |s| s < constant);
}

pub fn cmp_le_bit(dst: &mut [u8], bit: u8, src: &[f32], constant: f32) {
    compare_or_bit(dst, bit, src, |s| s <= constant);
}

// ---------------------------------------------------------------------------
// Min / max
// ---------------------------------------------------------------------------

pub fn min_max(src: &[f32]) -> (f32, f32) {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &v in src {
        if v < min {
            min = v;
        }
        if v > max {
            max = v;
        }
    }
    (min, max)
}

pub fn min_max_vec2(src: &[Vec2]) -> (Vec2, Vec2) {
    let mut min = Vec2::new(f32::INFINITY, f32::INFINITY);
    let mut max = Vec2::new(f32::NEG_INFINITY, f32::NEG_INFINITY);
    for v in src {
        if v.x < min.x {
            min.x = v.x;
        }
        if v.x > max.x {
            max.x = v.x;
        }
        if v.y < min.y {
            min.y = v.y;
        }
        if v.y > max.y {
            max.y = v.y;
        }
    }
    (min, max)
}

fn bounds<'a>(points: impl Iterator<Item = &'a Vec3>) -> (Vec3, Vec3) {
    let mut min = Vec3::new(f32::INFINITY, f32::INFINITY, f32::INFINITY);
    let mut max = Vec3::new(f32::NEG_INFINITY, f32::NEG_INFINITY, f32::NEG_INFINITY);
    for p in points {
        for k in 0..3 {
            if p[k] < min[k] {
                min[k] = p[k];
            }
            if p[k] > max[k] {
                max[k] = p[k];
            }
        }
    }
    (min, max)
}

pub fn min_max_vec3(src: &[Vec3]) -> (Vec3, Vec3) {
    bounds(src.iter())
}

pub fn min_max_verts(src: &[DrawVert]) -> (Vec3, Vec3) {
    bounds(src.iter().map(|v| &v.xyz))
}

pub fn min_max_verts_indexed(src: &[DrawVert], indexes: &[u32]) -> (Vec3, Vec3) {
    bounds(indexes.iter().map(|&i| &src[i as usize].xyz))
}

// ---------------------------------------------------------------------------
// Clamp
// ---------------------------------------------------------------------------

pub fn clamp(dst: &mut [f32], src: &[f32], min: f32, max: f32) {
    let src = &src[..dst.len()];
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = if s < min {
            min
        } else if s > max {
            max
        } else {
            s
        };
    }
}

pub fn clamp_min(dst: &mut [f32], src: &[f32], min: f32) {
    let src = &src[..dst.len()];
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = if s < min { min } else { s };
    }
}

pub fn clamp_max(dst: &mut [f32], src: &[f32], max: f32) {
    let src = &src[..dst.len()];
    for (d, &s) in dst.iter_mut().zip(src) {
        *d = if s > max { max } else { s };
    }
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

pub fn memcpy(dst: &mut [u8], src: &[u8]) {
    let n = dst.len();
    dst.copy_from_slice(&src[..n]);
}

pub fn memset(dst: &mut [u8], value: u8) {
    dst.fill(value);
}

/// Flip the sign of every element in place
pub fn negate(dst: &mut [f32]) {
    for d in dst.iter_mut() {
        *d = -*d;
    }
}

// ---------------------------------------------------------------------------
// Dense linear algebra
// ---------------------------------------------------------------------------

#[inline]
fn row_dot(row: &[f32], v: &[f32]) -> f32 {
    row.iter().zip(v).map(|(a, b)| a * b).sum()
}

#[inline]
fn column_dot(mat: &MatX, col: usize, v: &[f32]) -> f32 {
    let mut sum = 0.0f32;
    for (j, &x) in v[..mat.rows()].iter().enumerate() {
        sum += mat[(j, col)] * x;
    }
    sum
}

/// `dst = mat * vec`; `dst` is resized to `mat.rows()`
pub fn matx_multiply_vecx(dst: &mut VecX, mat: &MatX, vec: &VecX) {
    dst.set_size(mat.rows());
    let v = &vec.as_slice()[..mat.cols()];
    for (i, d) in dst.as_mut_slice().iter_mut().enumerate() {
        *d = row_dot(mat.row(i), v);
    }
}

/// `dst += mat * vec`
pub fn matx_multiply_add_vecx(dst: &mut VecX, mat: &MatX, vec: &VecX) {
    let v = &vec.as_slice()[..mat.cols()];
    for (i, d) in dst.as_mut_slice()[..mat.rows()].iter_mut().enumerate() {
        *d += row_dot(mat.row(i), v);
    }
}

/// `dst -= mat * vec`
pub fn matx_multiply_sub_vecx(dst: &mut VecX, mat: &MatX, vec: &VecX) {
    let v = &vec.as_slice()[..mat.cols()];
    for (i, d) in dst.as_mut_slice()[..mat.rows()].iter_mut().enumerate() {
        *d -= row_dot(mat.row(i), v);
    }
}

/// `dst = matᵀ * vec`; `dst` is resized to `mat.cols()`
pub fn matx_transpose_multiply_vecx(dst: &mut VecX, mat: &MatX, vec: &VecX) {
    dst.set_size(mat.cols());
    for (i, d) in dst.as_mut_slice().iter_mut().enumerate() {
        *d = column_dot(mat, i, vec.as_slice());
    }
}

/// `dst += matᵀ * vec`
pub fn matx_transpose_multiply_add_vecx(dst: &mut VecX, mat: &MatX, vec: &VecX) {
    for (i, d) in dst.as_mut_slice()[..mat.cols()].iter_mut().enumerate() {
        *d += column_dot(mat, i, vec.as_slice());
    }
}

/// `dst -= matᵀ * vec`
pub fn matx_transpose_multiply_sub_vecx(dst: &mut VecX, mat: &MatX, vec: &VecX) {
    for (i, d) in dst.as_mut_slice()[..mat.cols()].iter_mut().enumerate() {
        *d -= column_dot(mat, i, vec.as_slice());
    }
}

/// `dst = m1 * m2`; `dst` is resized to `m1.rows() x m2.cols()`
pub fn matx_multiply_matx(dst: &mut MatX, m1: &MatX, m2: &MatX) {
    dst.set_size(m1.rows(), m2.cols());
    for i in 0..m1.rows() {
        let a = m1.row(i);
        for k in 0..m2.cols() {
            let mut sum = 0.0f32;
            for (j, &x) in a.iter().enumerate() {
                sum += x * m2[(j, k)];
            }
            dst[(i, k)] = sum;
        }
    }
}

/// `dst = m1ᵀ * m2`; `dst` is resized to `m1.cols() x m2.cols()`
pub fn matx_transpose_multiply_matx(dst: &mut MatX, m1: &MatX, m2: &MatX) {
    dst.set_size(m1.cols(), m2.cols());
    for i in 0..m1.cols() {
        for k in 0..m2.cols() {
            let mut sum = 0.0f32;
            for j in 0..m1.rows() {
                sum += m1[(j, i)] * m2[(j, k)];
            }
            dst[(i, k)] = sum;
        }
    }
}

/// Solve `L x = b` for a unit-diagonal lower-triangular `L`
///
/// Rows `skip..n` are solved; `x[..skip]` must already hold the solution.
pub fn matx_lower_triangular_solve(l: &MatX, x: &mut [f32], b: &[f32], n: usize, skip: usize) {
    for i in skip..n {
        let row = l.row(i);
        let mut sum = b[i] as f64;
        for j in 0..i {
            sum -= row[j] as f64 * x[j] as f64;
        }
        x[i] = sum as f32;
    }
}

/// Solve `Lᵀ x = b` for a unit-diagonal lower-triangular `L`
pub fn matx_lower_triangular_solve_transpose(l: &MatX, x: &mut [f32], b: &[f32], n: usize) {
    for i in (0..n).rev() {
        let mut sum = b[i] as f64;
        for j in i + 1..n {
            sum -= l[(j, i)] as f64 * x[j] as f64;
        }
        x[i] = sum as f32;
    }
}

/// In-place LDLᵀ factorization of the leading `n x n` block of `mat`
///
/// On return the strictly lower triangle holds `L` (unit diagonal implied), the
/// diagonal holds `D` and `inv_diag[i] = 1 / D[i]`. Returns `false` on a zero
/// pivot, leaving the factorization incomplete.
pub fn matx_ldlt_factor(mat: &mut MatX, inv_diag: &mut VecX, n: usize) -> bool {
    let mut v = vec![0.0f64; n];
    let mut diag = vec![0.0f64; n];

    for i in 0..n {
        for k in 0..i {
            v[k] = mat[(i, k)] as f64 * diag[k];
        }
        let mut sum = mat[(i, i)] as f64;
        for k in 0..i {
            sum -= v[k] * mat[(i, k)] as f64;
        }
        if sum == 0.0 {
            return false;
        }
        mat[(i, i)] = sum as f32;
        diag[i] = sum;
        let d = 1.0 / sum;
        inv_diag[i] = d as f32;

        for j in i + 1..n {
            let mut s = mat[(j, i)] as f64;
            for k in 0..i {
                s -= mat[(j, k)] as f64 * v[k];
            }
            mat[(j, i)] = (s * d) as f32;
        }
    }
    true
}

// ---------------------------------------------------------------------------
// Skeletal animation
// ---------------------------------------------------------------------------

/// Interpolate `joints[j]` toward `blend[j]` for every `j` in `index`
pub fn blend_joints(joints: &mut [JointQuat], blend: &[JointQuat], lerp: f32, index: &[u32]) {
    for &j in index {
        let j = j as usize;
        let to = &blend[j];
        let joint = &mut joints[j];
        joint.q = joint.q.slerp(&to.q, lerp);
        joint.t = joint.t.lerp(&to.t, lerp);
    }
}

pub fn convert_joint_quats_to_joint_mats(dst: &mut [JointMat], src: &[JointQuat]) {
    let src = &src[..dst.len()];
    for (m, jq) in dst.iter_mut().zip(src) {
        *m = JointMat::from_rotation_translation(&jq.q.to_mat3(), jq.t);
    }
}

pub fn convert_joint_mats_to_joint_quats(dst: &mut [JointQuat], src: &[JointMat]) {
    let src = &src[..dst.len()];
    for (jq, m) in dst.iter_mut().zip(src) {
        *jq = JointQuat {
            q: Quat::from_mat3(&m.rotation()),
            t: m.translation(),
        };
    }
}

/// Local-to-world for joints `first..=last`, parents before children
///
/// A negative parent index marks a root, which is left unchanged.
pub fn transform_joints(mats: &mut [JointMat], parents: &[i32], first: usize, last: usize) {
    for i in first..=last {
        if let Ok(p) = usize::try_from(parents[i]) {
            mats[i] = mats[i].concat(&mats[p]);
        }
    }
}

/// World-to-local for joints `first..=last`, children before parents
pub fn untransform_joints(mats: &mut [JointMat], parents: &[i32], first: usize, last: usize) {
    for i in (first..=last).rev() {
        if let Ok(p) = usize::try_from(parents[i]) {
            mats[i] = mats[i].unconcat(&mats[p]);
        }
    }
}

/// Skin `verts` from weighted joint-space offsets
///
/// Each vertex consumes weights until one with `last` set; `xyz` becomes the
/// sum of `joints[w.joint] * weight` over that run.
pub fn transform_verts(
    verts: &mut [DrawVert],
    joints: &[JointMat],
    weights: &[Vec4],
    index: &[JointWeight],
) {
    let mut j = 0;
    for v in verts.iter_mut() {
        let mut p = joints[index[j].joint as usize].transform_vec4(&weights[j]);
        while !index[j].last {
            j += 1;
            p += joints[index[j].joint as usize].transform_vec4(&weights[j]);
        }
        j += 1;
        v.xyz = p;
    }
}

// ---------------------------------------------------------------------------
// Culling
// ---------------------------------------------------------------------------

#[inline]
pub(crate) fn sign_bit(f: f32) -> u8 {
    (f.to_bits() >> 31) as u8
}

/// Classify points against up to four planes, expanded by `radius`
///
/// Bit `k` is set when the point is inside plane `k` by at least `-radius`,
/// bit `k + 4` when it lies behind the plane by more than `radius`. Returns the
/// OR of every output byte.
pub fn trace_point_cull(
    cull_bits: &mut [u8],
    radius: f32,
    planes: &[Plane],
    verts: &[DrawVert],
) -> u8 {
    assert!(planes.len() <= 4, "trace cull takes at most 4 planes");
    let cull_bits = &mut cull_bits[..verts.len()];
    let mut total = 0u8;
    for (out, v) in cull_bits.iter_mut().zip(verts) {
        let mut bits = 0u8;
        for (k, plane) in planes.iter().enumerate() {
            let d = plane.distance(&v.xyz);
            bits |= sign_bit(d + radius) << k;
            bits |= sign_bit(d - radius) << (k + 4);
        }
        bits ^= 0x0F;
        total |= bits;
        *out = bits;
    }
    total
}

/// Front-side bits against the six planes of a decal volume
pub fn decal_point_cull(cull_bits: &mut [u8], planes: &[Plane; 6], verts: &[DrawVert]) {
    let cull_bits = &mut cull_bits[..verts.len()];
    for (out, v) in cull_bits.iter_mut().zip(verts) {
        let mut bits = 0u8;
        for (k, plane) in planes.iter().enumerate() {
            bits |= sign_bit(plane.distance(&v.xyz)) << k;
        }
        *out = bits ^ 0x3F;
    }
}

/// Project points onto two texture planes and flag those outside `[0, 1]²`
pub fn overlay_point_cull(
    cull_bits: &mut [u8],
    tex_coords: &mut [Vec2],
    planes: &[Plane; 2],
    verts: &[DrawVert],
) {
    let n = verts.len();
    for ((out, st), v) in cull_bits[..n].iter_mut().zip(&mut tex_coords[..n]).zip(verts) {
        let d0 = planes[0].distance(&v.xyz);
        let d1 = planes[1].distance(&v.xyz);
        *st = Vec2::new(d0, d1);
        *out = sign_bit(d0)
            | (sign_bit(d1) << 1)
            | (sign_bit(1.0 - d0) << 2)
            | (sign_bit(1.0 - d1) << 3);
    }
}

// ---------------------------------------------------------------------------
// Surface derivation
// ---------------------------------------------------------------------------

#[inline]
fn tri_indices(tri: &[u32]) -> [usize; 3] {
    [tri[0] as usize, tri[1] as usize, tri[2] as usize]
}

/// Unit normal of `(a, b, c)` as `(c - a) x (b - a)`
#[inline]
fn tri_normal(a: &Vec3, b: &Vec3, c: &Vec3) -> Vec3 {
    let d0 = *b - *a;
    let d1 = *c - *a;
    d1.cross(&d0).normalized()
}

/// One plane per triangle of `indexes`
pub fn derive_tri_planes(planes: &mut [Plane], verts: &[DrawVert], indexes: &[u32]) {
    for (plane, tri) in planes.iter_mut().zip(indexes.chunks_exact(3)) {
        let [i0, i1, i2] = tri_indices(tri);
        let a = &verts[i0].xyz;
        let n = tri_normal(a, &verts[i1].xyz, &verts[i2].xyz);
        *plane = Plane::from_normal(n, 0.0);
        plane.fit_through_point(a);
    }
}

/// Smoothed tangent space, summed over the triangles sharing each vertex
///
/// The first triangle touching a vertex overwrites its normal and tangents,
/// later ones add to them. Results are not renormalized. One plane per
/// triangle is written to `planes`.
pub fn derive_tangents(planes: &mut [Plane], verts: &mut [DrawVert], indexes: &[u32]) {
    let mut used = vec![false; verts.len()];

    for (plane, tri) in planes.iter_mut().zip(indexes.chunks_exact(3)) {
        let [i0, i1, i2] = tri_indices(tri);
        let (a, b, c) = (verts[i0], verts[i1], verts[i2]);

        let d0 = b.xyz - a.xyz;
        let d1 = c.xyz - a.xyz;
        let (ds0, dt0) = (b.st.x - a.st.x, b.st.y - a.st.y);
        let (ds1, dt1) = (c.st.x - a.st.x, c.st.y - a.st.y);

        let n = d1.cross(&d0).normalized();
        *plane = Plane::from_normal(n, 0.0);
        plane.fit_through_point(&a.xyz);

        let area = ds0 * dt1 - dt0 * ds1;
        let orient = if area.is_sign_negative() { -1.0 } else { 1.0 };

        let t0 = (d0 * dt1 - d1 * dt0).normalized() * orient;
        let t1 = (d1 * ds0 - d0 * ds1).normalized() * orient;

        for i in [i0, i1, i2] {
            let v = &mut verts[i];
            if used[i] {
                v.normal += n;
                v.tangents[0] += t0;
                v.tangents[1] += t1;
            } else {
                v.normal = n;
                v.tangents = [t0, t1];
                used[i] = true;
            }
        }
    }
}

/// Tangent space from each vertex's dominant triangle, pre-scaled
pub fn derive_unsmoothed_tangents(verts: &mut [DrawVert], dominant_tris: &[DominantTri]) {
    let dominant_tris = &dominant_tris[..verts.len()];
    for (i, dt) in dominant_tris.iter().enumerate() {
        let a = verts[i];
        let b = verts[dt.v2 as usize];
        let c = verts[dt.v3 as usize];

        let d0 = b.xyz - a.xyz;
        let d1 = c.xyz - a.xyz;
        let (ds0, dt0) = (b.st.x - a.st.x, b.st.y - a.st.y);
        let (ds1, dt1) = (c.st.x - a.st.x, c.st.y - a.st.y);
        let [s0, s1, s2] = dt.normalization_scale;

        let v = &mut verts[i];
        v.normal = d1.cross(&d0) * s2;
        v.tangents[0] = (d0 * dt1 - d1 * dt0) * s0;
        v.tangents[1] = (d1 * ds0 - d0 * ds1) * s1;
    }
}

/// Normalize the normal and Gram-Schmidt both tangents against it
///
/// Only `normal` and `tangents` are written.
pub fn normalize_tangents(verts: &mut [DrawVert]) {
    for v in verts.iter_mut() {
        let n = v.normal.normalized();
        v.normal = n;
        for t in v.tangents.iter_mut() {
            *t -= n * t.dot(&n);
            *t = t.normalized();
        }
    }
}

// ---------------------------------------------------------------------------
// Shadow volumes
// ---------------------------------------------------------------------------

/// Emit `(xyz, 1)` and `(xyz - light, 0)` for every vertex whose remap is 0
///
/// The remap entry of an emitted vertex becomes its cache index; any other
/// remap value (the `-1` sentinel included) is skipped and left as is. Returns
/// the number of cache entries written.
pub fn create_shadow_cache(
    vertex_cache: &mut [Vec4],
    vert_remap: &mut [i32],
    light_origin: &Vec3,
    verts: &[DrawVert],
) -> usize {
    let mut out = 0;
    for (remap, v) in vert_remap[..verts.len()].iter_mut().zip(verts) {
        if *remap != 0 {
            continue;
        }
        vertex_cache[out] = Vec4::from_vec3(v.xyz, 1.0);
        vertex_cache[out + 1] = Vec4::new(
            v.xyz.x - light_origin.x,
            v.xyz.y - light_origin.y,
            v.xyz.z - light_origin.z,
            0.0,
        );
        *remap = out as i32;
        out += 2;
    }
    out
}

/// Emit `(xyz, 1)` and `(xyz, 0)` for every vertex; returns `2 * verts.len()`
pub fn create_vertex_program_shadow_cache(vertex_cache: &mut [Vec4], verts: &[DrawVert]) -> usize {
    let cache = &mut vertex_cache[..verts.len() * 2];
    for (pair, v) in cache.chunks_exact_mut(2).zip(verts) {
        pair[0] = Vec4::from_vec3(v.xyz, 1.0);
        pair[1] = Vec4::from_vec3(v.xyz, 0.0);
    }
    verts.len() * 2
}

// ---------------------------------------------------------------------------
// Texture compression
// ---------------------------------------------------------------------------

/// Bytes per compressed 4x4 block (red block, then green block)
pub const RGTC_BLOCK_BYTES: usize = 16;

/// Output size of [`compress_rgtc_from_rgba8`] for a `width x height` image
pub const fn rgtc_compressed_size(width: usize, height: usize) -> usize {
    width.div_ceil(4) * height.div_ceil(4) * RGTC_BLOCK_BYTES
}

/// Red and green channels of block `(bx, by)`, edge pixels clamped
pub(crate) fn gather_block(
    src: &[u8],
    width: usize,
    height: usize,
    stride: usize,
    bx: usize,
    by: usize,
    red: &mut [u8; 16],
    green: &mut [u8; 16],
) {
    for y in 0..4 {
        let py = (by * 4 + y).min(height - 1);
        for x in 0..4 {
            let px = (bx * 4 + x).min(width - 1);
            let offset = py * stride + px * 4;
            red[y * 4 + x] = src[offset];
            green[y * 4 + x] = src[offset + 1];
        }
    }
}

/// Write one BC4-style channel block given its precomputed range
///
/// Layout: `max`, `min`, then 16 little-endian 3-bit indices. Index 0 selects
/// `max`, 1 selects `min`, 2..=7 the interpolated steps from `max` down.
pub(crate) fn encode_channel(values: &[u8; 16], lo: u8, hi: u8, out: &mut [u8]) {
    out[0] = hi;
    out[1] = lo;
    let mut bits = 0u64;
    if hi > lo {
        let range = (hi - lo) as u32;
        for (k, &v) in values.iter().enumerate() {
            let pos = ((v - lo) as u32 * 14 + range) / (2 * range);
            let code = match pos {
                7 => 0,
                0 => 1,
                p => 8 - p,
            } as u64;
            bits |= code << (3 * k);
        }
    }
    out[2..8].copy_from_slice(&bits.to_le_bytes()[..6]);
}

#[inline]
fn channel_range(values: &[u8; 16]) -> (u8, u8) {
    let lo = values.iter().copied().min().unwrap_or(0);
    let hi = values.iter().copied().max().unwrap_or(0);
    (lo, hi)
}

/// Compress the red and green channels of an RGBA8 image to RGTC2 / BC5
///
/// `stride` is the byte distance between rows. `dst` must hold at least
/// [`rgtc_compressed_size`] bytes.
pub fn compress_rgtc_from_rgba8(
    src: &[u8],
    width: usize,
    height: usize,
    stride: usize,
    dst: &mut [u8],
) {
    let blocks_x = width.div_ceil(4);
    let blocks_y = height.div_ceil(4);
    let mut red = [0u8; 16];
    let mut green = [0u8; 16];

    for by in 0..blocks_y {
        for bx in 0..blocks_x {
            gather_block(src, width, height, stride, bx, by, &mut red, &mut green);
            let out = &mut dst[(by * blocks_x + bx) * RGTC_BLOCK_BYTES..][..RGTC_BLOCK_BYTES];
            let (lo, hi) = channel_range(&red);
            encode_channel(&red, lo, hi, &mut out[..8]);
            let (lo, hi) = channel_range(&green);
            encode_channel(&green, lo, hi, &mut out[8..]);
        }
    }
}

// ---------------------------------------------------------------------------
// Audio
// ---------------------------------------------------------------------------

/// Replicate 16-bit PCM frames up to 44.1 kHz as floats
///
/// `pcm.len()` counts interleaved samples.
pub fn up_sample_pcm_to_44khz(dest: &mut [f32], pcm: &[i16], rate: SampleRate, channels: Channels) {
    let f = rate.factor();
    match channels {
        Channels::Mono => {
            for (i, &s) in pcm.iter().enumerate() {
                dest[i * f..(i + 1) * f].fill(s as f32);
            }
        }
        Channels::Stereo => {
            for (i, frame) in pcm.chunks_exact(2).enumerate() {
                for k in 0..f {
                    let o = (i * f + k) * 2;
                    dest[o] = frame[0] as f32;
                    dest[o + 1] = frame[1] as f32;
                }
            }
        }
    }
}

/// Replicate decoded float frames up to 44.1 kHz, scaled to the 16-bit range
///
/// `ogg` holds one slice per channel. `num_samples` counts interleaved samples,
/// so a stereo source reads `num_samples / 2` frames from each channel.
pub fn up_sample_ogg_to_44khz(
    dest: &mut [f32],
    ogg: &[&[f32]],
    num_samples: usize,
    rate: SampleRate,
    channels: Channels,
) {
    let f = rate.factor();
    match channels {
        Channels::Mono => {
            for (i, &s) in ogg[0][..num_samples].iter().enumerate() {
                dest[i * f..(i + 1) * f].fill(s * 32768.0);
            }
        }
        Channels::Stereo => {
            let frames = num_samples / 2;
            for (i, (&l, &r)) in ogg[0][..frames].iter().zip(&ogg[1][..frames]).enumerate() {
                for k in 0..f {
                    let o = (i * f + k) * 2;
                    dest[o] = l * 32768.0;
                    dest[o + 1] = r * 32768.0;
                }
            }
        }
    }
}

#[inline]
fn ramp<const N: usize>(last: &[f32; N], current: &[f32; N], num_samples: usize) -> [f32; N] {
    let mut inc = [0.0f32; N];
    for k in 0..N {
        inc[k] = (current[k] - last[k]) / num_samples as f32;
    }
    inc
}

/// Mix a mono source into a stereo buffer with per-sample volume ramps
pub fn mix_sound_two_speaker_mono(
    mix: &mut [f32],
    samples: &[f32],
    num_samples: usize,
    last: &[f32; 2],
    current: &[f32; 2],
) {
    let inc = ramp(last, current, num_samples);
    let mut vol = *last;
    for (frame, &s) in mix[..num_samples * 2].chunks_exact_mut(2).zip(&samples[..num_samples]) {
        frame[0] += s * vol[0];
        frame[1] += s * vol[1];
        vol[0] += inc[0];
        vol[1] += inc[1];
    }
}

/// Mix a stereo source into a stereo buffer with per-sample volume ramps
pub fn mix_sound_two_speaker_stereo(
    mix: &mut [f32],
    samples: &[f32],
    num_samples: usize,
    last: &[f32; 2],
    current: &[f32; 2],
) {
    let inc = ramp(last, current, num_samples);
    let mut vol = *last;
    for (frame, s) in mix[..num_samples * 2]
        .chunks_exact_mut(2)
        .zip(samples[..num_samples * 2].chunks_exact(2))
    {
        frame[0] += s[0] * vol[0];
        frame[1] += s[1] * vol[1];
        vol[0] += inc[0];
        vol[1] += inc[1];
    }
}

/// Mix a mono source into a six-speaker buffer with per-sample volume ramps
pub fn mix_sound_six_speaker_mono(
    mix: &mut [f32],
    samples: &[f32],
    num_samples: usize,
    last: &[f32; 6],
    current: &[f32; 6],
) {
    let inc = ramp(last, current, num_samples);
    let mut vol = *last;
    for (frame, &s) in mix[..num_samples * 6].chunks_exact_mut(6).zip(&samples[..num_samples]) {
        for k in 0..6 {
            frame[k] += s * vol[k];
            vol[k] += inc[k];
        }
    }
}

/// Speaker `k` of a six-speaker frame takes this source channel of a stereo frame
pub(crate) const SIX_SPEAKER_SOURCE: [usize; 6] = [0, 1, 0, 0, 0, 1];

/// Mix a stereo source into a six-speaker buffer with per-sample volume ramps
pub fn mix_sound_six_speaker_stereo(
    mix: &mut [f32],
    samples: &[f32],
    num_samples: usize,
    last: &[f32; 6],
    current: &[f32; 6],
) {
    let inc = ramp(last, current, num_samples);
    let mut vol = *last;
    for (frame, s) in mix[..num_samples * 6]
        .chunks_exact_mut(6)
        .zip(samples[..num_samples * 2].chunks_exact(2))
    {
        for k in 0..6 {
            frame[k] += s[SIX_SPEAKER_SOURCE[k]] * vol[k];
            vol[k] += inc[k];
        }
    }
}

/// Clip the float mix to 16-bit, truncating toward zero
pub fn mixed_sound_to_samples(samples: &mut [i16], mix: &[f32]) {
    let mix = &mix[..samples.len()];
    for (out, &m) in samples.iter_mut().zip(mix) {
        *out = if m <= -32768.0 {
            -32768
        } else if m >= 32767.0 {
            32767
        } else {
            m as i16
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_forms_put_constant_on_the_left() {
        let src = [1.0, 2.0, 4.0];
        let mut dst = [0.0; 3];
        sub_scalar(&mut dst, 10.0, &src);
        assert_eq!(dst, [9.0, 8.0, 6.0]);
        div_scalar(&mut dst, 8.0, &src);
        assert_eq!(dst, [8.0, 4.0, 2.0]);
    }

    #[test]
    fn test_mul_add_touches_only_prefix() {
        let src = [1.0; 8];
        let mut dst = [5.0; 8];
        mul_add(&mut dst[..3], 2.0, &src);
        assert_eq!(dst, [7.0, 7.0, 7.0, 5.0, 5.0, 5.0, 5.0, 5.0]);
        mul_sub(&mut dst[..1], 2.0, &src);
        assert_eq!(dst[0], 5.0);
    }

    #[test]
    #[should_panic]
    fn test_short_source_panics() {
        let mut dst = [0.0; 4];
        add(&mut dst, &[1.0; 4], &[1.0; 3]);
    }

    #[test]
    fn test_dot_variants() {
        let c = Vec3::new(1.0, 2.0, 3.0);
        let p = Plane::new(0.0, 0.0, 1.0, -1.0);
        let mut dst = [0.0];
        dot_vec3_planes(&mut dst, &c, &[p]);
        assert_eq!(dst[0], 2.0);
        dot_plane_vec3s(&mut dst, &p, &[c]);
        assert_eq!(dst[0], 2.0);
        dot_plane_planes(&mut dst, &p, &[p]);
        assert_eq!(dst[0], 2.0);
        dot_vec3_verts(&mut dst, &c, &[DrawVert::at(c)]);
        assert_eq!(dst[0], 14.0);
        assert_eq!(dot(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0, 100.0]), 32.0);
        assert_eq!(dot(&[], &[]), 0.0);
    }

    #[test]
    fn test_compare_bit_variant_only_adds_bits() {
        let src = [-1.0, 0.0, 1.0, 2.0];
        let mut dst = [0b0001, 0b1000, 0, 0xFF];
        cmp_gt_bit(&mut dst, 2, &src, 0.5);
        assert_eq!(dst, [0b0001, 0b1000, 0b0100, 0xFF]);

        let mut plain = [9u8; 4];
        cmp_le(&mut plain, &src, 0.0);
        assert_eq!(plain, [1, 1, 0, 0]);
    }

    #[test]
    fn test_min_max_empty_and_indexed() {
        assert_eq!(min_max(&[]), (f32::INFINITY, f32::NEG_INFINITY));
        assert_eq!(min_max(&[3.0, -2.0, 7.0]), (-2.0, 7.0));

        let verts = [
            DrawVert::at(Vec3::new(0.0, 5.0, -1.0)),
            DrawVert::at(Vec3::new(100.0, 100.0, 100.0)),
            DrawVert::at(Vec3::new(2.0, -5.0, 1.0)),
        ];
        let (lo, hi) = min_max_verts_indexed(&verts, &[0, 2]);
        assert_eq!(lo, Vec3::new(0.0, -5.0, -1.0));
        assert_eq!(hi, Vec3::new(2.0, 5.0, 1.0));
    }

    #[test]
    fn test_clamp_variants() {
        let src = [-3.0, -0.5, 0.5, 3.0];
        let mut dst = [0.0; 4];
        clamp(&mut dst, &src, -1.0, 1.0);
        assert_eq!(dst, [-1.0, -0.5, 0.5, 1.0]);
        clamp_min(&mut dst, &src, -1.0);
        assert_eq!(dst, [-1.0, -0.5, 0.5, 3.0]);
        clamp_max(&mut dst, &src, 1.0);
        assert_eq!(dst, [-3.0, -0.5, 0.5, 1.0]);
    }

    #[test]
    fn test_negate_flips_zero_sign() {
        let mut v = [0.0, -2.0, 3.5];
        negate(&mut v);
        assert!(v[0].is_sign_negative());
        assert_eq!(&v[1..], &[2.0, -3.5]);
    }

    #[test]
    fn test_matx_vecx_products() {
        let m = MatX::from_vec(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let v = VecX::from_vec(vec![1.0, 1.0, 1.0]);
        let mut dst = VecX::default();
        matx_multiply_vecx(&mut dst, &m, &v);
        assert_eq!(dst.as_slice(), &[6.0, 15.0]);
        matx_multiply_add_vecx(&mut dst, &m, &v);
        assert_eq!(dst.as_slice(), &[12.0, 30.0]);

        let w = VecX::from_vec(vec![1.0, 2.0]);
        matx_transpose_multiply_vecx(&mut dst, &m, &w);
        assert_eq!(dst.as_slice(), &[9.0, 12.0, 15.0]);
        matx_transpose_multiply_sub_vecx(&mut dst, &m, &w);
        assert_eq!(dst.as_slice(), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_matx_matx_products() {
        let a = MatX::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let b = MatX::from_vec(2, 2, vec![0.0, 1.0, 1.0, 0.0]).unwrap();
        let mut dst = MatX::default();
        matx_multiply_matx(&mut dst, &a, &b);
        assert_eq!(dst.as_slice(), &[2.0, 1.0, 4.0, 3.0]);
        matx_transpose_multiply_matx(&mut dst, &a, &a);
        assert_eq!(dst.as_slice(), &[10.0, 14.0, 14.0, 20.0]);
    }

    #[test]
    fn test_lower_triangular_solves() {
        // L = [[1,0,0],[2,1,0],[3,4,1]]
        let l = MatX::from_vec(3, 3, vec![1.0, 0.0, 0.0, 2.0, 1.0, 0.0, 3.0, 4.0, 1.0]).unwrap();
        let b = [1.0, 4.0, 14.0];
        let mut x = [0.0; 3];
        matx_lower_triangular_solve(&l, &mut x, &b, 3, 0);
        assert_eq!(x, [1.0, 2.0, 3.0]);

        // Lᵀ x = b with x = [1, 1, 1] gives b = [6, 5, 1]
        let mut y = [0.0; 3];
        matx_lower_triangular_solve_transpose(&l, &mut y, &[6.0, 5.0, 1.0], 3);
        assert_eq!(y, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_lower_triangular_solve_skip_keeps_prefix() {
        let l = MatX::from_vec(2, 2, vec![1.0, 0.0, 3.0, 1.0]).unwrap();
        let mut x = [2.0, 0.0];
        matx_lower_triangular_solve(&l, &mut x, &[99.0, 10.0], 2, 1);
        assert_eq!(x, [2.0, 4.0]);
    }

    #[test]
    fn test_ldlt_factor_reconstructs() {
        // A = L D Lᵀ with L = [[1,0],[0.5,1]], D = diag(4, 2)
        let mut a = MatX::from_vec(2, 2, vec![4.0, 2.0, 2.0, 3.0]).unwrap();
        let mut inv = VecX::zeros(2);
        assert!(matx_ldlt_factor(&mut a, &mut inv, 2));
        assert_eq!(a[(0, 0)], 4.0);
        assert_eq!(a[(1, 0)], 0.5);
        assert_eq!(a[(1, 1)], 2.0);
        assert_eq!(inv.as_slice(), &[0.25, 0.5]);
    }

    #[test]
    fn test_ldlt_factor_zero_pivot() {
        let mut a = MatX::zeros(2, 2);
        let mut inv = VecX::zeros(2);
        assert!(!matx_ldlt_factor(&mut a, &mut inv, 2));
        assert!(matx_ldlt_factor(&mut a, &mut inv, 0));
    }

    #[test]
    fn test_transform_joints_chain() {
        let step = JointMat::from_rotation_translation(
            &JointMat::IDENTITY.rotation(),
            Vec3::new(1.0, 0.0, 0.0),
        );
        let mut mats = [step; 4];
        let parents = [-1, 0, 1, 2];
        transform_joints(&mut mats, &parents, 1, 3);
        assert_eq!(mats[3].translation(), Vec3::new(4.0, 0.0, 0.0));
        untransform_joints(&mut mats, &parents, 1, 3);
        for m in &mats {
            assert!(m.compare(&step, 1e-6));
        }
    }

    #[test]
    fn test_transform_verts_sums_weight_runs() {
        let joints = [
            JointMat::IDENTITY,
            JointMat::from_rotation_translation(
                &JointMat::IDENTITY.rotation(),
                Vec3::new(0.0, 10.0, 0.0),
            ),
        ];
        let weights = [
            Vec4::new(1.0, 0.0, 0.0, 0.5),
            Vec4::new(0.0, 0.0, 0.0, 0.5),
            Vec4::new(0.0, 0.0, 2.0, 1.0),
        ];
        let index = [
            JointWeight { joint: 0, last: false },
            JointWeight { joint: 1, last: true },
            JointWeight { joint: 0, last: true },
        ];
        let mut verts = [DrawVert::default(); 2];
        transform_verts(&mut verts, &joints, &weights, &index);
        assert_eq!(verts[0].xyz, Vec3::new(1.0, 5.0, 0.0));
        assert_eq!(verts[1].xyz, Vec3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn test_trace_point_cull_bits() {
        let planes = [Plane::new(1.0, 0.0, 0.0, 0.0)];
        let verts = [
            DrawVert::at(Vec3::new(2.0, 0.0, 0.0)),
            DrawVert::at(Vec3::new(-2.0, 0.0, 0.0)),
            DrawVert::at(Vec3::new(0.5, 0.0, 0.0)),
        ];
        let mut bits = [0u8; 3];
        let total = trace_point_cull(&mut bits, 1.0, &planes, &verts);
        // in front: d+r, d-r positive -> low nibble flipped on
        assert_eq!(bits[0], 0x0F);
        // behind: both negative -> bit0 cleared by flip, bit4 set
        assert_eq!(bits[1], 0x0E | 0x10);
        // straddling: d-r negative only
        assert_eq!(bits[2], 0x0F | 0x10);
        assert_eq!(total, 0x1F);
    }

    #[test]
    fn test_overlay_point_cull_texcoords() {
        let planes = [Plane::new(1.0, 0.0, 0.0, 0.0), Plane::new(0.0, 1.0, 0.0, 0.0)];
        let verts = [
            DrawVert::at(Vec3::new(0.5, 0.5, 0.0)),
            DrawVert::at(Vec3::new(-0.5, 1.5, 0.0)),
        ];
        let mut bits = [0u8; 2];
        let mut st = [Vec2::default(); 2];
        overlay_point_cull(&mut bits, &mut st, &planes, &verts);
        assert_eq!(st[0], Vec2::new(0.5, 0.5));
        assert_eq!(bits[0], 0);
        assert_eq!(bits[1], 0b1001);
    }

    #[test]
    fn test_derive_tri_planes_orientation() {
        let verts = [
            DrawVert::at(Vec3::new(0.0, 0.0, 1.0)),
            DrawVert::at(Vec3::new(1.0, 0.0, 1.0)),
            DrawVert::at(Vec3::new(0.0, 1.0, 1.0)),
        ];
        let mut planes = [Plane::default()];
        derive_tri_planes(&mut planes, &verts, &[0, 1, 2]);
        // (c - a) x (b - a) = y x x = -z
        assert_eq!(planes[0], Plane::new(0.0, 0.0, -1.0, 1.0));
    }

    #[test]
    fn test_derive_tangents_first_use_assigns_then_accumulates() {
        let mut verts = [
            DrawVert::at(Vec3::new(0.0, 0.0, 0.0)),
            DrawVert::at(Vec3::new(1.0, 0.0, 0.0)),
            DrawVert::at(Vec3::new(0.0, 1.0, 0.0)),
        ];
        verts[1].st = Vec2::new(1.0, 0.0);
        verts[2].st = Vec2::new(0.0, 1.0);
        verts[0].normal = Vec3::new(9.0, 9.0, 9.0);
        let mut planes = [Plane::default(); 2];
        derive_tangents(&mut planes, &mut verts, &[0, 1, 2, 0, 1, 2]);
        assert_eq!(verts[0].normal, Vec3::new(0.0, 0.0, -2.0));
        assert_eq!(verts[0].tangents[0], Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(verts[0].tangents[1], Vec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn test_normalize_tangents_leaves_position() {
        let mut v = DrawVert::at(Vec3::new(7.0, 8.0, 9.0));
        v.normal = Vec3::new(0.0, 0.0, 3.0);
        v.tangents = [Vec3::new(2.0, 0.0, 2.0), Vec3::new(0.0, 5.0, -1.0)];
        let mut verts = [v];
        normalize_tangents(&mut verts);
        assert_eq!(verts[0].xyz, Vec3::new(7.0, 8.0, 9.0));
        assert_eq!(verts[0].normal, Vec3::new(0.0, 0.0, 1.0));
        assert_eq!(verts[0].tangents[0], Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(verts[0].tangents[1], Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_shadow_cache_skips_sentinel() {
        let verts = [
            DrawVert::at(Vec3::new(1.0, 2.0, 3.0)),
            DrawVert::at(Vec3::new(4.0, 5.0, 6.0)),
            DrawVert::at(Vec3::new(7.0, 8.0, 9.0)),
        ];
        let mut remap = [0, -1, 0];
        let mut cache = [Vec4::default(); 6];
        let n = create_shadow_cache(&mut cache, &mut remap, &Vec3::new(1.0, 1.0, 1.0), &verts);
        assert_eq!(n, 4);
        assert_eq!(remap, [0, -1, 2]);
        assert_eq!(cache[2], Vec4::new(7.0, 8.0, 9.0, 1.0));
        assert_eq!(cache[3], Vec4::new(6.0, 7.0, 8.0, 0.0));

        assert_eq!(create_vertex_program_shadow_cache(&mut cache, &verts), 6);
        assert_eq!(cache[5], Vec4::new(7.0, 8.0, 9.0, 0.0));
    }

    #[test]
    fn test_rgtc_flat_block_has_zero_indices() {
        let src = [[10u8, 200, 0, 255]; 16].concat();
        let mut dst = [0xAAu8; 16];
        compress_rgtc_from_rgba8(&src, 4, 4, 16, &mut dst);
        assert_eq!(&dst[..8], &[10, 10, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&dst[8..], &[200, 200, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_rgtc_endpoint_codes() {
        let mut values = [0u8; 16];
        values[0] = 255;
        let mut out = [0u8; 8];
        encode_channel(&values, 0, 255, &mut out);
        assert_eq!(out[0], 255);
        assert_eq!(out[1], 0);
        // first pixel is max (code 0), the rest are min (code 1)
        let bits = u64::from_le_bytes([out[2], out[3], out[4], out[5], out[6], out[7], 0, 0]);
        assert_eq!(bits & 0b111, 0);
        for k in 1..16 {
            assert_eq!((bits >> (3 * k)) & 0b111, 1);
        }
    }

    #[test]
    fn test_rgtc_size() {
        assert_eq!(rgtc_compressed_size(1, 1), 16);
        assert_eq!(rgtc_compressed_size(5, 4), 32);
        assert_eq!(rgtc_compressed_size(64, 64), 64 * 64);
    }

    #[test]
    fn test_up_sample_pcm_stereo_replicates_frames() {
        let pcm = [1i16, -1, 2, -2];
        let mut dest = [0.0f32; 8];
        up_sample_pcm_to_44khz(&mut dest, &pcm, SampleRate::Hz22050, Channels::Stereo);
        assert_eq!(dest, [1.0, -1.0, 1.0, -1.0, 2.0, -2.0, 2.0, -2.0]);
    }

    #[test]
    fn test_up_sample_ogg_scales() {
        let left = [0.5f32, -0.25];
        let mut dest = [0.0f32; 8];
        up_sample_ogg_to_44khz(&mut dest, &[&left], 2, SampleRate::Hz11025, Channels::Mono);
        assert_eq!(&dest[..4], &[16384.0; 4]);
        assert_eq!(&dest[4..], &[-8192.0; 4]);
    }

    #[test]
    fn test_mix_ramps_volume() {
        let mut mix = [0.0f32; 8];
        let samples = [1.0f32; 4];
        mix_sound_two_speaker_mono(&mut mix, &samples, 4, &[0.0, 1.0], &[1.0, 1.0]);
        assert_eq!(mix, [0.0, 1.0, 0.25, 1.0, 0.5, 1.0, 0.75, 1.0]);
    }

    #[test]
    fn test_six_speaker_stereo_routing() {
        let mut mix = [0.0f32; 6];
        mix_sound_six_speaker_stereo(&mut mix, &[1.0, 2.0], 1, &[1.0; 6], &[1.0; 6]);
        assert_eq!(mix, [1.0, 2.0, 1.0, 1.0, 1.0, 2.0]);
    }

    #[test]
    fn test_mixed_sound_to_samples_clips_and_truncates() {
        let mix = [-40000.0, -32768.5, -1.9, 1.9, 32766.9, 40000.0];
        let mut out = [0i16; 6];
        mixed_sound_to_samples(&mut out, &mix);
        assert_eq!(out, [-32768, -32768, -1, 1, 32766, 32767]);
    }
}
