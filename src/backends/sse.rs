//! SSE kernels (x86_64, 128-bit floats)
//!
//! Four `f32` lanes per register. Kernels here need nothing beyond SSE, so every
//! higher tier reaches them for the operations it does not widen.
//!
//! # Rounding
//!
//! Elementwise kernels and the gather-based dot, cull and transform kernels use
//! the reference operation order and are bit-exact. The flat `dot` reduction
//! sums four partial lanes, the volume ramps in the mixers step by `2 * inc`, and
//! `normalize_tangents` uses `rsqrt` with one Newton-Raphson step, so those three
//! differ from the reference by rounding only.
//!
//! # Safety
//!
//! Every kernel is `unsafe` because of `#[target_feature]`: callers must verify
//! SSE support first. Sources are resliced to the output length before any raw
//! pointer load, so loads stay in bounds.

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use super::generic;
use crate::audio::{Channels, SampleRate};
use crate::math::{DrawVert, JointMat, JointWeight, Plane, Vec2, Vec3, Vec4};

/// SSE backend (128-bit SIMD)
pub struct SseBackend;

/// Four values of one field from four consecutive items, item 0 in lane 0
#[inline(always)]
pub(crate) unsafe fn lanes<T>(quad: &[T], f: impl Fn(&T) -> f32) -> __m128 {
    _mm_set_ps(f(&quad[3]), f(&quad[2]), f(&quad[1]), f(&quad[0]))
}

/// Structure-of-arrays view of four `Vec3`s
#[inline(always)]
pub(crate) unsafe fn gather_vec3<T>(quad: &[T], f: impl Fn(&T) -> Vec3) -> [__m128; 3] {
    let v = [f(&quad[0]), f(&quad[1]), f(&quad[2]), f(&quad[3])];
    [
        _mm_set_ps(v[3].x, v[2].x, v[1].x, v[0].x),
        _mm_set_ps(v[3].y, v[2].y, v[1].y, v[0].y),
        _mm_set_ps(v[3].z, v[2].z, v[1].z, v[0].z),
    ]
}

#[inline(always)]
pub(crate) unsafe fn to_array(v: __m128) -> [f32; 4] {
    let mut out = [0.0f32; 4];
    _mm_storeu_ps(out.as_mut_ptr(), v);
    out
}

#[inline(always)]
unsafe fn scatter_vec3(v: &[__m128; 3]) -> [Vec3; 4] {
    let (x, y, z) = (to_array(v[0]), to_array(v[1]), to_array(v[2]));
    [0, 1, 2, 3].map(|k| Vec3::new(x[k], y[k], z[k]))
}

#[inline(always)]
unsafe fn dot3(a: &[__m128; 3], b: &[__m128; 3]) -> __m128 {
    _mm_add_ps(
        _mm_add_ps(_mm_mul_ps(a[0], b[0]), _mm_mul_ps(a[1], b[1])),
        _mm_mul_ps(a[2], b[2]),
    )
}

/// `1 / sqrt(x)` refined once; zero maps to zero
#[inline(always)]
unsafe fn rsqrt_refined(len_sq: __m128) -> __m128 {
    let r = _mm_rsqrt_ps(len_sq);
    let half = _mm_mul_ps(_mm_set1_ps(0.5), len_sq);
    let r = _mm_mul_ps(r, _mm_sub_ps(_mm_set1_ps(1.5), _mm_mul_ps(half, _mm_mul_ps(r, r))));
    _mm_andnot_ps(_mm_cmpeq_ps(len_sq, _mm_setzero_ps()), r)
}

#[inline(always)]
unsafe fn normalize3(v: &[__m128; 3]) -> [__m128; 3] {
    let s = rsqrt_refined(dot3(v, v));
    [_mm_mul_ps(v[0], s), _mm_mul_ps(v[1], s), _mm_mul_ps(v[2], s)]
}

macro_rules! scalar_kernels {
    ($($name:ident => $intr:ident, $op:tt;)*) => { $(
        #[target_feature(enable = "sse")]
        pub unsafe fn $name(dst: &mut [f32], constant: f32, src: &[f32]) {
            let len = dst.len();
            let src = &src[..len];
            let vc = _mm_set1_ps(constant);
            let mut i = 0;

            while i + 4 <= len {
                let vs = _mm_loadu_ps(src.as_ptr().add(i));
                _mm_storeu_ps(dst.as_mut_ptr().add(i), $intr(vc, vs));
                i += 4;
            }

            for j in i..len {
                dst[j] = constant $op src[j];
            }
        }
    )* };
}

macro_rules! binary_kernels {
    ($($name:ident => $intr:ident, $op:tt;)*) => { $(
        #[target_feature(enable = "sse")]
        pub unsafe fn $name(dst: &mut [f32], src0: &[f32], src1: &[f32]) {
            let len = dst.len();
            let (src0, src1) = (&src0[..len], &src1[..len]);
            let mut i = 0;

            while i + 4 <= len {
                let va = _mm_loadu_ps(src0.as_ptr().add(i));
                let vb = _mm_loadu_ps(src1.as_ptr().add(i));
                _mm_storeu_ps(dst.as_mut_ptr().add(i), $intr(va, vb));
                i += 4;
            }

            for j in i..len {
                dst[j] = src0[j] $op src1[j];
            }
        }
    )* };
}

macro_rules! compare_kernels {
    ($($name:ident, $bit_name:ident => $intr:ident, $op:tt;)*) => { $(
        #[target_feature(enable = "sse")]
        pub unsafe fn $name(dst: &mut [u8], src: &[f32], constant: f32) {
            let len = dst.len();
            let src = &src[..len];
            let vc = _mm_set1_ps(constant);
            let mut i = 0;

            while i + 4 <= len {
                let mask = _mm_movemask_ps($intr(_mm_loadu_ps(src.as_ptr().add(i)), vc));
                for k in 0..4 {
                    dst[i + k] = ((mask >> k) & 1) as u8;
                }
                i += 4;
            }

            for j in i..len {
                dst[j] = (src[j] $op constant) as u8;
            }
        }

        #[target_feature(enable = "sse")]
        pub unsafe fn $bit_name(dst: &mut [u8], bit: u8, src: &[f32], constant: f32) {
            let len = dst.len();
            let src = &src[..len];
            let vc = _mm_set1_ps(constant);
            let mut i = 0;

            while i + 4 <= len {
                let mask = _mm_movemask_ps($intr(_mm_loadu_ps(src.as_ptr().add(i)), vc));
                for k in 0..4 {
                    dst[i + k] |= (((mask >> k) & 1) as u8) << bit;
                }
                i += 4;
            }

            for j in i..len {
                dst[j] |= ((src[j] $op constant) as u8) << bit;
            }
        }
    )* };
}

impl SseBackend {
    scalar_kernels! {
        add_scalar => _mm_add_ps, +;
        sub_scalar => _mm_sub_ps, -;
        mul_scalar => _mm_mul_ps, *;
        div_scalar => _mm_div_ps, /;
    }

    binary_kernels! {
        add => _mm_add_ps, +;
        sub => _mm_sub_ps, -;
        mul => _mm_mul_ps, *;
        div => _mm_div_ps, /;
    }

    compare_kernels! {
        cmp_gt, cmp_gt_bit => _mm_cmpgt_ps, >;
        cmp_ge, cmp_ge_bit => _mm_cmpge_ps, >=;
        cmp_lt, cmp_lt_bit => _mm_cmplt_ps, <;
        cmp_le, cmp_le_bit => _mm_cmple_ps, <=;
    }

    #[target_feature(enable = "sse")]
    pub unsafe fn mul_add(dst: &mut [f32], constant: f32, src: &[f32]) {
        let len = dst.len();
        let src = &src[..len];
        let vc = _mm_set1_ps(constant);
        let mut i = 0;

        while i + 4 <= len {
            let d = dst.as_mut_ptr().add(i);
            let prod = _mm_mul_ps(vc, _mm_loadu_ps(src.as_ptr().add(i)));
            _mm_storeu_ps(d, _mm_add_ps(_mm_loadu_ps(d), prod));
            i += 4;
        }

        for j in i..len {
            dst[j] += constant * src[j];
        }
    }

    #[target_feature(enable = "sse")]
    pub unsafe fn mul_sub(dst: &mut [f32], constant: f32, src: &[f32]) {
        let len = dst.len();
        let src = &src[..len];
        let vc = _mm_set1_ps(constant);
        let mut i = 0;

        while i + 4 <= len {
            let d = dst.as_mut_ptr().add(i);
            let prod = _mm_mul_ps(vc, _mm_loadu_ps(src.as_ptr().add(i)));
            _mm_storeu_ps(d, _mm_sub_ps(_mm_loadu_ps(d), prod));
            i += 4;
        }

        for j in i..len {
            dst[j] -= constant * src[j];
        }
    }

    #[target_feature(enable = "sse")]
    pub unsafe fn dot(src0: &[f32], src1: &[f32]) -> f32 {
        let len = src0.len();
        let src1 = &src1[..len];
        let mut acc = _mm_setzero_ps();
        let mut i = 0;

        while i + 4 <= len {
            let va = _mm_loadu_ps(src0.as_ptr().add(i));
            let vb = _mm_loadu_ps(src1.as_ptr().add(i));
            acc = _mm_add_ps(acc, _mm_mul_ps(va, vb));
            i += 4;
        }

        let lanes = to_array(acc);
        let mut sum = lanes[0] + lanes[1] + lanes[2] + lanes[3];
        for j in i..len {
            sum += src0[j] * src1[j];
        }
        sum
    }

    #[target_feature(enable = "sse")]
    pub unsafe fn dot_vec3_vec3s(dst: &mut [f32], constant: &Vec3, src: &[Vec3]) {
        let src = &src[..dst.len()];
        let c = [_mm_set1_ps(constant.x), _mm_set1_ps(constant.y), _mm_set1_ps(constant.z)];
        for (d, quad) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
            _mm_storeu_ps(d.as_mut_ptr(), dot3(&c, &gather_vec3(quad, |v| *v)));
        }
        let done = dst.len() / 4 * 4;
        generic::dot_vec3_vec3s(&mut dst[done..], constant, &src[done..]);
    }

    #[target_feature(enable = "sse")]
    pub unsafe fn dot_vec3_verts(dst: &mut [f32], constant: &Vec3, src: &[DrawVert]) {
        let src = &src[..dst.len()];
        let c = [_mm_set1_ps(constant.x), _mm_set1_ps(constant.y), _mm_set1_ps(constant.z)];
        for (d, quad) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
            _mm_storeu_ps(d.as_mut_ptr(), dot3(&c, &gather_vec3(quad, |v| v.xyz)));
        }
        let done = dst.len() / 4 * 4;
        generic::dot_vec3_verts(&mut dst[done..], constant, &src[done..]);
    }

    #[target_feature(enable = "sse")]
    pub unsafe fn dot_vec3_planes(dst: &mut [f32], constant: &Vec3, src: &[Plane]) {
        let src = &src[..dst.len()];
        let c = [_mm_set1_ps(constant.x), _mm_set1_ps(constant.y), _mm_set1_ps(constant.z)];
        for (d, quad) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
            let n = dot3(&c, &gather_vec3(quad, |p| p.normal()));
            _mm_storeu_ps(d.as_mut_ptr(), _mm_add_ps(n, lanes(quad, |p| p.d)));
        }
        let done = dst.len() / 4 * 4;
        generic::dot_vec3_planes(&mut dst[done..], constant, &src[done..]);
    }

    #[target_feature(enable = "sse")]
    pub unsafe fn dot_plane_vec3s(dst: &mut [f32], constant: &Plane, src: &[Vec3]) {
        let src = &src[..dst.len()];
        let n = [_mm_set1_ps(constant.a), _mm_set1_ps(constant.b), _mm_set1_ps(constant.c)];
        let d = _mm_set1_ps(constant.d);
        for (out, quad) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
            _mm_storeu_ps(out.as_mut_ptr(), _mm_add_ps(dot3(&n, &gather_vec3(quad, |v| *v)), d));
        }
        let done = dst.len() / 4 * 4;
        generic::dot_plane_vec3s(&mut dst[done..], constant, &src[done..]);
    }

    #[target_feature(enable = "sse")]
    pub unsafe fn dot_plane_verts(dst: &mut [f32], constant: &Plane, src: &[DrawVert]) {
        let src = &src[..dst.len()];
        let n = [_mm_set1_ps(constant.a), _mm_set1_ps(constant.b), _mm_set1_ps(constant.c)];
        let d = _mm_set1_ps(constant.d);
        for (out, quad) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
            _mm_storeu_ps(out.as_mut_ptr(), _mm_add_ps(dot3(&n, &gather_vec3(quad, |v| v.xyz)), d));
        }
        let done = dst.len() / 4 * 4;
        generic::dot_plane_verts(&mut dst[done..], constant, &src[done..]);
    }

    #[target_feature(enable = "sse")]
    pub unsafe fn dot_plane_planes(dst: &mut [f32], constant: &Plane, src: &[Plane]) {
        let src = &src[..dst.len()];
        let n = [_mm_set1_ps(constant.a), _mm_set1_ps(constant.b), _mm_set1_ps(constant.c)];
        let d = _mm_set1_ps(constant.d);
        for (out, quad) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
            let nn = dot3(&n, &gather_vec3(quad, |p| p.normal()));
            let dd = _mm_mul_ps(d, lanes(quad, |p| p.d));
            _mm_storeu_ps(out.as_mut_ptr(), _mm_add_ps(nn, dd));
        }
        let done = dst.len() / 4 * 4;
        generic::dot_plane_planes(&mut dst[done..], constant, &src[done..]);
    }

    #[target_feature(enable = "sse")]
    pub unsafe fn dot_vec3s(dst: &mut [f32], src0: &[Vec3], src1: &[Vec3]) {
        let n = dst.len();
        let (src0, src1) = (&src0[..n], &src1[..n]);
        let quads = src0.chunks_exact(4).zip(src1.chunks_exact(4));
        for (out, (a, b)) in dst.chunks_exact_mut(4).zip(quads) {
            let va = gather_vec3(a, |v| *v);
            let vb = gather_vec3(b, |v| *v);
            _mm_storeu_ps(out.as_mut_ptr(), dot3(&va, &vb));
        }
        let done = n / 4 * 4;
        generic::dot_vec3s(&mut dst[done..], &src0[done..], &src1[done..]);
    }

    #[target_feature(enable = "sse")]
    pub unsafe fn min_max(src: &[f32]) -> (f32, f32) {
        let len = src.len();
        let mut vmin = _mm_set1_ps(f32::INFINITY);
        let mut vmax = _mm_set1_ps(f32::NEG_INFINITY);
        let mut i = 0;

        while i + 4 <= len {
            let v = _mm_loadu_ps(src.as_ptr().add(i));
            vmin = _mm_min_ps(vmin, v);
            vmax = _mm_max_ps(vmax, v);
            i += 4;
        }

        let (lo, hi) = (to_array(vmin), to_array(vmax));
        let (tail_lo, tail_hi) = generic::min_max(&src[i..]);
        let min = lo.iter().fold(tail_lo, |m, &v| if v < m { v } else { m });
        let max = hi.iter().fold(tail_hi, |m, &v| if v > m { v } else { m });
        (min, max)
    }

    #[target_feature(enable = "sse")]
    pub unsafe fn clamp(dst: &mut [f32], src: &[f32], min: f32, max: f32) {
        let len = dst.len();
        let src = &src[..len];
        let (vmin, vmax) = (_mm_set1_ps(min), _mm_set1_ps(max));
        let mut i = 0;

        while i + 4 <= len {
            let v = _mm_loadu_ps(src.as_ptr().add(i));
            _mm_storeu_ps(dst.as_mut_ptr().add(i), _mm_min_ps(_mm_max_ps(v, vmin), vmax));
            i += 4;
        }

        generic::clamp(&mut dst[i..], &src[i..], min, max);
    }

    #[target_feature(enable = "sse")]
    pub unsafe fn clamp_min(dst: &mut [f32], src: &[f32], min: f32) {
        let len = dst.len();
        let src = &src[..len];
        let vmin = _mm_set1_ps(min);
        let mut i = 0;

        while i + 4 <= len {
            let v = _mm_loadu_ps(src.as_ptr().add(i));
            _mm_storeu_ps(dst.as_mut_ptr().add(i), _mm_max_ps(v, vmin));
            i += 4;
        }

        generic::clamp_min(&mut dst[i..], &src[i..], min);
    }

    #[target_feature(enable = "sse")]
    pub unsafe fn clamp_max(dst: &mut [f32], src: &[f32], max: f32) {
        let len = dst.len();
        let src = &src[..len];
        let vmax = _mm_set1_ps(max);
        let mut i = 0;

        while i + 4 <= len {
            let v = _mm_loadu_ps(src.as_ptr().add(i));
            _mm_storeu_ps(dst.as_mut_ptr().add(i), _mm_min_ps(v, vmax));
            i += 4;
        }

        generic::clamp_max(&mut dst[i..], &src[i..], max);
    }

    #[target_feature(enable = "sse")]
    pub unsafe fn negate(dst: &mut [f32]) {
        let len = dst.len();
        let sign = _mm_set1_ps(-0.0);
        let mut i = 0;

        while i + 4 <= len {
            let d = dst.as_mut_ptr().add(i);
            _mm_storeu_ps(d, _mm_xor_ps(_mm_loadu_ps(d), sign));
            i += 4;
        }

        generic::negate(&mut dst[i..]);
    }

    /// Skinning with the joint columns gathered per weight
    #[target_feature(enable = "sse")]
    pub unsafe fn transform_verts(
        verts: &mut [DrawVert],
        joints: &[JointMat],
        weights: &[Vec4],
        index: &[JointWeight],
    ) {
        #[inline(always)]
        unsafe fn apply(m: &JointMat, w: &Vec4) -> __m128 {
            let m = &m.mat;
            let c0 = _mm_set_ps(0.0, m[8], m[4], m[0]);
            let c1 = _mm_set_ps(0.0, m[9], m[5], m[1]);
            let c2 = _mm_set_ps(0.0, m[10], m[6], m[2]);
            let c3 = _mm_set_ps(0.0, m[11], m[7], m[3]);
            let p = _mm_add_ps(_mm_mul_ps(c0, _mm_set1_ps(w.x)), _mm_mul_ps(c1, _mm_set1_ps(w.y)));
            let p = _mm_add_ps(p, _mm_mul_ps(c2, _mm_set1_ps(w.z)));
            _mm_add_ps(p, _mm_mul_ps(c3, _mm_set1_ps(w.w)))
        }

        let mut j = 0;
        for v in verts.iter_mut() {
            let mut p = apply(&joints[index[j].joint as usize], &weights[j]);
            while !index[j].last {
                j += 1;
                p = _mm_add_ps(p, apply(&joints[index[j].joint as usize], &weights[j]));
            }
            j += 1;
            let out = to_array(p);
            v.xyz = Vec3::new(out[0], out[1], out[2]);
        }
    }

    /// Four planes in the lanes of one register, one vertex per step
    #[target_feature(enable = "sse")]
    pub unsafe fn trace_point_cull(
        cull_bits: &mut [u8],
        radius: f32,
        planes: &[Plane; 4],
        verts: &[DrawVert],
    ) -> u8 {
        let planes = &planes[..];
        let pa = lanes(planes, |p| p.a);
        let pb = lanes(planes, |p| p.b);
        let pc = lanes(planes, |p| p.c);
        let pd = lanes(planes, |p| p.d);
        let vr = _mm_set1_ps(radius);
        let mut total = 0u8;

        for (out, v) in cull_bits[..verts.len()].iter_mut().zip(verts) {
            let d = _mm_add_ps(
                _mm_add_ps(
                    _mm_add_ps(
                        _mm_mul_ps(pa, _mm_set1_ps(v.xyz.x)),
                        _mm_mul_ps(pb, _mm_set1_ps(v.xyz.y)),
                    ),
                    _mm_mul_ps(pc, _mm_set1_ps(v.xyz.z)),
                ),
                pd,
            );
            let inner = _mm_movemask_ps(_mm_add_ps(d, vr)) as u8;
            let outer = _mm_movemask_ps(_mm_sub_ps(d, vr)) as u8;
            let bits = (inner | (outer << 4)) ^ 0x0F;
            total |= bits;
            *out = bits;
        }
        total
    }

    #[target_feature(enable = "sse")]
    pub unsafe fn decal_point_cull(cull_bits: &mut [u8], planes: &[Plane; 6], verts: &[DrawVert]) {
        let zero = Plane::default();
        let hi = [planes[4], planes[5], zero, zero];
        let (lo, hi) = (&planes[..4], &hi[..]);
        let coeffs = |set: &[Plane]| {
            [
                lanes(set, |p| p.a),
                lanes(set, |p| p.b),
                lanes(set, |p| p.c),
                lanes(set, |p| p.d),
            ]
        };
        let (l, h) = (coeffs(lo), coeffs(hi));

        for (out, v) in cull_bits[..verts.len()].iter_mut().zip(verts) {
            let (x, y, z) = (_mm_set1_ps(v.xyz.x), _mm_set1_ps(v.xyz.y), _mm_set1_ps(v.xyz.z));
            let dist = |c: &[__m128; 4]| {
                _mm_add_ps(
                    _mm_add_ps(
                        _mm_add_ps(_mm_mul_ps(c[0], x), _mm_mul_ps(c[1], y)),
                        _mm_mul_ps(c[2], z),
                    ),
                    c[3],
                )
            };
            let high = _mm_movemask_ps(dist(&h)) as u8 & 0x03;
            let bits = _mm_movemask_ps(dist(&l)) as u8 | (high << 4);
            *out = bits ^ 0x3F;
        }
    }

    #[target_feature(enable = "sse")]
    pub unsafe fn overlay_point_cull(
        cull_bits: &mut [u8],
        tex_coords: &mut [Vec2],
        planes: &[Plane; 2],
        verts: &[DrawVert],
    ) {
        let pair = &[planes[0], planes[1], planes[0], planes[1]][..];
        let pa = lanes(pair, |p| p.a);
        let pb = lanes(pair, |p| p.b);
        let pc = lanes(pair, |p| p.c);
        let pd = lanes(pair, |p| p.d);
        let one = _mm_set1_ps(1.0);
        let n = verts.len();

        for ((out, st), v) in cull_bits[..n].iter_mut().zip(&mut tex_coords[..n]).zip(verts) {
            let d = _mm_add_ps(
                _mm_add_ps(
                    _mm_add_ps(
                        _mm_mul_ps(pa, _mm_set1_ps(v.xyz.x)),
                        _mm_mul_ps(pb, _mm_set1_ps(v.xyz.y)),
                    ),
                    _mm_mul_ps(pc, _mm_set1_ps(v.xyz.z)),
                ),
                pd,
            );
            let inside = _mm_movemask_ps(d) as u8 & 0x03;
            let beyond = _mm_movemask_ps(_mm_sub_ps(one, d)) as u8 & 0x03;
            let d = to_array(d);
            *st = Vec2::new(d[0], d[1]);
            *out = inside | (beyond << 2);
        }
    }

    #[target_feature(enable = "sse")]
    pub unsafe fn normalize_tangents(verts: &mut [DrawVert]) {
        for quad in verts.chunks_exact_mut(4) {
            let n = normalize3(&gather_vec3(quad, |v| v.normal));
            let mut t = [[_mm_setzero_ps(); 3]; 2];
            for (k, tk) in t.iter_mut().enumerate() {
                let tv = gather_vec3(quad, |v| v.tangents[k]);
                let d = dot3(&tv, &n);
                let ortho = [
                    _mm_sub_ps(tv[0], _mm_mul_ps(n[0], d)),
                    _mm_sub_ps(tv[1], _mm_mul_ps(n[1], d)),
                    _mm_sub_ps(tv[2], _mm_mul_ps(n[2], d)),
                ];
                *tk = normalize3(&ortho);
            }
            let (n, t0, t1) = (scatter_vec3(&n), scatter_vec3(&t[0]), scatter_vec3(&t[1]));
            for (k, v) in quad.iter_mut().enumerate() {
                v.normal = n[k];
                v.tangents = [t0[k], t1[k]];
            }
        }
        let done = verts.len() / 4 * 4;
        generic::normalize_tangents(&mut verts[done..]);
    }

    #[target_feature(enable = "sse")]
    pub unsafe fn create_shadow_cache(
        vertex_cache: &mut [Vec4],
        vert_remap: &mut [i32],
        light_origin: &Vec3,
        verts: &[DrawVert],
    ) -> usize {
        let xyz_mask = xyz_mask();
        let w_one = _mm_set_ps(1.0, 0.0, 0.0, 0.0);
        let light = _mm_set_ps(0.0, light_origin.z, light_origin.y, light_origin.x);
        let mut out = 0;

        for (remap, v) in vert_remap[..verts.len()].iter_mut().zip(verts) {
            if *remap != 0 {
                continue;
            }
            let p = load_xyz0(v, xyz_mask);
            let pair = &mut vertex_cache[out..out + 2];
            _mm_storeu_ps(pair.as_mut_ptr().cast::<f32>(), _mm_or_ps(p, w_one));
            _mm_storeu_ps(pair.as_mut_ptr().add(1).cast::<f32>(), _mm_sub_ps(p, light));
            *remap = out as i32;
            out += 2;
        }
        out
    }

    #[target_feature(enable = "sse")]
    pub unsafe fn create_vertex_program_shadow_cache(
        vertex_cache: &mut [Vec4],
        verts: &[DrawVert],
    ) -> usize {
        let xyz_mask = xyz_mask();
        let w_one = _mm_set_ps(1.0, 0.0, 0.0, 0.0);
        let cache = &mut vertex_cache[..verts.len() * 2];

        for (pair, v) in cache.chunks_exact_mut(2).zip(verts) {
            let p = load_xyz0(v, xyz_mask);
            _mm_storeu_ps(pair.as_mut_ptr().cast::<f32>(), _mm_or_ps(p, w_one));
            _mm_storeu_ps(pair.as_mut_ptr().add(1).cast::<f32>(), p);
        }
        verts.len() * 2
    }

    #[target_feature(enable = "sse")]
    pub unsafe fn up_sample_ogg_to_44khz(
        dest: &mut [f32],
        ogg: &[&[f32]],
        num_samples: usize,
        rate: SampleRate,
        channels: Channels,
    ) {
        let f = rate.factor();
        let scale = _mm_set1_ps(32768.0);

        match channels {
            Channels::Mono => {
                let src = &ogg[0][..num_samples];
                let dest = &mut dest[..num_samples * f];
                let mut i = 0;
                while i + 4 <= num_samples {
                    let v = _mm_mul_ps(_mm_loadu_ps(src.as_ptr().add(i)), scale);
                    replicate_mono(&mut dest[i * f..(i + 4) * f], v, f);
                    i += 4;
                }
                generic::up_sample_ogg_to_44khz(
                    &mut dest[i * f..],
                    &[&src[i..]],
                    num_samples - i,
                    rate,
                    channels,
                );
            }
            Channels::Stereo => {
                let frames = num_samples / 2;
                let (left, right) = (&ogg[0][..frames], &ogg[1][..frames]);
                let dest = &mut dest[..frames * 2 * f];
                let mut i = 0;
                while i + 4 <= frames {
                    let l = _mm_mul_ps(_mm_loadu_ps(left.as_ptr().add(i)), scale);
                    let r = _mm_mul_ps(_mm_loadu_ps(right.as_ptr().add(i)), scale);
                    let out = &mut dest[i * 2 * f..(i + 4) * 2 * f];
                    let half = out.len() / 2;
                    replicate_stereo(&mut out[..half], _mm_unpacklo_ps(l, r), f);
                    replicate_stereo(&mut out[half..], _mm_unpackhi_ps(l, r), f);
                    i += 4;
                }
                generic::up_sample_ogg_to_44khz(
                    &mut dest[i * 2 * f..],
                    &[&left[i..], &right[i..]],
                    (frames - i) * 2,
                    rate,
                    channels,
                );
            }
        }
    }

    #[target_feature(enable = "sse")]
    pub unsafe fn mix_sound_two_speaker_mono(
        mix: &mut [f32],
        samples: &[f32],
        num_samples: usize,
        last: &[f32; 2],
        current: &[f32; 2],
    ) {
        mix_two(mix, num_samples, last, current, |j, _| samples[j]);
    }

    #[target_feature(enable = "sse")]
    pub unsafe fn mix_sound_two_speaker_stereo(
        mix: &mut [f32],
        samples: &[f32],
        num_samples: usize,
        last: &[f32; 2],
        current: &[f32; 2],
    ) {
        mix_two(mix, num_samples, last, current, |j, k| samples[j * 2 + k]);
    }

    #[target_feature(enable = "sse")]
    pub unsafe fn mix_sound_six_speaker_mono(
        mix: &mut [f32],
        samples: &[f32],
        num_samples: usize,
        last: &[f32; 6],
        current: &[f32; 6],
    ) {
        mix_six(mix, num_samples, last, current, |j, _| samples[j]);
    }

    #[target_feature(enable = "sse")]
    pub unsafe fn mix_sound_six_speaker_stereo(
        mix: &mut [f32],
        samples: &[f32],
        num_samples: usize,
        last: &[f32; 6],
        current: &[f32; 6],
    ) {
        mix_six(mix, num_samples, last, current, |j, k| {
            samples[j * 2 + generic::SIX_SPEAKER_SOURCE[k]]
        });
    }
}

#[inline(always)]
unsafe fn xyz_mask() -> __m128 {
    let all = f32::from_bits(u32::MAX);
    _mm_set_ps(0.0, all, all, all)
}

/// `(x, y, z, 0)` of a vertex
#[inline(always)]
unsafe fn load_xyz0(v: &DrawVert, mask: __m128) -> __m128 {
    // xyz is the first field and st follows it, so 16 bytes stay inside the vertex
    _mm_and_ps(_mm_loadu_ps((v as *const DrawVert).cast::<f32>()), mask)
}

/// Write each lane of `v` `f` times in a row; `out.len() == 4 * f`
#[inline(always)]
pub(crate) unsafe fn replicate_mono(out: &mut [f32], v: __m128, f: usize) {
    let p = out.as_mut_ptr();
    match f {
        4 => {
            _mm_storeu_ps(p, _mm_shuffle_ps::<0x00>(v, v));
            _mm_storeu_ps(p.add(4), _mm_shuffle_ps::<0x55>(v, v));
            _mm_storeu_ps(p.add(8), _mm_shuffle_ps::<0xAA>(v, v));
            _mm_storeu_ps(p.add(12), _mm_shuffle_ps::<0xFF>(v, v));
        }
        2 => {
            _mm_storeu_ps(p, _mm_unpacklo_ps(v, v));
            _mm_storeu_ps(p.add(4), _mm_unpackhi_ps(v, v));
        }
        _ => _mm_storeu_ps(p, v),
    }
}

/// Write the two stereo frames of `v` (`L0 R0 L1 R1`) `f` times each;
/// `out.len() == 4 * f`
#[inline(always)]
pub(crate) unsafe fn replicate_stereo(out: &mut [f32], v: __m128, f: usize) {
    let p = out.as_mut_ptr();
    let first = _mm_movelh_ps(v, v);
    let second = _mm_movehl_ps(v, v);
    match f {
        4 => {
            _mm_storeu_ps(p, first);
            _mm_storeu_ps(p.add(4), first);
            _mm_storeu_ps(p.add(8), second);
            _mm_storeu_ps(p.add(12), second);
        }
        2 => {
            _mm_storeu_ps(p, first);
            _mm_storeu_ps(p.add(4), second);
        }
        _ => _mm_storeu_ps(p, v),
    }
}

/// Two-speaker mix, two frames per register
#[inline(always)]
unsafe fn mix_two(
    mix: &mut [f32],
    num_samples: usize,
    last: &[f32; 2],
    current: &[f32; 2],
    source: impl Fn(usize, usize) -> f32,
) {
    let mix = &mut mix[..num_samples * 2];
    let inc = [
        (current[0] - last[0]) / num_samples as f32,
        (current[1] - last[1]) / num_samples as f32,
    ];
    let mut vol = _mm_set_ps(last[1] + inc[1], last[0] + inc[0], last[1], last[0]);
    let step = _mm_set_ps(2.0 * inc[1], 2.0 * inc[0], 2.0 * inc[1], 2.0 * inc[0]);
    let mut j = 0;

    while j + 2 <= num_samples {
        let s = _mm_set_ps(source(j + 1, 1), source(j + 1, 0), source(j, 1), source(j, 0));
        let m = mix.as_mut_ptr().add(j * 2);
        _mm_storeu_ps(m, _mm_add_ps(_mm_loadu_ps(m), _mm_mul_ps(s, vol)));
        vol = _mm_add_ps(vol, step);
        j += 2;
    }

    if j < num_samples {
        let v = to_array(vol);
        mix[j * 2] += source(j, 0) * v[0];
        mix[j * 2 + 1] += source(j, 1) * v[1];
    }
}

/// Six-speaker mix, two frames (three registers) per step
#[inline(always)]
unsafe fn mix_six(
    mix: &mut [f32],
    num_samples: usize,
    last: &[f32; 6],
    current: &[f32; 6],
    source: impl Fn(usize, usize) -> f32,
) {
    let mix = &mut mix[..num_samples * 6];
    let mut inc = [0.0f32; 6];
    for k in 0..6 {
        inc[k] = (current[k] - last[k]) / num_samples as f32;
    }

    let mut start = [0.0f32; 12];
    let mut step = [0.0f32; 12];
    for c in 0..12 {
        let k = c % 6;
        start[c] = if c < 6 { last[k] } else { last[k] + inc[k] };
        step[c] = 2.0 * inc[k];
    }
    let mut vol = [0, 4, 8].map(|o| _mm_loadu_ps(start.as_ptr().add(o)));
    let steps = [0, 4, 8].map(|o| _mm_loadu_ps(step.as_ptr().add(o)));
    let mut j = 0;

    while j + 2 <= num_samples {
        let mut s = [0.0f32; 12];
        for (c, v) in s.iter_mut().enumerate() {
            *v = source(j + c / 6, c % 6);
        }
        for r in 0..3 {
            let m = mix.as_mut_ptr().add(j * 6 + r * 4);
            let sv = _mm_loadu_ps(s.as_ptr().add(r * 4));
            _mm_storeu_ps(m, _mm_add_ps(_mm_loadu_ps(m), _mm_mul_ps(sv, vol[r])));
            vol[r] = _mm_add_ps(vol[r], steps[r]);
        }
        j += 2;
    }

    if j < num_samples {
        let (v0, v1) = (to_array(vol[0]), to_array(vol[1]));
        let v = [v0[0], v0[1], v0[2], v0[3], v1[0], v1[1]];
        for k in 0..6 {
            mix[j * 6 + k] += source(j, k) * v[k];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sse_add_with_tail() {
        let a: Vec<f32> = (0..7).map(|i| i as f32).collect();
        let b = vec![10.0; 7];
        let mut out = vec![0.0; 7];
        unsafe {
            SseBackend::add(&mut out, &a, &b);
        }
        assert_eq!(out, vec![10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0]);
    }

    #[test]
    fn test_sse_compare_bits() {
        let src = [-1.0, 2.0, 0.5, 3.0, 9.0];
        let mut dst = [0u8; 5];
        unsafe {
            SseBackend::cmp_gt(&mut dst, &src, 1.0);
        }
        assert_eq!(dst, [0, 1, 0, 1, 1]);
        let mut bits = [0x80u8; 5];
        unsafe {
            SseBackend::cmp_lt_bit(&mut bits, 1, &src, 1.0);
        }
        assert_eq!(bits, [0x82, 0x80, 0x82, 0x80, 0x80]);
    }

    #[test]
    fn test_sse_min_max_mixes_vector_and_tail() {
        let src = [3.0, -7.0, 2.0, 8.0, 1.0, -9.0];
        assert_eq!(unsafe { SseBackend::min_max(&src) }, (-9.0, 8.0));
        assert_eq!(unsafe { SseBackend::min_max(&[]) }, (f32::INFINITY, f32::NEG_INFINITY));
    }

    #[test]
    fn test_sse_dot_plane_verts_matches_reference() {
        let p = Plane::new(0.5, -1.0, 2.0, 3.0);
        let verts: Vec<DrawVert> = (0..9)
            .map(|i| DrawVert::at(Vec3::new(i as f32, 1.0 - i as f32, 0.25 * i as f32)))
            .collect();
        let mut fast = vec![0.0; 9];
        let mut reference = vec![0.0; 9];
        unsafe {
            SseBackend::dot_plane_verts(&mut fast, &p, &verts);
        }
        generic::dot_plane_verts(&mut reference, &p, &verts);
        assert_eq!(fast, reference);
    }

    #[test]
    fn test_sse_vertex_program_cache() {
        let verts = [DrawVert::at(Vec3::new(1.0, 2.0, 3.0))];
        let mut cache = [Vec4::default(); 2];
        let n = unsafe { SseBackend::create_vertex_program_shadow_cache(&mut cache, &verts) };
        assert_eq!(n, 2);
        assert_eq!(cache, [Vec4::new(1.0, 2.0, 3.0, 1.0), Vec4::new(1.0, 2.0, 3.0, 0.0)]);
    }

    #[test]
    fn test_sse_normalize_zero_normal_stays_zero() {
        let mut verts = vec![DrawVert::default(); 5];
        unsafe {
            SseBackend::normalize_tangents(&mut verts);
        }
        assert!(verts.iter().all(|v| v.normal == Vec3::ZERO));
    }
}
