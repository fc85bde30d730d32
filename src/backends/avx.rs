//! AVX kernels (x86_64, 256-bit floats)
//!
//! Eight `f32` lanes per register. This tier widens the elementwise kernels and
//! the dense products whose inner loop walks a matrix row contiguously
//! (`matᵀ·v`, `m1·m2`, `m1ᵀ·m2`).
//!
//! # Performance
//!
//! Expected speedup: up to 8x over scalar for elementwise operations on large
//! arrays, limited by memory bandwidth past L2.
//!
//! # Rounding
//!
//! Every kernel here keeps the reference operation order per output element
//! and is bit-exact, except the `min_max` reduction which is order independent
//! anyway.
//!
//! # Safety
//!
//! Requires AVX. Sources are resliced to the output length before any raw load.

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use super::generic;
use crate::math::{MatX, VecX};

/// AVX backend (256-bit SIMD)
pub struct AvxBackend;

/// How a product lands in the destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Accumulate {
    Assign,
    Add,
    Sub,
}

impl Accumulate {
    #[inline(always)]
    pub(crate) fn apply(self, dst: &mut f32, value: f32) {
        match self {
            Accumulate::Assign => *dst = value,
            Accumulate::Add => *dst += value,
            Accumulate::Sub => *dst -= value,
        }
    }

    #[inline(always)]
    pub(crate) unsafe fn apply_ps(self, dst: *mut f32, value: __m256) {
        let out = match self {
            Accumulate::Assign => value,
            Accumulate::Add => _mm256_add_ps(_mm256_loadu_ps(dst), value),
            Accumulate::Sub => _mm256_sub_ps(_mm256_loadu_ps(dst), value),
        };
        _mm256_storeu_ps(dst, out);
    }
}

macro_rules! scalar_kernels {
    ($($name:ident => $intr:ident, $op:tt;)*) => { $(
        #[target_feature(enable = "avx")]
        pub unsafe fn $name(dst: &mut [f32], constant: f32, src: &[f32]) {
            let len = dst.len();
            let src = &src[..len];
            let vc = _mm256_set1_ps(constant);
            let mut i = 0;

            while i + 8 <= len {
                let vs = _mm256_loadu_ps(src.as_ptr().add(i));
                _mm256_storeu_ps(dst.as_mut_ptr().add(i), $intr(vc, vs));
                i += 8;
            }

            for j in i..len {
                dst[j] = constant $op src[j];
            }
        }
    )* };
}

macro_rules! binary_kernels {
    ($($name:ident => $intr:ident, $op:tt;)*) => { $(
        #[target_feature(enable = "avx")]
        pub unsafe fn $name(dst: &mut [f32], src0: &[f32], src1: &[f32]) {
            let len = dst.len();
            let (src0, src1) = (&src0[..len], &src1[..len]);
            let mut i = 0;

            while i + 8 <= len {
                let va = _mm256_loadu_ps(src0.as_ptr().add(i));
                let vb = _mm256_loadu_ps(src1.as_ptr().add(i));
                _mm256_storeu_ps(dst.as_mut_ptr().add(i), $intr(va, vb));
                i += 8;
            }

            for j in i..len {
                dst[j] = src0[j] $op src1[j];
            }
        }
    )* };
}

macro_rules! compare_kernels {
    ($($name:ident, $bit_name:ident => $pred:ident, $op:tt;)*) => { $(
        #[target_feature(enable = "avx")]
        pub unsafe fn $name(dst: &mut [u8], src: &[f32], constant: f32) {
            let len = dst.len();
            let src = &src[..len];
            let vc = _mm256_set1_ps(constant);
            let mut i = 0;

            while i + 8 <= len {
                let v = _mm256_loadu_ps(src.as_ptr().add(i));
                let mask = _mm256_movemask_ps(_mm256_cmp_ps::<$pred>(v, vc));
                for k in 0..8 {
                    dst[i + k] = ((mask >> k) & 1) as u8;
                }
                i += 8;
            }

            for j in i..len {
                dst[j] = (src[j] $op constant) as u8;
            }
        }

        #[target_feature(enable = "avx")]
        pub unsafe fn $bit_name(dst: &mut [u8], bit: u8, src: &[f32], constant: f32) {
            let len = dst.len();
            let src = &src[..len];
            let vc = _mm256_set1_ps(constant);
            let mut i = 0;

            while i + 8 <= len {
                let v = _mm256_loadu_ps(src.as_ptr().add(i));
                let mask = _mm256_movemask_ps(_mm256_cmp_ps::<$pred>(v, vc));
                for k in 0..8 {
                    dst[i + k] |= (((mask >> k) & 1) as u8) << bit;
                }
                i += 8;
            }

            for j in i..len {
                dst[j] |= ((src[j] $op constant) as u8) << bit;
            }
        }
    )* };
}

impl AvxBackend {
    scalar_kernels! {
        add_scalar => _mm256_add_ps, +;
        sub_scalar => _mm256_sub_ps, -;
        mul_scalar => _mm256_mul_ps, *;
        div_scalar => _mm256_div_ps, /;
    }

    binary_kernels! {
        add => _mm256_add_ps, +;
        sub => _mm256_sub_ps, -;
        mul => _mm256_mul_ps, *;
        div => _mm256_div_ps, /;
    }

    compare_kernels! {
        cmp_gt, cmp_gt_bit => _CMP_GT_OQ, >;
        cmp_ge, cmp_ge_bit => _CMP_GE_OQ, >=;
        cmp_lt, cmp_lt_bit => _CMP_LT_OQ, <;
        cmp_le, cmp_le_bit => _CMP_LE_OQ, <=;
    }

    #[target_feature(enable = "avx")]
    pub unsafe fn min_max(src: &[f32]) -> (f32, f32) {
        let len = src.len();
        let mut vmin = _mm256_set1_ps(f32::INFINITY);
        let mut vmax = _mm256_set1_ps(f32::NEG_INFINITY);
        let mut i = 0;

        while i + 8 <= len {
            let v = _mm256_loadu_ps(src.as_ptr().add(i));
            vmin = _mm256_min_ps(vmin, v);
            vmax = _mm256_max_ps(vmax, v);
            i += 8;
        }

        let mut lo = [0.0f32; 8];
        let mut hi = [0.0f32; 8];
        _mm256_storeu_ps(lo.as_mut_ptr(), vmin);
        _mm256_storeu_ps(hi.as_mut_ptr(), vmax);

        let (tail_lo, tail_hi) = generic::min_max(&src[i..]);
        let min = lo.iter().fold(tail_lo, |m, &v| if v < m { v } else { m });
        let max = hi.iter().fold(tail_hi, |m, &v| if v > m { v } else { m });
        (min, max)
    }

    #[target_feature(enable = "avx")]
    pub unsafe fn clamp(dst: &mut [f32], src: &[f32], min: f32, max: f32) {
        let len = dst.len();
        let src = &src[..len];
        let (vmin, vmax) = (_mm256_set1_ps(min), _mm256_set1_ps(max));
        let mut i = 0;

        while i + 8 <= len {
            let v = _mm256_loadu_ps(src.as_ptr().add(i));
            _mm256_storeu_ps(dst.as_mut_ptr().add(i), _mm256_min_ps(_mm256_max_ps(v, vmin), vmax));
            i += 8;
        }

        generic::clamp(&mut dst[i..], &src[i..], min, max);
    }

    #[target_feature(enable = "avx")]
    pub unsafe fn clamp_min(dst: &mut [f32], src: &[f32], min: f32) {
        let len = dst.len();
        let src = &src[..len];
        let vmin = _mm256_set1_ps(min);
        let mut i = 0;

        while i + 8 <= len {
            let v = _mm256_loadu_ps(src.as_ptr().add(i));
            _mm256_storeu_ps(dst.as_mut_ptr().add(i), _mm256_max_ps(v, vmin));
            i += 8;
        }

        generic::clamp_min(&mut dst[i..], &src[i..], min);
    }

    #[target_feature(enable = "avx")]
    pub unsafe fn clamp_max(dst: &mut [f32], src: &[f32], max: f32) {
        let len = dst.len();
        let src = &src[..len];
        let vmax = _mm256_set1_ps(max);
        let mut i = 0;

        while i + 8 <= len {
            let v = _mm256_loadu_ps(src.as_ptr().add(i));
            _mm256_storeu_ps(dst.as_mut_ptr().add(i), _mm256_min_ps(v, vmax));
            i += 8;
        }

        generic::clamp_max(&mut dst[i..], &src[i..], max);
    }

    #[target_feature(enable = "avx")]
    pub unsafe fn negate(dst: &mut [f32]) {
        let len = dst.len();
        let sign = _mm256_set1_ps(-0.0);
        let mut i = 0;

        while i + 8 <= len {
            let d = dst.as_mut_ptr().add(i);
            _mm256_storeu_ps(d, _mm256_xor_ps(_mm256_loadu_ps(d), sign));
            i += 8;
        }

        generic::negate(&mut dst[i..]);
    }

    #[target_feature(enable = "avx")]
    pub unsafe fn matx_transpose_multiply_vecx(dst: &mut VecX, mat: &MatX, vec: &VecX) {
        dst.set_size(mat.cols());
        transpose_product(dst.as_mut_slice(), mat, vec.as_slice(), Accumulate::Assign);
    }

    #[target_feature(enable = "avx")]
    pub unsafe fn matx_transpose_multiply_add_vecx(dst: &mut VecX, mat: &MatX, vec: &VecX) {
        transpose_product(dst.as_mut_slice(), mat, vec.as_slice(), Accumulate::Add);
    }

    #[target_feature(enable = "avx")]
    pub unsafe fn matx_transpose_multiply_sub_vecx(dst: &mut VecX, mat: &MatX, vec: &VecX) {
        transpose_product(dst.as_mut_slice(), mat, vec.as_slice(), Accumulate::Sub);
    }

    #[target_feature(enable = "avx")]
    pub unsafe fn matx_multiply_matx(dst: &mut MatX, m1: &MatX, m2: &MatX) {
        dst.set_size(m1.rows(), m2.cols());
        for i in 0..m1.rows() {
            let a = m1.row(i);
            combine_rows(dst.row_mut(i), m2, |j| a[j]);
        }
    }

    #[target_feature(enable = "avx")]
    pub unsafe fn matx_transpose_multiply_matx(dst: &mut MatX, m1: &MatX, m2: &MatX) {
        dst.set_size(m1.cols(), m2.cols());
        for i in 0..m1.cols() {
            combine_rows(dst.row_mut(i), m2, |j| m1[(j, i)]);
        }
    }
}

/// `dst[c] ⊕= Σ_j mat[j][c] * vec[j]`, eight columns per register
#[target_feature(enable = "avx")]
unsafe fn transpose_product(dst: &mut [f32], mat: &MatX, vec: &[f32], mode: Accumulate) {
    let (rows, cols) = (mat.rows(), mat.cols());
    let vec = &vec[..rows];
    let dst = &mut dst[..cols];
    let mut c = 0;

    while c + 8 <= cols {
        let mut acc = _mm256_setzero_ps();
        for (j, &x) in vec.iter().enumerate() {
            let row = &mat.row(j)[c..c + 8];
            let term = _mm256_mul_ps(_mm256_loadu_ps(row.as_ptr()), _mm256_set1_ps(x));
            acc = _mm256_add_ps(acc, term);
        }
        mode.apply_ps(dst.as_mut_ptr().add(c), acc);
        c += 8;
    }

    for (k, d) in dst.iter_mut().enumerate().skip(c) {
        let mut sum = 0.0f32;
        for (j, &x) in vec.iter().enumerate() {
            sum += mat[(j, k)] * x;
        }
        mode.apply(d, sum);
    }
}

/// `out[k] = Σ_j coeff(j) * m2[j][k]` over the rows of `m2`
#[target_feature(enable = "avx")]
unsafe fn combine_rows(out: &mut [f32], m2: &MatX, coeff: impl Fn(usize) -> f32) {
    let cols = out.len();
    let mut k = 0;

    while k + 8 <= cols {
        let mut acc = _mm256_setzero_ps();
        for j in 0..m2.rows() {
            let row = &m2.row(j)[k..k + 8];
            let term = _mm256_mul_ps(_mm256_set1_ps(coeff(j)), _mm256_loadu_ps(row.as_ptr()));
            acc = _mm256_add_ps(acc, term);
        }
        _mm256_storeu_ps(out.as_mut_ptr().add(k), acc);
        k += 8;
    }

    for (c, o) in out.iter_mut().enumerate().skip(k) {
        let mut sum = 0.0f32;
        for j in 0..m2.rows() {
            sum += coeff(j) * m2[(j, c)];
        }
        *o = sum;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_avx() -> bool {
        is_x86_feature_detected!("avx")
    }

    #[test]
    fn test_avx_arithmetic_matches_reference() {
        if !has_avx() {
            return;
        }
        let a: Vec<f32> = (0..19).map(|i| i as f32 * 0.37 - 2.0).collect();
        let b: Vec<f32> = (0..19).map(|i| 1.5 + i as f32).collect();
        let mut fast = vec![0.0; 19];
        let mut reference = vec![0.0; 19];
        unsafe {
            AvxBackend::div(&mut fast, &a, &b);
        }
        generic::div(&mut reference, &a, &b);
        assert_eq!(fast, reference);
    }

    #[test]
    fn test_avx_transpose_product_bit_exact() {
        if !has_avx() {
            return;
        }
        let m = MatX::random(7, 19, 3, -1.0, 1.0);
        let v = VecX::random(7, 4, -1.0, 1.0);
        let mut fast = VecX::default();
        let mut reference = VecX::default();
        unsafe {
            AvxBackend::matx_transpose_multiply_vecx(&mut fast, &m, &v);
        }
        generic::matx_transpose_multiply_vecx(&mut reference, &m, &v);
        assert_eq!(fast, reference);
    }

    #[test]
    fn test_avx_matx_products_bit_exact() {
        if !has_avx() {
            return;
        }
        let a = MatX::random(5, 9, 1, -1.0, 1.0);
        let b = MatX::random(9, 11, 2, -1.0, 1.0);
        let mut fast = MatX::default();
        let mut reference = MatX::default();
        unsafe {
            AvxBackend::matx_multiply_matx(&mut fast, &a, &b);
        }
        generic::matx_multiply_matx(&mut reference, &a, &b);
        assert_eq!(fast, reference);

        let c = MatX::random(9, 6, 5, -1.0, 1.0);
        unsafe {
            AvxBackend::matx_transpose_multiply_matx(&mut fast, &b, &c);
        }
        generic::matx_transpose_multiply_matx(&mut reference, &b, &c);
        assert_eq!(fast, reference);
    }

    #[test]
    fn test_avx_compare_on_boundary() {
        if !has_avx() {
            return;
        }
        let src: Vec<f32> = (0..13).map(|i| i as f32).collect();
        let mut dst = vec![0u8; 13];
        unsafe {
            AvxBackend::cmp_ge(&mut dst, &src, 6.0);
        }
        let expected: Vec<u8> = (0..13).map(|i| (i >= 6) as u8).collect();
        assert_eq!(dst, expected);
    }
}
