//! AVX2 + FMA kernels (x86_64, 256-bit)
//!
//! This tier adds fused multiply-add for the prefix accumulate kernels and the
//! flat dot product, and uses AVX2 gathers to run `mat·v` across eight rows at
//! once (the row-major layout makes each row's inner loop strided otherwise).
//!
//! # Rounding
//!
//! FMA rounds once where the reference rounds twice, so `mul_add`, `mul_sub`
//! and `dot` differ from the reference in the last bit. The gathered products
//! keep the reference order and are bit-exact.
//!
//! # Safety
//!
//! Requires AVX2 and FMA. Gather indices address `rows * cols` elements of the
//! matrix storage and stay below its length.

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use super::avx::Accumulate;
use super::generic;
use crate::math::{MatX, VecX};

/// AVX2 backend (256-bit SIMD with FMA)
pub struct Avx2Backend;

impl Avx2Backend {
    #[target_feature(enable = "avx2,fma")]
    pub unsafe fn mul_add(dst: &mut [f32], constant: f32, src: &[f32]) {
        let len = dst.len();
        let src = &src[..len];
        let vc = _mm256_set1_ps(constant);
        let mut i = 0;

        while i + 8 <= len {
            let d = dst.as_mut_ptr().add(i);
            let vs = _mm256_loadu_ps(src.as_ptr().add(i));
            _mm256_storeu_ps(d, _mm256_fmadd_ps(vc, vs, _mm256_loadu_ps(d)));
            i += 8;
        }

        generic::mul_add(&mut dst[i..], constant, &src[i..]);
    }

    #[target_feature(enable = "avx2,fma")]
    pub unsafe fn mul_sub(dst: &mut [f32], constant: f32, src: &[f32]) {
        let len = dst.len();
        let src = &src[..len];
        let vc = _mm256_set1_ps(constant);
        let mut i = 0;

        while i + 8 <= len {
            let d = dst.as_mut_ptr().add(i);
            let vs = _mm256_loadu_ps(src.as_ptr().add(i));
            _mm256_storeu_ps(d, _mm256_fnmadd_ps(vc, vs, _mm256_loadu_ps(d)));
            i += 8;
        }

        generic::mul_sub(&mut dst[i..], constant, &src[i..]);
    }

    #[target_feature(enable = "avx2,fma")]
    pub unsafe fn dot(src0: &[f32], src1: &[f32]) -> f32 {
        let len = src0.len();
        let src1 = &src1[..len];
        let mut acc = _mm256_setzero_ps();
        let mut i = 0;

        while i + 8 <= len {
            let va = _mm256_loadu_ps(src0.as_ptr().add(i));
            let vb = _mm256_loadu_ps(src1.as_ptr().add(i));
            acc = _mm256_fmadd_ps(va, vb, acc);
            i += 8;
        }

        // Horizontal sum: fold the high half onto the low half, then 4 -> 1
        let half = _mm_add_ps(_mm256_castps256_ps128(acc), _mm256_extractf128_ps::<1>(acc));
        let pairs = _mm_add_ps(half, _mm_movehl_ps(half, half));
        let single = _mm_add_ss(pairs, _mm_shuffle_ps::<0x55>(pairs, pairs));
        let mut sum = _mm_cvtss_f32(single);

        for j in i..len {
            sum += src0[j] * src1[j];
        }
        sum
    }

    #[target_feature(enable = "avx2,fma")]
    pub unsafe fn matx_multiply_vecx(dst: &mut VecX, mat: &MatX, vec: &VecX) {
        dst.set_size(mat.rows());
        row_products(dst.as_mut_slice(), mat, vec.as_slice(), Accumulate::Assign);
    }

    #[target_feature(enable = "avx2,fma")]
    pub unsafe fn matx_multiply_add_vecx(dst: &mut VecX, mat: &MatX, vec: &VecX) {
        row_products(dst.as_mut_slice(), mat, vec.as_slice(), Accumulate::Add);
    }

    #[target_feature(enable = "avx2,fma")]
    pub unsafe fn matx_multiply_sub_vecx(dst: &mut VecX, mat: &MatX, vec: &VecX) {
        row_products(dst.as_mut_slice(), mat, vec.as_slice(), Accumulate::Sub);
    }
}

/// `dst[r] ⊕= Σ_j mat[r][j] * vec[j]`, eight rows per register
#[target_feature(enable = "avx2")]
unsafe fn row_products(dst: &mut [f32], mat: &MatX, vec: &[f32], mode: Accumulate) {
    let (rows, cols) = (mat.rows(), mat.cols());
    let vec = &vec[..cols];
    let dst = &mut dst[..rows];
    let data = mat.as_slice();
    let mut r = 0;

    if i32::try_from(data.len()).is_ok() {
        let stride = _mm256_set1_epi32(cols as i32);
        let lane = _mm256_setr_epi32(0, 1, 2, 3, 4, 5, 6, 7);

        while r + 8 <= rows {
            let first = _mm256_add_epi32(_mm256_set1_epi32(r as i32), lane);
            let base = _mm256_mullo_epi32(first, stride);
            let mut acc = _mm256_setzero_ps();
            for (j, &x) in vec.iter().enumerate() {
                let idx = _mm256_add_epi32(base, _mm256_set1_epi32(j as i32));
                let m = _mm256_i32gather_ps::<4>(data.as_ptr(), idx);
                acc = _mm256_add_ps(acc, _mm256_mul_ps(m, _mm256_set1_ps(x)));
            }
            mode.apply_ps(dst.as_mut_ptr().add(r), acc);
            r += 8;
        }
    }

    for (i, d) in dst.iter_mut().enumerate().skip(r) {
        let sum: f32 = mat.row(i).iter().zip(vec).map(|(a, b)| a * b).sum();
        mode.apply(d, sum);
    }
}
