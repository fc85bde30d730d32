//! SSSE3 kernels (x86_64, byte shuffles)
//!
//! `pshufb` pulls the red and green bytes of four RGBA pixels out of one row in
//! a single instruction, which is the expensive part of RGTC compression.
//! Blocks touching the right or bottom edge need clamped pixel addresses and go
//! through the scalar gather instead.
//!
//! # Safety
//!
//! Requires SSSE3 (and the SSE2 it implies). Each 16-byte row load reads from a
//! checked 16-byte subslice.

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use super::generic;
use super::sse2::compress_blocks;

/// SSSE3 backend (128-bit SIMD with byte shuffles)
pub struct Ssse3Backend;

impl Ssse3Backend {
    #[target_feature(enable = "ssse3")]
    pub unsafe fn compress_rgtc_from_rgba8(
        src: &[u8],
        width: usize,
        height: usize,
        stride: usize,
        dst: &mut [u8],
    ) {
        compress_blocks(width, height, dst, |bx, by, red, green| {
            if bx * 4 + 4 <= width && by * 4 + 4 <= height {
                gather_interior(src, stride, bx, by, red, green);
            } else {
                generic::gather_block(src, width, height, stride, bx, by, red, green);
            }
        });
    }
}

/// Red and green of a block that lies fully inside the image
#[inline]
#[target_feature(enable = "ssse3")]
unsafe fn gather_interior(
    src: &[u8],
    stride: usize,
    bx: usize,
    by: usize,
    red: &mut [u8; 16],
    green: &mut [u8; 16],
) {
    // bytes 0..4 <- R of pixels 0..4, bytes 4..8 <- G, the rest zeroed
    let select = _mm_setr_epi8(0, 4, 8, 12, 1, 5, 9, 13, -1, -1, -1, -1, -1, -1, -1, -1);

    let mut rows = [_mm_setzero_si128(); 4];
    for (y, row) in rows.iter_mut().enumerate() {
        let offset = (by * 4 + y) * stride + bx * 16;
        let bytes = &src[offset..offset + 16];
        *row = _mm_shuffle_epi8(_mm_loadu_si128(bytes.as_ptr().cast()), select);
    }

    let top = _mm_unpacklo_epi32(rows[0], rows[1]);
    let bottom = _mm_unpacklo_epi32(rows[2], rows[3]);
    _mm_storeu_si128(red.as_mut_ptr().cast(), _mm_unpacklo_epi64(top, bottom));
    _mm_storeu_si128(green.as_mut_ptr().cast(), _mm_unpackhi_epi64(top, bottom));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interior_gather_matches_scalar() {
        if !is_x86_feature_detected!("ssse3") {
            return;
        }
        let (w, h, stride) = (8, 8, 8 * 4 + 12);
        let src: Vec<u8> = (0..stride * h).map(|i| (i * 7 % 251) as u8).collect();
        let (mut r0, mut g0, mut r1, mut g1) = ([0u8; 16], [0u8; 16], [0u8; 16], [0u8; 16]);
        unsafe {
            gather_interior(&src, stride, 1, 1, &mut r0, &mut g0);
        }
        generic::gather_block(&src, w, h, stride, 1, 1, &mut r1, &mut g1);
        assert_eq!(r0, r1);
        assert_eq!(g0, g1);
    }
}
