//! SSE2 kernels (x86_64, 128-bit integer lanes)
//!
//! SSE2 adds the integer side of the 128-bit registers: byte-wise copy and fill,
//! 16-bit PCM widening, saturating sample packing and unsigned byte min/max for
//! the texture compressor. Floating-point kernels stay in [`super::sse`].
//!
//! # Performance
//!
//! Copy and fill move 16 bytes per instruction; sample packing converts 8 floats
//! per iteration.
//!
//! # Safety
//!
//! All kernels require SSE2. Raw loads and stores only touch subslices whose
//! bounds were checked by slicing first.

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use super::generic::{self, RGTC_BLOCK_BYTES};
use super::sse::{replicate_mono, replicate_stereo};
use crate::audio::{Channels, SampleRate};

/// SSE2 backend (128-bit SIMD, integer lanes)
pub struct Sse2Backend;

impl Sse2Backend {
    #[target_feature(enable = "sse2")]
    pub unsafe fn memcpy(dst: &mut [u8], src: &[u8]) {
        let len = dst.len();
        let src = &src[..len];
        let mut i = 0;

        while i + 16 <= len {
            let v = _mm_loadu_si128(src.as_ptr().add(i).cast());
            _mm_storeu_si128(dst.as_mut_ptr().add(i).cast(), v);
            i += 16;
        }

        dst[i..].copy_from_slice(&src[i..]);
    }

    #[target_feature(enable = "sse2")]
    pub unsafe fn memset(dst: &mut [u8], value: u8) {
        let len = dst.len();
        let v = _mm_set1_epi8(value as i8);
        let mut i = 0;

        while i + 16 <= len {
            _mm_storeu_si128(dst.as_mut_ptr().add(i).cast(), v);
            i += 16;
        }

        dst[i..].fill(value);
    }

    /// Clip to the 16-bit range, truncate and pack eight samples at a time
    #[target_feature(enable = "sse2")]
    pub unsafe fn mixed_sound_to_samples(samples: &mut [i16], mix: &[f32]) {
        let len = samples.len();
        let mix = &mix[..len];
        let lo = _mm_set1_ps(-32768.0);
        let hi = _mm_set1_ps(32767.0);
        let mut i = 0;

        while i + 8 <= len {
            let a = _mm_min_ps(_mm_max_ps(_mm_loadu_ps(mix.as_ptr().add(i)), lo), hi);
            let b = _mm_min_ps(_mm_max_ps(_mm_loadu_ps(mix.as_ptr().add(i + 4)), lo), hi);
            let packed = _mm_packs_epi32(_mm_cvttps_epi32(a), _mm_cvttps_epi32(b));
            _mm_storeu_si128(samples.as_mut_ptr().add(i).cast(), packed);
            i += 8;
        }

        generic::mixed_sound_to_samples(&mut samples[i..], &mix[i..]);
    }

    /// Widen four samples per step, then replicate by the rate factor
    #[target_feature(enable = "sse2")]
    pub unsafe fn up_sample_pcm_to_44khz(
        dest: &mut [f32],
        pcm: &[i16],
        rate: SampleRate,
        channels: Channels,
    ) {
        let f = rate.factor();
        let n = match channels {
            Channels::Mono => pcm.len(),
            Channels::Stereo => pcm.len() / 2 * 2,
        };
        let pcm = &pcm[..n];
        let dest = &mut dest[..n * f];
        let mut i = 0;

        while i + 4 <= n {
            let raw = _mm_loadl_epi64(pcm.as_ptr().add(i).cast());
            let wide = _mm_srai_epi32::<16>(_mm_unpacklo_epi16(raw, raw));
            let v = _mm_cvtepi32_ps(wide);
            let out = &mut dest[i * f..(i + 4) * f];
            match channels {
                Channels::Mono => replicate_mono(out, v, f),
                Channels::Stereo => replicate_stereo(out, v, f),
            }
            i += 4;
        }

        generic::up_sample_pcm_to_44khz(&mut dest[i * f..], &pcm[i..], rate, channels);
    }

    /// RGTC with the block range found by byte-wise min/max
    #[target_feature(enable = "sse2")]
    pub unsafe fn compress_rgtc_from_rgba8(
        src: &[u8],
        width: usize,
        height: usize,
        stride: usize,
        dst: &mut [u8],
    ) {
        compress_blocks(width, height, dst, |bx, by, red, green| {
            generic::gather_block(src, width, height, stride, bx, by, red, green)
        });
    }
}

/// Smallest and largest byte of a block channel
#[inline]
#[target_feature(enable = "sse2")]
pub(crate) unsafe fn byte_range(values: &[u8; 16]) -> (u8, u8) {
    let v = _mm_loadu_si128(values.as_ptr().cast());

    let lo = _mm_min_epu8(v, _mm_srli_si128::<8>(v));
    let lo = _mm_min_epu8(lo, _mm_srli_si128::<4>(lo));
    let lo = _mm_min_epu8(lo, _mm_srli_si128::<2>(lo));
    let lo = _mm_min_epu8(lo, _mm_srli_si128::<1>(lo));

    let hi = _mm_max_epu8(v, _mm_srli_si128::<8>(v));
    let hi = _mm_max_epu8(hi, _mm_srli_si128::<4>(hi));
    let hi = _mm_max_epu8(hi, _mm_srli_si128::<2>(hi));
    let hi = _mm_max_epu8(hi, _mm_srli_si128::<1>(hi));

    (
        (_mm_cvtsi128_si32(lo) & 0xFF) as u8,
        (_mm_cvtsi128_si32(hi) & 0xFF) as u8,
    )
}

/// Walk the blocks of a `width x height` image in row-major order
///
/// `gather` fills the red and green channels of block `(bx, by)`; encoding and
/// output placement are shared by every tier.
#[target_feature(enable = "sse2")]
pub(crate) unsafe fn compress_blocks(
    width: usize,
    height: usize,
    dst: &mut [u8],
    mut gather: impl FnMut(usize, usize, &mut [u8; 16], &mut [u8; 16]),
) {
    let blocks_x = width.div_ceil(4);
    let blocks_y = height.div_ceil(4);
    let mut red = [0u8; 16];
    let mut green = [0u8; 16];

    for by in 0..blocks_y {
        for bx in 0..blocks_x {
            gather(bx, by, &mut red, &mut green);
            let out = &mut dst[(by * blocks_x + bx) * RGTC_BLOCK_BYTES..][..RGTC_BLOCK_BYTES];
            let (lo, hi) = byte_range(&red);
            generic::encode_channel(&red, lo, hi, &mut out[..8]);
            let (lo, hi) = byte_range(&green);
            generic::encode_channel(&green, lo, hi, &mut out[8..]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sse2_memcpy_odd_length() {
        let src: Vec<u8> = (0..37).collect();
        let mut dst = vec![0u8; 37];
        unsafe {
            Sse2Backend::memcpy(&mut dst, &src);
        }
        assert_eq!(dst, src);
    }

    #[test]
    fn test_sse2_memset_unaligned_start() {
        let mut buf = vec![0u8; 40];
        unsafe {
            Sse2Backend::memset(&mut buf[3..30], 0xFF);
        }
        assert!(buf[..3].iter().all(|&b| b == 0));
        assert!(buf[3..30].iter().all(|&b| b == 0xFF));
        assert!(buf[30..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_sse2_samples_saturate() {
        let mix = [-1e9, -32768.5, -0.9, 0.9, 12.7, 32766.99, 32767.0, 1e9, 5.5];
        let mut fast = [0i16; 9];
        let mut reference = [0i16; 9];
        unsafe {
            Sse2Backend::mixed_sound_to_samples(&mut fast, &mix);
        }
        generic::mixed_sound_to_samples(&mut reference, &mix);
        assert_eq!(fast, reference);
    }

    #[test]
    fn test_sse2_pcm_sign_extends() {
        let pcm = [-32768i16, -1, 0, 32767, 5];
        let mut fast = vec![0.0f32; 10];
        let mut reference = vec![0.0f32; 10];
        let (rate, channels) = (SampleRate::Hz22050, Channels::Mono);
        unsafe {
            Sse2Backend::up_sample_pcm_to_44khz(&mut fast, &pcm, rate, channels);
        }
        generic::up_sample_pcm_to_44khz(&mut reference, &pcm, rate, channels);
        assert_eq!(fast, reference);
        assert_eq!(fast[0], -32768.0);
    }

    #[test]
    fn test_byte_range() {
        let mut values = [100u8; 16];
        values[3] = 7;
        values[15] = 250;
        assert_eq!(unsafe { byte_range(&values) }, (7, 250));
    }
}
