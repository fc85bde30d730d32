//! Tiered x86_64 processor
//!
//! One processor type serves every x86 tier. It reports the tier it was built
//! for and dispatches each kernel to the widest implementation at or below the
//! tier it may execute. Kernels no tier accelerates fall through to the
//! reference implementation.
//!
//! The executable tier is the requested tier clamped to what the host verifies
//! at construction, so a processor built from a hand-made capability mask is
//! still safe to call: it simply runs narrower kernels.

use super::avx::AvxBackend;
use super::avx2::Avx2Backend;
use super::generic;
use super::sse::SseBackend;
use super::sse2::Sse2Backend;
use super::ssse3::Ssse3Backend;
use super::SimdProcessor;
use crate::audio::{Channels, SampleRate};
use crate::detect;
use crate::math::{DrawVert, JointMat, JointWeight, MatX, Plane, Vec2, Vec3, Vec4, VecX};
use crate::Backend;

/// Run the first listed kernel whose tier is executable, else the fallback
macro_rules! tiered {
    ($self:ident, $fallback:expr; $($tier:ident => $call:expr),+ $(,)?) => {{
        $(
            if $self.exec >= Backend::$tier {
                // SAFETY: `exec` never exceeds the tier the host verified at
                // construction, and a kernel listed under a tier needs no
                // feature outside that tier's requirements.
                return unsafe { $call };
            }
        )+
        $fallback
    }};
}

/// x86_64 processor for the SSE through AVX2 tiers
#[derive(Debug, Clone, Copy)]
pub struct X86Processor {
    backend: Backend,
    exec: Backend,
}

impl X86Processor {
    /// Processor for `backend`, limited to what this host can execute
    pub fn new(backend: Backend) -> Self {
        Self::with_host_tier(backend, Backend::best_for(&detect::detect()))
    }

    fn with_host_tier(backend: Backend, host: Backend) -> Self {
        let exec = backend.min(host);
        if exec != backend {
            tracing::debug!(
                requested = backend.name(),
                executing = exec.name(),
                "host cannot execute requested tier; running narrower kernels"
            );
        }
        Self { backend, exec }
    }

    /// Tier the kernels actually run at
    pub fn executing(&self) -> Backend {
        self.exec
    }
}

impl SimdProcessor for X86Processor {
    fn backend(&self) -> Backend {
        self.backend
    }

    fn add_scalar(&self, dst: &mut [f32], constant: f32, src: &[f32]) {
        tiered!(self, generic::add_scalar(dst, constant, src);
            Avx => AvxBackend::add_scalar(dst, constant, src),
            Sse => SseBackend::add_scalar(dst, constant, src))
    }

    fn add(&self, dst: &mut [f32], src0: &[f32], src1: &[f32]) {
        tiered!(self, generic::add(dst, src0, src1);
            Avx => AvxBackend::add(dst, src0, src1),
            Sse => SseBackend::add(dst, src0, src1))
    }

    fn sub_scalar(&self, dst: &mut [f32], constant: f32, src: &[f32]) {
        tiered!(self, generic::sub_scalar(dst, constant, src);
            Avx => AvxBackend::sub_scalar(dst, constant, src),
            Sse => SseBackend::sub_scalar(dst, constant, src))
    }

    fn sub(&self, dst: &mut [f32], src0: &[f32], src1: &[f32]) {
        tiered!(self, generic::sub(dst, src0, src1);
            Avx => AvxBackend::sub(dst, src0, src1),
            Sse => SseBackend::sub(dst, src0, src1))
    }

    fn mul_scalar(&self, dst: &mut [f32], constant: f32, src: &[f32]) {
        tiered!(self, generic::mul_scalar(dst, constant, src);
            Avx => AvxBackend::mul_scalar(dst, constant, src),
            Sse => SseBackend::mul_scalar(dst, constant, src))
    }

    fn mul(&self, dst: &mut [f32], src0: &[f32], src1: &[f32]) {
        tiered!(self, generic::mul(dst, src0, src1);
            Avx => AvxBackend::mul(dst, src0, src1),
            Sse => SseBackend::mul(dst, src0, src1))
    }

    fn div_scalar(&self, dst: &mut [f32], constant: f32, src: &[f32]) {
        tiered!(self, generic::div_scalar(dst, constant, src);
            Avx => AvxBackend::div_scalar(dst, constant, src),
            Sse => SseBackend::div_scalar(dst, constant, src))
    }

    fn div(&self, dst: &mut [f32], src0: &[f32], src1: &[f32]) {
        tiered!(self, generic::div(dst, src0, src1);
            Avx => AvxBackend::div(dst, src0, src1),
            Sse => SseBackend::div(dst, src0, src1))
    }

    fn mul_add(&self, dst: &mut [f32], constant: f32, src: &[f32]) {
        tiered!(self, generic::mul_add(dst, constant, src);
            Avx2 => Avx2Backend::mul_add(dst, constant, src),
            Sse => SseBackend::mul_add(dst, constant, src))
    }

    fn mul_sub(&self, dst: &mut [f32], constant: f32, src: &[f32]) {
        tiered!(self, generic::mul_sub(dst, constant, src);
            Avx2 => Avx2Backend::mul_sub(dst, constant, src),
            Sse => SseBackend::mul_sub(dst, constant, src))
    }

    fn dot_vec3_vec3s(&self, dst: &mut [f32], constant: &Vec3, src: &[Vec3]) {
        tiered!(self, generic::dot_vec3_vec3s(dst, constant, src);
            Sse => SseBackend::dot_vec3_vec3s(dst, constant, src))
    }

    fn dot_vec3_planes(&self, dst: &mut [f32], constant: &Vec3, src: &[Plane]) {
        tiered!(self, generic::dot_vec3_planes(dst, constant, src);
            Sse => SseBackend::dot_vec3_planes(dst, constant, src))
    }

    fn dot_vec3_verts(&self, dst: &mut [f32], constant: &Vec3, src: &[DrawVert]) {
        tiered!(self, generic::dot_vec3_verts(dst, constant, src);
            Sse => SseBackend::dot_vec3_verts(dst, constant, src))
    }

    fn dot_plane_vec3s(&self, dst: &mut [f32], constant: &Plane, src: &[Vec3]) {
        tiered!(self, generic::dot_plane_vec3s(dst, constant, src);
            Sse => SseBackend::dot_plane_vec3s(dst, constant, src))
    }

    fn dot_plane_planes(&self, dst: &mut [f32], constant: &Plane, src: &[Plane]) {
        tiered!(self, generic::dot_plane_planes(dst, constant, src);
            Sse => SseBackend::dot_plane_planes(dst, constant, src))
    }

    fn dot_plane_verts(&self, dst: &mut [f32], constant: &Plane, src: &[DrawVert]) {
        tiered!(self, generic::dot_plane_verts(dst, constant, src);
            Sse => SseBackend::dot_plane_verts(dst, constant, src))
    }

    fn dot_vec3s(&self, dst: &mut [f32], src0: &[Vec3], src1: &[Vec3]) {
        tiered!(self, generic::dot_vec3s(dst, src0, src1);
            Sse => SseBackend::dot_vec3s(dst, src0, src1))
    }

    fn dot(&self, src0: &[f32], src1: &[f32]) -> f32 {
        tiered!(self, generic::dot(src0, src1);
            Avx2 => Avx2Backend::dot(src0, src1),
            Sse => SseBackend::dot(src0, src1))
    }

    fn cmp_gt(&self, dst: &mut [u8], src: &[f32], constant: f32) {
        tiered!(self, generic::cmp_gt(dst, src, constant);
            Avx => AvxBackend::cmp_gt(dst, src, constant),
            Sse => SseBackend::cmp_gt(dst, src, constant))
    }

    fn cmp_ge(&self, dst: &mut [u8], src: &[f32], constant: f32) {
        tiered!(self, generic::cmp_ge(dst, src, constant);
            Avx => AvxBackend::cmp_ge(dst, src, constant),
            Sse => SseBackend::cmp_ge(dst, src, constant))
    }

    fn cmp_lt(&self, dst: &mut [u8], src: &[f32], constant: f32) {
        tiered!(self, generic::cmp_lt(dst, src, constant);
            Avx => AvxBackend::cmp_lt(dst, src, constant),
            Sse => SseBackend::cmp_lt(dst, src, constant))
    }

    fn cmp_le(&self, dst: &mut [u8], src: &[f32], constant: f32) {
        tiered!(self, generic::cmp_le(dst, src, constant);
            Avx => AvxBackend::cmp_le(dst, src, constant),
            Sse => SseBackend::cmp_le(dst, src, constant))
    }

    fn cmp_gt_bit(&self, dst: &mut [u8], bit: u8, src: &[f32], constant: f32) {
        tiered!(self, generic::cmp_gt_bit(dst, bit, src, constant);
            Avx => AvxBackend::cmp_gt_bit(dst, bit, src, constant),
            Sse => SseBackend::cmp_gt_bit(dst, bit, src, constant))
    }

    fn cmp_ge_bit(&self, dst: &mut [u8], bit: u8, src: &[f32], constant: f32) {
        tiered!(self, generic::cmp_ge_bit(dst, bit, src, constant);
            Avx => AvxBackend::cmp_ge_bit(dst, bit, src, constant),
            Sse => SseBackend::cmp_ge_bit(dst, bit, src, constant))
    }

    fn cmp_lt_bit(&self, dst: &mut [u8], bit: u8, src: &[f32], constant: f32) {
        tiered!(self, generic::cmp_lt_bit(dst, bit, src, constant);
            Avx => AvxBackend::cmp_lt_bit(dst, bit, src, constant),
            Sse => SseBackend::cmp_lt_bit(dst, bit, src, constant))
    }

    fn cmp_le_bit(&self, dst: &mut [u8], bit: u8, src: &[f32], constant: f32) {
        tiered!(self, generic::cmp_le_bit(dst, bit, src, constant);
            Avx => AvxBackend::cmp_le_bit(dst, bit, src, constant),
            Sse => SseBackend::cmp_le_bit(dst, bit, src, constant))
    }

    fn min_max(&self, src: &[f32]) -> (f32, f32) {
        tiered!(self, generic::min_max(src);
            Avx => AvxBackend::min_max(src),
            Sse => SseBackend::min_max(src))
    }

    fn clamp(&self, dst: &mut [f32], src: &[f32], min: f32, max: f32) {
        tiered!(self, generic::clamp(dst, src, min, max);
            Avx => AvxBackend::clamp(dst, src, min, max),
            Sse => SseBackend::clamp(dst, src, min, max))
    }

    fn clamp_min(&self, dst: &mut [f32], src: &[f32], min: f32) {
        tiered!(self, generic::clamp_min(dst, src, min);
            Avx => AvxBackend::clamp_min(dst, src, min),
            Sse => SseBackend::clamp_min(dst, src, min))
    }

    fn clamp_max(&self, dst: &mut [f32], src: &[f32], max: f32) {
        tiered!(self, generic::clamp_max(dst, src, max);
            Avx => AvxBackend::clamp_max(dst, src, max),
            Sse => SseBackend::clamp_max(dst, src, max))
    }

    fn memcpy(&self, dst: &mut [u8], src: &[u8]) {
        tiered!(self, generic::memcpy(dst, src);
            Sse2 => Sse2Backend::memcpy(dst, src))
    }

    fn memset(&self, dst: &mut [u8], value: u8) {
        tiered!(self, generic::memset(dst, value);
            Sse2 => Sse2Backend::memset(dst, value))
    }

    fn negate(&self, dst: &mut [f32]) {
        tiered!(self, generic::negate(dst);
            Avx => AvxBackend::negate(dst),
            Sse => SseBackend::negate(dst))
    }

    fn matx_multiply_vecx(&self, dst: &mut VecX, mat: &MatX, vec: &VecX) {
        tiered!(self, generic::matx_multiply_vecx(dst, mat, vec);
            Avx2 => Avx2Backend::matx_multiply_vecx(dst, mat, vec))
    }

    fn matx_multiply_add_vecx(&self, dst: &mut VecX, mat: &MatX, vec: &VecX) {
        tiered!(self, generic::matx_multiply_add_vecx(dst, mat, vec);
            Avx2 => Avx2Backend::matx_multiply_add_vecx(dst, mat, vec))
    }

    fn matx_multiply_sub_vecx(&self, dst: &mut VecX, mat: &MatX, vec: &VecX) {
        tiered!(self, generic::matx_multiply_sub_vecx(dst, mat, vec);
            Avx2 => Avx2Backend::matx_multiply_sub_vecx(dst, mat, vec))
    }

    fn matx_transpose_multiply_vecx(&self, dst: &mut VecX, mat: &MatX, vec: &VecX) {
        tiered!(self, generic::matx_transpose_multiply_vecx(dst, mat, vec);
            Avx => AvxBackend::matx_transpose_multiply_vecx(dst, mat, vec))
    }

    fn matx_transpose_multiply_add_vecx(&self, dst: &mut VecX, mat: &MatX, vec: &VecX) {
        tiered!(self, generic::matx_transpose_multiply_add_vecx(dst, mat, vec);
            Avx => AvxBackend::matx_transpose_multiply_add_vecx(dst, mat, vec))
    }

    fn matx_transpose_multiply_sub_vecx(&self, dst: &mut VecX, mat: &MatX, vec: &VecX) {
        tiered!(self, generic::matx_transpose_multiply_sub_vecx(dst, mat, vec);
            Avx => AvxBackend::matx_transpose_multiply_sub_vecx(dst, mat, vec))
    }

    fn matx_multiply_matx(&self, dst: &mut MatX, m1: &MatX, m2: &MatX) {
        tiered!(self, generic::matx_multiply_matx(dst, m1, m2);
            Avx => AvxBackend::matx_multiply_matx(dst, m1, m2))
    }

    fn matx_transpose_multiply_matx(&self, dst: &mut MatX, m1: &MatX, m2: &MatX) {
        tiered!(self, generic::matx_transpose_multiply_matx(dst, m1, m2);
            Avx => AvxBackend::matx_transpose_multiply_matx(dst, m1, m2))
    }

    fn transform_verts(
        &self,
        verts: &mut [DrawVert],
        joints: &[JointMat],
        weights: &[Vec4],
        index: &[JointWeight],
    ) {
        tiered!(self, generic::transform_verts(verts, joints, weights, index);
            Sse => SseBackend::transform_verts(verts, joints, weights, index))
    }

    fn trace_point_cull(
        &self,
        cull_bits: &mut [u8],
        radius: f32,
        planes: &[Plane],
        verts: &[DrawVert],
    ) -> u8 {
        match <&[Plane; 4]>::try_from(planes) {
            Ok(four) => tiered!(self, generic::trace_point_cull(cull_bits, radius, planes, verts);
                Sse => SseBackend::trace_point_cull(cull_bits, radius, four, verts)),
            Err(_) => generic::trace_point_cull(cull_bits, radius, planes, verts),
        }
    }

    fn decal_point_cull(&self, cull_bits: &mut [u8], planes: &[Plane; 6], verts: &[DrawVert]) {
        tiered!(self, generic::decal_point_cull(cull_bits, planes, verts);
            Sse => SseBackend::decal_point_cull(cull_bits, planes, verts))
    }

    fn overlay_point_cull(
        &self,
        cull_bits: &mut [u8],
        tex_coords: &mut [Vec2],
        planes: &[Plane; 2],
        verts: &[DrawVert],
    ) {
        tiered!(self, generic::overlay_point_cull(cull_bits, tex_coords, planes, verts);
            Sse => SseBackend::overlay_point_cull(cull_bits, tex_coords, planes, verts))
    }

    fn normalize_tangents(&self, verts: &mut [DrawVert]) {
        tiered!(self, generic::normalize_tangents(verts);
            Sse => SseBackend::normalize_tangents(verts))
    }

    fn create_shadow_cache(
        &self,
        vertex_cache: &mut [Vec4],
        vert_remap: &mut [i32],
        light_origin: &Vec3,
        verts: &[DrawVert],
    ) -> usize {
        tiered!(self, generic::create_shadow_cache(vertex_cache, vert_remap, light_origin, verts);
            Sse => SseBackend::create_shadow_cache(vertex_cache, vert_remap, light_origin, verts))
    }

    fn create_vertex_program_shadow_cache(
        &self,
        vertex_cache: &mut [Vec4],
        verts: &[DrawVert],
    ) -> usize {
        tiered!(self, generic::create_vertex_program_shadow_cache(vertex_cache, verts);
            Sse => SseBackend::create_vertex_program_shadow_cache(vertex_cache, verts))
    }

    fn compress_rgtc_from_rgba8(
        &self,
        src: &[u8],
        width: usize,
        height: usize,
        stride: usize,
        dst: &mut [u8],
    ) {
        tiered!(self, generic::compress_rgtc_from_rgba8(src, width, height, stride, dst);
            Ssse3 => Ssse3Backend::compress_rgtc_from_rgba8(src, width, height, stride, dst),
            Sse2 => Sse2Backend::compress_rgtc_from_rgba8(src, width, height, stride, dst))
    }

    fn up_sample_pcm_to_44khz(
        &self,
        dest: &mut [f32],
        pcm: &[i16],
        rate: SampleRate,
        channels: Channels,
    ) {
        tiered!(self, generic::up_sample_pcm_to_44khz(dest, pcm, rate, channels);
            Sse2 => Sse2Backend::up_sample_pcm_to_44khz(dest, pcm, rate, channels))
    }

    fn up_sample_ogg_to_44khz(
        &self,
        dest: &mut [f32],
        ogg: &[&[f32]],
        num_samples: usize,
        rate: SampleRate,
        channels: Channels,
    ) {
        tiered!(self, generic::up_sample_ogg_to_44khz(dest, ogg, num_samples, rate, channels);
            Sse => SseBackend::up_sample_ogg_to_44khz(dest, ogg, num_samples, rate, channels))
    }

    fn mix_sound_two_speaker_mono(
        &self,
        mix: &mut [f32],
        samples: &[f32],
        num_samples: usize,
        last: &[f32; 2],
        current: &[f32; 2],
    ) {
        tiered!(self, generic::mix_sound_two_speaker_mono(mix, samples, num_samples, last, current);
            Sse => SseBackend::mix_sound_two_speaker_mono(mix, samples, num_samples, last, current))
    }

    fn mix_sound_two_speaker_stereo(
        &self,
        mix: &mut [f32],
        samples: &[f32],
        num_samples: usize,
        last: &[f32; 2],
        current: &[f32; 2],
    ) {
        let n = num_samples;
        tiered!(self, generic::mix_sound_two_speaker_stereo(mix, samples, n, last, current);
            Sse => SseBackend::mix_sound_two_speaker_stereo(mix, samples, n, last, current))
    }

    fn mix_sound_six_speaker_mono(
        &self,
        mix: &mut [f32],
        samples: &[f32],
        num_samples: usize,
        last: &[f32; 6],
        current: &[f32; 6],
    ) {
        let n = num_samples;
        tiered!(self, generic::mix_sound_six_speaker_mono(mix, samples, n, last, current);
            Sse => SseBackend::mix_sound_six_speaker_mono(mix, samples, n, last, current))
    }

    fn mix_sound_six_speaker_stereo(
        &self,
        mix: &mut [f32],
        samples: &[f32],
        num_samples: usize,
        last: &[f32; 6],
        current: &[f32; 6],
    ) {
        let n = num_samples;
        tiered!(self, generic::mix_sound_six_speaker_stereo(mix, samples, n, last, current);
            Sse => SseBackend::mix_sound_six_speaker_stereo(mix, samples, n, last, current))
    }

    fn mixed_sound_to_samples(&self, samples: &mut [i16], mix: &[f32]) {
        tiered!(self, generic::mixed_sound_to_samples(samples, mix);
            Sse2 => Sse2Backend::mixed_sound_to_samples(samples, mix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exec_clamped_to_host() {
        let p = X86Processor::with_host_tier(Backend::Avx2, Backend::Sse2);
        assert_eq!(p.backend(), Backend::Avx2);
        assert_eq!(p.name(), "AVX2");
        assert_eq!(p.executing(), Backend::Sse2);

        let p = X86Processor::with_host_tier(Backend::Sse, Backend::Avx2);
        assert_eq!(p.executing(), Backend::Sse);
    }

    #[test]
    fn test_clamped_processor_still_computes() {
        for host in Backend::ALL {
            let host = host.min(Backend::best_for(&detect::detect()));
            let p = X86Processor::with_host_tier(Backend::Avx2, host);
            let mut dst = [0.0f32; 9];
            p.mul_scalar(&mut dst, 2.0, &[1.0; 9]);
            assert_eq!(dst, [2.0; 9]);
        }
    }

    #[test]
    fn test_trace_cull_with_fewer_planes_uses_reference() {
        let p = X86Processor::new(Backend::Sse);
        let planes = [Plane::new(1.0, 0.0, 0.0, 0.0)];
        let verts = [DrawVert::at(Vec3::new(1.0, 0.0, 0.0))];
        let mut bits = [0u8; 1];
        assert_eq!(p.trace_point_cull(&mut bits, 0.0, &planes, &verts), 0x01);
    }
}
