//! Backend implementations of the kernel catalogue
//!
//! Every backend implements [`SimdProcessor`]. The trait's default method bodies
//! are the reference kernels in [`generic`], so a backend overrides exactly the
//! operations it accelerates and inherits the rest.
//!
//! # Safety
//!
//! All `unsafe` code is isolated within the per-tier kernel modules. The trait
//! itself and every processor are 100% safe to call: a processor only enters a
//! `#[target_feature]` kernel after the host has been verified to support it.
//!
//! # Backends
//!
//! - `generic`: portable reference implementation (no SIMD), the verification oracle
//! - `x86`: tiered processor dispatching to the kernels below
//! - `sse`, `sse2`, `ssse3`: x86_64 128-bit kernels
//! - `avx`, `avx2`: x86_64 256-bit kernels (AVX2 tier also uses FMA3)

use crate::audio::{Channels, SampleRate};
use crate::math::{
    DominantTri, DrawVert, JointMat, JointQuat, JointWeight, MatX, Plane, Vec2, Vec3, Vec4, VecX,
};
use crate::Backend;

pub mod generic;

#[cfg(target_arch = "x86_64")]
pub mod x86;

#[cfg(target_arch = "x86_64")]
pub mod sse;

#[cfg(target_arch = "x86_64")]
pub mod sse2;

#[cfg(target_arch = "x86_64")]
pub mod ssse3;

#[cfg(target_arch = "x86_64")]
pub mod avx;

#[cfg(target_arch = "x86_64")]
pub mod avx2;

pub use generic::GenericProcessor;

#[cfg(target_arch = "x86_64")]
pub use x86::X86Processor;

/// The kernel catalogue every backend honours
///
/// Results are identical across backends up to floating-point rounding. Slice
/// lengths carry the element count: the output slice decides how many elements
/// are processed, and shorter inputs panic. No operation reports errors; inputs
/// outside an operation's domain (a near-zero divisor, a singular system) give
/// unspecified but memory-safe results.
///
/// The trait is object safe, so a selected backend is held as
/// `Box<dyn SimdProcessor>`.
pub trait SimdProcessor: Send + Sync {
    /// Tier this processor was built for
    fn backend(&self) -> Backend;

    /// Display name of the tier
    fn name(&self) -> &'static str {
        self.backend().name()
    }

    // ----- arithmetic -----

    /// `dst[i] = constant + src[i]`
    fn add_scalar(&self, dst: &mut [f32], constant: f32, src: &[f32]) {
        generic::add_scalar(dst, constant, src)
    }
    /// `dst[i] = src0[i] + src1[i]`
    fn add(&self, dst: &mut [f32], src0: &[f32], src1: &[f32]) {
        generic::add(dst, src0, src1)
    }
    /// `dst[i] = constant - src[i]`
    fn sub_scalar(&self, dst: &mut [f32], constant: f32, src: &[f32]) {
        generic::sub_scalar(dst, constant, src)
    }
    /// `dst[i] = src0[i] - src1[i]`
    fn sub(&self, dst: &mut [f32], src0: &[f32], src1: &[f32]) {
        generic::sub(dst, src0, src1)
    }
    /// `dst[i] = constant * src[i]`
    fn mul_scalar(&self, dst: &mut [f32], constant: f32, src: &[f32]) {
        generic::mul_scalar(dst, constant, src)
    }
    /// `dst[i] = src0[i] * src1[i]`
    fn mul(&self, dst: &mut [f32], src0: &[f32], src1: &[f32]) {
        generic::mul(dst, src0, src1)
    }
    /// `dst[i] = constant / src[i]`
    fn div_scalar(&self, dst: &mut [f32], constant: f32, src: &[f32]) {
        generic::div_scalar(dst, constant, src)
    }
    /// `dst[i] = src0[i] / src1[i]`
    fn div(&self, dst: &mut [f32], src0: &[f32], src1: &[f32]) {
        generic::div(dst, src0, src1)
    }
    /// `dst[i] += constant * src[i]`
    fn mul_add(&self, dst: &mut [f32], constant: f32, src: &[f32]) {
        generic::mul_add(dst, constant, src)
    }
    /// `dst[i] -= constant * src[i]`
    fn mul_sub(&self, dst: &mut [f32], constant: f32, src: &[f32]) {
        generic::mul_sub(dst, constant, src)
    }

    // ----- dot products -----

    fn dot_vec3_vec3s(&self, dst: &mut [f32], constant: &Vec3, src: &[Vec3]) {
        generic::dot_vec3_vec3s(dst, constant, src)
    }
    fn dot_vec3_planes(&self, dst: &mut [f32], constant: &Vec3, src: &[Plane]) {
        generic::dot_vec3_planes(dst, constant, src)
    }
    fn dot_vec3_verts(&self, dst: &mut [f32], constant: &Vec3, src: &[DrawVert]) {
        generic::dot_vec3_verts(dst, constant, src)
    }
    fn dot_plane_vec3s(&self, dst: &mut [f32], constant: &Plane, src: &[Vec3]) {
        generic::dot_plane_vec3s(dst, constant, src)
    }
    fn dot_plane_planes(&self, dst: &mut [f32], constant: &Plane, src: &[Plane]) {
        generic::dot_plane_planes(dst, constant, src)
    }
    fn dot_plane_verts(&self, dst: &mut [f32], constant: &Plane, src: &[DrawVert]) {
        generic::dot_plane_verts(dst, constant, src)
    }
    fn dot_vec3s(&self, dst: &mut [f32], src0: &[Vec3], src1: &[Vec3]) {
        generic::dot_vec3s(dst, src0, src1)
    }
    /// Sum of `src0[i] * src1[i]` over `src0.len()` elements
    fn dot(&self, src0: &[f32], src1: &[f32]) -> f32 {
        generic::dot(src0, src1)
    }

    // ----- comparisons -----

    fn cmp_gt(&self, dst: &mut [u8], src: &[f32], constant: f32) {
        generic::cmp_gt(dst, src, constant)
    }
    fn cmp_ge(&self, dst: &mut [u8], src: &[f32], constant: f32) {
        generic::cmp_ge(dst, src, constant)
    }
    fn cmp_lt(&self, dst: &mut [u8], src: &[f32], constant: f32) {
        generic::cmp_lt(dst, src, constant)
    }
    fn cmp_le(&self, dst: &mut [u8], src: &[f32], constant: f32) {
        generic::cmp_le(dst, src, constant)
    }
    /// `dst[i] |= (src[i] > constant) << bit`
    fn cmp_gt_bit(&self, dst: &mut [u8], bit: u8, src: &[f32], constant: f32) {
        generic::cmp_gt_bit(dst, bit, src, constant)
    }
    fn cmp_ge_bit(&self, dst: &mut [u8], bit: u8, src: &[f32], constant: f32) {
        generic::cmp_ge_bit(dst, bit, src, constant)
    }
    fn cmp_lt_bit(&self, dst: &mut [u8], bit: u8, src: &[f32], constant: f32) {
        generic::cmp_lt_bit(dst, bit, src, constant)
    }
    fn cmp_le_bit(&self, dst: &mut [u8], bit: u8, src: &[f32], constant: f32) {
        generic::cmp_le_bit(dst, bit, src, constant)
    }

    // ----- min / max / clamp -----

    fn min_max(&self, src: &[f32]) -> (f32, f32) {
        generic::min_max(src)
    }
    fn min_max_vec2(&self, src: &[Vec2]) -> (Vec2, Vec2) {
        generic::min_max_vec2(src)
    }
    fn min_max_vec3(&self, src: &[Vec3]) -> (Vec3, Vec3) {
        generic::min_max_vec3(src)
    }
    fn min_max_verts(&self, src: &[DrawVert]) -> (Vec3, Vec3) {
        generic::min_max_verts(src)
    }
    fn min_max_verts_indexed(&self, src: &[DrawVert], indexes: &[u32]) -> (Vec3, Vec3) {
        generic::min_max_verts_indexed(src, indexes)
    }
    fn clamp(&self, dst: &mut [f32], src: &[f32], min: f32, max: f32) {
        generic::clamp(dst, src, min, max)
    }
    fn clamp_min(&self, dst: &mut [f32], src: &[f32], min: f32) {
        generic::clamp_min(dst, src, min)
    }
    fn clamp_max(&self, dst: &mut [f32], src: &[f32], max: f32) {
        generic::clamp_max(dst, src, max)
    }

    // ----- memory -----

    fn memcpy(&self, dst: &mut [u8], src: &[u8]) {
        generic::memcpy(dst, src)
    }
    fn memset(&self, dst: &mut [u8], value: u8) {
        generic::memset(dst, value)
    }
    fn negate(&self, dst: &mut [f32]) {
        generic::negate(dst)
    }

    // ----- dense linear algebra -----

    fn matx_multiply_vecx(&self, dst: &mut VecX, mat: &MatX, vec: &VecX) {
        generic::matx_multiply_vecx(dst, mat, vec)
    }
    fn matx_multiply_add_vecx(&self, dst: &mut VecX, mat: &MatX, vec: &VecX) {
        generic::matx_multiply_add_vecx(dst, mat, vec)
    }
    fn matx_multiply_sub_vecx(&self, dst: &mut VecX, mat: &MatX, vec: &VecX) {
        generic::matx_multiply_sub_vecx(dst, mat, vec)
    }
    fn matx_transpose_multiply_vecx(&self, dst: &mut VecX, mat: &MatX, vec: &VecX) {
        generic::matx_transpose_multiply_vecx(dst, mat, vec)
    }
    fn matx_transpose_multiply_add_vecx(&self, dst: &mut VecX, mat: &MatX, vec: &VecX) {
        generic::matx_transpose_multiply_add_vecx(dst, mat, vec)
    }
    fn matx_transpose_multiply_sub_vecx(&self, dst: &mut VecX, mat: &MatX, vec: &VecX) {
        generic::matx_transpose_multiply_sub_vecx(dst, mat, vec)
    }
    fn matx_multiply_matx(&self, dst: &mut MatX, m1: &MatX, m2: &MatX) {
        generic::matx_multiply_matx(dst, m1, m2)
    }
    fn matx_transpose_multiply_matx(&self, dst: &mut MatX, m1: &MatX, m2: &MatX) {
        generic::matx_transpose_multiply_matx(dst, m1, m2)
    }
    fn matx_lower_triangular_solve(
        &self,
        l: &MatX,
        x: &mut [f32],
        b: &[f32],
        n: usize,
        skip: usize,
    ) {
        generic::matx_lower_triangular_solve(l, x, b, n, skip)
    }
    fn matx_lower_triangular_solve_transpose(&self, l: &MatX, x: &mut [f32], b: &[f32], n: usize) {
        generic::matx_lower_triangular_solve_transpose(l, x, b, n)
    }
    /// In-place LDLᵀ of the leading `n x n` block; `false` on a zero pivot
    fn matx_ldlt_factor(&self, mat: &mut MatX, inv_diag: &mut VecX, n: usize) -> bool {
        generic::matx_ldlt_factor(mat, inv_diag, n)
    }

    // ----- skeletal animation -----

    fn blend_joints(
        &self,
        joints: &mut [JointQuat],
        blend: &[JointQuat],
        lerp: f32,
        index: &[u32],
    ) {
        generic::blend_joints(joints, blend, lerp, index)
    }
    fn convert_joint_quats_to_joint_mats(&self, dst: &mut [JointMat], src: &[JointQuat]) {
        generic::convert_joint_quats_to_joint_mats(dst, src)
    }
    fn convert_joint_mats_to_joint_quats(&self, dst: &mut [JointQuat], src: &[JointMat]) {
        generic::convert_joint_mats_to_joint_quats(dst, src)
    }
    fn transform_joints(&self, mats: &mut [JointMat], parents: &[i32], first: usize, last: usize) {
        generic::transform_joints(mats, parents, first, last)
    }
    fn untransform_joints(
        &self,
        mats: &mut [JointMat],
        parents: &[i32],
        first: usize,
        last: usize,
    ) {
        generic::untransform_joints(mats, parents, first, last)
    }
    fn transform_verts(
        &self,
        verts: &mut [DrawVert],
        joints: &[JointMat],
        weights: &[Vec4],
        index: &[JointWeight],
    ) {
        generic::transform_verts(verts, joints, weights, index)
    }

    // ----- culling -----

    fn trace_point_cull(
        &self,
        cull_bits: &mut [u8],
        radius: f32,
        planes: &[Plane],
        verts: &[DrawVert],
    ) -> u8 {
        generic::trace_point_cull(cull_bits, radius, planes, verts)
    }
    fn decal_point_cull(&self, cull_bits: &mut [u8], planes: &[Plane; 6], verts: &[DrawVert]) {
        generic::decal_point_cull(cull_bits, planes, verts)
    }
    fn overlay_point_cull(
        &self,
        cull_bits: &mut [u8],
        tex_coords: &mut [Vec2],
        planes: &[Plane; 2],
        verts: &[DrawVert],
    ) {
        generic::overlay_point_cull(cull_bits, tex_coords, planes, verts)
    }

    // ----- surface derivation -----

    fn derive_tri_planes(&self, planes: &mut [Plane], verts: &[DrawVert], indexes: &[u32]) {
        generic::derive_tri_planes(planes, verts, indexes)
    }
    fn derive_tangents(&self, planes: &mut [Plane], verts: &mut [DrawVert], indexes: &[u32]) {
        generic::derive_tangents(planes, verts, indexes)
    }
    fn derive_unsmoothed_tangents(&self, verts: &mut [DrawVert], dominant_tris: &[DominantTri]) {
        generic::derive_unsmoothed_tangents(verts, dominant_tris)
    }
    fn normalize_tangents(&self, verts: &mut [DrawVert]) {
        generic::normalize_tangents(verts)
    }

    // ----- shadow volumes -----

    fn create_shadow_cache(
        &self,
        vertex_cache: &mut [Vec4],
        vert_remap: &mut [i32],
        light_origin: &Vec3,
        verts: &[DrawVert],
    ) -> usize {
        generic::create_shadow_cache(vertex_cache, vert_remap, light_origin, verts)
    }
    fn create_vertex_program_shadow_cache(
        &self,
        vertex_cache: &mut [Vec4],
        verts: &[DrawVert],
    ) -> usize {
        generic::create_vertex_program_shadow_cache(vertex_cache, verts)
    }

    // ----- texture compression -----

    fn compress_rgtc_from_rgba8(
        &self,
        src: &[u8],
        width: usize,
        height: usize,
        stride: usize,
        dst: &mut [u8],
    ) {
        generic::compress_rgtc_from_rgba8(src, width, height, stride, dst)
    }

    // ----- audio -----

    fn up_sample_pcm_to_44khz(
        &self,
        dest: &mut [f32],
        pcm: &[i16],
        rate: SampleRate,
        channels: Channels,
    ) {
        generic::up_sample_pcm_to_44khz(dest, pcm, rate, channels)
    }
    fn up_sample_ogg_to_44khz(
        &self,
        dest: &mut [f32],
        ogg: &[&[f32]],
        num_samples: usize,
        rate: SampleRate,
        channels: Channels,
    ) {
        generic::up_sample_ogg_to_44khz(dest, ogg, num_samples, rate, channels)
    }
    fn mix_sound_two_speaker_mono(
        &self,
        mix: &mut [f32],
        samples: &[f32],
        num_samples: usize,
        last: &[f32; 2],
        current: &[f32; 2],
    ) {
        generic::mix_sound_two_speaker_mono(mix, samples, num_samples, last, current)
    }
    fn mix_sound_two_speaker_stereo(
        &self,
        mix: &mut [f32],
        samples: &[f32],
        num_samples: usize,
        last: &[f32; 2],
        current: &[f32; 2],
    ) {
        generic::mix_sound_two_speaker_stereo(mix, samples, num_samples, last, current)
    }
    fn mix_sound_six_speaker_mono(
        &self,
        mix: &mut [f32],
        samples: &[f32],
        num_samples: usize,
        last: &[f32; 6],
        current: &[f32; 6],
    ) {
        generic::mix_sound_six_speaker_mono(mix, samples, num_samples, last, current)
    }
    fn mix_sound_six_speaker_stereo(
        &self,
        mix: &mut [f32],
        samples: &[f32],
        num_samples: usize,
        last: &[f32; 6],
        current: &[f32; 6],
    ) {
        generic::mix_sound_six_speaker_stereo(mix, samples, num_samples, last, current)
    }
    fn mixed_sound_to_samples(&self, samples: &mut [i16], mix: &[f32]) {
        generic::mixed_sound_to_samples(samples, mix)
    }
}
