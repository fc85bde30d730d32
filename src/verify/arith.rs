//! Group 1: elementwise arithmetic, dot products, compares, min/max, clamp,
//! memory and negate

use std::io::Write;

use super::compare::{all_approx, all_within, dot_agrees};
use super::{inputs, VerificationHarness};
use crate::backends::SimdProcessor;
use crate::error::Result;
use crate::math::Vec3;

type ScalarOp = fn(&dyn SimdProcessor, &mut [f32], f32, &[f32]);
type BinaryOp = fn(&dyn SimdProcessor, &mut [f32], &[f32], &[f32]);
type CompareOp = fn(&dyn SimdProcessor, &mut [u8], &[f32], f32);
type CompareBitOp = fn(&dyn SimdProcessor, &mut [u8], u8, &[f32], f32);

/// Prefix lengths for the multiply-accumulate kernels
const PREFIX_LENGTHS: [usize; 3] = [16, 19, 22];

/// Lengths for the flat dot product, including empty and tail-only inputs
const DOT_LENGTHS: [usize; 5] = [0, 1, 5, 13, 25];

const COPY_MAX: usize = 8192;

pub(super) fn run<W: Write>(h: &mut VerificationHarness<'_, W>) -> Result<()> {
    let count = h.config().count();
    let rng = h.rng();
    let src0 = inputs::floats(rng, count, 10.0);
    let src1 = inputs::divisors(rng, count, 10.0, 0.01);

    elementwise(h, count, &src0, &src1)?;
    multiply_accumulate(h, &src0, &src1)?;
    dot_products(h, count)?;
    comparisons(h, count, &src0)?;
    min_max(h, count)?;
    clamps(h, count, &src0)?;
    memory(h, count)?;

    h.compare(
        "negate( float[] )",
        count,
        || src0.clone(),
        |p, d| p.negate(d),
        |a, b| a == b,
    )?;
    Ok(())
}

fn elementwise<W: Write>(
    h: &mut VerificationHarness<'_, W>,
    count: usize,
    src0: &[f32],
    src1: &[f32],
) -> Result<()> {
    let scalar: [(&str, ScalarOp, &[f32]); 4] = [
        ("add( float + float[] )", |p, d, c, s| p.add_scalar(d, c, s), src0),
        ("sub( float - float[] )", |p, d, c, s| p.sub_scalar(d, c, s), src0),
        ("mul( float * float[] )", |p, d, c, s| p.mul_scalar(d, c, s), src0),
        ("div( float / float[] )", |p, d, c, s| p.div_scalar(d, c, s), src1),
    ];
    for (label, f, src) in scalar {
        h.compare(
            label,
            count,
            || vec![0.0f32; count],
            |p, d| f(p, d, 4.0, src),
            |a, b| all_within(a, b, 1e-5),
        )?;
    }

    let binary: [(&str, BinaryOp, f32); 4] = [
        ("add( float[] + float[] )", |p, d, a, b| p.add(d, a, b), 1e-5),
        ("sub( float[] - float[] )", |p, d, a, b| p.sub(d, a, b), 1e-5),
        ("mul( float[] * float[] )", |p, d, a, b| p.mul(d, a, b), 1e-5),
        ("div( float[] / float[] )", |p, d, a, b| p.div(d, a, b), 1e-3),
    ];
    for (label, f, eps) in binary {
        h.compare(
            label,
            count,
            || vec![0.0f32; count],
            |p, d| f(p, d, src0, src1),
            |a, b| all_within(a, b, eps),
        )?;
    }
    Ok(())
}

fn multiply_accumulate<W: Write>(
    h: &mut VerificationHarness<'_, W>,
    src0: &[f32],
    src1: &[f32],
) -> Result<()> {
    for n in PREFIX_LENGTHS {
        let n = n.min(src0.len());
        h.compare(
            &format!("mul_add( float * float[{n}] )"),
            n,
            || src0[..n].to_vec(),
            |p, d| p.mul_add(d, 0.75, &src1[..n]),
            |a, b| all_approx(a, b, 1e-5),
        )?;
        h.compare(
            &format!("mul_sub( float * float[{n}] )"),
            n,
            || src0[..n].to_vec(),
            |p, d| p.mul_sub(d, 0.75, &src1[..n]),
            |a, b| all_approx(a, b, 1e-5),
        )?;
    }
    Ok(())
}

fn dot_products<W: Write>(h: &mut VerificationHarness<'_, W>, count: usize) -> Result<()> {
    let rng = h.rng();
    let v = inputs::vec3(rng, 10.0);
    let plane = inputs::plane(rng, 10.0);
    let vecs0 = inputs::vec3s(rng, count, 10.0);
    let vecs1 = inputs::vec3s(rng, count, 10.0);
    let planes = inputs::planes(rng, count, 10.0);
    let verts = inputs::verts(rng, count, 10.0);
    let flat0 = inputs::floats(rng, count, 10.0);
    let flat1 = inputs::floats(rng, count, 10.0);

    let out = || vec![0.0f32; count];
    let agree = |a: &Vec<f32>, b: &Vec<f32>| all_within(a, b, 1e-5);

    h.compare("dot( vec3 * vec3[] )", count, out, |p, d| p.dot_vec3_vec3s(d, &v, &vecs0), agree)?;
    h.compare(
        "dot( vec3 * plane[] )",
        count,
        out,
        |p, d| p.dot_vec3_planes(d, &v, &planes),
        agree,
    )?;
    h.compare(
        "dot( vec3 * drawvert[] )",
        count,
        out,
        |p, d| p.dot_vec3_verts(d, &v, &verts),
        agree,
    )?;
    h.compare(
        "dot( plane * vec3[] )",
        count,
        out,
        |p, d| p.dot_plane_vec3s(d, &plane, &vecs0),
        agree,
    )?;
    h.compare(
        "dot( plane * plane[] )",
        count,
        out,
        |p, d| p.dot_plane_planes(d, &plane, &planes),
        agree,
    )?;
    h.compare(
        "dot( plane * drawvert[] )",
        count,
        out,
        |p, d| p.dot_plane_verts(d, &plane, &verts),
        agree,
    )?;
    h.compare(
        "dot( vec3[] * vec3[] )",
        count,
        out,
        |p, d| p.dot_vec3s(d, &vecs0, &vecs1),
        |a, b| all_within(a, b, 1e-4),
    )?;

    for n in DOT_LENGTHS.into_iter().chain([count]) {
        let n = n.min(count);
        let (x, y) = (&flat0[..n], &flat1[..n]);
        h.compare(
            &format!("dot( float[{n}] * float[{n}] )"),
            n,
            || 0.0f32,
            |p, d| *d = p.dot(x, y),
            |a, b| dot_agrees(*a, *b, x, y, 1e-4),
        )?;
    }
    Ok(())
}

fn comparisons<W: Write>(
    h: &mut VerificationHarness<'_, W>,
    count: usize,
    src: &[f32],
) -> Result<()> {
    let bytes: [(&str, CompareOp); 4] = [
        ("cmp_gt( float[] > float )", |p, d, s, c| p.cmp_gt(d, s, c)),
        ("cmp_ge( float[] >= float )", |p, d, s, c| p.cmp_ge(d, s, c)),
        ("cmp_lt( float[] < float )", |p, d, s, c| p.cmp_lt(d, s, c)),
        ("cmp_le( float[] <= float )", |p, d, s, c| p.cmp_le(d, s, c)),
    ];
    for (label, f) in bytes {
        h.compare(label, count, || vec![0xAAu8; count], |p, d| f(p, d, src, 0.0), |a, b| a == b)?;
    }

    let rng = h.rng();
    let prior: Vec<u8> = (0..count).map(|_| rng.random_int_max(256) as u8).collect();
    let bit = rng.random_int_max(8) as u8;

    let bits: [(&str, CompareBitOp); 4] = [
        ("cmp_gt_bit( float[] > float )", |p, d, b, s, c| p.cmp_gt_bit(d, b, s, c)),
        ("cmp_ge_bit( float[] >= float )", |p, d, b, s, c| p.cmp_ge_bit(d, b, s, c)),
        ("cmp_lt_bit( float[] < float )", |p, d, b, s, c| p.cmp_lt_bit(d, b, s, c)),
        ("cmp_le_bit( float[] <= float )", |p, d, b, s, c| p.cmp_le_bit(d, b, s, c)),
    ];
    for (label, f) in bits {
        h.compare(
            label,
            count,
            || prior.clone(),
            |p, d| f(p, d, bit, src, 0.0),
            // exact, and no previously set bit may be cleared
            |a, b| a == b && b.iter().zip(&prior).all(|(now, was)| now & was == *was),
        )?;
    }
    Ok(())
}

fn min_max<W: Write>(h: &mut VerificationHarness<'_, W>, count: usize) -> Result<()> {
    let rng = h.rng();
    let floats = inputs::floats(rng, count, 10.0);
    let vec2s = inputs::vec2s(rng, count, 10.0);
    let vec3s = inputs::vec3s(rng, count, 10.0);
    let verts = inputs::verts(rng, count, 10.0);
    let indexes = inputs::indexes(rng, count / 2, count);

    h.compare(
        "min_max( float[] )",
        count,
        || (0.0, 0.0),
        |p, r| *r = p.min_max(&floats),
        |a, b| a == b,
    )?;
    h.compare(
        "min_max( vec2[] )",
        count,
        Default::default,
        |p, r| *r = p.min_max_vec2(&vec2s),
        |a, b| a == b,
    )?;
    h.compare(
        "min_max( vec3[] )",
        count,
        || (Vec3::ZERO, Vec3::ZERO),
        |p, r| *r = p.min_max_vec3(&vec3s),
        |a, b| a == b,
    )?;
    h.compare(
        "min_max( drawvert[] )",
        count,
        || (Vec3::ZERO, Vec3::ZERO),
        |p, r| *r = p.min_max_verts(&verts),
        |a, b| a == b,
    )?;
    h.compare(
        "min_max( drawvert[], indexes[] )",
        indexes.len(),
        || (Vec3::ZERO, Vec3::ZERO),
        |p, r| *r = p.min_max_verts_indexed(&verts, &indexes),
        |a, b| a == b,
    )?;
    Ok(())
}

fn clamps<W: Write>(h: &mut VerificationHarness<'_, W>, count: usize, src: &[f32]) -> Result<()> {
    let out = || vec![0.0f32; count];
    h.compare("clamp( float[] )", count, out, |p, d| p.clamp(d, src, -1.0, 1.0), |a, b| a == b)?;
    h.compare("clamp_min( float[] )", count, out, |p, d| p.clamp_min(d, src, -1.0), |a, b| a == b)?;
    h.compare("clamp_max( float[] )", count, out, |p, d| p.clamp_max(d, src, 1.0), |a, b| a == b)?;
    Ok(())
}

fn memory<W: Write>(h: &mut VerificationHarness<'_, W>, count: usize) -> Result<()> {
    let rng = h.rng();
    let len = COPY_MAX.max(count) + 16;
    let src: Vec<u8> = (0..len).map(|_| rng.random_int_max(256) as u8).collect();

    h.compare(
        "memcpy()",
        count,
        || vec![0u8; count],
        |p, d| p.memcpy(d, &src[..count]),
        |a, b| a == b,
    )?;

    // Every size from 5 up in steps of 31, at shifting source and destination
    // offsets, each into its own buffer
    let sizes: Vec<usize> = (5..=COPY_MAX).step_by(31).collect();
    let buffers = || -> Vec<Vec<u8>> { sizes.iter().map(|&n| vec![0x5Au8; n + 16]).collect() };

    h.check(
        "memcpy( 5..8192 )",
        COPY_MAX,
        buffers,
        |p, bufs| {
            for (buf, &n) in bufs.iter_mut().zip(&sizes) {
                let (off, from) = (n % 16, (n / 31) % 16);
                p.memcpy(&mut buf[off..off + n], &src[from..from + n]);
            }
        },
        |a, b| a == b,
    )?;

    for value in [0xFFu8, 0x00, 0x01] {
        h.check(
            &format!("memset( {value:#04x}, 5..8192 )"),
            COPY_MAX,
            buffers,
            |p, bufs| {
                for (buf, &n) in bufs.iter_mut().zip(&sizes) {
                    let off = n % 16;
                    p.memset(&mut buf[off..off + n], value);
                }
            },
            |a, b| a == b,
        )?;
    }
    Ok(())
}
