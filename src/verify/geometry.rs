//! Group 4: skeletal animation, culling, surface derivation, shadow caches and
//! texture compression

use std::io::Write;

use super::compare::{
    joint_mats_within, joint_quats_within, planes_within, vec2s_within, vec4s_within,
    verts_tangents_within, verts_xyz_within,
};
use super::{inputs, VerificationHarness};
use crate::backends::generic::{self, rgtc_compressed_size};
use crate::error::Result;
use crate::math::{DominantTri, JointMat, JointQuat, JointWeight, Plane, Vec2, Vec4};

const SKIN_JOINTS: usize = 64;
const SKIN_VERTS: usize = 512;
/// Two weights per skinned vertex
const SKIN_WEIGHTS: usize = SKIN_VERTS * 2;

const RGTC_SIDE: usize = 64;
const RGTC_SWEEP_MAX: usize = 43;

const TRACE_PLANES: [Plane; 4] = [
    Plane::new(1.0, 0.0, 0.0, -5.3),
    Plane::new(-1.0, 0.0, 0.0, 5.3),
    Plane::new(0.0, 1.0, 0.0, -3.4),
    Plane::new(0.0, -1.0, 0.0, 3.4),
];

const DECAL_PLANES: [Plane; 6] = [
    Plane::new(1.0, 0.0, 0.0, -5.3),
    Plane::new(-1.0, 0.0, 0.0, 5.3),
    Plane::new(0.0, 1.0, 0.0, -4.4),
    Plane::new(0.0, -1.0, 0.0, 4.4),
    Plane::new(0.0, 0.0, 1.0, -3.5),
    Plane::new(0.0, 0.0, -1.0, 3.5),
];

const OVERLAY_PLANES: [Plane; 2] = [
    Plane::new(0.3, 0.2, 0.9, -5.3),
    Plane::new(0.9, 0.2, 0.3, -4.3),
];

pub(super) fn run<W: Write>(h: &mut VerificationHarness<'_, W>) -> Result<()> {
    let count = h.config().count();
    if count > 0 {
        joints(h, count)?;
    }
    skinning(h)?;
    culling(h, count)?;
    surface(h, count)?;
    shadow(h, count)?;
    texture(h)?;
    Ok(())
}

fn joints<W: Write>(h: &mut VerificationHarness<'_, W>, count: usize) -> Result<()> {
    let rng = h.rng();
    let base = inputs::joint_quats(rng, count);
    let target = inputs::joint_quats(rng, count);
    let lerp = rng.random_float();
    let index: Vec<u32> = (0..count as u32).step_by(2).collect();
    let parents: Vec<i32> = (0..count)
        .map(|i| if i == 0 { -1 } else { rng.random_int_max(i as i32) })
        .collect();

    h.compare(
        "blend_joints()",
        index.len(),
        || base.clone(),
        |p, j| p.blend_joints(j, &target, lerp, &index),
        |a, b| joint_quats_within(a, b, 1e-2, 1e-3),
    )?;

    h.compare(
        "convert_joint_quats_to_joint_mats()",
        count,
        || vec![JointMat::IDENTITY; count],
        |p, m| p.convert_joint_quats_to_joint_mats(m, &base),
        |a, b| joint_mats_within(a, b, 1e-4),
    )?;

    let mut mats = vec![JointMat::IDENTITY; count];
    generic::convert_joint_quats_to_joint_mats(&mut mats, &base);

    h.compare(
        "convert_joint_mats_to_joint_quats()",
        count,
        || vec![JointQuat::default(); count],
        |p, q| p.convert_joint_mats_to_joint_quats(q, &mats),
        |a, b| joint_quats_within(a, b, 1e-4, 1e-4),
    )?;

    let last = count - 1;
    h.compare(
        "transform_joints()",
        count,
        || mats.clone(),
        |p, m| p.transform_joints(m, &parents, 0, last),
        |a, b| joint_mats_within(a, b, 1e-4),
    )?;

    let mut world = mats.clone();
    generic::transform_joints(&mut world, &parents, 0, last);
    h.compare(
        "untransform_joints()",
        count,
        || world.clone(),
        |p, m| p.untransform_joints(m, &parents, 0, last),
        |a, b| joint_mats_within(a, b, 1e-4),
    )?;
    Ok(())
}

fn skinning<W: Write>(h: &mut VerificationHarness<'_, W>) -> Result<()> {
    let rng = h.rng();
    let quats = inputs::joint_quats(rng, SKIN_JOINTS);
    let mut joints = vec![JointMat::IDENTITY; SKIN_JOINTS];
    generic::convert_joint_quats_to_joint_mats(&mut joints, &quats);

    let weights: Vec<Vec4> = (0..SKIN_WEIGHTS)
        .map(|_| Vec4::from_vec3(inputs::vec3(rng, 10.0), rng.random_float()))
        .collect();
    let index: Vec<JointWeight> = (0..SKIN_WEIGHTS)
        .map(|i| JointWeight {
            joint: (i * SKIN_JOINTS / SKIN_WEIGHTS) as u32,
            last: i & 1 == 1,
        })
        .collect();
    let verts = inputs::verts(rng, SKIN_VERTS, 10.0);

    h.compare(
        "transform_verts()",
        SKIN_VERTS,
        || verts.clone(),
        |p, v| p.transform_verts(v, &joints, &weights, &index),
        |a, b| verts_xyz_within(a, b, 0.5),
    )?;
    Ok(())
}

fn culling<W: Write>(h: &mut VerificationHarness<'_, W>, count: usize) -> Result<()> {
    let rng = h.rng();
    let verts = inputs::verts(rng, count, 10.0);
    let radius = rng.random_float() * 2.0;

    h.compare(
        "trace_point_cull()",
        count,
        || (vec![0u8; count], 0u8),
        |p, (bits, total)| *total = p.trace_point_cull(bits, radius, &TRACE_PLANES, &verts),
        |a, b| a == b,
    )?;

    h.compare(
        "decal_point_cull()",
        count,
        || vec![0u8; count],
        |p, bits| p.decal_point_cull(bits, &DECAL_PLANES, &verts),
        |a, b| a == b,
    )?;

    h.compare(
        "overlay_point_cull()",
        count,
        || (vec![0u8; count], vec![Vec2::default(); count]),
        |p, (bits, st)| p.overlay_point_cull(bits, st, &OVERLAY_PLANES, &verts),
        |(bits_a, st_a), (bits_b, st_b)| bits_a == bits_b && vec2s_within(st_a, st_b, 1e-4),
    )?;
    Ok(())
}

fn surface<W: Write>(h: &mut VerificationHarness<'_, W>, count: usize) -> Result<()> {
    let rng = h.rng();
    let verts = inputs::verts(rng, count, 10.0);
    let tris = count;
    let indexes = inputs::indexes(rng, tris * 3, count);
    let dominant: Vec<DominantTri> = inputs::indexes(rng, count * 2, count)
        .chunks_exact(2)
        .map(|pair| DominantTri {
            v2: pair[0],
            v3: pair[1],
            normalization_scale: [rng.random_float(), rng.random_float(), rng.random_float()],
        })
        .collect();

    h.compare(
        "derive_tri_planes()",
        tris,
        || vec![Plane::default(); tris],
        |p, planes| p.derive_tri_planes(planes, &verts, &indexes),
        |a, b| planes_within(a, b, 1e-1),
    )?;

    h.compare(
        "derive_tangents()",
        tris,
        || (vec![Plane::default(); tris], verts.clone()),
        |p, (planes, v)| p.derive_tangents(planes, v, &indexes),
        |(pa, va), (pb, vb)| planes_within(pa, pb, 1e-1) && verts_tangents_within(va, vb, 1e-1),
    )?;

    h.compare(
        "derive_unsmoothed_tangents()",
        count,
        || verts.clone(),
        |p, v| p.derive_unsmoothed_tangents(v, &dominant),
        |a, b| verts_tangents_within(a, b, 1e-1),
    )?;

    h.compare(
        "normalize_tangents()",
        count,
        || verts.clone(),
        |p, v| p.normalize_tangents(v),
        |a, b| verts_tangents_within(a, b, 1e-2),
    )?;
    Ok(())
}

fn shadow<W: Write>(h: &mut VerificationHarness<'_, W>, count: usize) -> Result<()> {
    let rng = h.rng();
    let verts = inputs::verts(rng, count, 10.0);
    let light = inputs::vec3(rng, 20.0);
    // a quarter of the vertices carry the "unused" sentinel
    let remap: Vec<i32> = (0..count)
        .map(|_| if rng.random_int_max(4) == 0 { -1 } else { 0 })
        .collect();

    h.compare(
        "create_shadow_cache()",
        count,
        || (vec![Vec4::default(); count * 2], remap.clone(), 0usize),
        |p, (cache, remap, n)| *n = p.create_shadow_cache(cache, remap, &light, &verts),
        |(ca, ra, na), (cb, rb, nb)| {
            na == nb && ra == rb && vec4s_within(&ca[..*na], &cb[..*nb], 1e-2)
        },
    )?;

    h.compare(
        "create_vertex_program_shadow_cache()",
        count,
        || (vec![Vec4::default(); count * 2], 0usize),
        |p, (cache, n)| *n = p.create_vertex_program_shadow_cache(cache, &verts),
        |(ca, na), (cb, nb)| na == nb && vec4s_within(&ca[..*na], &cb[..*nb], 1e-2),
    )?;
    Ok(())
}

fn texture<W: Write>(h: &mut VerificationHarness<'_, W>) -> Result<()> {
    let rng = h.rng();
    let stride = RGTC_SIDE * 4;
    let image = inputs::image(rng, stride, RGTC_SIDE);

    h.compare(
        &format!("compress_rgtc_from_rgba8( {RGTC_SIDE}x{RGTC_SIDE} )"),
        RGTC_SIDE * RGTC_SIDE,
        || vec![0u8; rgtc_compressed_size(RGTC_SIDE, RGTC_SIDE)],
        |p, dst| p.compress_rgtc_from_rgba8(&image, RGTC_SIDE, RGTC_SIDE, stride, dst),
        |a, b| a == b,
    )?;

    // Every width and height up to 43, each row padded by up to 9 pixels
    let rng = h.rng();
    let mut layouts = Vec::with_capacity(RGTC_SWEEP_MAX * RGTC_SWEEP_MAX);
    for height in 1..=RGTC_SWEEP_MAX {
        for width in 1..=RGTC_SWEEP_MAX {
            let stride = (width + rng.random_int_max(10) as usize) * 4;
            layouts.push((width, height, stride));
        }
    }
    let max_stride = (RGTC_SWEEP_MAX + 9) * 4;
    let image = inputs::image(rng, max_stride, RGTC_SWEEP_MAX);

    h.check(
        &format!("compress_rgtc_from_rgba8( 1..{RGTC_SWEEP_MAX} x 1..{RGTC_SWEEP_MAX} )"),
        layouts.len(),
        || -> Vec<Vec<u8>> {
            layouts
                .iter()
                .map(|&(width, height, _)| vec![0u8; rgtc_compressed_size(width, height)])
                .collect()
        },
        |p, outputs| {
            for (dst, &(width, height, stride)) in outputs.iter_mut().zip(&layouts) {
                p.compress_rgtc_from_rgba8(&image, width, height, stride, dst);
            }
        },
        |a, b| a == b,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec3;

    #[test]
    fn test_skin_index_covers_every_joint() {
        let joints: Vec<u32> = (0..SKIN_WEIGHTS)
            .map(|i| (i * SKIN_JOINTS / SKIN_WEIGHTS) as u32)
            .collect();
        assert_eq!(joints[0], 0);
        assert_eq!(*joints.last().unwrap() as usize, SKIN_JOINTS - 1);
    }

    #[test]
    fn test_cull_planes_bound_a_box() {
        let inside = Vec3::new(0.0, 0.0, 0.0);
        assert!(DECAL_PLANES.iter().all(|p| p.distance(&inside) < 0.0));
        assert!(TRACE_PLANES.iter().all(|p| p.distance(&inside) < 0.0));
    }
}
