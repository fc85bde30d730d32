//! Benchmarks comparing the reference kernels against every backend the host supports
//!
//! # Benchmark Methodology
//!
//! - Flat-array kernels at 100, 1000 and 10000 elements
//! - Skinning, tangent derivation and RGTC compression at their harness sizes
//! - One series per backend, named after the tier
//! - Each benchmark reports throughput in elements per second

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rayo::backends::generic::{self, rgtc_compressed_size};
use rayo::math::{JointMat, JointWeight, Plane, Vec4};
use rayo::random::{SeededRandom, DEFAULT_SEED};
use rayo::verify::inputs;
use rayo::{detect, registry, SimdProcessor};

const SIZES: [usize; 3] = [100, 1000, 10000];

fn backends() -> Vec<Box<dyn SimdProcessor>> {
    let caps = detect::detect();
    registry::registry()
        .iter()
        .filter(|d| d.supported_by(&caps))
        .map(|d| d.instantiate())
        .collect()
}

fn bench_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("add");
    let mut rng = SeededRandom::new(DEFAULT_SEED);

    for size in SIZES {
        group.throughput(Throughput::Elements(size as u64));
        let a = inputs::floats(&mut rng, size, 10.0);
        let b = inputs::floats(&mut rng, size, 10.0);

        for p in backends() {
            group.bench_with_input(BenchmarkId::new(p.name(), size), &size, |bencher, &size| {
                let mut dst = vec![0.0f32; size];
                bencher.iter(|| {
                    p.add(&mut dst, black_box(&a), black_box(&b));
                    black_box(&dst);
                });
            });
        }
    }
    group.finish();
}

fn bench_dot(c: &mut Criterion) {
    let mut group = c.benchmark_group("dot");
    let mut rng = SeededRandom::new(DEFAULT_SEED);

    for size in SIZES {
        group.throughput(Throughput::Elements(size as u64));
        let a = inputs::floats(&mut rng, size, 10.0);
        let b = inputs::floats(&mut rng, size, 10.0);

        for p in backends() {
            group.bench_with_input(BenchmarkId::new(p.name(), size), &size, |bencher, _| {
                bencher.iter(|| black_box(p.dot(black_box(&a), black_box(&b))));
            });
        }
    }
    group.finish();
}

fn bench_min_max(c: &mut Criterion) {
    let mut group = c.benchmark_group("min_max");
    let mut rng = SeededRandom::new(DEFAULT_SEED);

    for size in SIZES {
        group.throughput(Throughput::Elements(size as u64));
        let src = inputs::floats(&mut rng, size, 10.0);

        for p in backends() {
            group.bench_with_input(BenchmarkId::new(p.name(), size), &size, |bencher, _| {
                bencher.iter(|| black_box(p.min_max(black_box(&src))));
            });
        }
    }
    group.finish();
}

fn bench_transform_verts(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform_verts");
    let mut rng = SeededRandom::new(DEFAULT_SEED);

    let quats = inputs::joint_quats(&mut rng, 64);
    let mut joints = vec![JointMat::IDENTITY; 64];
    generic::convert_joint_quats_to_joint_mats(&mut joints, &quats);
    let weights: Vec<Vec4> = (0..1024)
        .map(|_| Vec4::from_vec3(inputs::vec3(&mut rng, 10.0), rng.random_float()))
        .collect();
    let index: Vec<JointWeight> = (0..1024)
        .map(|i| JointWeight {
            joint: (i / 16) as u32,
            last: i & 1 == 1,
        })
        .collect();
    let verts = inputs::verts(&mut rng, 512, 10.0);

    group.throughput(Throughput::Elements(512));
    for p in backends() {
        group.bench_function(p.name(), |bencher| {
            let mut out = verts.clone();
            bencher.iter(|| {
                p.transform_verts(&mut out, &joints, &weights, &index);
                black_box(&out);
            });
        });
    }
    group.finish();
}

fn bench_derive_tangents(c: &mut Criterion) {
    let mut group = c.benchmark_group("derive_tangents");
    let mut rng = SeededRandom::new(DEFAULT_SEED);
    let verts = inputs::verts(&mut rng, 1024, 10.0);
    let indexes = inputs::indexes(&mut rng, 1024 * 3, 1024);

    group.throughput(Throughput::Elements(1024));
    for p in backends() {
        group.bench_function(p.name(), |bencher| {
            let mut planes = vec![Plane::default(); 1024];
            let mut out = verts.clone();
            bencher.iter(|| {
                p.derive_tangents(&mut planes, &mut out, &indexes);
                black_box(&out);
            });
        });
    }
    group.finish();
}

fn bench_rgtc(c: &mut Criterion) {
    let mut group = c.benchmark_group("compress_rgtc_from_rgba8");
    let mut rng = SeededRandom::new(DEFAULT_SEED);
    let side = 64;
    let image = inputs::image(&mut rng, side * 4, side);

    group.throughput(Throughput::Elements((side * side) as u64));
    for p in backends() {
        group.bench_function(p.name(), |bencher| {
            let mut dst = vec![0u8; rgtc_compressed_size(side, side)];
            bencher.iter(|| {
                p.compress_rgtc_from_rgba8(black_box(&image), side, side, side * 4, &mut dst);
                black_box(&dst);
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_add,
    bench_dot,
    bench_min_max,
    bench_transform_verts,
    bench_derive_tangents,
    bench_rgtc
);
criterion_main!(benches);
