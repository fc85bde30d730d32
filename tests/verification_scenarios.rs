//! End-to-end verification scenarios against the host-selected backend

use rayo::backends::generic::{self, rgtc_compressed_size};
use rayo::math::MatX;
use rayo::random::{SeededRandom, DEFAULT_SEED};
use rayo::verify::{self, inputs, HarnessConfig, TestGroups, SEPARATOR};
use rayo::{detect, registry, SimdContext};

fn selected() -> SimdContext {
    let mut ctx = SimdContext::new();
    ctx.init_best("scenarios", None);
    ctx
}

#[test]
fn test_add_scalar_scenario() {
    let ctx = selected();
    let simd = ctx.processor().expect("initialized");

    let mut rng = SeededRandom::new(DEFAULT_SEED);
    let src = inputs::floats(&mut rng, 1024, 10.0);
    let mut want = vec![0.0f32; 1024];
    let mut got = vec![0.0f32; 1024];
    generic::add_scalar(&mut want, 4.0, &src);
    simd.add_scalar(&mut got, 4.0, &src);

    let worst = want
        .iter()
        .zip(&got)
        .map(|(a, b)| (a - b).abs())
        .fold(0.0f32, f32::max);
    assert!(worst <= 1e-5, "max error {worst}");
}

#[test]
fn test_lower_triangular_solve_scenario() {
    let ctx = selected();
    let simd = ctx.processor().expect("initialized");

    let l = MatX::random(25, 25, 0, -1.0, 1.0);
    let b: Vec<f32> = {
        let mut rng = SeededRandom::new(1);
        (0..25).map(|_| rng.crandom_float()).collect()
    };
    for n in [1usize, 8, 15, 22] {
        let mut want = vec![0.0f32; n];
        let mut got = vec![0.0f32; n];
        generic::matx_lower_triangular_solve(&l, &mut want, &b, n, 0);
        simd.matx_lower_triangular_solve(&l, &mut got, &b, n, 0);
        for (x, y) in want.iter().zip(&got) {
            assert!((x - y).abs() <= 1.0, "n={n}: {x} vs {y}");
        }
    }
}

#[test]
fn test_rgtc_sweep_is_byte_identical() {
    let ctx = selected();
    let simd = ctx.processor().expect("initialized");

    let mut rng = SeededRandom::new(DEFAULT_SEED);
    let image = inputs::image(&mut rng, 52 * 4, 43);
    for height in 1..=43usize {
        for width in 1..=43usize {
            let stride = (width + rng.random_int_max(10) as usize) * 4;
            let size = rgtc_compressed_size(width, height);
            let mut want = vec![0u8; size];
            let mut got = vec![0u8; size];
            generic::compress_rgtc_from_rgba8(&image, width, height, stride, &mut want);
            simd.compress_rgtc_from_rgba8(&image, width, height, stride, &mut got);
            assert_eq!(want, got, "{width}x{height} stride {stride}");
        }
    }
}

#[test]
fn test_harness_run_on_selected_backend() {
    let ctx = selected();
    let simd = ctx.processor().expect("initialized");

    let config = HarnessConfig::new().with_iterations(2).with_count(128);
    let mut out = Vec::new();
    let report = verify::verify(simd, config, &mut out).expect("in-memory output");

    let failed: Vec<_> = report.failures().map(|r| r.label.clone()).collect();
    assert!(failed.is_empty(), "failed: {failed:?}");
    assert_eq!(report.candidate(), simd.name());
    assert_eq!(report.reference(), "Generic");

    let text = String::from_utf8(out).expect("utf8");
    assert_eq!(text.lines().filter(|l| *l == SEPARATOR).count(), 5);
    // two lines per operation plus the separators
    assert_eq!(text.lines().count(), report.results().len() * 2 + 5);
}

#[test]
fn test_group_mask_limits_the_run() {
    let reference = registry::reference();
    let config = HarnessConfig::new()
        .with_iterations(1)
        .with_count(16)
        .with_groups(TestGroups::AUDIO);
    let report = verify::verify(reference.as_ref(), config, std::io::sink()).expect("sink");
    assert!(report.all_passed());
    assert!(report
        .results()
        .iter()
        .all(|r| r.label.contains("sound") || r.label.contains("up_sample")));
}

#[test]
fn test_every_supported_tier_verifies() {
    let caps = detect::detect();
    let config = HarnessConfig::new()
        .with_iterations(1)
        .with_count(64)
        .with_groups(TestGroups::ARITHMETIC | TestGroups::LINEAR_ALGEBRA);
    for d in registry::registry().iter().filter(|d| d.supported_by(&caps)) {
        let p = d.instantiate();
        let report = verify::verify(p.as_ref(), config.clone(), std::io::sink()).expect("sink");
        assert!(report.all_passed(), "{}: {}", d.name(), report);
    }
}

#[test]
fn test_every_supported_tier_verifies_all_groups_at_boundary_counts() {
    let caps = detect::detect();
    for count in [0usize, 1, 5, 13, 25] {
        let config = HarnessConfig::new()
            .with_iterations(1)
            .with_count(count)
            .with_groups(TestGroups::ALL);
        for d in registry::registry().iter().filter(|d| d.supported_by(&caps)) {
            let p = d.instantiate();
            let report =
                verify::verify(p.as_ref(), config.clone(), std::io::sink()).expect("sink");
            assert!(!report.results().is_empty());
            assert!(report.all_passed(), "{} at count {count}: {}", d.name(), report);
        }
    }
}
