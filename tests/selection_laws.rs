//! Backend selection laws
//!
//! Selection is a pure function of a capability mask and an optional forced
//! name, so every law here is checked against arbitrary masks.

use proptest::prelude::*;
use rayo::registry::{self, select_descriptor};
use rayo::{Backend, CpuCaps, Features, SimdContext, Vendor};

fn any_vendor() -> impl Strategy<Value = Vendor> {
    prop_oneof![
        Just(Vendor::Amd),
        Just(Vendor::Intel),
        Just(Vendor::Generic),
        Just(Vendor::Unsupported),
    ]
}

fn any_caps() -> impl Strategy<Value = CpuCaps> {
    (any_vendor(), 0u32..256).prop_map(|(v, bits)| CpuCaps::new(v, Features::from_bits(bits)))
}

fn any_raw_caps() -> impl Strategy<Value = CpuCaps> {
    (any_vendor(), 0u32..256).prop_map(|(v, bits)| CpuCaps::from_raw(v, Features::from_bits(bits)))
}

fn any_name() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("generic".to_string()),
        Just("SSE".to_string()),
        Just("sse2".to_string()),
        Just("Ssse3".to_string()),
        Just("AVX".to_string()),
        Just("avx2".to_string()),
        Just("AltiVec".to_string()),
        Just(String::new()),
    ]
}

#[test]
fn test_registry_is_ordered_most_capable_first() {
    let table = registry::registry();
    assert!(!table.is_empty());
    for pair in table.windows(2) {
        assert!(pair[0].backend() > pair[1].backend());
    }
    assert_eq!(table.last().map(|d| d.backend()), Some(Backend::Generic));
    assert!(table.last().unwrap().requires().is_empty());
}

#[test]
fn test_empty_mask_selects_reference() {
    let caps = CpuCaps::default();
    assert_eq!(select_descriptor(&caps, None).backend(), Backend::Generic);
    assert_eq!(select_descriptor(&caps, Some("AVX2")).backend(), Backend::Generic);
}

#[cfg(target_arch = "x86_64")]
#[test]
fn test_full_mask_selects_avx2() {
    let caps = CpuCaps::new(Vendor::Intel, Features::from_bits(0xff));
    assert_eq!(select_descriptor(&caps, None).backend(), Backend::Avx2);
    assert_eq!(select_descriptor(&caps, Some("sse")).backend(), Backend::Sse);
}

#[test]
fn test_context_lifecycle() {
    let mut ctx = SimdContext::new();
    assert!(!ctx.is_initialized());
    assert!(ctx.processor().is_err());

    ctx.init();
    assert_eq!(ctx.processor().unwrap().backend(), Backend::Generic);

    let report = ctx.init_best_with_caps("game", None, CpuCaps::default());
    assert_eq!(report.backend(), "Generic");
    assert_eq!(report.found_line(), "Found Unsupported CPU, features: none");
    assert_eq!(report.using_line(), "game using Generic for SIMD processing.");
    assert_eq!(ctx.handle().map(|h| h.name()), Some("Generic"));

    ctx.shutdown();
    assert!(!ctx.is_initialized());
    assert!(ctx.processor().is_err());

    // detected host always yields a working backend
    let report = ctx.init_best("game", None);
    let simd = ctx.processor().unwrap();
    assert_eq!(simd.name(), report.backend());
    let mut dst = [0.0f32; 3];
    simd.add(&mut dst, &[1.0, 2.0, 3.0], &[1.0, 1.0, 1.0]);
    assert_eq!(dst, [2.0, 3.0, 4.0]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_selected_backend_is_supported(
        caps in any_raw_caps(),
        name in proptest::option::of(any_name()),
    ) {
        let chosen = select_descriptor(&caps, name.as_deref());
        prop_assert!(chosen.supported_by(&caps));
    }

    #[test]
    fn prop_unforced_selection_is_first_supported(caps in any_raw_caps()) {
        let chosen = select_descriptor(&caps, None);
        let first = registry::registry().iter().find(|d| d.supported_by(&caps));
        prop_assert_eq!(Some(chosen), first);
    }

    #[cfg(target_arch = "x86_64")]
    #[test]
    fn prop_unforced_selection_matches_best_tier(caps in any_caps()) {
        prop_assert_eq!(select_descriptor(&caps, None).backend(), Backend::best_for(&caps));
    }

    #[test]
    fn prop_supported_force_wins(caps in any_raw_caps(), name in any_name()) {
        let chosen = select_descriptor(&caps, Some(&name));
        let forced = registry::registry()
            .iter()
            .find(|d| d.matches(&name) && d.supported_by(&caps));
        match forced {
            Some(d) => prop_assert_eq!(chosen, d),
            None => prop_assert_eq!(chosen, select_descriptor(&caps, None)),
        }
    }

    #[test]
    fn prop_more_features_never_select_lower_tier(caps in any_caps(), extra in 0u32..256) {
        let wider = CpuCaps::new(caps.vendor(), caps.features() | Features::from_bits(extra));
        prop_assert!(
            select_descriptor(&wider, None).backend() >= select_descriptor(&caps, None).backend()
        );
    }

    #[test]
    fn prop_normalized_masks_are_nested(bits in 0u32..256) {
        let f = Features::from_bits(bits).normalized();
        prop_assert_eq!(f.normalized(), f);
        prop_assert!(Features::from_bits(bits).has(f));
    }

    #[test]
    fn prop_selection_is_deterministic(
        caps in any_raw_caps(),
        name in proptest::option::of(any_name()),
    ) {
        let a = select_descriptor(&caps, name.as_deref());
        let b = select_descriptor(&caps, name.as_deref());
        prop_assert_eq!(a, b);
    }
}
