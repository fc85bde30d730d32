//! Capability probe
//!
//! [`detect`] reads the host once and returns a normalized [`CpuCaps`]. It never
//! fails: a host the probe does not understand reports [`Vendor::Generic`] with no
//! extension flags, which selects the reference backend downstream.
//!
//! # Compile-time override
//!
//! Some builds target CPUs whose extensions the runtime query cannot see. Such
//! builds pass the flags they know about to [`detect_with_override`]; the probe
//! ORs them in before enforcing tier nesting. [`detect`] itself always applies
//! [`compile_time_features`], which reflects `-C target-feature` /
//! `-C target-cpu` settings of the current build.

use crate::caps::{CpuCaps, Features, Vendor};

/// Probe the host, applying the build's compile-time feature set
pub fn detect() -> CpuCaps {
    detect_with_override(compile_time_features())
}

/// Probe the host and force `forced` flags on before normalization
pub fn detect_with_override(forced: Features) -> CpuCaps {
    let (vendor, runtime) = probe_host();
    let caps = CpuCaps::new(vendor, runtime | forced);
    tracing::debug!(
        vendor = caps.vendor().name(),
        runtime = %runtime,
        forced = %forced,
        features = %caps.features(),
        "probed CPU capabilities"
    );
    caps
}

/// Flags guaranteed by the build configuration itself
pub const fn compile_time_features() -> Features {
    let mut f = Features::NONE;
    if cfg!(target_feature = "sse") {
        f = f.union(Features::SSE);
    }
    if cfg!(target_feature = "sse2") {
        f = f.union(Features::SSE2);
    }
    if cfg!(target_feature = "sse3") {
        f = f.union(Features::SSE3);
    }
    if cfg!(target_feature = "ssse3") {
        f = f.union(Features::SSSE3);
    }
    if cfg!(target_feature = "sse4.1") {
        f = f.union(Features::SSE41);
    }
    if cfg!(target_feature = "avx") {
        f = f.union(Features::AVX);
    }
    if cfg!(target_feature = "avx2") {
        f = f.union(Features::AVX2);
    }
    if cfg!(target_feature = "fma") {
        f = f.union(Features::FMA3);
    }
    f
}

#[cfg(target_arch = "x86_64")]
fn probe_host() -> (Vendor, Features) {
    let mut f = Features::NONE;
    if is_x86_feature_detected!("sse") {
        f |= Features::SSE;
    }
    if is_x86_feature_detected!("sse2") {
        f |= Features::SSE2;
    }
    if is_x86_feature_detected!("sse3") {
        f |= Features::SSE3;
    }
    if is_x86_feature_detected!("ssse3") {
        f |= Features::SSSE3;
    }
    if is_x86_feature_detected!("sse4.1") {
        f |= Features::SSE41;
    }
    if is_x86_feature_detected!("avx") {
        f |= Features::AVX;
    }
    if is_x86_feature_detected!("avx2") {
        f |= Features::AVX2;
    }
    if is_x86_feature_detected!("fma") {
        f |= Features::FMA3;
    }
    (cpu_vendor(), f)
}

#[cfg(not(target_arch = "x86_64"))]
fn probe_host() -> (Vendor, Features) {
    (Vendor::Generic, Features::NONE)
}

/// Vendor from CPUID leaf 0 (EBX, EDX, ECX spell the vendor string)
#[cfg(target_arch = "x86_64")]
fn cpu_vendor() -> Vendor {
    use std::arch::x86_64::__cpuid;

    // SAFETY: CPUID is available on every x86_64 processor.
    #[allow(unused_unsafe)]
    let leaf = unsafe { __cpuid(0) };
    let mut id = [0u8; 12];
    id[0..4].copy_from_slice(&leaf.ebx.to_le_bytes());
    id[4..8].copy_from_slice(&leaf.edx.to_le_bytes());
    id[8..12].copy_from_slice(&leaf.ecx.to_le_bytes());
    Vendor::from_cpuid(&id)
}
