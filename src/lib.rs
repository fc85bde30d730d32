//! Rayo: Runtime-Selected SIMD Kernels
//!
//! **Rayo** (Spanish: "lightning bolt") is the math-acceleration layer of a
//! real-time engine: a fixed catalogue of numeric kernels (array arithmetic,
//! dense linear algebra, skeletal animation, culling, tangent derivation,
//! texture compression, audio mixing) with one portable reference
//! implementation and several x86 instruction-set tiers behind a single trait.
//!
//! # Design Principles
//!
//! - **Select once, use everywhere**: the host is probed at startup and the best
//!   tier it supports is installed in a [`SimdContext`]
//! - **Closed tier set**: [`Backend`] lists every tier; the registry maps each to
//!   its capability requirements, most capable first
//! - **Zero unsafe in public API**: `unsafe` is isolated in the tier kernel
//!   modules, and a processor never runs a tier the host cannot execute
//! - **Differential verification**: [`verify`] checks every kernel of a tier
//!   against the reference on seeded inputs and reports speedups
//!
//! # Quick Start
//!
//! ```rust
//! use rayo::SimdContext;
//!
//! let mut ctx = SimdContext::new();
//! let report = ctx.init_best("engine", None);
//! println!("{}", report.found_line());
//!
//! let simd = ctx.processor().unwrap();
//! let mut dst = [0.0f32; 4];
//! simd.add(&mut dst, &[1.0, 2.0, 3.0, 4.0], &[5.0, 6.0, 7.0, 8.0]);
//! assert_eq!(dst, [6.0, 8.0, 10.0, 12.0]);
//! ```

use std::fmt;

pub mod audio;
pub mod backends;
pub mod caps;
pub mod context;
pub mod detect;
pub mod error;
pub mod math;
pub mod random;
pub mod registry;
pub mod timing;
pub mod verify;

pub use backends::{GenericProcessor, SimdProcessor};
pub use caps::{CpuCaps, Features, Vendor};
pub use context::{BackendHandle, SelectionReport, SimdContext};
pub use error::{RayoError, Result};
pub use registry::{select, BackendDescriptor};

/// Kernel tier, ordered from least to most capable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Backend {
    /// Portable reference implementation (no SIMD)
    Generic,
    /// SSE (128-bit floats)
    Sse,
    /// SSE2 (128-bit integer lanes)
    Sse2,
    /// SSSE3 (byte shuffles)
    Ssse3,
    /// AVX (256-bit floats)
    Avx,
    /// AVX2 with FMA3
    Avx2,
}

impl Backend {
    /// Every tier, least capable first
    pub const ALL: [Backend; 6] = [
        Backend::Generic,
        Backend::Sse,
        Backend::Sse2,
        Backend::Ssse3,
        Backend::Avx,
        Backend::Avx2,
    ];

    /// Display name, also the name accepted by a forced selection
    pub const fn name(self) -> &'static str {
        match self {
            Backend::Generic => "Generic",
            Backend::Sse => "SSE",
            Backend::Sse2 => "SSE2",
            Backend::Ssse3 => "SSSE3",
            Backend::Avx => "AVX",
            Backend::Avx2 => "AVX2",
        }
    }

    /// Look a tier up by name, ignoring ASCII case
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|b| b.name().eq_ignore_ascii_case(name))
    }

    /// Capability flags a host needs to run this tier
    pub const fn requirements(self) -> Features {
        match self {
            Backend::Generic => Features::NONE,
            Backend::Sse => Features::SSE,
            Backend::Sse2 => Features::SSE.union(Features::SSE2),
            Backend::Ssse3 => Features::SSE
                .union(Features::SSE2)
                .union(Features::SSE3)
                .union(Features::SSSE3),
            Backend::Avx => Backend::Ssse3
                .requirements()
                .union(Features::SSE41)
                .union(Features::AVX),
            Backend::Avx2 => Backend::Avx
                .requirements()
                .union(Features::AVX2)
                .union(Features::FMA3),
        }
    }

    /// Most capable tier whose requirements `caps` satisfies
    pub fn best_for(caps: &CpuCaps) -> Self {
        Self::ALL
            .into_iter()
            .rev()
            .find(|b| caps.has(b.requirements()))
            .unwrap_or(Backend::Generic)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
