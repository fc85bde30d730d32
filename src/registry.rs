//! Backend registry and selection
//!
//! The registry is a fixed table of [`BackendDescriptor`]s ordered most capable
//! first. Selection walks it once and takes the first descriptor the host
//! satisfies, optionally preferring one requested by name. The reference
//! descriptor requires nothing and sits last, so a walk always terminates with
//! a usable backend.
//!
//! # Example
//!
//! ```
//! use rayo::{Backend, CpuCaps, Features, Vendor};
//! use rayo::registry::select_descriptor;
//!
//! let caps = CpuCaps::new(Vendor::Intel, Backend::Sse2.requirements());
//! assert_eq!(select_descriptor(&caps, None).name(), "SSE2");
//! assert_eq!(select_descriptor(&caps, Some("sse")).name(), "SSE");
//!
//! // An override the host cannot run falls back to the automatic choice
//! assert_eq!(select_descriptor(&caps, Some("AVX2")).name(), "SSE2");
//! assert_eq!(select_descriptor(&CpuCaps::default(), None).name(), "Generic");
//! ```

use std::fmt;

use crate::backends::{GenericProcessor, SimdProcessor};
use crate::caps::{CpuCaps, Features};
use crate::context::BackendHandle;
use crate::Backend;

/// One registered tier: name, capability requirements and factory
#[derive(Clone, Copy)]
pub struct BackendDescriptor {
    backend: Backend,
    requires: Features,
    factory: fn() -> Box<dyn SimdProcessor>,
}

impl BackendDescriptor {
    const fn new(backend: Backend, factory: fn() -> Box<dyn SimdProcessor>) -> Self {
        Self {
            backend,
            requires: backend.requirements(),
            factory,
        }
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn name(&self) -> &'static str {
        self.backend.name()
    }

    /// Flags the host must report for this descriptor to be eligible
    pub fn requires(&self) -> Features {
        self.requires
    }

    /// Whether `caps` carries every required flag
    pub fn supported_by(&self, caps: &CpuCaps) -> bool {
        caps.has(self.requires)
    }

    /// Whether `name` names this descriptor, ignoring ASCII case
    pub fn matches(&self, name: &str) -> bool {
        self.name().eq_ignore_ascii_case(name)
    }

    /// Build a fresh processor for this tier
    pub fn instantiate(&self) -> Box<dyn SimdProcessor> {
        (self.factory)()
    }
}

impl fmt::Debug for BackendDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendDescriptor")
            .field("name", &self.name())
            .field("requires", &self.requires)
            .finish()
    }
}

impl PartialEq for BackendDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.backend == other.backend && self.requires == other.requires
    }
}

impl Eq for BackendDescriptor {}

fn generic() -> Box<dyn SimdProcessor> {
    Box::new(GenericProcessor)
}

#[cfg(target_arch = "x86_64")]
mod x86_factories {
    use crate::backends::{SimdProcessor, X86Processor};
    use crate::Backend;

    pub(super) fn sse() -> Box<dyn SimdProcessor> {
        Box::new(X86Processor::new(Backend::Sse))
    }

    pub(super) fn sse2() -> Box<dyn SimdProcessor> {
        Box::new(X86Processor::new(Backend::Sse2))
    }

    pub(super) fn ssse3() -> Box<dyn SimdProcessor> {
        Box::new(X86Processor::new(Backend::Ssse3))
    }

    pub(super) fn avx() -> Box<dyn SimdProcessor> {
        Box::new(X86Processor::new(Backend::Avx))
    }

    pub(super) fn avx2() -> Box<dyn SimdProcessor> {
        Box::new(X86Processor::new(Backend::Avx2))
    }
}

const REFERENCE_DESCRIPTOR: BackendDescriptor = BackendDescriptor::new(Backend::Generic, generic);

static REFERENCE: BackendDescriptor = REFERENCE_DESCRIPTOR;

#[cfg(target_arch = "x86_64")]
static REGISTRY: [BackendDescriptor; 6] = [
    BackendDescriptor::new(Backend::Avx2, x86_factories::avx2),
    BackendDescriptor::new(Backend::Avx, x86_factories::avx),
    BackendDescriptor::new(Backend::Ssse3, x86_factories::ssse3),
    BackendDescriptor::new(Backend::Sse2, x86_factories::sse2),
    BackendDescriptor::new(Backend::Sse, x86_factories::sse),
    REFERENCE_DESCRIPTOR,
];

#[cfg(not(target_arch = "x86_64"))]
static REGISTRY: [BackendDescriptor; 1] = [REFERENCE_DESCRIPTOR];

/// Every backend this build knows, most capable first, reference last
pub fn registry() -> &'static [BackendDescriptor] {
    &REGISTRY
}

/// Descriptor of the reference backend
pub fn reference_descriptor() -> &'static BackendDescriptor {
    &REFERENCE
}

/// A fresh reference processor
pub fn reference() -> Box<dyn SimdProcessor> {
    REFERENCE.instantiate()
}

/// Pick the descriptor for `caps`, honouring `forced` when the host can run it
///
/// Deterministic in `(caps, forced)`. A forced name that is unknown or whose
/// requirements `caps` lacks is ignored with a warning; the result is then the
/// first descriptor `caps` satisfies.
pub fn select_descriptor(caps: &CpuCaps, forced: Option<&str>) -> &'static BackendDescriptor {
    let table = registry();

    if let Some(name) = forced {
        if let Some(d) = table.iter().find(|d| d.matches(name) && d.supported_by(caps)) {
            tracing::debug!(backend = d.name(), "forced SIMD backend accepted");
            return d;
        }
        tracing::warn!(
            forced = name,
            caps = %caps,
            "forced SIMD backend unknown or unsupported by this CPU; selecting automatically"
        );
    }

    for d in table {
        if d.supported_by(caps) {
            return d;
        }
        tracing::debug!(
            backend = d.name(),
            requires = %d.requires(),
            "SIMD backend rejected"
        );
    }

    reference_descriptor()
}

/// Select and instantiate a backend for `caps`
pub fn select(caps: &CpuCaps, forced: Option<&str>) -> BackendHandle {
    let descriptor = select_descriptor(caps, forced);
    BackendHandle::new(descriptor.instantiate(), *caps)
}
