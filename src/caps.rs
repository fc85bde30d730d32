//! CPU capability mask
//!
//! A [`CpuCaps`] is what the probe reports and what backend selection consumes:
//! a [`Vendor`] tag plus a [`Features`] bitset of nested instruction-set tiers.
//!
//! # Nesting
//!
//! Tiers are ordered `SSE < SSE2 < SSE3 < SSSE3 < SSE41 < AVX < AVX2+FMA3`. A
//! higher tier only counts when every tier below it is present, and `AVX2` and
//! `FMA3` only count together. [`CpuCaps::normalized`] enforces this; the probe
//! always hands out normalized masks.

use std::fmt;

/// CPU vendor identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Vendor {
    /// AuthenticAMD
    Amd,
    /// GenuineIntel
    Intel,
    /// Any other vendor, or a host without vendor identification
    Generic,
    /// Vendor of the empty mask
    #[default]
    Unsupported,
}

impl Vendor {
    /// Display name used in the selection report
    pub const fn name(self) -> &'static str {
        match self {
            Vendor::Amd => "AMD",
            Vendor::Intel => "Intel",
            Vendor::Generic => "Generic",
            Vendor::Unsupported => "Unsupported",
        }
    }

    /// Map a CPUID leaf 0 vendor string to a vendor tag
    pub fn from_cpuid(id: &[u8]) -> Self {
        match id {
            b"GenuineIntel" => Vendor::Intel,
            b"AuthenticAMD" => Vendor::Amd,
            _ => Vendor::Generic,
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Instruction-set extension flags
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Features(u32);

impl Features {
    /// No extensions
    pub const NONE: Self = Self(0);
    /// Streaming SIMD Extensions
    pub const SSE: Self = Self(1 << 0);
    /// SSE2 (integer SIMD, double precision)
    pub const SSE2: Self = Self(1 << 1);
    /// SSE3 (horizontal adds)
    pub const SSE3: Self = Self(1 << 2);
    /// Supplemental SSE3 (byte shuffles)
    pub const SSSE3: Self = Self(1 << 3);
    /// SSE4.1
    pub const SSE41: Self = Self(1 << 4);
    /// AVX (256-bit float)
    pub const AVX: Self = Self(1 << 5);
    /// AVX2 (256-bit integer)
    pub const AVX2: Self = Self(1 << 6);
    /// Fused multiply-add
    pub const FMA3: Self = Self(1 << 7);

    /// Every flag in nesting order, paired with its report name
    pub const NAMED: [(Features, &'static str); 8] = [
        (Self::SSE, "SSE"),
        (Self::SSE2, "SSE2"),
        (Self::SSE3, "SSE3"),
        (Self::SSSE3, "SSSE3"),
        (Self::SSE41, "SSE41"),
        (Self::AVX, "AVX"),
        (Self::AVX2, "AVX2"),
        (Self::FMA3, "FMA3"),
    ];

    /// Tiers in nesting order; the last tier is the AVX2+FMA3 pair
    const TIERS: [Features; 7] = [
        Self::SSE,
        Self::SSE2,
        Self::SSE3,
        Self::SSSE3,
        Self::SSE41,
        Self::AVX,
        Self::AVX2.union(Self::FMA3),
    ];

    /// Build a set from raw bits; unknown bits are dropped
    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits & 0xFF)
    }

    /// Raw bits
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// True when every flag of `required` is present
    #[inline(always)]
    #[must_use]
    pub const fn has(self, required: Self) -> bool {
        self.0 & required.0 == required.0
    }

    /// Set union
    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// True when no flag is set
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Number of flags set
    #[inline]
    #[must_use]
    pub const fn count(self) -> u32 {
        self.0.count_ones()
    }

    /// Drop every tier above the first missing one
    #[must_use]
    pub const fn normalized(self) -> Self {
        let mut out = Self::NONE;
        let mut i = 0;
        while i < Self::TIERS.len() {
            let tier = Self::TIERS[i];
            if !self.has(tier) {
                break;
            }
            out = out.union(tier);
            i += 1;
        }
        out
    }

    /// Report names of the set flags, in nesting order
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        Self::NAMED
            .into_iter()
            .filter(move |(flag, _)| self.has(*flag))
            .map(|(_, name)| name)
    }
}

impl std::ops::BitOr for Features {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl std::ops::BitOrAssign for Features {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.union(rhs);
    }
}

impl fmt::Debug for Features {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

impl fmt::Display for Features {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let mut first = true;
        for name in self.names() {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(name)?;
            first = false;
        }
        Ok(())
    }
}

/// Capability mask: vendor plus extension flags
///
/// `CpuCaps` is `Copy` and freely shareable; selection is a pure function of it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CpuCaps {
    vendor: Vendor,
    features: Features,
}

impl CpuCaps {
    /// Build a mask; the flag set is normalized
    #[must_use]
    pub const fn new(vendor: Vendor, features: Features) -> Self {
        Self {
            vendor,
            features: features.normalized(),
        }
    }

    /// Build a mask exactly as given, skipping normalization
    ///
    /// Selection works on any mask; this exists so callers can exercise it
    /// with masks a real probe would never produce.
    #[must_use]
    pub const fn from_raw(vendor: Vendor, features: Features) -> Self {
        Self { vendor, features }
    }

    /// Vendor tag
    #[inline]
    pub const fn vendor(&self) -> Vendor {
        self.vendor
    }

    /// Extension flags
    #[inline]
    pub const fn features(&self) -> Features {
        self.features
    }

    /// True when every flag of `required` is present
    #[inline(always)]
    pub const fn has(&self, required: Features) -> bool {
        self.features.has(required)
    }

    /// Same mask with the nesting rule enforced
    #[must_use]
    pub const fn normalized(self) -> Self {
        Self::new(self.vendor, self.features)
    }
}

impl fmt::Display for CpuCaps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} CPU, features: {}", self.vendor, self.features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vendor_from_cpuid() {
        assert_eq!(Vendor::from_cpuid(b"GenuineIntel"), Vendor::Intel);
        assert_eq!(Vendor::from_cpuid(b"AuthenticAMD"), Vendor::Amd);
        assert_eq!(Vendor::from_cpuid(b"HygonGenuine"), Vendor::Generic);
        assert_eq!(Vendor::from_cpuid(b""), Vendor::Generic);
    }

    #[test]
    fn test_default_mask_is_empty_and_unsupported() {
        let caps = CpuCaps::default();
        assert_eq!(caps.vendor(), Vendor::Unsupported);
        assert!(caps.features().is_empty());
        assert_eq!(caps.to_string(), "Unsupported CPU, features: none");
    }

    #[test]
    fn test_normalized_keeps_complete_chain() {
        let all = Features::from_bits(0xFF);
        assert_eq!(all.normalized(), all);
        assert_eq!(all.count(), 8);
    }

    #[test]
    fn test_normalized_truncates_at_first_gap() {
        // SSE3 missing: everything above SSE2 is dropped
        let f = Features::SSE | Features::SSE2 | Features::SSSE3 | Features::AVX;
        assert_eq!(f.normalized(), Features::SSE | Features::SSE2);
    }

    #[test]
    fn test_normalized_requires_avx2_and_fma_together() {
        let base = Features::SSE
            | Features::SSE2
            | Features::SSE3
            | Features::SSSE3
            | Features::SSE41
            | Features::AVX;
        assert_eq!((base | Features::AVX2).normalized(), base);
        assert_eq!((base | Features::FMA3).normalized(), base);
        assert_eq!(
            (base | Features::AVX2 | Features::FMA3).normalized(),
            base | Features::AVX2 | Features::FMA3
        );
    }

    #[test]
    fn test_normalized_without_sse_is_empty() {
        let f = Features::SSE2 | Features::AVX | Features::AVX2 | Features::FMA3;
        assert!(f.normalized().is_empty());
    }

    #[test]
    fn test_caps_new_normalizes_but_from_raw_does_not() {
        let f = Features::SSE | Features::AVX;
        assert_eq!(CpuCaps::new(Vendor::Intel, f).features(), Features::SSE);
        assert_eq!(CpuCaps::from_raw(Vendor::Intel, f).features(), f);
    }

    #[test]
    fn test_display_lists_flags_in_order() {
        let caps = CpuCaps::new(
            Vendor::Amd,
            Features::SSE | Features::SSE2 | Features::SSE3,
        );
        assert_eq!(caps.to_string(), "AMD CPU, features: SSE SSE2 SSE3");
    }

    #[test]
    fn test_has_subset() {
        let f = Features::SSE | Features::SSE2;
        assert!(f.has(Features::SSE));
        assert!(f.has(Features::NONE));
        assert!(!f.has(Features::SSE | Features::SSE3));
    }

    #[test]
    fn test_from_bits_drops_unknown_bits() {
        assert_eq!(Features::from_bits(0xFFFF_FF00), Features::NONE);
        assert_eq!(Features::from_bits(0x101).bits(), 0x1);
    }
}
