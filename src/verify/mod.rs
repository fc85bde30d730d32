//! Differential verification of a backend against the reference
//!
//! The harness runs every kernel of the catalogue on the reference backend and
//! on a candidate, using identical seeded inputs, and checks the two outputs
//! agree within a per-operation tolerance. Each run is also timed best-of-N so
//! the report doubles as a speedup table.
//!
//! A mismatch is recorded and logged, never fatal: the harness always runs
//! every selected group to the end.
//!
//! # Example
//!
//! ```
//! use rayo::verify::{HarnessConfig, TestGroups, VerificationHarness};
//! use rayo::GenericProcessor;
//!
//! let config = HarnessConfig::new()
//!     .with_iterations(1)
//!     .with_count(64)
//!     .with_groups(TestGroups::ARITHMETIC);
//! let candidate = GenericProcessor;
//! let mut out = Vec::new();
//! let report = VerificationHarness::new(config, &candidate, &mut out).run().unwrap();
//! assert!(report.all_passed());
//! ```

use std::fmt;
use std::io::Write;

use crate::backends::SimdProcessor;
use crate::error::Result;
use crate::random::{SeededRandom, DEFAULT_SEED};
use crate::registry;
use crate::timing::TimingProbe;

mod arith;
mod audio;
pub mod compare;
mod geometry;
pub mod inputs;
mod linalg;
mod report;

pub use report::{timing_line, OperationResult, TimingSample, VerificationReport, SEPARATOR};

/// Bitmask of operation groups to exercise
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct TestGroups(u32);

impl TestGroups {
    /// Elementwise arithmetic, dot products, compares, min/max, clamp, memory
    pub const ARITHMETIC: Self = Self(1);
    /// Dense matrix products, triangular solves, LDLᵀ
    pub const LINEAR_ALGEBRA: Self = Self(2);
    /// Animation, culling, surface derivation, shadow caches, texture compression
    pub const GEOMETRY: Self = Self(4);
    /// Resampling, mixing and quantization
    pub const AUDIO: Self = Self(8);
    pub const ALL: Self = Self(1 | 2 | 4 | 8);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, group: Self) -> bool {
        self.0 & group.0 != 0
    }

    /// Parse the command-line group argument
    ///
    /// A missing or non-numeric argument selects every group. Negative values
    /// keep their two's complement bits, so `-1` is every group too.
    pub fn parse(arg: Option<&str>) -> Self {
        match arg.map(str::trim).and_then(|s| s.parse::<i64>().ok()) {
            Some(v) => Self(v as u32),
            None => Self::ALL,
        }
    }
}

impl Default for TestGroups {
    fn default() -> Self {
        Self::ALL
    }
}

impl std::ops::BitOr for TestGroups {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for TestGroups {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TestGroups({:#x})", self.0)
    }
}

/// Harness parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    iterations: usize,
    count: usize,
    seed: u32,
    groups: TestGroups,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            iterations: 2048,
            count: 1024,
            seed: DEFAULT_SEED,
            groups: TestGroups::ALL,
        }
    }
}

impl HarnessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timed runs per operation; the fastest is kept
    #[must_use]
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations.max(1);
        self
    }

    /// Element count for the flat-array operations
    #[must_use]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_groups(mut self, groups: TestGroups) -> Self {
        self.groups = groups;
        self
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn groups(&self) -> TestGroups {
        self.groups
    }
}

/// Reference-versus-candidate runner writing the diagnostic stream to `out`
pub struct VerificationHarness<'a, W: Write> {
    config: HarnessConfig,
    reference: Box<dyn SimdProcessor>,
    candidate: &'a dyn SimdProcessor,
    timer: TimingProbe,
    rng: SeededRandom,
    out: W,
    results: Vec<OperationResult>,
}

impl<'a, W: Write> VerificationHarness<'a, W> {
    pub fn new(config: HarnessConfig, candidate: &'a dyn SimdProcessor, out: W) -> Self {
        let timer = TimingProbe::calibrate(config.iterations);
        let rng = SeededRandom::new(config.seed);
        Self {
            config,
            reference: registry::reference(),
            candidate,
            timer,
            rng,
            out,
            results: Vec::new(),
        }
    }

    /// Run every selected group and return the collected results
    ///
    /// # Errors
    ///
    /// Only writing to `out` can fail; mismatches are part of the report.
    pub fn run(mut self) -> Result<VerificationReport> {
        let groups = self.config.groups;
        tracing::info!(
            reference = self.reference.name(),
            candidate = self.candidate.name(),
            groups = groups.bits(),
            "verification started"
        );

        writeln!(self.out, "{SEPARATOR}")?;
        if groups.contains(TestGroups::ARITHMETIC) {
            arith::run(&mut self)?;
            writeln!(self.out, "{SEPARATOR}")?;
        }
        if groups.contains(TestGroups::LINEAR_ALGEBRA) {
            linalg::run(&mut self)?;
            writeln!(self.out, "{SEPARATOR}")?;
        }
        if groups.contains(TestGroups::GEOMETRY) {
            geometry::run(&mut self)?;
            writeln!(self.out, "{SEPARATOR}")?;
        }
        if groups.contains(TestGroups::AUDIO) {
            audio::run(&mut self)?;
            writeln!(self.out, "{SEPARATOR}")?;
        }
        self.out.flush()?;

        let report =
            VerificationReport::new(self.reference.name(), self.candidate.name(), self.results);
        tracing::info!(
            operations = report.results().len(),
            failed = report.failures().count(),
            "verification finished"
        );
        Ok(report)
    }

    pub(crate) fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub(crate) fn rng(&mut self) -> &mut SeededRandom {
        &mut self.rng
    }

    /// Time `op` on both backends and judge the candidate's state
    ///
    /// `setup` builds fresh inputs for every run, so accumulating kernels see
    /// the same starting state each time.
    pub(crate) fn compare<S>(
        &mut self,
        label: &str,
        count: usize,
        setup: impl Fn() -> S,
        op: impl Fn(&dyn SimdProcessor, &mut S),
        agree: impl Fn(&S, &S) -> bool,
    ) -> Result<bool> {
        let iterations = self.config.iterations;
        self.compare_n(label, count, iterations, setup, op, agree)
    }

    /// [`compare`](Self::compare) with a single timed run, for input sweeps
    pub(crate) fn check<S>(
        &mut self,
        label: &str,
        count: usize,
        setup: impl Fn() -> S,
        op: impl Fn(&dyn SimdProcessor, &mut S),
        agree: impl Fn(&S, &S) -> bool,
    ) -> Result<bool> {
        self.compare_n(label, count, 1, setup, op, agree)
    }

    fn compare_n<S>(
        &mut self,
        label: &str,
        count: usize,
        iterations: usize,
        setup: impl Fn() -> S,
        op: impl Fn(&dyn SimdProcessor, &mut S),
        agree: impl Fn(&S, &S) -> bool,
    ) -> Result<bool> {
        let reference = self.reference.as_ref();
        let candidate = self.candidate;

        let (ref_ticks, expected) = self.timer.best_of(iterations, &setup, |s| op(reference, s));
        let (cand_ticks, actual) = self.timer.best_of(iterations, &setup, |s| op(candidate, s));
        let passed = agree(&expected, &actual);

        let ref_label = format!("{}->{}", reference.name(), label);
        let marker = if passed { "ok" } else { "X" };
        let cand_label = format!("   {}->{} {}", candidate.name(), label, marker);
        writeln!(self.out, "{}", timing_line(&ref_label, count, ref_ticks, None))?;
        writeln!(self.out, "{}", timing_line(&cand_label, count, cand_ticks, Some(ref_ticks)))?;

        tracing::debug!(op = label, count, reference = ref_ticks, candidate = cand_ticks, "timed");
        if !passed {
            tracing::warn!(
                op = label,
                count,
                candidate = candidate.name(),
                "candidate output disagrees with reference"
            );
        }

        self.results.push(OperationResult {
            label: label.to_string(),
            count,
            timing: TimingSample {
                reference: ref_ticks,
                candidate: cand_ticks,
                baseline: self.timer.baseline(),
            },
            passed,
        });
        Ok(passed)
    }
}

/// Verify `candidate` with `config`, writing the diagnostic lines to `out`
///
/// # Errors
///
/// Fails only when writing to `out` fails
pub fn verify<W: Write>(
    candidate: &dyn SimdProcessor,
    config: HarnessConfig,
    out: W,
) -> Result<VerificationReport> {
    VerificationHarness::new(config, candidate, out).run()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::GenericProcessor;

    #[test]
    fn test_groups_parse() {
        assert_eq!(TestGroups::parse(None), TestGroups::ALL);
        assert_eq!(TestGroups::parse(Some("abc")), TestGroups::ALL);
        assert_eq!(TestGroups::parse(Some("2")), TestGroups::LINEAR_ALGEBRA);
        assert_eq!(TestGroups::parse(Some(" 9 ")).bits(), 9);
        assert!(TestGroups::parse(Some("-1")).contains(TestGroups::AUDIO));
        assert!(!TestGroups::parse(Some("0")).contains(TestGroups::ARITHMETIC));
    }

    #[test]
    fn test_config_defaults() {
        let c = HarnessConfig::new();
        assert_eq!(c.iterations(), 2048);
        assert_eq!(c.count(), 1024);
        assert_eq!(c.seed(), 1_013_904_223);
        assert_eq!(c.groups(), TestGroups::ALL);
        assert_eq!(HarnessConfig::new().with_iterations(0).iterations(), 1);
    }

    #[test]
    fn test_no_groups_prints_only_separator() {
        let config = HarnessConfig::new()
            .with_iterations(1)
            .with_groups(TestGroups::from_bits(0));
        let mut out = Vec::new();
        let report = verify(&GenericProcessor, config, &mut out).unwrap();
        assert!(report.results().is_empty());
        assert_eq!(String::from_utf8(out).unwrap(), format!("{SEPARATOR}\n"));
    }

    #[test]
    fn test_compare_records_failures_and_continues() {
        let mut out = Vec::new();
        let candidate = GenericProcessor;
        let config = HarnessConfig::new().with_iterations(1);
        let mut h = VerificationHarness::new(config, &candidate, &mut out);
        let ok = h
            .compare("always", 4, || 0u8, |_, s| *s += 1, |a, b| a == b)
            .unwrap();
        let bad = h
            .compare("never", 4, || 0u8, |_, s| *s += 1, |_, _| false)
            .unwrap();
        assert!(ok);
        assert!(!bad);
        assert_eq!(h.results.len(), 2);
        drop(h);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Generic->always"));
        assert!(lines[1].starts_with("   Generic->always ok"));
        assert!(lines[3].starts_with("   Generic->never X"));
    }
}
