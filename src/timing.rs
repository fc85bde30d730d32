//! Best-of-N timing for the verification harness
//!
//! Each measured operation runs many times on freshly prepared inputs and keeps
//! the fastest run, which rejects scheduler and cache noise. The cost of an
//! empty timed region is measured once and subtracted from every sample.

use std::hint::black_box;
use std::time::Instant;

/// Timer with a calibrated baseline; ticks are nanoseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingProbe {
    baseline: u64,
}

impl TimingProbe {
    /// Probe with a known baseline, mostly for tests
    pub const fn with_baseline(baseline: u64) -> Self {
        Self { baseline }
    }

    /// Measure the overhead of an empty timed region
    pub fn calibrate(iterations: usize) -> Self {
        let mut best = u64::MAX;
        for _ in 0..iterations.max(1) {
            let start = Instant::now();
            black_box(());
            best = best.min(elapsed_ticks(start));
        }
        tracing::debug!(baseline = best, "timer calibrated");
        Self { baseline: best }
    }

    pub fn baseline(&self) -> u64 {
        self.baseline
    }

    /// Fastest of `iterations` runs of `op`, baseline removed
    ///
    /// `setup` prepares fresh state before every run and is not timed. Returns
    /// the state left by the last run.
    pub fn best_of<S>(
        &self,
        iterations: usize,
        mut setup: impl FnMut() -> S,
        mut op: impl FnMut(&mut S),
    ) -> (u64, S) {
        let mut best = u64::MAX;
        let mut state = setup();
        for i in 0..iterations.max(1) {
            if i > 0 {
                state = setup();
            }
            let start = Instant::now();
            op(black_box(&mut state));
            best = best.min(elapsed_ticks(start));
        }
        (best.saturating_sub(self.baseline), state)
    }
}

#[inline]
fn elapsed_ticks(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX)
}

/// Time saved by `candidate` relative to `reference`, in percent
///
/// `None` when the reference took no measurable time. Negative when the
/// candidate is slower.
pub fn speedup_percent(reference: u64, candidate: u64) -> Option<i64> {
    if reference == 0 {
        return None;
    }
    let reference = i128::from(reference);
    let saved = reference - i128::from(candidate);
    i64::try_from(saved * 100 / reference).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_of_runs_setup_every_iteration() {
        let probe = TimingProbe::with_baseline(0);
        let mut setups = 0;
        let (_, state) = probe.best_of(
            5,
            || {
                setups += 1;
                vec![1.0f32; 4]
            },
            |v| v.iter_mut().for_each(|x| *x += 1.0),
        );
        assert_eq!(setups, 5);
        // Fresh state per run, so only one increment is visible
        assert_eq!(state, vec![2.0; 4]);
    }

    #[test]
    fn test_zero_iterations_still_runs_once() {
        let probe = TimingProbe::with_baseline(0);
        let (_, ran) = probe.best_of(0, || false, |r| *r = true);
        assert!(ran);
    }

    #[test]
    fn test_baseline_saturates() {
        let probe = TimingProbe::with_baseline(u64::MAX);
        let (ticks, _) = probe.best_of(1, || (), |_| ());
        assert_eq!(ticks, 0);
    }

    #[test]
    fn test_speedup_percent() {
        assert_eq!(speedup_percent(200, 50), Some(75));
        assert_eq!(speedup_percent(100, 150), Some(-50));
        assert_eq!(speedup_percent(0, 10), None);
        assert_eq!(speedup_percent(u64::MAX, 0), Some(100));
    }

    #[test]
    fn test_calibrate_is_small() {
        let probe = TimingProbe::calibrate(64);
        assert!(probe.baseline() < 1_000_000);
    }
}
