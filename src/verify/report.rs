//! Per-operation results and the diagnostic line format

use std::fmt;

use crate::timing::speedup_percent;

/// Column the element count starts in
pub const LABEL_WIDTH: usize = 48;

/// Line printed between operation groups
pub const SEPARATOR: &str = "====================================";

/// Best-of-N ticks for one operation, baseline already removed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingSample {
    pub reference: u64,
    pub candidate: u64,
    /// Timer overhead that was subtracted from both
    pub baseline: u64,
}

impl TimingSample {
    /// Percentage of the reference time the candidate saved
    pub fn speedup_percent(&self) -> Option<i64> {
        speedup_percent(self.reference, self.candidate)
    }
}

/// Outcome of one compared operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationResult {
    pub label: String,
    pub count: usize,
    pub timing: TimingSample,
    pub passed: bool,
}

/// Everything one harness run produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    reference: &'static str,
    candidate: &'static str,
    results: Vec<OperationResult>,
}

impl VerificationReport {
    pub(crate) fn new(
        reference: &'static str,
        candidate: &'static str,
        results: Vec<OperationResult>,
    ) -> Self {
        Self {
            reference,
            candidate,
            results,
        }
    }

    pub fn reference(&self) -> &'static str {
        self.reference
    }

    pub fn candidate(&self) -> &'static str {
        self.candidate
    }

    pub fn results(&self) -> &[OperationResult] {
        &self.results
    }

    /// Operations whose candidate output disagreed with the reference
    pub fn failures(&self) -> impl Iterator<Item = &OperationResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    pub fn all_passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failed = self.failures().count();
        write!(
            f,
            "{} vs {}: {} operations, {} failed",
            self.candidate,
            self.reference,
            self.results.len(),
            failed
        )
    }
}

/// `{label:<48}c = {count:4}, ticks = {ticks:5}[, {percent}%]`
///
/// The percentage is printed only for candidate lines, when the reference
/// time is positive.
pub fn timing_line(label: &str, count: usize, ticks: u64, reference: Option<u64>) -> String {
    let mut line = format!(
        "{label:<width$}c = {count:4}, ticks = {ticks:5}",
        width = LABEL_WIDTH
    );
    if let Some(p) = reference.and_then(|r| speedup_percent(r, ticks)) {
        line.push_str(&format!(", {p}%"));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(label: &str, passed: bool) -> OperationResult {
        OperationResult {
            label: label.to_string(),
            count: 4,
            timing: TimingSample {
                reference: 10,
                candidate: 5,
                baseline: 1,
            },
            passed,
        }
    }

    #[test]
    fn test_reference_line_layout() {
        let line = timing_line("Generic->add( float + float[] )", 1024, 731, None);
        assert_eq!(&line[LABEL_WIDTH..], "c = 1024, ticks =   731");
        assert!(line.starts_with("Generic->add( float + float[] ) "));
    }

    #[test]
    fn test_candidate_line_has_percent() {
        let line = timing_line("   AVX->add( float + float[] ) ok", 1024, 200, Some(800));
        assert!(line.ends_with("c = 1024, ticks =   200, 75%"));
        let slower = timing_line("   AVX->x ok", 4, 200, Some(100));
        assert!(slower.ends_with(", -100%"));
        let untimed = timing_line("   AVX->x ok", 4, 200, Some(0));
        assert!(untimed.ends_with("ticks =   200"));
    }

    #[test]
    fn test_long_labels_are_not_truncated() {
        let label = "x".repeat(60);
        let line = timing_line(&label, 1, 1, None);
        assert!(line.starts_with(&label));
        assert!(line.ends_with("c =    1, ticks =     1"));
    }

    #[test]
    fn test_report_failures() {
        let report = VerificationReport::new(
            "Generic",
            "SSE",
            vec![result("a", true), result("b", false), result("c", true)],
        );
        assert!(!report.all_passed());
        let failed: Vec<_> = report.failures().map(|r| r.label.as_str()).collect();
        assert_eq!(failed, ["b"]);
        assert_eq!(report.to_string(), "SSE vs Generic: 3 operations, 1 failed");
        assert_eq!(report.results()[0].timing.speedup_percent(), Some(50));
    }

    #[test]
    fn test_separator_width() {
        assert_eq!(SEPARATOR.len(), 36);
    }
}
