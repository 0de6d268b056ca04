//! Run aggregation and the promotion gate.
//!
//! Folds [`CaseResult`]s into a [`RunSummary`], then evaluates the
//! [`GatePolicy`] rules against it to produce a [`GateVerdict`]: the
//! pass/fail decision that allows or blocks promotion to the target
//! environment.

use serde::{Deserialize, Serialize};

use crate::domain::{round2, CaseResult, CaseStatus, GatePolicy, GateStatus, GoldenCase, RunSummary};

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Single-writer tally over the considered cases.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunTally {
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// A critical case failed or was skipped.
    pub critical_breach: bool,
}

impl RunTally {
    pub fn record(&mut self, case: &GoldenCase, result: &CaseResult) {
        match result.status {
            CaseStatus::Passed => self.passed += 1,
            CaseStatus::Failed => self.failed += 1,
            CaseStatus::Skipped => self.skipped += 1,
        }
        if case.is_critical() && result.is_failed_or_skipped() {
            self.critical_breach = true;
        }
    }

    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }

    pub fn summary(&self) -> RunSummary {
        let total = self.total();
        RunSummary {
            total_cases: total,
            passed: self.passed,
            failed: self.failed,
            skipped: self.skipped,
            pass_rate: pass_rate(self.passed, total),
        }
    }
}

/// Fold paired cases and results into a tally.
pub fn tally<'a, I>(pairs: I) -> RunTally
where
    I: IntoIterator<Item = (&'a GoldenCase, &'a CaseResult)>,
{
    pairs
        .into_iter()
        .fold(RunTally::default(), |mut tally, (case, result)| {
            tally.record(case, result);
            tally
        })
}

/// `passed / total` rounded to 2 decimals; 0.0 when nothing was considered.
pub fn pass_rate(passed: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        round2(passed as f64 / total as f64)
    }
}

// ---------------------------------------------------------------------------
// Gate rules
// ---------------------------------------------------------------------------

/// A single gate rule that can block promotion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GateRule {
    /// Pass rate must meet or exceed `GatePolicy::pass_threshold`.
    MinPassRate,
    /// Every critical case must pass, when `GatePolicy::require_all_critical`.
    RequireAllCritical,
}

/// A single rule violation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GateViolation {
    /// Which rule was violated.
    pub rule: GateRule,
    /// Human-readable explanation.
    pub reason: String,
}

/// The outcome of evaluating the gate policy against a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GateVerdict {
    pub status: GateStatus,
    /// Violations found (empty when promotion is allowed).
    pub violations: Vec<GateViolation>,
}

impl GateVerdict {
    pub fn can_promote(&self) -> bool {
        self.status.can_promote
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Evaluate the gate:
/// `can_promote = meets_pass_rate && !(require_all_critical && critical_breach)`.
pub fn evaluate_gate(policy: &GatePolicy, summary: &RunSummary, critical_breach: bool) -> GateVerdict {
    let mut violations = Vec::new();

    let meets_pass_rate = summary.pass_rate >= policy.pass_threshold;
    if !meets_pass_rate {
        violations.push(GateViolation {
            rule: GateRule::MinPassRate,
            reason: format!(
                "pass rate {:.2}% < required {:.2}%",
                summary.pass_rate * 100.0,
                policy.pass_threshold * 100.0,
            ),
        });
    }

    let critical_blocks = policy.require_all_critical && critical_breach;
    if critical_blocks {
        violations.push(GateViolation {
            rule: GateRule::RequireAllCritical,
            reason: "at least one critical case failed or was skipped".to_string(),
        });
    }

    GateVerdict {
        status: GateStatus {
            meets_pass_rate,
            critical_breach,
            can_promote: meets_pass_rate && !critical_blocks,
        },
        violations,
    }
}
