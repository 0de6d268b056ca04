//! Structured observability hooks for evaluation run lifecycle events.
//!
//! This module provides:
//! - A run-scoped tracing span via the `RunSpan` RAII guard
//! - Emission functions for key lifecycle events: start, gate evaluation,
//!   report persistence
//!
//! Events are emitted at `info!` level (configurable via `EVALGATE_LOG`).

use std::path::Path;

use tracing::{debug, info, warn};

use crate::domain::CaseResult;
use crate::gate::GateVerdict;

/// RAII guard that enters a run-scoped tracing span for the duration of a run.
///
/// # Example
///
/// ```ignore
/// let _span = RunSpan::enter("eval-20260101120000000000", "staging");
/// // every event below is tagged with execution_id and environment
/// ```
pub struct RunSpan {
    _span: tracing::span::EnteredSpan,
}

impl RunSpan {
    /// Create and enter a span tagged with the execution id and environment.
    pub fn enter(execution_id: &str, environment: &str) -> Self {
        Self {
            _span: run_span(execution_id, environment).entered(),
        }
    }
}

/// The run-scoped span, for async code that attaches it with `Instrument`.
pub fn run_span(execution_id: &str, environment: &str) -> tracing::Span {
    tracing::info_span!(
        "evalgate.run",
        execution_id = %execution_id,
        environment = %environment,
    )
}

/// Emit event: run started over `cases` considered cases.
pub fn emit_run_started(execution_id: &str, environment: &str, cases: usize, workers: usize) {
    info!(
        event = "eval.run_started",
        execution_id = %execution_id,
        environment = %environment,
        cases = cases,
        workers = workers,
    );
}

/// Emit event: requested case ids that the catalog does not contain.
pub fn emit_unknown_case_ids(ids: &[&str]) {
    warn!(
        event = "eval.unknown_case_ids",
        count = ids.len(),
        ids = %ids.join(","),
        "requested cases not in catalog; ignored"
    );
}

/// Emit event: one case classified.
pub fn emit_case_evaluated(result: &CaseResult) {
    debug!(
        event = "eval.case_evaluated",
        case_id = %result.case_id,
        status = ?result.status,
        rubrics_scored = result.rubric_scores.len(),
    );
}

/// Emit event: gate evaluated, with every blocking reason.
pub fn emit_gate_evaluated(execution_id: &str, pass_rate: f64, verdict: &GateVerdict) {
    info!(
        event = "eval.gate_evaluated",
        execution_id = %execution_id,
        pass_rate = pass_rate,
        meets_pass_rate = verdict.status.meets_pass_rate,
        critical_breach = verdict.status.critical_breach,
        can_promote = verdict.status.can_promote,
    );
    for violation in &verdict.violations {
        info!(event = "eval.gate_blocked", rule = ?violation.rule, reason = %violation.reason);
    }
}

/// Emit event: report artifacts written.
pub fn emit_report_persisted(artifact: &Path, latest: &Path) {
    info!(
        event = "eval.report_persisted",
        artifact = %artifact.display(),
        latest = %latest.display(),
    );
}
