//! Run report schema.
//!
//! Field declaration order is the serialized order, so the persisted
//! artifacts diff cleanly between runs. Maps use `BTreeMap` for the same
//! reason.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Outcome of a single golden case.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Passed,
    Failed,
    Skipped,
}

/// Per-case detail in the run report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseResult {
    pub case_id: String,
    pub status: CaseStatus,
    /// Rubric id → score in 0.0–1.0. Unknown, skipped and unhandled rubrics
    /// are absent.
    pub rubric_scores: BTreeMap<String, f64>,
    /// Reserved for an external latency collaborator; always null here.
    pub latency_ms: Option<u64>,
    /// Reserved for an external token-accounting collaborator; always null here.
    pub tokens_used: Option<BTreeMap<String, u64>>,
    /// The output that was evaluated.
    pub output: Option<serde_json::Value>,
    pub expected: Option<serde_json::Value>,
    /// Reserved for an external diff collaborator; always null here.
    pub diff: Option<serde_json::Value>,
    /// Violation codes and rubric advisories joined with `"; "`.
    pub notes: String,
}

impl CaseResult {
    pub fn is_failed_or_skipped(&self) -> bool {
        matches!(self.status, CaseStatus::Failed | CaseStatus::Skipped)
    }
}

/// Aggregate counts over the cases considered in a run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    pub total_cases: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// `passed / total_cases` rounded to 2 decimals; 0.0 for an empty run.
    pub pass_rate: f64,
}

/// The promotion decision.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GateStatus {
    pub meets_pass_rate: bool,
    /// A critical case failed or was skipped.
    pub critical_breach: bool,
    pub can_promote: bool,
}

/// Versions of everything that produced a report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VersionInfo {
    pub framework: String,
    pub case_suite: String,
    pub rubric_catalog: String,
    /// SHA-256 hex digest of the raw case suite document.
    pub case_suite_digest: String,
    /// SHA-256 hex digest of the raw rubric catalog document.
    pub rubric_catalog_digest: String,
}

/// Where the evaluated outputs came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Each case is evaluated against its own expected output.
    UseExpected,
    /// Outputs were supplied by an external producer.
    ExternalOutputs,
}

/// Echo of the run configuration. Labels are not interpreted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunConfigEcho {
    pub model: String,
    pub temperature: Option<f64>,
    pub mode: RunMode,
}

/// The full persisted record of one evaluation run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunReport {
    /// Unique per invocation, derived from a microsecond timestamp.
    pub execution_id: String,
    /// ISO-8601 UTC, second precision.
    pub timestamp: String,
    pub environment: String,
    pub version: VersionInfo,
    pub config: RunConfigEcho,
    pub summary: RunSummary,
    /// Catalog order, never execution order.
    pub results: Vec<CaseResult>,
    pub gate_status: GateStatus,
}

/// The `{summary, gate_status}` projection handed back to the caller.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GateOutcome {
    pub summary: RunSummary,
    pub gate_status: GateStatus,
}

impl RunReport {
    pub fn outcome(&self) -> GateOutcome {
        GateOutcome {
            summary: self.summary,
            gate_status: self.gate_status,
        }
    }

    /// Whether the run allows promotion to the target environment.
    pub fn can_promote(&self) -> bool {
        self.gate_status.can_promote
    }
}
