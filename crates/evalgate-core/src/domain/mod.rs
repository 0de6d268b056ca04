//! Domain models for evalgate.
//!
//! Canonical definitions for the core entities:
//! - `GoldenCase` / `CaseSuite`: the fixed suite of golden cases
//! - `RubricDefinition` / `RubricCatalog`: scoring rubrics
//! - `CaseResult` / `RunReport`: what a run produces

pub mod case;
pub mod error;
pub mod report;
pub mod rubric;

pub use case::{
    CaseSuite, Criticality, GatePolicy, GoldenCase, ValidationRule, DEFAULT_PASS_THRESHOLD,
    DEFAULT_REQUIRE_ALL_CRITICAL,
};
pub use error::{Document, EvalError, Result};
pub use report::{
    CaseResult, CaseStatus, GateOutcome, GateStatus, RunConfigEcho, RunMode, RunReport,
    RunSummary, VersionInfo,
};
pub use rubric::{
    EvaluationKind, RubricCatalog, RubricDefinition, RubricEvaluation, RubricMethod,
    DEFAULT_RUBRIC_THRESHOLD,
};

/// Round to 2 decimal places, the precision of every reported ratio.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
