//! evalgate Core Library
//!
//! Evaluates a fixed suite of golden cases against externally produced
//! outputs and decides whether a project may be promoted to a more
//! restrictive environment.

pub mod catalog;
pub mod classify;
pub mod code;
pub mod domain;
pub mod engine;
pub mod entities;
pub mod gate;
pub mod obs;
pub mod parallel;
pub mod reporting;
pub mod scoring;
pub mod telemetry;
pub mod validation;

pub use catalog::{index_rubrics, Catalog, OutputSet, UNKNOWN_VERSION};
pub use classify::{classify_case, OUTPUT_MISSING_NOTE};
pub use domain::{
    round2, CaseResult, CaseStatus, CaseSuite, Criticality, Document, EvalError, EvaluationKind,
    GateOutcome, GatePolicy, GateStatus, GoldenCase, Result, RubricCatalog, RubricDefinition,
    RubricEvaluation, RubricMethod, RunConfigEcho, RunMode, RunReport, RunSummary,
    ValidationRule, VersionInfo, DEFAULT_PASS_THRESHOLD, DEFAULT_REQUIRE_ALL_CRITICAL,
    DEFAULT_RUBRIC_THRESHOLD,
};
pub use engine::{
    CaseOptions, EvalEngine, RunConfig, DEFAULT_ENVIRONMENT, DEFAULT_MODEL_LABEL,
    FRAMEWORK_VERSION,
};
pub use entities::{normalize_entity, precision, recall, EntityKey};
pub use gate::{
    evaluate_gate, pass_rate, tally, GateRule, GateVerdict, GateViolation, RunTally,
};
pub use obs::{
    emit_case_evaluated, emit_gate_evaluated, emit_report_persisted, emit_run_started,
    emit_unknown_case_ids, run_span, RunSpan,
};
pub use reporting::{render_report_json, PersistedReport, ReportStore};
pub use scoring::{score_rubrics, RubricOutcome, DEFAULT_MIN_TESTS};
pub use telemetry::{init_tracing, LogFormat, LOG_ENV_VAR};
pub use validation::{validate, Violation};

/// evalgate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
