//! Rubric catalog definitions and scoring-method dispatch tags.

use serde::{Deserialize, Serialize};

use super::case::{deserialize_version, null_as_default};

/// Score a rubric must reach when its definition carries no threshold.
pub const DEFAULT_RUBRIC_THRESHOLD: f64 = 1.0;

/// Who evaluates a rubric.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationKind {
    /// Needs an external judge model. Never invoked by this engine.
    LlmJudge,
    /// Scored deterministically by one of the [`RubricMethod`]s.
    #[default]
    #[serde(other)]
    RuleBased,
}

/// Closed set of deterministic scoring methods, keyed by the `method` tag.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RubricMethod {
    JsonParse,
    SetComparison,
    PrecisionCalculation,
    FieldPresence,
    SyntaxCheck,
    PatternCheck,
    TestStructureCheck,
    InjectionCheck,
    LatencyCheck,
    /// Any method name this engine does not implement. Produces no score.
    #[default]
    #[serde(other)]
    Unhandled,
}

/// The `evaluation` block of a rubric.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RubricEvaluation {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: EvaluationKind,

    /// A missing or `null` method is [`RubricMethod::Unhandled`].
    #[serde(default, deserialize_with = "null_as_default")]
    pub method: RubricMethod,

    /// Method-specific parameters, interpreted by the scoring dispatcher.
    #[serde(default, deserialize_with = "null_as_default")]
    pub config: serde_json::Map<String, serde_json::Value>,

    /// Legacy location for `field_presence` parameters, outside `config`.
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub required_fields: Vec<String>,
}

/// A single rubric from the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RubricDefinition {
    pub id: String,

    #[serde(default)]
    pub threshold: Option<f64>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub evaluation: RubricEvaluation,
}

impl RubricDefinition {
    /// Effective pass threshold, falling back to [`DEFAULT_RUBRIC_THRESHOLD`].
    pub fn threshold(&self) -> f64 {
        self.threshold.unwrap_or(DEFAULT_RUBRIC_THRESHOLD)
    }

    pub fn is_llm_judge(&self) -> bool {
        self.evaluation.kind == EvaluationKind::LlmJudge
    }
}

/// The rubric catalog document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RubricCatalog {
    #[serde(default, deserialize_with = "deserialize_version")]
    pub version: Option<String>,

    #[serde(default)]
    pub rubrics: Vec<RubricDefinition>,
}
