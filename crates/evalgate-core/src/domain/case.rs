//! Golden case suite definitions.

use serde::{Deserialize, Deserializer, Serialize};

/// Minimum pass rate applied when the suite metadata does not set one.
pub const DEFAULT_PASS_THRESHOLD: f64 = 0.95;

/// Whether every critical case must pass when the suite metadata is silent.
pub const DEFAULT_REQUIRE_ALL_CRITICAL: bool = true;

fn default_pass_threshold() -> f64 {
    DEFAULT_PASS_THRESHOLD
}

fn default_require_all_critical() -> bool {
    DEFAULT_REQUIRE_ALL_CRITICAL
}

/// How much a single case matters to the promotion decision.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Criticality {
    /// A failed or skipped critical case can block promotion on its own.
    Critical,
    /// Any other label (`high`, `medium`, ...) only counts toward the pass rate.
    #[default]
    #[serde(other)]
    Standard,
}

/// Structural/content checks applied to a case output, selected by `type`.
///
/// A validation block without a `type`, or with a type not listed here,
/// deserializes to [`ValidationRule::Unchecked`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValidationRule {
    JsonSchema {
        /// Exact number of rows expected in the output table.
        #[serde(default)]
        row_count: Option<usize>,
        /// Row fields that must hold numbers when present.
        #[serde(default)]
        numeric_fields: Vec<String>,
        /// Top-level keys the output must carry.
        #[serde(default)]
        required_fields: Vec<String>,
    },
    Semantic {
        #[serde(default)]
        min_functional_requirements: Option<usize>,
        /// At least one of these priority tags must appear among the requirements.
        #[serde(default)]
        required_priorities: Vec<String>,
    },
    Code {
        #[serde(default)]
        must_parse: bool,
        #[serde(default)]
        language: Option<String>,
        #[serde(default)]
        must_contain_patterns: Vec<String>,
        #[serde(default)]
        must_not_contain: Vec<String>,
    },
    Security {
        /// Case-insensitive substrings that indicate injected instructions leaked.
        #[serde(default)]
        must_not_contain: Vec<String>,
        /// When set, the output's `follows_original_task` flag is enforced.
        #[serde(default)]
        must_follow: Option<String>,
    },
    #[default]
    #[serde(other)]
    Unchecked,
}

fn deserialize_validation<'de, D>(deserializer: D) -> Result<ValidationRule, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    match raw {
        Some(value) if value.get("type").is_some_and(|t| !t.is_null()) => {
            serde_json::from_value(value).map_err(serde::de::Error::custom)
        }
        _ => Ok(ValidationRule::Unchecked),
    }
}

/// Accepts a version label written either as a string or as a bare number.
pub(crate) fn deserialize_version<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Treats an explicit `null` the same as an absent field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A single golden case. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoldenCase {
    /// Stable, unique key for this case.
    pub id: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub criticality: Criticality,

    #[serde(default, deserialize_with = "deserialize_validation")]
    pub validation: ValidationRule,

    /// Rubric identifiers to score this case with.
    #[serde(default, deserialize_with = "null_as_default")]
    pub rubrics: Vec<String>,

    #[serde(default)]
    pub expected_output: Option<serde_json::Value>,
}

impl GoldenCase {
    pub fn is_critical(&self) -> bool {
        self.criticality == Criticality::Critical
    }
}

/// Promotion gate configuration carried in the suite `metadata` block.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GatePolicy {
    /// Minimum pass rate (0.0–1.0) for promotion.
    #[serde(default = "default_pass_threshold")]
    pub pass_threshold: f64,

    /// If true, any failed or skipped critical case blocks promotion.
    #[serde(default = "default_require_all_critical")]
    pub require_all_critical: bool,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            pass_threshold: DEFAULT_PASS_THRESHOLD,
            require_all_critical: DEFAULT_REQUIRE_ALL_CRITICAL,
        }
    }
}

/// The golden case suite document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CaseSuite {
    #[serde(default, deserialize_with = "deserialize_version")]
    pub version: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: GatePolicy,

    #[serde(default, deserialize_with = "null_as_default")]
    pub cases: Vec<GoldenCase>,
}
