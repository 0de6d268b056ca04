//! Extracted-entity set comparison.
//!
//! An entity is reduced to a `(type, value)` pair, both lower-cased and the
//! value trimmed, so `{"type": "EMAIL", "value": " A@X.com "}` and
//! `{"type": "email", "value": "a@x.com"}` compare equal.

use std::collections::BTreeSet;

use crate::code::lookup;
use crate::domain::round2;

const ENTITY_LIST_KEYS: [&str; 2] = ["entities", "entidades"];
const ENTITY_TYPE_KEYS: [&str; 2] = ["type", "tipo"];
const NORMALIZED_VALUE_KEYS: [&str; 2] = ["normalized_value", "valor_normalizado"];
const RAW_VALUE_KEYS: [&str; 2] = ["value", "valor"];

/// Normalized identity of one extracted entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityKey {
    pub kind: String,
    pub value: String,
}

fn scalar_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(true) => Some("true".to_string()),
        _ => None,
    }
}

/// Normalize one entity record. The normalized value wins over the raw one.
pub fn normalize_entity(record: &serde_json::Value) -> EntityKey {
    let kind = lookup(record, &ENTITY_TYPE_KEYS)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_lowercase();
    let value = lookup(record, &NORMALIZED_VALUE_KEYS)
        .and_then(scalar_text)
        .or_else(|| lookup(record, &RAW_VALUE_KEYS).and_then(scalar_text))
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    EntityKey { kind, value }
}

/// Collect the normalized entity set of a document. Non-record entries are
/// ignored; a document without an entity list yields the empty set.
pub fn entity_set(document: &serde_json::Value) -> BTreeSet<EntityKey> {
    lookup(document, &ENTITY_LIST_KEYS)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter(|item| item.is_object())
                .map(normalize_entity)
                .collect()
        })
        .unwrap_or_default()
}

/// |output ∩ expected| / |expected|, 1.0 when nothing is expected.
pub fn recall(output: &serde_json::Value, expected: Option<&serde_json::Value>) -> f64 {
    let expected_set = expected.map(entity_set).unwrap_or_default();
    if expected_set.is_empty() {
        return 1.0;
    }
    let output_set = entity_set(output);
    let hits = output_set.intersection(&expected_set).count();
    round2(hits as f64 / expected_set.len() as f64)
}

/// |output ∩ expected| / |output|, 0.0 when nothing was produced.
pub fn precision(output: &serde_json::Value, expected: Option<&serde_json::Value>) -> f64 {
    let output_set = entity_set(output);
    if output_set.is_empty() {
        return 0.0;
    }
    let expected_set = expected.map(entity_set).unwrap_or_default();
    let hits = output_set.intersection(&expected_set).count();
    round2(hits as f64 / output_set.len() as f64)
}
