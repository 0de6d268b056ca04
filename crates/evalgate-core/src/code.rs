//! Output payload helpers shared by validation and rubric scoring.

use std::borrow::Cow;

use regex::Regex;
use rustpython_parser::{ast, Parse};

/// Language assumed when a check does not name one.
pub const DEFAULT_CODE_LANGUAGE: &str = "python";

/// Output fields that may carry a code payload, in priority order.
pub const CODE_FIELDS: [&str; 3] = ["code", "tests", "test_code"];

/// Look up the first of several alternative keys on a JSON object.
///
/// Structured outputs use English keys; older golden sets use Portuguese
/// ones, so every field read goes through an alias list.
pub fn lookup<'a>(value: &'a serde_json::Value, keys: &[&str]) -> Option<&'a serde_json::Value> {
    let obj = value.as_object()?;
    keys.iter().find_map(|k| obj.get(*k))
}

/// Extract the code payload: the first non-empty string among
/// [`CODE_FIELDS`], or the output itself when it is a string.
pub fn extract_code(output: &serde_json::Value) -> Option<&str> {
    match output {
        serde_json::Value::String(s) => Some(s.as_str()),
        serde_json::Value::Object(obj) => CODE_FIELDS
            .iter()
            .filter_map(|k| obj.get(*k).and_then(|v| v.as_str()))
            .find(|s| !s.is_empty()),
        _ => None,
    }
}

/// Strings are used as-is; anything else is serialized to compact JSON.
pub fn stringify(output: &serde_json::Value) -> Cow<'_, str> {
    match output {
        serde_json::Value::String(s) => Cow::Borrowed(s.as_str()),
        other => Cow::Owned(other.to_string()),
    }
}

/// Already structured, or a string that parses as JSON.
pub fn is_structured(output: &serde_json::Value) -> bool {
    match output {
        serde_json::Value::Object(_) | serde_json::Value::Array(_) => true,
        serde_json::Value::String(s) => serde_json::from_str::<serde_json::Value>(s).is_ok(),
        _ => false,
    }
}

/// Whether `code` is valid source in `language`.
///
/// Python is the only language with a wired parser; every other language
/// degrades to a non-empty check.
pub fn syntax_ok(code: &str, language: &str) -> bool {
    if language.eq_ignore_ascii_case("python") {
        ast::Suite::parse(code, "<golden-output>").is_ok()
    } else {
        !code.trim().is_empty()
    }
}

/// Compile each pattern on its own. Returns the usable regexes and the
/// source text of the ones that failed to compile.
pub fn compile_each(patterns: &[String]) -> (Vec<Regex>, Vec<&str>) {
    let mut compiled = Vec::with_capacity(patterns.len());
    let mut invalid = Vec::new();
    for pattern in patterns {
        match Regex::new(pattern) {
            Ok(re) => compiled.push(re),
            Err(_) => invalid.push(pattern.as_str()),
        }
    }
    (compiled, invalid)
}

/// Case-insensitive substring search. Empty needles never match.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    !needle.is_empty() && haystack.to_lowercase().contains(&needle.to_lowercase())
}
