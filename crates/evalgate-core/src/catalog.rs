//! Loads the case suite, the rubric catalog and externally produced outputs.
//!
//! A malformed suite or catalog is fatal: the run aborts before any case is
//! evaluated. A missing rubric id at lookup time is not an error.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::domain::{
    CaseSuite, Document, EvalError, GatePolicy, GoldenCase, Result, RubricCatalog,
    RubricDefinition,
};

/// Version label echoed when a document does not declare one.
pub const UNKNOWN_VERSION: &str = "unknown";

fn read_document(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| EvalError::io(path, e))
}

fn sha256_hex(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// Build the id → rubric index. Duplicate ids overwrite silently; last wins.
pub fn index_rubrics(rubrics: Vec<RubricDefinition>) -> HashMap<String, RubricDefinition> {
    rubrics.into_iter().map(|r| (r.id.clone(), r)).collect()
}

/// The loaded, immutable inputs of a run.
#[derive(Debug, Clone)]
pub struct Catalog {
    suite: CaseSuite,
    rubrics: HashMap<String, RubricDefinition>,
    rubric_version: Option<String>,
    suite_digest: String,
    rubric_digest: String,
}

impl Catalog {
    /// Read and parse both documents from disk.
    pub fn load(suite_path: impl AsRef<Path>, rubrics_path: impl AsRef<Path>) -> Result<Self> {
        let suite_raw = read_document(suite_path.as_ref())?;
        let rubrics_raw = read_document(rubrics_path.as_ref())?;
        Self::from_documents(&suite_raw, &rubrics_raw)
    }

    /// Parse both documents from their raw JSON text.
    pub fn from_documents(suite_raw: &str, rubrics_raw: &str) -> Result<Self> {
        let suite: CaseSuite = serde_json::from_str(suite_raw).map_err(|source| {
            EvalError::Parse {
                document: Document::CaseSuite,
                source,
            }
        })?;
        let catalog: RubricCatalog = serde_json::from_str(rubrics_raw).map_err(|source| {
            EvalError::Parse {
                document: Document::RubricCatalog,
                source,
            }
        })?;

        let mut seen = HashSet::new();
        for case in &suite.cases {
            if !seen.insert(case.id.as_str()) {
                return Err(EvalError::DuplicateCaseId(case.id.clone()));
            }
        }

        Ok(Self {
            suite,
            rubrics: index_rubrics(catalog.rubrics),
            rubric_version: catalog.version,
            suite_digest: sha256_hex(suite_raw),
            rubric_digest: sha256_hex(rubrics_raw),
        })
    }

    /// Cases in catalog order.
    pub fn cases(&self) -> &[GoldenCase] {
        &self.suite.cases
    }

    pub fn policy(&self) -> &GatePolicy {
        &self.suite.metadata
    }

    pub fn rubric(&self, id: &str) -> Option<&RubricDefinition> {
        self.rubrics.get(id)
    }

    pub fn rubric_count(&self) -> usize {
        self.rubrics.len()
    }

    pub fn case_suite_version(&self) -> &str {
        self.suite.version.as_deref().unwrap_or(UNKNOWN_VERSION)
    }

    pub fn rubric_catalog_version(&self) -> &str {
        self.rubric_version.as_deref().unwrap_or(UNKNOWN_VERSION)
    }

    pub fn case_suite_digest(&self) -> &str {
        &self.suite_digest
    }

    pub fn rubric_catalog_digest(&self) -> &str {
        &self.rubric_digest
    }
}

/// Externally produced outputs keyed by case id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutputSet {
    outputs: HashMap<String, serde_json::Value>,
}

impl OutputSet {
    /// Read an outputs document from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = read_document(path.as_ref())?;
        Self::from_json(&raw)
    }

    /// Parse an outputs document.
    ///
    /// Accepts either `{case_id: output}` or `[{case_id, output}]`. List
    /// entries without a string `case_id` are ignored; null outputs count as
    /// missing.
    pub fn from_json(raw: &str) -> Result<Self> {
        let doc: serde_json::Value =
            serde_json::from_str(raw).map_err(|source| EvalError::Parse {
                document: Document::Outputs,
                source,
            })?;
        Self::from_value(doc)
    }

    pub fn from_value(doc: serde_json::Value) -> Result<Self> {
        let pairs: Vec<(String, serde_json::Value)> = match doc {
            serde_json::Value::Object(map) => map.into_iter().collect(),
            serde_json::Value::Array(items) => items
                .into_iter()
                .filter_map(|item| match item {
                    serde_json::Value::Object(mut record) => {
                        let case_id = record.get("case_id")?.as_str()?.to_string();
                        let output = record.remove("output").unwrap_or_default();
                        Some((case_id, output))
                    }
                    _ => None,
                })
                .collect(),
            other => {
                return Err(EvalError::InvalidDocument {
                    document: Document::Outputs,
                    reason: format!(
                        "expected an object or a list of records, got {}",
                        json_kind(&other)
                    ),
                })
            }
        };

        let outputs = pairs
            .into_iter()
            .filter(|(_, output)| !output.is_null())
            .collect();
        Ok(Self { outputs })
    }

    pub fn insert(&mut self, case_id: impl Into<String>, output: serde_json::Value) {
        if !output.is_null() {
            self.outputs.insert(case_id.into(), output);
        }
    }

    pub fn get(&self, case_id: &str) -> Option<&serde_json::Value> {
        self.outputs.get(case_id)
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "a list",
        serde_json::Value::Object(_) => "an object",
    }
}
