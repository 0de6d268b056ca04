//! Fatal error taxonomy for an evaluation run.
//!
//! Per-case problems (missing output, unknown rubric, unhandled method) are
//! never errors: they are recorded as data inside the report. Everything in
//! [`EvalError`] aborts the run.

use std::path::PathBuf;

/// Which input document an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Document {
    CaseSuite,
    RubricCatalog,
    Outputs,
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Document::CaseSuite => "case suite",
            Document::RubricCatalog => "rubric catalog",
            Document::Outputs => "outputs",
        };
        f.write_str(name)
    }
}

/// Errors that abort an evaluation run.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {document} document: {source}")]
    Parse {
        document: Document,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid {document} document: {reason}")]
    InvalidDocument { document: Document, reason: String },

    #[error("duplicate case id: {0}")]
    DuplicateCaseId(String),

    #[error("report artifact already exists: {0}")]
    ArtifactExists(PathBuf),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("evaluation worker failed: {0}")]
    Join(String),
}

impl EvalError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EvalError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result type for evaluation operations.
pub type Result<T> = std::result::Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_names_document() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = EvalError::Parse {
            document: Document::RubricCatalog,
            source,
        };
        assert!(err.to_string().contains("malformed rubric catalog document"));
    }

    #[test]
    fn test_duplicate_case_id_display() {
        let err = EvalError::DuplicateCaseId("GS-001".to_string());
        assert_eq!(err.to_string(), "duplicate case id: GS-001");
    }

    #[test]
    fn test_io_error_carries_path() {
        let err = EvalError::io(
            "/nonexistent/report.json",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(err.to_string().contains("/nonexistent/report.json"));
    }
}
