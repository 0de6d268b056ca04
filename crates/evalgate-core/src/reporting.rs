//! Report persistence.
//!
//! Every run writes two files into the report directory:
//! - `<execution_id>_<env>.json`: append-only history, never overwritten
//! - `latest_<env>.json`: overwritten on each run with identical content
//!
//! Both are written atomically (temp file in the same directory, then
//! rename) so readers never observe a half-written report. If the latest
//! pointer cannot be written the new artifact is removed again, so a failed
//! persist leaves the directory as it found it.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::warn;

use crate::domain::{EvalError, Result, RunReport};

/// Render a report as pretty JSON with a trailing newline.
pub fn render_report_json(report: &RunReport) -> Result<String> {
    let mut body = serde_json::to_string_pretty(report)?;
    body.push('\n');
    Ok(body)
}

/// Encode a label as a filename-safe token.
///
/// ASCII alphanumerics, `-` and `_` pass through; every other byte becomes
/// `%XX`. Distinct labels always yield distinct tokens.
fn file_token(label: &str) -> String {
    let mut token = String::with_capacity(label.len());
    for byte in label.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            token.push(char::from(byte));
        } else {
            token.push_str(&format!("%{:02X}", byte));
        }
    }
    token
}

/// Where a report landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedReport {
    pub artifact_path: PathBuf,
    pub latest_path: PathBuf,
}

/// Filesystem-backed report directory.
#[derive(Debug, Clone)]
pub struct ReportStore {
    dir: PathBuf,
}

impl ReportStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn artifact_path(&self, report: &RunReport) -> PathBuf {
        self.dir.join(format!(
            "{}_{}.json",
            file_token(&report.execution_id),
            file_token(&report.environment)
        ))
    }

    pub fn latest_path(&self, environment: &str) -> PathBuf {
        self.dir
            .join(format!("latest_{}.json", file_token(environment)))
    }

    /// Write the timestamped artifact, then the environment's latest pointer.
    ///
    /// Fails without touching `latest_<env>.json` if the timestamped
    /// artifact cannot be created. If the latest pointer cannot be written,
    /// the artifact just created is removed before the error is returned.
    pub fn persist(&self, report: &RunReport) -> Result<PersistedReport> {
        fs::create_dir_all(&self.dir).map_err(|e| EvalError::io(&self.dir, e))?;
        let body = render_report_json(report)?;

        let artifact_path = self.artifact_path(report);
        self.write_atomic(&artifact_path, body.as_bytes(), false)?;

        let latest_path = self.latest_path(&report.environment);
        if let Err(err) = self.write_atomic(&latest_path, body.as_bytes(), true) {
            if let Err(cleanup) = fs::remove_file(&artifact_path) {
                warn!(
                    path = %artifact_path.display(),
                    error = %cleanup,
                    "failed to remove orphaned report artifact"
                );
            }
            return Err(err);
        }

        Ok(PersistedReport {
            artifact_path,
            latest_path,
        })
    }

    /// Read the most recent report for `environment`, if any run has happened.
    pub fn load_latest(&self, environment: &str) -> Result<Option<RunReport>> {
        let path = self.latest_path(environment);
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(EvalError::io(path, e)),
        };
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn write_atomic(&self, path: &Path, data: &[u8], overwrite: bool) -> Result<()> {
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(|e| EvalError::io(&self.dir, e))?;
        tmp.write_all(data).map_err(|e| EvalError::io(tmp.path(), e))?;

        if overwrite {
            tmp.persist(path).map_err(|e| EvalError::io(path, e.error))?;
        } else {
            tmp.persist_noclobber(path).map_err(|e| {
                if e.error.kind() == std::io::ErrorKind::AlreadyExists {
                    EvalError::ArtifactExists(path.to_path_buf())
                } else {
                    EvalError::io(path, e.error)
                }
            })?;
        }
        Ok(())
    }
}
