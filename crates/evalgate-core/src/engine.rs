//! Evaluation run orchestration.
//!
//! Catalog → (per case) validation + rubric scoring → classification →
//! aggregation and gate → report persistence.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::Instrument;

use crate::catalog::{Catalog, OutputSet};
use crate::classify::classify_case;
use crate::domain::{
    CaseResult, EvalError, GoldenCase, Result, RunConfigEcho, RunMode, RunReport, VersionInfo,
};
use crate::gate::{evaluate_gate, tally};
use crate::obs::{self, RunSpan};
use crate::parallel::evaluate_concurrently;
use crate::reporting::ReportStore;

/// Version of this engine, echoed in every report.
pub const FRAMEWORK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment label used when none is given.
pub const DEFAULT_ENVIRONMENT: &str = "dev";

/// Model label used when none is given. Echoed only.
pub const DEFAULT_MODEL_LABEL: &str = "n/a";

/// Run configuration supplied by the invoking caller.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Target environment label; scopes the latest-report pointer.
    pub environment: String,
    pub model: String,
    pub temperature: Option<f64>,
    /// Evaluate each case against its own expected output.
    pub use_expected: bool,
    /// Omit judge-dependent rubrics instead of scoring them 0.0.
    pub allow_skip_llm_judge: bool,
    /// Restrict the run to these case ids. `None` or empty runs every case.
    pub case_ids: Option<Vec<String>>,
    /// Concurrent case workers; 1 evaluates sequentially.
    pub workers: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            environment: DEFAULT_ENVIRONMENT.to_string(),
            model: DEFAULT_MODEL_LABEL.to_string(),
            temperature: None,
            use_expected: false,
            allow_skip_llm_judge: false,
            case_ids: None,
            workers: 1,
        }
    }
}

impl RunConfig {
    pub fn new(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>, temperature: Option<f64>) -> Self {
        self.model = model.into();
        self.temperature = temperature;
        self
    }

    pub fn with_use_expected(mut self, use_expected: bool) -> Self {
        self.use_expected = use_expected;
        self
    }

    pub fn with_allow_skip_llm_judge(mut self, allow: bool) -> Self {
        self.allow_skip_llm_judge = allow;
        self
    }

    pub fn with_case_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.case_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn mode(&self) -> RunMode {
        if self.use_expected {
            RunMode::UseExpected
        } else {
            RunMode::ExternalOutputs
        }
    }

    pub(crate) fn case_options(&self) -> CaseOptions {
        CaseOptions {
            use_expected: self.use_expected,
            allow_skip_llm_judge: self.allow_skip_llm_judge,
        }
    }
}

/// The per-case slice of [`RunConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaseOptions {
    pub use_expected: bool,
    pub allow_skip_llm_judge: bool,
}

/// Resolve the output a case is evaluated against.
pub(crate) fn resolve_output<'a>(
    case: &'a GoldenCase,
    outputs: &'a OutputSet,
    use_expected: bool,
) -> Option<&'a serde_json::Value> {
    if use_expected {
        case.expected_output.as_ref().filter(|v| !v.is_null())
    } else {
        outputs.get(&case.id)
    }
}

/// Evaluate the catalog case at `index`.
pub(crate) fn evaluate_case(
    catalog: &Catalog,
    outputs: &OutputSet,
    index: usize,
    options: CaseOptions,
) -> CaseResult {
    let case = &catalog.cases()[index];
    let output = resolve_output(case, outputs, options.use_expected);
    let result = classify_case(case, output, catalog, options.allow_skip_llm_judge);
    obs::emit_case_evaluated(&result);
    result
}

fn execution_id(now: DateTime<Utc>) -> String {
    format!("eval-{}", now.format("%Y%m%d%H%M%S%6f"))
}

/// Evaluates a loaded catalog against a set of outputs.
#[derive(Debug, Clone)]
pub struct EvalEngine {
    catalog: Arc<Catalog>,
    outputs: Arc<OutputSet>,
}

impl EvalEngine {
    pub fn new(catalog: Catalog, outputs: OutputSet) -> Self {
        Self {
            catalog: Arc::new(catalog),
            outputs: Arc::new(outputs),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Catalog indices of the cases a run considers, in catalog order.
    ///
    /// Requested ids absent from the catalog are logged and ignored.
    pub fn select_cases(&self, config: &RunConfig) -> Vec<usize> {
        let cases = self.catalog.cases();
        let requested: HashSet<&str> = match &config.case_ids {
            Some(ids) if !ids.is_empty() => ids.iter().map(String::as_str).collect(),
            _ => return (0..cases.len()).collect(),
        };

        let known: HashSet<&str> = cases.iter().map(|c| c.id.as_str()).collect();
        let mut unknown: Vec<&str> = requested.difference(&known).copied().collect();
        if !unknown.is_empty() {
            unknown.sort_unstable();
            obs::emit_unknown_case_ids(&unknown);
        }

        cases
            .iter()
            .enumerate()
            .filter(|(_, case)| requested.contains(case.id.as_str()))
            .map(|(i, _)| i)
            .collect()
    }

    /// Evaluate sequentially, stamping the report with the current time.
    pub fn evaluate(&self, config: &RunConfig) -> RunReport {
        self.evaluate_at(config, Utc::now())
    }

    /// Evaluate sequentially, stamping the report with `now`.
    pub fn evaluate_at(&self, config: &RunConfig, now: DateTime<Utc>) -> RunReport {
        let execution_id = execution_id(now);
        let _span = RunSpan::enter(&execution_id, &config.environment);

        let selected = self.select_cases(config);
        obs::emit_run_started(&execution_id, &config.environment, selected.len(), 1);

        let options = config.case_options();
        let results = selected
            .iter()
            .map(|&index| evaluate_case(&self.catalog, &self.outputs, index, options))
            .collect();

        self.assemble(config, now, execution_id, &selected, results)
    }

    /// Evaluate with `config.workers` concurrent case workers.
    pub async fn evaluate_concurrent(&self, config: &RunConfig) -> Result<RunReport> {
        let now = Utc::now();
        if config.workers <= 1 {
            return Ok(self.evaluate_at(config, now));
        }

        let execution_id = execution_id(now);
        let span = obs::run_span(&execution_id, &config.environment);

        async move {
            let selected = self.select_cases(config);
            obs::emit_run_started(
                &execution_id,
                &config.environment,
                selected.len(),
                config.workers,
            );

            let results = evaluate_concurrently(
                Arc::clone(&self.catalog),
                Arc::clone(&self.outputs),
                &selected,
                config.case_options(),
                config.workers,
            )
            .await?;

            Ok::<_, EvalError>(self.assemble(config, now, execution_id, &selected, results))
        }
        .instrument(span)
        .await
    }

    /// Evaluate and persist. A persistence failure aborts the run.
    pub fn run(&self, config: &RunConfig, store: &ReportStore) -> Result<RunReport> {
        let report = self.evaluate(config);
        persist(store, &report)?;
        Ok(report)
    }

    /// Concurrent variant of [`EvalEngine::run`].
    pub async fn run_concurrent(&self, config: &RunConfig, store: &ReportStore) -> Result<RunReport> {
        let report = self.evaluate_concurrent(config).await?;
        persist(store, &report)?;
        Ok(report)
    }

    fn assemble(
        &self,
        config: &RunConfig,
        now: DateTime<Utc>,
        execution_id: String,
        selected: &[usize],
        results: Vec<CaseResult>,
    ) -> RunReport {
        let cases = self.catalog.cases();
        let run_tally = tally(selected.iter().map(|&i| &cases[i]).zip(results.iter()));
        let summary = run_tally.summary();
        let verdict = evaluate_gate(self.catalog.policy(), &summary, run_tally.critical_breach);
        obs::emit_gate_evaluated(&execution_id, summary.pass_rate, &verdict);

        RunReport {
            execution_id,
            timestamp: now.to_rfc3339_opts(SecondsFormat::Secs, true),
            environment: config.environment.clone(),
            version: VersionInfo {
                framework: FRAMEWORK_VERSION.to_string(),
                case_suite: self.catalog.case_suite_version().to_string(),
                rubric_catalog: self.catalog.rubric_catalog_version().to_string(),
                case_suite_digest: self.catalog.case_suite_digest().to_string(),
                rubric_catalog_digest: self.catalog.rubric_catalog_digest().to_string(),
            },
            config: RunConfigEcho {
                model: config.model.clone(),
                temperature: config.temperature,
                mode: config.mode(),
            },
            summary,
            results,
            gate_status: verdict.status,
        }
    }
}

fn persist(store: &ReportStore, report: &RunReport) -> Result<()> {
    let persisted = store.persist(report)?;
    obs::emit_report_persisted(&persisted.artifact_path, &persisted.latest_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn engine() -> EvalEngine {
        let suite = json!({
            "version": "1.0",
            "cases": [
                {"id": "GS-001", "rubrics": ["R-JSON"], "expected_output": {"a": 1}},
                {"id": "GS-002", "rubrics": ["R-JSON"], "expected_output": null},
                {"id": "GS-003", "rubrics": ["R-JSON"], "expected_output": "plain"}
            ]
        })
        .to_string();
        let rubrics =
            json!({"rubrics": [{"id": "R-JSON", "evaluation": {"method": "json_parse"}}]})
                .to_string();
        let catalog = Catalog::from_documents(&suite, &rubrics).expect("catalog");
        let mut outputs = OutputSet::default();
        outputs.insert("GS-002", json!({"b": 2}));
        EvalEngine::new(catalog, outputs)
    }

    #[test]
    fn test_execution_id_has_microseconds() {
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap();
        assert_eq!(execution_id(now), "eval-20260304050607000000");
    }

    #[test]
    fn test_select_all_when_no_filter() {
        assert_eq!(engine().select_cases(&RunConfig::default()), vec![0, 1, 2]);
        let empty = RunConfig::default().with_case_ids(Vec::<String>::new());
        assert_eq!(engine().select_cases(&empty), vec![0, 1, 2]);
    }

    #[test]
    fn test_select_keeps_catalog_order_and_drops_unknown() {
        let config = RunConfig::default().with_case_ids(["GS-003", "GS-404", "GS-001"]);
        assert_eq!(engine().select_cases(&config), vec![0, 2]);
    }

    #[test]
    fn test_use_expected_mode() {
        let config = RunConfig::new("staging").with_use_expected(true);
        let report = engine().evaluate(&config);
        assert_eq!(report.config.mode, RunMode::UseExpected);
        assert_eq!(report.summary.total_cases, 3);
        assert_eq!(report.summary.passed, 1);
        assert_eq!(report.summary.skipped, 1);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.results[1].notes, "output missing");
    }

    #[test]
    fn test_external_outputs_mode() {
        let report = engine().evaluate(&RunConfig::default());
        assert_eq!(report.config.mode, RunMode::ExternalOutputs);
        assert_eq!(report.summary.passed, 1);
        assert_eq!(report.summary.skipped, 2);
        assert_eq!(report.summary.pass_rate, 0.33);
        assert!(!report.gate_status.can_promote);
    }

    #[test]
    fn test_report_echoes_versions_and_config() {
        let config = RunConfig::new("prod").with_model("gpt-x", Some(0.2));
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 3, 4, 5).unwrap();
        let report = engine().evaluate_at(&config, now);
        assert_eq!(report.timestamp, "2026-01-02T03:04:05Z");
        assert_eq!(report.environment, "prod");
        assert_eq!(report.version.framework, FRAMEWORK_VERSION);
        assert_eq!(report.version.case_suite, "1.0");
        assert_eq!(report.version.rubric_catalog, "unknown");
        assert_eq!(report.config.model, "gpt-x");
        assert_eq!(report.config.temperature, Some(0.2));
    }

    #[test]
    fn test_with_workers_floors_at_one() {
        assert_eq!(RunConfig::default().with_workers(0).workers, 1);
    }
}
