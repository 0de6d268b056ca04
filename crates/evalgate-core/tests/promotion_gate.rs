use evalgate_core::{
    evaluate_gate, tally, CaseStatus, Catalog, EvalEngine, GateRule, OutputSet, RunConfig,
};
use serde_json::{json, Value};

/// Suite of `n` cases checked by one `json_parse` rubric; `critical` marks
/// which case ids are critical.
fn catalog(n: usize, critical: &[usize], metadata: Value) -> Catalog {
    let cases: Vec<Value> = (0..n)
        .map(|i| {
            let criticality = if critical.contains(&i) {
                "critical"
            } else {
                "standard"
            };
            json!({
                "id": format!("GS-{:03}", i),
                "criticality": criticality,
                "rubrics": ["R-JSON"]
            })
        })
        .collect();
    let suite = json!({"version": "2.1", "metadata": metadata, "cases": cases}).to_string();
    let rubrics = json!({
        "version": "1.4",
        "rubrics": [{"id": "R-JSON", "threshold": 1.0, "evaluation": {"type": "rule_based", "method": "json_parse"}}]
    })
    .to_string();
    Catalog::from_documents(&suite, &rubrics).expect("catalog")
}

/// Structured output for passing cases, plain text for `failing`, nothing
/// for `missing`.
fn outputs(n: usize, failing: &[usize], missing: &[usize]) -> OutputSet {
    let mut set = OutputSet::default();
    for i in (0..n).filter(|i| !missing.contains(i)) {
        let output = if failing.contains(&i) {
            json!("not a structured document")
        } else {
            json!({"answer": i})
        };
        set.insert(format!("GS-{:03}", i), output);
    }
    set
}

// ---- pass rate ----

#[test]
fn nine_of_ten_below_default_threshold_blocks() {
    let engine = EvalEngine::new(
        catalog(10, &[0], json!({"pass_threshold": 0.95, "require_all_critical": true})),
        outputs(10, &[7], &[]),
    );
    let report = engine.evaluate(&RunConfig::default());

    assert_eq!(report.summary.total_cases, 10);
    assert_eq!(report.summary.passed, 9);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.pass_rate, 0.9);
    assert!(!report.gate_status.meets_pass_rate);
    assert!(!report.gate_status.critical_breach);
    assert!(!report.gate_status.can_promote);
    assert_eq!(report.results[7].status, CaseStatus::Failed);
}

#[test]
fn all_pass_with_critical_case_promotes() {
    let engine = EvalEngine::new(
        catalog(10, &[3], json!({"pass_threshold": 0.95, "require_all_critical": true})),
        outputs(10, &[], &[]),
    );
    let report = engine.evaluate(&RunConfig::new("staging"));

    assert_eq!(report.summary.pass_rate, 1.0);
    assert!(report.gate_status.meets_pass_rate);
    assert!(!report.gate_status.critical_breach);
    assert!(report.can_promote());
}

// ---- criticality ----

#[test]
fn missing_critical_output_blocks_even_when_rate_is_met() {
    let engine = EvalEngine::new(
        catalog(10, &[4], json!({"pass_threshold": 0.80, "require_all_critical": true})),
        outputs(10, &[], &[4]),
    );
    let report = engine.evaluate(&RunConfig::new("prod"));

    assert_eq!(report.summary.skipped, 1);
    assert_eq!(report.summary.pass_rate, 0.9);
    assert!(report.gate_status.meets_pass_rate);
    assert!(report.gate_status.critical_breach);
    assert!(!report.gate_status.can_promote);
    assert_eq!(report.results[4].status, CaseStatus::Skipped);
    assert_eq!(report.results[4].notes, "output missing");
}

#[test]
fn critical_breach_is_ignored_when_not_required() {
    let engine = EvalEngine::new(
        catalog(10, &[4], json!({"pass_threshold": 0.80, "require_all_critical": false})),
        outputs(10, &[4], &[]),
    );
    let report = engine.evaluate(&RunConfig::default());

    assert!(report.gate_status.critical_breach);
    assert!(report.gate_status.can_promote);
}

#[test]
fn metadata_defaults_apply() {
    let engine = EvalEngine::new(catalog(20, &[], json!({})), outputs(20, &[0], &[]));
    let report = engine.evaluate(&RunConfig::default());

    // 19/20 = 0.95 meets the default threshold exactly.
    assert_eq!(report.summary.pass_rate, 0.95);
    assert!(report.gate_status.can_promote);
}

// ---- verdict ----

#[test]
fn verdict_lists_every_blocking_rule() {
    let catalog = catalog(4, &[0], json!({"pass_threshold": 0.95}));
    let outputs = outputs(4, &[0], &[]);
    let report = EvalEngine::new(catalog.clone(), outputs).evaluate(&RunConfig::default());

    let pairs = catalog.cases().iter().zip(report.results.iter());
    let run = tally(pairs);
    let verdict = evaluate_gate(catalog.policy(), &run.summary(), run.critical_breach);

    assert!(!verdict.can_promote());
    let rules: Vec<GateRule> = verdict.violations.iter().map(|v| v.rule).collect();
    assert_eq!(rules, vec![GateRule::MinPassRate, GateRule::RequireAllCritical]);
    assert_eq!(verdict.status, report.gate_status);
}

#[test]
fn empty_case_filter_match_blocks() {
    let engine = EvalEngine::new(catalog(3, &[], json!({})), outputs(3, &[], &[]));
    let config = RunConfig::default().with_case_ids(["GS-999"]);
    let report = engine.evaluate(&config);

    assert_eq!(report.summary.total_cases, 0);
    assert_eq!(report.summary.pass_rate, 0.0);
    assert!(!report.can_promote());
}

// ---- rubric configuration ----

#[test]
fn forbidden_pattern_blocks_critical_case_despite_invalid_sibling() {
    let suite = json!({
        "metadata": {"pass_threshold": 0.5, "require_all_critical": true},
        "cases": [{"id": "GS-SEC", "criticality": "critical", "rubrics": ["R-PAT"]}]
    })
    .to_string();
    let rubrics = json!({"rubrics": [{
        "id": "R-PAT",
        "evaluation": {"method": "pattern_check", "config": {"forbidden_patterns": ["eval\\(", "os.system("]}}
    }]})
    .to_string();
    let catalog = Catalog::from_documents(&suite, &rubrics).expect("catalog");
    let mut outputs = OutputSet::default();
    outputs.insert("GS-SEC", json!({"code": "eval(user_input)"}));

    let report = EvalEngine::new(catalog, outputs).evaluate(&RunConfig::default());

    assert_eq!(report.results[0].status, CaseStatus::Failed);
    assert_eq!(report.results[0].rubric_scores["R-PAT"], 0.0);
    assert!(report.gate_status.critical_breach);
    assert!(!report.can_promote());
}

#[test]
fn null_method_and_criticality_load_with_defaults() {
    let suite = json!({
        "metadata": null,
        "cases": [{"id": "GS-001", "criticality": null, "rubrics": ["R-NULL"]}]
    })
    .to_string();
    let rubrics = json!({"rubrics": [{
        "id": "R-NULL",
        "evaluation": {"type": null, "method": null}
    }]})
    .to_string();
    let catalog = Catalog::from_documents(&suite, &rubrics).expect("catalog");
    assert!(!catalog.cases()[0].is_critical());

    let mut outputs = OutputSet::default();
    outputs.insert("GS-001", json!({"answer": 1}));
    let report = EvalEngine::new(catalog, outputs).evaluate(&RunConfig::default());

    assert_eq!(report.results[0].status, CaseStatus::Passed);
    assert!(report.results[0].rubric_scores.is_empty());
    assert_eq!(report.results[0].notes, "rubric_method_unhandled:R-NULL");
}
