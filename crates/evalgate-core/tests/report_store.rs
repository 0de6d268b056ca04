use chrono::{TimeZone, Utc};
use evalgate_core::{
    render_report_json, Catalog, EvalEngine, EvalError, OutputSet, ReportStore, RunConfig,
    RunReport,
};
use serde_json::json;
use tempfile::TempDir;

fn engine() -> EvalEngine {
    let suite = json!({
        "version": "3.0",
        "metadata": {"pass_threshold": 0.5},
        "cases": [
            {"id": "GS-001", "rubrics": ["R-JSON"]},
            {"id": "GS-002", "criticality": "critical", "rubrics": ["R-JSON"]}
        ]
    })
    .to_string();
    let rubrics =
        json!({"rubrics": [{"id": "R-JSON", "evaluation": {"method": "json_parse"}}]}).to_string();
    let catalog = Catalog::from_documents(&suite, &rubrics).expect("catalog");

    let mut outputs = OutputSet::default();
    outputs.insert("GS-001", json!({"ok": true}));
    outputs.insert("GS-002", json!({"ok": true}));
    EvalEngine::new(catalog, outputs)
}

fn report_at(engine: &EvalEngine, env: &str, second: u32) -> RunReport {
    let now = Utc.with_ymd_and_hms(2026, 5, 6, 7, 8, second).unwrap();
    engine.evaluate_at(&RunConfig::new(env), now)
}

fn json_files(dir: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir.path())
        .expect("read dir")
        .map(|e| e.expect("entry").file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".json"))
        .collect();
    names.sort();
    names
}

#[test]
fn two_runs_keep_both_artifacts_and_one_latest() {
    let dir = TempDir::new().expect("tempdir");
    let store = ReportStore::new(dir.path());
    let engine = engine();

    let first = report_at(&engine, "staging", 1);
    let second = report_at(&engine, "staging", 2);
    store.persist(&first).expect("persist first");
    let persisted = store.persist(&second).expect("persist second");

    assert_eq!(
        json_files(&dir),
        vec![
            "eval-20260506070801000000_staging.json".to_string(),
            "eval-20260506070802000000_staging.json".to_string(),
            "latest_staging.json".to_string(),
        ]
    );

    let latest = std::fs::read_to_string(&persisted.latest_path).expect("latest");
    let artifact = std::fs::read_to_string(&persisted.artifact_path).expect("artifact");
    assert_eq!(latest, artifact);
}

#[test]
fn identical_inputs_differ_only_in_identity_fields() {
    let engine = engine();
    let first = report_at(&engine, "dev", 10);
    let mut second = report_at(&engine, "dev", 20);

    assert_ne!(first.execution_id, second.execution_id);
    assert_ne!(first.timestamp, second.timestamp);

    second.execution_id = first.execution_id.clone();
    second.timestamp = first.timestamp.clone();
    assert_eq!(
        render_report_json(&first).expect("render"),
        render_report_json(&second).expect("render")
    );
}

#[test]
fn report_fields_are_in_canonical_order() {
    let report = report_at(&engine(), "dev", 0);
    let body = render_report_json(&report).expect("render");

    let order = [
        "\"execution_id\"",
        "\"timestamp\"",
        "\"environment\"",
        "\"version\"",
        "\"config\"",
        "\"summary\"",
        "\"results\"",
        "\"gate_status\"",
    ];
    let positions: Vec<usize> = order
        .iter()
        .map(|key| body.find(key).expect("key present"))
        .collect();
    let mut sorted = positions.clone();
    sorted.sort_unstable();
    assert_eq!(positions, sorted);
    assert!(body.ends_with('\n'));
}

#[test]
fn latest_is_scoped_per_environment() {
    let dir = TempDir::new().expect("tempdir");
    let store = ReportStore::new(dir.path());
    let engine = engine();

    store
        .persist(&report_at(&engine, "staging", 1))
        .expect("persist staging");
    store
        .persist(&report_at(&engine, "prod", 2))
        .expect("persist prod");

    let staging = store.load_latest("staging").expect("load").expect("present");
    let prod = store.load_latest("prod").expect("load").expect("present");
    assert_eq!(staging.environment, "staging");
    assert_eq!(prod.environment, "prod");
    assert!(store.load_latest("dev").expect("load").is_none());
}

#[test]
fn latest_round_trips_the_report() {
    let dir = TempDir::new().expect("tempdir");
    let store = ReportStore::new(dir.path().join("nested").join("results"));
    let report = report_at(&engine(), "dev", 30);

    store.persist(&report).expect("persist");
    let loaded = store.load_latest("dev").expect("load").expect("present");
    assert_eq!(loaded, report);
}

#[test]
fn artifact_is_never_overwritten() {
    let dir = TempDir::new().expect("tempdir");
    let store = ReportStore::new(dir.path());
    let report = report_at(&engine(), "dev", 40);

    store.persist(&report).expect("first persist");
    let err = store.persist(&report).unwrap_err();
    assert!(matches!(err, EvalError::ArtifactExists(_)));
}

#[test]
fn unwritable_destination_is_fatal() {
    let dir = TempDir::new().expect("tempdir");
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"occupied").expect("write blocker");

    let store = ReportStore::new(&blocker);
    let err = engine()
        .run(&RunConfig::default(), &store)
        .unwrap_err();
    assert!(matches!(err, EvalError::Io { .. }));
}

#[test]
fn failed_latest_write_removes_the_new_artifact() {
    let dir = TempDir::new().expect("tempdir");
    let store = ReportStore::new(dir.path());
    let report = report_at(&engine(), "staging", 50);

    // A directory where the latest pointer should go makes the rename fail.
    std::fs::create_dir(store.latest_path("staging")).expect("block latest");

    let err = store.persist(&report).unwrap_err();
    assert!(matches!(err, EvalError::Io { .. }));
    assert!(!store.artifact_path(&report).exists());
    assert!(json_files(&dir).iter().all(|name| !name.starts_with("eval-")));
}

#[test]
fn environments_that_differ_only_in_punctuation_do_not_share_latest() {
    let dir = TempDir::new().expect("tempdir");
    let store = ReportStore::new(dir.path());
    let engine = engine();

    assert_ne!(store.latest_path("a/b"), store.latest_path("a_b"));
    store
        .persist(&report_at(&engine, "a/b", 1))
        .expect("persist a/b");
    store
        .persist(&report_at(&engine, "a_b", 2))
        .expect("persist a_b");

    let slashed = store.load_latest("a/b").expect("load").expect("present");
    let underscored = store.load_latest("a_b").expect("load").expect("present");
    assert_eq!(slashed.environment, "a/b");
    assert_eq!(underscored.environment, "a_b");
}
