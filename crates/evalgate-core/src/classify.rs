//! Per-case classification: passed, failed or skipped.

use tracing::debug;

use crate::catalog::Catalog;
use crate::domain::{CaseResult, CaseStatus, GoldenCase, DEFAULT_RUBRIC_THRESHOLD};
use crate::scoring::score_rubrics;
use crate::validation::validate;

/// Note recorded on a case that had no output to evaluate.
pub const OUTPUT_MISSING_NOTE: &str = "output missing";

const NOTE_SEPARATOR: &str = "; ";

/// Evaluate one case against its resolved output.
///
/// A case without output is skipped and scores nothing. Otherwise the case
/// fails on any violation or on any rubric score strictly below that
/// rubric's threshold.
pub fn classify_case(
    case: &GoldenCase,
    output: Option<&serde_json::Value>,
    catalog: &Catalog,
    allow_skip_llm_judge: bool,
) -> CaseResult {
    let Some(output) = output else {
        debug!(case_id = %case.id, "no output resolved, skipping");
        return CaseResult {
            case_id: case.id.clone(),
            status: CaseStatus::Skipped,
            rubric_scores: Default::default(),
            latency_ms: None,
            tokens_used: None,
            output: None,
            expected: case.expected_output.clone(),
            diff: None,
            notes: OUTPUT_MISSING_NOTE.to_string(),
        };
    };

    let violations = validate(&case.validation, output);
    let rubrics = score_rubrics(case, output, catalog, allow_skip_llm_judge);

    let below_threshold: Vec<&String> = rubrics
        .scores
        .iter()
        .filter(|(id, score)| {
            let threshold = catalog
                .rubric(id)
                .map(|r| r.threshold())
                .unwrap_or(DEFAULT_RUBRIC_THRESHOLD);
            **score < threshold
        })
        .map(|(id, _)| id)
        .collect();

    let status = if violations.is_empty() && below_threshold.is_empty() {
        CaseStatus::Passed
    } else {
        CaseStatus::Failed
    };

    let notes: Vec<String> = violations
        .iter()
        .map(ToString::to_string)
        .chain(rubrics.notes.iter().cloned())
        .chain(
            below_threshold
                .iter()
                .map(|id| format!("rubric_below_threshold:{}", id)),
        )
        .collect();

    CaseResult {
        case_id: case.id.clone(),
        status,
        rubric_scores: rubrics.scores,
        latency_ms: None,
        tokens_used: None,
        output: Some(output.clone()),
        expected: case.expected_output.clone(),
        diff: None,
        notes: notes.join(NOTE_SEPARATOR),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ValidationRule;
    use serde_json::json;

    fn catalog() -> Catalog {
        let rubrics = json!({"rubrics": [
            {"id": "R-JSON", "evaluation": {"method": "json_parse"}},
            {"id": "R-RECALL", "threshold": 0.5, "evaluation": {"method": "set_comparison"}},
            {"id": "R-BLEU", "evaluation": {"method": "bleu"}}
        ]})
        .to_string();
        Catalog::from_documents("{}", &rubrics).expect("catalog")
    }

    fn case(rubrics: &[&str], validation: ValidationRule) -> GoldenCase {
        GoldenCase {
            id: "GS-C".to_string(),
            criticality: Default::default(),
            validation,
            rubrics: rubrics.iter().map(|r| r.to_string()).collect(),
            expected_output: Some(json!({"entities": [
                {"type": "a", "value": "1"},
                {"type": "b", "value": "2"}
            ]})),
        }
    }

    #[test]
    fn test_missing_output_is_skipped() {
        let result = classify_case(
            &case(&["R-JSON"], ValidationRule::Unchecked),
            None,
            &catalog(),
            false,
        );
        assert_eq!(result.status, CaseStatus::Skipped);
        assert!(result.rubric_scores.is_empty());
        assert_eq!(result.notes, OUTPUT_MISSING_NOTE);
        assert!(result.output.is_none());
        assert!(result.expected.is_some());
    }

    #[test]
    fn test_passing_case_has_empty_notes() {
        let output = json!({"entities": [{"type": "a", "value": "1"}]});
        let result = classify_case(
            &case(&["R-JSON", "R-RECALL"], ValidationRule::Unchecked),
            Some(&output),
            &catalog(),
            false,
        );
        assert_eq!(result.status, CaseStatus::Passed);
        assert_eq!(result.rubric_scores["R-RECALL"], 0.5);
        assert_eq!(result.notes, "");
        assert_eq!(result.output, Some(output));
    }

    #[test]
    fn test_score_below_threshold_fails() {
        let output = json!("not json");
        let result = classify_case(
            &case(&["R-JSON"], ValidationRule::Unchecked),
            Some(&output),
            &catalog(),
            false,
        );
        assert_eq!(result.status, CaseStatus::Failed);
        assert_eq!(result.notes, "rubric_below_threshold:R-JSON");
    }

    #[test]
    fn test_unhandled_method_does_not_fail_case() {
        let output = json!({});
        let result = classify_case(
            &case(&["R-BLEU", "R-MISSING"], ValidationRule::Unchecked),
            Some(&output),
            &catalog(),
            false,
        );
        assert_eq!(result.status, CaseStatus::Passed);
        assert!(result.rubric_scores.is_empty());
        assert_eq!(
            result.notes,
            "rubric_method_unhandled:R-BLEU; rubric_not_found:R-MISSING"
        );
    }

    #[test]
    fn test_violations_then_advisories_in_notes() {
        let rule = ValidationRule::JsonSchema {
            row_count: None,
            numeric_fields: vec![],
            required_fields: vec!["summary".to_string()],
        };
        let output = json!({"entities": []});
        let result = classify_case(
            &case(&["R-BLEU"], rule),
            Some(&output),
            &catalog(),
            false,
        );
        assert_eq!(result.status, CaseStatus::Failed);
        assert_eq!(
            result.notes,
            "missing_required_fields:summary; rubric_method_unhandled:R-BLEU"
        );
    }
}
