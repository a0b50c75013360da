//! End-to-end properties of the grading pipeline, exercised against scripted
//! gateways: completeness over arbitrary model text, idempotent
//! re-normalization, deterministic total fallback, and metrics flowing from
//! the static analyzer into the prompt.

use gradeflow_ai::{
    extract, normalize, synthesize, GatewayError, GradingPipeline, PromptBuilder, RawCompletion,
    ScriptedGateway, SynthesisMode, MODEL_UNAVAILABLE_NOTICE, OVERALL_KEYS,
};
use gradeflow_core::{sample_cs_rubric, Rubric, ScoreValue};
use gradeflow_parser::{CodeAnalyzer, SubmissionLanguage};
use std::sync::Arc;

fn two_criterion_rubric() -> Rubric {
    Rubric::from_json(
        r#"{
            "name": "Mini Rubric",
            "version": "1.0",
            "scale": {"min": 0, "max": 3,
                      "labels": {"0": "Does not meet", "1": "Approaching",
                                 "2": "Meets", "3": "Exceeds"}},
            "criteria": [
                {"id": "CORR", "title": "Correctness", "category": "Program Quality",
                 "levels": {"0": "Fails most tests", "1": "Passes some tests",
                            "2": "Passes most tests", "3": "Passes all tests"}},
                {"id": "STYLE", "title": "Code Style", "category": "Code Quality",
                 "levels": {"0": "Unreadable", "1": "Hard to follow",
                            "2": "Mostly consistent", "3": "Exemplary"}}
            ]
        }"#,
    )
    .expect("fixture rubric is valid")
}

async fn grade_raw_text(rubric: &Rubric, raw_text: &str) -> gradeflow_ai::GradingOutcome {
    let gateway = Arc::new(ScriptedGateway::new(vec![Ok(RawCompletion::of(
        raw_text, "scripted",
    ))]));
    GradingPipeline::new(gateway)
        .grade(rubric, "print('hello')", None, None)
        .await
}

#[tokio::test]
async fn completeness_holds_for_arbitrary_model_text() {
    let rubric = sample_cs_rubric();
    let expected_ids: Vec<&str> = {
        let mut ids = rubric.criterion_ids();
        ids.sort_unstable();
        ids
    };

    let raw_texts = [
        "",
        "no json here at all",
        r#"{"scores": {"CORR": 3}}"#,
        r#"{"scores": "oops", "feedback": [], "overall": 5}"#,
        "```json\n{\"feedback\": {\"STYLE\": \"tidy\"}}\n```",
        "{\"scores\": {\"CORR\"",
    ];

    for raw_text in raw_texts {
        let outcome = grade_raw_text(&rubric, raw_text).await;
        let score_ids: Vec<&str> = outcome.result.scores.keys().map(String::as_str).collect();
        let feedback_ids: Vec<&str> = outcome.result.feedback.keys().map(String::as_str).collect();
        assert_eq!(score_ids, expected_ids, "scores keys for {raw_text:?}");
        assert_eq!(feedback_ids, expected_ids, "feedback keys for {raw_text:?}");

        for score in outcome.result.scores.values() {
            if let Some(points) = score.points() {
                assert!(rubric.scale.contains(points));
            }
        }
    }
}

#[test]
fn renormalizing_a_synthesized_result_is_a_noop() {
    let rubric = sample_cs_rubric();
    let schema = PromptBuilder::default()
        .build(&rubric, "code", None, None)
        .schema;

    for mode in [SynthesisMode::Normal, SynthesisMode::TotalFallback] {
        let first = synthesize(Default::default(), &rubric, mode);

        let as_json = serde_json::to_value(&first).expect("result serializes");
        let mut overall_keys: Vec<&str> = as_json["overall"]
            .as_object()
            .expect("overall serializes to an object")
            .keys()
            .map(String::as_str)
            .collect();
        overall_keys.sort_unstable();
        let mut expected_keys = OVERALL_KEYS.to_vec();
        expected_keys.sort_unstable();
        assert_eq!(overall_keys, expected_keys);

        let reparsed = match as_json {
            serde_json::Value::Object(map) => map,
            _ => unreachable!("results serialize to objects"),
        };
        let second = synthesize(normalize(reparsed, &schema), &rubric, SynthesisMode::Normal);

        assert_eq!(first, second, "round trip changed the result in {mode:?}");
    }
}

#[tokio::test]
async fn total_fallback_is_deterministic_across_runs() {
    let rubric = sample_cs_rubric();

    let mut outcomes = Vec::new();
    for _ in 0..2 {
        let gateway = Arc::new(ScriptedGateway::new(vec![Err(GatewayError::Transport(
            "connection refused".to_string(),
        ))]));
        let outcome = GradingPipeline::new(gateway)
            .grade(&rubric, "code", None, None)
            .await;
        assert!(outcome.provenance.degraded);
        outcomes.push(outcome.result);
    }

    assert_eq!(outcomes[0], outcomes[1]);
    assert_eq!(outcomes[0].overall.summary, MODEL_UNAVAILABLE_NOTICE);
    for score in outcomes[0].scores.values() {
        assert_eq!(*score, ScoreValue::Points(1));
    }
}

#[tokio::test]
async fn fenced_response_with_partial_content_is_completed() {
    // The concrete scenario: a two-criterion rubric and a fenced response
    // covering only CORR.
    let rubric = two_criterion_rubric();
    let raw_text = "Here is my evaluation:\n```\n{\"scores\":{\"CORR\":3},\"feedback\":{\"CORR\":\"Good job\"},\"overall\":{\"summary\":\"Solid\"}}\n```";

    let outcome = grade_raw_text(&rubric, raw_text).await;
    let result = &outcome.result;

    assert_eq!(result.scores["CORR"], ScoreValue::Points(3));
    // Missing score falls back to the documented default (midpoint of 0-3).
    assert_eq!(result.scores["STYLE"], ScoreValue::Points(1));

    assert_eq!(result.feedback["CORR"], "Good job");
    let style_feedback = &result.feedback["STYLE"];
    assert!(style_feedback.contains("Code Style"));
    assert!(style_feedback.contains("Hard to follow"));

    assert_eq!(result.overall.summary, "Solid");
    assert!(result.overall.strengths.is_empty());
    assert!(result.overall.areas_for_improvement.is_empty());
}

#[tokio::test]
async fn analyzer_metrics_flow_into_the_prompt() {
    let analyzer = CodeAnalyzer::new(SubmissionLanguage::Python);
    let metrics = analyzer.analyze("def f():\n    return 1\n");
    assert_eq!(metrics.functions, 1);

    let rubric = two_criterion_rubric();
    let prompt = PromptBuilder::default().build(&rubric, "def f():\n    return 1\n", Some(&metrics), None);
    assert!(prompt.text.contains("functions: 1"));

    // And a pipeline run with metrics attached still completes normally.
    let gateway = Arc::new(ScriptedGateway::always(r#"{"scores": {"CORR": 2}}"#));
    let outcome = GradingPipeline::new(gateway)
        .grade(&rubric, "def f():\n    return 1\n", Some(&metrics), None)
        .await;
    assert_eq!(outcome.result.scores.len(), 2);
}

#[tokio::test]
async fn extraction_trace_is_reported_in_provenance() {
    let rubric = two_criterion_rubric();
    let outcome = grade_raw_text(&rubric, "nothing structured").await;

    assert_eq!(outcome.provenance.strategy, None);
    assert_eq!(
        outcome.provenance.attempts.len(),
        extract::STRATEGIES.len()
    );
    assert!(!outcome.provenance.degraded);
}
