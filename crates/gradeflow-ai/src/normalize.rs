//! Schema normalization: tolerant, per-field validation of extracted maps.
//!
//! A mismatch on one field never invalidates another; anything that fails
//! validation is simply absent from the output, to be filled by the
//! synthesizer.

use crate::extract::JsonMap;
use crate::prompt::ExpectedSchema;
use gradeflow_core::{ScoreValue, NOT_APPLICABLE};
use serde_json::Value;
use std::collections::BTreeMap;

/// Fields that survived validation. Absent fields are left for the
/// synthesizer; an empty `PartialResult` is valid input downstream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialResult {
    pub scores: BTreeMap<String, ScoreValue>,
    pub feedback: BTreeMap<String, String>,
    pub summary: Option<String>,
    pub strengths: Option<Vec<String>>,
    pub areas_for_improvement: Option<Vec<String>>,
}

/// Validate an extracted map against the expected schema.
pub fn normalize(raw: JsonMap, schema: &ExpectedSchema) -> PartialResult {
    let mut out = PartialResult::default();

    if let Some(Value::Object(scores)) = raw.get("scores") {
        for (id, value) in scores {
            // Unknown ids are dropped; the output may not grow keys the
            // rubric does not have.
            if !schema.knows(id) {
                continue;
            }
            if let Some(score) = coerce_score(value, schema) {
                out.scores.insert(id.clone(), score);
            }
        }
    }

    if let Some(Value::Object(feedback)) = raw.get("feedback") {
        for (id, value) in feedback {
            if !schema.knows(id) {
                continue;
            }
            if let Value::String(text) = value {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    out.feedback.insert(id.clone(), trimmed.to_string());
                }
            }
        }
    }

    if let Some(Value::Object(overall)) = raw.get("overall") {
        if let Some(Value::String(summary)) = overall.get("summary") {
            out.summary = Some(summary.clone());
        }
        out.strengths = overall.get("strengths").and_then(string_list);
        out.areas_for_improvement = overall.get("areas_for_improvement").and_then(string_list);
    }

    out
}

/// Accept an in-range integer, an integral float, a numeric-looking string,
/// or the not-applicable sentinel. Everything else is missing.
fn coerce_score(value: &Value, schema: &ExpectedSchema) -> Option<ScoreValue> {
    let points = match value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i)
            } else {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0)
                    .map(|f| f as i64)
            }
        }
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed == NOT_APPLICABLE {
                return Some(ScoreValue::NotApplicable);
            }
            trimmed.parse::<i64>().ok()
        }
        _ => None,
    }?;

    schema.in_range(points).then_some(ScoreValue::Points(points))
}

/// Collect the string elements of a JSON array; a non-list value is treated
/// as absent (the synthesizer substitutes an empty list).
fn string_list(value: &Value) -> Option<Vec<String>> {
    match value {
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}
