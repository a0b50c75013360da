//! Completeness synthesis: turn a partial result into a total one.
//!
//! Every rubric criterion id ends up present in `scores` and `feedback`, and
//! `overall` always carries its three subkeys, whatever the model produced.
//! Synthesized text is derived only from the rubric's own wording; the
//! synthesizer never invents evaluative claims the model didn't make.

use crate::normalize::PartialResult;
use gradeflow_core::{Criterion, ExtractionResult, OverallAssessment, Rubric, Scale, ScoreValue};
use std::collections::BTreeMap;

/// Fixed overall summary used when the model call itself failed.
pub const MODEL_UNAVAILABLE_NOTICE: &str =
    "Automated evaluation was unavailable for this submission. Scores and feedback below are \
     rubric-derived defaults and require instructor review.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisMode {
    /// Fill whatever the normalizer could not validate.
    Normal,
    /// The gateway failed; every field is synthesized. The result shape is
    /// identical to Normal mode, so callers never branch on model success.
    TotalFallback,
}

/// Complete a partial result against a rubric.
pub fn synthesize(
    partial: PartialResult,
    rubric: &Rubric,
    mode: SynthesisMode,
) -> ExtractionResult {
    let default_score = ScoreValue::Points(rubric.scale.default_score());

    let mut scores = BTreeMap::new();
    let mut feedback = BTreeMap::new();

    for criterion in &rubric.criteria {
        let score = match mode {
            SynthesisMode::TotalFallback => default_score,
            SynthesisMode::Normal => partial
                .scores
                .get(&criterion.id)
                .copied()
                .unwrap_or(default_score),
        };
        scores.insert(criterion.id.clone(), score);

        let text = match mode {
            SynthesisMode::TotalFallback => fallback_feedback(criterion, score, &rubric.scale),
            SynthesisMode::Normal => partial
                .feedback
                .get(&criterion.id)
                .cloned()
                .unwrap_or_else(|| fallback_feedback(criterion, score, &rubric.scale)),
        };
        feedback.insert(criterion.id.clone(), text);
    }

    let overall = match mode {
        SynthesisMode::TotalFallback => OverallAssessment {
            summary: MODEL_UNAVAILABLE_NOTICE.to_string(),
            strengths: Vec::new(),
            areas_for_improvement: Vec::new(),
        },
        SynthesisMode::Normal => OverallAssessment {
            summary: partial.summary.unwrap_or_default(),
            strengths: partial.strengths.unwrap_or_default(),
            areas_for_improvement: partial.areas_for_improvement.unwrap_or_default(),
        },
    };

    ExtractionResult {
        scores,
        feedback,
        overall,
    }
}

/// Feedback built only from the criterion's static rubric text and the level
/// description matching the assigned score.
fn fallback_feedback(criterion: &Criterion, score: ScoreValue, scale: &Scale) -> String {
    let heading = if criterion.category.is_empty() {
        format!("{} - {}", criterion.code, criterion.title)
    } else {
        format!(
            "{} - {} ({})",
            criterion.code, criterion.title, criterion.category
        )
    };

    let Some(points) = score.points() else {
        return format!("{heading} was marked not applicable for this submission.");
    };

    let level = match scale.label_for(points) {
        Some(label) => format!("level {points} ({label})"),
        None => format!("level {points}"),
    };

    let mut text = format!("{heading}: assessed at {level}.");
    if let Some(description) = criterion.level_text(points) {
        text.push(' ');
        text.push_str(description);
    }
    text.push_str(" Specific evidence from the submission was not available for this criterion.");
    text
}
