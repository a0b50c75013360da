//! Deterministic prompt construction.
//!
//! One rubric + one submission always produce the same instruction string,
//! so runs are reproducible and cacheable upstream. The builder also returns
//! the [`ExpectedSchema`] the normalizer and synthesizer validate against.

use gradeflow_core::{CodeMetrics, Rubric, NOT_APPLICABLE};
use std::fmt::Write;

/// Submissions longer than this are truncated for the prompt.
const TRUNCATE_THRESHOLD: usize = 12_000;
/// Characters kept from the start of an oversized submission.
const HEAD_CHARS: usize = 9_000;
/// Characters kept from the end of an oversized submission.
const TAIL_CHARS: usize = 2_500;
const ELISION_MARKER: &str = "\n...\n";

/// Subkeys the `overall` object must carry.
pub const OVERALL_KEYS: [&str; 3] = ["summary", "strengths", "areas_for_improvement"];

/// The finite shape a model response is validated against: the rubric's
/// criterion-id set plus the scale bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedSchema {
    pub criterion_ids: Vec<String>,
    pub scale_min: i64,
    pub scale_max: i64,
}

impl ExpectedSchema {
    pub fn of(rubric: &Rubric) -> Self {
        Self {
            criterion_ids: rubric.criteria.iter().map(|c| c.id.clone()).collect(),
            scale_min: rubric.scale.min,
            scale_max: rubric.scale.max,
        }
    }

    pub fn knows(&self, id: &str) -> bool {
        self.criterion_ids.iter().any(|known| known == id)
    }

    pub fn in_range(&self, value: i64) -> bool {
        value >= self.scale_min && value <= self.scale_max
    }
}

/// A prompt plus the schema its response will be held to.
#[derive(Debug, Clone)]
pub struct BuiltPrompt {
    pub text: String,
    pub schema: ExpectedSchema,
}

#[derive(Debug, Clone)]
pub struct PromptBuilder {
    /// Language label shown to the model, e.g. "Python".
    pub language_label: String,
    /// Assignment name shown to the model when known.
    pub assignment_name: Option<String>,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self {
            language_label: "Python".to_string(),
            assignment_name: None,
        }
    }
}

impl PromptBuilder {
    pub fn new(language_label: impl Into<String>) -> Self {
        Self {
            language_label: language_label.into(),
            assignment_name: None,
        }
    }

    pub fn with_assignment(mut self, name: impl Into<String>) -> Self {
        self.assignment_name = Some(name.into());
        self
    }

    /// Assemble the instruction string and expected schema for one run.
    pub fn build(
        &self,
        rubric: &Rubric,
        submission: &str,
        metrics: Option<&CodeMetrics>,
        context: Option<&str>,
    ) -> BuiltPrompt {
        let mut text = String::new();

        let _ = writeln!(
            text,
            "Evaluate the following {} submission against the rubric. \
             Provide criterion-level scores and feedback.",
            self.language_label
        );
        let _ = writeln!(text);
        let _ = writeln!(
            text,
            "Assignment: {}",
            self.assignment_name.as_deref().unwrap_or("Programming Assignment")
        );
        let _ = writeln!(text, "Rubric: {} (v{})", rubric.name, rubric.version);

        let _ = write!(text, "Scale: {}-{}", rubric.scale.min, rubric.scale.max);
        if !rubric.scale.labels.is_empty() {
            let labels: Vec<String> = rubric
                .scale
                .labels
                .iter()
                .map(|(level, label)| format!("{level}: {label}"))
                .collect();
            let _ = write!(text, " ({})", labels.join(" | "));
        }
        let _ = writeln!(text);

        let _ = writeln!(text, "Criteria:");
        for criterion in &rubric.criteria {
            let levels: Vec<String> = criterion
                .levels
                .iter()
                .map(|(level, description)| format!("{level}: {description}"))
                .collect();
            let _ = writeln!(
                text,
                "{}: {} [Levels: {}]",
                criterion.id,
                criterion.title,
                levels.join(" | ")
            );
        }

        let _ = writeln!(text);
        let _ = writeln!(text, "Submission:");
        let _ = writeln!(text, "{}", truncate_submission(submission));

        if let Some(metrics) = metrics {
            let summary = metrics_summary(metrics);
            if !summary.is_empty() {
                let _ = writeln!(text, "Static Metrics: {summary}");
            }
            if !metrics.top_lint_issues.is_empty() {
                let _ = writeln!(text, "Top Lint Issues:");
                for issue in &metrics.top_lint_issues {
                    let _ = writeln!(text, "- {issue}");
                }
            }
            let _ = writeln!(text);
        }

        if let Some(context) = context {
            let _ = writeln!(text, "Context:");
            let _ = writeln!(text, "{context}");
            let _ = writeln!(text);
        }

        let _ = writeln!(text, "Instructions:");
        let _ = writeln!(
            text,
            "1. For each criterion ID, assign a numeric score within the scale if applicable \
             (or \"{NOT_APPLICABLE}\")."
        );
        let _ = writeln!(
            text,
            "2. Provide criterion-level feedback that is specific, constructive, and references \
             the submission and metrics."
        );
        let _ = writeln!(
            text,
            "3. Provide an overall summary, strengths, and areas for improvement."
        );
        let _ = writeln!(text, "4. Return ONLY valid JSON with this structure:");
        let _ = writeln!(text, "{{");
        let _ = writeln!(
            text,
            "  \"scores\": {{\"CRIT_ID\": {}-{} or \"{NOT_APPLICABLE}\", ...}},",
            rubric.scale.min, rubric.scale.max
        );
        let _ = writeln!(text, "  \"feedback\": {{\"CRIT_ID\": \"text\", ...}},");
        let _ = writeln!(text, "  \"overall\": {{");
        let _ = writeln!(text, "      \"summary\": \"text\",");
        let _ = writeln!(text, "      \"strengths\": [\"text\", ...],");
        let _ = writeln!(text, "      \"areas_for_improvement\": [\"text\", ...]");
        let _ = writeln!(text, "  }}");
        let _ = writeln!(text, "}}");

        BuiltPrompt {
            text,
            schema: ExpectedSchema::of(rubric),
        }
    }
}

/// Keep the head and tail of an oversized submission around an elision
/// marker, bounding prompt size while preserving setup and conclusion.
fn truncate_submission(submission: &str) -> String {
    let char_count = submission.chars().count();
    if char_count <= TRUNCATE_THRESHOLD {
        return submission.to_string();
    }

    let head_end = submission
        .char_indices()
        .nth(HEAD_CHARS)
        .map(|(idx, _)| idx)
        .unwrap_or(submission.len());
    let tail_start = submission
        .char_indices()
        .nth(char_count - TAIL_CHARS)
        .map(|(idx, _)| idx)
        .unwrap_or(0);

    format!(
        "{}{}{}",
        &submission[..head_end],
        ELISION_MARKER,
        &submission[tail_start..]
    )
}

/// Compact `key: value` summary of the non-null metrics fields.
fn metrics_summary(metrics: &CodeMetrics) -> String {
    let mut pairs = vec![
        format!("lines: {}", metrics.lines),
        format!("non_empty_lines: {}", metrics.non_empty_lines),
        format!("functions: {}", metrics.functions),
        format!("classes: {}", metrics.classes),
        format!("docstring_coverage: {:.2}", metrics.docstring_coverage),
    ];
    if let Some(mi) = metrics.maintainability_index {
        pairs.push(format!("maintainability_index: {mi:.1}"));
    }
    if let Some(avg) = metrics.avg_cyclomatic_complexity {
        pairs.push(format!("avg_cyclomatic_complexity: {avg:.2}"));
    }
    if let Some(max) = metrics.max_cyclomatic_complexity {
        pairs.push(format!("max_cyclomatic_complexity: {max:.1}"));
    }
    if let Some(count) = metrics.lint_issue_count {
        pairs.push(format!("lint_issue_count: {count}"));
    }
    pairs.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use gradeflow_core::sample_cs_rubric;

    #[test]
    fn test_prompt_is_deterministic() {
        let rubric = sample_cs_rubric();
        let builder = PromptBuilder::default();
        let first = builder.build(&rubric, "print('hi')", None, None);
        let second = builder.build(&rubric, "print('hi')", None, None);
        assert_eq!(first.text, second.text);
        assert_eq!(first.schema, second.schema);
    }

    #[test]
    fn test_prompt_lists_every_criterion_and_demands_json() {
        let rubric = sample_cs_rubric();
        let prompt = PromptBuilder::default().build(&rubric, "code", None, None);

        for criterion in &rubric.criteria {
            assert!(prompt.text.contains(&criterion.id));
            assert!(prompt.text.contains(&criterion.title));
        }
        assert!(prompt.text.contains("\"scores\""));
        assert!(prompt.text.contains("\"feedback\""));
        assert!(prompt.text.contains("\"overall\""));
        assert!(prompt.text.contains("Return ONLY valid JSON"));
    }

    #[test]
    fn test_schema_matches_rubric() {
        let rubric = sample_cs_rubric();
        let prompt = PromptBuilder::default().build(&rubric, "code", None, None);

        assert_eq!(
            prompt.schema.criterion_ids,
            vec!["CORR", "STYLE", "EFF", "DOC"]
        );
        assert_eq!(prompt.schema.scale_min, 0);
        assert_eq!(prompt.schema.scale_max, 3);
        assert!(prompt.schema.knows("CORR"));
        assert!(!prompt.schema.knows("BONUS"));
    }

    #[test]
    fn test_long_submission_is_truncated() {
        let submission: String = "x".repeat(20_000);
        let truncated = truncate_submission(&submission);

        assert!(truncated.contains(ELISION_MARKER));
        assert_eq!(
            truncated.chars().count(),
            HEAD_CHARS + ELISION_MARKER.chars().count() + TAIL_CHARS
        );
    }

    #[test]
    fn test_short_submission_untouched() {
        assert_eq!(truncate_submission("short"), "short");
    }

    #[test]
    fn test_metrics_section_only_lists_available_fields() {
        let rubric = sample_cs_rubric();
        let metrics = CodeMetrics {
            lines: 10,
            non_empty_lines: 8,
            functions: 2,
            classes: 0,
            docstring_coverage: 0.5,
            maintainability_index: None,
            avg_cyclomatic_complexity: Some(1.5),
            max_cyclomatic_complexity: Some(2.0),
            lint_issue_count: None,
            top_lint_issues: vec![],
        };
        let prompt = PromptBuilder::default().build(&rubric, "code", Some(&metrics), None);

        assert!(prompt.text.contains("avg_cyclomatic_complexity: 1.50"));
        assert!(!prompt.text.contains("maintainability_index"));
        assert!(!prompt.text.contains("lint_issue_count"));
        assert!(!prompt.text.contains("Top Lint Issues"));
    }
}
