use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Sentinel literal the model may return instead of a numeric score.
pub const NOT_APPLICABLE: &str = "not_applicable";

/// Numeric grading scale shared by every criterion in a rubric.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scale {
    pub min: i64,
    pub max: i64,
    /// Level number (string key) to human label, e.g. "2" -> "Meets".
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl Scale {
    /// Scale midpoint rounded down. This is the single default applied
    /// everywhere a criterion is missing a score.
    pub fn default_score(&self) -> i64 {
        self.min + (self.max - self.min) / 2
    }

    pub fn contains(&self, value: i64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Human label for a level, when the rubric defines one.
    pub fn label_for(&self, value: i64) -> Option<&str> {
        self.labels.get(&value.to_string()).map(String::as_str)
    }
}

impl Default for Scale {
    fn default() -> Self {
        let mut labels = BTreeMap::new();
        labels.insert("0".to_string(), "Does not meet".to_string());
        labels.insert("1".to_string(), "Approaching".to_string());
        labels.insert("2".to_string(), "Meets".to_string());
        labels.insert("3".to_string(), "Exceeds".to_string());
        Self {
            min: 0,
            max: 3,
            labels,
        }
    }
}

/// One gradable dimension of a rubric.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Criterion {
    /// Stable key used throughout the pipeline.
    pub id: String,
    pub code: String,
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    /// Level number (string key) to level description.
    #[serde(default)]
    pub levels: BTreeMap<String, String>,
}

impl Criterion {
    /// Level description for a numeric score, when the rubric defines one.
    pub fn level_text(&self, score: i64) -> Option<&str> {
        self.levels.get(&score.to_string()).map(String::as_str)
    }
}

/// An ordered set of criteria plus the scale they are scored on.
/// Immutable once loaded for a grading run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rubric {
    pub name: String,
    pub version: String,
    pub scale: Scale,
    pub criteria: Vec<Criterion>,
}

impl Rubric {
    pub fn criterion_ids(&self) -> Vec<&str> {
        self.criteria.iter().map(|c| c.id.as_str()).collect()
    }

    pub fn criterion(&self, id: &str) -> Option<&Criterion> {
        self.criteria.iter().find(|c| c.id == id)
    }
}

/// A criterion score: either points on the rubric scale or the
/// `"not_applicable"` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreValue {
    Points(i64),
    NotApplicable,
}

impl ScoreValue {
    pub fn points(&self) -> Option<i64> {
        match self {
            ScoreValue::Points(n) => Some(*n),
            ScoreValue::NotApplicable => None,
        }
    }
}

impl Serialize for ScoreValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ScoreValue::Points(n) => serializer.serialize_i64(*n),
            ScoreValue::NotApplicable => serializer.serialize_str(NOT_APPLICABLE),
        }
    }
}

impl<'de> Deserialize<'de> for ScoreValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct ScoreVisitor;

        impl Visitor<'_> for ScoreVisitor {
            type Value = ScoreValue;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "an integer score or \"{NOT_APPLICABLE}\"")
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(ScoreValue::Points(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                i64::try_from(v)
                    .map(ScoreValue::Points)
                    .map_err(|_| E::invalid_value(de::Unexpected::Unsigned(v), &self))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                if v == NOT_APPLICABLE {
                    Ok(ScoreValue::NotApplicable)
                } else {
                    Err(E::invalid_value(de::Unexpected::Str(v), &self))
                }
            }
        }

        deserializer.deserialize_any(ScoreVisitor)
    }
}

/// Fixed-shape structural/quality metrics for one submission.
///
/// Optional fields are `None` when their sub-analyzer was unavailable or
/// failed; failure of one sub-analyzer never nulls another.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CodeMetrics {
    pub lines: usize,
    pub non_empty_lines: usize,
    pub functions: usize,
    pub classes: usize,
    pub docstring_coverage: f64,
    pub maintainability_index: Option<f64>,
    pub avg_cyclomatic_complexity: Option<f64>,
    pub max_cyclomatic_complexity: Option<f64>,
    pub lint_issue_count: Option<usize>,
    #[serde(default)]
    pub top_lint_issues: Vec<String>,
}

/// Whole-submission assessment accompanying the per-criterion maps.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OverallAssessment {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub areas_for_improvement: Vec<String>,
}

/// The pipeline's output record.
///
/// For the rubric it was produced against, `scores` and `feedback` are keyed
/// by exactly the rubric's criterion ids; every score is either
/// `NotApplicable` or within the scale bounds.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtractionResult {
    pub scores: BTreeMap<String, ScoreValue>,
    pub feedback: BTreeMap<String, String>,
    pub overall: OverallAssessment,
}

impl ExtractionResult {
    /// Sum of numeric scores; `NotApplicable` entries contribute nothing.
    pub fn total_points(&self) -> i64 {
        self.scores.values().filter_map(ScoreValue::points).sum()
    }

    /// Maximum attainable points given which criteria were applicable.
    pub fn max_points(&self, rubric: &Rubric) -> i64 {
        let applicable = self
            .scores
            .values()
            .filter(|s| s.points().is_some())
            .count() as i64;
        applicable * rubric.scale.max
    }

    /// Percentage of attainable points, 0.0 when nothing was applicable.
    pub fn percentage(&self, rubric: &Rubric) -> f64 {
        let max = self.max_points(rubric);
        if max == 0 {
            return 0.0;
        }
        self.total_points() as f64 / max as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_score_is_midpoint_rounded_down() {
        let scale = Scale {
            min: 0,
            max: 3,
            labels: BTreeMap::new(),
        };
        assert_eq!(scale.default_score(), 1);

        let scale = Scale {
            min: 1,
            max: 5,
            labels: BTreeMap::new(),
        };
        assert_eq!(scale.default_score(), 3);
    }

    #[test]
    fn test_score_value_serde_roundtrip() {
        let json = serde_json::to_string(&ScoreValue::Points(2)).unwrap();
        assert_eq!(json, "2");
        let json = serde_json::to_string(&ScoreValue::NotApplicable).unwrap();
        assert_eq!(json, "\"not_applicable\"");

        let value: ScoreValue = serde_json::from_str("3").unwrap();
        assert_eq!(value, ScoreValue::Points(3));
        let value: ScoreValue = serde_json::from_str("\"not_applicable\"").unwrap();
        assert_eq!(value, ScoreValue::NotApplicable);
        assert!(serde_json::from_str::<ScoreValue>("\"great\"").is_err());
    }

    #[test]
    fn test_percentage_skips_not_applicable() {
        let rubric = crate::rubric::sample_cs_rubric();
        let mut result = ExtractionResult::default();
        result
            .scores
            .insert("CORR".to_string(), ScoreValue::Points(3));
        result
            .scores
            .insert("STYLE".to_string(), ScoreValue::Points(2));
        result
            .scores
            .insert("EFF".to_string(), ScoreValue::NotApplicable);

        assert_eq!(result.total_points(), 5);
        assert_eq!(result.max_points(&rubric), 6);
        assert_relative_eq!(result.percentage(&rubric), 83.333, epsilon = 0.001);
    }
}
