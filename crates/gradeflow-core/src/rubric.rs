//! Rubric ingestion helpers.
//!
//! Upload and file handling live outside this workspace; what arrives here is
//! the JSON document text of an already-uploaded rubric. Parsing normalizes
//! sparse documents into the full [`Rubric`] shape: missing ids fall back to
//! codes, missing codes fall back to ids, and missing level maps get the
//! generic scale labels.

use crate::error::{GradeFlowError, Result};
use crate::types::{Criterion, Rubric, Scale};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Deserialize)]
struct RawRubric {
    name: Option<String>,
    version: Option<String>,
    scale: Option<Scale>,
    #[serde(default)]
    criteria: Vec<RawCriterion>,
}

#[derive(Debug, Deserialize)]
struct RawCriterion {
    id: Option<String>,
    code: Option<String>,
    title: Option<String>,
    // Alternate field names seen in older rubric documents.
    name: Option<String>,
    category: Option<String>,
    competency_area: Option<String>,
    #[serde(default)]
    description: String,
    levels: Option<BTreeMap<String, String>>,
}

impl Rubric {
    /// Parse and normalize a rubric JSON document.
    ///
    /// Rejects documents with no criteria or with duplicate criterion ids;
    /// everything else is defaulted rather than refused.
    pub fn from_json(json_text: &str) -> Result<Rubric> {
        let raw: RawRubric = serde_json::from_str(json_text)?;

        if raw.criteria.is_empty() {
            return Err(GradeFlowError::InvalidRubric(
                "rubric must include a non-empty 'criteria' list".to_string(),
            ));
        }

        let scale = raw.scale.unwrap_or_default();
        let mut criteria = Vec::with_capacity(raw.criteria.len());
        for (idx, c) in raw.criteria.into_iter().enumerate() {
            let id = c
                .id
                .or(c.code.clone())
                .unwrap_or_else(|| format!("C{}", idx + 1));
            let code = c.code.unwrap_or_else(|| id.clone());
            let title = c
                .title
                .or(c.name)
                .unwrap_or_else(|| format!("Criterion {}", idx + 1));
            let category = c.category.or(c.competency_area).unwrap_or_default();
            let levels = match c.levels {
                Some(levels) if !levels.is_empty() => levels,
                _ => generic_levels(&scale),
            };
            criteria.push(Criterion {
                id,
                code,
                title,
                category,
                description: c.description,
                levels,
            });
        }

        let mut seen = BTreeSet::new();
        for criterion in &criteria {
            if !seen.insert(criterion.id.as_str()) {
                return Err(GradeFlowError::InvalidRubric(format!(
                    "duplicate criterion id: {}",
                    criterion.id
                )));
            }
        }

        Ok(Rubric {
            name: raw.name.unwrap_or_else(|| "Custom Rubric".to_string()),
            version: raw.version.unwrap_or_else(|| "1.0".to_string()),
            scale,
            criteria,
        })
    }
}

/// Level map synthesized from the scale labels when a criterion has none.
fn generic_levels(scale: &Scale) -> BTreeMap<String, String> {
    let mut levels = BTreeMap::new();
    for value in scale.min..=scale.max {
        let label = scale
            .label_for(value)
            .unwrap_or("Level description unavailable")
            .to_string();
        levels.insert(value.to_string(), label);
    }
    levels
}

/// Built-in rubric for CS programming assignments (0-3 scale). Used as a test
/// fixture and as the default when no custom rubric is supplied.
pub fn sample_cs_rubric() -> Rubric {
    fn criterion(
        id: &str,
        title: &str,
        category: &str,
        description: &str,
        levels: [&str; 4],
    ) -> Criterion {
        Criterion {
            id: id.to_string(),
            code: id.to_string(),
            title: title.to_string(),
            category: category.to_string(),
            description: description.to_string(),
            levels: levels
                .iter()
                .enumerate()
                .map(|(i, text)| (i.to_string(), text.to_string()))
                .collect(),
        }
    }

    Rubric {
        name: "CS Programming Assignment - General Rubric".to_string(),
        version: "1.0".to_string(),
        scale: Scale::default(),
        criteria: vec![
            criterion(
                "CORR",
                "Correctness",
                "Program Quality",
                "Program produces correct outputs across representative and edge cases.",
                [
                    "Fails most tests; frequent runtime errors.",
                    "Passes some tests; noticeable logic bugs.",
                    "Passes most tests; minor issues on edge cases.",
                    "Passes all specified tests including edge cases.",
                ],
            ),
            criterion(
                "STYLE",
                "Code Style and Readability",
                "Code Quality",
                "Consistent style, meaningful names, modularity, and comments/docstrings as appropriate.",
                [
                    "Inconsistent style; very hard to read.",
                    "Some conventions followed; readability issues remain.",
                    "Generally consistent style and readable structure.",
                    "Exemplary style; highly readable and idiomatic.",
                ],
            ),
            criterion(
                "EFF",
                "Efficiency and Complexity",
                "Performance",
                "Appropriate algorithms/data structures; avoids unnecessary overhead.",
                [
                    "Inefficient approach; severe performance issues.",
                    "Suboptimal approach; noticeable inefficiencies.",
                    "Reasonable efficiency for problem constraints.",
                    "Efficient, well-chosen algorithms and structures.",
                ],
            ),
            criterion(
                "DOC",
                "Documentation and Testing",
                "Process",
                "Clear docstrings/comments and evidence of tests (cases, edge cases).",
                [
                    "No meaningful documentation or tests.",
                    "Minimal docs; ad-hoc tests only.",
                    "Adequate docs and basic tests.",
                    "Comprehensive docs and thorough tests incl. edge cases.",
                ],
            ),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_rubric_fills_defaults() {
        let json = r#"{
            "criteria": [
                {"code": "A1", "title": "Analysis"},
                {"name": "Presentation"}
            ]
        }"#;

        let rubric = Rubric::from_json(json).unwrap();
        assert_eq!(rubric.name, "Custom Rubric");
        assert_eq!(rubric.version, "1.0");
        assert_eq!(rubric.scale.min, 0);
        assert_eq!(rubric.scale.max, 3);

        assert_eq!(rubric.criteria[0].id, "A1");
        assert_eq!(rubric.criteria[0].code, "A1");
        assert_eq!(rubric.criteria[1].id, "C2");
        assert_eq!(rubric.criteria[1].title, "Presentation");
        // Synthesized levels carry the generic scale labels.
        assert_eq!(
            rubric.criteria[1].levels.get("2").map(String::as_str),
            Some("Meets")
        );
    }

    #[test]
    fn test_empty_criteria_rejected() {
        let err = Rubric::from_json(r#"{"name": "Empty", "criteria": []}"#).unwrap_err();
        assert!(err.to_string().contains("non-empty"));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let json = r#"{"criteria": [{"id": "X"}, {"id": "X"}]}"#;
        let err = Rubric::from_json(json).unwrap_err();
        assert!(err.to_string().contains("duplicate criterion id"));
    }

    #[test]
    fn test_sample_rubric_shape() {
        let rubric = sample_cs_rubric();
        assert_eq!(rubric.criterion_ids(), vec!["CORR", "STYLE", "EFF", "DOC"]);
        for criterion in &rubric.criteria {
            assert_eq!(criterion.levels.len(), 4);
        }
    }
}
