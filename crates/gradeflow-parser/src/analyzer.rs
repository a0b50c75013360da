//! The static code analyzer: one structural pass plus capability-probed
//! optional sub-analyzers, merged into a single [`CodeMetrics`] record.
//!
//! `analyze` never fails: broken source degrades the structural fields, an
//! unavailable or failing sub-analyzer nulls only its own fields.

use crate::complexity::ComplexityAnalyzer;
use crate::language::SubmissionLanguage;
use crate::lint::LintAnalyzer;
use crate::structure::analyze_structure;
use dashmap::DashMap;
use gradeflow_core::{AnalysisConfig, CodeMetrics};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// One optional sub-analyzer's contribution to the metrics record. Fields
/// are disjoint across sub-analyzers, so merge order is irrelevant.
#[derive(Debug, Default, Clone)]
pub(crate) struct MetricsFragment {
    pub maintainability_index: Option<f64>,
    pub avg_cyclomatic_complexity: Option<f64>,
    pub max_cyclomatic_complexity: Option<f64>,
    pub lint_issue_count: Option<usize>,
    pub top_lint_issues: Vec<String>,
}

/// Capability-probed optional sub-analyzer.
pub(crate) trait SubAnalyzer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this sub-analyzer can run at all in this environment.
    fn available(&self) -> bool;

    /// Compute this sub-analyzer's fragment; `None` on any failure.
    fn compute(&self, source: &str) -> Option<MetricsFragment>;
}

pub struct CodeAnalyzer {
    language: SubmissionLanguage,
    sub_analyzers: Vec<Box<dyn SubAnalyzer>>,
    cache: DashMap<[u8; 32], CodeMetrics>,
}

impl CodeAnalyzer {
    pub fn new(language: SubmissionLanguage) -> Self {
        Self::with_lint(language, true, None)
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        let language =
            SubmissionLanguage::from_name(&config.language).unwrap_or(SubmissionLanguage::Python);
        Self::with_lint(language, config.lint, config.linter.as_deref())
    }

    fn with_lint(
        language: SubmissionLanguage,
        lint: bool,
        linter_override: Option<&str>,
    ) -> Self {
        let mut sub_analyzers: Vec<Box<dyn SubAnalyzer>> =
            vec![Box::new(ComplexityAnalyzer::new(language))];
        if lint {
            sub_analyzers.push(Box::new(LintAnalyzer::new(language, linter_override)));
        }
        Self {
            language,
            sub_analyzers,
            cache: DashMap::new(),
        }
    }

    pub fn language(&self) -> SubmissionLanguage {
        self.language
    }

    /// Analyze one submission. Records are cached by content hash, so
    /// repeated prompt builds for the same submission reuse the computed
    /// metrics.
    pub fn analyze(&self, source: &str) -> CodeMetrics {
        let key: [u8; 32] = Sha256::digest(source.as_bytes()).into();
        if let Some(hit) = self.cache.get(&key) {
            debug!("Metrics cache hit");
            return hit.value().clone();
        }

        let metrics = self.analyze_uncached(source);
        self.cache.insert(key, metrics.clone());
        metrics
    }

    fn analyze_uncached(&self, source: &str) -> CodeMetrics {
        let lines: Vec<&str> = source.lines().collect();
        let structure = analyze_structure(source, self.language);

        let mut metrics = CodeMetrics {
            lines: lines.len(),
            non_empty_lines: lines.iter().filter(|l| !l.trim().is_empty()).count(),
            functions: structure.functions,
            classes: structure.classes,
            docstring_coverage: structure.docstring_coverage,
            ..CodeMetrics::default()
        };

        for sub in &self.sub_analyzers {
            if !sub.available() {
                debug!(sub_analyzer = sub.name(), "Sub-analyzer unavailable");
                continue;
            }
            match sub.compute(source) {
                Some(fragment) => merge_fragment(&mut metrics, fragment),
                None => {
                    warn!(
                        sub_analyzer = sub.name(),
                        "Sub-analyzer failed; its fields stay null"
                    );
                }
            }
        }

        metrics
    }
}

fn merge_fragment(metrics: &mut CodeMetrics, fragment: MetricsFragment) {
    if fragment.maintainability_index.is_some() {
        metrics.maintainability_index = fragment.maintainability_index;
    }
    if fragment.avg_cyclomatic_complexity.is_some() {
        metrics.avg_cyclomatic_complexity = fragment.avg_cyclomatic_complexity;
    }
    if fragment.max_cyclomatic_complexity.is_some() {
        metrics.max_cyclomatic_complexity = fragment.max_cyclomatic_complexity;
    }
    if fragment.lint_issue_count.is_some() {
        metrics.lint_issue_count = fragment.lint_issue_count;
    }
    if !fragment.top_lint_issues.is_empty() {
        metrics.top_lint_issues = fragment.top_lint_issues;
    }
}
