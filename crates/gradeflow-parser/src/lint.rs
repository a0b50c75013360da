//! Lint sub-analyzer: shells out to an external style checker.
//!
//! The submission is materialized to a scratch file, the first linter found
//! on PATH is invoked against it, and up to [`MAX_LINT_ISSUES`] issue lines
//! are kept (with the scratch path stripped) plus the total count. When no
//! linter is installed, `available()` is false and only the lint fields of
//! the metrics record stay null.

use crate::analyzer::{MetricsFragment, SubAnalyzer};
use crate::language::SubmissionLanguage;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::Write;
use std::process::Command;
use tracing::{debug, warn};

/// Maximum number of issue lines surfaced to prompts and reports.
pub const MAX_LINT_ISSUES: usize = 10;

/// Matches the `line:col: CODE message` shape shared by ruff and flake8
/// output once the file path prefix is stripped.
static ISSUE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+:\d+:?\s+\S+").expect("issue line regex is valid")
});

pub(crate) struct LintAnalyzer {
    language: SubmissionLanguage,
    candidates: Vec<String>,
}

impl LintAnalyzer {
    /// Build the analyzer for a language, optionally overriding the probed
    /// linter commands with a single configured executable.
    pub(crate) fn new(language: SubmissionLanguage, linter_override: Option<&str>) -> Self {
        let candidates = match linter_override {
            Some(cmd) => vec![cmd.to_string()],
            None => match language {
                SubmissionLanguage::Python => {
                    vec!["ruff".to_string(), "flake8".to_string()]
                }
                // No external linter is wired up for Rust submissions.
                SubmissionLanguage::Rust => Vec::new(),
            },
        };
        Self {
            language,
            candidates,
        }
    }

    fn resolve_command(&self) -> Option<&str> {
        self.candidates
            .iter()
            .map(String::as_str)
            .find(|cmd| probe_command(cmd))
    }

    fn run_linter(&self, command: &str, source: &str) -> Option<(usize, Vec<String>)> {
        let mut scratch = tempfile::Builder::new()
            .prefix("gradeflow-lint-")
            .suffix(self.language.file_extension())
            .tempfile()
            .map_err(|e| warn!(error = %e, "Failed to create lint scratch file"))
            .ok()?;
        scratch
            .write_all(source.as_bytes())
            .map_err(|e| warn!(error = %e, "Failed to write lint scratch file"))
            .ok()?;

        let path = scratch.path().to_path_buf();
        let output = match command {
            "ruff" => Command::new(command)
                .args(["check", "--output-format", "concise", "--quiet"])
                .arg(&path)
                .output(),
            _ => Command::new(command).arg(&path).output(),
        };
        let output = output
            .map_err(|e| warn!(linter = command, error = %e, "Failed to invoke linter"))
            .ok()?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let path_str = path.to_string_lossy();

        let mut issues = Vec::new();
        for line in stdout.lines() {
            let Some(rest) = line.strip_prefix(path_str.as_ref()) else {
                continue;
            };
            let trimmed = rest.trim_start_matches(':').trim();
            if ISSUE_LINE.is_match(trimmed) {
                issues.push(trimmed.to_string());
            }
        }

        let count = issues.len();
        issues.truncate(MAX_LINT_ISSUES);
        Some((count, issues))
    }
}

impl SubAnalyzer for LintAnalyzer {
    fn name(&self) -> &'static str {
        "lint"
    }

    fn available(&self) -> bool {
        self.resolve_command().is_some()
    }

    fn compute(&self, source: &str) -> Option<MetricsFragment> {
        let command = self.resolve_command()?.to_string();
        debug!(linter = %command, "Running lint sub-analyzer");
        let (count, issues) = self.run_linter(&command, source)?;

        Some(MetricsFragment {
            lint_issue_count: Some(count),
            top_lint_issues: issues,
            ..MetricsFragment::default()
        })
    }
}

fn probe_command(command: &str) -> bool {
    Command::new(command)
        .arg("--version")
        .output()
        .map(|out| out.status.success())
        .unwrap_or(false)
}
