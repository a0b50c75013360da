//! Cyclomatic complexity and maintainability index from tree-sitter ASTs.
//!
//! Complexity is 1 + count(decision points) per function. The maintainability
//! index uses the classic three-term formula over Halstead volume, total
//! complexity, and source lines, rescaled to 0-100.

use crate::analyzer::{MetricsFragment, SubAnalyzer};
use crate::language::SubmissionLanguage;
use std::collections::HashSet;
use tree_sitter::Node;

pub(crate) struct ComplexityAnalyzer {
    language: SubmissionLanguage,
}

impl ComplexityAnalyzer {
    pub(crate) fn new(language: SubmissionLanguage) -> Self {
        Self { language }
    }
}

impl SubAnalyzer for ComplexityAnalyzer {
    fn name(&self) -> &'static str {
        "complexity"
    }

    fn available(&self) -> bool {
        self.language.create_parser().is_some()
    }

    fn compute(&self, source: &str) -> Option<MetricsFragment> {
        let mut parser = self.language.create_parser()?;
        let tree = parser.parse(source, None)?;
        let root = tree.root_node();
        if root.has_error() {
            return None;
        }

        let mut complexities = Vec::new();
        collect_function_complexities(&root, self.language, &mut complexities);

        let (avg, max, total) = if complexities.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            let total: f64 = complexities.iter().sum();
            let max = complexities.iter().cloned().fold(0.0, f64::max);
            (total / complexities.len() as f64, max, total)
        };

        let sloc = source.lines().filter(|l| !l.trim().is_empty()).count();
        let volume = halstead_volume(&root, source);

        Some(MetricsFragment {
            maintainability_index: Some(maintainability_index(volume, total, sloc)),
            avg_cyclomatic_complexity: Some(avg),
            max_cyclomatic_complexity: Some(max),
            ..MetricsFragment::default()
        })
    }
}

fn is_function_node(kind: &str, language: SubmissionLanguage) -> bool {
    match language {
        SubmissionLanguage::Python => kind == "function_definition",
        SubmissionLanguage::Rust => kind == "function_item",
    }
}

fn collect_function_complexities(node: &Node, language: SubmissionLanguage, out: &mut Vec<f64>) {
    if is_function_node(node.kind(), language) {
        out.push(calculate_cyclomatic_complexity(node));
    }

    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        loop {
            collect_function_complexities(&cursor.node(), language, out);
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
}

/// Calculate cyclomatic complexity from a tree-sitter AST node.
/// Formula: 1 + count(decision_points)
pub(crate) fn calculate_cyclomatic_complexity(node: &Node) -> f64 {
    1.0 + count_decision_points(node) as f64
}

/// Recursively count decision points in an AST subtree.
fn count_decision_points(node: &Node) -> usize {
    let kind = node.kind();
    let mut count = if is_decision_point(kind) { 1 } else { 0 };

    // Logical operators contribute a branch each; the operator is an
    // immediate child of the binary/boolean expression node.
    if matches!(kind, "binary_expression" | "boolean_operator") {
        let mut cursor = node.walk();
        if cursor.goto_first_child() {
            loop {
                if matches!(cursor.node().kind(), "&&" | "||" | "and" | "or") {
                    count += 1;
                }
                if !cursor.goto_next_sibling() {
                    break;
                }
            }
        }
    }

    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        loop {
            count += count_decision_points(&cursor.node());
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }

    count
}

/// Node kinds that branch control flow, for the grammars this analyzer loads.
fn is_decision_point(kind: &str) -> bool {
    matches!(
        kind,
        // If statements
        "if_expression"
            | "if_statement"
            | "if_let_expression"
            | "elif_clause"
            // While loops
            | "while_expression"
            | "while_statement"
            // For loops
            | "for_expression"
            | "for_statement"
            // Loop (Rust)
            | "loop_expression"
            // Match
            | "match_expression"
            | "match_statement"
            // Ternary/Conditional
            | "conditional_expression"
            // Exception handling (Python)
            | "except_clause"
    )
}

/// Estimate Halstead volume from leaf tokens: named leaves are operands,
/// anonymous leaves are operators. Distinctness is by token text.
fn halstead_volume(root: &Node, source: &str) -> f64 {
    let mut total = 0usize;
    let mut distinct = HashSet::new();
    count_tokens(root, source, &mut total, &mut distinct);

    if total == 0 || distinct.is_empty() {
        return 0.0;
    }
    total as f64 * (distinct.len() as f64).log2()
}

fn count_tokens<'a>(
    node: &Node,
    source: &'a str,
    total: &mut usize,
    distinct: &mut HashSet<(bool, &'a str)>,
) {
    if node.child_count() == 0 {
        if let Ok(text) = node.utf8_text(source.as_bytes()) {
            *total += 1;
            distinct.insert((node.is_named(), text));
        }
        return;
    }
    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        loop {
            count_tokens(&cursor.node(), source, total, distinct);
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
}

/// Classic maintainability index, rescaled to 0-100.
fn maintainability_index(volume: f64, total_complexity: f64, sloc: usize) -> f64 {
    let volume_term = 5.2 * volume.max(1.0).ln();
    let sloc_term = 16.2 * (sloc.max(1) as f64).ln();
    let raw = 171.0 - volume_term - 0.23 * total_complexity - sloc_term;
    (raw * 100.0 / 171.0).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_python(code: &str) -> tree_sitter::Tree {
        let mut parser = SubmissionLanguage::Python
            .create_parser()
            .expect("Failed to load Python grammar");
        parser.parse(code, None).expect("Failed to parse code")
    }

    #[test]
    fn test_simple_function_complexity_1() {
        let code = "def simple():\n    return 42\n";
        let tree = parse_python(code);
        let complexity = calculate_cyclomatic_complexity(&tree.root_node());
        assert_eq!(complexity, 1.0, "Simple function should have complexity 1");
    }

    #[test]
    fn test_single_if_complexity_2() {
        let code = "def with_if(x):\n    if x > 0:\n        return True\n    return False\n";
        let tree = parse_python(code);
        let complexity = calculate_cyclomatic_complexity(&tree.root_node());
        assert_eq!(complexity, 2.0, "Single if should have complexity 2");
    }

    #[test]
    fn test_boolean_operator_counts() {
        let code = "def both(a, b):\n    return a and b\n";
        let tree = parse_python(code);
        let complexity = calculate_cyclomatic_complexity(&tree.root_node());
        assert_eq!(complexity, 2.0, "Boolean operator adds one branch");
    }

    #[test]
    fn test_loop_and_nested_if() {
        let code = r#"
def complex(x):
    if x > 0:
        for i in range(x):
            if i % 2 == 0:
                return i
    return 0
"#;
        let tree = parse_python(code);
        let complexity = calculate_cyclomatic_complexity(&tree.root_node());
        assert_eq!(complexity, 4.0, "1 + if + for + if = 4");
    }

    #[test]
    fn test_fragment_for_valid_source() {
        let analyzer = ComplexityAnalyzer::new(SubmissionLanguage::Python);
        assert!(analyzer.available());

        let fragment = analyzer
            .compute("def f(x):\n    if x:\n        return 1\n    return 0\n")
            .expect("valid source should produce a fragment");
        assert_eq!(fragment.avg_cyclomatic_complexity, Some(2.0));
        assert_eq!(fragment.max_cyclomatic_complexity, Some(2.0));
        let mi = fragment.maintainability_index.unwrap();
        assert!((0.0..=100.0).contains(&mi));
        // Lint fields belong to a different sub-analyzer.
        assert_eq!(fragment.lint_issue_count, None);
    }

    #[test]
    fn test_fragment_none_on_syntax_error() {
        let analyzer = ComplexityAnalyzer::new(SubmissionLanguage::Python);
        assert!(analyzer.compute("def broken(:\n    pass").is_none());
    }

    #[test]
    fn test_no_functions_yields_zero_complexity() {
        let analyzer = ComplexityAnalyzer::new(SubmissionLanguage::Python);
        let fragment = analyzer.compute("x = 1\n").unwrap();
        assert_eq!(fragment.avg_cyclomatic_complexity, Some(0.0));
        assert_eq!(fragment.max_cyclomatic_complexity, Some(0.0));
    }
}
