//! Structural pass: definition counts and doc coverage from the syntax tree.
//!
//! Grading must proceed even on broken student code, so a source that fails
//! to parse yields the degraded record (`functions=0, classes=0,
//! docstring_coverage=0.0`) instead of an error.

use crate::language::SubmissionLanguage;
use tree_sitter::Node;

#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub(crate) struct StructuralFragment {
    pub functions: usize,
    pub classes: usize,
    pub docstring_coverage: f64,
}

pub(crate) fn analyze_structure(
    source: &str,
    language: SubmissionLanguage,
) -> StructuralFragment {
    let Some(mut parser) = language.create_parser() else {
        return StructuralFragment::default();
    };
    let Some(tree) = parser.parse(source, None) else {
        return StructuralFragment::default();
    };
    if tree.root_node().has_error() {
        return StructuralFragment::default();
    }

    let mut counts = DefinitionCounts::default();
    visit(&tree.root_node(), source, language, &mut counts);

    let definitions = counts.functions + counts.classes;
    let docstring_coverage = if definitions == 0 {
        0.0
    } else {
        counts.documented as f64 / definitions as f64
    };

    StructuralFragment {
        functions: counts.functions,
        classes: counts.classes,
        docstring_coverage,
    }
}

#[derive(Debug, Default)]
struct DefinitionCounts {
    functions: usize,
    classes: usize,
    documented: usize,
}

fn visit(node: &Node, source: &str, language: SubmissionLanguage, counts: &mut DefinitionCounts) {
    match (language, node.kind()) {
        (SubmissionLanguage::Python, "function_definition") => {
            counts.functions += 1;
            if has_python_docstring(node) {
                counts.documented += 1;
            }
        }
        (SubmissionLanguage::Python, "class_definition") => {
            counts.classes += 1;
            if has_python_docstring(node) {
                counts.documented += 1;
            }
        }
        (SubmissionLanguage::Rust, "function_item") => {
            counts.functions += 1;
            if has_rust_doc_comment(node, source) {
                counts.documented += 1;
            }
        }
        (SubmissionLanguage::Rust, "struct_item" | "enum_item" | "trait_item") => {
            counts.classes += 1;
            if has_rust_doc_comment(node, source) {
                counts.documented += 1;
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        loop {
            visit(&cursor.node(), source, language, counts);
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
}

/// A Python definition is documented when the first statement of its body is
/// a bare string expression.
fn has_python_docstring(node: &Node) -> bool {
    let Some(body) = node.child_by_field_name("body") else {
        return false;
    };
    let Some(first) = body.named_child(0) else {
        return false;
    };
    if first.kind() != "expression_statement" {
        return false;
    }
    matches!(first.named_child(0), Some(child) if child.kind() == "string")
}

/// A Rust item is documented when an immediately preceding line comment
/// carries the doc prefix.
fn has_rust_doc_comment(node: &Node, source: &str) -> bool {
    let mut sibling = node.prev_sibling();
    while let Some(prev) = sibling {
        match prev.kind() {
            "line_comment" | "block_comment" => {
                if let Ok(text) = prev.utf8_text(source.as_bytes()) {
                    if text.starts_with("///") || text.starts_with("/**") {
                        return true;
                    }
                }
                sibling = prev.prev_sibling();
            }
            "attribute_item" => sibling = prev.prev_sibling(),
            _ => return false,
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_python_definitions_and_docstrings() {
        let source = r#"
class Greeter:
    """Says hello."""

    def greet(self, name):
        """Return a greeting."""
        return f"hello {name}"

def undocumented():
    return 1
"#;
        let fragment = analyze_structure(source, SubmissionLanguage::Python);
        assert_eq!(fragment.functions, 2);
        assert_eq!(fragment.classes, 1);
        assert_relative_eq!(fragment.docstring_coverage, 2.0 / 3.0, epsilon = 1e-9);
    }

    #[test]
    fn test_python_syntax_error_degrades() {
        let fragment = analyze_structure("def broken(:\n    pass", SubmissionLanguage::Python);
        assert_eq!(fragment, StructuralFragment::default());
    }

    #[test]
    fn test_no_definitions_means_zero_coverage() {
        let fragment = analyze_structure("x = 1\nprint(x)\n", SubmissionLanguage::Python);
        assert_eq!(fragment.functions, 0);
        assert_eq!(fragment.classes, 0);
        assert_relative_eq!(fragment.docstring_coverage, 0.0);
    }

    #[test]
    fn test_rust_items_and_doc_comments() {
        let source = r#"
/// A counter.
struct Counter {
    value: u32,
}

/// Increment and return the new value.
fn bump(c: &mut Counter) -> u32 {
    c.value += 1;
    c.value
}

fn plain() {}
"#;
        let fragment = analyze_structure(source, SubmissionLanguage::Rust);
        assert_eq!(fragment.functions, 2);
        assert_eq!(fragment.classes, 1);
        assert_relative_eq!(fragment.docstring_coverage, 2.0 / 3.0, epsilon = 1e-9);
    }
}
