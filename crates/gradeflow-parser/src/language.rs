use tree_sitter::Parser;

/// Languages the analyzer can parse. Submissions default to Python; the
/// analyzer instance is constructed per language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmissionLanguage {
    Python,
    Rust,
}

impl SubmissionLanguage {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "python" | "py" => Some(Self::Python),
            "rust" | "rs" => Some(Self::Rust),
            _ => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Python => "Python",
            Self::Rust => "Rust",
        }
    }

    /// File extension used when the source is materialized for linting.
    pub(crate) fn file_extension(&self) -> &'static str {
        match self {
            Self::Python => ".py",
            Self::Rust => ".rs",
        }
    }

    /// Build a tree-sitter parser for this language. `None` when the grammar
    /// fails to load; callers degrade rather than fail.
    pub(crate) fn create_parser(&self) -> Option<Parser> {
        let grammar: tree_sitter::Language = match self {
            Self::Python => tree_sitter_python::LANGUAGE.into(),
            Self::Rust => tree_sitter_rust::LANGUAGE.into(),
        };
        let mut parser = Parser::new();
        parser.set_language(&grammar).ok()?;
        Some(parser)
    }
}
