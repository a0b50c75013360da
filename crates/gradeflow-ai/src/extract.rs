//! Cascading text-to-structure extraction.
//!
//! Model output embeds JSON in prose, markdown fences, or broken formatting.
//! Each heuristic is a pure [`JsonStrategy`] attempted in a fixed order;
//! first match wins. Adding a heuristic means appending to [`STRATEGIES`],
//! not adding a branch. Exhausting the cascade is not an error: the caller
//! forwards an empty map and the synthesizer completes the result.

use serde_json::{Map, Value};
use tracing::debug;

pub type JsonMap = Map<String, Value>;

/// One parsing heuristic in the cascade. Deterministic and side-effect-free;
/// `None` on any failure.
pub trait JsonStrategy: Sync {
    fn name(&self) -> &'static str;
    fn attempt(&self, text: &str) -> Option<JsonMap>;
}

/// The cascade, in attempt order.
pub static STRATEGIES: &[&dyn JsonStrategy] = &[
    &WholeText,
    &BraceSpan,
    &JsonFence,
    &AnyFence,
    &WhitespaceRepair,
];

/// Outcome of running the cascade over one raw response.
#[derive(Debug, Clone)]
pub struct ExtractionAttempt {
    /// The extracted object, when any strategy matched.
    pub value: Option<JsonMap>,
    /// Name of the strategy that matched.
    pub strategy: Option<&'static str>,
    /// One line per attempted strategy.
    pub trace: Vec<String>,
}

/// Run the cascade over raw model text.
pub fn extract(raw_text: &str) -> ExtractionAttempt {
    let mut trace = Vec::new();

    for strategy in STRATEGIES {
        match strategy.attempt(raw_text) {
            Some(map) => {
                debug!(strategy = strategy.name(), "Extraction strategy matched");
                trace.push(format!("{}: matched", strategy.name()));
                return ExtractionAttempt {
                    value: Some(map),
                    strategy: Some(strategy.name()),
                    trace,
                };
            }
            None => trace.push(format!("{}: no structure", strategy.name())),
        }
    }

    debug!("All extraction strategies failed");
    ExtractionAttempt {
        value: None,
        strategy: None,
        trace,
    }
}

/// Only JSON objects count; a strategy that finds a valid array or scalar
/// has still failed.
fn parse_object(candidate: &str) -> Option<JsonMap> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Substring from the first `{` to the last `}`.
fn brace_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end >= start).then(|| &text[start..=end])
}

/// Strategy 1: the entire response is JSON.
struct WholeText;

impl JsonStrategy for WholeText {
    fn name(&self) -> &'static str {
        "whole_text"
    }

    fn attempt(&self, text: &str) -> Option<JsonMap> {
        parse_object(text.trim())
    }
}

/// Strategy 2: JSON surrounded by prose.
struct BraceSpan;

impl JsonStrategy for BraceSpan {
    fn name(&self) -> &'static str {
        "brace_span"
    }

    fn attempt(&self, text: &str) -> Option<JsonMap> {
        brace_span(text).and_then(parse_object)
    }
}

/// Strategy 3: a fenced block explicitly labeled `json`.
struct JsonFence;

impl JsonStrategy for JsonFence {
    fn name(&self) -> &'static str {
        "json_fence"
    }

    fn attempt(&self, text: &str) -> Option<JsonMap> {
        let start = text.find("```json")? + "```json".len();
        let rest = &text[start..];
        let end = rest.find("```")?;
        parse_object(rest[..end].trim())
    }
}

/// Strategy 4: any fenced block, skipping an optional language-tag line.
struct AnyFence;

impl JsonStrategy for AnyFence {
    fn name(&self) -> &'static str {
        "any_fence"
    }

    fn attempt(&self, text: &str) -> Option<JsonMap> {
        let mut start = text.find("```")? + "```".len();
        // Skip a language identifier line when present.
        if let Some(newline) = text[start..].find('\n') {
            start += newline + 1;
        }
        let rest = &text[start..];
        let end = rest.find("```")?;
        parse_object(rest[..end].trim())
    }
}

/// Strategy 5: the brace span again, after collapsing newlines/tabs and
/// normalizing whitespace to repair formatting-induced breaks.
struct WhitespaceRepair;

impl JsonStrategy for WhitespaceRepair {
    fn name(&self) -> &'static str {
        "whitespace_repair"
    }

    fn attempt(&self, text: &str) -> Option<JsonMap> {
        let span = brace_span(text)?;
        let collapsed = span.split_whitespace().collect::<Vec<_>>().join(" ");
        parse_object(&collapsed)
    }
}
