//! The grading pipeline: prompt, gateway call, extraction, normalization,
//! and synthesis in one synchronous pass per submission.
//!
//! Runs are stateless with respect to each other; the only shared mutable
//! state is the run-id counter. A gateway failure short-circuits straight to
//! total-fallback synthesis, so callers always receive a complete result and
//! never branch on whether the model succeeded. The sole hard failure is
//! configuration, and it happens in the gateway factory before any run.

use crate::extract;
use crate::gateway::ModelGateway;
use crate::normalize::{self, PartialResult};
use crate::prompt::{BuiltPrompt, PromptBuilder};
use crate::synthesize::{self, SynthesisMode};
use chrono::{DateTime, Utc};
use gradeflow_core::{next_run_id, CodeMetrics, ExtractionResult, Rubric};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

const MAX_TOKENS_BASE: usize = 800;
const MAX_TOKENS_PER_CRITERION: usize = 150;

/// How a run's content came to be, for reports and log correlation.
#[derive(Debug, Clone)]
pub struct Provenance {
    pub run_id: u64,
    /// Model the result came from (or was requested from, on fallback).
    pub model: String,
    /// True when the gateway failed and the entire result was synthesized.
    pub degraded: bool,
    /// Extraction strategy that produced the structure, when one matched.
    pub strategy: Option<&'static str>,
    /// One line per attempted extraction strategy.
    pub attempts: Vec<String>,
    pub duration_ms: u64,
    pub graded_at: DateTime<Utc>,
}

/// A complete grading record: the result callers consume plus provenance.
#[derive(Debug, Clone)]
pub struct GradingOutcome {
    pub result: ExtractionResult,
    pub provenance: Provenance,
}

pub struct GradingPipeline {
    gateway: Arc<dyn ModelGateway>,
    builder: PromptBuilder,
}

impl GradingPipeline {
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self {
            gateway,
            builder: PromptBuilder::default(),
        }
    }

    pub fn with_builder(gateway: Arc<dyn ModelGateway>, builder: PromptBuilder) -> Self {
        Self { gateway, builder }
    }

    /// Output token allowance for one run, scaled to rubric size.
    fn max_tokens_for(rubric: &Rubric) -> usize {
        MAX_TOKENS_BASE + MAX_TOKENS_PER_CRITERION * rubric.criteria.len()
    }

    /// Grade one submission against a rubric.
    ///
    /// Always returns a complete outcome; model failures degrade into
    /// synthesized content rather than errors.
    pub async fn grade(
        &self,
        rubric: &Rubric,
        submission: &str,
        metrics: Option<&CodeMetrics>,
        context: Option<&str>,
    ) -> GradingOutcome {
        let run_id = next_run_id();
        let started = Instant::now();

        let BuiltPrompt { text, schema } = self.builder.build(rubric, submission, metrics, context);
        let max_tokens = Self::max_tokens_for(rubric);

        match self.gateway.complete(&text, max_tokens).await {
            Ok(completion) => {
                let attempt = extract::extract(&completion.text);
                if attempt.value.is_none() {
                    warn!(
                        run_id,
                        "No extraction strategy produced structure; synthesizing all fields"
                    );
                }
                let raw = attempt.value.unwrap_or_default();
                let partial = normalize::normalize(raw, &schema);
                let result = synthesize::synthesize(partial, rubric, SynthesisMode::Normal);

                info!(
                    run_id,
                    model = %completion.model,
                    strategy = attempt.strategy.unwrap_or("none"),
                    "Grading run complete"
                );

                GradingOutcome {
                    result,
                    provenance: Provenance {
                        run_id,
                        model: completion.model,
                        degraded: false,
                        strategy: attempt.strategy,
                        attempts: attempt.trace,
                        duration_ms: started.elapsed().as_millis() as u64,
                        graded_at: Utc::now(),
                    },
                }
            }
            Err(error) => {
                warn!(
                    run_id,
                    error = %error,
                    "Model gateway unavailable; entering total fallback synthesis"
                );
                let result = synthesize::synthesize(
                    PartialResult::default(),
                    rubric,
                    SynthesisMode::TotalFallback,
                );

                GradingOutcome {
                    result,
                    provenance: Provenance {
                        run_id,
                        model: self.gateway.model_name().to_string(),
                        degraded: true,
                        strategy: None,
                        attempts: Vec::new(),
                        duration_ms: started.elapsed().as_millis() as u64,
                        graded_at: Utc::now(),
                    },
                }
            }
        }
    }
}
