pub mod extract;
pub mod factory;
pub mod gateway;
pub mod normalize;
pub mod pipeline;
pub mod prompt;
pub mod synthesize;

#[cfg(feature = "anthropic")]
pub mod anthropic_provider;

#[cfg(feature = "openai")]
pub mod openai_provider;

pub use extract::{extract, ExtractionAttempt, JsonStrategy};
pub use factory::GatewayFactory;
pub use gateway::{
    GatewayError, GatewayResult, ModelGateway, RawCompletion, ScriptedGateway, SYSTEM_PROMPT,
};
pub use normalize::{normalize, PartialResult};
pub use pipeline::{GradingOutcome, GradingPipeline, Provenance};
pub use prompt::{BuiltPrompt, ExpectedSchema, PromptBuilder, OVERALL_KEYS};
pub use synthesize::{synthesize, SynthesisMode, MODEL_UNAVAILABLE_NOTICE};
