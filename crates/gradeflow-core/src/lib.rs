pub mod config;
pub mod error;
pub mod ids;
pub mod rubric;
pub mod types;

pub use config::{AnalysisConfig, ConfigError, GatewayConfig, GradeFlowConfig};
pub use error::{GradeFlowError, Result};
pub use ids::next_run_id;
pub use rubric::sample_cs_rubric;
pub use types::{
    CodeMetrics, Criterion, ExtractionResult, OverallAssessment, Rubric, Scale, ScoreValue,
    NOT_APPLICABLE,
};
