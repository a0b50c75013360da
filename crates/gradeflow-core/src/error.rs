use thiserror::Error;

#[derive(Error, Debug)]
pub enum GradeFlowError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid rubric: {0}")]
    InvalidRubric(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, GradeFlowError>;
