// src/domain/errors.rs
use crate::domain::models::Domain;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure taxonomy of a validation run.
///
/// Everything except `Configuration` is converted into data by the
/// orchestrator and ends up in `OrchestrationResult::errors`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("{domain} validator timed out after {timeout_ms}ms")]
    ValidatorTimeout { domain: Domain, timeout_ms: u64 },

    #[error("Validator error: {0}")]
    Validator(String),

    #[error("Fatal data error: {0}")]
    FatalData(String),

    #[error("Global deadline of {deadline_ms}ms exceeded")]
    GlobalDeadlineExceeded { deadline_ms: u64 },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl ValidationError {
    /// Short machine-friendly tag, used as the `error_type` of monitoring records.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationError::ValidatorTimeout { .. } => "validator_timeout",
            ValidationError::Validator(_) => "validator_error",
            ValidationError::FatalData(_) => "fatal_data",
            ValidationError::GlobalDeadlineExceeded { .. } => "global_deadline_exceeded",
            ValidationError::Configuration(_) => "configuration",
            ValidationError::InvalidInput(_) => "invalid_input",
        }
    }
}

// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
pub type ValidatorResult<T> = Result<T, ValidationError>;
