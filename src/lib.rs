// src/lib.rs
// Main library module declarations

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod monitoring;
pub mod validation;

pub use config::{is_veritas_enabled, Config};
pub use domain::errors::{AppError, AppResult, ValidationError, ValidatorResult};
pub use validation::{calculate_veritas_confidence_score, orchestrate_validation, ValidationOrchestrator};
