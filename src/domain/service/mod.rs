// src/domain/service/mod.rs
// Domain service interfaces

use async_trait::async_trait;

use crate::domain::errors::ValidatorResult;
use crate::domain::inputs::DomainInput;
use crate::domain::models::{Domain, ValidationResult};

/// Validates one domain's already-fetched data.
///
/// Known bad data resolves to `Ok` with `is_valid == false`. An `Err` (or a
/// panic) is caught by the orchestrator and recorded as a failed step.
/// Implementations must not mutate shared state.
#[async_trait]
pub trait Validator: Send + Sync {
    /// Domain this validator handles
    fn domain(&self) -> Domain;

    /// Validate the input for `symbol`
    async fn validate(&self, symbol: &str, input: &DomainInput) -> ValidatorResult<ValidationResult>;
}

/// Dynamic per-source trust, consulted when building `source_weights`.
pub trait ReliabilityTracker: Send + Sync {
    /// Weight in [0, 1] for a source name
    fn weight_for(&self, source: &str) -> f64;
}
