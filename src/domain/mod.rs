pub mod errors;
pub mod inputs;
pub mod models;
pub mod service;

// Re-export common types for convenience
pub use errors::{AppError, AppResult, ValidationError, ValidatorResult};
pub use inputs::{
    DomainInput, DomainInputs, MarketInput, NewsArticle, NewsInput, OnChainInput, SocialInput,
    SocialReading,
};
pub use models::{
    AggregatedMetrics, Alert, AlertSeverity, ConfidenceLevel, ConfidenceScore, DataQualitySummary,
    Discrepancy, Domain, DomainBreakdown, OrchestrationResult, SourceReading, StepReport,
    StepStatus, ValidationMetricRecord, ValidationResult,
};
pub use service::{ReliabilityTracker, Validator};
