pub mod alerts;
pub mod confidence;
pub mod discrepancy;
pub mod orchestrator;

pub use alerts::{discrepancy_alert, generate_alerts};
pub use confidence::{calculate_veritas_confidence_score, ConfidenceScoreCalculator, ScoreWeights};
pub use discrepancy::{detect_discrepancy, percentage_spread, DiscrepancyThresholds};
pub use orchestrator::{
    orchestrate_validation, CancellationFlag, LateAlert, LateFatalPolicy, OrchestratorConfig,
    RunState, ValidationOrchestrator,
};
