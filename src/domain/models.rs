// src/domain/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Data domains a validation run can cover
///
/// Declaration order is the schedule order used by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Domain {
    Market,
    Social,
    OnChain,
    News,
}

impl Domain {
    pub const ALL: [Domain; 4] = [Domain::Market, Domain::Social, Domain::OnChain, Domain::News];

    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Market => "market",
            Domain::Social => "social",
            Domain::OnChain => "onChain",
            Domain::News => "news",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Fatal,
}

impl fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AlertSeverity::Warning => write!(f, "WARNING"),
            AlertSeverity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Structured alert raised by a validator or derived from a discrepancy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub severity: AlertSeverity,
    #[serde(rename = "type")]
    pub alert_type: Domain,
    pub message: String,
    pub affected_sources: Vec<String>,
    pub recommendation: String,
}

impl Alert {
    pub fn warning(
        alert_type: Domain,
        message: impl Into<String>,
        affected_sources: Vec<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            severity: AlertSeverity::Warning,
            alert_type,
            message: message.into(),
            affected_sources,
            recommendation: recommendation.into(),
        }
    }

    /// Fatal alerts mark data that contradicts itself, not data that merely disagrees.
    pub fn fatal(
        alert_type: Domain,
        message: impl Into<String>,
        affected_sources: Vec<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            severity: AlertSeverity::Fatal,
            alert_type,
            message: message.into(),
            affected_sources,
            recommendation: recommendation.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == AlertSeverity::Fatal
    }
}

/// One source's value for a metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReading {
    pub name: String,
    pub value: f64,
}

impl SourceReading {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

/// Disagreement between sources reporting the same metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discrepancy {
    pub metric: String,
    pub sources: Vec<SourceReading>,
    /// Percentage spread across sources, in [0, 100]
    pub variance: f64,
    pub threshold: f64,
    pub exceeded: bool,
}

impl Discrepancy {
    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataQualitySummary {
    pub overall_score: f64,
    pub passed_checks: Vec<String>,
    pub failed_checks: Vec<String>,
}

/// Output of a single validator run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    /// Domain confidence in [0, 100]
    pub confidence: f64,
    pub alerts: Vec<Alert>,
    pub discrepancies: Vec<Discrepancy>,
    pub data_quality_summary: DataQualitySummary,
}

impl ValidationResult {
    pub fn fatal_alert_count(&self) -> usize {
        self.alerts.iter().filter(|a| a.is_fatal()).count()
    }

    pub fn has_fatal_alert(&self) -> bool {
        self.alerts.iter().any(Alert::is_fatal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Excellent,
    Good,
    Acceptable,
    Fair,
    Poor,
}

impl ConfidenceLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            ConfidenceLevel::Excellent
        } else if score >= 80.0 {
            ConfidenceLevel::Good
        } else if score >= 70.0 {
            ConfidenceLevel::Acceptable
        } else if score >= 60.0 {
            ConfidenceLevel::Fair
        } else {
            ConfidenceLevel::Poor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::Excellent => "excellent",
            ConfidenceLevel::Good => "good",
            ConfidenceLevel::Acceptable => "acceptable",
            ConfidenceLevel::Fair => "fair",
            ConfidenceLevel::Poor => "poor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainBreakdown {
    pub market: f64,
    pub social: f64,
    pub on_chain: f64,
    pub news: f64,
}

impl DomainBreakdown {
    pub fn get(&self, domain: Domain) -> f64 {
        match domain {
            Domain::Market => self.market,
            Domain::Social => self.social,
            Domain::OnChain => self.on_chain,
            Domain::News => self.news,
        }
    }

    pub fn set(&mut self, domain: Domain, value: f64) {
        match domain {
            Domain::Market => self.market = value,
            Domain::Social => self.social = value,
            Domain::OnChain => self.on_chain = value,
            Domain::News => self.news = value,
        }
    }
}

/// Composite trust measure for one orchestration run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceScore {
    pub overall_score: f64,
    pub data_source_agreement: f64,
    pub logical_consistency: f64,
    pub cross_validation_success: f64,
    pub completeness: f64,
    pub breakdown: DomainBreakdown,
    pub source_weights: BTreeMap<String, f64>,
    pub confidence_level: ConfidenceLevel,
    pub explanation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepStatus {
    Completed,
    Failed,
    TimedOut,
}

/// How a single domain step settled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    pub domain: Domain,
    pub status: StepStatus,
    pub elapsed_ms: u64,
    pub error: Option<String>,
}

/// Everything one orchestration run produced
///
/// Built once per run. Caching is the caller's concern.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationResult {
    pub symbol: String,
    pub success: bool,
    pub completed: bool,
    pub halted: bool,
    pub timed_out: bool,
    pub progress: f64,
    pub current_step: String,
    /// Settled steps in completion order
    pub completed_steps: Vec<String>,
    pub step_reports: Vec<StepReport>,
    pub results: BTreeMap<Domain, ValidationResult>,
    pub alerts: Vec<Alert>,
    pub confidence_score: ConfidenceScore,
    pub data_quality_summary: DataQualitySummary,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration_ms: u64,
    pub errors: Vec<String>,
}

impl OrchestrationResult {
    pub fn fatal_alert_count(&self) -> usize {
        self.alerts.iter().filter(|a| a.is_fatal()).count()
    }
}

/// One past orchestration run, as kept by the monitoring store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationMetricRecord {
    pub timestamp: DateTime<Utc>,
    pub symbol: String,
    pub validation_type: String,
    pub success: bool,
    pub duration_ms: u64,
    pub confidence_score: Option<f64>,
    pub alert_count: usize,
    pub fatal_alert_count: usize,
    pub error_type: Option<String>,
}

impl ValidationMetricRecord {
    /// Summarize a finished run
    pub fn from_orchestration(result: &OrchestrationResult) -> Self {
        let error_type = if result.timed_out {
            Some("global_deadline_exceeded".to_string())
        } else if result.halted {
            Some("fatal_data".to_string())
        } else if result
            .step_reports
            .iter()
            .any(|r| r.status == StepStatus::TimedOut)
        {
            Some("validator_timeout".to_string())
        } else if !result.errors.is_empty() {
            Some("validator_error".to_string())
        } else {
            None
        };

        Self {
            timestamp: result.end_time,
            symbol: result.symbol.clone(),
            validation_type: "orchestration".to_string(),
            success: result.success,
            duration_ms: result.duration_ms,
            confidence_score: Some(result.confidence_score.overall_score),
            alert_count: result.alerts.len(),
            fatal_alert_count: result.fatal_alert_count(),
            error_type,
        }
    }
}

/// Rolling-window health statistics
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedMetrics {
    pub total_validations: usize,
    pub successful_validations: usize,
    pub success_rate: f64,
    pub average_duration_ms: f64,
    pub error_breakdown: BTreeMap<String, usize>,
    pub average_confidence: Option<f64>,
    pub total_alerts: usize,
    pub total_fatal_alerts: usize,
}
