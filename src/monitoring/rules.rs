// src/monitoring/rules.rs
// Operational alert rules over aggregated metrics

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::domain::errors::{ValidationError, ValidatorResult};
use crate::domain::models::AggregatedMetrics;

type MetricFn = Arc<dyn Fn(&AggregatedMetrics) -> f64 + Send + Sync>;
type PredicateFn = Arc<dyn Fn(&AggregatedMetrics) -> bool + Send + Sync>;

/// A named condition over aggregated metrics
#[derive(Clone)]
pub struct AlertRule {
    pub id: String,
    pub description: String,
    pub threshold_value: f64,
    predicate: PredicateFn,
    actual: MetricFn,
}

impl AlertRule {
    pub fn new(
        id: impl Into<String>,
        description: impl Into<String>,
        threshold_value: f64,
        predicate: impl Fn(&AggregatedMetrics) -> bool + Send + Sync + 'static,
        actual: impl Fn(&AggregatedMetrics) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            threshold_value,
            predicate: Arc::new(predicate),
            actual: Arc::new(actual),
        }
    }

    pub fn evaluate(&self, metrics: &AggregatedMetrics) -> AlertEvaluation {
        AlertEvaluation {
            rule_id: self.id.clone(),
            description: self.description.clone(),
            triggered: (self.predicate)(metrics),
            actual_value: (self.actual)(metrics),
            threshold_value: self.threshold_value,
        }
    }
}

impl fmt::Debug for AlertRule {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AlertRule")
            .field("id", &self.id)
            .field("description", &self.description)
            .field("threshold_value", &self.threshold_value)
            .finish()
    }
}

/// Outcome of one rule against one metrics snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvaluation {
    pub rule_id: String,
    pub description: String,
    pub triggered: bool,
    pub actual_value: f64,
    pub threshold_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighErrorRateRule {
    /// Minimum acceptable success rate, in percent
    pub threshold: f64,
    pub min_samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlowValidationRule {
    pub threshold_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowConfidenceRule {
    pub threshold: f64,
    pub min_samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FatalAlertSpikeRule {
    pub max_fatal_alerts: usize,
}

/// Which operational rules are active, and their thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlertRuleConfig {
    pub high_error_rate: Option<HighErrorRateRule>,
    pub slow_validation: Option<SlowValidationRule>,
    pub low_confidence: Option<LowConfidenceRule>,
    pub fatal_alert_spike: Option<FatalAlertSpikeRule>,
}

impl Default for AlertRuleConfig {
    fn default() -> Self {
        Self {
            high_error_rate: Some(HighErrorRateRule {
                threshold: 50.0,
                min_samples: 5,
            }),
            slow_validation: Some(SlowValidationRule {
                threshold_ms: 15_000.0,
            }),
            low_confidence: Some(LowConfidenceRule {
                threshold: 60.0,
                min_samples: 5,
            }),
            fatal_alert_spike: None,
        }
    }
}

impl AlertRuleConfig {
    /// No rules at all
    pub fn empty() -> Self {
        Self {
            high_error_rate: None,
            slow_validation: None,
            low_confidence: None,
            fatal_alert_spike: None,
        }
    }

    pub fn validate(&self) -> ValidatorResult<()> {
        if let Some(rule) = &self.high_error_rate {
            if !(0.0..=100.0).contains(&rule.threshold) {
                return Err(ValidationError::Configuration(format!(
                    "high-error-rate threshold must be a percentage, got {}",
                    rule.threshold
                )));
            }
        }
        if let Some(rule) = &self.slow_validation {
            if !rule.threshold_ms.is_finite() || rule.threshold_ms <= 0.0 {
                return Err(ValidationError::Configuration(format!(
                    "slow-validation threshold must be positive, got {}",
                    rule.threshold_ms
                )));
            }
        }
        if let Some(rule) = &self.low_confidence {
            if !(0.0..=100.0).contains(&rule.threshold) {
                return Err(ValidationError::Configuration(format!(
                    "low-confidence threshold must be a percentage, got {}",
                    rule.threshold
                )));
            }
        }
        Ok(())
    }

    /// Concrete rules in a fixed order
    pub fn rules(&self) -> Vec<AlertRule> {
        let mut rules = Vec::new();

        if let Some(rule) = self.high_error_rate.clone() {
            let min_samples = rule.min_samples;
            let threshold = rule.threshold;
            rules.push(AlertRule::new(
                "high-error-rate",
                format!(
                    "Success rate below {}% over at least {} validations",
                    threshold, min_samples
                ),
                threshold,
                move |m| m.total_validations >= min_samples && m.success_rate < threshold,
                |m| m.success_rate,
            ));
        }

        if let Some(rule) = self.slow_validation.clone() {
            let threshold_ms = rule.threshold_ms;
            rules.push(AlertRule::new(
                "slow-validation",
                format!("Average validation duration above {}ms", threshold_ms),
                threshold_ms,
                move |m| m.average_duration_ms > threshold_ms,
                |m| m.average_duration_ms,
            ));
        }

        if let Some(rule) = self.low_confidence.clone() {
            let min_samples = rule.min_samples;
            let threshold = rule.threshold;
            rules.push(AlertRule::new(
                "low-confidence",
                format!(
                    "Average confidence below {} over at least {} validations",
                    threshold, min_samples
                ),
                threshold,
                move |m| {
                    m.total_validations >= min_samples
                        && m.average_confidence.map(|c| c < threshold).unwrap_or(false)
                },
                |m| m.average_confidence.unwrap_or(0.0),
            ));
        }

        if let Some(rule) = self.fatal_alert_spike.clone() {
            let max = rule.max_fatal_alerts;
            rules.push(AlertRule::new(
                "fatal-alert-spike",
                format!("More than {} fatal data alerts in the window", max),
                max as f64,
                move |m| m.total_fatal_alerts > max,
                |m| m.total_fatal_alerts as f64,
            ));
        }

        rules
    }
}

/// One evaluation per configured rule. Pure.
pub fn evaluate_alert_rules(metrics: &AggregatedMetrics, config: &AlertRuleConfig) -> Vec<AlertEvaluation> {
    config.rules().iter().map(|rule| rule.evaluate(metrics)).collect()
}
