// src/infrastructure/validators/mod.rs
// Reference validators for the four data domains

mod market;
mod news;
mod onchain;
mod social;

pub use market::MarketValidator;
pub use news::NewsValidator;
pub use onchain::OnChainValidator;
pub use social::SocialValidator;

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::models::{
    Alert, DataQualitySummary, Discrepancy, Domain, ValidationResult,
};
use crate::domain::service::Validator;
use crate::validation::discrepancy::DiscrepancyThresholds;

/// Confidence below which a result is reported invalid
const MIN_VALID_CONFIDENCE: f64 = 50.0;
const FAILED_CHECK_PENALTY: f64 = 10.0;
const FATAL_PENALTY: f64 = 50.0;
const MAX_DISCREPANCY_PENALTY: f64 = 30.0;

/// Registered validators, at most one per domain
#[derive(Clone, Default)]
pub struct ValidatorSet {
    validators: HashMap<Domain, Arc<dyn Validator>>,
}

impl ValidatorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// All four reference validators
    pub fn standard(thresholds: &DiscrepancyThresholds) -> Self {
        Self::new()
            .with_validator(Arc::new(MarketValidator::new(thresholds)))
            .with_validator(Arc::new(SocialValidator::new(thresholds)))
            .with_validator(Arc::new(OnChainValidator::new(thresholds)))
            .with_validator(Arc::new(NewsValidator::new(thresholds)))
    }

    /// Register a validator, replacing any previous one for its domain
    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validators.insert(validator.domain(), validator);
        self
    }

    pub fn get(&self, domain: Domain) -> Option<Arc<dyn Validator>> {
        self.validators.get(&domain).cloned()
    }

    pub fn domains(&self) -> Vec<Domain> {
        let mut domains: Vec<Domain> = self.validators.keys().copied().collect();
        domains.sort();
        domains
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

/// Accumulates checks for one validator run
pub(crate) struct ResultBuilder {
    passed: Vec<String>,
    failed: Vec<String>,
    alerts: Vec<Alert>,
    discrepancies: Vec<Discrepancy>,
    penalty: f64,
}

impl ResultBuilder {
    pub(crate) fn new() -> Self {
        Self {
            passed: Vec::new(),
            failed: Vec::new(),
            alerts: Vec::new(),
            discrepancies: Vec::new(),
            penalty: 0.0,
        }
    }

    pub(crate) fn check(&mut self, name: &str, ok: bool) -> bool {
        if ok {
            self.passed.push(name.to_string());
        } else {
            self.failed.push(name.to_string());
            self.penalty += FAILED_CHECK_PENALTY;
        }
        ok
    }

    /// Record a cross-source comparison; skipped when fewer than two sources reported.
    pub(crate) fn discrepancy(&mut self, check: &str, discrepancy: Option<Discrepancy>) {
        let discrepancy = match discrepancy {
            Some(d) => d,
            None => return,
        };

        if discrepancy.exceeded {
            self.failed.push(check.to_string());
            let ratio = discrepancy.variance / discrepancy.threshold;
            self.penalty += (FAILED_CHECK_PENALTY * ratio).min(MAX_DISCREPANCY_PENALTY);
        } else {
            self.passed.push(check.to_string());
        }
        self.discrepancies.push(discrepancy);
    }

    /// Logical impossibility: fails `check` and raises a fatal alert
    pub(crate) fn fatal(&mut self, check: &str, alert: Alert) {
        log::warn!("{} fatal data condition: {}", alert.alert_type, alert.message);
        self.failed.push(check.to_string());
        self.alerts.push(alert);
        self.penalty += FATAL_PENALTY;
    }

    pub(crate) fn warn(&mut self, alert: Alert) {
        self.alerts.push(alert);
    }

    pub(crate) fn build(self) -> ValidationResult {
        let confidence = (100.0 - self.penalty).clamp(0.0, 100.0);
        let has_fatal = self.alerts.iter().any(Alert::is_fatal);
        let total = self.passed.len() + self.failed.len();
        let overall_score = if total == 0 {
            100.0
        } else {
            self.passed.len() as f64 / total as f64 * 100.0
        };

        ValidationResult {
            is_valid: !has_fatal && confidence >= MIN_VALID_CONFIDENCE,
            confidence,
            alerts: self.alerts,
            discrepancies: self.discrepancies,
            data_quality_summary: DataQualitySummary {
                overall_score,
                passed_checks: self.passed,
                failed_checks: self.failed,
            },
        }
    }
}
