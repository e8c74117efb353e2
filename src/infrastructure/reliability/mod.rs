// src/infrastructure/reliability/mod.rs
// Dynamic source reliability from observed agreement

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::domain::errors::{ValidationError, ValidatorResult};
use crate::domain::models::{Discrepancy, ValidationResult};
use crate::domain::service::ReliabilityTracker;

/// Weight of a source that has been seen but has no history yet
pub const INITIAL_WEIGHT: f64 = 0.5;
const DEFAULT_SMOOTHING: f64 = 0.2;

/// Exponential moving average of how often each source agrees with its peers
pub struct SourceReliabilityTracker {
    weights: Arc<Mutex<HashMap<String, f64>>>,
    smoothing: f64,
}

impl SourceReliabilityTracker {
    pub fn new() -> Self {
        Self {
            weights: Arc::new(Mutex::new(HashMap::new())),
            smoothing: DEFAULT_SMOOTHING,
        }
    }

    /// `smoothing` is the weight of the newest outcome, in (0, 1]
    pub fn with_smoothing(smoothing: f64) -> ValidatorResult<Self> {
        if !smoothing.is_finite() || smoothing <= 0.0 || smoothing > 1.0 {
            return Err(ValidationError::Configuration(format!(
                "reliability smoothing must be in (0, 1], got {}",
                smoothing
            )));
        }

        Ok(Self {
            weights: Arc::new(Mutex::new(HashMap::new())),
            smoothing,
        })
    }

    /// Fold one agreement outcome into a source's weight
    pub fn record_outcome(&self, source: &str, agreed: bool) {
        let target = if agreed { 1.0 } else { 0.0 };
        let mut weights = self.weights.lock().unwrap_or_else(|e| e.into_inner());
        let weight = weights.entry(source.to_string()).or_insert(INITIAL_WEIGHT);
        *weight += self.smoothing * (target - *weight);
    }

    /// Update weights from every discrepancy of a validation result.
    ///
    /// Within limits every source agrees. Past the threshold, the sources
    /// farthest from the median are marked as disagreeing.
    pub fn observe(&self, result: &ValidationResult) {
        for discrepancy in &result.discrepancies {
            self.observe_discrepancy(discrepancy);
        }
    }

    fn observe_discrepancy(&self, discrepancy: &Discrepancy) {
        if !discrepancy.exceeded {
            for source in &discrepancy.sources {
                self.record_outcome(&source.name, true);
            }
            return;
        }

        let median = median(discrepancy.sources.iter().map(|s| s.value).collect());
        let deviations: Vec<f64> = discrepancy
            .sources
            .iter()
            .map(|s| (s.value - median).abs())
            .collect();
        let worst = deviations.iter().copied().fold(0.0_f64, f64::max);

        for (source, deviation) in discrepancy.sources.iter().zip(deviations) {
            let outlier = worst > 0.0 && deviation >= worst;
            self.record_outcome(&source.name, !outlier);
        }
    }

    pub fn known_sources(&self) -> Vec<String> {
        let weights = self.weights.lock().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = weights.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn reset(&self) {
        self.weights.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl Default for SourceReliabilityTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ReliabilityTracker for SourceReliabilityTracker {
    fn weight_for(&self, source: &str) -> f64 {
        let weights = self.weights.lock().unwrap_or_else(|e| e.into_inner());
        weights.get(source).copied().unwrap_or(INITIAL_WEIGHT).clamp(0.0, 1.0)
    }
}

fn median(mut values: Vec<f64>) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{DataQualitySummary, SourceReading};

    fn result_with(discrepancy: Discrepancy) -> ValidationResult {
        ValidationResult {
            is_valid: true,
            confidence: 90.0,
            alerts: Vec::new(),
            discrepancies: vec![discrepancy],
            data_quality_summary: DataQualitySummary::default(),
        }
    }

    #[test]
    fn unseen_sources_start_neutral() {
        let tracker = SourceReliabilityTracker::new();
        assert_eq!(tracker.weight_for("kraken"), INITIAL_WEIGHT);
    }

    #[test]
    fn agreement_raises_and_disagreement_lowers() {
        let tracker = SourceReliabilityTracker::new();
        tracker.record_outcome("good", true);
        tracker.record_outcome("bad", false);
        assert!(tracker.weight_for("good") > INITIAL_WEIGHT);
        assert!(tracker.weight_for("bad") < INITIAL_WEIGHT);
        assert_eq!(tracker.known_sources(), vec!["bad", "good"]);
    }

    #[test]
    fn outliers_lose_weight() {
        let tracker = SourceReliabilityTracker::new();
        tracker.observe(&result_with(Discrepancy {
            metric: "price".to_string(),
            sources: vec![
                SourceReading::new("coingecko", 100.0),
                SourceReading::new("coinmarketcap", 100.2),
                SourceReading::new("stale", 108.0),
            ],
            variance: 7.8,
            threshold: 1.5,
            exceeded: true,
        }));

        assert!(tracker.weight_for("stale") < INITIAL_WEIGHT);
        assert!(tracker.weight_for("coingecko") > INITIAL_WEIGHT);
        assert!(tracker.weight_for("coinmarketcap") > INITIAL_WEIGHT);
    }

    #[test]
    fn smoothing_is_validated() {
        assert!(SourceReliabilityTracker::with_smoothing(0.0).is_err());
        assert!(SourceReliabilityTracker::with_smoothing(1.0).is_ok());
    }
}
