// src/validation/confidence.rs
// Folds per-domain validation results into one confidence score

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::errors::{ValidationError, ValidatorResult};
use crate::domain::models::{
    ConfidenceLevel, ConfidenceScore, Domain, DomainBreakdown, ValidationResult,
};
use crate::domain::service::ReliabilityTracker;

/// Consistency points lost per fatal alert
const FATAL_ALERT_PENALTY: f64 = 50.0;
/// Completeness points per present domain
const COMPLETENESS_PER_DOMAIN: f64 = 25.0;
/// Agreement points lost per unit of confidence standard deviation
const AGREEMENT_STDDEV_FACTOR: f64 = 2.0;
/// Agreement points lost per exceeded discrepancy, multi-domain runs only
const AGREEMENT_DISCREPANCY_PENALTY: f64 = 5.0;

const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Component weights of the overall score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoreWeights {
    agreement: f64,
    consistency: f64,
    cross_validation: f64,
    completeness: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            agreement: 0.4,
            consistency: 0.3,
            cross_validation: 0.2,
            completeness: 0.1,
        }
    }
}

impl ScoreWeights {
    /// Weights must each be in [0, 1] and sum to 1.0
    pub fn new(
        agreement: f64,
        consistency: f64,
        cross_validation: f64,
        completeness: f64,
    ) -> ValidatorResult<Self> {
        let weights = Self {
            agreement,
            consistency,
            cross_validation,
            completeness,
        };
        weights.validate()?;
        Ok(weights)
    }

    pub fn validate(&self) -> ValidatorResult<()> {
        let all = [
            self.agreement,
            self.consistency,
            self.cross_validation,
            self.completeness,
        ];

        if all.iter().any(|w| !w.is_finite() || *w < 0.0 || *w > 1.0) {
            return Err(ValidationError::Configuration(format!(
                "score weights must be within [0, 1]: {:?}",
                all
            )));
        }

        let sum: f64 = all.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ValidationError::Configuration(format!(
                "score weights must sum to 1.0, got {}",
                sum
            )));
        }

        Ok(())
    }

    pub fn agreement(&self) -> f64 {
        self.agreement
    }

    pub fn consistency(&self) -> f64 {
        self.consistency
    }

    pub fn cross_validation(&self) -> f64 {
        self.cross_validation
    }

    pub fn completeness(&self) -> f64 {
        self.completeness
    }
}

/// Score calculator with validated weights
#[derive(Debug, Clone, Default)]
pub struct ConfidenceScoreCalculator {
    weights: ScoreWeights,
}

impl ConfidenceScoreCalculator {
    pub fn new(weights: ScoreWeights) -> ValidatorResult<Self> {
        weights.validate()?;
        Ok(Self { weights })
    }

    pub fn weights(&self) -> &ScoreWeights {
        &self.weights
    }

    /// Pure and deterministic; missing domains contribute zero.
    pub fn calculate(
        &self,
        results: &BTreeMap<Domain, ValidationResult>,
        tracker: Option<&dyn ReliabilityTracker>,
    ) -> ConfidenceScore {
        let completeness = completeness(results);
        let logical_consistency = logical_consistency(results);
        let cross_validation_success = cross_validation_success(results);
        let data_source_agreement = data_source_agreement(results);

        let weighted = self.weights.agreement * data_source_agreement
            + self.weights.consistency * logical_consistency
            + self.weights.cross_validation * cross_validation_success
            + self.weights.completeness * completeness;
        let overall_score = clamp_score(weighted.round());

        let mut breakdown = DomainBreakdown::default();
        for domain in Domain::ALL {
            let confidence = results.get(&domain).map(|r| clamp_score(r.confidence)).unwrap_or(0.0);
            breakdown.set(domain, confidence);
        }

        let confidence_level = ConfidenceLevel::from_score(overall_score);
        let explanation = format!(
            "Overall confidence {:.0}/100 ({}): source agreement {:.1}, logical consistency {:.1}, \
             cross-validation {:.1}, completeness {:.0} ({} of 4 domains).",
            overall_score,
            confidence_level.as_str(),
            data_source_agreement,
            logical_consistency,
            cross_validation_success,
            completeness,
            results.len(),
        );

        ConfidenceScore {
            overall_score,
            data_source_agreement,
            logical_consistency,
            cross_validation_success,
            completeness,
            breakdown,
            source_weights: source_weights(results, tracker),
            confidence_level,
            explanation,
        }
    }
}

/// Score results with the default 0.4 / 0.3 / 0.2 / 0.1 weights
pub fn calculate_veritas_confidence_score(
    results: &BTreeMap<Domain, ValidationResult>,
    tracker: Option<&dyn ReliabilityTracker>,
) -> ConfidenceScore {
    ConfidenceScoreCalculator::default().calculate(results, tracker)
}

fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

fn completeness(results: &BTreeMap<Domain, ValidationResult>) -> f64 {
    clamp_score(COMPLETENESS_PER_DOMAIN * results.len() as f64)
}

fn logical_consistency(results: &BTreeMap<Domain, ValidationResult>) -> f64 {
    let fatal: usize = results.values().map(ValidationResult::fatal_alert_count).sum();
    clamp_score(100.0 - FATAL_ALERT_PENALTY * fatal as f64)
}

/// Zero with no domains; 100 when domains are present but report no checks.
fn cross_validation_success(results: &BTreeMap<Domain, ValidationResult>) -> f64 {
    if results.is_empty() {
        return 0.0;
    }

    let (passed, failed) = results.values().fold((0usize, 0usize), |(p, f), r| {
        (
            p + r.data_quality_summary.passed_checks.len(),
            f + r.data_quality_summary.failed_checks.len(),
        )
    });

    if passed + failed == 0 {
        return 100.0;
    }
    clamp_score(passed as f64 / (passed + failed) as f64 * 100.0)
}

/// Zero with no domains, 100 with a single one, otherwise decreasing in the
/// spread of domain confidences.
fn data_source_agreement(results: &BTreeMap<Domain, ValidationResult>) -> f64 {
    match results.len() {
        0 => 0.0,
        1 => 100.0,
        n => {
            let confidences: Vec<f64> = results.values().map(|r| clamp_score(r.confidence)).collect();
            let mean = confidences.iter().sum::<f64>() / n as f64;
            let variance = confidences.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / n as f64;
            let std_dev = variance.sqrt();

            let exceeded = results
                .values()
                .flat_map(|r| r.discrepancies.iter())
                .filter(|d| d.exceeded)
                .count();

            clamp_score(
                100.0
                    - AGREEMENT_STDDEV_FACTOR * std_dev
                    - AGREEMENT_DISCREPANCY_PENALTY * exceeded as f64,
            )
        }
    }
}

fn source_weights(
    results: &BTreeMap<Domain, ValidationResult>,
    tracker: Option<&dyn ReliabilityTracker>,
) -> BTreeMap<String, f64> {
    let mut weights = BTreeMap::new();
    let tracker = match tracker {
        Some(tracker) => tracker,
        None => return weights,
    };

    for discrepancy in results.values().flat_map(|r| r.discrepancies.iter()) {
        for source in &discrepancy.sources {
            weights.entry(source.name.clone()).or_insert_with(|| {
                let weight = tracker.weight_for(&source.name);
                if weight.is_finite() {
                    weight.clamp(0.0, 1.0)
                } else {
                    0.0
                }
            });
        }
    }

    weights
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Alert, DataQualitySummary, Discrepancy, SourceReading};

    fn result(confidence: f64, fatal: usize, passed: usize, failed: usize) -> ValidationResult {
        ValidationResult {
            is_valid: fatal == 0,
            confidence,
            alerts: (0..fatal)
                .map(|i| Alert::fatal(Domain::Market, format!("fatal {}", i), vec![], "discard"))
                .collect(),
            discrepancies: Vec::new(),
            data_quality_summary: DataQualitySummary {
                overall_score: confidence,
                passed_checks: (0..passed).map(|i| format!("pass-{}", i)).collect(),
                failed_checks: (0..failed).map(|i| format!("fail-{}", i)).collect(),
            },
        }
    }

    fn with_confidences(confidences: &[f64]) -> BTreeMap<Domain, ValidationResult> {
        Domain::ALL
            .iter()
            .zip(confidences)
            .map(|(d, c)| (*d, result(*c, 0, 1, 0)))
            .collect()
    }

    struct FixedTracker;

    impl ReliabilityTracker for FixedTracker {
        fn weight_for(&self, source: &str) -> f64 {
            match source {
                "coingecko" => 0.9,
                "shady" => 7.0,
                _ => 0.5,
            }
        }
    }

    #[test]
    fn empty_results_score_thirty() {
        let score = calculate_veritas_confidence_score(&BTreeMap::new(), None);
        assert_eq!(score.overall_score, 30.0);
        assert_eq!(score.data_source_agreement, 0.0);
        assert_eq!(score.logical_consistency, 100.0);
        assert_eq!(score.cross_validation_success, 0.0);
        assert_eq!(score.completeness, 0.0);
        assert_eq!(score.confidence_level, ConfidenceLevel::Poor);
        assert!(!score.explanation.is_empty());
    }

    #[test]
    fn perfect_results_score_one_hundred() {
        let score = calculate_veritas_confidence_score(&with_confidences(&[100.0; 4]), None);
        assert_eq!(score.overall_score, 100.0);
        assert_eq!(score.confidence_level, ConfidenceLevel::Excellent);
        assert_eq!(score.breakdown.news, 100.0);
    }

    #[test]
    fn consistency_drops_fifty_per_fatal_alert() {
        for (fatal, expected) in [(0, 100.0), (1, 50.0), (2, 0.0), (8, 0.0)] {
            let mut results = BTreeMap::new();
            results.insert(Domain::Social, result(80.0, fatal, 1, 0));
            let score = calculate_veritas_confidence_score(&results, None);
            assert_eq!(score.logical_consistency, expected, "fatal = {}", fatal);
        }
    }

    #[test]
    fn completeness_counts_domains() {
        for n in 0..=4 {
            let confidences = vec![70.0; n];
            let score = calculate_veritas_confidence_score(&with_confidences(&confidences), None);
            assert_eq!(score.completeness, 25.0 * n as f64);
        }
    }

    #[test]
    fn cross_validation_ratio() {
        let mut results = BTreeMap::new();
        results.insert(Domain::Market, result(50.0, 0, 3, 3));
        assert_eq!(calculate_veritas_confidence_score(&results, None).cross_validation_success, 50.0);

        results.insert(Domain::Market, result(50.0, 0, 0, 0));
        assert_eq!(calculate_veritas_confidence_score(&results, None).cross_validation_success, 100.0);
    }

    #[test]
    fn agreement_tracks_confidence_spread() {
        let single = calculate_veritas_confidence_score(&with_confidences(&[42.0]), None);
        assert_eq!(single.data_source_agreement, 100.0);

        let identical = calculate_veritas_confidence_score(&with_confidences(&[60.0; 4]), None);
        assert_eq!(identical.data_source_agreement, 100.0);

        let wide = calculate_veritas_confidence_score(&with_confidences(&[100.0, 20.0, 90.0, 30.0]), None);
        assert!(wide.data_source_agreement < 70.0);

        let tight = calculate_veritas_confidence_score(&with_confidences(&[92.0, 90.0, 91.0, 93.0]), None);
        assert!(tight.data_source_agreement > 90.0);
    }

    #[test]
    fn exceeded_discrepancies_depress_agreement() {
        let mut results = with_confidences(&[80.0, 80.0]);
        let baseline = calculate_veritas_confidence_score(&results, None).data_source_agreement;

        if let Some(market) = results.get_mut(&Domain::Market) {
            market.discrepancies.push(Discrepancy {
                metric: "price".to_string(),
                sources: vec![SourceReading::new("a", 100.0), SourceReading::new("b", 110.0)],
                variance: 9.5,
                threshold: 1.5,
                exceeded: true,
            });
        }
        let depressed = calculate_veritas_confidence_score(&results, None).data_source_agreement;
        assert!(depressed < baseline);
    }

    #[test]
    fn overall_score_is_always_bounded() {
        let mut results = BTreeMap::new();
        results.insert(Domain::Market, result(250.0, 0, 5, 0));
        results.insert(Domain::News, result(-40.0, 9, 0, 5));
        let score = calculate_veritas_confidence_score(&results, None);
        assert!((0.0..=100.0).contains(&score.overall_score));
        assert_eq!(score.breakdown.market, 100.0);
        assert_eq!(score.breakdown.news, 0.0);
        assert_eq!(score.breakdown.social, 0.0);
    }

    #[test]
    fn source_weights_need_a_tracker() {
        let mut results = with_confidences(&[90.0]);
        if let Some(market) = results.get_mut(&Domain::Market) {
            market.discrepancies.push(Discrepancy {
                metric: "price".to_string(),
                sources: vec![
                    SourceReading::new("coingecko", 100.0),
                    SourceReading::new("shady", 101.0),
                ],
                variance: 1.0,
                threshold: 1.5,
                exceeded: false,
            });
        }

        assert!(calculate_veritas_confidence_score(&results, None).source_weights.is_empty());

        let weights = calculate_veritas_confidence_score(&results, Some(&FixedTracker)).source_weights;
        assert_eq!(weights.len(), 2);
        assert_eq!(weights["coingecko"], 0.9);
        assert_eq!(weights["shady"], 1.0);
    }

    #[test]
    fn custom_weights_must_sum_to_one() {
        assert!(ScoreWeights::new(0.25, 0.25, 0.25, 0.25).is_ok());
        assert!(matches!(
            ScoreWeights::new(0.5, 0.3, 0.2, 0.1),
            Err(ValidationError::Configuration(_))
        ));
        assert!(ScoreWeights::new(1.2, -0.2, 0.0, 0.0).is_err());

        let calculator = ConfidenceScoreCalculator::new(ScoreWeights::new(0.0, 1.0, 0.0, 0.0).unwrap()).unwrap();
        let score = calculator.calculate(&BTreeMap::new(), None);
        assert_eq!(score.overall_score, 100.0);
    }

    #[test]
    fn level_thresholds() {
        assert_eq!(ConfidenceLevel::from_score(90.0), ConfidenceLevel::Excellent);
        assert_eq!(ConfidenceLevel::from_score(85.0), ConfidenceLevel::Good);
        assert_eq!(ConfidenceLevel::from_score(70.0), ConfidenceLevel::Acceptable);
        assert_eq!(ConfidenceLevel::from_score(60.0), ConfidenceLevel::Fair);
        assert_eq!(ConfidenceLevel::from_score(59.0), ConfidenceLevel::Poor);
    }
}
