// src/infrastructure/validators/social.rs
use async_trait::async_trait;

use super::ResultBuilder;
use crate::domain::errors::{ValidationError, ValidatorResult};
use crate::domain::inputs::{DomainInput, SocialInput};
use crate::domain::models::{Alert, Domain, SourceReading, ValidationResult};
use crate::domain::service::Validator;
use crate::validation::discrepancy::{detect_discrepancy, DiscrepancyThresholds};

const SENTIMENT_BOUND: f64 = 100.0;

/// Compares mention counts and sentiment across social data providers
pub struct SocialValidator {
    mentions_threshold: f64,
    sentiment_threshold: f64,
}

impl SocialValidator {
    pub fn new(thresholds: &DiscrepancyThresholds) -> Self {
        Self {
            mentions_threshold: thresholds.mentions,
            sentiment_threshold: thresholds.sentiment,
        }
    }

    fn check(&self, symbol: &str, input: &SocialInput) -> ValidationResult {
        let mut builder = ResultBuilder::new();

        if !builder.check("social_data_available", !input.readings.is_empty()) {
            builder.warn(Alert::warning(
                Domain::Social,
                format!("No social readings for {}", symbol),
                Vec::new(),
                "Verify social data providers are reachable",
            ));
        }

        // no activity cannot carry an opinion
        let contradictory: Vec<String> = input
            .readings
            .iter()
            .filter(|r| r.mentions == 0 && r.sentiment != 0.0)
            .map(|r| r.source.clone())
            .collect();
        if contradictory.is_empty() {
            builder.check("activity_consistency", true);
        } else {
            builder.fatal(
                "activity_consistency",
                Alert::fatal(
                    Domain::Social,
                    format!("Zero mentions of {} reported with non-zero sentiment", symbol),
                    contradictory,
                    "Discard sentiment from these sources",
                ),
            );
        }

        let out_of_range: Vec<String> = input
            .readings
            .iter()
            .filter(|r| !r.sentiment.is_finite() || r.sentiment.abs() > SENTIMENT_BOUND)
            .map(|r| r.source.clone())
            .collect();
        if !builder.check("sentiment_range", out_of_range.is_empty()) {
            builder.warn(Alert::warning(
                Domain::Social,
                format!("Sentiment outside [-100, 100] for {}", symbol),
                out_of_range,
                "Check provider sentiment scaling",
            ));
        }

        let mentions: Vec<SourceReading> = input
            .readings
            .iter()
            .map(|r| SourceReading::new(r.source.clone(), r.mentions as f64))
            .collect();
        builder.discrepancy(
            "mention_agreement",
            detect_discrepancy("mentions", &mentions, self.mentions_threshold),
        );

        // compare on a 0..100 scale so the spread ratio stays meaningful
        let sentiment: Vec<SourceReading> = input
            .readings
            .iter()
            .filter(|r| r.mentions > 0)
            .map(|r| {
                let normalized = (r.sentiment.clamp(-SENTIMENT_BOUND, SENTIMENT_BOUND) + SENTIMENT_BOUND) / 2.0;
                SourceReading::new(r.source.clone(), normalized)
            })
            .collect();
        builder.discrepancy(
            "sentiment_agreement",
            detect_discrepancy("sentiment", &sentiment, self.sentiment_threshold),
        );

        builder.build()
    }
}

#[async_trait]
impl Validator for SocialValidator {
    fn domain(&self) -> Domain {
        Domain::Social
    }

    async fn validate(&self, symbol: &str, input: &DomainInput) -> ValidatorResult<ValidationResult> {
        match input {
            DomainInput::Social(social) => Ok(self.check(symbol, social)),
            other => Err(ValidationError::InvalidInput(format!(
                "social validator received {} input",
                other.domain()
            ))),
        }
    }
}
