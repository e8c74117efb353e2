// src/infrastructure/validators/market.rs
use async_trait::async_trait;

use super::ResultBuilder;
use crate::domain::errors::{ValidationError, ValidatorResult};
use crate::domain::inputs::{DomainInput, MarketInput};
use crate::domain::models::{Alert, Domain, SourceReading, ValidationResult};
use crate::domain::service::Validator;
use crate::validation::discrepancy::{detect_discrepancy, DiscrepancyThresholds};

/// Cross-checks price, volume and market cap across price providers
pub struct MarketValidator {
    price_threshold: f64,
    volume_threshold: f64,
    market_cap_threshold: f64,
}

impl MarketValidator {
    pub fn new(thresholds: &DiscrepancyThresholds) -> Self {
        Self {
            price_threshold: thresholds.price,
            volume_threshold: thresholds.volume,
            market_cap_threshold: thresholds.market_cap,
        }
    }

    fn check(&self, symbol: &str, input: &MarketInput) -> ValidationResult {
        let mut builder = ResultBuilder::new();

        if !builder.check("price_available", !input.price_readings.is_empty()) {
            builder.warn(Alert::warning(
                Domain::Market,
                format!("No price readings for {}", symbol),
                Vec::new(),
                "Verify market data providers are reachable",
            ));
        }

        let bad_prices = sources_where(&input.price_readings, |v| v.is_nan() || v <= 0.0);
        if bad_prices.is_empty() {
            builder.check("price_positive", true);
        } else {
            builder.fatal(
                "price_positive",
                Alert::fatal(
                    Domain::Market,
                    format!("Non-positive price reported for {}", symbol),
                    bad_prices,
                    "Discard market data from these sources",
                ),
            );
        }

        let bad_volumes = sources_where(&input.volume_readings, |v| v < 0.0);
        if bad_volumes.is_empty() {
            builder.check("volume_non_negative", true);
        } else {
            builder.fatal(
                "volume_non_negative",
                Alert::fatal(
                    Domain::Market,
                    format!("Negative trading volume reported for {}", symbol),
                    bad_volumes,
                    "Discard volume data from these sources",
                ),
            );
        }

        builder.discrepancy(
            "price_agreement",
            detect_discrepancy("price", &input.price_readings, self.price_threshold),
        );
        builder.discrepancy(
            "volume_agreement",
            detect_discrepancy("volume", &input.volume_readings, self.volume_threshold),
        );
        builder.discrepancy(
            "market_cap_agreement",
            detect_discrepancy("market_cap", &input.market_cap_readings, self.market_cap_threshold),
        );

        builder.build()
    }
}

/// Names of sources whose value matches `predicate`
pub(crate) fn sources_where(readings: &[SourceReading], predicate: impl Fn(f64) -> bool) -> Vec<String> {
    readings
        .iter()
        .filter(|r| predicate(r.value))
        .map(|r| r.name.clone())
        .collect()
}

#[async_trait]
impl Validator for MarketValidator {
    fn domain(&self) -> Domain {
        Domain::Market
    }

    async fn validate(&self, symbol: &str, input: &DomainInput) -> ValidatorResult<ValidationResult> {
        match input {
            DomainInput::Market(market) => Ok(self.check(symbol, market)),
            other => Err(ValidationError::InvalidInput(format!(
                "market validator received {} input",
                other.domain()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn readings(values: &[(&str, f64)]) -> Vec<SourceReading> {
        values.iter().map(|(n, v)| SourceReading::new(*n, *v)).collect()
    }

    fn validator() -> MarketValidator {
        MarketValidator::new(&DiscrepancyThresholds::default())
    }

    #[tokio::test]
    async fn agreeing_sources_are_valid() {
        let input = MarketInput {
            price_readings: readings(&[("coingecko", 64_000.0), ("coinmarketcap", 64_100.0), ("kraken", 64_050.0)]),
            volume_readings: readings(&[("coingecko", 1.0e9), ("coinmarketcap", 1.02e9)]),
            market_cap_readings: Vec::new(),
        };

        let result = validator()
            .validate("BTC", &DomainInput::Market(input))
            .await
            .unwrap();

        assert!(result.is_valid);
        assert_eq!(result.confidence, 100.0);
        assert_eq!(result.discrepancies.len(), 2);
        assert!(result.discrepancies.iter().all(|d| !d.exceeded));
        assert!(result.data_quality_summary.failed_checks.is_empty());
    }

    #[tokio::test]
    async fn price_disagreement_lowers_confidence() {
        let input = MarketInput {
            price_readings: readings(&[("coingecko", 100.0), ("kraken", 103.0)]),
            ..Default::default()
        };

        let result = validator()
            .validate("ETH", &DomainInput::Market(input))
            .await
            .unwrap();

        assert!(result.confidence < 100.0);
        assert!(result.discrepancies[0].exceeded);
        assert!(result
            .data_quality_summary
            .failed_checks
            .contains(&"price_agreement".to_string()));
    }

    #[tokio::test]
    async fn zero_price_is_fatal() {
        let input = MarketInput {
            price_readings: readings(&[("coingecko", 100.0), ("broken", 0.0)]),
            ..Default::default()
        };

        let result = validator()
            .validate("SOL", &DomainInput::Market(input))
            .await
            .unwrap();

        assert!(!result.is_valid);
        assert_eq!(result.fatal_alert_count(), 1);
        assert_eq!(result.alerts[0].affected_sources, vec!["broken"]);
    }

    #[tokio::test]
    async fn wrong_input_is_an_error() {
        let err = validator()
            .validate("BTC", &DomainInput::Social(Default::default()))
            .await
            .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidInput(_)));
    }
}
