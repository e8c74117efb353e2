// src/infrastructure/validators/onchain.rs
use async_trait::async_trait;

use super::ResultBuilder;
use crate::domain::errors::{ValidationError, ValidatorResult};
use crate::domain::inputs::{DomainInput, OnChainInput};
use crate::domain::models::{Alert, Domain, ValidationResult};
use crate::domain::service::Validator;
use crate::validation::discrepancy::{detect_discrepancy, DiscrepancyThresholds};

/// Checks on-chain activity for internal consistency and provider agreement
pub struct OnChainValidator {
    threshold: f64,
}

impl OnChainValidator {
    pub fn new(thresholds: &DiscrepancyThresholds) -> Self {
        Self {
            threshold: thresholds.on_chain,
        }
    }

    fn check(&self, symbol: &str, input: &OnChainInput) -> ValidationResult {
        let mut builder = ResultBuilder::new();

        // active addresses imply at least one transaction
        if input.transaction_count == 0 && input.active_addresses > 0 {
            builder.fatal(
                "activity_consistency",
                Alert::fatal(
                    Domain::OnChain,
                    format!(
                        "{} reports {} active addresses but zero transactions",
                        symbol, input.active_addresses
                    ),
                    source_names(input),
                    "Discard on-chain metrics for this run",
                ),
            );
        } else {
            builder.check("activity_consistency", true);
        }

        if !builder.check(
            "activity_reported",
            input.active_addresses > 0 || input.transaction_count > 0,
        ) {
            builder.warn(Alert::warning(
                Domain::OnChain,
                format!("No on-chain activity reported for {}", symbol),
                source_names(input),
                "Confirm the chain indexer is synced",
            ));
        }

        let flows_valid = input.exchange_inflow.is_finite()
            && input.exchange_outflow.is_finite()
            && input.exchange_inflow >= 0.0
            && input.exchange_outflow >= 0.0;
        if !builder.check("exchange_flows_non_negative", flows_valid) {
            builder.warn(Alert::warning(
                Domain::OnChain,
                format!(
                    "Invalid exchange flows for {}: inflow {}, outflow {}",
                    symbol, input.exchange_inflow, input.exchange_outflow
                ),
                source_names(input),
                "Check exchange flow aggregation",
            ));
        }

        builder.discrepancy(
            "active_address_agreement",
            detect_discrepancy("active_addresses", &input.active_address_readings, self.threshold),
        );
        builder.discrepancy(
            "transaction_agreement",
            detect_discrepancy("transactions", &input.transaction_readings, self.threshold),
        );

        builder.build()
    }
}

fn source_names(input: &OnChainInput) -> Vec<String> {
    let mut names: Vec<String> = input
        .active_address_readings
        .iter()
        .chain(input.transaction_readings.iter())
        .map(|r| r.name.clone())
        .collect();
    names.sort();
    names.dedup();
    names
}

#[async_trait]
impl Validator for OnChainValidator {
    fn domain(&self) -> Domain {
        Domain::OnChain
    }

    async fn validate(&self, symbol: &str, input: &DomainInput) -> ValidatorResult<ValidationResult> {
        match input {
            DomainInput::OnChain(on_chain) => Ok(self.check(symbol, on_chain)),
            other => Err(ValidationError::InvalidInput(format!(
                "on-chain validator received {} input",
                other.domain()
            ))),
        }
    }
}
