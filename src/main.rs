// src/main.rs
use veritas_core::config::{is_veritas_enabled, Config};
use veritas_core::domain::errors::{AppError, AppResult};
use veritas_core::domain::inputs::{
    DomainInputs, MarketInput, NewsArticle, NewsInput, OnChainInput, SocialInput, SocialReading,
};
use veritas_core::domain::models::{OrchestrationResult, SourceReading};
use veritas_core::infrastructure::{SourceReliabilityTracker, ValidatorSet};
use veritas_core::monitoring::{self, evaluate_alert_rules};
use veritas_core::validation::{ConfidenceScoreCalculator, ValidationOrchestrator};

use chrono::{Duration, Utc};
use futures_util::future::join_all;
use std::collections::HashMap;
use std::env;
use std::sync::Arc;
use tokio::signal::ctrl_c;

#[tokio::main]
async fn main() -> AppResult<()> {
    // Load configuration
    let config = match env::args().nth(1) {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    // Initialize logging
    config.init_logging()?;

    log::info!("Starting veritas_core v{}", env!("CARGO_PKG_VERSION"));

    if !is_veritas_enabled(&config) {
        log::info!("Veritas is disabled. Nothing to validate.");
        return Ok(());
    }

    let monitoring = monitoring::init_global(config.monitoring.clone())?;
    let reliability = Arc::new(SourceReliabilityTracker::new());

    let orchestrator = ValidationOrchestrator::new(
        ValidatorSet::standard(&config.thresholds),
        config.orchestration.clone(),
    )?
    .with_calculator(ConfidenceScoreCalculator::new(config.scoring)?)
    .with_monitoring(monitoring.clone())
    .with_reliability_tracker(reliability.clone());

    let mut late_alerts = orchestrator.subscribe_late_alerts();
    tokio::spawn(async move {
        while let Ok(late) = late_alerts.recv().await {
            log::warn!(
                "Late fatal alert for {} ({}): {}",
                late.symbol,
                late.domain,
                late.alert.message
            );
        }
    });

    let symbols: Vec<String> = env::var("VERITAS_SYMBOLS")
        .unwrap_or_else(|_| "BTC,ETH".to_string())
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();

    let mut inputs = match env::var("VERITAS_INPUTS_FILE") {
        Ok(path) => load_inputs(&path)?,
        Err(_) => {
            log::info!("No inputs file given, using demo readings");
            symbols.iter().map(|s| (s.clone(), demo_inputs(s))).collect()
        }
    };

    let runs = symbols.iter().map(|symbol| {
        let symbol_inputs = inputs.remove(symbol).unwrap_or_default();
        if symbol_inputs.is_empty() {
            log::warn!("No inputs for {}", symbol);
        }
        orchestrator.orchestrate_validation(symbol, symbol_inputs)
    });

    let results: Vec<OrchestrationResult> = tokio::select! {
        results = join_all(runs) => results,
        _ = ctrl_c() => {
            log::info!("Interrupted, shutting down...");
            return Ok(());
        }
    };

    for result in &results {
        for domain_result in result.results.values() {
            reliability.observe(domain_result);
        }
        println!("{}", serde_json::to_string_pretty(result)?);
    }

    let metrics = monitoring.get_aggregated_metrics();
    log::info!(
        "{} validation(s), success rate {:.1}%, average {:.0}ms",
        metrics.total_validations,
        metrics.success_rate,
        metrics.average_duration_ms
    );
    for evaluation in evaluate_alert_rules(&metrics, &config.alert_rules) {
        if evaluation.triggered {
            log::warn!(
                "Alert rule {} triggered: {} (actual {:.1}, threshold {:.1})",
                evaluation.rule_id,
                evaluation.description,
                evaluation.actual_value,
                evaluation.threshold_value
            );
        }
    }

    log::info!("Done.");
    Ok(())
}

/// Inputs file: JSON object from symbol to its domain inputs
fn load_inputs(path: &str) -> AppResult<HashMap<String, DomainInputs>> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("Failed to read inputs file {}: {}", path, e)))?;
    Ok(serde_json::from_str(&contents)?)
}

fn demo_inputs(symbol: &str) -> DomainInputs {
    let base = match symbol {
        "BTC" => 64_250.0,
        "ETH" => 3_120.0,
        _ => 100.0,
    };

    DomainInputs {
        market: Some(MarketInput {
            price_readings: vec![
                SourceReading::new("coingecko", base),
                SourceReading::new("coinmarketcap", base * 1.002),
                SourceReading::new("binance", base * 0.999),
            ],
            volume_readings: vec![
                SourceReading::new("coingecko", base * 420_000.0),
                SourceReading::new("coinmarketcap", base * 455_000.0),
            ],
            market_cap_readings: vec![
                SourceReading::new("coingecko", base * 19_700_000.0),
                SourceReading::new("coinmarketcap", base * 19_650_000.0),
            ],
        }),
        social: Some(SocialInput {
            readings: vec![
                SocialReading {
                    source: "twitter".to_string(),
                    mentions: 18_400,
                    sentiment: 42.0,
                },
                SocialReading {
                    source: "reddit".to_string(),
                    mentions: 15_900,
                    sentiment: 35.0,
                },
            ],
        }),
        on_chain: Some(OnChainInput {
            active_addresses: 910_000,
            transaction_count: 540_000,
            active_address_readings: vec![
                SourceReading::new("glassnode", 910_000.0),
                SourceReading::new("santiment", 935_000.0),
            ],
            transaction_readings: vec![
                SourceReading::new("glassnode", 540_000.0),
                SourceReading::new("santiment", 552_000.0),
            ],
            exchange_inflow: 12_400.0,
            exchange_outflow: 13_100.0,
        }),
        news: Some(NewsInput {
            articles: vec![
                NewsArticle {
                    source: "coindesk".to_string(),
                    title: format!("{} holds steady as volumes climb", symbol),
                    sentiment: 0.4,
                    published_at: Utc::now() - Duration::hours(2),
                },
                NewsArticle {
                    source: "theblock".to_string(),
                    title: format!("Analysts split on {} outlook", symbol),
                    sentiment: 0.1,
                    published_at: Utc::now() - Duration::hours(6),
                },
            ],
            reported_sentiment: vec![
                SourceReading::new("cryptopanic", 0.3),
                SourceReading::new("lunarcrush", 0.25),
            ],
        }),
    }
}
