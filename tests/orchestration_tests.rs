// tests/orchestration_tests.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use tokio::time::{sleep, Duration, Instant};

use veritas_core::domain::errors::{ValidationError, ValidatorResult};
use veritas_core::domain::inputs::{
    DomainInput, DomainInputs, MarketInput, NewsArticle, NewsInput, OnChainInput, SocialInput,
    SocialReading,
};
use veritas_core::domain::models::{
    AlertSeverity, ConfidenceLevel, Domain, OrchestrationResult, SourceReading, StepStatus,
    ValidationMetricRecord, ValidationResult,
};
use veritas_core::domain::service::{ReliabilityTracker, Validator};
use veritas_core::infrastructure::{SourceReliabilityTracker, ValidatorSet};
use veritas_core::monitoring::{
    self, evaluate_alert_rules, AlertRuleConfig, MonitoringSettings, VeritasMonitoring,
};
use veritas_core::validation::{
    orchestrate_validation, DiscrepancyThresholds, LateAlert, LateFatalPolicy, OrchestratorConfig,
    ValidationOrchestrator,
};

fn clean_inputs() -> DomainInputs {
    DomainInputs {
        market: Some(MarketInput {
            price_readings: vec![
                SourceReading::new("coingecko", 64_250.0),
                SourceReading::new("coinmarketcap", 64_300.0),
                SourceReading::new("binance", 64_210.0),
            ],
            volume_readings: vec![
                SourceReading::new("coingecko", 2.1e10),
                SourceReading::new("coinmarketcap", 2.2e10),
            ],
            market_cap_readings: vec![
                SourceReading::new("coingecko", 1.26e12),
                SourceReading::new("coinmarketcap", 1.27e12),
            ],
        }),
        social: Some(SocialInput {
            readings: vec![
                SocialReading {
                    source: "twitter".to_string(),
                    mentions: 12_000,
                    sentiment: 40.0,
                },
                SocialReading {
                    source: "reddit".to_string(),
                    mentions: 11_000,
                    sentiment: 36.0,
                },
            ],
        }),
        on_chain: Some(OnChainInput {
            active_addresses: 900_000,
            transaction_count: 500_000,
            active_address_readings: vec![
                SourceReading::new("glassnode", 900_000.0),
                SourceReading::new("santiment", 910_000.0),
            ],
            transaction_readings: vec![
                SourceReading::new("glassnode", 500_000.0),
                SourceReading::new("santiment", 505_000.0),
            ],
            exchange_inflow: 1_000.0,
            exchange_outflow: 1_200.0,
        }),
        news: Some(NewsInput {
            articles: vec![NewsArticle {
                source: "coindesk".to_string(),
                title: "Bitcoin steady".to_string(),
                sentiment: 0.3,
                published_at: Utc::now() - ChronoDuration::hours(1),
            }],
            reported_sentiment: vec![
                SourceReading::new("cryptopanic", 0.3),
                SourceReading::new("lunarcrush", 0.28),
            ],
        }),
    }
}

/// Wraps a standard validator behind a fixed delay
struct Delayed {
    inner: Arc<dyn Validator>,
    delay: Duration,
}

#[async_trait]
impl Validator for Delayed {
    fn domain(&self) -> Domain {
        self.inner.domain()
    }

    async fn validate(&self, symbol: &str, input: &DomainInput) -> ValidatorResult<ValidationResult> {
        sleep(self.delay).await;
        self.inner.validate(symbol, input).await
    }
}

struct Broken(Domain);

#[async_trait]
impl Validator for Broken {
    fn domain(&self) -> Domain {
        self.0
    }

    async fn validate(&self, _symbol: &str, _input: &DomainInput) -> ValidatorResult<ValidationResult> {
        Err(ValidationError::Validator("provider returned garbage".to_string()))
    }
}

fn delayed(domain: Domain, delay_ms: u64) -> Arc<dyn Validator> {
    let standard = ValidatorSet::standard(&DiscrepancyThresholds::default());
    let inner = standard.get(domain).expect("standard validator");
    Arc::new(Delayed {
        inner,
        delay: Duration::from_millis(delay_ms),
    })
}

#[tokio::test]
async fn clean_data_scores_full_confidence() {
    let result = orchestrate_validation("BTC", clean_inputs(), None).await;

    assert!(result.success, "errors: {:?}", result.errors);
    assert!(result.completed);
    assert_eq!(result.results.len(), 4);
    assert_eq!(result.progress, 100.0);
    assert!(result.alerts.is_empty());
    assert_eq!(result.confidence_score.overall_score, 100.0);
    assert_eq!(result.confidence_score.confidence_level, ConfidenceLevel::Excellent);
    assert_eq!(result.data_quality_summary.overall_score, 100.0);
    assert!(result
        .data_quality_summary
        .passed_checks
        .iter()
        .any(|c| c == "market.price_agreement"));
}

#[tokio::test]
async fn impossible_data_raises_fatal_alerts_first() {
    let mut inputs = clean_inputs();
    inputs.on_chain = Some(OnChainInput {
        active_addresses: 5_000,
        transaction_count: 0,
        ..Default::default()
    });
    if let Some(market) = inputs.market.as_mut() {
        // 10% apart: a warning, not a fatal
        market.price_readings = vec![
            SourceReading::new("coingecko", 100.0),
            SourceReading::new("stale", 110.0),
        ];
    }

    let result = orchestrate_validation("BTC", inputs, None).await;

    assert!(result.completed);
    assert_eq!(result.fatal_alert_count(), 1);
    assert_eq!(result.alerts[0].severity, AlertSeverity::Fatal);
    assert_eq!(result.alerts[0].alert_type, Domain::OnChain);
    assert!(result
        .alerts
        .iter()
        .any(|a| a.severity == AlertSeverity::Warning && a.alert_type == Domain::Market));
    assert_eq!(result.confidence_score.logical_consistency, 50.0);
    assert!(result.confidence_score.overall_score < 100.0);
}

#[tokio::test]
async fn slow_validator_times_out_and_others_still_score() {
    let validators = ValidatorSet::standard(&DiscrepancyThresholds::default())
        .with_validator(delayed(Domain::News, 1_000));
    let config = OrchestratorConfig {
        timeout_ms: 50,
        global_deadline_ms: 2_000,
        ..Default::default()
    };
    let orchestrator = ValidationOrchestrator::new(validators, config).unwrap();

    let started = Instant::now();
    let result = orchestrator.orchestrate_validation("BTC", clean_inputs()).await;

    assert!(started.elapsed() < Duration::from_millis(800));
    assert!(result.completed);
    assert!(!result.success);
    assert_eq!(result.results.len(), 3);
    assert!(!result.results.contains_key(&Domain::News));
    assert_eq!(result.confidence_score.completeness, 75.0);
    assert_eq!(result.confidence_score.breakdown.news, 0.0);

    let news = result
        .step_reports
        .iter()
        .find(|r| r.domain == Domain::News)
        .unwrap();
    assert_eq!(news.status, StepStatus::TimedOut);
    assert!(result.errors[0].contains("timed out"));
}

#[tokio::test]
async fn global_deadline_returns_partial_results() {
    let validators = ValidatorSet::standard(&DiscrepancyThresholds::default())
        .with_validator(delayed(Domain::Social, 1_000))
        .with_validator(delayed(Domain::OnChain, 1_000));
    let config = OrchestratorConfig {
        timeout_ms: 5_000,
        global_deadline_ms: 80,
        ..Default::default()
    };
    let orchestrator = ValidationOrchestrator::new(validators, config).unwrap();

    let result = orchestrator.orchestrate_validation("ETH", clean_inputs()).await;

    assert!(result.timed_out);
    assert!(result.halted);
    assert!(!result.completed);
    assert!(!result.success);
    assert_eq!(result.current_step, "timed_out");
    assert_eq!(result.progress, 50.0);
    assert_eq!(result.results.len(), 2);
    assert!(result.duration_ms < 1_000);
    assert!(result.confidence_score.overall_score <= 100.0);
}

async fn run_past_deadline_with_fatal_in_flight(
    policy: LateFatalPolicy,
) -> (OrchestrationResult, Option<LateAlert>) {
    let validators = ValidatorSet::new().with_validator(delayed(Domain::OnChain, 150));
    let config = OrchestratorConfig {
        timeout_ms: 1_000,
        global_deadline_ms: 40,
        late_fatal_policy: policy,
        ..Default::default()
    };
    let orchestrator = ValidationOrchestrator::new(validators, config).unwrap();
    let mut late_alerts = orchestrator.subscribe_late_alerts();

    let inputs = DomainInputs {
        on_chain: Some(OnChainInput {
            active_addresses: 5_000,
            transaction_count: 0,
            ..Default::default()
        }),
        ..Default::default()
    };
    let result = orchestrator.orchestrate_validation("ETH", inputs).await;
    let late = tokio::time::timeout(Duration::from_millis(500), late_alerts.recv())
        .await
        .ok()
        .and_then(|received| received.ok());
    (result, late)
}

#[tokio::test]
async fn deadline_late_fatal_follows_policy() {
    let (surfaced, late) = run_past_deadline_with_fatal_in_flight(LateFatalPolicy::Surface).await;
    let late = late.expect("surfaced late alert");
    assert_eq!(late.symbol, "ETH");
    assert_eq!(late.domain, Domain::OnChain);
    assert!(late.alert.is_fatal());

    let (discarded, late) = run_past_deadline_with_fatal_in_flight(LateFatalPolicy::Discard).await;
    assert!(late.is_none());

    for result in [&surfaced, &discarded] {
        assert!(result.timed_out);
        assert!(result.halted);
        assert!(result.results.is_empty());
        assert!(result.alerts.is_empty());
        assert_eq!(result.progress, 0.0);
        assert_eq!(result.confidence_score.logical_consistency, 100.0);
    }
}

#[tokio::test]
async fn every_validator_failing_still_resolves() {
    let validators = ValidatorSet::new()
        .with_validator(Arc::new(Broken(Domain::Market)))
        .with_validator(Arc::new(Broken(Domain::Social)))
        .with_validator(Arc::new(Broken(Domain::OnChain)))
        .with_validator(Arc::new(Broken(Domain::News)));
    let orchestrator = ValidationOrchestrator::new(validators, OrchestratorConfig::default()).unwrap();

    let result = orchestrator.orchestrate_validation("BTC", clean_inputs()).await;

    assert!(!result.success);
    assert!(result.completed);
    assert_eq!(result.errors.len(), 4);
    assert!(result.results.is_empty());
    assert_eq!(result.confidence_score.overall_score, 30.0);
    assert_eq!(result.current_step, "partially_completed");
}

#[tokio::test]
async fn runs_feed_monitoring_and_alert_rules() {
    let store = Arc::new(VeritasMonitoring::new(MonitoringSettings::default()).unwrap());
    let validators = ValidatorSet::standard(&DiscrepancyThresholds::default())
        .with_validator(Arc::new(Broken(Domain::News)));
    let orchestrator = ValidationOrchestrator::new(validators, OrchestratorConfig::default())
        .unwrap()
        .with_monitoring(store.clone());

    for _ in 0..6 {
        orchestrator.orchestrate_validation("BTC", clean_inputs()).await;
    }

    let metrics = store.get_aggregated_metrics();
    assert_eq!(metrics.total_validations, 6);
    assert_eq!(metrics.success_rate, 0.0);
    assert_eq!(metrics.error_breakdown.get("validator_error"), Some(&6));

    let evaluations = evaluate_alert_rules(&metrics, &AlertRuleConfig::default());
    let error_rate = evaluations
        .iter()
        .find(|e| e.rule_id == "high-error-rate")
        .unwrap();
    assert!(error_rate.triggered);
    assert!(!evaluations
        .iter()
        .find(|e| e.rule_id == "slow-validation")
        .unwrap()
        .triggered);
}

#[tokio::test]
async fn concurrent_runs_share_one_store() {
    let store = Arc::new(VeritasMonitoring::new(MonitoringSettings::default()).unwrap());
    let orchestrator = Arc::new(
        ValidationOrchestrator::new(
            ValidatorSet::standard(&DiscrepancyThresholds::default()),
            OrchestratorConfig::default(),
        )
        .unwrap()
        .with_monitoring(store.clone()),
    );

    let mut handles = Vec::new();
    for i in 0..10 {
        let orchestrator = orchestrator.clone();
        handles.push(tokio::spawn(async move {
            let symbol = format!("SYM{}", i % 2);
            orchestrator.orchestrate_validation(&symbol, clean_inputs()).await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().success);
    }

    assert_eq!(store.get_aggregated_metrics().total_validations, 10);
    assert_eq!(store.get_symbol_metrics("SYM0").total_validations, 5);
}

#[tokio::test]
async fn reliability_weights_follow_observed_agreement() {
    let tracker = Arc::new(SourceReliabilityTracker::new());
    let orchestrator = ValidationOrchestrator::new(
        ValidatorSet::standard(&DiscrepancyThresholds::default()),
        OrchestratorConfig::default(),
    )
    .unwrap()
    .with_reliability_tracker(tracker.clone());

    let mut inputs = clean_inputs();
    if let Some(market) = inputs.market.as_mut() {
        market.price_readings.push(SourceReading::new("stale", 70_000.0));
    }

    let first = orchestrator.orchestrate_validation("BTC", inputs.clone()).await;
    assert_eq!(first.confidence_score.source_weights.get("stale"), Some(&0.5));

    for result in first.results.values() {
        tracker.observe(result);
    }
    assert!(tracker.weight_for("stale") < 0.5);

    let second = orchestrator.orchestrate_validation("BTC", inputs).await;
    let weights = &second.confidence_score.source_weights;
    assert!(weights["stale"] < weights["coingecko"]);
}

#[tokio::test]
async fn metric_records_summarize_runs() {
    let result = orchestrate_validation("BTC", clean_inputs(), None).await;

    let record = ValidationMetricRecord::from_orchestration(&result);
    assert_eq!(record.symbol, "BTC");
    assert!(record.success);
    assert_eq!(record.error_type, None);
    assert_eq!(record.confidence_score, Some(100.0));
}

#[test]
fn global_store_initializes_once() {
    let first = monitoring::init_global(MonitoringSettings::default());
    assert!(first.is_ok());
    assert!(monitoring::global().is_some());

    let second = monitoring::init_global(MonitoringSettings::default());
    assert!(matches!(second, Err(ValidationError::Configuration(_))));
}
