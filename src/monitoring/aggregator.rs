// src/monitoring/aggregator.rs
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use crate::domain::errors::{ValidationError, ValidatorResult};
use crate::domain::models::{AggregatedMetrics, ValidationMetricRecord};

/// Bounds of the rolling store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringSettings {
    /// Maximum number of records kept
    pub capacity: usize,
    /// Maximum record age in seconds
    pub window_secs: u64,
}

/// Longest accepted time window, one year
pub const MAX_WINDOW_SECS: u64 = 365 * 24 * 60 * 60;

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            capacity: 1000,
            window_secs: 3600,
        }
    }
}

impl MonitoringSettings {
    pub fn validate(&self) -> ValidatorResult<()> {
        if self.capacity == 0 {
            return Err(ValidationError::Configuration(
                "monitoring capacity must be at least 1".to_string(),
            ));
        }
        if self.window_secs == 0 {
            return Err(ValidationError::Configuration(
                "monitoring window must be at least 1 second".to_string(),
            ));
        }
        if self.window_secs > MAX_WINDOW_SECS {
            return Err(ValidationError::Configuration(format!(
                "monitoring window must be at most {} seconds, got {}",
                MAX_WINDOW_SECS, self.window_secs
            )));
        }
        Ok(())
    }
}

/// Rolling store of past validation runs.
///
/// Oldest records are evicted once `capacity` is reached or once they fall
/// outside the time window. Safe to share across concurrent runs.
pub struct VeritasMonitoring {
    records: Mutex<VecDeque<ValidationMetricRecord>>,
    capacity: usize,
    window: Duration,
}

impl VeritasMonitoring {
    pub fn new(settings: MonitoringSettings) -> ValidatorResult<Self> {
        settings.validate()?;
        let window_secs = i64::try_from(settings.window_secs).map_err(|_| {
            ValidationError::Configuration(format!(
                "monitoring window of {}s is too large",
                settings.window_secs
            ))
        })?;

        Ok(Self {
            records: Mutex::new(VecDeque::with_capacity(settings.capacity.min(4096))),
            capacity: settings.capacity,
            window: Duration::seconds(window_secs),
        })
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<ValidationMetricRecord>> {
        // a panic while holding the lock cannot leave the deque half-written
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append one run outcome
    pub fn record_validation(&self, record: ValidationMetricRecord) {
        let mut records = self.lock();
        log::debug!(
            "Recording {} validation for {} (success: {}, {}ms)",
            record.validation_type,
            record.symbol,
            record.success,
            record.duration_ms
        );

        records.push_back(record);
        while records.len() > self.capacity {
            records.pop_front();
        }
        self.evict_expired(&mut records);
    }

    fn evict_expired(&self, records: &mut VecDeque<ValidationMetricRecord>) {
        // an unrepresentable cutoff keeps everything
        if let Some(cutoff) = Utc::now().checked_sub_signed(self.window) {
            records.retain(|r| r.timestamp >= cutoff);
        }
    }

    /// Statistics over the records inside the window
    pub fn get_aggregated_metrics(&self) -> AggregatedMetrics {
        let mut records = self.lock();
        self.evict_expired(&mut records);
        aggregate(records.iter())
    }

    /// Statistics for one symbol
    pub fn get_symbol_metrics(&self, symbol: &str) -> AggregatedMetrics {
        let mut records = self.lock();
        self.evict_expired(&mut records);
        aggregate(records.iter().filter(|r| r.symbol == symbol))
    }

    /// Newest records first, at most `limit`
    pub fn recent_records(&self, limit: usize) -> Vec<ValidationMetricRecord> {
        let records = self.lock();
        records.iter().rev().take(limit).cloned().collect()
    }

    pub fn clear_metrics(&self) {
        self.lock().clear();
        log::info!("Validation metrics cleared");
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

fn aggregate<'a>(records: impl Iterator<Item = &'a ValidationMetricRecord>) -> AggregatedMetrics {
    let mut metrics = AggregatedMetrics::default();
    let mut total_duration: u128 = 0;
    let mut confidence_sum = 0.0;
    let mut confidence_count = 0usize;
    let mut error_breakdown: BTreeMap<String, usize> = BTreeMap::new();

    for record in records {
        metrics.total_validations += 1;
        if record.success {
            metrics.successful_validations += 1;
        }
        total_duration += u128::from(record.duration_ms);
        if let Some(score) = record.confidence_score {
            confidence_sum += score;
            confidence_count += 1;
        }
        metrics.total_alerts += record.alert_count;
        metrics.total_fatal_alerts += record.fatal_alert_count;
        if let Some(error_type) = &record.error_type {
            *error_breakdown.entry(error_type.clone()).or_insert(0) += 1;
        }
    }

    if metrics.total_validations > 0 {
        let total = metrics.total_validations as f64;
        metrics.success_rate = metrics.successful_validations as f64 / total * 100.0;
        metrics.average_duration_ms = total_duration as f64 / total;
    }
    if confidence_count > 0 {
        metrics.average_confidence = Some(confidence_sum / confidence_count as f64);
    }
    metrics.error_breakdown = error_breakdown;
    metrics
}

static GLOBAL_MONITORING: OnceLock<Arc<VeritasMonitoring>> = OnceLock::new();

/// Install the process-wide store. Fails if it was already installed.
pub fn init_global(settings: MonitoringSettings) -> ValidatorResult<Arc<VeritasMonitoring>> {
    let monitoring = Arc::new(VeritasMonitoring::new(settings)?);
    GLOBAL_MONITORING.set(monitoring.clone()).map_err(|_| {
        ValidationError::Configuration("global monitoring is already initialized".to_string())
    })?;
    log::info!("Global validation monitoring initialized");
    Ok(monitoring)
}

/// The process-wide store, if `init_global` ran
pub fn global() -> Option<Arc<VeritasMonitoring>> {
    GLOBAL_MONITORING.get().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(symbol: &str, success: bool, duration_ms: u64) -> ValidationMetricRecord {
        ValidationMetricRecord {
            timestamp: Utc::now(),
            symbol: symbol.to_string(),
            validation_type: "orchestration".to_string(),
            success,
            duration_ms,
            confidence_score: Some(if success { 90.0 } else { 40.0 }),
            alert_count: 1,
            fatal_alert_count: usize::from(!success),
            error_type: if success { None } else { Some("validator_error".to_string()) },
        }
    }

    fn monitoring(capacity: usize) -> VeritasMonitoring {
        VeritasMonitoring::new(MonitoringSettings {
            capacity,
            window_secs: 3600,
        })
        .unwrap()
    }

    #[test]
    fn aggregates_over_records() {
        let monitoring = monitoring(100);
        monitoring.record_validation(record("BTC", true, 100));
        monitoring.record_validation(record("BTC", true, 300));
        monitoring.record_validation(record("ETH", false, 200));
        monitoring.record_validation(record("ETH", true, 400));

        let metrics = monitoring.get_aggregated_metrics();
        assert_eq!(metrics.total_validations, 4);
        assert_eq!(metrics.successful_validations, 3);
        assert_eq!(metrics.success_rate, 75.0);
        assert_eq!(metrics.average_duration_ms, 250.0);
        assert_eq!(metrics.error_breakdown.get("validator_error"), Some(&1));
        assert_eq!(metrics.total_fatal_alerts, 1);
        assert_eq!(metrics.average_confidence, Some(77.5));

        let eth = monitoring.get_symbol_metrics("ETH");
        assert_eq!(eth.total_validations, 2);
        assert_eq!(eth.success_rate, 50.0);
    }

    #[test]
    fn empty_store_has_zeroed_metrics() {
        let metrics = monitoring(10).get_aggregated_metrics();
        assert_eq!(metrics.total_validations, 0);
        assert_eq!(metrics.success_rate, 0.0);
        assert_eq!(metrics.average_confidence, None);
    }

    #[test]
    fn capacity_evicts_oldest() {
        let monitoring = monitoring(3);
        for duration in [10, 20, 30, 40, 50] {
            monitoring.record_validation(record("BTC", true, duration));
        }

        assert_eq!(monitoring.len(), 3);
        let durations: Vec<u64> = monitoring.recent_records(10).iter().map(|r| r.duration_ms).collect();
        assert_eq!(durations, vec![50, 40, 30]);
    }

    #[test]
    fn window_evicts_expired_records() {
        let monitoring = monitoring(10);
        let mut old = record("BTC", false, 10);
        old.timestamp = Utc::now() - Duration::hours(2);
        monitoring.record_validation(old);
        monitoring.record_validation(record("BTC", true, 20));

        let metrics = monitoring.get_aggregated_metrics();
        assert_eq!(metrics.total_validations, 1);
        assert_eq!(metrics.success_rate, 100.0);
    }

    #[test]
    fn clear_empties_the_store() {
        let monitoring = monitoring(10);
        monitoring.record_validation(record("BTC", true, 10));
        monitoring.clear_metrics();
        assert!(monitoring.is_empty());
        assert_eq!(monitoring.get_aggregated_metrics().total_validations, 0);
    }

    #[test]
    fn invalid_settings_fail_fast() {
        assert!(VeritasMonitoring::new(MonitoringSettings {
            capacity: 0,
            window_secs: 60
        })
        .is_err());
        assert!(VeritasMonitoring::new(MonitoringSettings {
            capacity: 10,
            window_secs: 0
        })
        .is_err());
    }

    #[test]
    fn window_is_bounded() {
        let huge = MonitoringSettings {
            capacity: 10,
            window_secs: 10_000_000_000_000,
        };
        assert!(matches!(huge.validate(), Err(ValidationError::Configuration(_))));
        assert!(VeritasMonitoring::new(huge).is_err());

        let year = MonitoringSettings {
            capacity: 10,
            window_secs: MAX_WINDOW_SECS,
        };
        let monitoring = VeritasMonitoring::new(year).unwrap();
        monitoring.record_validation(record("BTC", true, 10));
        assert_eq!(monitoring.get_aggregated_metrics().total_validations, 1);
    }

    #[tokio::test]
    async fn concurrent_appends_are_not_lost() {
        let monitoring = Arc::new(monitoring(10_000));
        let mut handles = Vec::new();
        for task in 0..8 {
            let monitoring = monitoring.clone();
            handles.push(tokio::spawn(async move {
                for i in 0..100 {
                    monitoring.record_validation(record(&format!("SYM{}", task), i % 2 == 0, 10));
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let metrics = monitoring.get_aggregated_metrics();
        assert_eq!(metrics.total_validations, 800);
        assert_eq!(metrics.successful_validations, 400);
    }
}
