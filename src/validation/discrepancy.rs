// src/validation/discrepancy.rs
use serde::{Deserialize, Serialize};

use crate::domain::errors::{ValidationError, ValidatorResult};
use crate::domain::models::{Discrepancy, SourceReading};

/// Per-metric disagreement thresholds, in percent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscrepancyThresholds {
    pub price: f64,
    pub volume: f64,
    pub market_cap: f64,
    pub sentiment: f64,
    pub mentions: f64,
    pub on_chain: f64,
    pub news_sentiment: f64,
}

impl Default for DiscrepancyThresholds {
    fn default() -> Self {
        Self {
            price: 1.5,
            volume: 10.0,
            market_cap: 5.0,
            sentiment: 30.0,
            mentions: 30.0,
            on_chain: 10.0,
            news_sentiment: 30.0,
        }
    }
}

impl DiscrepancyThresholds {
    pub fn validate(&self) -> ValidatorResult<()> {
        let named = [
            ("price", self.price),
            ("volume", self.volume),
            ("market_cap", self.market_cap),
            ("sentiment", self.sentiment),
            ("mentions", self.mentions),
            ("on_chain", self.on_chain),
            ("news_sentiment", self.news_sentiment),
        ];

        for (name, value) in named {
            if !value.is_finite() || value <= 0.0 || value > 100.0 {
                return Err(ValidationError::Configuration(format!(
                    "discrepancy threshold '{}' must be in (0, 100], got {}",
                    name, value
                )));
            }
        }

        Ok(())
    }
}

/// Percentage spread `(max - min) / mean * 100`, clamped to [0, 100].
///
/// Returns `None` with fewer than two finite readings.
pub fn percentage_spread(values: &[f64]) -> Option<f64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.len() < 2 {
        return None;
    }

    let max = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = finite.iter().copied().fold(f64::INFINITY, f64::min);
    if max == min {
        return Some(0.0);
    }

    let mean = finite.iter().sum::<f64>() / finite.len() as f64;
    if mean <= 0.0 {
        // spread around a non-positive mean has no meaningful ratio
        return Some(100.0);
    }

    Some(((max - min) / mean * 100.0).clamp(0.0, 100.0))
}

/// Compare same-metric readings from different sources.
///
/// Produces nothing with one source or fewer.
pub fn detect_discrepancy(metric: &str, readings: &[SourceReading], threshold: f64) -> Option<Discrepancy> {
    let sources: Vec<SourceReading> = readings
        .iter()
        .filter(|r| r.value.is_finite())
        .cloned()
        .collect();

    let values: Vec<f64> = sources.iter().map(|r| r.value).collect();
    let variance = percentage_spread(&values)?;

    Some(Discrepancy {
        metric: metric.to_string(),
        sources,
        variance,
        threshold,
        exceeded: variance > threshold,
    })
}
