// src/infrastructure/validators/news.rs
use async_trait::async_trait;
use chrono::{Duration, Utc};

use super::ResultBuilder;
use crate::domain::errors::{ValidationError, ValidatorResult};
use crate::domain::inputs::{DomainInput, NewsInput};
use crate::domain::models::{Alert, Domain, SourceReading, ValidationResult};
use crate::domain::service::Validator;
use crate::validation::discrepancy::{detect_discrepancy, DiscrepancyThresholds};

pub const DEFAULT_MAX_ARTICLE_AGE_HOURS: i64 = 24;

/// Checks news coverage, recency and sentiment agreement
pub struct NewsValidator {
    sentiment_threshold: f64,
    max_article_age: Duration,
}

impl NewsValidator {
    pub fn new(thresholds: &DiscrepancyThresholds) -> Self {
        Self {
            sentiment_threshold: thresholds.news_sentiment,
            max_article_age: Duration::hours(DEFAULT_MAX_ARTICLE_AGE_HOURS),
        }
    }

    pub fn with_max_article_age(mut self, max_age: Duration) -> Self {
        self.max_article_age = max_age;
        self
    }

    fn check(&self, symbol: &str, input: &NewsInput) -> ValidationResult {
        let mut builder = ResultBuilder::new();
        let reporters: Vec<String> = input.reported_sentiment.iter().map(|r| r.name.clone()).collect();

        if input.articles.is_empty() {
            let opinionated: Vec<String> = input
                .reported_sentiment
                .iter()
                .filter(|r| r.value != 0.0)
                .map(|r| r.name.clone())
                .collect();

            if opinionated.is_empty() {
                builder.check("coverage_present", false);
                builder.warn(Alert::warning(
                    Domain::News,
                    format!("No news coverage found for {}", symbol),
                    reporters.clone(),
                    "Widen the news search window",
                ));
            } else {
                builder.fatal(
                    "coverage_present",
                    Alert::fatal(
                        Domain::News,
                        format!("Non-zero news sentiment reported for {} without any articles", symbol),
                        opinionated,
                        "Discard news sentiment for this run",
                    ),
                );
            }
        } else {
            builder.check("coverage_present", true);

            let newest = input.articles.iter().map(|a| a.published_at).max();
            let fresh = newest
                .map(|ts| Utc::now() - ts <= self.max_article_age)
                .unwrap_or(false);
            if !builder.check("recent_coverage", fresh) {
                builder.warn(Alert::warning(
                    Domain::News,
                    format!(
                        "Newest article for {} is older than {} hours",
                        symbol,
                        self.max_article_age.num_hours()
                    ),
                    Vec::new(),
                    "News sentiment may be stale",
                ));
            }

            let out_of_range: Vec<String> = input
                .articles
                .iter()
                .filter(|a| !a.sentiment.is_finite() || a.sentiment.abs() > 1.0)
                .map(|a| a.source.clone())
                .collect();
            builder.check("article_sentiment_range", out_of_range.is_empty());
        }

        // [-1, 1] shifted onto 0..100
        let normalized: Vec<SourceReading> = input
            .reported_sentiment
            .iter()
            .map(|r| SourceReading::new(r.name.clone(), (r.value.clamp(-1.0, 1.0) + 1.0) * 50.0))
            .collect();
        builder.discrepancy(
            "sentiment_agreement",
            detect_discrepancy("news_sentiment", &normalized, self.sentiment_threshold),
        );

        builder.build()
    }
}

#[async_trait]
impl Validator for NewsValidator {
    fn domain(&self) -> Domain {
        Domain::News
    }

    async fn validate(&self, symbol: &str, input: &DomainInput) -> ValidatorResult<ValidationResult> {
        match input {
            DomainInput::News(news) => Ok(self.check(symbol, news)),
            other => Err(ValidationError::InvalidInput(format!(
                "news validator received {} input",
                other.domain()
            ))),
        }
    }
}
