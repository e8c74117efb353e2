// src/domain/inputs.rs
// Already-fetched readings handed to the validators

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::models::{Domain, SourceReading};

/// Market readings from several price providers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MarketInput {
    pub price_readings: Vec<SourceReading>,
    pub volume_readings: Vec<SourceReading>,
    pub market_cap_readings: Vec<SourceReading>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialReading {
    pub source: String,
    pub mentions: u64,
    /// Bipolar sentiment in [-100, 100], 0 is neutral
    pub sentiment: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SocialInput {
    pub readings: Vec<SocialReading>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OnChainInput {
    pub active_addresses: u64,
    pub transaction_count: u64,
    pub active_address_readings: Vec<SourceReading>,
    pub transaction_readings: Vec<SourceReading>,
    pub exchange_inflow: f64,
    pub exchange_outflow: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsArticle {
    pub source: String,
    pub title: String,
    /// Sentiment in [-1, 1]
    pub sentiment: f64,
    pub published_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewsInput {
    pub articles: Vec<NewsArticle>,
    /// Aggregate sentiment per provider, in [-1, 1]
    pub reported_sentiment: Vec<SourceReading>,
}

/// Input for one validator step
#[derive(Debug, Clone)]
pub enum DomainInput {
    Market(MarketInput),
    Social(SocialInput),
    OnChain(OnChainInput),
    News(NewsInput),
}

impl DomainInput {
    pub fn domain(&self) -> Domain {
        match self {
            DomainInput::Market(_) => Domain::Market,
            DomainInput::Social(_) => Domain::Social,
            DomainInput::OnChain(_) => Domain::OnChain,
            DomainInput::News(_) => Domain::News,
        }
    }
}

/// Per-domain inputs of one run. `None` domains are skipped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DomainInputs {
    pub market: Option<MarketInput>,
    pub social: Option<SocialInput>,
    pub on_chain: Option<OnChainInput>,
    pub news: Option<NewsInput>,
}

impl DomainInputs {
    /// Eligible steps in schedule order
    pub fn into_steps(self) -> Vec<DomainInput> {
        let mut steps = Vec::with_capacity(4);
        if let Some(market) = self.market {
            steps.push(DomainInput::Market(market));
        }
        if let Some(social) = self.social {
            steps.push(DomainInput::Social(social));
        }
        if let Some(on_chain) = self.on_chain {
            steps.push(DomainInput::OnChain(on_chain));
        }
        if let Some(news) = self.news {
            steps.push(DomainInput::News(news));
        }
        steps
    }

    pub fn is_empty(&self) -> bool {
        self.market.is_none() && self.social.is_none() && self.on_chain.is_none() && self.news.is_none()
    }
}
