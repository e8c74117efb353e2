// src/infrastructure/mod.rs
pub mod reliability;
pub mod validators;

pub use reliability::SourceReliabilityTracker;
pub use validators::{MarketValidator, NewsValidator, OnChainValidator, SocialValidator, ValidatorSet};
