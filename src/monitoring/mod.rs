pub mod aggregator;
pub mod rules;

pub use aggregator::{global, init_global, MonitoringSettings, VeritasMonitoring};
pub use rules::{
    evaluate_alert_rules, AlertEvaluation, AlertRule, AlertRuleConfig, FatalAlertSpikeRule,
    HighErrorRateRule, LowConfidenceRule, SlowValidationRule,
};
