// src/config.rs
use crate::domain::errors::{AppError, AppResult};
use crate::monitoring::{AlertRuleConfig, MonitoringSettings};
use crate::validation::{DiscrepancyThresholds, LateFatalPolicy, OrchestratorConfig, ScoreWeights};
use dotenv::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// Veritas configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Feature gate
    pub veritas: VeritasConfig,

    /// Timeouts, concurrency and halting
    pub orchestration: OrchestratorConfig,

    /// Per-metric discrepancy thresholds, in percent
    pub thresholds: DiscrepancyThresholds,

    /// Confidence component weights
    pub scoring: ScoreWeights,

    /// Rolling metrics store bounds
    pub monitoring: MonitoringSettings,

    /// Operational alert rules
    pub alert_rules: AlertRuleConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VeritasConfig {
    pub enabled: bool,
}

impl Default for VeritasConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "warn", "error")
    pub level: String,

    /// Log to file
    pub to_file: bool,

    /// Log file path
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            to_file: false,
            file_path: None,
        }
    }
}

/// Parse an environment variable, falling back to `default` when unset or malformed
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Ignoring unparseable value for {}: {:?}", key, raw);
            default
        }),
        Err(_) => default,
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let defaults = Config::default();

        let veritas = VeritasConfig {
            enabled: env_or("VERITAS_ENABLED", defaults.veritas.enabled),
        };

        let orchestration = OrchestratorConfig {
            timeout_ms: env_or("VERITAS_STEP_TIMEOUT_MS", defaults.orchestration.timeout_ms),
            global_deadline_ms: env_or(
                "VERITAS_GLOBAL_DEADLINE_MS",
                defaults.orchestration.global_deadline_ms,
            ),
            max_concurrent_steps: env_or(
                "VERITAS_MAX_CONCURRENT_STEPS",
                defaults.orchestration.max_concurrent_steps,
            ),
            halt_on_fatal: env_or("VERITAS_HALT_ON_FATAL", defaults.orchestration.halt_on_fatal),
            late_fatal_policy: env_or::<LateFatalPolicy>(
                "VERITAS_LATE_FATAL_POLICY",
                defaults.orchestration.late_fatal_policy,
            ),
        };

        let monitoring = MonitoringSettings {
            capacity: env_or("VERITAS_MONITORING_CAPACITY", defaults.monitoring.capacity),
            window_secs: env_or("VERITAS_MONITORING_WINDOW_SECS", defaults.monitoring.window_secs),
        };

        let mut alert_rules = defaults.alert_rules;
        if let Some(rule) = alert_rules.high_error_rate.as_mut() {
            rule.threshold = env_or("VERITAS_ALERT_MIN_SUCCESS_RATE", rule.threshold);
            rule.min_samples = env_or("VERITAS_ALERT_MIN_SAMPLES", rule.min_samples);
        }
        if let Some(rule) = alert_rules.low_confidence.as_mut() {
            rule.min_samples = env_or("VERITAS_ALERT_MIN_SAMPLES", rule.min_samples);
        }
        if let Some(rule) = alert_rules.slow_validation.as_mut() {
            rule.threshold_ms = env_or("VERITAS_ALERT_SLOW_MS", rule.threshold_ms);
        }

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            to_file: env_or("LOG_TO_FILE", false),
            file_path: env::var("LOG_FILE_PATH").ok(),
        };

        let config = Config {
            veritas,
            orchestration,
            thresholds: defaults.thresholds,
            scoring: defaults.scoring,
            monitoring,
            alert_rules,
            logging,
        };
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let mut file = File::open(path).map_err(|e| {
            AppError::Config(format!("Failed to open config file: {}", e))
        })?;

        let mut contents = String::new();
        file.read_to_string(&mut contents).map_err(|e| {
            AppError::Config(format!("Failed to read config file: {}", e))
        })?;

        let config: Config = serde_json::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file: {}", e))
        })?;
        config.validate()?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> AppResult<()> {
        let contents = serde_json::to_string_pretty(self).map_err(|e| {
            AppError::Config(format!("Failed to serialize config: {}", e))
        })?;

        std::fs::write(path, contents).map_err(|e| {
            AppError::Config(format!("Failed to write config file: {}", e))
        })?;

        Ok(())
    }

    /// Reject configurations no component would accept
    pub fn validate(&self) -> AppResult<()> {
        self.orchestration.validate()?;
        self.thresholds.validate()?;
        self.scoring.validate()?;
        self.monitoring.validate()?;
        self.alert_rules.validate()?;

        if self.logging.to_file && self.logging.file_path.is_none() {
            return Err(AppError::Config(
                "LOG_TO_FILE is set but no log file path was given".to_string(),
            ));
        }
        Ok(())
    }

    /// Initialize logging based on configuration
    pub fn init_logging(&self) -> AppResult<()> {
        let mut builder = env_logger::Builder::new();

        // Set log level
        let log_level = match self.logging.level.to_lowercase().as_str() {
            "trace" => log::LevelFilter::Trace,
            "debug" => log::LevelFilter::Debug,
            "info" => log::LevelFilter::Info,
            "warn" => log::LevelFilter::Warn,
            "error" => log::LevelFilter::Error,
            "off" => log::LevelFilter::Off,
            _ => log::LevelFilter::Info,
        };

        builder.filter_level(log_level);

        // Configure output
        if self.logging.to_file {
            if let Some(file_path) = &self.logging.file_path {
                let file = File::create(file_path).map_err(|e| {
                    AppError::Config(format!("Failed to create log file: {}", e))
                })?;

                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
        }

        builder
            .try_init()
            .map_err(|e| AppError::Config(format!("Failed to initialize logging: {}", e)))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            veritas: VeritasConfig::default(),
            orchestration: OrchestratorConfig::default(),
            thresholds: DiscrepancyThresholds::default(),
            scoring: ScoreWeights::default(),
            monitoring: MonitoringSettings::default(),
            alert_rules: AlertRuleConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Whether callers should run Veritas at all
pub fn is_veritas_enabled(config: &Config) -> bool {
    config.veritas.enabled
}
