// src/validation/orchestrator.rs
//
// Runs domain validators concurrently under a per-step timeout and one global
// deadline, then scores whatever settled in time.
//
// Cancellation is fire-and-forget: once a step times out or the run closes,
// the validator task is detached, not aborted. Its eventual result is
// observed and discarded, never applied to the returned result.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinError;
use tokio::time::{sleep, timeout, Duration, Instant};

use crate::domain::errors::{ValidationError, ValidatorResult};
use crate::domain::inputs::{DomainInput, DomainInputs};
use crate::domain::models::{
    Alert, DataQualitySummary, Domain, OrchestrationResult, StepReport, StepStatus,
    ValidationMetricRecord, ValidationResult,
};
use crate::domain::service::{ReliabilityTracker, Validator};
use crate::infrastructure::validators::ValidatorSet;
use crate::monitoring::VeritasMonitoring;
use crate::validation::alerts::generate_alerts;
use crate::validation::confidence::ConfidenceScoreCalculator;
use crate::validation::discrepancy::DiscrepancyThresholds;

pub const DEFAULT_STEP_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_GLOBAL_DEADLINE_MS: u64 = 15_000;

/// What to do with fatal alerts carried by results that arrive after their
/// step timed out or the run closed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LateFatalPolicy {
    /// Log and drop
    Discard,
    /// Publish on the late-alert channel
    Surface,
}

impl std::str::FromStr for LateFatalPolicy {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "discard" => Ok(LateFatalPolicy::Discard),
            "surface" => Ok(LateFatalPolicy::Surface),
            other => Err(ValidationError::Configuration(format!(
                "unknown late fatal policy: {}",
                other
            ))),
        }
    }
}

/// Orchestration timing and halting policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OrchestratorConfig {
    /// Per-step timeout
    pub timeout_ms: u64,
    /// Deadline shared by the whole run
    pub global_deadline_ms: u64,
    pub max_concurrent_steps: usize,
    /// Stop the run as soon as a result carries a fatal alert
    pub halt_on_fatal: bool,
    pub late_fatal_policy: LateFatalPolicy,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_STEP_TIMEOUT_MS,
            global_deadline_ms: DEFAULT_GLOBAL_DEADLINE_MS,
            max_concurrent_steps: Domain::ALL.len(),
            halt_on_fatal: false,
            late_fatal_policy: LateFatalPolicy::Discard,
        }
    }
}

impl OrchestratorConfig {
    pub fn validate(&self) -> ValidatorResult<()> {
        if self.timeout_ms == 0 {
            return Err(ValidationError::Configuration(
                "step timeout must be greater than zero".to_string(),
            ));
        }
        if self.global_deadline_ms == 0 {
            return Err(ValidationError::Configuration(
                "global deadline must be greater than zero".to_string(),
            ));
        }
        if self.max_concurrent_steps == 0 {
            return Err(ValidationError::Configuration(
                "at least one step must be allowed to run".to_string(),
            ));
        }
        if self.timeout_ms > self.global_deadline_ms {
            log::warn!(
                "Step timeout ({}ms) exceeds the global deadline ({}ms); the deadline wins",
                self.timeout_ms,
                self.global_deadline_ms
            );
        }
        Ok(())
    }
}

/// Fatal alert from a result that was discarded as late
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LateAlert {
    pub symbol: String,
    pub domain: Domain,
    pub alert: Alert,
}

/// Set once a run stops accepting step results
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Terminal state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Completed,
    PartiallyCompleted,
    Halted,
    TimedOut,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Completed => "completed",
            RunState::PartiallyCompleted => "partially_completed",
            RunState::Halted => "halted",
            RunState::TimedOut => "timed_out",
        }
    }
}

/// A settled step: the validator's result or why there is none
struct StepMessage {
    domain: Domain,
    outcome: ValidatorResult<ValidationResult>,
    elapsed_ms: u64,
}

/// Collected state of one run
struct RunProgress {
    eligible: usize,
    results: BTreeMap<Domain, ValidationResult>,
    completed_steps: Vec<String>,
    step_reports: Vec<StepReport>,
    errors: Vec<String>,
    current_step: String,
    progress: f64,
}

impl RunProgress {
    fn new(eligible: usize) -> Self {
        Self {
            eligible,
            results: BTreeMap::new(),
            completed_steps: Vec::new(),
            step_reports: Vec::new(),
            errors: Vec::new(),
            current_step: "not_started".to_string(),
            progress: if eligible == 0 { 100.0 } else { 0.0 },
        }
    }

    /// Apply a settled step; returns whether it carried a fatal alert.
    ///
    /// A failed or timed-out step is not turned into an invalid zero-confidence
    /// entry of `results`. It counts toward progress and is listed in `errors`
    /// and `step_reports` only, so `completeness` reflects domains that
    /// actually produced a result.
    fn settle(&mut self, symbol: &str, message: StepMessage) -> bool {
        let StepMessage {
            domain,
            outcome,
            elapsed_ms,
        } = message;

        self.completed_steps.push(domain.to_string());
        self.current_step = domain.to_string();
        self.progress = self.completed_steps.len() as f64 / self.eligible as f64 * 100.0;

        match outcome {
            Ok(result) => {
                log::debug!(
                    "{} step for {} completed in {}ms (confidence {:.1})",
                    domain,
                    symbol,
                    elapsed_ms,
                    result.confidence
                );
                let fatal = result.has_fatal_alert();
                self.step_reports.push(StepReport {
                    domain,
                    status: StepStatus::Completed,
                    elapsed_ms,
                    error: None,
                });
                self.results.insert(domain, result);
                fatal
            }
            Err(error) => {
                let status = match error {
                    ValidationError::ValidatorTimeout { .. } => StepStatus::TimedOut,
                    _ => StepStatus::Failed,
                };
                log::warn!("{} step for {} did not complete ({}): {}", domain, symbol, error.kind(), error);
                self.errors.push(format!("{}: {}", domain, error));
                self.step_reports.push(StepReport {
                    domain,
                    status,
                    elapsed_ms,
                    error: Some(error.to_string()),
                });
                false
            }
        }
    }
}

/// Validation orchestrator
pub struct ValidationOrchestrator {
    validators: ValidatorSet,
    config: OrchestratorConfig,
    calculator: ConfidenceScoreCalculator,
    monitoring: Option<Arc<VeritasMonitoring>>,
    reliability: Option<Arc<dyn ReliabilityTracker>>,
    late_alert_tx: broadcast::Sender<LateAlert>,
}

impl ValidationOrchestrator {
    /// Fails fast on an invalid configuration
    pub fn new(validators: ValidatorSet, config: OrchestratorConfig) -> ValidatorResult<Self> {
        config.validate()?;
        let (late_alert_tx, _) = broadcast::channel(100);

        Ok(Self {
            validators,
            config,
            calculator: ConfidenceScoreCalculator::default(),
            monitoring: None,
            reliability: None,
            late_alert_tx,
        })
    }

    pub fn with_calculator(mut self, calculator: ConfidenceScoreCalculator) -> Self {
        self.calculator = calculator;
        self
    }

    /// Record every finished run into `monitoring`
    pub fn with_monitoring(mut self, monitoring: Arc<VeritasMonitoring>) -> Self {
        self.monitoring = Some(monitoring);
        self
    }

    pub fn with_reliability_tracker(mut self, tracker: Arc<dyn ReliabilityTracker>) -> Self {
        self.reliability = Some(tracker);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Receive fatal alerts from late results under `LateFatalPolicy::Surface`
    pub fn subscribe_late_alerts(&self) -> broadcast::Receiver<LateAlert> {
        self.late_alert_tx.subscribe()
    }

    /// Validate every domain with an input. Never fails: timeouts, validator
    /// errors and panics all end up in the returned result.
    pub async fn orchestrate_validation(&self, symbol: &str, inputs: DomainInputs) -> OrchestrationResult {
        let start_time = Utc::now();
        let started = Instant::now();

        let mut pending: VecDeque<DomainInput> = inputs.into_steps().into();
        let eligible = pending.len();
        let mut run = RunProgress::new(eligible);
        log::info!("Starting validation of {} across {} domain(s)", symbol, eligible);

        let cancel = CancellationFlag::new();
        let (tx, mut rx) = mpsc::channel::<StepMessage>(eligible.max(1));
        let deadline = sleep(Duration::from_millis(self.config.global_deadline_ms));
        tokio::pin!(deadline);

        let mut in_flight = 0usize;
        let mut halted = false;
        let mut timed_out = false;

        loop {
            while in_flight < self.config.max_concurrent_steps {
                let input = match pending.pop_front() {
                    Some(input) => input,
                    None => break,
                };
                let domain = input.domain();

                match self.validators.get(domain) {
                    Some(validator) => {
                        self.spawn_step(symbol, validator, input, tx.clone(), cancel.clone());
                        in_flight += 1;
                    }
                    None => {
                        run.settle(
                            symbol,
                            StepMessage {
                                domain,
                                outcome: Err(ValidationError::Validator(format!(
                                    "no validator registered for {}",
                                    domain
                                ))),
                                elapsed_ms: 0,
                            },
                        );
                    }
                }
            }

            if in_flight == 0 {
                break;
            }

            tokio::select! {
                message = rx.recv() => {
                    let message = match message {
                        Some(message) => message,
                        None => break,
                    };
                    in_flight -= 1;

                    let domain = message.domain;
                    if run.settle(symbol, message) && self.config.halt_on_fatal {
                        let error = ValidationError::FatalData(format!(
                            "{} reported logically impossible data",
                            domain
                        ));
                        log::warn!("Halting validation of {}: {}", symbol, error);
                        run.errors.push(error.to_string());
                        halted = true;
                        break;
                    }
                }
                _ = &mut deadline => {
                    let error = ValidationError::GlobalDeadlineExceeded {
                        deadline_ms: self.config.global_deadline_ms,
                    };
                    log::warn!(
                        "Validation of {} hit its deadline with {} step(s) in flight",
                        symbol,
                        in_flight
                    );
                    run.errors.push(error.to_string());
                    timed_out = true;
                    halted = true;
                    break;
                }
            }
        }

        // anything still running is now late
        cancel.cancel();
        rx.close();
        while let Ok(message) = rx.try_recv() {
            discard_late(
                symbol,
                message.domain,
                message.outcome,
                self.config.late_fatal_policy,
                &self.late_alert_tx,
            );
        }

        if !pending.is_empty() {
            log::info!(
                "{} step(s) for {} were never scheduled",
                pending.len(),
                symbol
            );
        }

        let result = self.finish(symbol, run, halted, timed_out, start_time, started);

        if let Some(monitoring) = &self.monitoring {
            monitoring.record_validation(ValidationMetricRecord::from_orchestration(&result));
        }

        log::info!(
            "Validation of {} finished as {} in {}ms: score {} ({})",
            symbol,
            result.current_step,
            result.duration_ms,
            result.confidence_score.overall_score,
            result.confidence_score.confidence_level.as_str()
        );

        result
    }

    fn finish(
        &self,
        symbol: &str,
        run: RunProgress,
        halted: bool,
        timed_out: bool,
        start_time: chrono::DateTime<Utc>,
        started: Instant,
    ) -> OrchestrationResult {
        let completed = run.completed_steps.len() == run.eligible;

        let state = if timed_out {
            RunState::TimedOut
        } else if halted {
            RunState::Halted
        } else if run.errors.is_empty() {
            RunState::Completed
        } else {
            RunState::PartiallyCompleted
        };

        let success = completed && !halted && !timed_out && run.errors.is_empty() && !run.results.is_empty();
        let confidence_score = self.calculator.calculate(&run.results, self.reliability.as_deref());
        let alerts = generate_alerts(&run.results);
        let data_quality_summary = summarize_quality(&run.results);

        OrchestrationResult {
            symbol: symbol.to_string(),
            success,
            completed,
            halted,
            timed_out,
            progress: run.progress,
            current_step: state.as_str().to_string(),
            completed_steps: run.completed_steps,
            step_reports: run.step_reports,
            results: run.results,
            alerts,
            confidence_score,
            data_quality_summary,
            start_time,
            end_time: Utc::now(),
            duration_ms: started.elapsed().as_millis() as u64,
            errors: run.errors,
        }
    }

    fn spawn_step(
        &self,
        symbol: &str,
        validator: Arc<dyn Validator>,
        input: DomainInput,
        tx: mpsc::Sender<StepMessage>,
        cancel: CancellationFlag,
    ) {
        let domain = input.domain();
        let timeout_ms = self.config.timeout_ms;
        let policy = self.config.late_fatal_policy;
        let late_alert_tx = self.late_alert_tx.clone();
        let symbol = symbol.to_string();

        let work_symbol = symbol.clone();
        let mut work = tokio::spawn(async move { validator.validate(&work_symbol, &input).await });

        tokio::spawn(async move {
            let started = Instant::now();
            let (outcome, step_timed_out) = match timeout(Duration::from_millis(timeout_ms), &mut work).await {
                Ok(joined) => (flatten_join(joined), false),
                Err(_) => (
                    Err(ValidationError::ValidatorTimeout { domain, timeout_ms }),
                    true,
                ),
            };
            let elapsed_ms = started.elapsed().as_millis() as u64;

            let undelivered = if cancel.is_cancelled() {
                Some(outcome)
            } else {
                tx.send(StepMessage {
                    domain,
                    outcome,
                    elapsed_ms,
                })
                .await
                .err()
                .map(|e| e.0.outcome)
            };

            if step_timed_out {
                // keep watching the detached validator so its late value is observed
                let late = flatten_join(work.await);
                discard_late(&symbol, domain, late, policy, &late_alert_tx);
            } else if let Some(outcome) = undelivered {
                discard_late(&symbol, domain, outcome, policy, &late_alert_tx);
            }
        });
    }
}

fn flatten_join(joined: Result<ValidatorResult<ValidationResult>, JoinError>) -> ValidatorResult<ValidationResult> {
    match joined {
        Ok(outcome) => outcome,
        Err(e) if e.is_panic() => {
            let payload = e.into_panic();
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(ValidationError::Validator(format!("validator panicked: {}", message)))
        }
        Err(_) => Err(ValidationError::Validator("validator task was cancelled".to_string())),
    }
}

fn discard_late(
    symbol: &str,
    domain: Domain,
    outcome: ValidatorResult<ValidationResult>,
    policy: LateFatalPolicy,
    late_alert_tx: &broadcast::Sender<LateAlert>,
) {
    let result = match outcome {
        Ok(result) => result,
        Err(e) => {
            log::debug!("Late {} step for {} ended without a result: {}", domain, symbol, e);
            return;
        }
    };

    let fatal: Vec<Alert> = result.alerts.into_iter().filter(Alert::is_fatal).collect();
    if fatal.is_empty() {
        log::debug!("Discarded late {} result for {}", domain, symbol);
        return;
    }

    match policy {
        LateFatalPolicy::Discard => {
            log::warn!(
                "Discarded late {} result for {} carrying {} fatal alert(s)",
                domain,
                symbol,
                fatal.len()
            );
        }
        LateFatalPolicy::Surface => {
            for alert in fatal {
                log::warn!("Late fatal alert for {} from {}: {}", symbol, domain, alert.message);
                // no subscribers is not an error
                let _ = late_alert_tx.send(LateAlert {
                    symbol: symbol.to_string(),
                    domain,
                    alert,
                });
            }
        }
    }
}

/// Merge per-domain quality summaries, prefixing checks with their domain
fn summarize_quality(results: &BTreeMap<Domain, ValidationResult>) -> DataQualitySummary {
    if results.is_empty() {
        return DataQualitySummary::default();
    }

    let mut summary = DataQualitySummary::default();
    let mut score_sum = 0.0;
    for (domain, result) in results {
        let quality = &result.data_quality_summary;
        score_sum += quality.overall_score;
        summary
            .passed_checks
            .extend(quality.passed_checks.iter().map(|c| format!("{}.{}", domain, c)));
        summary
            .failed_checks
            .extend(quality.failed_checks.iter().map(|c| format!("{}.{}", domain, c)));
    }
    summary.overall_score = (score_sum / results.len() as f64).clamp(0.0, 100.0);
    summary
}

/// Run the standard validators over `inputs`. Never fails; an invalid
/// configuration is reported in `errors` without running any step.
pub async fn orchestrate_validation(
    symbol: &str,
    inputs: DomainInputs,
    config: Option<OrchestratorConfig>,
) -> OrchestrationResult {
    let config = config.unwrap_or_default();
    let validators = ValidatorSet::standard(&DiscrepancyThresholds::default());

    match ValidationOrchestrator::new(validators, config) {
        Ok(orchestrator) => orchestrator.orchestrate_validation(symbol, inputs).await,
        Err(error) => {
            log::error!("Refusing to validate {}: {}", symbol, error);
            let fallback = ValidationOrchestrator {
                validators: ValidatorSet::new(),
                config: OrchestratorConfig::default(),
                calculator: ConfidenceScoreCalculator::default(),
                monitoring: None,
                reliability: None,
                late_alert_tx: broadcast::channel(1).0,
            };
            let mut run = RunProgress::new(0);
            run.errors.push(error.to_string());
            let mut result = fallback.finish(symbol, run, false, false, Utc::now(), Instant::now());
            result.completed = false;
            result.progress = 0.0;
            result
        }
    }
}
