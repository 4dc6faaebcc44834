//! Canary runner
//!
//! Drives one canary run: load configuration, build the agent hierarchy,
//! execute the configured scenarios in order, optionally validate telemetry
//! and produce a `RunSummary`.

pub mod summary;

pub use summary::{RunSummary, ValidationOutcome};

use crate::agent::{AgentConfig, AgentFactory, ConfigurableAgent};
use crate::config::{load_from_yaml, CanaryConfig, ValidationSettings};
use crate::error::CanaryError;
use crate::observability::ObservabilityManager;
use crate::scenarios::{scenario_for, ScenarioResult};
use crate::validator::{HttpTelemetryValidator, TelemetryValidator};
use chrono::Utc;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

/// Progress of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Init,
    ConfigLoaded,
    AgentBuilt,
    ScenariosExecuted,
    TelemetryValidated,
    Reported,
    /// Configuration or agent construction failed; no scenario ran
    Failed,
}

/// Canary run orchestrator
pub struct CanaryRunner {
    config_path: Option<PathBuf>,
    config: Option<CanaryConfig>,
    observability: ObservabilityManager,
    validator: Option<Box<dyn TelemetryValidator>>,
    state: RunnerState,
}

impl CanaryRunner {
    /// Runner that loads its configuration from a YAML file
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: Some(path.into()),
            config: None,
            observability: ObservabilityManager::disabled(),
            validator: None,
            state: RunnerState::Init,
        }
    }

    /// Runner for an already loaded configuration
    ///
    /// The configuration is validated again when the run starts.
    pub fn from_config(config: CanaryConfig) -> Self {
        Self {
            config_path: None,
            config: Some(config),
            observability: ObservabilityManager::disabled(),
            validator: None,
            state: RunnerState::Init,
        }
    }

    /// Report agent telemetry to `observability` instead of discarding it
    pub fn with_observability(mut self, observability: ObservabilityManager) -> Self {
        self.observability = observability;
        self
    }

    /// Validate with `validator` instead of the HTTP validator
    ///
    /// Validation still only runs when the configuration has a `validation`
    /// section.
    pub fn with_validator(mut self, validator: Box<dyn TelemetryValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn config(&self) -> Option<&CanaryConfig> {
        self.config.as_ref()
    }

    /// Execute a complete run
    ///
    /// # Errors
    ///
    /// Returns the configuration or agent construction error that stopped the
    /// run before any scenario executed. Scenario and validation failures are
    /// reported in the summary instead.
    pub fn run(&mut self) -> Result<RunSummary, CanaryError> {
        let started_at = Utc::now();

        let config = match self.load_config() {
            Ok(config) => config,
            Err(e) => {
                error!(error = %e, "Failed to load configuration");
                self.state = RunnerState::Failed;
                return Err(e);
            }
        };
        self.state = RunnerState::ConfigLoaded;
        info!(
            mode = %config.mode,
            agent = %config.agent.agent_name,
            scenarios = config.scenarios.len(),
            fault_injection = config.fault_injection.enabled,
            "Configuration loaded"
        );

        let factory = AgentFactory::new(self.observability.clone());
        let mut agent = match build_agent(&factory, &config) {
            Ok(agent) => agent,
            Err(e) => {
                error!(error = %e, "Failed to create agent");
                self.state = RunnerState::Failed;
                return Err(e);
            }
        };
        self.state = RunnerState::AgentBuilt;
        info!(
            agent_id = agent.agent_id(),
            agent_name = agent.agent_name(),
            children = agent.child_names().len(),
            "Agent created"
        );

        let results = execute_scenarios(&factory, &config, &mut agent);
        self.state = RunnerState::ScenariosExecuted;

        if let Err(e) = self.observability.flush() {
            warn!(error = %e, "Failed to flush telemetry");
        }

        let mut summary = RunSummary::new(started_at, results);
        info!(
            total = summary.total,
            passed = summary.passed,
            failed = summary.failed,
            duration_seconds = summary.total_duration_seconds,
            "Scenarios executed"
        );

        if let Some(settings) = &config.validation {
            if !summary.results.is_empty() {
                summary.validation = self.validate_telemetry(settings, &config, &summary.results);
                self.state = RunnerState::TelemetryValidated;
            }
        }

        self.state = RunnerState::Reported;
        Ok(summary)
    }

    /// Run and map the outcome to a process exit code
    pub fn run_exit_code(&mut self) -> i32 {
        match self.run() {
            Ok(summary) => summary.exit_code(),
            Err(_) => 1,
        }
    }

    fn load_config(&mut self) -> Result<CanaryConfig, CanaryError> {
        if let Some(config) = &self.config {
            config.validate()?;
            return Ok(config.clone());
        }

        let path = self.config_path.as_ref().ok_or_else(|| {
            CanaryError::ConfigurationError("No configuration source given".to_string())
        })?;
        info!(path = %path.display(), "Loading configuration");
        let config = load_from_yaml(path)?;
        self.config = Some(config.clone());
        Ok(config)
    }

    fn validate_telemetry(
        &mut self,
        settings: &ValidationSettings,
        config: &CanaryConfig,
        results: &[ScenarioResult],
    ) -> Vec<ValidationOutcome> {
        let validator = match self.validator.take() {
            Some(validator) => validator,
            None => match HttpTelemetryValidator::new(settings) {
                Ok(validator) => Box::new(validator) as Box<dyn TelemetryValidator>,
                Err(e) => {
                    warn!(error = %e, "Telemetry validation skipped");
                    return Vec::new();
                }
            },
        };

        if settings.ingestion_wait_secs > 0 {
            info!(
                wait_secs = settings.ingestion_wait_secs,
                "Waiting for telemetry ingestion"
            );
            std::thread::sleep(Duration::from_secs(settings.ingestion_wait_secs));
        }

        let service_name = config.service_name();
        let mut outcomes = Vec::new();
        for result in results.iter().filter(|r| r.success) {
            let Some(conversation_id) = &result.conversation_id else {
                continue;
            };

            let outcome = ValidationOutcome {
                scenario_name: result.scenario_name.clone(),
                conversation_id: conversation_id.clone(),
                metric_errors: guarded("Metrics", || {
                    validator.validate_metrics(conversation_id, Some(service_name))
                }),
                trace_errors: guarded("Trace", || validator.validate_traces(conversation_id)),
            };

            if outcome.is_clean() {
                info!(scenario = %outcome.scenario_name, "Telemetry validated");
            } else {
                for error in outcome.metric_errors.iter().chain(&outcome.trace_errors) {
                    warn!(scenario = %outcome.scenario_name, "Telemetry validation error: {}", error);
                }
            }
            outcomes.push(outcome);
        }

        self.validator = Some(validator);
        outcomes
    }
}

/// Build the configured agent hierarchy
pub fn build_agent(
    factory: &AgentFactory,
    config: &CanaryConfig,
) -> Result<ConfigurableAgent, CanaryError> {
    let base = AgentConfig {
        mode: config.mode,
        agent_id: config.agent.agent_id.clone(),
        agent_name: config.agent.agent_name.clone(),
        mock: config.mock_settings.clone(),
        real: config.real_settings.clone(),
    };
    factory.build_hierarchy(&config.agent, &base, Some(&config.fault_injection))
}

/// Run every configured scenario in order
///
/// Unknown names are skipped. A scenario that returns an error or panics
/// becomes a failed result with zero duration; the remaining scenarios still
/// run.
pub fn execute_scenarios(
    factory: &AgentFactory,
    config: &CanaryConfig,
    agent: &mut ConfigurableAgent,
) -> Vec<ScenarioResult> {
    let fault_enabled = config.fault_injection.enabled;
    let fault_profiles = config.fault_injection.active_profile_names();
    let mut results = Vec::with_capacity(config.scenarios.len());

    for name in &config.scenarios {
        let Some(scenario) = scenario_for(name, factory) else {
            warn!(scenario = %name, "Unknown scenario, skipping");
            continue;
        };

        info!(
            scenario = scenario.name(),
            description = scenario.description(),
            "Running scenario"
        );

        let result = match catch_unwind(AssertUnwindSafe(|| scenario.execute(agent))) {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => ScenarioResult::failed(scenario.name(), 0.0, e.to_string(), None),
            Err(payload) => {
                ScenarioResult::failed(scenario.name(), 0.0, panic_message(payload.as_ref()), None)
            }
        }
        .with_fault_context(fault_enabled, fault_profiles.clone());

        if result.success {
            info!(
                scenario = %result.scenario_name,
                duration_seconds = result.duration_seconds,
                "PASS"
            );
        } else {
            warn!(
                scenario = %result.scenario_name,
                duration_seconds = result.duration_seconds,
                error = result.error_message.as_deref().unwrap_or(""),
                "FAIL"
            );
        }
        results.push(result);
    }

    results
}

/// Run one validator check, turning a panic into an error string
fn guarded(check: &str, call: impl FnOnce() -> Vec<String>) -> Vec<String> {
    catch_unwind(AssertUnwindSafe(call)).unwrap_or_else(|payload| {
        let message = match panic_detail(payload.as_ref()) {
            Some(detail) => format!("{} validation panicked: {}", check, detail),
            None => format!("{} validation panicked", check),
        };
        warn!(error = %message, "Telemetry validator panicked");
        vec![message]
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    match panic_detail(payload) {
        Some(detail) => format!("Scenario panicked: {}", detail),
        None => "Scenario panicked".to_string(),
    }
}

fn panic_detail(payload: &(dyn Any + Send)) -> Option<&str> {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
}
