//! Configuration types for the agent canary
//!
//! This module defines the configuration structures and validation logic.

use crate::error::CanaryError;
use crate::faults::FaultInjectionConfig;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Provider selection for every agent built from this configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentMode {
    /// Deterministic simulated providers, fault injection available
    Mock,
    /// Real providers, fault injection ignored
    Real,
}

impl fmt::Display for AgentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentMode::Mock => f.write_str("mock"),
            AgentMode::Real => f.write_str("real"),
        }
    }
}

impl FromStr for AgentMode {
    type Err = CanaryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mock" => Ok(AgentMode::Mock),
            "real" => Ok(AgentMode::Real),
            other => Err(CanaryError::ConfigurationError(format!(
                "Unknown mode: {}. Must be 'mock' or 'real'",
                other
            ))),
        }
    }
}

/// Semantic role of an agent's `invoke_agent` span
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AgentSpanKind {
    /// In-process agent
    #[default]
    Internal,
    /// Remote agent service called by this process
    Client,
    Server,
    Producer,
    Consumer,
}

impl AgentSpanKind {
    /// Parse a span kind name, ignoring case
    ///
    /// Returns `None` for names outside the enumerated set.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "INTERNAL" => Some(AgentSpanKind::Internal),
            "CLIENT" => Some(AgentSpanKind::Client),
            "SERVER" => Some(AgentSpanKind::Server),
            "PRODUCER" => Some(AgentSpanKind::Producer),
            "CONSUMER" => Some(AgentSpanKind::Consumer),
            _ => None,
        }
    }
}

impl From<AgentSpanKind> for opentelemetry::trace::SpanKind {
    fn from(kind: AgentSpanKind) -> Self {
        use opentelemetry::trace::SpanKind;
        match kind {
            AgentSpanKind::Internal => SpanKind::Internal,
            AgentSpanKind::Client => SpanKind::Client,
            AgentSpanKind::Server => SpanKind::Server,
            AgentSpanKind::Producer => SpanKind::Producer,
            AgentSpanKind::Consumer => SpanKind::Consumer,
        }
    }
}

/// One node of the agent hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentNodeConfig {
    /// Unique agent identifier (default: "canary_001")
    #[serde(default = "default_agent_id")]
    pub agent_id: String,
    /// Human-readable agent name, also the child lookup key (default: "Canary Agent")
    #[serde(default = "default_agent_name")]
    pub agent_name: String,
    /// Span kind name; unknown names leave the agent INTERNAL
    #[serde(default)]
    pub span_kind: Option<String>,
    /// Child agents invoked through `invoke_child_agent`
    #[serde(default)]
    pub children: Vec<AgentNodeConfig>,
}

fn default_agent_id() -> String {
    "canary_001".to_string()
}

fn default_agent_name() -> String {
    "Canary Agent".to_string()
}

impl AgentNodeConfig {
    pub fn new(agent_id: impl Into<String>, agent_name: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            agent_name: agent_name.into(),
            span_kind: None,
            children: Vec::new(),
        }
    }

    pub fn with_span_kind(mut self, span_kind: impl Into<String>) -> Self {
        self.span_kind = Some(span_kind.into());
        self
    }

    pub fn with_child(mut self, child: AgentNodeConfig) -> Self {
        self.children.push(child);
        self
    }
}

impl Default for AgentNodeConfig {
    fn default() -> Self {
        Self::new(default_agent_id(), default_agent_name())
    }
}

/// OTLP transport
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtlpProtocol {
    #[default]
    Grpc,
    Http,
}

impl FromStr for OtlpProtocol {
    type Err = CanaryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "grpc" => Ok(OtlpProtocol::Grpc),
            "http" | "http/protobuf" => Ok(OtlpProtocol::Http),
            other => Err(CanaryError::ConfigurationError(format!(
                "otlp.protocol must be 'grpc' or 'http', got: '{}'",
                other
            ))),
        }
    }
}

/// OpenTelemetry export settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OtlpSettings {
    /// Collector endpoint (e.g. "http://localhost:4317")
    pub endpoint: String,
    /// Transport (default: grpc)
    pub protocol: OtlpProtocol,
    /// `service.name` resource attribute (default: root agent name)
    pub service_name: Option<String>,
    /// Export enabled (default: true)
    pub enabled: bool,
    /// Metric export interval in milliseconds (default: 2000)
    pub export_interval_ms: u64,
}

impl OtlpSettings {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            protocol: OtlpProtocol::Grpc,
            service_name: None,
            enabled: true,
            export_interval_ms: 2000,
        }
    }

    /// Validate the export settings
    ///
    /// The endpoint is handed to the exporter as-is; an unreachable or malformed
    /// endpoint surfaces when the pipeline is built, not here.
    pub fn validate(&self) -> Result<(), CanaryError> {
        if self.endpoint.trim().is_empty() {
            return Err(CanaryError::ConfigurationError(
                "otlp.endpoint cannot be empty".to_string(),
            ));
        }
        if self.enabled && self.export_interval_ms == 0 {
            return Err(CanaryError::ConfigurationError(
                "otlp.export_interval_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Base settings for mock providers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MockSettings {
    /// Simulated LLM latency in milliseconds (default: 500)
    pub llm_latency_ms: u64,
    /// Simulated tool latency in milliseconds (default: 200)
    pub tool_latency_ms: u64,
    /// Tool failure probability (default: 0.0)
    pub tool_failure_rate: f64,
    /// LLM failure probability (default: 0.0)
    pub llm_failure_rate: f64,
}

impl Default for MockSettings {
    fn default() -> Self {
        Self {
            llm_latency_ms: 500,
            tool_latency_ms: 200,
            tool_failure_rate: 0.0,
            llm_failure_rate: 0.0,
        }
    }
}

impl MockSettings {
    /// Zero-latency, failure-free settings
    pub fn instant() -> Self {
        Self {
            llm_latency_ms: 0,
            tool_latency_ms: 0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), CanaryError> {
        validate_rate("mock_settings.tool_failure_rate", self.tool_failure_rate)?;
        validate_rate("mock_settings.llm_failure_rate", self.llm_failure_rate)
    }
}

/// Settings for real providers
#[derive(Debug, Clone, Deserialize)]
pub struct RealSettings {
    /// LLM API key
    pub api_key: Option<SecretString>,
    /// Model requested from the LLM (default: "gpt-4")
    pub model: String,
}

impl Default for RealSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4".to_string(),
        }
    }
}

/// Telemetry validation backends
#[derive(Debug, Clone, Deserialize)]
pub struct ValidationSettings {
    /// Prometheus base URL (e.g. "http://localhost:9090")
    pub prometheus_url: String,
    /// OpenSearch base URL (e.g. "https://localhost:9200")
    pub opensearch_url: String,
    /// OpenSearch user (default: "admin")
    pub opensearch_user: String,
    /// OpenSearch password
    pub opensearch_password: SecretString,
    /// Wait before querying so telemetry can be ingested (default: 15)
    pub ingestion_wait_secs: u64,
    /// Per-request timeout (default: 10)
    pub timeout_secs: u64,
}

impl ValidationSettings {
    pub fn validate(&self) -> Result<(), CanaryError> {
        if !self.prometheus_url.is_empty() {
            validate_http_url("validation.prometheus_url", &self.prometheus_url)?;
        }
        if !self.opensearch_url.is_empty() {
            validate_http_url("validation.opensearch_url", &self.opensearch_url)?;
        }
        if self.timeout_secs == 0 {
            return Err(CanaryError::ConfigurationError(
                "validation.timeout_secs must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (default: "info")
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

impl LoggingSettings {
    pub fn validate(&self) -> Result<(), CanaryError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.level.to_lowercase().as_str()) {
            return Err(CanaryError::ConfigurationError(format!(
                "logging.level must be one of {:?}, got: '{}'",
                valid_levels, self.level
            )));
        }
        Ok(())
    }
}

/// Complete canary configuration
#[derive(Debug, Clone)]
pub struct CanaryConfig {
    pub mode: AgentMode,
    /// Root of the agent hierarchy
    pub agent: AgentNodeConfig,
    pub otlp: OtlpSettings,
    /// Scenario names, executed in order
    pub scenarios: Vec<String>,
    pub mock_settings: MockSettings,
    pub real_settings: RealSettings,
    pub validation: Option<ValidationSettings>,
    pub fault_injection: FaultInjectionConfig,
    pub logging: LoggingSettings,
}

impl CanaryConfig {
    /// Create a configuration with defaults for every optional section
    pub fn new(
        mode: AgentMode,
        agent: AgentNodeConfig,
        otlp_endpoint: impl Into<String>,
        scenarios: Vec<String>,
    ) -> Self {
        Self {
            mode,
            agent,
            otlp: OtlpSettings::new(otlp_endpoint),
            scenarios,
            mock_settings: MockSettings::default(),
            real_settings: RealSettings::default(),
            validation: None,
            fault_injection: FaultInjectionConfig::disabled(),
            logging: LoggingSettings::default(),
        }
    }

    pub fn with_mock_settings(mut self, settings: MockSettings) -> Self {
        self.mock_settings = settings;
        self
    }

    pub fn with_fault_injection(mut self, fault_injection: FaultInjectionConfig) -> Self {
        self.fault_injection = fault_injection;
        self
    }

    pub fn with_validation(mut self, validation: ValidationSettings) -> Self {
        self.validation = Some(validation);
        self
    }

    /// Service name used for exported telemetry
    pub fn service_name(&self) -> &str {
        self.otlp
            .service_name
            .as_deref()
            .unwrap_or(&self.agent.agent_name)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if:
    /// - `scenarios` is empty
    /// - a failure rate is outside `[0.0, 1.0]`
    /// - the OTLP endpoint is empty
    /// - a validation URL is not an http(s) URL
    /// - the log level is unknown
    pub fn validate(&self) -> Result<(), CanaryError> {
        if self.scenarios.is_empty() {
            return Err(CanaryError::ConfigurationError(
                "'scenarios' list cannot be empty".to_string(),
            ));
        }

        self.otlp.validate()?;

        if self.mode == AgentMode::Mock {
            self.mock_settings.validate()?;
        }

        if let Some(validation) = &self.validation {
            validation.validate()?;
        }

        self.logging.validate()
    }
}

fn validate_rate(name: &str, rate: f64) -> Result<(), CanaryError> {
    if !(0.0..=1.0).contains(&rate) {
        return Err(CanaryError::ConfigurationError(format!(
            "'{}' must be between 0.0 and 1.0, got {}",
            name, rate
        )));
    }
    Ok(())
}

fn validate_http_url(name: &str, value: &str) -> Result<(), CanaryError> {
    let parsed = url::Url::parse(value).map_err(|e| {
        CanaryError::ConfigurationError(format!("{} is not a valid URL '{}': {}", name, value, e))
    })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(CanaryError::ConfigurationError(format!(
            "{} must start with 'https://' or 'http://', got: '{}'",
            name, value
        )));
    }
    Ok(())
}
