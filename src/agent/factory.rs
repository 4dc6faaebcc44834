//! Agent factory
//!
//! Selects providers for an agent from its configuration, merges enabled
//! fault profiles into mock provider construction and builds agent
//! hierarchies.

use super::ConfigurableAgent;
use crate::config::{AgentMode, AgentNodeConfig, AgentSpanKind, MockSettings, RealSettings};
use crate::error::CanaryError;
use crate::faults::{
    FailurePattern, FaultInjectionConfig, HIGH_LATENCY, INTERMITTENT_FAILURES, PARTIAL_RESPONSES,
    RATE_LIMITS, TOKEN_LIMITS,
};
use crate::observability::ObservabilityManager;
use crate::providers::{MockLlmProvider, MockToolProvider, RealLlmProvider, RealToolProvider};
use tracing::{debug, warn};

/// Settings for building one agent
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub mode: AgentMode,
    pub agent_id: String,
    pub agent_name: String,
    /// Base mock provider settings, before fault profiles
    pub mock: MockSettings,
    pub real: RealSettings,
}

impl AgentConfig {
    pub fn mock(
        agent_id: impl Into<String>,
        agent_name: impl Into<String>,
        mock: MockSettings,
    ) -> Self {
        Self {
            mode: AgentMode::Mock,
            agent_id: agent_id.into(),
            agent_name: agent_name.into(),
            mock,
            real: RealSettings::default(),
        }
    }

    pub fn real(
        agent_id: impl Into<String>,
        agent_name: impl Into<String>,
        real: RealSettings,
    ) -> Self {
        Self {
            mode: AgentMode::Real,
            agent_id: agent_id.into(),
            agent_name: agent_name.into(),
            mock: MockSettings::default(),
            real,
        }
    }

    /// Same provider settings under another identity
    pub fn for_node(&self, node: &AgentNodeConfig) -> Self {
        Self {
            agent_id: node.agent_id.clone(),
            agent_name: node.agent_name.clone(),
            ..self.clone()
        }
    }
}

/// Factory for creating agents with appropriate providers
#[derive(Debug, Clone)]
pub struct AgentFactory {
    observability: ObservabilityManager,
}

impl AgentFactory {
    /// Create a factory whose agents report to `observability`
    pub fn new(observability: ObservabilityManager) -> Self {
        Self { observability }
    }

    pub fn observability(&self) -> &ObservabilityManager {
        &self.observability
    }

    /// Create an agent with mock providers and no fault profiles
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if a failure rate is outside `[0.0, 1.0]`.
    pub fn create_mock_agent(
        &self,
        agent_id: &str,
        agent_name: &str,
        settings: &MockSettings,
    ) -> Result<ConfigurableAgent, CanaryError> {
        self.create_from_config(&AgentConfig::mock(agent_id, agent_name, settings.clone()), None)
    }

    /// Create an agent with real providers
    pub fn create_real_agent(
        &self,
        agent_id: &str,
        agent_name: &str,
        settings: &RealSettings,
    ) -> ConfigurableAgent {
        let llm = RealLlmProvider::new(settings.api_key.clone(), settings.model.clone());
        ConfigurableAgent::new(
            Box::new(llm),
            Box::new(RealToolProvider::new()),
            agent_id,
            agent_name,
            self.observability.agent_telemetry(),
        )
        .with_model(settings.model.clone())
    }

    /// Create an agent from configuration
    ///
    /// In mock mode, every recognized profile of an enabled `fault_config`
    /// overrides or adds provider parameters on top of `config.mock`. Profiles
    /// compose independently. Real mode ignores `fault_config`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if a merged parameter is out of range.
    pub fn create_from_config(
        &self,
        config: &AgentConfig,
        fault_config: Option<&FaultInjectionConfig>,
    ) -> Result<ConfigurableAgent, CanaryError> {
        match config.mode {
            AgentMode::Mock => {
                let faults = fault_config.filter(|f| f.enabled);
                let (llm, tool) = build_mock_providers(&config.mock, faults)?;
                debug!(
                    agent_id = %config.agent_id,
                    llm_latency_ms = llm.latency().as_millis() as u64,
                    tool_latency_ms = tool.latency().as_millis() as u64,
                    tool_failure_rate = tool.failure_rate(),
                    failure_pattern = %tool.failure_pattern(),
                    "Created mock providers"
                );
                Ok(ConfigurableAgent::new(
                    Box::new(llm),
                    Box::new(tool),
                    config.agent_id.clone(),
                    config.agent_name.clone(),
                    self.observability.agent_telemetry(),
                ))
            }
            AgentMode::Real => {
                if fault_config.is_some_and(|f| f.enabled) {
                    debug!(agent_id = %config.agent_id, "Fault injection ignored in real mode");
                }
                Ok(self.create_real_agent(&config.agent_id, &config.agent_name, &config.real))
            }
        }
    }

    /// Build an agent and its declared descendants
    ///
    /// Every node shares the provider settings of `base`. Children are keyed
    /// by `agent_name`; a later sibling replaces an earlier one with the same
    /// name. A `span_kind` outside the known set is logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns `CircularAgentReference` if a node reuses the `agent_id` of one
    /// of its ancestors, or any error from `create_from_config`.
    pub fn build_hierarchy(
        &self,
        root: &AgentNodeConfig,
        base: &AgentConfig,
        fault_config: Option<&FaultInjectionConfig>,
    ) -> Result<ConfigurableAgent, CanaryError> {
        let mut ancestors = Vec::new();
        self.build_node(root, base, fault_config, &mut ancestors)
    }

    fn build_node(
        &self,
        node: &AgentNodeConfig,
        base: &AgentConfig,
        fault_config: Option<&FaultInjectionConfig>,
        ancestors: &mut Vec<String>,
    ) -> Result<ConfigurableAgent, CanaryError> {
        if ancestors.contains(&node.agent_id) {
            let mut path = ancestors.clone();
            path.push(node.agent_id.clone());
            return Err(CanaryError::CircularAgentReference(path));
        }

        let mut agent = self.create_from_config(&base.for_node(node), fault_config)?;

        if let Some(kind) = &node.span_kind {
            match AgentSpanKind::parse(kind) {
                Some(kind) => agent.set_span_kind(kind),
                None => warn!(
                    agent_id = %node.agent_id,
                    span_kind = %kind,
                    "Unknown span_kind, keeping INTERNAL"
                ),
            }
        }

        ancestors.push(node.agent_id.clone());
        for child_node in &node.children {
            let child = self.build_node(child_node, base, fault_config, ancestors)?;
            if let Some(replaced) = agent.add_child(child) {
                warn!(
                    parent = %node.agent_name,
                    child = %replaced.agent_name(),
                    "Duplicate child agent name, later definition wins"
                );
            }
        }
        ancestors.pop();

        Ok(agent)
    }
}

/// Merge fault profiles into mock provider construction
fn build_mock_providers(
    base: &MockSettings,
    faults: Option<&FaultInjectionConfig>,
) -> Result<(MockLlmProvider, MockToolProvider), CanaryError> {
    let mut llm_latency_ms = base.llm_latency_ms;
    let mut tool_latency_ms = base.tool_latency_ms;
    let mut llm_failure_rate = base.llm_failure_rate;
    let mut tool_failure_rate = base.tool_failure_rate;
    let mut pattern = FailurePattern::Random;

    if let Some(f) = faults {
        if f.is_profile_enabled(HIGH_LATENCY) {
            llm_latency_ms = f.get_f64(HIGH_LATENCY, "llm_latency_ms", 2000.0).max(0.0) as u64;
            tool_latency_ms = f.get_f64(HIGH_LATENCY, "tool_latency_ms", 1000.0).max(0.0) as u64;
        }
        if f.is_profile_enabled(INTERMITTENT_FAILURES) {
            llm_failure_rate = f.get_f64(INTERMITTENT_FAILURES, "llm_failure_rate", llm_failure_rate);
            tool_failure_rate =
                f.get_f64(INTERMITTENT_FAILURES, "tool_failure_rate", tool_failure_rate);
            pattern = f
                .get_str(INTERMITTENT_FAILURES, "failure_pattern", "random")
                .parse()?;
        }
    }

    let mut llm = MockLlmProvider::new(llm_latency_ms).with_failures(llm_failure_rate, pattern)?;
    let mut tool = MockToolProvider::with_pattern(tool_failure_rate, pattern, tool_latency_ms)?;

    if let Some(f) = faults {
        if f.is_profile_enabled(RATE_LIMITS) {
            llm = llm.with_rate_limit(f.get_u64(RATE_LIMITS, "trigger_after_calls", 5));
        }
        if f.is_profile_enabled(TOKEN_LIMITS) {
            llm = llm.with_token_limit(
                f.get_u64(TOKEN_LIMITS, "max_tokens", 50),
                f.get_u64(TOKEN_LIMITS, "exceed_by", 0),
            );
        }
        if f.is_profile_enabled(PARTIAL_RESPONSES) {
            let ratio = f.get_f64(PARTIAL_RESPONSES, "completeness_ratio", 0.5);
            llm = llm.with_completeness_ratio(ratio)?;
            tool = tool.with_completeness_ratio(ratio)?;
        }
    }

    Ok((llm, tool))
}
