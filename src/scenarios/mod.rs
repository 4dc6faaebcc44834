//! Canary scenarios
//!
//! Each scenario is a fixed script of agent invocations with a pass/fail
//! verdict. Scenarios keep no state between executions; every execution gets
//! a fresh conversation id.

pub mod failure;
pub mod multi_agent;
pub mod scripted;

pub use failure::ToolFailureScenario;
pub use multi_agent::MultiAgentScenario;
pub use scripted::{
    ConversationContextScenario, HighTokenUsageScenario, MultiToolChainScenario,
    SimpleToolCallScenario,
};

use crate::agent::{AgentFactory, ConfigurableAgent};
use crate::error::CanaryError;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use uuid::Uuid;

/// Names accepted in the `scenarios` list
pub const SCENARIO_NAMES: [&str; 6] = [
    "simple_tool_call",
    "multi_tool_chain",
    "tool_failure",
    "high_token_usage",
    "conversation_context",
    "multi_agent",
];

/// Outcome of one scenario execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub scenario_name: String,
    pub success: bool,
    pub duration_seconds: f64,
    pub error_message: Option<String>,
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub fault_injection_enabled: bool,
    #[serde(default)]
    pub active_fault_profiles: Option<Vec<String>>,
}

impl ScenarioResult {
    pub fn passed(
        scenario_name: impl Into<String>,
        duration_seconds: f64,
        conversation_id: impl Into<String>,
    ) -> Self {
        Self {
            scenario_name: scenario_name.into(),
            success: true,
            duration_seconds,
            error_message: None,
            conversation_id: Some(conversation_id.into()),
            fault_injection_enabled: false,
            active_fault_profiles: None,
        }
    }

    pub fn failed(
        scenario_name: impl Into<String>,
        duration_seconds: f64,
        error_message: impl Into<String>,
        conversation_id: Option<String>,
    ) -> Self {
        Self {
            scenario_name: scenario_name.into(),
            success: false,
            duration_seconds,
            error_message: Some(error_message.into()),
            conversation_id,
            fault_injection_enabled: false,
            active_fault_profiles: None,
        }
    }

    pub fn with_error_message(mut self, error_message: impl Into<String>) -> Self {
        self.error_message = Some(error_message.into());
        self
    }

    /// Record which fault profiles were active during the run
    pub fn with_fault_context(mut self, enabled: bool, profiles: Vec<String>) -> Self {
        self.fault_injection_enabled = enabled;
        self.active_fault_profiles = if enabled { Some(profiles) } else { None };
        self
    }
}

/// A canary test case
pub trait Scenario: Send {
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Run the script against `agent`
    ///
    /// Agent errors are captured in the returned result. An `Err` means the
    /// scenario itself could not run.
    fn execute(&self, agent: &mut ConfigurableAgent) -> Result<ScenarioResult, CanaryError>;
}

/// Look up a scenario by registry name
pub fn scenario_for(name: &str, factory: &AgentFactory) -> Option<Box<dyn Scenario>> {
    let scenario: Box<dyn Scenario> = match name {
        "simple_tool_call" => Box::new(SimpleToolCallScenario),
        "multi_tool_chain" => Box::new(MultiToolChainScenario),
        "tool_failure" => Box::new(ToolFailureScenario),
        "high_token_usage" => Box::new(HighTokenUsageScenario),
        "conversation_context" => Box::new(ConversationContextScenario),
        "multi_agent" => Box::new(MultiAgentScenario::new(factory.clone())),
        _ => return None,
    };
    Some(scenario)
}

/// Fresh conversation id, unique per call
pub fn new_conversation_id(prefix: &str) -> String {
    format!("conv_{}_{}", prefix, Uuid::new_v4().simple())
}

/// Invoke `agent` with each prompt in one conversation, stopping at the first error
pub(crate) fn run_prompts(
    scenario_name: &str,
    conversation_prefix: &str,
    agent: &mut ConfigurableAgent,
    prompts: &[&str],
) -> ScenarioResult {
    let start = Instant::now();
    let conversation_id = new_conversation_id(conversation_prefix);

    let outcome = prompts
        .iter()
        .try_for_each(|prompt| agent.invoke(prompt, &conversation_id).map(|_| ()));

    let duration = start.elapsed().as_secs_f64();
    match outcome {
        Ok(()) => ScenarioResult::passed(scenario_name, duration, conversation_id),
        Err(e) => ScenarioResult::failed(scenario_name, duration, e.to_string(), Some(conversation_id)),
    }
}
