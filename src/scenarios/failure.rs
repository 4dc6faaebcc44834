//! Tool failure scenario

use super::{new_conversation_id, Scenario, ScenarioResult};
use crate::agent::ConfigurableAgent;
use crate::error::CanaryError;
use std::time::Instant;

/// Tool execution expected to fail
///
/// Meant for agents configured with a high tool failure rate. A tool-side
/// error is the expected outcome and counts as a pass; any other error fails
/// the scenario. A run where the tool happens to succeed also passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolFailureScenario;

impl Scenario for ToolFailureScenario {
    fn name(&self) -> &'static str {
        "tool_failure"
    }

    fn description(&self) -> &'static str {
        "Agent with high tool failure rate to test error handling"
    }

    fn execute(&self, agent: &mut ConfigurableAgent) -> Result<ScenarioResult, CanaryError> {
        let start = Instant::now();
        let conversation_id = new_conversation_id("failure");

        let outcome = agent.invoke("What's the weather in Paris?", &conversation_id);
        let duration = start.elapsed().as_secs_f64();

        let result = match outcome {
            Ok(_) => ScenarioResult::passed(self.name(), duration, conversation_id),
            Err(e) if e.is_tool_failure() => {
                ScenarioResult::passed(self.name(), duration, conversation_id)
                    .with_error_message(format!("Expected tool failure: {}", e))
            }
            Err(e) => ScenarioResult::failed(self.name(), duration, e.to_string(), Some(conversation_id)),
        };
        Ok(result)
    }
}
