//! Scenarios that only invoke the agent with fixed prompts

use super::{run_prompts, Scenario, ScenarioResult};
use crate::agent::ConfigurableAgent;
use crate::error::CanaryError;

/// Single agent invocation with one tool call
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleToolCallScenario;

impl Scenario for SimpleToolCallScenario {
    fn name(&self) -> &'static str {
        "simple_tool_call"
    }

    fn description(&self) -> &'static str {
        "Single agent invocation with one tool call"
    }

    fn execute(&self, agent: &mut ConfigurableAgent) -> Result<ScenarioResult, CanaryError> {
        Ok(run_prompts(
            self.name(),
            "simple",
            agent,
            &["What's the weather in Paris?"],
        ))
    }
}

/// Three tool calls in sequence within one conversation
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiToolChainScenario;

impl Scenario for MultiToolChainScenario {
    fn name(&self) -> &'static str {
        "multi_tool_chain"
    }

    fn description(&self) -> &'static str {
        "Agent invocation with multiple sequential tool calls"
    }

    fn execute(&self, agent: &mut ConfigurableAgent) -> Result<ScenarioResult, CanaryError> {
        Ok(run_prompts(
            self.name(),
            "multi",
            agent,
            &[
                "What's the weather in Paris?",
                "What's the weather in London?",
                "What's the weather in Tokyo?",
            ],
        ))
    }
}

/// One invocation with an input well over 1000 characters
#[derive(Debug, Clone, Copy, Default)]
pub struct HighTokenUsageScenario;

impl HighTokenUsageScenario {
    /// The oversized prompt
    pub fn prompt() -> String {
        let cities: Vec<String> = (0..200).map(|i| format!("City{}", i)).collect();
        format!(
            "I need detailed weather information for the following cities: {}. \
             Please provide comprehensive weather data including temperature, humidity, \
             wind speed, precipitation, atmospheric pressure, visibility, UV index, and \
             any weather warnings or advisories for each location. Additionally, I would \
             like to know the forecast for the next 7 days for each city, including hourly \
             breakdowns of temperature changes, precipitation probability, and wind \
             patterns. This information is critical for planning purposes and needs to be \
             as detailed and accurate as possible.",
            cities.join(", ")
        )
    }
}

impl Scenario for HighTokenUsageScenario {
    fn name(&self) -> &'static str {
        "high_token_usage"
    }

    fn description(&self) -> &'static str {
        "Large input text to test token calculation and metrics"
    }

    fn execute(&self, agent: &mut ConfigurableAgent) -> Result<ScenarioResult, CanaryError> {
        let prompt = Self::prompt();
        Ok(run_prompts(self.name(), "high_token", agent, &[prompt.as_str()]))
    }
}

/// Multi-turn conversation with follow-up questions
#[derive(Debug, Clone, Copy, Default)]
pub struct ConversationContextScenario;

impl Scenario for ConversationContextScenario {
    fn name(&self) -> &'static str {
        "conversation_context"
    }

    fn description(&self) -> &'static str {
        "Multi-turn conversation to test context maintenance"
    }

    fn execute(&self, agent: &mut ConfigurableAgent) -> Result<ScenarioResult, CanaryError> {
        Ok(run_prompts(
            self.name(),
            "context",
            agent,
            &[
                "What's the weather in Paris?",
                "What about London?",
                "And how about Tokyo?",
            ],
        ))
    }
}
