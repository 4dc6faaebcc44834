//! Real providers
//!
//! These satisfy the provider contracts for end-to-end runs. External API
//! integration is not wired yet: the LLM delegates to the mock generator and
//! the weather tool returns realistic static data.

use super::{ChatMessage, LlmProvider, LlmResponse, MockLlmProvider, ToolDefinition, ToolProvider};
use crate::error::CanaryError;
use secrecy::SecretString;
use serde_json::{json, Value};

/// Latency of the placeholder LLM backend
const PLACEHOLDER_LATENCY_MS: u64 = 500;

/// Real LLM provider
pub struct RealLlmProvider {
    api_key: Option<SecretString>,
    model: String,
    delegate: MockLlmProvider,
}

impl RealLlmProvider {
    /// Create a provider for `model` authenticated with `api_key`
    pub fn new(api_key: Option<SecretString>, model: impl Into<String>) -> Self {
        Self {
            api_key,
            model: model.into(),
            delegate: MockLlmProvider::new(PLACEHOLDER_LATENCY_MS),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

impl LlmProvider for RealLlmProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    /// Answers from the mock generator; no external API is called and
    /// `api_key` is held but not sent anywhere.
    fn call(
        &mut self,
        model: &str,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse, CanaryError> {
        self.delegate.call(model, messages, tools)
    }
}

/// Real tool provider
#[derive(Debug, Default, Clone)]
pub struct RealToolProvider;

impl RealToolProvider {
    pub fn new() -> Self {
        Self
    }

    fn get_weather(&self, arguments: &Value) -> Result<Value, CanaryError> {
        let location = arguments
            .get("location")
            .and_then(Value::as_str)
            .filter(|l| !l.is_empty())
            .ok_or_else(|| CanaryError::ToolExecution {
                tool: "get_weather".to_string(),
                message: "missing required argument: location".to_string(),
            })?;

        Ok(json!({
            "location": location,
            "temperature": "68°F",
            "condition": "partly cloudy",
            "humidity": "60%",
            "wind_speed": "10 mph",
        }))
    }
}

impl ToolProvider for RealToolProvider {
    fn execute(&mut self, tool_name: &str, arguments: &Value) -> Result<Value, CanaryError> {
        match tool_name {
            "get_weather" => self.get_weather(arguments),
            other => Err(CanaryError::UnknownTool(other.to_string())),
        }
    }
}
