//! Deterministic mock providers
//!
//! Used for frequent canary runs without API costs. Behaviour depends only on
//! constructor parameters and the sequence of calls made on the instance.

use super::{
    truncate_text, truncate_value, AssistantMessage, ChatMessage, FinishReason, LlmProvider,
    LlmResponse, Role, TokenUsage, ToolCall, ToolDefinition, ToolProvider,
};
use crate::error::CanaryError;
use crate::faults::{FailurePattern, FaultInjector};
use serde_json::{json, Value};
use std::thread;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// Canned text returned when no tool call is requested
pub const MOCK_RESPONSE_TEXT: &str = "This is a mock response for testing purposes.";

/// Completion tokens reported for a synthetic tool-call response
const TOOL_CALL_COMPLETION_TOKENS: u64 = 25;

fn validate_ratio(name: &str, ratio: f64) -> Result<(), CanaryError> {
    if !(0.0..=1.0).contains(&ratio) {
        return Err(CanaryError::ConfigurationError(format!(
            "{} must be between 0.0 and 1.0, got {}",
            name, ratio
        )));
    }
    Ok(())
}

fn simulate_latency(latency: Duration) {
    if !latency.is_zero() {
        thread::sleep(latency);
    }
}

/// Approximate token count: one token per four characters, at least one
fn estimate_tokens(char_count: usize) -> u64 {
    ((char_count / 4) as u64).max(1)
}

/// Mock LLM provider
///
/// Check order on every call: count the call, rate limit, failure pattern,
/// latency, generation, token limit.
#[derive(Debug, Clone)]
pub struct MockLlmProvider {
    latency: Duration,
    injector: FaultInjector,
    rate_limit_after: Option<u64>,
    max_tokens: Option<u64>,
    token_padding: u64,
    completeness_ratio: f64,
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new(500)
    }
}

impl MockLlmProvider {
    /// Create a provider that never fails and answers after `latency_ms`
    pub fn new(latency_ms: u64) -> Self {
        Self {
            latency: Duration::from_millis(latency_ms),
            injector: FaultInjector::never(),
            rate_limit_after: None,
            max_tokens: None,
            token_padding: 0,
            completeness_ratio: 1.0,
        }
    }

    /// Inject failures at `failure_rate` following `pattern`
    pub fn with_failures(
        mut self,
        failure_rate: f64,
        pattern: FailurePattern,
    ) -> Result<Self, CanaryError> {
        self.injector = FaultInjector::new(failure_rate, pattern)?;
        Ok(self)
    }

    /// Reject every call after the first `trigger_after_calls`
    pub fn with_rate_limit(mut self, trigger_after_calls: u64) -> Self {
        self.rate_limit_after = Some(trigger_after_calls);
        self
    }

    /// Fail responses whose total token count exceeds `max_tokens`
    ///
    /// `exceed_by` extra completion tokens are added to every response.
    pub fn with_token_limit(mut self, max_tokens: u64, exceed_by: u64) -> Self {
        self.max_tokens = Some(max_tokens);
        self.token_padding = exceed_by;
        self
    }

    /// Truncate text responses to `ratio` of their length
    pub fn with_completeness_ratio(mut self, ratio: f64) -> Result<Self, CanaryError> {
        validate_ratio("completeness_ratio", ratio)?;
        self.completeness_ratio = ratio;
        Ok(self)
    }

    pub fn call_count(&self) -> u64 {
        self.injector.call_count()
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    pub fn failure_rate(&self) -> f64 {
        self.injector.failure_rate()
    }

    pub fn failure_pattern(&self) -> FailurePattern {
        self.injector.pattern()
    }

    pub fn rate_limit_after(&self) -> Option<u64> {
        self.rate_limit_after
    }

    pub fn max_tokens(&self) -> Option<u64> {
        self.max_tokens
    }

    pub fn completeness_ratio(&self) -> f64 {
        self.completeness_ratio
    }

    fn response_id(prompt_text: &str) -> String {
        let id = Uuid::new_v5(&Uuid::NAMESPACE_OID, prompt_text.as_bytes());
        format!("mock-{}", id.simple())
    }
}

impl LlmProvider for MockLlmProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn call(
        &mut self,
        model: &str,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse, CanaryError> {
        let call_count = self.injector.record_call();

        if let Some(limit) = self.rate_limit_after {
            if call_count > limit {
                return Err(CanaryError::RateLimitExceeded { call_count, limit });
            }
        }

        if self.injector.should_fail() {
            return Err(CanaryError::LlmFailure {
                pattern: self.injector.pattern(),
                call_count,
            });
        }

        simulate_latency(self.latency);

        let prompt_text = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let prompt_tokens = estimate_tokens(prompt_text.chars().count());

        let last_message = messages
            .last()
            .map(|m| m.content.to_lowercase())
            .unwrap_or_default();
        let wants_tool =
            !tools.is_empty() && (last_message.contains("weather") || last_message.contains("temperature"));

        let (message, finish_reason, completion_tokens) = if wants_tool {
            let message = AssistantMessage {
                role: Role::Assistant,
                content: None,
                tool_calls: vec![ToolCall {
                    id: "call_mock_001".to_string(),
                    name: "get_weather".to_string(),
                    arguments: json!({ "location": "Paris" }),
                }],
            };
            (message, FinishReason::ToolCalls, TOOL_CALL_COMPLETION_TOKENS)
        } else {
            let text = truncate_text(MOCK_RESPONSE_TEXT, self.completeness_ratio);
            let completion_tokens = estimate_tokens(text.chars().count());
            let message = AssistantMessage {
                role: Role::Assistant,
                content: Some(text),
                tool_calls: vec![],
            };
            (message, FinishReason::Stop, completion_tokens)
        };

        let usage = TokenUsage::new(prompt_tokens, completion_tokens + self.token_padding);

        if let Some(max_tokens) = self.max_tokens {
            if usage.total_tokens > max_tokens {
                return Err(CanaryError::TokenLimitExceeded {
                    tokens_used: usage.total_tokens,
                    max_tokens,
                });
            }
        }

        debug!(
            call_count,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "Mock LLM call completed"
        );

        Ok(LlmResponse {
            id: Self::response_id(&prompt_text),
            model: model.to_string(),
            message,
            finish_reason,
            usage,
        })
    }
}

/// Mock tool provider
///
/// Implements `get_weather` and `search` with fixed payloads.
#[derive(Debug, Clone)]
pub struct MockToolProvider {
    latency: Duration,
    injector: FaultInjector,
    completeness_ratio: f64,
}

impl Default for MockToolProvider {
    fn default() -> Self {
        Self {
            latency: Duration::from_millis(200),
            injector: FaultInjector::never(),
            completeness_ratio: 1.0,
        }
    }
}

impl MockToolProvider {
    /// Create a tool provider failing at `failure_rate` with the random pattern
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if `failure_rate` is outside `[0.0, 1.0]`.
    pub fn new(failure_rate: f64, latency_ms: u64) -> Result<Self, CanaryError> {
        Self::with_pattern(failure_rate, FailurePattern::Random, latency_ms)
    }

    /// Create a tool provider failing at `failure_rate` following `pattern`
    pub fn with_pattern(
        failure_rate: f64,
        pattern: FailurePattern,
        latency_ms: u64,
    ) -> Result<Self, CanaryError> {
        Ok(Self {
            latency: Duration::from_millis(latency_ms),
            injector: FaultInjector::new(failure_rate, pattern)?,
            completeness_ratio: 1.0,
        })
    }

    /// Truncate every string in tool results to `ratio` of its length
    pub fn with_completeness_ratio(mut self, ratio: f64) -> Result<Self, CanaryError> {
        validate_ratio("completeness_ratio", ratio)?;
        self.completeness_ratio = ratio;
        Ok(self)
    }

    pub fn call_count(&self) -> u64 {
        self.injector.call_count()
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    pub fn failure_rate(&self) -> f64 {
        self.injector.failure_rate()
    }

    pub fn failure_pattern(&self) -> FailurePattern {
        self.injector.pattern()
    }

    pub fn completeness_ratio(&self) -> f64 {
        self.completeness_ratio
    }
}

impl ToolProvider for MockToolProvider {
    fn execute(&mut self, tool_name: &str, arguments: &Value) -> Result<Value, CanaryError> {
        let call_count = self.injector.record_call();
        simulate_latency(self.latency);

        if self.injector.should_fail() {
            return Err(CanaryError::ToolFailure {
                tool: tool_name.to_string(),
                pattern: self.injector.pattern(),
                call_count,
            });
        }

        let result = match tool_name {
            "get_weather" => {
                let location = arguments
                    .get("location")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown");
                json!({
                    "location": location,
                    "temperature": "72°F",
                    "condition": "sunny",
                    "humidity": "45%",
                    "wind_speed": "8 mph",
                })
            }
            "search" => {
                let query = arguments
                    .get("query")
                    .and_then(Value::as_str)
                    .unwrap_or("");
                json!({
                    "results": [
                        {"title": format!("Result 1 for {}", query), "url": "https://example.com/1"},
                        {"title": format!("Result 2 for {}", query), "url": "https://example.com/2"},
                    ]
                })
            }
            other => return Err(CanaryError::UnknownTool(other.to_string())),
        };

        if self.completeness_ratio < 1.0 {
            return Ok(truncate_value(&result, self.completeness_ratio));
        }
        Ok(result)
    }
}
