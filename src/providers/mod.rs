//! LLM and tool providers
//!
//! The agent talks to its LLM and tools through the `LlmProvider` and
//! `ToolProvider` traits. Mock implementations simulate latency, failures,
//! rate limits, token limits and partial responses; real implementations
//! satisfy the same contracts for end-to-end runs.

pub mod mock;
pub mod real;

pub use mock::{MockLlmProvider, MockToolProvider, MOCK_RESPONSE_TEXT};
pub use real::{RealLlmProvider, RealToolProvider};

use crate::error::CanaryError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Chat message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single chat message sent to the LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Function tool advertised to the LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the tool arguments
    pub parameters: Value,
}

/// Tool invocation requested by the LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

/// Assistant message returned by the LLM
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantMessage {
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
}

/// Reason the LLM stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    ToolCalls,
}

impl FinishReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::ToolCalls => "tool_calls",
        }
    }
}

/// Token accounting for one LLM call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Response of one LLM call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    pub id: String,
    pub model: String,
    pub message: AssistantMessage,
    pub finish_reason: FinishReason,
    pub usage: TokenUsage,
}

impl LlmResponse {
    /// The first tool call, if the LLM requested any
    pub fn first_tool_call(&self) -> Option<&ToolCall> {
        self.message.tool_calls.first()
    }
}

/// LLM backend used by an agent
pub trait LlmProvider: Send {
    /// Provider name reported as `gen_ai.provider.name`
    fn provider_name(&self) -> &str;

    /// Call the LLM with messages and the tools it may request
    ///
    /// An empty `tools` slice means no tools are offered.
    fn call(
        &mut self,
        model: &str,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<LlmResponse, CanaryError>;
}

/// Tool backend used by an agent
pub trait ToolProvider: Send {
    /// Execute `tool_name` with JSON `arguments`
    ///
    /// # Errors
    ///
    /// Returns `UnknownTool` for tools the provider does not implement.
    fn execute(&mut self, tool_name: &str, arguments: &Value) -> Result<Value, CanaryError>;
}

/// Keep the first `floor(len * ratio)` characters of `text`
pub fn truncate_text(text: &str, ratio: f64) -> String {
    let len = text.chars().count();
    let keep = ((len as f64) * ratio).floor() as usize;
    text.chars().take(keep).collect()
}

/// Apply `truncate_text` to every string nested in `value`
///
/// Arrays and objects are processed element-wise; other scalars are kept.
pub fn truncate_value(value: &Value, ratio: f64) -> Value {
    match value {
        Value::String(s) => Value::String(truncate_text(s, ratio)),
        Value::Array(items) => Value::Array(items.iter().map(|v| truncate_value(v, ratio)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), truncate_value(v, ratio)))
                .collect(),
        ),
        other => other.clone(),
    }
}
