//! Error types for the agent canary
//!
//! This module defines all error types used throughout the canary,
//! from configuration problems to simulated provider faults.

use crate::faults::FailurePattern;
use thiserror::Error;

/// Error type for canary operations
///
/// Simulated faults carry typed fields so callers can classify them
/// without inspecting message text.
#[derive(Debug, Clone, Error)]
pub enum CanaryError {
    /// Invalid configuration error
    ///
    /// Occurs when configuration values are invalid or missing required fields.
    /// Always fatal: the runner exits before any scenario executes.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Simulated rate limit rejection (HTTP 429)
    #[error("Rate limit exceeded (HTTP 429): call {call_count} exceeds limit of {limit}")]
    RateLimitExceeded { call_count: u64, limit: u64 },

    /// Simulated token ceiling violation, raised after generation
    #[error("Token limit exceeded: {tokens_used} tokens used, maximum is {max_tokens}")]
    TokenLimitExceeded { tokens_used: u64, max_tokens: u64 },

    /// Failure injected into an LLM call by the active failure pattern
    #[error("Mock LLM failure ({pattern} pattern, call {call_count})")]
    LlmFailure {
        pattern: FailurePattern,
        call_count: u64,
    },

    /// Failure injected into a tool call by the active failure pattern
    #[error("Mock tool failure: {tool} ({pattern} pattern, call {call_count})")]
    ToolFailure {
        tool: String,
        pattern: FailurePattern,
        call_count: u64,
    },

    /// A tool implementation failed while executing
    #[error("Tool execution failed for {tool}: {message}")]
    ToolExecution { tool: String, message: String },

    /// The requested tool is not provided
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// A child agent lookup failed
    #[error("Child agent '{child_name}' not found. Available: {}", format_available(.available))]
    ChildAgentNotFound {
        child_name: String,
        available: Vec<String>,
    },

    /// The agent hierarchy references one of its own ancestors
    #[error("Circular agent reference detected: {}", .0.join(" -> "))]
    CircularAgentReference(Vec<String>),

    /// OpenTelemetry pipeline setup or flush failure
    #[error("Telemetry error: {0}")]
    TelemetryError(String),

    /// Telemetry validation could not be performed
    #[error("Validation error: {0}")]
    ValidationError(String),
}

fn format_available(available: &[String]) -> String {
    if available.is_empty() {
        "none".to_string()
    } else {
        available.join(", ")
    }
}

impl CanaryError {
    /// Check if the error is a tool-side failure
    ///
    /// Returns true for injected tool faults and tool execution errors.
    /// These are the failures the tool failure scenario expects.
    pub fn is_tool_failure(&self) -> bool {
        matches!(
            self,
            CanaryError::ToolFailure { .. } | CanaryError::ToolExecution { .. }
        )
    }

    /// Check if the error was produced by fault injection
    pub fn is_injected_fault(&self) -> bool {
        matches!(
            self,
            CanaryError::RateLimitExceeded { .. }
                | CanaryError::TokenLimitExceeded { .. }
                | CanaryError::LlmFailure { .. }
                | CanaryError::ToolFailure { .. }
        )
    }

    /// Check if the error is a configuration error
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            CanaryError::ConfigurationError(_) | CanaryError::CircularAgentReference(_)
        )
    }

    /// HTTP-style status code for simulated API rejections
    pub fn status_code(&self) -> Option<u16> {
        match self {
            CanaryError::RateLimitExceeded { .. } => Some(429),
            _ => None,
        }
    }
}
