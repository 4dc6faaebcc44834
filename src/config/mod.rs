//! Configuration module for the agent canary
//!
//! This module handles configuration loading, validation, and management.

pub mod loader;
pub mod types;

pub use loader::{load_from_str, load_from_yaml, parse_fault_injection};
pub use types::{
    AgentMode, AgentNodeConfig, AgentSpanKind, CanaryConfig, LogFormat, LoggingSettings,
    MockSettings, OtlpProtocol, OtlpSettings, RealSettings, ValidationSettings,
};
