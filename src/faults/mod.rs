//! Fault injection configuration
//!
//! This module holds the declarative side of fault injection (which profiles
//! are enabled and with which parameters) and the per-provider evaluator that
//! decides whether a given call fails.

pub mod injector;

pub use injector::{BurstState, FailurePattern, FaultInjector};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Profile that slows down LLM and tool calls
pub const HIGH_LATENCY: &str = "high_latency";
/// Profile that injects failures following a failure pattern
pub const INTERMITTENT_FAILURES: &str = "intermittent_failures";
/// Profile that rejects LLM calls past a call-count ceiling
pub const RATE_LIMITS: &str = "rate_limits";
/// Profile that enforces a token ceiling on LLM responses
pub const TOKEN_LIMITS: &str = "token_limits";
/// Profile that truncates LLM and tool responses
pub const PARTIAL_RESPONSES: &str = "partial_responses";

/// Profiles with built-in semantics; any other name is an inert custom profile
pub const KNOWN_PROFILES: [&str; 5] = [
    HIGH_LATENCY,
    INTERMITTENT_FAILURES,
    RATE_LIMITS,
    TOKEN_LIMITS,
    PARTIAL_RESPONSES,
];

/// Configuration for a single fault profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaultProfile {
    name: String,
    parameters: BTreeMap<String, Value>,
}

impl FaultProfile {
    /// Create a profile from its name and parameter block
    pub fn new(name: impl Into<String>, parameters: BTreeMap<String, Value>) -> Self {
        Self {
            name: name.into(),
            parameters,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &BTreeMap<String, Value> {
        &self.parameters
    }
}

/// Complete fault injection configuration
///
/// Built once from configuration at runner startup and read-only afterwards.
/// Profile names are expected to be unique; lookups return the first match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FaultInjectionConfig {
    pub enabled: bool,
    pub profiles: Vec<FaultProfile>,
}

impl FaultInjectionConfig {
    /// Create an enabled configuration with the given profiles
    pub fn new(profiles: Vec<FaultProfile>) -> Self {
        Self {
            enabled: true,
            profiles,
        }
    }

    /// Create a configuration with fault injection turned off
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Get profile by name (first match)
    pub fn get_profile(&self, name: &str) -> Option<&FaultProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }

    /// Check if a profile is present, regardless of its parameters
    pub fn is_profile_enabled(&self, name: &str) -> bool {
        self.profiles.iter().any(|p| p.name == name)
    }

    /// Get a raw parameter value from a profile
    ///
    /// Returns `None` when either the profile or the key is absent.
    pub fn get_parameter(&self, profile: &str, key: &str) -> Option<&Value> {
        self.get_profile(profile)
            .and_then(|p| p.parameters.get(key))
    }

    /// Get a numeric parameter, falling back to `default`
    pub fn get_f64(&self, profile: &str, key: &str, default: f64) -> f64 {
        self.get_parameter(profile, key)
            .and_then(Value::as_f64)
            .unwrap_or(default)
    }

    /// Get a non-negative integer parameter, falling back to `default`
    ///
    /// Whole-number floats (e.g. `5.0` written in YAML) are accepted.
    pub fn get_u64(&self, profile: &str, key: &str, default: u64) -> u64 {
        self.get_parameter(profile, key)
            .and_then(|v| {
                v.as_u64().or_else(|| {
                    v.as_f64()
                        .filter(|f| *f >= 0.0 && f.fract() == 0.0)
                        .map(|f| f as u64)
                })
            })
            .unwrap_or(default)
    }

    /// Get a string parameter, falling back to `default`
    pub fn get_str<'a>(&'a self, profile: &str, key: &str, default: &'a str) -> &'a str {
        self.get_parameter(profile, key)
            .and_then(Value::as_str)
            .unwrap_or(default)
    }

    /// Names of the enabled profiles, in configuration order
    pub fn active_profile_names(&self) -> Vec<String> {
        if !self.enabled {
            return Vec::new();
        }
        self.profiles.iter().map(|p| p.name.clone()).collect()
    }
}
