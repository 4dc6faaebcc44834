//! Configuration loader for the agent canary
//!
//! This module handles loading configuration from YAML files, substituting
//! `${VAR}` references from the environment and parsing the fault injection
//! section.

use crate::config::types::{
    AgentMode, AgentNodeConfig, CanaryConfig, LogFormat, LoggingSettings, MockSettings,
    OtlpSettings, RealSettings, ValidationSettings,
};
use crate::error::CanaryError;
use crate::faults::{
    FailurePattern, FaultInjectionConfig, FaultProfile, HIGH_LATENCY, INTERMITTENT_FAILURES,
    PARTIAL_RESPONSES, RATE_LIMITS, TOKEN_LIMITS,
};
use regex::{Captures, Regex};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use serde_yaml::Value as YamlValue;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// `${VAR_NAME}` reference; `${}` is not a reference
const ENV_VAR_PATTERN: &str = r"\$\{([^}]+)\}";

/// YAML configuration structure (for deserialization)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigYaml {
    pub mode: Option<String>,
    pub agent: Option<AgentNodeConfig>,
    pub otlp: Option<OtlpYaml>,
    pub scenarios: Option<Vec<String>>,
    pub validation: Option<ValidationYaml>,
    pub mock_settings: Option<MockSettingsYaml>,
    pub real_settings: Option<RealSettingsYaml>,
    /// Kept untyped: profile blocks are keyed by profile name
    pub fault_injection: Option<YamlValue>,
    pub logging: Option<LoggingYaml>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtlpYaml {
    pub endpoint: Option<String>,
    pub protocol: Option<String>,
    pub service_name: Option<String>,
    pub enabled: Option<bool>,
    pub export_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationYaml {
    pub prometheus_url: Option<String>,
    pub opensearch_url: Option<String>,
    pub opensearch_user: Option<String>,
    pub opensearch_password: Option<String>,
    pub ingestion_wait_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MockSettingsYaml {
    pub llm_latency_ms: Option<u64>,
    pub tool_latency_ms: Option<u64>,
    pub tool_failure_rate: Option<f64>,
    pub llm_failure_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealSettingsYaml {
    pub api_key: Option<String>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingYaml {
    pub level: Option<String>,
    pub format: Option<LogFormat>,
}

/// Load configuration from YAML file
///
/// # Arguments
///
/// * `path` - Path to YAML configuration file
///
/// # Returns
///
/// Returns `CanaryConfig` if successful, or `CanaryError` if loading fails.
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> Result<CanaryConfig, CanaryError> {
    let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
        CanaryError::ConfigurationError(format!(
            "Failed to read config file {}: {}",
            path.as_ref().display(),
            e
        ))
    })?;

    debug!(path = %path.as_ref().display(), "Loaded configuration file");
    load_from_str(&content)
}

/// Load configuration from a YAML document
///
/// # Errors
///
/// Returns `ConfigurationError` if the YAML is malformed, references an
/// undefined environment variable, misses required fields or fails validation.
pub fn load_from_str(content: &str) -> Result<CanaryConfig, CanaryError> {
    let mut raw: YamlValue = serde_yaml::from_str(content)
        .map_err(|e| CanaryError::ConfigurationError(format!("Failed to parse YAML: {}", e)))?;

    if raw.is_null() {
        return Err(CanaryError::ConfigurationError(
            "Configuration file is empty".to_string(),
        ));
    }
    if !raw.is_mapping() {
        return Err(CanaryError::ConfigurationError(
            "Configuration root must be a mapping".to_string(),
        ));
    }

    substitute_env_vars(&mut raw)?;

    let yaml: ConfigYaml = serde_yaml::from_value(raw).map_err(|e| {
        CanaryError::ConfigurationError(format!("Failed to parse configuration: {}", e))
    })?;

    build_config(yaml)
}

fn build_config(yaml: ConfigYaml) -> Result<CanaryConfig, CanaryError> {
    let endpoint = yaml.otlp.as_ref().and_then(|o| o.endpoint.clone());

    let mut missing = Vec::new();
    if yaml.mode.is_none() {
        missing.push("mode");
    }
    if yaml.agent.is_none() {
        missing.push("agent");
    }
    if yaml.otlp.is_none() {
        missing.push("otlp");
    } else if endpoint.is_none() {
        missing.push("otlp.endpoint");
    }
    if yaml.scenarios.is_none() {
        missing.push("scenarios");
    }
    if !missing.is_empty() {
        return Err(CanaryError::ConfigurationError(format!(
            "Missing required configuration fields: {}",
            missing.join(", ")
        )));
    }

    let (Some(mode), Some(agent), Some(endpoint), Some(scenarios)) =
        (yaml.mode, yaml.agent, endpoint, yaml.scenarios)
    else {
        return Err(CanaryError::ConfigurationError(
            "Missing required configuration fields".to_string(),
        ));
    };

    let mode: AgentMode = mode.parse()?;
    let mut config = CanaryConfig::new(mode, agent, endpoint, scenarios);

    if let Some(otlp) = yaml.otlp {
        config.otlp = build_otlp(config.otlp, otlp)?;
    }

    if let Some(mock) = yaml.mock_settings {
        let defaults = MockSettings::default();
        config.mock_settings = MockSettings {
            llm_latency_ms: mock.llm_latency_ms.unwrap_or(defaults.llm_latency_ms),
            tool_latency_ms: mock.tool_latency_ms.unwrap_or(defaults.tool_latency_ms),
            tool_failure_rate: mock.tool_failure_rate.unwrap_or(defaults.tool_failure_rate),
            llm_failure_rate: mock.llm_failure_rate.unwrap_or(defaults.llm_failure_rate),
        };
    }

    if let Some(real) = yaml.real_settings {
        let defaults = RealSettings::default();
        config.real_settings = RealSettings {
            api_key: real.api_key.filter(|k| !k.is_empty()).map(SecretString::new),
            model: real.model.unwrap_or(defaults.model),
        };
    }

    if let Some(validation) = yaml.validation {
        config.validation = Some(ValidationSettings {
            prometheus_url: validation.prometheus_url.unwrap_or_default(),
            opensearch_url: validation.opensearch_url.unwrap_or_default(),
            opensearch_user: validation
                .opensearch_user
                .unwrap_or_else(|| "admin".to_string()),
            opensearch_password: SecretString::new(
                validation.opensearch_password.unwrap_or_default(),
            ),
            ingestion_wait_secs: validation.ingestion_wait_secs.unwrap_or(15),
            timeout_secs: validation.timeout_secs.unwrap_or(10),
        });
    }

    if let Some(logging) = yaml.logging {
        let defaults = LoggingSettings::default();
        config.logging = LoggingSettings {
            level: logging.level.unwrap_or(defaults.level),
            format: logging.format.unwrap_or(defaults.format),
        };
    }

    config.fault_injection = parse_fault_injection(yaml.fault_injection.as_ref())?;

    config.validate()?;
    Ok(config)
}

fn build_otlp(mut settings: OtlpSettings, yaml: OtlpYaml) -> Result<OtlpSettings, CanaryError> {
    if let Some(protocol) = yaml.protocol {
        settings.protocol = protocol.parse()?;
    }
    settings.service_name = yaml.service_name;
    if let Some(enabled) = yaml.enabled {
        settings.enabled = enabled;
    }
    if let Some(interval) = yaml.export_interval_ms {
        settings.export_interval_ms = interval;
    }
    Ok(settings)
}

/// Replace `${VAR}` references in every string value
///
/// Mapping keys are left untouched.
///
/// # Errors
///
/// Returns `ConfigurationError` naming the first undefined variable.
pub fn substitute_env_vars(value: &mut YamlValue) -> Result<(), CanaryError> {
    match value {
        YamlValue::String(s) => {
            if s.contains("${") {
                *s = expand_env(s)?;
            }
        }
        YamlValue::Sequence(items) => {
            for item in items.iter_mut() {
                substitute_env_vars(item)?;
            }
        }
        YamlValue::Mapping(map) => {
            for (_, item) in map.iter_mut() {
                substitute_env_vars(item)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn expand_env(input: &str) -> Result<String, CanaryError> {
    let pattern = Regex::new(ENV_VAR_PATTERN).map_err(|e| {
        CanaryError::ConfigurationError(format!("Invalid environment variable pattern: {}", e))
    })?;

    let mut undefined = None;
    let expanded = pattern.replace_all(input, |caps: &Captures| {
        match std::env::var(&caps[1]) {
            Ok(value) => value,
            Err(_) => {
                undefined.get_or_insert_with(|| caps[1].to_string());
                caps[0].to_string()
            }
        }
    });

    match undefined {
        Some(name) => Err(CanaryError::ConfigurationError(format!(
            "Environment variable '{}' is not set",
            name
        ))),
        None => Ok(expanded.into_owned()),
    }
}

/// Parse and validate the `fault_injection` section
///
/// A missing section, or one with `enabled: false`, yields a disabled
/// configuration and the profile list is not inspected.
///
/// # Errors
///
/// Returns `ConfigurationError` if the section is malformed, a listed profile
/// has no parameter block, or a known profile carries an out-of-range value.
pub fn parse_fault_injection(
    section: Option<&YamlValue>,
) -> Result<FaultInjectionConfig, CanaryError> {
    let Some(section) = section else {
        return Ok(FaultInjectionConfig::disabled());
    };
    if section.is_null() {
        return Ok(FaultInjectionConfig::disabled());
    }
    let Some(map) = section.as_mapping() else {
        return Err(config_error("'fault_injection' must be a dictionary"));
    };

    let enabled = match map.get("enabled") {
        None => false,
        Some(YamlValue::Bool(b)) => *b,
        Some(_) => return Err(config_error("'fault_injection.enabled' must be a boolean")),
    };
    if !enabled {
        return Ok(FaultInjectionConfig::disabled());
    }

    let names = match map.get("profiles") {
        None | Some(YamlValue::Null) => Vec::new(),
        Some(YamlValue::Sequence(items)) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::to_string).ok_or_else(|| {
                    config_error("'fault_injection.profiles' must be a list of strings")
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        Some(_) => return Err(config_error("'fault_injection.profiles' must be a list")),
    };

    let mut profiles = Vec::with_capacity(names.len());
    for name in names {
        let block = map.get(name.as_str()).ok_or_else(|| {
            CanaryError::ConfigurationError(format!(
                "Fault profile '{}' is enabled but has no configuration block",
                name
            ))
        })?;
        if !block.is_mapping() {
            return Err(CanaryError::ConfigurationError(format!(
                "Fault profile '{}' configuration must be a dictionary",
                name
            )));
        }

        let parameters: BTreeMap<String, JsonValue> = serde_yaml::from_value(block.clone())
            .map_err(|e| {
                CanaryError::ConfigurationError(format!(
                    "Fault profile '{}' has invalid parameters: {}",
                    name, e
                ))
            })?;
        validate_profile_parameters(&name, &parameters)?;
        profiles.push(FaultProfile::new(name, parameters));
    }

    Ok(FaultInjectionConfig::new(profiles))
}

/// Range-check the parameters of a known profile
///
/// Unknown profiles pass unchecked.
pub fn validate_profile_parameters(
    profile: &str,
    parameters: &BTreeMap<String, JsonValue>,
) -> Result<(), CanaryError> {
    let check = |key: &str, valid: fn(&JsonValue) -> bool, expected: &str| {
        match parameters.get(key) {
            Some(value) if !valid(value) => Err(CanaryError::ConfigurationError(format!(
                "{}.{} must be {}, got {}",
                profile, key, expected, value
            ))),
            _ => Ok(()),
        }
    };

    match profile {
        HIGH_LATENCY => {
            check("llm_latency_ms", is_non_negative_number, "a non-negative number")?;
            check("tool_latency_ms", is_non_negative_number, "a non-negative number")?;
        }
        INTERMITTENT_FAILURES => {
            check("tool_failure_rate", is_unit_interval, "between 0.0 and 1.0")?;
            check("llm_failure_rate", is_unit_interval, "between 0.0 and 1.0")?;
            check(
                "failure_pattern",
                is_failure_pattern,
                "one of [\"random\", \"periodic\", \"burst\"]",
            )?;
        }
        RATE_LIMITS => {
            check("trigger_after_calls", is_positive_integer, "a positive integer")?;
        }
        TOKEN_LIMITS => {
            check("max_tokens", is_positive_integer, "a positive integer")?;
            check("exceed_by", is_non_negative_integer, "a non-negative integer")?;
        }
        PARTIAL_RESPONSES => {
            check("completeness_ratio", is_unit_interval, "between 0.0 and 1.0")?;
        }
        _ => {}
    }

    Ok(())
}

fn config_error(message: &str) -> CanaryError {
    CanaryError::ConfigurationError(message.to_string())
}

fn is_non_negative_number(value: &JsonValue) -> bool {
    value.as_f64().is_some_and(|v| v >= 0.0)
}

fn is_unit_interval(value: &JsonValue) -> bool {
    value.as_f64().is_some_and(|v| (0.0..=1.0).contains(&v))
}

fn is_positive_integer(value: &JsonValue) -> bool {
    value.as_u64().is_some_and(|v| v >= 1)
}

fn is_non_negative_integer(value: &JsonValue) -> bool {
    value.as_u64().is_some()
}

fn is_failure_pattern(value: &JsonValue) -> bool {
    value
        .as_str()
        .is_some_and(|s| s.parse::<FailurePattern>().is_ok())
}
