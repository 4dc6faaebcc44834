//! Unit tests for fault profiles flowing from YAML into agents

use agent_canary::agent::AgentConfig;
use agent_canary::config::load_from_str;
use agent_canary::{AgentFactory, CanaryError, ObservabilityManager};
use std::time::{Duration, Instant};

fn agent_for(fault_section: &str) -> agent_canary::ConfigurableAgent {
    let yaml = format!(
        r#"
mode: mock
agent:
  agent_id: faulty_001
  agent_name: Faulty
otlp:
  endpoint: http://localhost:4317
scenarios: [simple_tool_call]
mock_settings:
  llm_latency_ms: 0
  tool_latency_ms: 0
fault_injection:
{}
"#,
        fault_section
    );
    let config = load_from_str(&yaml).unwrap();
    let base = AgentConfig::mock(
        config.agent.agent_id.clone(),
        config.agent.agent_name.clone(),
        config.mock_settings.clone(),
    );
    AgentFactory::new(ObservabilityManager::disabled())
        .build_hierarchy(&config.agent, &base, Some(&config.fault_injection))
        .unwrap()
}

#[test]
fn test_high_latency_slows_invocation() {
    let mut agent = agent_for(
        "  enabled: true\n  profiles: [high_latency]\n  high_latency:\n    llm_latency_ms: 40\n    tool_latency_ms: 20\n",
    );

    let start = Instant::now();
    agent.invoke("What's the weather in Paris?", "conv_latency").unwrap();
    assert!(start.elapsed() >= Duration::from_millis(60));
}

#[test]
fn test_token_limit_rejects_response() {
    let mut agent = agent_for(
        "  enabled: true\n  profiles: [token_limits]\n  token_limits:\n    max_tokens: 10\n",
    );

    let err = agent
        .invoke("What's the weather in Paris?", "conv_tokens")
        .unwrap_err();
    assert!(matches!(
        err,
        CanaryError::TokenLimitExceeded { max_tokens: 10, .. }
    ));
    assert!(err.is_injected_fault());
}

#[test]
fn test_rate_limit_after_trigger() {
    let mut agent = agent_for(
        "  enabled: true\n  profiles: [rate_limits]\n  rate_limits:\n    trigger_after_calls: 2\n",
    );

    assert!(agent.invoke("Hello", "conv_rate").is_ok());
    assert!(agent.invoke("Hello", "conv_rate").is_ok());
    let err = agent.invoke("Hello", "conv_rate").unwrap_err();
    assert_eq!(err.status_code(), Some(429));
}

#[test]
fn test_partial_responses_truncate_tool_output() {
    let mut agent = agent_for(
        "  enabled: true\n  profiles: [partial_responses]\n  partial_responses:\n    completeness_ratio: 0.5\n",
    );

    let answer = agent
        .invoke("What's the weather in Paris?", "conv_partial")
        .unwrap();
    assert_eq!(answer, "The weather in Pa is su with a temperature of 72.");
}

#[test]
fn test_intermittent_periodic_tool_failures() {
    let mut agent = agent_for(
        "  enabled: true\n  profiles: [intermittent_failures]\n  intermittent_failures:\n    tool_failure_rate: 0.5\n    failure_pattern: periodic\n",
    );

    let outcomes: Vec<bool> = (0..4)
        .map(|_| agent.invoke("What's the weather in Paris?", "conv_periodic").is_ok())
        .collect();
    assert_eq!(outcomes, vec![true, false, true, false]);
}

#[test]
fn test_disabled_section_has_no_effect() {
    let mut agent = agent_for(
        "  enabled: false\n  profiles: [token_limits]\n  token_limits:\n    max_tokens: 1\n",
    );
    assert!(agent.invoke("What's the weather in Paris?", "conv_off").is_ok());
}
