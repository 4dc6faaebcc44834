//! End-to-end runner tests

use agent_canary::config::load_from_str;
use agent_canary::{CanaryRunner, RunnerState, TelemetryValidator};
use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

const FAST_MOCK: &str = r#"
mock_settings:
  llm_latency_ms: 0
  tool_latency_ms: 0
"#;

fn config_yaml(scenarios: &str, extra: &str) -> String {
    format!(
        "mode: mock\nagent:\n  agent_name: \"A\"\notlp:\n  endpoint: \"x\"\nscenarios: {}\n{}{}",
        scenarios, FAST_MOCK, extra
    )
}

#[test]
fn test_minimal_config_exits_zero() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("canary.yaml");
    fs::write(
        &path,
        r#"
mode: mock
agent:
  agent_name: "A"
otlp:
  endpoint: "x"
scenarios: ["simple_tool_call"]
"#,
    )
    .unwrap();

    let mut runner = CanaryRunner::from_path(&path);
    let summary = runner.run().unwrap();

    assert_eq!(runner.state(), RunnerState::Reported);
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(summary.results.len(), 1);
    assert!(summary.results[0].success);
    assert_eq!(summary.results[0].scenario_name, "simple_tool_call");
}

#[test]
fn test_missing_config_file_exits_one() {
    let temp_dir = TempDir::new().unwrap();
    let mut runner = CanaryRunner::from_path(temp_dir.path().join("nope.yaml"));
    assert_eq!(runner.run_exit_code(), 1);
    assert_eq!(runner.state(), RunnerState::Failed);
}

#[test]
fn test_all_scenarios_pass_without_faults() {
    let config = load_from_str(&config_yaml(
        "[simple_tool_call, multi_tool_chain, tool_failure, high_token_usage, conversation_context, multi_agent]",
        "",
    ))
    .unwrap();

    let summary = CanaryRunner::from_config(config).run().unwrap();
    assert_eq!(summary.total, 6);
    assert_eq!(summary.failed, 0, "{}", summary.format_report());
    assert!(summary
        .results
        .iter()
        .all(|r| r.conversation_id.is_some()));
}

#[test]
fn test_tool_failure_rate_one() {
    let config = load_from_str(&config_yaml(
        "[tool_failure, simple_tool_call]",
        "  tool_failure_rate: 1.0\n",
    ))
    .unwrap();

    let summary = CanaryRunner::from_config(config).run().unwrap();
    let tool_failure = &summary.results[0];
    assert!(tool_failure.success);
    assert!(tool_failure
        .error_message
        .as_deref()
        .unwrap()
        .starts_with("Expected tool failure: Mock tool failure"));

    let simple = &summary.results[1];
    assert!(!simple.success);
    assert_eq!(summary.exit_code(), 1);
}

#[test]
fn test_unknown_scenario_skipped() {
    let config = load_from_str(&config_yaml(
        "[simple_tool_call, does_not_exist, conversation_context]",
        "",
    ))
    .unwrap();

    let summary = CanaryRunner::from_config(config).run().unwrap();
    let names: Vec<_> = summary
        .results
        .iter()
        .map(|r| r.scenario_name.as_str())
        .collect();
    assert_eq!(names, vec!["simple_tool_call", "conversation_context"]);
    assert_eq!(summary.exit_code(), 0);
}

#[test]
fn test_rate_limit_fault_stamps_results() {
    let config = load_from_str(&config_yaml(
        "[multi_tool_chain]",
        r#"
fault_injection:
  enabled: true
  profiles: [rate_limits]
  rate_limits:
    trigger_after_calls: 1
"#,
    ))
    .unwrap();

    let summary = CanaryRunner::from_config(config).run().unwrap();
    let result = &summary.results[0];
    assert!(!result.success);
    assert!(result.error_message.as_deref().unwrap().contains("429"));
    assert!(result.fault_injection_enabled);
    assert_eq!(
        result.active_fault_profiles,
        Some(vec!["rate_limits".to_string()])
    );
}

#[test]
fn test_hierarchy_children_run_in_multi_agent() {
    let yaml = r#"
mode: mock
agent:
  agent_id: root
  agent_name: Root
  children:
    - agent_id: child_a
      agent_name: Alpha
      span_kind: client
    - agent_id: child_b
      agent_name: Beta
      span_kind: not_a_kind
otlp:
  endpoint: "x"
scenarios: [multi_agent]
mock_settings:
  llm_latency_ms: 0
  tool_latency_ms: 0
"#;
    let summary = CanaryRunner::from_config(load_from_str(yaml).unwrap())
        .run()
        .unwrap();
    assert!(summary.results[0].success, "{}", summary.format_report());
}

#[derive(Clone, Default)]
struct RecordingValidator {
    seen: Arc<Mutex<Vec<String>>>,
}

impl TelemetryValidator for RecordingValidator {
    fn validate_metrics(&self, conversation_id: &str, agent_name: Option<&str>) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .push(format!("metrics:{}:{}", conversation_id, agent_name.unwrap_or("")));
        Vec::new()
    }

    fn validate_traces(&self, conversation_id: &str) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .push(format!("traces:{}", conversation_id));
        vec!["Span abc: Missing required attribute 'gen_ai.agent.id'".to_string()]
    }
}

#[test]
fn test_validation_only_for_successful_results_and_never_fatal() {
    let config = load_from_str(&config_yaml(
        "[simple_tool_call, multi_tool_chain]",
        r#"
validation:
  prometheus_url: http://localhost:9090
  opensearch_url: http://localhost:9200
  ingestion_wait_secs: 0
fault_injection:
  enabled: true
  profiles: [rate_limits]
  rate_limits:
    trigger_after_calls: 1
"#,
    ))
    .unwrap();

    let validator = RecordingValidator::default();
    let mut runner = CanaryRunner::from_config(config).with_validator(Box::new(validator.clone()));
    let summary = runner.run().unwrap();

    assert_eq!(runner.state(), RunnerState::Reported);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.validation.len(), 1);
    assert_eq!(summary.validation[0].scenario_name, "simple_tool_call");
    assert_eq!(summary.validation[0].trace_errors.len(), 1);
    assert_eq!(summary.exit_code(), 1);

    let seen = validator.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert!(seen[0].starts_with("metrics:conv_simple_"));
    assert!(seen[0].ends_with(":A"));
    assert!(summary.format_report().contains("Telemetry Validation:"));
}

#[test]
fn test_validation_skipped_without_section() {
    let config = load_from_str(&config_yaml("[simple_tool_call]", "")).unwrap();
    let validator = RecordingValidator::default();

    let summary = CanaryRunner::from_config(config)
        .with_validator(Box::new(validator.clone()))
        .run()
        .unwrap();

    assert!(summary.validation.is_empty());
    assert!(validator.seen.lock().unwrap().is_empty());
}

struct PanickingValidator;

impl TelemetryValidator for PanickingValidator {
    fn validate_metrics(&self, _conversation_id: &str, _agent_name: Option<&str>) -> Vec<String> {
        panic!("prometheus client poisoned");
    }

    fn validate_traces(&self, _conversation_id: &str) -> Vec<String> {
        Vec::new()
    }
}

#[test]
fn test_validator_panic_does_not_change_exit_code() {
    let config = load_from_str(&config_yaml(
        "[simple_tool_call]",
        r#"
validation:
  prometheus_url: http://localhost:9090
  opensearch_url: http://localhost:9200
  ingestion_wait_secs: 0
"#,
    ))
    .unwrap();

    let mut runner = CanaryRunner::from_config(config).with_validator(Box::new(PanickingValidator));
    let summary = runner.run().unwrap();

    assert_eq!(runner.state(), RunnerState::Reported);
    assert_eq!(summary.exit_code(), 0);
    assert_eq!(summary.validation.len(), 1);
    assert_eq!(
        summary.validation[0].metric_errors,
        vec!["Metrics validation panicked: prometheus client poisoned".to_string()]
    );
    assert!(summary.validation[0].trace_errors.is_empty());
}
