//! Unit tests for the mock providers

use agent_canary::faults::FailurePattern;
use agent_canary::providers::{
    ChatMessage, LlmProvider, MockLlmProvider, MockToolProvider, ToolProvider,
};
use agent_canary::CanaryError;
use serde_json::json;

#[test]
fn test_rate_limit_boundary() {
    let mut llm = MockLlmProvider::new(0).with_rate_limit(3);
    let messages = [ChatMessage::user("hi")];

    for _ in 0..3 {
        assert!(llm.call("gpt-4", &messages, &[]).is_ok());
    }
    let err = llm.call("gpt-4", &messages, &[]).unwrap_err();
    assert!(matches!(
        err,
        CanaryError::RateLimitExceeded {
            call_count: 4,
            limit: 3
        }
    ));
    assert_eq!(llm.call_count(), 4);
}

#[test]
fn test_token_limit_exceed_by_pads_usage() {
    let messages = [ChatMessage::user("hi")];

    let mut roomy = MockLlmProvider::new(0).with_token_limit(1000, 0);
    let usage = roomy.call("gpt-4", &messages, &[]).unwrap().usage;

    let mut padded = MockLlmProvider::new(0).with_token_limit(usage.total_tokens + 5, 10);
    assert!(matches!(
        padded.call("gpt-4", &messages, &[]),
        Err(CanaryError::TokenLimitExceeded { .. })
    ));
}

#[test]
fn test_llm_failure_message() {
    let mut llm = MockLlmProvider::new(0)
        .with_failures(1.0, FailurePattern::Periodic)
        .unwrap();
    let err = llm.call("gpt-4", &[ChatMessage::user("hi")], &[]).unwrap_err();
    assert!(err.to_string().starts_with("Mock LLM failure"));
    assert!(!err.is_tool_failure());
}

#[test]
fn test_tool_search_and_unknown() {
    let mut tools = MockToolProvider::new(0.0, 0).unwrap();

    let result = tools.execute("search", &json!({"query": "rust"})).unwrap();
    assert_eq!(result["results"][0]["title"], "Result 1 for rust");

    let err = tools.execute("teleport", &json!({})).unwrap_err();
    assert!(matches!(err, CanaryError::UnknownTool(ref name) if name == "teleport"));
}

#[test]
fn test_tool_failure_classified() {
    let mut tools = MockToolProvider::new(1.0, 0).unwrap();
    let err = tools
        .execute("get_weather", &json!({"location": "Tokyo"}))
        .unwrap_err();
    assert!(err.is_tool_failure());
    assert!(err.to_string().starts_with("Mock tool failure"));
}

#[test]
fn test_invalid_rates_rejected() {
    assert!(MockToolProvider::new(1.01, 0).is_err());
    assert!(MockLlmProvider::new(0)
        .with_failures(-0.5, FailurePattern::Random)
        .is_err());
    assert!(MockLlmProvider::new(0).with_completeness_ratio(1.5).is_err());
}
