//! HTTP telemetry validator tests against mocked Prometheus and OpenSearch

use agent_canary::config::ValidationSettings;
use agent_canary::{HttpTelemetryValidator, TelemetryValidator};
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{basic_auth, body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(prometheus_url: &str, opensearch_url: &str) -> ValidationSettings {
    ValidationSettings {
        prometheus_url: prometheus_url.to_string(),
        opensearch_url: opensearch_url.to_string(),
        opensearch_user: "admin".to_string(),
        opensearch_password: SecretString::new("secret".to_string()),
        ingestion_wait_secs: 0,
        timeout_secs: 5,
    }
}

/// The validator uses a blocking client; keep it off the async workers.
async fn with_validator<F, T>(settings: ValidationSettings, check: F) -> T
where
    F: FnOnce(&HttpTelemetryValidator) -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let validator = HttpTelemetryValidator::new(&settings).unwrap();
        check(&validator)
    })
    .await
    .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_metrics_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/query"))
        .and(query_param(
            "query",
            "gen_ai_client_token_usage_total{service_name=\"Canary Agent\"}",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": {"resultType": "vector", "result": [{"metric": {}, "value": [0, "12"]}]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let errors = with_validator(settings(&server.uri(), &server.uri()), |v| {
        v.validate_metrics("conv_simple_1", Some("Canary Agent"))
    })
    .await;
    assert!(errors.is_empty(), "{:?}", errors);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_metrics_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "data": {"resultType": "vector", "result": []}
        })))
        .mount(&server)
        .await;

    let errors = with_validator(settings(&server.uri(), &server.uri()), |v| {
        v.validate_metrics("conv_simple_1", Some("Canary Agent"))
    })
    .await;
    assert_eq!(
        errors,
        vec![
            "No gen_ai_client_token_usage_total metrics found in Prometheus for agent: Canary Agent"
                .to_string()
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_metrics_http_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/query"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let errors = with_validator(settings(&server.uri(), &server.uri()), |v| {
        v.validate_metrics("conv_simple_1", None)
    })
    .await;
    assert_eq!(
        errors,
        vec!["Prometheus query failed with status 503: unavailable".to_string()]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_traces_checked_per_span() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/otel-v1-apm-span-*/_search"))
        .and(basic_auth("admin", "secret"))
        .and(body_partial_json(json!({
            "query": {"bool": {"must": [
                {"term": {"attributes.gen_ai.conversation.id.keyword": "conv_multi_1"}}
            ]}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "hits": {"hits": [
                {"_source": {"spanId": "good", "attributes": {
                    "gen_ai.operation.name": "invoke_agent",
                    "gen_ai.agent.id": "canary_001",
                    "gen_ai.agent.name": "Canary Agent"
                }}},
                {"_source": {"spanId": "tool", "attributes": {
                    "gen_ai.operation.name": "execute_tool",
                    "gen_ai.agent.id": "canary_001",
                    "gen_ai.agent.name": "Canary Agent"
                }}},
                {"_source": {"spanId": "bare", "attributes": {
                    "gen_ai.operation.name": "invoke_agent"
                }}}
            ]}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let errors = with_validator(settings(&server.uri(), &server.uri()), |v| {
        v.validate_traces("conv_multi_1")
    })
    .await;
    assert_eq!(
        errors,
        vec![
            "Span tool: Tool execution span missing 'gen_ai.tool.name' attribute".to_string(),
            "Span bare: Missing required attribute 'gen_ai.agent.id'".to_string(),
            "Span bare: Missing required attribute 'gen_ai.agent.name'".to_string(),
        ]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_no_traces_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/otel-v1-apm-span-*/_search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"hits": {"hits": []}})))
        .mount(&server)
        .await;

    let errors = with_validator(settings(&server.uri(), &server.uri()), |v| {
        v.validate_traces("conv_missing")
    })
    .await;
    assert_eq!(
        errors,
        vec!["No traces found in OpenSearch for conversation_id: conv_missing".to_string()]
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn test_unreachable_backends_become_errors() {
    // Nothing listens on the discard port.
    let errors = with_validator(
        settings("http://127.0.0.1:9", "http://127.0.0.1:9"),
        |v| v.validate("conv_simple_1"),
    )
    .await;
    assert_eq!(errors.len(), 2);
    assert!(errors[0].starts_with("Failed to connect to Prometheus"));
    assert!(errors[1].starts_with("Failed to connect to OpenSearch"));
}
