//! Telemetry validation
//!
//! After a run, the runner asks a `TelemetryValidator` whether the metrics and
//! traces of each successful scenario reached the observability backends.
//! Problems come back as error strings; validation never fails a run.

use crate::config::ValidationSettings;
use crate::error::CanaryError;
use reqwest::blocking::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Span attributes every stored span must carry
const REQUIRED_SPAN_ATTRIBUTES: [&str; 3] =
    ["gen_ai.operation.name", "gen_ai.agent.id", "gen_ai.agent.name"];

/// Queries backends for the telemetry of one conversation
pub trait TelemetryValidator: Send {
    /// Check that token usage metrics exist, optionally for one agent
    fn validate_metrics(&self, conversation_id: &str, agent_name: Option<&str>) -> Vec<String>;

    /// Check the stored spans of a conversation
    fn validate_traces(&self, conversation_id: &str) -> Vec<String>;

    /// Metrics and traces combined
    fn validate(&self, conversation_id: &str) -> Vec<String> {
        let mut errors = self.validate_metrics(conversation_id, None);
        errors.extend(self.validate_traces(conversation_id));
        errors
    }
}

/// Validator backed by Prometheus (metrics) and OpenSearch (traces)
pub struct HttpTelemetryValidator {
    prometheus_url: String,
    opensearch_url: String,
    opensearch_user: String,
    opensearch_password: SecretString,
    client: Client,
}

impl HttpTelemetryValidator {
    /// Create a validator from settings
    ///
    /// OpenSearch certificates are not verified; development stacks use
    /// self-signed certificates.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the HTTP client cannot be built.
    pub fn new(settings: &ValidationSettings) -> Result<Self, CanaryError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| {
                CanaryError::ValidationError(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            prometheus_url: settings.prometheus_url.trim_end_matches('/').to_string(),
            opensearch_url: settings.opensearch_url.trim_end_matches('/').to_string(),
            opensearch_user: settings.opensearch_user.clone(),
            opensearch_password: settings.opensearch_password.clone(),
            client,
        })
    }

    fn query_prometheus(&self, query: &str) -> Result<Value, String> {
        let response = self
            .client
            .get(format!("{}/api/v1/query", self.prometheus_url))
            .query(&[("query", query)])
            .send()
            .map_err(|e| format!("Failed to connect to Prometheus: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(format!(
                "Prometheus query failed with status {}: {}",
                status.as_u16(),
                body
            ));
        }

        response
            .json::<Value>()
            .map_err(|e| format!("Unexpected error querying Prometheus: {}", e))
    }

    fn search_spans(&self, conversation_id: &str) -> Result<Value, String> {
        let query = json!({
            "query": {
                "bool": {
                    "must": [
                        {"term": {"attributes.gen_ai.conversation.id.keyword": conversation_id}}
                    ]
                }
            },
            "size": 100
        });

        let response = self
            .client
            .post(format!("{}/otel-v1-apm-span-*/_search", self.opensearch_url))
            .basic_auth(
                &self.opensearch_user,
                Some(self.opensearch_password.expose_secret()),
            )
            .json(&query)
            .send()
            .map_err(|e| format!("Failed to connect to OpenSearch: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(format!(
                "OpenSearch query failed with status {}: {}",
                status.as_u16(),
                body
            ));
        }

        response
            .json::<Value>()
            .map_err(|e| format!("Unexpected error querying OpenSearch: {}", e))
    }
}

impl TelemetryValidator for HttpTelemetryValidator {
    fn validate_metrics(&self, conversation_id: &str, agent_name: Option<&str>) -> Vec<String> {
        // Conversation ids are too high-cardinality for metric labels; filter
        // by service instead.
        let query = match agent_name {
            Some(name) => format!("gen_ai_client_token_usage_total{{service_name=\"{}\"}}", name),
            None => "gen_ai_client_token_usage_total".to_string(),
        };
        debug!(conversation_id, query = %query, "Validating metrics");

        let data = match self.query_prometheus(&query) {
            Ok(data) => data,
            Err(e) => return vec![e],
        };

        let status = data.get("status").and_then(Value::as_str);
        if status != Some("success") {
            return vec![format!(
                "Prometheus query returned non-success status: {}",
                status.unwrap_or("missing")
            )];
        }

        let has_results = data
            .pointer("/data/result")
            .and_then(Value::as_array)
            .is_some_and(|r| !r.is_empty());
        if has_results {
            return Vec::new();
        }

        match agent_name {
            Some(name) => vec![format!(
                "No gen_ai_client_token_usage_total metrics found in Prometheus for agent: {}",
                name
            )],
            None => vec!["No gen_ai_client_token_usage_total metrics found in Prometheus".to_string()],
        }
    }

    fn validate_traces(&self, conversation_id: &str) -> Vec<String> {
        debug!(conversation_id, "Validating traces");

        let data = match self.search_spans(conversation_id) {
            Ok(data) => data,
            Err(e) => return vec![e],
        };

        let hits = data
            .pointer("/hits/hits")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        if hits.is_empty() {
            return vec![format!(
                "No traces found in OpenSearch for conversation_id: {}",
                conversation_id
            )];
        }

        let mut errors = Vec::new();
        for (i, hit) in hits.iter().enumerate() {
            let source = hit.get("_source").unwrap_or(&Value::Null);
            let span_id = source
                .get("spanId")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("span_{}", i));
            let attributes = source.get("attributes").unwrap_or(&Value::Null);
            let present = |key: &str| attributes.get(key).is_some_and(|v| !v.is_null());

            for attr in REQUIRED_SPAN_ATTRIBUTES {
                if !present(attr) {
                    errors.push(format!(
                        "Span {}: Missing required attribute '{}'",
                        span_id, attr
                    ));
                }
            }

            let operation = attributes.get("gen_ai.operation.name").and_then(Value::as_str);
            if operation == Some("execute_tool") && !present("gen_ai.tool.name") {
                errors.push(format!(
                    "Span {}: Tool execution span missing 'gen_ai.tool.name' attribute",
                    span_id
                ));
            }
        }

        errors
    }
}
