//! OpenTelemetry pipeline for canary agents
//!
//! Owns the tracer and meter providers. A disabled manager builds providers
//! without exporters, so agents run the same instrumentation code whether or
//! not telemetry leaves the process.

use crate::config::{OtlpProtocol, OtlpSettings};
use crate::error::CanaryError;
use opentelemetry::metrics::{Counter, Histogram, MeterProvider as _};
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::metrics::{PeriodicReader, SdkMeterProvider};
use opentelemetry_sdk::trace::{SdkTracer, SdkTracerProvider};
use opentelemetry_sdk::Resource;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Instrumentation scope name
pub const INSTRUMENTATION_SCOPE: &str = "agent-canary";

/// Metric: tokens consumed by LLM calls
pub const TOKEN_USAGE_METRIC: &str = "gen_ai.client.token.usage";

/// Metric: duration of agent operations
pub const OPERATION_DURATION_METRIC: &str = "gen_ai.client.operation.duration";

/// Observability manager holding the tracer and meter providers
#[derive(Clone)]
pub struct ObservabilityManager {
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
    enabled: bool,
}

impl ObservabilityManager {
    /// A manager whose spans and metrics go nowhere
    pub fn disabled() -> Self {
        Self {
            tracer_provider: SdkTracerProvider::builder().build(),
            meter_provider: SdkMeterProvider::builder().build(),
            enabled: false,
        }
    }

    /// Wrap existing providers (in-memory exporters in tests)
    pub fn from_providers(
        tracer_provider: SdkTracerProvider,
        meter_provider: SdkMeterProvider,
    ) -> Self {
        Self {
            tracer_provider,
            meter_provider,
            enabled: true,
        }
    }

    /// Build OTLP span and metric pipelines
    ///
    /// Must be called with a tokio runtime entered when the gRPC transport is
    /// used. Returns a disabled manager when `settings.enabled` is false.
    ///
    /// # Arguments
    ///
    /// * `settings` - OTLP endpoint, protocol and export interval
    /// * `service_name` - `service.name` resource attribute
    ///
    /// # Errors
    ///
    /// Returns `TelemetryError` if an exporter cannot be built.
    pub fn from_otlp(settings: &OtlpSettings, service_name: &str) -> Result<Self, CanaryError> {
        if !settings.enabled {
            debug!("OTLP export disabled");
            return Ok(Self::disabled());
        }

        let resource = build_resource(service_name);

        let span_exporter = match settings.protocol {
            OtlpProtocol::Grpc => opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(settings.endpoint.clone())
                .build(),
            OtlpProtocol::Http => opentelemetry_otlp::SpanExporter::builder()
                .with_http()
                .with_endpoint(signal_endpoint(&settings.endpoint, "traces"))
                .build(),
        }
        .map_err(|e| {
            CanaryError::TelemetryError(format!("Failed to build span exporter: {}", e))
        })?;

        let metric_exporter = match settings.protocol {
            OtlpProtocol::Grpc => opentelemetry_otlp::MetricExporter::builder()
                .with_tonic()
                .with_endpoint(settings.endpoint.clone())
                .build(),
            OtlpProtocol::Http => opentelemetry_otlp::MetricExporter::builder()
                .with_http()
                .with_endpoint(signal_endpoint(&settings.endpoint, "metrics"))
                .build(),
        }
        .map_err(|e| {
            CanaryError::TelemetryError(format!("Failed to build metric exporter: {}", e))
        })?;

        let tracer_provider = SdkTracerProvider::builder()
            .with_batch_exporter(span_exporter)
            .with_resource(resource.clone())
            .build();

        let reader = PeriodicReader::builder(metric_exporter)
            .with_interval(Duration::from_millis(settings.export_interval_ms))
            .build();
        let meter_provider = SdkMeterProvider::builder()
            .with_reader(reader)
            .with_resource(resource)
            .build();

        info!(
            endpoint = %settings.endpoint,
            protocol = ?settings.protocol,
            service_name = service_name,
            "OTLP export initialized"
        );

        Ok(Self {
            tracer_provider,
            meter_provider,
            enabled: true,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Tracer and instruments for one agent
    pub fn agent_telemetry(&self) -> AgentTelemetry {
        let meter = self.meter_provider.meter(INSTRUMENTATION_SCOPE);

        AgentTelemetry {
            tracer: self.tracer_provider.tracer(INSTRUMENTATION_SCOPE),
            token_usage: meter
                .u64_counter(TOKEN_USAGE_METRIC)
                .with_description("Number of tokens used in LLM operations")
                .with_unit("token")
                .build(),
            operation_duration: meter
                .f64_histogram(OPERATION_DURATION_METRIC)
                .with_description("Duration of agent operations")
                .with_unit("s")
                .build(),
        }
    }

    /// Flush pending spans and metrics
    pub fn flush(&self) -> Result<(), CanaryError> {
        self.tracer_provider
            .force_flush()
            .map_err(|e| CanaryError::TelemetryError(format!("Failed to flush spans: {}", e)))?;
        self.meter_provider
            .force_flush()
            .map_err(|e| CanaryError::TelemetryError(format!("Failed to flush metrics: {}", e)))
    }

    /// Flush and shut down both providers
    ///
    /// Failures are logged; shutdown always attempts both providers.
    pub fn shutdown(&self) {
        if !self.enabled {
            return;
        }
        if let Err(e) = self.tracer_provider.shutdown() {
            warn!("Failed to shutdown tracer provider: {}", e);
        }
        if let Err(e) = self.meter_provider.shutdown() {
            warn!("Failed to shutdown meter provider: {}", e);
        }
    }
}

impl std::fmt::Debug for ObservabilityManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObservabilityManager")
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Per-agent tracer and metric instruments
#[derive(Clone)]
pub struct AgentTelemetry {
    tracer: SdkTracer,
    token_usage: Counter<u64>,
    operation_duration: Histogram<f64>,
}

impl AgentTelemetry {
    pub fn tracer(&self) -> &SdkTracer {
        &self.tracer
    }

    /// Record input and output token counts
    pub fn record_tokens(&self, input: u64, output: u64, attributes: &[KeyValue]) {
        let mut attrs = attributes.to_vec();
        attrs.push(KeyValue::new("gen_ai.token.type", "input"));
        self.token_usage.add(input, &attrs);

        if let Some(last) = attrs.last_mut() {
            *last = KeyValue::new("gen_ai.token.type", "output");
        }
        self.token_usage.add(output, &attrs);
    }

    pub fn record_duration(&self, duration: Duration, attributes: &[KeyValue]) {
        self.operation_duration
            .record(duration.as_secs_f64(), attributes);
    }
}

fn build_resource(service_name: &str) -> Resource {
    Resource::builder()
        .with_service_name(service_name.to_string())
        .with_attributes(vec![
            KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
            KeyValue::new("deployment.environment", "canary"),
        ])
        .build()
}

/// OTLP/HTTP expects one path per signal
fn signal_endpoint(endpoint: &str, signal: &str) -> String {
    let base = endpoint.trim_end_matches('/');
    let suffix = format!("/v1/{}", signal);
    if base.ends_with(&suffix) {
        base.to_string()
    } else {
        format!("{}{}", base, suffix)
    }
}
