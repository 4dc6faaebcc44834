//! Span shape and nesting tests using an in-memory exporter

use agent_canary::agent::AgentConfig;
use agent_canary::config::{AgentNodeConfig, MockSettings};
use agent_canary::scenarios::{MultiAgentScenario, Scenario, SimpleToolCallScenario};
use agent_canary::{AgentFactory, ObservabilityManager};
use opentelemetry::trace::{SpanId, SpanKind, Status};
use opentelemetry::Value;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::{InMemorySpanExporter, SdkTracerProvider, SpanData};

fn traced_factory() -> (AgentFactory, InMemorySpanExporter) {
    let exporter = InMemorySpanExporter::default();
    let tracer_provider = SdkTracerProvider::builder()
        .with_simple_exporter(exporter.clone())
        .build();
    let manager =
        ObservabilityManager::from_providers(tracer_provider, SdkMeterProvider::builder().build());
    (AgentFactory::new(manager), exporter)
}

fn attribute(span: &SpanData, key: &str) -> Option<Value> {
    span.attributes
        .iter()
        .find(|kv| kv.key.as_str() == key)
        .map(|kv| kv.value.clone())
}

fn find<'a>(spans: &'a [SpanData], name: &str) -> &'a SpanData {
    spans
        .iter()
        .find(|s| s.name == name)
        .unwrap_or_else(|| panic!("no span named {}", name))
}

#[test]
fn test_tool_span_nests_under_invoke_agent() {
    let (factory, exporter) = traced_factory();
    let mut agent = factory
        .create_mock_agent("canary_001", "Canary Agent", &MockSettings::instant())
        .unwrap();

    let result = SimpleToolCallScenario.execute(&mut agent).unwrap();
    assert!(result.success);

    let spans = exporter.get_finished_spans().unwrap();
    assert_eq!(spans.len(), 2);

    let invoke = find(&spans, "invoke_agent Canary Agent");
    let tool = find(&spans, "execute_tool get_weather");

    assert_eq!(invoke.parent_span_id, SpanId::INVALID);
    assert_eq!(tool.parent_span_id, invoke.span_context.span_id());
    assert_eq!(tool.span_context.trace_id(), invoke.span_context.trace_id());
    assert_eq!(invoke.span_kind, SpanKind::Internal);
    assert_eq!(tool.span_kind, SpanKind::Internal);

    assert_eq!(
        attribute(invoke, "gen_ai.conversation.id"),
        result.conversation_id.map(Value::from)
    );
    assert_eq!(
        attribute(invoke, "gen_ai.operation.name"),
        Some(Value::from("invoke_agent"))
    );
    assert_eq!(
        attribute(invoke, "gen_ai.provider.name"),
        Some(Value::from("mock"))
    );
    assert!(attribute(invoke, "gen_ai.usage.input_tokens").is_some());
    assert!(attribute(invoke, "gen_ai.response.id").is_some());
    assert_eq!(
        attribute(tool, "gen_ai.tool.name"),
        Some(Value::from("get_weather"))
    );
    assert_eq!(
        attribute(tool, "gen_ai.agent.id"),
        Some(Value::from("canary_001"))
    );

    let invoke_events: Vec<_> = invoke.events.events.iter().map(|e| &*e.name).collect();
    assert_eq!(
        invoke_events,
        vec![
            "gen_ai.client.inference.operation.details",
            "gen_ai.client.inference.operation.details"
        ]
    );
    let tool_events: Vec<_> = tool.events.events.iter().map(|e| &*e.name).collect();
    assert_eq!(
        tool_events,
        vec!["tool_execution_start", "tool_execution_complete"]
    );
}

#[test]
fn test_failed_tool_marks_both_spans() {
    let (factory, exporter) = traced_factory();
    let settings = MockSettings {
        tool_failure_rate: 1.0,
        ..MockSettings::instant()
    };
    let mut agent = factory
        .create_mock_agent("canary_001", "Canary Agent", &settings)
        .unwrap();

    assert!(agent.invoke("What's the weather in Paris?", "conv_x").is_err());

    let spans = exporter.get_finished_spans().unwrap();
    let invoke = find(&spans, "invoke_agent Canary Agent");
    let tool = find(&spans, "execute_tool get_weather");
    assert!(matches!(invoke.status, Status::Error { .. }));
    assert!(matches!(tool.status, Status::Error { .. }));
    assert!(tool.events.events.iter().any(|e| e.name == "exception"));
}

#[test]
fn test_multi_agent_spans_share_parent_operation() {
    let (factory, exporter) = traced_factory();
    let root = AgentNodeConfig::new("parent_001", "Parent")
        .with_span_kind("server")
        .with_child(AgentNodeConfig::new("child_a", "Alpha").with_span_kind("CLIENT"));
    let base = AgentConfig::mock("parent_001", "Parent", MockSettings::instant());
    let mut parent = factory.build_hierarchy(&root, &base, None).unwrap();

    let result = MultiAgentScenario::new(factory.clone())
        .execute(&mut parent)
        .unwrap();
    assert!(result.success, "{:?}", result.error_message);

    let spans = exporter.get_finished_spans().unwrap();
    let operation = find(&spans, "parent_agent_operation");
    let parent_invoke = find(&spans, "invoke_agent Parent");
    let adhoc_invoke = find(&spans, "invoke_agent Child Agent");
    let declared_invoke = find(&spans, "invoke_agent Alpha");

    assert_eq!(operation.parent_span_id, SpanId::INVALID);
    for span in [parent_invoke, adhoc_invoke, declared_invoke] {
        assert_eq!(span.parent_span_id, operation.span_context.span_id());
        assert_eq!(span.span_context.trace_id(), operation.span_context.trace_id());
    }

    assert_eq!(parent_invoke.span_kind, SpanKind::Server);
    assert_eq!(declared_invoke.span_kind, SpanKind::Client);
    assert_eq!(adhoc_invoke.span_kind, SpanKind::Internal);
    assert!(matches!(operation.status, Status::Ok));
}

#[test]
fn test_invoke_child_agent_emits_child_span() {
    let (factory, exporter) = traced_factory();
    let root = AgentNodeConfig::new("root", "Root")
        .with_child(AgentNodeConfig::new("leaf", "Leaf"));
    let base = AgentConfig::mock("root", "Root", MockSettings::instant());
    let mut parent = factory.build_hierarchy(&root, &base, None).unwrap();

    parent
        .invoke_child_agent("Leaf", "Tell me a joke", "conv_child")
        .unwrap();

    let spans = exporter.get_finished_spans().unwrap();
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].name, "invoke_agent Leaf");
    assert_eq!(
        attribute(&spans[0], "gen_ai.agent.id"),
        Some(Value::from("leaf"))
    );
}
