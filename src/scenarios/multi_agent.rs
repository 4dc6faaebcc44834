//! Multi-agent scenario

use super::{new_conversation_id, Scenario, ScenarioResult};
use crate::agent::{AgentFactory, ConfigurableAgent};
use crate::config::MockSettings;
use crate::error::CanaryError;
use opentelemetry::trace::{SpanKind, Status, TraceContextExt, Tracer as _};
use opentelemetry::{Context, KeyValue};
use std::time::Instant;

pub const CHILD_AGENT_ID: &str = "child_agent_001";
pub const CHILD_AGENT_NAME: &str = "Child Agent";

/// Parent agent invoking child agents
///
/// Everything runs inside a `parent_agent_operation` span, so the parent's
/// and children's `invoke_agent` spans share one trace.
#[derive(Debug, Clone)]
pub struct MultiAgentScenario {
    factory: AgentFactory,
}

impl MultiAgentScenario {
    pub fn new(factory: AgentFactory) -> Self {
        Self { factory }
    }

    fn child_settings() -> MockSettings {
        MockSettings {
            llm_latency_ms: 100,
            tool_latency_ms: 50,
            tool_failure_rate: 0.0,
            llm_failure_rate: 0.0,
        }
    }

    fn run_agents(
        parent: &mut ConfigurableAgent,
        adhoc_child: &mut ConfigurableAgent,
        conversation_id: &str,
    ) -> Result<(), CanaryError> {
        parent.invoke("Coordinate with child agent", conversation_id)?;
        adhoc_child.invoke("Execute subtask", conversation_id)?;

        for child_name in parent.child_names() {
            parent.invoke_child_agent(&child_name, "Execute subtask", conversation_id)?;
        }
        Ok(())
    }
}

impl Scenario for MultiAgentScenario {
    fn name(&self) -> &'static str {
        "multi_agent"
    }

    fn description(&self) -> &'static str {
        "Parent agent invoking child agents to test span hierarchy"
    }

    fn execute(&self, agent: &mut ConfigurableAgent) -> Result<ScenarioResult, CanaryError> {
        let start = Instant::now();
        let conversation_id = new_conversation_id("multi_agent");

        let mut adhoc_child = self.factory.create_mock_agent(
            CHILD_AGENT_ID,
            CHILD_AGENT_NAME,
            &Self::child_settings(),
        )?;

        let tracer = agent.telemetry().tracer().clone();
        let span = tracer
            .span_builder("parent_agent_operation")
            .with_kind(SpanKind::Internal)
            .with_attributes(vec![KeyValue::new(
                "gen_ai.agent.id",
                agent.agent_id().to_string(),
            )])
            .start(&tracer);
        let cx = Context::current_with_span(span);

        let outcome = {
            let _guard = cx.clone().attach();
            Self::run_agents(agent, &mut adhoc_child, &conversation_id)
        };

        let span = cx.span();
        match &outcome {
            Ok(()) => span.set_status(Status::Ok),
            Err(e) => span.set_status(Status::error(e.to_string())),
        }
        span.end();

        let duration = start.elapsed().as_secs_f64();
        Ok(match outcome {
            Ok(()) => ScenarioResult::passed(self.name(), duration, conversation_id),
            Err(e) => ScenarioResult::failed(self.name(), duration, e.to_string(), Some(conversation_id)),
        })
    }
}
