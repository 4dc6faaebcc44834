//! Configurable agent
//!
//! A `ConfigurableAgent` runs one request/response cycle against injected
//! LLM and tool providers and traces it with `gen_ai.*` semantic convention
//! attributes. Child agents are owned by their parent and invoked by name;
//! their spans nest under whatever span is current when they are invoked.

pub mod factory;

pub use factory::{AgentConfig, AgentFactory};

use crate::config::AgentSpanKind;
use crate::error::CanaryError;
use crate::observability::AgentTelemetry;
use crate::providers::{ChatMessage, LlmProvider, ToolDefinition, ToolProvider};
use opentelemetry::trace::{Span as _, SpanKind, Status, TraceContextExt, Tracer as _};
use opentelemetry::{Context, KeyValue, StringValue};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{error, info, warn};

/// Model requested when none is configured
pub const DEFAULT_MODEL: &str = "gpt-4";

pub const AGENT_DESCRIPTION: &str = "Helps users get weather information for any location";

pub const SYSTEM_PROMPT: &str = "You are a helpful weather assistant.";

/// Response when the LLM requests no tool
pub const FALLBACK_RESPONSE: &str = "I couldn't determine what you're asking about.";

const SERVER_ADDRESS: &str = "api.openai.com";
const SERVER_PORT: i64 = 443;

/// The `get_weather` tool offered to the LLM
pub fn weather_tool() -> ToolDefinition {
    ToolDefinition {
        name: "get_weather".to_string(),
        description: "Get current weather for a location".to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "location": {
                    "type": "string",
                    "description": "City name or location"
                }
            },
            "required": ["location"]
        }),
    }
}

/// Agent with pluggable providers
pub struct ConfigurableAgent {
    llm_provider: Box<dyn LlmProvider>,
    tool_provider: Box<dyn ToolProvider>,
    agent_id: String,
    agent_name: String,
    model: String,
    span_kind: AgentSpanKind,
    tools: Vec<ToolDefinition>,
    child_agents: BTreeMap<String, ConfigurableAgent>,
    telemetry: AgentTelemetry,
}

impl ConfigurableAgent {
    /// Create an agent offering the weather tool
    ///
    /// # Arguments
    ///
    /// * `llm_provider` - LLM backend, owned exclusively by this agent
    /// * `tool_provider` - Tool backend, owned exclusively by this agent
    /// * `agent_id` - Unique agent identifier
    /// * `agent_name` - Human-readable name, also the key among siblings
    /// * `telemetry` - Tracer and instruments
    pub fn new(
        llm_provider: Box<dyn LlmProvider>,
        tool_provider: Box<dyn ToolProvider>,
        agent_id: impl Into<String>,
        agent_name: impl Into<String>,
        telemetry: AgentTelemetry,
    ) -> Self {
        Self {
            llm_provider,
            tool_provider,
            agent_id: agent_id.into(),
            agent_name: agent_name.into(),
            model: DEFAULT_MODEL.to_string(),
            span_kind: AgentSpanKind::Internal,
            tools: vec![weather_tool()],
            child_agents: BTreeMap::new(),
            telemetry,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_span_kind(mut self, span_kind: AgentSpanKind) -> Self {
        self.span_kind = span_kind;
        self
    }

    pub fn set_span_kind(&mut self, span_kind: AgentSpanKind) {
        self.span_kind = span_kind;
    }

    /// Attach a child agent under its name
    ///
    /// Returns the child previously registered under the same name, if any.
    pub fn add_child(&mut self, child: ConfigurableAgent) -> Option<ConfigurableAgent> {
        self.child_agents.insert(child.agent_name.clone(), child)
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn span_kind(&self) -> AgentSpanKind {
        self.span_kind
    }

    pub fn provider_name(&self) -> &str {
        self.llm_provider.provider_name()
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn telemetry(&self) -> &AgentTelemetry {
        &self.telemetry
    }

    /// Names of the direct children, sorted
    pub fn child_names(&self) -> Vec<String> {
        self.child_agents.keys().cloned().collect()
    }

    pub fn child(&self, name: &str) -> Option<&ConfigurableAgent> {
        self.child_agents.get(name)
    }

    /// Invoke the agent with a user message
    ///
    /// Makes one LLM call. When the LLM requests a tool, exactly the first
    /// tool call is executed and the answer is built from its result.
    ///
    /// # Errors
    ///
    /// Provider errors propagate unchanged after being recorded on the
    /// `invoke_agent` span. No retries are made.
    pub fn invoke(&mut self, user_message: &str, conversation_id: &str) -> Result<String, CanaryError> {
        let start = Instant::now();

        let tracer = self.telemetry.tracer();
        let span = tracer
            .span_builder(format!("invoke_agent {}", self.agent_name))
            .with_kind(SpanKind::from(self.span_kind))
            .with_attributes(self.invoke_attributes(conversation_id))
            .start(tracer);
        let cx = Context::current_with_span(span);
        let _guard = cx.clone().attach();

        info!(
            gen_ai.operation.name = "invoke_agent",
            gen_ai.agent.id = %self.agent_id,
            gen_ai.agent.name = %self.agent_name,
            gen_ai.conversation.id = conversation_id,
            "Agent invoked"
        );

        let result = self.run_turn(user_message, &cx, start);

        let span = cx.span();
        match &result {
            Ok(response) => {
                info!(
                    gen_ai.agent.id = %self.agent_id,
                    gen_ai.conversation.id = conversation_id,
                    response = %response,
                    "Agent invocation completed"
                );
                span.set_status(Status::Ok);
            }
            Err(e) => {
                error!(
                    gen_ai.agent.id = %self.agent_id,
                    gen_ai.conversation.id = conversation_id,
                    error = %e,
                    "Agent invocation failed"
                );
                span.set_status(Status::error(e.to_string()));
                span.record_error(e);
            }
        }
        span.end();

        result
    }

    fn run_turn(
        &mut self,
        user_message: &str,
        cx: &Context,
        start: Instant,
    ) -> Result<String, CanaryError> {
        let span = cx.span();
        let messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user_message)];

        span.add_event(
            "gen_ai.client.inference.operation.details",
            vec![
                KeyValue::new("gen_ai.operation.name", "chat"),
                KeyValue::new("gen_ai.input.messages", to_json_string(&messages)),
            ],
        );

        let response = self.llm_provider.call(&self.model, &messages, &self.tools)?;

        span.set_attribute(KeyValue::new("gen_ai.response.model", response.model.clone()));
        span.set_attribute(KeyValue::new("gen_ai.response.id", response.id.clone()));
        span.set_attribute(KeyValue::new(
            "gen_ai.response.finish_reasons",
            opentelemetry::Value::Array(
                vec![StringValue::from(response.finish_reason.as_str())].into(),
            ),
        ));
        span.set_attribute(KeyValue::new(
            "gen_ai.usage.input_tokens",
            response.usage.prompt_tokens as i64,
        ));
        span.set_attribute(KeyValue::new(
            "gen_ai.usage.output_tokens",
            response.usage.completion_tokens as i64,
        ));

        let metric_attributes = self.metric_attributes(&response.model);
        self.telemetry.record_tokens(
            response.usage.prompt_tokens,
            response.usage.completion_tokens,
            &metric_attributes,
        );

        span.add_event(
            "gen_ai.client.inference.operation.details",
            vec![
                KeyValue::new("gen_ai.operation.name", "chat"),
                KeyValue::new(
                    "gen_ai.output.messages",
                    to_json_string(&[&response.message]),
                ),
            ],
        );

        let answer = match response.first_tool_call() {
            Some(call) => {
                let (name, arguments) = (call.name.clone(), call.arguments.clone());
                let result = self.execute_tool(&name, &arguments)?;
                describe_weather(&result)
            }
            None => FALLBACK_RESPONSE.to_string(),
        };

        self.telemetry
            .record_duration(start.elapsed(), &metric_attributes);

        Ok(answer)
    }

    /// Execute a tool inside an `execute_tool` span
    ///
    /// The span is a child of the current span, so tools executed during
    /// `invoke` nest under its `invoke_agent` span.
    pub fn execute_tool(&mut self, tool_name: &str, arguments: &Value) -> Result<Value, CanaryError> {
        let arguments_json = arguments.to_string();

        let mut attributes = vec![
            KeyValue::new("gen_ai.operation.name", "execute_tool"),
            KeyValue::new("gen_ai.tool.name", tool_name.to_string()),
            KeyValue::new("gen_ai.agent.id", self.agent_id.clone()),
            KeyValue::new("gen_ai.agent.name", self.agent_name.clone()),
        ];
        if let Some(tool) = self.tools.iter().find(|t| t.name == tool_name) {
            attributes.push(KeyValue::new("gen_ai.tool.description", tool.description.clone()));
        }
        attributes.push(KeyValue::new("tool.arguments", arguments_json.clone()));

        let tracer = self.telemetry.tracer();
        let mut span = tracer
            .span_builder(format!("execute_tool {}", tool_name))
            .with_kind(SpanKind::Internal)
            .with_attributes(attributes)
            .start(tracer);

        info!(
            gen_ai.operation.name = "execute_tool",
            gen_ai.tool.name = tool_name,
            tool.arguments = %arguments_json,
            "Executing tool"
        );
        span.add_event(
            "tool_execution_start",
            vec![KeyValue::new("tool.input", arguments_json)],
        );

        let result = self.tool_provider.execute(tool_name, arguments);

        match &result {
            Ok(output) => {
                span.add_event(
                    "tool_execution_complete",
                    vec![KeyValue::new("tool.output", output.to_string())],
                );
                span.set_status(Status::Ok);
            }
            Err(e) => {
                warn!(
                    gen_ai.operation.name = "execute_tool",
                    gen_ai.tool.name = tool_name,
                    error = %e,
                    "Tool execution failed"
                );
                span.set_status(Status::error(e.to_string()));
                span.record_error(e);
            }
        }
        span.end();

        result
    }

    /// Invoke a direct child agent by name
    ///
    /// # Errors
    ///
    /// Returns `ChildAgentNotFound`, listing the available names, if no child
    /// is registered under `child_name`. Errors from the child propagate.
    pub fn invoke_child_agent(
        &mut self,
        child_name: &str,
        message: &str,
        conversation_id: &str,
    ) -> Result<String, CanaryError> {
        match self.child_agents.get_mut(child_name) {
            Some(child) => child.invoke(message, conversation_id),
            None => Err(CanaryError::ChildAgentNotFound {
                child_name: child_name.to_string(),
                available: self.child_names(),
            }),
        }
    }

    fn invoke_attributes(&self, conversation_id: &str) -> Vec<KeyValue> {
        let tool_names: Vec<StringValue> = self
            .tools
            .iter()
            .map(|t| StringValue::from(t.name.clone()))
            .collect();

        vec![
            KeyValue::new("gen_ai.operation.name", "invoke_agent"),
            KeyValue::new("gen_ai.provider.name", self.provider_name().to_string()),
            KeyValue::new("gen_ai.agent.id", self.agent_id.clone()),
            KeyValue::new("gen_ai.agent.name", self.agent_name.clone()),
            KeyValue::new("gen_ai.agent.description", AGENT_DESCRIPTION),
            KeyValue::new("gen_ai.conversation.id", conversation_id.to_string()),
            KeyValue::new("gen_ai.request.model", self.model.clone()),
            KeyValue::new("server.address", SERVER_ADDRESS),
            KeyValue::new("server.port", SERVER_PORT),
            KeyValue::new("agent.tools.count", self.tools.len() as i64),
            KeyValue::new(
                "agent.tools.available",
                opentelemetry::Value::Array(tool_names.into()),
            ),
        ]
    }

    fn metric_attributes(&self, response_model: &str) -> Vec<KeyValue> {
        vec![
            KeyValue::new("gen_ai.operation.name", "invoke_agent"),
            KeyValue::new("gen_ai.provider.name", self.provider_name().to_string()),
            KeyValue::new("gen_ai.request.model", self.model.clone()),
            KeyValue::new("gen_ai.response.model", response_model.to_string()),
            KeyValue::new("gen_ai.agent.name", self.agent_name.clone()),
            KeyValue::new("server.address", SERVER_ADDRESS),
        ]
    }
}

impl std::fmt::Debug for ConfigurableAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurableAgent")
            .field("agent_id", &self.agent_id)
            .field("agent_name", &self.agent_name)
            .field("model", &self.model)
            .field("span_kind", &self.span_kind)
            .field("child_agents", &self.child_names())
            .finish()
    }
}

/// Natural-language answer built from a weather tool result
fn describe_weather(result: &Value) -> String {
    format!(
        "The weather in {} is {} with a temperature of {}.",
        field_text(result, "location"),
        field_text(result, "condition"),
        field_text(result, "temperature"),
    )
}

fn field_text(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => "unknown".to_string(),
        Some(other) => other.to_string(),
    }
}

fn to_json_string<T: serde::Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}
