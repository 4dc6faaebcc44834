//! Agent Canary
//!
//! Synthetic agent traffic generator for validating OpenTelemetry observability
//! stacks. A configurable weather agent (or a hierarchy of them) runs a fixed
//! set of scenarios against mock or real providers, emitting GenAI spans and
//! metrics, while fault injection degrades the providers in controlled ways.
//!
//! # Features
//!
//! - Mock LLM and tool providers with latency, failure patterns (random,
//!   periodic, burst), rate limits, token limits and truncated responses
//! - Agent hierarchies declared in YAML, with per-agent span kinds
//! - Six built-in scenarios and a runner that turns results into an exit code
//! - OTLP export over gRPC or HTTP
//! - Optional post-run validation against Prometheus and OpenSearch
//!
//! # Example
//!
//! ```no_run
//! use agent_canary::{CanaryRunner, ObservabilityManager};
//!
//! # fn example() -> Result<(), agent_canary::CanaryError> {
//! let mut runner = CanaryRunner::from_path("canary.yaml")
//!     .with_observability(ObservabilityManager::disabled());
//! let summary = runner.run()?;
//! println!("{}", summary.format_report());
//! std::process::exit(summary.exit_code());
//! # }
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod faults;
pub mod observability;
pub mod providers;
pub mod runner;
pub mod scenarios;
pub mod validator;

pub use agent::{AgentConfig, AgentFactory, ConfigurableAgent};
pub use config::{AgentMode, AgentNodeConfig, CanaryConfig};
pub use error::CanaryError;
pub use faults::{FailurePattern, FaultInjectionConfig, FaultProfile};
pub use observability::ObservabilityManager;
pub use runner::{CanaryRunner, RunSummary, RunnerState};
pub use scenarios::{Scenario, ScenarioResult};
pub use validator::{HttpTelemetryValidator, TelemetryValidator};
