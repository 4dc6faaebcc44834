//! OpenTelemetry observability integration
//!
//! This module owns the OTLP trace and metric pipelines and installs the
//! log subscriber.

pub mod logging;
pub mod otlp;

pub use logging::init_logging;
pub use otlp::{AgentTelemetry, ObservabilityManager};
