//! Integration tests for the agent canary

mod test_runner;
mod test_span_hierarchy;
mod test_validator;
