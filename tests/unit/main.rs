//! Unit tests for the agent canary public API

mod config;
mod faults;
mod providers;
