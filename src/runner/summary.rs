//! Run summary and report rendering

use crate::scenarios::ScenarioResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;

const RULE_WIDTH: usize = 60;

/// Telemetry validation findings for one scenario
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationOutcome {
    pub scenario_name: String,
    pub conversation_id: String,
    pub metric_errors: Vec<String>,
    pub trace_errors: Vec<String>,
}

impl ValidationOutcome {
    pub fn is_clean(&self) -> bool {
        self.metric_errors.is_empty() && self.trace_errors.is_empty()
    }
}

/// Aggregated result of one canary run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub total_duration_seconds: f64,
    pub results: Vec<ScenarioResult>,
    /// Empty unless telemetry validation ran
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub validation: Vec<ValidationOutcome>,
}

impl RunSummary {
    pub fn new(started_at: DateTime<Utc>, results: Vec<ScenarioResult>) -> Self {
        let passed = results.iter().filter(|r| r.success).count();
        Self {
            started_at,
            total: results.len(),
            passed,
            failed: results.len() - passed,
            total_duration_seconds: results.iter().map(|r| r.duration_seconds).sum(),
            results,
            validation: Vec::new(),
        }
    }

    /// 0 when no scenario failed, 1 otherwise
    ///
    /// Validation findings never change the exit code.
    pub fn exit_code(&self) -> i32 {
        if self.failed == 0 {
            0
        } else {
            1
        }
    }

    pub fn failures(&self) -> Vec<&ScenarioResult> {
        self.results.iter().filter(|r| !r.success).collect()
    }

    /// Human-readable report
    pub fn format_report(&self) -> String {
        let mut out = String::new();
        let rule = "=".repeat(RULE_WIDTH);

        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "CANARY SUMMARY REPORT");
        let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
        let _ = writeln!(out, "Started:          {}", self.started_at.to_rfc3339());
        let _ = writeln!(out, "Total Scenarios:  {}", self.total);
        let _ = writeln!(out, "Passed:           {}", self.passed);
        let _ = writeln!(out, "Failed:           {}", self.failed);
        let _ = writeln!(out, "Total Duration:   {:.2}s", self.total_duration_seconds);

        let failures = self.failures();
        if !failures.is_empty() {
            let _ = writeln!(out, "\nFailed Scenarios:");
            for result in failures {
                let _ = writeln!(out, "  - {}", result.scenario_name);
                if let Some(message) = &result.error_message {
                    let _ = writeln!(out, "    {}", message);
                }
            }
        }

        if !self.validation.is_empty() {
            let _ = writeln!(out, "\nTelemetry Validation:");
            for outcome in &self.validation {
                if outcome.is_clean() {
                    let _ = writeln!(out, "  ✓ {}", outcome.scenario_name);
                    continue;
                }
                let _ = writeln!(out, "  ⚠ {}", outcome.scenario_name);
                for error in outcome.metric_errors.iter().chain(&outcome.trace_errors) {
                    let _ = writeln!(out, "      - {}", error);
                }
            }
        }

        let _ = writeln!(out);
        if self.exit_code() == 0 {
            let _ = writeln!(out, "✓ All scenarios passed");
        } else {
            let _ = writeln!(out, "✗ Some scenarios failed");
        }
        let _ = writeln!(out, "{}", rule);
        out
    }
}
