//! Failure pattern evaluation
//!
//! Each mock provider owns one `FaultInjector`. The injector keeps the
//! provider's call counter, a fixed-seed random stream and the burst state,
//! so identical providers fed identical calls fail on identical calls.

use crate::error::CanaryError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Seed shared by every provider's random stream
pub const FAULT_SEED: u64 = 42;

/// Temporal distribution of injected failures
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePattern {
    /// Independent draw per call
    #[default]
    Random,
    /// Every `floor(1 / rate)`-th call
    Periodic,
    /// Clustered failures: a trigger followed by 2 to 4 more
    Burst,
}

impl FailurePattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailurePattern::Random => "random",
            FailurePattern::Periodic => "periodic",
            FailurePattern::Burst => "burst",
        }
    }
}

impl fmt::Display for FailurePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailurePattern {
    type Err = CanaryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "random" => Ok(FailurePattern::Random),
            "periodic" => Ok(FailurePattern::Periodic),
            "burst" => Ok(FailurePattern::Burst),
            other => Err(CanaryError::ConfigurationError(format!(
                "failure_pattern must be one of [\"random\", \"periodic\", \"burst\"], got '{}'",
                other
            ))),
        }
    }
}

/// Burst tracking, mutated only by the burst pattern
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BurstState {
    pub in_burst: bool,
    pub burst_remaining: i32,
}

/// Per-provider failure decision state
#[derive(Debug, Clone)]
pub struct FaultInjector {
    failure_rate: f64,
    pattern: FailurePattern,
    call_count: u64,
    burst: BurstState,
    rng: StdRng,
}

impl FaultInjector {
    /// Create an injector with the given rate and pattern
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if `failure_rate` is outside `[0.0, 1.0]`.
    pub fn new(failure_rate: f64, pattern: FailurePattern) -> Result<Self, CanaryError> {
        if !(0.0..=1.0).contains(&failure_rate) {
            return Err(CanaryError::ConfigurationError(format!(
                "failure_rate must be between 0.0 and 1.0, got {}",
                failure_rate
            )));
        }

        Ok(Self {
            failure_rate,
            pattern,
            call_count: 0,
            burst: BurstState::default(),
            rng: StdRng::seed_from_u64(FAULT_SEED),
        })
    }

    /// An injector that never fails
    pub fn never() -> Self {
        Self {
            failure_rate: 0.0,
            pattern: FailurePattern::Random,
            call_count: 0,
            burst: BurstState::default(),
            rng: StdRng::seed_from_u64(FAULT_SEED),
        }
    }

    /// Count one invocation and return the new call count (1-based)
    pub fn record_call(&mut self) -> u64 {
        self.call_count += 1;
        self.call_count
    }

    pub fn call_count(&self) -> u64 {
        self.call_count
    }

    pub fn failure_rate(&self) -> f64 {
        self.failure_rate
    }

    pub fn pattern(&self) -> FailurePattern {
        self.pattern
    }

    pub fn burst_state(&self) -> BurstState {
        self.burst
    }

    /// Decide whether the current call fails
    ///
    /// A zero rate returns early without touching the random stream.
    pub fn should_fail(&mut self) -> bool {
        if self.failure_rate == 0.0 {
            return false;
        }

        match self.pattern {
            FailurePattern::Random => self.rng.gen::<f64>() < self.failure_rate,
            FailurePattern::Periodic => self.periodic_failure(),
            FailurePattern::Burst => self.burst_failure(),
        }
    }

    fn periodic_failure(&self) -> bool {
        if self.failure_rate >= 1.0 {
            return true;
        }
        let period = ((1.0 / self.failure_rate).floor() as u64).max(1);
        self.call_count % period == 0
    }

    fn burst_failure(&mut self) -> bool {
        if self.burst.in_burst {
            self.burst.burst_remaining -= 1;
            if self.burst.burst_remaining <= 0 {
                self.burst = BurstState::default();
            }
            return true;
        }

        if self.rng.gen::<f64>() < self.failure_rate {
            self.burst = BurstState {
                in_burst: true,
                burst_remaining: self.rng.gen_range(2..=4),
            };
            return true;
        }

        false
    }
}
