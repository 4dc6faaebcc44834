//! Unit tests for failure pattern distributions

use agent_canary::faults::{FailurePattern, FaultInjector};

fn run(rate: f64, pattern: FailurePattern, calls: usize) -> Vec<bool> {
    let mut injector = FaultInjector::new(rate, pattern).unwrap();
    (0..calls)
        .map(|_| {
            injector.record_call();
            injector.should_fail()
        })
        .collect()
}

/// Lengths of maximal runs of consecutive failures, excluding a run cut off
/// by the end of the sequence
fn closed_failure_runs(outcomes: &[bool]) -> Vec<usize> {
    let mut runs = Vec::new();
    let mut current = 0;
    for failed in outcomes {
        if *failed {
            current += 1;
        } else if current > 0 {
            runs.push(current);
            current = 0;
        }
    }
    runs
}

#[test]
fn test_periodic_positions() {
    for rate in [0.5, 0.34, 0.25, 0.1] {
        let period = (1.0f64 / rate).floor() as usize;
        let outcomes = run(rate, FailurePattern::Periodic, 60);
        for (i, failed) in outcomes.iter().enumerate() {
            assert_eq!(*failed, (i + 1) % period == 0, "rate {} call {}", rate, i + 1);
        }
    }
}

#[test]
fn test_burst_failures_cluster() {
    let outcomes = run(0.2, FailurePattern::Burst, 500);
    let runs = closed_failure_runs(&outcomes);

    assert!(!runs.is_empty());
    assert!(runs.iter().all(|len| *len >= 3), "runs: {:?}", runs);
}

#[test]
fn test_random_rate_roughly_respected() {
    let failures = run(0.3, FailurePattern::Random, 2000)
        .iter()
        .filter(|f| **f)
        .count();
    assert!((450..=750).contains(&failures), "failures: {}", failures);
}
