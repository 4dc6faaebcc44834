//! Performance benchmark for fault pattern evaluation
//!
//! Measures the per-call cost of the failure decision for each pattern, and
//! of a zero-latency mock LLM call including the decision.

use agent_canary::faults::{FailurePattern, FaultInjector};
use agent_canary::providers::{ChatMessage, LlmProvider, MockLlmProvider};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

fn bench_should_fail(c: &mut Criterion) {
    let mut group = c.benchmark_group("should_fail");

    for pattern in [
        FailurePattern::Random,
        FailurePattern::Periodic,
        FailurePattern::Burst,
    ] {
        group.bench_with_input(
            BenchmarkId::from_parameter(pattern),
            &pattern,
            |b, &pattern| {
                let mut injector = FaultInjector::new(0.1, pattern).unwrap();
                b.iter(|| {
                    injector.record_call();
                    black_box(injector.should_fail())
                });
            },
        );
    }

    group.finish();
}

fn bench_mock_llm_call(c: &mut Criterion) {
    let messages = vec![ChatMessage::user("What's the weather in Paris?")];

    c.bench_function("mock_llm_call", |b| {
        let mut provider = MockLlmProvider::new(0)
            .with_failures(0.1, FailurePattern::Burst)
            .unwrap();
        b.iter(|| {
            let _ = black_box(provider.call("gpt-4", black_box(&messages), &[]));
        });
    });
}

criterion_group!(benches, bench_should_fail, bench_mock_llm_call);
criterion_main!(benches);
