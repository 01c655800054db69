//! Ouroboros Learning Benchmarks
//!
//! Hot paths of the learning core:
//! - Replay sampling (uniform and prioritized)
//! - Feedback processing and update application
//! - Strategy adaptation and selection
//! - Agent interaction recording

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::time::Duration;

use ouroboros_common::{Experience, Feedback, LearningMetrics, LearningStrategy};
use ouroboros_learning::{
    AdaptiveAgentConfig, ContinuouslyLearningAgent, ExperienceStore, GradientLearnerConfig,
    GradientOnlineLearner, MetaLearner, MetaLearnerConfig, OnlineLearner, ReplayBuffer,
};

// ============ REPLAY BENCHMARKS ============

fn filled_buffer(size: usize) -> ReplayBuffer {
    let buffer = ReplayBuffer::with_seed(size, 7);
    for i in 0..size {
        let experience = Experience::new(format!("s{}", i), "act", 0.0, "next")
            .with_priority((i % 100) as f64 + 1.0);
        let _ = buffer.add(experience);
    }
    buffer
}

/// Benchmark replay sampling
fn bench_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("replay");
    group.measurement_time(Duration::from_secs(5));

    for size in [1_000, 10_000].iter() {
        let buffer = filled_buffer(*size);

        group.bench_with_input(BenchmarkId::new("sample_uniform", size), size, |b, _| {
            b.iter(|| black_box(buffer.sample(black_box(32))));
        });

        group.bench_with_input(BenchmarkId::new("sample_prioritized", size), size, |b, _| {
            b.iter(|| black_box(buffer.sample_prioritized(black_box(32), 0.6)));
        });
    }

    group.bench_function("add_with_eviction", |b| {
        let buffer = filled_buffer(1_000);
        b.iter(|| {
            let _ = buffer.add(Experience::new("state", "act", 0.5, "next"));
        });
    });

    group.finish();
}

// ============ GRADIENT BENCHMARKS ============

/// Benchmark feedback processing
fn bench_gradient(c: &mut Criterion) {
    let mut group = c.benchmark_group("gradient");
    group.measurement_time(Duration::from_secs(5));

    for params in [1, 16, 128].iter() {
        group.throughput(Throughput::Elements(*params as u64));
        group.bench_with_input(
            BenchmarkId::new("process_and_apply", params),
            params,
            |b, &count| {
                let learner = GradientOnlineLearner::new(GradientLearnerConfig::default()).unwrap();
                for i in 0..count {
                    learner.set_parameter(&format!("p{}", i), 0.0).unwrap();
                }
                let feedback = Feedback::explicit("user", "ctx", "out", 0.7);

                b.iter(|| {
                    learner.process_feedback(black_box(&feedback)).unwrap();
                    black_box(learner.apply_updates())
                });
            },
        );
    }

    group.bench_function("batch_64", |b| {
        let learner = GradientOnlineLearner::new(GradientLearnerConfig::default()).unwrap();
        let batch: Vec<Feedback> = (0..64)
            .map(|i| Feedback::explicit("user", "ctx", "out", (i as f64 / 32.0) - 1.0))
            .collect();

        b.iter(|| black_box(learner.process_batch(black_box(&batch)).unwrap()));
    });

    group.finish();
}

// ============ META BENCHMARKS ============

/// Benchmark strategy adaptation and selection
fn bench_meta(c: &mut Criterion) {
    let mut group = c.benchmark_group("meta");
    group.measurement_time(Duration::from_secs(5));

    let meta = MetaLearner::with_seed(MetaLearnerConfig::default(), 11).unwrap();
    let rewards: Vec<f64> = (0..200).map(|i| (i as f64 / 200.0).sin()).collect();
    let metrics = LearningMetrics::from_rewards(&rewards);
    let strategy = LearningStrategy::balanced();

    group.bench_function("adapt_strategy", |b| {
        b.iter(|| black_box(meta.adapt_strategy(black_box(&strategy), &metrics)));
    });

    for count in [4, 16, 64].iter() {
        let candidates = meta.propose_candidates(&strategy, *count);
        group.bench_with_input(BenchmarkId::new("select", count), count, |b, _| {
            b.iter(|| black_box(meta.select_best_strategy(&candidates, &metrics).unwrap()));
        });
    }

    group.bench_function("score_rewards", |b| {
        b.iter(|| black_box(meta.score_rewards(black_box(&rewards))));
    });

    group.finish();
}

// ============ AGENT BENCHMARKS ============

/// Benchmark interaction recording
fn bench_agent(c: &mut Criterion) {
    let mut group = c.benchmark_group("agent");
    group.measurement_time(Duration::from_secs(5));
    group.throughput(Throughput::Elements(1));

    group.bench_function("record_interaction", |b| {
        let agent = ContinuouslyLearningAgent::new(AdaptiveAgentConfig::default()).unwrap();
        b.iter(|| {
            agent
                .record_interaction("prompt", "reply", black_box(0.6))
                .unwrap();
            black_box(agent.should_adapt())
        });
    });

    group.finish();
}

// ============ CRITERION CONFIGURATION ============

criterion_group!(replay, bench_replay);

criterion_group!(gradient, bench_gradient);

criterion_group!(meta, bench_meta);

criterion_group!(agent, bench_agent);

criterion_main!(replay, gradient, meta, agent);
