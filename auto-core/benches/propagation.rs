use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use auto_core::{auto, Auto, Config, InvalidationPolicy};

type Graph = Auto<u64>;

/// `n0` is a constant; `n{i}` reads `n{i-1}`.
fn chain(len: usize, policy: InvalidationPolicy) -> Graph {
    let mut config = Config::new().policy(policy).constant("n0", 0u64);
    for i in 1..len {
        let prev = format!("n{}", i - 1);
        config = config.computed(format!("n{i}"), move |g: &Graph| {
            g.get(&prev).unwrap_or(0).wrapping_add(1)
        });
    }
    auto(config)
}

/// One constant read by `width` computations, summed by a single sink.
fn fan_out(width: usize) -> Graph {
    let mut config = Config::new().constant("source", 0u64);
    for i in 0..width {
        config = config.computed(format!("leaf{i}"), move |g: &Graph| {
            g.get("source").unwrap_or(0) + i as u64
        });
    }
    config = config.computed("sink", move |g: &Graph| {
        (0..width)
            .map(|i| g.get(&format!("leaf{i}")).unwrap_or(0))
            .sum()
    });
    auto(config)
}

fn bench_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain_write_then_read");

    for len in [16usize, 128, 512] {
        for policy in [InvalidationPolicy::Lazy, InvalidationPolicy::Eager] {
            let graph = chain(len, policy);
            let last = format!("n{}", len - 1);
            let mut next = 0u64;

            group.bench_with_input(BenchmarkId::new(policy.to_string(), len), &len, |b, _| {
                b.iter(|| {
                    next += 1;
                    graph.set("n0", next);
                    black_box(graph.get(&last))
                })
            });
        }
    }

    group.finish();
}

fn bench_fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("fan_out_write_then_read");

    for width in [8usize, 64, 256] {
        let graph = fan_out(width);
        let mut next = 0u64;

        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, _| {
            b.iter(|| {
                next += 1;
                graph.set("source", next);
                black_box(graph.get("sink"))
            })
        });
    }

    group.finish();
}

fn bench_cached_reads(c: &mut Criterion) {
    let graph = chain(128, InvalidationPolicy::Lazy);

    c.bench_function("cached_read", |b| b.iter(|| black_box(graph.get("n127"))));
}

criterion_group!(benches, bench_chain, bench_fan_out, bench_cached_reads);
criterion_main!(benches);
