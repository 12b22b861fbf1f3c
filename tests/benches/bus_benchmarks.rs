//! # Herald Bus Benchmarks
//!
//! | Path | What is measured |
//! |------|------------------|
//! | publish | Fan-out to N synchronous handlers |
//! | offline | Enqueue into a full queue (evicting) |
//! | request | Round trip through an async responder |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use herald_bus::{BusConfig, EventBus, Handler};
use serde_json::json;
use std::time::Duration;

fn bench_publish_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish");

    for handlers in [1usize, 10, 100] {
        let bus = EventBus::default();
        let subscribers: Vec<Handler> = (0..handlers)
            .map(|_| {
                Handler::new(|msg| {
                    black_box(&msg.payload);
                    Ok(())
                })
            })
            .collect();
        for handler in &subscribers {
            bus.subscribe("bench", handler);
        }

        group.throughput(Throughput::Elements(handlers as u64));
        group.bench_with_input(BenchmarkId::new("fanout", handlers), &bus, |b, bus| {
            b.iter(|| bus.publish("bench", json!({"n": 1})))
        });
    }

    group.finish();
}

fn bench_offline_queue(c: &mut Criterion) {
    let bus = EventBus::new(BusConfig::default().with_max_queue_size(1000)).unwrap();
    for n in 0..1000 {
        bus.publish("nobody", json!(n));
    }

    c.bench_function("offline_enqueue_evicting", |b| {
        b.iter(|| bus.publish("nobody", black_box(json!(1))))
    });
}

fn bench_request_round_trip(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap();
    let bus = EventBus::default();
    runtime.block_on(async {
        bus.respond("echo", |payload| async move { Ok(payload) });
    });

    c.bench_function("request_round_trip", |b| {
        b.to_async(&runtime).iter(|| async {
            bus.request("echo", json!(1), Duration::from_secs(1))
                .await
                .unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_publish_fanout,
    bench_offline_queue,
    bench_request_round_trip
);
criterion_main!(benches);
