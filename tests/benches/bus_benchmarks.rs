//! # Shared Bus Benchmarks
//!
//! | Path | Measures |
//! |------|----------|
//! | dispatch | filter walk over N subscribers, delivery on the executor |
//! | subscribe / close | O(1) link and unlink against a populated chain |
//! | request / reply | full round trip through a responder listener |
//! | repository hit | read-locked lookup of an existing object |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use shared_bus::{
    BusContext, Communicator, IncomingMessage, LocalCommunicator, MessageFilter, MessageType,
};
use shared_objects::{CounterKind, SharedObjectRepository};
use std::sync::Arc;
use std::time::Duration;

fn bus() -> Arc<LocalCommunicator> {
    Arc::new(LocalCommunicator::new("bench", &BusContext::local()))
}

// ============================================================================
// Dispatch
// ============================================================================

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    group.measurement_time(Duration::from_secs(5));

    for subscribers in [1usize, 16, 256] {
        let bus = bus();
        // Only one subscriber matches; the rest are walked and rejected.
        let _listeners: Vec<_> = (0..subscribers)
            .map(|i| {
                bus.add_message_listener(
                    Arc::new(|m: &IncomingMessage| {
                        black_box(m.message_id());
                    }),
                    MessageFilter::custom(move |m| i == 0 || m.payload().is_null()),
                )
            })
            .collect();

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("send_signal", subscribers),
            &subscribers,
            |b, _| b.iter(|| black_box(bus.send_signal(json!(1)))),
        );
    }

    group.finish();
}

// ============================================================================
// Subscribe / Close
// ============================================================================

fn bench_subscribe_close(c: &mut Criterion) {
    let mut group = c.benchmark_group("chain");

    let bus = bus();
    let _population: Vec<_> = (0..1_000)
        .map(|_| bus.create_message_box(MessageFilter::none()))
        .collect();

    group.bench_function("subscribe_then_close", |b| {
        b.iter(|| {
            let subscription =
                bus.add_message_listener(Arc::new(|_: &IncomingMessage| {}), MessageFilter::none());
            black_box(subscription.close())
        })
    });

    group.finish();
}

// ============================================================================
// Request / Reply
// ============================================================================

fn bench_request_reply(c: &mut Criterion) {
    let mut group = c.benchmark_group("request_reply");
    group.measurement_time(Duration::from_secs(5));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();

    let bus = bus();
    let responder = Arc::downgrade(&bus);
    let _listener = bus.add_message_listener(
        Arc::new(move |request: &IncomingMessage| {
            if let Some(bus) = responder.upgrade() {
                bus.reply(request, request.payload().clone());
            }
        }),
        MessageFilter::of_type(MessageType::Request),
    );

    group.bench_function("send_request", |b| {
        b.to_async(&runtime).iter(|| {
            let bus = Arc::clone(&bus);
            async move {
                black_box(
                    bus.send_request(json!({"ping": true}), Duration::from_secs(1))
                        .await
                        .unwrap(),
                )
            }
        })
    });

    group.finish();
}

// ============================================================================
// Repository
// ============================================================================

fn bench_repository_hit(c: &mut Criterion) {
    let repository = SharedObjectRepository::<CounterKind>::default();
    repository.get_shared_object("hot").unwrap();

    c.bench_function("repository_hit", |b| {
        b.iter(|| black_box(repository.get_shared_object(black_box("hot")).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_dispatch,
    bench_subscribe_close,
    bench_request_reply,
    bench_repository_hit,
);
criterion_main!(benches);
