//! # Shard Node Benchmarks
//!
//! | Path | Target |
//! |------|--------|
//! | Peer feed publish, 1 subscriber | < 10µs |
//! | Peer feed publish, 16 subscribers | < 100µs |
//! | Collation body response construction | < 10µs |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::RngCore;
use shard_sync::{respond_collation_body, InMemoryShardStore};
use shared_bus::{InMemoryPeerFeed, PeerFeed};
use shared_types::{
    Collation, CollationBodyRequest, CollationHeader, MessageKind, Peer, PeerMessage,
    TransactionBroadcast,
};
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
}

// ============================================================================
// Peer feed fan-out
// ============================================================================

fn bench_feed_publish(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("peer-feed");

    for subscribers in [1usize, 4, 16] {
        let feed = InMemoryPeerFeed::new();
        let mut inboxes = Vec::new();
        let mut handles = Vec::new();
        for _ in 0..subscribers {
            let (inbox, handle) = feed
                .subscribe(MessageKind::TransactionBroadcast, 1024)
                .unwrap();
            inboxes.push(inbox);
            handles.push(handle);
        }

        let mut payload = vec![0u8; 1024];
        rand::thread_rng().fill_bytes(&mut payload);
        let message = PeerMessage::new(Peer::anonymous(), TransactionBroadcast { payload });

        group.throughput(Throughput::Elements(subscribers as u64));
        group.bench_with_input(
            BenchmarkId::new("publish", subscribers),
            &subscribers,
            |b, _| {
                b.iter(|| {
                    let delivered = rt.block_on(
                        feed.publish(MessageKind::TransactionBroadcast, message.clone()),
                    );
                    for inbox in inboxes.iter_mut() {
                        black_box(inbox.try_recv());
                    }
                    black_box(delivered)
                })
            },
        );

        for handle in handles {
            handle.unsubscribe();
        }
    }

    group.finish();
}

// ============================================================================
// Collation body responder
// ============================================================================

fn bench_respond_collation_body(c: &mut Criterion) {
    let rt = runtime();
    let store = InMemoryShardStore::new();
    for period in 0..1000u64 {
        store.insert(Collation::new(
            CollationHeader {
                shard_id: 1,
                period,
                chunk_root: [period as u8; 32],
                proposer: [1u8; 20],
            },
            vec![0xCD; 4096],
        ));
    }

    let request = PeerMessage::new(
        Peer::anonymous(),
        CollationBodyRequest {
            shard_id: 1,
            period: 500,
            chunk_root: [244u8; 32],
            proposer: [1u8; 20],
        },
    );

    c.bench_function("respond_collation_body", |b| {
        b.iter(|| black_box(rt.block_on(respond_collation_body(&request, &store)).is_ok()))
    });
}

criterion_group!(benches, bench_feed_publish, bench_respond_collation_body);
criterion_main!(benches);
