use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use coro::cluster::FleetCoordinator;
use coro::core::BotNode;
use coro::gateway::NodeTransport;
use coro::health::GatewayStatus;
use coro::stats::{MemoryStore, SettingsStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

struct AlwaysConnected;

impl NodeTransport for AlwaysConnected {
    fn status(&self) -> GatewayStatus {
        GatewayStatus::Connected
    }

    fn shutdown(&self) {}
}

fn fleet_of(node_count: usize) -> Arc<FleetCoordinator> {
    let nodes = (0..node_count)
        .map(|i| {
            Arc::new(BotNode::new(
                format!("node-{}", i),
                Arc::new(AlwaysConnected) as Arc<dyn NodeTransport>,
            ))
        })
        .collect();
    Arc::new(FleetCoordinator::new(nodes, Duration::from_secs(30)))
}

/// Steady-state leadership checks: the leader is already recorded, every
/// call is a map lookup plus a health probe.
fn bench_should_respond(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let coordinator = fleet_of(3);
    let node = coordinator.nodes()[0].clone();

    rt.block_on(async {
        for guild_id in 0..100u64 {
            coordinator.should_respond(&node, Some(guild_id)).await;
        }
    });

    c.bench_function("should_respond_steady_state", |b| {
        b.to_async(&rt).iter(|| {
            let coordinator = coordinator.clone();
            let node = node.clone();
            async move {
                black_box(coordinator.should_respond(&node, Some(42)).await);
            }
        })
    });
}

/// Cold elections: every guild needs a fresh leadership entry.
fn bench_election(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("election");
    for guild_count in [10u64, 100, 1000].iter() {
        group.bench_with_input(
            BenchmarkId::new("elect_guilds", guild_count),
            guild_count,
            |b, &guild_count| {
                b.to_async(&rt).iter(|| async move {
                    let coordinator = fleet_of(3);
                    let node = coordinator.nodes()[0].clone();
                    for guild_id in 0..guild_count {
                        black_box(coordinator.should_respond(&node, Some(guild_id)).await);
                    }
                })
            },
        );
    }
    group.finish();
}

fn bench_settings_store(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let store = Arc::new(MemoryStore::new());

    c.bench_function("store_volume_roundtrip", |b| {
        b.to_async(&rt).iter(|| {
            let store = store.clone();
            async move {
                store.set_guild_volume(7, 70).await.unwrap();
                black_box(store.guild_volume(7).await.unwrap());
            }
        })
    });
}

criterion_group!(
    benches,
    bench_should_respond,
    bench_election,
    bench_settings_store
);
criterion_main!(benches);
