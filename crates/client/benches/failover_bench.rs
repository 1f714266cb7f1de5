//! Benchmarks for the cluster client dispatch loop.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use etcdkit_client::chaos::{ChaosConfig, ChaosTransport};
use etcdkit_client::memory::MemTransport;
use etcdkit_client::{ClusterClient, Endpoint};
use std::sync::Arc;
use tokio::time::Duration;

fn endpoints(n: usize) -> Vec<Endpoint> {
    (0..n)
        .map(|i| Endpoint::http(format!("etcd-{:02}", i), 2379).unwrap())
        .collect()
}

fn bench_healthy_put(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let client = ClusterClient::new(
        endpoints(3),
        Duration::from_secs(1),
        Arc::new(MemTransport::new()),
    )
    .unwrap();

    let mut i = 0u64;
    c.bench_function("cluster_put_healthy", |b| {
        b.iter(|| {
            rt.block_on(async {
                client
                    .put(&i.to_be_bytes(), b"value")
                    .await
                    .unwrap();
            });
            i += 1;
        });
    });
}

fn bench_get_after_failover(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();

    let mut group = c.benchmark_group("cluster_get_dead_members");
    for dead in [0usize, 1, 3] {
        group.bench_with_input(BenchmarkId::from_parameter(dead), &dead, |b, &dead| {
            let eps = endpoints(dead + 1);
            let transport = Arc::new(ChaosTransport::new(
                MemTransport::new(),
                ChaosConfig::default(),
            ));
            rt.block_on(async {
                for ep in &eps[..dead] {
                    transport.fail_endpoint(ep).await;
                }
            });
            let client = ClusterClient::new(eps, Duration::from_secs(1), transport).unwrap();
            rt.block_on(async { client.put(b"key", b"value").await.unwrap() });

            // Affinity now points at the live member; every get goes straight there.
            b.iter(|| {
                rt.block_on(async { black_box(client.get(b"key").await.unwrap()) });
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_healthy_put, bench_get_after_failover);
criterion_main!(benches);
