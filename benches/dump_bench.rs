use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use routegen::{DumpConfig, DumpOrchestrator, PoolGraph, PoolRef, Token};
use std::sync::Arc;
use tempfile::TempDir;

/// A ring of tokens with a chord every third token, two dexes per edge.
fn ring_graph(tokens: usize) -> (Arc<PoolGraph>, Vec<Token>) {
    let names: Vec<Token> = (0..tokens).map(|i| format!("0xT{}", i)).collect();
    let mut graph = PoolGraph::new();
    for i in 0..tokens {
        let next = (i + 1) % tokens;
        graph.add_pool(&names[i], &names[next], PoolRef::new("pancake", &format!("0xR{}", i), "2500"));
        graph.add_pool(&names[i], &names[next], PoolRef::new("biswap", &format!("0xS{}", i), "1000"));
        if i % 3 == 0 {
            let across = (i + tokens / 2) % tokens;
            graph.add_pool(&names[i], &names[across], PoolRef::new("pancake", &format!("0xC{}", i), "2500"));
        }
    }
    (Arc::new(graph), names)
}

fn bench_dump(c: &mut Criterion) {
    let mut group = c.benchmark_group("dump");
    group.sample_size(10);
    for tokens in [8, 16, 32] {
        let (graph, names) = ring_graph(tokens);
        group.bench_with_input(BenchmarkId::from_parameter(tokens), &names, |b, names| {
            b.iter(|| {
                let dir = TempDir::new().unwrap();
                let config = DumpConfig {
                    max_hops: 3,
                    workers: 4,
                    ..DumpConfig::with_output(dir.path().join("dump.txt"))
                };
                let orchestrator = DumpOrchestrator::new(config, graph.clone()).unwrap();
                orchestrator.dump(names).unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_dump);
criterion_main!(benches);
