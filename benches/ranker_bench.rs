use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use routegen::{Hop, PoolRef, Route, RouteRanker, encode_route};

/// Candidate routes from 0xA to 0xB: half direct through a shared pool set,
/// half two-hop through distinct intermediates.
fn candidates(count: usize) -> Vec<Route> {
    (0..count)
        .map(|i| {
            let pool = |n: usize| PoolRef::new("pancake", &format!("0xP{}", n), "2500");
            if i % 2 == 0 {
                Route::new(vec![Hop::new("0xA", "0xB", [pool(i % 7)])])
            } else {
                let mid = format!("0xT{}", i);
                Route::new(vec![
                    Hop::new("0xA", &mid, [pool(100 + i)]),
                    Hop::new(&mid, "0xB", [pool(200 + i), pool(i % 5)]),
                ])
            }
        })
        .collect()
}

fn bench_rank(c: &mut Criterion) {
    let mut group = c.benchmark_group("rank");
    for count in [10, 100, 1000] {
        let routes = candidates(count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &routes, |b, routes| {
            let ranker = RouteRanker::new(10);
            b.iter(|| ranker.rank(black_box(routes.clone())))
        });
    }
    group.finish();
}

fn bench_rank_uncapped(c: &mut Criterion) {
    let routes = candidates(1000);
    let ranker = RouteRanker::new(usize::MAX);
    c.bench_function("rank_uncapped_1000", |b| {
        b.iter(|| ranker.rank(black_box(routes.clone())))
    });
}

fn bench_encode(c: &mut Criterion) {
    let route = candidates(2).pop().unwrap_or_default();
    c.bench_function("encode_two_hop", |b| {
        b.iter(|| encode_route(black_box(&route)))
    });
}

criterion_group!(benches, bench_rank, bench_rank_uncapped, bench_encode);
criterion_main!(benches);
