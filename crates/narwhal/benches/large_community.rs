use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use narwhal::{AdjacencyMap, LayoutRequest, StrategyRegistry, adjacency_from_edges, layout};
use std::hint::black_box;
use std::time::Duration;

#[derive(Debug, Clone)]
struct GraphSpec {
    node_ids: Vec<String>,
    adjacency: AdjacencyMap,
}

/// One connected community: a ring with deterministic chords, denser around a few hubs.
fn build_community_spec(node_count: usize) -> GraphSpec {
    let node_ids: Vec<String> = (0..node_count).map(|i| format!("alliance-{i:05}")).collect();
    let mut edges: Vec<(&str, &str)> = Vec::new();
    for i in 0..node_count {
        edges.push((node_ids[i].as_str(), node_ids[(i + 1) % node_count].as_str()));
        let chord = (i * 31 + 7) % node_count;
        if chord != i {
            edges.push((node_ids[i].as_str(), node_ids[chord].as_str()));
        }
        if i % 9 == 0 {
            let hub = (i / 9) % 12;
            if hub != i {
                edges.push((node_ids[i].as_str(), node_ids[hub].as_str()));
            }
        }
    }
    let adjacency = adjacency_from_edges(edges);
    GraphSpec {
        node_ids,
        adjacency,
    }
}

fn bench_large_community(c: &mut Criterion) {
    let registry = StrategyRegistry::with_defaults();
    let mut group = c.benchmark_group("large_community");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(10);

    let cases = [("n_500", 500usize), ("n_2000", 2000usize)];
    let strategies = ["barnes-hut-fa2", "stress-majorization", "radial-sugiyama", "fa2line"];

    for (name, nodes) in cases {
        let spec = build_community_spec(nodes);
        for strategy in strategies {
            let request = LayoutRequest {
                strategy_name: strategy.to_string(),
                node_ids: spec.node_ids.clone(),
                adjacency_by_node_id: spec.adjacency.clone(),
                temporal_key: "bench".into(),
                previous_state: None,
                strategy_config: None,
            };
            group.bench_with_input(BenchmarkId::new(strategy, name), &request, |b, request| {
                b.iter(|| {
                    let res = layout(&registry, black_box(request)).unwrap();
                    black_box(res.layout.node_targets.len());
                })
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_large_community);
criterion_main!(benches);
