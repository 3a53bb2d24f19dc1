use narwhal::{
    AdjacencyMap, LayoutRequest, LayoutResponse, StrategyKind, StrategyRegistry,
    adjacency_from_edges, layout,
};
use serde_json::Value;

fn ids(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn run(
    registry: &StrategyRegistry,
    strategy: &str,
    node_ids: &[String],
    adjacency: &AdjacencyMap,
    previous: Option<Value>,
) -> LayoutResponse {
    layout(
        registry,
        &LayoutRequest {
            strategy_name: strategy.to_string(),
            node_ids: node_ids.to_vec(),
            adjacency_by_node_id: adjacency.clone(),
            temporal_key: "t".into(),
            previous_state: previous,
            strategy_config: None,
        },
    )
    .unwrap()
}

fn signature(res: &LayoutResponse) -> String {
    let mut out = String::new();
    for c in &res.layout.components {
        out.push_str(&format!("C {} {:?}\n", c.component_id, c.node_ids));
    }
    for c in &res.layout.communities {
        out.push_str(&format!("G {} {} {:?}\n", c.community_id, c.component_id, c.node_ids));
    }
    for t in &res.layout.node_targets {
        out.push_str(&format!(
            "N {} {} {} {:.4} {:.4}\n",
            t.node_id, t.component_id, t.community_id, t.target_x, t.target_y
        ));
    }
    out
}

fn assert_well_formed(res: &LayoutResponse, node_ids: &[String]) {
    assert_eq!(res.layout.node_targets.len(), node_ids.len());
    for (t, id) in res.layout.node_targets.iter().zip(node_ids) {
        assert_eq!(&t.node_id, id);
        for v in [
            t.target_x, t.target_y, t.neighbor_x, t.neighbor_y, t.anchor_x, t.anchor_y,
        ] {
            assert!(v.is_finite(), "{} has a non-finite coordinate", t.node_id);
        }
    }
}

/// Two triangles joined by a bridge, a pendant chain, and an isolated node.
fn mixed_graph() -> (Vec<String>, AdjacencyMap) {
    let node_ids = ids(&["a", "b", "c", "d", "e", "f", "g", "h", "solo"]);
    let adjacency = adjacency_from_edges([
        ("a", "b"),
        ("b", "c"),
        ("c", "a"),
        ("c", "d"),
        ("d", "e"),
        ("e", "f"),
        ("f", "d"),
        ("g", "h"),
    ]);
    (node_ids, adjacency)
}

#[test]
fn every_strategy_returns_one_finite_target_per_node() {
    let registry = StrategyRegistry::with_defaults();
    let (node_ids, adjacency) = mixed_graph();
    for kind in StrategyKind::ALL {
        let res = run(&registry, kind.as_str(), &node_ids, &adjacency, None);
        assert_well_formed(&res, &node_ids);
        assert_eq!(res.layout.components.len(), 3, "{kind}");
        assert_eq!(res.layout.communities.len(), 3, "{kind}");
        assert_eq!(res.layout.components[0].node_ids, ids(&["a", "b", "c", "d", "e", "f"]));
    }
}

#[test]
fn every_strategy_is_deterministic() {
    let registry = StrategyRegistry::with_defaults();
    let (node_ids, adjacency) = mixed_graph();
    for kind in StrategyKind::ALL {
        let first = run(&registry, kind.as_str(), &node_ids, &adjacency, None);
        let second = run(&registry, kind.as_str(), &node_ids, &adjacency, None);
        assert_eq!(first, second, "{kind}");
    }
}

#[test]
fn empty_input_yields_an_empty_layout() {
    let registry = StrategyRegistry::with_defaults();
    for kind in StrategyKind::ALL {
        let res = run(&registry, kind.as_str(), &[], &AdjacencyMap::new(), None);
        assert!(res.layout.node_targets.is_empty());
        assert!(res.layout.components.is_empty());
        assert_eq!(res.metadata.state["strategy"], kind.as_str());
    }
}

#[test]
fn edges_to_hidden_nodes_and_self_loops_are_ignored() {
    let registry = StrategyRegistry::with_defaults();
    let node_ids = ids(&["a", "b"]);
    let adjacency = adjacency_from_edges([("a", "hidden"), ("b", "b")]);
    for kind in StrategyKind::ALL {
        let res = run(&registry, kind.as_str(), &node_ids, &adjacency, None);
        assert_well_formed(&res, &node_ids);
        assert_eq!(res.layout.components.len(), 2, "{kind}");
        let a = &res.layout.node_targets[0];
        assert_eq!((a.neighbor_x, a.neighbor_y), (a.target_x, a.target_y));
    }
}

#[test]
fn hybrid_backbone_and_fa2line_differ_on_the_same_input() {
    let registry = StrategyRegistry::with_defaults();
    let node_ids = ids(&["a", "b", "c", "x", "y", "z"]);
    let adjacency = adjacency_from_edges([("a", "b"), ("b", "c"), ("x", "y"), ("y", "z")]);
    let hybrid = run(&registry, "hybrid-backbone", &node_ids, &adjacency, None);
    let line = run(&registry, "fa2line", &node_ids, &adjacency, None);
    assert!(!hybrid.layout.components.is_empty());
    assert!(!line.layout.components.is_empty());
    assert_ne!(signature(&hybrid), signature(&line));
}

#[test]
fn members_stay_inside_their_containment_disk() {
    let registry = StrategyRegistry::with_defaults();
    let (node_ids, adjacency) = mixed_graph();
    for kind in StrategyKind::ALL {
        let res = run(&registry, kind.as_str(), &node_ids, &adjacency, None);
        for c in &res.layout.communities {
            let limit = 28.0 * (1.0 + 1.2 * (c.node_ids.len() as f64).sqrt()) * 1.05 + 1e-6;
            for t in res.layout.node_targets.iter().filter(|t| t.community_id == c.community_id) {
                let d = (t.target_x - c.anchor_x).hypot(t.target_y - c.anchor_y);
                assert!(d <= limit, "{kind}: {} is {d} from its anchor", t.node_id);
            }
        }
    }
}

#[test]
fn large_communities_take_the_sub_quadratic_paths() {
    let registry = StrategyRegistry::with_defaults();
    let n = 420;
    let names: Vec<String> = (0..n).map(|i| format!("n{i:03}")).collect();
    let mut edges: Vec<(&str, &str)> = Vec::new();
    for i in 0..n {
        edges.push((names[i].as_str(), names[(i + 1) % n].as_str()));
        edges.push((names[i].as_str(), names[(i * 7 + 3) % n].as_str()));
    }
    let adjacency = adjacency_from_edges(edges);
    for name in ["barnes-hut-fa2", "stress-majorization", "fa2line"] {
        let res = run(&registry, name, &names, &adjacency, None);
        assert_well_formed(&res, &names);
        assert_eq!(res.layout.components.len(), 1);
    }
}
