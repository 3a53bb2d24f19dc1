//! Connected components and stable group ids.

use super::LocalGraph;
use rustc_hash::FxHashSet;
use std::collections::{BTreeMap, VecDeque};

/// Splits the graph into connected components.
///
/// Roots are taken in lexicographic id order and neighbours are visited in lexicographic order,
/// so both the component order and each member list (BFS order) are deterministic.
pub fn connected_components(graph: &LocalGraph) -> Vec<Vec<usize>> {
    let mut seen = vec![false; graph.len()];
    let mut out: Vec<Vec<usize>> = Vec::new();
    let mut queue: VecDeque<usize> = VecDeque::new();

    for root in 0..graph.len() {
        if seen[root] {
            continue;
        }
        seen[root] = true;
        queue.push_back(root);
        let mut members: Vec<usize> = Vec::new();
        while let Some(v) = queue.pop_front() {
            members.push(v);
            for &w in graph.neighbors(v) {
                if !seen[w] {
                    seen[w] = true;
                    queue.push_back(w);
                }
            }
        }
        out.push(members);
    }
    out
}

/// Canonical id of a group: `<prefix>:<smallest member id>:<member count>`.
pub fn canonical_id(prefix: &str, graph: &LocalGraph, members: &[usize]) -> String {
    let smallest = members.iter().copied().min().map(|i| graph.id(i)).unwrap_or("");
    format!("{prefix}:{smallest}:{}", members.len())
}

/// Processing order for groups: largest first, then by smallest member id.
pub fn priority_order(groups: &[Vec<usize>]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..groups.len()).collect();
    order.sort_by(|&a, &b| {
        let min_a = groups[a].iter().min();
        let min_b = groups[b].iter().min();
        groups[b]
            .len()
            .cmp(&groups[a].len())
            .then_with(|| min_a.cmp(&min_b))
    });
    order
}

/// Assigns an id to every group, reusing previous ids where membership mostly survived.
///
/// `previous_group_of` maps a node id to the group id it carried in the previous frame, and
/// `previous_sizes` holds the member count of every previous group. A group inherits the
/// previous id most of its members carried (ties broken by the smaller id) when that id is still
/// unclaimed and at least half of the old group is present. Everything else gets its canonical
/// id, suffixed on collision.
pub fn assign_group_ids<'p>(
    prefix: &str,
    graph: &LocalGraph,
    groups: &[Vec<usize>],
    previous_group_of: impl Fn(&str) -> Option<&'p str>,
    previous_sizes: &BTreeMap<&'p str, usize>,
) -> Vec<String> {
    let mut ids: Vec<Option<String>> = vec![None; groups.len()];
    let mut claimed: FxHashSet<String> = FxHashSet::default();

    let order = priority_order(groups);
    for &gi in &order {
        let mut votes: BTreeMap<&str, usize> = BTreeMap::new();
        for &m in &groups[gi] {
            if let Some(prev) = previous_group_of(graph.id(m)) {
                *votes.entry(prev).or_default() += 1;
            }
        }
        // BTreeMap iteration is ordered by id, so the first maximum wins ties.
        let mut best: Option<(&str, usize)> = None;
        for (&id, &count) in &votes {
            if claimed.contains(id) {
                continue;
            }
            if best.is_none_or(|(_, c)| count > c) {
                best = Some((id, count));
            }
        }
        if let Some((id, count)) = best {
            let old_size = previous_sizes.get(id).copied().unwrap_or(count);
            if count * 2 >= old_size {
                claimed.insert(id.to_string());
                ids[gi] = Some(id.to_string());
            }
        }
    }

    for &gi in &order {
        if ids[gi].is_some() {
            continue;
        }
        let base = canonical_id(prefix, graph, &groups[gi]);
        let mut candidate = base.clone();
        let mut suffix = 1usize;
        while claimed.contains(&candidate) {
            candidate = format!("{base}~{suffix}");
            suffix += 1;
        }
        claimed.insert(candidate.clone());
        ids[gi] = Some(candidate);
    }

    ids.into_iter().map(Option::unwrap_or_default).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::adjacency_from_edges;

    fn graph(nodes: &[&str], edges: &[(&str, &str)]) -> LocalGraph {
        let ids: Vec<String> = nodes.iter().map(|s| s.to_string()).collect();
        LocalGraph::new(&ids, &adjacency_from_edges(edges.iter().copied()))
    }

    #[test]
    fn components_follow_sorted_roots_and_bfs_order() {
        let g = graph(
            &["e", "d", "c", "b", "a"],
            &[("a", "c"), ("c", "b"), ("d", "e")],
        );
        let comps = connected_components(&g);
        let named: Vec<Vec<&str>> = comps
            .iter()
            .map(|c| c.iter().map(|&i| g.id(i)).collect())
            .collect();
        assert_eq!(named, vec![vec!["a", "c", "b"], vec!["d", "e"]]);
    }

    #[test]
    fn canonical_ids_use_smallest_member_and_count() {
        let g = graph(&["x", "y"], &[("x", "y")]);
        let comps = connected_components(&g);
        assert_eq!(canonical_id("component", &g, &comps[0]), "component:x:2");
    }

    #[test]
    fn growing_group_keeps_its_previous_id() {
        let g = graph(
            &["a", "b", "c", "d", "e", "f"],
            &[("a", "b"), ("b", "c"), ("c", "d"), ("d", "e"), ("e", "f")],
        );
        let comps = connected_components(&g);
        let previous: BTreeMap<&str, &str> = ["a", "b", "c", "d", "e"]
            .into_iter()
            .map(|n| (n, "component:a:5"))
            .collect();
        let sizes: BTreeMap<&str, usize> = [("component:a:5", 5)].into_iter().collect();
        let ids = assign_group_ids(
            "component",
            &g,
            &comps,
            |n| previous.get(n).copied(),
            &sizes,
        );
        assert_eq!(ids, vec!["component:a:5".to_string()]);
    }

    #[test]
    fn split_group_hands_old_id_to_one_side_only() {
        let g = graph(&["a", "b", "c", "d"], &[("a", "b"), ("c", "d")]);
        let comps = connected_components(&g);
        let previous: BTreeMap<&str, &str> = ["a", "b", "c", "d"]
            .into_iter()
            .map(|n| (n, "component:a:4"))
            .collect();
        let sizes: BTreeMap<&str, usize> = [("component:a:4", 4)].into_iter().collect();
        let ids = assign_group_ids(
            "component",
            &g,
            &comps,
            |n| previous.get(n).copied(),
            &sizes,
        );
        assert_eq!(ids[0], "component:a:4");
        assert_eq!(ids[1], "component:c:2");
    }

    #[test]
    fn fresh_id_collisions_get_a_suffix() {
        let g = graph(&["a", "b", "c"], &[("a", "b")]);
        let comps = connected_components(&g);
        // "c" used to live in a group whose id now collides with the canonical id of {a, b}.
        let previous: BTreeMap<&str, &str> = [("c", "component:a:2")].into_iter().collect();
        let sizes: BTreeMap<&str, usize> = [("component:a:2", 1)].into_iter().collect();
        let ids = assign_group_ids(
            "component",
            &g,
            &comps,
            |n| previous.get(n).copied(),
            &sizes,
        );
        assert_eq!(ids[1], "component:a:2");
        assert_eq!(ids[0], "component:a:2~1");
    }
}
