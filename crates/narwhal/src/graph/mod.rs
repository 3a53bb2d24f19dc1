use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

pub mod components;

/// Symmetric `node -> neighbours` map. Nodes without neighbours may be present.
pub type AdjacencyMap = BTreeMap<String, BTreeSet<String>>;

/// Raw numeric per-strategy configuration, as received from callers.
pub type StrategyConfig = BTreeMap<String, f64>;

/// Builds a symmetric adjacency map from an undirected edge list.
pub fn adjacency_from_edges<'a>(edges: impl IntoIterator<Item = (&'a str, &'a str)>) -> AdjacencyMap {
    let mut adjacency = AdjacencyMap::new();
    for (a, b) in edges {
        adjacency
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string());
        adjacency
            .entry(b.to_string())
            .or_default()
            .insert(a.to_string());
    }
    adjacency
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutRequest {
    pub strategy_name: String,
    pub node_ids: Vec<String>,
    #[serde(default)]
    pub adjacency_by_node_id: AdjacencyMap,
    #[serde(default)]
    pub temporal_key: String,
    #[serde(default)]
    pub previous_state: Option<Value>,
    #[serde(default)]
    pub strategy_config: Option<StrategyConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentLayout {
    pub component_id: String,
    pub node_ids: Vec<String>,
    pub anchor_x: f64,
    pub anchor_y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityLayout {
    pub community_id: String,
    pub component_id: String,
    pub node_ids: Vec<String>,
    pub anchor_x: f64,
    pub anchor_y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTarget {
    pub node_id: String,
    pub component_id: String,
    pub community_id: String,
    pub target_x: f64,
    pub target_y: f64,
    /// Centroid of the node's visible neighbours (edge-bundling hint for the renderer).
    pub neighbor_x: f64,
    pub neighbor_y: f64,
    pub anchor_x: f64,
    pub anchor_y: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub components: Vec<ComponentLayout>,
    pub communities: Vec<CommunityLayout>,
    pub node_targets: Vec<NodeTarget>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutMetadata {
    /// Opaque continuity snapshot; pass it back as `previousState` on the next call.
    pub state: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutResponse {
    pub layout: Layout,
    pub metadata: LayoutMetadata,
}

/// Visible graph indexed for layout: ids sorted lexicographically, adjacency symmetrised,
/// restricted to visible nodes, de-duplicated and sorted by index.
#[derive(Debug, Clone, Default)]
pub struct LocalGraph {
    ids: Vec<String>,
    id_to_idx: FxHashMap<String, usize>,
    neighbors: Vec<Vec<usize>>,
}

impl LocalGraph {
    pub fn new(node_ids: &[String], adjacency: &AdjacencyMap) -> Self {
        let mut ids: Vec<String> = node_ids.to_vec();
        ids.sort();
        ids.dedup();

        let mut id_to_idx: FxHashMap<String, usize> = FxHashMap::default();
        id_to_idx.reserve(ids.len());
        for (idx, id) in ids.iter().enumerate() {
            id_to_idx.insert(id.clone(), idx);
        }

        let mut neighbors: Vec<Vec<usize>> = vec![Vec::new(); ids.len()];
        for (id, adjacent) in adjacency {
            let Some(&a) = id_to_idx.get(id.as_str()) else {
                continue;
            };
            for other in adjacent {
                let Some(&b) = id_to_idx.get(other.as_str()) else {
                    continue;
                };
                if a == b {
                    continue;
                }
                neighbors[a].push(b);
                neighbors[b].push(a);
            }
        }
        for list in &mut neighbors {
            list.sort_unstable();
            list.dedup();
        }

        Self {
            ids,
            id_to_idx,
            neighbors,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn id(&self, idx: usize) -> &str {
        &self.ids[idx]
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.id_to_idx.get(id).copied()
    }

    pub fn neighbors(&self, idx: usize) -> &[usize] {
        &self.neighbors[idx]
    }

    pub fn degree(&self, idx: usize) -> usize {
        self.neighbors[idx].len()
    }

    /// Induced subgraph over `members` (global indices), re-indexed in the given order.
    pub fn induced(&self, members: &[usize]) -> Vec<Vec<usize>> {
        let mut local: FxHashMap<usize, usize> = FxHashMap::default();
        local.reserve(members.len());
        for (li, &gi) in members.iter().enumerate() {
            local.insert(gi, li);
        }
        members
            .iter()
            .map(|&gi| {
                let mut out: Vec<usize> = self.neighbors[gi]
                    .iter()
                    .filter_map(|nb| local.get(nb).copied())
                    .collect();
                out.sort_unstable();
                out
            })
            .collect()
    }
}
