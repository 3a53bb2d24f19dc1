//! Shared decomposition and continuity template.
//!
//! Splits the visible graph into components (one community per component), keeps ids and
//! anchors stable across calls, and hands every community to a [`LocalPlacement`] that only has
//! to produce raw coordinates. The template then blends the raw result with the previous frame
//! and clamps it into the community's containment disk.

use crate::config::{NODE_SPACING, ResolvedConfig};
use crate::geom::{self, Point};
use crate::graph::components::{assign_group_ids, connected_components, priority_order};
use crate::graph::{CommunityLayout, ComponentLayout, Layout, LocalGraph, NodeTarget};
use crate::hash;
use crate::state::{ContinuityNode, ContinuityState, LayoutState};
use crate::strategy::{LayoutInput, LayoutOutput, LayoutStrategy, StrategyKind};
use std::collections::BTreeMap;

/// Golden angle in radians.
pub(crate) const GOLDEN_ANGLE: f64 = 2.399_963_229_728_653;

/// Slack applied to the containment radius by the final hard clamp.
const CONTAINMENT_SLACK: f64 = 1.05;
const CONTAINMENT_FACTOR: f64 = 1.2;
pub(crate) const MAX_ANCHOR_STEPS: usize = 256;

/// Strategy-specific point placement inside one community.
pub(crate) trait LocalPlacement: Send + Sync {
    /// Overwrites `frame.positions` (seeded with start positions) with raw coordinates.
    fn place(&self, frame: &mut CommunityFrame<'_>, config: &ResolvedConfig);
}

/// One community as seen by a [`LocalPlacement`]. Members are in lexicographic id order.
#[derive(Debug, Clone)]
pub(crate) struct CommunityFrame<'a> {
    pub id: &'a str,
    pub node_ids: Vec<&'a str>,
    pub neighbors: Vec<Vec<usize>>,
    pub anchor: Point,
    pub radius: f64,
    pub node_spacing: f64,
    /// Previous-frame positions shifted by the anchor's own movement; `None` for new nodes.
    pub previous: Vec<Option<Point>>,
    pub positions: Vec<Point>,
}

impl CommunityFrame<'_> {
    pub fn len(&self) -> usize {
        self.node_ids.len()
    }

    pub fn is_new(&self, i: usize) -> bool {
        self.previous[i].is_none()
    }

    pub fn new_count(&self) -> usize {
        self.previous.iter().filter(|p| p.is_none()).count()
    }

    pub fn degree(&self, i: usize) -> usize {
        self.neighbors[i].len()
    }

    /// Highest-degree member, ties broken by the smallest id.
    pub fn hub(&self) -> usize {
        let mut best = 0usize;
        for i in 1..self.len() {
            if self.degree(i) > self.degree(best) {
                best = i;
            }
        }
        best
    }

    /// Rotates the current positions around the anchor to best match the previous frame.
    pub fn align_rotation(&mut self) {
        if let Some(angle) = geom::best_rotation(self.anchor, &self.positions, &self.previous) {
            let anchor = self.anchor;
            for p in &mut self.positions {
                *p = p.rotate_around(anchor, angle);
            }
        }
    }
}

pub(crate) fn containment_radius(count: usize, node_spacing: f64) -> f64 {
    node_spacing * (1.0 + CONTAINMENT_FACTOR * (count as f64).sqrt())
}

/// Deterministic start position for a node without history.
pub(crate) fn seed_position(id: &str, anchor: Point, radius: f64, count: usize) -> Point {
    if count <= 1 {
        return anchor;
    }
    let r = radius * (0.2 + 0.6 * hash::unit(id, "seed-radius"));
    Point::polar(anchor, r, hash::angle(id, "seed-angle"))
}

/// Reuses previous anchors by id; places new ones on a golden-angle spiral, pushed outward until
/// their containment disk clears every anchor placed so far.
pub(crate) fn assign_anchors(
    ids: &[String],
    sizes: &[usize],
    order: &[usize],
    previous: &BTreeMap<String, Point>,
    node_spacing: f64,
) -> Vec<Point> {
    let mut anchors: Vec<Option<Point>> = vec![None; ids.len()];
    let mut placed: Vec<(Point, f64)> = Vec::with_capacity(ids.len());

    for &gi in order {
        if let Some(p) = previous.get(&ids[gi]).filter(|p| p.is_finite()) {
            anchors[gi] = Some(*p);
            placed.push((*p, containment_radius(sizes[gi], node_spacing)));
        }
    }

    for (ordinal, &gi) in order.iter().enumerate() {
        if anchors[gi].is_some() {
            continue;
        }
        let radius = containment_radius(sizes[gi], node_spacing);
        let angle = hash::angle(&ids[gi], "anchor") + ordinal as f64 * GOLDEN_ANGLE;
        let step = (radius * 0.5).max(node_spacing);
        let mut dist = 2.2 * radius * (ordinal as f64).sqrt();
        let mut candidate = Point::polar(Point::ORIGIN, dist, angle);
        for _ in 0..MAX_ANCHOR_STEPS {
            let clear = placed
                .iter()
                .all(|(p, r)| p.distance(candidate) >= r + radius + node_spacing);
            if clear {
                break;
            }
            dist += step;
            candidate = Point::polar(Point::ORIGIN, dist, angle);
        }
        anchors[gi] = Some(candidate);
        placed.push((candidate, radius));
    }

    anchors
        .into_iter()
        .map(|a| a.unwrap_or(Point::ORIGIN))
        .collect()
}

/// Mean position of `idx`'s neighbours, or its own position when it has none.
pub(crate) fn neighbor_centroid(graph: &LocalGraph, positions: &[Point], idx: usize) -> Point {
    let neighbors = graph.neighbors(idx);
    if neighbors.is_empty() {
        return positions[idx];
    }
    let sum = neighbors
        .iter()
        .fold(Point::ORIGIN, |acc, &j| acc.add(positions[j]));
    sum.scale(1.0 / neighbors.len() as f64)
}

/// A [`LayoutStrategy`] built from the continuity template and a local placement.
#[derive(Debug, Clone)]
pub(crate) struct ContinuityStrategy<P> {
    kind: StrategyKind,
    placement: P,
}

impl<P: LocalPlacement> ContinuityStrategy<P> {
    pub fn new(kind: StrategyKind, placement: P) -> Self {
        Self { kind, placement }
    }
}

impl<P: LocalPlacement> LayoutStrategy for ContinuityStrategy<P> {
    fn kind(&self) -> StrategyKind {
        self.kind
    }

    fn run(&self, input: &LayoutInput<'_>) -> LayoutOutput {
        run(self.kind, &self.placement, input)
    }
}

pub(crate) fn run(
    kind: StrategyKind,
    placement: &dyn LocalPlacement,
    input: &LayoutInput<'_>,
) -> LayoutOutput {
    let empty = ContinuityState::default();
    let prev = input.previous.continuity().unwrap_or(&empty);
    let node_spacing = positive_or(input.config.get(NODE_SPACING.key), NODE_SPACING.default);
    let stability = input.config.get("stability").clamp(0.0, 0.95);

    let graph = LocalGraph::new(input.node_ids, input.adjacency);
    let mut components = connected_components(&graph);
    for members in &mut components {
        members.sort_unstable();
    }
    // Communities currently coincide with components; `community_parent[ci]` is the component.
    let communities = components.clone();
    let community_parent: Vec<usize> = (0..communities.len()).collect();

    let mut component_sizes: BTreeMap<&str, usize> = BTreeMap::new();
    let mut community_sizes: BTreeMap<&str, usize> = BTreeMap::new();
    for memo in prev.nodes.values() {
        *component_sizes.entry(memo.component.as_str()).or_default() += 1;
        *community_sizes.entry(memo.community.as_str()).or_default() += 1;
    }
    let component_ids = assign_group_ids(
        "component",
        &graph,
        &components,
        |n| prev.nodes.get(n).map(|m| m.component.as_str()),
        &component_sizes,
    );
    let community_ids = assign_group_ids(
        "community",
        &graph,
        &communities,
        |n| prev.nodes.get(n).map(|m| m.community.as_str()),
        &community_sizes,
    );

    let sizes: Vec<usize> = communities.iter().map(Vec::len).collect();
    let order = priority_order(&communities);
    let anchors = assign_anchors(&community_ids, &sizes, &order, &prev.anchors, node_spacing);

    let mut positions: Vec<Point> = vec![Point::ORIGIN; graph.len()];
    let mut community_of: Vec<usize> = vec![0; graph.len()];

    for (ci, members) in communities.iter().enumerate() {
        let anchor = anchors[ci];
        let radius = containment_radius(members.len(), node_spacing);
        let limit = radius * CONTAINMENT_SLACK;
        let previous: Vec<Option<Point>> = members
            .iter()
            .map(|&gi| {
                let memo = prev.nodes.get(graph.id(gi))?;
                let old_anchor = prev
                    .anchors
                    .get(&memo.community)
                    .copied()
                    .unwrap_or(anchor);
                let carried = memo.position().add(anchor.sub(old_anchor));
                Some(geom::clamp_to_disk(carried, anchor, limit))
            })
            .collect();
        let start: Vec<Point> = members
            .iter()
            .zip(&previous)
            .map(|(&gi, p)| {
                p.unwrap_or_else(|| seed_position(graph.id(gi), anchor, radius, members.len()))
            })
            .collect();

        let mut frame = CommunityFrame {
            id: &community_ids[ci],
            node_ids: members.iter().map(|&gi| graph.id(gi)).collect(),
            neighbors: graph.induced(members),
            anchor,
            radius,
            node_spacing,
            previous,
            positions: start.clone(),
        };
        placement.place(&mut frame, input.config);
        tracing::trace!(
            strategy = kind.as_str(),
            community = frame.id,
            nodes = frame.len(),
            new_nodes = frame.new_count(),
            "placed community"
        );

        for (li, &gi) in members.iter().enumerate() {
            let raw = frame
                .positions
                .get(li)
                .copied()
                .filter(|p| p.is_finite())
                .unwrap_or(start[li]);
            let raw = geom::clamp_to_disk(raw, anchor, limit);
            let blended = match frame.previous[li] {
                Some(prev_pos) => prev_pos.lerp(raw, 1.0 - stability),
                None => raw,
            };
            positions[gi] = geom::clamp_to_disk(blended, anchor, limit);
            community_of[gi] = ci;
        }
    }

    let layout = assemble_layout(
        &graph,
        input.node_ids,
        &positions,
        &community_of,
        &component_ids,
        &community_ids,
        &community_parent,
        &anchors,
        &components,
    );

    let mut snapshot = ContinuityState {
        temporal_key: input.temporal_key.to_string(),
        ..Default::default()
    };
    for (ci, id) in community_ids.iter().enumerate() {
        snapshot.anchors.insert(id.clone(), anchors[ci]);
    }
    for (gi, p) in positions.iter().enumerate() {
        let ci = community_of[gi];
        snapshot.nodes.insert(
            graph.id(gi).to_string(),
            ContinuityNode {
                x: p.x,
                y: p.y,
                component: component_ids[community_parent[ci]].clone(),
                community: community_ids[ci].clone(),
            },
        );
    }

    LayoutOutput {
        layout,
        state: LayoutState::from_continuity(kind, snapshot),
    }
}

#[allow(clippy::too_many_arguments)]
fn assemble_layout(
    graph: &LocalGraph,
    input_ids: &[String],
    positions: &[Point],
    community_of: &[usize],
    component_ids: &[String],
    community_ids: &[String],
    community_parent: &[usize],
    anchors: &[Point],
    components: &[Vec<usize>],
) -> Layout {
    let member_ids =
        |members: &[usize]| -> Vec<String> { members.iter().map(|&i| graph.id(i).to_string()).collect() };

    let components_out = components
        .iter()
        .enumerate()
        .map(|(k, members)| {
            // The component's anchor is the anchor of its (single) community.
            let anchor = community_parent
                .iter()
                .position(|&p| p == k)
                .map(|ci| anchors[ci])
                .unwrap_or(Point::ORIGIN);
            ComponentLayout {
                component_id: component_ids[k].clone(),
                node_ids: member_ids(members),
                anchor_x: anchor.x,
                anchor_y: anchor.y,
            }
        })
        .collect();

    let mut community_members: Vec<Vec<usize>> = vec![Vec::new(); community_ids.len()];
    for (gi, &ci) in community_of.iter().enumerate() {
        community_members[ci].push(gi);
    }
    let communities_out = community_members
        .iter()
        .enumerate()
        .map(|(ci, members)| CommunityLayout {
            community_id: community_ids[ci].clone(),
            component_id: component_ids[community_parent[ci]].clone(),
            node_ids: member_ids(members),
            anchor_x: anchors[ci].x,
            anchor_y: anchors[ci].y,
        })
        .collect();

    let node_targets = input_ids
        .iter()
        .filter_map(|id| {
            let gi = graph.index_of(id)?;
            let ci = community_of[gi];
            let p = positions[gi];
            let centroid = neighbor_centroid(graph, positions, gi);
            Some(NodeTarget {
                node_id: id.clone(),
                component_id: component_ids[community_parent[ci]].clone(),
                community_id: community_ids[ci].clone(),
                target_x: p.x,
                target_y: p.y,
                neighbor_x: centroid.x,
                neighbor_y: centroid.y,
                anchor_x: anchors[ci].x,
                anchor_y: anchors[ci].y,
            })
        })
        .collect();

    Layout {
        components: components_out,
        communities: communities_out,
        node_targets,
    }
}

pub(crate) fn positive_or(v: f64, fallback: f64) -> f64 {
    if v.is_finite() && v > 0.0 { v } else { fallback }
}
