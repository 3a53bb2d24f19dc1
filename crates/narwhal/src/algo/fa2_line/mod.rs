//! FA2-Line: a self-contained force simulation with its own component bookkeeping.
//!
//! Unlike the continuity-based strategies this one keys anchors by component id, treats every
//! component as a single community carrying the component's id, and approximates repulsion by
//! sampling a fixed number of other members at a rotating stride.

use crate::algo::continuity::{GOLDEN_ANGLE, MAX_ANCHOR_STEPS, positive_or};
use crate::config::{FieldSpec, NODE_SPACING, ResolvedConfig, format_value, stability};
use crate::geom::{self, Point};
use crate::graph::components::{assign_group_ids, connected_components, priority_order};
use crate::graph::{CommunityLayout, ComponentLayout, Layout, LocalGraph, NodeTarget};
use crate::hash;
use crate::state::{Fa2LineNode, Fa2LineState, LayoutState};
use crate::strategy::{LayoutInput, LayoutOutput, LayoutStrategy, StrategyKind};
use std::collections::BTreeMap;

pub(crate) const GRAVITY: FieldSpec = FieldSpec {
    key: "gravity",
    label: "Gravity",
    min: 0.1,
    max: 10.0,
    step: 0.1,
    default: 1.2,
};

pub(crate) const ATTRACTION: FieldSpec = FieldSpec {
    key: "attraction",
    label: "Attraction",
    min: 0.01,
    max: 2.0,
    step: 0.01,
    default: 0.12,
};

pub(crate) const REPULSION: FieldSpec = FieldSpec {
    key: "repulsion",
    label: "Repulsion",
    min: 0.1,
    max: 10.0,
    step: 0.1,
    default: 1.0,
};

pub(crate) const ITERATIONS: FieldSpec = FieldSpec {
    key: "iterations",
    label: "Iterations",
    min: 10.0,
    max: 400.0,
    step: 1.0,
    default: 90.0,
};

pub(crate) const FIELDS: [FieldSpec; 6] = [
    NODE_SPACING,
    stability(0.3),
    GRAVITY,
    ATTRACTION,
    REPULSION,
    ITERATIONS,
];

pub(crate) fn summarize(cfg: &ResolvedConfig) -> String {
    format!(
        "FA2 line: gravity {}, attraction {}, repulsion {}, iterations {}, stability {}",
        format_value(cfg.get(GRAVITY.key)),
        format_value(cfg.get(ATTRACTION.key)),
        format_value(cfg.get(REPULSION.key)),
        format_value(cfg.get(ITERATIONS.key)),
        format_value(cfg.get("stability")),
    )
}

const GRAVITY_SCALE: f64 = 0.05;
const REPULSION_SCALE: f64 = 0.1;
const SPRING_LENGTH: f64 = 1.4;
const MAX_STEP: f64 = 1.5;
const JITTER: f64 = 0.15;
const MIN_TEMPERATURE: f64 = 0.05;
/// Anchor lane width in units of the largest component's containment radius.
const LANE: f64 = 2.2;
const CONTAINMENT_FACTOR: f64 = 1.2;
const CONTAINMENT_SLACK: f64 = 1.05;
/// Member count above which the iteration budget shrinks with `sqrt(LARGE / n)`.
const LARGE_COMPONENT: f64 = 600.0;

#[derive(Debug, Clone, Copy)]
struct Settings {
    spacing: f64,
    gravity: f64,
    attraction: f64,
    repulsion: f64,
    iterations: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Fa2LineStrategy;

impl LayoutStrategy for Fa2LineStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Fa2Line
    }

    fn run(&self, input: &LayoutInput<'_>) -> LayoutOutput {
        let empty = Fa2LineState::default();
        let prev = input.previous.fa2_line().unwrap_or(&empty);
        let spacing = positive_or(input.config.get(NODE_SPACING.key), NODE_SPACING.default);
        let settings = Settings {
            spacing,
            gravity: input.config.get(GRAVITY.key),
            attraction: input.config.get(ATTRACTION.key),
            repulsion: input.config.get(REPULSION.key),
            iterations: input.config.get_usize(ITERATIONS.key, 1),
        };
        let stability = input.config.get("stability").clamp(0.0, 0.95);

        let graph = LocalGraph::new(input.node_ids, input.adjacency);
        let mut components = connected_components(&graph);
        for members in &mut components {
            members.sort_unstable();
        }

        let mut previous_sizes: BTreeMap<&str, usize> = BTreeMap::new();
        for memo in prev.nodes.values() {
            *previous_sizes.entry(memo.component.as_str()).or_default() += 1;
        }
        let ids = assign_group_ids(
            "component",
            &graph,
            &components,
            |n| prev.nodes.get(n).map(|m| m.component.as_str()),
            &previous_sizes,
        );
        let order = priority_order(&components);
        let anchors = component_anchors(&ids, &components, &order, &prev.anchors, spacing);

        let mut positions = vec![Point::ORIGIN; graph.len()];
        let mut component_of = vec![0usize; graph.len()];
        for (ci, members) in components.iter().enumerate() {
            let anchor = anchors[ci];
            let radius = spacing * (1.0 + CONTAINMENT_FACTOR * (members.len() as f64).sqrt());
            let limit = radius * CONTAINMENT_SLACK;
            let carried: Vec<Option<Point>> = members
                .iter()
                .map(|&gi| {
                    let memo = prev.nodes.get(graph.id(gi))?;
                    let shift = prev
                        .anchors
                        .get(&memo.component)
                        .map_or(Point::ORIGIN, |old| anchor.sub(*old));
                    Some(geom::clamp_to_disk(memo.position().add(shift), anchor, limit))
                })
                .collect();
            let start: Vec<Point> = members
                .iter()
                .zip(&carried)
                .map(|(&gi, c)| c.unwrap_or_else(|| seed(graph.id(gi), anchor, radius)))
                .collect();

            let member_ids: Vec<&str> = members.iter().map(|&gi| graph.id(gi)).collect();
            let raw = simulate(
                &member_ids,
                &graph.induced(members),
                anchor,
                start.clone(),
                &settings,
            );
            tracing::trace!(
                component = ids[ci].as_str(),
                nodes = members.len(),
                "fa2 line component done"
            );

            for (li, &gi) in members.iter().enumerate() {
                let p = Some(raw[li]).filter(|p| p.is_finite()).unwrap_or(start[li]);
                let p = geom::clamp_to_disk(p, anchor, limit);
                let p = match carried[li] {
                    Some(old) => old.lerp(p, 1.0 - stability),
                    None => p,
                };
                positions[gi] = geom::clamp_to_disk(p, anchor, limit);
                component_of[gi] = ci;
            }
        }

        let layout = assemble(
            &graph,
            input.node_ids,
            &positions,
            &component_of,
            &ids,
            &anchors,
            &components,
        );
        let mut snapshot = Fa2LineState {
            temporal_key: input.temporal_key.to_string(),
            ..Default::default()
        };
        for (ci, id) in ids.iter().enumerate() {
            snapshot.anchors.insert(id.clone(), anchors[ci]);
        }
        for (gi, p) in positions.iter().enumerate() {
            snapshot.nodes.insert(
                graph.id(gi).to_string(),
                Fa2LineNode {
                    x: p.x,
                    y: p.y,
                    component: ids[component_of[gi]].clone(),
                },
            );
        }

        LayoutOutput {
            layout,
            state: LayoutState::Fa2Line(snapshot),
        }
    }
}

/// Reuses anchors by component id; new components go on a sunflower spiral whose lane width
/// fits the largest component, starting from a hashed angle, and step outward until their
/// disk clears every anchor already placed.
fn component_anchors(
    ids: &[String],
    components: &[Vec<usize>],
    order: &[usize],
    previous: &BTreeMap<String, Point>,
    spacing: f64,
) -> Vec<Point> {
    let disk = |count: usize| spacing * (1.0 + CONTAINMENT_FACTOR * (count as f64).sqrt());
    let largest = components.iter().map(Vec::len).max().unwrap_or(0);
    let lane = LANE * disk(largest);
    let mut anchors: Vec<Option<Point>> = vec![None; ids.len()];
    let mut placed: Vec<(Point, f64)> = Vec::with_capacity(ids.len());

    for &ci in order {
        if let Some(p) = previous.get(&ids[ci]).filter(|p| p.is_finite()) {
            anchors[ci] = Some(*p);
            placed.push((*p, disk(components[ci].len())));
        }
    }

    for (ordinal, &ci) in order.iter().enumerate() {
        if anchors[ci].is_some() {
            continue;
        }
        let radius = disk(components[ci].len());
        let angle = hash::angle(&ids[ci], "fa2line-anchor") + ordinal as f64 * GOLDEN_ANGLE;
        let step = (radius * 0.5).max(spacing);
        let mut dist = lane * (ordinal as f64).sqrt();
        let mut candidate = Point::polar(Point::ORIGIN, dist, angle);
        for _ in 0..MAX_ANCHOR_STEPS {
            if placed
                .iter()
                .all(|(p, r)| p.distance(candidate) >= r + radius + spacing)
            {
                break;
            }
            dist += step;
            candidate = Point::polar(Point::ORIGIN, dist, angle);
        }
        anchors[ci] = Some(candidate);
        placed.push((candidate, radius));
    }

    anchors
        .into_iter()
        .map(|a| a.unwrap_or(Point::ORIGIN))
        .collect()
}

fn seed(id: &str, anchor: Point, radius: f64) -> Point {
    let r = radius * (0.15 + 0.55 * hash::unit(id, "fa2line-radius"));
    Point::polar(anchor, r, hash::angle(id, "fa2line-angle"))
}

/// Number of repulsion samples per node and iteration.
fn sample_count(n: usize) -> usize {
    ((n as f64).sqrt() as usize).clamp(4, 16).min(n.saturating_sub(1))
}

fn simulate(
    ids: &[&str],
    neighbors: &[Vec<usize>],
    anchor: Point,
    mut pos: Vec<Point>,
    s: &Settings,
) -> Vec<Point> {
    let n = pos.len();
    if n <= 1 {
        return vec![anchor; n];
    }
    let samples = sample_count(n);
    let stride = ((n - 1) / samples.max(1)).max(1);
    let budget = if n as f64 > LARGE_COMPONENT {
        ((s.iterations as f64) * (LARGE_COMPONENT / n as f64).sqrt()).round() as usize
    } else {
        s.iterations
    };
    let iterations = budget.max(10);
    let spring = s.spacing * SPRING_LENGTH;
    let max_step = s.spacing * MAX_STEP;
    let min_dist = s.spacing * 0.1;
    // Each sample stands in for `(n - 1) / samples` members.
    let repulsion =
        s.repulsion * REPULSION_SCALE * s.spacing * s.spacing * (n - 1) as f64 / samples as f64;
    let base: Vec<u32> = ids
        .iter()
        .map(|&id| hash::fnv1a_parts(&["fa2line-jitter", id]))
        .collect();
    let mut forces = vec![Point::ORIGIN; n];

    for t in 0..iterations {
        let temperature = (1.0 - t as f64 / iterations as f64).max(MIN_TEMPERATURE);
        for i in 0..n {
            let mut f = anchor.sub(pos[i]).scale(s.gravity * GRAVITY_SCALE);

            for &j in &neighbors[i] {
                let (d, len) = geom::separation(pos[j], pos[i], ids[j], ids[i]);
                f = f.add(d.scale(s.attraction * (len - spring) / len));
            }

            for k in 0..samples {
                let j = (i + 1 + k * stride + t) % n;
                if j == i {
                    continue;
                }
                let (d, len) = geom::separation(pos[i], pos[j], ids[i], ids[j]);
                f = f.add(d.scale(repulsion / (len.max(min_dist) * len)));
            }

            let h = hash::remix(base[i], t as u32);
            let jitter = Point::new(
                hash::signed_of(h),
                hash::signed_of(hash::remix(h, 0x9e37)),
            );
            forces[i] = f.add(jitter.scale(JITTER * s.spacing * temperature));
        }

        for i in 0..n {
            let step = forces[i].scale(temperature);
            let len = step.length();
            let step = if len > max_step {
                step.scale(max_step / len)
            } else {
                step
            };
            let next = pos[i].add(step);
            if next.is_finite() {
                pos[i] = next;
            }
        }
    }
    pos
}

fn assemble(
    graph: &LocalGraph,
    input_ids: &[String],
    positions: &[Point],
    component_of: &[usize],
    ids: &[String],
    anchors: &[Point],
    components: &[Vec<usize>],
) -> Layout {
    let names = |members: &[usize]| -> Vec<String> {
        members.iter().map(|&gi| graph.id(gi).to_string()).collect()
    };
    let components_out = components
        .iter()
        .enumerate()
        .map(|(ci, members)| ComponentLayout {
            component_id: ids[ci].clone(),
            node_ids: names(members),
            anchor_x: anchors[ci].x,
            anchor_y: anchors[ci].y,
        })
        .collect();
    let communities_out = components
        .iter()
        .enumerate()
        .map(|(ci, members)| CommunityLayout {
            community_id: ids[ci].clone(),
            component_id: ids[ci].clone(),
            node_ids: names(members),
            anchor_x: anchors[ci].x,
            anchor_y: anchors[ci].y,
        })
        .collect();

    let node_targets = input_ids
        .iter()
        .filter_map(|id| {
            let gi = graph.index_of(id)?;
            let ci = component_of[gi];
            let p = positions[gi];
            let nb = graph.neighbors(gi);
            let centroid = if nb.is_empty() {
                p
            } else {
                nb.iter()
                    .fold(Point::ORIGIN, |acc, &j| acc.add(positions[j]))
                    .scale(1.0 / nb.len() as f64)
            };
            Some(NodeTarget {
                node_id: id.clone(),
                component_id: ids[ci].clone(),
                community_id: ids[ci].clone(),
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
