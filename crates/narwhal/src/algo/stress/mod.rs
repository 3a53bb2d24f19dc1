//! Stress majorization over bounded-hop graph distances.

use crate::algo::continuity::{CommunityFrame, LocalPlacement, positive_or};
use crate::config::{FieldSpec, NODE_SPACING, ResolvedConfig, format_value, stability};
use crate::geom::{self, Point, SpatialGrid};
use std::collections::VecDeque;

pub(crate) const IDEAL_DISTANCE: FieldSpec = FieldSpec {
    key: "idealDistance",
    label: "Ideal edge length",
    min: 10.0,
    max: 200.0,
    step: 1.0,
    default: 42.0,
};

pub(crate) const MAX_HOPS: FieldSpec = FieldSpec {
    key: "maxHops",
    label: "Max hops",
    min: 1.0,
    max: 10.0,
    step: 1.0,
    default: 5.0,
};

pub(crate) const ANCHOR_WEIGHT: FieldSpec = FieldSpec {
    key: "anchorWeight",
    label: "Anchor weight",
    min: 0.0,
    max: 5.0,
    step: 0.1,
    default: 0.6,
};

pub(crate) const ITERATIONS: FieldSpec = FieldSpec {
    key: "iterations",
    label: "Iterations",
    min: 5.0,
    max: 200.0,
    step: 1.0,
    default: 40.0,
};

pub(crate) const FIELDS: [FieldSpec; 6] = [
    NODE_SPACING,
    stability(0.3),
    IDEAL_DISTANCE,
    MAX_HOPS,
    ANCHOR_WEIGHT,
    ITERATIONS,
];

pub(crate) fn summarize(cfg: &ResolvedConfig) -> String {
    format!(
        "Stress: ideal {}, hops {}, anchor {}, iterations {}, stability {}",
        format_value(cfg.get(IDEAL_DISTANCE.key)),
        format_value(cfg.get(MAX_HOPS.key)),
        format_value(cfg.get(ANCHOR_WEIGHT.key)),
        format_value(cfg.get(ITERATIONS.key)),
        format_value(cfg.get("stability")),
    )
}

const EPSILON: f64 = 1e-6;
/// Nearest-first cap on distance terms per node, bounding memory for dense communities.
const MAX_TERMS_PER_NODE: usize = 256;
/// Anchor pseudo-term weight multiplier for nodes without a prior position.
const NEW_NODE_ANCHOR_FACTOR: f64 = 0.25;
const GRAVITY: f64 = 0.02;
const MIN_SPACING_FRACTION: f64 = 0.6;
const PAIRWISE_COLLISION_LIMIT: usize = 350;
const COLLISION_PASSES: usize = 2;
/// Total iteration work (iterations x nodes) above which iterations are scaled down.
const WORK_BUDGET: usize = 200_000;

#[derive(Debug, Clone, Copy)]
struct Term {
    other: usize,
    ideal: f64,
    weight: f64,
}

/// Per-node BFS to at most `max_hops`, nearest first.
fn distance_terms(neighbors: &[Vec<usize>], max_hops: usize, ideal: f64) -> Vec<Vec<Term>> {
    let n = neighbors.len();
    let mut hops: Vec<usize> = vec![usize::MAX; n];
    let mut touched: Vec<usize> = Vec::new();
    let mut queue: VecDeque<usize> = VecDeque::new();

    (0..n)
        .map(|src| {
            for &t in &touched {
                hops[t] = usize::MAX;
            }
            touched.clear();
            queue.clear();

            let mut terms: Vec<Term> = Vec::new();
            hops[src] = 0;
            touched.push(src);
            queue.push_back(src);
            'bfs: while let Some(v) = queue.pop_front() {
                if hops[v] >= max_hops {
                    continue;
                }
                for &w in &neighbors[v] {
                    if hops[w] != usize::MAX {
                        continue;
                    }
                    hops[w] = hops[v] + 1;
                    touched.push(w);
                    queue.push_back(w);
                    let d = hops[w] as f64 * ideal;
                    terms.push(Term {
                        other: w,
                        ideal: d,
                        weight: 1.0 / (d * d + EPSILON),
                    });
                    if terms.len() >= MAX_TERMS_PER_NODE {
                        break 'bfs;
                    }
                }
            }
            terms
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct StressPlacement;

impl LocalPlacement for StressPlacement {
    fn place(&self, frame: &mut CommunityFrame<'_>, config: &ResolvedConfig) {
        let n = frame.len();
        if n == 0 {
            return;
        }
        if n == 1 {
            frame.positions[0] = frame.anchor;
            return;
        }
        let ideal = positive_or(config.get(IDEAL_DISTANCE.key), IDEAL_DISTANCE.default);
        let max_hops = config.get_usize(MAX_HOPS.key, 1);
        let anchor_weight = config.get(ANCHOR_WEIGHT.key).max(0.0);
        let iterations = config
            .get_usize(ITERATIONS.key, 1)
            .min((WORK_BUDGET / n).max(8));

        let terms = distance_terms(&frame.neighbors, max_hops, ideal);
        // Targets of the anchor pseudo-term: prior position, else the deterministic seed.
        let targets: Vec<Point> = frame.positions.clone();
        let anchor_weights: Vec<f64> = terms
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let mean = if t.is_empty() {
                    1.0 / (ideal * ideal)
                } else {
                    t.iter().map(|t| t.weight).sum::<f64>() / t.len() as f64
                };
                let factor = if frame.is_new(i) {
                    NEW_NODE_ANCHOR_FACTOR
                } else {
                    1.0
                };
                anchor_weight * factor * mean
            })
            .collect();

        let ids = &frame.node_ids;
        let pos = &mut frame.positions;
        for _ in 0..iterations {
            for i in 0..n {
                let mut num = targets[i].scale(anchor_weights[i]);
                let mut den = anchor_weights[i];
                for t in &terms[i] {
                    let (d, len) = geom::separation(pos[i], pos[t.other], ids[i], ids[t.other]);
                    let goal = pos[t.other].add(d.scale(t.ideal / len));
                    num = num.add(goal.scale(t.weight));
                    den += t.weight;
                }
                if den > 0.0 {
                    let next = num.scale(1.0 / den);
                    if next.is_finite() {
                        pos[i] = next;
                    }
                }
            }
        }

        let anchor = frame.anchor;
        for p in pos.iter_mut() {
            *p = p.lerp(anchor, GRAVITY);
        }

        let min_spacing = frame.node_spacing * MIN_SPACING_FRACTION;
        for _ in 0..COLLISION_PASSES {
            if n <= PAIRWISE_COLLISION_LIMIT {
                resolve_collisions_pairwise(pos, ids, min_spacing);
            } else {
                resolve_collisions_grid(pos, ids, min_spacing);
            }
        }
        tracing::trace!(community = frame.id, nodes = n, iterations, "stress majorization done");
    }
}

fn push_apart(pos: &mut [Point], ids: &[&str], i: usize, j: usize, min_spacing: f64) {
    let dist = pos[i].distance(pos[j]);
    if dist >= min_spacing {
        return;
    }
    // Direction only; coincident pairs report a substitute length.
    let (d, len) = geom::separation(pos[i], pos[j], ids[i], ids[j]);
    let shift = d.scale((min_spacing - dist) / (2.0 * len));
    pos[i] = pos[i].add(shift);
    pos[j] = pos[j].sub(shift);
}

fn resolve_collisions_pairwise(pos: &mut [Point], ids: &[&str], min_spacing: f64) {
    for i in 0..pos.len() {
        for j in (i + 1)..pos.len() {
            push_apart(pos, ids, i, j, min_spacing);
        }
    }
}

/// Same as the pairwise pass but only checks pairs in neighbouring grid cells.
fn resolve_collisions_grid(pos: &mut [Point], ids: &[&str], min_spacing: f64) {
    let grid = SpatialGrid::build(pos, 2.0 * min_spacing);
    let mut near: Vec<usize> = Vec::new();
    for i in 0..pos.len() {
        near.clear();
        grid.for_each_near(pos[i], |j| {
            if j > i {
                near.push(j);
            }
        });
        near.sort_unstable();
        for &j in &near {
            push_apart(pos, ids, i, j, min_spacing);
        }
    }
}
