//! Hybrid backbone: a radial spanning tree over the non-leaf members, with pendant nodes
//! orbiting their parent.

use crate::algo::continuity::{CommunityFrame, LocalPlacement};
use crate::config::{FieldSpec, NODE_SPACING, ResolvedConfig, format_value, stability};
use crate::geom::Point;
use crate::hash;
use std::collections::VecDeque;
use std::f64::consts::{PI, TAU};

pub(crate) const LEAF_ORBIT: FieldSpec = FieldSpec {
    key: "leafOrbit",
    label: "Leaf orbit",
    min: 0.2,
    max: 1.5,
    step: 0.05,
    default: 0.6,
};

pub(crate) const SMOOTHING: FieldSpec = FieldSpec {
    key: "smoothing",
    label: "Backbone smoothing",
    min: 0.0,
    max: 1.0,
    step: 0.05,
    default: 0.25,
};

pub(crate) const FIELDS: [FieldSpec; 4] = [NODE_SPACING, stability(0.35), LEAF_ORBIT, SMOOTHING];

pub(crate) fn summarize(cfg: &ResolvedConfig) -> String {
    format!(
        "Hybrid backbone: leaf orbit {}, smoothing {}, spacing {}, stability {}",
        format_value(cfg.get(LEAF_ORBIT.key)),
        format_value(cfg.get(SMOOTHING.key)),
        format_value(cfg.get(NODE_SPACING.key)),
        format_value(cfg.get("stability")),
    )
}

/// Distance between backbone depths, in node spacings.
const DEPTH_GAP: f64 = 1.6;
/// Widest arc a fan of leaves may cover around its parent.
const MAX_FAN: f64 = PI;
const LEAF_FAN_STEP: f64 = 0.5;

/// BFS spanning tree rooted at the hub; children are in index order.
#[derive(Debug, Clone)]
struct SpanningTree {
    root: usize,
    parent: Vec<Option<usize>>,
    children: Vec<Vec<usize>>,
    depth: Vec<usize>,
    /// BFS visit order, root first.
    order: Vec<usize>,
}

impl SpanningTree {
    fn bfs(neighbors: &[Vec<usize>], root: usize) -> Self {
        let n = neighbors.len();
        let mut parent: Vec<Option<usize>> = vec![None; n];
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); n];
        let mut depth: Vec<usize> = vec![0; n];
        let mut seen = vec![false; n];
        let mut order = Vec::with_capacity(n);
        let mut queue = VecDeque::new();
        seen[root] = true;
        queue.push_back(root);
        while let Some(v) = queue.pop_front() {
            order.push(v);
            for &w in &neighbors[v] {
                if !seen[w] {
                    seen[w] = true;
                    parent[w] = Some(v);
                    depth[w] = depth[v] + 1;
                    children[v].push(w);
                    queue.push_back(w);
                }
            }
        }
        Self {
            root,
            parent,
            children,
            depth,
            order,
        }
    }

    /// Pendant members hang off the backbone; the root never does.
    fn is_leaf(&self, neighbors: &[Vec<usize>], v: usize) -> bool {
        v != self.root && self.children[v].is_empty() && neighbors[v].len() == 1
    }

    /// Subtree sizes, computed bottom-up over the reversed BFS order.
    fn weights(&self) -> Vec<f64> {
        let mut w = vec![1.0; self.parent.len()];
        for &v in self.order.iter().rev() {
            if let Some(p) = self.parent[v] {
                w[p] += w[v];
            }
        }
        w
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct BackbonePlacement;

impl LocalPlacement for BackbonePlacement {
    fn place(&self, frame: &mut CommunityFrame<'_>, config: &ResolvedConfig) {
        let n = frame.len();
        if n == 0 {
            return;
        }
        if n == 1 {
            frame.positions[0] = frame.anchor;
            return;
        }
        let leaf_orbit = frame.node_spacing * config.get(LEAF_ORBIT.key);
        let smoothing = config.get(SMOOTHING.key).clamp(0.0, 1.0);
        let gap = frame.node_spacing * DEPTH_GAP;

        let tree = SpanningTree::bfs(&frame.neighbors, frame.hub());
        let weights = tree.weights();
        let leaf: Vec<bool> = (0..n).map(|v| tree.is_leaf(&frame.neighbors, v)).collect();

        // Wedge per backbone node: [start, start + width).
        let mut wedge: Vec<(f64, f64)> = vec![(0.0, TAU); n];
        wedge[tree.root] = (hash::angle(frame.id, "backbone-rotation"), TAU);
        let mut offset: Vec<Point> = vec![Point::ORIGIN; n];
        for &v in &tree.order {
            let (start, width) = wedge[v];
            let spine: Vec<usize> = tree.children[v].iter().copied().filter(|&c| !leaf[c]).collect();
            let total: f64 = spine.iter().map(|&c| weights[c]).sum();
            let mut cursor = start;
            for c in spine {
                let share = width * weights[c] / total;
                wedge[c] = (cursor, share);
                let mid = cursor + share * 0.5;
                offset[c] = Point::polar(Point::ORIGIN, gap * tree.depth[c] as f64, mid);
                cursor += share;
            }
        }

        // Keep the deepest backbone ring inside the containment disk, leaving room for orbits.
        let reach = offset
            .iter()
            .map(|p| p.length())
            .fold(0.0_f64, f64::max);
        let room = (frame.radius - leaf_orbit).max(frame.radius * 0.5);
        if reach > room {
            let k = room / reach;
            for p in &mut offset {
                *p = p.scale(k);
            }
        }

        let mut pos: Vec<Point> = offset.iter().map(|o| frame.anchor.add(*o)).collect();
        if smoothing > 0.0 {
            let snapshot = pos.clone();
            for v in 0..n {
                if v == tree.root || leaf[v] {
                    continue;
                }
                let spine: Vec<Point> = frame.neighbors[v]
                    .iter()
                    .filter(|&&w| !leaf[w])
                    .map(|&w| snapshot[w])
                    .collect();
                if spine.is_empty() {
                    continue;
                }
                let centroid = spine
                    .iter()
                    .fold(Point::ORIGIN, |acc, p| acc.add(*p))
                    .scale(1.0 / spine.len() as f64);
                pos[v] = snapshot[v].lerp(centroid, smoothing * 0.5);
            }
        }

        for &v in &tree.order {
            let leaves: Vec<usize> = tree.children[v].iter().copied().filter(|&c| leaf[c]).collect();
            if leaves.is_empty() {
                continue;
            }
            let k = leaves.len() as f64;
            let (center, fan) = if v == tree.root {
                (wedge[v].0, TAU)
            } else {
                let out = pos[v].sub(frame.anchor);
                (out.y.atan2(out.x), (k * LEAF_FAN_STEP).min(MAX_FAN))
            };
            for (slot, &c) in leaves.iter().enumerate() {
                let angle = if v == tree.root {
                    center + fan * (slot as f64 + 0.5) / k
                } else if leaves.len() == 1 {
                    center
                } else {
                    center - fan * 0.5 + fan * slot as f64 / (k - 1.0)
                };
                pos[c] = Point::polar(pos[v], leaf_orbit, angle);
            }
        }

        frame.positions = pos;
        frame.align_rotation();
        tracing::trace!(
            community = frame.id,
            nodes = n,
            leaves = leaf.iter().filter(|l| **l).count(),
            "backbone placed"
        );
    }
}
