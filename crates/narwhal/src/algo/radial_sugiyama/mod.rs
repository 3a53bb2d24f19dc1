//! Radial Sugiyama: BFS layers from a hub mapped onto concentric rings, with barycenter sweeps
//! and adjacent-swap passes to reduce crossings.

use crate::algo::continuity::{CommunityFrame, LocalPlacement};
use crate::config::{FieldSpec, NODE_SPACING, ResolvedConfig, format_value, stability};
use crate::geom::Point;
use crate::hash;
use std::collections::VecDeque;
use std::f64::consts::TAU;

mod crossing;

use crossing::{circular_mean, swap_reduces_crossings};

pub(crate) const RING_GAP: FieldSpec = FieldSpec {
    key: "ringGap",
    label: "Ring gap",
    min: 10.0,
    max: 200.0,
    step: 1.0,
    default: 48.0,
};

pub(crate) const SWEEPS: FieldSpec = FieldSpec {
    key: "sweeps",
    label: "Sweep passes",
    min: 1.0,
    max: 12.0,
    step: 1.0,
    default: 4.0,
};

pub(crate) const FIELDS: [FieldSpec; 4] = [NODE_SPACING, stability(0.4), RING_GAP, SWEEPS];

pub(crate) fn summarize(cfg: &ResolvedConfig) -> String {
    format!(
        "Radial Sugiyama: ring gap {}, sweeps {}, spacing {}, stability {}",
        format_value(cfg.get(RING_GAP.key)),
        format_value(cfg.get(SWEEPS.key)),
        format_value(cfg.get(NODE_SPACING.key)),
        format_value(cfg.get("stability")),
    )
}

/// Communities up to this size run the adjacent-swap pass after every sweep.
const SMALL_COMMUNITY: usize = 64;
const MAX_SWAP_ROUNDS: usize = 4;

/// Node ids grouped into rings by BFS distance from the hub.
#[derive(Debug, Clone)]
struct Rings {
    layer_of: Vec<usize>,
    rings: Vec<Vec<usize>>,
}

impl Rings {
    fn from_hub(neighbors: &[Vec<usize>], hub: usize) -> Self {
        let n = neighbors.len();
        let mut layer_of: Vec<usize> = vec![usize::MAX; n];
        let mut queue: VecDeque<usize> = VecDeque::new();
        layer_of[hub] = 0;
        queue.push_back(hub);
        let mut deepest = 0usize;
        while let Some(v) = queue.pop_front() {
            for &w in &neighbors[v] {
                if layer_of[w] == usize::MAX {
                    layer_of[w] = layer_of[v] + 1;
                    deepest = deepest.max(layer_of[w]);
                    queue.push_back(w);
                }
            }
        }
        // Anything the hub cannot reach goes on a synthetic outer ring.
        let outer = deepest + 1;
        let mut has_outer = false;
        for l in &mut layer_of {
            if *l == usize::MAX {
                *l = outer;
                has_outer = true;
            }
        }
        let ring_count = if has_outer { outer + 1 } else { deepest + 1 };
        let mut rings: Vec<Vec<usize>> = vec![Vec::new(); ring_count];
        for (i, &l) in layer_of.iter().enumerate() {
            rings[l].push(i);
        }
        Self { layer_of, rings }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RadialSugiyamaPlacement;

impl LocalPlacement for RadialSugiyamaPlacement {
    fn place(&self, frame: &mut CommunityFrame<'_>, config: &ResolvedConfig) {
        let n = frame.len();
        if n == 0 {
            return;
        }
        if n == 1 {
            frame.positions[0] = frame.anchor;
            return;
        }
        let ring_gap = config.get(RING_GAP.key).max(RING_GAP.min);
        let sweeps = config.get_usize(SWEEPS.key, 1);

        let hub = frame.hub();
        let Rings {
            layer_of,
            mut rings,
        } = Rings::from_hub(&frame.neighbors, hub);

        // Initial order: previous angle when known, otherwise a hashed angle.
        let start_angle: Vec<f64> = (0..n)
            .map(|i| match frame.previous[i] {
                Some(p) => {
                    let d = p.sub(frame.anchor);
                    d.y.atan2(d.x).rem_euclid(TAU)
                }
                None => hash::angle(frame.node_ids[i], "ring-order"),
            })
            .collect();
        for ring in rings.iter_mut() {
            ring.sort_by(|&a, &b| start_angle[a].total_cmp(&start_angle[b]).then(a.cmp(&b)));
        }

        let radii = ring_radii(&rings, ring_gap, frame.node_spacing);
        let mut theta: Vec<f64> = vec![0.0; n];
        for (k, ring) in rings.iter().enumerate() {
            assign_slots(ring, k, &mut theta);
        }

        let ordering = RingOrdering {
            neighbors: &frame.neighbors,
            layer_of: &layer_of,
            radii: &radii,
        };
        for pass in 0..sweeps {
            let forward = pass % 2 == 0;
            let layers: Vec<usize> = if forward {
                (1..rings.len()).collect()
            } else {
                (1..rings.len()).rev().collect()
            };
            for k in layers {
                ordering.barycenter_sort(&mut rings[k], k, &mut theta);
            }
            if pass + 1 == sweeps || n <= SMALL_COMMUNITY {
                for k in 1..rings.len() {
                    ordering.adjacent_swaps(&mut rings[k], k, &mut theta);
                }
            }
        }

        let max_radius = radii.iter().copied().fold(0.0, f64::max);
        let scale = if max_radius > frame.radius && max_radius > 0.0 {
            frame.radius / max_radius
        } else {
            1.0
        };
        for (i, slot) in frame.positions.iter_mut().enumerate() {
            let r = radii[layer_of[i]] * scale;
            *slot = Point::polar(frame.anchor, r, theta[i]);
        }
        frame.align_rotation();
        tracing::trace!(
            community = frame.id,
            nodes = n,
            rings = rings.len(),
            sweeps,
            "radial sugiyama done"
        );
    }
}

/// Ring 0 holds only the hub and sits at the centre. Every later ring is at least `ring_gap`
/// outside the previous one and large enough to space its members by `node_spacing`.
fn ring_radii(rings: &[Vec<usize>], ring_gap: f64, node_spacing: f64) -> Vec<f64> {
    let mut radii = Vec::with_capacity(rings.len());
    let mut prev = 0.0f64;
    for (k, ring) in rings.iter().enumerate() {
        let r = if k == 0 {
            0.0
        } else {
            (prev + ring_gap).max(ring.len() as f64 * node_spacing / TAU)
        };
        radii.push(r);
        prev = r;
    }
    radii
}

/// Angle of slot 0 on ring `k`; odd rings are staggered by half a slot.
fn ring_offset(k: usize, len: usize) -> f64 {
    if k % 2 == 1 && len > 0 {
        TAU / (2.0 * len as f64)
    } else {
        0.0
    }
}

fn slot_angle(k: usize, len: usize, slot: usize) -> f64 {
    ring_offset(k, len) + TAU * slot as f64 / len as f64
}

fn assign_slots(ring: &[usize], k: usize, theta: &mut [f64]) {
    for (slot, &v) in ring.iter().enumerate() {
        theta[v] = slot_angle(k, ring.len(), slot);
    }
}

struct RingOrdering<'a> {
    neighbors: &'a [Vec<usize>],
    layer_of: &'a [usize],
    radii: &'a [f64],
}

impl RingOrdering<'_> {
    /// Angles of `v`'s neighbours on other rings. The centre ring has no meaningful angle.
    fn off_ring_angles(&self, v: usize, k: usize, theta: &[f64]) -> Vec<f64> {
        self.neighbors[v]
            .iter()
            .filter(|&&w| {
                let l = self.layer_of[w];
                l != k && self.radii[l] > 0.0
            })
            .map(|&w| theta[w])
            .collect()
    }

    fn barycenter_sort(&self, ring: &mut [usize], k: usize, theta: &mut [f64]) {
        if ring.len() < 2 {
            return;
        }
        let offset = ring_offset(k, ring.len());
        let mut keyed: Vec<(f64, usize, usize)> = ring
            .iter()
            .enumerate()
            .map(|(slot, &v)| {
                let bary =
                    circular_mean(self.off_ring_angles(v, k, theta)).unwrap_or(theta[v]);
                ((bary - offset).rem_euclid(TAU), slot, v)
            })
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        for (slot, (_, _, v)) in keyed.into_iter().enumerate() {
            ring[slot] = v;
        }
        assign_slots(ring, k, theta);
    }

    fn adjacent_swaps(&self, ring: &mut [usize], k: usize, theta: &mut [f64]) {
        let len = ring.len();
        if len < 2 {
            return;
        }
        let pairs = if len == 2 { 1 } else { len };
        for _ in 0..MAX_SWAP_ROUNDS {
            let mut improved = false;
            for s in 0..pairs {
                let t = (s + 1) % len;
                let (u, v) = (ring[s], ring[t]);
                let a = slot_angle(k, len, s);
                let b = if t == 0 {
                    slot_angle(k, len, 0) + TAU
                } else {
                    slot_angle(k, len, t)
                };
                let mid = (a + b) / 2.0;
                let first = self.off_ring_angles(u, k, theta);
                let second = self.off_ring_angles(v, k, theta);
                if swap_reduces_crossings(mid, &first, &second) {
                    ring.swap(s, t);
                    theta.swap(u, v);
                    improved = true;
                }
            }
            if !improved {
                break;
            }
        }
    }
}
