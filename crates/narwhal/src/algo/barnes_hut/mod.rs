//! ForceAtlas2 with Barnes-Hut repulsion.
//!
//! Runs in spacing-normalised coordinates centred on the community anchor, so the force
//! constants do not depend on the configured node spacing.

use crate::algo::continuity::{CommunityFrame, GOLDEN_ANGLE, LocalPlacement};
use crate::config::{FieldSpec, NODE_SPACING, ResolvedConfig, format_value, stability};
use crate::geom::{self, Point};
use crate::hash;

mod quadtree;

use quadtree::QuadTree;

pub(crate) const GRAVITY: FieldSpec = FieldSpec {
    key: "gravity",
    label: "Gravity",
    min: 0.1,
    max: 10.0,
    step: 0.1,
    default: 1.0,
};

pub(crate) const SCALING_RATIO: FieldSpec = FieldSpec {
    key: "scalingRatio",
    label: "Scaling ratio",
    min: 0.5,
    max: 20.0,
    step: 0.5,
    default: 2.0,
};

pub(crate) const QUALITY: FieldSpec = FieldSpec {
    key: "quality",
    label: "Quality",
    min: 0.25,
    max: 3.0,
    step: 0.25,
    default: 1.0,
};

pub(crate) const FIELDS: [FieldSpec; 5] = [
    NODE_SPACING,
    stability(0.35),
    GRAVITY,
    SCALING_RATIO,
    QUALITY,
];

pub(crate) fn summarize(cfg: &ResolvedConfig) -> String {
    format!(
        "FA2 Barnes-Hut: gravity {}, scaling {}, quality {}, spacing {}, stability {}",
        format_value(cfg.get(GRAVITY.key)),
        format_value(cfg.get(SCALING_RATIO.key)),
        format_value(cfg.get(QUALITY.key)),
        format_value(cfg.get(NODE_SPACING.key)),
        format_value(cfg.get("stability")),
    )
}

/// Barnes-Hut opening angle.
const THETA: f64 = 1.2;
const REPULSION: f64 = 0.35;
const GRAVITY_SCALE: f64 = 0.05;
const JITTER_TOLERANCE: f64 = 1.0;
const MIN_SPEED_EFFICIENCY: f64 = 0.05;
const MAX_RISE: f64 = 0.5;
/// Per-iteration displacement cap as a fraction of the containment radius.
const MAX_STEP_FRACTION: f64 = 0.1;

const PRESEED_MIN_NODES: usize = 20;
const PRESEED_NEW_FRACTION: f64 = 0.4;
const HUB_FRACTION: f64 = 0.12;
const MID_FRACTION: f64 = 0.33;

#[derive(Debug, Clone, Copy)]
struct Settings {
    gravity: f64,
    scaling_ratio: f64,
    quality: f64,
}

impl Settings {
    fn from_config(cfg: &ResolvedConfig) -> Self {
        Self {
            gravity: cfg.get(GRAVITY.key).max(GRAVITY.min),
            scaling_ratio: cfg.get(SCALING_RATIO.key).max(SCALING_RATIO.min),
            quality: cfg.get(QUALITY.key).max(QUALITY.min),
        }
    }
}

/// More iterations for small communities, fewer for large ones.
fn iteration_budget(n: usize, quality: f64) -> usize {
    ((quality * 900.0) / (n as f64).sqrt()).round().clamp(12.0, 400.0) as usize
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct BarnesHutPlacement;

impl LocalPlacement for BarnesHutPlacement {
    fn place(&self, frame: &mut CommunityFrame<'_>, config: &ResolvedConfig) {
        let n = frame.len();
        if n == 0 {
            return;
        }
        if n == 1 {
            frame.positions[0] = frame.anchor;
            return;
        }
        let settings = Settings::from_config(config);
        let spacing = frame.node_spacing;
        let anchor = frame.anchor;
        let radius = frame.radius / spacing;

        let masses: Vec<f64> = (0..n).map(|i| frame.degree(i) as f64 + 1.0).collect();
        let mut pos: Vec<Point> = frame
            .positions
            .iter()
            .map(|p| p.sub(anchor).scale(1.0 / spacing))
            .collect();

        if n > PRESEED_MIN_NODES && frame.new_count() as f64 > PRESEED_NEW_FRACTION * n as f64 {
            preseed_by_degree(frame, &mut pos, radius);
        }

        let iterations = iteration_budget(n, settings.quality);
        simulate(frame, &mut pos, &masses, radius, iterations, settings);
        tracing::trace!(community = frame.id, nodes = n, iterations, "fa2 barnes-hut done");

        for (slot, p) in frame.positions.iter_mut().zip(&pos) {
            *slot = anchor.add(p.scale(spacing));
        }
    }
}

fn simulate(
    frame: &CommunityFrame<'_>,
    pos: &mut [Point],
    masses: &[f64],
    radius: f64,
    iterations: usize,
    settings: Settings,
) {
    let n = pos.len();
    let ids = &frame.node_ids;
    let max_step = radius * MAX_STEP_FRACTION;
    let limit = radius * 1.05;

    let mut tree = QuadTree::new();
    let mut forces = vec![Point::ORIGIN; n];
    let mut prev_forces = vec![Point::ORIGIN; n];
    let mut speed = 1.0f64;
    let mut speed_efficiency = 1.0f64;

    for _ in 0..iterations {
        tree.rebuild(pos, masses);
        for (i, f) in forces.iter_mut().enumerate() {
            *f = tree.repulsion_on(i, pos, masses, ids, REPULSION, THETA);
        }

        for i in 0..n {
            for &j in &frame.neighbors[i] {
                if j <= i {
                    continue;
                }
                // Vector from i towards j.
                let (d, len) = geom::separation(pos[j], pos[i], ids[j], ids[i]);
                let magnitude = (1.0 + len).ln() / settings.scaling_ratio;
                let unit = d.scale(1.0 / len);
                let total = masses[i] + masses[j];
                forces[i] = forces[i].add(unit.scale(magnitude * 2.0 * masses[j] / total));
                forces[j] = forces[j].sub(unit.scale(magnitude * 2.0 * masses[i] / total));
            }
        }

        for i in 0..n {
            let pull = pos[i].scale(-GRAVITY_SCALE * settings.gravity * masses[i]);
            forces[i] = forces[i].add(pull);
        }

        let mut total_swing = 0.0;
        let mut total_traction = 0.0;
        for i in 0..n {
            total_swing += masses[i] * forces[i].sub(prev_forces[i]).length();
            total_traction += masses[i] * forces[i].add(prev_forces[i]).length() / 2.0;
        }
        adjust_speed(
            &mut speed,
            &mut speed_efficiency,
            total_swing,
            total_traction,
            n,
        );

        for i in 0..n {
            let swing = forces[i].sub(prev_forces[i]).length();
            let factor = speed / (1.0 + (speed * swing).sqrt());
            let mut step = forces[i].scale(factor);
            let len = step.length();
            if len > max_step {
                step = step.scale(max_step / len);
            }
            if step.is_finite() {
                pos[i] = geom::clamp_to_disk(pos[i].add(step), Point::ORIGIN, limit);
            }
        }
        std::mem::swap(&mut forces, &mut prev_forces);
    }
}

/// ForceAtlas2's global swing/traction speed heuristic.
fn adjust_speed(
    speed: &mut f64,
    efficiency: &mut f64,
    total_swing: f64,
    total_traction: f64,
    n: usize,
) {
    if !(total_swing > 0.0 && total_traction > 0.0) {
        return;
    }
    let n = n as f64;
    let estimated_optimal = 0.05 * n.sqrt();
    let min_jt = estimated_optimal.sqrt();
    let max_jt: f64 = 10.0;
    let mut jt = JITTER_TOLERANCE
        * min_jt.max(max_jt.min(estimated_optimal * total_traction / (n * n)));

    if total_swing / total_traction > 2.0 {
        if *efficiency > MIN_SPEED_EFFICIENCY {
            *efficiency *= 0.5;
        }
        jt = jt.max(JITTER_TOLERANCE);
    }

    let target = jt * *efficiency * total_traction / total_swing;

    if total_swing > jt * total_traction {
        if *efficiency > MIN_SPEED_EFFICIENCY {
            *efficiency *= 0.7;
        }
    } else if *speed < 1000.0 {
        *efficiency *= 1.3;
    }

    *speed += (target - *speed).min(MAX_RISE * *speed);
}

/// Coarse radial start for mostly-new communities: hubs near the centre, then a middle band,
/// then the rest on the outside. Only new nodes are moved.
fn preseed_by_degree(frame: &CommunityFrame<'_>, pos: &mut [Point], radius: f64) {
    let n = frame.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| frame.degree(b).cmp(&frame.degree(a)).then(a.cmp(&b)));

    let hubs = ((n as f64) * HUB_FRACTION).ceil() as usize;
    let mids = ((n as f64) * MID_FRACTION).ceil() as usize;
    for (rank, &i) in order.iter().enumerate() {
        if !frame.is_new(i) {
            continue;
        }
        let band = if rank < hubs {
            0.15
        } else if rank < hubs + mids {
            0.45
        } else {
            0.8
        };
        let id = frame.node_ids[i];
        let r = band * radius * (0.9 + 0.2 * hash::unit(id, "preseed-radius"));
        let angle = hash::angle(id, "preseed") + rank as f64 * GOLDEN_ANGLE;
        pos[i] = Point::polar(Point::ORIGIN, r, angle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::continuity::containment_radius;

    fn frame<'a>(ids: &[&'a str], edges: &[(usize, usize)], spacing: f64) -> CommunityFrame<'a> {
        let n = ids.len();
        let mut neighbors = vec![Vec::new(); n];
        for &(a, b) in edges {
            neighbors[a].push(b);
            neighbors[b].push(a);
        }
        for l in &mut neighbors {
            l.sort_unstable();
        }
        let anchor = Point::new(200.0, -50.0);
        let radius = containment_radius(n, spacing);
        let positions = ids
            .iter()
            .map(|id| crate::algo::continuity::seed_position(id, anchor, radius, n))
            .collect();
        CommunityFrame {
            id: "community:test",
            node_ids: ids.to_vec(),
            neighbors,
            anchor,
            radius,
            node_spacing: spacing,
            previous: vec![None; n],
            positions,
        }
    }

    fn config() -> ResolvedConfig {
        ResolvedConfig::defaults(&FIELDS)
    }

    #[test]
    fn iteration_budget_shrinks_with_size() {
        assert!(iteration_budget(5, 1.0) > iteration_budget(500, 1.0));
        assert!(iteration_budget(5, 2.0) >= iteration_budget(5, 1.0));
        assert_eq!(iteration_budget(1_000_000, 0.25), 12);
    }

    #[test]
    fn speed_backs_off_on_swing_and_rises_when_calm() {
        let (mut speed, mut efficiency) = (1.0, 1.0);
        adjust_speed(&mut speed, &mut efficiency, 100.0, 1.0, 10);
        assert!(speed < 0.01 && efficiency < 1.0, "speed={speed} eff={efficiency}");

        let (mut speed, mut efficiency) = (1.0, 1.0);
        adjust_speed(&mut speed, &mut efficiency, 0.1, 10.0, 10);
        assert!((speed - 1.5).abs() < 1e-12, "speed={speed}");
        assert!(efficiency > 1.0);
    }

    #[test]
    fn placement_is_finite_contained_and_reproducible() {
        let ids = ["a", "b", "c", "d", "e", "f"];
        let edges = [(0, 1), (1, 2), (2, 3), (3, 4), (4, 5), (5, 0), (0, 3)];
        let mut f1 = frame(&ids, &edges, 28.0);
        let mut f2 = frame(&ids, &edges, 28.0);
        BarnesHutPlacement.place(&mut f1, &config());
        BarnesHutPlacement.place(&mut f2, &config());
        assert_eq!(f1.positions, f2.positions);
        for p in &f1.positions {
            assert!(p.is_finite());
            assert!(p.distance(f1.anchor) <= f1.radius * 1.05 + 1e-9);
        }
    }

    #[test]
    fn connected_nodes_end_closer_than_unconnected_ones() {
        // Two triangles joined by a single bridge.
        let ids = ["a", "b", "c", "d", "e", "f"];
        let edges = [(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3), (2, 3)];
        let mut f = frame(&ids, &edges, 28.0);
        BarnesHutPlacement.place(&mut f, &config());
        let within = f.positions[0].distance(f.positions[1]);
        let across = f.positions[0].distance(f.positions[5]);
        assert!(within < across, "within={within} across={across}");
    }

    #[test]
    fn preseed_puts_hubs_inside_leaves() {
        let names: Vec<String> = (0..30).map(|k| format!("n{k:02}")).collect();
        let ids: Vec<&str> = names.iter().map(String::as_str).collect();
        let edges: Vec<(usize, usize)> = (1..30).map(|k| (0, k)).collect();
        let f = frame(&ids, &edges, 20.0);
        let mut pos = vec![Point::ORIGIN; 30];
        preseed_by_degree(&f, &mut pos, 10.0);
        let hub = pos[0].length();
        let leaf_max = pos[1..].iter().map(|p| p.length()).fold(0.0, f64::max);
        assert!(hub < 2.0 && leaf_max > 4.0, "hub={hub} leaf_max={leaf_max}");
    }
}
