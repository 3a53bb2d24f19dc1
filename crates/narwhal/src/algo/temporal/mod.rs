//! Temporal anchor: members keep their previous position, new members grow out of the
//! neighbours that are already placed, then a short relaxation settles the result.

use crate::algo::continuity::{CommunityFrame, LocalPlacement};
use crate::config::{FieldSpec, NODE_SPACING, ResolvedConfig, format_value, stability};
use crate::geom::{self, Point, SpatialGrid};
use crate::hash;
use std::collections::VecDeque;

pub(crate) const RELAX_ITERATIONS: FieldSpec = FieldSpec {
    key: "relaxIterations",
    label: "Relax iterations",
    min: 0.0,
    max: 60.0,
    step: 1.0,
    default: 12.0,
};

pub(crate) const MOBILITY: FieldSpec = FieldSpec {
    key: "mobility",
    label: "Existing node mobility",
    min: 0.0,
    max: 1.0,
    step: 0.05,
    default: 0.2,
};

pub(crate) const FIELDS: [FieldSpec; 4] = [
    NODE_SPACING,
    stability(0.5),
    RELAX_ITERATIONS,
    MOBILITY,
];

pub(crate) fn summarize(cfg: &ResolvedConfig) -> String {
    format!(
        "Temporal anchor: relax {}, mobility {}, spacing {}, stability {}",
        format_value(cfg.get(RELAX_ITERATIONS.key)),
        format_value(cfg.get(MOBILITY.key)),
        format_value(cfg.get(NODE_SPACING.key)),
        format_value(cfg.get("stability")),
    )
}

/// Ideal edge length, in node spacings.
const EDGE_LENGTH: f64 = 1.3;
const DAMPING: f64 = 0.5;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct TemporalPlacement;

impl LocalPlacement for TemporalPlacement {
    fn place(&self, frame: &mut CommunityFrame<'_>, config: &ResolvedConfig) {
        let n = frame.len();
        if n == 0 {
            return;
        }
        if n == 1 {
            frame.positions[0] = frame.previous[0].unwrap_or(frame.anchor);
            return;
        }
        let ideal = frame.node_spacing * EDGE_LENGTH;
        let iterations = config.get_usize(RELAX_ITERATIONS.key, 0);
        let mobility = config.get(MOBILITY.key).clamp(0.0, 1.0);

        grow_new_members(frame, ideal);

        let ids = &frame.node_ids;
        let pos = &mut frame.positions;
        let weight: Vec<f64> = frame
            .previous
            .iter()
            .map(|p| if p.is_some() { mobility } else { 1.0 })
            .collect();
        let mut delta = vec![Point::ORIGIN; n];
        let mut near: Vec<usize> = Vec::new();
        for _ in 0..iterations {
            delta.iter_mut().for_each(|d| *d = Point::ORIGIN);
            for i in 0..n {
                for &j in &frame.neighbors[i] {
                    if j <= i {
                        continue;
                    }
                    let (d, len) = geom::separation(pos[j], pos[i], ids[j], ids[i]);
                    let pull = d.scale((len - ideal) / (2.0 * len));
                    delta[i] = delta[i].add(pull);
                    delta[j] = delta[j].sub(pull);
                }
            }
            let grid = SpatialGrid::build(pos, ideal);
            for i in 0..n {
                near.clear();
                grid.for_each_near(pos[i], |j| {
                    if j > i {
                        near.push(j);
                    }
                });
                near.sort_unstable();
                for &j in &near {
                    let (d, len) = geom::separation(pos[i], pos[j], ids[i], ids[j]);
                    if len >= ideal {
                        continue;
                    }
                    let push = d.scale((ideal - len) / (2.0 * len));
                    delta[i] = delta[i].add(push);
                    delta[j] = delta[j].sub(push);
                }
            }
            for i in 0..n {
                let next = pos[i].add(delta[i].scale(DAMPING * weight[i]));
                if next.is_finite() {
                    pos[i] = next;
                }
            }
        }
        tracing::trace!(
            community = frame.id,
            nodes = n,
            new_nodes = frame.new_count(),
            iterations,
            "temporal anchor relaxed"
        );
    }
}

/// Places new members next to the centroid of their already-placed neighbours, walking
/// outward from the carried members. Without any carried member the hub starts at the anchor.
fn grow_new_members(frame: &mut CommunityFrame<'_>, ideal: f64) {
    let n = frame.len();
    let mut placed: Vec<bool> = frame.previous.iter().map(Option::is_some).collect();
    let mut queue: VecDeque<usize> = (0..n).filter(|&i| placed[i]).collect();
    if queue.is_empty() {
        let hub = frame.hub();
        frame.positions[hub] = frame.anchor;
        placed[hub] = true;
        queue.push_back(hub);
    }
    while let Some(v) = queue.pop_front() {
        for &w in &frame.neighbors[v] {
            if placed[w] {
                continue;
            }
            let around: Vec<Point> = frame.neighbors[w]
                .iter()
                .filter(|&&u| placed[u])
                .map(|&u| frame.positions[u])
                .collect();
            let centroid = around
                .iter()
                .fold(Point::ORIGIN, |acc, p| acc.add(*p))
                .scale(1.0 / around.len() as f64);
            let angle = hash::angle(frame.node_ids[w], "temporal-grow");
            frame.positions[w] = Point::polar(centroid, ideal, angle);
            placed[w] = true;
            queue.push_back(w);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algo::continuity::containment_radius;

    fn path(n: usize) -> Vec<Vec<usize>> {
        (0..n)
            .map(|i| {
                let mut v = Vec::new();
                if i > 0 {
                    v.push(i - 1);
                }
                if i + 1 < n {
                    v.push(i + 1);
                }
                v
            })
            .collect()
    }

    fn frame<'a>(ids: Vec<&'a str>, previous: Vec<Option<Point>>) -> CommunityFrame<'a> {
        let n = ids.len();
        let positions = previous
            .iter()
            .map(|p| p.unwrap_or(Point::new(500.0, 500.0)))
            .collect();
        CommunityFrame {
            id: "community:a:4",
            node_ids: ids,
            neighbors: path(n),
            anchor: Point::ORIGIN,
            radius: containment_radius(n, 28.0),
            node_spacing: 28.0,
            previous,
            positions,
        }
    }

    #[test]
    fn frozen_members_stay_put_and_new_ones_grow_from_them() {
        let prev = vec![
            Some(Point::new(0.0, 0.0)),
            Some(Point::new(36.4, 0.0)),
            Some(Point::new(72.8, 0.0)),
            None,
        ];
        let mut f = frame(vec!["a", "b", "c", "d"], prev.clone());
        let mut raw = crate::graph::StrategyConfig::new();
        raw.insert("mobility".into(), 0.0);
        let cfg = ResolvedConfig::resolve(&FIELDS, Some(&raw));
        TemporalPlacement.place(&mut f, &cfg);
        for i in 0..3 {
            assert_eq!(Some(f.positions[i]), prev[i]);
        }
        let d = f.positions[3].distance(f.positions[2]);
        assert!(d < 28.0 * EDGE_LENGTH * 1.5, "d={d}");
    }

    #[test]
    fn a_fresh_community_starts_from_the_hub() {
        let mut f = frame(vec!["a", "b", "c"], vec![None; 3]);
        let mut raw = crate::graph::StrategyConfig::new();
        raw.insert("relaxIterations".into(), 0.0);
        let cfg = ResolvedConfig::resolve(&FIELDS, Some(&raw));
        TemporalPlacement.place(&mut f, &cfg);
        // Hub of a path is its middle node.
        assert_eq!(f.positions[1], Point::ORIGIN);
        let ideal = 28.0 * EDGE_LENGTH;
        assert!((f.positions[0].distance(Point::ORIGIN) - ideal).abs() < 1e-9);
        assert!((f.positions[2].distance(Point::ORIGIN) - ideal).abs() < 1e-9);
    }
}
