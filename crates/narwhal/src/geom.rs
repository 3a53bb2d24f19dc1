use crate::hash;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Distance below which two points are treated as coincident.
pub const DEGENERATE_DISTANCE: f64 = 1e-6;
/// Distance substituted for coincident points.
pub const FALLBACK_DISTANCE: f64 = 0.01;
/// Largest coordinate magnitude accepted from carried state.
pub const MAX_COORDINATE: f64 = 1e9;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn polar(center: Point, radius: f64, angle: f64) -> Self {
        Self {
            x: center.x + radius * angle.cos(),
            y: center.y + radius * angle.sin(),
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Finite and within [`MAX_COORDINATE`] on both axes.
    pub fn is_bounded(self) -> bool {
        self.x.abs() <= MAX_COORDINATE && self.y.abs() <= MAX_COORDINATE
    }

    pub fn add(self, other: Point) -> Point {
        Point::new(self.x + other.x, self.y + other.y)
    }

    pub fn sub(self, other: Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    pub fn scale(self, k: f64) -> Point {
        Point::new(self.x * k, self.y * k)
    }

    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    pub fn distance(self, other: Point) -> f64 {
        self.sub(other).length()
    }

    /// Linear interpolation: `self + (other - self) * t`.
    pub fn lerp(self, other: Point, t: f64) -> Point {
        self.add(other.sub(self).scale(t))
    }

    pub fn rotate_around(self, center: Point, angle: f64) -> Point {
        let (sin, cos) = angle.sin_cos();
        let d = self.sub(center);
        Point::new(
            center.x + d.x * cos - d.y * sin,
            center.y + d.x * sin + d.y * cos,
        )
    }
}

/// Returns the vector from `b` to `a` and its length.
///
/// Coincident points get a direction derived from the two ids and a tiny non-zero length, so
/// forces never divide by zero. The fallback is antisymmetric: swapping the arguments flips the
/// direction.
pub fn separation(a: Point, b: Point, a_id: &str, b_id: &str) -> (Point, f64) {
    let d = a.sub(b);
    let len = d.length();
    if len > DEGENERATE_DISTANCE && len.is_finite() {
        return (d, len);
    }
    let (lo, hi, sign) = if a_id <= b_id {
        (a_id, b_id, 1.0)
    } else {
        (b_id, a_id, -1.0)
    };
    let theta = hash::angle(hi, lo);
    let dir = Point::new(theta.cos(), theta.sin()).scale(FALLBACK_DISTANCE * sign);
    (dir, FALLBACK_DISTANCE)
}

/// Pulls `p` back onto the disk of `radius` around `center`.
pub fn clamp_to_disk(p: Point, center: Point, radius: f64) -> Point {
    let d = p.sub(center);
    let len = d.length();
    if !len.is_finite() {
        return center;
    }
    if len <= radius || len == 0.0 {
        return p;
    }
    center.add(d.scale(radius / len))
}

/// Wraps an angle into `(-π, π]`.
pub fn wrap_angle(a: f64) -> f64 {
    use std::f64::consts::{PI, TAU};
    let mut v = a % TAU;
    if v <= -PI {
        v += TAU;
    } else if v > PI {
        v -= TAU;
    }
    v
}

/// Rotation (radians) that best maps the `current` offsets onto the `previous` offsets around
/// `center`, in the least-squares sense. Pairs with a missing previous point are skipped.
///
/// Returns `None` when there is nothing meaningful to align against.
pub fn best_rotation(center: Point, current: &[Point], previous: &[Option<Point>]) -> Option<f64> {
    let mut cross = 0.0;
    let mut dot = 0.0;
    let mut pairs = 0usize;
    for (cur, prev) in current.iter().zip(previous) {
        let Some(prev) = prev else {
            continue;
        };
        let q = cur.sub(center);
        let p = prev.sub(center);
        cross += q.x * p.y - q.y * p.x;
        dot += q.x * p.x + q.y * p.y;
        pairs += 1;
    }
    if pairs < 2 || cross.hypot(dot) < 1e-9 {
        return None;
    }
    Some(cross.atan2(dot))
}

/// Uniform bucket grid used for near-linear proximity queries.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell: f64,
    buckets: FxHashMap<(i64, i64), Vec<usize>>,
}

impl SpatialGrid {
    pub fn build(points: &[Point], cell: f64) -> Self {
        let cell = if cell.is_finite() && cell > 0.0 {
            cell
        } else {
            1.0
        };
        let mut buckets: FxHashMap<(i64, i64), Vec<usize>> = FxHashMap::default();
        for (idx, p) in points.iter().enumerate() {
            buckets.entry(Self::key(*p, cell)).or_default().push(idx);
        }
        Self { cell, buckets }
    }

    fn key(p: Point, cell: f64) -> (i64, i64) {
        ((p.x / cell).floor() as i64, (p.y / cell).floor() as i64)
    }

    /// Visits every index stored in the 3x3 block of cells around `p`, in a fixed order.
    pub fn for_each_near(&self, p: Point, mut f: impl FnMut(usize)) {
        let (cx, cy) = Self::key(p, self.cell);
        for gx in (cx - 1)..=(cx + 1) {
            for gy in (cy - 1)..=(cy + 1) {
                if let Some(bucket) = self.buckets.get(&(gx, gy)) {
                    for &idx in bucket {
                        f(idx);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separation_of_coincident_points_is_finite_and_antisymmetric() {
        let p = Point::new(3.0, 4.0);
        let (ab, len_ab) = separation(p, p, "a", "b");
        let (ba, len_ba) = separation(p, p, "b", "a");
        assert!(ab.is_finite() && len_ab > 0.0);
        assert_eq!(len_ab, len_ba);
        assert!((ab.x + ba.x).abs() < 1e-12 && (ab.y + ba.y).abs() < 1e-12);
    }

    #[test]
    fn clamp_to_disk_keeps_inside_points() {
        let c = Point::new(10.0, 10.0);
        assert_eq!(clamp_to_disk(Point::new(11.0, 10.0), c, 5.0), Point::new(11.0, 10.0));
        let clamped = clamp_to_disk(Point::new(30.0, 10.0), c, 5.0);
        assert!((clamped.x - 15.0).abs() < 1e-12);
    }

    #[test]
    fn clamp_to_disk_falls_back_to_the_center_on_overflow() {
        let c = Point::new(-1e308, 0.0);
        let clamped = clamp_to_disk(Point::new(1e308, 0.0), c, 5.0);
        assert_eq!(clamped, c);
    }

    #[test]
    fn best_rotation_recovers_a_known_turn() {
        let center = Point::new(1.0, -2.0);
        let prev = [
            Point::new(2.0, -2.0),
            Point::new(1.0, 0.0),
            Point::new(-3.0, -2.0),
        ];
        let current: Vec<Point> = prev.iter().map(|p| p.rotate_around(center, 0.4)).collect();
        let previous: Vec<Option<Point>> = prev.iter().copied().map(Some).collect();
        let rot = best_rotation(center, &current, &previous).expect("rotation");
        assert!((rot + 0.4).abs() < 1e-9, "rot: {rot}");
    }

    #[test]
    fn grid_only_reports_nearby_points() {
        let pts = [
            Point::new(0.0, 0.0),
            Point::new(1.5, 0.0),
            Point::new(50.0, 50.0),
        ];
        let grid = SpatialGrid::build(&pts, 2.0);
        let mut seen = Vec::new();
        grid.for_each_near(pts[0], |i| seen.push(i));
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1]);
    }
}
