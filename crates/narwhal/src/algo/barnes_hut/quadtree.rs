//! Arena quadtree for Barnes-Hut repulsion.
//!
//! Cells live in a flat `Vec` and reference children by index. Children are always allocated
//! after their parent, so mass aggregation is a single reverse sweep.

use crate::geom::{self, Point};

const NONE: u32 = u32::MAX;
/// Coincident bodies stop subdividing here and share a leaf.
const MAX_DEPTH: u32 = 24;

#[derive(Debug, Clone)]
struct Cell {
    center: Point,
    half: f64,
    depth: u32,
    children: [u32; 4],
    /// Head of the leaf's body list (linked through `QuadTree::next`).
    body: u32,
    mass: f64,
    mass_x: f64,
    mass_y: f64,
}

impl Cell {
    fn new(center: Point, half: f64, depth: u32) -> Self {
        Self {
            center,
            half,
            depth,
            children: [NONE; 4],
            body: NONE,
            mass: 0.0,
            mass_x: 0.0,
            mass_y: 0.0,
        }
    }

    fn is_leaf(&self) -> bool {
        self.children[0] == NONE
    }

    fn quadrant(&self, p: Point) -> usize {
        usize::from(p.x >= self.center.x) | (usize::from(p.y >= self.center.y) << 1)
    }

    fn contains(&self, p: Point) -> bool {
        (p.x - self.center.x).abs() <= self.half && (p.y - self.center.y).abs() <= self.half
    }

    fn center_of_mass(&self) -> Point {
        Point::new(self.mass_x / self.mass, self.mass_y / self.mass)
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct QuadTree {
    cells: Vec<Cell>,
    next: Vec<u32>,
    stack: Vec<u32>,
}

impl QuadTree {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Rebuilds the tree over `points`, reusing the arena's allocations.
    pub fn rebuild(&mut self, points: &[Point], masses: &[f64]) {
        self.cells.clear();
        self.next.clear();
        self.next.resize(points.len(), NONE);
        if points.is_empty() {
            return;
        }

        let mut min = Point::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for p in points.iter().filter(|p| p.is_finite()) {
            min = Point::new(min.x.min(p.x), min.y.min(p.y));
            max = Point::new(max.x.max(p.x), max.y.max(p.y));
        }
        if !(min.is_finite() && max.is_finite()) {
            min = Point::ORIGIN;
            max = Point::ORIGIN;
        }
        let center = min.lerp(max, 0.5);
        let half = ((max.x - min.x).max(max.y - min.y) / 2.0).max(1e-3) * 1.0001;
        self.cells.push(Cell::new(center, half, 0));

        for (i, p) in points.iter().enumerate() {
            let p = if p.is_finite() { *p } else { center };
            self.insert(i as u32, p, points);
        }
        self.aggregate(points, masses);
    }

    fn insert(&mut self, body: u32, p: Point, points: &[Point]) {
        let mut c = 0usize;
        loop {
            if !self.cells[c].is_leaf() {
                c = self.cells[c].children[self.cells[c].quadrant(p)] as usize;
                continue;
            }
            if self.cells[c].body == NONE {
                self.cells[c].body = body;
                return;
            }
            if self.cells[c].depth >= MAX_DEPTH {
                self.next[body as usize] = self.cells[c].body;
                self.cells[c].body = body;
                return;
            }

            // Split: below MAX_DEPTH a leaf holds exactly one body, which moves down a level.
            let resident = self.cells[c].body;
            self.cells[c].body = NONE;
            self.subdivide(c);
            let resident_p = points[resident as usize];
            let resident_p = if resident_p.is_finite() {
                resident_p
            } else {
                self.cells[0].center
            };
            let q = self.cells[c].quadrant(resident_p);
            let child = self.cells[c].children[q] as usize;
            self.cells[child].body = resident;
        }
    }

    fn subdivide(&mut self, c: usize) {
        let Cell {
            center,
            half,
            depth,
            ..
        } = self.cells[c];
        let h = half / 2.0;
        for q in 0..4 {
            let dx = if q & 1 == 1 { h } else { -h };
            let dy = if q & 2 == 2 { h } else { -h };
            let idx = self.cells.len() as u32;
            self.cells
                .push(Cell::new(Point::new(center.x + dx, center.y + dy), h, depth + 1));
            self.cells[c].children[q] = idx;
        }
    }

    fn aggregate(&mut self, points: &[Point], masses: &[f64]) {
        for c in (0..self.cells.len()).rev() {
            let (mut m, mut mx, mut my) = (0.0, 0.0, 0.0);
            if self.cells[c].is_leaf() {
                let mut b = self.cells[c].body;
                while b != NONE {
                    let bm = masses[b as usize];
                    let p = points[b as usize];
                    if p.is_finite() {
                        m += bm;
                        mx += bm * p.x;
                        my += bm * p.y;
                    }
                    b = self.next[b as usize];
                }
            } else {
                for child in self.cells[c].children {
                    let ch = &self.cells[child as usize];
                    m += ch.mass;
                    mx += ch.mass_x;
                    my += ch.mass_y;
                }
            }
            let cell = &mut self.cells[c];
            cell.mass = m;
            cell.mass_x = mx;
            cell.mass_y = my;
        }
    }

    /// Total ForceAtlas2 repulsion (`kr * m_i * m_j / d`) acting on body `i`.
    ///
    /// A cell is approximated by its center of mass when `i` lies outside it and
    /// `cell_width / distance < theta`; otherwise the tree is descended.
    pub fn repulsion_on(
        &mut self,
        i: usize,
        points: &[Point],
        masses: &[f64],
        ids: &[&str],
        kr: f64,
        theta: f64,
    ) -> Point {
        let mut force = Point::ORIGIN;
        if self.cells.is_empty() {
            return force;
        }
        let p = points[i];
        let mi = masses[i];
        let mut stack = std::mem::take(&mut self.stack);
        stack.clear();
        stack.push(0);

        while let Some(c) = stack.pop() {
            let cell = &self.cells[c as usize];
            if cell.mass <= 0.0 {
                continue;
            }
            if cell.is_leaf() {
                let mut b = cell.body;
                while b != NONE {
                    let bi = b as usize;
                    if bi != i {
                        let (d, len) = geom::separation(p, points[bi], ids[i], ids[bi]);
                        force = force.add(d.scale(kr * mi * masses[bi] / (len * len)));
                    }
                    b = self.next[bi];
                }
                continue;
            }

            let com = cell.center_of_mass();
            let dist = p.distance(com);
            if !cell.contains(p) && dist > 0.0 && (2.0 * cell.half) / dist < theta {
                let d = p.sub(com);
                force = force.add(d.scale(kr * mi * cell.mass / (dist * dist)));
                continue;
            }
            for &child in cell.children.iter().rev() {
                stack.push(child);
            }
        }

        self.stack = stack;
        force
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exact_repulsion(i: usize, points: &[Point], masses: &[f64], ids: &[&str], kr: f64) -> Point {
        let mut f = Point::ORIGIN;
        for j in 0..points.len() {
            if i == j {
                continue;
            }
            let (d, len) = geom::separation(points[i], points[j], ids[i], ids[j]);
            f = f.add(d.scale(kr * masses[i] * masses[j] / (len * len)));
        }
        f
    }

    #[test]
    fn theta_zero_matches_exact_pairwise_sum() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(3.0, 1.0),
            Point::new(-2.0, 4.0),
            Point::new(5.0, -3.0),
            Point::new(0.5, 0.25),
        ];
        let masses = vec![1.0, 2.0, 3.0, 1.0, 2.0];
        let ids = ["a", "b", "c", "d", "e"];
        let mut tree = QuadTree::new();
        tree.rebuild(&points, &masses);
        for i in 0..points.len() {
            let approx = tree.repulsion_on(i, &points, &masses, &ids, 1.0, 0.0);
            let exact = exact_repulsion(i, &points, &masses, &ids, 1.0);
            assert!(approx.distance(exact) < 1e-9, "node {i}: {approx:?} vs {exact:?}");
        }
    }

    #[test]
    fn far_clusters_are_approximated_within_tolerance() {
        let mut points = Vec::new();
        for k in 0..20 {
            points.push(Point::new(100.0 + (k % 5) as f64, 100.0 + (k / 5) as f64));
        }
        points.push(Point::new(0.0, 0.0));
        let masses = vec![1.0; points.len()];
        let names: Vec<String> = (0..points.len()).map(|k| format!("n{k}")).collect();
        let ids: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut tree = QuadTree::new();
        tree.rebuild(&points, &masses);
        let last = points.len() - 1;
        let approx = tree.repulsion_on(last, &points, &masses, &ids, 1.0, 1.2);
        let exact = exact_repulsion(last, &points, &masses, &ids, 1.0);
        assert!(approx.distance(exact) / exact.length() < 0.05);
    }

    #[test]
    fn coincident_points_share_a_leaf_without_unbounded_splitting() {
        let points = vec![Point::new(1.0, 1.0); 6];
        let masses = vec![1.0; 6];
        let ids = ["a", "b", "c", "d", "e", "f"];
        let mut tree = QuadTree::new();
        tree.rebuild(&points, &masses);
        assert!(tree.cell_count() <= 1 + 4 * MAX_DEPTH as usize);
        let f = tree.repulsion_on(0, &points, &masses, &ids, 1.0, 1.2);
        assert!(f.is_finite());
    }
}
