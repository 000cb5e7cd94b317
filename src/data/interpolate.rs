//! Linear scattered-data interpolation on a matrix lattice.
//!
//! Known cells are triangulated (Bowyer-Watson Delaunay) in
//! `(row index, column index)` space and every requested cell inside a
//! triangle receives the barycentric blend of its three corners. Cells
//! outside the convex hull of the known cells receive a fallback value.
//!
//! All geometric predicates are evaluated on integer coordinates with `i128`
//! arithmetic, so the triangulation (and therefore the output) is exact and
//! reproducible.

use std::collections::{HashMap, HashSet};

use super::model::EemMatrix;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Point {
    x: i64,
    y: i64,
}

/// `> 0` when `a, b, c` turn counter-clockwise.
fn orient(a: Point, b: Point, c: Point) -> i128 {
    let abx = (b.x - a.x) as i128;
    let aby = (b.y - a.y) as i128;
    let acx = (c.x - a.x) as i128;
    let acy = (c.y - a.y) as i128;
    abx * acy - aby * acx
}

/// `> 0` when `d` lies strictly inside the circumcircle of the
/// counter-clockwise triangle `a, b, c`.
fn in_circle(a: Point, b: Point, c: Point, d: Point) -> i128 {
    let (adx, ady) = ((a.x - d.x) as i128, (a.y - d.y) as i128);
    let (bdx, bdy) = ((b.x - d.x) as i128, (b.y - d.y) as i128);
    let (cdx, cdy) = ((c.x - d.x) as i128, (c.y - d.y) as i128);
    let alift = adx * adx + ady * ady;
    let blift = bdx * bdx + bdy * bdy;
    let clift = cdx * cdx + cdy * cdy;
    adx * (bdy * clift - cdy * blift) - ady * (bdx * clift - cdx * blift)
        + alift * (bdx * cdy - cdx * bdy)
}

/// Fixed-seed Fisher-Yates permutation of `0..n` (splitmix64 stream).
///
/// Lattice points inserted in row-major order always land outside the
/// current hull, which makes every cavity span a whole row.
fn insertion_order(n: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n).collect();
    let mut state: u64 = 0x5EED_0F_EE11;
    for i in (1..n).rev() {
        state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        order.swap(i, (z % (i as u64 + 1)) as usize);
    }
    order
}

#[derive(Debug, Clone)]
struct Triangle {
    /// Counter-clockwise vertex indices.
    v: [usize; 3],
    /// `n[k]` is the neighbour across the edge opposite `v[k]`.
    n: [Option<usize>; 3],
    alive: bool,
}

/// Delaunay triangulation of lattice points.
struct Triangulation {
    points: Vec<Point>,
    triangles: Vec<Triangle>,
    /// Index of the first of the three enclosing super-triangle vertices.
    super_start: usize,
    last: usize,
}

impl Triangulation {
    fn new(points: Vec<Point>) -> Self {
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (0i64, 0i64, 0i64, 0i64);
        if let Some(first) = points.first() {
            (min_x, min_y, max_x, max_y) = (first.x, first.y, first.x, first.y);
        }
        for p in &points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        let span = (max_x - min_x).max(max_y - min_y) + 1;
        let d = span * 10_000;
        let (cx, cy) = ((min_x + max_x) / 2, (min_y + max_y) / 2);

        let super_start = points.len();
        let mut all = points;
        all.push(Point { x: cx - 20 * d, y: cy - 10 * d });
        all.push(Point { x: cx + 20 * d, y: cy - 10 * d });
        all.push(Point { x: cx, y: cy + 20 * d });

        Triangulation {
            points: all,
            triangles: vec![Triangle {
                v: [super_start, super_start + 1, super_start + 2],
                n: [None, None, None],
                alive: true,
            }],
            super_start,
            last: 0,
        }
    }

    fn build(points: Vec<Point>) -> Self {
        let order = insertion_order(points.len());
        let mut tri = Triangulation::new(points);
        for p in order {
            tri.insert(p);
        }
        tri
    }

    fn contains(&self, t: usize, p: Point) -> Option<usize> {
        let [a, b, c] = self.triangles[t].v.map(|i| self.points[i]);
        let edges = [(b, c), (c, a), (a, b)];
        edges
            .iter()
            .position(|&(from, to)| orient(from, to, p) < 0)
    }

    /// Triangle containing `p` (possibly on its boundary).
    fn locate(&self, p: Point) -> usize {
        let mut t = self.last;
        for _ in 0..self.triangles.len() {
            match self.contains(t, p) {
                None => return t,
                Some(k) => match self.triangles[t].n[k] {
                    Some(next) => t = next,
                    None => break,
                },
            }
        }
        // Walk did not converge; scan.
        (0..self.triangles.len())
            .find(|&t| self.triangles[t].alive && self.contains(t, p).is_none())
            .unwrap_or(self.last)
    }

    fn insert(&mut self, pi: usize) {
        let p = self.points[pi];
        let start = self.locate(p);

        // Cavity: connected triangles whose circumcircle strictly holds p.
        let mut cavity = vec![start];
        let mut in_cavity: HashSet<usize> = HashSet::from([start]);
        let mut visited: HashSet<usize> = HashSet::from([start]);
        let mut i = 0;
        while i < cavity.len() {
            let t = cavity[i];
            for nb in self.triangles[t].n.into_iter().flatten() {
                if visited.insert(nb) {
                    let [a, b, c] = self.triangles[nb].v.map(|v| self.points[v]);
                    if in_circle(a, b, c, p) > 0 {
                        cavity.push(nb);
                        in_cavity.insert(nb);
                    }
                }
            }
            i += 1;
        }

        // Cavity boundary: (from, to, outer neighbour, dead triangle).
        let mut boundary = Vec::new();
        for &t in &cavity {
            let tri = &self.triangles[t];
            for k in 0..3 {
                let outer = tri.n[k].filter(|nb| !in_cavity.contains(nb));
                if tri.n[k].is_none() || outer.is_some() {
                    boundary.push((tri.v[(k + 1) % 3], tri.v[(k + 2) % 3], outer, t));
                }
            }
        }
        for &t in &cavity {
            self.triangles[t].alive = false;
        }

        let mut by_from: HashMap<usize, usize> = HashMap::new();
        let mut by_to: HashMap<usize, usize> = HashMap::new();
        let mut created = Vec::with_capacity(boundary.len());
        for &(from, to, outer, dead) in &boundary {
            let id = self.triangles.len();
            self.triangles.push(Triangle {
                v: [from, to, pi],
                n: [None, None, outer],
                alive: true,
            });
            if let Some(o) = outer {
                for slot in self.triangles[o].n.iter_mut() {
                    if *slot == Some(dead) {
                        *slot = Some(id);
                    }
                }
            }
            by_from.insert(from, id);
            by_to.insert(to, id);
            created.push(id);
        }
        for &id in &created {
            let [from, to, _] = self.triangles[id].v;
            self.triangles[id].n[0] = by_from.get(&to).copied();
            self.triangles[id].n[1] = by_to.get(&from).copied();
        }
        if let Some(&last) = created.last() {
            self.last = last;
        }
    }

    /// Live triangles not touching the super-triangle.
    fn interior(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.triangles
            .iter()
            .filter(|t| t.alive && t.v.iter().all(|&v| v < self.super_start))
            .map(|t| t.v)
    }
}

/// Fill the `targets` cells of `grid` from the `sources` cells by linear
/// interpolation; targets outside the hull of the sources get `outside`.
///
/// `sources` and `targets` are row-major masks with `grid`'s shape. Cells
/// that are neither are left untouched.
pub fn fill_linear(grid: &mut EemMatrix, sources: &[bool], targets: &[bool], outside: f32) {
    let (rows, cols) = grid.shape();
    let cell = |p: Point| p.x as usize * cols + p.y as usize;

    let points: Vec<Point> = (0..rows * cols)
        .filter(|&i| sources[i])
        .map(|i| Point {
            x: (i / cols) as i64,
            y: (i % cols) as i64,
        })
        .collect();

    let mut filled = vec![false; rows * cols];
    let mut output = grid.clone();

    if points.len() >= 3 {
        let tri = Triangulation::build(points);
        for [ia, ib, ic] in tri.interior() {
            let (a, b, c) = (tri.points[ia], tri.points[ib], tri.points[ic]);
            let area = orient(a, b, c);
            if area <= 0 {
                continue;
            }
            let (va, vb, vc) = (
                grid.as_slice()[cell(a)] as f64,
                grid.as_slice()[cell(b)] as f64,
                grid.as_slice()[cell(c)] as f64,
            );
            let (x0, x1) = (a.x.min(b.x).min(c.x), a.x.max(b.x).max(c.x));
            let (y0, y1) = (a.y.min(b.y).min(c.y), a.y.max(b.y).max(c.y));
            for x in x0..=x1 {
                for y in y0..=y1 {
                    let q = Point { x, y };
                    let idx = cell(q);
                    if !targets[idx] || filled[idx] {
                        continue;
                    }
                    let wa = orient(b, c, q);
                    let wb = orient(c, a, q);
                    let wc = orient(a, b, q);
                    if wa < 0 || wb < 0 || wc < 0 {
                        continue;
                    }
                    let value = (wa as f64 * va + wb as f64 * vb + wc as f64 * vc) / area as f64;
                    output.set(x as usize, y as usize, value as f32);
                    filled[idx] = true;
                }
            }
        }
    }

    for idx in 0..rows * cols {
        if targets[idx] && !filled[idx] {
            output.set(idx / cols, idx % cols, outside);
        }
    }
    *grid = output;
}
