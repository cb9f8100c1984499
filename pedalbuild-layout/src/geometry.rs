//! Integer grid geometry shared by the router and the scorer.
//!
//! Every hole, rail and jumper of the platform maps to a [`GridPoint`] in one
//! global coordinate system (x grows to the right across both boards, y grows
//! downward). Wire paths are polylines over these points.

use serde::{Deserialize, Serialize};

/// A point on the global hole grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridPoint {
    pub x: i32,
    pub y: i32,
}

impl GridPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn manhattan(self, other: GridPoint) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }
}

/// A straight wire segment between two grid points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub a: GridPoint,
    pub b: GridPoint,
}

impl Segment {
    pub const fn new(a: GridPoint, b: GridPoint) -> Self {
        Self { a, b }
    }

    pub fn is_point(&self) -> bool {
        self.a == self.b
    }
}

/// Split a polyline into its segments, skipping degenerate ones.
pub fn segments_of(path: &[GridPoint]) -> impl Iterator<Item = Segment> + '_ {
    path.windows(2)
        .map(|w| Segment::new(w[0], w[1]))
        .filter(|s| !s.is_point())
}

/// Sum of Manhattan segment lengths of a polyline.
pub fn path_length(path: &[GridPoint]) -> u32 {
    path.windows(2).map(|w| w[0].manhattan(w[1])).sum()
}

/// Sign of the cross product `(b - a) x (c - a)`.
fn orientation(a: GridPoint, b: GridPoint, c: GridPoint) -> i8 {
    let cross = (b.x - a.x) as i64 * (c.y - a.y) as i64 - (b.y - a.y) as i64 * (c.x - a.x) as i64;
    cross.signum() as i8
}

/// Proper crossing test: the segments intersect at a single point interior
/// to both of them.
///
/// Touching at an endpoint and collinear overlap do not count. Physical
/// wires meeting at a shared hole or running side by side are not crossings.
pub fn segments_cross(s: Segment, t: Segment) -> bool {
    if s.is_point() || t.is_point() {
        return false;
    }
    let o1 = orientation(s.a, s.b, t.a);
    let o2 = orientation(s.a, s.b, t.b);
    let o3 = orientation(t.a, t.b, s.a);
    let o4 = orientation(t.a, t.b, s.b);
    o1 * o2 < 0 && o3 * o4 < 0
}

/// Number of crossings between two polylines.
pub fn path_crossings(p: &[GridPoint], q: &[GridPoint]) -> usize {
    let mut count = 0;
    for s in segments_of(p) {
        for t in segments_of(q) {
            if segments_cross(s, t) {
                count += 1;
            }
        }
    }
    count
}

/// Crossings of one polyline against an accumulated segment set.
pub fn crossings_against(path: &[GridPoint], existing: &[Segment]) -> usize {
    segments_of(path)
        .map(|s| existing.iter().filter(|&&t| segments_cross(s, t)).count())
        .sum()
}

/// Drop interior points where the path keeps going straight.
pub fn simplify_path(points: &[GridPoint]) -> Vec<GridPoint> {
    let mut out: Vec<GridPoint> = Vec::with_capacity(points.len());
    for &p in points {
        if out.last() == Some(&p) {
            continue;
        }
        if out.len() >= 2 {
            let a = out[out.len() - 2];
            let b = out[out.len() - 1];
            if orientation(a, b, p) == 0 {
                out.pop();
            }
        }
        out.push(p);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: i32, y: i32) -> GridPoint {
        GridPoint::new(x, y)
    }

    #[test]
    fn perpendicular_segments_cross() {
        assert!(segments_cross(Segment::new(p(0, 5), p(10, 5)), Segment::new(p(5, 0), p(5, 10))));
    }

    #[test]
    fn parallel_segments_do_not_cross() {
        assert!(!segments_cross(Segment::new(p(0, 5), p(10, 5)), Segment::new(p(0, 7), p(10, 7))));
        // Collinear overlap is not a crossing either
        assert!(!segments_cross(Segment::new(p(0, 5), p(10, 5)), Segment::new(p(3, 5), p(12, 5))));
    }

    #[test]
    fn touching_endpoints_do_not_cross() {
        assert!(!segments_cross(Segment::new(p(0, 5), p(5, 5)), Segment::new(p(5, 5), p(5, 10))));
        // T-junction
        assert!(!segments_cross(Segment::new(p(0, 5), p(10, 5)), Segment::new(p(5, 5), p(5, 10))));
    }

    #[test]
    fn crossing_is_symmetric() {
        let a = [p(0, 0), p(10, 0), p(10, 10)];
        let b = [p(5, -3), p(5, 4), p(14, 4)];
        assert_eq!(path_crossings(&a, &b), path_crossings(&b, &a));
        assert_eq!(path_crossings(&a, &b), 2);
    }

    #[test]
    fn simplify_removes_collinear_points() {
        let path = [p(0, 0), p(1, 0), p(2, 0), p(2, 1), p(2, 2), p(2, 2)];
        assert_eq!(simplify_path(&path), vec![p(0, 0), p(2, 0), p(2, 2)]);
    }

    #[test]
    fn path_length_is_manhattan() {
        assert_eq!(path_length(&[p(0, 0), p(4, 0), p(4, -3)]), 7);
        assert_eq!(path_length(&[p(2, 2)]), 0);
    }
}
