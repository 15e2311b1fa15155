//! A static two-dimensional k-d tree over reference regions.
//!
//! The tree is implicit: points are reordered once so that every sub-slice
//! has its median on the splitting axis at its middle index. Lookups use
//! the squared Euclidean distance, and the `max_distance` bound of a query
//! is compared against that squared distance.

pub mod reference;

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::ops::Range;
use std::sync::Arc;

use serde::Serialize;

/// A fixed geographic anchor. `x` is the longitude and `y` the latitude.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferencePoint {
    pub x: f64,
    pub y: f64,
    pub name: Arc<str>,
}

impl ReferencePoint {
    pub fn new(x: f64, y: f64, name: impl Into<Arc<str>>) -> ReferencePoint {
        Self {
            x,
            y,
            name: name.into(),
        }
    }

    fn distance(&self, x: f64, y: f64) -> f64 {
        let dx = self.x - x;
        let dy = self.y - y;
        dx * dx + dy * dy
    }
}

/// A reference point returned by a lookup with its squared distance
/// to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor<'a> {
    pub point: &'a ReferencePoint,
    pub distance: f64,
}

#[derive(Debug, Clone, Copy)]
enum Axis {
    X,
    Y,
}

impl Axis {
    fn at(depth: usize) -> Axis {
        if depth % 2 == 0 { Axis::X } else { Axis::Y }
    }

    fn of(self, point: &ReferencePoint) -> f64 {
        match self {
            Axis::X => point.x,
            Axis::Y => point.y,
        }
    }

    fn of_query(self, x: f64, y: f64) -> f64 {
        match self {
            Axis::X => x,
            Axis::Y => y,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: f64,
    index: usize,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.index.cmp(&other.index))
    }
}

/// Nearest-neighbor index over a fixed set of [`ReferencePoint`]s.
///
/// Built once and shared read-only across imports.
#[derive(Debug, Clone, Default)]
pub struct SpatialIndex {
    points: Vec<ReferencePoint>,
}

impl SpatialIndex {
    pub fn new(mut points: Vec<ReferencePoint>) -> SpatialIndex {
        Self::build(&mut points, 0);
        Self { points }
    }

    fn build(points: &mut [ReferencePoint], depth: usize) {
        if points.len() <= 1 {
            return;
        }

        let axis = Axis::at(depth);
        let median = points.len() / 2;
        points.select_nth_unstable_by(median, |a, b| axis.of(a).total_cmp(&axis.of(b)));

        let (left, right) = points.split_at_mut(median);
        Self::build(left, depth + 1);
        Self::build(&mut right[1..], depth + 1);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[ReferencePoint] {
        &self.points
    }

    /// The `k` closest points whose squared distance to `(x, y)` is strictly
    /// below `max_distance`, nearest first.
    pub fn nearest(&self, x: f64, y: f64, k: usize, max_distance: f64) -> Vec<Neighbor<'_>> {
        if k == 0 || self.points.is_empty() {
            return Vec::new();
        }

        let mut best: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k + 1);
        let query = Query {
            x,
            y,
            k,
            max_distance,
        };
        self.search(0..self.points.len(), 0, &query, &mut best);

        best.into_sorted_vec()
            .into_iter()
            .map(|c| Neighbor {
                point: &self.points[c.index],
                distance: c.distance,
            })
            .collect()
    }

    /// The region containing the given coordinates, if a reference point
    /// lies within `max_distance`.
    pub fn nearest_region(
        &self,
        latitude: f64,
        longitude: f64,
        max_distance: f64,
    ) -> Option<&ReferencePoint> {
        self.nearest(longitude, latitude, 1, max_distance)
            .first()
            .map(|neighbor| neighbor.point)
    }

    fn search(
        &self,
        range: Range<usize>,
        depth: usize,
        query: &Query,
        best: &mut BinaryHeap<Candidate>,
    ) {
        if range.is_empty() {
            return;
        }

        let median = range.start + range.len() / 2;
        let point = &self.points[median];
        let distance = point.distance(query.x, query.y);

        if distance < query.bound(best) {
            best.push(Candidate {
                distance,
                index: median,
            });

            if best.len() > query.k {
                best.pop();
            }
        }

        let axis = Axis::at(depth);
        let diff = axis.of_query(query.x, query.y) - axis.of(point);
        let (near, far) = if diff < 0.0 {
            (range.start..median, median + 1..range.end)
        } else {
            (median + 1..range.end, range.start..median)
        };

        self.search(near, depth + 1, query, best);

        if diff * diff < query.bound(best) {
            self.search(far, depth + 1, query, best);
        }
    }
}

struct Query {
    x: f64,
    y: f64,
    k: usize,
    max_distance: f64,
}

impl Query {
    fn bound(&self, best: &BinaryHeap<Candidate>) -> f64 {
        match best.peek() {
            Some(worst) if best.len() >= self.k => worst.distance.min(self.max_distance),
            _ => self.max_distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn brute_force(points: &[ReferencePoint], x: f64, y: f64) -> f64 {
        points
            .iter()
            .map(|p| p.distance(x, y))
            .fold(f64::INFINITY, f64::min)
    }

    fn grid() -> Vec<ReferencePoint> {
        let mut points = Vec::new();
        for i in 0..10 {
            for j in 0..10 {
                points.push(ReferencePoint::new(
                    i as f64 * 0.5,
                    j as f64 * 0.25,
                    format!("p{i}-{j}"),
                ));
            }
        }
        points
    }

    #[test]
    fn finds_exact_match() {
        let index = SpatialIndex::new(vec![
            ReferencePoint::new(6.1, 46.2, "Lausanne"),
            ReferencePoint::new(8.0, 47.0, "Geneva"),
            ReferencePoint::new(7.4, 46.9, "Bern"),
        ]);

        let region = index.nearest_region(47.0, 8.0, 0.1).unwrap();

        assert_eq!(&*region.name, "Geneva");
    }

    #[test]
    fn returns_nothing_beyond_max_distance() {
        let index = SpatialIndex::new(vec![ReferencePoint::new(0.0, 0.0, "origin")]);

        // squared distances 0.0625 and 0.16
        assert_eq!(index.nearest(0.25, 0.0, 1, 0.1).len(), 1);
        assert!(index.nearest(0.0, 0.4, 1, 0.1).is_empty());
        assert!(index.nearest(1.0, 1.0, 1, 0.1).is_empty());
    }

    #[test]
    fn agrees_with_brute_force() {
        let points = grid();
        let index = SpatialIndex::new(points.clone());
        let queries = [(0.1, 0.1), (2.26, 1.13), (4.49, 2.24), (-0.3, 1.0), (3.0, 0.6)];

        for (x, y) in queries {
            let found = index.nearest(x, y, 1, f64::INFINITY);
            assert_eq!(found.len(), 1);
            assert_eq!(found[0].distance, brute_force(&points, x, y), "query ({x}, {y})");
        }
    }

    #[test]
    fn returns_k_nearest_sorted() {
        let index = SpatialIndex::new(grid());

        let found = index.nearest(1.0, 1.0, 5, f64::INFINITY);

        assert_eq!(found.len(), 5);
        assert_eq!(found[0].distance, 0.0);
        assert!(found.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn handles_duplicate_and_collinear_points() {
        let mut points = vec![ReferencePoint::new(1.0, 1.0, "dup"); 50];
        points.extend((0..50).map(|i| ReferencePoint::new(2.0, i as f64, format!("line{i}"))));
        let index = SpatialIndex::new(points);

        let found = index.nearest(1.0, 1.0, 3, 0.5);
        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|n| &*n.point.name == "dup"));

        let on_line = index.nearest_region(17.1, 2.0, 0.1).unwrap();
        assert_eq!(&*on_line.name, "line17");
    }

    #[test]
    fn empty_index_finds_nothing() {
        let index = SpatialIndex::default();

        assert!(index.is_empty());
        assert!(index.nearest(0.0, 0.0, 1, f64::INFINITY).is_empty());
    }
}
