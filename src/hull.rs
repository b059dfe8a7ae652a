//! Convex outline of the projected crystal
//!
//! Andrew's monotone chain. The resulting ring is counter-clockwise in a
//! y-up frame, which is clockwise on a y-down screen; edge normals are
//! computed for that orientation.

use nalgebra::{Point2, Vector2};
use serde::Serialize;
use std::cmp::Ordering;

/// Ordered convex polygon
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Hull {
    points: Vec<Point2<f64>>,
}

/// z component of (b - a) x (c - a)
pub fn cross(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// Build the convex hull of `points`.
///
/// Collinear and duplicate points are dropped from the outline, so an
/// all-collinear input collapses to its two extremes and the hull reports
/// [`Hull::is_degenerate`]. Inputs of fewer than four points are returned
/// as given.
pub fn convex_hull(points: &[Point2<f64>]) -> Hull {
    if points.len() < 4 {
        return Hull {
            points: points.to_vec(),
        };
    }

    let mut sorted: Vec<Point2<f64>> = points
        .iter()
        .copied()
        .filter(|p| p.x.is_finite() && p.y.is_finite())
        .collect();
    sorted.sort_by(|a, b| {
        a.x.partial_cmp(&b.x)
            .unwrap_or(Ordering::Equal)
            .then(a.y.partial_cmp(&b.y).unwrap_or(Ordering::Equal))
    });

    let mut lower: Vec<Point2<f64>> = Vec::with_capacity(sorted.len());
    for p in &sorted {
        while lower.len() >= 2 && cross(&lower[lower.len() - 2], &lower[lower.len() - 1], p) <= 0.0 {
            lower.pop();
        }
        lower.push(*p);
    }

    let mut upper: Vec<Point2<f64>> = Vec::with_capacity(sorted.len());
    for p in sorted.iter().rev() {
        while upper.len() >= 2 && cross(&upper[upper.len() - 2], &upper[upper.len() - 1], p) <= 0.0 {
            upper.pop();
        }
        upper.push(*p);
    }

    // each chain ends where the other begins
    lower.pop();
    upper.pop();
    lower.extend(upper);

    // all points identical: both chains reduce to the same point
    lower.dedup();

    Hull { points: lower }
}

impl Hull {
    pub fn points(&self) -> &[Point2<f64>] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Fewer than three points; nothing can be traced through it
    pub fn is_degenerate(&self) -> bool {
        self.points.len() < 3
    }

    /// Edge `i` runs from point `i` to point `i + 1` (wrapping)
    pub fn edge(&self, i: usize) -> (Point2<f64>, Point2<f64>) {
        let n = self.points.len();
        (self.points[i % n], self.points[(i + 1) % n])
    }

    pub fn edges(&self) -> impl Iterator<Item = (Point2<f64>, Point2<f64>)> + '_ {
        (0..self.edge_count()).map(move |i| self.edge(i))
    }

    pub fn edge_count(&self) -> usize {
        if self.points.len() < 2 {
            0
        } else {
            self.points.len()
        }
    }

    /// Unit normal of edge `i` pointing away from the interior
    pub fn outward_normal(&self, i: usize) -> Option<Vector2<f64>> {
        let (a, b) = self.edge(i);
        let d = b - a;
        Vector2::new(d.y, -d.x).try_normalize(f64::EPSILON)
    }

    /// Mean of the hull vertices
    pub fn centroid(&self) -> Option<Point2<f64>> {
        if self.points.is_empty() {
            return None;
        }
        let sum = self
            .points
            .iter()
            .fold(Vector2::zeros(), |acc, p| acc + p.coords);
        Some(Point2::from(sum / self.points.len() as f64))
    }

    /// True when `p` is strictly inside the polygon, whichever way it winds
    pub fn contains(&self, p: &Point2<f64>) -> bool {
        if self.is_degenerate() {
            return false;
        }
        self.edges().all(|(a, b)| cross(&a, &b, p) > 0.0)
            || self.edges().all(|(a, b)| cross(&a, &b, p) < 0.0)
    }

    /// Every consecutive triple turns left (or is straight)
    pub fn is_convex(&self) -> bool {
        let n = self.points.len();
        if n < 3 {
            return true;
        }
        (0..n).all(|i| {
            cross(
                &self.points[i],
                &self.points[(i + 1) % n],
                &self.points[(i + 2) % n],
            ) >= 0.0
        })
    }
}
