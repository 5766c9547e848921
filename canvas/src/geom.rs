//! Planar primitives shared by every layer of the engine.
//!
//! Rings are plain `Vec<Point>`. Storage keeps them open or closed as it
//! pleases; anything that renders or edits a ring goes through
//! [`ensure_closed_ring`] first so the closing convention is applied in one
//! place.

#[cfg(test)]
#[path = "geom_test.rs"]
mod geom_test;

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

/// A point in local, world or screen space. Serialized as `[x, y]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "[f64; 2]")]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean length of the point treated as a vector.
    #[must_use]
    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// 2D cross product (z component of `self × other`).
    #[must_use]
    pub fn cross(self, other: Point) -> f64 {
        self.x * other.y - self.y * other.x
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point {
    type Output = Point;

    fn mul(self, rhs: f64) -> Point {
        Point::new(self.x * rhs, self.y * rhs)
    }
}

impl From<Point> for [f64; 2] {
    fn from(p: Point) -> Self {
        [p.x, p.y]
    }
}

impl TryFrom<Vec<f64>> for Point {
    type Error = String;

    /// Accepts `[x, y]` and ignores any trailing ordinates (`[x, y, z]`).
    fn try_from(v: Vec<f64>) -> Result<Self, Self::Error> {
        match v.as_slice() {
            [x, y, ..] => Ok(Point::new(*x, *y)),
            _ => Err(format!("coordinate needs at least 2 ordinates, got {}", v.len())),
        }
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    #[must_use]
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// True when the interiors overlap by more than `eps` on both axes.
    /// Boxes that merely touch do not overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Bounds, eps: f64) -> bool {
        self.min_x + eps < other.max_x
            && other.min_x + eps < self.max_x
            && self.min_y + eps < other.max_y
            && other.min_y + eps < self.max_y
    }
}

/// A ring is closed when it has more than one point and the last equals the first.
#[must_use]
pub fn is_closed(ring: &[Point]) -> bool {
    ring.len() > 1 && ring.first() == ring.last()
}

/// Return `ring` with the first point appended when it is not already closed.
///
/// Idempotent: closing a closed ring returns it unchanged.
#[must_use]
pub fn ensure_closed_ring(ring: &[Point]) -> Vec<Point> {
    let mut out = ring.to_vec();
    if let (Some(first), Some(last)) = (ring.first(), ring.last()) {
        if first != last {
            out.push(*first);
        }
    }
    out
}

/// Return `ring` without its closing point. Open rings are returned unchanged.
#[must_use]
pub fn strip_closing_point(ring: &[Point]) -> Vec<Point> {
    if is_closed(ring) {
        ring[..ring.len() - 1].to_vec()
    } else {
        ring.to_vec()
    }
}

/// Number of vertices excluding the closing duplicate.
#[must_use]
pub fn unique_len(ring: &[Point]) -> usize {
    if is_closed(ring) { ring.len() - 1 } else { ring.len() }
}

/// Number of pairwise-distinct points in the ring.
#[must_use]
pub fn distinct_vertex_count(ring: &[Point]) -> usize {
    let mut seen: Vec<Point> = Vec::with_capacity(ring.len());
    for p in ring {
        if !seen.contains(p) {
            seen.push(*p);
        }
    }
    seen.len()
}

/// Translate every point of `ring` by `delta`.
#[must_use]
pub fn translate_ring(ring: &[Point], delta: Point) -> Vec<Point> {
    ring.iter().map(|p| *p + delta).collect()
}

/// Bounding box of the ring, or `None` for an empty ring.
#[must_use]
pub fn bounds(ring: &[Point]) -> Option<Bounds> {
    let first = ring.first()?;
    let mut b = Bounds { min_x: first.x, min_y: first.y, max_x: first.x, max_y: first.y };
    for p in &ring[1..] {
        b.min_x = b.min_x.min(p.x);
        b.min_y = b.min_y.min(p.y);
        b.max_x = b.max_x.max(p.x);
        b.max_y = b.max_y.max(p.y);
    }
    Some(b)
}

/// Even-odd point-in-polygon test. Works for open or closed rings.
#[must_use]
pub fn point_in_ring(p: Point, ring: &[Point]) -> bool {
    let pts = strip_closing_point(ring);
    if pts.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = pts.len() - 1;
    for i in 0..pts.len() {
        let a = pts[i];
        let b = pts[j];
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x;
            if p.x < x_cross {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}
