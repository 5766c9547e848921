//! Affine transform between the local planar frame and canvas space, plus the
//! orientation/aspect analysis used to lay polygons out uniformly.

#[cfg(test)]
#[path = "affine_test.rs"]
mod affine_test;

use serde::{Deserialize, Serialize};

use crate::geom::{Point, bounds, ensure_closed_ring};

/// Similarity transform with an optional Y flip.
///
/// Forward order: rotate by `rotation`, scale by `scale`, translate, then
/// negate Y when `flip_y` is set. `scale` must be non-zero for the inverse
/// to exist.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Affine {
    pub scale: f64,
    /// Radians, counter-clockwise.
    pub rotation: f64,
    pub translate_x: f64,
    pub translate_y: f64,
    #[serde(default)]
    pub flip_y: bool,
}

impl Default for Affine {
    fn default() -> Self {
        Self { scale: 1.0, rotation: 0.0, translate_x: 0.0, translate_y: 0.0, flip_y: false }
    }
}

/// Rotate `p` about the origin by `theta` radians.
#[must_use]
pub fn rotate(p: Point, theta: f64) -> Point {
    let (s, c) = theta.sin_cos();
    Point::new(p.x * c - p.y * s, p.x * s + p.y * c)
}

/// Map a local-frame point into canvas space.
#[must_use]
pub fn world_to_canvas(p: Point, a: &Affine) -> Point {
    let r = rotate(p, a.rotation);
    let x = a.scale * r.x + a.translate_x;
    let y_raw = a.scale * r.y + a.translate_y;
    Point::new(x, if a.flip_y { -y_raw } else { y_raw })
}

/// Inverse of [`world_to_canvas`].
#[must_use]
pub fn canvas_to_world(p: Point, a: &Affine) -> Point {
    let y_raw = if a.flip_y { -p.y } else { p.y };
    let xr = (p.x - a.translate_x) / a.scale;
    let yr = (y_raw - a.translate_y) / a.scale;
    rotate(Point::new(xr, yr), -a.rotation)
}

/// Map every point of a ring into canvas space.
#[must_use]
pub fn transform_ring_to_canvas(ring: &[Point], a: &Affine) -> Vec<Point> {
    ring.iter().map(|p| world_to_canvas(*p, a)).collect()
}

/// Orientation of a polygon: the angle (`atan2`) of its longest edge.
///
/// The ring is closed before measuring so the closing edge counts. Returns
/// `0.0` for rings with fewer than three points.
#[must_use]
pub fn orientation_angle(ring: &[Point]) -> f64 {
    if ring.len() < 3 {
        return 0.0;
    }
    let closed = ensure_closed_ring(ring);
    let mut max_len = 0.0;
    let mut angle = 0.0;
    for pair in closed.windows(2) {
        let d = pair[1] - pair[0];
        let len = d.length();
        if len > max_len {
            max_len = len;
            angle = d.y.atan2(d.x);
        }
    }
    angle
}

/// Width/height of the polygon's bounding box after de-rotating it by its
/// [`orientation_angle`]. Infinite when the de-rotated height is (numerically) zero.
#[must_use]
pub fn aspect_ratio(ring: &[Point]) -> f64 {
    let theta = orientation_angle(ring);
    let derotated: Vec<Point> = ring.iter().map(|p| rotate(*p, -theta)).collect();
    let Some(b) = bounds(&derotated) else {
        return f64::INFINITY;
    };
    if b.height() < 1e-12 {
        return f64::INFINITY;
    }
    b.width() / b.height()
}
