//! Ring edits applied during a drag.
//!
//! Both functions are pure: they take the ring captured at gesture start and
//! the total pointer delta since then, and return a fresh closed ring. Working
//! from the start ring every frame means edits never accumulate rounding drift
//! and the coalescer can drop intermediate frames freely.

#[cfg(test)]
#[path = "solver_test.rs"]
mod solver_test;

use crate::consts::SOLVER_DET_EPSILON;
use crate::geom::{Point, ensure_closed_ring, translate_ring, unique_len};

/// Constraint applied while dragging a single vertex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VertexMode {
    /// Only the dragged vertex moves.
    Free,
    /// Four-vertex rings keep their interior angles.
    #[default]
    Rectangular,
}

/// Translate the whole ring by `delta`. The result is closed.
#[must_use]
pub fn apply_body_drag(start: &[Point], delta: Point) -> Vec<Point> {
    translate_ring(&ensure_closed_ring(start), delta)
}

/// Move vertex `index` of `start` by `delta` under `mode`.
///
/// Only rings with exactly four unique vertices are reshaped; any other ring
/// is translated whole in either mode. In rectangular mode both neighbours
/// slide so each stays on its original edge through the opposite corner,
/// which preserves every interior angle. `index` is clamped to the unique
/// vertices.
#[must_use]
pub fn apply_vertex_drag(start: &[Point], index: usize, delta: Point, mode: VertexMode) -> Vec<Point> {
    let mut ring = ensure_closed_ring(start);
    let n = unique_len(&ring);
    if n == 0 {
        return ring;
    }
    if n != 4 {
        return translate_ring(&ring, delta);
    }

    let idx = index.min(n - 1);
    let moved = ring[idx] + delta;
    ring[idx] = moved;

    if mode == VertexMode::Rectangular {
        let opp = (idx + 2) % n;
        let prev = (idx + n - 1) % n;
        let next = (idx + 1) % n;
        let s = ensure_closed_ring(start);
        if let Some(p) = slide_neighbour(moved, s[prev] - s[idx], s[opp], s[prev] - s[opp]) {
            ring[prev] = p;
        }
        if let Some(p) = slide_neighbour(moved, s[next] - s[idx], s[opp], s[next] - s[opp]) {
            ring[next] = p;
        }
    }

    let last = ring.len() - 1;
    ring[last] = ring[0];
    ring
}

/// Intersection of the line through `moved` along `along` with the line
/// through `opposite` along `edge`. `None` when the lines are parallel.
fn slide_neighbour(moved: Point, along: Point, opposite: Point, edge: Point) -> Option<Point> {
    let det = along.cross(edge);
    if det.abs() <= SOLVER_DET_EPSILON {
        return None;
    }
    let t = (opposite - moved).cross(edge) / det;
    Some(moved + along * t)
}
