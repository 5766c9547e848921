#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::Viewport;
use crate::consts::HANDLE_RADIUS_PX;
use crate::doc::{Node, NodeId};
use crate::geom::{Point, point_in_ring, unique_len};

/// Which part of a polygon was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    Body,
    /// Vertex handle, by index into the unique ring vertices.
    Vertex(usize),
}

/// Result of a hit test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub node_id: NodeId,
    pub part: HitPart,
}

/// Vertex handle positions of a node: its rendered ring without the closing point.
#[must_use]
pub fn handle_positions(node: &Node) -> Vec<Point> {
    let ring = node.render_ring(true);
    let n = unique_len(&ring);
    ring.into_iter().take(n).collect()
}

/// Index of the handle of `node` within [`HANDLE_RADIUS_PX`] screen pixels of
/// `world_pt`, nearest first.
#[must_use]
pub fn hit_handle(world_pt: Point, node: &Node, viewport: &Viewport) -> Option<usize> {
    let cursor = viewport.world_to_screen(world_pt);
    handle_positions(node)
        .into_iter()
        .enumerate()
        .map(|(i, v)| (i, (viewport.world_to_screen(v) - cursor).length()))
        .filter(|(_, d)| *d <= HANDLE_RADIUS_PX)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

/// Test which polygon (if any) is under `world_pt`.
///
/// Handles of the selected node are checked first, then bodies from the top
/// of the draw order down. `visible` is in draw order.
#[must_use]
pub fn hit_test(world_pt: Point, visible: &[&Node], viewport: &Viewport, selected: Option<&str>) -> Option<Hit> {
    if let Some(sel) = selected.and_then(|id| visible.iter().find(|n| n.id == id)) {
        if let Some(i) = hit_handle(world_pt, sel, viewport) {
            return Some(Hit { node_id: sel.id.clone(), part: HitPart::Vertex(i) });
        }
    }
    visible
        .iter()
        .rev()
        .find(|n| point_in_ring(world_pt, &n.render_ring(selected == Some(n.id.as_str()))))
        .map(|n| Hit { node_id: n.id.clone(), part: HitPart::Body })
}
