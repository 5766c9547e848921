//! Grid layout behind "bring checked into view".
//!
//! Every checked node at the display level is replaced by a copy of the
//! reference rectangle's shape: same orientation, same aspect, sized to a cell
//! of a five-wide grid covering the viewport. Cells are laid out in pixel
//! space and unprojected, so the result looks uniform at the current zoom.

#[cfg(test)]
#[path = "arrange_test.rs"]
mod arrange_test;

use crate::affine::{aspect_ratio, orientation_angle, rotate};
use crate::camera::Viewport;
use crate::consts::ARRANGE_PER_ROW;
use crate::doc::NodeId;
use crate::geom::{Point, ensure_closed_ring};

/// Why a layout could not be produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArrangeError {
    #[error("no checked nodes at the display level")]
    NothingChecked,
    #[error("viewport has no area")]
    EmptyViewport,
    #[error("reference polygon has no usable aspect ratio")]
    DegenerateReference,
}

/// New ring for one node, in world coordinates, closed.
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    pub node_id: NodeId,
    pub ring: Vec<Point>,
}

/// Lay `ids` out over `viewport`, shaped like `reference`.
///
/// # Errors
///
/// Returns an [`ArrangeError`] when `ids` is empty, the viewport has no area,
/// or the reference ring is flat.
#[allow(clippy::cast_precision_loss)]
pub fn arrange(ids: &[NodeId], viewport: &Viewport, reference: &[Point]) -> Result<Vec<Placement>, ArrangeError> {
    if ids.is_empty() {
        return Err(ArrangeError::NothingChecked);
    }
    if viewport.width_px <= 0.0 || viewport.height_px <= 0.0 {
        return Err(ArrangeError::EmptyViewport);
    }
    let aspect = aspect_ratio(reference);
    if !aspect.is_finite() || aspect <= 0.0 {
        return Err(ArrangeError::DegenerateReference);
    }
    let theta = orientation_angle(reference);

    let count = ids.len();
    let rows = count.div_ceil(ARRANGE_PER_ROW);
    let cell_h = viewport.height_px / rows as f64;

    let placements = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let row = i / ARRANGE_PER_ROW;
            let col = i % ARRANGE_PER_ROW;
            let in_row = (count - row * ARRANGE_PER_ROW).min(ARRANGE_PER_ROW);
            let cell_w = viewport.width_px / in_row as f64;
            let cx = (col as f64 + 0.5) * cell_w;
            let cy = (row as f64 + 0.5) * cell_h;
            let (w, h) = fit_rect(cell_w, cell_h, aspect, theta);
            let (hw, hh) = (w / 2.0, h / 2.0);
            let corners = [Point::new(-hw, -hh), Point::new(hw, -hh), Point::new(hw, hh), Point::new(-hw, hh)];
            let ring: Vec<Point> = corners
                .iter()
                .map(|c| {
                    // Rotation is Y-up; screen pixels are Y-down.
                    let r = rotate(*c, theta);
                    viewport.screen_to_world(Point::new(cx + r.x, cy - r.y))
                })
                .collect();
            Placement { node_id: id.clone(), ring: ensure_closed_ring(&ring) }
        })
        .collect();
    Ok(placements)
}

/// Largest `w × h` rectangle of the given aspect whose rotated bounding box
/// fits in a `cell_w × cell_h` cell.
fn fit_rect(cell_w: f64, cell_h: f64, aspect: f64, theta: f64) -> (f64, f64) {
    let mut h = cell_h;
    let mut w = h * aspect;
    if w > cell_w {
        w = cell_w;
        h = w / aspect;
    }
    let (s, c) = theta.sin_cos();
    let bw = (w * c).abs() + (h * s).abs();
    let bh = (w * s).abs() + (h * c).abs();
    let shrink = (cell_w / bw).min(cell_h / bh).min(1.0);
    (w * shrink, h * shrink)
}
