use super::*;
use crate::consts::REFERENCE_POLYGON;
use crate::geom::bounds;

fn reference() -> Vec<Point> {
    REFERENCE_POLYGON.iter().map(|[x, y]| Point::new(*x, *y)).collect()
}

/// 1000×500 px over a 100×50 world: 0.1 world units per pixel on both axes.
fn viewport() -> Viewport {
    Viewport { width_px: 1000.0, height_px: 500.0, west: 0.0, south: 0.0, east: 100.0, north: 50.0 }
}

fn ids(n: usize) -> Vec<NodeId> {
    (0..n).map(|i| format!("n{i}")).collect()
}

#[test]
fn empty_selection_is_an_error() {
    assert_eq!(arrange(&[], &viewport(), &reference()), Err(ArrangeError::NothingChecked));
}

#[test]
fn zero_area_viewport_is_an_error() {
    let vp = Viewport { width_px: 0.0, ..viewport() };
    assert_eq!(arrange(&ids(1), &vp, &reference()), Err(ArrangeError::EmptyViewport));
}

#[test]
fn flat_reference_is_an_error() {
    let flat = vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0), Point::new(2.0, 0.0)];
    assert_eq!(arrange(&ids(1), &viewport(), &flat), Err(ArrangeError::DegenerateReference));
}

#[test]
fn one_placement_per_id_in_order() {
    let out = arrange(&ids(7), &viewport(), &reference()).unwrap();
    let got: Vec<&str> = out.iter().map(|p| p.node_id.as_str()).collect();
    assert_eq!(got, vec!["n0", "n1", "n2", "n3", "n4", "n5", "n6"]);
}

#[test]
fn rings_are_closed_quads() {
    for p in arrange(&ids(3), &viewport(), &reference()).unwrap() {
        assert_eq!(p.ring.len(), 5);
        assert_eq!(p.ring.first(), p.ring.last());
    }
}

#[test]
fn single_rect_is_centered() {
    let out = arrange(&ids(1), &viewport(), &reference()).unwrap();
    let b = bounds(&out[0].ring).unwrap();
    assert!(((b.min_x + b.max_x) / 2.0 - 50.0).abs() < 1e-9);
    assert!(((b.min_y + b.max_y) / 2.0 - 25.0).abs() < 1e-9);
}

#[test]
fn rects_do_not_overlap_and_stay_in_view() {
    for n in [1, 4, 5, 6, 11, 23] {
        let out = arrange(&ids(n), &viewport(), &reference()).unwrap();
        let boxes: Vec<_> = out.iter().map(|p| bounds(&p.ring).unwrap()).collect();
        let view = viewport().world_bounds();
        for (i, a) in boxes.iter().enumerate() {
            assert!(a.min_x >= view.min_x - 1e-9 && a.max_x <= view.max_x + 1e-9, "n={n} box {i} leaves view");
            assert!(a.min_y >= view.min_y - 1e-9 && a.max_y <= view.max_y + 1e-9, "n={n} box {i} leaves view");
            for b in &boxes[i + 1..] {
                assert!(!a.overlaps(b, 1e-9), "n={n}: {a:?} overlaps {b:?}");
            }
        }
    }
}

#[test]
fn rects_keep_reference_aspect_and_orientation() {
    let ref_aspect = aspect_ratio(&reference());
    let ref_theta = orientation_angle(&reference());
    for p in arrange(&ids(6), &viewport(), &reference()).unwrap() {
        assert!((aspect_ratio(&p.ring) - ref_aspect).abs() < 1e-6);
        // Longest edge may point either way along the same line.
        assert!((orientation_angle(&p.ring) - ref_theta).sin().abs() < 1e-6);
    }
}

#[test]
fn second_row_cells_widen_for_fewer_items() {
    let out = arrange(&ids(6), &viewport(), &reference()).unwrap();
    let first = bounds(&out[0].ring).unwrap();
    let last = bounds(&out[5].ring).unwrap();
    // Row 2 has one item centred across the full width.
    assert!(((last.min_x + last.max_x) / 2.0 - 50.0).abs() < 1e-9);
    assert!(last.width() >= first.width() - 1e-9);
}
