#![allow(clippy::float_cmp)]

use super::*;

const EPSILON: f64 = 1e-10;

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < EPSILON
}

fn point_approx_eq(a: Point, b: Point) -> bool {
    approx_eq(a.x, b.x) && approx_eq(a.y, b.y)
}

fn factory_view() -> Viewport {
    Viewport { width_px: 800.0, height_px: 400.0, west: 0.0, south: 0.0, east: 80.0, north: 40.0 }
}

// --- Defaults ---

#[test]
fn default_maps_origin_to_origin() {
    let vp = Viewport::default();
    assert!(point_approx_eq(vp.screen_to_world(Point::new(0.0, 0.0)), Point::new(0.0, 0.0)));
}

#[test]
fn default_flips_y() {
    let vp = Viewport::default();
    assert!(point_approx_eq(vp.screen_to_world(Point::new(0.5, 0.25)), Point::new(0.5, -0.25)));
}

// --- screen_to_world ---

#[test]
fn top_left_pixel_is_north_west() {
    let vp = factory_view();
    assert!(point_approx_eq(vp.screen_to_world(Point::new(0.0, 0.0)), Point::new(0.0, 40.0)));
}

#[test]
fn bottom_right_pixel_is_south_east() {
    let vp = factory_view();
    assert!(point_approx_eq(vp.screen_to_world(Point::new(800.0, 400.0)), Point::new(80.0, 0.0)));
}

#[test]
fn center_pixel_is_center_of_bounds() {
    let vp = factory_view();
    assert!(point_approx_eq(vp.screen_to_world(Point::new(400.0, 200.0)), Point::new(40.0, 20.0)));
}

// --- world_to_screen ---

#[test]
fn world_to_screen_inverts_screen_to_world() {
    let vp = Viewport { width_px: 1280.0, height_px: 720.0, west: 5.2, south: 43.2, east: 11.3, north: 47.1 };
    for p in [Point::new(0.0, 0.0), Point::new(640.0, 360.0), Point::new(13.5, 700.25)] {
        let back = vp.world_to_screen(vp.screen_to_world(p));
        assert!((back.x - p.x).abs() < 1e-9 && (back.y - p.y).abs() < 1e-9);
    }
}

// --- distances ---

#[test]
fn screen_dist_scales_by_units_per_px() {
    let vp = factory_view();
    assert!(approx_eq(vp.units_per_px_x(), 0.1));
    assert!(approx_eq(vp.units_per_px_y(), 0.1));
    assert!(approx_eq(vp.screen_dist_to_world(20.0), 2.0));
}

#[test]
fn world_bounds_match_fields() {
    let b = factory_view().world_bounds();
    assert_eq!(b.min_x, 0.0);
    assert_eq!(b.max_x, 80.0);
    assert_eq!(b.min_y, 0.0);
    assert_eq!(b.max_y, 40.0);
}
