use super::*;
use crate::doc::{DocStore, HierarchyDocument, HierarchyNode, Level, Units};

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn square(id: &str, x: f64, y: f64, s: f64) -> HierarchyNode {
    HierarchyNode::new(id, Level::Polje, id, vec![pt(x, y), pt(x + s, y), pt(x + s, y + s), pt(x, y + s)])
}

/// `a` at (10,10)-(30,30), `b` overlapping it at (20,20)-(40,40), drawn after.
fn store() -> DocStore {
    DocStore::from_document(HierarchyDocument {
        origin: Point::default(),
        units: Units::M,
        nodes: vec![square("a", 10.0, 10.0, 20.0), square("b", 20.0, 20.0, 20.0)],
    })
}

/// 10 px per world unit.
fn viewport() -> Viewport {
    Viewport { width_px: 800.0, height_px: 400.0, west: 0.0, south: 0.0, east: 80.0, north: 40.0 }
}

// =============================================================
// Bodies
// =============================================================

#[test]
fn miss_returns_none() {
    let doc = store();
    let visible: Vec<&Node> = doc.iter().collect();
    assert_eq!(hit_test(pt(70.0, 5.0), &visible, &viewport(), None), None);
}

#[test]
fn body_hit_returns_node() {
    let doc = store();
    let visible: Vec<&Node> = doc.iter().collect();
    let hit = hit_test(pt(12.0, 12.0), &visible, &viewport(), None).unwrap();
    assert_eq!(hit, Hit { node_id: "a".into(), part: HitPart::Body });
}

#[test]
fn topmost_body_wins_on_overlap() {
    let doc = store();
    let visible: Vec<&Node> = doc.iter().collect();
    let hit = hit_test(pt(25.0, 25.0), &visible, &viewport(), None).unwrap();
    assert_eq!(hit.node_id, "b");
}

#[test]
fn invisible_nodes_are_not_hit() {
    let doc = store();
    let visible: Vec<&Node> = doc.iter().filter(|n| n.id == "a").collect();
    let hit = hit_test(pt(35.0, 35.0), &visible, &viewport(), None);
    assert!(hit.is_none());
}

// =============================================================
// Handles
// =============================================================

#[test]
fn handle_of_selected_node_beats_body() {
    let doc = store();
    let visible: Vec<&Node> = doc.iter().collect();
    // (30, 30) is a corner of `a` and inside `b`.
    let hit = hit_test(pt(30.5, 30.5), &visible, &viewport(), Some("a")).unwrap();
    assert_eq!(hit, Hit { node_id: "a".into(), part: HitPart::Vertex(2) });
}

#[test]
fn handles_of_unselected_nodes_are_ignored() {
    let doc = store();
    let visible: Vec<&Node> = doc.iter().collect();
    let hit = hit_test(pt(30.5, 30.5), &visible, &viewport(), None).unwrap();
    assert_eq!(hit.part, HitPart::Body);
    assert_eq!(hit.node_id, "b");
}

#[test]
fn handle_radius_is_screen_space() {
    let doc = store();
    let a = doc.get("a").unwrap();
    // 1.0 world unit = 10 px: inside the 11.2 px slop.
    assert_eq!(hit_handle(pt(9.0, 10.0), a, &viewport()), Some(0));
    // 1.2 world units = 12 px: outside.
    assert_eq!(hit_handle(pt(8.8, 10.0), a, &viewport()), None);
    // Zoomed in 10x: 1.0 world unit is now 100 px.
    let zoomed = Viewport { east: 8.0, north: 4.0, ..viewport() };
    assert_eq!(hit_handle(pt(9.0, 10.0), a, &zoomed), None);
}

#[test]
fn nearest_handle_wins() {
    let tiny = DocStore::from_document(HierarchyDocument {
        origin: Point::default(),
        units: Units::M,
        nodes: vec![square("t", 10.0, 10.0, 1.0)],
    });
    let t = tiny.get("t").unwrap();
    assert_eq!(hit_handle(pt(10.9, 10.1), t, &viewport()), Some(1));
}

#[test]
fn handle_positions_skip_closing_point() {
    let doc = store();
    assert_eq!(handle_positions(doc.get("a").unwrap()).len(), 4);
}
