use super::*;
use crate::doc::{DocStore, HierarchyDocument, HierarchyNode, Level, Units};

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn store() -> DocStore {
    let mut node = HierarchyNode::new("a", Level::Polje, "A", vec![pt(0.0, 0.0), pt(4.0, 0.0), pt(4.0, 2.0), pt(0.0, 2.0)]);
    node.shape_gl = Some(vec![pt(100.0, 100.0), pt(104.0, 100.0), pt(104.0, 102.0), pt(100.0, 102.0), pt(100.0, 100.0)]);
    let plain = HierarchyNode::new("b", Level::Polje, "B", vec![pt(0.0, 0.0), pt(1.0, 0.0), pt(1.0, 1.0)]);
    DocStore::from_document(HierarchyDocument { origin: Point::default(), units: Units::M, nodes: vec![node, plain] })
}

// =============================================================
// Defaults
// =============================================================

#[test]
fn input_state_default_is_idle() {
    let s = InputState::default();
    assert!(s.is_idle());
    assert!(s.session().is_none());
}

#[test]
fn ui_state_defaults() {
    let ui = UiState::default();
    assert!(ui.selected.is_none());
    assert!(ui.hovered_vertex.is_none());
    assert_eq!(ui.vertex_mode, VertexMode::Rectangular);
}

#[test]
fn modifiers_default_all_false() {
    let m = Modifiers::default();
    assert!(!m.shift && !m.ctrl && !m.alt && !m.meta);
}

// =============================================================
// DragSession
// =============================================================

#[test]
fn begin_captures_closed_rings() {
    let doc = store();
    let s = DragSession::begin(doc.get("a").unwrap(), GestureKind::Position, pt(1.0, 1.0));
    assert_eq!(s.start_polygon.len(), 5);
    assert_eq!(s.start_shape_gl.as_ref().map(Vec::len), Some(5));
    assert_eq!(s.live_polygon, s.start_polygon);
    assert!(!s.moved);
}

#[test]
fn begin_without_shape_gl_has_no_gl_snapshot() {
    let doc = store();
    let s = DragSession::begin(doc.get("b").unwrap(), GestureKind::Position, pt(0.0, 0.0));
    assert!(s.start_shape_gl.is_none());
    assert!(s.live_shape_gl.is_none());
}

#[test]
fn apply_position_translates_both_rings() {
    let doc = store();
    let mut s = DragSession::begin(doc.get("a").unwrap(), GestureKind::Position, pt(1.0, 1.0));
    s.apply(pt(2.0, 3.0));
    assert_eq!(s.live_polygon[0], pt(1.0, 2.0));
    assert_eq!(s.live_shape_gl.as_ref().unwrap()[0], pt(101.0, 102.0));
    assert!(s.moved);
}

#[test]
fn apply_is_relative_to_start_not_previous_frame() {
    let doc = store();
    let mut s = DragSession::begin(doc.get("a").unwrap(), GestureKind::Position, pt(0.0, 0.0));
    s.apply(pt(5.0, 5.0));
    s.apply(pt(1.0, 0.0));
    assert_eq!(s.live_polygon[0], pt(1.0, 0.0));
}

#[test]
fn apply_with_zero_delta_does_not_mark_moved() {
    let doc = store();
    let mut s = DragSession::begin(doc.get("a").unwrap(), GestureKind::Position, pt(3.0, 3.0));
    s.apply(pt(3.0, 3.0));
    assert!(!s.moved);
}

#[test]
fn apply_vertex_edits_both_snapshots_with_same_index() {
    let doc = store();
    let kind = GestureKind::Vertex { index: 1, mode: VertexMode::Free };
    let mut s = DragSession::begin(doc.get("a").unwrap(), kind, pt(0.0, 0.0));
    s.apply(pt(1.0, 1.0));
    assert_eq!(s.live_polygon[1], pt(5.0, 1.0));
    assert_eq!(s.live_polygon[0], pt(0.0, 0.0));
    assert_eq!(s.live_shape_gl.as_ref().unwrap()[1], pt(105.0, 101.0));
    assert!(s.is_vertex());
}

#[test]
fn session_accessors_cover_both_drag_states() {
    let doc = store();
    let s = DragSession::begin(doc.get("a").unwrap(), GestureKind::Position, pt(0.0, 0.0));
    let mut body = InputState::DraggingBody(s.clone());
    assert_eq!(body.session(), Some(&s));
    body.session_mut().unwrap().moved = true;
    assert!(body.session().unwrap().moved);
    let vertex = InputState::DraggingVertex(s);
    assert!(!vertex.is_idle());
}
